use std::io;
use std::os::raw::c_int;

use thiserror::Error;

type ErrorNum = c_int;

#[derive(Debug, Error)]
pub enum Error {
    #[error("no such file or directory: {0}")]
    NotFound(String),
    #[error("already exists: {0}")]
    AlreadyExists(String),
    #[error("not a directory: {0}")]
    NotADirectory(String),
    #[error("is a directory: {0}")]
    IsDirectory(String),
    #[error("no space left: {0}")]
    NoSpace(&'static str),
    #[error("offset {offset} is past the end of the file ({size} bytes)")]
    Seek { offset: u64, size: u64 },
    #[error("unsupported: {0}")]
    Unsupported(String),
    #[error("name too long: {0}")]
    NameTooLong(String),
    #[error("invalid argument: {0}")]
    Invalid(String),
    #[error("corrupted filesystem: {0}")]
    Corrupted(String),
    #[error("filesystem is not mounted")]
    NotMounted,
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn errno(&self) -> ErrorNum {
        match self {
            Error::NotFound(_) => libc::ENOENT,
            Error::AlreadyExists(_) => libc::EEXIST,
            Error::NotADirectory(_) => libc::ENOTDIR,
            Error::IsDirectory(_) => libc::EISDIR,
            Error::NoSpace(_) => libc::ENOSPC,
            Error::Seek { .. } => libc::ESPIPE,
            Error::Unsupported(_) => libc::ENXIO,
            Error::NameTooLong(_) => libc::ENAMETOOLONG,
            Error::Invalid(_) => libc::EINVAL,
            Error::Corrupted(_) | Error::NotMounted => libc::EIO,
            Error::Io(e) => e.raw_os_error().unwrap_or(libc::EIO),
        }
    }
}
