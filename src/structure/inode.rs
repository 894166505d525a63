use crate::consts::{InodeId, INODE_RECORD_SIZE};
use crate::util::error::{Error, Result};
use crate::util::serializable::{expect_len, le_u32, ByteSerializable, KnownSize};

#[repr(u32)]
#[derive(PartialEq, Eq, Debug, Copy, Clone)]
pub enum FileKind {
    Regular = 0,
    Directory = 1,
    Symlink = 2,
}

impl FileKind {
    pub fn from_raw(raw: u32) -> Result<FileKind> {
        match raw {
            0 => Ok(FileKind::Regular),
            1 => Ok(FileKind::Directory),
            2 => Ok(FileKind::Symlink),
            _ => Err(Error::Corrupted(format!("invalid file kind {}", raw))),
        }
    }

    /// Regular files and symlinks keep their content in a data extent.
    pub fn has_extent(&self) -> bool {
        !matches!(self, FileKind::Directory)
    }
}

/// Fixed 32 byte inode table record.
#[derive(PartialEq, Debug, Clone)]
pub struct DiskInode {
    pub ino: InodeId,
    pub size: u32,
    pub link: u32,
    pub kind: FileKind,
    pub dir_count: u32,
}

impl KnownSize for DiskInode {
    fn size_on_disk() -> usize {
        INODE_RECORD_SIZE
    }
}

impl ByteSerializable for DiskInode {
    fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(INODE_RECORD_SIZE);
        bytes.extend_from_slice(&self.ino.to_le_bytes());
        bytes.extend_from_slice(&self.size.to_le_bytes());
        bytes.extend_from_slice(&self.link.to_le_bytes());
        bytes.extend_from_slice(&(self.kind as u32).to_le_bytes());
        bytes.extend_from_slice(&self.dir_count.to_le_bytes());
        bytes.resize(INODE_RECORD_SIZE, 0);
        bytes
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self> {
        expect_len(bytes, INODE_RECORD_SIZE, "inode")?;
        Ok(DiskInode {
            ino: le_u32(bytes, 0),
            size: le_u32(bytes, 4),
            link: le_u32(bytes, 8),
            kind: FileKind::from_raw(le_u32(bytes, 12))?,
            dir_count: le_u32(bytes, 16),
        })
    }
}
