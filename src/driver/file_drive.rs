use std::fs::{File, OpenOptions};
use std::io;
use std::os::unix::fs::FileExt;
use std::path::Path;

use log::info;

use crate::driver::DeviceDriver;

/// Disk image stored in a regular file.
pub struct FileDrive {
    file: File,
    bytes: u64,
    sector_size: usize,
}

impl FileDrive {
    pub fn new<P: AsRef<Path>>(path: P, bytes: u64, sector_size: usize) -> io::Result<FileDrive> {
        check_geometry(bytes, sector_size)?;
        let file = OpenOptions::new().read(true).write(true).create_new(true).open(path)?;
        file.set_len(bytes)?;
        Ok(FileDrive { file, bytes, sector_size })
    }

    pub fn open<P: AsRef<Path>>(path: P, sector_size: usize) -> io::Result<FileDrive> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        let bytes = file.metadata()?.len();
        check_geometry(bytes, sector_size)?;
        Ok(FileDrive { file, bytes, sector_size })
    }

    pub fn open_or_create<P: AsRef<Path>>(path: P, bytes: u64, sector_size: usize) -> io::Result<FileDrive> {
        let path = path.as_ref();
        if path.exists() {
            FileDrive::open(path, sector_size)
        } else {
            info!("creating {} byte image at {}", bytes, path.display());
            FileDrive::new(path, bytes, sector_size)
        }
    }

    fn sector_offset(&self, index: u64) -> io::Result<u64> {
        let offset = index * self.sector_size as u64;
        if offset + self.sector_size as u64 > self.bytes {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("sector {} is outside of the {} byte device", index, self.bytes),
            ));
        }
        Ok(offset)
    }
}

fn check_geometry(bytes: u64, sector_size: usize) -> io::Result<()> {
    if sector_size == 0 || bytes % sector_size as u64 != 0 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("device size {} is not a multiple of sector size {}", bytes, sector_size),
        ));
    }
    Ok(())
}

impl DeviceDriver for FileDrive {
    fn get_size(&self) -> u64 {
        self.bytes
    }

    fn get_sector_size(&self) -> usize {
        self.sector_size
    }

    fn read_sector(&self, index: u64) -> io::Result<Vec<u8>> {
        let offset = self.sector_offset(index)?;
        let mut buffer = vec![0; self.sector_size];
        self.file.read_exact_at(&mut buffer, offset)?;
        Ok(buffer)
    }

    fn write_sector(&mut self, index: u64, data: &[u8]) -> io::Result<()> {
        if data.len() != self.sector_size {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("sector size mismatch - expected {}, got {}", self.sector_size, data.len()),
            ));
        }
        let offset = self.sector_offset(index)?;
        self.file.write_all_at(data, offset)
    }

    fn close(&mut self) -> io::Result<()> {
        self.file.sync_all()
    }
}
