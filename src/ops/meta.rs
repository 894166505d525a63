use crate::consts::{InodeId, BLOCK_SIZE, DENTRY_RECORD_SIZE, ROOT_INODE};
use crate::driver::DeviceDriver;
use crate::ops::node::DentryRef;
use crate::ops::ExtentFS;
use crate::structure::inode::FileKind;
use crate::util::align::round_up;
use crate::util::error::{Error, Result};

#[derive(Debug, PartialEq, Clone)]
pub struct Attributes {
    pub ino: InodeId,
    pub kind: FileKind,
    pub size: u64,
    pub nlink: u32,
    pub blocks: u64,
}

impl<D: DeviceDriver> ExtentFS<D> {
    pub fn get_attributes(&mut self, path: &str) -> Result<Attributes> {
        self.ensure_mounted()?;
        let (entry, found) = self.lookup(path)?;
        if !found {
            return Err(Error::NotFound(path.to_string()));
        }
        self.attributes_of(&entry)
    }

    pub(crate) fn attributes_of(&self, entry: &DentryRef) -> Result<Attributes> {
        let dentry = entry.borrow();
        let inode = dentry.resident()?;

        // the root reports the whole device
        if inode.ino == ROOT_INODE {
            return Ok(Attributes {
                ino: inode.ino,
                kind: FileKind::Directory,
                size: self.superblock.usage as u64,
                nlink: 2,
                blocks: self.superblock.block_count(),
            });
        }

        let size = match inode.kind {
            FileKind::Directory => (inode.children.len() * DENTRY_RECORD_SIZE) as u64,
            _ => inode.size as u64,
        };
        Ok(Attributes {
            ino: inode.ino,
            kind: inode.kind,
            size,
            nlink: inode.link,
            blocks: round_up(size, BLOCK_SIZE as u64) / BLOCK_SIZE as u64,
        })
    }

    /// Timestamps are not stored; the path only has to exist.
    pub fn touch_time(&mut self, path: &str) -> Result<()> {
        self.get_attributes(path).map(|_| ())
    }

    pub fn delete_file(&mut self, _path: &str) -> Result<()> {
        self.ensure_mounted()
    }

    pub fn delete_directory(&mut self, _path: &str) -> Result<()> {
        self.ensure_mounted()
    }

    pub fn rename(&mut self, _from: &str, _to: &str) -> Result<()> {
        self.ensure_mounted()
    }

    pub fn open(&mut self, _path: &str) -> Result<()> {
        self.ensure_mounted()
    }

    pub fn open_directory(&mut self, _path: &str) -> Result<()> {
        self.ensure_mounted()
    }

    pub fn truncate(&mut self, _path: &str, _size: u64) -> Result<()> {
        self.ensure_mounted()
    }

    pub fn check_access(&mut self, _path: &str, _mask: i32) -> Result<()> {
        self.ensure_mounted()
    }
}
