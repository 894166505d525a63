use crate::driver::DeviceDriver;
use crate::ops::node::DentryRef;
use crate::ops::ExtentFS;
use crate::structure::inode::FileKind;
use crate::util::error::{Error, Result};

impl<D: DeviceDriver> ExtentFS<D> {
    fn content_entry(&mut self, path: &str) -> Result<DentryRef> {
        self.ensure_mounted()?;
        let (entry, found) = self.lookup(path)?;
        if !found {
            return Err(Error::NotFound(path.to_string()));
        }
        if entry.borrow().kind == FileKind::Directory {
            return Err(Error::IsDirectory(path.to_string()));
        }
        Ok(entry)
    }

    /// Copies `data` into the extent at `offset`. Offsets may not skip past the current size.
    pub fn write(&mut self, path: &str, data: &[u8], offset: u64) -> Result<usize> {
        let entry = self.content_entry(path)?;
        let mut dentry = entry.borrow_mut();
        let inode = dentry.resident_mut()?;
        if offset > inode.size as u64 {
            return Err(Error::Seek { offset, size: inode.size as u64 });
        }
        let end = offset + data.len() as u64;
        if end > inode.data.len() as u64 {
            return Err(Error::NoSpace("file extent"));
        }

        inode.data[offset as usize..end as usize].copy_from_slice(data);
        inode.size = inode.size.max(end as u32);
        Ok(data.len())
    }

    /// Reads up to `length` bytes at `offset`. Only the extent bounds the
    /// result, so bytes past the logical size come back as stored.
    pub fn read(&mut self, path: &str, length: usize, offset: u64) -> Result<Vec<u8>> {
        let entry = self.content_entry(path)?;
        let dentry = entry.borrow();
        let inode = dentry.resident()?;
        if offset > inode.size as u64 {
            return Err(Error::Seek { offset, size: inode.size as u64 });
        }

        let start = (offset as usize).min(inode.data.len());
        let end = start.saturating_add(length).min(inode.data.len());
        Ok(inode.data[start..end].to_vec())
    }

    pub fn read_link(&mut self, path: &str) -> Result<String> {
        let entry = self.content_entry(path)?;
        let dentry = entry.borrow();
        if dentry.kind != FileKind::Symlink {
            return Err(Error::Invalid(format!("{} is not a symlink", path)));
        }
        let inode = dentry.resident()?;
        let target = inode.data.get(..inode.size as usize).unwrap_or(&inode.data);
        String::from_utf8(target.to_vec())
            .map_err(|e| Error::Corrupted(format!("symlink {} does not hold utf-8: {}", path, e)))
    }
}

#[cfg(test)]
mod tests {
    use crate::consts::EXTENT_SIZE;
    use crate::ops::tests::fresh;
    use crate::structure::inode::FileKind;
    use crate::util::error::Error;

    #[test]
    fn overlapping_writes() {
        let dir = tempfile::tempdir().unwrap();
        let mut fs = fresh(&dir);
        fs.create_node("/f", FileKind::Regular).unwrap();

        assert_eq!(fs.write("/f", b"hello world", 0).unwrap(), 11);
        assert_eq!(fs.write("/f", b"WORLD!!", 6).unwrap(), 7);
        assert_eq!(fs.write("/f", b"J", 0).unwrap(), 1);

        assert_eq!(fs.read("/f", 13, 0).unwrap(), b"Jello WORLD!!");
        assert_eq!(fs.read("/f", 5, 6).unwrap(), b"WORLD");
        assert_eq!(fs.get_attributes("/f").unwrap().size, 13);
    }

    #[test]
    fn read_is_bounded_by_extent_only() {
        let dir = tempfile::tempdir().unwrap();
        let mut fs = fresh(&dir);
        fs.create_node("/f", FileKind::Regular).unwrap();
        fs.write("/f", b"abc", 0).unwrap();

        assert_eq!(fs.read("/f", 6, 0).unwrap(), b"abc\0\0\0");
        assert_eq!(fs.read("/f", EXTENT_SIZE * 2, 0).unwrap().len(), EXTENT_SIZE);
        assert_eq!(fs.read("/f", 10, 3).unwrap(), vec![0; 10]);
    }

    #[test]
    fn offsets_past_size() {
        let dir = tempfile::tempdir().unwrap();
        let mut fs = fresh(&dir);
        fs.create_node("/f", FileKind::Regular).unwrap();
        fs.write("/f", b"12345", 0).unwrap();

        assert!(matches!(fs.write("/f", b"x", 6), Err(Error::Seek { offset: 6, size: 5 })));
        assert!(matches!(fs.read("/f", 1, 6), Err(Error::Seek { .. })));
        assert_eq!(fs.write("/f", b"6", 5).unwrap(), 1);
    }

    #[test]
    fn extent_overrun() {
        let dir = tempfile::tempdir().unwrap();
        let mut fs = fresh(&dir);
        fs.create_node("/f", FileKind::Regular).unwrap();

        fs.write("/f", &vec![1; EXTENT_SIZE], 0).unwrap();
        assert!(matches!(fs.write("/f", b"x", EXTENT_SIZE as u64), Err(Error::NoSpace(_))));
        assert!(matches!(fs.write("/f", b"xy", EXTENT_SIZE as u64 - 1), Err(Error::NoSpace(_))));
        assert_eq!(fs.get_attributes("/f").unwrap().size, EXTENT_SIZE as u64);
    }

    #[test]
    fn kind_checks() {
        let dir = tempfile::tempdir().unwrap();
        let mut fs = fresh(&dir);
        fs.create_directory("/d").unwrap();
        fs.create_node("/f", FileKind::Regular).unwrap();

        assert!(matches!(fs.write("/d", b"x", 0), Err(Error::IsDirectory(_))));
        assert!(matches!(fs.read("/d", 1, 0), Err(Error::IsDirectory(_))));
        assert!(matches!(fs.read("/missing", 1, 0), Err(Error::NotFound(_))));
        assert!(matches!(fs.read_link("/f"), Err(Error::Invalid(_))));
    }
}
