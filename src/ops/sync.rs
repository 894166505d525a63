use std::rc::Rc;

use crate::consts::DENTRY_RECORD_SIZE;
use crate::driver::DeviceDriver;
use crate::ops::node::DentryRef;
use crate::ops::ExtentFS;
use crate::util::error::Result;

impl<D: DeviceDriver> ExtentFS<D> {
    /// Writes the resident subtree below `entry`. Cold entries are already on disk.
    pub(crate) fn sync_inode(&mut self, entry: &DentryRef) -> Result<()> {
        let children = {
            let dentry = entry.borrow();
            let Some(inode) = dentry.inode.as_ref() else {
                return Ok(());
            };
            self.io.write_record(self.superblock.inode_offset(inode.ino), &inode.to_record())?;

            let extent = self.superblock.extent_offset(inode.ino);
            if inode.kind.has_extent() {
                self.io.write(extent, &inode.data)?;
            }
            for (index, child) in inode.children.iter().enumerate() {
                let record = child.borrow().to_record()?;
                self.io.write_record(extent + (index * DENTRY_RECORD_SIZE) as u64, &record)?;
            }
            let children: Vec<DentryRef> = inode.children.iter().map(Rc::clone).collect();
            children
        };

        for child in &children {
            self.sync_inode(child)?;
        }
        Ok(())
    }

    /// Flushes the tree together with the superblock and both bitmaps.
    pub fn sync(&mut self) -> Result<()> {
        self.ensure_mounted()?;
        let root = Rc::clone(&self.root);
        self.sync_inode(&root)?;
        self.superblock.write(&mut self.io)?;
        self.inode_map.write(&mut self.io)?;
        self.data_map.write(&mut self.io)
    }
}

#[cfg(test)]
mod tests {
    use crate::ops::tests::fresh;
    use crate::structure::inode::{DiskInode, FileKind};
    use crate::structure::dentry::DiskDentry;

    #[test]
    fn sync_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let mut fs = fresh(&dir);
        fs.create_directory("/a").unwrap();
        fs.create_node("/a/b", FileKind::Regular).unwrap();
        fs.write("/a/b", b"content", 0).unwrap();

        let image = dir.path().join("extentfs.img");
        fs.sync().unwrap();
        let first = std::fs::read(&image).unwrap();
        fs.sync().unwrap();
        let second = std::fs::read(&image).unwrap();
        assert!(first == second, "second sync changed the image");
    }

    #[test]
    fn records_land_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let mut fs = fresh(&dir);
        fs.create_directory("/a").unwrap();
        fs.create_node("/z", FileKind::Symlink).unwrap();
        fs.sync().unwrap();

        let root: DiskInode = fs.io.read_record(fs.superblock.inode_offset(0)).unwrap();
        assert_eq!((root.kind, root.dir_count), (FileKind::Directory, 2));

        let extent = fs.superblock.extent_offset(0);
        let newest: DiskDentry = fs.io.read_record(extent).unwrap();
        let oldest: DiskDentry = fs.io.read_record(extent + 140).unwrap();
        assert_eq!((newest.name.as_str(), newest.ino), ("z", 2));
        assert_eq!((oldest.name.as_str(), oldest.kind), ("a", FileKind::Directory));
    }
}
