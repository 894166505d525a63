use std::rc::Rc;

use log::{debug, info};

use crate::consts::ROOT_INODE;
use crate::driver::DeviceDriver;
use crate::io::IO;
use crate::ops::node::{Dentry, DentryRef};
use crate::structure::bitmap::Bitmap;
use crate::structure::inode::FileKind;
use crate::structure::superblock::SuperBlock;
use crate::util::error::{Error, Result};
use crate::util::format::pretty_size_from_bytes;

pub mod directory;
mod file;
mod lookup;
pub mod meta;
pub(crate) mod node;
mod sync;

#[derive(Debug, PartialEq, Copy, Clone)]
pub enum MountState {
    Unmounted,
    Mounting,
    Mounted,
    Unmounting,
}

/// A mounted filesystem. The whole tree lives in memory below `root` and is
/// only written back on [`ExtentFS::sync`] and [`ExtentFS::unmount`].
pub struct ExtentFS<D: DeviceDriver> {
    io: IO<D>,
    superblock: SuperBlock,
    inode_map: Bitmap,
    data_map: Bitmap,
    root: DentryRef,
    state: MountState,
}

impl<D: DeviceDriver> ExtentFS<D> {
    /// Mounts `device`, formatting it first when it carries no superblock.
    pub fn mount(device: D) -> Result<ExtentFS<D>> {
        let io = IO::new(device);
        let minimum = SuperBlock::new(io.get_size(), io.get_sector_size()).layout_end();
        if io.get_size() < minimum {
            return Err(Error::Invalid(format!(
                "device holds {}, the layout needs {}",
                pretty_size_from_bytes(io.get_size()),
                pretty_size_from_bytes(minimum)
            )));
        }

        let root = Dentry::detached("/", FileKind::Directory);
        let (superblock, format) = match SuperBlock::read(&io)? {
            Some(superblock) => (superblock, false),
            None => (SuperBlock::new(io.get_size(), io.get_sector_size()), true),
        };

        let mut inode_map = Bitmap::read(
            &io,
            "inode bitmap",
            superblock.inode_map_offset as u64,
            superblock.inode_map_blocks,
            superblock.max_inodes,
        )?;
        let mut data_map = Bitmap::read(
            &io,
            "data bitmap",
            superblock.data_map_offset as u64,
            superblock.data_map_blocks,
            superblock.max_data,
        )?;
        if format {
            inode_map.clear();
            data_map.clear();
        }

        let mut fs = ExtentFS { io, superblock, inode_map, data_map, root, state: MountState::Mounting };
        let root = Rc::clone(&fs.root);
        if format {
            let ino = fs.allocate_inode_for(&root)?;
            debug!("formatted device, root is inode {}", ino);
            fs.sync_inode(&root)?;
        } else {
            root.borrow_mut().ino = Some(ROOT_INODE);
            root.borrow_mut().valid = true;
        }
        fs.hydrate(&root)?;
        fs.state = MountState::Mounted;

        info!(
            "mounted {} device ({}), {}/{} inodes and {}/{} data blocks in use",
            if format { "fresh" } else { "existing" },
            pretty_size_from_bytes(fs.superblock.disk_size),
            fs.inode_map.used(),
            fs.inode_map.capacity(),
            fs.data_map.used(),
            fs.data_map.capacity()
        );
        Ok(fs)
    }

    /// Writes everything back and closes the device. Does nothing unless mounted.
    pub fn unmount(&mut self) -> Result<()> {
        if self.state != MountState::Mounted {
            return Ok(());
        }
        self.state = MountState::Unmounting;

        let root = Rc::clone(&self.root);
        self.sync_inode(&root)?;
        self.superblock.write(&mut self.io)?;
        self.inode_map.write(&mut self.io)?;
        self.data_map.write(&mut self.io)?;
        self.inode_map.release();
        self.data_map.release();
        self.io.close()?;

        self.state = MountState::Unmounted;
        info!("unmounted, {} of directory storage in use", pretty_size_from_bytes(self.superblock.usage as u64));
        Ok(())
    }

    pub(crate) fn ensure_mounted(&self) -> Result<()> {
        match self.state {
            MountState::Mounted => Ok(()),
            _ => Err(Error::NotMounted),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::consts::{DEFAULT_DEVICE_SIZE, DEFAULT_SECTOR_SIZE};
    use crate::driver::file_drive::FileDrive;

    pub(crate) fn fresh(dir: &TempDir) -> ExtentFS<FileDrive> {
        let drive = FileDrive::new(dir.path().join("extentfs.img"), DEFAULT_DEVICE_SIZE, DEFAULT_SECTOR_SIZE).unwrap();
        ExtentFS::mount(drive).unwrap()
    }

    fn remount(dir: &TempDir) -> ExtentFS<FileDrive> {
        let drive = FileDrive::open(dir.path().join("extentfs.img"), DEFAULT_SECTOR_SIZE).unwrap();
        ExtentFS::mount(drive).unwrap()
    }

    #[test]
    fn content_survives_remount() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut fs = fresh(&dir);
            assert_eq!(fs.state, MountState::Mounted);
            fs.create_directory("/a").unwrap();
            fs.create_node("/a/b", FileKind::Regular).unwrap();
            assert_eq!(fs.write("/a/b", b"hello", 0).unwrap(), 5);
            fs.unmount().unwrap();
            assert_eq!(fs.state, MountState::Unmounted);
        }

        let mut fs = remount(&dir);
        assert_eq!(fs.read("/a/b", 5, 0).unwrap(), b"hello");
        let listed = fs.list_directory("/a", 0).unwrap().unwrap();
        assert_eq!(listed.name, "b");
        assert_eq!(fs.list_directory("/a", 1).unwrap(), None);
        assert_eq!(fs.inode_map.used(), 3);
        assert_eq!(fs.get_attributes("/").unwrap().size, 2 * 1024);
    }

    #[test]
    fn existing_tree_keeps_allocating_after_remount() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut fs = fresh(&dir);
            fs.create_directory("/one").unwrap();
            fs.unmount().unwrap();
        }

        let mut fs = remount(&dir);
        let attributes = fs.create_directory("/two").unwrap();
        assert_eq!(attributes.ino, 2);
        let names: Vec<String> = (0..2).map(|index| fs.list_directory("/", index).unwrap().unwrap().name).collect();
        assert_eq!(names, vec!["two", "one"]);
    }

    #[test]
    fn duplicate_creation() {
        let dir = tempfile::tempdir().unwrap();
        let mut fs = fresh(&dir);
        fs.create_node("/x", FileKind::Regular).unwrap();

        assert!(matches!(fs.create_node("/x", FileKind::Regular), Err(Error::AlreadyExists(_))));
        assert!(matches!(fs.create_directory("/x"), Err(Error::AlreadyExists(_))));
        assert_eq!(fs.inode_map.used(), 2);
    }

    #[test]
    fn missing_intermediate_directory() {
        let dir = tempfile::tempdir().unwrap();
        let mut fs = fresh(&dir);
        fs.create_directory("/a").unwrap();

        assert!(matches!(fs.create_directory("/a/missing/b"), Err(Error::NotFound(_))));
        assert_eq!(fs.list_directory("/a", 0).unwrap(), None);
        assert_eq!(fs.inode_map.used(), 2);
    }

    #[test]
    fn too_small_device() {
        let dir = tempfile::tempdir().unwrap();
        let drive = FileDrive::new(dir.path().join("small.img"), 1024 * 1024, DEFAULT_SECTOR_SIZE).unwrap();
        assert!(matches!(ExtentFS::mount(drive), Err(Error::Invalid(_))));
    }

    #[test]
    fn operations_need_a_mount() {
        let dir = tempfile::tempdir().unwrap();
        let mut fs = fresh(&dir);
        fs.unmount().unwrap();
        fs.unmount().unwrap();

        assert!(matches!(fs.create_directory("/a"), Err(Error::NotMounted)));
        assert!(matches!(fs.read("/", 1, 0), Err(Error::NotMounted)));
        assert!(matches!(fs.sync(), Err(Error::NotMounted)));
        assert!(matches!(fs.open("/"), Err(Error::NotMounted)));
    }
}
