use std::cell::RefCell;
use std::rc::{Rc, Weak};

use log::debug;

use crate::consts::{InodeId, BLOCK_SIZE, DENTRY_RECORD_SIZE, ENTRIES_PER_EXTENT, EXTENT_SIZE};
use crate::driver::DeviceDriver;
use crate::ops::ExtentFS;
use crate::structure::dentry::DiskDentry;
use crate::structure::inode::{DiskInode, FileKind};
use crate::util::align::round_up;
use crate::util::error::{Error, Result};

pub(crate) type DentryRef = Rc<RefCell<Dentry>>;

/// A name in the tree. The inode is only resident once the entry has been
/// hydrated or freshly allocated; until then the entry is cold.
pub(crate) struct Dentry {
    pub name: String,
    pub kind: FileKind,
    pub parent: Weak<RefCell<Dentry>>,
    pub ino: Option<InodeId>,
    pub inode: Option<Inode>,
    pub valid: bool,
}

pub(crate) struct Inode {
    pub ino: InodeId,
    pub size: u32,
    pub link: u32,
    pub kind: FileKind,
    /// Newest first, in the order they are written to the extent.
    pub children: Vec<DentryRef>,
    /// Whole extent for files and symlinks, empty for directories.
    pub data: Vec<u8>,
}

impl Dentry {
    pub fn detached(name: &str, kind: FileKind) -> DentryRef {
        Rc::new(RefCell::new(Dentry {
            name: name.to_string(),
            kind,
            parent: Weak::new(),
            ino: None,
            inode: None,
            valid: false,
        }))
    }

    pub fn from_record(record: DiskDentry, parent: &DentryRef) -> DentryRef {
        Rc::new(RefCell::new(Dentry {
            name: record.name,
            kind: record.kind,
            parent: Rc::downgrade(parent),
            ino: Some(record.ino),
            inode: None,
            valid: record.valid,
        }))
    }

    pub fn ino(&self) -> Result<InodeId> {
        self.ino.ok_or_else(|| Error::Corrupted(format!("{} has no inode bound", self.name)))
    }

    pub fn resident(&self) -> Result<&Inode> {
        self.inode.as_ref().ok_or_else(|| Error::Corrupted(format!("{} is not loaded", self.name)))
    }

    pub fn resident_mut(&mut self) -> Result<&mut Inode> {
        let name = &self.name;
        self.inode.as_mut().ok_or_else(|| Error::Corrupted(format!("{} is not loaded", name)))
    }

    pub fn to_record(&self) -> Result<DiskDentry> {
        Ok(DiskDentry { name: self.name.clone(), kind: self.kind, ino: self.ino()?, valid: self.valid })
    }
}

impl Inode {
    pub fn new(ino: InodeId, kind: FileKind) -> Inode {
        let data = if kind.has_extent() { vec![0; EXTENT_SIZE] } else { Vec::new() };
        Inode { ino, size: 0, link: 1, kind, children: Vec::new(), data }
    }

    pub fn from_record(record: &DiskInode) -> Inode {
        Inode {
            ino: record.ino,
            size: record.size,
            link: record.link,
            kind: record.kind,
            children: Vec::new(),
            data: Vec::new(),
        }
    }

    pub fn to_record(&self) -> DiskInode {
        DiskInode {
            ino: self.ino,
            size: self.size,
            link: self.link,
            kind: self.kind,
            dir_count: self.children.len() as u32,
        }
    }

    pub fn child(&self, name: &str) -> Option<DentryRef> {
        self.children.iter().find(|child| child.borrow().name == name).cloned()
    }
}

impl<D: DeviceDriver> ExtentFS<D> {
    /// Binds a fresh inode to `entry`. Files and symlinks get a zeroed extent.
    pub(crate) fn allocate_inode_for(&mut self, entry: &DentryRef) -> Result<InodeId> {
        let ino = self.inode_map.allocate()?;
        let mut dentry = entry.borrow_mut();
        let kind = dentry.kind;
        dentry.ino = Some(ino);
        dentry.inode = Some(Inode::new(ino, kind));
        dentry.valid = true;
        Ok(ino)
    }

    pub(crate) fn attach_child(&mut self, parent: &DentryRef, entry: DentryRef) -> Result<()> {
        let mut parent_dentry = parent.borrow_mut();
        let directory = parent_dentry.resident_mut()?;
        if directory.children.len() >= ENTRIES_PER_EXTENT {
            return Err(Error::NoSpace("directory extent"));
        }

        let footprint = round_up(directory.size as u64, BLOCK_SIZE as u64);
        let grown = round_up(directory.size as u64 + DENTRY_RECORD_SIZE as u64, BLOCK_SIZE as u64);
        if grown > footprint {
            self.data_map.allocate()?;
            self.superblock.usage += BLOCK_SIZE as u32;
        }

        directory.size += DENTRY_RECORD_SIZE as u32;
        entry.borrow_mut().parent = Rc::downgrade(parent);
        directory.children.insert(0, entry);
        Ok(())
    }

    /// Loads the inode record of `entry`. Children of a directory stay cold.
    pub(crate) fn hydrate(&mut self, entry: &DentryRef) -> Result<()> {
        let (ino, kind) = {
            let dentry = entry.borrow();
            (dentry.ino()?, dentry.kind)
        };
        let record: DiskInode = self.io.read_record(self.superblock.inode_offset(ino))?;
        if record.kind != kind {
            return Err(Error::Corrupted(format!("inode {} is a {:?}, entry says {:?}", ino, record.kind, kind)));
        }

        let mut inode = Inode::from_record(&record);
        let extent = self.superblock.extent_offset(ino);
        if kind.has_extent() {
            inode.data = self.io.read(extent, EXTENT_SIZE)?;
        } else {
            if record.dir_count as usize > ENTRIES_PER_EXTENT {
                return Err(Error::Corrupted(format!("directory {} claims {} entries", ino, record.dir_count)));
            }
            for index in 0..record.dir_count as u64 {
                let child: DiskDentry = self.io.read_record(extent + index * DENTRY_RECORD_SIZE as u64)?;
                inode.children.push(Dentry::from_record(child, entry));
            }
        }

        debug!("hydrated inode {} ({:?}, {} bytes, {} entries)", ino, kind, inode.size, inode.children.len());
        entry.borrow_mut().inode = Some(inode);
        Ok(())
    }

    pub(crate) fn hydrate_if_cold(&mut self, entry: &DentryRef) -> Result<()> {
        if entry.borrow().inode.is_none() {
            self.hydrate(entry)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use crate::consts::{BLOCK_SIZE, DENTRY_RECORD_SIZE, ENTRIES_PER_EXTENT, EXTENT_SIZE};
    use crate::ops::tests::fresh;
    use crate::structure::inode::FileKind;
    use crate::util::error::Error;

    use super::Dentry;

    #[test]
    fn allocation_binds_inode() {
        let dir = tempfile::tempdir().unwrap();
        let mut fs = fresh(&dir);

        let file = Dentry::detached("file", FileKind::Regular);
        let directory = Dentry::detached("dir", FileKind::Directory);
        assert_eq!(fs.allocate_inode_for(&file).unwrap(), 1);
        assert_eq!(fs.allocate_inode_for(&directory).unwrap(), 2);

        let file = file.borrow();
        assert!(file.valid);
        assert_eq!(file.ino, Some(1));
        assert_eq!(file.resident().unwrap().data.len(), EXTENT_SIZE);
        assert!(directory.borrow().resident().unwrap().data.is_empty());
    }

    #[test]
    fn attach_claims_a_block_per_rounding_step() {
        let dir = tempfile::tempdir().unwrap();
        let mut fs = fresh(&dir);
        let root = Rc::clone(&fs.root);
        let data_used = fs.data_map.used();
        let usage = fs.superblock.usage;

        let per_block = BLOCK_SIZE / DENTRY_RECORD_SIZE + 1;
        for index in 0..per_block + 1 {
            let entry = Dentry::detached(&format!("f{}", index), FileKind::Regular);
            fs.allocate_inode_for(&entry).unwrap();
            fs.attach_child(&root, entry).unwrap();
        }

        // 8 records fill 1120 bytes, the 9th stays within the second block
        assert_eq!(fs.data_map.used(), data_used + 2);
        assert_eq!(fs.superblock.usage, usage + 2 * BLOCK_SIZE as u32);

        let root = root.borrow();
        let directory = root.resident().unwrap();
        assert_eq!(directory.size as usize, (per_block + 1) * DENTRY_RECORD_SIZE);
        assert_eq!(directory.children[0].borrow().name, format!("f{}", per_block));
        assert!(directory.children[0].borrow().parent.upgrade().is_some());
    }

    #[test]
    fn full_directory_extent() {
        let dir = tempfile::tempdir().unwrap();
        let mut fs = fresh(&dir);
        let root = Rc::clone(&fs.root);

        for index in 0..ENTRIES_PER_EXTENT {
            let entry = Dentry::detached(&format!("d{}", index), FileKind::Directory);
            fs.allocate_inode_for(&entry).unwrap();
            fs.attach_child(&root, entry).unwrap();
        }

        let extra = Dentry::detached("extra", FileKind::Directory);
        fs.allocate_inode_for(&extra).unwrap();
        let used = fs.data_map.used();
        assert!(matches!(fs.attach_child(&root, extra), Err(Error::NoSpace(_))));
        assert_eq!(fs.data_map.used(), used);
        assert_eq!(root.borrow().resident().unwrap().children.len(), ENTRIES_PER_EXTENT);
    }

    #[test]
    fn hydrate_replays_children_cold() {
        let dir = tempfile::tempdir().unwrap();
        let mut fs = fresh(&dir);
        fs.create_directory("/a").unwrap();
        fs.create_node("/a/one", FileKind::Regular).unwrap();
        fs.create_node("/a/two", FileKind::Regular).unwrap();
        fs.sync().unwrap();

        let (a, _) = fs.lookup("/a").unwrap();
        a.borrow_mut().inode = None;
        fs.hydrate(&a).unwrap();

        let a = a.borrow();
        let names: Vec<String> =
            a.resident().unwrap().children.iter().map(|child| child.borrow().name.clone()).collect();
        assert_eq!(names, vec!["two", "one"]);
        assert!(a.resident().unwrap().children.iter().all(|child| child.borrow().inode.is_none()));
    }

    #[test]
    fn cold_entry_without_inode() {
        let dir = tempfile::tempdir().unwrap();
        let mut fs = fresh(&dir);
        let entry = Dentry::detached("nothing", FileKind::Regular);
        assert!(matches!(fs.hydrate(&entry), Err(Error::Corrupted(_))));
    }
}
