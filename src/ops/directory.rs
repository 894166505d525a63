use std::rc::Rc;

use log::debug;

use crate::consts::{InodeId, EXTENT_SIZE, MAX_NAME_LENGTH};
use crate::driver::DeviceDriver;
use crate::ops::lookup::{depth, entry_depth, file_name};
use crate::ops::meta::Attributes;
use crate::ops::node::Dentry;
use crate::ops::ExtentFS;
use crate::structure::inode::FileKind;
use crate::util::error::{Error, Result};

/// One row of a directory listing.
#[derive(Debug, PartialEq, Clone)]
pub struct DirEntry {
    pub name: String,
    pub kind: FileKind,
    pub ino: InodeId,
}

impl<D: DeviceDriver> ExtentFS<D> {
    /// Creates `path` below its existing parent directory.
    pub fn create_node(&mut self, path: &str, kind: FileKind) -> Result<Attributes> {
        self.ensure_mounted()?;
        let (parent, found) = self.lookup(path)?;
        if found {
            return Err(Error::AlreadyExists(path.to_string()));
        }
        if parent.borrow().kind != FileKind::Directory {
            return Err(Error::Unsupported(format!("{} lies below {}", path, parent.borrow().name)));
        }
        if entry_depth(&parent) + 1 != depth(path)? {
            return Err(Error::NotFound(path.to_string()));
        }
        let name = file_name(path)?;
        if name.len() > MAX_NAME_LENGTH {
            return Err(Error::NameTooLong(name.to_string()));
        }

        let entry = Dentry::detached(name, kind);
        let ino = self.allocate_inode_for(&entry)?;
        self.attach_child(&parent, Rc::clone(&entry))?;
        debug!("created {:?} {} as inode {}", kind, path, ino);
        self.attributes_of(&entry)
    }

    pub fn create_directory(&mut self, path: &str) -> Result<Attributes> {
        self.create_node(path, FileKind::Directory)
    }

    /// Creates a symlink whose extent holds `target`.
    pub fn create_symlink(&mut self, path: &str, target: &str) -> Result<Attributes> {
        if target.len() > EXTENT_SIZE {
            return Err(Error::NoSpace("symlink target"));
        }
        self.create_node(path, FileKind::Symlink)?;
        self.write(path, target.as_bytes(), 0)?;
        self.get_attributes(path)
    }

    /// Returns the `index`-th entry of the directory at `path`, or `None` past the end.
    pub fn list_directory(&mut self, path: &str, index: usize) -> Result<Option<DirEntry>> {
        self.ensure_mounted()?;
        let (entry, found) = self.lookup(path)?;
        if !found {
            return Err(Error::NotFound(path.to_string()));
        }

        let dentry = entry.borrow();
        if dentry.kind != FileKind::Directory {
            return Err(Error::NotADirectory(path.to_string()));
        }
        let listed = match dentry.resident()?.children.get(index) {
            Some(child) => {
                let child = child.borrow();
                Some(DirEntry { name: child.name.clone(), kind: child.kind, ino: child.ino()? })
            }
            None => None,
        };
        Ok(listed)
    }
}

#[cfg(test)]
mod tests {
    use crate::consts::{EXTENT_SIZE, MAX_NAME_LENGTH};
    use crate::ops::tests::fresh;
    use crate::structure::inode::FileKind;
    use crate::util::error::Error;

    #[test]
    fn create_and_list() {
        let dir = tempfile::tempdir().unwrap();
        let mut fs = fresh(&dir);

        let a = fs.create_directory("/a").unwrap();
        assert_eq!(a.ino, 1);
        assert_eq!(a.kind, FileKind::Directory);
        fs.create_node("/a/x", FileKind::Regular).unwrap();
        fs.create_directory("/a/y").unwrap();

        let first = fs.list_directory("/a", 0).unwrap().unwrap();
        let second = fs.list_directory("/a", 1).unwrap().unwrap();
        assert_eq!((first.name.as_str(), first.kind), ("y", FileKind::Directory));
        assert_eq!((second.name.as_str(), second.kind, second.ino), ("x", FileKind::Regular, 2));
        assert_eq!(fs.list_directory("/a", 2).unwrap(), None);
        assert_eq!(fs.list_directory("/a/y", 0).unwrap(), None);
    }

    #[test]
    fn listing_a_file_or_missing_path() {
        let dir = tempfile::tempdir().unwrap();
        let mut fs = fresh(&dir);
        fs.create_node("/f", FileKind::Regular).unwrap();

        assert!(matches!(fs.list_directory("/f", 0), Err(Error::NotADirectory(_))));
        assert!(matches!(fs.list_directory("/nope", 0), Err(Error::NotFound(_))));
    }

    #[test]
    fn creation_below_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut fs = fresh(&dir);
        fs.create_node("/f", FileKind::Regular).unwrap();

        assert!(matches!(fs.create_directory("/f/x"), Err(Error::Unsupported(_))));
    }

    #[test]
    fn name_length_limit() {
        let dir = tempfile::tempdir().unwrap();
        let mut fs = fresh(&dir);

        let longest = format!("/{}", "a".repeat(MAX_NAME_LENGTH));
        fs.create_node(&longest, FileKind::Regular).unwrap();
        let too_long = format!("/{}", "b".repeat(MAX_NAME_LENGTH + 1));
        assert!(matches!(fs.create_node(&too_long, FileKind::Regular), Err(Error::NameTooLong(_))));
        assert!(matches!(fs.create_directory("/"), Err(Error::AlreadyExists(_))));
    }

    #[test]
    fn symlink_target() {
        let dir = tempfile::tempdir().unwrap();
        let mut fs = fresh(&dir);

        let attributes = fs.create_symlink("/link", "/some/where").unwrap();
        assert_eq!(attributes.kind, FileKind::Symlink);
        assert_eq!(attributes.size, 11);
        assert_eq!(fs.read_link("/link").unwrap(), "/some/where");

        let huge = "t".repeat(EXTENT_SIZE + 1);
        assert!(matches!(fs.create_symlink("/big", &huge), Err(Error::NoSpace(_))));
        assert!(!fs.lookup("/big").unwrap().1);
    }
}
