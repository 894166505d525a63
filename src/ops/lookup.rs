use std::rc::Rc;

use log::debug;

use crate::driver::DeviceDriver;
use crate::ops::node::DentryRef;
use crate::ops::ExtentFS;
use crate::structure::inode::FileKind;
use crate::util::error::{Error, Result};

enum Step {
    Stop,
    Found(DentryRef),
    Descend(DentryRef),
}

/// Non-empty components of an absolute path.
pub(crate) fn components(path: &str) -> Result<Vec<&str>> {
    if !path.starts_with('/') {
        return Err(Error::Invalid(format!("{} is not an absolute path", path)));
    }
    Ok(path.split('/').filter(|component| !component.is_empty()).collect())
}

pub(crate) fn depth(path: &str) -> Result<usize> {
    Ok(components(path)?.len())
}

pub(crate) fn file_name(path: &str) -> Result<&str> {
    components(path)?
        .pop()
        .ok_or_else(|| Error::Invalid(format!("{} has no final component", path)))
}

/// Number of ancestors between `entry` and the root.
pub(crate) fn entry_depth(entry: &DentryRef) -> usize {
    let mut depth = 0;
    let mut parent = entry.borrow().parent.upgrade();
    while let Some(current) = parent {
        depth += 1;
        parent = current.borrow().parent.upgrade();
    }
    depth
}

fn next_step(cursor: &DentryRef, name: &str, last: bool) -> Result<Step> {
    let dentry = cursor.borrow();
    if dentry.kind != FileKind::Directory {
        return Ok(Step::Stop);
    }
    let step = match dentry.resident()?.child(name) {
        None => Step::Stop,
        Some(child) if last => Step::Found(child),
        Some(child) => Step::Descend(child),
    };
    Ok(step)
}

impl<D: DeviceDriver> ExtentFS<D> {
    /// Walks `path` from the root. On a miss the deepest entry reached is
    /// returned with `false`; it is the would-be parent when the miss is on
    /// the final component.
    pub(crate) fn lookup(&mut self, path: &str) -> Result<(DentryRef, bool)> {
        let components = components(path)?;
        let mut cursor = Rc::clone(&self.root);
        let mut found = true;

        for (index, name) in components.iter().enumerate() {
            self.hydrate_if_cold(&cursor)?;
            match next_step(&cursor, name, index + 1 == components.len())? {
                Step::Stop => {
                    debug!("lookup of {} stopped at {}", path, cursor.borrow().name);
                    found = false;
                    break;
                }
                Step::Found(child) => {
                    cursor = child;
                    break;
                }
                Step::Descend(child) => cursor = child,
            }
        }

        self.hydrate_if_cold(&cursor)?;
        Ok((cursor, found))
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use crate::ops::tests::fresh;
    use crate::structure::inode::FileKind;
    use crate::util::error::Error;

    use super::*;

    #[test]
    fn path_helpers() {
        assert_eq!(depth("/").unwrap(), 0);
        assert_eq!(depth("/a/b").unwrap(), 2);
        assert_eq!(depth("//a///b/").unwrap(), 2);
        assert_eq!(file_name("/a/bc").unwrap(), "bc");
        assert!(matches!(file_name("/"), Err(Error::Invalid(_))));
        assert!(matches!(components("a/b"), Err(Error::Invalid(_))));
    }

    #[test]
    fn root_resolves() {
        let dir = tempfile::tempdir().unwrap();
        let mut fs = fresh(&dir);
        let (entry, found) = fs.lookup("/").unwrap();
        assert!(found);
        assert!(Rc::ptr_eq(&entry, &fs.root));
        assert_eq!(entry_depth(&entry), 0);
    }

    #[test]
    fn resolves_built_tree() {
        let dir = tempfile::tempdir().unwrap();
        let mut fs = fresh(&dir);
        let paths = ["/a", "/a/b", "/a/b/c", "/a/d", "/e"];
        for path in paths {
            fs.create_directory(path).unwrap();
        }
        fs.create_node("/a/b/c/leaf", FileKind::Regular).unwrap();

        for path in paths.iter().chain(["/a/b/c/leaf"].iter()) {
            let (entry, found) = fs.lookup(path).unwrap();
            assert!(found, "{} should resolve", path);
            assert_eq!(entry.borrow().name, file_name(path).unwrap());
            assert_eq!(entry_depth(&entry), depth(path).unwrap());
        }

        // one-component extension of a leaf returns the leaf
        let (entry, found) = fs.lookup("/a/b/c/leaf/more").unwrap();
        assert!(!found);
        assert_eq!(entry.borrow().name, "leaf");

        let (entry, found) = fs.lookup("/a/d/missing").unwrap();
        assert!(!found);
        assert_eq!(entry.borrow().name, "d");
    }

    #[test]
    fn names_match_exactly() {
        let dir = tempfile::tempdir().unwrap();
        let mut fs = fresh(&dir);
        fs.create_directory("/abc").unwrap();

        let (entry, found) = fs.lookup("/ab").unwrap();
        assert!(!found);
        assert!(Rc::ptr_eq(&entry, &fs.root));
        assert!(!fs.lookup("/abcd").unwrap().1);
    }
}
