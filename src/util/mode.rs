use crate::structure::inode::FileKind;

pub type ModeBits = u32;

const FILE_TYPE_MASK: ModeBits = 0o170000;
const IS_DIR: ModeBits = 0o040000;
const IS_SYMLINK: ModeBits = 0o120000;

pub trait ModeBitsHelper {
    fn is_directory(&self) -> bool;
    fn is_symlink(&self) -> bool;
    fn file_kind(&self) -> FileKind;
}

impl ModeBitsHelper for ModeBits {
    fn is_directory(&self) -> bool {
        (self & FILE_TYPE_MASK) == IS_DIR
    }

    fn is_symlink(&self) -> bool {
        (self & FILE_TYPE_MASK) == IS_SYMLINK
    }

    // anything that is neither a directory nor a link is stored as a regular file
    fn file_kind(&self) -> FileKind {
        if self.is_directory() {
            FileKind::Directory
        } else if self.is_symlink() {
            FileKind::Symlink
        } else {
            FileKind::Regular
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_from_mode() {
        assert_eq!((0o040755 as ModeBits).file_kind(), FileKind::Directory);
        assert_eq!((0o100644 as ModeBits).file_kind(), FileKind::Regular);
        assert_eq!((0o120777 as ModeBits).file_kind(), FileKind::Symlink);
        assert_eq!((0o644 as ModeBits).file_kind(), FileKind::Regular);
    }
}
