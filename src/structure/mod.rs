//! On-disk records and the two slot bitmaps.

pub(crate) mod bitmap;
pub(crate) mod dentry;
pub(crate) mod inode;
pub(crate) mod superblock;
