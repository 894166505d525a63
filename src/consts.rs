use crate::util::align::round_up;

pub(crate) const MAGIC: u32 = 0x4578_7446;

pub(crate) const BLOCK_SIZE: usize = 1024;
pub(crate) const BLOCKS_PER_FILE: usize = 8;
pub(crate) const EXTENT_SIZE: usize = BLOCK_SIZE * BLOCKS_PER_FILE;
pub(crate) const MAX_NAME_LENGTH: usize = 128;

pub(crate) const INODE_RECORD_SIZE: usize = 32;
pub(crate) const DENTRY_RECORD_SIZE: usize = MAX_NAME_LENGTH + 12;
pub(crate) const ENTRIES_PER_EXTENT: usize = EXTENT_SIZE / DENTRY_RECORD_SIZE;

pub(crate) const MAX_INODES: u32 = 480;
pub(crate) const MAX_DATA_SLOTS: u32 = MAX_INODES * BLOCKS_PER_FILE as u32;

// Region layout used when formatting. Mounted images read these back from the superblock.
pub(crate) const SUPERBLOCK_OFFSET: u64 = 0;
pub(crate) const INODE_MAP_BLOCKS: u32 = 1;
pub(crate) const DATA_MAP_BLOCKS: u32 = 1;
pub(crate) const INODE_MAP_OFFSET: u64 = SUPERBLOCK_OFFSET + BLOCK_SIZE as u64;
pub(crate) const DATA_MAP_OFFSET: u64 = INODE_MAP_OFFSET + INODE_MAP_BLOCKS as u64 * BLOCK_SIZE as u64;
pub(crate) const INODE_TABLE_OFFSET: u64 = DATA_MAP_OFFSET + DATA_MAP_BLOCKS as u64 * BLOCK_SIZE as u64;
pub(crate) const DATA_REGION_OFFSET: u64 = INODE_TABLE_OFFSET
    + round_up(MAX_INODES as u64 * INODE_RECORD_SIZE as u64, BLOCK_SIZE as u64);

pub(crate) const DEFAULT_DEVICE_SIZE: u64 = 4 * 1024 * 1024;
pub(crate) const DEFAULT_SECTOR_SIZE: usize = 512;

pub(crate) const ROOT_INODE: InodeId = 0;

pub type InodeId = u32;
