use crate::consts::{
    InodeId, BLOCK_SIZE, DATA_MAP_BLOCKS, DATA_MAP_OFFSET, DATA_REGION_OFFSET, EXTENT_SIZE, INODE_MAP_BLOCKS,
    INODE_MAP_OFFSET, INODE_RECORD_SIZE, INODE_TABLE_OFFSET, MAGIC, MAX_DATA_SLOTS, MAX_INODES, SUPERBLOCK_OFFSET,
};
use crate::driver::DeviceDriver;
use crate::io::IO;
use crate::util::error::{Error, Result};
use crate::util::serializable::{expect_len, le_u32, le_u64, ByteSerializable, KnownSize};

#[derive(Debug, PartialEq, Clone)]
pub struct SuperBlock {
    pub magic: u32,
    pub disk_size: u64,
    pub io_size: u32,
    pub max_inodes: u32,
    pub max_data: u32,
    pub inode_map_blocks: u32,
    pub inode_map_offset: u32,
    pub data_map_blocks: u32,
    pub data_map_offset: u32,
    pub inode_table_offset: u32,
    pub data_offset: u32,
    /// Bytes of directory storage claimed from the data bitmap.
    pub usage: u32,
}

impl SuperBlock {
    /// Layout for a device that has never been formatted.
    pub fn new(disk_size: u64, io_size: usize) -> SuperBlock {
        SuperBlock {
            magic: MAGIC,
            disk_size,
            io_size: io_size as u32,
            max_inodes: MAX_INODES,
            max_data: MAX_DATA_SLOTS,
            inode_map_blocks: INODE_MAP_BLOCKS,
            inode_map_offset: INODE_MAP_OFFSET as u32,
            data_map_blocks: DATA_MAP_BLOCKS,
            data_map_offset: DATA_MAP_OFFSET as u32,
            inode_table_offset: INODE_TABLE_OFFSET as u32,
            data_offset: DATA_REGION_OFFSET as u32,
            usage: 0,
        }
    }

    /// Returns `None` when the device does not carry our magic.
    pub fn read<A: DeviceDriver>(io: &IO<A>) -> Result<Option<SuperBlock>> {
        let raw = io.read(SUPERBLOCK_OFFSET, SuperBlock::size_on_disk())?;
        if le_u32(&raw, 0) != MAGIC {
            return Ok(None);
        }

        let mut superblock = SuperBlock::from_bytes(&raw)?;
        if superblock.layout_end() > io.get_size() {
            return Err(Error::Corrupted(format!(
                "layout ends at {} but the device holds {} bytes",
                superblock.layout_end(),
                io.get_size()
            )));
        }
        superblock.disk_size = io.get_size();
        superblock.io_size = io.get_sector_size() as u32;
        Ok(Some(superblock))
    }

    pub fn write<A: DeviceDriver>(&self, io: &mut IO<A>) -> Result<()> {
        io.write_record(SUPERBLOCK_OFFSET, self)
    }

    pub fn inode_offset(&self, ino: InodeId) -> u64 {
        self.inode_table_offset as u64 + ino as u64 * INODE_RECORD_SIZE as u64
    }

    pub fn extent_offset(&self, ino: InodeId) -> u64 {
        self.data_offset as u64 + ino as u64 * EXTENT_SIZE as u64
    }

    pub fn layout_end(&self) -> u64 {
        self.extent_offset(self.max_inodes)
    }

    pub fn block_count(&self) -> u64 {
        self.disk_size / BLOCK_SIZE as u64
    }
}

impl KnownSize for SuperBlock {
    fn size_on_disk() -> usize {
        52
    }
}

impl ByteSerializable for SuperBlock {
    fn to_bytes(&self) -> Vec<u8> {
        let mut buffer = Vec::with_capacity(SuperBlock::size_on_disk());
        buffer.extend_from_slice(&self.magic.to_le_bytes());
        buffer.extend_from_slice(&self.disk_size.to_le_bytes());
        for field in [
            self.io_size,
            self.max_inodes,
            self.max_data,
            self.inode_map_blocks,
            self.inode_map_offset,
            self.data_map_blocks,
            self.data_map_offset,
            self.inode_table_offset,
            self.data_offset,
            self.usage,
        ] {
            buffer.extend_from_slice(&field.to_le_bytes());
        }
        buffer
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self> {
        expect_len(bytes, SuperBlock::size_on_disk(), "superblock")?;
        Ok(SuperBlock {
            magic: le_u32(bytes, 0),
            disk_size: le_u64(bytes, 4),
            io_size: le_u32(bytes, 12),
            max_inodes: le_u32(bytes, 16),
            max_data: le_u32(bytes, 20),
            inode_map_blocks: le_u32(bytes, 24),
            inode_map_offset: le_u32(bytes, 28),
            data_map_blocks: le_u32(bytes, 32),
            data_map_offset: le_u32(bytes, 36),
            inode_table_offset: le_u32(bytes, 40),
            data_offset: le_u32(bytes, 44),
            usage: le_u32(bytes, 48),
        })
    }
}
