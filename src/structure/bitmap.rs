use crate::consts::BLOCK_SIZE;
use crate::driver::DeviceDriver;
use crate::io::IO;
use crate::util::error::{Error, Result};

/// First-fit slot allocator backed by a bitmap region of the device.
pub struct Bitmap {
    name: &'static str,
    offset: u64,
    capacity: u32,
    data: Vec<u8>,
}

impl Bitmap {
    pub fn new(name: &'static str, offset: u64, blocks: u32, capacity: u32) -> Bitmap {
        let data = vec![0; blocks as usize * BLOCK_SIZE];
        let capacity = capacity.min(data.len() as u32 * 8);
        Bitmap { name, offset, capacity, data }
    }

    pub fn read<A: DeviceDriver>(io: &IO<A>, name: &'static str, offset: u64, blocks: u32, capacity: u32) -> Result<Bitmap> {
        let mut map = Bitmap::new(name, offset, blocks, capacity);
        map.data = io.read(offset, map.data.len())?;
        Ok(map)
    }

    pub fn write<A: DeviceDriver>(&self, io: &mut IO<A>) -> Result<()> {
        io.write(self.offset, &self.data)
    }

    /// Claims the lowest free index.
    pub fn allocate(&mut self) -> Result<u32> {
        for index in 0..self.capacity.min(self.data.len() as u32 * 8) {
            if self.is_free(index) {
                self.mark_used(index);
                return Ok(index);
            }
        }
        Err(Error::NoSpace(self.name))
    }

    pub fn clear(&mut self) {
        self.data.iter_mut().for_each(|byte| *byte = 0);
    }

    pub fn release(&mut self) {
        self.data = Vec::new();
    }

    pub fn used(&self) -> u32 {
        (0..self.capacity.min(self.data.len() as u32 * 8))
            .filter(|index| !self.is_free(*index))
            .count() as u32
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    fn is_free(&self, index: u32) -> bool {
        self.data[(index / 8) as usize] & (1 << (index % 8)) == 0
    }

    fn mark_used(&mut self, index: u32) {
        self.data[(index / 8) as usize] |= 1 << (index % 8);
    }
}
