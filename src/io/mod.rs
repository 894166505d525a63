use std::io;

use crate::driver::DeviceDriver;
use crate::util::align::{round_down, round_up};
use crate::util::error::Result;
use crate::util::serializable::{ByteSerializable, KnownSize};
use raw::{raw_read_sectors, raw_write_sectors};

mod raw;

/// Byte-addressed access to a device that only moves whole sectors.
pub(crate) struct IO<A: DeviceDriver> {
    device: A,
    sector_size: u64,
    size: u64,
}

/// Sector-aligned window covering a byte range.
struct Window {
    first_sector: u64,
    sectors: u64,
    bias: usize,
}

impl<A: DeviceDriver> IO<A> {
    pub fn new(device: A) -> IO<A> {
        let sector_size = device.get_sector_size() as u64;
        let size = device.get_size();
        IO { device, sector_size, size }
    }

    pub fn get_size(&self) -> u64 {
        self.size
    }

    pub fn get_sector_size(&self) -> usize {
        self.sector_size as usize
    }

    pub fn read(&self, offset: u64, length: usize) -> Result<Vec<u8>> {
        let window = self.window(offset, length)?;
        let buffer = raw_read_sectors(&self.device, window.first_sector, window.sectors)?;
        Ok(buffer[window.bias..window.bias + length].to_vec())
    }

    pub fn write(&mut self, offset: u64, data: &[u8]) -> Result<()> {
        let window = self.window(offset, data.len())?;
        let mut buffer = raw_read_sectors(&self.device, window.first_sector, window.sectors)?;
        buffer[window.bias..window.bias + data.len()].copy_from_slice(data);
        raw_write_sectors(&mut self.device, window.first_sector, &buffer)?;
        Ok(())
    }

    pub fn read_record<T: KnownSize>(&self, offset: u64) -> Result<T> {
        T::from_bytes(&self.read(offset, T::size_on_disk())?)
    }

    pub fn write_record<T: ByteSerializable>(&mut self, offset: u64, record: &T) -> Result<()> {
        self.write(offset, &record.to_bytes())
    }

    pub fn close(&mut self) -> Result<()> {
        self.device.close()?;
        Ok(())
    }

    fn window(&self, offset: u64, length: usize) -> Result<Window> {
        let start = round_down(offset, self.sector_size);
        let bias = offset - start;
        let span = round_up(bias + length as u64, self.sector_size);
        if start + span > self.size {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("{} bytes at offset {} run past the {} byte device", length, offset, self.size),
            )
            .into());
        }
        Ok(Window {
            first_sector: start / self.sector_size,
            sectors: span / self.sector_size,
            bias: bias as usize,
        })
    }
}
