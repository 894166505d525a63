use std::io;

pub(crate) mod file_drive;

/// A fixed-size device that only transfers whole sectors.
pub trait DeviceDriver {
    fn get_size(&self) -> u64;
    fn get_sector_size(&self) -> usize;
    fn read_sector(&self, index: u64) -> io::Result<Vec<u8>>;
    fn write_sector(&mut self, index: u64, data: &[u8]) -> io::Result<()>;
    /// Flushes outstanding writes. The driver is not used afterwards.
    fn close(&mut self) -> io::Result<()>;
}
