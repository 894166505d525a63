use std::io;

use log::trace;

use crate::driver::DeviceDriver;

pub(crate) fn raw_read_sectors<A: DeviceDriver>(drive: &A, first: u64, count: u64) -> io::Result<Vec<u8>> {
    let mut buffer = Vec::with_capacity(count as usize * drive.get_sector_size());
    for i in first..first + count {
        trace!("reading sector {}", i);
        buffer.append(&mut drive.read_sector(i)?);
    }
    Ok(buffer)
}

pub(crate) fn raw_write_sectors<A: DeviceDriver>(drive: &mut A, first: u64, data: &[u8]) -> io::Result<()> {
    let sector_size = drive.get_sector_size();
    for (i, sector) in data.chunks(sector_size).enumerate() {
        let index = first + i as u64;
        trace!("writing sector {} - offset {} :: limit {}", index, i * sector_size, i * sector_size + sector.len());
        drive.write_sector(index, sector)?;
    }
    Ok(())
}
