use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use env_logger::Env;
use fuser::MountOption;
use log::{error, info};

use crate::consts::{DEFAULT_DEVICE_SIZE, DEFAULT_SECTOR_SIZE};
use crate::driver::file_drive::FileDrive;
use crate::fuse::FuseDriver;

mod consts;
mod driver;
mod fuse;
mod io;
mod ops;
mod structure;
mod util;

/// Mounts an extentfs image through FUSE.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Backing image, created zero-filled when missing
    #[arg(long)]
    device: PathBuf,

    /// Directory to mount on
    mountpoint: PathBuf,

    /// Size in bytes of a newly created image
    #[arg(long, default_value_t = DEFAULT_DEVICE_SIZE)]
    device_size: u64,

    /// Transfer unit of the device in bytes
    #[arg(long, default_value_t = DEFAULT_SECTOR_SIZE)]
    sector_size: usize,

    /// Let other users access the mount
    #[arg(long)]
    allow_other: bool,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let drive = match FileDrive::open_or_create(&args.device, args.device_size, args.sector_size) {
        Ok(drive) => drive,
        Err(e) => {
            error!("cannot open {}: {}", args.device.display(), e);
            return ExitCode::FAILURE;
        }
    };

    let mut options = vec![MountOption::FSName("extentfs".to_string()), MountOption::RW];
    if args.allow_other {
        options.push(MountOption::AllowOther);
    }

    info!("mounting {} on {}", args.device.display(), args.mountpoint.display());
    match fuser::mount2(FuseDriver::new(drive), &args.mountpoint, &options) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("fuse session ended with an error: {}", e);
            ExitCode::FAILURE
        }
    }
}
