//! Kernel-facing side: FUSE requests are keyed by inode number, the engine by path.

mod filesystem;

pub use filesystem::FuseDriver;
