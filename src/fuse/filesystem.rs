use std::collections::HashMap;
use std::ffi::OsStr;
use std::path::Path;
use std::time::{Duration, SystemTime};

use fuser::{
    FileAttr, FileType, Filesystem, KernelConfig, ReplyAttr, ReplyData, ReplyDirectory, ReplyEmpty, ReplyEntry,
    ReplyOpen, ReplyWrite, Request, TimeOrNow, FUSE_ROOT_ID,
};
use libc::c_int;
use log::{debug, error, warn};

use crate::consts::{InodeId, BLOCK_SIZE};
use crate::driver::DeviceDriver;
use crate::ops::directory::DirEntry;
use crate::ops::meta::Attributes;
use crate::ops::ExtentFS;
use crate::structure::inode::FileKind;
use crate::util::error::{Error, Result};
use crate::util::mode::{ModeBits, ModeBitsHelper};

const TTL: Duration = Duration::from_secs(1);

/// Serves an [`ExtentFS`] over FUSE. The device is mounted on `init` and
/// written back on `destroy`.
pub struct FuseDriver<D: DeviceDriver> {
    device: Option<D>,
    fs: Option<ExtentFS<D>>,
    paths: HashMap<u64, String>,
    owner: (u32, u32),
}

fn fuse_ino(ino: InodeId) -> u64 {
    ino as u64 + FUSE_ROOT_ID
}

fn join(parent: &str, name: &str) -> String {
    if parent == "/" {
        format!("/{}", name)
    } else {
        format!("{}/{}", parent, name)
    }
}

fn file_type(kind: FileKind) -> FileType {
    match kind {
        FileKind::Regular => FileType::RegularFile,
        FileKind::Directory => FileType::Directory,
        FileKind::Symlink => FileType::Symlink,
    }
}

fn utf8<'a>(name: &'a OsStr) -> Result<&'a str> {
    name.to_str().ok_or_else(|| Error::Invalid(format!("{:?} is not valid utf-8", name)))
}

fn failure(operation: &str, e: Error) -> c_int {
    let errno = e.errno();
    if errno == libc::EIO {
        warn!("{} failed: {}", operation, e);
    } else {
        debug!("{} failed: {}", operation, e);
    }
    errno
}

impl<D: DeviceDriver> FuseDriver<D> {
    pub fn new(device: D) -> FuseDriver<D> {
        let mut paths = HashMap::new();
        paths.insert(FUSE_ROOT_ID, "/".to_string());
        FuseDriver { device: Some(device), fs: None, paths, owner: (0, 0) }
    }

    fn engine(&mut self) -> Result<&mut ExtentFS<D>> {
        self.fs.as_mut().ok_or(Error::NotMounted)
    }

    fn path_of(&self, ino: u64) -> Result<String> {
        self.paths.get(&ino).cloned().ok_or_else(|| Error::NotFound(format!("inode {}", ino)))
    }

    fn child_path(&self, parent: u64, name: &OsStr) -> Result<String> {
        Ok(join(&self.path_of(parent)?, utf8(name)?))
    }

    fn to_file_attr(&self, attributes: &Attributes) -> FileAttr {
        let now = SystemTime::now();
        let perm = match attributes.kind {
            FileKind::Directory => 0o755,
            FileKind::Regular => 0o644,
            FileKind::Symlink => 0o777,
        };
        FileAttr {
            ino: fuse_ino(attributes.ino),
            size: attributes.size,
            blocks: attributes.blocks,
            atime: now,
            mtime: now,
            ctime: now,
            crtime: now,
            kind: file_type(attributes.kind),
            perm,
            nlink: attributes.nlink,
            uid: self.owner.0,
            gid: self.owner.1,
            rdev: 0,
            blksize: BLOCK_SIZE as u32,
            flags: 0,
        }
    }

    fn remember(&mut self, path: String, attributes: &Attributes) -> FileAttr {
        self.paths.insert(fuse_ino(attributes.ino), path);
        self.to_file_attr(attributes)
    }

    fn resolve(&mut self, parent: u64, name: &OsStr) -> Result<FileAttr> {
        let path = self.child_path(parent, name)?;
        let attributes = self.engine()?.get_attributes(&path)?;
        Ok(self.remember(path, &attributes))
    }

    fn attributes(&mut self, ino: u64) -> Result<FileAttr> {
        let path = self.path_of(ino)?;
        let attributes = self.engine()?.get_attributes(&path)?;
        Ok(self.to_file_attr(&attributes))
    }

    fn create<F>(&mut self, parent: u64, name: &OsStr, create: F) -> Result<FileAttr>
    where
        F: FnOnce(&mut ExtentFS<D>, &str) -> Result<Attributes>,
    {
        let path = self.child_path(parent, name)?;
        let attributes = create(self.engine()?, &path)?;
        Ok(self.remember(path, &attributes))
    }

    fn update(&mut self, ino: u64, size: Option<u64>, touched: bool) -> Result<FileAttr> {
        let path = self.path_of(ino)?;
        let fs = self.engine()?;
        if let Some(size) = size {
            fs.truncate(&path, size)?;
        }
        if touched {
            fs.touch_time(&path)?;
        }
        let attributes = fs.get_attributes(&path)?;
        Ok(self.to_file_attr(&attributes))
    }

    /// Lists `ino` from child `index` and records every path handed out.
    fn next_child(&mut self, ino: u64, index: usize) -> Result<Option<DirEntry>> {
        let path = self.path_of(ino)?;
        let listed = self.engine()?.list_directory(&path, index)?;
        if let Some(entry) = &listed {
            self.paths.insert(fuse_ino(entry.ino), join(&path, &entry.name));
        }
        Ok(listed)
    }

    fn read_at(&mut self, ino: u64, offset: i64, size: u32) -> Result<Vec<u8>> {
        let path = self.path_of(ino)?;
        let offset = u64::try_from(offset).map_err(|_| Error::Invalid(format!("negative offset {}", offset)))?;
        self.engine()?.read(&path, size as usize, offset)
    }

    fn write_at(&mut self, ino: u64, offset: i64, data: &[u8]) -> Result<usize> {
        let path = self.path_of(ino)?;
        let offset = u64::try_from(offset).map_err(|_| Error::Invalid(format!("negative offset {}", offset)))?;
        self.engine()?.write(&path, data, offset)
    }

    fn with_path<T, F>(&mut self, ino: u64, operation: F) -> Result<T>
    where
        F: FnOnce(&mut ExtentFS<D>, &str) -> Result<T>,
    {
        let path = self.path_of(ino)?;
        operation(self.engine()?, &path)
    }

    fn with_child_path<F>(&mut self, parent: u64, name: &OsStr, operation: F) -> Result<()>
    where
        F: FnOnce(&mut ExtentFS<D>, &str) -> Result<()>,
    {
        let path = self.child_path(parent, name)?;
        operation(self.engine()?, &path)
    }
}

impl<D: DeviceDriver> Filesystem for FuseDriver<D> {
    fn init(&mut self, req: &Request<'_>, _config: &mut KernelConfig) -> std::result::Result<(), c_int> {
        let device = self.device.take().ok_or(libc::EIO)?;
        self.owner = (req.uid(), req.gid());
        match ExtentFS::mount(device) {
            Ok(fs) => {
                self.fs = Some(fs);
                Ok(())
            }
            Err(e) => {
                error!("mount failed: {}", e);
                Err(e.errno())
            }
        }
    }

    fn destroy(&mut self) {
        if let Some(fs) = self.fs.as_mut() {
            if let Err(e) = fs.unmount() {
                error!("unmount failed: {}", e);
            }
        }
    }

    fn lookup(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEntry) {
        match self.resolve(parent, name) {
            Ok(attr) => reply.entry(&TTL, &attr, 0),
            Err(e) => reply.error(failure("lookup", e)),
        }
    }

    fn getattr(&mut self, _req: &Request<'_>, ino: u64, reply: ReplyAttr) {
        match self.attributes(ino) {
            Ok(attr) => reply.attr(&TTL, &attr),
            Err(e) => reply.error(failure("getattr", e)),
        }
    }

    fn setattr(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _mode: Option<u32>,
        _uid: Option<u32>,
        _gid: Option<u32>,
        size: Option<u64>,
        atime: Option<TimeOrNow>,
        mtime: Option<TimeOrNow>,
        _ctime: Option<SystemTime>,
        _fh: Option<u64>,
        _crtime: Option<SystemTime>,
        _chgtime: Option<SystemTime>,
        _bkuptime: Option<SystemTime>,
        _flags: Option<u32>,
        reply: ReplyAttr,
    ) {
        match self.update(ino, size, atime.is_some() || mtime.is_some()) {
            Ok(attr) => reply.attr(&TTL, &attr),
            Err(e) => reply.error(failure("setattr", e)),
        }
    }

    fn readlink(&mut self, _req: &Request<'_>, ino: u64, reply: ReplyData) {
        match self.with_path(ino, |fs, path| fs.read_link(path)) {
            Ok(target) => reply.data(target.as_bytes()),
            Err(e) => reply.error(failure("readlink", e)),
        }
    }

    fn mknod(
        &mut self,
        _req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        mode: ModeBits,
        _umask: u32,
        _rdev: u32,
        reply: ReplyEntry,
    ) {
        let kind = mode.file_kind();
        match self.create(parent, name, |fs, path| fs.create_node(path, kind)) {
            Ok(attr) => reply.entry(&TTL, &attr, 0),
            Err(e) => reply.error(failure("mknod", e)),
        }
    }

    fn mkdir(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, _mode: ModeBits, _umask: u32, reply: ReplyEntry) {
        match self.create(parent, name, |fs, path| fs.create_directory(path)) {
            Ok(attr) => reply.entry(&TTL, &attr, 0),
            Err(e) => reply.error(failure("mkdir", e)),
        }
    }

    fn unlink(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEmpty) {
        match self.with_child_path(parent, name, |fs, path| fs.delete_file(path)) {
            Ok(()) => reply.ok(),
            Err(e) => reply.error(failure("unlink", e)),
        }
    }

    fn rmdir(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEmpty) {
        match self.with_child_path(parent, name, |fs, path| fs.delete_directory(path)) {
            Ok(()) => reply.ok(),
            Err(e) => reply.error(failure("rmdir", e)),
        }
    }

    fn symlink(&mut self, _req: &Request<'_>, parent: u64, link_name: &OsStr, target: &Path, reply: ReplyEntry) {
        let created = utf8(target.as_os_str())
            .and_then(|target| self.create(parent, link_name, |fs, path| fs.create_symlink(path, target)));
        match created {
            Ok(attr) => reply.entry(&TTL, &attr, 0),
            Err(e) => reply.error(failure("symlink", e)),
        }
    }

    fn rename(
        &mut self,
        _req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        newparent: u64,
        newname: &OsStr,
        _flags: u32,
        reply: ReplyEmpty,
    ) {
        let renamed = self
            .child_path(newparent, newname)
            .and_then(|to| self.with_child_path(parent, name, |fs, from| fs.rename(from, &to)));
        match renamed {
            Ok(()) => reply.ok(),
            Err(e) => reply.error(failure("rename", e)),
        }
    }

    fn open(&mut self, _req: &Request<'_>, ino: u64, _flags: i32, reply: ReplyOpen) {
        match self.with_path(ino, |fs, path| fs.open(path)) {
            Ok(()) => reply.opened(0, 0),
            Err(e) => reply.error(failure("open", e)),
        }
    }

    fn read(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        size: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyData,
    ) {
        match self.read_at(ino, offset, size) {
            Ok(data) => reply.data(&data),
            Err(e) => reply.error(failure("read", e)),
        }
    }

    fn write(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        data: &[u8],
        _write_flags: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyWrite,
    ) {
        match self.write_at(ino, offset, data) {
            Ok(written) => reply.written(written as u32),
            Err(e) => reply.error(failure("write", e)),
        }
    }

    fn flush(&mut self, _req: &Request<'_>, _ino: u64, _fh: u64, _lock_owner: u64, reply: ReplyEmpty) {
        match self.engine().and_then(|fs| fs.sync()) {
            Ok(()) => reply.ok(),
            Err(e) => reply.error(failure("flush", e)),
        }
    }

    fn fsync(&mut self, _req: &Request<'_>, _ino: u64, _fh: u64, _datasync: bool, reply: ReplyEmpty) {
        match self.engine().and_then(|fs| fs.sync()) {
            Ok(()) => reply.ok(),
            Err(e) => reply.error(failure("fsync", e)),
        }
    }

    fn opendir(&mut self, _req: &Request<'_>, ino: u64, _flags: i32, reply: ReplyOpen) {
        match self.with_path(ino, |fs, path| fs.open_directory(path)) {
            Ok(()) => reply.opened(0, 0),
            Err(e) => reply.error(failure("opendir", e)),
        }
    }

    fn readdir(&mut self, _req: &Request<'_>, ino: u64, _fh: u64, offset: i64, mut reply: ReplyDirectory) {
        // offsets: 1 after ".", 2 after "..", k + 3 after child k
        if offset < 1 && reply.add(ino, 1, FileType::Directory, ".") {
            reply.ok();
            return;
        }
        if offset < 2 && reply.add(ino, 2, FileType::Directory, "..") {
            reply.ok();
            return;
        }

        let mut index = (offset - 2).max(0) as usize;
        loop {
            match self.next_child(ino, index) {
                Ok(Some(entry)) => {
                    let full = reply.add(fuse_ino(entry.ino), index as i64 + 3, file_type(entry.kind), &entry.name);
                    if full {
                        break;
                    }
                    index += 1;
                }
                Ok(None) => break,
                Err(e) => {
                    reply.error(failure("readdir", e));
                    return;
                }
            }
        }
        reply.ok();
    }

    fn access(&mut self, _req: &Request<'_>, ino: u64, mask: i32, reply: ReplyEmpty) {
        match self.with_path(ino, |fs, path| fs.check_access(path, mask)) {
            Ok(()) => reply.ok(),
            Err(e) => reply.error(failure("access", e)),
        }
    }
}
