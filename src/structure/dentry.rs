use crate::consts::{InodeId, DENTRY_RECORD_SIZE, MAX_NAME_LENGTH};
use crate::structure::inode::FileKind;
use crate::util::error::{Error, Result};
use crate::util::serializable::{expect_len, le_u32, ByteSerializable, KnownSize};

/// Directory entry as stored in its parent's extent. The name is NUL padded.
#[derive(PartialEq, Debug, Clone)]
pub struct DiskDentry {
    pub name: String,
    pub kind: FileKind,
    pub ino: InodeId,
    pub valid: bool,
}

impl KnownSize for DiskDentry {
    fn size_on_disk() -> usize {
        DENTRY_RECORD_SIZE
    }
}

impl ByteSerializable for DiskDentry {
    fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = vec![0u8; MAX_NAME_LENGTH];
        let name = self.name.as_bytes();
        let length = name.len().min(MAX_NAME_LENGTH);
        bytes[..length].copy_from_slice(&name[..length]);
        bytes.extend_from_slice(&(self.kind as u32).to_le_bytes());
        bytes.extend_from_slice(&self.ino.to_le_bytes());
        bytes.extend_from_slice(&(self.valid as u32).to_le_bytes());
        bytes
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self> {
        expect_len(bytes, DENTRY_RECORD_SIZE, "dentry")?;
        let raw_name = &bytes[..MAX_NAME_LENGTH];
        let end = raw_name.iter().position(|b| *b == 0).unwrap_or(MAX_NAME_LENGTH);
        let name = std::str::from_utf8(&raw_name[..end])
            .map_err(|e| Error::Corrupted(format!("dentry name is not utf-8: {}", e)))?;
        if name.is_empty() {
            return Err(Error::Corrupted("dentry without a name".to_string()));
        }

        Ok(DiskDentry {
            name: name.to_string(),
            kind: FileKind::from_raw(le_u32(bytes, MAX_NAME_LENGTH))?,
            ino: le_u32(bytes, MAX_NAME_LENGTH + 4),
            valid: le_u32(bytes, MAX_NAME_LENGTH + 8) != 0,
        })
    }
}
