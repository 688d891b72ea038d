//! Directory entry records in the kernel's `struct dirent` layout.
//!
//! ```text
//! offset  size  field
//!      0     8  d_fileno
//!      8     8  d_off      (cursor just past this record)
//!     16     2  d_reclen
//!     18     1  d_type
//!     19     1  pad
//!     20     2  d_namlen
//!     22     2  pad
//!     24     n  d_name, NUL-terminated, zero-padded to 8 bytes
//! ```
//!
//! All integers are little-endian.

use crate::error::{FsError, FsResult};
use sffs_provider::FileType;

/// Size of the fixed part of a record.
pub const DIRENT_HEADER_LEN: usize = 24;

/// Records are padded to this alignment.
pub const DIRENT_ALIGN: usize = 8;

/// Unknown type.
pub const DT_UNKNOWN: u8 = 0;
/// Named pipe.
pub const DT_FIFO: u8 = 1;
/// Character device.
pub const DT_CHR: u8 = 2;
/// Directory.
pub const DT_DIR: u8 = 4;
/// Block device.
pub const DT_BLK: u8 = 6;
/// Regular file.
pub const DT_REG: u8 = 8;
/// Symbolic link.
pub const DT_LNK: u8 = 10;
/// Socket.
pub const DT_SOCK: u8 = 12;

/// Encoded length of a record whose name is `name_len` bytes.
#[inline]
pub const fn record_len(name_len: usize) -> usize {
    (DIRENT_HEADER_LEN + name_len + 1 + DIRENT_ALIGN - 1) & !(DIRENT_ALIGN - 1)
}

/// Maps a file type to its `d_type` value.
pub fn dirent_type(kind: FileType) -> u8 {
    match kind {
        FileType::Regular => DT_REG,
        FileType::Directory => DT_DIR,
        FileType::Symlink => DT_LNK,
        FileType::Fifo => DT_FIFO,
        FileType::CharDevice => DT_CHR,
        FileType::BlockDevice => DT_BLK,
        FileType::Socket => DT_SOCK,
        FileType::Unknown => DT_UNKNOWN,
    }
}

/// Maps a `d_type` value back to a file type.
pub fn file_type_of(d_type: u8) -> FileType {
    match d_type {
        DT_REG => FileType::Regular,
        DT_DIR => FileType::Directory,
        DT_LNK => FileType::Symlink,
        DT_FIFO => FileType::Fifo,
        DT_CHR => FileType::CharDevice,
        DT_BLK => FileType::BlockDevice,
        DT_SOCK => FileType::Socket,
        _ => FileType::Unknown,
    }
}

/// One decoded directory entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dirent {
    /// Node id of the entry.
    pub fileno: u64,
    /// Cursor value that resumes after this entry.
    pub off: u64,
    /// `d_type` value.
    pub d_type: u8,
    /// Entry name.
    pub name: String,
}

impl Dirent {
    /// Encoded length of this record.
    pub fn reclen(&self) -> usize {
        record_len(self.name.len())
    }

    /// The entry type as a [`FileType`].
    pub fn file_type(&self) -> FileType {
        file_type_of(self.d_type)
    }

    /// Writes the record at the start of `out` and returns its length.
    ///
    /// Returns `None` if `out` is too short or the name does not fit the
    /// 16-bit length fields.
    pub fn encode_into(&self, out: &mut [u8]) -> Option<usize> {
        let reclen = self.reclen();
        let reclen16 = u16::try_from(reclen).ok()?;
        let namlen16 = u16::try_from(self.name.len()).ok()?;
        let out = out.get_mut(..reclen)?;

        out[0..8].copy_from_slice(&self.fileno.to_le_bytes());
        out[8..16].copy_from_slice(&self.off.to_le_bytes());
        out[16..18].copy_from_slice(&reclen16.to_le_bytes());
        out[18] = self.d_type;
        out[19] = 0;
        out[20..22].copy_from_slice(&namlen16.to_le_bytes());
        out[22..24].fill(0);
        let name_end = DIRENT_HEADER_LEN + self.name.len();
        out[DIRENT_HEADER_LEN..name_end].copy_from_slice(self.name.as_bytes());
        out[name_end..].fill(0);
        Some(reclen)
    }

    /// Decodes the record at the start of `buf`, returning it and its length.
    pub fn decode(buf: &[u8]) -> FsResult<(Self, usize)> {
        let header = buf
            .get(..DIRENT_HEADER_LEN)
            .ok_or(FsError::InvalidArgument("truncated dirent header"))?;
        let fileno = u64::from_le_bytes(le_array(&header[0..8]));
        let off = u64::from_le_bytes(le_array(&header[8..16]));
        let reclen = usize::from(u16::from_le_bytes(le_array(&header[16..18])));
        let d_type = header[18];
        let namlen = usize::from(u16::from_le_bytes(le_array(&header[20..22])));

        if reclen < record_len(namlen) || !reclen.is_multiple_of(DIRENT_ALIGN) {
            return Err(FsError::InvalidArgument("dirent reclen does not fit its name"));
        }
        let record = buf
            .get(..reclen)
            .ok_or(FsError::InvalidArgument("truncated dirent record"))?;
        let name_bytes = &record[DIRENT_HEADER_LEN..DIRENT_HEADER_LEN + namlen];
        if record[DIRENT_HEADER_LEN + namlen] != 0 {
            return Err(FsError::InvalidArgument("dirent name is not NUL-terminated"));
        }
        let name = String::from_utf8_lossy(name_bytes).into_owned();
        Ok((
            Self {
                fileno,
                off,
                d_type,
                name,
            },
            reclen,
        ))
    }

    /// Decodes every record packed into `buf`.
    pub fn decode_all(mut buf: &[u8]) -> FsResult<Vec<Self>> {
        let mut entries = Vec::new();
        while !buf.is_empty() {
            let (entry, len) = Self::decode(buf)?;
            entries.push(entry);
            buf = &buf[len..];
        }
        Ok(entries)
    }
}

fn le_array<const N: usize>(bytes: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(bytes);
    out
}
