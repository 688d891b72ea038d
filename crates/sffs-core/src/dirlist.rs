//! Cached directory listings and the readdir cursor.
//!
//! A listing is fetched from the provider once per open directory and split
//! into segments of at most `segment_size` encoded bytes. The readdir cursor
//! is the byte offset of the next record in the concatenation of all
//! segments, so every valid cursor lands exactly on a record boundary and
//! `total_len()` means end of directory.

use crate::config::NAME_MAX;
use crate::dirent::{self, Dirent};
use crate::error::{FsError, FsResult};
use crate::node::NodeId;
use sffs_provider::{FileType, ProviderEntry, StatSnapshot};
use tracing::warn;

/// One entry of a cached listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingRecord {
    /// Entry name.
    pub name: String,
    /// Entry type from the enumeration-time snapshot.
    pub kind: FileType,
    /// Node id reported for the entry; 0 for `.` and `..`, which are
    /// resolved against the directory when copied out.
    pub fileno: NodeId,
    /// Snapshot taken at enumeration time.
    pub stat: StatSnapshot,
    reclen: u16,
}

impl ListingRecord {
    /// Encoded length of this record.
    #[inline]
    pub fn reclen(&self) -> usize {
        usize::from(self.reclen)
    }

    /// Returns true for `.` or `..`.
    pub fn is_dot_or_dotdot(&self) -> bool {
        self.name == "." || self.name == ".."
    }
}

/// A run of records whose encoded size fits one segment.
#[derive(Debug, Default)]
struct Segment {
    records: Vec<ListingRecord>,
    len: u64,
}

/// Where a cursor points inside a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    /// Segment index; equals the segment count at end of directory.
    pub segment: usize,
    /// Record index within the segment.
    pub record: usize,
}

/// Result of one readdir call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReaddirReply {
    /// Records copied out.
    pub entries: usize,
    /// Bytes written to the caller's buffer.
    pub bytes: usize,
    /// Cursor to pass to the next call.
    pub cursor: u64,
    /// True once the cursor has reached the end of the listing.
    pub eof: bool,
}

/// Ids reported for `.` and `..` in one copy-out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DotIds {
    /// The directory itself.
    pub dot: NodeId,
    /// Its parent, or the directory itself at the root.
    pub dotdot: NodeId,
}

/// A directory enumeration snapshot, segmented by encoded size.
#[derive(Debug, Default)]
pub struct DirListing {
    segments: Vec<Segment>,
    total: u64,
    entries: usize,
}

impl DirListing {
    /// Builds a listing from provider entries, in provider order.
    ///
    /// `fileno_for` supplies the id reported for every entry other than `.`
    /// and `..`. Entries whose names can never be valid (empty, containing
    /// `/`, or longer than `NAME_MAX`) are skipped.
    pub fn build(
        entries: Vec<ProviderEntry>,
        segment_size: usize,
        mut fileno_for: impl FnMut(&str) -> NodeId,
    ) -> Self {
        let budget = segment_size as u64;
        let mut listing = Self::default();
        let mut current = Segment::default();

        for entry in entries {
            if entry.name.is_empty() || entry.name.contains('/') || entry.name.len() > NAME_MAX {
                warn!(name = %entry.name, "skipping unrepresentable directory entry");
                continue;
            }
            let reclen = dirent::record_len(entry.name.len());
            let Ok(reclen16) = u16::try_from(reclen) else {
                continue;
            };
            if !current.records.is_empty() && current.len + reclen as u64 > budget {
                listing.push_segment(std::mem::take(&mut current));
            }
            let fileno = match entry.name.as_str() {
                "." | ".." => 0,
                name => fileno_for(name),
            };
            current.len += reclen as u64;
            current.records.push(ListingRecord {
                kind: entry.stat.file_type(),
                fileno,
                stat: entry.stat,
                name: entry.name,
                reclen: reclen16,
            });
        }
        if !current.records.is_empty() {
            listing.push_segment(current);
        }
        listing
    }

    fn push_segment(&mut self, segment: Segment) {
        self.total += segment.len;
        self.entries += segment.records.len();
        self.segments.push(segment);
    }

    /// Total encoded size; the cursor value meaning end of directory.
    pub fn total_len(&self) -> u64 {
        self.total
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.entries
    }

    /// Returns true if the listing holds no records.
    pub fn is_empty(&self) -> bool {
        self.entries == 0
    }

    /// Number of segments.
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// Iterates over all records in order.
    pub fn iter(&self) -> impl Iterator<Item = &ListingRecord> {
        self.segments.iter().flat_map(|s| s.records.iter())
    }

    /// Finds a record by name.
    pub fn find(&self, name: &str) -> Option<&ListingRecord> {
        self.iter().find(|r| r.name == name)
    }

    /// Maps a cursor to a record position.
    ///
    /// Fails with `EINVAL` if the cursor is past the end or between record
    /// boundaries.
    pub fn seek(&self, cursor: u64) -> FsResult<Position> {
        let mut base = 0u64;
        for (segment, seg) in self.segments.iter().enumerate() {
            if base + seg.len <= cursor {
                base += seg.len;
                continue;
            }
            let mut offset = base;
            for (record, rec) in seg.records.iter().enumerate() {
                if offset == cursor {
                    return Ok(Position { segment, record });
                }
                if offset > cursor {
                    break;
                }
                offset += rec.reclen() as u64;
            }
            return Err(FsError::InvalidArgument("cursor is not on an entry boundary"));
        }
        if base == cursor {
            Ok(Position {
                segment: self.segments.len(),
                record: 0,
            })
        } else {
            Err(FsError::InvalidArgument("cursor is past the end of the directory"))
        }
    }

    /// Copies whole records starting at `cursor` into `out`.
    ///
    /// Stops at the first record that does not fit. If not even one record
    /// fits and the listing is not exhausted, fails with `EINVAL`; an empty
    /// reply always means eof. A buffer of
    /// [`record_len(NAME_MAX)`](dirent::record_len) bytes always fits the
    /// next record.
    pub fn read(&self, cursor: u64, out: &mut [u8], dots: DotIds) -> FsResult<ReaddirReply> {
        let start = self.seek(cursor)?;
        let mut reply = ReaddirReply {
            entries: 0,
            bytes: 0,
            cursor,
            eof: false,
        };

        let records = self
            .segments
            .iter()
            .skip(start.segment)
            .enumerate()
            .flat_map(|(i, seg)| {
                let skip = if i == 0 { start.record } else { 0 };
                seg.records.iter().skip(skip)
            });

        for rec in records {
            let reclen = rec.reclen();
            if out.len() - reply.bytes < reclen {
                break;
            }
            let fileno = match rec.name.as_str() {
                "." => dots.dot,
                ".." => dots.dotdot,
                _ => rec.fileno,
            };
            let next = reply.cursor + reclen as u64;
            let dirent = Dirent {
                fileno,
                off: next,
                d_type: dirent::dirent_type(rec.kind),
                name: rec.name.clone(),
            };
            let written = dirent
                .encode_into(&mut out[reply.bytes..])
                .ok_or(FsError::InvalidArgument("directory entry does not encode"))?;
            reply.bytes += written;
            reply.entries += 1;
            reply.cursor = next;
        }

        reply.eof = reply.cursor == self.total;
        if reply.entries == 0 && !reply.eof {
            return Err(FsError::InvalidArgument("buffer too small for the next entry"));
        }
        Ok(reply)
    }
}
