//! Readdir cursor protocol tests.
//!
//! Covers paging with small buffers, cursor validation, `.`/`..` identities
//! and the lifetime of the cached listing across open/close.

mod common;

use common::*;
use proptest::prelude::*;
use sffs_core::{ComponentName, Dirent, MountConfig, Node, SharedFolderFs, ROOT_NODE_ID};
use std::sync::Arc;

fn lookup(fs: &SharedFolderFs, dir: &Arc<Node>, name: &str) -> Arc<Node> {
    fs.lookup(dir, &ComponentName::lookup(name))
        .expect("lookup failed")
        .node
}

/// Reads the whole directory with `buf_size`-byte calls, returning the
/// decoded entries and the cursors handed back.
fn read_all(fs: &SharedFolderFs, dir: &Node, buf_size: usize) -> (Vec<Dirent>, Vec<u64>) {
    let mut buf = vec![0u8; buf_size];
    let mut cursor = 0;
    let mut entries = Vec::new();
    let mut cursors = Vec::new();
    loop {
        let reply = fs.readdir(dir, cursor, &mut buf).expect("readdir failed");
        entries.extend(Dirent::decode_all(&buf[..reply.bytes]).unwrap());
        cursors.push(reply.cursor);
        cursor = reply.cursor;
        if reply.eof {
            return (entries, cursors);
        }
    }
}

fn names_of(entries: &[Dirent]) -> Vec<String> {
    entries.iter().map(|e| e.name.clone()).collect()
}

// =============================================================================
// Scenarios
// =============================================================================

#[test]
fn test_two_entry_buffer_scenario() {
    let (_provider, fs) = mount(shared_abc());
    let root = fs.root().unwrap();
    let shared = lookup(&fs, &root, "shared");
    fs.open(&shared).unwrap();

    // One-letter names encode to 32 bytes, so 64 bytes holds two entries.
    let mut buf = [0u8; 64];
    let first = fs.readdir(&shared, 0, &mut buf).unwrap();
    assert_eq!(first.entries, 2);
    assert!(!first.eof);
    assert_eq!(names_of(&Dirent::decode_all(&buf[..first.bytes]).unwrap()), ["a", "b"]);

    let c1 = first.cursor;
    let second = fs.readdir(&shared, c1, &mut buf).unwrap();
    assert_eq!(second.entries, 1);
    assert!(second.eof);
    assert_eq!(names_of(&Dirent::decode_all(&buf[..second.bytes]).unwrap()), ["c"]);

    let last = fs.readdir(&shared, second.cursor, &mut buf).unwrap();
    assert_eq!(last.entries, 0);
    assert!(last.eof);

    fs.close(&shared);
}

#[test]
fn test_misaligned_cursor_is_einval() {
    let (_provider, fs) = mount(shared_abc());
    let root = fs.root().unwrap();
    let shared = lookup(&fs, &root, "shared");
    fs.open(&shared).unwrap();

    let mut buf = [0u8; 512];
    for cursor in [1, 31, 33, 95] {
        let err = fs.readdir(&shared, cursor, &mut buf).unwrap_err();
        assert_eq!(err.to_errno(), libc::EINVAL, "cursor {cursor}");
    }
    let err = fs.readdir(&shared, 4096, &mut buf).unwrap_err();
    assert_eq!(err.to_errno(), libc::EINVAL);
}

#[test]
fn test_buffer_smaller_than_one_entry_is_einval() {
    let (_provider, fs) = mount(shared_abc());
    let root = fs.root().unwrap();
    let shared = lookup(&fs, &root, "shared");
    fs.open(&shared).unwrap();

    let mut buf = [0u8; 24];
    let err = fs.readdir(&shared, 0, &mut buf).unwrap_err();
    assert_eq!(err.to_errno(), libc::EINVAL);
}

#[test]
fn test_readdir_on_file_is_enotdir() {
    let (_provider, fs) = mount(shared_abc());
    let root = fs.root().unwrap();
    let shared = lookup(&fs, &root, "shared");
    let file = lookup(&fs, &shared, "a");
    let mut buf = [0u8; 512];
    assert_eq!(fs.readdir(&file, 0, &mut buf).unwrap_err().to_errno(), libc::ENOTDIR);
}

// =============================================================================
// Dots
// =============================================================================

#[test]
fn test_dots_carry_directory_and_parent_ids() {
    let (_provider, fs) = mount(shared_abc().with_dots());
    let root = fs.root().unwrap();
    let shared = lookup(&fs, &root, "shared");
    fs.open(&shared).unwrap();

    let (entries, _) = read_all(&fs, &shared, 4096);
    assert_eq!(names_of(&entries), [".", "..", "a", "b", "c"]);
    assert_eq!(entries[0].fileno, shared.id());
    assert_eq!(entries[1].fileno, ROOT_NODE_ID);
}

#[test]
fn test_root_dotdot_is_root() {
    let (_provider, fs) = mount(shared_abc().with_dots());
    let root = fs.root().unwrap();
    fs.open(&root).unwrap();
    let (entries, _) = read_all(&fs, &root, 4096);
    assert_eq!(entries[0].fileno, ROOT_NODE_ID);
    assert_eq!(entries[1].fileno, ROOT_NODE_ID);
}

#[test]
fn test_listing_fileno_matches_lookup() {
    let (_provider, fs) = mount(shared_abc());
    let root = fs.root().unwrap();
    let shared = lookup(&fs, &root, "shared");
    fs.open(&shared).unwrap();

    let (entries, _) = read_all(&fs, &shared, 4096);
    let b = lookup(&fs, &shared, "b");
    let listed = entries.iter().find(|e| e.name == "b").unwrap();
    assert_eq!(listed.fileno, b.id());
    assert_eq!(fs.getattr(&b).fileid, listed.fileno);
}

// =============================================================================
// Listing lifetime
// =============================================================================

#[test]
fn test_listing_is_fetched_once_per_open() {
    let (provider, fs) = mount(shared_abc());
    let root = fs.root().unwrap();
    let shared = lookup(&fs, &root, "shared");
    fs.open(&shared).unwrap();

    let (first, _) = read_all(&fs, &shared, 40);
    let (second, _) = read_all(&fs, &shared, 4096);
    assert_eq!(first, second);
    assert_eq!(provider.count(|c| matches!(c, Call::List(_))), 1);
}

#[test]
fn test_host_changes_appear_only_after_close() {
    let (provider, fs) = mount(shared_abc());
    let root = fs.root().unwrap();
    let shared = lookup(&fs, &root, "shared");
    fs.open(&shared).unwrap();
    let (before, _) = read_all(&fs, &shared, 4096);

    provider.rewrite("/shared/d", b"delta");
    let (still, _) = read_all(&fs, &shared, 4096);
    assert_eq!(before, still);

    fs.close(&shared);
    fs.open(&shared).unwrap();
    let (after, _) = read_all(&fs, &shared, 4096);
    assert_eq!(names_of(&after), ["a", "b", "c", "d"]);
    assert_eq!(provider.count(|c| matches!(c, Call::List(_))), 2);
}

#[test]
fn test_listing_failure_surfaces_and_leaves_no_listing() {
    let (provider, fs) = mount(shared_abc());
    let root = fs.root().unwrap();
    let shared = lookup(&fs, &root, "shared");
    fs.open(&shared).unwrap();

    provider.fail_list(Some(libc::EIO));
    let mut buf = [0u8; 512];
    assert_eq!(fs.readdir(&shared, 0, &mut buf).unwrap_err().to_errno(), libc::EIO);
    assert!(shared.state().listing().is_none());

    provider.fail_list(None);
    let reply = fs.readdir(&shared, 0, &mut buf).unwrap();
    assert_eq!(reply.entries, 3);
}

#[test]
fn test_empty_directory() {
    let (_provider, fs) = mount(MockProvider::new().dir("/empty"));
    let root = fs.root().unwrap();
    let empty = lookup(&fs, &root, "empty");
    let mut buf = [0u8; 64];
    let reply = fs.readdir(&empty, 0, &mut buf).unwrap();
    assert_eq!(reply.entries, 0);
    assert!(reply.eof);
}

// =============================================================================
// Properties
// =============================================================================

fn provider_with(names: &[String]) -> MockProvider {
    names
        .iter()
        .fold(MockProvider::new().dir("/d"), |p, name| {
            p.file(&format!("/d/{name}"), name.as_bytes())
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Paging with any buffer sizes neither repeats nor skips entries.
    #[test]
    fn paged_listing_matches_unlimited(
        names in prop::collection::btree_set("[a-z]{1,40}", 0..60),
        segment_size in prop::sample::select(vec![280usize, 512, 8192]),
        buf_sizes in prop::collection::vec(72usize..600, 1..8),
    ) {
        let names: Vec<String> = names.into_iter().collect();
        let (_provider, fs) = mount_with(
            provider_with(&names),
            MountConfig::default().segment_size(segment_size),
        );
        let root = fs.root().unwrap();
        let dir = lookup(&fs, &root, "d");
        fs.open(&dir).unwrap();

        let (reference, _) = read_all(&fs, &dir, 1 << 20);
        prop_assert_eq!(names_of(&reference), names.clone());

        let mut cursor = 0;
        let mut paged = Vec::new();
        for size in buf_sizes.iter().cycle() {
            let mut buf = vec![0u8; *size];
            let reply = fs.readdir(&dir, cursor, &mut buf).unwrap();
            prop_assert!(reply.cursor >= cursor);
            paged.extend(Dirent::decode_all(&buf[..reply.bytes]).unwrap());
            cursor = reply.cursor;
            if reply.eof {
                break;
            }
        }
        prop_assert_eq!(paged, reference);
    }

    /// Every returned cursor resumes at the following entry.
    #[test]
    fn returned_cursors_are_resumable(
        names in prop::collection::btree_set("[a-z]{1,12}", 1..30),
        buf_size in 40usize..200,
    ) {
        let names: Vec<String> = names.into_iter().collect();
        let (_provider, fs) = mount(provider_with(&names));
        let root = fs.root().unwrap();
        let dir = lookup(&fs, &root, "d");
        fs.open(&dir).unwrap();

        let (entries, cursors) = read_all(&fs, &dir, buf_size);
        for entry in &entries {
            let mut buf = vec![0u8; 4096];
            let reply = fs.readdir(&dir, entry.off, &mut buf).unwrap();
            let rest = Dirent::decode_all(&buf[..reply.bytes]).unwrap();
            let expected: Vec<_> = entries.iter().filter(|e| e.off > entry.off).cloned().collect();
            prop_assert_eq!(rest, expected);
        }
        for cursor in cursors {
            let mut buf = vec![0u8; 4096];
            prop_assert!(fs.readdir(&dir, cursor, &mut buf).is_ok());
        }
    }

    /// Any cursor strictly inside a record is rejected.
    #[test]
    fn interior_cursors_are_einval(
        names in prop::collection::btree_set("[a-z]{1,20}", 1..20),
        delta in 1u64..8,
    ) {
        let names: Vec<String> = names.into_iter().collect();
        let (_provider, fs) = mount(provider_with(&names));
        let root = fs.root().unwrap();
        let dir = lookup(&fs, &root, "d");
        fs.open(&dir).unwrap();

        let (entries, _) = read_all(&fs, &dir, 4096);
        let mut start = 0;
        for entry in &entries {
            let mut buf = vec![0u8; 4096];
            let err = fs.readdir(&dir, start + delta, &mut buf).unwrap_err();
            prop_assert_eq!(err.to_errno(), libc::EINVAL);
            start = entry.off;
        }
    }
}
