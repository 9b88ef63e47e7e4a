//! Round-trip tests for the file-list wire codec.
//!
//! Every field class goes through an encode/decode cycle across the
//! protocol versions that change its framing: delta runs, long names,
//! devices with small and large minors, symlinks, hard-link keys before
//! and after the 64-bit switch, checksums, and 64-bit sizes. The stream
//! invariants - no zero flag byte for a real entry, terminator resets the
//! delta state - are checked at the byte level.

use std::io::Cursor;

use protocol::ProtocolVersion;
use protocol::flist::{FileEntry, FileListReader, FileListWriter, HardLinkKey};
use protocol::wire::file_entry::{XMIT_EXTENDED_FLAGS, XMIT_SAME_NAME, XMIT_SAME_UID};

// ============================================================================
// Helpers
// ============================================================================

/// Encodes each entry into its own segment so tests can inspect per-entry
/// flag bytes, then returns the segments.
fn encode_segments(writer: &mut FileListWriter, entries: &[FileEntry]) -> Vec<Vec<u8>> {
    entries
        .iter()
        .map(|entry| {
            let mut segment = Vec::new();
            writer.write_entry(&mut segment, entry).expect("write");
            segment
        })
        .collect()
}

fn roundtrip_with(
    entries: &[FileEntry],
    writer: &mut FileListWriter,
    reader: &mut FileListReader,
) -> Vec<FileEntry> {
    let mut buf = Vec::new();
    for entry in entries {
        writer.write_entry(&mut buf, entry).expect("write");
    }
    writer.write_end(&mut buf, None).expect("write end");

    let mut cursor = Cursor::new(&buf);
    let mut decoded = Vec::new();
    while let Some(entry) = reader.read_entry(&mut cursor).expect("read") {
        decoded.push(entry);
    }
    assert_eq!(cursor.position() as usize, buf.len(), "trailing bytes");
    decoded
}

fn roundtrip(entries: &[FileEntry], protocol: ProtocolVersion) -> Vec<FileEntry> {
    let mut writer = FileListWriter::new(protocol)
        .with_preserve_uid(true)
        .with_preserve_gid(true)
        .with_preserve_links(true)
        .with_preserve_devices(true)
        .with_preserve_specials(true);
    let mut reader = FileListReader::new(protocol)
        .with_preserve_uid(true)
        .with_preserve_gid(true)
        .with_preserve_links(true)
        .with_preserve_devices(true)
        .with_preserve_specials(true);
    roundtrip_with(entries, &mut writer, &mut reader)
}

fn sample_file(name: &str, size: u64, mtime: i64, uid: u32, gid: u32) -> FileEntry {
    let mut entry = FileEntry::new_file(name, size, 0o644);
    entry.set_mtime(mtime);
    entry.set_uid(uid);
    entry.set_gid(gid);
    entry
}

const ALL_PROTOCOLS: [ProtocolVersion; 5] = [
    ProtocolVersion::V20,
    ProtocolVersion::V26,
    ProtocolVersion::V27,
    ProtocolVersion::V28,
    ProtocolVersion::V29,
];

// ============================================================================
// Basic entry round-trips
// ============================================================================

#[test]
fn single_file_roundtrips_on_every_protocol() {
    for protocol in ALL_PROTOCOLS {
        let entry = sample_file("src/main.rs", 1234, 1_200_000_000, 1000, 100);
        let decoded = roundtrip(&[entry.clone()], protocol);
        assert_eq!(decoded.len(), 1, "protocol {protocol}");
        let got = &decoded[0];
        assert_eq!(got.full_name(), "src/main.rs");
        assert_eq!(got.size(), 1234);
        assert_eq!(got.modtime(), 1_200_000_000);
        assert_eq!(got.uid(), Some(1000));
        assert_eq!(got.gid(), Some(100));
        assert!(got.is_regular());
    }
}

#[test]
fn mixed_tree_roundtrips_field_for_field() {
    for protocol in [ProtocolVersion::V27, ProtocolVersion::NEWEST] {
        let mut dir = FileEntry::new_directory("project", 0o755);
        dir.set_mtime(1_000_000);
        let mut sub = FileEntry::new_directory("project/src", 0o755);
        sub.set_mtime(1_000_001);
        let entries = vec![
            dir,
            sub,
            sample_file("project/src/lib.rs", 99, 1_000_002, 0, 0),
            FileEntry::new_symlink("project/latest", "src/lib.rs"),
        ];
        let decoded = roundtrip(&entries, protocol);
        assert_eq!(decoded.len(), entries.len());
        for (sent, got) in entries.iter().zip(&decoded) {
            assert_eq!(sent.full_name(), got.full_name(), "protocol {protocol}");
            assert_eq!(sent.mode(), got.mode());
            assert_eq!(sent.size(), got.size());
            assert_eq!(sent.symlink_target(), got.symlink_target());
        }
    }
}

#[test]
fn dirnames_share_one_allocation_after_decode() {
    let entries = vec![
        sample_file("deep/dir/a", 1, 1, 0, 0),
        sample_file("deep/dir/b", 2, 1, 0, 0),
    ];
    let decoded = roundtrip(&entries, ProtocolVersion::NEWEST);
    assert_eq!(decoded[0].dirname(), Some("deep/dir"));
    assert_eq!(decoded[1].dirname(), Some("deep/dir"));
}

// ============================================================================
// Delta compression behavior
// ============================================================================

#[test]
fn uid_run_emits_field_once_per_change() {
    // Three entries with uids 1000, 1000, 1001: the middle one carries
    // XMIT_SAME_UID and no uid field.
    let entries = [
        sample_file("a", 1, 5, 1000, 100),
        sample_file("b", 1, 5, 1000, 100),
        sample_file("c", 1, 5, 1001, 100),
    ];
    let mut writer = FileListWriter::new(ProtocolVersion::NEWEST).with_preserve_uid(true);
    let segments = encode_segments(&mut writer, &entries);

    let flags_of = |segment: &[u8]| u16::from(segment[0]);
    assert_eq!(flags_of(&segments[0]) & XMIT_SAME_UID, 0);
    assert_ne!(flags_of(&segments[1]) & XMIT_SAME_UID, 0);
    assert_eq!(flags_of(&segments[2]) & XMIT_SAME_UID, 0);

    // The second segment is smaller by exactly the elided fields.
    assert!(segments[1].len() < segments[0].len());

    let mut buf: Vec<u8> = segments.concat();
    writer.write_end(&mut buf, None).expect("end");
    let mut reader = FileListReader::new(ProtocolVersion::NEWEST).with_preserve_uid(true);
    let mut cursor = Cursor::new(&buf);
    let mut uids = Vec::new();
    while let Some(entry) = reader.read_entry(&mut cursor).expect("read") {
        uids.push(entry.uid());
    }
    assert_eq!(uids, [Some(1000), Some(1000), Some(1001)]);
}

#[test]
fn shared_name_prefix_shrinks_entries() {
    let entries = [
        sample_file("very/long/directory/name/file-000.dat", 1, 5, 0, 0),
        sample_file("very/long/directory/name/file-001.dat", 1, 5, 0, 0),
    ];
    let mut writer = FileListWriter::new(ProtocolVersion::NEWEST);
    let segments = encode_segments(&mut writer, &entries);

    assert_ne!(u16::from(segments[1][0]) & XMIT_SAME_NAME, 0);
    assert!(
        segments[1].len() < segments[0].len() / 2,
        "suffix encoding should collapse the shared prefix"
    );
}

#[test]
fn long_name_suffix_uses_int_length() {
    let long = "x".repeat(300);
    let entry = sample_file(&long, 1, 5, 0, 0);
    let decoded = roundtrip(&[entry], ProtocolVersion::NEWEST);
    assert_eq!(decoded[0].full_name().len(), 300);
}

#[test]
fn toggling_same_bits_does_not_change_decoded_values() {
    // A run sharing every field vs a run sharing none decodes to the same
    // metadata; only the wire size differs.
    let same = [
        sample_file("r/a", 10, 77, 500, 500),
        sample_file("r/b", 10, 77, 500, 500),
    ];
    let differ = [
        sample_file("r/a", 10, 77, 500, 500),
        {
            let mut entry = sample_file("r/b", 10, 78, 501, 502);
            entry.set_mtime(78);
            entry
        },
    ];
    let decoded_same = roundtrip(&same, ProtocolVersion::NEWEST);
    let decoded_differ = roundtrip(&differ, ProtocolVersion::NEWEST);
    assert_eq!(decoded_same[1].size(), decoded_differ[1].size());
    assert_eq!(decoded_same[1].full_name(), decoded_differ[1].full_name());
    assert_eq!(decoded_same[1].modtime(), 77);
    assert_eq!(decoded_differ[1].modtime(), 78);
}

// ============================================================================
// Flag byte invariants
// ============================================================================

#[test]
fn real_entry_never_encodes_zero_flag_byte() {
    // The second entry shares no field with the first and no name prefix,
    // so without filler its flag byte would be exactly 0x00 - the
    // terminator. The writer must emit filler instead.
    for protocol in ALL_PROTOCOLS {
        let entries = [
            sample_file("a", 1, 100, 0, 0),
            sample_file("b", 1, 200, 0, 0),
        ];
        let mut writer = FileListWriter::new(protocol);
        let segments = encode_segments(&mut writer, &entries);
        for segment in &segments {
            assert_ne!(segment[0], 0, "zero flag byte on protocol {protocol}");
        }
    }
}

#[test]
fn directory_filler_uses_long_name_pre28() {
    // A directory entry with no delta bits gets XMIT_LONG_NAME as filler
    // before protocol 28 (XMIT_TOP_DIR would be meaningful on a dir), which
    // widens the suffix-length field; the reader must still decode it.
    let file = sample_file("a", 1, 100, 0, 0);
    let mut dir = FileEntry::new_directory("zdir", 0o755);
    dir.set_mtime(200);
    let mut writer = FileListWriter::new(ProtocolVersion::V27);
    let segments = encode_segments(&mut writer, &[file, dir]);
    assert_ne!(segments[1][0], 0);
    assert_ne!(
        u16::from(segments[1][0]) & protocol::wire::file_entry::XMIT_LONG_NAME,
        0,
        "directory filler should be XMIT_LONG_NAME"
    );

    let mut buf = segments.concat();
    writer.write_end(&mut buf, None).expect("end");
    let mut reader = FileListReader::new(ProtocolVersion::V27);
    let mut cursor = Cursor::new(&buf);
    let first = reader.read_entry(&mut cursor).expect("read").expect("a");
    let second = reader.read_entry(&mut cursor).expect("read").expect("zdir");
    assert_eq!(first.full_name(), "a");
    assert_eq!(second.full_name(), "zdir");
    assert!(second.is_dir());
}

#[test]
fn extended_flags_only_appear_from_protocol_28() {
    let mut entry = FileEntry::new_block_device("dev/sda", 0o660, 8, 0);
    entry.set_mtime(9);
    let mut writer = FileListWriter::new(ProtocolVersion::V28).with_preserve_devices(true);
    let mut writer_old = FileListWriter::new(ProtocolVersion::V27).with_preserve_devices(true);

    let new_segment = &encode_segments(&mut writer, std::slice::from_ref(&entry))[0];
    let old_segment = &encode_segments(&mut writer_old, std::slice::from_ref(&entry))[0];

    // Protocol 28 sets XMIT_RDEV_MINOR_IS_SMALL (a high bit), forcing the
    // two-byte form; protocol 27 never writes a second flag byte.
    assert_ne!(u16::from(new_segment[0]) & XMIT_EXTENDED_FLAGS, 0);
    assert_ne!(new_segment[1], 0, "high flag byte expected");
    assert_eq!(u16::from(old_segment[0]) & XMIT_EXTENDED_FLAGS, 0);
}

// ============================================================================
// Terminator behavior
// ============================================================================

#[test]
fn terminator_resets_delta_state_between_lists() {
    let protocol = ProtocolVersion::NEWEST;
    let mut writer = FileListWriter::new(protocol).with_preserve_uid(true);
    let mut reader = FileListReader::new(protocol).with_preserve_uid(true);

    let first = [sample_file("alpha/one", 5, 42, 777, 0)];
    let decoded_first = roundtrip_with(&first, &mut writer, &mut reader);
    assert_eq!(decoded_first[0].uid(), Some(777));

    // The second list reuses the same writer/reader pair: nothing from the
    // first list may leak through the reset.
    let second = [sample_file("alpha/one", 5, 42, 777, 0)];
    let mut buf = Vec::new();
    writer.write_entry(&mut buf, &second[0]).expect("write");
    writer.write_end(&mut buf, None).expect("end");

    // The full name must be present verbatim: no SAME_NAME prefix against
    // the pre-reset state.
    let mut cursor = Cursor::new(&buf);
    let entry = reader.read_entry(&mut cursor).expect("read").expect("one");
    assert_eq!(entry.full_name(), "alpha/one");
    assert_eq!(entry.uid(), Some(777));
}

#[test]
fn io_error_word_travels_after_terminator() {
    let protocol = ProtocolVersion::NEWEST;
    let mut writer = FileListWriter::new(protocol);
    let mut reader = FileListReader::new(protocol);

    let mut buf = Vec::new();
    writer
        .write_entry(&mut buf, &sample_file("f", 1, 2, 0, 0))
        .expect("write");
    writer.write_end(&mut buf, Some(3)).expect("end");

    let mut cursor = Cursor::new(&buf);
    while reader.read_entry(&mut cursor).expect("read").is_some() {}
    assert_eq!(reader.read_io_error(&mut cursor).expect("io error"), 3);
}

// ============================================================================
// Devices and specials
// ============================================================================

#[test]
fn block_device_roundtrips_across_protocols() {
    for protocol in [
        ProtocolVersion::V27,
        ProtocolVersion::V28,
        ProtocolVersion::V29,
    ] {
        let mut entry = FileEntry::new_block_device("dev/sda1", 0o660, 8, 1);
        entry.set_mtime(100);
        let decoded = roundtrip(std::slice::from_ref(&entry), protocol);
        assert!(decoded[0].is_block_device(), "protocol {protocol}");
        assert_eq!(decoded[0].rdev_major(), Some(8));
        assert_eq!(decoded[0].rdev_minor(), Some(1));
        assert_eq!(decoded[0].size(), 0);
    }
}

#[test]
fn large_minor_uses_wide_field_on_protocol_28() {
    let mut entry = FileEntry::new_char_device("dev/odd", 0o666, 4, 300);
    entry.set_mtime(100);
    let decoded = roundtrip(std::slice::from_ref(&entry), ProtocolVersion::V28);
    assert_eq!(decoded[0].rdev_minor(), Some(300));
}

#[test]
fn device_major_run_elides_repeats() {
    let mut first = FileEntry::new_block_device("dev/sda1", 0o660, 8, 1);
    first.set_mtime(7);
    let mut second = FileEntry::new_block_device("dev/sda2", 0o660, 8, 2);
    second.set_mtime(7);

    let mut writer = FileListWriter::new(ProtocolVersion::V29).with_preserve_devices(true);
    let segments = encode_segments(&mut writer, &[first, second]);
    assert!(
        segments[1].len() < segments[0].len(),
        "same-major entry should elide the major field"
    );

    let mut buf = segments.concat();
    writer.write_end(&mut buf, None).expect("end");
    let mut reader = FileListReader::new(ProtocolVersion::V29).with_preserve_devices(true);
    let mut cursor = Cursor::new(&buf);
    let a = reader.read_entry(&mut cursor).expect("read").expect("a");
    let b = reader.read_entry(&mut cursor).expect("read").expect("b");
    assert_eq!(a.rdev_major(), Some(8));
    assert_eq!(b.rdev_major(), Some(8));
    assert_eq!(b.rdev_minor(), Some(2));
}

#[test]
fn fifo_and_socket_roundtrip_with_specials() {
    for protocol in [ProtocolVersion::V27, ProtocolVersion::NEWEST] {
        let mut fifo = FileEntry::new_fifo("pipe", 0o644);
        fifo.set_mtime(1);
        let mut sock = FileEntry::new_socket("sock", 0o755);
        sock.set_mtime(1);
        let decoded = roundtrip(&[fifo, sock], protocol);
        assert!(decoded[0].is_special());
        assert!(decoded[1].is_special());
    }
}

// ============================================================================
// Symlinks
// ============================================================================

#[test]
fn symlink_target_roundtrips() {
    let entry = FileEntry::new_symlink("links/here", "../target/elsewhere");
    let decoded = roundtrip(&[entry], ProtocolVersion::NEWEST);
    assert!(decoded[0].is_symlink());
    assert_eq!(decoded[0].symlink_target(), Some("../target/elsewhere"));
}

#[test]
fn symlink_target_skipped_without_preserve_links() {
    let entry = FileEntry::new_symlink("link", "target");
    let mut writer = FileListWriter::new(ProtocolVersion::NEWEST);
    let mut reader = FileListReader::new(ProtocolVersion::NEWEST);
    let decoded = roundtrip_with(&[entry], &mut writer, &mut reader);
    assert_eq!(decoded[0].symlink_target(), None);
}

// ============================================================================
// Hard-link keys
// ============================================================================

#[test]
fn hardlink_keys_roundtrip_with_wide_encoding() {
    let mut a = sample_file("hl/a", 4, 9, 0, 0);
    a.set_hardlink_key(HardLinkKey { dev: 0x12345, ino: 0x9999 });
    let mut b = sample_file("hl/b", 4, 9, 0, 0);
    b.set_hardlink_key(HardLinkKey { dev: 0x12345, ino: 0x9999 });

    for protocol in [ProtocolVersion::V26, ProtocolVersion::V28, ProtocolVersion::V29] {
        let mut writer = FileListWriter::new(protocol).with_preserve_hard_links(true);
        let mut reader = FileListReader::new(protocol).with_preserve_hard_links(true);
        let decoded = roundtrip_with(&[a.clone(), b.clone()], &mut writer, &mut reader);
        for entry in &decoded {
            let key = entry.hardlink_key().expect("key");
            assert_eq!(key.dev, 0x12345, "protocol {protocol}");
            assert_eq!(key.ino, 0x9999);
        }
    }
}

#[test]
fn hardlink_keys_use_narrow_encoding_before_26() {
    let mut entry = sample_file("narrow", 4, 9, 0, 0);
    entry.set_hardlink_key(HardLinkKey { dev: 77, ino: 88 });
    let mut writer = FileListWriter::new(ProtocolVersion::V25).with_preserve_hard_links(true);
    let mut reader = FileListReader::new(ProtocolVersion::V25).with_preserve_hard_links(true);
    let decoded = roundtrip_with(&[entry], &mut writer, &mut reader);
    let key = decoded[0].hardlink_key().expect("key");
    assert_eq!((key.dev, key.ino), (77, 88));
}

#[test]
fn same_dev_elides_device_word_from_28() {
    let mut a = sample_file("hl/a", 4, 9, 0, 0);
    a.set_hardlink_key(HardLinkKey { dev: 5, ino: 100 });
    let mut b = sample_file("hl/b", 4, 9, 0, 0);
    b.set_hardlink_key(HardLinkKey { dev: 5, ino: 101 });

    let mut writer28 = FileListWriter::new(ProtocolVersion::V28).with_preserve_hard_links(true);
    let segments28 = encode_segments(&mut writer28, &[a.clone(), b.clone()]);
    let mut writer27 = FileListWriter::new(ProtocolVersion::V27).with_preserve_hard_links(true);
    let segments27 = encode_segments(&mut writer27, &[a, b]);

    // Protocol 28 drops the repeated dev from the second entry; 27 keeps it.
    assert!(segments28[1].len() < segments27[1].len());
}

// ============================================================================
// Checksums
// ============================================================================

#[test]
fn checksums_roundtrip_full_width() {
    let mut entry = sample_file("summed", 10, 3, 0, 0);
    entry.set_checksum(vec![0xAB; 16]);
    let mut writer = FileListWriter::new(ProtocolVersion::NEWEST).with_checksums(true);
    let mut reader = FileListReader::new(ProtocolVersion::NEWEST).with_checksums(true);
    let decoded = roundtrip_with(&[entry], &mut writer, &mut reader);
    assert_eq!(decoded[0].checksum(), Some(&[0xAB; 16][..]));
}

#[test]
fn checksums_truncate_to_two_bytes_before_21() {
    let mut entry = sample_file("short", 10, 3, 0, 0);
    entry.set_checksum(vec![0xCD; 16]);
    let mut writer = FileListWriter::new(ProtocolVersion::V20).with_checksums(true);
    let mut reader = FileListReader::new(ProtocolVersion::V20).with_checksums(true);
    let decoded = roundtrip_with(&[entry], &mut writer, &mut reader);
    assert_eq!(decoded[0].checksum(), Some(&[0xCD; 2][..]));
}

#[test]
fn pre28_non_regular_entries_carry_null_sum() {
    let mut dir = FileEntry::new_directory("d", 0o755);
    dir.set_mtime(1);
    let file = sample_file("f", 1, 1, 0, 0);
    let mut writer = FileListWriter::new(ProtocolVersion::V27).with_checksums(true);
    let mut reader = FileListReader::new(ProtocolVersion::V27).with_checksums(true);
    let decoded = roundtrip_with(&[dir, file], &mut writer, &mut reader);
    assert_eq!(decoded[0].checksum(), None, "null sum is discarded");
    assert!(decoded[1].checksum().is_some());
}

// ============================================================================
// Sizes
// ============================================================================

#[test]
fn sixty_four_bit_sizes_roundtrip() {
    let size = 5_368_709_120u64; // 5 GiB
    let entry = sample_file("huge.bin", size, 1, 0, 0);
    for protocol in ALL_PROTOCOLS {
        let decoded = roundtrip(std::slice::from_ref(&entry), protocol);
        assert_eq!(decoded[0].size(), size, "protocol {protocol}");
    }
}

// ============================================================================
// Error paths
// ============================================================================

#[test]
fn oversized_name_length_is_fatal() {
    // Hand-build an entry whose declared suffix length exceeds MAXPATHLEN.
    let mut buf = Vec::new();
    buf.push(0x40u8); // XMIT_LONG_NAME alone
    buf.extend_from_slice(&(protocol::MAXPATHLEN as i32 + 10).to_le_bytes());
    let mut reader = FileListReader::new(ProtocolVersion::V27);
    let err = reader
        .read_entry(&mut Cursor::new(&buf))
        .expect_err("overflow");
    assert!(err.to_string().contains("overflow"));
}

#[test]
fn truncated_stream_reports_io_error() {
    let mut writer = FileListWriter::new(ProtocolVersion::NEWEST);
    let mut buf = Vec::new();
    writer
        .write_entry(&mut buf, &sample_file("cut", 1, 2, 0, 0))
        .expect("write");
    buf.truncate(buf.len() - 2);
    let mut reader = FileListReader::new(ProtocolVersion::NEWEST);
    assert!(reader.read_entry(&mut Cursor::new(&buf)).is_err());
}
