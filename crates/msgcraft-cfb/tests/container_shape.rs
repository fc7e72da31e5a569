use msgcraft_cfb::tree::Storage;

const MAGIC: [u8; 8] = [0xd0, 0xcf, 0x11, 0xe0, 0xa1, 0xb1, 0x1a, 0xe1];

fn write_to_vec(root: Storage) -> Vec<u8> {
    let mut out = Vec::new();
    msgcraft_cfb::write(root, &mut out).unwrap();
    out
}

#[test]
fn header_carries_the_cfb_magic_signature() {
    let mut root = Storage::new("/");
    root.add_stream("Hello", b"world".to_vec());
    let bytes = write_to_vec(root);
    assert_eq!(&bytes[0..8], &MAGIC);
}

#[test]
fn file_length_is_a_multiple_of_the_sector_size() {
    let mut root = Storage::new("/");
    root.add_stream("A", vec![0u8; 10]);
    root.add_stream("B", vec![1u8; 5000]); // forces a large (non-mini) stream
    let bytes = write_to_vec(root);
    assert_eq!(bytes.len() % 512, 0);
}

#[test]
fn header_declares_cfb_v3_with_512_byte_sectors() {
    let bytes = write_to_vec(Storage::new("/"));
    let major_version = u16::from_le_bytes(bytes[26..28].try_into().unwrap());
    let sector_shift = u16::from_le_bytes(bytes[30..32].try_into().unwrap());
    let mini_sector_shift = u16::from_le_bytes(bytes[32..34].try_into().unwrap());
    assert_eq!(major_version, 3);
    assert_eq!(sector_shift, 9); // 2^9 == 512
    assert_eq!(mini_sector_shift, 6); // 2^6 == 64
}

#[test]
fn empty_root_storage_still_produces_a_valid_header_sector() {
    let bytes = write_to_vec(Storage::new("/"));
    assert_eq!(&bytes[0..8], &MAGIC);
    assert!(bytes.len() >= 512);
}

#[test]
fn a_stream_under_the_mini_stream_cutoff_is_not_allocated_as_a_large_stream() {
    // A single small stream needs no large-stream sectors at all: the whole
    // file should be header + FAT + directory + mini-stream, nothing more.
    let mut root = Storage::new("/");
    root.add_stream("tiny", vec![7u8; 20]);
    let bytes = write_to_vec(root);
    // header (1) + FAT (1) + mini-FAT (1) + dir (1) + mini-stream (1, rounded up to 512 bytes)
    assert_eq!(bytes.len(), 512 * 5);
}

/// Regression test for a writer bug where the root directory entry's start
/// sector and size were always written as `(0, 0)` instead of pointing at
/// the mini-stream, which would make every mini-stream stream's contents
/// unreachable to a reader that follows MS-CFB's root-entry convention.
#[test]
fn root_entry_points_at_the_mini_stream_when_one_exists() {
    const ENDOFCHAIN: u32 = 0xFFFF_FFFE;

    let mut root = Storage::new("/");
    root.add_stream("tiny", vec![7u8; 20]);
    let bytes = write_to_vec(root);

    let dir_start = u32::from_le_bytes(bytes[48..52].try_into().unwrap());
    // Layout for this fixture (see the sibling mini-stream-only test): FAT,
    // mini-FAT, directory, then the mini-stream, one sector each.
    let expected_ministream_start = dir_start + 1;

    let dir_sector_offset = 512usize + dir_start as usize * 512;
    let root_entry = &bytes[dir_sector_offset..dir_sector_offset + 128];
    let root_start_sector = u32::from_le_bytes(root_entry[116..120].try_into().unwrap());
    let root_size = u64::from_le_bytes(root_entry[120..128].try_into().unwrap());

    assert_ne!(root_start_sector, ENDOFCHAIN, "root entry should reference the mini-stream, not be empty");
    assert_eq!(root_start_sector, expected_ministream_start);
    assert_eq!(root_size, 64, "mini-stream size should be one 64-byte mini-sector for a 20-byte stream");
}

/// Regression test for a writer bug where `write_difat_overflow` always
/// wrote a `0` next-sector pointer instead of chaining to the following
/// DIFAT sector (or terminating with `ENDOFCHAIN`), which would corrupt any
/// container large enough to need DIFAT overflow (more than 109 FAT
/// sectors). A single stream well past that threshold forces two overflow
/// sectors, exercising both the chain-continuation and chain-termination
/// cases.
#[test]
fn difat_overflow_sectors_chain_correctly_when_fat_exceeds_inline_capacity() {
    const ENDOFCHAIN: u32 = 0xFFFF_FFFE;

    let mut root = Storage::new("/");
    // ~20 MiB: enough large-stream sectors to push the FAT past 109 inline
    // DIFAT entries and require a second DIFAT overflow sector.
    root.add_stream("big", vec![0x42u8; 20_000_000]);
    let bytes = write_to_vec(root);

    let fat_sectors = u32::from_le_bytes(bytes[44..48].try_into().unwrap());
    let first_difat_sector = u32::from_le_bytes(bytes[68..72].try_into().unwrap());
    let difat_sector_count = u32::from_le_bytes(bytes[72..76].try_into().unwrap());

    assert!(fat_sectors > 109, "test fixture should force DIFAT overflow, got {fat_sectors} FAT sectors");
    assert_eq!(difat_sector_count, 2, "expected exactly two overflow sectors for this fixture size");

    let sector_offset = |sector: u32| 512usize + sector as usize * 512;

    // First overflow sector: the last 4 bytes are its next-sector pointer,
    // which must chain forward to the second overflow sector.
    let first = sector_offset(first_difat_sector);
    let first_next = u32::from_le_bytes(bytes[first + 508..first + 512].try_into().unwrap());
    assert_eq!(first_next, first_difat_sector + 1);

    // Second (last) overflow sector: its next-sector pointer must terminate
    // the chain, not silently read back as sector 0.
    let second = sector_offset(first_difat_sector + 1);
    let second_next = u32::from_le_bytes(bytes[second + 508..second + 512].try_into().unwrap());
    assert_eq!(second_next, ENDOFCHAIN);
}
