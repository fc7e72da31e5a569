use crate::error::CfbError;
use crate::tree::{cfb_name_cmp, Node, Storage};
use msgcraft_util::io::{wru16le, wru32le, wru64le, wru8};
use msgcraft_util::win32::GUID;
use std::io::Write;
use tracing::debug;

const SECTOR_SIZE: usize = 512;
const MINI_SECTOR_SIZE: usize = 64;
const MINI_STREAM_CUTOFF: u64 = 4096;
const DIFAT_INLINE_COUNT: usize = 109;
const DIFAT_SECTOR_CAPACITY: usize = 127;
const FAT_ENTRIES_PER_SECTOR: usize = SECTOR_SIZE / 4;

const FREESECT: u32 = 0xFFFF_FFFF;
const ENDOFCHAIN: u32 = 0xFFFF_FFFE;
const FATSECT: u32 = 0xFFFF_FFFD;
const DIFSECT: u32 = 0xFFFF_FFFC;
const NOSTREAM: u32 = 0xFFFF_FFFF;

/// MS-CFB v3's addressable space is bounded by 32-bit sector indices; a
/// conservative cap well under the theoretical maximum keeps generated
/// files inside what real readers accept.
const MAX_FILE_SIZE: u64 = 2 * 1024 * 1024 * 1024;

fn ceil_div(a: u64, b: u64) -> u64 {
    (a + b - 1) / b
}

struct RawEntry {
    name: String,
    is_storage: bool,
    child: u32,
    left: u32,
    right: u32,
    size: u64,
    data: Option<Vec<u8>>,
    is_mini: bool,
    /// Starting sector: a file sector for large streams, a mini-sector
    /// index (relative to the mini-stream) for mini streams, unused for
    /// storages and zero-size streams.
    start_sector: u32,
}

/// Flattens the logical tree into a directory-entry array, assigning each
/// storage's sibling chain as a single left-leaning chain (see module docs).
struct TreeBuilder {
    entries: Vec<RawEntry>,
    mini_stream_order: Vec<u32>,
    large_stream_order: Vec<u32>,
}

impl TreeBuilder {
    fn new() -> Self {
        Self {
            entries: Vec::new(),
            mini_stream_order: Vec::new(),
            large_stream_order: Vec::new(),
        }
    }

    fn alloc(&mut self, node: Node) -> u32 {
        match node {
            Node::Stream { name, data } => {
                let id = self.entries.len() as u32;
                let is_mini = (data.len() as u64) < MINI_STREAM_CUTOFF;
                if data.is_empty() {
                    // zero-size streams need no allocation at all
                } else if is_mini {
                    self.mini_stream_order.push(id);
                } else {
                    self.large_stream_order.push(id);
                }
                self.entries.push(RawEntry {
                    name,
                    is_storage: false,
                    child: NOSTREAM,
                    left: NOSTREAM,
                    right: NOSTREAM,
                    size: data.len() as u64,
                    data: Some(data),
                    is_mini,
                    start_sector: 0,
                });
                id
            }
            Node::Storage(storage) => {
                let id = self.entries.len() as u32;
                // reserve the slot; filled in once children are known
                self.entries.push(RawEntry {
                    name: storage.name.clone(),
                    is_storage: true,
                    child: NOSTREAM,
                    left: NOSTREAM,
                    right: NOSTREAM,
                    size: 0,
                    data: None,
                    is_mini: false,
                    start_sector: 0,
                });
                let mut child_ids: Vec<u32> = storage
                    .children
                    .into_iter()
                    .map(|c| self.alloc(c))
                    .collect();
                child_ids.sort_by(|&a, &b| cfb_name_cmp(&self.entries[a as usize].name, &self.entries[b as usize].name));
                let mut chain = NOSTREAM;
                for &cid in &child_ids {
                    self.entries[cid as usize].left = chain;
                    chain = cid;
                }
                self.entries[id as usize].child = chain;
                id
            }
        }
    }
}

fn encode_entry_name(name: &str) -> Result<([u8; 64], u16), CfbError> {
    if name.encode_utf16().count() > 31 {
        return Err(CfbError::CapacityExceeded(format!(
            "directory entry name {name:?} exceeds the 31 UTF-16-unit MS-CFB limit"
        )));
    }
    let mut buf = [0u8; 64];
    let mut offset = 0usize;
    for unit in name.encode_utf16() {
        buf[offset..offset + 2].copy_from_slice(&unit.to_le_bytes());
        offset += 2;
    }
    // trailing NUL already zero from the buffer's initialization
    let namelen = (offset + 2) as u16;
    Ok((buf, namelen))
}

/// Serializes `root` into an MS-CFB v3 compound file and writes it to `w`.
///
/// `root`'s own name is ignored; the directory entry for the tree's root is
/// always named `"Root Entry"` per MS-CFB.
pub fn write<W: Write>(root: Storage, mut w: W) -> Result<(), CfbError> {
    let mut builder = TreeBuilder::new();
    let root_id = builder.alloc(Node::Storage(root));
    debug_assert_eq!(root_id, 0);
    builder.entries[0].name = "Root Entry".to_string();

    let TreeBuilder {
        mut entries,
        mini_stream_order,
        large_stream_order,
    } = builder;

    // --- mini-stream sector accounting -------------------------------------------------
    let mut mini_sector_count: u64 = 0;
    let mut mini_chain_ranges: Vec<(u32, u64)> = Vec::new(); // (first mini-sector, count)
    for &id in &mini_stream_order {
        let size = entries[id as usize].size;
        let count = ceil_div(size, MINI_SECTOR_SIZE as u64);
        mini_chain_ranges.push((mini_sector_count as u32, count));
        mini_sector_count += count;
    }
    let mini_stream_bytes = mini_sector_count * MINI_SECTOR_SIZE as u64;

    // --- large-stream sector accounting -------------------------------------------------
    let mut large_chain_ranges: Vec<(u32, u64)> = Vec::new(); // relative sector offsets, filled once placed
    let mut large_total_sectors: u64 = 0;
    for &id in &large_stream_order {
        let size = entries[id as usize].size;
        let count = ceil_div(size, SECTOR_SIZE as u64);
        large_chain_ranges.push((large_total_sectors as u32, count));
        large_total_sectors += count;
    }

    let n_entries = entries.len() as u64;
    let dir_sectors = ceil_div(n_entries * 128, SECTOR_SIZE as u64);
    let minifat_sectors = ceil_div(mini_sector_count * 4, SECTOR_SIZE as u64);
    let ministream_sectors = ceil_div(mini_stream_bytes, SECTOR_SIZE as u64);

    let fixed_overhead = dir_sectors + minifat_sectors + ministream_sectors + large_total_sectors;

    // fixed-point sizing: FAT sectors must describe themselves and any DIFAT
    // overflow sectors, which in turn depend on how many FAT sectors exist.
    let mut fat_sectors = ceil_div(fixed_overhead.max(1), FAT_ENTRIES_PER_SECTOR as u64);
    let mut difat_sectors = 0u64;
    for _ in 0..64 {
        difat_sectors = if fat_sectors as usize <= DIFAT_INLINE_COUNT {
            0
        } else {
            ceil_div((fat_sectors as usize - DIFAT_INLINE_COUNT) as u64, DIFAT_SECTOR_CAPACITY as u64)
        };
        let total_tracked = fixed_overhead + fat_sectors + difat_sectors;
        let new_fat = ceil_div(total_tracked, FAT_ENTRIES_PER_SECTOR as u64);
        if new_fat == fat_sectors {
            break;
        }
        fat_sectors = new_fat;
    }

    let total_sectors = fat_sectors + difat_sectors + minifat_sectors + dir_sectors + ministream_sectors + large_total_sectors;
    let total_file_size = SECTOR_SIZE as u64 + total_sectors * SECTOR_SIZE as u64;
    if total_file_size > MAX_FILE_SIZE {
        return Err(CfbError::CapacityExceeded(format!(
            "assembled container would be {total_file_size} bytes, exceeding the {MAX_FILE_SIZE}-byte limit"
        )));
    }
    debug!(
        fat_sectors,
        difat_sectors, minifat_sectors, dir_sectors, ministream_sectors, large_total_sectors, total_file_size,
        "sized MS-CFB container"
    );

    // --- sector numbering ----------------------------------------------------------------
    let mut cursor = 0u32;
    let fat_start = cursor;
    cursor += fat_sectors as u32;
    let difat_start = cursor;
    cursor += difat_sectors as u32;
    let minifat_start = cursor;
    cursor += minifat_sectors as u32;
    let dir_start = cursor;
    cursor += dir_sectors as u32;
    let ministream_start = if mini_stream_bytes > 0 {
        let s = cursor;
        cursor += ministream_sectors as u32;
        s
    } else {
        ENDOFCHAIN
    };
    let large_data_start = cursor;

    // --- build the FAT ---------------------------------------------------------------------
    let fat_len = (fat_sectors as usize) * FAT_ENTRIES_PER_SECTOR;
    let mut fat = vec![FREESECT; fat_len];
    for i in fat_start..fat_start + fat_sectors as u32 {
        fat[i as usize] = FATSECT;
    }
    for i in difat_start..difat_start + difat_sectors as u32 {
        fat[i as usize] = DIFSECT;
    }
    write_chain(&mut fat, minifat_start, minifat_sectors as u32);
    write_chain(&mut fat, dir_start, dir_sectors as u32);
    if mini_stream_bytes > 0 {
        write_chain(&mut fat, ministream_start, ministream_sectors as u32);
    }
    for &(rel_start, count) in &large_chain_ranges {
        write_chain(&mut fat, large_data_start + rel_start, count as u32);
    }

    // --- build the mini-FAT ------------------------------------------------------------------
    let mut minifat = vec![FREESECT; mini_sector_count as usize];
    for &(rel_start, count) in &mini_chain_ranges {
        write_chain(&mut minifat, rel_start, count as u32);
    }

    // --- resolve per-stream start sectors ------------------------------------------------------
    for (idx, &id) in mini_stream_order.iter().enumerate() {
        let (rel_start, _) = mini_chain_ranges[idx];
        // mini sector numbers are relative to the mini-stream itself, not file sectors
        entries[id as usize].start_sector = rel_start;
    }
    for (idx, &id) in large_stream_order.iter().enumerate() {
        let (rel_start, _) = large_chain_ranges[idx];
        entries[id as usize].start_sector = large_data_start + rel_start;
    }

    entries[0].size = mini_stream_bytes;

    // --- header ------------------------------------------------------------------------------
    write_header(&mut w, fat_sectors as u32, dir_start, minifat_start, minifat_sectors as u32, difat_start, difat_sectors as u32)?;

    // FAT sectors
    write_u32_sectors(&mut w, &fat, fat_sectors as usize)?;

    // DIFAT overflow sectors
    if difat_sectors > 0 {
        write_difat_overflow(&mut w, fat_sectors as u32, difat_start, difat_sectors as u32)?;
    }

    // mini-FAT sectors
    write_u32_sectors(&mut w, &minifat, minifat_sectors as usize)?;

    // directory sectors
    write_directory(&mut w, &entries, dir_sectors as usize, ministream_start, mini_stream_bytes)?;

    // mini-stream data, packed contiguously in mini_stream_order
    if mini_stream_bytes > 0 {
        let mut buf = Vec::with_capacity(mini_stream_bytes as usize);
        for &id in &mini_stream_order {
            let data = entries[id as usize].data.as_ref().expect("mini stream has data");
            buf.extend_from_slice(data);
            pad_to(&mut buf, MINI_SECTOR_SIZE);
        }
        pad_to(&mut buf, SECTOR_SIZE);
        w.write_all(&buf)?;
    }

    // large stream data
    for &id in &large_stream_order {
        let data = entries[id as usize].data.as_ref().expect("large stream has data");
        w.write_all(data)?;
        let padded = ceil_div(data.len() as u64, SECTOR_SIZE as u64) * SECTOR_SIZE as u64;
        let pad_len = padded - data.len() as u64;
        if pad_len > 0 {
            w.write_all(&vec![0u8; pad_len as usize])?;
        }
    }

    Ok(())
}

fn write_chain(fat: &mut [u32], start: u32, count: u32) {
    if count == 0 {
        return;
    }
    for i in 0..count {
        let sector = start + i;
        fat[sector as usize] = if i + 1 == count { ENDOFCHAIN } else { sector + 1 };
    }
}

fn pad_to(buf: &mut Vec<u8>, align: usize) {
    let rem = buf.len() % align;
    if rem != 0 {
        buf.resize(buf.len() + (align - rem), 0);
    }
}

fn write_u32_sectors<W: Write>(w: &mut W, values: &[u32], sector_count: usize) -> Result<(), CfbError> {
    let mut buf = Vec::with_capacity(sector_count * SECTOR_SIZE);
    for &v in values {
        buf.extend_from_slice(&v.to_le_bytes());
    }
    pad_to(&mut buf, SECTOR_SIZE);
    w.write_all(&buf)?;
    Ok(())
}

fn write_difat_overflow<W: Write>(
    w: &mut W,
    fat_sectors: u32,
    difat_start: u32,
    difat_sectors: u32,
) -> Result<(), CfbError> {
    let remaining: Vec<u32> = (DIFAT_INLINE_COUNT as u32..fat_sectors).collect();
    let mut buf = Vec::with_capacity(difat_sectors as usize * SECTOR_SIZE);
    for sector_idx in 0..difat_sectors {
        let start = sector_idx as usize * DIFAT_SECTOR_CAPACITY;
        let end = (start + DIFAT_SECTOR_CAPACITY).min(remaining.len());
        for &v in &remaining[start..end] {
            buf.extend_from_slice(&v.to_le_bytes());
        }
        for _ in end - start..DIFAT_SECTOR_CAPACITY {
            buf.extend_from_slice(&FREESECT.to_le_bytes());
        }
        // next-DIFAT-sector pointer: sectors are laid out contiguously right
        // after this one, starting at difat_start.
        let next_ptr = if sector_idx + 1 == difat_sectors {
            ENDOFCHAIN
        } else {
            difat_start + sector_idx + 1
        };
        buf.extend_from_slice(&next_ptr.to_le_bytes());
    }
    pad_to(&mut buf, SECTOR_SIZE);
    w.write_all(&buf)?;
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn write_header<W: Write>(
    w: &mut W,
    fat_sectors: u32,
    first_dir_sector: u32,
    first_minifat_sector: u32,
    minifat_sectors: u32,
    first_difat_sector_maybe: u32,
    difat_sectors: u32,
) -> Result<(), CfbError> {
    let mut buf = Vec::with_capacity(SECTOR_SIZE);
    buf.extend_from_slice(&[0xd0, 0xcf, 0x11, 0xe0, 0xa1, 0xb1, 0x1a, 0xe1]);
    buf.extend_from_slice(&GUID::null().to_le_bytes());
    buf.extend_from_slice(&0x003Eu16.to_le_bytes()); // minor version
    buf.extend_from_slice(&0x0003u16.to_le_bytes()); // major version (v3)
    buf.extend_from_slice(&0xFFFEu16.to_le_bytes()); // byte order
    buf.extend_from_slice(&0x0009u16.to_le_bytes()); // sector shift: 512 bytes
    buf.extend_from_slice(&0x0006u16.to_le_bytes()); // mini sector shift: 64 bytes
    buf.extend_from_slice(&[0u8; 6]); // reserved
    buf.extend_from_slice(&0u32.to_le_bytes()); // number of directory sectors, v3 = 0
    buf.extend_from_slice(&fat_sectors.to_le_bytes());
    buf.extend_from_slice(&first_dir_sector.to_le_bytes());
    buf.extend_from_slice(&0u32.to_le_bytes()); // transaction signature
    buf.extend_from_slice(&0x0000_1000u32.to_le_bytes()); // mini-stream cutoff
    buf.extend_from_slice(&first_minifat_sector.to_le_bytes());
    buf.extend_from_slice(&minifat_sectors.to_le_bytes());
    let first_difat_sector = if difat_sectors == 0 { ENDOFCHAIN } else { first_difat_sector_maybe };
    buf.extend_from_slice(&first_difat_sector.to_le_bytes());
    buf.extend_from_slice(&difat_sectors.to_le_bytes());
    for i in 0..DIFAT_INLINE_COUNT as u32 {
        let v = if i < fat_sectors { i } else { FREESECT };
        buf.extend_from_slice(&v.to_le_bytes());
    }
    debug_assert_eq!(buf.len(), SECTOR_SIZE);
    w.write_all(&buf)?;
    Ok(())
}

fn write_directory<W: Write>(
    w: &mut W,
    entries: &[crate::writer::RawEntry],
    dir_sectors: usize,
    ministream_start: u32,
    mini_stream_bytes: u64,
) -> Result<(), CfbError> {
    let mut buf = Vec::with_capacity(dir_sectors * SECTOR_SIZE);
    for (id, e) in entries.iter().enumerate() {
        let (name_buf, namelen) = encode_entry_name(&e.name)?;
        buf.extend_from_slice(&name_buf);
        wru16le(&mut buf, namelen)?;
        let objtype: u8 = if id == 0 {
            0x05
        } else if e.is_storage {
            0x01
        } else {
            0x02
        };
        wru8(&mut buf, objtype)?;
        wru8(&mut buf, 0x01)?; // color: all entries "black" (left-leaning chain)
        wru32le(&mut buf, e.left)?;
        wru32le(&mut buf, e.right)?;
        wru32le(&mut buf, e.child)?;
        buf.extend_from_slice(&GUID::null().to_le_bytes());
        wru32le(&mut buf, 0)?; // state flags
        wru64le(&mut buf, 0)?; // creation time
        wru64le(&mut buf, 0)?; // modification time
        let (start_sector, size) = if id == 0 {
            // the root entry's starting sector / size describe the mini
            // stream as a whole, not the (empty) root storage itself
            if mini_stream_bytes > 0 {
                (ministream_start, mini_stream_bytes)
            } else {
                (ENDOFCHAIN, 0)
            }
        } else {
            entry_placement(e)
        };
        wru32le(&mut buf, start_sector)?;
        wru64le(&mut buf, size)?;
    }
    // pad out unused directory entries to a full sector multiple
    let total_entries = dir_sectors * (SECTOR_SIZE / 128);
    for _ in entries.len()..total_entries {
        buf.extend_from_slice(&[0u8; 64]); // empty name
        wru16le(&mut buf, 0)?;
        wru8(&mut buf, 0)?; // unused
        wru8(&mut buf, 0x01)?;
        wru32le(&mut buf, NOSTREAM)?;
        wru32le(&mut buf, NOSTREAM)?;
        wru32le(&mut buf, NOSTREAM)?;
        buf.extend_from_slice(&GUID::null().to_le_bytes());
        wru32le(&mut buf, 0)?;
        wru64le(&mut buf, 0)?;
        wru64le(&mut buf, 0)?;
        wru32le(&mut buf, 0)?;
        wru64le(&mut buf, 0)?;
    }
    pad_to(&mut buf, SECTOR_SIZE);
    w.write_all(&buf)?;
    Ok(())
}

fn entry_placement(e: &RawEntry) -> (u32, u64) {
    if e.is_storage {
        return (0, 0);
    }
    if e.size == 0 {
        return (ENDOFCHAIN, 0);
    }
    (e.start_sector, e.size)
}
