use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use block_dev::BlockDevice;
use flat_fs::{BLOCK_SIZE, FCB_COUNT, FatEntry, FcbKind, FlatFileSystem, FsError, NAME_MAX_LEN};

use crate::BlockFile;

/// Memory-backed block device, enough for most of the suite.
struct RamDisk(Mutex<Vec<u8>>);

impl RamDisk {
    fn new(total_blocks: usize) -> Arc<Self> {
        Arc::new(Self(Mutex::new(vec![0; total_blocks * BLOCK_SIZE])))
    }
}

impl BlockDevice for RamDisk {
    fn read_block(&self, block_id: usize, buf: &mut [u8]) {
        let data = self.0.lock().unwrap();
        let start = block_id * BLOCK_SIZE;
        buf.copy_from_slice(&data[start..start + BLOCK_SIZE]);
    }

    fn write_block(&self, block_id: usize, buf: &[u8]) {
        let mut data = self.0.lock().unwrap();
        let start = block_id * BLOCK_SIZE;
        data[start..start + BLOCK_SIZE].copy_from_slice(buf);
    }
}

fn mkfs(total_blocks: usize) -> (Arc<RamDisk>, FlatFileSystem) {
    let disk = RamDisk::new(total_blocks);
    let fs = FlatFileSystem::format(disk.clone(), total_blocks).unwrap();
    (disk, fs)
}

/// Blocks of a chain in order, starting at `first` and ending at the EOF block.
fn chain(fs: &FlatFileSystem, first: u32) -> Vec<u32> {
    let mut blocks = vec![first];
    let mut current = first;
    while let Some(next) = fs.fat_entry(current).next() {
        blocks.push(next);
        current = next;
    }
    blocks
}

fn temp_image(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("flatfs-{name}.img"))
}

#[test]
fn format_lays_out_regions() {
    // 512KiB => 128 blocks: 1 bitmap block + 1 fat block + 3 fcb blocks
    let (_disk, fs) = mkfs(128);
    let sb = fs.super_block();

    assert_eq!(128, sb.total_blocks);
    assert_eq!(0, sb.root_fcb);
    assert_eq!(1, sb.bitmap_start);
    assert_eq!(2, sb.fat_start);
    assert_eq!(3, fs.regions().fcb_start);
    assert_eq!(6, sb.data_start);
    // metadata and the root block are already spoken for
    assert_eq!(121, sb.free_blocks);

    let root = fs.fcb(sb.root_fcb);
    assert_eq!(FcbKind::Directory, root.kind);
    assert_eq!(sb.data_start, root.first_block);
    assert_eq!(0, root.size);
    assert_eq!(FatEntry::EOF, fs.fat_entry(root.first_block));
    assert!(fs.block_in_use(root.first_block));

    assert!(fs.read_dir().is_empty());
}

#[test]
fn format_scales_the_fat_region() {
    // 16MiB => 4096 blocks: the fat spills into 4 blocks
    let (_disk, fs) = mkfs(4096);
    let sb = fs.super_block();

    assert_eq!(1, sb.bitmap_start);
    assert_eq!(2, sb.fat_start);
    assert_eq!(6, fs.regions().fcb_start);
    assert_eq!(9, sb.data_start);
    assert_eq!(4096 - 9 - 1, sb.free_blocks);
}

#[test]
fn format_rejects_undersized_volumes() {
    let disk = RamDisk::new(6);
    assert!(matches!(
        FlatFileSystem::format(disk, 6),
        Err(FsError::OutOfSpace)
    ));

    // 7 blocks is the smallest viable volume; it holds exactly the root
    let (_disk, fs) = mkfs(7);
    assert_eq!(0, fs.super_block().free_blocks);
}

#[test]
fn allocation_is_distinct_until_exhaustion() {
    let (_disk, mut fs) = mkfs(16);
    let sb = fs.super_block();

    let mut seen = Vec::new();
    for _ in 0..sb.free_blocks {
        let block = fs.alloc_block().unwrap();
        assert!(sb.data_start <= block && block < sb.total_blocks);
        assert!(!seen.contains(&block));
        assert!(fs.block_in_use(block));
        assert_eq!(FatEntry::EOF, fs.fat_entry(block));
        seen.push(block);
    }

    assert_eq!(0, fs.super_block().free_blocks);
    assert!(matches!(fs.alloc_block(), Err(FsError::OutOfSpace)));
    // a failed allocation takes nothing with it
    assert_eq!(0, fs.super_block().free_blocks);
}

#[test]
fn bitmap_and_fat_stay_consistent() {
    let (_disk, mut fs) = mkfs(64);
    fs.make_dir("logs").unwrap();
    fs.create_file("a.txt").unwrap();
    fs.append("a.txt", &vec![7u8; BLOCK_SIZE + 100]).unwrap();
    fs.create_file("b.txt").unwrap();

    let sb = fs.super_block();
    let mut in_use = 0;
    for block in sb.data_start..sb.total_blocks {
        let used = fs.block_in_use(block);
        assert_eq!(used, fs.fat_entry(block) != FatEntry::FREE, "block {block}");
        in_use += u32::from(used);
    }
    assert_eq!(sb.total_blocks - sb.data_start - sb.free_blocks, in_use);
}

#[test]
fn append_grows_the_chain() {
    let (disk, mut fs) = mkfs(64);
    let fcb_index = fs.create_file("data.bin").unwrap();
    let first = fs.fcb(fcb_index).first_block;
    assert_eq!(vec![first], chain(&fs, first));

    fs.append("data.bin", b"Hello").unwrap();
    assert_eq!(5, fs.fcb(fcb_index).size);
    assert_eq!(1, chain(&fs, first).len());

    fs.append("data.bin", &vec![0xAB; 2 * BLOCK_SIZE + 7]).unwrap();
    let fcb = fs.fcb(fcb_index);
    assert_eq!((2 * BLOCK_SIZE + 12) as u32, fcb.size);

    let blocks = chain(&fs, first);
    assert_eq!((fcb.size as usize).div_ceil(BLOCK_SIZE), blocks.len());
    assert_eq!(3, blocks.len());
    assert_eq!(FatEntry::EOF, fs.fat_entry(blocks[2]));

    // the payload really lands on the device
    fs.sync_all();
    let mut buf = [0u8; BLOCK_SIZE];
    disk.read_block(first as usize, &mut buf);
    assert_eq!(b"Hello", &buf[..5]);
    assert_eq!(0xAB, buf[5]);
}

#[test]
fn append_at_block_boundary_allocates_first() {
    let (disk, mut fs) = mkfs(64);
    let fcb_index = fs.create_file("full.bin").unwrap();
    let first = fs.fcb(fcb_index).first_block;

    fs.append("full.bin", &vec![1u8; BLOCK_SIZE]).unwrap();
    assert_eq!(BLOCK_SIZE as u32, fs.fcb(fcb_index).size);
    assert_eq!(1, chain(&fs, first).len());

    // the first byte past a full block goes to a fresh block
    fs.append("full.bin", b"x").unwrap();
    let blocks = chain(&fs, first);
    assert_eq!(2, blocks.len());
    assert_eq!((BLOCK_SIZE + 1) as u32, fs.fcb(fcb_index).size);

    fs.sync_all();
    let mut buf = [0u8; BLOCK_SIZE];
    disk.read_block(blocks[1] as usize, &mut buf);
    assert_eq!(b'x', buf[0]);
    // the filled block kept its final byte
    disk.read_block(first as usize, &mut buf);
    assert_eq!(1, buf[BLOCK_SIZE - 1]);
}

#[test]
fn append_reports_missing_and_mistyped_names() {
    let (_disk, mut fs) = mkfs(64);
    let dir_fcb = fs.make_dir("stuff").unwrap();

    assert!(matches!(fs.append("nope", b"x"), Err(FsError::NotFound)));
    assert!(matches!(fs.append("stuff", b"x"), Err(FsError::WrongType)));
    // the refused append moved nothing
    assert_eq!(32, fs.fcb(dir_fcb).size);
}

#[test]
fn names_cap_at_27_bytes() {
    let (_disk, mut fs) = mkfs(64);

    let long = "a".repeat(NAME_MAX_LEN + 1);
    assert!(matches!(fs.create_file(&long), Err(FsError::NameTooLong)));
    assert!(matches!(fs.make_dir(&long), Err(FsError::NameTooLong)));
    // the refusal consumed nothing
    let sb = fs.super_block();
    assert_eq!(sb.total_blocks - sb.data_start - 1, sb.free_blocks);

    let edge = "b".repeat(NAME_MAX_LEN);
    fs.create_file(&edge).unwrap();
    assert_eq!(edge, fs.read_dir()[0].name);
}

#[test]
fn demo_walkthrough_listing() {
    // 512KiB volume: one directory, one file, two appends
    let (_disk, mut fs) = mkfs(128);
    fs.make_dir("test_dir").unwrap();
    fs.create_file("file1.txt").unwrap();
    fs.append("file1.txt", b"Hello").unwrap();
    fs.append("file1.txt", b" World!").unwrap();

    let entries = fs.read_dir();
    assert_eq!(2, entries.len());

    assert_eq!("test_dir", entries[0].name);
    assert_eq!(FcbKind::Directory, entries[0].kind);
    // a directory weighs in at one entry record
    assert_eq!(32, entries[0].size);
    assert_eq!(1, entries[0].fcb);

    assert_eq!("file1.txt", entries[1].name);
    assert_eq!(FcbKind::Regular, entries[1].kind);
    assert_eq!(12, entries[1].size);
    assert_eq!(2, entries[1].fcb);

    // one data block went out per creation
    assert_eq!(121 - 2, fs.super_block().free_blocks);
}

#[test]
fn directory_caps_at_one_block_of_entries() {
    let (_disk, mut fs) = mkfs(256);
    let entries_per_block = BLOCK_SIZE / 32;

    for i in 0..entries_per_block {
        fs.create_file(&format!("f{i}")).unwrap();
    }
    assert_eq!(BLOCK_SIZE as u32, fs.fcb(0).size);
    let free_before = fs.super_block().free_blocks;

    // the 129th entry has nowhere to go...
    assert!(matches!(
        fs.create_file("straggler"),
        Err(FsError::DirectoryFull)
    ));
    assert_eq!(entries_per_block, fs.read_dir().len());

    // ...but its fcb slot and data block are already spent
    assert_eq!(free_before - 1, fs.super_block().free_blocks);
    let leaked = fs.fcb(1 + entries_per_block as u32);
    assert_eq!(FcbKind::Regular, leaked.kind);
}

#[test]
fn fcb_table_exhausts_after_leaks() {
    // enough data blocks for every fcb slot: 1040 blocks leave 1033 in the data region
    let (_disk, mut fs) = mkfs(1040);
    let entries_per_block = BLOCK_SIZE / 32;

    for i in 0..entries_per_block {
        fs.create_file(&format!("f{i}")).unwrap();
    }
    // each further attempt leaks one fcb slot and one block on its way out
    for i in 0..FCB_COUNT - 1 - entries_per_block {
        assert!(matches!(
            fs.create_file(&format!("leak{i}")),
            Err(FsError::DirectoryFull)
        ));
    }

    // all 1024 slots are taken; now the table gives out before the directory does
    assert!(matches!(fs.create_file("done"), Err(FsError::TableFull)));
}

#[test]
fn append_keeps_partial_progress_when_space_runs_out() {
    // 8 blocks: metadata plus the root plus exactly one spare data block
    let (_disk, mut fs) = mkfs(8);
    fs.create_file("big").unwrap();
    assert_eq!(0, fs.super_block().free_blocks);

    let data = vec![9u8; BLOCK_SIZE + 300];
    assert!(matches!(fs.append("big", &data), Err(FsError::OutOfSpace)));

    // the first block's worth of bytes stayed put
    let entry = fs.read_dir().into_iter().find(|e| e.name == "big").unwrap();
    assert_eq!(BLOCK_SIZE as u32, entry.size);
    assert_eq!(0, fs.super_block().free_blocks);
}

#[test]
fn failed_append_keeps_linked_blocks() {
    // 9 blocks: the root plus two spare data blocks
    let (_disk, mut fs) = mkfs(9);
    let fcb_index = fs.create_file("big").unwrap();
    let first = fs.fcb(fcb_index).first_block;
    assert_eq!(1, fs.super_block().free_blocks);

    // fills the first block, links a second, then runs dry
    let data = vec![3u8; 2 * BLOCK_SIZE + 300];
    assert!(matches!(fs.append("big", &data), Err(FsError::OutOfSpace)));

    // the block allocated mid-append stays chained and accounted
    let blocks = chain(&fs, first);
    assert_eq!(2, blocks.len());
    assert_eq!(FatEntry::EOF, fs.fat_entry(blocks[1]));
    assert!(fs.block_in_use(blocks[1]));
    assert_eq!((2 * BLOCK_SIZE) as u32, fs.fcb(fcb_index).size);
    assert_eq!(0, fs.super_block().free_blocks);
}

#[test]
fn create_fails_cleanly_without_free_blocks() {
    let (_disk, mut fs) = mkfs(7);
    assert_eq!(0, fs.super_block().free_blocks);

    assert!(matches!(fs.create_file("nope"), Err(FsError::OutOfSpace)));
    // the chosen fcb slot was never initialized
    assert!(fs.fcb(1).is_unused());
    assert!(fs.read_dir().is_empty());
}

#[test]
fn reformat_wipes_previous_contents() {
    let disk = RamDisk::new(128);
    let mut fs = FlatFileSystem::format(disk.clone(), 128).unwrap();
    fs.make_dir("old").unwrap();
    fs.create_file("stale.txt").unwrap();
    fs.close();

    let fs = FlatFileSystem::format(disk, 128).unwrap();
    assert!(fs.read_dir().is_empty());
    assert_eq!(121, fs.super_block().free_blocks);
    assert!(fs.fcb(1).is_unused());
}

#[test]
fn image_survives_reopen() {
    let image = temp_image("reopen");
    let size = 512 * 1024;

    let dev = Arc::new(BlockFile::create(&image, size as u64).unwrap());
    let mut fs = FlatFileSystem::format(dev, size / BLOCK_SIZE).unwrap();
    fs.make_dir("test_dir").unwrap();
    fs.create_file("file1.txt").unwrap();
    fs.append("file1.txt", b"Hello").unwrap();
    let before = fs.super_block();
    let listing = fs.read_dir();
    fs.close();

    // opening must not reformat: counters and entries come back as left
    let dev = Arc::new(BlockFile::open(&image).unwrap());
    let mut fs = FlatFileSystem::open(dev);
    assert_eq!(before, fs.super_block());
    assert_eq!(listing, fs.read_dir());

    // the new session picks up where the old one stopped
    fs.append("file1.txt", b" World!").unwrap();
    assert_eq!(3, fs.create_file("file2.txt").unwrap());
    assert_eq!(12, fs.read_dir()[1].size);
    fs.close();

    std::fs::remove_file(&image).unwrap();
}

#[test]
fn listing_skips_dangling_entries() {
    let disk = RamDisk::new(64);
    let mut fs = FlatFileSystem::format(disk.clone(), 64).unwrap();
    fs.create_file("ok.txt").unwrap();
    fs.create_file("broken.txt").unwrap();
    fs.create_file("ghost.txt").unwrap();
    let dir_block = fs.fcb(fs.super_block().root_fcb).first_block as usize;
    fs.close();

    // second entry points far outside the fcb table, third at an unused slot
    let mut buf = [0u8; BLOCK_SIZE];
    disk.read_block(dir_block, &mut buf);
    buf[32 + 28..32 + 32].copy_from_slice(&u32::MAX.to_le_bytes());
    buf[2 * 32 + 28..2 * 32 + 32].copy_from_slice(&999u32.to_le_bytes());
    disk.write_block(dir_block, &buf);

    let fs = FlatFileSystem::open(disk);
    let entries = fs.read_dir();
    assert_eq!(1, entries.len());
    assert_eq!("ok.txt", entries[0].name);
}

#[test]
fn append_through_dangling_entry_is_not_found() {
    let disk = RamDisk::new(64);
    let mut fs = FlatFileSystem::format(disk.clone(), 64).unwrap();
    fs.create_file("broken.txt").unwrap();
    let dir_block = fs.fcb(fs.super_block().root_fcb).first_block as usize;
    fs.close();

    // entry index forced outside the fcb table
    let mut buf = [0u8; BLOCK_SIZE];
    disk.read_block(dir_block, &mut buf);
    buf[28..32].copy_from_slice(&u32::MAX.to_le_bytes());
    disk.write_block(dir_block, &buf);

    // the name still resolves, but never to a disk location
    let mut fs = FlatFileSystem::open(disk);
    assert!(matches!(
        fs.append("broken.txt", b"x"),
        Err(FsError::NotFound)
    ));
}

#[test]
fn missing_image_is_storage_unavailable() {
    // parent directory does not exist, so neither open nor create can succeed
    let path = std::env::temp_dir().join("flatfs-no-such-dir").join("missing.img");
    assert!(matches!(
        BlockFile::open(&path),
        Err(FsError::StorageUnavailable)
    ));
    assert!(matches!(
        BlockFile::create(&path, 4096),
        Err(FsError::StorageUnavailable)
    ));
}
