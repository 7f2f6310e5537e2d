//! # 磁盘块管理器层
//!
//! 构建出磁盘的布局并使用。

use alloc::sync::Arc;
use core::mem;

use block_dev::BlockDevice;

use crate::BLOCK_SIZE;
use crate::block_cache::CacheManager;
use crate::error::{FsError, Result};
use crate::layout::*;

/// 超级块所在的块
const SUPER_BLOCK_ID: usize = 0;

/// 扁平文件系统的卷句柄，持有自己的块缓存。
/// 所有操作都经过句柄，互不相干的卷可以同时打开。
pub struct FlatFileSystem {
    pub(crate) cache: CacheManager,
    pub(crate) regions: Regions,
    pub(crate) bitmap: Bitmap,
    pub(crate) fat: Fat,
    pub(crate) fcbs: FcbTable,
}

/// 卷的布局：各连续区域的起始块号
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Regions {
    pub total_blocks: usize,
    pub bitmap_start: usize,
    pub fat_start: usize,
    pub fcb_start: usize,
    pub data_start: usize,
}

impl Regions {
    /// 由卷的总块数推出布局。
    /// 各元数据区域按需取整，至少占一块。
    pub fn compute(total_blocks: usize) -> Self {
        let bitmap_blocks = total_blocks.div_ceil(8).div_ceil(BLOCK_SIZE).max(1);
        let fat_blocks = (total_blocks * mem::size_of::<u32>())
            .div_ceil(BLOCK_SIZE)
            .max(1);

        let bitmap_start = SUPER_BLOCK_ID + 1;
        let fat_start = bitmap_start + bitmap_blocks;
        let fcb_start = fat_start + fat_blocks;
        let data_start = fcb_start + FcbTable::blocks();

        Self {
            total_blocks,
            bitmap_start,
            fat_start,
            fcb_start,
            data_start,
        }
    }

    /// 依超级块还原布局。
    /// 超级块没有记录FCB区的起点，由FAT区的终点推出。
    pub fn from_super(sb: &SuperBlock) -> Self {
        let total_blocks = sb.total_blocks as usize;
        let fat_blocks = (total_blocks * mem::size_of::<u32>())
            .div_ceil(BLOCK_SIZE)
            .max(1);

        Self {
            total_blocks,
            bitmap_start: sb.bitmap_start as usize,
            fat_start: sb.fat_start as usize,
            fcb_start: sb.fat_start as usize + fat_blocks,
            data_start: sb.data_start as usize,
        }
    }
}

impl FlatFileSystem {
    /// 在块设备上建立新卷，根目录落在0号FCB与数据区第一块。
    /// 卷装不下元数据和根目录时报 [`FsError::OutOfSpace`]。
    pub fn format(dev: Arc<dyn BlockDevice>, total_blocks: usize) -> Result<Self> {
        let regions = Regions::compute(total_blocks);
        if regions.data_start >= total_blocks {
            return Err(FsError::OutOfSpace);
        }

        let cache = CacheManager::new(dev);

        // 元数据区全部清零：位图全空闲、FAT全FREE、FCB表全未使用
        for block_id in 0..regions.data_start {
            cache.get(block_id).lock().zeroize();
        }

        let mut fs = Self {
            cache,
            regions,
            bitmap: Bitmap::new(regions.bitmap_start, regions.fat_start - regions.bitmap_start),
            fat: Fat::new(regions.fat_start),
            fcbs: FcbTable::new(regions.fcb_start),
        };

        // 空闲计数先把根目录将要占用的一块计入在内，
        // 待会儿经分配器扣除
        let sb = SuperBlock {
            total_blocks: total_blocks as u32,
            free_blocks: (total_blocks - regions.data_start) as u32,
            root_fcb: 0,
            bitmap_start: regions.bitmap_start as u32,
            fat_start: regions.fat_start as u32,
            data_start: regions.data_start as u32,
        };
        fs.cache
            .get(SUPER_BLOCK_ID)
            .lock()
            .map_mut(0, SuperBlock::SIZE, |bytes| sb.encode(bytes));

        let root_block = fs.alloc_block()?;
        debug_assert_eq!(root_block as usize, regions.data_start);
        fs.cache.get(root_block as usize).lock().zeroize();
        fs.fcbs.set(
            &fs.cache,
            sb.root_fcb,
            &Fcb::new(FcbKind::Directory, 0, root_block),
        );

        fs.cache.sync_all();

        Ok(fs)
    }

    /// 打开既有卷，信任其超级块中记录的布局
    pub fn open(dev: Arc<dyn BlockDevice>) -> Self {
        let cache = CacheManager::new(dev);
        let sb = cache
            .get(SUPER_BLOCK_ID)
            .lock()
            .map(0, SuperBlock::SIZE, SuperBlock::decode);
        let regions = Regions::from_super(&sb);

        Self {
            bitmap: Bitmap::new(regions.bitmap_start, regions.fat_start - regions.bitmap_start),
            fat: Fat::new(regions.fat_start),
            fcbs: FcbTable::new(regions.fcb_start),
            regions,
            cache,
        }
    }

    /// 把所有脏缓存写回设备
    #[inline]
    pub fn sync_all(&self) {
        self.cache.sync_all();
    }

    /// 写回并结束本次会话
    pub fn close(self) {
        self.sync_all();
    }

    /// 在数据区分配一块：置位位图、FAT记作链表终点、递减空闲计数
    pub fn alloc_block(&mut self) -> Result<u32> {
        let block_id = self
            .bitmap
            .alloc(
                &self.cache,
                self.regions.data_start,
                self.regions.total_blocks,
            )
            .ok_or(FsError::OutOfSpace)?;

        self.fat.set(&self.cache, block_id, FatEntry::EOF);
        self.with_super_mut(|sb| sb.free_blocks -= 1);

        Ok(block_id)
    }
}

/* 卷的检视接口，供上层与测试观察磁盘状态 */
impl FlatFileSystem {
    /// 超级块的当前内容
    pub fn super_block(&self) -> SuperBlock {
        self.cache
            .get(SUPER_BLOCK_ID)
            .lock()
            .map(0, SuperBlock::SIZE, SuperBlock::decode)
    }

    /// 卷的布局
    #[inline]
    pub fn regions(&self) -> Regions {
        self.regions
    }

    /// 读取块在文件分配表中的表项
    #[inline]
    pub fn fat_entry(&self, block_id: u32) -> FatEntry {
        self.fat.get(&self.cache, block_id)
    }

    /// 查询块是否已被分配
    #[inline]
    pub fn block_in_use(&self, block_id: u32) -> bool {
        self.bitmap.is_set(&self.cache, block_id as usize)
    }

    /// 读取编号处的FCB
    #[inline]
    pub fn fcb(&self, index: u32) -> Fcb {
        self.fcbs.get(&self.cache, index)
    }
}

impl FlatFileSystem {
    /// 修改超级块并立即编码回缓存
    pub(crate) fn with_super_mut<V>(&self, f: impl FnOnce(&mut SuperBlock) -> V) -> V {
        let cache = self.cache.get(SUPER_BLOCK_ID);
        let mut cache = cache.lock();

        let mut sb = cache.map(0, SuperBlock::SIZE, SuperBlock::decode);
        let value = f(&mut sb);
        cache.map_mut(0, SuperBlock::SIZE, |bytes| sb.encode(bytes));

        value
    }
}
