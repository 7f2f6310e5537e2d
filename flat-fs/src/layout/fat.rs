use core::mem;

use crate::BLOCK_SIZE;
use crate::block_cache::CacheManager;

/// 每块能容纳的表项数
const ENTRIES_PER_BLOCK: usize = BLOCK_SIZE / mem::size_of::<u32>();

/// 文件分配表的表项：指明某块在链表上的下一块，或为哨兵值
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(transparent)]
pub struct FatEntry(u32);

impl FatEntry {
    /// 空闲块
    pub const FREE: Self = Self(0);

    /// 链表终点
    pub const EOF: Self = Self(u32::MAX);

    #[inline]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// 链表上的下一块，[`None`]表示本块即末尾。
    /// 链表中途出现空闲表项说明卷已损坏，就地截断。
    pub fn next(self) -> Option<u32> {
        match self {
            Self::EOF => None,
            Self::FREE => {
                log::error!("free entry inside a chain, truncated");
                None
            }
            Self(id) => Some(id),
        }
    }
}

/// 文件分配表区域。第i条表项描述第i块，每条表项为小端u32。
#[derive(Debug, Clone)]
pub struct Fat {
    /// 区域的起始块
    start_block: usize,
}

impl Fat {
    #[inline]
    pub fn new(start_block: usize) -> Self {
        Self { start_block }
    }

    /// 读取块的表项
    pub fn get(&self, cache: &CacheManager, block_id: u32) -> FatEntry {
        let (block, offset) = self.locate(block_id);
        FatEntry::new(cache.get(block).lock().read_u32(offset))
    }

    /// 覆写块的表项
    pub fn set(&self, cache: &CacheManager, block_id: u32, entry: FatEntry) {
        let (block, offset) = self.locate(block_id);
        cache.get(block).lock().write_u32(offset, entry.raw());
    }

    /// 自`first`沿链表走到最后一块
    pub fn last(&self, cache: &CacheManager, first: u32) -> u32 {
        let mut current = first;
        while let Some(next) = self.get(cache, current).next() {
            current = next;
        }
        current
    }

    /// 把新块挂到链表末块之后，新块成为新的末尾
    pub fn couple(&self, cache: &CacheManager, last: u32, new: u32) {
        self.set(cache, last, FatEntry::new(new));
        self.set(cache, new, FatEntry::EOF);
    }

    /// 表项实际所处的磁盘位置：块ID + 块内字节偏移
    fn locate(&self, block_id: u32) -> (usize, usize) {
        let index = block_id as usize;
        (
            self.start_block + index / ENTRIES_PER_BLOCK,
            index % ENTRIES_PER_BLOCK * mem::size_of::<u32>(),
        )
    }
}
