use crate::BLOCK_SIZE;
use crate::block_cache::CacheManager;

/// 每块能容纳的位数
const BLOCK_BITS: usize = BLOCK_SIZE * 8;

/// 空闲块位图，第i位指示第i块：0为空闲，1为占用。
/// 一字节内低位在前，即 `byte = i / 8`、`bit = i % 8`。
#[derive(Debug, Clone)]
pub struct Bitmap {
    /// 位图的起始块
    start_block: usize,
    /// 位图占用块数
    blocks: usize,
}

impl Bitmap {
    #[inline]
    pub fn new(start_block: usize, blocks: usize) -> Self {
        Self {
            start_block,
            blocks,
        }
    }

    /// 自`from`起线性扫描，置位并返回第一个空闲块的块号。
    /// `bound`（不含）之外的位不属于卷。若无空闲块则返回空。
    pub fn alloc(&self, cache: &CacheManager, from: usize, bound: usize) -> Option<u32> {
        for block_index in from / BLOCK_BITS..self.blocks {
            let first = (block_index * BLOCK_BITS).max(from);
            let last = ((block_index + 1) * BLOCK_BITS).min(bound);
            if first >= last {
                break;
            }

            let cache = cache.get(self.start_block + block_index);
            let mut cache = cache.lock();

            let found = cache.map(0, BLOCK_SIZE, |bytes| {
                (first..last).find(|&id| {
                    let (_, byte, bit) = Self::locate(id);
                    bytes[byte] & (1 << bit) == 0
                })
            });
            if let Some(id) = found {
                let (_, byte, bit) = Self::locate(id);
                cache.map_mut(byte, 1, |bytes| bytes[0] |= 1 << bit);
                return Some(id as u32);
            }
        }

        None
    }

    /// 查询某块是否已被分配
    pub fn is_set(&self, cache: &CacheManager, block_id: usize) -> bool {
        let (block_index, byte, bit) = Self::locate(block_id);
        cache
            .get(self.start_block + block_index)
            .lock()
            .map(byte, 1, |bytes| bytes[0] & (1 << bit) != 0)
    }
}

impl Bitmap {
    /// 块号对应的位所处的位置：位图块索引、块内字节、字节内位
    #[inline]
    fn locate(block_id: usize) -> (usize, usize, usize) {
        (
            block_id / BLOCK_BITS,
            block_id % BLOCK_BITS / 8,
            block_id % 8,
        )
    }
}
