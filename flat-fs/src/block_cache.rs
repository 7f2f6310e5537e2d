//! # 块缓存层
//!
//! 操作磁盘块之前先把它复制进内存缓冲区，读写都落在缓冲区上，
//! 同步时才写回块设备；再次访问同一块时直接交出既有缓存。
//!
//! 缓存管理器归属各自的卷句柄，而非全局单例，
//! 脏块的写回时机由管理器调度。
//!
//! 缓存只交出字节切片，磁盘数据结构的编解码由磁盘数据结构层完成。

use alloc::sync::Arc;
use alloc::vec::Vec;

use block_dev::BlockDevice;
use spin::Mutex;

use crate::BLOCK_SIZE;

/// 单个磁盘块在内存中的缓存
pub struct BlockCache {
    /// 块数据的内存副本
    data: [u8; BLOCK_SIZE],
    /// 对应的块ID
    block_id: usize,
    /// 底层块设备
    block_device: Arc<dyn BlockDevice>,
    /// 写过且尚未同步
    modified: bool,
}

impl BlockCache {
    pub fn new(block_id: usize, block_device: Arc<dyn BlockDevice>) -> Self {
        let mut data = [0; BLOCK_SIZE];
        block_device.read_block(block_id, &mut data);

        Self {
            data,
            block_id,
            block_device,
            modified: false,
        }
    }

    pub fn sync(&mut self) {
        if self.modified {
            self.modified = false;
            self.block_device.write_block(self.block_id, &self.data);
        }
    }

    /// 处理块内偏移处的一段只读数据
    #[inline]
    pub fn map<V>(&self, offset: usize, len: usize, f: impl FnOnce(&[u8]) -> V) -> V {
        assert!(offset + len <= BLOCK_SIZE);
        f(&self.data[offset..offset + len])
    }

    /// 修改块内偏移处的一段数据
    #[inline]
    pub fn map_mut<V>(&mut self, offset: usize, len: usize, f: impl FnOnce(&mut [u8]) -> V) -> V {
        assert!(offset + len <= BLOCK_SIZE);
        self.modified = true;
        f(&mut self.data[offset..offset + len])
    }

    /// 读出块内偏移处的小端u32标量
    #[inline]
    pub fn read_u32(&self, offset: usize) -> u32 {
        let mut bytes = [0; 4];
        bytes.copy_from_slice(&self.data[offset..offset + 4]);
        u32::from_le_bytes(bytes)
    }

    /// 以小端序把u32标量写进块内偏移处
    #[inline]
    pub fn write_u32(&mut self, offset: usize, value: u32) {
        self.modified = true;
        self.data[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
    }

    #[inline]
    pub fn zeroize(&mut self) {
        self.data.fill(0);
        self.modified = true;
    }
}

impl Drop for BlockCache {
    fn drop(&mut self) {
        self.sync();
    }
}

/// 每卷一份的块缓存管理器，缓存、调度块缓存
pub struct CacheManager {
    /// 底层块设备的引用
    dev: Arc<dyn BlockDevice>,
    queue: Mutex<Vec<(usize, Arc<Mutex<BlockCache>>)>>,
}

impl CacheManager {
    /// 同时驻留的块缓存数上限
    const CAPACITY: usize = 16;

    pub fn new(dev: Arc<dyn BlockDevice>) -> Self {
        Self {
            dev,
            queue: Mutex::new(Vec::new()),
        }
    }

    /// 取得某块的缓存，必要时装入
    pub fn get(&self, block_id: usize) -> Arc<Mutex<BlockCache>> {
        let mut queue = self.queue.lock();

        // 已有缓存直接复用
        if let Some(cache) = queue
            .iter()
            .find_map(|(id, cache)| (block_id == *id).then_some(cache))
        {
            return Arc::clone(cache);
        };

        // 触及容量上限，挤掉一个块
        if queue.len() == Self::CAPACITY {
            let index = queue
                .iter()
                .position(|(_, cache)| Arc::strong_count(cache) == 1) // 只能挤掉无人引用的
                .expect("run out of block cache");
            queue.remove(index);
        }

        // 装入新块
        let block_cache = Arc::new(Mutex::new(BlockCache::new(block_id, self.dev.clone())));
        queue.push((block_id, block_cache.clone()));

        block_cache
    }

    /// 把所有脏块写回设备
    pub fn sync_all(&self) {
        self.queue
            .lock()
            .iter()
            .for_each(|(_, cache)| cache.lock().sync());
    }
}
