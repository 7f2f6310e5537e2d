use binrw::io::Cursor;
use binrw::{BinRead, BinWrite};

use crate::BLOCK_SIZE;
use crate::block_cache::CacheManager;

/// FCB表的槽位总数，格式化时写死
pub const FCB_COUNT: usize = 1024;

/// 文件控制块：一个文件或目录的元信息
#[derive(Debug, Default, Clone, PartialEq, Eq, BinRead, BinWrite)]
#[brw(little)]
pub struct Fcb {
    #[br(map = FcbKind::from_raw)]
    #[bw(map = |kind: &FcbKind| *kind as u32)]
    pub kind: FcbKind,
    /// 大小（字节）：文件计数据长度，目录计目录项的占用长度
    pub size: u32,
    /// 首个数据块的块号
    pub first_block: u32,
}

/// FCB的类型标记
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum FcbKind {
    /// 未投入使用的槽位
    #[default]
    Unused = 0,
    Regular = 1,
    Directory = 2,
}

impl FcbKind {
    /// 全零的表区域解码出全 [`FcbKind::Unused`]；
    /// 意料外的标记值同样视作未使用，不作硬错误。
    pub fn from_raw(raw: u32) -> Self {
        match raw {
            1 => Self::Regular,
            2 => Self::Directory,
            _ => Self::Unused,
        }
    }
}

impl Fcb {
    /// FCB编码后的大小
    pub const SIZE: usize = 12;

    #[inline]
    pub fn new(kind: FcbKind, size: u32, first_block: u32) -> Self {
        Self {
            kind,
            size,
            first_block,
        }
    }

    #[inline]
    pub fn is_unused(&self) -> bool {
        self.kind == FcbKind::Unused
    }

    pub fn decode(bytes: &[u8]) -> Self {
        Self::read(&mut Cursor::new(bytes)).expect("fcb record truncated")
    }

    pub fn encode(&self, bytes: &mut [u8]) {
        self.write(&mut Cursor::new(bytes))
            .expect("fcb record truncated")
    }
}

/// FCB表区域。表项连续排列，与块边界不对齐，个别表项会跨块。
#[derive(Debug, Clone)]
pub struct FcbTable {
    /// 区域的起始块
    start_block: usize,
}

impl FcbTable {
    #[inline]
    pub fn new(start_block: usize) -> Self {
        Self { start_block }
    }

    /// 表区域占据的块数
    pub const fn blocks() -> usize {
        let blocks = (FCB_COUNT * Fcb::SIZE).div_ceil(BLOCK_SIZE);
        if blocks == 0 { 1 } else { blocks }
    }

    /// 读取编号处的FCB
    pub fn get(&self, cache: &CacheManager, index: u32) -> Fcb {
        let mut record = [0; Fcb::SIZE];
        let (block, offset, head) = self.locate(index);

        cache
            .get(block)
            .lock()
            .map(offset, head, |bytes| record[..head].copy_from_slice(bytes));
        if head < Fcb::SIZE {
            cache
                .get(block + 1)
                .lock()
                .map(0, Fcb::SIZE - head, |bytes| {
                    record[head..].copy_from_slice(bytes)
                });
        }

        Fcb::decode(&record)
    }

    /// 覆写编号处的FCB
    pub fn set(&self, cache: &CacheManager, index: u32, fcb: &Fcb) {
        let mut record = [0; Fcb::SIZE];
        fcb.encode(&mut record);

        let (block, offset, head) = self.locate(index);
        cache
            .get(block)
            .lock()
            .map_mut(offset, head, |bytes| bytes.copy_from_slice(&record[..head]));
        if head < Fcb::SIZE {
            cache
                .get(block + 1)
                .lock()
                .map_mut(0, Fcb::SIZE - head, |bytes| {
                    bytes.copy_from_slice(&record[head..])
                });
        }
    }

    /// 寻找首个空闲槽位并返回其编号。0号槽位保留给根目录，不参与扫描。
    pub fn find_unused(&self, cache: &CacheManager) -> Option<u32> {
        (1..FCB_COUNT as u32).find(|&index| self.get(cache, index).is_unused())
    }
}

impl FcbTable {
    /// 表项实际所处的磁盘位置：块ID、块内偏移，以及落在本块内的字节数。
    /// 后者小于 [`Fcb::SIZE`] 时，表项剩余部分位于下一块的开头。
    fn locate(&self, index: u32) -> (usize, usize, usize) {
        let offset = index as usize * Fcb::SIZE;
        let inblock = offset % BLOCK_SIZE;
        (
            self.start_block + offset / BLOCK_SIZE,
            inblock,
            Fcb::SIZE.min(BLOCK_SIZE - inblock),
        )
    }
}
