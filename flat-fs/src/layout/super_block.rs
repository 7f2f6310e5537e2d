use binrw::io::Cursor;
use binrw::{BinRead, BinWrite};

/// 超级块：
/// - 记录卷的总量与剩余空间；
/// - 定位其它连续区域。
///
/// 0号块开头即超级块，没有魔数或版本号。
#[derive(Debug, Clone, PartialEq, Eq, BinRead, BinWrite)]
#[brw(little)]
pub struct SuperBlock {
    /// 卷占据的总块数
    pub total_blocks: u32,
    /// 数据区内尚未分配的块数
    pub free_blocks: u32,
    /// 根目录的FCB编号
    pub root_fcb: u32,
    /// 位图区域的起始块
    pub bitmap_start: u32,
    /// 文件分配表区域的起始块
    pub fat_start: u32,
    /// 数据区域的起始块
    pub data_start: u32,
}

impl SuperBlock {
    /// 超级块编码后的大小
    pub const SIZE: usize = 24;

    pub fn decode(bytes: &[u8]) -> Self {
        Self::read(&mut Cursor::new(bytes)).expect("superblock record truncated")
    }

    pub fn encode(&self, bytes: &mut [u8]) {
        self.write(&mut Cursor::new(bytes))
            .expect("superblock record truncated")
    }
}
