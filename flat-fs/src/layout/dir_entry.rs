use binrw::io::Cursor;
use binrw::{BinRead, BinWrite};

/// 目录项名称的最大长度
pub const NAME_MAX_LEN: usize = 27;

/// 目录项：为名称登记FCB编号
#[derive(Debug, Default, Clone, PartialEq, Eq, BinRead, BinWrite)]
#[brw(little)]
pub struct DirEntry {
    // 多出的一字节留作 \0 结尾
    name: [u8; NAME_MAX_LEN + 1],
    fcb_index: u32,
}

impl DirEntry {
    /// 目录项编码后的大小恒为32字节
    pub const SIZE: usize = 32;

    /// 调用者需保证名称不长于 [`NAME_MAX_LEN`] 字节
    pub fn new(name: &str, fcb_index: u32) -> Self {
        let bytes = name.as_bytes();
        let mut name = [0; NAME_MAX_LEN + 1];
        name[..bytes.len()].copy_from_slice(bytes);

        Self { name, fcb_index }
    }

    pub fn name(&self) -> &str {
        let len = self
            .name
            .iter()
            .position(|&c| c == 0)
            .unwrap_or(self.name.len());
        core::str::from_utf8(&self.name[..len]).unwrap_or("")
    }

    #[inline]
    pub fn fcb_index(&self) -> u32 {
        self.fcb_index
    }

    /// 空槽位：名称为空且编号为0
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.name[0] == 0 && self.fcb_index == 0
    }

    pub fn decode(bytes: &[u8]) -> Self {
        Self::read(&mut Cursor::new(bytes)).expect("directory entry truncated")
    }

    pub fn encode(&self, bytes: &mut [u8]) {
        self.write(&mut Cursor::new(bytes))
            .expect("directory entry truncated")
    }
}
