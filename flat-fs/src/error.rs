use core::fmt;

/// 文件系统操作的失败原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsError {
    /// 底层存储无法建立
    StorageUnavailable,
    /// 名称超出目录项的容量
    NameTooLong,
    /// FCB表已无空槽
    TableFull,
    /// 数据区已无空闲块
    OutOfSpace,
    /// 目录块已无空目录项
    DirectoryFull,
    NotFound,
    /// 对目录做了只有文件支持的操作
    WrongType,
}

pub type Result<T> = core::result::Result<T, FsError>;

impl fmt::Display for FsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            Self::StorageUnavailable => "storage unavailable",
            Self::NameTooLong => "name too long",
            Self::TableFull => "fcb table full",
            Self::OutOfSpace => "out of space",
            Self::DirectoryFull => "directory full",
            Self::NotFound => "not found",
            Self::WrongType => "wrong type",
        };
        f.write_str(reason)
    }
}

impl core::error::Error for FsError {}
