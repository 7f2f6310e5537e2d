//! # 磁盘数据结构层
//!
//! flat-fs 的磁盘布局：
//! 超级块 | 空闲块位图 | 文件分配表 | FCB表 | 数据块区域
//!
//! 定长的磁盘记录（超级块、FCB、目录项）一律经 `binrw` 按小端序编解码，
//! 不在缓存的字节上做就地类型转换。

mod super_block;
pub use super_block::SuperBlock;

mod bitmap;
pub use bitmap::Bitmap;

mod fat;
pub use fat::{Fat, FatEntry};

mod fcb;
pub use fcb::{FCB_COUNT, Fcb, FcbKind, FcbTable};

/// 目录项，也属于磁盘文件系统数据结构
mod dir_entry;
pub use dir_entry::{DirEntry, NAME_MAX_LEN};
