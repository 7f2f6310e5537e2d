#![no_std]

extern crate alloc;

/* flat-fs 的整体架构，自上而下 */

// 操作层：实现目录与文件的创建、数据追加、列目录
mod vfs;

// 磁盘块管理器层：构建磁盘布局，分配数据块
mod fs;

// 磁盘数据结构层：各磁盘记录的定义与编解码
mod layout;

// 块缓存层：磁盘块的内存缓存与写回
mod block_cache;

mod error;

pub use self::{
    error::{FsError, Result},
    fs::{FlatFileSystem, Regions},
    layout::{DirEntry, FCB_COUNT, FatEntry, Fcb, FcbKind, NAME_MAX_LEN, SuperBlock},
    vfs::DirEntryInfo,
};

pub const BLOCK_SIZE: usize = 4096;
