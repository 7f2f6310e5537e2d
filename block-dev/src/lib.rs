//! # 块设备接口层
//!
//! 磁盘、U盘这类设备以**块**为单位存取数据；
//! [`BlockDevice`] 即读写此类设备的抽象接口，实现者称为**块设备驱动**。
//!
//! 文件系统实现通过块设备驱动读写块设备。

#![no_std]

use core::any::Any;

/// 块设备驱动特质
pub trait BlockDevice: Send + Sync + Any {
    fn read_block(&self, block_id: usize, buf: &mut [u8]);
    fn write_block(&self, block_id: usize, buf: &[u8]);
}
