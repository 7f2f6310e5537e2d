//! # 操作层
//!
//! 扁平文件系统的操作逻辑：所有文件与目录都是根目录的直接子项，
//! 目录项全部登记在根目录仅有的一个数据块内。
//!
//! 此处没有删除与回收——空间只增不减，写坏的槽位就此留在磁盘上。

use alloc::string::String;
use alloc::vec::Vec;

use crate::BLOCK_SIZE;
use crate::error::{FsError, Result};
use crate::fs::FlatFileSystem;
use crate::layout::{DirEntry, FCB_COUNT, Fcb, FcbKind, NAME_MAX_LEN};

/// 单个目录块能容纳的目录项数
const ENTRIES_PER_BLOCK: usize = BLOCK_SIZE / DirEntry::SIZE;

/// 列目录时交出的目录项信息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntryInfo {
    /// FCB编号
    pub fcb: u32,
    pub kind: FcbKind,
    /// 大小（字节）
    pub size: u32,
    pub name: String,
}

impl FlatFileSystem {
    /// 在根目录下创建空文件，返回其FCB编号
    pub fn create_file(&mut self, name: &str) -> Result<u32> {
        if name.len() > NAME_MAX_LEN {
            return Err(FsError::NameTooLong);
        }

        let fcb_index = self
            .fcbs
            .find_unused(&self.cache)
            .ok_or(FsError::TableFull)?;
        let first_block = self.alloc_block()?;

        self.fcbs.set(
            &self.cache,
            fcb_index,
            &Fcb::new(FcbKind::Regular, 0, first_block),
        );

        let created = self.add_root_entry(name, fcb_index).map(|()| fcb_index);
        self.cache.sync_all();

        created
    }

    /// 在根目录下创建目录，返回其FCB编号
    pub fn make_dir(&mut self, name: &str) -> Result<u32> {
        if name.len() > NAME_MAX_LEN {
            return Err(FsError::NameTooLong);
        }

        let fcb_index = self
            .fcbs
            .find_unused(&self.cache)
            .ok_or(FsError::TableFull)?;
        let first_block = self.alloc_block()?;

        // 新目录块清零，让全部槽位呈空
        self.cache.get(first_block as usize).lock().zeroize();
        // 目录自创建起就计入一条目录项的大小
        self.fcbs.set(
            &self.cache,
            fcb_index,
            &Fcb::new(FcbKind::Directory, DirEntry::SIZE as u32, first_block),
        );

        let created = self.add_root_entry(name, fcb_index).map(|()| fcb_index);
        self.cache.sync_all();

        created
    }

    /// 向文件末尾追加数据。
    /// 空间中途耗尽时报 [`FsError::OutOfSpace`]，已写入的部分保留。
    pub fn append(&mut self, name: &str, data: &[u8]) -> Result<()> {
        let entry = self.lookup_root(name).ok_or(FsError::NotFound)?;
        let fcb_index = entry.fcb_index();
        // 悬空的目录项解析不到文件，编号不能直接当磁盘位置用
        if fcb_index as usize >= FCB_COUNT {
            log::warn!("entry {:?} points outside the fcb table", entry.name());
            return Err(FsError::NotFound);
        }
        let mut fcb = self.fcbs.get(&self.cache, fcb_index);
        if fcb.kind != FcbKind::Regular {
            return Err(FsError::WrongType);
        }

        let mut last = self.fat.last(&self.cache, fcb.first_block);

        let mut remaining = data;
        while !remaining.is_empty() {
            let mut used = Self::tail_block_used(fcb.size);
            if used == BLOCK_SIZE {
                // 末块已满，先扩链再写
                let new = match self.alloc_block() {
                    Ok(block_id) => block_id,
                    Err(e) => {
                        self.cache.sync_all();
                        return Err(e);
                    }
                };
                self.fat.couple(&self.cache, last, new);
                last = new;
                used = 0;
            }

            let len = remaining.len().min(BLOCK_SIZE - used);
            self.cache
                .get(last as usize)
                .lock()
                .map_mut(used, len, |bytes| bytes.copy_from_slice(&remaining[..len]));

            // 每写一段就落一次大小，中途失败时已写入的部分仍被记账
            fcb.size += len as u32;
            self.fcbs.set(&self.cache, fcb_index, &fcb);

            remaining = &remaining[len..];
        }

        self.cache.sync_all();
        Ok(())
    }

    /// 列出根目录的全部目录项
    pub fn read_dir(&self) -> Vec<DirEntryInfo> {
        let (_, root) = self.root_dir();

        let mut infos = Vec::new();
        let cache = self.cache.get(root.first_block as usize);
        let cache = cache.lock();

        for slot in 0..ENTRIES_PER_BLOCK {
            let entry = cache.map(slot * DirEntry::SIZE, DirEntry::SIZE, DirEntry::decode);
            if entry.is_empty() {
                continue;
            }

            // 悬空的目录项跳过不报错，不能让一条坏记录堵死整个列表
            let index = entry.fcb_index();
            if index as usize >= FCB_COUNT {
                log::warn!(
                    "entry {:?} points outside the fcb table, skipped",
                    entry.name()
                );
                continue;
            }
            let fcb = self.fcbs.get(&self.cache, index);
            if fcb.is_unused() {
                log::warn!("entry {:?} points at unused fcb {index}, skipped", entry.name());
                continue;
            }

            infos.push(DirEntryInfo {
                fcb: index,
                kind: fcb.kind,
                size: fcb.size,
                name: String::from(entry.name()),
            });
        }

        infos
    }
}

impl FlatFileSystem {
    /// 根目录的FCB编号及其内容
    fn root_dir(&self) -> (u32, Fcb) {
        let index = self.super_block().root_fcb;
        (index, self.fcbs.get(&self.cache, index))
    }

    /// 在根目录下搜索指定名称的目录项
    fn lookup_root(&self, name: &str) -> Option<DirEntry> {
        let (_, root) = self.root_dir();

        let cache = self.cache.get(root.first_block as usize);
        let cache = cache.lock();

        (0..ENTRIES_PER_BLOCK).find_map(|slot| {
            let entry = cache.map(slot * DirEntry::SIZE, DirEntry::SIZE, DirEntry::decode);
            (!entry.is_empty() && entry.name() == name).then_some(entry)
        })
    }

    /// 在根目录登记目录项，并把目录的增长记回其FCB
    fn add_root_entry(&mut self, name: &str, fcb_index: u32) -> Result<()> {
        let (root_index, mut root) = self.root_dir();

        let cache = self.cache.get(root.first_block as usize);
        let mut cache = cache.lock();

        let slot = (0..ENTRIES_PER_BLOCK)
            .find(|&slot| {
                cache.map(slot * DirEntry::SIZE, DirEntry::SIZE, |bytes| {
                    DirEntry::decode(bytes).is_empty()
                })
            })
            .ok_or(FsError::DirectoryFull)?;

        cache.map_mut(slot * DirEntry::SIZE, DirEntry::SIZE, |bytes| {
            DirEntry::new(name, fcb_index).encode(bytes)
        });
        drop(cache);

        root.size += DirEntry::SIZE as u32;
        self.fcbs.set(&self.cache, root_index, &root);

        Ok(())
    }

    /// 末块已占用的字节数。大小恰为整块倍数时，末块是满的而非空的。
    fn tail_block_used(size: u32) -> usize {
        let used = size as usize % BLOCK_SIZE;
        if size > 0 && used == 0 { BLOCK_SIZE } else { used }
    }
}
