#[cfg(test)]
mod tests;

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::Mutex;

use block_dev::BlockDevice;
use flat_fs::{BLOCK_SIZE, FsError};

/// A host file standing in for a block device.
pub struct BlockFile(pub Mutex<File>);

impl BlockFile {
    /// Create the image file and stretch it to `size` bytes.
    pub fn create(path: &Path, size: u64) -> flat_fs::Result<Self> {
        OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .and_then(|fd| fd.set_len(size).map(|()| fd))
            .map(|fd| Self(Mutex::new(fd)))
            .map_err(|e| {
                log::error!("cannot create image {}: {e}", path.display());
                FsError::StorageUnavailable
            })
    }

    /// Open an existing image file.
    pub fn open(path: &Path) -> flat_fs::Result<Self> {
        OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map(|fd| Self(Mutex::new(fd)))
            .map_err(|e| {
                log::error!("cannot open image {}: {e}", path.display());
                FsError::StorageUnavailable
            })
    }
}

impl BlockDevice for BlockFile {
    fn read_block(&self, block_id: usize, buf: &mut [u8]) {
        let mut file = self.0.lock().unwrap();
        file.seek(SeekFrom::Start((block_id * BLOCK_SIZE) as u64))
            .expect("seeking error");
        assert_eq!(file.read(buf).unwrap(), BLOCK_SIZE, "not a complete block!");
    }

    fn write_block(&self, block_id: usize, buf: &[u8]) {
        let mut file = self.0.lock().unwrap();
        file.seek(SeekFrom::Start((block_id * BLOCK_SIZE) as u64))
            .expect("seeking error");
        assert_eq!(
            file.write(buf).unwrap(),
            BLOCK_SIZE,
            "not a complete block!"
        );
    }
}
