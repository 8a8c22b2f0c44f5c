use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::block::{BlockId, BLOCK_SIZE};
use crate::config::StoreConfig;
use crate::error::Result;
use crate::Error;

/// Raw block I/O against the single backing file.
#[derive(Debug)]
pub struct BlockFile {
    file: File,
    path: PathBuf, // For debugging
}

impl BlockFile {
    pub fn open(config: &StoreConfig) -> Result<Self> {
        let mut options = OpenOptions::new();
        options
            .read(true)
            .write(true)
            .create(config.create)
            .truncate(config.truncate);

        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(config.mode);
        }

        let file = options.open(&config.path)?;

        Ok(Self {
            file,
            path: config.path.clone(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> Result<u64> {
        Ok(self.file.metadata()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Reads one block. A block that is not fully present on disk is an error.
    pub fn read_block(&mut self, id: BlockId) -> Result<[u8; BLOCK_SIZE]> {
        check_aligned(id)?;

        let mut buf = [0u8; BLOCK_SIZE];
        self.file.seek(SeekFrom::Start(id.offset()))?;
        match self.file.read_exact(&mut buf) {
            Ok(()) => Ok(buf),
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => Err(Error::ShortRead(id)),
            Err(e) => Err(Error::ReadError("block", e)),
        }
    }

    pub fn write_block(&mut self, id: BlockId, buf: &[u8; BLOCK_SIZE]) -> Result<()> {
        check_aligned(id)?;

        self.file.seek(SeekFrom::Start(id.offset()))?;
        self.file
            .write_all(buf)
            .map_err(|e| Error::WriteError("block", e))
    }

    /// Ensures durability on disk.
    pub fn sync(&mut self) -> Result<()> {
        self.file.flush()?;
        self.file.sync_data()?;
        Ok(())
    }
}

fn check_aligned(id: BlockId) -> Result<()> {
    if !id.is_aligned() {
        return Err(Error::Corruption(format!(
            "block id {} is not a multiple of {}",
            id.0, BLOCK_SIZE
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_write_and_read_block() -> Result<()> {
        let dir = tempdir()?;
        let mut file = BlockFile::open(&StoreConfig::new(dir.path().join("blocks")))?;
        assert!(file.is_empty()?);

        let mut buf = [0u8; BLOCK_SIZE];
        buf[0] = 0xAB;
        buf[BLOCK_SIZE - 1] = 0xCD;
        file.write_block(BlockId(1024), &buf)?;
        file.sync()?;

        assert_eq!(file.len()?, 1024 + BLOCK_SIZE as u64);
        assert_eq!(file.read_block(BlockId(1024))?, buf);

        // the gap below reads back as zeroes, it was never written
        assert_eq!(file.read_block(BlockId(512))?, [0u8; BLOCK_SIZE]);
        Ok(())
    }

    #[test]
    fn test_short_read_is_an_error() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("blocks");
        std::fs::write(&path, vec![1u8; BLOCK_SIZE + 100])?;

        let mut file = BlockFile::open(&StoreConfig::new(&path))?;
        assert!(file.read_block(BlockId(0)).is_ok());
        match file.read_block(BlockId(512)) {
            Err(Error::ShortRead(id)) => assert_eq!(id, BlockId(512)),
            other => panic!("Expected ShortRead, got {:?}", other.map(|_| ())),
        }
        match file.read_block(BlockId(4096)) {
            Err(Error::ShortRead(_)) => {}
            other => panic!("Expected ShortRead, got {:?}", other.map(|_| ())),
        }
        Ok(())
    }

    #[test]
    fn test_misaligned_id_rejected() -> Result<()> {
        let dir = tempdir()?;
        let mut file = BlockFile::open(&StoreConfig::new(dir.path().join("blocks")))?;
        assert!(matches!(
            file.read_block(BlockId(100)),
            Err(Error::Corruption(_))
        ));
        assert!(matches!(
            file.write_block(BlockId(7), &[0u8; BLOCK_SIZE]),
            Err(Error::Corruption(_))
        ));
        Ok(())
    }

    #[test]
    fn test_missing_file_without_create() {
        let dir = tempdir().expect("Failed to create temp dir");
        let config = StoreConfig::new(dir.path().join("absent")).create(false);
        assert!(matches!(BlockFile::open(&config), Err(Error::IoError(_))));
    }
}
