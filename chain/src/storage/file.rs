//! Filesystem-backed block persistence: one file per block, named by hex
//! hash, under `persistance_folder` (`spec.md` §6).

use std::fs;
use std::path::PathBuf;

use crate::storage::BlockPersistence;
use crate::types::{Block, BlockHash};

pub struct FileBlockPersistence {
    folder: PathBuf,
}

impl FileBlockPersistence {
    /// Opens `folder`, creating it if missing.
    pub fn open(folder: impl Into<PathBuf>) -> std::io::Result<Self> {
        let folder = folder.into();
        fs::create_dir_all(&folder)?;
        Ok(FileBlockPersistence { folder })
    }

    fn path_for(&self, hash: &BlockHash) -> PathBuf {
        self.folder.join(hash.to_hex())
    }
}

impl BlockPersistence for FileBlockPersistence {
    fn store_block(&self, block: &Block) -> std::io::Result<()> {
        let hash = block.hash.ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "block has no hash")
        })?;
        let bytes = bincode::serde::encode_to_vec(block, bincode::config::standard())
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))?;
        fs::write(self.path_for(&hash), bytes)
    }

    fn load_all(&self) -> std::io::Result<Vec<Block>> {
        let mut blocks = Vec::new();
        for entry in fs::read_dir(&self.folder)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let bytes = fs::read(entry.path())?;
            let (block, _): (Block, usize) =
                bincode::serde::decode_from_slice(&bytes, bincode::config::standard())
                    .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))?;
            blocks.push(block);
        }
        Ok(blocks)
    }

    fn load_block(&self, hash: &BlockHash) -> std::io::Result<Option<Block>> {
        let path = self.path_for(hash);
        if !path.exists() {
            return Ok(None);
        }
        let bytes = fs::read(path)?;
        let (block, _): (Block, usize) =
            bincode::serde::decode_from_slice(&bytes, bincode::config::standard())
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))?;
        Ok(Some(block))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::KeyPair;
    use crate::types::genesis::{build_genesis_block, GenesisSpec};

    #[test]
    fn store_and_reload_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let persistence = FileBlockPersistence::open(dir.path()).unwrap();

        let kp = KeyPair::generate();
        let spec = GenesisSpec {
            admissions: vec![kp.public_key()],
            doctors: vec![],
            vaccines: vec![],
            timestamp: 1,
            version: 1,
        };
        let genesis = build_genesis_block(&spec);
        persistence.store_block(&genesis).unwrap();

        let loaded = persistence.load_block(&genesis.hash.unwrap()).unwrap().unwrap();
        assert_eq!(loaded.hash, genesis.hash);

        let all = persistence.load_all().unwrap();
        assert_eq!(all.len(), 1);
    }

    #[test]
    fn load_block_returns_none_when_absent() {
        let dir = tempfile::tempdir().unwrap();
        let persistence = FileBlockPersistence::open(dir.path()).unwrap();
        let missing = BlockHash(crate::types::Hash256([7u8; 32]));
        assert!(persistence.load_block(&missing).unwrap().is_none());
    }
}
