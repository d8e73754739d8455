//! In-memory block persistence, for tests and devnets. Grounded on the
//! teacher's `InMemoryBlockStore`.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::storage::BlockPersistence;
use crate::types::{Block, BlockHash};

#[derive(Default)]
pub struct InMemoryBlockPersistence {
    blocks: Mutex<HashMap<BlockHash, Block>>,
}

impl InMemoryBlockPersistence {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BlockPersistence for InMemoryBlockPersistence {
    fn store_block(&self, block: &Block) -> std::io::Result<()> {
        let hash = block.hash.ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "block has no hash")
        })?;
        self.blocks.lock().unwrap().insert(hash, block.clone());
        Ok(())
    }

    fn load_all(&self) -> std::io::Result<Vec<Block>> {
        Ok(self.blocks.lock().unwrap().values().cloned().collect())
    }

    fn load_block(&self, hash: &BlockHash) -> std::io::Result<Option<Block>> {
        Ok(self.blocks.lock().unwrap().get(hash).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::KeyPair;
    use crate::types::genesis::{build_genesis_block, GenesisSpec};

    #[test]
    fn store_and_load_round_trips() {
        let persistence = InMemoryBlockPersistence::new();
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

        let loaded = persistence.load_block(&genesis.hash.unwrap()).unwrap();
        assert_eq!(loaded.map(|b| b.hash), Some(genesis.hash));
    }

    #[test]
    fn load_all_reflects_every_stored_block() {
        let persistence = InMemoryBlockPersistence::new();
        assert!(persistence.load_all().unwrap().is_empty());
    }
}
