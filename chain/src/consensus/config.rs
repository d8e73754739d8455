/// Consensus configuration parameters shared by every node in a network.
///
/// Every node must run with the same `version` and commit to the same
/// `block_time`/`block_size` for the creator-election arithmetic and
/// structural validation to agree across the network.
#[derive(Clone, Debug)]
pub struct ConsensusConfig {
    /// Target seconds between blocks, used by the creator-election schedule
    /// and by `Block::validate`'s timestamp-skew check.
    pub block_time: u64,
    /// Maximum transactions a single block may carry.
    pub block_size: usize,
    /// Protocol version every block must declare.
    pub version: u32,
}

impl Default for ConsensusConfig {
    fn default() -> Self {
        Self {
            block_time: 5,
            block_size: 10_000,
            version: 1,
        }
    }
}
