//! Top-level configuration for a chain node.
//!
//! Aggregates the options `spec.md` §6 lists: consensus parameters
//! (`ConsensusConfig`), where the keypair and the block files live on
//! disk, and which port this node listens on for peer traffic, plus the
//! ambient Prometheus exporter settings the teacher's `MetricsConfig`
//! already covered.

use std::net::SocketAddr;
use std::path::PathBuf;

use crate::consensus::ConsensusConfig;
use crate::peer::PeerAddr;

/// Configuration for the Prometheus metrics exporter.
#[derive(Clone, Debug)]
pub struct MetricsConfig {
    /// Whether to run a `/metrics` HTTP exporter.
    pub enabled: bool,
    /// Address to bind the metrics HTTP server to.
    pub listen_addr: SocketAddr,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        let addr: SocketAddr = "127.0.0.1:9898"
            .parse()
            .expect("hard-coded metrics listen address should parse");
        Self {
            enabled: true,
            listen_addr: addr,
        }
    }
}

/// Top-level configuration for a chain node (`spec.md` §6).
#[derive(Clone, Debug)]
pub struct ChainConfig {
    pub consensus: ConsensusConfig,
    /// Where this node's keypair is persisted (`public`/`private` files).
    pub key_folder: PathBuf,
    /// Where accepted blocks are persisted, one file per hash.
    pub persistance_folder: PathBuf,
    /// Port this node listens on for peer traffic.
    pub default_port: u16,
    /// Neighbor nodes to dial at startup, from `NEIGHBORS_HOST_PORT`.
    pub peers: Vec<PeerAddr>,
    /// Whether to self-submit a `Permission(Admission)` transaction at
    /// startup, from `REGISTER_AS_ADMISSION`.
    pub register_as_admission: bool,
    /// Whether outbound block sends require interactive confirmation,
    /// from `CONFIRM_BLOCKSENDING`.
    pub confirm_block_sending: bool,
    pub metrics: MetricsConfig,
}

impl Default for ChainConfig {
    fn default() -> Self {
        ChainConfig {
            consensus: ConsensusConfig::default(),
            key_folder: PathBuf::from("./keys"),
            persistance_folder: PathBuf::from("./blocks"),
            default_port: 5000,
            peers: Vec::new(),
            register_as_admission: false,
            confirm_block_sending: false,
            metrics: MetricsConfig::default(),
        }
    }
}

impl ChainConfig {
    /// Parses `NEIGHBORS_HOST_PORT` (`"host:port,host:port"`) into peer
    /// addresses, each normalized to an HTTP base URL.
    pub fn parse_neighbors(raw: &str) -> Vec<PeerAddr> {
        raw.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|host_port| PeerAddr(format!("http://{host_port}")))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_neighbors_splits_and_trims() {
        let peers = ChainConfig::parse_neighbors(" 10.0.0.1:5000 ,10.0.0.2:5001,");
        assert_eq!(
            peers,
            vec![
                PeerAddr("http://10.0.0.1:5000".to_string()),
                PeerAddr("http://10.0.0.2:5001".to_string()),
            ]
        );
    }

    #[test]
    fn default_chain_config_has_sane_ports() {
        let cfg = ChainConfig::default();
        assert_eq!(cfg.default_port, 5000);
        assert!(cfg.metrics.enabled);
    }
}
