//! Node gateway configuration: HTTP listen address plus the `spec.md` §6
//! environment variables every node reads at startup.

use std::env;
use std::net::SocketAddr;
use std::time::{SystemTime, UNIX_EPOCH};

use chain::{ChainConfig, GenesisSpec, PublicKey};

/// Configuration for the gateway's own HTTP server, separate from
/// [`chain::ChainConfig`]'s peer/persistence/consensus settings.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    /// Address to bind the HTTP server to, from `SERVER_PORT`.
    pub listen_addr: SocketAddr,
    /// Whether to self-submit a `Permission(Admission)` transaction at
    /// startup, from `REGISTER_AS_ADMISSION`.
    pub register_as_admission: bool,
    /// Whether outbound block sends require interactive confirmation,
    /// from `CONFIRM_BLOCKSENDING`.
    pub confirm_block_sending: bool,
    /// Whether to start the interactive transaction-submission REPL on
    /// stdin, from `START_CLI`.
    pub start_cli: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        let addr: SocketAddr = "0.0.0.0:8081"
            .parse()
            .expect("hard-coded API listen address should parse");
        Self {
            listen_addr: addr,
            register_as_admission: false,
            confirm_block_sending: false,
            start_cli: false,
        }
    }
}

fn env_flag(name: &str) -> bool {
    env::var(name).map(|v| v == "1").unwrap_or(false)
}

impl ApiConfig {
    /// Reads `SERVER_PORT`, `REGISTER_AS_ADMISSION`, `CONFIRM_BLOCKSENDING`,
    /// and `START_CLI`, falling back to [`ApiConfig::default`] for any
    /// variable that's unset or unparsable.
    pub fn from_env() -> Self {
        let mut cfg = ApiConfig::default();
        if let Ok(port) = env::var("SERVER_PORT") {
            if let Ok(port) = port.parse::<u16>() {
                cfg.listen_addr.set_port(port);
            }
        }
        cfg.register_as_admission = env_flag("REGISTER_AS_ADMISSION");
        cfg.confirm_block_sending = env_flag("CONFIRM_BLOCKSENDING");
        cfg.start_cli = env_flag("START_CLI");
        cfg
    }
}

/// Reads `NEIGHBORS_HOST_PORT` into a [`ChainConfig`], otherwise using
/// `ChainConfig::default()`.
pub fn chain_config_from_env() -> ChainConfig {
    let mut cfg = ChainConfig::default();
    if let Ok(raw) = env::var("NEIGHBORS_HOST_PORT") {
        cfg.peers = ChainConfig::parse_neighbors(&raw);
    }
    cfg
}

/// Builds this network's genesis spec. Every node joining the same network
/// must be started with the same values (shared out of band, the same way
/// the original client shared a single `CONFIG` module across every
/// instance it ran); a node started with no overrides bootstraps a
/// brand-new single-admission network rooted at its own key.
///
/// Reads `GENESIS_ADMISSIONS_HEX`, `GENESIS_DOCTORS_HEX` (comma-separated
/// hex public keys), `GENESIS_VACCINES` (comma-separated names), and
/// `GENESIS_TIMESTAMP`.
pub fn genesis_spec_from_env(self_key: &PublicKey, version: u32) -> GenesisSpec {
    let admissions = env::var("GENESIS_ADMISSIONS_HEX")
        .ok()
        .map(|raw| parse_hex_keys(&raw))
        .filter(|keys| !keys.is_empty())
        .unwrap_or_else(|| vec![self_key.clone()]);

    let doctors = env::var("GENESIS_DOCTORS_HEX")
        .ok()
        .map(|raw| parse_hex_keys(&raw))
        .unwrap_or_default();

    let vaccines = env::var("GENESIS_VACCINES")
        .ok()
        .map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    let timestamp = env::var("GENESIS_TIMESTAMP")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or_else(|| {
            SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs()
        });

    GenesisSpec {
        admissions,
        doctors,
        vaccines,
        timestamp,
        version,
    }
}

fn parse_hex_keys(raw: &str) -> Vec<PublicKey> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(PublicKey::from_hex)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_api_config_binds_all_interfaces_on_8081() {
        let cfg = ApiConfig::default();
        assert_eq!(cfg.listen_addr.port(), 8081);
        assert!(!cfg.register_as_admission);
    }

    #[test]
    fn genesis_spec_falls_back_to_self_as_sole_admission() {
        let self_key = PublicKey(vec![1, 2, 3]);
        let spec = genesis_spec_from_env(&self_key, 1);
        assert_eq!(spec.admissions, vec![self_key]);
    }
}
