//! Optional interactive stdin REPL (`START_CLI=1`), grounded on
//! `original_source/blockchain/full_client.py`'s
//! `start_create_transaction_loop`: a blocking loop reading one command per
//! line and submitting a transaction through the same path a peer's
//! `/new_transaction` delivery would.
//!
//! Supported commands:
//! - `vaccine <name>` — registers a new vaccine (must be an admission).
//! - `permission <patient|doctor|admission>` — requests a role for this
//!   node's own key.

use std::io::BufRead;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use chain::{KeyPair, PermissionKind, PermissionTx, Transaction, VaccineTx};

use crate::state::Controller;

fn now_secs() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs()
}

/// Spawns the REPL on a blocking thread (stdin reads are not `async`) and
/// forwards each parsed command to `controller` on the async runtime.
pub fn spawn(controller: Arc<Controller>, key_pair: Arc<KeyPair>, version: u32) {
    // Captured here, inside the async context, since a plain `std::thread`
    // has no ambient Tokio runtime of its own to look up.
    let handle = tokio::runtime::Handle::current();

    std::thread::Builder::new()
        .name("node-gateway-cli".to_string())
        .spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                let Ok(line) = line else { break };
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                let Some(tx) = parse_command(line, &key_pair, version) else {
                    eprintln!("unrecognized command: {line}");
                    continue;
                };

                let controller = controller.clone();
                handle.block_on(async move {
                    match controller.received_transaction(tx).await {
                        Ok(()) => println!("queued"),
                        Err(e) => println!("rejected: {e}"),
                    }
                });
            }
        })
        .expect("failed to spawn CLI thread");
}

fn parse_command(line: &str, key_pair: &KeyPair, version: u32) -> Option<Transaction> {
    let mut parts = line.splitn(2, ' ');
    let command = parts.next()?;
    let rest = parts.next().unwrap_or("").trim();

    match command {
        "vaccine" => {
            if rest.is_empty() {
                return None;
            }
            let mut tx = VaccineTx::new(rest.to_string(), key_pair.public_key(), now_secs(), version);
            tx.sign(key_pair);
            Some(Transaction::Vaccine(tx))
        }
        "permission" => {
            let kind = match rest {
                "patient" => PermissionKind::Patient,
                "doctor" => PermissionKind::Doctor,
                "admission" => PermissionKind::Admission,
                _ => return None,
            };
            let mut tx = PermissionTx::new(kind, key_pair.public_key(), now_secs(), version);
            tx.sign(key_pair);
            Some(Transaction::Permission(tx))
        }
        _ => None,
    }
}
