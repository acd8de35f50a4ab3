//! # Node Configuration
//!
//! All configuration comes from the process environment, read once at
//! startup. Anything that would corrupt the hash chain or lose data is
//! a fail-fast condition here, never a runtime surprise.

use std::path::PathBuf;

use anyhow::{bail, Context};

/// Typed configuration for one gateway process.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// HTTP bind address, e.g. `0.0.0.0:8000`.
    pub bind_addr: String,
    /// Data directory for the RocksDB store and fallback files.
    pub data_dir: PathBuf,
    /// Chain environment name (`finney`, `test`, ...).
    pub network: String,
    /// Subnet id.
    pub netuid: u16,
    /// Permanent-storage upload endpoint.
    pub arweave_url: String,
    /// Optional fixed enclave seed (hex, 32 bytes). Generated per boot
    /// when absent; the hash chain links boots either way.
    pub enclave_seed: Option<[u8; 32]>,
}

impl NodeConfig {
    /// Read and validate the environment.
    ///
    /// # Fail-fast conditions
    ///
    /// - `WEB_CONCURRENCY > 1`: multiple workers would fork the hash
    ///   chain
    /// - unwritable data directory
    /// - malformed netuid or enclave seed
    pub fn from_env() -> anyhow::Result<Self> {
        let web_concurrency: u32 = std::env::var("WEB_CONCURRENCY")
            .unwrap_or_else(|_| "1".to_string())
            .parse()
            .context("WEB_CONCURRENCY must be an integer")?;
        if web_concurrency > 1 {
            bail!(
                "FATAL: the gateway must run as a single process \
                 (WEB_CONCURRENCY={web_concurrency}); multiple workers fork the hash chain"
            );
        }

        let netuid: u16 = std::env::var("BITTENSOR_NETUID")
            .unwrap_or_else(|_| "401".to_string())
            .parse()
            .context("BITTENSOR_NETUID must be a u16")?;

        let data_dir = PathBuf::from(
            std::env::var("LEADGATE_DATA_DIR").unwrap_or_else(|_| "./data".to_string()),
        );
        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("data dir {} is not writable", data_dir.display()))?;

        let enclave_seed = match std::env::var("LEADGATE_ENCLAVE_SEED") {
            Ok(hex_seed) => {
                let bytes = hex::decode(hex_seed.trim())
                    .context("LEADGATE_ENCLAVE_SEED must be hex")?;
                let seed: [u8; 32] = bytes
                    .try_into()
                    .map_err(|_| anyhow::anyhow!("LEADGATE_ENCLAVE_SEED must be 32 bytes"))?;
                Some(seed)
            }
            Err(_) => None,
        };

        Ok(Self {
            bind_addr: std::env::var("LEADGATE_BIND_ADDR")
                .unwrap_or_else(|_| "0.0.0.0:8000".to_string()),
            data_dir,
            network: std::env::var("BITTENSOR_NETWORK").unwrap_or_else(|_| "finney".to_string()),
            netuid,
            arweave_url: std::env::var("LEADGATE_ARWEAVE_URL")
                .unwrap_or_else(|_| "https://arweave.net".to_string()),
            enclave_seed,
        })
    }
}
