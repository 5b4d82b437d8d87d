//! Plain data handed across the JS boundary.

use gold_core::{hash_to_display_hex, Block, Network, NetworkProfile};
use serde::{Deserialize, Serialize};
use wasm_bindgen::prelude::*;

/// Look up a network preset by name.
pub fn parse_network(name: &str) -> Result<Network, JsValue> {
    Network::from_str(name).ok_or_else(|| JsValue::from_str(&format!("Invalid network: {}", name)))
}

/// Decoded header fields for display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeaderInfo {
    pub version: i32,
    /// Previous block hash (display format).
    pub prev_hash: String,
    /// Merkle root (display format).
    pub merkle_root: String,
    pub height: u32,
    pub timestamp: u32,
    /// Difficulty bits.
    pub bits: u32,
    /// 32-byte nonce as hex.
    pub nonce: String,
    /// Equihash solution as hex.
    pub solution: String,
    /// Number of transactions, absent for a header-only block.
    pub transaction_count: Option<usize>,
}

impl From<&Block> for HeaderInfo {
    fn from(block: &Block) -> Self {
        let header = &block.header;
        HeaderInfo {
            version: header.version,
            prev_hash: hash_to_display_hex(&header.prev_hash),
            merkle_root: hash_to_display_hex(&header.merkle_root),
            height: header.height,
            timestamp: header.timestamp,
            bits: header.bits,
            nonce: hex::encode(header.nonce),
            solution: hex::encode(&header.solution),
            transaction_count: block.transactions.as_ref().map(Vec::len),
        }
    }
}

impl HeaderInfo {
    /// Convert to JS value.
    pub fn to_js(&self) -> Result<JsValue, JsValue> {
        serde_wasm_bindgen::to_value(self)
            .map_err(|e| JsValue::from_str(&format!("Serialization error: {:?}", e)))
    }
}

/// A network profile flattened for JS.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileInfo {
    pub fork_height: u32,
    pub equihash_n: u32,
    pub equihash_k: u32,
    pub personalization: String,
    /// Expected Equihash solution size in bytes.
    pub solution_size: usize,
    /// Last height that still uses the pre-fork Equihash parameters.
    pub pre_fork_height: Option<u32>,
    pub lwma: Option<LwmaInfo>,
}

/// LWMA parameters with the limit rendered as hex.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LwmaInfo {
    pub enable_height: u32,
    pub testnet: bool,
    pub regtest: bool,
    pub target_spacing: u32,
    pub averaging_window: u32,
    pub adjust_weight: u32,
    pub min_denominator: u32,
    pub solve_time_limitation: bool,
    /// Big-endian, 64 hex characters.
    pub pow_limit: String,
}

impl From<&NetworkProfile> for ProfileInfo {
    fn from(profile: &NetworkProfile) -> Self {
        let equihash = &profile.equihash;
        ProfileInfo {
            fork_height: profile.fork_height,
            equihash_n: equihash.params.n,
            equihash_k: equihash.params.k,
            personalization: equihash.params.personalization.clone(),
            solution_size: equihash.params.solution_size(),
            pre_fork_height: equihash.pre_fork.as_ref().map(|fork| fork.height),
            lwma: profile.lwma.as_ref().map(|lwma| LwmaInfo {
                enable_height: lwma.enable_height,
                testnet: lwma.testnet,
                regtest: lwma.regtest,
                target_spacing: lwma.target_spacing,
                averaging_window: lwma.averaging_window,
                adjust_weight: lwma.adjust_weight,
                min_denominator: lwma.min_denominator,
                solve_time_limitation: lwma.solve_time_limitation,
                pow_limit: hex::encode(gold_core::target::target_to_be_bytes(&lwma.pow_limit)),
            }),
        }
    }
}

impl ProfileInfo {
    /// Convert to JS value.
    pub fn to_js(&self) -> Result<JsValue, JsValue> {
        serde_wasm_bindgen::to_value(self)
            .map_err(|e| JsValue::from_str(&format!("Serialization error: {:?}", e)))
    }
}
