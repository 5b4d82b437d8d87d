//! WebAssembly bindings for the Bitcoin Gold header core.
//!
//! This crate provides JavaScript-accessible APIs for:
//! - Importing and exporting blocks as hex
//! - Computing block hashes
//! - LWMA retargeting over a window of previous blocks
//! - Proof-of-work checks with a JavaScript Equihash verifier

use wasm_bindgen::prelude::*;

pub mod block;
pub mod state;

// Re-export main types for JS access
pub use block::BlockGold;

/// Initialize the WASM module with better panic messages.
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// Get the library version.
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

/// Consensus profile of a named network as a plain JS object.
#[wasm_bindgen(js_name = networkProfile)]
pub fn network_profile(network: &str) -> Result<JsValue, JsValue> {
    let profile = state::parse_network(network)?.profile();
    state::ProfileInfo::from(&profile).to_js()
}
