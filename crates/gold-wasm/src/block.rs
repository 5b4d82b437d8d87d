//! JS wrapper around a decoded Bitcoin Gold block.

use gold_core::{
    calc_next_bits, check_proof_of_work, hash_to_display_hex, Block, EquihashParams, HeaderFormat,
    NetworkProfile, SolutionVerifier,
};
use js_sys::{Array, Function, Uint8Array};
use wasm_bindgen::prelude::*;

use crate::state::{parse_network, HeaderInfo};

/// A block decoded from hex.
#[wasm_bindgen]
pub struct BlockGold {
    block: Block,
}

#[wasm_bindgen]
impl BlockGold {
    /// Decode a block (or header-only block) from extended-layout hex.
    #[wasm_bindgen(js_name = fromHex)]
    pub fn from_hex(hex_str: &str) -> Result<BlockGold, JsValue> {
        let block = Block::from_hex(hex_str)
            .map_err(|e| JsValue::from_str(&format!("Invalid block: {}", e)))?;
        Ok(BlockGold { block })
    }

    /// Serialize back to hex.
    ///
    /// # Arguments
    /// * `headers_only` - Omit the transaction section
    /// * `legacy` - Use the 80-byte header layout
    #[wasm_bindgen(js_name = toHex)]
    pub fn to_hex(&self, headers_only: bool, legacy: bool) -> String {
        self.block.to_hex(headers_only, layout(legacy))
    }

    #[wasm_bindgen(js_name = byteLength)]
    pub fn byte_length(&self, headers_only: bool, legacy: bool) -> usize {
        self.block.byte_length(headers_only, layout(legacy))
    }

    #[wasm_bindgen(getter)]
    pub fn version(&self) -> i32 {
        self.block.header.version
    }

    /// Previous block hash in display order.
    #[wasm_bindgen(getter, js_name = prevHash)]
    pub fn prev_hash(&self) -> String {
        hash_to_display_hex(&self.block.header.prev_hash)
    }

    #[wasm_bindgen(getter, js_name = merkleRoot)]
    pub fn merkle_root(&self) -> String {
        hash_to_display_hex(&self.block.header.merkle_root)
    }

    #[wasm_bindgen(getter)]
    pub fn height(&self) -> u32 {
        self.block.header.height
    }

    #[wasm_bindgen(getter)]
    pub fn timestamp(&self) -> u32 {
        self.block.header.timestamp
    }

    #[wasm_bindgen(getter)]
    pub fn bits(&self) -> u32 {
        self.block.header.bits
    }

    #[wasm_bindgen(getter)]
    pub fn nonce(&self) -> Vec<u8> {
        self.block.header.nonce.to_vec()
    }

    #[wasm_bindgen(getter)]
    pub fn solution(&self) -> Vec<u8> {
        self.block.header.solution.clone()
    }

    /// Transaction count, or `undefined` for a header-only block.
    #[wasm_bindgen(getter, js_name = transactionCount)]
    pub fn transaction_count(&self) -> Option<u32> {
        self.block.transactions.as_ref().map(|txs| txs.len() as u32)
    }

    /// All header fields as a plain object.
    #[wasm_bindgen]
    pub fn info(&self) -> Result<JsValue, JsValue> {
        HeaderInfo::from(&self.block).to_js()
    }

    /// Block hash in display order, using the layout the network expects at this height.
    #[wasm_bindgen]
    pub fn hash(&self, network: &str) -> Result<String, JsValue> {
        let profile = parse_network(network)?.profile();
        Ok(self.block.header.block_hash_hex(&profile))
    }

    /// Bits LWMA expects for this block.
    ///
    /// # Arguments
    /// * `network` - Network preset name
    /// * `previous` - Hex of the preceding blocks, in any order
    #[wasm_bindgen(js_name = calcNextBits)]
    pub fn calc_next_bits(&self, network: &str, previous: &Array) -> Result<u32, JsValue> {
        let profile = parse_network(network)?.profile();
        let lwma = profile
            .lwma
            .as_ref()
            .ok_or_else(|| JsValue::from_str("Network has no LWMA parameters"))?;
        let window = decode_window(previous)?;

        calc_next_bits(&self.block.header, &window, lwma)
            .map_err(|e| JsValue::from_str(&format!("Retarget failed: {}", e)))
    }

    /// Check this block's proof of work.
    ///
    /// `verifier(header, solution, params)` is called with the serialized
    /// header, the solution bytes, and `{ n, k, personalization }`; it must
    /// return `true` for a valid solution. It is required when
    /// `validate_solution` is set and the block is at or past the fork.
    #[wasm_bindgen(js_name = checkProofOfWork)]
    pub fn check_proof_of_work(
        &self,
        validate_solution: bool,
        network: &str,
        previous: &Array,
        verifier: Option<Function>,
    ) -> Result<bool, JsValue> {
        let profile: NetworkProfile = parse_network(network)?.profile();
        let checks_solution = validate_solution && self.block.header.height >= profile.fork_height;
        if checks_solution && verifier.is_none() {
            return Err(JsValue::from_str("A verifier is required to validate solutions"));
        }

        let window = decode_window(previous)?;

        check_proof_of_work(
            &self.block.header,
            validate_solution,
            &profile,
            &window,
            JsVerifier { callback: verifier },
        )
        .map_err(|e| JsValue::from_str(&format!("Proof of work check failed: {}", e)))
    }
}

fn layout(legacy: bool) -> HeaderFormat {
    if legacy {
        HeaderFormat::Legacy
    } else {
        HeaderFormat::Extended
    }
}

fn decode_window(previous: &Array) -> Result<Vec<Block>, JsValue> {
    previous
        .iter()
        .enumerate()
        .map(|(i, value)| {
            let hex_str = value
                .as_string()
                .ok_or_else(|| JsValue::from_str(&format!("Previous block {} is not a string", i)))?;
            Block::from_hex(&hex_str)
                .map_err(|e| JsValue::from_str(&format!("Invalid previous block {}: {}", i, e)))
        })
        .collect()
}

/// Forwards Equihash verification to a JS callback.
struct JsVerifier {
    callback: Option<Function>,
}

impl SolutionVerifier for JsVerifier {
    fn verify(&self, header: &[u8], solution: &[u8], params: &EquihashParams) -> bool {
        let Some(callback) = &self.callback else {
            return false;
        };
        let params = match serde_wasm_bindgen::to_value(params) {
            Ok(value) => value,
            Err(_) => return false,
        };

        callback
            .call3(
                &JsValue::NULL,
                &Uint8Array::from(header),
                &Uint8Array::from(solution),
                &params,
            )
            .map(|result| result.as_bool().unwrap_or(false))
            .unwrap_or(false)
    }
}
