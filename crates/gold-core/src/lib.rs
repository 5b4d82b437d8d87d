//! Bitcoin Gold block header handling.
//!
//! This crate provides pure Rust implementations of:
//! - Block header and block serialization in the legacy (80-byte) and
//!   extended (Equihash) layouts
//! - Compact "bits" to 256-bit target conversion
//! - LWMA difficulty retargeting
//! - Proof-of-work checks, delegating Equihash verification to the caller
//!
//! Nothing here performs I/O or reads global state; network parameters are
//! always passed in as a [`NetworkProfile`].

pub mod block;
pub mod cursor;
pub mod error;
pub mod hash;
pub mod lwma;
pub mod network;
pub mod pow;
pub mod target;
pub mod transaction;

pub use block::{Block, BlockHeader, HeaderFormat};
pub use error::{DecodeError, RetargetError};
pub use hash::{double_sha256, hash_to_display_hex};
pub use lwma::calc_next_bits;
pub use network::{EquihashConfig, EquihashFork, EquihashParams, LwmaParams, Network, NetworkProfile};
pub use pow::{check_proof_of_work, ProofOfWorkValidator, SolutionVerifier};
pub use primitive_types::U256;
pub use target::{bits_to_target, hash_meets_target, target_to_bits};
pub use transaction::{Transaction, TransactionCodec};
