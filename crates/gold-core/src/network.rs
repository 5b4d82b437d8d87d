//! Bitcoin Gold network definitions and consensus parameters.
//!
//! Validation never looks a network up by name: callers build or select a
//! [`NetworkProfile`] and pass it in. [`Network`] provides the well-known
//! presets, and every profile type is serde-(de)serializable so hosts can
//! load their own.

use primitive_types::U256;
use serde::{Deserialize, Serialize};

/// Equihash `(n, k)` parameters and BLAKE2b personalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EquihashParams {
    pub n: u32,
    pub k: u32,
    /// Personalization string, e.g. `BgoldPoW`.
    pub personalization: String,
}

impl EquihashParams {
    pub fn new(n: u32, k: u32, personalization: &str) -> Self {
        EquihashParams {
            n,
            k,
            personalization: personalization.to_string(),
        }
    }

    /// Expected solution size in bytes for these parameters.
    ///
    /// `2^k` indices of `n / (k + 1) + 1` bits each, packed.
    pub fn solution_size(&self) -> usize {
        let index_bits = (self.n / (self.k + 1) + 1) as usize;
        (1usize << self.k) * index_bits / 8
    }
}

/// Parameter set used up to and including `height`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EquihashFork {
    pub height: u32,
    pub params: EquihashParams,
}

/// Equihash configuration: the current set plus an optional earlier one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EquihashConfig {
    #[serde(flatten)]
    pub params: EquihashParams,
    #[serde(default)]
    pub pre_fork: Option<EquihashFork>,
}

impl EquihashConfig {
    /// Parameters that apply to a block at `height`.
    ///
    /// A fork at height 0 counts as unset.
    pub fn params_for_height(&self, height: u32) -> &EquihashParams {
        match &self.pre_fork {
            Some(fork) if fork.height > 0 && height <= fork.height => &fork.params,
            _ => &self.params,
        }
    }
}

/// LWMA difficulty adjustment parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LwmaParams {
    /// First height whose bits are set by LWMA.
    pub enable_height: u32,
    /// Allow minimum-difficulty blocks after a long gap.
    pub testnet: bool,
    /// Never retarget.
    pub regtest: bool,
    /// Target block spacing in seconds.
    pub target_spacing: u32,
    /// Number of solvetimes averaged (N).
    pub averaging_window: u32,
    pub adjust_weight: u32,
    pub min_denominator: u32,
    /// Clamp each solvetime to six target spacings.
    pub solve_time_limitation: bool,
    /// Largest allowed target.
    pub pow_limit: U256,
}

/// Everything proof-of-work validation needs to know about a network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkProfile {
    /// Height at which the extended header and Equihash take effect.
    pub fork_height: u32,
    pub equihash: EquihashConfig,
    #[serde(default)]
    pub lwma: Option<LwmaParams>,
}

/// Well-known Bitcoin Gold networks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Network {
    #[default]
    BitcoinGold,
    BitcoinGoldTestnet,
    BitcoinGoldRegtest,
}

impl Network {
    /// Parse network from string.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "bitcoingold" | "mainnet" | "main" | "btg" => Some(Network::BitcoinGold),
            "bitcoingoldtestnet" | "testnet" | "test" => Some(Network::BitcoinGoldTestnet),
            "bitcoingoldregtest" | "regtest" => Some(Network::BitcoinGoldRegtest),
            _ => None,
        }
    }

    /// Get network name as string.
    pub fn name(&self) -> &'static str {
        match self {
            Network::BitcoinGold => "bitcoingold",
            Network::BitcoinGoldTestnet => "bitcoingoldtestnet",
            Network::BitcoinGoldRegtest => "bitcoingoldregtest",
        }
    }

    /// Build the consensus profile for this network.
    pub fn profile(&self) -> NetworkProfile {
        match self {
            Network::BitcoinGold => NetworkProfile {
                fork_height: 491_407,
                equihash: EquihashConfig {
                    params: EquihashParams::new(144, 5, "BgoldPoW"),
                    pre_fork: Some(EquihashFork {
                        height: 536_200,
                        params: EquihashParams::new(200, 9, "ZcashPoW"),
                    }),
                },
                lwma: Some(LwmaParams {
                    enable_height: 536_200,
                    testnet: false,
                    regtest: false,
                    solve_time_limitation: true,
                    pow_limit: U256::from(0x7_ffff_ffffu64) << 208,
                    ..LwmaParams::bitcoin_gold()
                }),
            },
            Network::BitcoinGoldTestnet => NetworkProfile {
                fork_height: 1,
                equihash: EquihashConfig {
                    params: EquihashParams::new(144, 5, "BgoldPoW"),
                    pre_fork: Some(EquihashFork {
                        height: 14_300,
                        params: EquihashParams::new(200, 9, "ZcashPoW"),
                    }),
                },
                lwma: Some(LwmaParams {
                    enable_height: 14_300,
                    testnet: true,
                    regtest: false,
                    solve_time_limitation: false,
                    pow_limit: U256::MAX >> 13,
                    ..LwmaParams::bitcoin_gold()
                }),
            },
            Network::BitcoinGoldRegtest => NetworkProfile {
                fork_height: 2000,
                equihash: EquihashConfig {
                    params: EquihashParams::new(96, 5, "BgoldPoW"),
                    pre_fork: None,
                },
                lwma: Some(LwmaParams {
                    enable_height: 0,
                    testnet: false,
                    regtest: true,
                    solve_time_limitation: false,
                    pow_limit: U256::MAX >> 1,
                    ..LwmaParams::bitcoin_gold()
                }),
            },
        }
    }
}

impl LwmaParams {
    /// Window and weighting shared by every Bitcoin Gold network.
    fn bitcoin_gold() -> Self {
        LwmaParams {
            enable_height: 0,
            testnet: false,
            regtest: false,
            target_spacing: 600,
            averaging_window: 45,
            adjust_weight: 13_772,
            min_denominator: 10,
            solve_time_limitation: false,
            pow_limit: U256::MAX,
        }
    }
}

impl core::fmt::Display for Network {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.name())
    }
}
