//! Proof-of-work validation.
//!
//! A header passes when its bits are right and, if asked, its Equihash
//! solution verifies. "Right bits" means either the LWMA-expected bits (once
//! LWMA is active) or a header hash at or below the target the bits encode.
//! The Equihash algorithm itself lives behind [`SolutionVerifier`].

use tracing::{debug, trace};

use crate::block::{BlockHeader, HeaderFormat};
use crate::error::RetargetError;
use crate::hash::reverse_bytes;
use crate::lwma::calc_next_bits;
use crate::network::{EquihashParams, NetworkProfile};
use crate::target::{bits_to_target, hash_meets_target};

/// Verifies an Equihash solution against the serialized header.
pub trait SolutionVerifier {
    fn verify(&self, header: &[u8], solution: &[u8], params: &EquihashParams) -> bool;
}

impl<F> SolutionVerifier for F
where
    F: Fn(&[u8], &[u8], &EquihashParams) -> bool,
{
    fn verify(&self, header: &[u8], solution: &[u8], params: &EquihashParams) -> bool {
        self(header, solution, params)
    }
}

/// Checks headers against one network's proof-of-work rules.
pub struct ProofOfWorkValidator<'a, V> {
    profile: &'a NetworkProfile,
    verifier: V,
}

impl<'a, V: SolutionVerifier> ProofOfWorkValidator<'a, V> {
    pub fn new(profile: &'a NetworkProfile, verifier: V) -> Self {
        ProofOfWorkValidator { profile, verifier }
    }

    /// Validate `header`'s proof of work.
    ///
    /// `previous` is the retarget window and is only read once LWMA is
    /// active. An invalid block yields `Ok(false)`; errors mean the window
    /// itself is unusable.
    pub fn check<H: AsRef<BlockHeader>>(
        &self,
        header: &BlockHeader,
        validate_solution: bool,
        previous: &[H],
    ) -> Result<bool, RetargetError> {
        if !self.check_target(header, previous)? {
            return Ok(false);
        }

        if validate_solution && header.height >= self.profile.fork_height {
            return Ok(self.check_solution(header));
        }

        Ok(true)
    }

    /// Target half of [`check`](Self::check).
    pub fn check_target<H: AsRef<BlockHeader>>(
        &self,
        header: &BlockHeader,
        previous: &[H],
    ) -> Result<bool, RetargetError> {
        match &self.profile.lwma {
            Some(lwma) if header.height >= lwma.enable_height => {
                let expected = calc_next_bits(header, previous, lwma)?;
                if header.bits != expected {
                    debug!(
                        height = header.height,
                        bits = format_args!("{:#010x}", header.bits),
                        expected = format_args!("{:#010x}", expected),
                        "bits do not match LWMA"
                    );
                    return Ok(false);
                }
                Ok(true)
            }
            _ => {
                let hash = reverse_bytes(&header.hash(HeaderFormat::Extended));
                let valid = hash_meets_target(&hash, &bits_to_target(header.bits));
                if !valid {
                    debug!(height = header.height, hash = %hex::encode(hash), "hash above target");
                }
                Ok(valid)
            }
        }
    }

    /// Solution half of [`check`](Self::check), without the fork-height gate.
    pub fn check_solution(&self, header: &BlockHeader) -> bool {
        let params = self.profile.equihash.params_for_height(header.height);
        trace!(height = header.height, n = params.n, k = params.k, "verifying equihash solution");

        let header_bytes = header.encode(HeaderFormat::Extended);
        let valid = self.verifier.verify(&header_bytes, &header.solution, params);
        if !valid {
            debug!(height = header.height, "equihash solution rejected");
        }
        valid
    }
}

/// One-shot form of [`ProofOfWorkValidator::check`].
pub fn check_proof_of_work<H, V>(
    header: &BlockHeader,
    validate_solution: bool,
    profile: &NetworkProfile,
    previous: &[H],
    verifier: V,
) -> Result<bool, RetargetError>
where
    H: AsRef<BlockHeader>,
    V: SolutionVerifier,
{
    ProofOfWorkValidator::new(profile, verifier).check(header, validate_solution, previous)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::Block;
    use crate::network::{EquihashConfig, EquihashFork, Network};
    use std::cell::RefCell;

    const NO_WINDOW: &[BlockHeader] = &[];

    /// Profile with a fixed target, forked at genesis.
    fn fixed_profile() -> NetworkProfile {
        NetworkProfile {
            fork_height: 0,
            equihash: EquihashConfig {
                params: EquihashParams::new(144, 5, "BgoldPoW"),
                pre_fork: Some(EquihashFork {
                    height: 500,
                    params: EquihashParams::new(200, 9, "ZcashPoW"),
                }),
            },
            lwma: None,
        }
    }

    /// A header whose extended hash is below 0x1f00ffff.
    fn mined_header(height: u32) -> BlockHeader {
        let mut header = BlockHeader::new(height, [0x11u8; 32], [0x22u8; 32], 1_500_000_000, 0x1f00ffff);
        header.nonce[..4].copy_from_slice(&31977u32.to_le_bytes());
        header.solution = vec![0x5a; 100];
        header
    }

    fn accept_all(_: &[u8], _: &[u8], _: &EquihashParams) -> bool {
        true
    }

    fn reject_all(_: &[u8], _: &[u8], _: &EquihashParams) -> bool {
        false
    }

    #[test]
    fn test_mined_header_meets_target() {
        let profile = fixed_profile();
        let header = mined_header(600);

        assert_eq!(
            hex::encode(reverse_bytes(&header.hash(HeaderFormat::Extended))),
            "0000d5660d55d7f8fffb960740d344fbd78ee37d3a9a6353a08feeee63255f32"
        );
        assert_eq!(check_proof_of_work(&header, false, &profile, NO_WINDOW, reject_all), Ok(true));
    }

    #[test]
    fn test_perturbed_header_fails() {
        let profile = fixed_profile();
        let validator = ProofOfWorkValidator::new(&profile, accept_all);
        let encoded = mined_header(600).encode(HeaderFormat::Extended);

        for i in 0..encoded.len() {
            // Skip the bits field and the solution length prefix.
            if (104..108).contains(&i) || i == 140 {
                continue;
            }
            let mut perturbed = encoded.clone();
            perturbed[i] ^= 0x01;
            let block: Block = Block::decode(&perturbed).unwrap();
            assert_eq!(validator.check(&block.header, false, NO_WINDOW), Ok(false), "byte {}", i);
        }
    }

    #[test]
    fn test_solution_ignored_when_not_validating() {
        let profile = fixed_profile();
        let validator = ProofOfWorkValidator::new(&profile, reject_all);
        assert_eq!(validator.check(&mined_header(600), false, NO_WINDOW), Ok(true));
        assert_eq!(validator.check(&mined_header(600), true, NO_WINDOW), Ok(false));
    }

    #[test]
    fn test_verifier_receives_header_and_params() {
        let profile = fixed_profile();
        let calls = RefCell::new(Vec::new());
        let verifier = |header: &[u8], solution: &[u8], params: &EquihashParams| {
            calls.borrow_mut().push((header.to_vec(), solution.to_vec(), params.n));
            true
        };

        let header = mined_header(600);
        assert_eq!(check_proof_of_work(&header, true, &profile, NO_WINDOW, &verifier), Ok(true));

        let calls = calls.into_inner();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, header.encode(HeaderFormat::Extended));
        assert_eq!(calls[0].1, vec![0x5a; 100]);
        assert_eq!(calls[0].2, 144);
    }

    #[test]
    fn test_pre_fork_equihash_params() {
        let profile = fixed_profile();
        let seen = RefCell::new(Vec::new());
        let verifier = |_: &[u8], _: &[u8], params: &EquihashParams| {
            seen.borrow_mut().push((params.n, params.k, params.personalization.clone()));
            true
        };
        let validator = ProofOfWorkValidator::new(&profile, &verifier);

        // The mined nonce only fits height 600, so go through the solution half directly.
        assert!(validator.check_solution(&mined_header(500)));
        assert!(validator.check_solution(&mined_header(501)));

        assert_eq!(
            seen.into_inner(),
            vec![(200, 9, "ZcashPoW".to_string()), (144, 5, "BgoldPoW".to_string())]
        );
    }

    #[test]
    fn test_no_solution_check_before_fork() {
        let profile = NetworkProfile { fork_height: 1_000, ..fixed_profile() };
        let validator = ProofOfWorkValidator::new(&profile, |_: &[u8], _: &[u8], _: &EquihashParams| -> bool {
            panic!("verifier must not run before the fork")
        });
        assert_eq!(validator.check(&mined_header(600), true, NO_WINDOW), Ok(true));
    }

    #[test]
    fn test_target_failure_skips_solution() {
        let profile = fixed_profile();
        let validator = ProofOfWorkValidator::new(&profile, |_: &[u8], _: &[u8], _: &EquihashParams| -> bool {
            panic!("verifier must not run after a target failure")
        });
        let mut header = mined_header(600);
        header.bits = 0x1d00ffff;
        assert_eq!(validator.check(&header, true, NO_WINDOW), Ok(false));
    }

    fn lwma_window(height: u32) -> Vec<BlockHeader> {
        (0..46)
            .map(|k| BlockHeader::new(height - 46 + k, [0u8; 32], [0u8; 32], 1_600_000_000 + 600 * k, 0x1d00ffff))
            .collect()
    }

    #[test]
    fn test_lwma_bits_checked_once_enabled() {
        let profile = Network::BitcoinGold.profile();
        let height = 600_000;
        let window = lwma_window(height);

        let mut header = BlockHeader::new(height, [0u8; 32], [0u8; 32], 1_600_000_000 + 600 * 46, 0x1d010084);
        assert_eq!(check_proof_of_work(&header, false, &profile, &window, accept_all), Ok(true));

        header.bits = 0x1d00ffff;
        assert_eq!(check_proof_of_work(&header, false, &profile, &window, accept_all), Ok(false));
    }

    #[test]
    fn test_lwma_window_errors_propagate() {
        let profile = Network::BitcoinGold.profile();
        let window = lwma_window(600_000);
        let header = BlockHeader::new(600_000, [0u8; 32], [0u8; 32], 0, 0x1d010084);

        assert_eq!(
            check_proof_of_work(&header, false, &profile, &window[..45], accept_all),
            Err(RetargetError::InsufficientWindow { required: 46, available: 45 })
        );
    }

    #[test]
    fn test_fixed_target_below_lwma_height() {
        let mut profile = Network::BitcoinGold.profile();
        profile.fork_height = 0;
        if let Some(lwma) = profile.lwma.as_mut() {
            lwma.enable_height = 601;
        }

        // No window needed below the LWMA activation height.
        assert_eq!(check_proof_of_work(&mined_header(600), false, &profile, NO_WINDOW, accept_all), Ok(true));
    }
}
