//! Linearly weighted moving average (LWMA) difficulty adjustment.
//!
//! The next target is a weighted average of the last N targets, scaled by
//! the recency-weighted sum of the last N solvetimes:
//!
//! ```text
//! next = sum(target[i] / (k * N^2)) * max(sum(solvetime[i] * i), N * k / d)
//! ```
//!
//! Each target is divided before it is summed. The truncation this causes
//! is part of consensus, so the order must not change.

use std::collections::HashMap;

use primitive_types::{U256, U512};
use tracing::{debug, trace};

use crate::block::BlockHeader;
use crate::error::RetargetError;
use crate::network::LwmaParams;
use crate::target::{bits_to_target, target_to_bits};

/// Compute the bits expected for `current` from the headers before it.
///
/// `previous` must contain every height in
/// `[current.height - N - 1, current.height - 1]`; order does not matter
/// and extra headers are ignored.
pub fn calc_next_bits<H: AsRef<BlockHeader>>(
    current: &BlockHeader,
    previous: &[H],
    params: &LwmaParams,
) -> Result<u32, RetargetError> {
    check_params(params)?;
    let window = params.averaging_window;

    let required = window as usize + 1;
    if previous.len() < required {
        return Err(RetargetError::InsufficientWindow {
            required,
            available: previous.len(),
        });
    }

    let by_height: HashMap<u32, &BlockHeader> = previous
        .iter()
        .map(|header| {
            let header = header.as_ref();
            (header.height, header)
        })
        .collect();

    let first = window
        .checked_add(1)
        .and_then(|span| current.height.checked_sub(span))
        .ok_or(RetargetError::WindowBeforeGenesis {
            height: current.height,
            window,
        })?;
    if let Some(missing) = (first..current.height).find(|h| !by_height.contains_key(h)) {
        return Err(RetargetError::MissingWindowHeight(missing));
    }

    let prev = by_height[&(current.height - 1)];

    if params.regtest {
        trace!(height = current.height, bits = prev.bits, "regtest keeps previous bits");
        return Ok(prev.bits);
    }

    let gap = i64::from(current.timestamp) - i64::from(prev.timestamp);
    if params.testnet && gap > 2 * i64::from(params.target_spacing) {
        debug!(height = current.height, gap, "minimum difficulty block after long gap");
        return Ok(target_to_bits(&params.pow_limit));
    }

    let next_target = weighted_target(current.height, &by_height, params);
    let bits = target_to_bits(&next_target);
    debug!(height = current.height, bits = format_args!("{:#010x}", bits), "LWMA next bits");
    Ok(bits)
}

fn check_params(params: &LwmaParams) -> Result<(), RetargetError> {
    if params.averaging_window == 0 {
        return Err(RetargetError::InvalidParameter("averaging_window"));
    }
    if params.adjust_weight == 0 {
        return Err(RetargetError::InvalidParameter("adjust_weight"));
    }
    if params.min_denominator == 0 {
        return Err(RetargetError::InvalidParameter("min_denominator"));
    }
    Ok(())
}

/// The window lookup must already be complete for `height`.
fn weighted_target(height: u32, by_height: &HashMap<u32, &BlockHeader>, params: &LwmaParams) -> U256 {
    let n = u64::from(params.averaging_window);
    let divider = U256::from(params.adjust_weight) * U256::from(n * n);
    let max_solvetime = 6 * i128::from(params.target_spacing);

    let mut weighted_time: i128 = 0;
    let mut sum = U256::zero();

    for (j, h) in (height - params.averaging_window..height).enumerate() {
        let block = by_height[&h];
        let prev = by_height[&(h - 1)];

        let mut solvetime = i128::from(block.timestamp) - i128::from(prev.timestamp);
        if params.solve_time_limitation && solvetime > max_solvetime {
            trace!(height = h, solvetime, "solvetime clamped");
            solvetime = max_solvetime;
        }

        weighted_time += solvetime * (j as i128 + 1);
        sum = sum.saturating_add(bits_to_target(block.bits) / divider);
    }

    // Keep t reasonable in case of strange solvetimes.
    let floor = i128::from(n * u64::from(params.adjust_weight) / u64::from(params.min_denominator));
    if weighted_time < floor {
        trace!(weighted_time, floor, "weighted solvetime raised to floor");
        weighted_time = floor;
    }

    // Non-negative after the floor, and well inside u128.
    let product = sum.full_mul(U256::from(weighted_time as u128));
    if product >= U512::from(params.pow_limit) {
        return params.pow_limit;
    }
    U256::try_from(product).unwrap_or(params.pow_limit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::Network;

    const HEIGHT: u32 = 600_000;
    const BASE_TIME: u32 = 1_600_000_000;

    fn mainnet() -> LwmaParams {
        Network::BitcoinGold.profile().lwma.unwrap()
    }

    fn header(height: u32, timestamp: u32, bits: u32) -> BlockHeader {
        BlockHeader::new(height, [0u8; 32], [0u8; 32], timestamp, bits)
    }

    /// 46 headers ending at `HEIGHT - 1` with the given timestamps.
    fn window(bits: u32, timestamps: &[u32]) -> Vec<BlockHeader> {
        assert_eq!(timestamps.len(), 46);
        timestamps
            .iter()
            .enumerate()
            .map(|(k, ts)| header(HEIGHT - 46 + k as u32, *ts, bits))
            .collect()
    }

    fn spaced(spacing: u32) -> Vec<u32> {
        (0..46).map(|k| BASE_TIME + spacing * k).collect()
    }

    fn next_bits(bits: u32, timestamps: &[u32], current_time: u32, params: &LwmaParams) -> u32 {
        let current = header(HEIGHT, current_time, 0);
        calc_next_bits(&current, &window(bits, timestamps), params).unwrap()
    }

    #[test]
    fn test_steady_window() {
        let times = spaced(600);
        let now = BASE_TIME + 600 * 46;
        assert_eq!(next_bits(0x1d00ffff, &times, now, &mainnet()), 0x1d010084);
        assert_eq!(next_bits(0x1b0404cb, &times, now, &mainnet()), 0x1b0406e2);
    }

    #[test]
    fn test_fast_and_slow_blocks() {
        assert_eq!(next_bits(0x1d00ffff, &spaced(300), BASE_TIME + 300 * 46, &mainnet()), 0x1d008042);
        assert_eq!(next_bits(0x1d00ffff, &spaced(1200), BASE_TIME + 1200 * 46, &mainnet()), 0x1d020108);
    }

    #[test]
    fn test_solvetime_limitation() {
        let mut times = spaced(600);
        times[45] = times[44] + 100_000;
        let now = times[45] + 600;

        assert_eq!(next_bits(0x1d00ffff, &times, now, &mainnet()), 0x1d013847);

        let unlimited = LwmaParams { solve_time_limitation: false, ..mainnet() };
        assert_eq!(next_bits(0x1d00ffff, &times, now, &unlimited), 0x1d08382d);
    }

    #[test]
    fn test_weighted_time_floor() {
        let times = vec![BASE_TIME; 46];
        assert_eq!(next_bits(0x1d00ffff, &times, BASE_TIME, &mainnet()), 0x1c19997f);
    }

    #[test]
    fn test_clamped_to_pow_limit() {
        let times = spaced(6000);
        assert_eq!(next_bits(0x1f07ffff, &times, BASE_TIME + 6000 * 46, &mainnet()), 0x1f07ffff);
    }

    #[test]
    fn test_division_before_summation() {
        // 0x12345600 / (13772 * 45^2) truncates to 10 per block; dividing
        // the grand total instead would give 492 and bits 0x0412360c.
        let times = spaced(600);
        assert_eq!(next_bits(0x04123456, &times, BASE_TIME + 600 * 46, &mainnet()), 0x0410a811);
    }

    #[test]
    fn test_testnet_minimum_difficulty() {
        let testnet = Network::BitcoinGoldTestnet.profile().lwma.unwrap();
        let times = spaced(600);

        assert_eq!(next_bits(0x1d00ffff, &times, times[45] + 1201, &testnet), 0x1f07ffff);
        // Exactly two spacings is not a gap.
        assert_eq!(next_bits(0x1d00ffff, &times, times[45] + 1200, &testnet), 0x1d010084);
    }

    #[test]
    fn test_regtest_keeps_previous_bits() {
        let regtest = Network::BitcoinGoldRegtest.profile().lwma.unwrap();
        let mut headers = window(0x207fffff, &spaced(1));
        headers[45].bits = 0x1e0fffff;

        let current = header(HEIGHT, BASE_TIME + 100_000, 0);
        assert_eq!(calc_next_bits(&current, &headers, &regtest), Ok(0x1e0fffff));
    }

    #[test]
    fn test_insufficient_window() {
        let headers = window(0x1d00ffff, &spaced(600));
        let current = header(HEIGHT, BASE_TIME, 0);

        assert_eq!(
            calc_next_bits(&current, &headers[1..], &mainnet()),
            Err(RetargetError::InsufficientWindow { required: 46, available: 45 })
        );
    }

    #[test]
    fn test_missing_window_height() {
        let mut headers = window(0x1d00ffff, &spaced(600));
        // Headers outside the window keep the count at 46.
        headers.remove(10);
        headers.remove(20);
        headers.push(header(HEIGHT - 100, BASE_TIME, 0x1d00ffff));
        headers.push(header(HEIGHT - 101, BASE_TIME, 0x1d00ffff));

        let current = header(HEIGHT, BASE_TIME, 0);
        assert_eq!(
            calc_next_bits(&current, &headers, &mainnet()),
            Err(RetargetError::MissingWindowHeight(HEIGHT - 46 + 10))
        );
    }

    #[test]
    fn test_window_before_genesis() {
        let headers: Vec<BlockHeader> = (0..46).map(|h| header(h, BASE_TIME, 0x1d00ffff)).collect();
        let current = header(45, BASE_TIME, 0);

        assert_eq!(
            calc_next_bits(&current, &headers, &mainnet()),
            Err(RetargetError::WindowBeforeGenesis { height: 45, window: 45 })
        );
    }

    #[test]
    fn test_zero_parameters_rejected() {
        let headers = window(0x1d00ffff, &spaced(600));
        let current = header(HEIGHT, BASE_TIME, 0);
        let params = LwmaParams { min_denominator: 0, ..mainnet() };

        assert_eq!(
            calc_next_bits(&current, &headers, &params),
            Err(RetargetError::InvalidParameter("min_denominator"))
        );
    }

    #[test]
    fn test_order_of_window_does_not_matter() {
        let mut headers = window(0x1d00ffff, &spaced(600));
        headers.reverse();
        let current = header(HEIGHT, BASE_TIME + 600 * 46, 0);

        assert_eq!(calc_next_bits(&current, &headers, &mainnet()), Ok(0x1d010084));
    }
}
