//! Protocol constants shared by the calculators and the CLI.

use solana_sdk::pubkey::Pubkey;
use std::str::FromStr;

use crate::error::{Error, Result};

// ─── Program IDs ──────────────────────────────────────────────────────────────

pub const POOLS_PROGRAM_ADDRESS:    &str = "AMM55ShdkoGRB5jVYPjWziwk8m5MpwyDgsMWHaMSQWH6";
pub const POOLS_V2_PROGRAM_ADDRESS: &str = "RinFPaym3xbnndu4SfQPAt1NzQWTfqL34cvf9eafakk";

/// Legacy (constant-product only) pools program.
pub fn pools_program_id() -> Result<Pubkey> {
    parse_address(POOLS_PROGRAM_ADDRESS)
}

/// Pools program supporting both curve kinds.
pub fn pools_v2_program_id() -> Result<Pubkey> {
    parse_address(POOLS_V2_PROGRAM_ADDRESS)
}

fn parse_address(address: &str) -> Result<Pubkey> {
    Pubkey::from_str(address).map_err(|e| Error::Config(format!("invalid program address {address}: {e}")))
}

// ─── Stable-swap curve ────────────────────────────────────────────────────────

/// Amplification coefficient of every stable pool.
pub const AMP: u64 = 85;
pub const N_COINS: u64 = 2;
/// `AMP * N_COINS^N_COINS`.
pub const LEVERAGE: u64 = AMP * N_COINS * N_COINS;
pub const MAX_NEWTON_ITERATIONS: u32 = 32;
/// Two successive Newton iterates closer than this are considered equal.
pub const NEWTON_TOLERANCE: u64 = 1;

// ─── Pricing ──────────────────────────────────────────────────────────────────

pub const PRICE_PRECISION: u64 = 1_000_000;

// ─── Farming ──────────────────────────────────────────────────────────────────

/// Capacity of the snapshot ring read by the reward engine.
pub const SNAPSHOT_QUEUE_CAPACITY: usize = 1000;
/// Capacity of the legacy pools-program `Snapshots` account.
pub const LEGACY_SNAPSHOT_QUEUE_CAPACITY: usize = 1500;
/// One third of every period reward is released immediately.
pub const PRE_VESTING_DENOMINATOR: u64 = 3;
/// `end_time` of a ticket that is still staked.
pub const DEFAULT_FARMING_TICKET_END_TIME: i64 = i64::MAX;
pub const MAX_FARMING_STATES_PER_TICKET: usize = 10;

// ─── TWAMM ────────────────────────────────────────────────────────────────────

pub const TWAMM_ORDERS_PER_ARRAY: usize = 30;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn program_ids_parse() {
        assert_eq!(pools_program_id().unwrap().to_string(), POOLS_PROGRAM_ADDRESS);
        assert_eq!(pools_v2_program_id().unwrap().to_string(), POOLS_V2_PROGRAM_ADDRESS);
    }

    #[test]
    fn leverage_is_amp_times_n_squared() {
        assert_eq!(LEVERAGE, 340);
    }
}
