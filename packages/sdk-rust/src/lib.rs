//! Aldrin AMM Rust SDK
//!
//! Offline toolkit for the Aldrin pools, farming and TWAMM programs on
//! Solana. Feed it raw account bytes fetched however you like; it decodes
//! them into typed records, prices swaps on both curve families and works out
//! claimable farming rewards. No RPC client, no signing.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use aldrin_sdk::{
//!     layout::from_bytes,
//!     math::quote_exact_in,
//!     state::{PoolStateV2, TokenAccount},
//!     PoolReserves, Side,
//! };
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let pool: PoolStateV2 = from_bytes(&std::fs::read("pool.bin")?)?;
//!     let base: TokenAccount = from_bytes(&std::fs::read("base_vault.bin")?)?;
//!     let quote: TokenAccount = from_bytes(&std::fs::read("quote_vault.bin")?)?;
//!
//!     // Spend 5 quote tokens (6 decimals) for base tokens.
//!     let reserves = PoolReserves::from_vaults(&pool, &base, &quote)?;
//!     let q = quote_exact_in(&reserves, Side::Bid, 5_000_000)?;
//!     println!("receive {}  (converged: {})", q.amount_out, q.converged);
//!
//!     Ok(())
//! }
//! ```
//!
//! # Feature Overview
//!
//! | Item | Description |
//! |------|-------------|
//! | [`layout`] | Fixed-width binary codec and record declaration macros |
//! | [`state`] | Pool, farming, TWAMM and SPL token account schemas |
//! | [`instructions`] | Instruction data payloads with Anchor sighashes |
//! | [`math::quote_exact_in`] / [`math::quote_exact_out`] | Swap quotes on either curve |
//! | [`math::spot_price`] | Pool price at 1e6 precision |
//! | [`rewards::compute_reward`] | Claimable farming rewards for a ticket |

pub mod layout;

pub mod constants;
pub mod error;
pub mod instructions;
pub mod math;
pub mod rewards;
pub mod state;
pub mod types;

pub use error::{Error, Result};
pub use state::Keyed;
pub use types::*;
