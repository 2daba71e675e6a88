//! Public input and result types shared by the calculators.

use serde::Serialize;

use crate::error::Result;
use crate::state::{PoolStateV2, TokenAccount};

// ─── Tagged variants ──────────────────────────────────────────────────────────

crate::tagged_variant! {
    /// Trade direction against a pool.
    ///
    /// `Bid` spends quote tokens to receive base tokens; `Ask` spends base
    /// tokens to receive quote tokens.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
    #[serde(rename_all = "lowercase")]
    pub enum Side {
        Bid = 0,
        Ask = 1,
    }
}

crate::tagged_variant! {
    /// Pricing curve of a pool.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
    #[serde(rename_all = "snake_case")]
    pub enum CurveKind {
        ConstantProduct = 0,
        StableSwap = 1,
    }
}

// ─── Pool reserves ────────────────────────────────────────────────────────────

/// Token balances of a pool's two vaults plus the curve that prices them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PoolReserves {
    pub base_reserve:  u64,
    pub quote_reserve: u64,
    pub curve:         CurveKind,
}

impl PoolReserves {
    pub fn new(base_reserve: u64, quote_reserve: u64, curve: CurveKind) -> Self {
        Self { base_reserve, quote_reserve, curve }
    }

    /// Build reserves from a decoded v2 pool and its two vault accounts.
    pub fn from_vaults(
        pool:        &PoolStateV2,
        base_vault:  &TokenAccount,
        quote_vault: &TokenAccount,
    ) -> Result<Self> {
        pool.check_vaults(base_vault, quote_vault)?;
        Ok(Self::new(base_vault.amount, quote_vault.amount, pool.curve_type))
    }

    /// `(reserve_in, reserve_out)` for a trade on `side`.
    pub fn directional(&self, side: Side) -> (u64, u64) {
        match side {
            Side::Bid => (self.quote_reserve, self.base_reserve),
            Side::Ask => (self.base_reserve, self.quote_reserve),
        }
    }
}

// ─── Results ──────────────────────────────────────────────────────────────────

/// Outcome of a swap quote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SwapQuote {
    pub side:       Side,
    pub curve:      CurveKind,
    /// Tokens spent (given for exact-in, computed for exact-out).
    pub amount_in:  u64,
    /// Tokens received (computed for exact-in, given for exact-out).
    pub amount_out: u64,
    /// False when a stable-swap Newton solve hit its iteration cap; the
    /// amounts are then best-effort.
    pub converged:  bool,
}

/// Claimable farming rewards for one ticket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RewardSummary {
    /// `immediate_tokens + vested_tokens`.
    pub unclaimed_tokens:    u64,
    /// Snapshots contributing at least one tranche.
    pub unclaimed_snapshots: u64,
    /// Pre-vesting share of snapshots after the last withdrawal.
    pub immediate_tokens:    u64,
    /// Deferred share of snapshots whose vesting period has elapsed.
    pub vested_tokens:       u64,
}

impl RewardSummary {
    pub(crate) fn merge(self, other: Self) -> Self {
        Self {
            unclaimed_tokens:    self.unclaimed_tokens.saturating_add(other.unclaimed_tokens),
            unclaimed_snapshots: self.unclaimed_snapshots.saturating_add(other.unclaimed_snapshots),
            immediate_tokens:    self.immediate_tokens.saturating_add(other.immediate_tokens),
            vested_tokens:       self.vested_tokens.saturating_add(other.vested_tokens),
        }
    }
}
