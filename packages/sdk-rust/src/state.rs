//! On-chain account schemas.
//!
//! Each record is declared field by field in wire order; spans and offsets
//! are derived by [`layout_struct!`](crate::layout_struct). Anchor accounts
//! start with an 8-byte discriminator kept as [`Padding<8>`] so a decoded
//! account re-encodes to the same bytes. SPL token accounts carry no
//! discriminator.

use solana_sdk::{hash::hash, pubkey::Pubkey};

use crate::constants::{
    DEFAULT_FARMING_TICKET_END_TIME, LEGACY_SNAPSHOT_QUEUE_CAPACITY, MAX_FARMING_STATES_PER_TICKET,
    SNAPSHOT_QUEUE_CAPACITY, TWAMM_ORDERS_PER_ARRAY,
};
use crate::error::{Error, Result};
use crate::layout::{check_span, Field, Layout, Padding, Schema};
use crate::types::{CurveKind, Side};

// ─── Account addressing ───────────────────────────────────────────────────────

/// A decoded account together with the address it was read from.
#[derive(Debug, Clone, PartialEq)]
pub struct Keyed<T> {
    pub address: Pubkey,
    pub account: T,
}

impl<T: Layout> Keyed<T> {
    pub fn new(address: Pubkey, account: T) -> Self {
        Self { address, account }
    }

    /// Decode `data` as a `T` living at `address`.
    pub fn decode(address: Pubkey, data: &[u8]) -> Result<Self> {
        Ok(Self { address, account: T::decode(data, 0)? })
    }
}

/// Anchor account discriminator: `sha256("account:{TypeName}")[..8]`.
pub fn account_discriminator(type_name: &str) -> [u8; 8] {
    let h = hash(format!("account:{type_name}").as_bytes());
    let mut d = [0u8; 8];
    d.copy_from_slice(&h.to_bytes()[..8]);
    d
}

/// Decode an Anchor account after checking its discriminator.
pub fn decode_anchor_account<T: Layout>(data: &[u8], type_name: &str) -> Result<T> {
    check_span(data.len(), 0, 8, type_name)?;
    if data[..8] != account_discriminator(type_name) {
        return Err(Error::format(0, format!("account discriminator does not match {type_name}")));
    }
    T::decode(data, 0)
}

// ─── Pools ────────────────────────────────────────────────────────────────────

crate::layout_struct! {
    /// Fee fractions of a pool. Every fee is `amount * numerator / denominator`.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
    pub struct Fees {
        pub trade_fee_numerator:            u64,
        pub trade_fee_denominator:          u64,
        pub owner_trade_fee_numerator:      u64,
        pub owner_trade_fee_denominator:    u64,
        pub owner_withdraw_fee_numerator:   u64,
        pub owner_withdraw_fee_denominator: u64,
    }
}

impl Fees {
    /// LP trade fee on `amount`, rounded down. Zero when no denominator is set.
    pub fn trade_fee(&self, amount: u64) -> u64 {
        fraction(amount, self.trade_fee_numerator, self.trade_fee_denominator)
    }

    /// Protocol-owner trade fee on `amount`, rounded down.
    pub fn owner_trade_fee(&self, amount: u64) -> u64 {
        fraction(amount, self.owner_trade_fee_numerator, self.owner_trade_fee_denominator)
    }

    /// Owner fee charged on LP token redemption, rounded down.
    pub fn owner_withdraw_fee(&self, amount: u64) -> u64 {
        fraction(amount, self.owner_withdraw_fee_numerator, self.owner_withdraw_fee_denominator)
    }
}

fn fraction(amount: u64, numerator: u64, denominator: u64) -> u64 {
    if denominator == 0 {
        return 0;
    }
    let fee = amount as u128 * numerator as u128 / denominator as u128;
    u64::try_from(fee).unwrap_or(u64::MAX)
}

crate::layout_struct! {
    /// Pool account of the legacy (constant-product only) pools program.
    ///
    /// ```text
    /// padding(8)  lp_token_freeze_vault(32)  pool_mint(32)
    /// base_token_vault(32)  base_token_mint(32)  quote_token_vault(32)
    /// quote_token_mint(32)  pool_signer(32)  pool_signer_nonce(1)
    /// authority(32)  initializer_account(32)  fee_base_account(32)
    /// fee_quote_account(32)  fee_pool_token_account(32)  fees(48)  = 441 bytes
    /// ```
    #[derive(Debug, Clone, PartialEq)]
    pub struct PoolState {
        pub discriminator:          Padding<8>,
        pub lp_token_freeze_vault:  Pubkey,
        pub pool_mint:              Pubkey,
        pub base_token_vault:       Pubkey,
        pub base_token_mint:        Pubkey,
        pub quote_token_vault:      Pubkey,
        pub quote_token_mint:       Pubkey,
        pub pool_signer:            Pubkey,
        pub pool_signer_nonce:      u8,
        pub authority:              Pubkey,
        pub initializer_account:    Pubkey,
        pub fee_base_account:       Pubkey,
        pub fee_quote_account:      Pubkey,
        pub fee_pool_token_account: Pubkey,
        pub fees:                   Fees,
    }
}

impl PoolState {
    /// Ensure two token accounts are this pool's base and quote vaults.
    pub fn check_vaults(&self, base_vault: &TokenAccount, quote_vault: &TokenAccount) -> Result<()> {
        if base_vault.mint != self.base_token_mint {
            return Err(Error::Config(format!(
                "base vault holds {}, pool base mint is {}",
                base_vault.mint, self.base_token_mint
            )));
        }
        if quote_vault.mint != self.quote_token_mint {
            return Err(Error::Config(format!(
                "quote vault holds {}, pool quote mint is {}",
                quote_vault.mint, self.quote_token_mint
            )));
        }
        Ok(())
    }
}

crate::layout_struct! {
    /// Pool account of the v2 pools program: the legacy fields followed by
    /// the curve selector and the curve account.
    #[derive(Debug, Clone, PartialEq)]
    pub struct PoolStateV2 {
        pub common:     PoolState,
        pub curve_type: CurveKind,
        pub curve:      Pubkey,
    }
}

impl std::ops::Deref for PoolStateV2 {
    type Target = PoolState;

    fn deref(&self) -> &PoolState {
        &self.common
    }
}

// ─── Farming ──────────────────────────────────────────────────────────────────

crate::layout_struct! {
    /// Emission schedule of one reward token for a pool's stakers.
    #[derive(Debug, Clone, PartialEq)]
    pub struct FarmingState {
        pub discriminator:       Padding<8>,
        pub tokens_unlocked:     u64,
        pub tokens_per_period:   u64,
        pub tokens_total:        u64,
        pub period_length:       i64,
        /// Seconds after `start_time` during which nothing can be withdrawn.
        pub no_withdrawal_time:  i64,
        pub vesting_type:        u8,
        pub vesting_period:      i64,
        pub start_time:          i64,
        /// Time of the latest snapshot taken for this state.
        pub current_time:        i64,
        pub pool:                Pubkey,
        pub farming_token_vault: Pubkey,
        pub farming_snapshots:   Pubkey,
    }
}

crate::layout_struct! {
    /// Withdrawal checkpoints of a ticket against one farming state.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
    pub struct AttachedFarmingState {
        pub farming_state:             Pubkey,
        pub last_withdraw_time:        i64,
        pub last_vested_withdraw_time: i64,
    }
}

crate::layout_struct! {
    /// A user's stake of pool tokens. The staking program writes the same
    /// layout for its tickets.
    #[derive(Debug, Clone, PartialEq)]
    pub struct FarmingTicket {
        pub discriminator:   Padding<8>,
        pub tokens_frozen:   u64,
        pub start_time:      i64,
        /// `i64::MAX` while the stake is still open.
        pub end_time:        i64,
        pub user_key:        Pubkey,
        pub pool:            Pubkey,
        pub next_attached:   u64,
        pub states_attached: [AttachedFarmingState; MAX_FARMING_STATES_PER_TICKET],
    }
}

impl FarmingTicket {
    pub fn is_open(&self) -> bool {
        self.end_time == DEFAULT_FARMING_TICKET_END_TIME
    }

    /// Unstake time, or `None` while the ticket is open.
    pub fn closed_at(&self) -> Option<i64> {
        (!self.is_open()).then_some(self.end_time)
    }

    /// Checkpoints recorded against `farming_state`, if any.
    pub fn attached(&self, farming_state: &Pubkey) -> Option<&AttachedFarmingState> {
        self.states_attached
            .iter()
            .find(|s| s.farming_state == *farming_state)
    }
}

crate::layout_struct! {
    /// Intermediate account accumulating a pending farmed amount.
    #[derive(Debug, Clone, PartialEq)]
    pub struct FarmingCalc {
        pub discriminator: Padding<8>,
        pub farming_state: Pubkey,
        pub user_key:      Pubkey,
        pub initializer:   Pubkey,
        pub token_amount:  u64,
    }
}

// ─── Snapshot ring ────────────────────────────────────────────────────────────

crate::layout_struct! {
    /// Total staked amount recorded at one point in time.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
    pub struct FarmingSnapshot {
        pub is_initialized: bool,
        /// Pool tokens staked across all tickets when the snapshot was taken.
        pub tokens_frozen:  u64,
        pub farming_tokens: u64,
        pub time:           i64,
    }
}

/// Fixed-capacity circular buffer of farming snapshots.
///
/// `next_index` is the write cursor; once the buffer has wrapped, the slot it
/// points at holds the oldest snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotQueue<const N: usize = SNAPSHOT_QUEUE_CAPACITY> {
    pub discriminator: Padding<8>,
    pub next_index:    u64,
    pub snapshots:     [FarmingSnapshot; N],
}

/// Snapshot queue as written by the legacy pools program.
pub type FarmingSnapshotQueue = SnapshotQueue<LEGACY_SNAPSHOT_QUEUE_CAPACITY>;

impl<const N: usize> SnapshotQueue<N> {
    pub const CAPACITY: usize = N;

    /// Slot the next snapshot will be written to; always in `[0, N)`.
    pub fn cursor(&self) -> usize {
        if N == 0 {
            return 0;
        }
        (self.next_index % N as u64) as usize
    }

    /// Initialized snapshots from oldest to newest.
    pub fn chronological(&self) -> impl Iterator<Item = &FarmingSnapshot> + '_ {
        let (newer, older) = self.snapshots.split_at(self.cursor());
        older.iter().chain(newer).filter(|s| s.is_initialized)
    }

    pub fn latest(&self) -> Option<&FarmingSnapshot> {
        self.chronological().last()
    }
}

impl<const N: usize> Layout for SnapshotQueue<N> {
    const SPAN: usize = 8 + 8 + FarmingSnapshot::SPAN * N;

    fn decode(data: &[u8], offset: usize) -> Result<Self> {
        check_span(data.len(), offset, Self::SPAN, "SnapshotQueue")?;
        Ok(Self {
            discriminator: Padding::decode(data, offset)?,
            next_index:    u64::decode(data, offset + 8)?,
            snapshots:     <[FarmingSnapshot; N]>::decode(data, offset + 16)?,
        })
    }

    fn encode(&self, data: &mut [u8], offset: usize) -> Result<usize> {
        check_span(data.len(), offset, Self::SPAN, "SnapshotQueue")?;
        let mut written = self.discriminator.encode(data, offset)?;
        written += self.next_index.encode(data, offset + written)?;
        written += self.snapshots.encode(data, offset + written)?;
        Ok(written)
    }
}

impl<const N: usize> Schema for SnapshotQueue<N> {
    const FIELDS: &'static [Field] = &[
        Field { name: "discriminator", span: 8 },
        Field { name: "next_index", span: 8 },
        Field { name: "snapshots", span: FarmingSnapshot::SPAN * N },
    ];
}

// ─── TWAMM ────────────────────────────────────────────────────────────────────

crate::layout_struct! {
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
    pub struct TwammOrder {
        pub is_initialized:      bool,
        pub amount:              u64,
        pub start_time:          i64,
        pub end_time:            i64,
        pub time_horizon:        i64,
        pub average_transaction: u64,
        pub amount_filled:       u64,
        pub amount_to_fill:      u64,
        pub steps_filled:        u64,
        pub steps_to_fill:       u64,
        pub tokens_swapped:      u64,
        pub authority:           Pubkey,
    }
}

impl TwammOrder {
    /// Tokens still waiting to be filled.
    pub fn remaining(&self) -> u64 {
        self.amount_to_fill.saturating_sub(self.amount_filled)
    }
}

crate::layout_struct! {
    /// One side's book of time-weighted orders for a pair.
    #[derive(Debug, Clone, PartialEq)]
    pub struct OrderArray {
        pub discriminator:          Padding<8>,
        pub twamm_from_token_vault: Pubkey,
        pub twamm_to_token_vault:   Pubkey,
        pub signer:                 Pubkey,
        pub signer_nonce:           u8,
        pub fee_account:            Pubkey,
        pub pair_settings:          Pubkey,
        pub side:                   Side,
        pub orders:                 [TwammOrder; TWAMM_ORDERS_PER_ARRAY],
    }
}

impl OrderArray {
    pub fn active_orders(&self) -> impl Iterator<Item = &TwammOrder> + '_ {
        self.orders.iter().filter(|o| o.is_initialized)
    }
}

crate::layout_struct! {
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
    pub struct TwammFees {
        pub placing_fee_numerator:      u64,
        pub placing_fee_denominator:    u64,
        pub cancelling_fee_numerator:   u64,
        pub cancelling_fee_denominator: u64,
    }
}

crate::layout_struct! {
    #[derive(Debug, Clone, PartialEq)]
    pub struct PairSettings {
        pub discriminator:           Padding<8>,
        pub base_token_mint:         Pubkey,
        pub quote_token_mint:        Pubkey,
        pub authority:               Pubkey,
        pub base_token_fee_account:  Pubkey,
        pub quote_token_fee_account: Pubkey,
        pub initializer_account:     Pubkey,
        pub pyth:                    Pubkey,
        pub discount_numerator:      u64,
        pub discount_denominator:    u64,
        pub fees:                    TwammFees,
        pub minimum_tokens:          u64,
        pub base_mint_decimals:      u8,
        pub quote_mint_decimals:     u8,
    }
}

crate::layout_struct! {
    /// Return data of `get_available_tokens_for_sale`.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
    pub struct AvailableTokens {
        pub length:      u32,
        pub amount_to:   i64,
        pub amount_from: i64,
    }
}

// ─── SPL token ────────────────────────────────────────────────────────────────

crate::layout_struct! {
    /// Packed SPL token account (165 bytes).
    #[derive(Debug, Clone, PartialEq)]
    pub struct TokenAccount {
        pub mint:                   Pubkey,
        pub owner:                  Pubkey,
        pub amount:                 u64,
        pub delegate_option:        u32,
        pub delegate:               Pubkey,
        pub state:                  u8,
        pub is_native_option:       u32,
        pub is_native:              u64,
        pub delegated_amount:       u64,
        pub close_authority_option: u32,
        pub close_authority:        Pubkey,
    }
}

crate::layout_struct! {
    /// Packed SPL mint (82 bytes).
    #[derive(Debug, Clone, PartialEq)]
    pub struct Mint {
        pub mint_authority_option:   u32,
        pub mint_authority:          Pubkey,
        pub supply:                  u64,
        pub decimals:                u8,
        pub is_initialized:          bool,
        pub freeze_authority_option: u32,
        pub freeze_authority:        Pubkey,
    }
}

/// Read only the `amount` field of a packed SPL token account.
pub fn parse_token_amount(data: &[u8]) -> Result<u64> {
    let offset = TokenAccount::offset_of("amount").unwrap_or(64);
    u64::decode(data, offset)
}
