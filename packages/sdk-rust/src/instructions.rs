//! Instruction data payloads.
//!
//! Each payload is the raw `data` of an Aldrin program instruction: the
//! 8-byte Anchor sighash followed by the instruction arguments. Account metas
//! and signing are left to the caller.
//!
//! Anchor instruction discriminators: `sha256("global:{name}")[..8]`.

use solana_sdk::hash::hash;

use crate::error::Result;
use crate::layout::{to_bytes, Layout};
use crate::types::Side;

/// First 8 bytes of `sha256("global:{name}")`.
pub fn sighash(name: &str) -> [u8; 8] {
    let h = hash(format!("global:{name}").as_bytes());
    let mut d = [0u8; 8];
    d.copy_from_slice(&h.to_bytes()[..8]);
    d
}

/// An instruction payload with a fixed Anchor method name.
pub trait InstructionData: Layout {
    const METHOD: &'static str;

    fn discriminator() -> [u8; 8] {
        sighash(Self::METHOD)
    }

    fn data(&self) -> Result<Vec<u8>> {
        to_bytes(self)
    }
}

macro_rules! instruction_data {
    ($name:ident => $method:literal) => {
        impl InstructionData for $name {
            const METHOD: &'static str = $method;
        }
    };
}

// ─── Pools ────────────────────────────────────────────────────────────────────

crate::layout_struct! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SwapInstruction {
        pub instruction: [u8; 8],
        pub tokens:      u64,
        /// Minimum output accepted; the program rejects the swap below it.
        pub min_tokens:  u64,
        pub side:        Side,
    }
}
instruction_data!(SwapInstruction => "swap");

impl SwapInstruction {
    pub fn new(tokens: u64, min_tokens: u64, side: Side) -> Self {
        Self { instruction: Self::discriminator(), tokens, min_tokens, side }
    }
}

crate::layout_struct! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct DepositLiquidityInstruction {
        pub instruction:            [u8; 8],
        /// Pool tokens to mint.
        pub creation_size:          u64,
        pub max_base_token_amount:  u64,
        pub max_quote_token_amount: u64,
    }
}
instruction_data!(DepositLiquidityInstruction => "create_basket");

impl DepositLiquidityInstruction {
    pub fn new(creation_size: u64, max_base_token_amount: u64, max_quote_token_amount: u64) -> Self {
        Self {
            instruction: Self::discriminator(),
            creation_size,
            max_base_token_amount,
            max_quote_token_amount,
        }
    }
}

crate::layout_struct! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct WithdrawLiquidityInstruction {
        pub instruction:              [u8; 8],
        /// Pool tokens to burn.
        pub redemption_size:          u64,
        pub base_token_returned_min:  u64,
        pub quote_token_returned_min: u64,
    }
}
instruction_data!(WithdrawLiquidityInstruction => "redeem_basket");

impl WithdrawLiquidityInstruction {
    pub fn new(redemption_size: u64, base_token_returned_min: u64, quote_token_returned_min: u64) -> Self {
        Self {
            instruction: Self::discriminator(),
            redemption_size,
            base_token_returned_min,
            quote_token_returned_min,
        }
    }
}

// ─── Farming ──────────────────────────────────────────────────────────────────

crate::layout_struct! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct StartFarmingInstruction {
        pub instruction:       [u8; 8],
        pub pool_token_amount: u64,
    }
}
instruction_data!(StartFarmingInstruction => "start_farming");

impl StartFarmingInstruction {
    pub fn new(pool_token_amount: u64) -> Self {
        Self { instruction: Self::discriminator(), pool_token_amount }
    }
}

crate::layout_struct! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct EndFarmingInstruction {
        pub instruction: [u8; 8],
    }
}
instruction_data!(EndFarmingInstruction => "end_farming");

crate::layout_struct! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct WithdrawFarmedInstruction {
        pub instruction: [u8; 8],
    }
}
instruction_data!(WithdrawFarmedInstruction => "withdraw_farmed");

// ─── TWAMM ────────────────────────────────────────────────────────────────────

crate::layout_struct! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct GetAvailableTokensInstruction {
        pub instruction: [u8; 8],
    }
}
instruction_data!(GetAvailableTokensInstruction => "get_available_tokens_for_sale");

crate::layout_struct! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ExecuteSwapInstruction {
        pub instruction: [u8; 8],
    }
}
instruction_data!(ExecuteSwapInstruction => "execute_swap_token");

macro_rules! no_argument_constructor {
    ($($name:ident),*) => {$(
        impl $name {
            pub fn new() -> Self {
                Self { instruction: Self::discriminator() }
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }
    )*};
}

no_argument_constructor!(
    EndFarmingInstruction,
    WithdrawFarmedInstruction,
    GetAvailableTokensInstruction,
    ExecuteSwapInstruction
);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::Schema;

    #[test]
    fn sighash_is_sha256_prefix() {
        let full = hash(b"global:swap").to_bytes();
        assert_eq!(sighash("swap"), full[..8]);
        assert_ne!(sighash("swap"), sighash("create_basket"));
    }

    #[test]
    fn swap_payload_layout() {
        let data = SwapInstruction::new(5_000, 4_900, Side::Ask).data().unwrap();
        assert_eq!(data.len(), 25);
        assert_eq!(data[..8], sighash("swap"));
        assert_eq!(u64::from_le_bytes(data[8..16].try_into().unwrap()), 5_000);
        assert_eq!(u64::from_le_bytes(data[16..24].try_into().unwrap()), 4_900);
        assert_eq!(data[24], 1);
        assert_eq!(SwapInstruction::offset_of("side"), Some(24));
    }

    #[test]
    fn liquidity_payloads_are_32_bytes() {
        let deposit = DepositLiquidityInstruction::new(1, 2, 3).data().unwrap();
        let withdraw = WithdrawLiquidityInstruction::new(1, 2, 3).data().unwrap();
        assert_eq!(deposit.len(), 32);
        assert_eq!(withdraw.len(), 32);
        assert_eq!(deposit[..8], sighash("create_basket"));
        assert_eq!(withdraw[..8], sighash("redeem_basket"));
        assert_eq!(deposit[8..], withdraw[8..]);
    }

    #[test]
    fn farming_payloads() {
        let start = StartFarmingInstruction::new(77).data().unwrap();
        assert_eq!(start.len(), 16);
        assert_eq!(start[8..], 77u64.to_le_bytes());

        assert_eq!(EndFarmingInstruction::new().data().unwrap(), sighash("end_farming"));
        assert_eq!(WithdrawFarmedInstruction::default().data().unwrap(), sighash("withdraw_farmed"));
    }
}
