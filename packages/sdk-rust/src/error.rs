//! SDK error type.

/// All errors returned by the Aldrin SDK.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    // ── Layout codec ─────────────────────────────────────────────────────────
    /// Raw bytes could not be decoded (or encoded) against a fixed layout.
    #[error("Layout format error at offset {offset}: {reason}")]
    Format { offset: usize, reason: String },

    /// A layout declaration is inconsistent with the value being encoded.
    #[error("Layout configuration error: {0}")]
    Config(String),

    // ── Curve math ───────────────────────────────────────────────────────────
    /// One side of the pool holds no tokens, so no price exists.
    #[error("Pool reserve is empty; the curve cannot price against a zero reserve")]
    EmptyPool,

    /// Zero input (or zero requested output) passed to a curve.
    #[error("Swap amount must be greater than zero")]
    ZeroAmount,

    /// The requested output would drain the output reserve.
    #[error("Insufficient liquidity: requested {requested}, pool holds {available}")]
    InsufficientLiquidity { requested: u64, available: u64 },

    /// The Newton step of the stable-swap solve has no positive denominator.
    #[error("Degenerate stable-swap state: {0}")]
    Degenerate(&'static str),

    // ── Arithmetic ───────────────────────────────────────────────────────────
    #[error("Result does not fit in a 64-bit token amount")]
    MathOverflow,
}

impl Error {
    pub(crate) fn format(offset: usize, reason: impl Into<String>) -> Self {
        Error::Format { offset, reason: reason.into() }
    }
}

/// Convenience alias so every module can write `Result<T>`.
pub type Result<T> = std::result::Result<T, Error>;
