//! Error types

use {solana_program::pubkey::Pubkey, thiserror::Error};

/// Errors returned by the off-chain stake pool client.
///
/// `TruncatedData` indicates a corrupt or partial fetch and is not
/// retryable. The withdrawal-routing variants are expected outcomes the
/// caller acts on, not defects; the crate itself never retries or logs.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum StakePoolClientError {
    /// Account data ended before the requested record could be fully read.
    #[error("account data is shorter than the expected record layout")]
    TruncatedData,

    /// Stake status tag outside the on-chain program's enumeration.
    #[error("unrecognized stake status tag {0}")]
    UnknownStakeStatus(u8),

    /// The pool has no outstanding pool tokens, so no share price exists.
    #[error("pool token supply is zero, share price is undefined")]
    EmptyPool,

    /// Checked arithmetic overflowed or divided by zero.
    #[error("calculation failure")]
    CalculationFailure,

    /// The requested amount is too small to leave the minimum balance on
    /// the split stake account once the withdrawal fee is taken.
    #[error("requested withdrawal of {requested} lamports is below the minimum of {minimum} lamports")]
    BelowMinimumWithdrawal {
        /// Gross lamports the caller asked to withdraw.
        requested: u64,
        /// Smallest gross amount the pool will currently honor.
        minimum: u64,
    },

    /// Other validators still hold excess active stake; the pool requires
    /// those to be drained before transient or reserve stake is touched.
    #[error("validators still hold excess active stake, withdraw from them first")]
    MustDrainActiveStakeFirst(Vec<Pubkey>),

    /// Other validators still hold excess transient stake.
    #[error("validators still hold excess transient stake, withdraw from them first")]
    MustDrainTransientStakeFirst(Vec<Pubkey>),

    /// No funding account can satisfy the request; only reachable with
    /// inconsistent input such as a zero-lamport request.
    #[error("no eligible withdrawal source")]
    NoEligibleSource,
}
