#![deny(missing_docs)]

//! Off-chain read and withdrawal-routing client for an SPL stake pool
//!
//! The crate reconstructs a pool's accounting model from raw account data
//! (total lamports, share price, fees, per-validator stake) and decides
//! which stake-bearing account a requested withdrawal should split: a
//! validator stake account, a transient stake account, or the shared
//! reserve. It only reads and computes; building and submitting the
//! resulting transaction is the caller's job, and the on-chain program
//! remains the authority on whether the withdrawal actually succeeds.

pub mod client;
pub mod decode;
pub mod error;
pub mod state;
pub mod withdraw;

// Export current sdk types for downstream users building with a different
// sdk version
pub use solana_program;
use {solana_program::pubkey::Pubkey, std::num::NonZeroU32};

/// Seed for the transient stake account
const TRANSIENT_STAKE_SEED_PREFIX: &[u8] = b"transient";

/// Minimum amount of staked lamports required in a validator stake account
/// to allow for merges without a mismatch on credits observed
pub const MINIMUM_ACTIVE_STAKE: u64 = 1_000_000;

/// Get the minimum delegation required by a stake account in a stake pool
#[inline]
pub fn minimum_delegation(stake_program_minimum_delegation: u64) -> u64 {
    std::cmp::max(stake_program_minimum_delegation, MINIMUM_ACTIVE_STAKE)
}

/// Lamports a pool stake account must keep: the minimum delegation plus the
/// rent-exemption minimum.
///
/// Both inputs are chain state and move between epochs; recompute this per
/// resolution from freshly fetched values, never from a hard-coded figure.
#[inline]
pub fn minimum_stake_account_balance(
    stake_program_minimum_delegation: u64,
    rent_exemption_minimum: u64,
) -> u64 {
    minimum_delegation(stake_program_minimum_delegation).saturating_add(rent_exemption_minimum)
}

/// Generates the stake program address for a validator's vote account
pub fn find_stake_program_address(
    program_id: &Pubkey,
    vote_account_address: &Pubkey,
    stake_pool_address: &Pubkey,
    seed: Option<NonZeroU32>,
) -> (Pubkey, u8) {
    let seed = seed.map(|s| s.get().to_le_bytes());
    Pubkey::find_program_address(
        &[
            vote_account_address.as_ref(),
            stake_pool_address.as_ref(),
            seed.as_ref().map(|s| s.as_slice()).unwrap_or(&[]),
        ],
        program_id,
    )
}

/// Generates the transient stake program address for a validator's vote
/// account
pub fn find_transient_stake_program_address(
    program_id: &Pubkey,
    vote_account_address: &Pubkey,
    stake_pool_address: &Pubkey,
    seed: u64,
) -> (Pubkey, u8) {
    Pubkey::find_program_address(
        &[
            TRANSIENT_STAKE_SEED_PREFIX,
            vote_account_address.as_ref(),
            stake_pool_address.as_ref(),
            &seed.to_le_bytes(),
        ],
        program_id,
    )
}

solana_program::declare_id!("SPoo1Ku8WFXoNDMHPsrGSTSG1Y47rzgn41SLUNakuHy");
