//! Withdrawal source resolution
//!
//! Given a freshly fetched pool snapshot, picks the one stake-bearing
//! account a `WithdrawStake` instruction should split. The pool's policy is
//! to unwind the validator the caller is already interacting with, but to
//! never drain the communal reserve, or anyone's transient stake, while any
//! validator still holds easily withdrawable active stake; doing so would
//! add latency for other users' withdrawals and churn validators for no
//! reason.
//!
//! The resolver is pure and advisory. It must run against one logically
//! consistent set of fetched inputs (snapshot, list, minimum balance);
//! mixing a stale minimum balance with a fresh validator entry can pick an
//! account that no longer has excess. The authoritative check happens on
//! chain when the transaction lands.

use {
    crate::{
        error::StakePoolClientError,
        find_stake_program_address, find_transient_stake_program_address,
        state::{checked_ceil_div, Fee, StakePool, ValidatorList},
    },
    solana_program::pubkey::Pubkey,
    std::num::NonZeroU32,
};

/// The account a withdrawal should split, with each branch's supporting
/// data attached.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WithdrawSource {
    /// The requested validator's stake account covers the full amount.
    ValidatorStake {
        /// Stake account to split
        stake_account: Pubkey,
        /// Vote account the stake is delegated to
        vote_account: Pubkey,
    },
    /// The requested validator's stake account holds some excess but not
    /// enough; it must still be drained before the pool looks elsewhere.
    /// The caller is expected to shrink the request or split it up.
    PartialValidatorStake {
        /// Stake account to split
        stake_account: Pubkey,
        /// Vote account the stake is delegated to
        vote_account: Pubkey,
        /// Net lamports this account can still give up
        available_lamports: u64,
        /// Pool tokens that would drain `available_lamports`, fee included
        max_pool_tokens: u64,
    },
    /// The requested validator's transient stake account; only reachable
    /// once every validator's active stake sits at the floor.
    TransientStake {
        /// Transient stake account to split
        stake_account: Pubkey,
        /// Vote account the stake is moving to or from
        vote_account: Pubkey,
    },
    /// The shared reserve; only reachable once every active and transient
    /// stake sits at the floor.
    Reserve {
        /// The pool's reserve stake account
        stake_account: Pubkey,
    },
}

/// Smallest gross withdrawal that still leaves `minimum_balance` on the
/// split account after `fee` is taken: `ceil(minimum_balance * denominator
/// / (denominator - numerator))`.
///
/// Ceiling division makes this an upper estimate of the chain's own
/// truncating arithmetic; callers treat the boundary fail-closed and reject
/// anything strictly below it.
pub fn minimum_withdrawal_before_fees(
    minimum_balance: u64,
    fee: &Fee,
) -> Result<u64, StakePoolClientError> {
    if fee.is_zero() {
        return Ok(minimum_balance);
    }
    if fee.numerator >= fee.denominator {
        // a 100% fee can never leave a residual
        return Err(StakePoolClientError::CalculationFailure);
    }
    let gross = checked_ceil_div(
        (minimum_balance as u128)
            .checked_mul(fee.denominator as u128)
            .ok_or(StakePoolClientError::CalculationFailure)?,
        (fee.denominator - fee.numerator) as u128,
    )
    .ok_or(StakePoolClientError::CalculationFailure)?;
    u64::try_from(gross).map_err(|_| StakePoolClientError::CalculationFailure)
}

/// Select the funding account for a withdrawal of `withdraw_lamports`
/// (already converted from pool tokens at the current share price) routed
/// at `vote_account_address`.
///
/// `minimum_balance` comes from
/// [`crate::minimum_stake_account_balance`] and must be fetched in the
/// same pass as the snapshot and list.
pub fn find_withdraw_source(
    program_id: &Pubkey,
    stake_pool_address: &Pubkey,
    stake_pool: &StakePool,
    validator_list: &ValidatorList,
    vote_account_address: &Pubkey,
    withdraw_lamports: u64,
    minimum_balance: u64,
) -> Result<WithdrawSource, StakePoolClientError> {
    if withdraw_lamports == 0 {
        return Err(StakePoolClientError::NoEligibleSource);
    }

    let minimum_withdrawal =
        minimum_withdrawal_before_fees(minimum_balance, &stake_pool.stake_withdrawal_fee)?;
    if withdraw_lamports < minimum_withdrawal {
        return Err(StakePoolClientError::BelowMinimumWithdrawal {
            requested: withdraw_lamports,
            minimum: minimum_withdrawal,
        });
    }

    let preferred = validator_list.find(vote_account_address);

    if let Some(entry) = preferred {
        let (stake_account, _) = find_stake_program_address(
            program_id,
            vote_account_address,
            stake_pool_address,
            NonZeroU32::new(entry.validator_seed_suffix),
        );
        let excess = entry.active_stake_lamports.saturating_sub(minimum_balance);
        if excess >= withdraw_lamports {
            return Ok(WithdrawSource::ValidatorStake {
                stake_account,
                vote_account: *vote_account_address,
            });
        }
        if excess > 0 {
            // gross the excess up by the withdrawal fee, then price it in
            // pool tokens, so the caller knows the largest request this
            // account can still serve
            let gross =
                minimum_withdrawal_before_fees(excess, &stake_pool.stake_withdrawal_fee)?;
            let max_pool_tokens = stake_pool
                .calc_pool_tokens_for_withdraw(gross)
                .ok_or(StakePoolClientError::CalculationFailure)?;
            return Ok(WithdrawSource::PartialValidatorStake {
                stake_account,
                vote_account: *vote_account_address,
                available_lamports: excess,
                max_pool_tokens,
            });
        }
    }

    // active stake anywhere else must be drained before transient or
    // reserve stake is touched, regardless of which validator was named
    let blocking: Vec<Pubkey> = validator_list
        .iter_active()
        .filter(|v| v.active_stake_lamports > minimum_balance)
        .map(|v| v.vote_account_address)
        .collect();
    if !blocking.is_empty() {
        return Err(StakePoolClientError::MustDrainActiveStakeFirst(blocking));
    }

    if let Some(entry) = preferred {
        if entry
            .transient_stake_lamports
            .saturating_sub(minimum_balance)
            >= withdraw_lamports
        {
            let (stake_account, _) = find_transient_stake_program_address(
                program_id,
                vote_account_address,
                stake_pool_address,
                entry.transient_seed_suffix,
            );
            return Ok(WithdrawSource::TransientStake {
                stake_account,
                vote_account: *vote_account_address,
            });
        }
    }

    let blocking: Vec<Pubkey> = validator_list
        .iter_active()
        .filter(|v| v.transient_stake_lamports > minimum_balance)
        .map(|v| v.vote_account_address)
        .collect();
    if !blocking.is_empty() {
        return Err(StakePoolClientError::MustDrainTransientStakeFirst(blocking));
    }

    // every stake and transient account sits at the floor; the reserve has
    // no per-withdrawal minimum beyond what the program itself enforces
    Ok(WithdrawSource::Reserve {
        stake_account: stake_pool.reserve_stake,
    })
}
