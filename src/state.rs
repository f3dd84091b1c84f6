//! Decoded account state and pool accounting arithmetic
//!
//! The structs here mirror the on-chain stake pool program's account layout
//! byte for byte. They derive [`BorshSerialize`] so callers and tests can
//! produce exact on-chain images; decoding goes through the cursor reader in
//! [`crate::decode`] because live accounts are capacity-padded and a strict
//! `try_from_slice` rejects the trailing bytes.

use {
    crate::error::StakePoolClientError, borsh::BorshSerialize, solana_program::pubkey::Pubkey,
};

/// Ceiling division with overflow checks; `None` on overflow or a zero
/// divisor.
pub(crate) fn checked_ceil_div(dividend: u128, divisor: u128) -> Option<u128> {
    dividend
        .checked_add(divisor.checked_sub(1)?)?
        .checked_div(divisor)
}

/// Tag written in the first byte of every pool-owned account.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, BorshSerialize)]
pub enum AccountType {
    /// Account has not been initialized by the pool program
    #[default]
    Uninitialized,
    /// Stake pool account
    StakePool,
    /// Validator list account
    ValidatorList,
}

/// Fee expressed as a rational fraction of some amount.
///
/// Layout note: the on-chain program serializes the denominator first.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, BorshSerialize)]
pub struct Fee {
    /// Denominator of the fee fraction; 0 means "no fee" by convention and
    /// must never be divided by
    pub denominator: u64,
    /// Numerator of the fee fraction
    pub numerator: u64,
}

impl Fee {
    /// Whether this fee takes nothing.
    pub fn is_zero(&self) -> bool {
        self.numerator == 0 || self.denominator == 0
    }

    /// Fee charged on `amount`, truncating toward zero.
    ///
    /// Rounding down matches the on-chain program, so an off-chain preview
    /// never overstates what the chain will grant.
    pub fn apply(&self, amount: u64) -> Option<u64> {
        if self.denominator == 0 {
            return Some(0);
        }
        u64::try_from(
            (amount as u128)
                .checked_mul(self.numerator as u128)?
                .checked_div(self.denominator as u128)?,
        )
        .ok()
    }
}

/// Stake-account lockup mirrored from the stake program.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, BorshSerialize)]
pub struct Lockup {
    /// Unix timestamp before which withdrawn stake stays locked
    pub unix_timestamp: i64,
    /// Epoch before which withdrawn stake stays locked
    pub epoch: u64,
    /// Custodian allowed to act during the lockup
    pub custodian: Pubkey,
}

/// One pool's full on-chain economic state.
///
/// Read fresh on every decision; never cache a snapshot across a withdrawal
/// decision and its submission, the chain may advance in between.
#[derive(Clone, Debug, Default, PartialEq, BorshSerialize)]
pub struct StakePool {
    /// Account type, must be `AccountType::StakePool`
    pub account_type: AccountType,
    /// Manager authority
    pub manager: Pubkey,
    /// Staker authority
    pub staker: Pubkey,
    /// Deposit authority, derived or manager-supplied
    pub stake_deposit_authority: Pubkey,
    /// Withdraw authority bump seed
    pub stake_withdraw_bump_seed: u8,
    /// Validator list storage account
    pub validator_list: Pubkey,
    /// Reserve stake account holding undelegated lamports
    pub reserve_stake: Pubkey,
    /// Pool token mint
    pub pool_mint: Pubkey,
    /// Manager's fee token account
    pub manager_fee_account: Pubkey,
    /// Token program the pool mint belongs to
    pub token_program_id: Pubkey,
    /// Total value under management, in lamports
    pub total_lamports: u64,
    /// Outstanding pool token supply
    pub pool_token_supply: u64,
    /// Last epoch `total_lamports` was updated
    pub last_update_epoch: u64,
    /// Lockup applied to pool stake accounts
    pub lockup: Lockup,
    /// Fee on rewards each epoch
    pub epoch_fee: Fee,
    /// Epoch fee taking effect next epoch, if a change is pending
    pub next_epoch_fee: Option<Fee>,
    /// Preferred validator for deposits
    pub preferred_deposit_validator_vote_address: Option<Pubkey>,
    /// Preferred validator for withdrawals
    pub preferred_withdraw_validator_vote_address: Option<Pubkey>,
    /// Fee on stake deposits
    pub stake_deposit_fee: Fee,
    /// Fee on stake withdrawals
    pub stake_withdrawal_fee: Fee,
    /// Stake withdrawal fee taking effect next epoch
    pub next_stake_withdrawal_fee: Option<Fee>,
    /// Share of the stake deposit fee granted to referrers, in percent
    pub stake_referral_fee: u8,
    /// Authority that must sign SOL deposits, when restricted
    pub sol_deposit_authority: Option<Pubkey>,
    /// Fee on SOL deposits
    pub sol_deposit_fee: Fee,
    /// Share of the SOL deposit fee granted to referrers, in percent
    pub sol_referral_fee: u8,
    /// Authority that must sign SOL withdrawals, when restricted
    pub sol_withdraw_authority: Option<Pubkey>,
    /// Fee on SOL withdrawals
    pub sol_withdrawal_fee: Fee,
    /// SOL withdrawal fee taking effect next epoch
    pub next_sol_withdrawal_fee: Option<Fee>,
    /// Pool token supply at the last epoch boundary
    pub last_epoch_pool_token_supply: u64,
    /// Total lamports at the last epoch boundary
    pub last_epoch_total_lamports: u64,
}

impl StakePool {
    /// Lamports per pool token as a display ratio.
    ///
    /// Only for presentation. Anything feeding a withdrawal bound must use
    /// [`Self::calc_lamports_withdraw_amount`], the two rounding contracts
    /// are not interchangeable.
    pub fn share_price(&self) -> Result<f64, StakePoolClientError> {
        if self.pool_token_supply == 0 {
            return Err(StakePoolClientError::EmptyPool);
        }
        Ok(self.total_lamports as f64 / self.pool_token_supply as f64)
    }

    /// Lamports received for burning `pool_tokens`, truncating toward zero.
    pub fn calc_lamports_withdraw_amount(&self, pool_tokens: u64) -> Option<u64> {
        u64::try_from(
            (pool_tokens as u128)
                .checked_mul(self.total_lamports as u128)?
                .checked_div(self.pool_token_supply as u128)?,
        )
        .ok()
    }

    /// Pool tokens that must be burned to withdraw `lamports`, rounding up
    /// so the caller never under-burns.
    pub fn calc_pool_tokens_for_withdraw(&self, lamports: u64) -> Option<u64> {
        let tokens = checked_ceil_div(
            (lamports as u128).checked_mul(self.pool_token_supply as u128)?,
            self.total_lamports as u128,
        )?;
        u64::try_from(tokens).ok()
    }

    /// Check if the pool account has been initialized
    pub fn is_initialized(&self) -> bool {
        self.account_type == AccountType::StakePool
    }
}

/// Status of one validator's stake accounts within the pool.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, BorshSerialize)]
pub enum StakeStatus {
    /// Stake account is active, there may be a transient stake as well
    #[default]
    Active,
    /// Only transient stake account exists, when a transient stake is
    /// deactivating during validator removal
    DeactivatingTransient,
    /// No more validator stake accounts exist, entry ready for removal
    ReadyForRemoval,
    /// Only the validator stake account is deactivating, no transient stake
    /// account exists
    DeactivatingValidator,
    /// Both the transient and validator stake account are deactivating,
    /// when a validator is removed with a transient stake active
    DeactivatingAll,
}

impl TryFrom<u8> for StakeStatus {
    type Error = StakePoolClientError;

    fn try_from(tag: u8) -> Result<Self, Self::Error> {
        match tag {
            0 => Ok(Self::Active),
            1 => Ok(Self::DeactivatingTransient),
            2 => Ok(Self::ReadyForRemoval),
            3 => Ok(Self::DeactivatingValidator),
            4 => Ok(Self::DeactivatingAll),
            other => Err(StakePoolClientError::UnknownStakeStatus(other)),
        }
    }
}

/// Information about one validator's delegation record in the pool.
///
/// Fixed 73-byte layout in the validator list account.
#[derive(Clone, Copy, Debug, Default, PartialEq, BorshSerialize)]
pub struct ValidatorStakeInfo {
    /// Lamports on the validator stake account, including rent
    pub active_stake_lamports: u64,
    /// Lamports on the transient stake account
    pub transient_stake_lamports: u64,
    /// Last epoch the balances were observed on chain
    pub last_update_epoch: u64,
    /// Seed used to derive the transient stake account
    pub transient_seed_suffix: u64,
    /// Reserved for future use
    pub unused: u32,
    /// Seed used to derive the validator stake account
    pub validator_seed_suffix: u32,
    /// Status of the validator stake accounts
    pub status: StakeStatus,
    /// Validator vote account this entry delegates to
    pub vote_account_address: Pubkey,
}

impl ValidatorStakeInfo {
    /// Serialized size of one entry.
    pub const LEN: usize = 73;

    /// A tombstoned slot: the entry occupies space in the physical array
    /// but is excluded from the logical list.
    pub fn is_tombstone(&self) -> bool {
        self.vote_account_address == Pubkey::default()
    }
}

/// Fixed-size header of the validator list account.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, BorshSerialize)]
pub struct ValidatorListHeader {
    /// Account type, must be `AccountType::ValidatorList`
    pub account_type: AccountType,
    /// Maximum number of entries the physical array can hold
    pub max_validators: u32,
}

/// Storage list of all validator delegation records in the pool.
///
/// The physical array is sized for `max_validators` and tombstoned in place
/// rather than compacted, so consumers filter at read time.
#[derive(Clone, Debug, Default, PartialEq, BorshSerialize)]
pub struct ValidatorList {
    /// Header with capacity information
    pub header: ValidatorListHeader,
    /// Physical entries, tombstones included
    pub validators: Vec<ValidatorStakeInfo>,
}

impl ValidatorList {
    /// Serialized size of a list with room for `max_validators` entries.
    pub fn size_with_max_validators(max_validators: usize) -> usize {
        1 + 4 + 4 + ValidatorStakeInfo::LEN * max_validators
    }

    /// Iterate the logical entries, skipping tombstoned slots.
    pub fn iter_active(&self) -> impl Iterator<Item = &ValidatorStakeInfo> {
        self.validators.iter().filter(|v| !v.is_tombstone())
    }

    /// Find the entry delegating to `vote_account_address`.
    pub fn find(&self, vote_account_address: &Pubkey) -> Option<&ValidatorStakeInfo> {
        self.iter_active()
            .find(|v| v.vote_account_address == *vote_account_address)
    }

    /// Check if the list contains an entry for `vote_account_address`.
    pub fn contains(&self, vote_account_address: &Pubkey) -> bool {
        self.find(vote_account_address).is_some()
    }
}

#[cfg(test)]
mod test {
    use {super::*, proptest::prelude::*};

    #[test]
    fn fee_apply_rounds_down() {
        let fee = Fee {
            numerator: 1,
            denominator: 3,
        };
        assert_eq!(fee.apply(100), Some(33));
        assert_eq!(fee.apply(0), Some(0));
        assert_eq!(fee.apply(2), Some(0));
    }

    #[test]
    fn fee_zero_denominator_charges_nothing() {
        let fee = Fee {
            numerator: 5,
            denominator: 0,
        };
        assert!(fee.is_zero());
        assert_eq!(fee.apply(u64::MAX), Some(0));
    }

    #[test]
    fn share_price_requires_supply() {
        let pool = StakePool {
            total_lamports: 3_000_000_000,
            pool_token_supply: 3_000_000_000,
            ..StakePool::default()
        };
        assert_eq!(pool.share_price().unwrap(), 1.0);

        let empty = StakePool {
            total_lamports: 3_000_000_000,
            pool_token_supply: 0,
            ..StakePool::default()
        };
        assert_eq!(empty.share_price(), Err(StakePoolClientError::EmptyPool));
        assert_eq!(empty.calc_lamports_withdraw_amount(1), None);
    }

    #[test]
    fn withdraw_amount_truncates() {
        // price above 1, conversion must round in the pool's favor
        let pool = StakePool {
            total_lamports: 10,
            pool_token_supply: 3,
            ..StakePool::default()
        };
        assert_eq!(pool.calc_lamports_withdraw_amount(1), Some(3));
        assert_eq!(pool.calc_pool_tokens_for_withdraw(3), Some(1));
        assert_eq!(pool.calc_pool_tokens_for_withdraw(10), Some(3));
        // rounding up: withdrawing 4 lamports costs 2 tokens, not 1
        assert_eq!(pool.calc_pool_tokens_for_withdraw(4), Some(2));
        // amounts whose token value rounds below 1 still cost a full token
        assert_eq!(pool.calc_pool_tokens_for_withdraw(1), Some(1));
        assert_eq!(pool.calc_pool_tokens_for_withdraw(2), Some(1));
        assert_eq!(pool.calc_pool_tokens_for_withdraw(0), Some(0));
    }

    #[test]
    fn ceil_div_checks() {
        assert_eq!(checked_ceil_div(9, 10), Some(1));
        assert_eq!(checked_ceil_div(10, 10), Some(1));
        assert_eq!(checked_ceil_div(11, 10), Some(2));
        assert_eq!(checked_ceil_div(0, 10), Some(0));
        assert_eq!(checked_ceil_div(1, 0), None);
        assert_eq!(checked_ceil_div(u128::MAX, 2), None);
    }

    proptest! {
        #[test]
        fn fee_apply_never_overstates(
            amount in 0u64..=u64::MAX,
            numerator in 0u64..=1_000_000,
            denominator in 1u64..=1_000_000,
        ) {
            prop_assume!(numerator <= denominator);
            let fee = Fee { numerator, denominator };
            let charged = fee.apply(amount).unwrap();
            let exact = (amount as u128) * (numerator as u128) / (denominator as u128);
            prop_assert!(charged as u128 <= exact);
        }

        #[test]
        fn fee_apply_monotonic(
            amount in 0u64..u64::MAX / 2,
            delta in 0u64..1_000_000,
            numerator in 0u64..=100,
            denominator in 1u64..=100,
        ) {
            prop_assume!(numerator <= denominator);
            let fee = Fee { numerator, denominator };
            prop_assert!(fee.apply(amount).unwrap() <= fee.apply(amount + delta).unwrap());
        }
    }
}
