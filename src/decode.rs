//! Cursor-based account decoding
//!
//! Account layouts are strictly positional little-endian with no framing,
//! except for optional fields, which are a 1-byte presence tag followed by
//! the payload only when present. The variable consumption after the first
//! optional field rules out static offsets, so every record is read through
//! a running cursor, consumed once and discarded.

use {
    crate::{
        error::StakePoolClientError,
        state::{
            AccountType, Fee, Lockup, StakePool, StakeStatus, ValidatorList,
            ValidatorListHeader, ValidatorStakeInfo,
        },
    },
    solana_program::pubkey::{Pubkey, PUBKEY_BYTES},
};

/// Forward-only reader over raw account data.
///
/// Every read advances the position; reading past the end of the buffer
/// fails with `TruncatedData`. Beyond bounds checking the data is trusted,
/// well-formedness is the chain's job.
pub(crate) struct Cursor<'data> {
    data: &'data [u8],
    position: usize,
}

impl<'data> Cursor<'data> {
    pub(crate) fn new(data: &'data [u8]) -> Self {
        Self { data, position: 0 }
    }

    fn take(&mut self, len: usize) -> Result<&'data [u8], StakePoolClientError> {
        let end = self
            .position
            .checked_add(len)
            .ok_or(StakePoolClientError::TruncatedData)?;
        if end > self.data.len() {
            return Err(StakePoolClientError::TruncatedData);
        }
        let bytes = &self.data[self.position..end];
        self.position = end;
        Ok(bytes)
    }

    fn read_u8(&mut self) -> Result<u8, StakePoolClientError> {
        Ok(self.take(1)?[0])
    }

    fn read_u32(&mut self) -> Result<u32, StakePoolClientError> {
        let bytes: [u8; 4] = self
            .take(4)?
            .try_into()
            .map_err(|_| StakePoolClientError::TruncatedData)?;
        Ok(u32::from_le_bytes(bytes))
    }

    fn read_u64(&mut self) -> Result<u64, StakePoolClientError> {
        let bytes: [u8; 8] = self
            .take(8)?
            .try_into()
            .map_err(|_| StakePoolClientError::TruncatedData)?;
        Ok(u64::from_le_bytes(bytes))
    }

    fn read_i64(&mut self) -> Result<i64, StakePoolClientError> {
        let bytes: [u8; 8] = self
            .take(8)?
            .try_into()
            .map_err(|_| StakePoolClientError::TruncatedData)?;
        Ok(i64::from_le_bytes(bytes))
    }

    fn read_account_type(&mut self) -> Result<AccountType, StakePoolClientError> {
        // decoding trusts well-formed chain data, an unexpected tag simply
        // reads as uninitialized
        Ok(match self.read_u8()? {
            1 => AccountType::StakePool,
            2 => AccountType::ValidatorList,
            _ => AccountType::Uninitialized,
        })
    }

    fn read_pubkey(&mut self) -> Result<Pubkey, StakePoolClientError> {
        Pubkey::try_from(self.take(PUBKEY_BYTES)?)
            .map_err(|_| StakePoolClientError::TruncatedData)
    }

    fn read_fee(&mut self) -> Result<Fee, StakePoolClientError> {
        // denominator first, matching the on-chain struct order
        let denominator = self.read_u64()?;
        let numerator = self.read_u64()?;
        Ok(Fee {
            denominator,
            numerator,
        })
    }

    fn read_lockup(&mut self) -> Result<Lockup, StakePoolClientError> {
        Ok(Lockup {
            unix_timestamp: self.read_i64()?,
            epoch: self.read_u64()?,
            custodian: self.read_pubkey()?,
        })
    }

    /// Reads a presence tag and the payload only when the tag is nonzero.
    fn read_option<T>(
        &mut self,
        read: impl FnOnce(&mut Self) -> Result<T, StakePoolClientError>,
    ) -> Result<Option<T>, StakePoolClientError> {
        if self.read_u8()? == 0 {
            Ok(None)
        } else {
            read(self).map(Some)
        }
    }
}

impl StakePool {
    /// Decode a stake pool account image.
    ///
    /// Trailing bytes past the record are ignored, live accounts are padded
    /// to their allocated size.
    pub fn decode(data: &[u8]) -> Result<Self, StakePoolClientError> {
        let mut cursor = Cursor::new(data);
        Ok(Self {
            account_type: cursor.read_account_type()?,
            manager: cursor.read_pubkey()?,
            staker: cursor.read_pubkey()?,
            stake_deposit_authority: cursor.read_pubkey()?,
            stake_withdraw_bump_seed: cursor.read_u8()?,
            validator_list: cursor.read_pubkey()?,
            reserve_stake: cursor.read_pubkey()?,
            pool_mint: cursor.read_pubkey()?,
            manager_fee_account: cursor.read_pubkey()?,
            token_program_id: cursor.read_pubkey()?,
            total_lamports: cursor.read_u64()?,
            pool_token_supply: cursor.read_u64()?,
            last_update_epoch: cursor.read_u64()?,
            lockup: cursor.read_lockup()?,
            epoch_fee: cursor.read_fee()?,
            next_epoch_fee: cursor.read_option(Cursor::read_fee)?,
            preferred_deposit_validator_vote_address: cursor.read_option(Cursor::read_pubkey)?,
            preferred_withdraw_validator_vote_address: cursor.read_option(Cursor::read_pubkey)?,
            stake_deposit_fee: cursor.read_fee()?,
            stake_withdrawal_fee: cursor.read_fee()?,
            next_stake_withdrawal_fee: cursor.read_option(Cursor::read_fee)?,
            stake_referral_fee: cursor.read_u8()?,
            sol_deposit_authority: cursor.read_option(Cursor::read_pubkey)?,
            sol_deposit_fee: cursor.read_fee()?,
            sol_referral_fee: cursor.read_u8()?,
            sol_withdraw_authority: cursor.read_option(Cursor::read_pubkey)?,
            sol_withdrawal_fee: cursor.read_fee()?,
            next_sol_withdrawal_fee: cursor.read_option(Cursor::read_fee)?,
            last_epoch_pool_token_supply: cursor.read_u64()?,
            last_epoch_total_lamports: cursor.read_u64()?,
        })
    }
}

impl ValidatorStakeInfo {
    fn read(cursor: &mut Cursor) -> Result<Self, StakePoolClientError> {
        Ok(Self {
            active_stake_lamports: cursor.read_u64()?,
            transient_stake_lamports: cursor.read_u64()?,
            last_update_epoch: cursor.read_u64()?,
            transient_seed_suffix: cursor.read_u64()?,
            unused: cursor.read_u32()?,
            validator_seed_suffix: cursor.read_u32()?,
            status: StakeStatus::try_from(cursor.read_u8()?)?,
            vote_account_address: cursor.read_pubkey()?,
        })
    }

    /// Decode a single 73-byte validator entry.
    pub fn decode(data: &[u8]) -> Result<Self, StakePoolClientError> {
        Self::read(&mut Cursor::new(data))
    }
}

impl ValidatorList {
    /// Decode a validator list account image.
    ///
    /// Two passes: the fixed header, then the 4-byte entry count, then
    /// exactly that many back-to-back entries. Slots between the count and
    /// `max_validators` are uninitialized capacity and are never decoded.
    pub fn decode(data: &[u8]) -> Result<Self, StakePoolClientError> {
        let mut cursor = Cursor::new(data);
        let header = ValidatorListHeader {
            account_type: cursor.read_account_type()?,
            max_validators: cursor.read_u32()?,
        };
        let count = cursor.read_u32()?;
        let mut validators = Vec::with_capacity(count as usize);
        for _ in 0..count {
            validators.push(ValidatorStakeInfo::read(&mut cursor)?);
        }
        Ok(Self { header, validators })
    }
}

#[cfg(test)]
mod test {
    use {super::*, crate::state::AccountType, borsh::BorshSerialize};

    fn sample_pool() -> StakePool {
        StakePool {
            account_type: AccountType::StakePool,
            manager: Pubkey::new_unique(),
            staker: Pubkey::new_unique(),
            stake_deposit_authority: Pubkey::new_unique(),
            stake_withdraw_bump_seed: 254,
            validator_list: Pubkey::new_unique(),
            reserve_stake: Pubkey::new_unique(),
            pool_mint: Pubkey::new_unique(),
            manager_fee_account: Pubkey::new_unique(),
            token_program_id: spl_token::id(),
            total_lamports: 3_000_000_000,
            pool_token_supply: 3_000_000_000,
            last_update_epoch: 42,
            lockup: Lockup {
                unix_timestamp: -1,
                epoch: 7,
                custodian: Pubkey::new_unique(),
            },
            epoch_fee: Fee {
                denominator: 100,
                numerator: 2,
            },
            next_epoch_fee: Some(Fee {
                denominator: 100,
                numerator: 3,
            }),
            preferred_deposit_validator_vote_address: Some(Pubkey::new_unique()),
            preferred_withdraw_validator_vote_address: None,
            stake_deposit_fee: Fee {
                denominator: 100,
                numerator: 1,
            },
            stake_withdrawal_fee: Fee {
                denominator: 100,
                numerator: 1,
            },
            next_stake_withdrawal_fee: None,
            stake_referral_fee: 50,
            sol_deposit_authority: None,
            sol_deposit_fee: Fee {
                denominator: 1000,
                numerator: 5,
            },
            sol_referral_fee: 0,
            sol_withdraw_authority: Some(Pubkey::new_unique()),
            sol_withdrawal_fee: Fee {
                denominator: 1000,
                numerator: 2,
            },
            next_sol_withdrawal_fee: Some(Fee {
                denominator: 1000,
                numerator: 4,
            }),
            last_epoch_pool_token_supply: 2_500_000_000,
            last_epoch_total_lamports: 2_600_000_000,
        }
    }

    fn sample_entry(vote: Pubkey, active: u64, transient: u64) -> ValidatorStakeInfo {
        ValidatorStakeInfo {
            active_stake_lamports: active,
            transient_stake_lamports: transient,
            last_update_epoch: 42,
            transient_seed_suffix: 3,
            unused: 0,
            validator_seed_suffix: 0,
            status: StakeStatus::Active,
            vote_account_address: vote,
        }
    }

    #[test]
    fn stake_pool_round_trip() {
        let pool = sample_pool();
        let bytes = pool.try_to_vec().unwrap();
        assert_eq!(StakePool::decode(&bytes).unwrap(), pool);
    }

    #[test]
    fn stake_pool_round_trip_all_options_absent() {
        let pool = StakePool {
            next_epoch_fee: None,
            preferred_deposit_validator_vote_address: None,
            sol_withdraw_authority: None,
            next_sol_withdrawal_fee: None,
            ..sample_pool()
        };
        let bytes = pool.try_to_vec().unwrap();
        // absent options shrink the record, the cursor must keep every
        // later field aligned
        assert!(bytes.len() < sample_pool().try_to_vec().unwrap().len());
        assert_eq!(StakePool::decode(&bytes).unwrap(), pool);
    }

    #[test]
    fn stake_pool_ignores_trailing_padding() {
        let pool = sample_pool();
        let mut bytes = pool.try_to_vec().unwrap();
        bytes.resize(bytes.len() + 128, 0);
        assert_eq!(StakePool::decode(&bytes).unwrap(), pool);
    }

    #[test]
    fn stake_pool_truncated() {
        let bytes = sample_pool().try_to_vec().unwrap();
        for len in [0, 1, 32, 100, bytes.len() - 1] {
            assert_eq!(
                StakePool::decode(&bytes[..len]),
                Err(StakePoolClientError::TruncatedData),
                "length {}",
                len
            );
        }
    }

    #[test]
    fn validator_list_round_trip_with_capacity_padding() {
        let list = ValidatorList {
            header: ValidatorListHeader {
                account_type: AccountType::ValidatorList,
                max_validators: 10,
            },
            validators: vec![
                sample_entry(Pubkey::new_unique(), 5_000_000_000, 0),
                sample_entry(Pubkey::new_unique(), 3_282_880, 1_000_000_000),
            ],
        };
        // serialize into a buffer sized for the full capacity, the way the
        // account is allocated on chain
        let mut bytes = vec![0u8; ValidatorList::size_with_max_validators(10)];
        list.serialize(&mut bytes.as_mut_slice()).unwrap();
        let decoded = ValidatorList::decode(&bytes).unwrap();
        assert_eq!(decoded, list);
        assert_eq!(decoded.validators.len(), 2);
    }

    #[test]
    fn validator_list_excludes_tombstones() {
        let live = Pubkey::new_unique();
        let list = ValidatorList {
            header: ValidatorListHeader {
                account_type: AccountType::ValidatorList,
                max_validators: 4,
            },
            validators: vec![
                sample_entry(Pubkey::default(), 0, 0),
                sample_entry(live, 2_000_000_000, 0),
            ],
        };
        let bytes = list.try_to_vec().unwrap();
        let decoded = ValidatorList::decode(&bytes).unwrap();
        // physical count keeps the tombstone, the logical view drops it
        assert_eq!(decoded.validators.len(), 2);
        assert_eq!(decoded.iter_active().count(), 1);
        assert!(decoded.find(&live).is_some());
        assert!(decoded.find(&Pubkey::default()).is_none());
    }

    #[test]
    fn validator_list_truncated_entry() {
        let list = ValidatorList {
            header: ValidatorListHeader {
                account_type: AccountType::ValidatorList,
                max_validators: 2,
            },
            validators: vec![sample_entry(Pubkey::new_unique(), 1, 2)],
        };
        let bytes = list.try_to_vec().unwrap();
        // count says one entry but the buffer stops mid-entry
        assert_eq!(
            ValidatorList::decode(&bytes[..bytes.len() - 10]),
            Err(StakePoolClientError::TruncatedData)
        );
    }

    #[test]
    fn validator_entry_unknown_status() {
        let mut bytes = sample_entry(Pubkey::new_unique(), 1, 2).try_to_vec().unwrap();
        bytes[40] = 9;
        assert_eq!(
            ValidatorStakeInfo::decode(&bytes),
            Err(StakePoolClientError::UnknownStakeStatus(9))
        );
    }
}
