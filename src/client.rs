//! RPC boundary for fetching the account state a decision needs
//!
//! Thin wrappers over the blocking [`RpcClient`]. Everything a single
//! resolution depends on (pool snapshot, validator list, minimum stake
//! balance) must come from one fetch pass; if anything is re-fetched, the
//! whole set is re-fetched and the resolver re-run.

use {
    crate::{
        error::StakePoolClientError,
        minimum_stake_account_balance,
        state::{StakePool, ValidatorList},
    },
    solana_client::rpc_client::RpcClient,
    solana_program::{program_pack::Pack, pubkey::Pubkey, stake},
};

type Error = Box<dyn std::error::Error>;

/// Fetch and decode the stake pool account.
pub fn get_stake_pool(rpc_client: &RpcClient, pool_address: &Pubkey) -> Result<StakePool, Error> {
    let account_data = rpc_client.get_account_data(pool_address)?;
    let stake_pool = StakePool::decode(&account_data)
        .map_err(|err| format!("Invalid stake pool {}: {}", pool_address, err))?;
    Ok(stake_pool)
}

/// Fetch and decode the validator list account.
pub fn get_validator_list(
    rpc_client: &RpcClient,
    validator_list_address: &Pubkey,
) -> Result<ValidatorList, Error> {
    let account_data = rpc_client.get_account_data(validator_list_address)?;
    let validator_list = ValidatorList::decode(&account_data)
        .map_err(|err| format!("Invalid validator list {}: {}", validator_list_address, err))?;
    Ok(validator_list)
}

/// Fetch a token account and check it belongs to the expected mint.
pub fn get_token_account(
    rpc_client: &RpcClient,
    token_account_address: &Pubkey,
    expected_token_mint: &Pubkey,
) -> Result<spl_token::state::Account, Error> {
    let account_data = rpc_client.get_account_data(token_account_address)?;
    let token_account = spl_token::state::Account::unpack_from_slice(&account_data)
        .map_err(|err| format!("Invalid token account {}: {}", token_account_address, err))?;

    if token_account.mint != *expected_token_mint {
        Err(format!(
            "Invalid token mint for {}, expected mint is {}",
            token_account_address, expected_token_mint
        )
        .into())
    } else {
        Ok(token_account)
    }
}

/// Fetch a token mint.
pub fn get_token_mint(
    rpc_client: &RpcClient,
    token_mint_address: &Pubkey,
) -> Result<spl_token::state::Mint, Error> {
    let account_data = rpc_client.get_account_data(token_mint_address)?;
    let token_mint = spl_token::state::Mint::unpack_from_slice(&account_data)
        .map_err(|err| format!("Invalid token mint {}: {}", token_mint_address, err))?;
    Ok(token_mint)
}

/// Fetch the chain-state scalars and combine them into the minimum balance
/// a pool stake account must keep.
///
/// Both inputs move between epochs, so this is fetched per resolution and
/// never cached.
pub fn get_minimum_stake_balance(rpc_client: &RpcClient) -> Result<u64, Error> {
    let minimum_delegation = rpc_client.get_stake_minimum_delegation()?;
    let rent_exemption = rpc_client
        .get_minimum_balance_for_rent_exemption(stake::state::StakeState::size_of())?;
    Ok(minimum_stake_account_balance(minimum_delegation, rent_exemption))
}

/// Largest lamport amount the owner of `token_account_address` can withdraw
/// at the current share price, integer-exact.
pub fn get_max_withdraw(
    rpc_client: &RpcClient,
    stake_pool: &StakePool,
    token_account_address: &Pubkey,
) -> Result<u64, Error> {
    let token_account = get_token_account(rpc_client, token_account_address, &stake_pool.pool_mint)?;
    let lamports = stake_pool
        .calc_lamports_withdraw_amount(token_account.amount)
        .ok_or(StakePoolClientError::EmptyPool)?;
    Ok(lamports)
}
