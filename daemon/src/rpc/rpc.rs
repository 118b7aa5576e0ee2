// RPC method handlers.
//
// Every method gets the ledger out of the request context, parses its
// params and maps domain errors onto stable JSON-RPC error codes. Admin
// methods additionally require a loopback client address.

use std::sync::Arc;

use log::info;
use serde_json::{json, Value};

use crate::core::{error::CoreError, ledger::Ledger, storage::Storage};
use pulse_common::{
    api::{
        AirdropParams, ClaimRewardParams, ClaimRewardResult, DistributeParams, GetBalanceParams,
        GetBatchParams, GetHistoryParams, GetHistoryResult, GetReferralLeaderboardParams,
        GetReferralStatsParams, GetReferralTiersResult, GetTransactionParams, LeaderboardEntry,
        ListBatchesParams, ListBatchesResult, RegisterAccountParams, RequestWithdrawalParams,
        SetWalletAddressParams, TierInfo,
    },
    async_handler,
    config::VERSION,
    context::Context,
    ledger::LedgerError,
    referral::{tier_for, REFERRAL_TIERS},
    rpc::{parse_params, server::ClientAddr, InternalRpcError, RPCHandler},
};

/// Stable error code per domain error, kept in the custom range
fn ledger_error_code(error: &LedgerError) -> i16 {
    match error {
        LedgerError::InvalidAmount => -3,
        LedgerError::AlreadyClaimed => -4,
        LedgerError::InsufficientBalance { .. } => -5,
        LedgerError::AmountOutOfBounds { .. } => -6,
        LedgerError::NoWalletLinked => -7,
        LedgerError::AccountNotFound => -8,
        LedgerError::AccountAlreadyExists => -9,
        LedgerError::SelfReferral => -10,
        LedgerError::ReferrerNotFound => -11,
        LedgerError::TransactionNotFound(_) => -12,
        LedgerError::BatchNotFound(_) => -13,
        LedgerError::InvalidTransactionTransition { .. } => -14,
        LedgerError::InvalidBatchTransition { .. } => -15,
        LedgerError::TooManyRecipients { .. } => -16,
        LedgerError::DistributionDisabled => -17,
        LedgerError::SubmissionFailed(_) => -18,
        LedgerError::SubmissionTimeout(_) => -19,
        LedgerError::StorageError(_) => -20,
    }
}

fn map_core_error(error: CoreError) -> InternalRpcError {
    match error.as_ledger_error() {
        Some(ledger_error) => {
            InternalRpcError::Custom(ledger_error_code(ledger_error), ledger_error.to_string())
        }
        None => InternalRpcError::AnyError(anyhow::Error::new(error)),
    }
}

/// Admin methods are only served to loopback clients
fn check_admin(context: &Context) -> Result<(), InternalRpcError> {
    let client: &ClientAddr = context
        .get()
        .map_err(|_| InternalRpcError::InvalidContext)?;
    if !client.is_loopback() {
        return Err(InternalRpcError::AdminRestricted);
    }
    Ok(())
}

pub fn register_methods<S: Storage>(handler: &mut RPCHandler<Arc<Ledger<S>>>) {
    info!("Registering RPC methods...");
    handler.register_method("get_version", async_handler!(get_version::<S>));
    handler.register_method("register_account", async_handler!(register_account::<S>));
    handler.register_method("set_wallet_address", async_handler!(set_wallet_address::<S>));
    handler.register_method("get_balance", async_handler!(get_balance::<S>));
    handler.register_method("claim_reward", async_handler!(claim_reward::<S>));
    handler.register_method("request_withdrawal", async_handler!(request_withdrawal::<S>));
    handler.register_method("get_transaction", async_handler!(get_transaction::<S>));
    handler.register_method("get_history", async_handler!(get_history::<S>));
    handler.register_method("get_referral_stats", async_handler!(get_referral_stats::<S>));
    handler.register_method(
        "get_referral_leaderboard",
        async_handler!(get_referral_leaderboard::<S>),
    );
    handler.register_method("get_referral_tiers", async_handler!(get_referral_tiers::<S>));

    // admin methods, loopback only
    handler.register_method("distribute_rewards", async_handler!(distribute_rewards::<S>));
    handler.register_method("airdrop", async_handler!(airdrop::<S>));
    handler.register_method("get_batch", async_handler!(get_batch::<S>));
    handler.register_method("list_batches", async_handler!(list_batches::<S>));
    handler.register_method(
        "get_distribution_status",
        async_handler!(get_distribution_status::<S>),
    );
}

async fn get_version<S: Storage>(
    _: &Context,
    _: Value,
) -> Result<Value, InternalRpcError> {
    Ok(json!(VERSION))
}

async fn register_account<S: Storage>(
    context: &Context,
    body: Value,
) -> Result<Value, InternalRpcError> {
    let params: RegisterAccountParams = parse_params(body)?;
    let ledger: &Arc<Ledger<S>> = context.get()?;
    let result = ledger
        .register_account(&params.user_id, params.referrer_id)
        .await
        .map_err(map_core_error)?;
    Ok(json!(result))
}

async fn set_wallet_address<S: Storage>(
    context: &Context,
    body: Value,
) -> Result<Value, InternalRpcError> {
    let params: SetWalletAddressParams = parse_params(body)?;
    let ledger: &Arc<Ledger<S>> = context.get()?;
    ledger
        .set_wallet_address(&params.user_id, params.wallet_address)
        .await
        .map_err(map_core_error)?;
    Ok(json!(true))
}

async fn get_balance<S: Storage>(
    context: &Context,
    body: Value,
) -> Result<Value, InternalRpcError> {
    let params: GetBalanceParams = parse_params(body)?;
    let ledger: &Arc<Ledger<S>> = context.get()?;
    let result = ledger
        .get_balance(&params.user_id)
        .await
        .map_err(map_core_error)?;
    Ok(json!(result))
}

async fn claim_reward<S: Storage>(
    context: &Context,
    body: Value,
) -> Result<Value, InternalRpcError> {
    let params: ClaimRewardParams = parse_params(body)?;
    if !params.kind.requires_post() {
        return Err(InternalRpcError::InvalidParams(
            "kind must be ad-view or ad-engagement",
        ));
    }

    let ledger: &Arc<Ledger<S>> = context.get()?;
    let reward = ledger
        .claim_post_reward(
            &params.user_id,
            &params.post_id,
            params.kind,
            params.amount,
            params.campaign_id,
        )
        .await
        .map_err(map_core_error)?;
    Ok(json!(ClaimRewardResult { reward }))
}

async fn request_withdrawal<S: Storage>(
    context: &Context,
    body: Value,
) -> Result<Value, InternalRpcError> {
    let params: RequestWithdrawalParams = parse_params(body)?;
    let ledger: &Arc<Ledger<S>> = context.get()?;
    let result = ledger
        .request_withdrawal(&params.user_id, params.amount, params.wallet_address)
        .await
        .map_err(map_core_error)?;
    Ok(json!(result))
}

async fn get_transaction<S: Storage>(
    context: &Context,
    body: Value,
) -> Result<Value, InternalRpcError> {
    let params: GetTransactionParams = parse_params(body)?;
    let ledger: &Arc<Ledger<S>> = context.get()?;
    let transaction = ledger
        .get_transaction(params.id)
        .await
        .map_err(map_core_error)?;
    Ok(json!(transaction))
}

async fn get_history<S: Storage>(
    context: &Context,
    body: Value,
) -> Result<Value, InternalRpcError> {
    let params: GetHistoryParams = parse_params(body)?;
    let ledger: &Arc<Ledger<S>> = context.get()?;
    let (transactions, skip, limit) = ledger
        .get_history(&params.user_id, params.kind, params.skip, params.limit)
        .await
        .map_err(map_core_error)?;
    Ok(json!(GetHistoryResult {
        transactions,
        skip,
        limit
    }))
}

async fn get_referral_stats<S: Storage>(
    context: &Context,
    body: Value,
) -> Result<Value, InternalRpcError> {
    let params: GetReferralStatsParams = parse_params(body)?;
    let ledger: &Arc<Ledger<S>> = context.get()?;
    let result = ledger
        .get_referral_stats(&params.user_id)
        .await
        .map_err(map_core_error)?;
    Ok(json!(result))
}

async fn get_referral_leaderboard<S: Storage>(
    context: &Context,
    body: Value,
) -> Result<Value, InternalRpcError> {
    let params: GetReferralLeaderboardParams = parse_params(body)?;
    let ledger: &Arc<Ledger<S>> = context.get()?;
    let leaderboard = ledger
        .get_referral_leaderboard(params.limit)
        .await
        .map_err(map_core_error)?;

    let entries: Vec<LeaderboardEntry> = leaderboard
        .into_iter()
        .map(|(user_id, referral_count)| LeaderboardEntry {
            tier_label: tier_for(referral_count).label.to_string(),
            user_id,
            referral_count,
        })
        .collect();
    Ok(json!(entries))
}

async fn get_referral_tiers<S: Storage>(
    _: &Context,
    _: Value,
) -> Result<Value, InternalRpcError> {
    Ok(json!(GetReferralTiersResult {
        tiers: REFERRAL_TIERS.iter().map(TierInfo::from).collect()
    }))
}

// ===== Admin methods =====

async fn distribute_rewards<S: Storage>(
    context: &Context,
    body: Value,
) -> Result<Value, InternalRpcError> {
    check_admin(context)?;
    let params: DistributeParams = parse_params(body)?;
    let ledger: &Arc<Ledger<S>> = context.get()?;

    let max_size = params
        .max_size
        .unwrap_or(ledger.distribution.max_batch_size);
    let report = ledger.run_batch(max_size).await.map_err(map_core_error)?;
    Ok(json!(report))
}

async fn airdrop<S: Storage>(
    context: &Context,
    body: Value,
) -> Result<Value, InternalRpcError> {
    check_admin(context)?;
    let params: AirdropParams = parse_params(body)?;
    if params.user_ids.is_empty() {
        return Err(InternalRpcError::InvalidParams("userIds must not be empty"));
    }

    let ledger: &Arc<Ledger<S>> = context.get()?;
    let result = ledger.airdrop(params).await.map_err(map_core_error)?;
    Ok(json!(result))
}

async fn get_batch<S: Storage>(
    context: &Context,
    body: Value,
) -> Result<Value, InternalRpcError> {
    check_admin(context)?;
    let params: GetBatchParams = parse_params(body)?;
    let ledger: &Arc<Ledger<S>> = context.get()?;
    let batch = ledger.get_batch(params.id).await.map_err(map_core_error)?;
    Ok(json!(batch))
}

async fn list_batches<S: Storage>(
    context: &Context,
    body: Value,
) -> Result<Value, InternalRpcError> {
    check_admin(context)?;
    let params: ListBatchesParams = parse_params(body)?;
    let ledger: &Arc<Ledger<S>> = context.get()?;
    let batches = ledger
        .list_batches(params.skip, params.limit)
        .await
        .map_err(map_core_error)?;
    Ok(json!(ListBatchesResult { batches }))
}

async fn get_distribution_status<S: Storage>(
    context: &Context,
    _: Value,
) -> Result<Value, InternalRpcError> {
    check_admin(context)?;
    let ledger: &Arc<Ledger<S>> = context.get()?;
    let status = ledger
        .get_distribution_status()
        .await
        .map_err(map_core_error)?;
    Ok(json!(status))
}
