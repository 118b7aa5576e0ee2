// Ledger and distribution tests against a real sled backend.
// The chain client is mocked so settlement success, failure and timeout
// paths are all exercised.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tempdir::TempDir;

use crate::{
    config::DistributionConfig,
    core::{
        chain::{ChainClient, Transfer},
        error::CoreError,
        ledger::{ChainContext, CreditMeta, Ledger},
        storage::{SledStorage, TransactionProvider},
    },
};
use async_trait::async_trait;
use pulse_common::{
    api::{AirdropParams, WithdrawalStatus},
    chain::{ChainId, TxHash, WalletAddress},
    config::COIN_VALUE,
    ledger::{
        BatchStatus, LedgerError, TransactionStatus, TransactionType, UserId,
    },
};

const MOCK_TX_HASH: TxHash = TxHash::new([0xaa; 32]);

#[derive(Clone)]
enum MockMode {
    Success,
    Fail(String),
    Hang,
}

struct MockChainClient {
    mode: Mutex<MockMode>,
}

impl MockChainClient {
    fn new(mode: MockMode) -> Arc<Self> {
        Arc::new(Self {
            mode: Mutex::new(mode),
        })
    }

    fn set_mode(&self, mode: MockMode) {
        *self.mode.lock().unwrap() = mode;
    }
}

#[async_trait]
impl ChainClient for MockChainClient {
    async fn submit_batch_transfer(
        &self,
        _: &WalletAddress,
        _: ChainId,
        _: &[Transfer],
    ) -> Result<TxHash, CoreError> {
        let mode = self.mode.lock().unwrap().clone();
        match mode {
            MockMode::Success => Ok(MOCK_TX_HASH),
            MockMode::Fail(message) => Err(LedgerError::SubmissionFailed(message).into()),
            MockMode::Hang => {
                // longer than any test timeout
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(MOCK_TX_HASH)
            }
        }
    }
}

fn test_distribution_config(signup_bonus: u64, instant: bool) -> DistributionConfig {
    DistributionConfig {
        max_batch_size: 50,
        distribution_interval_secs: 0,
        submit_timeout_secs: 1,
        min_withdrawal: 1,
        max_withdrawal: 10_000 * COIN_VALUE,
        instant_distribution: instant,
        signup_bonus,
    }
}

struct TestContext {
    ledger: Arc<Ledger<SledStorage>>,
    chain: Arc<MockChainClient>,
    // dropped last, keeps the db directory alive
    _dir: TempDir,
}

fn setup(signup_bonus: u64) -> TestContext {
    setup_with(signup_bonus, false, true)
}

fn setup_with(signup_bonus: u64, instant: bool, with_chain: bool) -> TestContext {
    let dir = TempDir::new("pulse-ledger-test").expect("tempdir");
    let storage = SledStorage::new(dir.path().to_str().expect("path")).expect("storage");

    let chain = MockChainClient::new(MockMode::Success);
    let context = with_chain.then(|| ChainContext {
        client: Arc::clone(&chain) as Arc<dyn ChainClient>,
        contract: WalletAddress::new([0x11; 20]),
        chain_id: 137,
        explorer_url: Some("https://scan.example.org".to_string()),
    });

    TestContext {
        ledger: Ledger::new(storage, context, test_distribution_config(signup_bonus, instant)),
        chain,
        _dir: dir,
    }
}

fn user(name: &str) -> UserId {
    name.to_string()
}

fn wallet(byte: u8) -> WalletAddress {
    WalletAddress::new([byte; 20])
}

async fn register(ctx: &TestContext, name: &str) -> UserId {
    let id = user(name);
    ctx.ledger.register_account(&id, None).await.expect("register");
    id
}

async fn register_with_wallet(ctx: &TestContext, name: &str, byte: u8) -> UserId {
    let id = register(ctx, name).await;
    ctx.ledger
        .set_wallet_address(&id, wallet(byte))
        .await
        .expect("wallet");
    id
}

fn ledger_error(result: Result<impl std::fmt::Debug, CoreError>) -> LedgerError {
    match result {
        Err(CoreError::Ledger(e)) => e,
        other => panic!("expected ledger error, got {:?}", other.map(|_| ())),
    }
}

#[tokio::test]
async fn test_register_credits_signup_bonus() {
    let ctx = setup(5 * COIN_VALUE);
    let alice = register(&ctx, "alice").await;

    let balance = ctx.ledger.get_balance(&alice).await.unwrap();
    assert_eq!(balance.balance, 5 * COIN_VALUE);
    assert_eq!(balance.total_earned, 5 * COIN_VALUE);
    assert_eq!(balance.total_withdrawn, 0);

    let (history, _, _) = ctx.ledger.get_history(&alice, None, None, None).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].kind, TransactionType::SignupBonus);
    assert_eq!(history[0].status, TransactionStatus::Confirmed);
}

#[tokio::test]
async fn test_register_twice_rejected() {
    let ctx = setup(0);
    let alice = register(&ctx, "alice").await;
    let err = ledger_error(ctx.ledger.register_account(&alice, None).await);
    assert_eq!(err, LedgerError::AccountAlreadyExists);
}

#[tokio::test]
async fn test_self_referral_rejected() {
    let ctx = setup(0);
    let err = ledger_error(
        ctx.ledger
            .register_account(&user("alice"), Some(user("alice")))
            .await,
    );
    assert_eq!(err, LedgerError::SelfReferral);
}

#[tokio::test]
async fn test_duplicate_claim_rejected() {
    let ctx = setup(0);
    let alice = register(&ctx, "alice").await;
    let post = "post-1".to_string();

    ctx.ledger
        .claim_post_reward(&alice, &post, TransactionType::AdView, COIN_VALUE, None)
        .await
        .expect("first claim");

    let err = ledger_error(
        ctx.ledger
            .claim_post_reward(&alice, &post, TransactionType::AdView, COIN_VALUE, None)
            .await,
    );
    assert_eq!(err, LedgerError::AlreadyClaimed);

    // exactly one credit went through
    let balance = ctx.ledger.get_balance(&alice).await.unwrap();
    assert_eq!(balance.balance, COIN_VALUE);

    // a different claim type on the same post is a separate key
    ctx.ledger
        .claim_post_reward(&alice, &post, TransactionType::AdEngagement, COIN_VALUE, None)
        .await
        .expect("engagement claim");
}

#[tokio::test]
async fn test_concurrent_claims_credit_once() {
    let ctx = setup(0);
    let alice = register(&ctx, "alice").await;
    let post = "post-1".to_string();

    let first = {
        let ledger = Arc::clone(&ctx.ledger);
        let alice = alice.clone();
        let post = post.clone();
        tokio::spawn(async move {
            ledger
                .claim_post_reward(&alice, &post, TransactionType::AdView, COIN_VALUE, None)
                .await
        })
    };
    let second = {
        let ledger = Arc::clone(&ctx.ledger);
        let alice = alice.clone();
        let post = post.clone();
        tokio::spawn(async move {
            ledger
                .claim_post_reward(&alice, &post, TransactionType::AdView, COIN_VALUE, None)
                .await
        })
    };

    let results = [first.await.unwrap(), second.await.unwrap()];
    let successes = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1);

    let balance = ctx.ledger.get_balance(&alice).await.unwrap();
    assert_eq!(balance.balance, COIN_VALUE);
}

#[tokio::test]
async fn test_withdrawal_rejects_overdraft() {
    let ctx = setup(0);
    let alice = register_with_wallet(&ctx, "alice", 0xa1).await;
    ctx.ledger
        .issue_reward(&alice, TransactionType::Airdrop, 15, CreditMeta::default())
        .await
        .unwrap();

    let err = ledger_error(ctx.ledger.request_withdrawal(&alice, 20, None).await);
    assert_eq!(
        err,
        LedgerError::InsufficientBalance {
            needed: 20,
            available: 15
        }
    );

    // balance unchanged after the rejection
    let balance = ctx.ledger.get_balance(&alice).await.unwrap();
    assert_eq!(balance.balance, 15);
    assert_eq!(balance.total_withdrawn, 0);
}

#[tokio::test]
async fn test_withdrawal_bounds() {
    let ctx = setup(0);
    let alice = register_with_wallet(&ctx, "alice", 0xa1).await;
    ctx.ledger
        .issue_reward(
            &alice,
            TransactionType::Airdrop,
            100_000 * COIN_VALUE,
            CreditMeta::default(),
        )
        .await
        .unwrap();

    let err = ledger_error(
        ctx.ledger
            .request_withdrawal(&alice, 20_000 * COIN_VALUE, None)
            .await,
    );
    assert!(matches!(err, LedgerError::AmountOutOfBounds { .. }));
}

#[tokio::test]
async fn test_withdrawal_requires_wallet() {
    let ctx = setup(0);
    let alice = register(&ctx, "alice").await;
    ctx.ledger
        .issue_reward(&alice, TransactionType::Airdrop, COIN_VALUE, CreditMeta::default())
        .await
        .unwrap();

    let err = ledger_error(ctx.ledger.request_withdrawal(&alice, COIN_VALUE, None).await);
    assert_eq!(err, LedgerError::NoWalletLinked);

    // an explicit connected wallet works without a linked one
    let result = ctx
        .ledger
        .request_withdrawal(&alice, COIN_VALUE, Some(wallet(0xb2)))
        .await
        .unwrap();
    assert_eq!(result.status, WithdrawalStatus::Queued);
    assert_eq!(result.wallet_address, wallet(0xb2));
}

#[tokio::test]
async fn test_batch_distribution_success() {
    let ctx = setup(0);
    for (i, name) in ["alice", "bob", "carol"].iter().enumerate() {
        let id = register_with_wallet(&ctx, name, 0xa0 + i as u8).await;
        ctx.ledger
            .issue_reward(
                &id,
                TransactionType::Airdrop,
                100 * COIN_VALUE,
                CreditMeta::default(),
            )
            .await
            .unwrap();
        ctx.ledger
            .request_withdrawal(&id, (10 + i as u64) * COIN_VALUE, None)
            .await
            .unwrap();
    }

    let report = ctx.ledger.run_batch(50).await.unwrap();
    assert_eq!(report.processed, 3);
    assert_eq!(report.distributed, 3);
    assert_eq!(report.failed, 0);
    assert_eq!(report.tx_hash, Some(MOCK_TX_HASH));

    let batch = ctx.ledger.get_batch(report.batch_id.unwrap()).await.unwrap();
    assert_eq!(batch.status, BatchStatus::Confirmed);
    assert_eq!(batch.recipient_count, 3);
    assert_eq!(batch.total_amount, (10 + 11 + 12) * COIN_VALUE);

    for outcome in &report.results {
        let tx = ctx.ledger.get_transaction(outcome.tx_id).await.unwrap();
        assert_eq!(tx.status, TransactionStatus::Distributed);
        assert_eq!(tx.tx_hash, Some(MOCK_TX_HASH));
        assert_eq!(tx.batch_id, report.batch_id);
    }

    // queue drained: a second run has nothing to claim
    let report = ctx.ledger.run_batch(50).await.unwrap();
    assert_eq!(report.processed, 0);
    assert!(report.batch_id.is_none());
}

#[tokio::test]
async fn test_batch_failure_rolls_back_reservations() {
    let ctx = setup(0);
    ctx.chain.set_mode(MockMode::Fail("execution reverted".to_string()));

    let amounts = [10u64, 15, 20];
    let mut users = Vec::new();
    for (i, name) in ["alice", "bob", "carol"].iter().enumerate() {
        let id = register_with_wallet(&ctx, name, 0xa0 + i as u8).await;
        ctx.ledger
            .issue_reward(
                &id,
                TransactionType::Airdrop,
                100 * COIN_VALUE,
                CreditMeta::default(),
            )
            .await
            .unwrap();
        ctx.ledger
            .request_withdrawal(&id, amounts[i] * COIN_VALUE, None)
            .await
            .unwrap();
        users.push(id);
    }

    let report = ctx.ledger.run_batch(50).await.unwrap();
    assert_eq!(report.processed, 3);
    assert_eq!(report.distributed, 0);
    assert_eq!(report.failed, 3);
    assert_eq!(report.error.as_deref(), Some("On-chain submission failed: execution reverted"));

    let batch = ctx.ledger.get_batch(report.batch_id.unwrap()).await.unwrap();
    assert_eq!(batch.status, BatchStatus::Failed);
    assert!(batch.error.is_some());
    assert!(batch.tx_hash.is_none());

    // every reservation was rolled back
    for (i, id) in users.iter().enumerate() {
        let balance = ctx.ledger.get_balance(id).await.unwrap();
        assert_eq!(balance.balance, 100 * COIN_VALUE, "balance of user {}", i);
        assert_eq!(balance.total_withdrawn, 0);
    }

    for outcome in &report.results {
        let tx = ctx.ledger.get_transaction(outcome.tx_id).await.unwrap();
        assert_eq!(tx.status, TransactionStatus::Failed);
        assert!(tx.tx_hash.is_none());
    }
}

#[tokio::test]
async fn test_rollback_is_idempotent() {
    let ctx = setup(0);
    ctx.chain.set_mode(MockMode::Fail("nope".to_string()));

    let alice = register_with_wallet(&ctx, "alice", 0xa1).await;
    ctx.ledger
        .issue_reward(
            &alice,
            TransactionType::Airdrop,
            100 * COIN_VALUE,
            CreditMeta::default(),
        )
        .await
        .unwrap();
    ctx.ledger
        .request_withdrawal(&alice, 40 * COIN_VALUE, None)
        .await
        .unwrap();

    let report = ctx.ledger.run_batch(50).await.unwrap();
    let batch_id = report.batch_id.unwrap();
    let balance = ctx.ledger.get_balance(&alice).await.unwrap();
    assert_eq!(balance.balance, 100 * COIN_VALUE);

    // re-running the rollback must not credit again
    ctx.ledger
        .fail_batch(batch_id, "still nope".to_string())
        .await
        .unwrap();
    let balance = ctx.ledger.get_balance(&alice).await.unwrap();
    assert_eq!(balance.balance, 100 * COIN_VALUE);

    let batch = ctx.ledger.get_batch(batch_id).await.unwrap();
    assert_eq!(batch.error.as_deref(), Some("nope"));
}

#[tokio::test]
async fn test_submission_timeout_is_failure() {
    let ctx = setup(0);
    ctx.chain.set_mode(MockMode::Hang);

    let alice = register_with_wallet(&ctx, "alice", 0xa1).await;
    ctx.ledger
        .issue_reward(
            &alice,
            TransactionType::Airdrop,
            100 * COIN_VALUE,
            CreditMeta::default(),
        )
        .await
        .unwrap();
    ctx.ledger
        .request_withdrawal(&alice, 10 * COIN_VALUE, None)
        .await
        .unwrap();

    let report = ctx.ledger.run_batch(50).await.unwrap();
    assert_eq!(report.failed, 1);

    let batch = ctx.ledger.get_batch(report.batch_id.unwrap()).await.unwrap();
    assert_eq!(batch.status, BatchStatus::Failed);

    let balance = ctx.ledger.get_balance(&alice).await.unwrap();
    assert_eq!(balance.balance, 100 * COIN_VALUE);
}

#[tokio::test]
async fn test_distribution_disabled_refuses_to_run() {
    let ctx = setup_with(0, false, false);
    let err = ledger_error(ctx.ledger.run_batch(50).await);
    assert_eq!(err, LedgerError::DistributionDisabled);
    assert!(!ctx.ledger.distribution_enabled());

    let status = ctx.ledger.get_distribution_status().await.unwrap();
    assert!(!status.enabled);
}

#[tokio::test]
async fn test_instant_withdrawal_fast_path() {
    let ctx = setup_with(0, true, true);
    let alice = register_with_wallet(&ctx, "alice", 0xa1).await;
    ctx.ledger
        .issue_reward(
            &alice,
            TransactionType::Airdrop,
            100 * COIN_VALUE,
            CreditMeta::default(),
        )
        .await
        .unwrap();

    let result = ctx
        .ledger
        .request_withdrawal(&alice, 10 * COIN_VALUE, None)
        .await
        .unwrap();
    assert_eq!(result.status, WithdrawalStatus::Distributed);
    assert_eq!(result.tx_hash, Some(MOCK_TX_HASH));
    assert!(result
        .explorer_url
        .as_deref()
        .is_some_and(|url| url.starts_with("https://scan.example.org/tx/0x")));

    let tx = ctx.ledger.get_transaction(result.tx_id).await.unwrap();
    assert_eq!(tx.status, TransactionStatus::Distributed);
}

#[tokio::test]
async fn test_referral_tier_bonus_and_skim() {
    let ctx = setup(0);
    let referrer = register(&ctx, "referrer").await;

    // four referred signups stay below the Silver threshold
    for i in 0..4 {
        ctx.ledger
            .register_account(&user(&format!("ref-{}", i)), Some(referrer.clone()))
            .await
            .unwrap();
    }
    let balance = ctx.ledger.get_balance(&referrer).await.unwrap();
    assert_eq!(balance.balance, 0);

    // the fifth crosses into Silver and pays the one-time bonus
    ctx.ledger
        .register_account(&user("ref-4"), Some(referrer.clone()))
        .await
        .unwrap();
    let balance = ctx.ledger.get_balance(&referrer).await.unwrap();
    assert_eq!(balance.balance, 50 * COIN_VALUE);

    let stats = ctx.ledger.get_referral_stats(&referrer).await.unwrap();
    assert_eq!(stats.referral_count, 5);
    assert_eq!(stats.tier.label, "Silver");
    assert_eq!(stats.tier.rate_bps, 700);
    assert_eq!(stats.next_tier.as_ref().unwrap().label, "Gold");
    assert_eq!(stats.progress_to_next, 33);

    // a referred user's earning skims 7% to the referrer
    let earner = user("ref-0");
    ctx.ledger
        .claim_post_reward(
            &earner,
            &"post-1".to_string(),
            TransactionType::AdView,
            100 * COIN_VALUE,
            None,
        )
        .await
        .unwrap();

    let balance = ctx.ledger.get_balance(&referrer).await.unwrap();
    assert_eq!(balance.balance, 57 * COIN_VALUE);

    // the bonus entry carries the rate snapshot and the source user
    let (history, _, _) = ctx
        .ledger
        .get_history(&referrer, Some(TransactionType::ReferralBonus), None, None)
        .await
        .unwrap();
    let skim = &history[0];
    assert_eq!(skim.amount, 7 * COIN_VALUE);
    assert_eq!(skim.referral_rate_bps, Some(700));
    assert_eq!(skim.source_user_id, Some(earner.clone()));

    let stats = ctx.ledger.get_referral_stats(&referrer).await.unwrap();
    assert_eq!(stats.total_referral_earnings, 57 * COIN_VALUE);

    // earner pays nothing for it
    let balance = ctx.ledger.get_balance(&earner).await.unwrap();
    assert_eq!(balance.balance, 100 * COIN_VALUE);
}

#[tokio::test]
async fn test_referral_bonus_does_not_cascade() {
    let ctx = setup(0);
    let top = register(&ctx, "top").await;
    let middle = user("middle");
    ctx.ledger
        .register_account(&middle, Some(top.clone()))
        .await
        .unwrap();
    let leaf = user("leaf");
    ctx.ledger
        .register_account(&leaf, Some(middle.clone()))
        .await
        .unwrap();

    // leaf earns: middle gets a skim, top must not get a skim of the skim
    ctx.ledger
        .claim_post_reward(
            &leaf,
            &"post-1".to_string(),
            TransactionType::AdView,
            100 * COIN_VALUE,
            None,
        )
        .await
        .unwrap();

    let middle_balance = ctx.ledger.get_balance(&middle).await.unwrap();
    assert_eq!(middle_balance.balance, 5 * COIN_VALUE);
    let top_balance = ctx.ledger.get_balance(&top).await.unwrap();
    assert_eq!(top_balance.balance, 0);
}

#[tokio::test]
async fn test_leaderboard_orders_by_count() {
    let ctx = setup(0);
    let a = register(&ctx, "a").await;
    let b = register(&ctx, "b").await;
    for i in 0..3 {
        ctx.ledger
            .register_account(&user(&format!("a-ref-{}", i)), Some(a.clone()))
            .await
            .unwrap();
    }
    ctx.ledger
        .register_account(&user("b-ref-0"), Some(b.clone()))
        .await
        .unwrap();

    let leaderboard = ctx.ledger.get_referral_leaderboard(Some(10)).await.unwrap();
    assert_eq!(leaderboard[0], (a, 3));
    assert_eq!(leaderboard[1], (b, 1));
}

#[tokio::test]
async fn test_airdrop_partial_failure() {
    let ctx = setup(0);
    let alice = register(&ctx, "alice").await;
    let bob = register(&ctx, "bob").await;

    let result = ctx
        .ledger
        .airdrop(AirdropParams {
            user_ids: vec![alice.clone(), bob.clone(), user("ghost")],
            amount: 10 * COIN_VALUE,
            description: Some("community drop".to_string()),
            campaign_id: None,
        })
        .await
        .unwrap();

    assert_eq!(result.credited, 2);
    assert_eq!(result.failed, 1);
    assert!(!result.results[2].success);

    let balance = ctx.ledger.get_balance(&alice).await.unwrap();
    assert_eq!(balance.balance, 10 * COIN_VALUE);
}

#[tokio::test]
async fn test_running_totals_reconcile() {
    let ctx = setup(0);
    let alice = register_with_wallet(&ctx, "alice", 0xa1).await;
    ctx.ledger
        .issue_reward(
            &alice,
            TransactionType::Airdrop,
            100 * COIN_VALUE,
            CreditMeta::default(),
        )
        .await
        .unwrap();

    // first withdrawal settles on-chain
    ctx.ledger
        .request_withdrawal(&alice, 40 * COIN_VALUE, None)
        .await
        .unwrap();
    ctx.ledger.run_batch(50).await.unwrap();

    // second withdrawal fails and is rolled back
    ctx.chain.set_mode(MockMode::Fail("reverted".to_string()));
    ctx.ledger
        .request_withdrawal(&alice, 30 * COIN_VALUE, None)
        .await
        .unwrap();
    ctx.ledger.run_batch(50).await.unwrap();

    // rolled-back withdrawals leave no trace in the totals
    let balance = ctx.ledger.get_balance(&alice).await.unwrap();
    assert_eq!(balance.total_earned, 100 * COIN_VALUE);
    assert_eq!(balance.total_withdrawn, 40 * COIN_VALUE);
    assert_eq!(balance.balance, 60 * COIN_VALUE);
    assert_eq!(
        balance.total_earned - balance.total_withdrawn,
        balance.balance
    );
}

#[tokio::test]
async fn test_history_filter_and_pagination() {
    let ctx = setup(0);
    let alice = register_with_wallet(&ctx, "alice", 0xa1).await;
    for i in 0..5 {
        ctx.ledger
            .claim_post_reward(
                &alice,
                &format!("post-{}", i),
                TransactionType::AdView,
                COIN_VALUE,
                None,
            )
            .await
            .unwrap();
    }
    ctx.ledger
        .request_withdrawal(&alice, 2 * COIN_VALUE, None)
        .await
        .unwrap();

    // newest first
    let (all, _, _) = ctx.ledger.get_history(&alice, None, None, None).await.unwrap();
    assert_eq!(all.len(), 6);
    assert_eq!(all[0].kind, TransactionType::Withdrawal);

    let (views, _, _) = ctx
        .ledger
        .get_history(&alice, Some(TransactionType::AdView), None, None)
        .await
        .unwrap();
    assert_eq!(views.len(), 5);

    let (page, skip, limit) = ctx
        .ledger
        .get_history(&alice, Some(TransactionType::AdView), Some(2), Some(2))
        .await
        .unwrap();
    assert_eq!((skip, limit), (2, 2));
    assert_eq!(page.len(), 2);
    assert_eq!(page[0].post_id.as_deref(), Some("post-2"));
}

#[tokio::test]
async fn test_claim_key_constraint_in_storage() {
    // the compare_and_swap insert is the authoritative guard
    let dir = TempDir::new("pulse-claims-test").unwrap();
    let mut storage = SledStorage::new(dir.path().to_str().unwrap()).unwrap();

    let alice = user("alice");
    let post = "post-1".to_string();
    assert!(storage
        .insert_claim(&alice, &post, TransactionType::AdView, 1)
        .await
        .unwrap());
    assert!(!storage
        .insert_claim(&alice, &post, TransactionType::AdView, 2)
        .await
        .unwrap());
    assert!(storage
        .has_claim(&alice, &post, TransactionType::AdView)
        .await
        .unwrap());

    // separated key spaces per type and per post
    assert!(storage
        .insert_claim(&alice, &post, TransactionType::AdEngagement, 3)
        .await
        .unwrap());
    assert!(storage
        .insert_claim(&alice, &"post-2".to_string(), TransactionType::AdView, 4)
        .await
        .unwrap());
}

#[tokio::test]
async fn test_pending_queue_is_oldest_first() {
    let ctx = setup(0);
    let alice = register_with_wallet(&ctx, "alice", 0xa1).await;
    let bob = register_with_wallet(&ctx, "bob", 0xb2).await;
    for id in [&alice, &bob] {
        ctx.ledger
            .issue_reward(
                id,
                TransactionType::Airdrop,
                100 * COIN_VALUE,
                CreditMeta::default(),
            )
            .await
            .unwrap();
    }

    let first = ctx
        .ledger
        .request_withdrawal(&alice, 10 * COIN_VALUE, None)
        .await
        .unwrap();
    let second = ctx
        .ledger
        .request_withdrawal(&bob, 20 * COIN_VALUE, None)
        .await
        .unwrap();

    // a size-one batch picks the oldest entry only
    let report = ctx.ledger.run_batch(1).await.unwrap();
    assert_eq!(report.processed, 1);
    assert_eq!(report.results[0].tx_id, first.tx_id);

    let report = ctx.ledger.run_batch(1).await.unwrap();
    assert_eq!(report.results[0].tx_id, second.tx_id);
}
