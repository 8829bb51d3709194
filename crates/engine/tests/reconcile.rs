use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use async_trait::async_trait;
use sea_orm::DbErr;
use tokio::task::JoinSet;
use uuid::Uuid;

use engine::{
    CatalogStore, EngineError, LedgerStore, MemoryStore, Money, NewTransaction, Operation,
    Reconciler, ResultEngine, Step, Theme, Transaction, TransactionEdits, TransactionFilter,
    TransactionKind, Wallet,
};

async fn seeded(balance: i64) -> (MemoryStore, Wallet, Theme) {
    let store = MemoryStore::new();
    let wallet = store
        .insert_wallet(&Wallet::new(
            "alice".to_string(),
            "Main".to_string(),
            Money::new(balance),
        ))
        .await
        .unwrap();
    let theme = store
        .insert_theme(&Theme::new(wallet.id, "Food".to_string(), Money::new(50_000)))
        .await
        .unwrap();
    (store, wallet, theme)
}

fn expense(wallet: &Wallet, theme: &Theme, amount: i64) -> NewTransaction {
    NewTransaction {
        wallet_id: wallet.id,
        theme_id: Some(theme.id),
        description: "groceries".to_string(),
        amount: Money::new(amount),
        kind: TransactionKind::Expense,
    }
}

fn income(wallet: &Wallet, amount: i64) -> NewTransaction {
    NewTransaction {
        wallet_id: wallet.id,
        theme_id: None,
        description: "salary".to_string(),
        amount: Money::new(amount),
        kind: TransactionKind::Income,
    }
}

async fn balances(store: &MemoryStore, wallet: &Wallet, theme: &Theme) -> (Money, Money) {
    (
        store.wallet_balance(wallet.id).await.unwrap(),
        store.theme_spent(theme.id).await.unwrap(),
    )
}

#[tokio::test]
async fn full_lifecycle_settles_wallet_and_theme() {
    let (store, wallet, theme) = seeded(100_000).await;
    let reconciler = Reconciler::new(Arc::new(store.clone()));

    let a = reconciler
        .apply_create(expense(&wallet, &theme, 20_000))
        .await
        .unwrap();
    assert_eq!(
        balances(&store, &wallet, &theme).await,
        (Money::new(80_000), Money::new(20_000))
    );

    let b = reconciler.apply_create(income(&wallet, 50_000)).await.unwrap();
    assert_eq!(a.wallet_balances[&wallet.id], Money::new(80_000));
    assert_eq!(b.wallet_balances[&wallet.id], Money::new(130_000));

    let mut edits = TransactionEdits::from_transaction(&a.transaction);
    edits.amount = Money::new(30_000);
    let edited = reconciler.apply_update(&a.transaction, edits).await.unwrap();
    assert_eq!(edited.theme_spends[&theme.id], Money::new(30_000));
    assert_eq!(
        balances(&store, &wallet, &theme).await,
        (Money::new(120_000), Money::new(30_000))
    );

    reconciler.apply_delete(&b.transaction).await.unwrap();
    assert_eq!(
        balances(&store, &wallet, &theme).await,
        (Money::new(70_000), Money::new(30_000))
    );
    assert!(store.transaction(b.transaction.id).await.unwrap().is_none());
}

#[tokio::test]
async fn create_then_delete_leaves_no_trace() {
    let (store, wallet, theme) = seeded(10_000).await;
    let reconciler = Reconciler::new(Arc::new(store.clone()));

    let applied = reconciler
        .apply_create(expense(&wallet, &theme, 2_500))
        .await
        .unwrap();
    assert_eq!(
        applied.steps,
        vec![Step::InsertTransaction, Step::ApplyWallet, Step::ApplyTheme]
    );

    let removed = reconciler.apply_delete(&applied.transaction).await.unwrap();
    assert_eq!(removed.operation, Operation::Delete);
    assert_eq!(
        balances(&store, &wallet, &theme).await,
        (Money::new(10_000), Money::ZERO)
    );
}

#[tokio::test]
async fn update_matches_delete_followed_by_create() {
    let (left, left_wallet, left_theme) = seeded(40_000).await;
    let (right, right_wallet, right_theme) = seeded(40_000).await;
    let left_rec = Reconciler::new(Arc::new(left.clone()));
    let right_rec = Reconciler::new(Arc::new(right.clone()));

    let original = left_rec
        .apply_create(expense(&left_wallet, &left_theme, 7_000))
        .await
        .unwrap()
        .transaction;
    let mut edits = TransactionEdits::from_transaction(&original);
    edits.amount = Money::new(12_000);
    left_rec.apply_update(&original, edits).await.unwrap();

    let original = right_rec
        .apply_create(expense(&right_wallet, &right_theme, 7_000))
        .await
        .unwrap()
        .transaction;
    right_rec.apply_delete(&original).await.unwrap();
    right_rec
        .apply_create(expense(&right_wallet, &right_theme, 12_000))
        .await
        .unwrap();

    assert_eq!(
        balances(&left, &left_wallet, &left_theme).await,
        balances(&right, &right_wallet, &right_theme).await
    );
}

#[tokio::test]
async fn theme_spend_is_floored_at_zero() {
    let (store, wallet, theme) = seeded(10_000).await;
    let reconciler = Reconciler::new(Arc::new(store.clone()));

    let applied = reconciler
        .apply_create(expense(&wallet, &theme, 4_000))
        .await
        .unwrap();
    // Someone zeroed the spend out of band.
    store.set_theme_spent(theme.id, Money::ZERO).await.unwrap();

    let removed = reconciler.apply_delete(&applied.transaction).await.unwrap();
    assert_eq!(removed.theme_spends[&theme.id], Money::ZERO);
    assert_eq!(
        balances(&store, &wallet, &theme).await,
        (Money::new(10_000), Money::ZERO)
    );
}

#[tokio::test]
async fn switching_expense_to_income_moves_the_full_amount_back() {
    let (store, wallet, theme) = seeded(100_000).await;
    let reconciler = Reconciler::new(Arc::new(store.clone()));

    let applied = reconciler
        .apply_create(expense(&wallet, &theme, 50_000))
        .await
        .unwrap();
    assert_eq!(
        balances(&store, &wallet, &theme).await,
        (Money::new(50_000), Money::new(50_000))
    );

    let mut edits = TransactionEdits::from_transaction(&applied.transaction);
    edits.kind = TransactionKind::Income;
    edits.theme_id = None;
    let switched = reconciler
        .apply_update(&applied.transaction, edits)
        .await
        .unwrap();

    assert_eq!(switched.transaction.kind, TransactionKind::Income);
    assert_eq!(switched.transaction.created_at, applied.transaction.created_at);
    assert_eq!(
        balances(&store, &wallet, &theme).await,
        (Money::new(150_000), Money::ZERO)
    );
}

#[tokio::test]
async fn moving_an_expense_between_wallets_updates_both() {
    let (store, wallet, theme) = seeded(10_000).await;
    let other = store
        .insert_wallet(&Wallet::new(
            "alice".to_string(),
            "Savings".to_string(),
            Money::new(5_000),
        ))
        .await
        .unwrap();
    let other_theme = store
        .insert_theme(&Theme::new(other.id, "Rent".to_string(), Money::new(9_000)))
        .await
        .unwrap();
    let reconciler = Reconciler::new(Arc::new(store.clone()));

    let applied = reconciler
        .apply_create(expense(&wallet, &theme, 1_000))
        .await
        .unwrap();
    let mut edits = TransactionEdits::from_transaction(&applied.transaction);
    edits.wallet_id = other.id;
    edits.theme_id = Some(other_theme.id);
    reconciler
        .apply_update(&applied.transaction, edits)
        .await
        .unwrap();

    assert_eq!(
        balances(&store, &wallet, &theme).await,
        (Money::new(10_000), Money::ZERO)
    );
    assert_eq!(
        balances(&store, &other, &other_theme).await,
        (Money::new(4_000), Money::new(1_000))
    );
}

#[tokio::test]
async fn invalid_input_is_rejected_before_any_write() {
    let (store, wallet, theme) = seeded(10_000).await;
    let reconciler = Reconciler::new(Arc::new(store.clone()));

    let mut zero = expense(&wallet, &theme, 0);
    assert!(matches!(
        reconciler.apply_create(zero.clone()).await,
        Err(EngineError::Validation(_))
    ));
    zero.amount = Money::new(100);
    zero.theme_id = None;
    assert!(matches!(
        reconciler.apply_create(zero).await,
        Err(EngineError::Validation(_))
    ));

    let mut themed_income = income(&wallet, 100);
    themed_income.theme_id = Some(theme.id);
    assert!(matches!(
        reconciler.apply_create(themed_income).await,
        Err(EngineError::Validation(_))
    ));

    let mut blank = income(&wallet, 100);
    blank.description = "   ".to_string();
    assert!(matches!(
        reconciler.apply_create(blank).await,
        Err(EngineError::Validation(_))
    ));

    assert_eq!(
        balances(&store, &wallet, &theme).await,
        (Money::new(10_000), Money::ZERO)
    );
}

#[tokio::test]
async fn theme_from_another_wallet_is_not_found() {
    let (store, wallet, _theme) = seeded(10_000).await;
    let other = store
        .insert_wallet(&Wallet::new(
            "alice".to_string(),
            "Savings".to_string(),
            Money::ZERO,
        ))
        .await
        .unwrap();
    let foreign_theme = store
        .insert_theme(&Theme::new(other.id, "Rent".to_string(), Money::new(9_000)))
        .await
        .unwrap();
    let reconciler = Reconciler::new(Arc::new(store.clone()));

    let mut input = income(&wallet, 100);
    input.kind = TransactionKind::Expense;
    input.theme_id = Some(foreign_theme.id);
    assert!(matches!(
        reconciler.apply_create(input).await,
        Err(EngineError::KeyNotFound(_))
    ));
    assert_eq!(store.wallet_balance(wallet.id).await.unwrap(), Money::new(10_000));
}

#[tokio::test]
async fn overflowing_amount_is_rejected_before_the_record_write() {
    let (store, wallet, theme) = seeded(i64::MAX - 10).await;
    let reconciler = Reconciler::new(Arc::new(store.clone()));

    let err = reconciler
        .apply_create(income(&wallet, 100))
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::Validation("amount too large".to_string()));
    assert_eq!(
        balances(&store, &wallet, &theme).await,
        (Money::new(i64::MAX - 10), Money::ZERO)
    );
    assert!(
        store
            .list_transactions(&TransactionFilter {
                wallet_ids: vec![wallet.id],
                ..Default::default()
            })
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn overflowing_edit_leaves_the_record_untouched() {
    let (store, wallet, theme) = seeded(i64::MAX - 1_000).await;
    let reconciler = Reconciler::new(Arc::new(store.clone()));
    let applied = reconciler.apply_create(income(&wallet, 500)).await.unwrap();

    let mut edits = TransactionEdits::from_transaction(&applied.transaction);
    edits.amount = Money::new(5_000);
    let err = reconciler
        .apply_update(&applied.transaction, edits)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    let stored = store
        .transaction(applied.transaction.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.amount, Money::new(500));
    assert_eq!(
        balances(&store, &wallet, &theme).await,
        (Money::new(i64::MAX - 500), Money::ZERO)
    );
}

#[tokio::test]
async fn memory_store_increments_refuse_to_overflow() {
    let (store, wallet, theme) = seeded(i64::MAX).await;

    assert!(matches!(
        store.increment_wallet_balance(wallet.id, Money::new(1)).await,
        Err(EngineError::Validation(_))
    ));
    store
        .set_theme_spent(theme.id, Money::new(i64::MAX))
        .await
        .unwrap();
    assert!(matches!(
        store.increment_theme_spent(theme.id, Money::new(1)).await,
        Err(EngineError::Validation(_))
    ));
    assert_eq!(
        balances(&store, &wallet, &theme).await,
        (Money::new(i64::MAX), Money::new(i64::MAX))
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_creates_do_not_lose_updates() {
    let (store, wallet, theme) = seeded(1_000_000).await;
    let reconciler = Reconciler::new(Arc::new(store.clone()));

    let mut tasks = JoinSet::new();
    for i in 1..=50i64 {
        let reconciler = reconciler.clone();
        let input = if i % 2 == 0 {
            income(&wallet, i * 10)
        } else {
            expense(&wallet, &theme, i * 10)
        };
        tasks.spawn(async move { reconciler.apply_create(input).await });
    }
    while let Some(res) = tasks.join_next().await {
        res.unwrap().unwrap();
    }

    let incomes: i64 = (1..=50i64).filter(|i| i % 2 == 0).map(|i| i * 10).sum();
    let expenses: i64 = (1..=50i64).filter(|i| i % 2 == 1).map(|i| i * 10).sum();
    assert_eq!(
        balances(&store, &wallet, &theme).await,
        (
            Money::new(1_000_000 + incomes - expenses),
            Money::new(expenses)
        )
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_edits_and_deletes_settle_exactly() {
    let (store, wallet, theme) = seeded(100_000).await;
    let reconciler = Reconciler::new(Arc::new(store.clone()));

    let mut created = Vec::new();
    for _ in 0..20 {
        let applied = reconciler
            .apply_create(expense(&wallet, &theme, 1_000))
            .await
            .unwrap();
        created.push(applied.transaction);
    }

    // Double the first half, delete the second half.
    let mut tasks = JoinSet::new();
    for (i, tx) in created.into_iter().enumerate() {
        let reconciler = reconciler.clone();
        tasks.spawn(async move {
            if i < 10 {
                let mut edits = TransactionEdits::from_transaction(&tx);
                edits.amount = Money::new(2_000);
                reconciler.apply_update(&tx, edits).await
            } else {
                reconciler.apply_delete(&tx).await
            }
        });
    }
    while let Some(res) = tasks.join_next().await {
        res.unwrap().unwrap();
    }

    assert_eq!(
        balances(&store, &wallet, &theme).await,
        (Money::new(80_000), Money::new(20_000))
    );
}

/// Delegates to a [`MemoryStore`] and fails the chosen kind of write.
#[derive(Default)]
struct FlakyStore {
    inner: MemoryStore,
    fail_record: AtomicBool,
    fail_wallet: AtomicBool,
    fail_theme: AtomicBool,
}

impl FlakyStore {
    fn new(inner: MemoryStore) -> Self {
        Self {
            inner,
            ..Default::default()
        }
    }

    fn check(flag: &AtomicBool) -> ResultEngine<()> {
        if flag.load(Ordering::SeqCst) {
            return Err(DbErr::Custom("injected failure".to_string()).into());
        }
        Ok(())
    }
}

#[async_trait]
impl LedgerStore for FlakyStore {
    async fn insert_transaction(&self, tx: &Transaction) -> ResultEngine<Transaction> {
        Self::check(&self.fail_record)?;
        self.inner.insert_transaction(tx).await
    }

    async fn update_transaction(&self, tx: &Transaction) -> ResultEngine<Transaction> {
        Self::check(&self.fail_record)?;
        self.inner.update_transaction(tx).await
    }

    async fn delete_transaction(&self, id: Uuid) -> ResultEngine<()> {
        Self::check(&self.fail_record)?;
        self.inner.delete_transaction(id).await
    }

    async fn transaction(&self, id: Uuid) -> ResultEngine<Option<Transaction>> {
        self.inner.transaction(id).await
    }

    async fn wallet_balance(&self, wallet_id: Uuid) -> ResultEngine<Money> {
        self.inner.wallet_balance(wallet_id).await
    }

    async fn set_wallet_balance(&self, wallet_id: Uuid, balance: Money) -> ResultEngine<()> {
        self.inner.set_wallet_balance(wallet_id, balance).await
    }

    async fn increment_wallet_balance(
        &self,
        wallet_id: Uuid,
        delta: Money,
    ) -> ResultEngine<Money> {
        Self::check(&self.fail_wallet)?;
        self.inner.increment_wallet_balance(wallet_id, delta).await
    }

    async fn theme(&self, theme_id: Uuid) -> ResultEngine<Option<Theme>> {
        self.inner.theme(theme_id).await
    }

    async fn theme_spent(&self, theme_id: Uuid) -> ResultEngine<Money> {
        self.inner.theme_spent(theme_id).await
    }

    async fn set_theme_spent(&self, theme_id: Uuid, spent: Money) -> ResultEngine<()> {
        self.inner.set_theme_spent(theme_id, spent).await
    }

    async fn increment_theme_spent(&self, theme_id: Uuid, delta: Money) -> ResultEngine<Money> {
        Self::check(&self.fail_theme)?;
        self.inner.increment_theme_spent(theme_id, delta).await
    }
}

#[tokio::test]
async fn failed_record_write_aborts_cleanly() {
    let (store, wallet, theme) = seeded(10_000).await;
    let flaky = Arc::new(FlakyStore::new(store.clone()));
    flaky.fail_record.store(true, Ordering::SeqCst);
    let reconciler = Reconciler::new(Arc::clone(&flaky));

    let err = reconciler
        .apply_create(expense(&wallet, &theme, 1_000))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Database(_)));
    assert_eq!(
        balances(&store, &wallet, &theme).await,
        (Money::new(10_000), Money::ZERO)
    );
}

#[tokio::test]
async fn failed_theme_step_reports_partial_reconciliation() {
    let (store, wallet, theme) = seeded(10_000).await;
    let flaky = Arc::new(FlakyStore::new(store.clone()));
    flaky.fail_theme.store(true, Ordering::SeqCst);
    let reconciler = Reconciler::new(Arc::clone(&flaky));

    let err = reconciler
        .apply_create(expense(&wallet, &theme, 1_000))
        .await
        .unwrap_err();
    let EngineError::PartialReconciliation(partial) = err else {
        panic!("expected a partial reconciliation");
    };
    assert_eq!(partial.operation, Operation::Create);
    assert_eq!(
        partial.committed,
        vec![Step::InsertTransaction, Step::ApplyWallet]
    );
    assert_eq!(partial.failed, Step::ApplyTheme);
    assert!(partial.pending.is_empty());
    assert!(matches!(*partial.cause, EngineError::Database(_)));

    // The committed steps stay committed.
    assert_eq!(
        balances(&store, &wallet, &theme).await,
        (Money::new(9_000), Money::ZERO)
    );
}

#[tokio::test]
async fn failed_reversal_lists_the_pending_steps() {
    let (store, wallet, theme) = seeded(10_000).await;
    let flaky = Arc::new(FlakyStore::new(store.clone()));
    let reconciler = Reconciler::new(Arc::clone(&flaky));

    let applied = reconciler
        .apply_create(expense(&wallet, &theme, 1_000))
        .await
        .unwrap();

    flaky.fail_wallet.store(true, Ordering::SeqCst);
    let mut edits = TransactionEdits::from_transaction(&applied.transaction);
    edits.amount = Money::new(3_000);
    let err = reconciler
        .apply_update(&applied.transaction, edits)
        .await
        .unwrap_err();

    let EngineError::PartialReconciliation(partial) = err else {
        panic!("expected a partial reconciliation");
    };
    assert_eq!(partial.operation, Operation::Update);
    assert_eq!(partial.committed, vec![Step::UpdateTransaction]);
    assert_eq!(partial.failed, Step::ReverseWallet);
    assert_eq!(
        partial.pending,
        vec![Step::ReverseTheme, Step::ApplyWallet, Step::ApplyTheme]
    );

    let stored = store
        .transaction(applied.transaction.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.amount, Money::new(3_000));
}
