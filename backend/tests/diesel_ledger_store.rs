//! Integration tests for the Diesel ledger store and account repository
//! against embedded PostgreSQL.

use std::sync::Arc;
use std::time::Duration;

use merch_ledger::domain::ports::{
    AccountRepository, AccountRepositoryError, AggregateCacheKey, LedgerOperations, LedgerStore,
    LedgerStoreError,
};
use merch_ledger::domain::{
    AccountId, CoinAmount, CredentialHash, InventoryLine, ItemName, LedgerService, NewAccount,
    ReceivedTransfer, STARTING_BALANCE, SentTransfer, Username,
};
use merch_ledger::outbound::memory::InMemoryAggregateCache;
use merch_ledger::outbound::persistence::{
    DbPool, DieselAccountRepository, DieselLedgerStore, PoolConfig,
};
use pg_embedded_setup_unpriv::TestCluster;
use postgres::{Client, NoTls};
use rstest::{fixture, rstest};
use tokio::runtime::Runtime;

#[path = "support/pg_embed.rs"]
mod pg_embed;

mod support;

use pg_embed::test_cluster;
use support::{handle_cluster_setup_failure, migrate_schema, reset_database};

struct TestContext {
    runtime: Runtime,
    _cluster: TestCluster,
    database_url: String,
    store: DieselLedgerStore,
    accounts: DieselAccountRepository,
}

impl TestContext {
    fn register(&self, username: &str) -> AccountId {
        self.runtime
            .block_on(self.accounts.create(&NewAccount {
                username: name(username),
                credential_hash: CredentialHash::new("$argon2id$test"),
            }))
            .expect("registration succeeds")
            .id
    }

    fn balance(&self, account: AccountId) -> i64 {
        self.runtime
            .block_on(self.store.holdings(account))
            .expect("holdings load")
            .balance
    }
}

fn name(raw: &str) -> Username {
    Username::new(raw).expect("valid username")
}

fn item(raw: &str) -> ItemName {
    ItemName::new(raw).expect("valid item")
}

fn coins(value: i64) -> CoinAmount {
    CoinAmount::new(value).expect("positive amount")
}

fn setup_context(database: &str) -> Result<TestContext, String> {
    let runtime = Runtime::new().map_err(|err| err.to_string())?;
    let cluster = test_cluster()?;
    reset_database(&cluster, database)?;
    let database_url = cluster.connection().database_url(database);
    migrate_schema(&database_url)?;

    let config = PoolConfig::new(database_url.as_str()).with_max_size(8);
    let pool = runtime
        .block_on(DbPool::new(config))
        .map_err(|err| err.to_string())?;

    Ok(TestContext {
        runtime,
        _cluster: cluster,
        database_url,
        store: DieselLedgerStore::new(pool.clone()),
        accounts: DieselAccountRepository::new(pool),
    })
}

#[fixture]
fn ledger_context() -> Option<TestContext> {
    let database = format!("ledger_{}", uuid::Uuid::new_v4().simple());
    match setup_context(&database) {
        Ok(ctx) => Some(ctx),
        Err(reason) => handle_cluster_setup_failure(reason),
    }
}

#[rstest]
fn registration_uses_starting_balance_and_rejects_duplicates(ledger_context: Option<TestContext>) {
    let Some(context) = ledger_context else {
        return;
    };

    let alice = context.register("alice");
    assert_eq!(context.balance(alice), STARTING_BALANCE);

    let duplicate = context
        .runtime
        .block_on(context.accounts.create(&NewAccount {
            username: name("alice"),
            credential_hash: CredentialHash::new("other"),
        }))
        .expect_err("duplicate rejected");
    assert_eq!(
        duplicate,
        AccountRepositoryError::duplicate_username("alice")
    );

    let found = context
        .runtime
        .block_on(context.accounts.find_by_username(&name("alice")))
        .expect("lookup succeeds")
        .expect("alice exists");
    assert_eq!(found.id, alice);
}

#[rstest]
fn transfer_moves_coins_and_records_both_directions(ledger_context: Option<TestContext>) {
    let Some(context) = ledger_context else {
        return;
    };
    let alice = context.register("alice");
    let bob = context.register("bob");

    let receipt = context
        .runtime
        .block_on(context.store.transfer_coins(alice, &name("bob"), coins(300)))
        .expect("transfer succeeds");

    assert_eq!(receipt.recipient, bob);
    assert_eq!(context.balance(alice), 700);
    assert_eq!(context.balance(bob), 1300);

    let bob_history = context
        .runtime
        .block_on(context.store.transaction_history(bob))
        .expect("history loads");
    assert_eq!(
        bob_history.received,
        vec![ReceivedTransfer {
            from_user: "alice".to_owned(),
            amount: 300
        }]
    );
    let alice_history = context
        .runtime
        .block_on(context.store.transaction_history(alice))
        .expect("history loads");
    assert_eq!(
        alice_history.sent,
        vec![SentTransfer {
            to_user: "bob".to_owned(),
            amount: 300
        }]
    );
}

#[rstest]
fn rejected_transfers_leave_balances_untouched(ledger_context: Option<TestContext>) {
    let Some(context) = ledger_context else {
        return;
    };
    let alice = context.register("alice");
    let bob = context.register("bob");

    let rejections = [
        (
            context
                .runtime
                .block_on(context.store.transfer_coins(alice, &name("bob"), coins(1001))),
            LedgerStoreError::insufficient_funds(1000_i64, 1001_i64),
        ),
        (
            context
                .runtime
                .block_on(context.store.transfer_coins(alice, &name("alice"), coins(1))),
            LedgerStoreError::incorrect_receiver(),
        ),
        (
            context
                .runtime
                .block_on(context.store.transfer_coins(alice, &name("ghost"), coins(1))),
            LedgerStoreError::user_not_found("ghost"),
        ),
        (
            context.runtime.block_on(context.store.transfer_coins(
                AccountId::new(9_999),
                &name("bob"),
                coins(1),
            )),
            LedgerStoreError::account_not_found(9_999_i64),
        ),
    ];
    for (result, expected) in rejections {
        assert_eq!(result.expect_err("transfer rejected"), expected);
    }

    assert_eq!(context.balance(alice), 1000);
    assert_eq!(context.balance(bob), 1000);
    let history = context
        .runtime
        .block_on(context.store.transaction_history(alice))
        .expect("history loads");
    assert!(history.sent.is_empty());
}

#[rstest]
fn purchases_upsert_inventory_and_check_funds(ledger_context: Option<TestContext>) {
    let Some(context) = ledger_context else {
        return;
    };
    let alice = context.register("alice");

    for expected in 1..=3 {
        let receipt = context
            .runtime
            .block_on(context.store.purchase_item(alice, &item("hoody")))
            .expect("purchase succeeds");
        assert_eq!(receipt.price, 300);
        assert_eq!(receipt.quantity, expected);
    }
    let error = context
        .runtime
        .block_on(context.store.purchase_item(alice, &item("hoody")))
        .expect_err("fourth hoody unaffordable");
    assert_eq!(
        error,
        LedgerStoreError::insufficient_funds(100_i64, 300_i64)
    );
    context
        .runtime
        .block_on(context.store.purchase_item(alice, &item("cup")))
        .expect("cup affordable");

    let unknown = context
        .runtime
        .block_on(context.store.purchase_item(alice, &item("yacht")))
        .expect_err("unknown item");
    assert_eq!(unknown, LedgerStoreError::item_not_found("yacht"));

    let holdings = context
        .runtime
        .block_on(context.store.holdings(alice))
        .expect("holdings load");
    assert_eq!(holdings.balance, 80);
    assert_eq!(
        holdings.inventory,
        vec![
            InventoryLine {
                item: "cup".to_owned(),
                quantity: 1
            },
            InventoryLine {
                item: "hoody".to_owned(),
                quantity: 3
            },
        ]
    );
}

#[rstest]
fn service_caches_snapshot_and_invalidates_after_transfer(ledger_context: Option<TestContext>) {
    let Some(context) = ledger_context else {
        return;
    };
    let alice = context.register("alice");
    let bob = context.register("bob");
    let cache = Arc::new(InMemoryAggregateCache::default());
    let service = LedgerService::new(
        Arc::new(context.store.clone()),
        cache.clone(),
        merch_ledger::domain::DEFAULT_CACHE_TTL,
    );

    let before = context
        .runtime
        .block_on(service.aggregate_view(bob))
        .expect("view builds");
    assert_eq!(before.coins, 1000);
    assert!(cache.contains(&AggregateCacheKey::for_account(bob)));

    context
        .runtime
        .block_on(service.send_coins(alice, &name("bob"), coins(250)))
        .expect("transfer succeeds");
    assert!(!cache.contains(&AggregateCacheKey::for_account(alice)));
    assert!(!cache.contains(&AggregateCacheKey::for_account(bob)));

    let after = context
        .runtime
        .block_on(service.aggregate_view(bob))
        .expect("view rebuilds");
    assert_eq!(after.coins, 1250);
    assert_eq!(after.coin_history.received.len(), 1);
}

#[rstest]
fn opposite_direction_transfers_do_not_deadlock(ledger_context: Option<TestContext>) {
    let Some(context) = ledger_context else {
        return;
    };
    let alice = context.register("alice");
    let bob = context.register("bob");
    let store = Arc::new(context.store.clone());

    context.runtime.block_on(async {
        let mut tasks = Vec::new();
        for round in 0..40 {
            let store = Arc::clone(&store);
            tasks.push(tokio::spawn(async move {
                if round % 2 == 0 {
                    store.transfer_coins(alice, &name("bob"), coins(7)).await
                } else {
                    store.transfer_coins(bob, &name("alice"), coins(5)).await
                }
            }));
        }
        for task in tasks {
            task.await.expect("task joins").expect("transfer succeeds");
        }
    });

    let alice_balance = context.balance(alice);
    let bob_balance = context.balance(bob);
    assert_eq!(alice_balance + bob_balance, 2000);
    assert_eq!(alice_balance, 1000 - 20 * 7 + 20 * 5);
}

#[rstest]
fn cancelled_transfer_rolls_back_and_pool_recovers(ledger_context: Option<TestContext>) {
    let Some(context) = ledger_context else {
        return;
    };
    let alice = context.register("alice");
    let bob = context.register("bob");

    let mut locker = Client::connect(&context.database_url, NoTls).expect("locker connects");
    let mut row_lock = locker.transaction().expect("locker transaction");
    row_lock
        .query(
            "SELECT balance FROM accounts WHERE id = $1 FOR UPDATE",
            &[&alice.get()],
        )
        .expect("sender row locked");

    let outcome = context.runtime.block_on(tokio::time::timeout(
        Duration::from_millis(300),
        context.store.transfer_coins(alice, &name("bob"), coins(100)),
    ));
    assert!(outcome.is_err(), "transfer should still be waiting on the row lock");
    row_lock.rollback().expect("lock released");

    assert_eq!(context.balance(alice), 1000);
    assert_eq!(context.balance(bob), 1000);
    let history = context
        .runtime
        .block_on(context.store.transaction_history(bob))
        .expect("history loads");
    assert!(history.received.is_empty());

    let follow_up = context
        .runtime
        .block_on(tokio::time::timeout(
            Duration::from_secs(10),
            context.store.transfer_coins(alice, &name("bob"), coins(100)),
        ))
        .expect("pool hands out a usable connection")
        .expect("transfer succeeds");
    assert_eq!(follow_up.recipient, bob);
    assert_eq!(context.balance(alice), 900);
    assert_eq!(context.balance(bob), 1100);
}
