//! Compile-only tests for the PostgreSQL driver API.
//!
//! These tests verify that key API surfaces compile correctly.
//! They do NOT execute against a database; they only check types and signatures.

#![allow(dead_code)]

use sqlhook::{
    BoxError, Context, Db, DbResult, Facade, FromRow, IsolationLevel, PgConnector,
    RowExt, TransactionOptions, scan_fn,
};
use tokio_postgres::Row;

#[derive(Debug)]
struct Account {
    id: i64,
    owner: String,
    balance: i64,
}

impl FromRow<Row> for Account {
    fn from_row(row: &Row) -> Result<Self, BoxError> {
        Ok(Self {
            id: row.try_get_column("id")?,
            owner: row.try_get_column("owner")?,
            balance: row.try_get_column("balance")?,
        })
    }
}

fn assert_send<T: Send>(_: &T) {}

async fn _connect_and_query_compiles(database_url: &str) -> DbResult<()> {
    let ctx = Context::background();
    let db: Db<tokio_postgres::Client> =
        Db::connect(&ctx, &PgConnector::no_tls(), database_url).await?;

    let mut account: Option<Account> = None;
    db.fetch_one(&ctx, &mut account, "SELECT * FROM accounts WHERE id = $1", &[&1_i64])
        .await?;

    let mut accounts: Vec<Account> = Vec::new();
    db.fetch_many(&ctx, &mut accounts, "SELECT * FROM accounts", &[])
        .await?;

    let mut total = 0_i64;
    db.fetch_many(
        &ctx,
        &mut scan_fn(|row: &Row| {
            total += row.try_get::<_, i64>("balance")?;
            Ok(())
        }),
        "SELECT balance FROM accounts",
        &[],
    )
    .await?;

    let affected: u64 = db
        .execute(&ctx, "DELETE FROM accounts WHERE balance = 0", &[])
        .await?;
    let _ = affected;
    Ok(())
}

async fn _transaction_with_options_compiles(db: &mut Db<tokio_postgres::Client>) -> DbResult<()> {
    let ctx = Context::background().with_timeout(std::time::Duration::from_secs(5));
    let opts = TransactionOptions::new()
        .isolation_level(IsolationLevel::RepeatableRead)
        .read_only(false);

    let tx = db.begin_with(&ctx, &opts).await?;
    tx.execute(&ctx, "UPDATE accounts SET balance = balance - $1 WHERE id = $2", &[&10_i64, &1_i64])
        .await?;
    tx.commit(&ctx).await?;

    let tx = db.begin(&ctx).await?;
    tx.rollback(&ctx).await?;
    Ok(())
}

async fn _futures_are_send(db: &mut Db<tokio_postgres::Client>) {
    let ctx = Context::background();
    let mut accounts: Vec<Account> = Vec::new();
    assert_send(&db.fetch_many(&ctx, &mut accounts, "SELECT * FROM accounts", &[]));
    assert_send(&db.execute(&ctx, "SELECT 1", &[]));
    assert_send(&db.begin(&ctx));
}

async fn _facade_accepts_connection_and_transaction(
    db: &mut Db<tokio_postgres::Client>,
) -> DbResult<()> {
    async fn owners(f: &impl Facade<Row = Row>, ctx: &Context) -> DbResult<Vec<Account>> {
        let mut out = Vec::new();
        f.fetch_many(ctx, &mut out, "SELECT * FROM accounts", &[]).await?;
        Ok(out)
    }

    let ctx = Context::background();
    owners(&*db, &ctx).await?;
    let tx = db.begin(&ctx).await?;
    owners(&tx, &ctx).await?;
    tx.commit(&ctx).await
}

#[cfg(feature = "pool")]
async fn _pooled_client_compiles(pool: &deadpool_postgres::Pool) -> DbResult<()> {
    let client = pool.get().await.map_err(sqlhook::DbError::connection)?;
    let ctx = Context::background();
    let mut db = Db::wrap(&ctx, client, sqlhook::DbConfig::default()).await?;
    let tx = db.begin(&ctx).await?;
    tx.execute(&ctx, "SELECT 1", &[]).await?;
    tx.commit(&ctx).await
}

#[cfg(feature = "tracing")]
fn _tracing_hook_compiles(db: &Db<tokio_postgres::Client>) {
    db.register_hook(
        sqlhook::TracingHook::new()
            .level(tracing::Level::INFO)
            .max_sql_length(120)
            .slow_query_threshold(std::time::Duration::from_millis(250)),
    );
}

#[test]
fn compile_only() {}
