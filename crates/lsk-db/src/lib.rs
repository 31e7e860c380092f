//! lsk-db
//!
//! Postgres implementations of the store ports, over plain `sqlx::query` +
//! `bind`. Status transitions are conditional `UPDATE … WHERE status =
//! ANY(...)` statements checked via `rows_affected` — the same per-row
//! compare-and-set the in-memory stores provide, enforced by the database.
//!
//! Behavioral tests live against the in-memory stores; this crate is wired
//! in by the daemon when `LSK_DATABASE_URL` is set.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};

use lsk_directory::{
    Availability, DirectoryError, PricingTiers, ResourceDirectory, ResourceRecord,
};
use lsk_dispute::{Appeal, AppealCategory, AppealState, AppealStore, NewAppeal, Verdict};
use lsk_orders::{LeaseOrder, MarketError, NewLeaseOrder, OrderStatus, OrderStore};
use lsk_payment::{NewPayment, PayMethod, PaymentRecord, PaymentStatus, PaymentStore};

pub const ENV_DB_URL: &str = "LSK_DATABASE_URL";

/// Connect to Postgres using LSK_DATABASE_URL.
pub async fn connect_from_env() -> Result<PgPool> {
    let url =
        std::env::var(ENV_DB_URL).with_context(|| format!("missing env var {ENV_DB_URL}"))?;

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&url)
        .await
        .context("failed to connect to Postgres")?;

    Ok(pool)
}

/// Run embedded SQLx migrations.
pub async fn migrate(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("db migrate failed")?;
    Ok(())
}

fn db_err(e: sqlx::Error) -> MarketError {
    MarketError::External(format!("db: {e}"))
}

fn dir_err(e: sqlx::Error) -> DirectoryError {
    DirectoryError::Unavailable(format!("db: {e}"))
}

// ---------------------------------------------------------------------------
// PgOrderStore
// ---------------------------------------------------------------------------

pub struct PgOrderStore {
    pool: PgPool,
}

impl PgOrderStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn order_from_row(row: &PgRow) -> Result<LeaseOrder, MarketError> {
    Ok(LeaseOrder {
        id: row.try_get("id").map_err(db_err)?,
        resource_id: row.try_get("resource_id").map_err(db_err)?,
        tenant_uid: row.try_get("tenant_uid").map_err(db_err)?,
        start_time: row.try_get("start_time").map_err(db_err)?,
        end_time: row.try_get("end_time").map_err(db_err)?,
        actual_end_time: row.try_get("actual_end_time").map_err(db_err)?,
        rent_cents: row.try_get("rent_cents").map_err(db_err)?,
        deposit_cents: row.try_get("deposit_cents").map_err(db_err)?,
        status: OrderStatus::parse(&row.try_get::<String, _>("status").map_err(db_err)?)?,
        created_at: row.try_get("created_at").map_err(db_err)?,
        updated_at: row.try_get("updated_at").map_err(db_err)?,
    })
}

const ORDER_COLUMNS: &str = "id, resource_id, tenant_uid, start_time, end_time, \
     actual_end_time, rent_cents, deposit_cents, status, created_at, updated_at";

#[async_trait]
impl OrderStore for PgOrderStore {
    async fn insert(&self, new_order: NewLeaseOrder) -> Result<LeaseOrder, MarketError> {
        let row = sqlx::query(&format!(
            r#"
            insert into lease_orders (
              resource_id, tenant_uid, start_time, end_time,
              rent_cents, deposit_cents, created_at, updated_at
            ) values ($1, $2, $3, $4, $5, $6, $7, $7)
            returning {ORDER_COLUMNS}
            "#
        ))
        .bind(new_order.resource_id)
        .bind(new_order.tenant_uid)
        .bind(new_order.start_time)
        .bind(new_order.end_time)
        .bind(new_order.rent_cents)
        .bind(new_order.deposit_cents)
        .bind(new_order.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;
        order_from_row(&row)
    }

    async fn get(&self, order_id: i64) -> Result<Option<LeaseOrder>, MarketError> {
        let row = sqlx::query(&format!(
            "select {ORDER_COLUMNS} from lease_orders where id = $1"
        ))
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        row.as_ref().map(order_from_row).transpose()
    }

    async fn find_open_for_pair(
        &self,
        resource_id: i64,
        tenant_uid: i64,
    ) -> Result<Option<LeaseOrder>, MarketError> {
        let row = sqlx::query(&format!(
            r#"
            select {ORDER_COLUMNS} from lease_orders
            where resource_id = $1
              and tenant_uid = $2
              and status in ('awaiting-payment', 'active')
            limit 1
            "#
        ))
        .bind(resource_id)
        .bind(tenant_uid)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        row.as_ref().map(order_from_row).transpose()
    }

    async fn list_for_tenant(
        &self,
        tenant_uid: i64,
        status: Option<OrderStatus>,
    ) -> Result<Vec<LeaseOrder>, MarketError> {
        let rows = sqlx::query(&format!(
            r#"
            select {ORDER_COLUMNS} from lease_orders
            where tenant_uid = $1
              and ($2::text is null or status = $2)
            order by created_at desc
            "#
        ))
        .bind(tenant_uid)
        .bind(status.map(|s| s.as_str()))
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        rows.iter().map(order_from_row).collect()
    }

    async fn list_for_resources(
        &self,
        resource_ids: &[i64],
        status: Option<OrderStatus>,
    ) -> Result<Vec<LeaseOrder>, MarketError> {
        let rows = sqlx::query(&format!(
            r#"
            select {ORDER_COLUMNS} from lease_orders
            where resource_id = any($1)
              and ($2::text is null or status = $2)
            order by created_at desc
            "#
        ))
        .bind(resource_ids)
        .bind(status.map(|s| s.as_str()))
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        rows.iter().map(order_from_row).collect()
    }

    async fn transition(
        &self,
        order_id: i64,
        allowed_from: &[OrderStatus],
        to: OrderStatus,
        actual_end_time: Option<DateTime<Utc>>,
    ) -> Result<bool, MarketError> {
        let from: Vec<String> = allowed_from.iter().map(|s| s.as_str().to_string()).collect();
        let result = sqlx::query(
            r#"
            update lease_orders
            set status = $2,
                actual_end_time = coalesce($3, actual_end_time),
                updated_at = now()
            where id = $1
              and status = any($4)
            "#,
        )
        .bind(order_id)
        .bind(to.as_str())
        .bind(actual_end_time)
        .bind(&from)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(result.rows_affected() > 0)
    }

    async fn extend(
        &self,
        order_id: i64,
        new_end_time: DateTime<Utc>,
        added_rent_cents: i64,
    ) -> Result<bool, MarketError> {
        let result = sqlx::query(
            r#"
            update lease_orders
            set end_time = $2,
                rent_cents = rent_cents + $3,
                updated_at = now()
            where id = $1
              and status = 'active'
            "#,
        )
        .bind(order_id)
        .bind(new_end_time)
        .bind(added_rent_cents)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(result.rows_affected() > 0)
    }

    async fn select_expired(&self, now: DateTime<Utc>) -> Result<Vec<LeaseOrder>, MarketError> {
        let rows = sqlx::query(&format!(
            r#"
            select {ORDER_COLUMNS} from lease_orders
            where status = 'active' and end_time <= $1
            "#
        ))
        .bind(now)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        rows.iter().map(order_from_row).collect()
    }

    async fn select_expiring_within(
        &self,
        now: DateTime<Utc>,
        lookahead: Duration,
    ) -> Result<Vec<LeaseOrder>, MarketError> {
        let rows = sqlx::query(&format!(
            r#"
            select {ORDER_COLUMNS} from lease_orders
            where status = 'active' and end_time >= $1 and end_time <= $2
            "#
        ))
        .bind(now)
        .bind(now + lookahead)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        rows.iter().map(order_from_row).collect()
    }

    async fn select_stale_awaiting(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<LeaseOrder>, MarketError> {
        let rows = sqlx::query(&format!(
            r#"
            select {ORDER_COLUMNS} from lease_orders
            where status = 'awaiting-payment' and created_at <= $1
            "#
        ))
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        rows.iter().map(order_from_row).collect()
    }
}

// ---------------------------------------------------------------------------
// PgPaymentStore
// ---------------------------------------------------------------------------

pub struct PgPaymentStore {
    pool: PgPool,
}

impl PgPaymentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn payment_from_row(row: &PgRow) -> Result<PaymentRecord, MarketError> {
    Ok(PaymentRecord {
        id: row.try_get("id").map_err(db_err)?,
        order_id: row.try_get("order_id").map_err(db_err)?,
        method: PayMethod::parse(&row.try_get::<String, _>("method").map_err(db_err)?)?,
        amount_cents: row.try_get("amount_cents").map_err(db_err)?,
        txn_ref: row.try_get("txn_ref").map_err(db_err)?,
        provider_ref: row.try_get("provider_ref").map_err(db_err)?,
        status: PaymentStatus::parse(&row.try_get::<String, _>("status").map_err(db_err)?)?,
        created_at: row.try_get("created_at").map_err(db_err)?,
        paid_at: row.try_get("paid_at").map_err(db_err)?,
    })
}

const PAYMENT_COLUMNS: &str =
    "id, order_id, method, amount_cents, txn_ref, provider_ref, status, created_at, paid_at";

#[async_trait]
impl PaymentStore for PgPaymentStore {
    async fn insert(&self, new_payment: NewPayment) -> Result<PaymentRecord, MarketError> {
        let row = sqlx::query(&format!(
            r#"
            insert into payment_records (order_id, method, amount_cents, txn_ref, created_at)
            values ($1, $2, $3, $4, $5)
            returning {PAYMENT_COLUMNS}
            "#
        ))
        .bind(new_payment.order_id)
        .bind(new_payment.method.as_str())
        .bind(new_payment.amount_cents)
        .bind(&new_payment.txn_ref)
        .bind(new_payment.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;
        payment_from_row(&row)
    }

    async fn get(&self, payment_id: i64) -> Result<Option<PaymentRecord>, MarketError> {
        let row = sqlx::query(&format!(
            "select {PAYMENT_COLUMNS} from payment_records where id = $1"
        ))
        .bind(payment_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        row.as_ref().map(payment_from_row).transpose()
    }

    async fn find_pending(
        &self,
        order_id: i64,
        method: PayMethod,
    ) -> Result<Option<PaymentRecord>, MarketError> {
        let row = sqlx::query(&format!(
            r#"
            select {PAYMENT_COLUMNS} from payment_records
            where order_id = $1 and method = $2 and status = 'pending'
            limit 1
            "#
        ))
        .bind(order_id)
        .bind(method.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        row.as_ref().map(payment_from_row).transpose()
    }

    async fn find_by_reference(
        &self,
        txn_ref: &str,
    ) -> Result<Option<PaymentRecord>, MarketError> {
        let row = sqlx::query(&format!(
            "select {PAYMENT_COLUMNS} from payment_records where txn_ref = $1"
        ))
        .bind(txn_ref)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        row.as_ref().map(payment_from_row).transpose()
    }

    async fn mark_success(
        &self,
        txn_ref: &str,
        provider_ref: Option<&str>,
        paid_at: DateTime<Utc>,
    ) -> Result<bool, MarketError> {
        let result = sqlx::query(
            r#"
            update payment_records
            set status = 'success',
                provider_ref = $2,
                paid_at = $3
            where txn_ref = $1
              and status = 'pending'
            "#,
        )
        .bind(txn_ref)
        .bind(provider_ref)
        .bind(paid_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(result.rows_affected() > 0)
    }

    async fn mark_failed(&self, txn_ref: &str) -> Result<bool, MarketError> {
        let result = sqlx::query(
            r#"
            update payment_records
            set status = 'failed'
            where txn_ref = $1
              and status = 'pending'
            "#,
        )
        .bind(txn_ref)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(result.rows_affected() > 0)
    }
}

// ---------------------------------------------------------------------------
// PgAppealStore
// ---------------------------------------------------------------------------

pub struct PgAppealStore {
    pool: PgPool,
}

impl PgAppealStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn appeal_from_row(row: &PgRow) -> Result<Appeal, MarketError> {
    let evidence: serde_json::Value = row.try_get("evidence").map_err(db_err)?;
    let evidence: Vec<String> = serde_json::from_value(evidence)
        .map_err(|e| MarketError::External(format!("bad evidence json: {e}")))?;
    let verdict = row
        .try_get::<Option<String>, _>("verdict")
        .map_err(db_err)?
        .map(|v| Verdict::parse(&v))
        .transpose()?;
    Ok(Appeal {
        id: row.try_get("id").map_err(db_err)?,
        order_id: row.try_get("order_id").map_err(db_err)?,
        opened_by: row.try_get("opened_by").map_err(db_err)?,
        category: AppealCategory::parse(&row.try_get::<String, _>("category").map_err(db_err)?)?,
        evidence,
        verdict,
        resolver_uid: row.try_get("resolver_uid").map_err(db_err)?,
        created_at: row.try_get("created_at").map_err(db_err)?,
        resolved_at: row.try_get("resolved_at").map_err(db_err)?,
    })
}

const APPEAL_COLUMNS: &str =
    "id, order_id, opened_by, category, evidence, verdict, resolver_uid, created_at, resolved_at";

#[async_trait]
impl AppealStore for PgAppealStore {
    async fn insert(&self, new_appeal: NewAppeal) -> Result<Appeal, MarketError> {
        let evidence = serde_json::to_value(&new_appeal.evidence)
            .map_err(|e| MarketError::External(format!("evidence json: {e}")))?;
        let row = sqlx::query(&format!(
            r#"
            insert into appeals (order_id, opened_by, category, evidence, created_at)
            values ($1, $2, $3, $4, $5)
            returning {APPEAL_COLUMNS}
            "#
        ))
        .bind(new_appeal.order_id)
        .bind(new_appeal.opened_by)
        .bind(new_appeal.category.as_str())
        .bind(evidence)
        .bind(new_appeal.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;
        appeal_from_row(&row)
    }

    async fn get(&self, appeal_id: i64) -> Result<Option<Appeal>, MarketError> {
        let row = sqlx::query(&format!(
            "select {APPEAL_COLUMNS} from appeals where id = $1"
        ))
        .bind(appeal_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        row.as_ref().map(appeal_from_row).transpose()
    }

    async fn find_unresolved(&self, order_id: i64) -> Result<Option<Appeal>, MarketError> {
        let row = sqlx::query(&format!(
            r#"
            select {APPEAL_COLUMNS} from appeals
            where order_id = $1 and verdict is null
            limit 1
            "#
        ))
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        row.as_ref().map(appeal_from_row).transpose()
    }

    async fn list(&self, state: Option<AppealState>) -> Result<Vec<Appeal>, MarketError> {
        let clause = match state {
            None => "",
            Some(AppealState::Unresolved) => "where verdict is null",
            Some(AppealState::Resolved) => "where verdict is not null",
        };
        let rows = sqlx::query(&format!(
            "select {APPEAL_COLUMNS} from appeals {clause} order by created_at desc"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        rows.iter().map(appeal_from_row).collect()
    }

    async fn resolve(
        &self,
        appeal_id: i64,
        verdict: Verdict,
        resolver_uid: i64,
        resolved_at: DateTime<Utc>,
    ) -> Result<bool, MarketError> {
        let result = sqlx::query(
            r#"
            update appeals
            set verdict = $2,
                resolver_uid = $3,
                resolved_at = $4
            where id = $1
              and verdict is null
            "#,
        )
        .bind(appeal_id)
        .bind(verdict.as_str())
        .bind(resolver_uid)
        .bind(resolved_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(result.rows_affected() > 0)
    }
}

// ---------------------------------------------------------------------------
// PgResourceDirectory
// ---------------------------------------------------------------------------

pub struct PgResourceDirectory {
    pool: PgPool,
}

impl PgResourceDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn resource_from_row(row: &PgRow) -> Result<ResourceRecord, DirectoryError> {
    let availability =
        Availability::parse(&row.try_get::<String, _>("availability").map_err(dir_err)?)?;
    Ok(ResourceRecord {
        id: row.try_get("id").map_err(dir_err)?,
        owner_uid: row.try_get("owner_uid").map_err(dir_err)?,
        availability,
        pricing: PricingTiers {
            per_half_hour_cents: row.try_get("per_half_hour_cents").map_err(dir_err)?,
            per_hour_cents: row.try_get("per_hour_cents").map_err(dir_err)?,
            overnight_cents: row.try_get("overnight_cents").map_err(dir_err)?,
            deposit_cents: row.try_get("deposit_cents").map_err(dir_err)?,
        },
        login_enc: row.try_get("login_enc").map_err(dir_err)?,
        secret_enc: row.try_get("secret_enc").map_err(dir_err)?,
    })
}

#[async_trait]
impl ResourceDirectory for PgResourceDirectory {
    async fn get(&self, resource_id: i64) -> Result<Option<ResourceRecord>, DirectoryError> {
        let row = sqlx::query(
            r#"
            select id, owner_uid, availability, per_half_hour_cents, per_hour_cents,
                   overnight_cents, deposit_cents, login_enc, secret_enc
            from resources where id = $1
            "#,
        )
        .bind(resource_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(dir_err)?;
        row.as_ref().map(resource_from_row).transpose()
    }

    async fn set_availability(
        &self,
        resource_id: i64,
        flag: Availability,
    ) -> Result<(), DirectoryError> {
        let result = sqlx::query("update resources set availability = $2 where id = $1")
            .bind(resource_id)
            .bind(flag.as_str())
            .execute(&self.pool)
            .await
            .map_err(dir_err)?;
        if result.rows_affected() == 0 {
            return Err(DirectoryError::NotFound(resource_id));
        }
        Ok(())
    }

    async fn list_owned(&self, owner_uid: i64) -> Result<Vec<i64>, DirectoryError> {
        let rows = sqlx::query("select id from resources where owner_uid = $1 order by id")
            .bind(owner_uid)
            .fetch_all(&self.pool)
            .await
            .map_err(dir_err)?;
        rows.iter()
            .map(|r| r.try_get("id").map_err(dir_err))
            .collect()
    }
}
