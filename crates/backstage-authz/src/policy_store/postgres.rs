//! Postgres-backed policy store.
//!
//! # What this module is
//! Persists casbin-style rows in a single table:
//! `(ptype, v0, v1, v2)` where `ptype = 'p'` rows are `(subject, object,
//! action)` and `ptype = 'g'` rows are `(user, role, '')`.
//!
//! # Key invariants
//! - The table name is configurable and therefore interpolated into SQL. It
//!   is validated as a plain identifier in [`validate_table_name`] before any
//!   statement is built; every value is bound as a parameter.
//! - A unique constraint over `(ptype, v0, v1, v2)` keeps inserts idempotent.
//! - The table is created on connect when it does not exist.
//!
//! # Security notes
//! - Database URLs may contain credentials; avoid logging them.
use super::{GroupingRule, PolicyRule, PolicyStore, StoreError, StoreResult};
use async_trait::async_trait;
use serde::Deserialize;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{FromRow, PgPool};
use std::str::FromStr;
use std::time::Duration;

const POLICY_TYPE: &str = "p";
const GROUPING_TYPE: &str = "g";
const MAX_IDENTIFIER_LEN: usize = 63;

#[derive(Debug, Clone, Deserialize)]
pub struct PostgresConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout_ms: u64,
}

#[derive(Debug, Clone, FromRow)]
struct DbRule {
    v0: String,
    v1: String,
    v2: String,
}

/// SQL text for one validated table name.
#[derive(Debug, Clone)]
struct Statements {
    create_table: String,
    select_rules: String,
    insert_rule: String,
    delete_rule: String,
    delete_user_groupings: String,
    delete_role_groupings: String,
    delete_subject_policies: String,
}

impl Statements {
    fn for_table(table: &str) -> Self {
        Self {
            create_table: format!(
                "CREATE TABLE IF NOT EXISTS {table} (\
                 id BIGSERIAL PRIMARY KEY, \
                 ptype VARCHAR(12) NOT NULL, \
                 v0 VARCHAR(256) NOT NULL, \
                 v1 VARCHAR(256) NOT NULL, \
                 v2 VARCHAR(256) NOT NULL DEFAULT '', \
                 CONSTRAINT {table}_rule_unique UNIQUE (ptype, v0, v1, v2))"
            ),
            select_rules: format!("SELECT v0, v1, v2 FROM {table} WHERE ptype = $1 ORDER BY id"),
            insert_rule: format!(
                "INSERT INTO {table} (ptype, v0, v1, v2) VALUES ($1, $2, $3, $4) \
                 ON CONFLICT DO NOTHING"
            ),
            delete_rule: format!(
                "DELETE FROM {table} WHERE ptype = $1 AND v0 = $2 AND v1 = $3 AND v2 = $4"
            ),
            delete_user_groupings: format!("DELETE FROM {table} WHERE ptype = $1 AND v0 = $2"),
            delete_role_groupings: format!(
                "DELETE FROM {table} WHERE ptype = $1 AND (v0 = $2 OR v1 = $2)"
            ),
            delete_subject_policies: format!("DELETE FROM {table} WHERE ptype = $1 AND v0 = $2"),
        }
    }
}

/// Accept `[A-Za-z_][A-Za-z0-9_]*` up to the Postgres identifier limit.
pub fn validate_table_name(table: &str) -> StoreResult<()> {
    let mut chars = table.chars();
    let valid_head = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    let valid_tail = chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid_head && valid_tail && table.len() <= MAX_IDENTIFIER_LEN {
        Ok(())
    } else {
        Err(StoreError::InvalidTable(table.to_string()))
    }
}

pub struct PostgresPolicyStore {
    pool: PgPool,
    statements: Statements,
}

impl PostgresPolicyStore {
    /// Connect, then make sure the policy table exists.
    ///
    /// # Errors
    /// - [`StoreError::InvalidTable`] before any connection is attempted.
    /// - Connection, pool, or DDL failures as [`StoreError::Database`].
    pub async fn connect(pg: &PostgresConfig, table: &str) -> StoreResult<Self> {
        validate_table_name(table)?;
        let connect_options = PgConnectOptions::from_str(&pg.url)?;
        let pool = PgPoolOptions::new()
            .max_connections(pg.max_connections)
            .acquire_timeout(Duration::from_millis(pg.acquire_timeout_ms))
            .connect_with(connect_options)
            .await?;
        let statements = Statements::for_table(table);
        sqlx::query(&statements.create_table)
            .execute(&pool)
            .await?;
        tracing::info!(table, "policy table ready");
        Ok(Self { pool, statements })
    }

    async fn select(&self, ptype: &str) -> StoreResult<Vec<DbRule>> {
        let rows: Vec<DbRule> = sqlx::query_as(&self.statements.select_rules)
            .bind(ptype)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn insert_all(&self, ptype: &str, rows: Vec<[String; 3]>) -> StoreResult<bool> {
        // One transaction so a batch is either fully visible or not at all.
        let mut tx = self.pool.begin().await?;
        let mut inserted = 0u64;
        for [v0, v1, v2] in rows {
            let result = sqlx::query(&self.statements.insert_rule)
                .bind(ptype)
                .bind(v0)
                .bind(v1)
                .bind(v2)
                .execute(&mut *tx)
                .await?;
            inserted += result.rows_affected();
        }
        tx.commit().await?;
        Ok(inserted > 0)
    }

    async fn delete_exact(&self, ptype: &str, row: [&str; 3]) -> StoreResult<bool> {
        let result = sqlx::query(&self.statements.delete_rule)
            .bind(ptype)
            .bind(row[0])
            .bind(row[1])
            .bind(row[2])
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl PolicyStore for PostgresPolicyStore {
    async fn list_policies(&self) -> StoreResult<Vec<PolicyRule>> {
        Ok(self
            .select(POLICY_TYPE)
            .await?
            .into_iter()
            .map(|row| PolicyRule {
                subject: row.v0,
                object: row.v1,
                action: row.v2,
            })
            .collect())
    }

    async fn list_groupings(&self) -> StoreResult<Vec<GroupingRule>> {
        Ok(self
            .select(GROUPING_TYPE)
            .await?
            .into_iter()
            .map(|row| GroupingRule {
                user: row.v0,
                role: row.v1,
            })
            .collect())
    }

    async fn add_policies(&self, rules: Vec<PolicyRule>) -> StoreResult<bool> {
        let rows = rules
            .into_iter()
            .map(|rule| [rule.subject, rule.object, rule.action])
            .collect();
        self.insert_all(POLICY_TYPE, rows).await
    }

    async fn remove_policy(&self, rule: &PolicyRule) -> StoreResult<bool> {
        self.delete_exact(POLICY_TYPE, [&rule.subject, &rule.object, &rule.action])
            .await
    }

    async fn add_groupings(&self, groupings: Vec<GroupingRule>) -> StoreResult<bool> {
        let rows = groupings
            .into_iter()
            .map(|grouping| [grouping.user, grouping.role, String::new()])
            .collect();
        self.insert_all(GROUPING_TYPE, rows).await
    }

    async fn remove_grouping(&self, grouping: &GroupingRule) -> StoreResult<bool> {
        self.delete_exact(GROUPING_TYPE, [&grouping.user, &grouping.role, ""])
            .await
    }

    async fn remove_groupings_for_user(&self, user: &str) -> StoreResult<bool> {
        let result = sqlx::query(&self.statements.delete_user_groupings)
            .bind(GROUPING_TYPE)
            .bind(user)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn remove_role(&self, role: &str) -> StoreResult<bool> {
        let mut tx = self.pool.begin().await?;
        let groupings = sqlx::query(&self.statements.delete_role_groupings)
            .bind(GROUPING_TYPE)
            .bind(role)
            .execute(&mut *tx)
            .await?;
        let policies = sqlx::query(&self.statements.delete_subject_policies)
            .bind(POLICY_TYPE)
            .bind(role)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(groupings.rows_affected() + policies.rows_affected() > 0)
    }

    async fn health_check(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    fn is_durable(&self) -> bool {
        true
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}
