//! Rejection ledger
//!
//! Subject/candidate pairs a user dismissed, scoped per owner and bounded
//! FIFO: once an owner holds `capacity` entries, the oldest are evicted.
//! Rejecting a pair again moves it to the newest position.

use chrono::{DateTime, Utc};
use kinmatch_common::model::CandidateRecord;
use kinmatch_common::{Error, Result};
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};
use std::collections::HashSet;
use tracing::debug;

/// Default per-owner capacity
pub const DEFAULT_CAPACITY: usize = 1000;

/// One rejected pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RejectionEntry {
    pub subject_id: String,
    pub candidate_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Snapshot of the candidate at rejection time
    #[serde(skip_serializing_if = "Option::is_none")]
    pub candidate: Option<CandidateRecord>,
    pub rejected_at: DateTime<Utc>,
}

/// Owner-scoped rejection ledger
#[derive(Debug, Clone)]
pub struct RejectionLedger {
    pool: SqlitePool,
    owner: String,
    capacity: usize,
}

/// Length-prefixed so no two distinct pairs share a key
fn pair_hash(subject_id: &str, candidate_id: &str) -> String {
    format!("{}:{}|{}", candidate_id.len(), candidate_id, subject_id)
}

impl RejectionLedger {
    pub fn new(pool: SqlitePool, owner: impl Into<String>, capacity: usize) -> Self {
        Self {
            pool,
            owner: owner.into(),
            capacity: capacity.max(1),
        }
    }

    /// Same database and capacity, different owner
    pub fn for_owner(&self, owner: impl Into<String>) -> Self {
        Self::new(self.pool.clone(), owner, self.capacity)
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Record that `candidate_id` is not `subject_id`
    pub async fn reject(
        &self,
        subject_id: &str,
        candidate_id: &str,
        reason: Option<&str>,
    ) -> Result<RejectionEntry> {
        self.record(subject_id, candidate_id, reason, None).await
    }

    /// Same as [`reject`](Self::reject), also keeping a snapshot of the record
    pub async fn reject_with_snapshot(
        &self,
        subject_id: &str,
        candidate: &CandidateRecord,
        reason: Option<&str>,
    ) -> Result<RejectionEntry> {
        self.record(subject_id, &candidate.id, reason, Some(candidate)).await
    }

    async fn record(
        &self,
        subject_id: &str,
        candidate_id: &str,
        reason: Option<&str>,
        candidate: Option<&CandidateRecord>,
    ) -> Result<RejectionEntry> {
        if subject_id.trim().is_empty() || candidate_id.trim().is_empty() {
            return Err(Error::InvalidInput(
                "subject id and candidate id are required".to_string(),
            ));
        }

        let hash = pair_hash(subject_id, candidate_id);
        let snapshot = candidate
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| Error::Internal(format!("Failed to serialize candidate: {}", e)))?;
        let rejected_at = Utc::now();
        let reason = reason.map(str::trim).filter(|r| !r.is_empty());

        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM rejections WHERE owner = ? AND pair_hash = ?")
            .bind(&self.owner)
            .bind(&hash)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO rejections (owner, subject_id, candidate_id, pair_hash, reason, candidate, rejected_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&self.owner)
        .bind(subject_id)
        .bind(candidate_id)
        .bind(&hash)
        .bind(reason)
        .bind(&snapshot)
        .bind(rejected_at.to_rfc3339())
        .execute(&mut *tx)
        .await?;

        let evicted = sqlx::query(
            r#"
            DELETE FROM rejections
            WHERE owner = ?
              AND seq NOT IN (
                  SELECT seq FROM rejections WHERE owner = ? ORDER BY seq DESC LIMIT ?
              )
            "#,
        )
        .bind(&self.owner)
        .bind(&self.owner)
        .bind(self.capacity as i64)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        tx.commit().await?;

        debug!(
            owner = %self.owner,
            subject = %subject_id,
            candidate = %candidate_id,
            evicted,
            "Candidate rejected"
        );

        Ok(RejectionEntry {
            subject_id: subject_id.to_string(),
            candidate_id: candidate_id.to_string(),
            reason: reason.map(str::to_string),
            candidate: candidate.cloned(),
            rejected_at,
        })
    }

    pub async fn is_rejected(&self, subject_id: &str, candidate_id: &str) -> Result<bool> {
        let found: Option<i64> =
            sqlx::query_scalar("SELECT seq FROM rejections WHERE owner = ? AND pair_hash = ?")
                .bind(&self.owner)
                .bind(pair_hash(subject_id, candidate_id))
                .fetch_optional(&self.pool)
                .await?;
        Ok(found.is_some())
    }

    /// Candidate ids rejected for `subject_id`
    pub async fn rejected_candidates(&self, subject_id: &str) -> Result<HashSet<String>> {
        let ids: Vec<String> = sqlx::query_scalar(
            "SELECT candidate_id FROM rejections WHERE owner = ? AND subject_id = ?",
        )
        .bind(&self.owner)
        .bind(subject_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids.into_iter().collect())
    }

    /// Entries newest first, optionally restricted to one subject
    pub async fn list(&self, subject_id: Option<&str>) -> Result<Vec<RejectionEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT subject_id, candidate_id, reason, candidate, rejected_at
            FROM rejections
            WHERE owner = ? AND (? IS NULL OR subject_id = ?)
            ORDER BY seq DESC
            "#,
        )
        .bind(&self.owner)
        .bind(subject_id)
        .bind(subject_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                let rejected_at: String = row.get("rejected_at");
                let rejected_at = DateTime::parse_from_rfc3339(&rejected_at)
                    .map_err(|e| Error::Internal(format!("Failed to parse rejected_at: {}", e)))?
                    .with_timezone(&Utc);

                // Unreadable snapshots are dropped rather than failing the listing
                let candidate: Option<String> = row.get("candidate");
                let candidate = candidate.and_then(|json| serde_json::from_str(&json).ok());

                Ok(RejectionEntry {
                    subject_id: row.get("subject_id"),
                    candidate_id: row.get("candidate_id"),
                    reason: row.get("reason"),
                    candidate,
                    rejected_at,
                })
            })
            .collect()
    }

    /// Entries held for this owner
    pub async fn count(&self) -> Result<usize> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM rejections WHERE owner = ?")
            .bind(&self.owner)
            .fetch_one(&self.pool)
            .await?;
        Ok(count as usize)
    }
}
