//! Spin arbitration engine.
//!
//! Guarantees at most `spin_limit` committed spins per user, even under
//! concurrent attempts from the same user (double-click, retry,
//! multiple devices). The protocol:
//!
//! 1. cheap non-authoritative count pre-check (rejects the common
//!    "already spun" case without taking a lock),
//! 2. eligibility filter over the active catalog,
//! 3. weighted random selection,
//! 4. authoritative commit: transaction + `pg_advisory_xact_lock`
//!    keyed on the user id, re-count under the lock, insert, commit.
//!
//! The advisory lock is transaction-scoped, so Postgres releases it on
//! commit and rollback alike; dropping the transaction (error paths,
//! caller cancellation) rolls back, and no partial spin is ever
//! visible. Locks for different users never contend.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::Rng as _;
use sqlx::PgPool;
use tracing::error;

use crate::db::{self, PrizeRow, SpinHistoryRow};
use crate::error::{ApiError, Result};

/// Injectable randomness provider for the weighted draw.
pub trait RandomSource: Send + Sync {
    /// Uniform integer in `[0, bound)`. `bound` is at least 1.
    fn uniform(&self, bound: u64) -> u64;
}

/// Default source backed by the thread-local generator.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRandom;

impl RandomSource for SystemRandom {
    fn uniform(&self, bound: u64) -> u64 {
        rand::rng().random_range(0..bound)
    }
}

/// Historical display names of the "unlimited month" prize.
///
/// Compatibility shim: the `free_month` category tag is authoritative,
/// these exact-name matches only cover legacy catalog rows that predate
/// the tag.
const EXCLUDED_PRIZE_NAMES: [&str; 2] =
    ["БЕЗЛИМИТ ПОСЕЩЕНИЙ НА 1 МЕСЯЦ", "1 МЕСЯЦ БЕСПЛАТНО"];

/// Category tag never awarded through a random draw.
const EXCLUDED_PRIZE_KIND: &str = "free_month";

fn eq_fold(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

fn is_excluded(prize: &PrizeRow) -> bool {
    let name = prize.name.trim();
    if EXCLUDED_PRIZE_NAMES.iter().any(|n| eq_fold(name, n)) {
        return true;
    }
    eq_fold(prize.kind.trim(), EXCLUDED_PRIZE_KIND)
}

/// Active prizes the engine may actually award.
///
/// Excluded prizes stay visible on the wheel through the catalog read
/// but must never be the winner of a random draw.
fn eligible_prizes(prizes: &[PrizeRow]) -> Vec<&PrizeRow> {
    prizes.iter().filter(|p| !is_excluded(p)).collect()
}

/// Weighted random selection over the eligible set, in stable order.
///
/// If the subtraction walk ever fails to select (it cannot with
/// positive integer weights), the last element is chosen
/// deterministically rather than failing the user's spin.
fn pick_weighted<'a>(eligible: &[&'a PrizeRow], rng: &dyn RandomSource) -> Option<&'a PrizeRow> {
    if eligible.is_empty() {
        return None;
    }
    let total: u64 = eligible
        .iter()
        .map(|p| p.probability_weight.max(0) as u64)
        .sum();
    if total == 0 {
        return eligible.last().copied();
    }
    // Unsigned walk: an oversized draw exhausts the loop instead of
    // wrapping, landing on the last-element fallback.
    let mut draw = rng.uniform(total);
    for prize in eligible {
        let weight = prize.probability_weight.max(0) as u64;
        if draw < weight {
            return Some(prize);
        }
        draw -= weight;
    }
    eligible.last().copied()
}

/// A committed spin joined with the chosen prize's display attributes.
#[derive(Debug, Clone)]
pub struct SpinOutcome {
    pub id: i64,
    pub prize_id: i32,
    pub prize_name: String,
    pub prize_kind: String,
    pub value: f64,
    pub created_at: DateTime<Utc>,
}

/// The arbitration core.
#[derive(Clone)]
pub struct SpinEngine {
    pool: PgPool,
    spin_limit: i64,
    rng: Arc<dyn RandomSource>,
}

impl SpinEngine {
    pub fn new(pool: PgPool, spin_limit: i64, rng: Arc<dyn RandomSource>) -> Self {
        Self {
            pool,
            spin_limit,
            rng,
        }
    }

    pub fn spin_limit(&self) -> i64 {
        self.spin_limit
    }

    /// Perform one quota-guarded weighted prize draw for a user.
    ///
    /// `QuotaExceeded` is an expected outcome, distinct from storage
    /// failures; callers map it to a friendly response.
    pub async fn spin(&self, user_id: i64, ip_hash: &str) -> Result<SpinOutcome> {
        // 1. Pre-check. Advisory only: the commit below re-checks under
        //    the per-user lock.
        let count = db::count_spins_by_user(&self.pool, user_id).await?;
        if count >= self.spin_limit {
            return Err(ApiError::QuotaExceeded);
        }

        // 2. Eligibility filter.
        let prizes = db::list_active_prizes(&self.pool).await?;
        let eligible = eligible_prizes(&prizes);

        // 3. Weighted selection.
        let Some(chosen) = pick_weighted(&eligible, self.rng.as_ref()) else {
            error!("catalog has no prizes eligible for random draw");
            return Err(ApiError::NoEligiblePrizes);
        };

        // 4. Authoritative commit under the per-user serialization
        //    point. Early returns drop the transaction, which rolls it
        //    back and releases the advisory lock.
        let mut tx = self.pool.begin().await?;

        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM spins WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&mut *tx)
            .await?;
        if count >= self.spin_limit {
            return Err(ApiError::QuotaExceeded);
        }

        let (id, created_at): (i64, DateTime<Utc>) = sqlx::query_as(
            r#"
            INSERT INTO spins (user_id, prize_id, result_value, ip_hash)
            VALUES ($1, $2, $3, $4)
            RETURNING id, created_at
            "#,
        )
        .bind(user_id)
        .bind(chosen.id)
        .bind(chosen.value)
        .bind(ip_hash)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(SpinOutcome {
            id,
            prize_id: chosen.id,
            prize_name: chosen.name.clone(),
            prize_kind: chosen.kind.clone(),
            value: chosen.value,
            created_at,
        })
    }

    /// All active prizes, stable order, including draw-excluded rows.
    pub async fn catalog(&self) -> Result<Vec<PrizeRow>> {
        db::list_active_prizes(&self.pool).await
    }

    /// Most recent spins for a user, newest first.
    pub async fn history(&self, user_id: i64, limit: i64) -> Result<Vec<SpinHistoryRow>> {
        db::list_spins_by_user(&self.pool, user_id, limit).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Source that returns a fixed value regardless of the bound.
    struct FixedSource(u64);

    impl RandomSource for FixedSource {
        fn uniform(&self, _bound: u64) -> u64 {
            self.0
        }
    }

    fn prize(id: i32, name: &str, kind: &str, weight: i32) -> PrizeRow {
        PrizeRow {
            id,
            name: name.to_string(),
            kind: kind.to_string(),
            value: 1.0,
            probability_weight: weight,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    fn default_catalog() -> Vec<PrizeRow> {
        vec![
            prize(1, "БЕСПЛАТНЫЕ 7 ДНЕЙ ФИТНЕСА", "free_days", 20),
            prize(2, "БЕСПЛАТНЫЕ 7 ДНЕЙ ФИТНЕСА", "free_days", 20),
            prize(3, "ЗАРЯЖЕННЫЙ ФИТНЕС-ИНТЕНСИВ 🔥", "bonus", 25),
            prize(4, "ШЕЙПИНГ — ГРУППОВАЯ ТРЕНИРОВКА", "bonus", 25),
            prize(5, "БЕЗЛИМИТ ПОСЕЩЕНИЙ НА 1 МЕСЯЦ", "free_month", 1),
            prize(6, "1 ДЕНЬ В ЭРА СПОРТА", "free_days", 25),
            prize(7, "СКИДКА НА ГОДОВОЙ АБОНЕМЕНТ", "discount", 15),
            prize(8, "10% НА МАССАЖ / ВОССТАНОВЛЕНИЕ", "discount", 25),
        ]
    }

    #[test]
    fn filter_removes_excluded_category() {
        let catalog = default_catalog();
        let eligible = eligible_prizes(&catalog);
        assert_eq!(eligible.len(), 7);
        assert!(eligible.iter().all(|p| p.kind != "free_month"));
    }

    #[test]
    fn filter_removes_excluded_names_case_insensitively() {
        let catalog = vec![
            prize(1, "  безлимит посещений на 1 месяц ", "bonus", 10),
            prize(2, "1 месяц бесплатно", "bonus", 10),
            prize(3, "СКИДКА", "discount", 10),
        ];
        let eligible = eligible_prizes(&catalog);
        assert_eq!(eligible.len(), 1);
        assert_eq!(eligible[0].id, 3);
    }

    #[test]
    fn filter_keeps_everything_when_nothing_matches() {
        let catalog = vec![prize(1, "СКИДКА", "discount", 10)];
        assert_eq!(eligible_prizes(&catalog).len(), 1);
    }

    #[test]
    fn pick_empty_set_returns_none() {
        assert!(pick_weighted(&[], &FixedSource(0)).is_none());
    }

    #[test]
    fn pick_sweep_matches_weights_exactly() {
        // Every draw value in [0, total) selects each prize exactly
        // weight times, so empirical frequency equals weight/total.
        let catalog = default_catalog();
        let eligible = eligible_prizes(&catalog);
        let total: u64 = eligible.iter().map(|p| p.probability_weight as u64).sum();
        assert_eq!(total, 155);

        let mut counts = std::collections::HashMap::new();
        for draw in 0..total {
            let chosen = pick_weighted(&eligible, &FixedSource(draw)).unwrap();
            *counts.entry(chosen.id).or_insert(0) += 1;
        }

        for p in &eligible {
            assert_eq!(counts[&p.id], p.probability_weight, "prize {}", p.id);
        }
        assert!(!counts.contains_key(&5), "excluded prize was selected");
    }

    #[test]
    fn pick_out_of_range_draw_falls_back_to_last() {
        let catalog = default_catalog();
        let eligible = eligible_prizes(&catalog);
        // A source violating its contract must not fail the spin, and
        // must not wrap around to an early prize either.
        for draw in [155, 156, u64::MAX] {
            let chosen = pick_weighted(&eligible, &FixedSource(draw)).unwrap();
            assert_eq!(chosen.id, eligible.last().unwrap().id, "draw {draw}");
        }
    }

    #[test]
    fn pick_zero_total_weight_falls_back_to_last() {
        let catalog = vec![prize(1, "A", "bonus", 0), prize(2, "B", "bonus", 0)];
        let eligible = eligible_prizes(&catalog);
        let chosen = pick_weighted(&eligible, &FixedSource(0)).unwrap();
        assert_eq!(chosen.id, 2);
    }
}
