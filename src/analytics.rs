//! Analytics series
//!
//! Chart-feeding aggregations over the same transaction store: monthly
//! income/expense comparison and a per-day trend series.

use crate::models::TransactionKind;
use crate::store::TransactionStore;
use crate::Result;
use chrono::{Datelike, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonthlyComparison {
    pub month: String,
    pub year: i32,
    pub total_income: f64,
    pub total_expense: f64,
    pub balance: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendPoint {
    pub date: NaiveDate,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    pub amount: f64,
}

#[derive(Clone)]
pub struct AnalyticsService {
    store: Arc<dyn TransactionStore>,
}

impl AnalyticsService {
    pub fn new(store: Arc<dyn TransactionStore>) -> Self {
        Self { store }
    }

    /// Income/expense totals per calendar month over the last `months`
    /// months, oldest first.
    pub async fn monthly_comparison(
        &self,
        user_id: Uuid,
        months: u32,
    ) -> Result<Vec<MonthlyComparison>> {
        let end = Utc::now().date_naive();
        // 31-day months over-fetch slightly; grouping trims the excess.
        let start = end - Duration::days(i64::from(months) * 31);

        let transactions = self.store.fetch_window(user_id, start, end).await?;

        let mut by_month: HashMap<(i32, u32), (f64, f64)> = HashMap::new();
        for t in &transactions {
            let entry = by_month.entry((t.date.year(), t.date.month())).or_insert((0.0, 0.0));
            match t.kind {
                TransactionKind::Income => entry.0 += t.amount,
                TransactionKind::Expense => entry.1 += t.amount,
            }
        }

        let mut keys: Vec<(i32, u32)> = by_month.keys().copied().collect();
        keys.sort_unstable_by(|a, b| b.cmp(a));
        keys.truncate(months as usize);
        keys.reverse();

        Ok(keys
            .into_iter()
            .map(|(year, month)| {
                let (income, expense) = by_month[&(year, month)];
                MonthlyComparison {
                    month: month_name(month),
                    year,
                    total_income: income,
                    total_expense: expense,
                    balance: income - expense,
                }
            })
            .collect())
    }

    /// Per-(date, type) totals over the trailing `days` days, ordered by
    /// date. `kind` narrows the series to one transaction type.
    pub async fn daily_trend(
        &self,
        user_id: Uuid,
        days: u32,
        kind: Option<TransactionKind>,
    ) -> Result<Vec<TrendPoint>> {
        let end = Utc::now().date_naive();
        let start = end - Duration::days(i64::from(days));

        let transactions = self.store.fetch_window(user_id, start, end).await?;

        let mut by_day: HashMap<(NaiveDate, TransactionKind), f64> = HashMap::new();
        for t in &transactions {
            if kind.map_or(true, |k| k == t.kind) {
                *by_day.entry((t.date, t.kind)).or_insert(0.0) += t.amount;
            }
        }

        let mut points: Vec<TrendPoint> = by_day
            .into_iter()
            .map(|((date, kind), amount)| TrendPoint { date, kind, amount })
            .collect();
        points.sort_by_key(|p| (p.date, p.kind == TransactionKind::Income));

        Ok(points)
    }
}

fn month_name(month: u32) -> String {
    NaiveDate::from_ymd_opt(2000, month, 1)
        .map(|d| d.format("%B").to_string())
        .unwrap_or_else(|| month.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TransactionRecord;
    use crate::store::InMemoryTransactionStore;

    fn record(
        user_id: Uuid,
        date: NaiveDate,
        kind: TransactionKind,
        amount: f64,
    ) -> TransactionRecord {
        TransactionRecord {
            id: Uuid::new_v4(),
            user_id,
            amount,
            kind,
            date,
            category: "Ăn uống".to_string(),
            description: "test".to_string(),
            notes: None,
            is_deleted: false,
        }
    }

    #[tokio::test]
    async fn test_monthly_comparison_groups_and_orders() {
        let store = Arc::new(InMemoryTransactionStore::new());
        let user_id = Uuid::new_v4();
        let today = Utc::now().date_naive();
        let last_month = today - Duration::days(31);

        store
            .insert(record(user_id, today, TransactionKind::Income, 1_000.0))
            .await;
        store
            .insert(record(user_id, today, TransactionKind::Expense, 400.0))
            .await;
        store
            .insert(record(user_id, last_month, TransactionKind::Expense, 250.0))
            .await;

        let service = AnalyticsService::new(store);
        let comparison = service.monthly_comparison(user_id, 6).await.unwrap();

        assert_eq!(comparison.len(), 2);
        // Chronological order: older month first.
        assert_eq!(comparison[1].total_income, 1_000.0);
        assert_eq!(comparison[1].total_expense, 400.0);
        assert_eq!(comparison[1].balance, 600.0);
        assert_eq!(comparison[0].total_expense, 250.0);
    }

    #[tokio::test]
    async fn test_daily_trend_filters_by_kind() {
        let store = Arc::new(InMemoryTransactionStore::new());
        let user_id = Uuid::new_v4();
        let today = Utc::now().date_naive();

        store
            .insert(record(user_id, today, TransactionKind::Income, 900.0))
            .await;
        store
            .insert(record(user_id, today, TransactionKind::Expense, 300.0))
            .await;
        store
            .insert(record(user_id, today, TransactionKind::Expense, 200.0))
            .await;

        let service = AnalyticsService::new(store);

        let all = service.daily_trend(user_id, 30, None).await.unwrap();
        assert_eq!(all.len(), 2);

        let expenses = service
            .daily_trend(user_id, 30, Some(TransactionKind::Expense))
            .await
            .unwrap();
        assert_eq!(expenses.len(), 1);
        assert_eq!(expenses[0].amount, 500.0);
    }

    #[test]
    fn test_month_name_is_english_full_name() {
        assert_eq!(month_name(1), "January");
        assert_eq!(month_name(12), "December");
    }
}
