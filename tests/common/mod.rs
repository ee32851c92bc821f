// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use anyhow::Result;
use chrono::NaiveDate;
use metrica::application::{DashboardService, Settings};
use metrica::domain::{to_month_key, MonthKey, MonthlyMetricRow};
use tempfile::TempDir;

/// Helper to create a test service with a temporary database
pub async fn test_service() -> Result<(DashboardService, TempDir)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test.db");
    let service = DashboardService::init(db_path.to_str().unwrap(), Settings::default()).await?;
    Ok((service, temp_dir))
}

pub fn parse_date(date_str: &str) -> NaiveDate {
    NaiveDate::parse_from_str(date_str, "%Y-%m-%d").unwrap()
}

pub fn month(s: &str) -> MonthKey {
    to_month_key(s).unwrap()
}

/// A metric row with the money fields set and everything else empty.
pub fn row(m: &str, entries: f64, exits: f64, sales: i64, goal: f64) -> MonthlyMetricRow {
    let mut row = MonthlyMetricRow::empty(month(m));
    row.entries_cash = entries;
    row.exits_churn = exits;
    row.net_mrr = entries - exits;
    row.sales_count = Some(sales);
    row.avg_ticket = (sales > 0).then(|| entries / sales as f64);
    row.goal_amount = goal;
    row
}

/// Test fixture: two clients with a quarter of activity.
///
/// - Acme: since 2025-01-10, sales 1000 (Jan), 1500 + 500 (Feb), 2200 (Mar),
///   Marketing 400 (Jan), goal 2000 for March.
/// - Globex: since 2025-02-01, ended 2025-03-15, sale 800 (Feb),
///   uncategorized expense 100 (Feb).
pub struct StandardClients;

impl StandardClients {
    pub async fn create(service: &DashboardService) -> Result<()> {
        service.create_client("Acme", parse_date("2025-01-10")).await?;
        service.create_client("Globex", parse_date("2025-02-01")).await?;

        service
            .record_sale("Acme", 100000, parse_date("2025-01-15"), None)
            .await?;
        service
            .record_sale("Acme", 150000, parse_date("2025-02-03"), Some("Setup".into()))
            .await?;
        service
            .record_sale("Acme", 50000, parse_date("2025-02-20"), None)
            .await?;
        service
            .record_sale("Acme", 220000, parse_date("2025-03-05"), None)
            .await?;
        service
            .record_expense(
                "Acme",
                40000,
                parse_date("2025-01-20"),
                Some("Marketing".into()),
                None,
            )
            .await?;
        service.set_goal("Acme", month("2025-03"), 200000).await?;

        service
            .record_sale("Globex", 80000, parse_date("2025-02-10"), None)
            .await?;
        service
            .record_expense("Globex", 10000, parse_date("2025-02-11"), None, None)
            .await?;
        service
            .update_client_crm(
                "Globex",
                metrica::domain::ClientCrmUpdate {
                    ended_at: Some(parse_date("2025-03-15")),
                    ..Default::default()
                },
            )
            .await?;
        Ok(())
    }
}
