// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use mizan::application::LedgerService;
use mizan::domain::{AccountType, Role};
use tempfile::TempDir;

/// Helper to create a test service with a temporary database
pub async fn test_service() -> Result<(LedgerService, TempDir)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test.db");
    let service = LedgerService::init(db_path.to_str().unwrap()).await?;
    Ok((service, temp_dir))
}

/// Helper to parse a date string into DateTime<Utc>
pub fn parse_date(date_str: &str) -> DateTime<Utc> {
    NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
        .and_utc()
}

/// Test fixture: Standard party setup
pub struct StandardParties;

impl StandardParties {
    /// Create one party of each role: a credit client, a cash supplier
    /// and an employee
    pub async fn create_basic(service: &LedgerService) -> Result<()> {
        service
            .create_party(
                "Al Noor Trading".into(),
                Role::Client,
                AccountType::Credit,
                Some("0501234567".into()),
                None,
                0,
                None,
            )
            .await?;
        service
            .create_party(
                "Badr Supplies".into(),
                Role::Supplier,
                AccountType::Cash,
                None,
                None,
                0,
                None,
            )
            .await?;
        service
            .create_party(
                "Salim Hassan".into(),
                Role::Employee,
                AccountType::Cash,
                None,
                None,
                0,
                None,
            )
            .await?;
        Ok(())
    }

    /// Create a credit client carrying an opening balance
    pub async fn create_client_with_opening(
        service: &LedgerService,
        name: &str,
        opening: i64,
    ) -> Result<()> {
        service
            .create_party(
                name.into(),
                Role::Client,
                AccountType::Credit,
                None,
                None,
                opening,
                None,
            )
            .await?;
        Ok(())
    }
}
