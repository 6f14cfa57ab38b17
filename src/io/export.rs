use std::collections::HashMap;
use std::io::Write;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::application::LedgerService;
use crate::domain::{format_cents, Debt, Direction, Party, PartyId, Transaction};

/// Database snapshot for full export/import
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSnapshot {
    pub version: String,
    pub exported_at: DateTime<Utc>,
    pub parties: Vec<Party>,
    pub transactions: Vec<Transaction>,
    pub debts: Vec<Debt>,
}

/// Exporter for converting ledger data to various formats
pub struct Exporter<'a> {
    service: &'a LedgerService,
}

impl<'a> Exporter<'a> {
    pub fn new(service: &'a LedgerService) -> Self {
        Self { service }
    }

    /// Export a party statement to CSV: one row per statement line, each
    /// carrying the running balance, with an opening balance row first.
    pub async fn export_statement_csv<W: Write>(
        &self,
        writer: W,
        party_name: &str,
        from_date: Option<DateTime<Utc>>,
        to_date: Option<DateTime<Utc>>,
    ) -> Result<usize> {
        let statement = self
            .service
            .get_statement(party_name, from_date, to_date)
            .await?;
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record([
            "date",
            "kind",
            "description",
            "reference",
            "debit",
            "credit",
            "balance",
        ])?;

        csv_writer.write_record([
            statement.party.created_at.format("%Y-%m-%d").to_string(),
            "opening-balance".to_string(),
            String::new(),
            String::new(),
            String::new(),
            String::new(),
            format_cents(statement.summary.opening_balance),
        ])?;

        let mut count = 0;
        for line in &statement.lines {
            let (debit, credit) = match line.kind.direction() {
                Direction::Debit => (format_cents(line.amount), String::new()),
                Direction::Credit => (String::new(), format_cents(line.amount)),
            };
            csv_writer.write_record([
                line.date.format("%Y-%m-%d").to_string(),
                line.kind.to_string(),
                line.description.clone().unwrap_or_default(),
                line.reference.clone().unwrap_or_default(),
                debit,
                credit,
                format_cents(line.running_balance),
            ])?;
            count += 1;
        }

        csv_writer.flush()?;
        Ok(count)
    }

    /// Export all transactions to CSV.
    pub async fn export_transactions_csv<W: Write>(&self, writer: W) -> Result<usize> {
        let transactions = self.service.list_all_transactions().await?;
        let names = self.party_names().await?;
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record([
            "id",
            "party",
            "kind",
            "amount",
            "date",
            "description",
            "reference",
        ])?;

        let mut count = 0;
        for transaction in &transactions {
            // A transaction whose party row is gone still gets exported;
            // only the label degrades.
            let party_name = names
                .get(&transaction.party_id)
                .map(String::as_str)
                .unwrap_or("unknown");

            csv_writer.write_record([
                transaction.id.to_string(),
                party_name.to_string(),
                transaction.kind.to_string(),
                format_cents(transaction.amount),
                transaction.date.to_rfc3339(),
                transaction.description.clone().unwrap_or_default(),
                transaction.reference.clone().unwrap_or_default(),
            ])?;
            count += 1;
        }

        csv_writer.flush()?;
        Ok(count)
    }

    /// Export current balances for all active parties to CSV.
    pub async fn export_balances_csv<W: Write>(&self, writer: W) -> Result<usize> {
        let overview = self.service.get_overview().await?;
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record(["party", "role", "balance"])?;

        let mut count = 0;
        for entry in &overview.balances {
            csv_writer.write_record([
                entry.party_name.clone(),
                entry.role.to_string(),
                format_cents(entry.balance),
            ])?;
            count += 1;
        }

        csv_writer.flush()?;
        Ok(count)
    }

    /// Export all parties to CSV.
    pub async fn export_parties_csv<W: Write>(&self, writer: W) -> Result<usize> {
        let parties = self.service.list_all_parties().await?;
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record([
            "name",
            "role",
            "account_type",
            "phone",
            "email",
            "opening_balance",
            "archived",
        ])?;

        let mut count = 0;
        for party in &parties {
            csv_writer.write_record([
                party.name.clone(),
                party.role.to_string(),
                party.account_type.to_string(),
                party.phone.clone().unwrap_or_default(),
                party.email.clone().unwrap_or_default(),
                format_cents(party.opening_balance),
                if party.is_archived() { "yes" } else { "no" }.to_string(),
            ])?;
            count += 1;
        }

        csv_writer.flush()?;
        Ok(count)
    }

    /// Export the full database as a JSON snapshot.
    pub async fn export_full_json<W: Write>(&self, mut writer: W) -> Result<DatabaseSnapshot> {
        let snapshot = DatabaseSnapshot {
            version: env!("CARGO_PKG_VERSION").to_string(),
            exported_at: Utc::now(),
            parties: self.service.list_all_parties().await?,
            transactions: self.service.list_all_transactions().await?,
            debts: self.service.list_all_debts().await?,
        };

        let json = serde_json::to_string_pretty(&snapshot)?;
        writer.write_all(json.as_bytes())?;
        writer.flush()?;

        Ok(snapshot)
    }

    async fn party_names(&self) -> Result<HashMap<PartyId, String>> {
        let parties = self.service.list_all_parties().await?;
        Ok(parties.into_iter().map(|p| (p.id, p.name)).collect())
    }
}
