use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use std::io::Read;

use crate::application::{AppError, LedgerService, TransactionFilter};
use crate::domain::{parse_cents, parse_cents_lenient, AccountType, Cents, Role, TxnKind};
use crate::io::export::DatabaseSnapshot;

/// Result of an import operation
#[derive(Debug, Clone)]
pub struct ImportResult {
    pub imported: usize,
    pub skipped: usize,
    pub errors: Vec<ImportError>,
}

/// Error that occurred during import
#[derive(Debug, Clone)]
pub struct ImportError {
    pub line: usize,
    pub field: Option<String>,
    pub error: String,
}

/// Options for import operations
#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    pub dry_run: bool,
    pub skip_duplicates: bool,
    pub create_missing_parties: bool,
    pub validate_only: bool,
    /// Coerce unparsable amounts to zero (and skip the row) instead of
    /// reporting them as errors. For feeds known to carry junk amounts.
    pub lenient_amounts: bool,
}

/// Importer for loading data into the ledger
pub struct Importer<'a> {
    service: &'a LedgerService,
}

impl<'a> Importer<'a> {
    pub fn new(service: &'a LedgerService) -> Self {
        Self { service }
    }

    /// Import transactions from CSV, in the layout written by
    /// `Exporter::export_transactions_csv`:
    /// id, party, kind, amount, date, description, reference
    pub async fn import_transactions_csv<R: Read>(
        &self,
        reader: R,
        options: ImportOptions,
    ) -> Result<ImportResult> {
        let mut csv_reader = csv::Reader::from_reader(reader);
        let mut imported = 0;
        let mut skipped = 0;
        let mut errors = Vec::new();

        for (line_num, result) in csv_reader.records().enumerate() {
            let line = line_num + 2; // +2 for header and 0-indexing

            let record = match result {
                Ok(r) => r,
                Err(e) => {
                    errors.push(ImportError {
                        line,
                        field: None,
                        error: format!("CSV parse error: {}", e),
                    });
                    continue;
                }
            };

            let party_name = record.get(1).unwrap_or("");
            let kind_str = record.get(2).unwrap_or("");
            let amount_str = record.get(3).unwrap_or("");
            let date_str = record.get(4).unwrap_or("");
            let description = record.get(5).filter(|s| !s.is_empty()).map(String::from);
            let reference = record.get(6).filter(|s| !s.is_empty()).map(String::from);

            let kind = match TxnKind::from_str(kind_str) {
                Some(k) => k,
                None => {
                    errors.push(ImportError {
                        line,
                        field: Some("kind".to_string()),
                        error: format!("Invalid transaction kind: {}", kind_str),
                    });
                    continue;
                }
            };

            let amount = if options.lenient_amounts {
                parse_cents_lenient(amount_str)
            } else {
                match parse_cents(amount_str) {
                    Ok(a) => a,
                    Err(e) => {
                        errors.push(ImportError {
                            line,
                            field: Some("amount".to_string()),
                            error: format!("Invalid amount: {}", e),
                        });
                        continue;
                    }
                }
            };

            // Coerced or genuinely zero amounts carry no balance effect
            if amount <= 0 {
                skipped += 1;
                continue;
            }

            let date = match parse_timestamp(date_str) {
                Ok(d) => d,
                Err(e) => {
                    errors.push(ImportError {
                        line,
                        field: Some("date".to_string()),
                        error: format!("Invalid date: {}", e),
                    });
                    continue;
                }
            };

            // Resolve the party up front so validation passes report the
            // same per-line errors a real import would
            let party = match self.service.get_party(party_name).await {
                Ok(p) => Some(p),
                Err(AppError::PartyNotFound(_)) if options.create_missing_parties => None,
                Err(e) => {
                    errors.push(ImportError {
                        line,
                        field: Some("party".to_string()),
                        error: format!("Party error: {}", e),
                    });
                    continue;
                }
            };

            if let Some(party) = &party {
                if party.is_archived() {
                    errors.push(ImportError {
                        line,
                        field: Some("party".to_string()),
                        error: format!("Party is archived: {}", party.name),
                    });
                    continue;
                }
                if !kind.allowed_for(party.role) {
                    errors.push(ImportError {
                        line,
                        field: Some("kind".to_string()),
                        error: format!(
                            "A {} cannot be recorded against a {} account",
                            kind, party.role
                        ),
                    });
                    continue;
                }
            }

            if options.skip_duplicates
                && party.is_some()
                && self
                    .transaction_exists(party_name, kind, amount, date, reference.as_deref())
                    .await?
            {
                skipped += 1;
                continue;
            }

            // Validation passes stop short of writing anything
            if options.dry_run || options.validate_only {
                imported += 1;
                continue;
            }

            if party.is_none() {
                if let Err(e) = self.ensure_party_exists(party_name, kind).await {
                    errors.push(ImportError {
                        line,
                        field: Some("party".to_string()),
                        error: format!("Party error: {}", e),
                    });
                    continue;
                }
            }

            match self
                .service
                .record_transaction(party_name, kind, amount, date, description, reference)
                .await
            {
                Ok(_) => {
                    imported += 1;
                }
                Err(e) => {
                    errors.push(ImportError {
                        line,
                        field: None,
                        error: format!("Transaction creation failed: {}", e),
                    });
                }
            }
        }

        Ok(ImportResult {
            imported,
            skipped,
            errors,
        })
    }

    /// Import a full database from a JSON snapshot: parties first, then
    /// transactions, then debts, so references resolve.
    pub async fn import_full_json<R: Read>(
        &self,
        reader: R,
        options: ImportOptions,
    ) -> Result<ImportResult> {
        let snapshot: DatabaseSnapshot = serde_json::from_reader(reader)?;

        let mut imported = 0;
        let mut skipped = 0;
        let mut errors = Vec::new();

        if options.validate_only || options.dry_run {
            return Ok(ImportResult {
                imported: snapshot.parties.len()
                    + snapshot.transactions.len()
                    + snapshot.debts.len(),
                skipped: 0,
                errors,
            });
        }

        let mut name_by_id = std::collections::HashMap::new();
        for party in &snapshot.parties {
            name_by_id.insert(party.id, party.name.clone());
            match self
                .service
                .create_party(
                    party.name.clone(),
                    party.role,
                    party.account_type,
                    party.phone.clone(),
                    party.email.clone(),
                    party.opening_balance,
                    party.notes.clone(),
                )
                .await
            {
                Ok(_) => imported += 1,
                Err(AppError::PartyAlreadyExists(_)) if options.skip_duplicates => {
                    skipped += 1;
                }
                Err(e) => {
                    errors.push(ImportError {
                        line: 0,
                        field: Some("party".to_string()),
                        error: format!("{}: {}", party.name, e),
                    });
                }
            }
        }

        for transaction in &snapshot.transactions {
            let Some(party_name) = name_by_id.get(&transaction.party_id) else {
                errors.push(ImportError {
                    line: 0,
                    field: Some("transaction".to_string()),
                    error: format!("Unknown party for transaction {}", transaction.id),
                });
                continue;
            };

            match self
                .service
                .record_transaction(
                    party_name,
                    transaction.kind,
                    transaction.amount,
                    transaction.date,
                    transaction.description.clone(),
                    transaction.reference.clone(),
                )
                .await
            {
                Ok(_) => imported += 1,
                Err(e) => errors.push(ImportError {
                    line: 0,
                    field: Some("transaction".to_string()),
                    error: format!("{}: {}", transaction.id, e),
                }),
            }
        }

        for debt in &snapshot.debts {
            let Some(party_name) = name_by_id.get(&debt.party_id) else {
                errors.push(ImportError {
                    line: 0,
                    field: Some("debt".to_string()),
                    error: format!("Unknown party for debt {}", debt.id),
                });
                continue;
            };

            match self
                .service
                .record_debt(party_name, debt.reason.clone(), debt.items.clone())
                .await
            {
                Ok(_) => imported += 1,
                Err(e) => errors.push(ImportError {
                    line: 0,
                    field: Some("debt".to_string()),
                    error: format!("{}: {}", debt.id, e),
                }),
            }
        }

        Ok(ImportResult {
            imported,
            skipped,
            errors,
        })
    }

    // A row is a duplicate when an existing transaction for the same party
    // already carries the same kind, amount, date and reference.
    async fn transaction_exists(
        &self,
        party: &str,
        kind: TxnKind,
        amount: Cents,
        date: DateTime<Utc>,
        reference: Option<&str>,
    ) -> Result<bool> {
        let existing = self
            .service
            .list_transactions(TransactionFilter {
                party: Some(party.to_string()),
                kind: Some(kind),
                from_date: Some(date),
                to_date: Some(date),
                ..Default::default()
            })
            .await?;

        Ok(existing
            .iter()
            .any(|t| t.amount == amount && t.reference.as_deref() == reference))
    }

    // A feed row naming an unknown party gets a default account matching
    // the transaction kind, fixable by hand later.
    async fn ensure_party_exists(&self, name: &str, kind: TxnKind) -> Result<()> {
        if self.service.get_party(name).await.is_ok() {
            return Ok(());
        }

        let role = match kind {
            TxnKind::Payment => Role::Supplier,
            TxnKind::Deduction => Role::Employee,
            _ => Role::Client,
        };

        self.service
            .create_party(
                name.to_string(),
                role,
                AccountType::Credit,
                None,
                None,
                0,
                Some("Auto-created during import".to_string()),
            )
            .await?;

        Ok(())
    }
}

// Helper function to parse timestamps in either RFC3339 or YYYY-MM-DD form
fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(date.and_hms_opt(0, 0, 0).unwrap().and_utc());
    }

    anyhow::bail!("Invalid timestamp format: {}", s)
}
