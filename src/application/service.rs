use chrono::{DateTime, Utc};

use crate::domain::{
    build_statement, summarize, AccountType, Cents, Debt, DebtId, DebtItem, LedgerSummary, Party,
    PartyFilter, Role, StatementLine, Transaction, TxnId, TxnKind, filter_parties,
};
use crate::storage::Repository;

use super::{AppError, Overview, PartyBalance};

/// Application service providing high-level operations for the ledger.
/// This is the primary interface for any client (CLI, API, TUI, etc.).
pub struct LedgerService {
    repo: Repository,
}

/// Result of recording a transaction
pub struct TransactionResult {
    pub transaction: Transaction,
    pub party_name: String,
}

/// Detailed party information
pub struct PartyInfo {
    pub party: Party,
    pub balance: Cents,
    pub transaction_count: i64,
    pub open_debts: Cents,
    pub last_activity: Option<DateTime<Utc>>,
}

/// A party's full statement with its derived summary
pub struct PartyStatement {
    pub party: Party,
    pub lines: Vec<StatementLine>,
    pub summary: LedgerSummary,
}

/// Filter for querying transactions
#[derive(Default)]
pub struct TransactionFilter {
    pub party: Option<String>,
    pub kind: Option<TxnKind>,
    pub from_date: Option<DateTime<Utc>>,
    pub to_date: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
}

impl LedgerService {
    /// Create a new ledger service with the given repository.
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    /// Initialize a new database at the given path.
    pub async fn init(database_path: &str) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}?mode=rwc", database_path);
        let repo = Repository::init(&db_url).await?;
        Ok(Self::new(repo))
    }

    /// Connect to an existing database.
    pub async fn connect(database_path: &str) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}", database_path);
        let repo = Repository::connect(&db_url).await?;
        Ok(Self::new(repo))
    }

    // ========================
    // Party operations
    // ========================

    /// Create a new party (client, supplier or employee).
    #[allow(clippy::too_many_arguments)]
    pub async fn create_party(
        &self,
        name: String,
        role: Role,
        account_type: AccountType,
        phone: Option<String>,
        email: Option<String>,
        opening_balance: Cents,
        notes: Option<String>,
    ) -> Result<Party, AppError> {
        if self.repo.get_party_by_name(&name).await?.is_some() {
            return Err(AppError::PartyAlreadyExists(name));
        }

        let mut party =
            Party::new(name, role, account_type).with_opening_balance(opening_balance);
        if let Some(phone) = phone {
            party = party.with_phone(phone);
        }
        if let Some(email) = email {
            party = party.with_email(email);
        }
        if let Some(notes) = notes {
            party = party.with_notes(notes);
        }

        self.repo.save_party(&party).await?;
        Ok(party)
    }

    /// Get a party by name.
    pub async fn get_party(&self, name: &str) -> Result<Party, AppError> {
        self.repo
            .get_party_by_name(name)
            .await?
            .ok_or_else(|| AppError::PartyNotFound(name.to_string()))
    }

    /// Get detailed party information, including the authoritative balance.
    pub async fn get_party_info(&self, name: &str) -> Result<PartyInfo, AppError> {
        let party = self.get_party(name).await?;
        let balance = self.repo.compute_balance(party.id).await?;
        let transaction_count = self.repo.count_transactions_for_party(party.id).await?;
        let open_debts = self.repo.sum_debt_items_for_party(party.id).await?;
        let last_activity = self.repo.get_last_activity(party.id).await?;

        Ok(PartyInfo {
            party,
            balance,
            transaction_count,
            open_debts,
            last_activity,
        })
    }

    /// List parties, optionally restricted to one role.
    pub async fn list_parties(
        &self,
        role: Option<Role>,
        include_archived: bool,
    ) -> Result<Vec<Party>, AppError> {
        Ok(self.repo.list_parties(role, include_archived).await?)
    }

    /// Search parties with a free-text query plus structured filters.
    pub async fn search_parties(&self, filter: &PartyFilter) -> Result<Vec<Party>, AppError> {
        let parties = self.repo.list_parties(None, true).await?;
        Ok(filter_parties(&parties, filter))
    }

    /// Archive a party (soft delete).
    pub async fn archive_party(&self, name: &str) -> Result<Party, AppError> {
        let party = self.get_party(name).await?;
        self.repo.archive_party(party.id).await?;
        Ok(party)
    }

    // ========================
    // Transaction operations
    // ========================

    /// Record a new transaction against a party's account.
    pub async fn record_transaction(
        &self,
        party_name: &str,
        kind: TxnKind,
        amount: Cents,
        date: DateTime<Utc>,
        description: Option<String>,
        reference: Option<String>,
    ) -> Result<TransactionResult, AppError> {
        if amount <= 0 {
            return Err(AppError::InvalidAmount(
                "Amount must be positive".to_string(),
            ));
        }

        let party = self.get_party(party_name).await?;
        if party.is_archived() {
            return Err(AppError::PartyArchived(party_name.to_string()));
        }
        if !kind.allowed_for(party.role) {
            return Err(AppError::KindNotAllowedForRole {
                kind,
                role: party.role,
            });
        }

        let mut transaction = Transaction::new(party.id, kind, amount, date);
        if let Some(desc) = description {
            transaction = transaction.with_description(desc);
        }
        if let Some(reference) = reference {
            transaction = transaction.with_reference(reference);
        }

        self.repo.save_transaction(&transaction).await?;

        Ok(TransactionResult {
            transaction,
            party_name: party.name,
        })
    }

    /// Get a transaction by id.
    pub async fn get_transaction(&self, id: TxnId) -> Result<Transaction, AppError> {
        self.repo
            .get_transaction(id)
            .await?
            .ok_or_else(|| AppError::TransactionNotFound(id.to_string()))
    }

    /// List transactions with optional filters.
    pub async fn list_transactions(
        &self,
        filter: TransactionFilter,
    ) -> Result<Vec<Transaction>, AppError> {
        let party_id = match &filter.party {
            Some(name) => Some(self.get_party(name).await?.id),
            None => None,
        };

        Ok(self
            .repo
            .list_transactions_filtered(
                party_id,
                filter.kind,
                filter.from_date,
                filter.to_date,
                filter.limit,
            )
            .await?)
    }

    // ========================
    // Debt operations
    // ========================

    /// Record an itemized debt against a party.
    pub async fn record_debt(
        &self,
        party_name: &str,
        reason: Option<String>,
        items: Vec<DebtItem>,
    ) -> Result<Debt, AppError> {
        if items.is_empty() || items.iter().all(|item| item.amount <= 0) {
            return Err(AppError::InvalidAmount(
                "A debt needs at least one item with a positive amount".to_string(),
            ));
        }

        let party = self.get_party(party_name).await?;
        if party.is_archived() {
            return Err(AppError::PartyArchived(party_name.to_string()));
        }

        let debt = Debt::new(party.id, reason, items);
        self.repo.save_debt(&debt).await?;
        Ok(debt)
    }

    /// Get a debt by id.
    pub async fn get_debt(&self, id: DebtId) -> Result<Debt, AppError> {
        self.repo
            .get_debt(id)
            .await?
            .ok_or_else(|| AppError::DebtNotFound(id.to_string()))
    }

    /// List debts, optionally restricted to one party.
    pub async fn list_debts(&self, party_name: Option<&str>) -> Result<Vec<Debt>, AppError> {
        let party_id = match party_name {
            Some(name) => Some(self.get_party(name).await?.id),
            None => None,
        };
        Ok(self.repo.list_debts(party_id).await?)
    }

    /// Delete a debt and its items.
    pub async fn delete_debt(&self, id: DebtId) -> Result<Debt, AppError> {
        let debt = self.get_debt(id).await?;
        self.repo.delete_debt(id).await?;
        Ok(debt)
    }

    // ========================
    // Statement operations
    // ========================

    /// Build a party's statement: transactions plus expanded debt items,
    /// aggregated by the domain ledger. An optional date window restricts
    /// which movements appear; the opening balance is unaffected by it.
    pub async fn get_statement(
        &self,
        party_name: &str,
        from_date: Option<DateTime<Utc>>,
        to_date: Option<DateTime<Utc>>,
    ) -> Result<PartyStatement, AppError> {
        let party = self.get_party(party_name).await?;
        let transactions = self.movements_for(&party, from_date, to_date).await?;

        let lines = build_statement(&party, &transactions);
        let summary = summarize(&party, &transactions);

        Ok(PartyStatement {
            party,
            lines,
            summary,
        })
    }

    /// Summarize a party's position without the line detail.
    pub async fn get_summary(&self, party_name: &str) -> Result<LedgerSummary, AppError> {
        let party = self.get_party(party_name).await?;
        let transactions = self.movements_for(&party, None, None).await?;
        Ok(summarize(&party, &transactions))
    }

    /// The authoritative current balance for a party, aggregated in SQL.
    pub async fn get_balance(&self, party_name: &str) -> Result<Cents, AppError> {
        let party = self.get_party(party_name).await?;
        Ok(self.repo.compute_balance(party.id).await?)
    }

    async fn movements_for(
        &self,
        party: &Party,
        from_date: Option<DateTime<Utc>>,
        to_date: Option<DateTime<Utc>>,
    ) -> Result<Vec<Transaction>, AppError> {
        let mut transactions = self
            .repo
            .list_transactions_filtered(Some(party.id), None, from_date, to_date, None)
            .await?;

        for debt in self.repo.list_debts(Some(party.id)).await? {
            transactions.extend(
                debt.as_transactions()
                    .into_iter()
                    .filter(|txn| from_date.is_none_or(|from| txn.date >= from))
                    .filter(|txn| to_date.is_none_or(|to| txn.date <= to)),
            );
        }

        Ok(transactions)
    }

    // ========================
    // Reporting operations
    // ========================

    /// Business-wide balances, grouped by role.
    pub async fn get_overview(&self) -> Result<Overview, AppError> {
        let parties = self.repo.list_parties(None, false).await?;

        let mut clients_receivable = 0;
        let mut suppliers_payable = 0;
        let mut employees_payable = 0;
        let mut balances = Vec::with_capacity(parties.len());

        for party in &parties {
            let balance = self.repo.compute_balance(party.id).await?;
            match party.role {
                Role::Client => clients_receivable += balance,
                Role::Supplier => suppliers_payable += balance,
                Role::Employee => employees_payable += balance,
            }
            balances.push(PartyBalance {
                party_name: party.name.clone(),
                role: party.role,
                balance,
            });
        }

        let open_debts_total = self.repo.sum_all_debt_items().await?;

        Ok(Overview {
            as_of: Utc::now(),
            clients_receivable,
            suppliers_payable,
            employees_payable,
            open_debts_total,
            balances,
        })
    }

    /// List everything, for snapshot export.
    pub async fn list_all_parties(&self) -> Result<Vec<Party>, AppError> {
        Ok(self.repo.list_parties(None, true).await?)
    }

    pub async fn list_all_transactions(&self) -> Result<Vec<Transaction>, AppError> {
        Ok(self
            .repo
            .list_transactions_filtered(None, None, None, None, None)
            .await?)
    }

    pub async fn list_all_debts(&self) -> Result<Vec<Debt>, AppError> {
        Ok(self.repo.list_debts(None).await?)
    }
}
