use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::domain::{
    AccountType, Cents, Debt, DebtId, DebtItem, Party, PartyId, Role, Transaction, TxnId, TxnKind,
};

use super::{MIGRATION_001_INITIAL, MIGRATION_002_DEBTS};

/// Repository for persisting and querying parties, transactions and debts.
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given SQLite connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to a SQLite database at the given path.
    /// Creates the database file if it doesn't exist.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = SqlitePool::connect(database_url)
            .await
            .context("Failed to connect to database")?;
        Ok(Self::new(pool))
    }

    /// Run database migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(MIGRATION_001_INITIAL)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 001")?;

        sqlx::query(MIGRATION_002_DEBTS)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 002")?;

        Ok(())
    }

    /// Initialize a new database (connect + migrate).
    pub async fn init(database_url: &str) -> Result<Self> {
        let repo = Self::connect(database_url).await?;
        repo.migrate().await?;
        Ok(repo)
    }

    // ========================
    // Party operations
    // ========================

    /// Save a new party to the database.
    pub async fn save_party(&self, party: &Party) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO parties (id, name, role, account_type, phone, email, opening_balance, notes, created_at, archived_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(party.id.to_string())
        .bind(&party.name)
        .bind(party.role.as_str())
        .bind(party.account_type.as_str())
        .bind(&party.phone)
        .bind(&party.email)
        .bind(party.opening_balance)
        .bind(&party.notes)
        .bind(party.created_at.to_rfc3339())
        .bind(party.archived_at.map(|dt| dt.to_rfc3339()))
        .execute(&self.pool)
        .await
        .context("Failed to save party")?;
        Ok(())
    }

    /// Get a party by ID.
    pub async fn get_party(&self, id: PartyId) -> Result<Option<Party>> {
        let row = sqlx::query(
            r#"
            SELECT id, name, role, account_type, phone, email, opening_balance, notes, created_at, archived_at
            FROM parties
            WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch party")?;

        match row {
            Some(row) => Ok(Some(Self::row_to_party(&row)?)),
            None => Ok(None),
        }
    }

    /// Get a party by name.
    pub async fn get_party_by_name(&self, name: &str) -> Result<Option<Party>> {
        let row = sqlx::query(
            r#"
            SELECT id, name, role, account_type, phone, email, opening_balance, notes, created_at, archived_at
            FROM parties
            WHERE name = ?
            "#,
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch party by name")?;

        match row {
            Some(row) => Ok(Some(Self::row_to_party(&row)?)),
            None => Ok(None),
        }
    }

    /// List parties, optionally restricted to one role and optionally
    /// including archived ones.
    pub async fn list_parties(
        &self,
        role: Option<Role>,
        include_archived: bool,
    ) -> Result<Vec<Party>> {
        let mut query = String::from(
            "SELECT id, name, role, account_type, phone, email, opening_balance, notes, created_at, archived_at FROM parties WHERE 1=1",
        );
        if role.is_some() {
            query.push_str(" AND role = ?");
        }
        if !include_archived {
            query.push_str(" AND archived_at IS NULL");
        }
        query.push_str(" ORDER BY name");

        let mut sql_query = sqlx::query(&query);
        if let Some(role) = role {
            sql_query = sql_query.bind(role.as_str());
        }

        let rows = sql_query
            .fetch_all(&self.pool)
            .await
            .context("Failed to list parties")?;

        rows.iter().map(Self::row_to_party).collect()
    }

    /// Archive a party (soft delete).
    pub async fn archive_party(&self, id: PartyId) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        sqlx::query("UPDATE parties SET archived_at = ? WHERE id = ?")
            .bind(&now)
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .context("Failed to archive party")?;
        Ok(())
    }

    fn row_to_party(row: &sqlx::sqlite::SqliteRow) -> Result<Party> {
        let id_str: String = row.get("id");
        let role_str: String = row.get("role");
        let account_type_str: String = row.get("account_type");
        let created_at_str: String = row.get("created_at");
        let archived_at_str: Option<String> = row.get("archived_at");

        Ok(Party {
            id: Uuid::parse_str(&id_str).context("Invalid party ID")?,
            name: row.get("name"),
            role: Role::from_str(&role_str)
                .ok_or_else(|| anyhow::anyhow!("Invalid role: {}", role_str))?,
            account_type: AccountType::from_str(&account_type_str)
                .ok_or_else(|| anyhow::anyhow!("Invalid account type: {}", account_type_str))?,
            phone: row.get("phone"),
            email: row.get("email"),
            opening_balance: row.get("opening_balance"),
            notes: row.get("notes"),
            created_at: DateTime::parse_from_rfc3339(&created_at_str)
                .context("Invalid created_at timestamp")?
                .with_timezone(&Utc),
            archived_at: archived_at_str
                .map(|s| DateTime::parse_from_rfc3339(&s))
                .transpose()
                .context("Invalid archived_at timestamp")?
                .map(|dt| dt.with_timezone(&Utc)),
        })
    }

    // ========================
    // Transaction operations
    // ========================

    /// Save a new transaction to the database.
    pub async fn save_transaction(&self, transaction: &Transaction) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO transactions (id, party_id, kind, amount, date, recorded_at, description, reference)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(transaction.id.to_string())
        .bind(transaction.party_id.to_string())
        .bind(transaction.kind.as_str())
        .bind(transaction.amount)
        .bind(transaction.date.to_rfc3339())
        .bind(transaction.recorded_at.to_rfc3339())
        .bind(&transaction.description)
        .bind(&transaction.reference)
        .execute(&self.pool)
        .await
        .context("Failed to save transaction")?;
        Ok(())
    }

    /// Get a transaction by ID.
    pub async fn get_transaction(&self, id: TxnId) -> Result<Option<Transaction>> {
        let row = sqlx::query(
            r#"
            SELECT id, party_id, kind, amount, date, recorded_at, description, reference
            FROM transactions
            WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch transaction")?;

        match row {
            Some(row) => Ok(Some(Self::row_to_transaction(&row)?)),
            None => Ok(None),
        }
    }

    /// List transactions with optional filters, ordered by date.
    pub async fn list_transactions_filtered(
        &self,
        party_id: Option<PartyId>,
        kind: Option<TxnKind>,
        from_date: Option<DateTime<Utc>>,
        to_date: Option<DateTime<Utc>>,
        limit: Option<usize>,
    ) -> Result<Vec<Transaction>> {
        let mut query = String::from(
            "SELECT id, party_id, kind, amount, date, recorded_at, description, reference FROM transactions WHERE 1=1",
        );

        // Collect string bindings first so they live long enough
        let party_id_str = party_id.map(|id| id.to_string());
        let from_date_str = from_date.map(|dt| dt.to_rfc3339());
        let to_date_str = to_date.map(|dt| dt.to_rfc3339());

        if party_id.is_some() {
            query.push_str(" AND party_id = ?");
        }
        if kind.is_some() {
            query.push_str(" AND kind = ?");
        }
        if from_date.is_some() {
            query.push_str(" AND date >= ?");
        }
        if to_date.is_some() {
            query.push_str(" AND date <= ?");
        }

        query.push_str(" ORDER BY date, recorded_at, id");

        if let Some(lim) = limit {
            query.push_str(&format!(" LIMIT {}", lim));
        }

        let mut sql_query = sqlx::query(&query);
        if let Some(ref pid) = party_id_str {
            sql_query = sql_query.bind(pid);
        }
        if let Some(kind) = kind {
            sql_query = sql_query.bind(kind.as_str());
        }
        if let Some(ref fd) = from_date_str {
            sql_query = sql_query.bind(fd);
        }
        if let Some(ref td) = to_date_str {
            sql_query = sql_query.bind(td);
        }

        let rows = sql_query
            .fetch_all(&self.pool)
            .await
            .context("Failed to list filtered transactions")?;

        rows.iter().map(Self::row_to_transaction).collect()
    }

    /// Compute a party's current balance with SQL aggregation:
    /// opening balance, plus debit kinds, minus credit kinds, plus open
    /// debt items. This is the authoritative balance.
    pub async fn compute_balance(&self, party_id: PartyId) -> Result<Cents> {
        let row = sqlx::query(
            r#"
            SELECT
                p.opening_balance
                + COALESCE((
                    SELECT SUM(CASE WHEN t.kind IN ('sale', 'debt-item') THEN t.amount ELSE -t.amount END)
                    FROM transactions t
                    WHERE t.party_id = p.id
                ), 0)
                + COALESCE((
                    SELECT SUM(di.amount)
                    FROM debt_items di
                    JOIN debts d ON d.id = di.debt_id
                    WHERE d.party_id = p.id AND di.amount > 0
                ), 0) AS balance
            FROM parties p
            WHERE p.id = ?
            "#,
        )
        .bind(party_id.to_string())
        .fetch_one(&self.pool)
        .await
        .context("Failed to compute balance")?;

        Ok(row.get("balance"))
    }

    /// Count transactions recorded against a party.
    pub async fn count_transactions_for_party(&self, party_id: PartyId) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) as count FROM transactions WHERE party_id = ?")
            .bind(party_id.to_string())
            .fetch_one(&self.pool)
            .await
            .context("Failed to count transactions")?;
        Ok(row.get("count"))
    }

    /// Get the most recent transaction date for a party.
    pub async fn get_last_activity(&self, party_id: PartyId) -> Result<Option<DateTime<Utc>>> {
        let row = sqlx::query("SELECT MAX(date) as last_activity FROM transactions WHERE party_id = ?")
            .bind(party_id.to_string())
            .fetch_one(&self.pool)
            .await
            .context("Failed to get last activity")?;

        let last_activity_str: Option<String> = row.get("last_activity");
        match last_activity_str {
            Some(s) => Ok(Some(
                DateTime::parse_from_rfc3339(&s)
                    .context("Invalid timestamp")?
                    .with_timezone(&Utc),
            )),
            None => Ok(None),
        }
    }

    fn row_to_transaction(row: &sqlx::sqlite::SqliteRow) -> Result<Transaction> {
        let id_str: String = row.get("id");
        let party_id_str: String = row.get("party_id");
        let kind_str: String = row.get("kind");
        let date_str: String = row.get("date");
        let recorded_at_str: String = row.get("recorded_at");

        Ok(Transaction {
            id: Uuid::parse_str(&id_str).context("Invalid transaction ID")?,
            party_id: Uuid::parse_str(&party_id_str).context("Invalid party ID")?,
            kind: TxnKind::from_str(&kind_str)
                .ok_or_else(|| anyhow::anyhow!("Invalid transaction kind: {}", kind_str))?,
            amount: row.get("amount"),
            date: DateTime::parse_from_rfc3339(&date_str)
                .context("Invalid date")?
                .with_timezone(&Utc),
            recorded_at: DateTime::parse_from_rfc3339(&recorded_at_str)
                .context("Invalid recorded_at")?
                .with_timezone(&Utc),
            description: row.get("description"),
            reference: row.get("reference"),
        })
    }

    // ========================
    // Debt operations
    // ========================

    /// Save a debt and its items.
    pub async fn save_debt(&self, debt: &Debt) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO debts (id, party_id, reason, created_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(debt.id.to_string())
        .bind(debt.party_id.to_string())
        .bind(&debt.reason)
        .bind(debt.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .context("Failed to save debt")?;

        for (position, item) in debt.items.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO debt_items (debt_id, position, amount, reason, due_date)
                VALUES (?, ?, ?, ?, ?)
                "#,
            )
            .bind(debt.id.to_string())
            .bind(position as i64)
            .bind(item.amount)
            .bind(&item.reason)
            .bind(item.due_date.to_rfc3339())
            .execute(&self.pool)
            .await
            .context("Failed to save debt item")?;
        }

        Ok(())
    }

    /// Get a debt by ID, with its items.
    pub async fn get_debt(&self, id: DebtId) -> Result<Option<Debt>> {
        let row = sqlx::query(
            r#"
            SELECT id, party_id, reason, created_at
            FROM debts
            WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch debt")?;

        match row {
            Some(row) => {
                let mut debt = Self::row_to_debt(&row)?;
                debt.items = self.load_debt_items(debt.id).await?;
                Ok(Some(debt))
            }
            None => Ok(None),
        }
    }

    /// List debts (with items), optionally restricted to one party.
    pub async fn list_debts(&self, party_id: Option<PartyId>) -> Result<Vec<Debt>> {
        let rows = match party_id {
            Some(pid) => {
                sqlx::query(
                    "SELECT id, party_id, reason, created_at FROM debts WHERE party_id = ? ORDER BY created_at, id",
                )
                .bind(pid.to_string())
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query("SELECT id, party_id, reason, created_at FROM debts ORDER BY created_at, id")
                    .fetch_all(&self.pool)
                    .await
            }
        }
        .context("Failed to list debts")?;

        let mut debts = Vec::with_capacity(rows.len());
        for row in &rows {
            let mut debt = Self::row_to_debt(row)?;
            debt.items = self.load_debt_items(debt.id).await?;
            debts.push(debt);
        }
        Ok(debts)
    }

    /// Delete a debt; its items go with it (ON DELETE CASCADE).
    pub async fn delete_debt(&self, id: DebtId) -> Result<()> {
        sqlx::query("DELETE FROM debt_items WHERE debt_id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .context("Failed to delete debt items")?;
        sqlx::query("DELETE FROM debts WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .context("Failed to delete debt")?;
        Ok(())
    }

    /// Sum open debt items for a party.
    pub async fn sum_debt_items_for_party(&self, party_id: PartyId) -> Result<Cents> {
        let row = sqlx::query(
            r#"
            SELECT COALESCE(SUM(di.amount), 0) as total
            FROM debt_items di
            JOIN debts d ON d.id = di.debt_id
            WHERE d.party_id = ? AND di.amount > 0
            "#,
        )
        .bind(party_id.to_string())
        .fetch_one(&self.pool)
        .await
        .context("Failed to sum debt items")?;

        Ok(row.get("total"))
    }

    /// Sum all open debt items across parties.
    pub async fn sum_all_debt_items(&self) -> Result<Cents> {
        let row =
            sqlx::query("SELECT COALESCE(SUM(amount), 0) as total FROM debt_items WHERE amount > 0")
                .fetch_one(&self.pool)
                .await
                .context("Failed to sum debt items")?;
        Ok(row.get("total"))
    }

    async fn load_debt_items(&self, debt_id: DebtId) -> Result<Vec<DebtItem>> {
        let rows = sqlx::query(
            r#"
            SELECT amount, reason, due_date
            FROM debt_items
            WHERE debt_id = ?
            ORDER BY position
            "#,
        )
        .bind(debt_id.to_string())
        .fetch_all(&self.pool)
        .await
        .context("Failed to load debt items")?;

        rows.iter()
            .map(|row| {
                let due_date_str: String = row.get("due_date");
                Ok(DebtItem {
                    amount: row.get("amount"),
                    reason: row.get("reason"),
                    due_date: DateTime::parse_from_rfc3339(&due_date_str)
                        .context("Invalid due_date")?
                        .with_timezone(&Utc),
                })
            })
            .collect()
    }

    fn row_to_debt(row: &sqlx::sqlite::SqliteRow) -> Result<Debt> {
        let id_str: String = row.get("id");
        let party_id_str: String = row.get("party_id");
        let created_at_str: String = row.get("created_at");

        Ok(Debt {
            id: Uuid::parse_str(&id_str).context("Invalid debt ID")?,
            party_id: Uuid::parse_str(&party_id_str).context("Invalid party ID")?,
            reason: row.get("reason"),
            created_at: DateTime::parse_from_rfc3339(&created_at_str)
                .context("Invalid created_at timestamp")?
                .with_timezone(&Utc),
            items: Vec::new(),
        })
    }
}
