use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Cents, PartyId, Role};

pub type TxnId = Uuid;
pub type DebtId = Uuid;

/// Whether a transaction increases or decreases what the party owes
/// the business (or, for employees, what the business owes them).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Debit,
    Credit,
}

/// Transaction kinds. Each kind has a fixed sign contribution to the
/// running balance and a fixed rank used to break same-date ties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TxnKind {
    /// Goods or services sold to a client (includes goods-issue vouchers)
    Sale,
    /// An itemized debt entry recorded against a party
    DebtItem,
    /// Client returns goods, reducing what they owe
    SalesReturn,
    /// Money received from a client
    Receipt,
    /// Money paid out to a supplier
    Payment,
    /// Payroll deduction reducing an employee's net pay
    Deduction,
}

impl TxnKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TxnKind::Sale => "sale",
            TxnKind::DebtItem => "debt-item",
            TxnKind::SalesReturn => "sales-return",
            TxnKind::Receipt => "receipt",
            TxnKind::Payment => "payment",
            TxnKind::Deduction => "deduction",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "sale" => Some(TxnKind::Sale),
            "debt-item" => Some(TxnKind::DebtItem),
            "sales-return" => Some(TxnKind::SalesReturn),
            "receipt" => Some(TxnKind::Receipt),
            "payment" => Some(TxnKind::Payment),
            "deduction" => Some(TxnKind::Deduction),
            _ => None,
        }
    }

    pub fn direction(&self) -> Direction {
        match self {
            TxnKind::Sale | TxnKind::DebtItem => Direction::Debit,
            TxnKind::SalesReturn | TxnKind::Receipt | TxnKind::Payment | TxnKind::Deduction => {
                Direction::Credit
            }
        }
    }

    /// Apply this kind's sign to an unsigned amount.
    pub fn signed(&self, amount: Cents) -> Cents {
        match self.direction() {
            Direction::Debit => amount,
            Direction::Credit => -amount,
        }
    }

    /// Fixed rank for ordering transactions that share a date: debits
    /// before credits, stable within each group. Incidental fetch order
    /// must never decide statement order.
    pub fn sort_rank(&self) -> u8 {
        match self {
            TxnKind::Sale => 0,
            TxnKind::DebtItem => 1,
            TxnKind::SalesReturn => 2,
            TxnKind::Receipt => 3,
            TxnKind::Payment => 4,
            TxnKind::Deduction => 5,
        }
    }

    /// Which party roles this kind may be recorded against.
    pub fn allowed_for(&self, role: Role) -> bool {
        match self {
            TxnKind::Sale | TxnKind::SalesReturn | TxnKind::Receipt => role == Role::Client,
            TxnKind::Payment => role == Role::Supplier,
            TxnKind::Deduction => role == Role::Employee,
            TxnKind::DebtItem => true,
        }
    }
}

impl std::fmt::Display for TxnKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single movement on a party's account. Transactions are immutable;
/// corrections are recorded as new transactions of the opposite direction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TxnId,
    pub party_id: PartyId,
    pub kind: TxnKind,
    /// Unsigned amount in cents (always positive); the kind carries the sign
    pub amount: Cents,
    /// When the transaction occurred in the real world
    pub date: DateTime<Utc>,
    /// When we recorded it in the system
    pub recorded_at: DateTime<Utc>,
    pub description: Option<String>,
    /// External reference (voucher number, invoice number, etc.)
    pub reference: Option<String>,
}

impl Transaction {
    pub fn new(party_id: PartyId, kind: TxnKind, amount: Cents, date: DateTime<Utc>) -> Self {
        assert!(amount > 0, "Transaction amount must be positive");
        Self {
            id: Uuid::new_v4(),
            party_id,
            kind,
            amount,
            date,
            recorded_at: Utc::now(),
            description: None,
            reference: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    /// The signed balance contribution of this transaction.
    pub fn signed_amount(&self) -> Cents {
        self.kind.signed(self.amount)
    }
}

/// An itemized debt recorded against a party. The debt total is always
/// the sum of its items; it is never stored separately.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Debt {
    pub id: DebtId,
    pub party_id: PartyId,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub items: Vec<DebtItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebtItem {
    pub amount: Cents,
    pub reason: Option<String>,
    pub due_date: DateTime<Utc>,
}

impl Debt {
    pub fn new(party_id: PartyId, reason: Option<String>, items: Vec<DebtItem>) -> Self {
        Self {
            id: Uuid::new_v4(),
            party_id,
            reason,
            created_at: Utc::now(),
            items,
        }
    }

    pub fn total(&self) -> Cents {
        self.items.iter().map(|item| item.amount).sum()
    }

    /// Expand the debt into one debit transaction per item, dated by the
    /// item's due date, for merging into a party statement.
    pub fn as_transactions(&self) -> Vec<Transaction> {
        self.items
            .iter()
            .filter(|item| item.amount > 0)
            .map(|item| {
                let mut txn =
                    Transaction::new(self.party_id, TxnKind::DebtItem, item.amount, item.due_date);
                if let Some(reason) = item.reason.as_ref().or(self.reason.as_ref()) {
                    txn = txn.with_description(reason.clone());
                }
                txn
            })
            .collect()
    }
}
