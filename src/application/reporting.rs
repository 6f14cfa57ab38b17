use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{Cents, Role};

/// A single party's balance line within a report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartyBalance {
    pub party_name: String,
    pub role: Role,
    pub balance: Cents,
}

/// Business-wide position: what clients owe, what suppliers are owed,
/// and what the business owes its employees.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Overview {
    pub as_of: DateTime<Utc>,
    pub clients_receivable: Cents,
    pub suppliers_payable: Cents,
    pub employees_payable: Cents,
    pub open_debts_total: Cents,
    pub balances: Vec<PartyBalance>,
}
