use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Cents;

pub type PartyId = Uuid;

/// The role a party plays towards the business. The role decides which
/// transaction kinds may be recorded against the party's account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Buys from the business - sales and receipts
    Client,
    /// Sells to the business - purchases and payments
    Supplier,
    /// Works for the business - payroll deductions
    Employee,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Client => "client",
            Role::Supplier => "supplier",
            Role::Employee => "employee",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "client" => Some(Role::Client),
            "supplier" => Some(Role::Supplier),
            "employee" => Some(Role::Employee),
            _ => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How the party settles: cash accounts settle per transaction, credit
/// accounts carry a running balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    Cash,
    Credit,
}

impl AccountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountType::Cash => "cash",
            AccountType::Credit => "credit",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "cash" => Some(AccountType::Cash),
            "credit" => Some(AccountType::Credit),
            _ => None,
        }
    }
}

impl std::fmt::Display for AccountType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Party {
    pub id: PartyId,
    pub name: String,
    pub role: Role,
    pub account_type: AccountType,
    pub phone: Option<String>,
    pub email: Option<String>,
    /// Signed balance carried in from before the ledger started tracking
    /// this party. Positive means the party owes the business.
    pub opening_balance: Cents,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub archived_at: Option<DateTime<Utc>>,
}

impl Party {
    pub fn new(name: String, role: Role, account_type: AccountType) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            role,
            account_type,
            phone: None,
            email: None,
            opening_balance: 0,
            notes: None,
            created_at: Utc::now(),
            archived_at: None,
        }
    }

    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_opening_balance(mut self, opening_balance: Cents) -> Self {
        self.opening_balance = opening_balance;
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn is_archived(&self) -> bool {
        self.archived_at.is_some()
    }
}

/// Search filter over a fetched party list. All set fields must match
/// (conjunctive); the free-text query matches name, phone or email.
#[derive(Debug, Clone, Default)]
pub struct PartyFilter {
    pub query: Option<String>,
    pub role: Option<Role>,
    pub account_type: Option<AccountType>,
    pub include_archived: bool,
}

impl PartyFilter {
    pub fn matches(&self, party: &Party) -> bool {
        if !self.include_archived && party.is_archived() {
            return false;
        }
        if let Some(role) = self.role {
            if party.role != role {
                return false;
            }
        }
        if let Some(account_type) = self.account_type {
            if party.account_type != account_type {
                return false;
            }
        }
        if let Some(query) = &self.query {
            let needle = query.to_lowercase();
            let hit = party.name.to_lowercase().contains(&needle)
                || party
                    .phone
                    .as_deref()
                    .is_some_and(|p| p.to_lowercase().contains(&needle))
                || party
                    .email
                    .as_deref()
                    .is_some_and(|e| e.to_lowercase().contains(&needle));
            if !hit {
                return false;
            }
        }
        true
    }
}

/// Filter a party list down to those matching the given filter.
/// Pure and idempotent: filtering an already-filtered list is a no-op.
pub fn filter_parties(parties: &[Party], filter: &PartyFilter) -> Vec<Party> {
    parties
        .iter()
        .filter(|p| filter.matches(p))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_parties() -> Vec<Party> {
        vec![
            Party::new("Al Noor Trading".into(), Role::Client, AccountType::Credit)
                .with_phone("0501234567")
                .with_email("info@alnoor.example"),
            Party::new("Badr Supplies".into(), Role::Supplier, AccountType::Cash)
                .with_phone("0559876543"),
            Party::new("Salim Hassan".into(), Role::Employee, AccountType::Cash),
        ]
    }

    #[test]
    fn test_role_roundtrip() {
        for role in [Role::Client, Role::Supplier, Role::Employee] {
            assert_eq!(Role::from_str(role.as_str()), Some(role));
        }
        assert_eq!(Role::from_str("vendor"), None);
    }

    #[test]
    fn test_account_type_roundtrip() {
        for at in [AccountType::Cash, AccountType::Credit] {
            assert_eq!(AccountType::from_str(at.as_str()), Some(at));
        }
    }

    #[test]
    fn test_filter_by_name_is_case_insensitive() {
        let parties = sample_parties();
        let filter = PartyFilter {
            query: Some("al noor".into()),
            ..Default::default()
        };

        let matched = filter_parties(&parties, &filter);
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].name, "Al Noor Trading");
    }

    #[test]
    fn test_filter_matches_phone_and_email() {
        let parties = sample_parties();

        let by_phone = PartyFilter {
            query: Some("055".into()),
            ..Default::default()
        };
        assert_eq!(filter_parties(&parties, &by_phone).len(), 1);

        let by_email = PartyFilter {
            query: Some("ALNOOR.EXAMPLE".into()),
            ..Default::default()
        };
        assert_eq!(filter_parties(&parties, &by_email).len(), 1);
    }

    #[test]
    fn test_filters_are_conjunctive() {
        let parties = sample_parties();
        let filter = PartyFilter {
            query: Some("a".into()),
            role: Some(Role::Supplier),
            account_type: Some(AccountType::Cash),
            ..Default::default()
        };

        let matched = filter_parties(&parties, &filter);
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].name, "Badr Supplies");
    }

    #[test]
    fn test_filter_excludes_archived_by_default() {
        let mut parties = sample_parties();
        parties[0].archived_at = Some(Utc::now());

        let filter = PartyFilter::default();
        assert_eq!(filter_parties(&parties, &filter).len(), 2);

        let all = PartyFilter {
            include_archived: true,
            ..Default::default()
        };
        assert_eq!(filter_parties(&parties, &all).len(), 3);
    }

    #[test]
    fn test_filter_is_idempotent() {
        let parties = sample_parties();
        let filter = PartyFilter {
            query: Some("s".into()),
            ..Default::default()
        };

        let once = filter_parties(&parties, &filter);
        let twice = filter_parties(&once, &filter);

        assert_eq!(once.len(), twice.len());
        let names: Vec<_> = once.iter().map(|p| &p.name).collect();
        let names_twice: Vec<_> = twice.iter().map(|p| &p.name).collect();
        assert_eq!(names, names_twice);
    }
}
