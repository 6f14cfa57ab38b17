use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Cents, Direction, Party, PartyId, Transaction, TxnKind};

/// One row of a party statement, carrying the balance after the line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatementLine {
    pub date: DateTime<Utc>,
    pub kind: TxnKind,
    pub description: Option<String>,
    pub reference: Option<String>,
    /// Unsigned line amount
    pub amount: Cents,
    /// The line's contribution to the balance (negative for credits)
    pub signed_amount: Cents,
    /// Balance after applying this line
    pub running_balance: Cents,
}

/// Derived totals for a party. Never persisted; always recomputed from
/// the transaction set so it cannot drift from the underlying data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSummary {
    pub opening_balance: Cents,
    pub total_debits: Cents,
    pub total_credits: Cents,
    pub current_balance: Cents,
}

/// Sum the amounts of the transactions belonging to one party.
/// Transactions of other parties are ignored, not an error.
pub fn total_for_party(transactions: &[Transaction], party_id: PartyId) -> Cents {
    transactions
        .iter()
        .filter(|txn| txn.party_id == party_id)
        .map(|txn| txn.amount)
        .sum()
}

/// Build the chronological statement for a party: the party's transactions
/// sorted by date (kind rank, then id, break same-date ties), folded left
/// from the opening balance applying each line's signed contribution.
///
/// The ordering is a pure function of the transaction set, so re-running
/// on the same input always yields an identical statement.
pub fn build_statement(party: &Party, transactions: &[Transaction]) -> Vec<StatementLine> {
    let mut own: Vec<&Transaction> = transactions
        .iter()
        .filter(|txn| txn.party_id == party.id)
        .collect();
    own.sort_by_key(|txn| (txn.date, txn.kind.sort_rank(), txn.id));

    let mut balance = party.opening_balance;
    own.into_iter()
        .map(|txn| {
            let signed = txn.signed_amount();
            balance += signed;
            StatementLine {
                date: txn.date,
                kind: txn.kind,
                description: txn.description.clone(),
                reference: txn.reference.clone(),
                amount: txn.amount,
                signed_amount: signed,
                running_balance: balance,
            }
        })
        .collect()
}

/// Summarize a party's ledger position. The invariant
/// `current_balance == opening_balance + total_debits - total_credits`
/// holds by construction, and `current_balance` always equals the last
/// running balance of `build_statement` over the same input.
pub fn summarize(party: &Party, transactions: &[Transaction]) -> LedgerSummary {
    let (total_debits, total_credits) = transactions
        .iter()
        .filter(|txn| txn.party_id == party.id)
        .fold((0, 0), |(debits, credits), txn| {
            match txn.kind.direction() {
                Direction::Debit => (debits + txn.amount, credits),
                Direction::Credit => (debits, credits + txn.amount),
            }
        });

    LedgerSummary {
        opening_balance: party.opening_balance,
        total_debits,
        total_credits,
        current_balance: party.opening_balance + total_debits - total_credits,
    }
}
