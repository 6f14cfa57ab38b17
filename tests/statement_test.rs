mod common;

use anyhow::Result;
use common::{parse_date, test_service, StandardParties};
use mizan::domain::TxnKind;

#[tokio::test]
async fn test_statement_receipt_then_sale() -> Result<()> {
    let (service, _temp) = test_service().await?;
    StandardParties::create_client_with_opening(&service, "Client A", 100000).await?;

    service
        .record_transaction(
            "Client A",
            TxnKind::Receipt,
            30000,
            parse_date("2024-03-01"),
            None,
            None,
        )
        .await?;
    service
        .record_transaction(
            "Client A",
            TxnKind::Sale,
            50000,
            parse_date("2024-03-02"),
            None,
            None,
        )
        .await?;

    let statement = service.get_statement("Client A", None, None).await?;

    assert_eq!(statement.summary.opening_balance, 100000);
    assert_eq!(statement.summary.total_debits, 50000);
    assert_eq!(statement.summary.total_credits, 30000);
    assert_eq!(statement.summary.current_balance, 120000);

    // Running balances: 1000.00 -> 700.00 -> 1200.00
    assert_eq!(statement.lines.len(), 2);
    assert_eq!(statement.lines[0].kind, TxnKind::Receipt);
    assert_eq!(statement.lines[0].running_balance, 70000);
    assert_eq!(statement.lines[1].kind, TxnKind::Sale);
    assert_eq!(statement.lines[1].running_balance, 120000);
    Ok(())
}

#[tokio::test]
async fn test_empty_statement_keeps_opening_balance() -> Result<()> {
    let (service, _temp) = test_service().await?;
    StandardParties::create_client_with_opening(&service, "Client A", 100000).await?;

    let statement = service.get_statement("Client A", None, None).await?;
    assert!(statement.lines.is_empty());
    assert_eq!(statement.summary.total_debits, 0);
    assert_eq!(statement.summary.total_credits, 0);
    assert_eq!(statement.summary.current_balance, 100000);
    Ok(())
}

#[tokio::test]
async fn test_statement_is_date_ordered_regardless_of_entry_order() -> Result<()> {
    let (service, _temp) = test_service().await?;
    StandardParties::create_client_with_opening(&service, "Client A", 0).await?;

    // Recorded out of chronological order on purpose
    for (kind, amount, date) in [
        (TxnKind::Receipt, 10000, "2024-03-20"),
        (TxnKind::Sale, 40000, "2024-03-05"),
        (TxnKind::Sale, 20000, "2024-03-12"),
    ] {
        service
            .record_transaction("Client A", kind, amount, parse_date(date), None, None)
            .await?;
    }

    let statement = service.get_statement("Client A", None, None).await?;
    let dates: Vec<_> = statement.lines.iter().map(|l| l.date).collect();
    let mut sorted = dates.clone();
    sorted.sort();
    assert_eq!(dates, sorted);

    let balances: Vec<_> = statement
        .lines
        .iter()
        .map(|l| l.running_balance)
        .collect();
    assert_eq!(balances, vec![40000, 60000, 50000]);
    Ok(())
}

#[tokio::test]
async fn test_same_date_debits_precede_credits() -> Result<()> {
    let (service, _temp) = test_service().await?;
    StandardParties::create_client_with_opening(&service, "Client A", 0).await?;

    // Receipt recorded first, sale second, both on the same date. The
    // statement must put the sale (debit) before the receipt (credit).
    service
        .record_transaction(
            "Client A",
            TxnKind::Receipt,
            10000,
            parse_date("2024-03-10"),
            None,
            None,
        )
        .await?;
    service
        .record_transaction(
            "Client A",
            TxnKind::Sale,
            30000,
            parse_date("2024-03-10"),
            None,
            None,
        )
        .await?;

    let statement = service.get_statement("Client A", None, None).await?;
    assert_eq!(statement.lines[0].kind, TxnKind::Sale);
    assert_eq!(statement.lines[1].kind, TxnKind::Receipt);
    assert_eq!(statement.lines[1].running_balance, 20000);

    // Re-running yields the identical sequence
    let again = service.get_statement("Client A", None, None).await?;
    let balances: Vec<_> = statement.lines.iter().map(|l| l.running_balance).collect();
    let balances_again: Vec<_> = again.lines.iter().map(|l| l.running_balance).collect();
    assert_eq!(balances, balances_again);
    Ok(())
}

#[tokio::test]
async fn test_statement_includes_debt_items() -> Result<()> {
    let (service, _temp) = test_service().await?;
    StandardParties::create_basic(&service).await?;

    service
        .record_debt(
            "Salim Hassan",
            Some("advance".into()),
            vec![
                mizan::domain::DebtItem {
                    amount: 10000,
                    reason: None,
                    due_date: parse_date("2024-04-01"),
                },
                mizan::domain::DebtItem {
                    amount: 5000,
                    reason: Some("fuel".into()),
                    due_date: parse_date("2024-05-01"),
                },
            ],
        )
        .await?;
    service
        .record_transaction(
            "Salim Hassan",
            TxnKind::Deduction,
            4000,
            parse_date("2024-04-15"),
            None,
            None,
        )
        .await?;

    let statement = service.get_statement("Salim Hassan", None, None).await?;
    assert_eq!(statement.lines.len(), 3);
    assert_eq!(statement.lines[0].kind, TxnKind::DebtItem);
    assert_eq!(statement.lines[1].kind, TxnKind::Deduction);
    assert_eq!(statement.lines[2].kind, TxnKind::DebtItem);
    // 100.00 - 40.00 + 50.00 = 110.00
    assert_eq!(statement.summary.current_balance, 11000);
    Ok(())
}

#[tokio::test]
async fn test_statement_date_window() -> Result<()> {
    let (service, _temp) = test_service().await?;
    StandardParties::create_client_with_opening(&service, "Client A", 100000).await?;

    for (amount, date) in [(10000, "2024-01-10"), (20000, "2024-02-10"), (30000, "2024-03-10")] {
        service
            .record_transaction("Client A", TxnKind::Sale, amount, parse_date(date), None, None)
            .await?;
    }

    let windowed = service
        .get_statement(
            "Client A",
            Some(parse_date("2024-02-01")),
            Some(parse_date("2024-02-28")),
        )
        .await?;

    assert_eq!(windowed.lines.len(), 1);
    assert_eq!(windowed.lines[0].amount, 20000);
    // Opening balance is not affected by the window
    assert_eq!(windowed.summary.opening_balance, 100000);
    assert_eq!(windowed.summary.current_balance, 120000);
    Ok(())
}
