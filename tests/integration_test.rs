mod common;

use anyhow::Result;
use common::{parse_date, test_service, StandardParties};
use mizan::application::{AppError, TransactionFilter};
use mizan::domain::{AccountType, DebtItem, PartyFilter, Role, TxnKind};

#[tokio::test]
async fn test_create_and_show_party() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let party = service
        .create_party(
            "Al Noor Trading".into(),
            Role::Client,
            AccountType::Credit,
            Some("0501234567".into()),
            Some("info@alnoor.example".into()),
            100000,
            Some("wholesale".into()),
        )
        .await?;

    let fetched = service.get_party("Al Noor Trading").await?;
    assert_eq!(fetched.id, party.id);
    assert_eq!(fetched.role, Role::Client);
    assert_eq!(fetched.account_type, AccountType::Credit);
    assert_eq!(fetched.opening_balance, 100000);
    assert_eq!(fetched.phone.as_deref(), Some("0501234567"));
    assert_eq!(fetched.notes.as_deref(), Some("wholesale"));

    Ok(())
}

#[tokio::test]
async fn test_duplicate_party_name_rejected() -> Result<()> {
    let (service, _temp) = test_service().await?;
    StandardParties::create_basic(&service).await?;

    let result = service
        .create_party(
            "Al Noor Trading".into(),
            Role::Supplier,
            AccountType::Cash,
            None,
            None,
            0,
            None,
        )
        .await;

    assert!(matches!(result, Err(AppError::PartyAlreadyExists(_))));
    Ok(())
}

#[tokio::test]
async fn test_list_parties_by_role() -> Result<()> {
    let (service, _temp) = test_service().await?;
    StandardParties::create_basic(&service).await?;

    let clients = service.list_parties(Some(Role::Client), false).await?;
    assert_eq!(clients.len(), 1);
    assert_eq!(clients[0].name, "Al Noor Trading");

    let all = service.list_parties(None, false).await?;
    assert_eq!(all.len(), 3);
    Ok(())
}

#[tokio::test]
async fn test_archive_party_blocks_new_transactions() -> Result<()> {
    let (service, _temp) = test_service().await?;
    StandardParties::create_basic(&service).await?;

    service.archive_party("Al Noor Trading").await?;

    let active = service.list_parties(Some(Role::Client), false).await?;
    assert!(active.is_empty());

    let result = service
        .record_transaction(
            "Al Noor Trading",
            TxnKind::Sale,
            50000,
            parse_date("2024-03-01"),
            None,
            None,
        )
        .await;
    assert!(matches!(result, Err(AppError::PartyArchived(_))));
    Ok(())
}

#[tokio::test]
async fn test_record_transaction_and_balance() -> Result<()> {
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
            Some("invoice 42".into()),
            Some("INV-42".into()),
        )
        .await?;

    // 1000.00 + 500.00 - 300.00 = 1200.00
    assert_eq!(service.get_balance("Client A").await?, 120000);
    Ok(())
}

#[tokio::test]
async fn test_sql_balance_matches_domain_summary() -> Result<()> {
    let (service, _temp) = test_service().await?;
    StandardParties::create_client_with_opening(&service, "Client A", -25000).await?;

    for (kind, amount, date) in [
        (TxnKind::Sale, 80000, "2024-03-05"),
        (TxnKind::Receipt, 20000, "2024-03-03"),
        (TxnKind::SalesReturn, 10000, "2024-03-08"),
        (TxnKind::Sale, 15000, "2024-03-08"),
    ] {
        service
            .record_transaction("Client A", kind, amount, parse_date(date), None, None)
            .await?;
    }
    service
        .record_debt(
            "Client A",
            Some("old balance".into()),
            vec![DebtItem {
                amount: 5000,
                reason: None,
                due_date: parse_date("2024-04-01"),
            }],
        )
        .await?;

    let sql_balance = service.get_balance("Client A").await?;
    let summary = service.get_summary("Client A").await?;
    assert_eq!(sql_balance, summary.current_balance);

    let statement = service.get_statement("Client A", None, None).await?;
    assert_eq!(
        statement.lines.last().unwrap().running_balance,
        sql_balance
    );
    Ok(())
}

#[tokio::test]
async fn test_kind_role_validation() -> Result<()> {
    let (service, _temp) = test_service().await?;
    StandardParties::create_basic(&service).await?;

    // A deduction against a client is a category error
    let result = service
        .record_transaction(
            "Al Noor Trading",
            TxnKind::Deduction,
            10000,
            parse_date("2024-03-01"),
            None,
            None,
        )
        .await;
    assert!(matches!(
        result,
        Err(AppError::KindNotAllowedForRole { .. })
    ));

    // A payment against a supplier is fine
    service
        .record_transaction(
            "Badr Supplies",
            TxnKind::Payment,
            10000,
            parse_date("2024-03-01"),
            None,
            None,
        )
        .await?;
    Ok(())
}

#[tokio::test]
async fn test_zero_amount_rejected() -> Result<()> {
    let (service, _temp) = test_service().await?;
    StandardParties::create_basic(&service).await?;

    let result = service
        .record_transaction(
            "Al Noor Trading",
            TxnKind::Sale,
            0,
            parse_date("2024-03-01"),
            None,
            None,
        )
        .await;
    assert!(matches!(result, Err(AppError::InvalidAmount(_))));
    Ok(())
}

#[tokio::test]
async fn test_list_transactions_filtered() -> Result<()> {
    let (service, _temp) = test_service().await?;
    StandardParties::create_basic(&service).await?;

    for (kind, amount, date) in [
        (TxnKind::Sale, 10000, "2024-01-10"),
        (TxnKind::Sale, 20000, "2024-02-10"),
        (TxnKind::Receipt, 5000, "2024-02-15"),
    ] {
        service
            .record_transaction("Al Noor Trading", kind, amount, parse_date(date), None, None)
            .await?;
    }

    let sales = service
        .list_transactions(TransactionFilter {
            party: Some("Al Noor Trading".into()),
            kind: Some(TxnKind::Sale),
            ..Default::default()
        })
        .await?;
    assert_eq!(sales.len(), 2);

    let february = service
        .list_transactions(TransactionFilter {
            from_date: Some(parse_date("2024-02-01")),
            to_date: Some(parse_date("2024-02-28")),
            ..Default::default()
        })
        .await?;
    assert_eq!(february.len(), 2);

    let limited = service
        .list_transactions(TransactionFilter {
            limit: Some(1),
            ..Default::default()
        })
        .await?;
    assert_eq!(limited.len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_debt_lifecycle() -> Result<()> {
    let (service, _temp) = test_service().await?;
    StandardParties::create_basic(&service).await?;

    let debt = service
        .record_debt(
            "Salim Hassan",
            Some("advance".into()),
            vec![
                DebtItem {
                    amount: 10000,
                    reason: None,
                    due_date: parse_date("2024-05-01"),
                },
                DebtItem {
                    amount: 2550,
                    reason: Some("fuel".into()),
                    due_date: parse_date("2024-06-01"),
                },
            ],
        )
        .await?;
    assert_eq!(debt.total(), 12550);

    let listed = service.list_debts(Some("Salim Hassan")).await?;
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].items.len(), 2);

    let fetched = service.get_debt(debt.id).await?;
    assert_eq!(fetched.total(), 12550);

    service.delete_debt(debt.id).await?;
    assert!(service.list_debts(Some("Salim Hassan")).await?.is_empty());
    assert!(matches!(
        service.get_debt(debt.id).await,
        Err(AppError::DebtNotFound(_))
    ));
    Ok(())
}

#[tokio::test]
async fn test_debt_requires_positive_item() -> Result<()> {
    let (service, _temp) = test_service().await?;
    StandardParties::create_basic(&service).await?;

    let result = service
        .record_debt("Salim Hassan", None, vec![])
        .await;
    assert!(matches!(result, Err(AppError::InvalidAmount(_))));
    Ok(())
}

#[tokio::test]
async fn test_search_parties() -> Result<()> {
    let (service, _temp) = test_service().await?;
    StandardParties::create_basic(&service).await?;

    let by_phone = service
        .search_parties(&PartyFilter {
            query: Some("0501".into()),
            ..Default::default()
        })
        .await?;
    assert_eq!(by_phone.len(), 1);
    assert_eq!(by_phone[0].name, "Al Noor Trading");

    let suppliers = service
        .search_parties(&PartyFilter {
            role: Some(Role::Supplier),
            ..Default::default()
        })
        .await?;
    assert_eq!(suppliers.len(), 1);
    assert_eq!(suppliers[0].name, "Badr Supplies");
    Ok(())
}

#[tokio::test]
async fn test_overview_totals_by_role() -> Result<()> {
    let (service, _temp) = test_service().await?;
    StandardParties::create_basic(&service).await?;

    service
        .record_transaction(
            "Al Noor Trading",
            TxnKind::Sale,
            50000,
            parse_date("2024-03-01"),
            None,
            None,
        )
        .await?;
    service
        .record_transaction(
            "Badr Supplies",
            TxnKind::Payment,
            20000,
            parse_date("2024-03-02"),
            None,
            None,
        )
        .await?;
    service
        .record_debt(
            "Salim Hassan",
            None,
            vec![DebtItem {
                amount: 10000,
                reason: None,
                due_date: parse_date("2024-04-01"),
            }],
        )
        .await?;

    let overview = service.get_overview().await?;
    assert_eq!(overview.clients_receivable, 50000);
    assert_eq!(overview.suppliers_payable, -20000);
    assert_eq!(overview.employees_payable, 10000);
    assert_eq!(overview.open_debts_total, 10000);
    assert_eq!(overview.balances.len(), 3);
    Ok(())
}
