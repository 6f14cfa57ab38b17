use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use uuid::Uuid;

use crate::application::{LedgerService, TransactionFilter};
use crate::domain::{
    format_cents, parse_cents, AccountType, Cents, DebtItem, Direction, PartyFilter, Role, TxnKind,
};

/// Mizan - Business Accounting Ledger
#[derive(Parser)]
#[command(name = "mizan")]
#[command(about = "A local-first ledger for clients, suppliers and employees")]
#[command(version)]
pub struct Cli {
    /// Database file path
    #[arg(short, long, default_value = "mizan.db")]
    pub database: String,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new database
    Init,

    /// Client account commands
    #[command(subcommand)]
    Client(PartyCommands),

    /// Supplier account commands
    #[command(subcommand)]
    Supplier(PartyCommands),

    /// Employee account commands
    #[command(subcommand)]
    Employee(PartyCommands),

    /// Record a transaction against a party's account
    Record {
        /// Party name
        party: String,

        /// Transaction kind: sale, sales-return, receipt, payment, deduction, debt-item
        kind: String,

        /// Amount (e.g., "250.50" or "250")
        amount: String,

        /// Description of the transaction
        #[arg(short = 'D', long)]
        description: Option<String>,

        /// External reference (voucher or invoice number)
        #[arg(short, long)]
        reference: Option<String>,

        /// Date of the transaction (YYYY-MM-DD, defaults to now)
        #[arg(long)]
        date: Option<String>,
    },

    /// Debt management commands
    #[command(subcommand)]
    Debt(DebtCommands),

    /// Print a party's statement of account
    Statement {
        /// Party name
        party: String,

        /// Only include movements from this date (YYYY-MM-DD)
        #[arg(long)]
        from: Option<String>,

        /// Only include movements up to this date (YYYY-MM-DD)
        #[arg(long)]
        to: Option<String>,
    },

    /// Show balance for a party, or all balances
    Balance {
        /// Party name (omit for all parties)
        party: Option<String>,
    },

    /// List recent transactions
    Transactions {
        /// Filter by party name
        #[arg(long)]
        party: Option<String>,

        /// Filter by kind
        #[arg(long)]
        kind: Option<String>,

        /// Filter from date (YYYY-MM-DD)
        #[arg(long)]
        from_date: Option<String>,

        /// Filter to date (YYYY-MM-DD)
        #[arg(long)]
        to_date: Option<String>,

        /// Maximum number of transactions to show
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Search parties by name, phone or email
    Search {
        /// Free-text query
        query: Option<String>,

        /// Restrict to one role: client, supplier, employee
        #[arg(long)]
        role: Option<String>,

        /// Restrict to one account type: cash, credit
        #[arg(short = 't', long = "type")]
        account_type: Option<String>,

        /// Include archived parties
        #[arg(long)]
        all: bool,
    },

    /// Business-wide balance overview
    Overview,

    /// Export data to CSV or JSON
    Export {
        /// What to export: transactions, balances, parties, statement, full
        export_type: String,

        /// Party name (required for statement export)
        #[arg(long)]
        party: Option<String>,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Import data from CSV or JSON
    Import {
        /// What to import: transactions, full
        import_type: String,

        /// Input file (stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,

        /// Preview without importing
        #[arg(long)]
        dry_run: bool,

        /// Skip duplicate records
        #[arg(long)]
        skip_duplicates: bool,

        /// Create parties that don't exist
        #[arg(long)]
        create_parties: bool,

        /// Validate without importing
        #[arg(long)]
        validate: bool,

        /// Coerce unparsable amounts to zero instead of erroring
        #[arg(long)]
        lenient: bool,
    },
}

#[derive(Subcommand)]
pub enum PartyCommands {
    /// Create a new account
    Add {
        /// Party name (must be unique)
        name: String,

        /// Account type: cash, credit
        #[arg(short = 't', long = "type", default_value = "credit")]
        account_type: String,

        /// Phone number
        #[arg(long)]
        phone: Option<String>,

        /// Email address
        #[arg(long)]
        email: Option<String>,

        /// Opening balance (signed, e.g., "1000" or "-250.50")
        #[arg(long, default_value = "0")]
        opening: String,

        /// Free-form notes
        #[arg(long)]
        notes: Option<String>,
    },

    /// List accounts
    List {
        /// Include archived accounts
        #[arg(long)]
        all: bool,
    },

    /// Show detailed account information
    Show {
        /// Party name
        name: String,
    },

    /// Archive an account (soft delete)
    Archive {
        /// Party name
        name: String,
    },
}

#[derive(Subcommand)]
pub enum DebtCommands {
    /// Record an itemized debt against a party
    Add {
        /// Party name
        party: String,

        /// Debt reason
        #[arg(long)]
        reason: Option<String>,

        /// Debt item as "amount@due-date" or "amount@due-date:reason",
        /// e.g. "250.50@2024-05-01:fuel". Repeatable.
        #[arg(short, long = "item", required = true)]
        items: Vec<String>,
    },

    /// List debts
    List {
        /// Filter by party name
        #[arg(long)]
        party: Option<String>,
    },

    /// Show a debt with its items
    Show {
        /// Debt ID
        id: String,
    },

    /// Delete a debt and its items
    Delete {
        /// Debt ID
        id: String,
    },
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        match self.command {
            Commands::Init => {
                LedgerService::init(&self.database).await?;
                println!("Database initialized: {}", self.database);
            }

            Commands::Client(cmd) => {
                let service = LedgerService::connect(&self.database).await?;
                run_party_command(&service, Role::Client, cmd).await?;
            }

            Commands::Supplier(cmd) => {
                let service = LedgerService::connect(&self.database).await?;
                run_party_command(&service, Role::Supplier, cmd).await?;
            }

            Commands::Employee(cmd) => {
                let service = LedgerService::connect(&self.database).await?;
                run_party_command(&service, Role::Employee, cmd).await?;
            }

            Commands::Record {
                party,
                kind,
                amount,
                description,
                reference,
                date,
            } => {
                let service = LedgerService::connect(&self.database).await?;
                let kind = TxnKind::from_str(&kind).with_context(|| {
                    format!(
                        "Invalid kind '{}'. Valid kinds: sale, sales-return, receipt, payment, deduction, debt-item",
                        kind
                    )
                })?;
                let amount =
                    parse_cents(&amount).context("Invalid amount format. Use '250.50' or '250'")?;
                let date = match date {
                    Some(date_str) => parse_date(&date_str).with_context(|| {
                        format!("Invalid date format '{}'. Use YYYY-MM-DD", date_str)
                    })?,
                    None => Utc::now(),
                };

                let result = service
                    .record_transaction(&party, kind, amount, date, description, reference)
                    .await?;

                println!(
                    "Recorded {}: {} against {} ({})",
                    result.transaction.kind,
                    format_cents(result.transaction.amount),
                    result.party_name,
                    result.transaction.id
                );

                if self.verbose {
                    let balance = service.get_balance(&result.party_name).await?;
                    eprintln!("New balance for {}: {}", result.party_name, format_cents(balance));
                }
            }

            Commands::Debt(cmd) => {
                let service = LedgerService::connect(&self.database).await?;
                run_debt_command(&service, cmd).await?;
            }

            Commands::Statement { party, from, to } => {
                let service = LedgerService::connect(&self.database).await?;
                let from_date = from.as_deref().map(parse_date).transpose()?;
                let to_date = to.as_deref().map(parse_date).transpose()?;
                run_statement_command(&service, &party, from_date, to_date).await?;
            }

            Commands::Balance { party } => {
                let service = LedgerService::connect(&self.database).await?;
                run_balance_command(&service, party.as_deref()).await?;
            }

            Commands::Transactions {
                party,
                kind,
                from_date,
                to_date,
                limit,
            } => {
                let service = LedgerService::connect(&self.database).await?;
                let kind = kind
                    .map(|k| {
                        TxnKind::from_str(&k)
                            .with_context(|| format!("Invalid transaction kind '{}'", k))
                    })
                    .transpose()?;
                let filter = TransactionFilter {
                    party,
                    kind,
                    from_date: from_date.as_deref().map(parse_date).transpose()?,
                    to_date: to_date.as_deref().map(parse_date).transpose()?,
                    limit,
                };
                run_transactions_command(&service, filter).await?;
            }

            Commands::Search {
                query,
                role,
                account_type,
                all,
            } => {
                let service = LedgerService::connect(&self.database).await?;
                let filter = PartyFilter {
                    query,
                    role: role
                        .map(|r| {
                            Role::from_str(&r)
                                .with_context(|| format!("Invalid role '{}'", r))
                        })
                        .transpose()?,
                    account_type: account_type
                        .map(|t| {
                            AccountType::from_str(&t)
                                .with_context(|| format!("Invalid account type '{}'", t))
                        })
                        .transpose()?,
                    include_archived: all,
                };
                run_search_command(&service, &filter).await?;
            }

            Commands::Overview => {
                let service = LedgerService::connect(&self.database).await?;
                run_overview_command(&service).await?;
            }

            Commands::Export {
                export_type,
                party,
                output,
            } => {
                let service = LedgerService::connect(&self.database).await?;
                run_export_command(&service, &export_type, party.as_deref(), output.as_deref())
                    .await?;
            }

            Commands::Import {
                import_type,
                input,
                dry_run,
                skip_duplicates,
                create_parties,
                validate,
                lenient,
            } => {
                let service = LedgerService::connect(&self.database).await?;
                run_import_command(
                    &service,
                    &import_type,
                    input.as_deref(),
                    crate::io::ImportOptions {
                        dry_run,
                        skip_duplicates,
                        create_missing_parties: create_parties,
                        validate_only: validate,
                        lenient_amounts: lenient,
                    },
                )
                .await?;
            }
        }

        Ok(())
    }
}

async fn run_party_command(service: &LedgerService, role: Role, cmd: PartyCommands) -> Result<()> {
    match cmd {
        PartyCommands::Add {
            name,
            account_type,
            phone,
            email,
            opening,
            notes,
        } => {
            let account_type = AccountType::from_str(&account_type).with_context(|| {
                format!(
                    "Invalid account type '{}'. Valid types: cash, credit",
                    account_type
                )
            })?;
            let opening_balance = parse_cents(&opening)
                .context("Invalid opening balance format. Use '1000' or '-250.50'")?;

            let party = service
                .create_party(name, role, account_type, phone, email, opening_balance, notes)
                .await?;
            println!("Created {}: {} ({})", party.role, party.name, party.id);
        }

        PartyCommands::List { all } => {
            let parties = service.list_parties(Some(role), all).await?;
            if parties.is_empty() {
                println!("No {}s found.", role);
            } else {
                println!("{:<25} {:<8} {:<15} {:>12}", "NAME", "TYPE", "PHONE", "OPENING");
                println!("{}", "-".repeat(62));
                for party in parties {
                    println!(
                        "{:<25} {:<8} {:<15} {:>12}",
                        party.name,
                        party.account_type,
                        party.phone.as_deref().unwrap_or("-"),
                        format_cents(party.opening_balance)
                    );
                }
            }
        }

        PartyCommands::Show { name } => {
            let info = service.get_party_info(&name).await?;
            let party = &info.party;

            println!("{}: {}", capitalize(party.role.as_str()), party.name);
            println!("  ID:              {}", party.id);
            println!("  Account type:    {}", party.account_type);
            if let Some(phone) = &party.phone {
                println!("  Phone:           {}", phone);
            }
            if let Some(email) = &party.email {
                println!("  Email:           {}", email);
            }
            if let Some(notes) = &party.notes {
                println!("  Notes:           {}", notes);
            }
            println!(
                "  Created:         {}",
                party.created_at.format("%Y-%m-%d %H:%M:%S")
            );
            if let Some(archived) = party.archived_at {
                println!("  Archived:        {}", archived.format("%Y-%m-%d %H:%M:%S"));
            }
            println!();
            println!(
                "  Opening balance: {}",
                format_cents(party.opening_balance)
            );
            println!("  Current balance: {}", format_cents(info.balance));
            println!("  Open debts:      {}", format_cents(info.open_debts));
            println!("  Transactions:    {}", info.transaction_count);
            if let Some(last) = info.last_activity {
                println!("  Last activity:   {}", last.format("%Y-%m-%d"));
            }
        }

        PartyCommands::Archive { name } => {
            service.archive_party(&name).await?;
            println!("Archived: {}", name);
        }
    }
    Ok(())
}

async fn run_debt_command(service: &LedgerService, cmd: DebtCommands) -> Result<()> {
    match cmd {
        DebtCommands::Add {
            party,
            reason,
            items,
        } => {
            let items: Vec<DebtItem> = items
                .iter()
                .map(|spec| parse_debt_item(spec))
                .collect::<Result<_>>()?;

            let debt = service.record_debt(&party, reason, items).await?;
            println!(
                "Recorded debt of {} against {} ({} item(s), {})",
                format_cents(debt.total()),
                party,
                debt.items.len(),
                debt.id
            );
        }

        DebtCommands::List { party } => {
            let debts = service.list_debts(party.as_deref()).await?;
            if debts.is_empty() {
                println!("No debts found.");
            } else {
                println!("{:<38} {:<12} {:>12} {:<20}", "ID", "DATE", "TOTAL", "REASON");
                println!("{}", "-".repeat(84));
                for debt in debts {
                    println!(
                        "{:<38} {:<12} {:>12} {:<20}",
                        debt.id,
                        debt.created_at.format("%Y-%m-%d"),
                        format_cents(debt.total()),
                        debt.reason.as_deref().unwrap_or("-")
                    );
                }
            }
        }

        DebtCommands::Show { id } => {
            let debt_id =
                Uuid::parse_str(&id).context("Invalid debt ID format (expected UUID)")?;
            let debt = service.get_debt(debt_id).await?;

            println!("Debt: {}", debt.id);
            if let Some(reason) = &debt.reason {
                println!("  Reason:  {}", reason);
            }
            println!("  Created: {}", debt.created_at.format("%Y-%m-%d"));
            println!("  Total:   {}", format_cents(debt.total()));
            println!();
            println!("  {:<12} {:>12} {:<20}", "DUE", "AMOUNT", "REASON");
            for item in &debt.items {
                println!(
                    "  {:<12} {:>12} {:<20}",
                    item.due_date.format("%Y-%m-%d"),
                    format_cents(item.amount),
                    item.reason.as_deref().unwrap_or("-")
                );
            }
        }

        DebtCommands::Delete { id } => {
            let debt_id =
                Uuid::parse_str(&id).context("Invalid debt ID format (expected UUID)")?;
            let debt = service.delete_debt(debt_id).await?;
            println!(
                "Deleted debt of {} ({} item(s))",
                format_cents(debt.total()),
                debt.items.len()
            );
        }
    }
    Ok(())
}

async fn run_statement_command(
    service: &LedgerService,
    party: &str,
    from_date: Option<DateTime<Utc>>,
    to_date: Option<DateTime<Utc>>,
) -> Result<()> {
    let statement = service.get_statement(party, from_date, to_date).await?;

    println!("Statement of account: {}", statement.party.name);
    println!();
    println!(
        "{:<12} {:<14} {:<24} {:>12} {:>12} {:>12}",
        "DATE", "KIND", "DESCRIPTION", "DEBIT", "CREDIT", "BALANCE"
    );
    println!("{}", "-".repeat(90));
    println!(
        "{:<12} {:<14} {:<24} {:>12} {:>12} {:>12}",
        "",
        "opening",
        "",
        "",
        "",
        format_cents(statement.summary.opening_balance)
    );

    for line in &statement.lines {
        let (debit, credit) = match line.kind.direction() {
            Direction::Debit => (format_cents(line.amount), String::new()),
            Direction::Credit => (String::new(), format_cents(line.amount)),
        };
        println!(
            "{:<12} {:<14} {:<24} {:>12} {:>12} {:>12}",
            line.date.format("%Y-%m-%d"),
            line.kind.to_string(),
            line.description.as_deref().unwrap_or(""),
            debit,
            credit,
            format_cents(line.running_balance)
        );
    }

    println!("{}", "-".repeat(90));
    println!(
        "Totals: debits {}, credits {}, current balance {}",
        format_cents(statement.summary.total_debits),
        format_cents(statement.summary.total_credits),
        format_cents(statement.summary.current_balance)
    );

    Ok(())
}

async fn run_balance_command(service: &LedgerService, party: Option<&str>) -> Result<()> {
    match party {
        Some(name) => {
            let balance = service.get_balance(name).await?;
            println!("{}: {}", name, format_cents(balance));
        }
        None => {
            let overview = service.get_overview().await?;
            if overview.balances.is_empty() {
                println!("No parties found.");
                return Ok(());
            }
            println!("{:<25} {:<10} {:>12}", "PARTY", "ROLE", "BALANCE");
            println!("{}", "-".repeat(49));
            for entry in &overview.balances {
                println!(
                    "{:<25} {:<10} {:>12}",
                    entry.party_name,
                    entry.role.to_string(),
                    format_cents(entry.balance)
                );
            }
        }
    }
    Ok(())
}

async fn run_transactions_command(
    service: &LedgerService,
    filter: TransactionFilter,
) -> Result<()> {
    let transactions = service.list_transactions(filter).await?;
    if transactions.is_empty() {
        println!("No transactions found.");
        return Ok(());
    }

    println!(
        "{:<12} {:<14} {:>12} {:<24} {:<12}",
        "DATE", "KIND", "AMOUNT", "DESCRIPTION", "REFERENCE"
    );
    println!("{}", "-".repeat(78));
    for txn in transactions {
        println!(
            "{:<12} {:<14} {:>12} {:<24} {:<12}",
            txn.date.format("%Y-%m-%d"),
            txn.kind.to_string(),
            format_cents(txn.amount),
            txn.description.as_deref().unwrap_or(""),
            txn.reference.as_deref().unwrap_or("")
        );
    }
    Ok(())
}

async fn run_search_command(service: &LedgerService, filter: &PartyFilter) -> Result<()> {
    let parties = service.search_parties(filter).await?;
    if parties.is_empty() {
        println!("No matching parties.");
        return Ok(());
    }

    println!(
        "{:<25} {:<10} {:<8} {:<15} {:<25}",
        "NAME", "ROLE", "TYPE", "PHONE", "EMAIL"
    );
    println!("{}", "-".repeat(85));
    for party in parties {
        println!(
            "{:<25} {:<10} {:<8} {:<15} {:<25}",
            party.name,
            party.role.to_string(),
            party.account_type.to_string(),
            party.phone.as_deref().unwrap_or("-"),
            party.email.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}

async fn run_overview_command(service: &LedgerService) -> Result<()> {
    let overview = service.get_overview().await?;

    println!("Overview as of {}", overview.as_of.format("%Y-%m-%d %H:%M"));
    println!(
        "  Clients receivable:  {}",
        format_cents(overview.clients_receivable)
    );
    println!(
        "  Suppliers payable:   {}",
        format_cents(overview.suppliers_payable)
    );
    println!(
        "  Employees payable:   {}",
        format_cents(overview.employees_payable)
    );
    println!(
        "  Open debts total:    {}",
        format_cents(overview.open_debts_total)
    );
    Ok(())
}

async fn run_export_command(
    service: &LedgerService,
    export_type: &str,
    party: Option<&str>,
    output: Option<&str>,
) -> Result<()> {
    use crate::io::Exporter;
    use std::fs::File;
    use std::io::{stdout, Write};

    let exporter = Exporter::new(service);

    let writer: Box<dyn Write> = match output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path))?;
            Box::new(file)
        }
        None => Box::new(stdout()),
    };

    match export_type {
        "transactions" => {
            let count = exporter.export_transactions_csv(writer).await?;
            if output.is_some() {
                eprintln!("Exported {} transactions", count);
            }
        }
        "balances" => {
            let count = exporter.export_balances_csv(writer).await?;
            if output.is_some() {
                eprintln!("Exported {} balances", count);
            }
        }
        "parties" => {
            let count = exporter.export_parties_csv(writer).await?;
            if output.is_some() {
                eprintln!("Exported {} parties", count);
            }
        }
        "statement" => {
            let party =
                party.context("Statement export needs a party: --party <name>")?;
            let count = exporter
                .export_statement_csv(writer, party, None, None)
                .await?;
            if output.is_some() {
                eprintln!("Exported {} statement lines", count);
            }
        }
        "full" => {
            let snapshot = exporter.export_full_json(writer).await?;
            if output.is_some() {
                eprintln!(
                    "Exported full database: {} parties, {} transactions, {} debts",
                    snapshot.parties.len(),
                    snapshot.transactions.len(),
                    snapshot.debts.len()
                );
            }
        }
        _ => {
            anyhow::bail!(
                "Invalid export type '{}'. Valid types: transactions, balances, parties, statement, full",
                export_type
            );
        }
    }

    Ok(())
}

async fn run_import_command(
    service: &LedgerService,
    import_type: &str,
    input: Option<&str>,
    options: crate::io::ImportOptions,
) -> Result<()> {
    use crate::io::Importer;
    use std::fs::File;
    use std::io::{stdin, Read};

    let importer = Importer::new(service);

    let reader: Box<dyn Read> = match input {
        Some(path) => {
            let file =
                File::open(path).with_context(|| format!("Failed to open input file: {}", path))?;
            Box::new(file)
        }
        None => Box::new(stdin()),
    };

    let announce = options.validate_only || options.dry_run;
    let result = match import_type {
        "transactions" => importer.import_transactions_csv(reader, options).await?,
        "full" => importer.import_full_json(reader, options).await?,
        _ => {
            anyhow::bail!(
                "Invalid import type '{}'. Valid types: transactions, full",
                import_type
            );
        }
    };

    if announce {
        println!("Validation successful");
    } else {
        println!("Import complete");
    }
    println!("  Imported: {}", result.imported);
    println!("  Skipped:  {}", result.skipped);
    println!("  Errors:   {}", result.errors.len());

    if !result.errors.is_empty() {
        println!("\nErrors:");
        for error in result.errors.iter().take(10) {
            println!(
                "  Line {}: {}",
                error.line,
                error
                    .field
                    .as_ref()
                    .map(|f| format!("{}: ", f))
                    .unwrap_or_default()
                    + &error.error
            );
        }
        if result.errors.len() > 10 {
            println!("  ... and {} more errors", result.errors.len() - 10);
        }
    }

    Ok(())
}

/// Parse a debt item spec: "amount@due-date" or "amount@due-date:reason".
fn parse_debt_item(spec: &str) -> Result<DebtItem> {
    let (amount_str, rest) = spec
        .split_once('@')
        .with_context(|| format!("Invalid item '{}'. Use 'amount@YYYY-MM-DD[:reason]'", spec))?;

    let (due_str, reason) = match rest.split_once(':') {
        Some((due, reason)) => (due, Some(reason.to_string())),
        None => (rest, None),
    };

    let amount: Cents =
        parse_cents(amount_str).with_context(|| format!("Invalid item amount '{}'", amount_str))?;
    let due_date = parse_date(due_str)
        .with_context(|| format!("Invalid due date '{}'. Use YYYY-MM-DD", due_str))?;

    Ok(DebtItem {
        amount,
        reason,
        due_date,
    })
}

fn parse_date(s: &str) -> Result<DateTime<Utc>> {
    let date = NaiveDate::parse_from_str(s, "%Y-%m-%d")?;
    Ok(date.and_hms_opt(0, 0, 0).unwrap().and_utc())
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
