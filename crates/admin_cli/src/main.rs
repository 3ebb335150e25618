use std::{error::Error, io::Write};

use clap::{Args, Parser, Subcommand};
use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEvent, KeyModifiers},
    execute,
    style::Print,
    terminal,
    terminal::ClearType,
};
use engine::{
    BalanceType, CreditCmd, DebitCmd, Engine, Money, TransactionCategory, TransactionListFilter,
    Wallet,
};
use migration::MigratorTrait;
use sea_orm::{Database, DatabaseConnection};
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "ridepay_admin")]
#[command(about = "Admin utilities for Ridepay (accounts, wallet adjustments, reversals)")]
struct Cli {
    /// Database connection string (also read from `DATABASE_URL`).
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "sqlite:./ridepay.db?mode=rwc"
    )]
    database_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Account(Account),
    Wallet(WalletArgs),
    Tx(Tx),
}

#[derive(Args, Debug)]
struct Account {
    #[command(subcommand)]
    command: AccountCommand,
}

#[derive(Subcommand, Debug)]
enum AccountCommand {
    /// Registers an account and opens its wallet.
    Open(AccountOpenArgs),
}

#[derive(Args, Debug)]
struct AccountOpenArgs {
    #[arg(long)]
    id: String,
    #[arg(long)]
    name: Option<String>,
}

#[derive(Args, Debug)]
struct WalletArgs {
    #[command(subcommand)]
    command: WalletCommand,
}

#[derive(Subcommand, Debug)]
enum WalletCommand {
    Show(AccountArg),
    /// Permanently disables a wallet.
    Disable(AccountArg),
    /// Credits (positive amount) or debits (negative amount) an adjustment.
    Adjust(AdjustArgs),
}

#[derive(Args, Debug)]
struct AccountArg {
    #[arg(long)]
    account: String,
}

#[derive(Args, Debug)]
struct AdjustArgs {
    #[arg(long)]
    account: String,
    /// Signed naira amount, e.g. `12.50` or `-3`.
    #[arg(long, allow_hyphen_values = true, value_parser = parse_money)]
    amount: Money,
    #[arg(long, default_value = "deposit", value_parser = parse_balance_type)]
    balance_type: BalanceType,
    #[arg(long)]
    reason: String,
}

#[derive(Args, Debug)]
struct Tx {
    #[command(subcommand)]
    command: TxCommand,
}

#[derive(Subcommand, Debug)]
enum TxCommand {
    /// Lists the latest transactions of a wallet.
    List(TxListArgs),
    /// Reverses a completed transaction.
    Reverse(TxReverseArgs),
}

#[derive(Args, Debug)]
struct TxListArgs {
    #[arg(long)]
    account: String,
    #[arg(long, default_value_t = 1)]
    page: u64,
    #[arg(long, default_value_t = 20)]
    per_page: u64,
}

#[derive(Args, Debug)]
struct TxReverseArgs {
    #[arg(long)]
    id: Uuid,
    #[arg(long)]
    reason: String,
}

fn parse_money(raw: &str) -> Result<Money, String> {
    raw.parse::<Money>().map_err(|err| err.to_string())
}

fn parse_balance_type(raw: &str) -> Result<BalanceType, String> {
    BalanceType::try_from(raw.to_ascii_lowercase().as_str()).map_err(|err| err.to_string())
}

struct RawModeGuard;

impl RawModeGuard {
    fn enter() -> Result<Self, Box<dyn Error + Send + Sync>> {
        terminal::enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

/// Asks a single-key `y/N` question on stderr.
fn confirm(prompt: &str) -> Result<bool, Box<dyn Error + Send + Sync>> {
    let _raw = RawModeGuard::enter()?;

    let mut out = std::io::stderr();
    execute!(
        out,
        cursor::MoveToColumn(0),
        terminal::Clear(ClearType::CurrentLine),
        Print(format!("{prompt} [y/N] "))
    )?;
    out.flush()?;

    loop {
        let Event::Key(KeyEvent {
            code, modifiers, ..
        }) = event::read()?
        else {
            continue;
        };

        let answer = match code {
            KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => {
                execute!(out, Print("\r\n"))?;
                out.flush()?;
                return Err("interrupted".into());
            }
            KeyCode::Char('y') | KeyCode::Char('Y') => true,
            KeyCode::Char(_) | KeyCode::Enter | KeyCode::Esc => false,
            _ => continue,
        };
        execute!(out, Print(if answer { "y\r\n" } else { "n\r\n" }))?;
        out.flush()?;
        return Ok(answer);
    }
}

fn print_wallet(wallet: &Wallet) {
    println!("wallet {} ({})", wallet.id, wallet.account_id);
    println!("  deposit:      {}", Money::new(wallet.deposit_balance));
    println!("  withdrawable: {}", Money::new(wallet.withdrawable_balance));
    println!("  total:        {}", Money::new(wallet.total_balance));
    println!(
        "  active: {}, locked: {}",
        wallet.is_active, wallet.is_locked
    );
    println!(
        "  deposited {}, withdrawn {}, winnings {}",
        Money::new(wallet.total_deposited),
        Money::new(wallet.total_withdrawn),
        Money::new(wallet.total_winnings)
    );
}

async fn connect_db(
    database_url: &str,
) -> Result<DatabaseConnection, Box<dyn Error + Send + Sync>> {
    let db = Database::connect(database_url).await?;
    migration::Migrator::up(&db, None).await?;
    Ok(db)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let cli = Cli::parse();

    let db = connect_db(&cli.database_url).await?;
    let engine = Engine::builder().database(db).build().await?;

    match cli.command {
        Command::Account(Account {
            command: AccountCommand::Open(args),
        }) => {
            let wallet = engine
                .open_account(&args.id, args.name.as_deref().unwrap_or_default())
                .await?;
            println!("opened account: {} (wallet {})", wallet.account_id, wallet.id);
        }
        Command::Wallet(WalletArgs { command }) => match command {
            WalletCommand::Show(args) => {
                let wallet = engine.wallet(&args.account).await?;
                print_wallet(&wallet);
            }
            WalletCommand::Disable(args) => {
                if !confirm(&format!("Disable the wallet of {}?", args.account))? {
                    eprintln!("aborted");
                    std::process::exit(1);
                }
                let wallet = engine.disable_wallet(&args.account).await?;
                print_wallet(&wallet);
            }
            WalletCommand::Adjust(args) => {
                let amount = args.amount.minor();
                if amount == 0 {
                    eprintln!("amount must not be zero");
                    std::process::exit(2);
                }
                let description = format!("Admin adjustment: {}", args.reason.trim());
                let receipt = if amount > 0 {
                    engine
                        .credit(
                            CreditCmd::new(
                                &args.account,
                                amount,
                                TransactionCategory::Adjustment,
                                args.balance_type,
                            )
                            .description(description),
                        )
                        .await?
                } else {
                    engine
                        .debit(
                            DebitCmd::new(
                                &args.account,
                                -amount,
                                TransactionCategory::Adjustment,
                                args.balance_type,
                            )
                            .description(description),
                        )
                        .await?
                };
                println!(
                    "{}: {} -> {}",
                    receipt.transaction_ref,
                    Money::new(receipt.previous_balances.total),
                    Money::new(receipt.new_balances.total)
                );
            }
        },
        Command::Tx(Tx { command }) => match command {
            TxCommand::List(args) => {
                let page = engine
                    .list_transactions(
                        &args.account,
                        args.page,
                        args.per_page,
                        &TransactionListFilter::default(),
                    )
                    .await?;
                for tx in &page.items {
                    println!(
                        "{}  {:<24} {:>14}  {:<9} {:<16} {}",
                        tx.created_at.format("%Y-%m-%d %H:%M"),
                        tx.reference,
                        Money::new(tx.amount_minor).signed(tx.kind == engine::TransactionKind::Debit),
                        tx.status.as_str(),
                        tx.category.as_str(),
                        tx.id
                    );
                }
                println!(
                    "page {}/{} ({} transactions)",
                    page.page, page.total_pages, page.total_items
                );
            }
            TxCommand::Reverse(args) => {
                let tx = engine.transaction(args.id).await?;
                let prompt = format!(
                    "Reverse {} ({} {})?",
                    tx.reference,
                    tx.kind.as_str(),
                    Money::new(tx.amount_minor)
                );
                if !confirm(&prompt)? {
                    eprintln!("aborted");
                    std::process::exit(1);
                }
                let receipt = engine.reverse(args.id, &args.reason).await?;
                println!(
                    "reversed {} with {}: total {} -> {}",
                    tx.reference,
                    receipt.transaction_ref,
                    Money::new(receipt.previous_balances.total),
                    Money::new(receipt.new_balances.total)
                );
            }
        },
    }

    Ok(())
}
