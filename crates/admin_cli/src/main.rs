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
use engine::{AuthContext, Engine, Money, SqlStore};
use migration::MigratorTrait;
use sea_orm::{Database, DatabaseConnection, EntityTrait, Set};
use uuid::Uuid;

mod users {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
    #[sea_orm(table_name = "users")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub username: String,
        pub password: String,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

#[derive(Parser, Debug)]
#[command(name = "dompet_admin")]
#[command(about = "Admin utilities for Dompet (bootstrap users/wallets, repair theme spends)")]
struct Cli {
    /// Database connection string (also read from `DATABASE_URL`).
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite:./dompet.db?mode=rwc")]
    database_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    User(User),
    Wallet(Wallet),
    Theme(Theme),
}

#[derive(Args, Debug)]
struct User {
    #[command(subcommand)]
    command: UserCommand,
}

#[derive(Subcommand, Debug)]
enum UserCommand {
    Create(UserCreateArgs),
}

#[derive(Args, Debug)]
struct UserCreateArgs {
    #[arg(long)]
    username: String,
}

#[derive(Args, Debug)]
struct Wallet {
    #[command(subcommand)]
    command: WalletCommand,
}

#[derive(Subcommand, Debug)]
enum WalletCommand {
    Create(WalletCreateArgs),
    List(OwnerArgs),
}

#[derive(Args, Debug)]
struct WalletCreateArgs {
    #[arg(long)]
    owner: String,
    #[arg(long)]
    name: String,
    /// Opening balance, e.g. `1250.00`.
    #[arg(long, default_value = "0")]
    balance: Money,
}

#[derive(Args, Debug)]
struct OwnerArgs {
    #[arg(long)]
    owner: String,
}

#[derive(Args, Debug)]
struct Theme {
    #[command(subcommand)]
    command: ThemeCommand,
}

#[derive(Subcommand, Debug)]
enum ThemeCommand {
    /// Rebuild a theme's spend from the expenses that reference it.
    Recalculate(ThemeRecalculateArgs),
}

#[derive(Args, Debug)]
struct ThemeRecalculateArgs {
    #[arg(long)]
    owner: String,
    #[arg(long)]
    theme_id: Uuid,
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

fn prompt_password(prompt: &str) -> Result<String, Box<dyn Error + Send + Sync>> {
    let _raw = RawModeGuard::enter()?;

    let mut out = std::io::stderr();
    execute!(
        out,
        cursor::MoveToColumn(0),
        terminal::Clear(ClearType::CurrentLine),
        Print(prompt)
    )?;
    out.flush()?;

    let mut buf = String::new();
    loop {
        let Event::Key(KeyEvent {
            code, modifiers, ..
        }) = event::read()?
        else {
            continue;
        };

        match code {
            KeyCode::Enter => {
                execute!(out, Print("\r\n"))?;
                out.flush()?;
                break;
            }
            KeyCode::Backspace => {
                if buf.pop().is_some() {
                    execute!(out, cursor::MoveLeft(1), Print(" "), cursor::MoveLeft(1))?;
                    out.flush()?;
                }
            }
            KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => {
                execute!(out, Print("\r\n"))?;
                out.flush()?;
                return Err("interrupted".into());
            }
            KeyCode::Char(ch) if !modifiers.contains(KeyModifiers::CONTROL) => {
                buf.push(ch);
                execute!(out, Print("*"))?;
                out.flush()?;
            }
            _ => {}
        }
    }

    Ok(buf)
}

fn prompt_password_twice() -> Result<String, Box<dyn Error + Send + Sync>> {
    let mut out = std::io::stderr();
    for _ in 0..3 {
        let p1 = prompt_password("Password: ")?;
        if p1.is_empty() {
            execute!(
                out,
                cursor::MoveToColumn(0),
                terminal::Clear(ClearType::CurrentLine),
                Print("Password must not be empty.\r\n")
            )?;
            continue;
        }

        let p2 = prompt_password("Confirm password: ")?;
        if p1 == p2 {
            return Ok(p1);
        }

        execute!(
            out,
            cursor::MoveToColumn(0),
            terminal::Clear(ClearType::CurrentLine),
            Print("Passwords do not match. Try again.\r\n")
        )?;
    }

    Err("too many attempts".into())
}

async fn connect_db(
    database_url: &str,
) -> Result<DatabaseConnection, Box<dyn Error + Send + Sync>> {
    let db = Database::connect(database_url).await?;
    migration::Migrator::up(&db, None).await?;
    Ok(db)
}

async fn user_exists(
    db: &DatabaseConnection,
    username: &str,
) -> Result<bool, Box<dyn Error + Send + Sync>> {
    Ok(users::Entity::find_by_id(username.to_string())
        .one(db)
        .await?
        .is_some())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let cli = Cli::parse();

    let db = connect_db(&cli.database_url).await?;
    let engine = Engine::builder().store(SqlStore::new(db.clone())).build()?;

    match cli.command {
        Command::User(User {
            command: UserCommand::Create(args),
        }) => {
            if user_exists(&db, &args.username).await? {
                eprintln!("user already exists: {}", args.username);
                std::process::exit(1);
            }

            let password = prompt_password_twice()?;
            let user = users::ActiveModel {
                username: Set(args.username.clone()),
                password: Set(password),
            };
            users::Entity::insert(user).exec(&db).await?;

            println!("created user: {}", args.username);
        }
        Command::Wallet(Wallet {
            command: WalletCommand::Create(args),
        }) => {
            if !user_exists(&db, &args.owner).await? {
                eprintln!("user not found: {}", args.owner);
                std::process::exit(1);
            }

            let ctx = AuthContext::new(args.owner);
            let wallet = engine.new_wallet(&ctx, &args.name, args.balance).await?;
            println!("created wallet: {} ({})", wallet.name, wallet.id);
        }
        Command::Wallet(Wallet {
            command: WalletCommand::List(args),
        }) => {
            let ctx = AuthContext::new(args.owner);
            for wallet in engine.wallets(&ctx).await? {
                println!("{}\t{}\t{}", wallet.id, wallet.balance, wallet.name);
            }
        }
        Command::Theme(Theme {
            command: ThemeCommand::Recalculate(args),
        }) => {
            let ctx = AuthContext::new(args.owner);
            let theme = engine.recalculate_theme_spent(&ctx, args.theme_id).await?;
            println!(
                "theme {} spent {} of {}",
                theme.name, theme.current_spent, theme.max_budget
            );
        }
    }

    Ok(())
}
