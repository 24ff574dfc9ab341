//! # HMS Admin
//!
//! Maintenance commands for a SQLite database.
//!
//! ## Usage
//! ```bash
//! # Apply migrations and load demo data into empty tables
//! cargo run -p hms-db --bin hms-admin -- --db ./hms.db seed
//!
//! # Show accounts and their login counters
//! cargo run -p hms-db --bin hms-admin -- --db ./hms.db list-users
//!
//! # Recreate an account (password defaults to <username>123)
//! cargo run -p hms-db --bin hms-admin -- --db ./hms.db reset-user nurse --password s3cret
//! ```

use anyhow::{bail, Context};
use chrono::Utc;
use std::env;

use hms_core::{Role, UserType};
use hms_db::seed::new_account;
use hms_db::{seed_if_empty, DbConfig, SqliteStore, Store};

enum Command {
    Seed,
    ListUsers,
    ResetUser {
        username: String,
        password: Option<String>,
    },
}

fn print_help() {
    println!("HMS database maintenance");
    println!();
    println!("Usage: hms-admin [OPTIONS] <COMMAND>");
    println!();
    println!("Commands:");
    println!("  seed                                  Apply migrations and seed empty tables");
    println!("  list-users                            Print user profiles");
    println!("  reset-user <USERNAME> [--password PW] Recreate an account with a fresh hash");
    println!();
    println!("Options:");
    println!("  -d, --db <PATH>    Database file path (default: ./hms.db)");
    println!("  -h, --help         Show this help message");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().skip(1).collect();

    let mut db_path = String::from("./hms.db");
    let mut password = None;
    let mut positional = Vec::new();

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                db_path = args.get(i + 1).context("--db needs a path")?.clone();
                i += 1;
            }
            "--password" | "-p" => {
                password = Some(args.get(i + 1).context("--password needs a value")?.clone());
                i += 1;
            }
            "--help" | "-h" => {
                print_help();
                return Ok(());
            }
            other => positional.push(other.to_string()),
        }
        i += 1;
    }

    let command = match positional.first().map(String::as_str) {
        Some("seed") => Command::Seed,
        Some("list-users") => Command::ListUsers,
        Some("reset-user") => Command::ResetUser {
            username: positional
                .get(1)
                .context("reset-user needs a username")?
                .clone(),
            password,
        },
        Some(other) => bail!("unknown command '{other}' (try --help)"),
        None => {
            print_help();
            return Ok(());
        }
    };

    println!("Database: {}", db_path);

    let store = SqliteStore::connect(DbConfig::new(db_path.as_str()))
        .await
        .with_context(|| format!("opening {db_path}"))?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    match command {
        Command::Seed => {
            let report = seed_if_empty(&store, Utc::now()).await?;
            if report.is_empty() {
                println!("⚠ Every table already has data, nothing seeded");
            } else {
                println!(
                    "✓ Seeded {} items, {} patients, {} users",
                    report.items, report.patients, report.users
                );
            }
        }

        Command::ListUsers => {
            let users = store.list_users().await?;
            println!();
            println!(
                "{:<16} {:<6} {:<13} {:<16} {:>6}  {}",
                "USERNAME", "ROLE", "TYPE", "DEPARTMENT", "LOGINS", "LAST LOGIN"
            );
            for user in users {
                let profile = user.profile();
                println!(
                    "{:<16} {:<6} {:<13} {:<16} {:>6}  {}",
                    profile.username,
                    format!("{:?}", profile.role).to_lowercase(),
                    format!("{:?}", profile.user_type).to_lowercase(),
                    profile.department,
                    profile.login_count,
                    profile
                        .last_login
                        .map(|t| t.to_rfc3339())
                        .unwrap_or_else(|| "never".to_string()),
                );
            }
        }

        Command::ResetUser { username, password } => {
            let password = password.unwrap_or_else(|| format!("{username}123"));
            let existing = store.find_user(&username).await?;

            let (role, user_type, department) = match &existing {
                Some(user) => (user.role, user.user_type, user.department.clone()),
                None => (Role::User, UserType::Staff, "general".to_string()),
            };

            let account = new_account(&username, &password, role, user_type, &department, Utc::now())?;
            store.put_user(account).await?;

            if existing.is_some() {
                println!("✓ Reset '{}' (login history cleared)", username);
            } else {
                println!("✓ Created '{}'", username);
            }
        }
    }

    Ok(())
}
