//! drivebox-admin: account maintenance for a Drivebox database.

use clap::{Parser, Subcommand};

use drivebox::{Config, Database, UserRepository};

#[derive(Parser)]
#[command(name = "drivebox-admin")]
#[command(about = "Drivebox account maintenance")]
struct Cli {
    /// Configuration file (database path is read from it)
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Database file, overriding the configuration
    #[arg(long)]
    database: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List accounts with storage usage
    Users,
    /// Recompute storage_used from the files table
    Reconcile {
        /// Only reconcile this user ID
        #[arg(long)]
        user: Option<i64>,
    },
}

fn format_bytes(bytes: i64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value.abs() >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}

async fn list_users(db: &Database) -> drivebox::Result<()> {
    let users = UserRepository::new(db.pool()).list_all().await?;
    if users.is_empty() {
        println!("No users found in database.");
        return Ok(());
    }

    println!(
        "{:>5}  {:<20}  {:<32}  {:>12}  {:>12}  {:>6}  {}",
        "ID", "USERNAME", "EMAIL", "USED", "QUOTA", "USE%", "CREATED"
    );
    for user in &users {
        println!(
            "{:>5}  {:<20}  {:<32}  {:>12}  {:>12}  {:>5.1}%  {}",
            user.id,
            user.username,
            user.email,
            format_bytes(user.storage_used),
            format_bytes(user.storage_quota),
            user.usage_percent(),
            user.created_at
        );
    }
    println!("\n{} user(s)", users.len());
    Ok(())
}

async fn reconcile(db: &Database, only: Option<i64>) -> drivebox::Result<()> {
    let repo = UserRepository::new(db.pool());
    let user_ids: Vec<i64> = match only {
        Some(id) => {
            if repo.get_by_id(id).await?.is_none() {
                return Err(drivebox::DriveError::NotFound(format!("User {id}")));
            }
            vec![id]
        }
        None => repo.list_all().await?.iter().map(|u| u.id).collect(),
    };

    let mut corrected = 0;
    for user_id in user_ids {
        let drift = repo.recalculate_storage_used(user_id).await?;
        if drift.drifted() {
            corrected += 1;
            println!(
                "user {}: storage_used {} -> {} ({:+} bytes)",
                drift.user_id,
                drift.recorded,
                drift.actual,
                drift.actual - drift.recorded
            );
        }
    }

    if corrected == 0 {
        println!("All storage counters are consistent.");
    } else {
        println!("Corrected {corrected} user(s).");
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    drivebox::logging::init_console_only("warn");

    let database_path = cli.database.clone().unwrap_or_else(|| {
        Config::load(&cli.config)
            .map(|c| c.database.path)
            .unwrap_or_else(|_| Config::default().database.path)
    });

    let result: drivebox::Result<()> = async {
        let db = Database::open(&database_path).await?;
        let outcome = match cli.command {
            Commands::Users => list_users(&db).await,
            Commands::Reconcile { user } => reconcile(&db, user).await,
        };
        db.close().await;
        outcome
    }
    .await;

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
