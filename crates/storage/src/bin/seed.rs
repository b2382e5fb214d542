use std::fmt;

use chrono::{DateTime, Utc};
use hanzi_core::Clock;
use hanzi_core::model::UserId;
use storage::catalog::{COMMON_CHARACTERS, common_catalog, starter_badges};
use storage::repository::{CatalogRepository, ProgressRepository};
use storage::sqlite::SqliteRepository;

#[derive(Debug, Clone)]
struct Args {
    db_url: String,
    characters: usize,
    user: Option<UserId>,
    practice: u32,
    now: Option<DateTime<Utc>>,
}

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidDbUrl { raw: String },
    InvalidCharacters { raw: String },
    InvalidUser { raw: String },
    InvalidPractice { raw: String },
    PracticeWithoutUser,
    InvalidNow { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidCharacters { raw } => {
                write!(f, "invalid --characters value: {raw}")
            }
            ArgsError::InvalidUser { raw } => write!(f, "invalid --user value: {raw}"),
            ArgsError::InvalidPractice { raw } => write!(f, "invalid --practice value: {raw}"),
            ArgsError::PracticeWithoutUser => write!(f, "--practice requires --user"),
            ArgsError::InvalidNow { raw } => {
                write!(f, "invalid --now value (expected RFC3339): {raw}")
            }
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

impl Args {
    fn parse() -> Result<Self, ArgsError> {
        let mut db_url =
            std::env::var("HANZI_DB_URL").unwrap_or_else(|_| "sqlite://hanzi.sqlite3?mode=rwc".into());
        let mut characters = COMMON_CHARACTERS.len();
        let mut user = std::env::var("HANZI_USER_ID")
            .ok()
            .and_then(|value| value.parse::<UserId>().ok());
        let mut practice = 0_u32;
        let mut now: Option<DateTime<Utc>> = None;

        let mut args = std::env::args().skip(1);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = value;
                }
                "--characters" => {
                    let value = require_value(&mut args, "--characters")?;
                    characters = value
                        .parse::<usize>()
                        .map_err(|_| ArgsError::InvalidCharacters { raw: value.clone() })?;
                }
                "--user" => {
                    let value = require_value(&mut args, "--user")?;
                    user = Some(
                        value
                            .parse::<UserId>()
                            .map_err(|_| ArgsError::InvalidUser { raw: value.clone() })?,
                    );
                }
                "--practice" => {
                    let value = require_value(&mut args, "--practice")?;
                    practice = value
                        .parse::<u32>()
                        .map_err(|_| ArgsError::InvalidPractice { raw: value.clone() })?;
                }
                "--now" => {
                    let value = require_value(&mut args, "--now")?;
                    let parsed = DateTime::parse_from_rfc3339(&value)
                        .map_err(|_| ArgsError::InvalidNow { raw: value.clone() })?
                        .with_timezone(&Utc);
                    now = Some(parsed);
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        if practice > 0 && user.is_none() {
            return Err(ArgsError::PracticeWithoutUser);
        }

        Ok(Self {
            db_url,
            characters,
            user,
            practice,
            now,
        })
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p storage --bin seed -- [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>         SQLite URL (default: sqlite://hanzi.sqlite3?mode=rwc)");
    eprintln!(
        "  --characters <n>          Number of common characters to upsert (default: {})",
        COMMON_CHARACTERS.len()
    );
    eprintln!("  --user <uuid>             Learner to attach sample progress to");
    eprintln!("  --practice <n>            Record one completion for each of the first n characters");
    eprintln!("  --now <rfc3339>           Fixed current time for deterministic seeding");
    eprintln!("  -h, --help                Show this help");
    eprintln!();
    eprintln!("Environment (same as flags):");
    eprintln!("  HANZI_DB_URL, HANZI_USER_ID");
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse().map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let clock = args.now.map_or(Clock::Default, Clock::fixed);
    let repo = SqliteRepository::connect(&args.db_url)
        .await?
        .with_clock(clock);
    repo.migrate().await?;

    let entries = common_catalog(Some(args.characters));
    repo.upsert_catalog(&entries).await?;
    let badges = repo.ensure_badges(&starter_badges()).await?;

    if let Some(user) = args.user {
        let items = repo.fetch_catalog_items(Some(args.practice)).await?;
        for item in &items {
            repo.record_completion(user, item.id()).await?;
        }
        let snapshot = repo.refresh_profile(user).await?;
        let earned = repo
            .list_badges(user)
            .await?
            .iter()
            .filter(|b| b.is_earned())
            .count();
        println!(
            "Recorded {} completions for {user}: level {}, learning {}, streak {}, badges {earned}",
            items.len(),
            snapshot.level,
            snapshot.learning,
            snapshot.streak_days
        );
    }

    println!(
        "Seeded {} characters and {badges} new badges into {}",
        entries.len(),
        args.db_url
    );

    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
