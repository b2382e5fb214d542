use std::io::{self, Read};
use std::path::Path;

use hanzi_core::model::{CardOrientation, PracticeItem};
use services::{AppServices, PracticeConfig, Selection, StudySetService};
use storage::supabase::SupabaseConfig;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod args;
mod terminal;

use args::{Args, ArgsError, Command, LearnSource, print_usage};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn supabase_configured() -> bool {
    ["SUPABASE_URL", "SUPABASE_ANON_KEY"]
        .iter()
        .all(|key| std::env::var(key).is_ok_and(|v| !v.trim().is_empty()))
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url.starts_with("sqlite::memory:") {
        return Ok(());
    }
    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_owned(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_owned(),
        }
        .into());
    }
    if let Some(parent) = Path::new(path).parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

async fn connect(
    args: &Args,
    config: PracticeConfig,
) -> Result<AppServices, Box<dyn std::error::Error>> {
    if supabase_configured() {
        let supabase = SupabaseConfig::from_env()?;
        info!(url = %supabase.url, "using Supabase backend");
        return Ok(AppServices::supabase(supabase, config)?);
    }
    prepare_sqlite_file(&args.db_url)?;
    info!(db = %args.db_url, user_id = %args.user, "using SQLite backend");
    Ok(AppServices::sqlite(&args.db_url, Some(args.user), config).await?)
}

async fn dashboard(app: &AppServices) -> Result<(), Box<dyn std::error::Error>> {
    let Some(user) = app.current_user() else {
        println!("Not signed in.");
        return Ok(());
    };
    let profile = app.reconciler().load_profile(user).await?.unwrap_or_default();
    println!(
        "Level {}  ·  {} mastered  ·  {} learning  ·  {} day streak  ·  {} practiced",
        profile.level,
        profile.mastered,
        profile.learning,
        profile.streak_days,
        profile.total_practiced
    );
    let badges = app.reconciler().load_badges(user).await?;
    let (earned, locked): (Vec<_>, Vec<_>) = badges.iter().partition(|b| b.is_earned());
    if earned.is_empty() {
        println!("Badges: none earned yet");
    } else {
        let shelf: Vec<String> = earned
            .iter()
            .map(|b| format!("{} {}", b.badge.icon, b.badge.name))
            .collect();
        println!("Badges: {}", shelf.join("  "));
    }
    if !locked.is_empty() {
        let names: Vec<&str> = locked.iter().map(|b| b.badge.name.as_str()).collect();
        println!("Locked: {}", names.join(", "));
    }

    let practice = app.practice();
    if let Some(next) = practice.next_suggested_item().await? {
        println!(
            "Next up: {} ({}) {} [{}]",
            next.item.primary(),
            next.item.secondary(),
            next.item.tertiary().unwrap_or_default(),
            next.state.as_str()
        );
    }
    let recent = practice.recent_activity().await?;
    if !recent.is_empty() {
        println!("Recent:");
        for entry in recent {
            println!(
                "  {}  {}  {}",
                entry.item.primary(),
                entry.item.tertiary().unwrap_or_default(),
                entry.state.as_str()
            );
        }
    }
    Ok(())
}

async fn pick(
    app: &AppServices,
    positions: &[usize],
) -> Result<Selection, Box<dyn std::error::Error>> {
    let catalog: Vec<PracticeItem> = app.practice().catalog_for_selection(None).await?;
    let mut selection = Selection::new();
    for position in positions {
        match catalog.get(position - 1) {
            Some(item) if !selection.contains(item.id()) => {
                selection.toggle(item);
            }
            Some(_) => {}
            None => eprintln!("no catalog character at position {position}"),
        }
    }
    Ok(selection)
}

async fn list_sets(study_sets: &StudySetService) -> Result<(), Box<dyn std::error::Error>> {
    let sets = study_sets.list().await?;
    if sets.is_empty() {
        println!("No study sets yet. Create one with `hanzi import`.");
    }
    for set in sets {
        println!(
            "{}  {}  ({} cards)  {}",
            set.id,
            set.title,
            set.card_count,
            set.description.unwrap_or_default()
        );
    }
    Ok(())
}

fn read_import_text(file: Option<&Path>) -> io::Result<String> {
    let mut text = String::new();
    match file {
        Some(path) => text = std::fs::read_to_string(path)?,
        None => {
            io::stdin().read_to_string(&mut text)?;
        }
    }
    Ok(text)
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    init_tracing();

    let args = Args::parse().map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;
    if args.command == Command::Help {
        print_usage();
        return Ok(());
    }

    let config = PracticeConfig::from_env();
    let app = connect(&args, config).await?;
    let study_sets = app.study_sets();

    match args.command.clone() {
        Command::Help => {}
        Command::Dashboard => dashboard(&app).await?,
        Command::Learn { mode, source } => {
            let practice = app.practice();
            let session = match source {
                LearnSource::New => practice.start_new_characters(mode).await?,
                LearnSource::Review => practice.start_review(mode).await?,
                LearnSource::Select(positions) => {
                    let selection = pick(&app, &positions).await?;
                    practice.start_selected(mode, &selection)?
                }
            };
            let mut runner = app.runner(session);
            terminal::drive(&mut runner, io::stdin().lock(), &mut io::stdout()).await?;
            if let Some(profile) = app.progress_cache().get() {
                println!(
                    "Level {}  ·  {} mastered  ·  {} learning",
                    profile.level, profile.mastered, profile.learning
                );
            }
        }
        Command::Sets => list_sets(&study_sets).await?,
        Command::Import {
            title,
            description,
            delimiter,
            file,
        } => {
            let text = read_import_text(file.as_deref())?;
            let preview = StudySetService::preview_import(&text, &delimiter);
            for dropped in preview.dropped() {
                eprintln!("skipping line {}: {}", dropped.line, dropped.text);
            }
            let outcome = study_sets
                .import(&title, description.as_deref(), &text, &delimiter)
                .await?;
            println!("Created {} with {} cards", outcome.set_id, outcome.cards_added);
            if let Some(warning) = outcome.warning {
                eprintln!("warning: {warning}");
            }
        }
        Command::Export { set, delimiter } => {
            println!("{}", study_sets.export(set, &delimiter).await?);
        }
        Command::Cards { set } => {
            for card in study_sets.cards(set).await? {
                println!(
                    "{}  {} {}  →  {}  ({}✓ {}✗){}",
                    card.id,
                    if card.starred { "★" } else { " " },
                    card.question(CardOrientation::TermFirst),
                    card.answer(CardOrientation::TermFirst),
                    card.times_correct,
                    card.times_incorrect,
                    if card.mastered { "  mastered" } else { "" }
                );
            }
        }
        Command::Study { set, mode, options } => {
            let session = app.practice().start_study_set(set, mode, options).await?;
            let mut runner = app.runner(session);
            terminal::drive(&mut runner, io::stdin().lock(), &mut io::stdout()).await?;
        }
        Command::Star { card } => {
            let starred = study_sets.toggle_star(card).await?;
            println!("{}", if starred { "starred" } else { "unstarred" });
        }
        Command::Delete { set } => {
            study_sets.delete(set).await?;
            println!("Deleted {set}");
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
