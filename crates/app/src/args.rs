use std::fmt;
use std::path::PathBuf;

use hanzi_core::Delimiter;
use hanzi_core::model::{CardOrientation, ItemId, SetId, UserId};
use services::{PracticeMode, StudyOptions};

pub const DEFAULT_DB_URL: &str = "sqlite://hanzi.sqlite3?mode=rwc";

/// Learner used by the local backend when `HANZI_USER_ID` is unset.
pub const LOCAL_USER: UserId = UserId::from_u128(0x6c6f_6361_6c00_0000_0000_0000_0000_0001);

#[derive(Debug)]
pub enum ArgsError {
    MissingValue { flag: &'static str },
    MissingFlag { flag: &'static str },
    UnknownArg(String),
    UnknownCommand(String),
    InvalidDbUrl { raw: String },
    InvalidUser { raw: String },
    InvalidId { flag: &'static str, raw: String },
    InvalidMode { raw: String },
    InvalidDelimiter { raw: String },
    InvalidSelection { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingFlag { flag } => write!(f, "{flag} is required"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::UnknownCommand(cmd) => write!(f, "unknown subcommand: {cmd}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidUser { raw } => write!(f, "invalid --user value: {raw}"),
            ArgsError::InvalidId { flag, raw } => write!(f, "invalid {flag} value: {raw}"),
            ArgsError::InvalidMode { raw } => write!(
                f,
                "invalid --mode value: {raw} (flashcards, written, mc, writing)"
            ),
            ArgsError::InvalidDelimiter { raw } => write!(f, "invalid --delimiter value: {raw:?}"),
            ArgsError::InvalidSelection { raw } => {
                write!(f, "invalid --select value (expected e.g. 1,4,7): {raw}")
            }
        }
    }
}

impl std::error::Error for ArgsError {}

/// Where catalog practice draws its characters from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LearnSource {
    New,
    Review,
    /// 1-based catalog positions.
    Select(Vec<usize>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Dashboard,
    Learn {
        mode: PracticeMode,
        source: LearnSource,
    },
    Sets,
    Import {
        title: String,
        description: Option<String>,
        delimiter: Delimiter,
        file: Option<PathBuf>,
    },
    Export {
        set: SetId,
        delimiter: Delimiter,
    },
    Study {
        set: SetId,
        mode: PracticeMode,
        options: StudyOptions,
    },
    Cards {
        set: SetId,
    },
    Star {
        card: ItemId,
    },
    Delete {
        set: SetId,
    },
    Help,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Args {
    pub db_url: String,
    pub user: UserId,
    pub command: Command,
}

pub fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  hanzi [--db <sqlite_url>] [--user <uuid>] <command> [options]");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  dashboard                         Level, streak and what to practice next (default)");
    eprintln!("  learn [--mode m] [--review] [--select 1,4,7]");
    eprintln!("                                    Practice catalog characters (default mode: writing)");
    eprintln!("  sets                              List study sets");
    eprintln!("  import --title t [--description d] [--delimiter tab|comma|semicolon|<text>] [--file path]");
    eprintln!("                                    Create a set from delimited text (stdin without --file)");
    eprintln!("  export --set <uuid> [--delimiter d]");
    eprintln!("  cards --set <uuid>                List a set's cards");
    eprintln!("  study --set <uuid> [--mode m] [--shuffle] [--swap] [--starred]");
    eprintln!("  star --card <uuid>                Toggle a card's star");
    eprintln!("  delete --set <uuid>");
    eprintln!();
    eprintln!("Modes: flashcards, written, mc, writing");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  HANZI_DB_URL, HANZI_USER_ID, HANZI_NEW_BATCH, HANZI_DISTRACTORS, HANZI_SHUFFLE");
    eprintln!("  SUPABASE_URL + SUPABASE_ANON_KEY select the Supabase backend");
    eprintln!("  (with SUPABASE_ACCESS_TOKEN, SUPABASE_USER_ID); RUST_LOG sets log level");
}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn parse_id<T: std::str::FromStr>(flag: &'static str, raw: String) -> Result<T, ArgsError> {
    raw.parse::<T>()
        .map_err(|_| ArgsError::InvalidId { flag, raw })
}

fn parse_mode(raw: String) -> Result<PracticeMode, ArgsError> {
    PracticeMode::parse(&raw).ok_or(ArgsError::InvalidMode { raw })
}

fn parse_delimiter(raw: String) -> Result<Delimiter, ArgsError> {
    raw.parse::<Delimiter>()
        .map_err(|_| ArgsError::InvalidDelimiter { raw })
}

fn parse_selection(raw: String) -> Result<Vec<usize>, ArgsError> {
    let picks: Option<Vec<usize>> = raw
        .split(',')
        .map(|part| part.trim().parse::<usize>().ok().filter(|n| *n > 0))
        .collect();
    match picks {
        Some(picks) if !picks.is_empty() => Ok(picks),
        _ => Err(ArgsError::InvalidSelection { raw }),
    }
}

impl Args {
    /// Parse process arguments, reading defaults from the environment.
    pub fn parse() -> Result<Self, ArgsError> {
        Self::parse_from(std::env::args().skip(1), |key| std::env::var(key).ok())
    }

    pub fn parse_from(
        argv: impl IntoIterator<Item = String>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ArgsError> {
        let mut db_url = env("HANZI_DB_URL")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_DB_URL.into());
        let mut user = match env("HANZI_USER_ID") {
            Some(raw) => raw.parse::<UserId>().map_err(|_| ArgsError::InvalidUser { raw })?,
            None => LOCAL_USER,
        };

        let mut args = argv.into_iter();
        let mut command_name: Option<String> = None;
        let mut rest: Vec<String> = Vec::new();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = value;
                }
                "--user" => {
                    let value = require_value(&mut args, "--user")?;
                    user = value
                        .parse::<UserId>()
                        .map_err(|_| ArgsError::InvalidUser { raw: value.clone() })?;
                }
                "--help" | "-h" if command_name.is_none() => {
                    command_name = Some("help".into());
                }
                _ if command_name.is_none() && !arg.starts_with("--") => {
                    command_name = Some(arg);
                }
                _ => rest.push(arg),
            }
        }

        let mut rest = rest.into_iter();
        let command = match command_name.as_deref().unwrap_or("dashboard") {
            "dashboard" => Self::no_options(&mut rest, Command::Dashboard)?,
            "sets" => Self::no_options(&mut rest, Command::Sets)?,
            "help" => Command::Help,
            "learn" => Self::parse_learn(&mut rest)?,
            "import" => Self::parse_import(&mut rest)?,
            "export" => Self::parse_export(&mut rest)?,
            "study" => Self::parse_study(&mut rest)?,
            "cards" => Command::Cards {
                set: Self::parse_set_only(&mut rest)?,
            },
            "delete" => Command::Delete {
                set: Self::parse_set_only(&mut rest)?,
            },
            "star" => Self::parse_star(&mut rest)?,
            other => return Err(ArgsError::UnknownCommand(other.to_owned())),
        };

        Ok(Self {
            db_url,
            user,
            command,
        })
    }

    fn no_options(
        args: &mut impl Iterator<Item = String>,
        command: Command,
    ) -> Result<Command, ArgsError> {
        match args.next() {
            Some(arg) => Err(ArgsError::UnknownArg(arg)),
            None => Ok(command),
        }
    }

    fn parse_learn(args: &mut impl Iterator<Item = String>) -> Result<Command, ArgsError> {
        let mut mode = PracticeMode::Writing;
        let mut source = LearnSource::New;
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--mode" => mode = parse_mode(require_value(args, "--mode")?)?,
                "--review" => source = LearnSource::Review,
                "--select" => {
                    source = LearnSource::Select(parse_selection(require_value(args, "--select")?)?);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }
        Ok(Command::Learn { mode, source })
    }

    fn parse_import(args: &mut impl Iterator<Item = String>) -> Result<Command, ArgsError> {
        let mut title = None;
        let mut description = None;
        let mut delimiter = Delimiter::Tab;
        let mut file = None;
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--title" => title = Some(require_value(args, "--title")?),
                "--description" => description = Some(require_value(args, "--description")?),
                "--delimiter" => delimiter = parse_delimiter(require_value(args, "--delimiter")?)?,
                "--file" => file = Some(PathBuf::from(require_value(args, "--file")?)),
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }
        Ok(Command::Import {
            title: title.ok_or(ArgsError::MissingFlag { flag: "--title" })?,
            description,
            delimiter,
            file,
        })
    }

    fn parse_export(args: &mut impl Iterator<Item = String>) -> Result<Command, ArgsError> {
        let mut set = None;
        let mut delimiter = Delimiter::Tab;
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--set" => set = Some(parse_id("--set", require_value(args, "--set")?)?),
                "--delimiter" => delimiter = parse_delimiter(require_value(args, "--delimiter")?)?,
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }
        Ok(Command::Export {
            set: set.ok_or(ArgsError::MissingFlag { flag: "--set" })?,
            delimiter,
        })
    }

    fn parse_study(args: &mut impl Iterator<Item = String>) -> Result<Command, ArgsError> {
        let mut set = None;
        let mut mode = PracticeMode::Flashcards;
        let mut options = StudyOptions::default();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--set" => set = Some(parse_id("--set", require_value(args, "--set")?)?),
                "--mode" => mode = parse_mode(require_value(args, "--mode")?)?,
                "--shuffle" => options.shuffle = true,
                "--swap" => options.orientation = CardOrientation::DefinitionFirst,
                "--starred" => options.starred_only = true,
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }
        Ok(Command::Study {
            set: set.ok_or(ArgsError::MissingFlag { flag: "--set" })?,
            mode,
            options,
        })
    }

    fn parse_set_only(args: &mut impl Iterator<Item = String>) -> Result<SetId, ArgsError> {
        let mut set = None;
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--set" => set = Some(parse_id("--set", require_value(args, "--set")?)?),
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }
        set.ok_or(ArgsError::MissingFlag { flag: "--set" })
    }

    fn parse_star(args: &mut impl Iterator<Item = String>) -> Result<Command, ArgsError> {
        let mut card = None;
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--card" => card = Some(parse_id("--card", require_value(args, "--card")?)?),
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }
        Ok(Command::Star {
            card: card.ok_or(ArgsError::MissingFlag { flag: "--card" })?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> Result<Args, ArgsError> {
        Args::parse_from(argv.iter().map(|s| (*s).to_owned()), |_| None)
    }

    #[test]
    fn no_arguments_opens_the_dashboard_locally() {
        let args = parse(&[]).unwrap();
        assert_eq!(args.command, Command::Dashboard);
        assert_eq!(args.db_url, DEFAULT_DB_URL);
        assert_eq!(args.user, LOCAL_USER);
    }

    #[test]
    fn global_flags_may_follow_the_command() {
        let args = parse(&["learn", "--mode", "mc", "--db", "sqlite::memory:"]).unwrap();
        assert_eq!(args.db_url, "sqlite::memory:");
        assert_eq!(
            args.command,
            Command::Learn {
                mode: PracticeMode::MultipleChoice,
                source: LearnSource::New,
            }
        );
    }

    #[test]
    fn selection_must_be_positive_positions() {
        let args = parse(&["learn", "--select", "1, 4,7"]).unwrap();
        assert_eq!(
            args.command,
            Command::Learn {
                mode: PracticeMode::Writing,
                source: LearnSource::Select(vec![1, 4, 7]),
            }
        );
        assert!(matches!(
            parse(&["learn", "--select", "0,2"]),
            Err(ArgsError::InvalidSelection { .. })
        ));
    }

    #[test]
    fn import_requires_a_title() {
        assert!(matches!(
            parse(&["import", "--delimiter", "comma"]),
            Err(ArgsError::MissingFlag { flag: "--title" })
        ));
        let args = parse(&["import", "--title", "HSK 1", "--delimiter", " - "]).unwrap();
        match args.command {
            Command::Import { delimiter, .. } => {
                assert_eq!(delimiter, Delimiter::Custom(" - ".into()));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn study_flags_map_to_options() {
        let set = SetId::from_u128(5);
        let args = parse(&["study", "--set", &set.to_string(), "--swap", "--starred"]).unwrap();
        assert_eq!(
            args.command,
            Command::Study {
                set,
                mode: PracticeMode::Flashcards,
                options: StudyOptions {
                    shuffle: false,
                    orientation: CardOrientation::DefinitionFirst,
                    starred_only: true,
                },
            }
        );
    }

    #[test]
    fn environment_user_is_used() {
        let user = UserId::from_u128(42);
        let args = Args::parse_from(Vec::<String>::new(), |key| {
            (key == "HANZI_USER_ID").then(|| user.to_string())
        })
        .unwrap();
        assert_eq!(args.user, user);
    }

    #[test]
    fn unknown_command_is_reported() {
        assert!(matches!(
            parse(&["fly"]),
            Err(ArgsError::UnknownCommand(cmd)) if cmd == "fly"
        ));
    }
}
