use anyhow::{Result, anyhow};
use clap::{Arg, ArgMatches, Command, builder::PossibleValuesParser};
use secrecy::SecretString;

pub const ARG_STORAGE: &str = "storage";
pub const ARG_DSN: &str = "dsn";
pub const ARG_REDIS_URL: &str = "redis-url";
pub const ARG_MIGRATE: &str = "migrate";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKind {
    /// `PostgreSQL` users, `Redis` tokens, `AMQP` events.
    Postgres,
    /// Everything in process; state is lost on exit.
    Memory,
}

#[derive(Debug, Clone)]
pub enum Options {
    Postgres {
        dsn: SecretString,
        redis_url: SecretString,
        migrate: bool,
    },
    Memory,
}

impl Options {
    /// Parse storage arguments from matches.
    ///
    /// # Errors
    /// Returns an error if a connection string required by the selected
    /// backend is missing.
    pub fn parse(matches: &ArgMatches) -> Result<Self> {
        let kind = match matches.get_one::<String>(ARG_STORAGE).map(String::as_str) {
            Some("memory") => StorageKind::Memory,
            _ => StorageKind::Postgres,
        };

        let read_required = |id: &str| -> Result<SecretString> {
            matches
                .get_one::<String>(id)
                .filter(|v| !v.trim().is_empty())
                .map(|v| SecretString::from(v.clone()))
                .ok_or_else(|| anyhow!("missing required argument: --{id}"))
        };

        match kind {
            StorageKind::Memory => Ok(Self::Memory),
            StorageKind::Postgres => Ok(Self::Postgres {
                dsn: read_required(ARG_DSN)?,
                redis_url: read_required(ARG_REDIS_URL)?,
                migrate: matches.get_flag(ARG_MIGRATE),
            }),
        }
    }

    #[must_use]
    pub fn kind(&self) -> StorageKind {
        match self {
            Self::Postgres { .. } => StorageKind::Postgres,
            Self::Memory => StorageKind::Memory,
        }
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_STORAGE)
                .long(ARG_STORAGE)
                .help("Storage backend")
                .long_help(
                    "Storage backend. `postgres` keeps users in PostgreSQL, tokens in Redis and publishes events over AMQP; `memory` keeps everything in process for local runs.",
                )
                .env("UNICLUBS_STORAGE")
                .default_value("postgres")
                .value_parser(PossibleValuesParser::new(["postgres", "memory"])),
        )
        .arg(
            Arg::new(ARG_DSN)
                .short('d')
                .long(ARG_DSN)
                .help("Database connection string")
                .env("UNICLUBS_DSN"),
        )
        .arg(
            Arg::new(ARG_REDIS_URL)
                .long(ARG_REDIS_URL)
                .help("Redis URL for session and activation tokens")
                .env("UNICLUBS_REDIS_URL"),
        )
        .arg(
            Arg::new(ARG_MIGRATE)
                .long(ARG_MIGRATE)
                .help("Apply database migrations before serving")
                .env("UNICLUBS_MIGRATE")
                .action(clap::ArgAction::SetTrue),
        )
}
