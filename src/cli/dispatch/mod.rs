//! Map validated CLI arguments to the action to run.

use crate::cli::actions::{Action, server::Args};
use crate::cli::commands::{ARG_PORT, auth, broker, storage};
use anyhow::{Result, anyhow};

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>(ARG_PORT).copied().unwrap_or(8080);

    let storage_opts = storage::Options::parse(matches)?;
    let broker_opts = broker::Options::parse(matches);

    if storage_opts.kind() == storage::StorageKind::Postgres && broker_opts.url.is_none() {
        return Err(anyhow!("missing required argument: --amqp-url"));
    }

    Ok(Action::Server(Args {
        port,
        storage: storage_opts,
        broker: broker_opts,
        auth: auth::Options::parse(matches),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn amqp_url_required_with_postgres() {
        temp_env::with_vars(
            [
                ("UNICLUBS_STORAGE", None::<&str>),
                ("UNICLUBS_DSN", Some("postgres://user@localhost:5432/uniclubs")),
                ("UNICLUBS_REDIS_URL", Some("redis://localhost:6379")),
                ("UNICLUBS_AMQP_URL", None),
            ],
            || {
                let command = crate::cli::commands::new();
                let matches = command.get_matches_from(vec!["uniclubs-user"]);
                let result = handler(&matches);
                assert!(result.is_err());
                if let Err(err) = result {
                    assert!(
                        err.to_string()
                            .contains("missing required argument: --amqp-url")
                    );
                }
            },
        );
    }

    #[test]
    fn memory_server_args() -> Result<()> {
        temp_env::with_vars(
            [
                ("UNICLUBS_STORAGE", Some("memory")),
                ("UNICLUBS_PORT", None::<&str>),
                ("UNICLUBS_AMQP_URL", None),
                ("UNICLUBS_BCRYPT_COST", None),
            ],
            || {
                let command = crate::cli::commands::new();
                let matches =
                    command.get_matches_from(vec!["uniclubs-user", "--bcrypt-cost", "4"]);
                let Action::Server(args) = handler(&matches)?;
                assert_eq!(args.port, 8080);
                assert_eq!(args.storage.kind(), storage::StorageKind::Memory);
                assert_eq!(args.auth.bcrypt_cost, 4);
                assert_eq!(args.broker.exchange, "uniclubs");
                Ok(())
            },
        )
    }
}
