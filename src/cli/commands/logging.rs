use clap::{Arg, ArgAction, Command, builder::ValueParser};

pub const ARG_VERBOSITY: &str = "verbosity";

/// Level names in verbosity order; the index is the `-v` count.
const LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

/// Accepts a level name (any case) or its numeric verbosity.
#[must_use]
pub fn validator_log_level() -> ValueParser {
    ValueParser::from(|level: &str| -> Result<u8, String> {
        let level = level.trim().to_ascii_lowercase();
        let index = match level.parse::<usize>() {
            Ok(count) if count < LEVELS.len() => Some(count),
            Ok(_) => None,
            Err(_) => LEVELS.iter().position(|name| *name == level),
        };
        index
            .and_then(|index| u8::try_from(index).ok())
            .ok_or_else(|| format!("invalid log level, expected one of {}", LEVELS.join(", ")))
    })
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command.arg(
        Arg::new(ARG_VERBOSITY)
            .short('v')
            .long("verbose")
            .help("Verbosity: repeat -v, or a level name (error, warn, info, debug, trace)")
            .env("UNICLUBS_LOG_LEVEL")
            .global(true)
            .action(ArgAction::Count)
            .value_parser(validator_log_level()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(value: &str) -> Option<u8> {
        temp_env::with_vars([("UNICLUBS_LOG_LEVEL", Some(value))], || {
            with_args(Command::new("test"))
                .try_get_matches_from(vec!["test"])
                .ok()
                .and_then(|matches| matches.get_one::<u8>(ARG_VERBOSITY).copied())
        })
    }

    #[test]
    fn names_and_numbers() {
        assert_eq!(parse("DEBUG"), Some(3));
        assert_eq!(parse("1"), Some(1));
        assert_eq!(parse("9"), None);
        assert_eq!(parse("loud"), None);
    }
}
