//! Command-line parsing

use std::str::FromStr;

use tea5767_protocol::SearchDirection;
use thiserror::Error;

pub const USAGE: &str = "\
Usage: fm-radio [COMMAND]

Commands:
  start               Tune the default station and power on (default)
  on                  Leave standby and unmute
  off                 Enter standby
  mute                Toggle mute
  status              Show the tuned station and signal report
  tune <MHz>          Tune to a station between 87.5 and 107.9 MHz
  search <up|down>    Let the receiver search for the next station
  scan [up|down]      Step through the whole band and list stations
  help                Show this message

Set RUST_LOG to change logging, e.g. RUST_LOG=tea5767_tuner=debug";

/// Errors from parsing the command line
#[derive(Debug, Error, PartialEq)]
pub enum CommandError {
    #[error("unknown command: {0}")]
    Unknown(String),

    #[error("{command} needs {what}")]
    MissingArgument {
        command: &'static str,
        what: &'static str,
    },

    #[error("invalid {what}: {value}")]
    InvalidArgument { what: &'static str, value: String },

    #[error("unexpected argument: {0}")]
    Unexpected(String),
}

/// One invocation of the front end
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    Start,
    On,
    Off,
    Mute,
    Status,
    Tune(f64),
    Search(SearchDirection),
    Scan(SearchDirection),
    Help,
}

impl Command {
    /// Parse the arguments following the program name
    pub fn parse<I, S>(args: I) -> Result<Self, CommandError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let args: Vec<S> = args.into_iter().collect();
        let mut args = args.iter().map(|s| s.as_ref());

        let command = match args.next() {
            None | Some("start") => Command::Start,
            Some("on") => Command::On,
            Some("off") => Command::Off,
            Some("mute") => Command::Mute,
            Some("status") => Command::Status,
            Some("help" | "-h" | "--help") => Command::Help,
            Some("tune") => {
                let value = args.next().ok_or(CommandError::MissingArgument {
                    command: "tune",
                    what: "a frequency in MHz",
                })?;
                let mhz = f64::from_str(value).map_err(|_| CommandError::InvalidArgument {
                    what: "frequency",
                    value: value.to_string(),
                })?;
                Command::Tune(mhz)
            }
            Some("search") => {
                let value = args.next().ok_or(CommandError::MissingArgument {
                    command: "search",
                    what: "a direction (up or down)",
                })?;
                Command::Search(parse_direction(value)?)
            }
            Some("scan") => match args.next() {
                Some(value) => Command::Scan(parse_direction(value)?),
                None => Command::Scan(SearchDirection::Up),
            },
            Some(other) => return Err(CommandError::Unknown(other.to_string())),
        };

        match args.next() {
            Some(extra) => Err(CommandError::Unexpected(extra.to_string())),
            None => Ok(command),
        }
    }

    /// Whether the command can run long enough to be worth cancelling
    pub fn is_long_running(&self) -> bool {
        matches!(self, Command::Search(_) | Command::Scan(_))
    }
}

fn parse_direction(value: &str) -> Result<SearchDirection, CommandError> {
    value
        .parse()
        .map_err(|_| CommandError::InvalidArgument {
            what: "direction",
            value: value.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Command, CommandError> {
        Command::parse(args.iter().copied())
    }

    #[test]
    fn test_no_arguments_starts() {
        assert_eq!(parse(&[]), Ok(Command::Start));
        assert_eq!(parse(&["start"]), Ok(Command::Start));
    }

    #[test]
    fn test_simple_commands() {
        assert_eq!(parse(&["on"]), Ok(Command::On));
        assert_eq!(parse(&["off"]), Ok(Command::Off));
        assert_eq!(parse(&["mute"]), Ok(Command::Mute));
        assert_eq!(parse(&["status"]), Ok(Command::Status));
        assert_eq!(parse(&["--help"]), Ok(Command::Help));
    }

    #[test]
    fn test_tune_takes_frequency() {
        assert_eq!(parse(&["tune", "101.1"]), Ok(Command::Tune(101.1)));
        assert_eq!(
            parse(&["tune"]),
            Err(CommandError::MissingArgument {
                command: "tune",
                what: "a frequency in MHz"
            })
        );
        assert!(matches!(
            parse(&["tune", "loud"]),
            Err(CommandError::InvalidArgument { what: "frequency", .. })
        ));
    }

    #[test]
    fn test_search_accepts_words_and_bits() {
        assert_eq!(
            parse(&["search", "up"]),
            Ok(Command::Search(SearchDirection::Up))
        );
        assert_eq!(
            parse(&["search", "0"]),
            Ok(Command::Search(SearchDirection::Down))
        );
        assert!(parse(&["search"]).is_err());
        assert!(parse(&["search", "sideways"]).is_err());
    }

    #[test]
    fn test_scan_defaults_up() {
        assert_eq!(parse(&["scan"]), Ok(Command::Scan(SearchDirection::Up)));
        assert_eq!(
            parse(&["scan", "down"]),
            Ok(Command::Scan(SearchDirection::Down))
        );
    }

    #[test]
    fn test_rejects_unknown_and_extra() {
        assert_eq!(
            parse(&["louder"]),
            Err(CommandError::Unknown("louder".to_string()))
        );
        assert_eq!(
            parse(&["off", "now"]),
            Err(CommandError::Unexpected("now".to_string()))
        );
    }

    #[test]
    fn test_long_running() {
        assert!(Command::Scan(SearchDirection::Up).is_long_running());
        assert!(!Command::Mute.is_long_running());
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn tune_parses_printed_frequency(mhz in 0.0f64..200.0) {
                let text = mhz.to_string();
                prop_assert_eq!(parse(&["tune", text.as_str()]), Ok(Command::Tune(mhz)));
            }
        }
    }
}
