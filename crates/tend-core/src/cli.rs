use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::anyhow;
use clap::{ArgAction, Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone)]
pub struct KeyVal {
    pub key: String,
    pub value: String,
}

impl std::str::FromStr for KeyVal {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (k, v) = s
            .split_once('=')
            .ok_or_else(|| anyhow!("expected KEY=VALUE, got: {s}"))?;
        Ok(Self {
            key: k.trim().to_string(),
            value: v.trim().to_string(),
        })
    }
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "tend",
    version,
    about = "tend: a small personal task tracker",
    disable_help_subcommand = true
)]
pub struct GlobalCli {
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[arg(short = 'q', long = "quiet", action = ArgAction::Count, global = true)]
    pub quiet: u8,

    #[arg(
        long = "rc",
        value_parser = clap::builder::ValueParser::new(|s: &str| s.parse::<KeyVal>()),
        action = ArgAction::Append,
        global = true
    )]
    pub rc_overrides: Vec<KeyVal>,

    #[arg(long = "tendrc", global = true)]
    pub tendrc: Option<PathBuf>,

    #[arg(long = "data", global = true)]
    pub data: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Add a task.
    Add {
        title: String,

        /// Due date: YYYY-MM-DD, today, tomorrow, or +Nd.
        #[arg(long)]
        due: Option<String>,

        /// low, medium, or high.
        #[arg(long)]
        priority: Option<String>,

        /// Reminder time, same date forms as --due.
        #[arg(long)]
        notify: Option<String>,
    },

    /// Show the current projection (the default command).
    List {
        /// One-shot filter override: all, active, completed, due-close.
        #[arg(long)]
        filter: Option<String>,

        /// One-shot sort override: created-at, due-date, priority.
        #[arg(long)]
        sort: Option<String>,
    },

    /// Toggle a task's completion.
    Done { id: String },

    /// Delete a task.
    Delete { id: String },

    /// Edit fields of a task.
    Edit {
        id: String,

        #[arg(long)]
        title: Option<String>,

        #[arg(long)]
        due: Option<String>,

        #[arg(long)]
        priority: Option<String>,

        #[arg(long)]
        notify: Option<String>,

        #[arg(long, conflicts_with = "due")]
        clear_due: bool,

        #[arg(long, conflicts_with = "priority")]
        clear_priority: bool,

        #[arg(long, conflicts_with = "notify")]
        clear_notify: bool,
    },

    /// Set the active filter: all, active, completed, due-close.
    Filter { kind: String },

    /// Set the active sort key: created-at, due-date, priority.
    Sort { key: String },

    /// Turn a free-form sentence into a task via the configured converter.
    Quick {
        #[arg(required = true)]
        text: Vec<String>,
    },

    /// List the alerts that would be scheduled for the current projection.
    Reminders,
}

pub fn init_tracing(verbose: u8, quiet: u8) -> anyhow::Result<()> {
    let default_level = if quiet >= 2 {
        "error"
    } else if quiet == 1 {
        "warn"
    } else if verbose >= 3 {
        "trace"
    } else if verbose == 2 {
        "debug"
    } else if verbose == 1 {
        "info"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| anyhow!("invalid RUST_LOG / log filter: {e}"))?;

    let init_result = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .try_init();

    if let Err(err) = init_result {
        debug!(error = %err, "tracing subscriber already set, continuing");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::{Command, GlobalCli};

    #[test]
    fn add_with_options_parses() {
        let cli = GlobalCli::parse_from([
            "tend", "add", "write report", "--due", "tomorrow", "--priority", "high",
        ]);
        match cli.command {
            Some(Command::Add {
                title,
                due,
                priority,
                notify,
            }) => {
                assert_eq!(title, "write report");
                assert_eq!(due.as_deref(), Some("tomorrow"));
                assert_eq!(priority.as_deref(), Some("high"));
                assert_eq!(notify, None);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn missing_subcommand_is_allowed() {
        let cli = GlobalCli::parse_from(["tend", "-v"]);
        assert!(cli.command.is_none());
        assert_eq!(cli.verbose, 1);
    }

    #[test]
    fn rc_override_needs_key_value_shape() {
        assert!("color=on".parse::<super::KeyVal>().is_ok());
        assert!("colour".parse::<super::KeyVal>().is_err());
    }

    #[test]
    fn quick_collects_the_whole_sentence() {
        let cli = GlobalCli::parse_from(["tend", "quick", "내일까지", "보고서", "작성"]);
        match cli.command {
            Some(Command::Quick { text }) => {
                assert_eq!(text.join(" "), "내일까지 보고서 작성");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
