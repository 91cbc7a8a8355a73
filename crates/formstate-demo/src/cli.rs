#![forbid(unsafe_code)]

//! Command-line argument parsing for the demo.
//!
//! Parses args manually. Environment variables provide defaults and are
//! overridden by explicit flags.

use std::env;
use std::fmt;
use std::str::FromStr;

use formstate::UpdatePolicy;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Environment variable selecting the scripted flow.
pub const DEMO_MODE_ENV: &str = "FORMSTATE_DEMO_MODE";

pub const HELP_TEXT: &str = "\
formstate demo: scripted edits against a profile form

USAGE:
    formstate-demo [OPTIONS]

OPTIONS:
    --mode=MODE          Flow to run: 'change', 'submit' or 'all' (default: all)
    --policy=POLICY      Update policy: on-change, always, init-only, manual
    --help, -h           Show this help message
    --version, -V        Show version

ENVIRONMENT VARIABLES:
    FORMSTATE_DEMO_MODE       Override --mode default
    FORMSTATE_UPDATE_POLICY   Override --policy default
    RUST_LOG                  Log filter (e.g. formstate=trace)";

/// Which scripted flow to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DemoMode {
    /// Commit every keystroke directly.
    Change,
    /// Stage edits and commit them on submit.
    Submit,
    /// Both flows, one after the other.
    #[default]
    All,
}

impl FromStr for DemoMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "change" | "live" => Ok(Self::Change),
            "submit" | "staged" => Ok(Self::Submit),
            "all" | "both" => Ok(Self::All),
            other => Err(format!("unknown demo mode {other:?}")),
        }
    }
}

impl fmt::Display for DemoMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Change => "change",
            Self::Submit => "submit",
            Self::All => "all",
        })
    }
}

/// What the command line asked for.
#[derive(Debug, PartialEq, Eq)]
pub enum Command {
    Run(Opts),
    Help,
    Version,
}

/// Parsed options.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Opts {
    pub mode: DemoMode,
    pub policy: UpdatePolicy,
}

impl Opts {
    /// Defaults resolved from the environment.
    pub fn from_env() -> Self {
        let mode = match env::var(DEMO_MODE_ENV) {
            Ok(val) => val.parse::<DemoMode>().unwrap_or_else(|err| {
                tracing::warn!(var = DEMO_MODE_ENV, error = %err, "ignoring demo mode");
                DemoMode::default()
            }),
            Err(_) => DemoMode::default(),
        };
        Self {
            mode,
            policy: UpdatePolicy::from_env(),
        }
    }
}

/// Apply command-line `args` on top of `defaults`.
pub fn parse_args<I>(defaults: Opts, args: I) -> Result<Command, String>
where
    I: IntoIterator<Item = String>,
{
    let mut opts = defaults;
    for arg in args {
        match arg.as_str() {
            "--help" | "-h" => return Ok(Command::Help),
            "--version" | "-V" => return Ok(Command::Version),
            other => {
                if let Some(val) = other.strip_prefix("--mode=") {
                    opts.mode = val.parse::<DemoMode>()?;
                } else if let Some(val) = other.strip_prefix("--policy=") {
                    opts.policy = val
                        .parse::<UpdatePolicy>()
                        .map_err(|err| err.to_string())?;
                } else {
                    return Err(format!("unknown argument: {other}"));
                }
            }
        }
    }
    Ok(Command::Run(opts))
}

pub fn version() -> String {
    format!("formstate-demo {VERSION}")
}
