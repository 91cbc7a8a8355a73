#![forbid(unsafe_code)]

//! formstate demo binary entry point.

mod cli;
mod profile;

use std::cell::Cell;
use std::process;
use std::rc::Rc;

use formstate::FormChange;
use tracing_subscriber::EnvFilter;

use crate::cli::{Command, DemoMode, Opts};

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();
}

fn run_flow(
    title: &str,
    opts: &Opts,
    flow: fn(&mut formstate::Form<profile::Profile>, &mut Vec<String>),
) -> Result<(), formstate::validation::PatternError> {
    let mut form = profile::profile_form(opts.policy)?;

    let flips = Rc::new(Cell::new(0_usize));
    let seen = Rc::clone(&flips);
    let _watch = form.subscribe(move |change| {
        if matches!(change, FormChange::Validity | FormChange::Pristine) {
            seen.set(seen.get() + 1);
        }
    });

    let mut lines = Vec::new();
    flow(&mut form, &mut lines);

    println!("== {title} (policy: {}) ==", opts.policy);
    for line in &lines {
        println!("  {line}");
    }
    println!("  form-level flips observed: {}", flips.get());
    Ok(())
}

fn main() {
    init_logging();

    let command = match cli::parse_args(Opts::from_env(), std::env::args().skip(1)) {
        Ok(command) => command,
        Err(err) => {
            eprintln!("{err}");
            eprintln!("Run with --help for usage information.");
            process::exit(1);
        }
    };

    let opts = match command {
        Command::Help => {
            println!("{}", cli::HELP_TEXT);
            return;
        }
        Command::Version => {
            println!("{}", cli::version());
            return;
        }
        Command::Run(opts) => opts,
    };

    tracing::info!(mode = %opts.mode, policy = %opts.policy, "starting demo");

    let mut result = Ok(());
    if matches!(opts.mode, DemoMode::Change | DemoMode::All) {
        result = result.and_then(|()| run_flow("change", &opts, profile::run_change_flow));
    }
    if matches!(opts.mode, DemoMode::Submit | DemoMode::All) {
        result = result.and_then(|()| run_flow("submit", &opts, profile::run_submit_flow));
    }

    if let Err(err) = result {
        tracing::error!(error = %err, "demo failed");
        eprintln!("demo failed: {err}");
        process::exit(1);
    }
}
