// Copyright 2025 Pavel Roskin
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Look up entries in a capability database
//!
//! ```bash
//! # Print every entry of /etc/login.conf with tc references expanded
//! getcap login.conf
//!
//! # Print one entry and the entries it refers to, wrapped
//! getcap /etc/termcap -rp xterm
//!
//! # Print single capabilities of an entry
//! getcap login.conf default umask path
//! ```

use std::{
    io::{self, Write},
    iter,
    process::ExitCode,
};

use clap::{Parser, error::ErrorKind};
use tracing::error;
use tracing_subscriber::EnvFilter;

use capdb::{
    cli::{Status, handle},
    locate::locate,
};

/// Environment variable with the log filter
const LOG_VARIABLE: &str = "GETCAP_LOG";

/// Look up entries in a capability database
#[derive(Parser)]
#[command(name = "getcap", version, about, long_about = None)]
#[command(override_usage = "getcap [-v] DATABASE [-n] [-r] [-p] [NAME [CAPABILITY]...]")]
struct Cli {
    /// Log lookups to stderr
    #[arg(short, long)]
    verbose: bool,

    /// Database file name, searched in GETCAP_PATH, or path
    database: String,

    /// Query options and arguments, see `getcap DATABASE --help`
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    query: Vec<String>,
}

/// Print a parse error or the help text, returning the status to exit with
fn usage(err: &clap::Error) -> io::Result<Status> {
    err.print()?;
    Ok(match err.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => Status::Ok,
        _ => Status::Usage,
    })
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            return match usage(&err) {
                Ok(status) => status.into(),
                Err(_) => ExitCode::FAILURE,
            };
        }
    };

    let filter = EnvFilter::try_from_env(LOG_VARIABLE).unwrap_or_else(|_| {
        EnvFilter::new(if cli.verbose { "debug" } else { "warn" })
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let db = match locate(&cli.database) {
        Ok(db) => db,
        Err(err) => {
            error!(database = %cli.database, error = %err, "cannot locate database");
            return Status::NotFound.into();
        }
    };

    let args = iter::once(format!("getcap {}", cli.database)).chain(cli.query);
    let mut stdout = io::stdout().lock();
    let result = handle(&db, args, &mut stdout).and_then(|status| {
        stdout.flush()?;
        Ok(status)
    });
    match result {
        Ok(status) => status.into(),
        Err(err) => {
            error!(error = %err, "cannot write output");
            ExitCode::FAILURE
        }
    }
}
