/*
Copyright (C) 2022 Aurora McGinnis

This Source Code Form is subject to the terms of the Mozilla Public
License, v. 2.0. If a copy of the MPL was not distributed with this
file, You can obtain one at http://mozilla.org/MPL/2.0/.
*/

//! Reads monitoring events as JSON lines and prints them as colorized logfmt.

use clap::Parser;
use logfmt_console::{Formatter, JsonLines};
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;
use std::process::ExitCode;

/// Print monitoring events (one JSON object per line) as logfmt.
#[derive(Parser)]
#[command(name = "logfmt-console")]
#[command(version, about, long_about = None)]
struct Cli {
    /// File to read events from (default: stdin).
    input: Option<PathBuf>,

    /// Render timestamps in the local time zone instead of UTC.
    #[arg(long, env = "LOGFMT_CONSOLE_LOCAL_TIME")]
    local_time: bool,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    let reader: Box<dyn BufRead + Send> = match &cli.input {
        Some(path) => match File::open(path) {
            Ok(f) => Box::new(BufReader::new(f)),
            Err(e) => {
                log::error!("cannot open {}: {}", path.display(), e);
                return ExitCode::FAILURE;
            }
        },
        None => Box::new(BufReader::new(io::stdin())),
    };

    let formatter = Formatter::builder().use_utc(!cli.local_time).build();
    let result = formatter
        .attach(JsonLines::new(reader), io::stdout())
        .map_err(Into::into)
        .and_then(|pipeline| pipeline.join());

    match result {
        Ok(lines) => {
            log::debug!("wrote {} lines", lines);
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
