// iio-eval/src/bin/console_check.rs
//
// Copyright (c) 2018-2025, Frank Pagliughi
//
// Licensed under the MIT license:
//   <LICENSE or http://opensource.org/licenses/MIT>
// This file may not be copied, modified, or distributed except according
// to those terms.
//

//! Drives the menu console of an evaluation firmware from a check script.
//!
//! Each step of the script sends keys to the board, waits, and matches
//! the reply against a pattern. The process exits with an error on the
//! first step that doesn't match.

use anyhow::{Context, Result};
use clap::{value_parser, Arg, ArgAction, Command};
use iio_eval::{
    console::{CheckScript, ConsoleSession, DFLT_LINE_BUDGET, DFLT_READ_TIMEOUT},
    SerialUri,
};
use std::{path::PathBuf, process, time::Duration};

// --------------------------------------------------------------------------

fn run() -> Result<()> {
    let args = Command::new("console_check")
        .version(clap::crate_version!())
        .about("Run a scripted check against a console-mode evaluation firmware.")
        .disable_help_flag(true)
        .arg(
            Arg::new("help")
                .short('?')
                .long("help")
                .global(true)
                .action(ArgAction::Help)
                .help("Print help information"),
        )
        .arg(
            Arg::new("uri")
                .short('u')
                .long("uri")
                .required(true)
                .action(ArgAction::Set)
                .value_parser(value_parser!(SerialUri))
                .help("The serial URI of the board, like serial:COM12,230400"),
        )
        .arg(
            Arg::new("script")
                .short('s')
                .long("script")
                .required(true)
                .action(ArgAction::Set)
                .value_parser(value_parser!(PathBuf))
                .help("The TOML check script"),
        )
        .arg(
            Arg::new("timeout_ms")
                .short('t')
                .long("timeout-ms")
                .action(ArgAction::Set)
                .value_parser(value_parser!(u64))
                .help("How long the port may stay quiet before a reply is complete, in ms"),
        )
        .arg(
            Arg::new("lines")
                .short('l')
                .long("lines")
                .action(ArgAction::Set)
                .value_parser(value_parser!(usize))
                .help("The most reply lines read per step"),
        )
        .get_matches();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let uri = args.get_one::<SerialUri>("uri").context("No URI")?;
    let path = args.get_one::<PathBuf>("script").context("No script")?;
    let timeout = args
        .get_one::<u64>("timeout_ms")
        .map_or(DFLT_READ_TIMEOUT, |ms| Duration::from_millis(*ms));
    let budget = *args.get_one::<usize>("lines").unwrap_or(&DFLT_LINE_BUDGET);

    let script = CheckScript::load(path)
        .with_context(|| format!("Couldn't load the script '{}'", path.display()))?;

    let mut session = ConsoleSession::open(uri, timeout)
        .with_context(|| format!("Couldn't open the port for '{}'", uri))?
        .line_budget(budget);

    println!(
        "Running {} ({} step(s)) on {}",
        script.name.as_deref().unwrap_or("check"),
        script.steps.len(),
        uri
    );

    let outcomes = script.run(&mut session)?;

    for out in &outcomes {
        match out.value {
            Some(val) => println!("  step {}: ok, {}", out.index, val),
            None => println!("  step {}: ok", out.index),
        }
    }
    println!("All {} step(s) passed.", outcomes.len());
    Ok(())
}

// --------------------------------------------------------------------------

fn main() {
    if let Err(err) = run() {
        eprintln!("{:#}", err);
        process::exit(1);
    }
}
