// iio-eval/src/bin/adc_data_capture.rs
//
// Copyright (c) 2018-2025, Frank Pagliughi
//
// Licensed under the MIT license:
//   <LICENSE or http://opensource.org/licenses/MIT>
// This file may not be copied, modified, or distributed except according
// to those terms.
//

//! Captures ADC samples from an evaluation board into a CSV file.
//!
//! The capture is read from the device in blocks of at most the block
//! size. A sample count of zero captures continuously until Enter or
//! Ctrl-C is pressed.
//!
//! With `--expect-range MIN,MAX` the captured voltages are checked against
//! the limits, and the process fails if any of them falls outside.

use anyhow::{Context, Result};
use clap::{value_parser, Arg, ArgAction, Command};
use iio_eval::{
    self as iio,
    cancel,
    measurement::{ChannelScaling, RangeCheck, VoltageLimits},
    prompt::StdConsole,
    sink::{self, CsvSink},
    CancelToken, CapturePlan, ChannelXattrs, SampleSource, SampleTarget, SessionConfig,
};
use std::{env, path::PathBuf, process};

// --------------------------------------------------------------------------

fn run() -> Result<()> {
    let args = Command::new("adc_data_capture")
        .version(clap::crate_version!())
        .about("Capture ADC data from a precision converter evaluation board.")
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
            Arg::new("config")
                .short('f')
                .long("config")
                .action(ArgAction::Set)
                .value_parser(value_parser!(PathBuf))
                .help("Read session settings from a TOML file"),
        )
        .arg(
            Arg::new("uri")
                .short('u')
                .long("uri")
                .action(ArgAction::Set)
                .help("The serial URI of the board, like serial:COM12,230400"),
        )
        .arg(
            Arg::new("device")
                .short('d')
                .long("device")
                .action(ArgAction::Set)
                .help("The name of the IIO device to capture from"),
        )
        .arg(
            Arg::new("channel")
                .short('c')
                .long("channel")
                .action(ArgAction::Append)
                .use_value_delimiter(true)
                .help("Channel(s) to capture; all scan channels if omitted"),
        )
        .arg(
            Arg::new("block_size")
                .short('b')
                .long("block-size")
                .action(ArgAction::Set)
                .value_parser(value_parser!(usize))
                .help("The most samples read from the device at once"),
        )
        .arg(
            Arg::new("samples")
                .short('n')
                .long("samples")
                .action(ArgAction::Set)
                .value_parser(value_parser!(usize))
                .help("Samples per channel (0 for continuous); asked if omitted"),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .action(ArgAction::Set)
                .value_parser(value_parser!(PathBuf))
                .help("The CSV file to write"),
        )
        .arg(
            Arg::new("result_tag")
                .short('t')
                .long("result-tag")
                .action(ArgAction::Set)
                .conflicts_with("output")
                .help("Write to output/<device>_<tag>_RESULT.csv"),
        )
        .arg(
            Arg::new("expect_range")
                .short('r')
                .long("expect-range")
                .action(ArgAction::Set)
                .value_parser(value_parser!(VoltageLimits))
                .help("Fail unless every sample lies inside MIN,MAX volts"),
        )
        .get_matches();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut cfg = SessionConfig::load_or_default(args.get_one::<PathBuf>("config").map(|p| p.as_path()))
        .context("Couldn't read the session file")?;

    if let Some(uri) = args.get_one::<String>("uri") {
        cfg.uri = Some(uri.parse()?);
    }
    if let Some(dev) = args.get_one::<String>("device") {
        cfg.device = Some(dev.clone());
    }
    if let Some(chans) = args.get_many::<String>("channel") {
        cfg.channels = chans.cloned().collect();
    }
    if let Some(n) = args.get_one::<usize>("block_size") {
        cfg.block_size = *n;
    }
    if let Some(path) = args.get_one::<PathBuf>("output") {
        cfg.output = Some(path.clone());
    }

    let uri = cfg.uri.as_ref().context("No board URI given (--uri or the session file)")?;
    let dev_name = cfg.device.as_deref().context("No device given (--device or the session file)")?;

    // ----- Connect -----

    let ctx = iio::Context::connect(uri, cfg.timeout())
        .with_context(|| format!("Couldn't open the IIO context at '{}'", uri))?;

    let dev = ctx
        .find_device(dev_name)
        .with_context(|| format!("No IIO device named '{}'", dev_name))?;

    let chans = dev.scan_channels(&cfg.channels)?;
    let mut source = iio::DeviceSource::new(&dev, chans)?;
    println!("Capturing from {}: {}", dev_name, source.channel_ids().join(", "));

    // ----- Plan the capture -----

    let target = match args.get_one::<usize>("samples") {
        Some(&n) if n == 0 || (iio::MIN_SAMPLE_COUNT..=iio::MAX_SAMPLE_COUNT).contains(&n) => {
            SampleTarget::from_count(n)
        }
        Some(&n) => anyhow::bail!(
            "Sample count {} out of range. Use 0 or {}-{}",
            n,
            iio::MIN_SAMPLE_COUNT,
            iio::MAX_SAMPLE_COUNT
        ),
        // The console lock has to be released before the key listener starts
        None => StdConsole::stdio().sample_target()?,
    };

    let plan = CapturePlan::new(target, cfg.block_size)?;

    let cwd = env::current_dir()?;
    let path = match (args.get_one::<String>("result_tag"), &cfg.output) {
        (Some(tag), _) => sink::result_path(&cwd, dev_name, tag)?,
        (None, Some(path)) => path.clone(),
        (None, None) => sink::capture_path(&cwd),
    };

    let limits = args.get_one::<VoltageLimits>("expect_range").copied();

    // Only the range check needs the channel scaling
    let scaling = match limits {
        Some(_) => source
            .channel_ids()
            .iter()
            .map(|id| ChannelScaling::read(&ChannelXattrs::new(&dev, id.as_str())))
            .collect::<iio::Result<Vec<_>>>()?,
        None => Vec::new(),
    };

    let csv = CsvSink::create(&path, source.channel_count())
        .with_context(|| format!("Couldn't create '{}'", path.display()))?;
    let mut sink = RangeCheck::new(csv, scaling);

    let cancel_token = CancelToken::new();
    if target == SampleTarget::Continuous {
        cancel::cancel_on_ctrlc(&cancel_token)?;
        cancel::cancel_on_enter(&cancel_token);
        println!("\r\n*** Press Enter (or Ctrl-C) to stop the data capture ***\r\n");
    }

    // ----- Capture -----

    let mut progress = iio::DotProgress::new();
    let summary = iio::run(&mut source, &mut sink, &plan, &cancel_token, |_| progress.tick())?;
    let checked = limits.map(|lim| sink.verify(&lim));
    sink.into_inner().finish()?;

    println!(
        "\r\nData capture done. {} sample(s) in {} block(s) stored in '{}'",
        summary.rows,
        summary.blocks,
        path.display()
    );

    if let Some(res) = checked {
        let (lo, hi) = res.context("Captured voltage outside the expected range")?;
        println!("Min Voltage: {:.6}\r\nMax Voltage: {:.6}", lo, hi);
    }
    Ok(())
}

// --------------------------------------------------------------------------

fn main() {
    if let Err(err) = run() {
        eprintln!("{:#}", err);
        process::exit(1);
    }
}
