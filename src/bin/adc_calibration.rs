// iio-eval/src/bin/adc_calibration.rs
//
// Copyright (c) 2018-2025, Frank Pagliughi
//
// Licensed under the MIT license:
//   <LICENSE or http://opensource.org/licenses/MIT>
// This file may not be copied, modified, or distributed except according
// to those terms.
//

//! Runs the firmware's internal or system calibration on each channel.

use anyhow::{Context, Result};
use clap::{value_parser, Arg, ArgAction, Command};
use iio_eval::{
    self as iio,
    calibration::{self, CalibrationKind, CalibrationStatus},
    measurement::DemoConfig,
    prompt::StdConsole,
    DeviceAttr, DeviceXattrs, SerialUri,
};
use std::{process, time::Duration};

// --------------------------------------------------------------------------

fn run() -> Result<()> {
    let args = Command::new("adc_calibration")
        .version(clap::crate_version!())
        .about("Calibrate the ADC channels of an evaluation board.")
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
            Arg::new("device")
                .short('d')
                .long("device")
                .required(true)
                .action(ArgAction::Set)
                .help("The name of the IIO device to calibrate"),
        )
        .arg(
            Arg::new("type")
                .short('k')
                .long("type")
                .action(ArgAction::Set)
                .help("1 for internal, 2 for system calibration; asked if omitted"),
        )
        .arg(
            Arg::new("settle_ms")
                .short('s')
                .long("settle-ms")
                .action(ArgAction::Set)
                .value_parser(value_parser!(u64))
                .help("Time to wait for a calibration to finish, in ms"),
        )
        .get_matches();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let uri = args.get_one::<SerialUri>("uri").context("No URI")?;
    let dev_name = args.get_one::<String>("device").context("No device")?;
    let settle = args
        .get_one::<u64>("settle_ms")
        .map_or(calibration::DFLT_SETTLE, |ms| Duration::from_millis(*ms));

    let ctx = iio::Context::connect(uri, Duration::from_millis(u64::from(iio::DFLT_TIMEOUT_MS)))
        .with_context(|| format!("Couldn't open the IIO context at '{}'", uri))?;

    let dev = ctx
        .find_device(dev_name)
        .with_context(|| format!("No IIO device named '{}'", dev_name))?;

    let demo: DemoConfig = DeviceXattrs::new(&dev).get_str(DeviceAttr::DemoConfig)?.parse()?;
    println!("\r\nDemo Config: {}\r\n", demo);

    let channels: Vec<String> = dev
        .channels()
        .filter(|ch| !ch.is_output())
        .filter_map(|ch| ch.id())
        .collect();

    let mut console = StdConsole::stdio();
    let kind: CalibrationKind = match args.get_one::<String>("type") {
        Some(s) => s.parse()?,
        None => console.calibration_kind()?,
    };

    let results =
        calibration::calibrate_channels(&dev, &channels, &demo, kind, settle, &mut console)?;

    let failed = results
        .iter()
        .filter(|r| matches!(r.readback.status, CalibrationStatus::Failed(_)))
        .count();
    if failed > 0 {
        log::warn!("{} of {} calibration step(s) didn't complete", failed, results.len());
    }
    println!("\r\nCalibration done.");
    Ok(())
}

// --------------------------------------------------------------------------

fn main() {
    if let Err(err) = run() {
        eprintln!("{:#}", err);
        process::exit(1);
    }
}
