// iio-eval/src/bin/sensor_measurement.rs
//
// Copyright (c) 2018-2025, Frank Pagliughi
//
// Licensed under the MIT license:
//   <LICENSE or http://opensource.org/licenses/MIT>
// This file may not be copied, modified, or distributed except according
// to those terms.
//

//! Prints sensor readings in physical units until a key is pressed.
//!
//! The conversion depends on the firmware's demo configuration. A
//! loadcell is calibrated against a known weight before measuring.

use anyhow::{Context, Result};
use chrono::Local;
use clap::{value_parser, Arg, ArgAction, Command};
use iio_eval::{
    self as iio, calibration, cancel,
    measurement::{channel_index, Converter, DemoConfig},
    prompt::StdConsole,
    CancelToken, ChannelXattrs, DeviceAttr, DeviceXattrs, SerialUri,
};
use std::{process, thread, time::Duration};

const DFLT_INTERVAL_MS: u64 = 100;

// --------------------------------------------------------------------------

fn run() -> Result<()> {
    let args = Command::new("sensor_measurement")
        .version(clap::crate_version!())
        .about("Measure sensors attached to an evaluation board.")
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
                .help("The name of the IIO device"),
        )
        .arg(
            Arg::new("interval_ms")
                .short('i')
                .long("interval-ms")
                .action(ArgAction::Set)
                .value_parser(value_parser!(u64))
                .help("Delay between channel reads, in ms"),
        )
        .get_matches();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let uri = args.get_one::<SerialUri>("uri").context("No URI")?;
    let dev_name = args.get_one::<String>("device").context("No device")?;
    let interval = Duration::from_millis(*args.get_one::<u64>("interval_ms").unwrap_or(&DFLT_INTERVAL_MS));

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

    let mut conv = Converter::new(demo.clone());

    // ----- Loadcell calibration, while the console is still ours -----

    if demo == DemoConfig::Loadcell {
        let mut console = StdConsole::stdio();
        for id in &channels {
            let idx = channel_index(id).with_context(|| format!("Bad channel id '{}'", id))?;
            println!("\r\nCalibrating Loadcell for channel {}", idx);
            let chan = ChannelXattrs::new(&dev, id.as_str());
            let cal = calibration::calibrate_loadcell(
                &chan,
                calibration::DFLT_LOADCELL_SETTLE,
                &mut console,
            )?;
            conv.set_loadcell(idx, cal);
        }
    }

    // ----- Measure -----

    let cancel_token = CancelToken::new();
    cancel::cancel_on_ctrlc(&cancel_token)?;
    cancel::cancel_on_enter(&cancel_token);

    println!("\r\n*** Press Enter (or Ctrl-C) to stop the measurement ***\r\n");
    println!("{:<15} {}", "time", channels.join(" "));

    'measure: while !cancel_token.is_cancelled() {
        let mut line = format!("{:<15}", Local::now().format("%H:%M:%S%.3f"));

        for id in &channels {
            thread::sleep(interval);
            match conv.measure(&ChannelXattrs::new(&dev, id.as_str())) {
                Ok(m) => line.push_str(&format!(" {} ", m)),
                Err(err) => {
                    eprintln!("\r\nInvalid measurement result. Please check device settings!! ({})", err);
                    continue 'measure;
                }
            }
        }
        println!("{}", line);
    }

    println!("Measurement stopped.");
    Ok(())
}

// --------------------------------------------------------------------------

fn main() {
    if let Err(err) = run() {
        eprintln!("{:#}", err);
        process::exit(1);
    }
}
