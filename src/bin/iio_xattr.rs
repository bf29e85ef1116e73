// iio-eval/src/bin/iio_xattr.rs
//
// Copyright (c) 2018-2025, Frank Pagliughi
//
// Licensed under the MIT license:
//   <LICENSE or http://opensource.org/licenses/MIT>
// This file may not be copied, modified, or distributed except according
// to those terms.
//

//! Shows and sets the extended attributes of an evaluation board.
//!

use anyhow::{Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use iio_eval::{self as iio, ChannelAttr, ChannelXattrs, DeviceAttr, DeviceXattrs, SerialUri};
use std::{process, time::Duration};

// --------------------------------------------------------------------------

fn chan_arg() -> Arg<'static> {
    Arg::new("channel")
        .short('c')
        .long("channel")
        .action(ArgAction::Set)
        .help("The channel id, for a channel attribute")
}

// Prints every catalogued attribute the device actually has.
fn info(dev: &iio::Device) -> Result<()> {
    let xattrs = DeviceXattrs::new(dev);
    let present = dev.attr_names();

    println!("{}:", dev.name().unwrap_or_else(|| "<unknown>".to_string()));
    for attr in DeviceAttr::ALL.iter().filter(|a| present.iter().any(|p| p == a.name())) {
        let val = xattrs.get_str(*attr).unwrap_or_else(|err| format!("<{}>", err));
        print!("\t{}: {}", attr.name(), val);
        if let Ok(Some(avail)) = xattrs.available(*attr) {
            print!("  [{}]", avail);
        }
        println!();
    }

    for chan in dev.channels() {
        let id = chan.id().unwrap_or_default();
        let present = chan.attr_names();
        println!("\t{}{}:", id, if chan.is_output() { " (output)" } else { "" });

        let cx = ChannelXattrs::new(dev, id.as_str());
        for attr in ChannelAttr::ALL.iter().filter(|a| present.iter().any(|p| p == a.name())) {
            let val = cx.get_str(*attr).unwrap_or_else(|err| format!("<{}>", err));
            println!("\t\t{}: {}", attr.name(), val);
        }
    }
    Ok(())
}

fn get(dev: &iio::Device, args: &ArgMatches) -> Result<()> {
    let name = args.get_one::<String>("attr").context("No attribute")?;
    let xattrs = DeviceXattrs::new(dev);

    let (val, avail) = match args.get_one::<String>("channel") {
        Some(id) => {
            let attr: ChannelAttr = name.parse()?;
            let cx = xattrs.channel(id);
            (cx.get_str(attr)?, cx.available(attr)?)
        }
        None => {
            let attr: DeviceAttr = name.parse()?;
            (xattrs.get_str(attr)?, xattrs.available(attr)?)
        }
    };

    println!("{}", val);
    if let Some(avail) = avail {
        println!("Available: {}", avail);
    }
    Ok(())
}

fn set(dev: &iio::Device, args: &ArgMatches) -> Result<()> {
    let name = args.get_one::<String>("attr").context("No attribute")?;
    let val = args.get_one::<String>("value").context("No value")?;
    let xattrs = DeviceXattrs::new(dev);

    match args.get_one::<String>("channel") {
        Some(id) => xattrs.channel(id).set(name.parse::<ChannelAttr>()?, val.as_str())?,
        None => xattrs.set(name.parse::<DeviceAttr>()?, val.as_str())?,
    }
    println!("{} <- {}", name, val);
    Ok(())
}

fn run() -> Result<()> {
    let args = Command::new("iio_xattr")
        .version(clap::crate_version!())
        .about("Show and set the extended attributes of an evaluation board.")
        .disable_help_flag(true)
        .subcommand_required(true)
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
        .subcommand(Command::new("info").about("List the catalogued attributes and their values"))
        .subcommand(
            Command::new("get")
                .about("Read an attribute")
                .arg(Arg::new("attr").required(true).action(ArgAction::Set))
                .arg(chan_arg()),
        )
        .subcommand(
            Command::new("set")
                .about("Write an attribute")
                .arg(Arg::new("attr").required(true).action(ArgAction::Set))
                .arg(Arg::new("value").required(true).action(ArgAction::Set))
                .arg(chan_arg()),
        )
        .get_matches();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    println!("Library version: {}", iio::library_version());

    let uri = args.get_one::<SerialUri>("uri").context("No URI")?;
    let dev_name = args.get_one::<String>("device").context("No device")?;

    let ctx = iio::Context::connect(uri, Duration::from_millis(u64::from(iio::DFLT_TIMEOUT_MS)))
        .with_context(|| format!("Couldn't open the IIO context at '{}'", uri))?;
    println!("{}", ctx.description());

    let dev = ctx
        .find_device(dev_name)
        .with_context(|| format!("No IIO device named '{}'", dev_name))?;

    match args.subcommand() {
        Some(("info", _)) => info(&dev),
        Some(("get", sub)) => get(&dev, sub),
        Some(("set", sub)) => set(&dev, sub),
        _ => unreachable!("subcommand_required"),
    }
}

// --------------------------------------------------------------------------

fn main() {
    if let Err(err) = run() {
        eprintln!("{:#}", err);
        process::exit(1);
    }
}
