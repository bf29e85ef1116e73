// iio-eval/src/errors.rs
//
// Copyright (c) 2018-2025, Frank Pagliughi
//
// Licensed under the MIT license:
//   <LICENSE or http://opensource.org/licenses/MIT>
// This file may not be copied, modified, or distributed except according
// to those terms.
//
//!
//! Error definitions for the evaluation host tools.

use std::{ffi, io};
use thiserror::Error;

/// The Error type for the evaluation host tools
#[derive(Error, Debug)]
pub enum Error {
    /// A low-level I/O error
    #[error("{0}")]
    Io(#[from] io::Error),
    /// An unexpected NUL value in a string passed to the C library.
    #[error("{0}")]
    NulError(#[from] ffi::NulError),
    /// A low-level Unix-style error from the IIO library
    #[cfg(feature = "hardware")]
    #[error("{0}")]
    Nix(#[from] nix::Error),
    /// The IIO context could not be created from the URI
    #[error("Unable to connect to '{0}'")]
    Connection(String),
    /// A malformed transport URI
    #[error("Invalid URI '{uri}': {reason}")]
    Uri {
        /// The URI as given
        uri: String,
        /// What was wrong with it
        reason: String,
    },
    /// No device with the requested name in the context
    #[error("No IIO device named '{0}'")]
    DeviceNotFound(String),
    /// No channel with the requested id on the device
    #[error("No '{0}' channel on this device")]
    ChannelNotFound(String),
    /// A value outside the set advertised by the `_available` companion.
    /// The legal set is reported exactly as the firmware sent it.
    #[error("{attr} setting not supported. Use one of: {available}")]
    InvalidOption {
        /// The attribute being written
        attr: &'static str,
        /// The rejected value
        value: String,
        /// The raw `_available` listing
        available: String,
    },
    /// A write to an attribute the firmware only reports
    #[error("Attribute '{0}' is read-only")]
    ReadOnly(&'static str),
    /// An attribute value that couldn't be converted to the requested type
    #[error("Can't parse '{value}' from attribute '{attr}'")]
    AttrParse {
        /// The attribute that was read
        attr: String,
        /// The string the firmware returned
        value: String,
    },
    /// The wrong data type used in an operation
    #[error("Wrong data type")]
    WrongDataType,
    /// The size of a data or return value was different than expected.
    #[error("Bad return size")]
    BadReturnSize,
    /// A multi-channel block whose channels hold different sample counts
    #[error("Ragged sample block: channel {channel} has {len} samples, expected {expected}")]
    RaggedBlock {
        /// Index of the offending channel in the block
        channel: usize,
        /// Its sample count
        len: usize,
        /// The sample count of the first channel
        expected: usize,
    },
    /// Operator input that doesn't fit the prompt
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    /// An operation the active configuration can't perform
    #[error("{0}")]
    Unsupported(String),
    /// A console check that didn't find the expected output
    #[error("Expected output matching '{0}' not found")]
    PatternNotFound(String),
    /// A console reading outside of its expected limits
    #[error("Value {value} out of range [{min}, {max}]")]
    OutOfRange {
        /// The value that was read
        value: f64,
        /// Lower limit
        min: f64,
        /// Upper limit
        max: f64,
    },
    /// A CSV writer error
    #[error("{0}")]
    Csv(#[from] csv::Error),
    /// A bad configuration or script file
    #[error("{0}")]
    Config(#[from] toml::de::Error),
    /// A serial port error
    #[error("{0}")]
    SerialPort(#[from] serialport::Error),
    /// A bad regular expression in a console check
    #[error("{0}")]
    Regex(#[from] regex::Error),
    /// A generic error with a string explanation
    #[error("{0}")]
    General(String),
}

/// The default result type for the evaluation host tools
pub type Result<T> = std::result::Result<T, Error>;
