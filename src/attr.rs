// iio-eval/src/attr.rs
//
// Copyright (c) 2018-2025, Frank Pagliughi
//
// Licensed under the MIT license:
//   <LICENSE or http://opensource.org/licenses/MIT>
// This file may not be copied, modified, or distributed except according
// to those terms.
//
//! Attribute values, descriptors, and the scoped transport seam.
//!
//! Every attribute the firmware exposes travels as a string. This module
//! holds the conversions between those strings and Rust values
//! ([`FromAttribute`] and [`ToAttribute`]), the static description of an
//! attribute ([`AttrDescriptor`]), and the [`AttrTransport`] trait that
//! an IIO device (or a test double) implements to carry scoped reads and
//! writes.

use std::fmt;

use crate::{Error, Result};

/// The value written to an action attribute to arm a firmware routine.
pub const START_CALIBRATION: &str = "start_calibration";

/// Suffix of the companion attribute listing the legal values.
pub const AVAILABLE_SUFFIX: &str = "_available";

// --------------------------------------------------------------------------

/// Where an attribute lives: on the device, or on one of its channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope<'a> {
    /// A device-level attribute
    Device,
    /// A channel-level attribute, by channel id (e.g. `voltage0`)
    Channel(&'a str),
}

impl fmt::Display for Scope<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Device => write!(f, "device"),
            Scope::Channel(id) => write!(f, "{}", id),
        }
    }
}

/// The string-level attribute RPC.
///
/// This is the only thing the accessor layer needs from the transport.
/// The IIO [`Device`](crate::Device) implements it over libiio; tests
/// implement it over an in-memory map.
pub trait AttrTransport {
    /// Reads an attribute as a string
    fn read_attr(&self, scope: Scope<'_>, attr: &str) -> Result<String>;

    /// Writes an attribute as a string
    fn write_attr(&self, scope: Scope<'_>, attr: &str, val: &str) -> Result<()>;
}

impl<T: AttrTransport + ?Sized> AttrTransport for &T {
    fn read_attr(&self, scope: Scope<'_>, attr: &str) -> Result<String> {
        (**self).read_attr(scope, attr)
    }

    fn write_attr(&self, scope: Scope<'_>, attr: &str, val: &str) -> Result<()> {
        (**self).write_attr(scope, attr, val)
    }
}

// --------------------------------------------------------------------------

/// Trait to convert a value from an attribute string
pub trait FromAttribute: Sized {
    /// Converts the attribute string of `attr` into a value
    fn from_attr(attr: &str, s: &str) -> Result<Self>;
}

/// Trait to convert a value into an attribute string
pub trait ToAttribute {
    /// Converts the value into the string to write
    fn to_attr(&self) -> String;
}

fn parse_err(attr: &str, s: &str) -> Error {
    Error::AttrParse {
        attr: attr.to_string(),
        value: s.to_string(),
    }
}

impl FromAttribute for String {
    fn from_attr(_attr: &str, s: &str) -> Result<Self> {
        Ok(s.trim_end_matches(['\0', '\n', '\r']).to_string())
    }
}

impl FromAttribute for bool {
    fn from_attr(attr: &str, s: &str) -> Result<Self> {
        match s.trim() {
            "1" | "true" | "enable" | "enabled" => Ok(true),
            "0" | "false" | "disable" | "disabled" => Ok(false),
            _ => Err(parse_err(attr, s)),
        }
    }
}

macro_rules! from_attr_parse {
    ($($t:ty),*) => {
        $(
            impl FromAttribute for $t {
                fn from_attr(attr: &str, s: &str) -> Result<Self> {
                    s.trim().parse::<$t>().map_err(|_| parse_err(attr, s))
                }
            }
        )*
    }
}

from_attr_parse!(i32, i64, u32, u64, f64);

impl ToAttribute for bool {
    fn to_attr(&self) -> String {
        String::from(if *self { "1" } else { "0" })
    }
}

impl ToAttribute for str {
    fn to_attr(&self) -> String {
        self.to_string()
    }
}

impl<T: ToAttribute + ?Sized> ToAttribute for &T {
    fn to_attr(&self) -> String {
        (**self).to_attr()
    }
}

macro_rules! to_attr_display {
    ($($t:ty),*) => {
        $(
            impl ToAttribute for $t {
                fn to_attr(&self) -> String {
                    self.to_string()
                }
            }
        )*
    }
}

to_attr_display!(String, i32, i64, u32, u64, f64);

// --------------------------------------------------------------------------

/// The type of value an attribute carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// Free text or an enumerated option
    Text,
    /// An integer
    Integer,
    /// A floating-point number
    Float,
}

/// What a caller may do with an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Status or telemetry only
    ReadOnly,
    /// Read and write
    ReadWrite,
    /// Writing the sentinel arms a firmware routine. The result is
    /// observed by reading the same attribute back.
    Action(&'static str),
}

/// The static description of one extended attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttrDescriptor {
    /// The attribute name, as the firmware spells it
    pub name: &'static str,
    /// The type of value
    pub kind: ValueKind,
    /// Read/write/action
    pub access: Access,
    /// The companion listing the legal values, if the firmware
    /// restricts the attribute to a set
    pub available: Option<&'static str>,
}

impl AttrDescriptor {
    /// A read-only attribute
    pub const fn read_only(name: &'static str, kind: ValueKind) -> Self {
        Self { name, kind, access: Access::ReadOnly, available: None }
    }

    /// An unconstrained read/write attribute
    pub const fn read_write(name: &'static str, kind: ValueKind) -> Self {
        Self { name, kind, access: Access::ReadWrite, available: None }
    }

    /// A read/write attribute restricted to the values listed by `available`
    pub const fn constrained(name: &'static str, available: &'static str) -> Self {
        Self {
            name,
            kind: ValueKind::Text,
            access: Access::ReadWrite,
            available: Some(available),
        }
    }

    /// A calibration-style trigger, armed with [`START_CALIBRATION`]
    pub const fn action(name: &'static str) -> Self {
        Self {
            name,
            kind: ValueKind::Text,
            access: Access::Action(START_CALIBRATION),
            available: None,
        }
    }

    /// Determines if the attribute can be written
    pub fn is_writable(&self) -> bool {
        self.access != Access::ReadOnly
    }
}

// --------------------------------------------------------------------------

/// The set of legal values advertised by an `_available` attribute.
///
/// The firmware sends them as one whitespace-separated string, optionally
/// bracketed (e.g. `[enable disable]`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvailableValues {
    raw: String,
}

impl AvailableValues {
    /// Wraps the raw listing read from the firmware
    pub fn new(raw: impl Into<String>) -> Self {
        Self { raw: raw.into() }
    }

    /// The listing exactly as read
    pub fn raw(&self) -> &str {
        self.raw.trim_end_matches(['\0', '\n', '\r'])
    }

    /// Iterates the individual values
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.raw
            .split(|c: char| c.is_whitespace() || c == '[' || c == ']' || c == ',')
            .filter(|s| !s.is_empty())
    }

    /// Determines if `value` is one of the legal values
    pub fn contains(&self, value: &str) -> bool {
        let value = value.trim();
        !value.is_empty() && self.iter().any(|v| v == value)
    }
}

impl fmt::Display for AvailableValues {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw())
    }
}

// --------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_numbers() {
        assert_eq!(i64::from_attr("raw", "100000\n").unwrap(), 100000);
        assert_eq!(f64::from_attr("scale", " 0.000149").unwrap(), 0.000149);
        assert!(matches!(
            u32::from_attr("raw", "abc"),
            Err(Error::AttrParse { .. })
        ));
    }

    #[test]
    fn parse_bool() {
        assert!(bool::from_attr("en", "1").unwrap());
        assert!(!bool::from_attr("en", "disable").unwrap());
        assert!(bool::from_attr("en", "maybe").is_err());
        assert_eq!(true.to_attr(), "1");
    }

    #[test]
    fn string_strips_terminators() {
        let s = String::from_attr("demo_config", "Loadcell\n").unwrap();
        assert_eq!(s, "Loadcell");
    }

    #[test]
    fn available_tokens() {
        let avail = AvailableValues::new("[enable disable]");
        assert!(avail.contains("enable"));
        assert!(avail.contains("disable"));
        assert!(!avail.contains("ena"));
        assert!(!avail.contains(""));
        assert_eq!(avail.iter().count(), 2);
        assert_eq!(avail.to_string(), "[enable disable]");
    }

    #[test]
    fn descriptor_access() {
        assert!(!AttrDescriptor::read_only("x", ValueKind::Text).is_writable());
        assert!(AttrDescriptor::action("cal").is_writable());
        assert_eq!(
            AttrDescriptor::constrained("clear", "clear_available").available,
            Some("clear_available")
        );
    }
}
