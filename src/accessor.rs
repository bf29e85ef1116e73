// iio-eval/src/accessor.rs
//
// Copyright (c) 2018-2025, Frank Pagliughi
//
// Licensed under the MIT license:
//   <LICENSE or http://opensource.org/licenses/MIT>
// This file may not be copied, modified, or distributed except according
// to those terms.
//
//! Typed access to the extended attributes of a device and its channels.
//!
//! [`DeviceXattrs`] and [`ChannelXattrs`] are the one surface for reading
//! and writing catalogued attributes. Both are thin views over any
//! [`AttrTransport`]; they never own the connection.
//!
//! ```ignore
//! let dev = ctx.find_device("ad579x")?;
//! let xattrs = DeviceXattrs::new(&dev);
//! xattrs.set(DeviceAttr::CodingSelect, "binary")?;
//! ```

use crate::attr::{
    Access, AttrDescriptor, AttrTransport, AvailableValues, FromAttribute, Scope, ToAttribute,
};
use crate::xattr::{ChannelAttr, DeviceAttr};
use crate::{Error, Result};

// Reads a descriptor's attribute as a string in the given scope.
fn read_str<T: AttrTransport + ?Sized>(
    transport: &T,
    scope: Scope<'_>,
    desc: &AttrDescriptor,
) -> Result<String> {
    let val = transport.read_attr(scope, desc.name)?;
    String::from_attr(desc.name, &val)
}

// Reads the `_available` companion, if the attribute has one.
fn read_available<T: AttrTransport + ?Sized>(
    transport: &T,
    scope: Scope<'_>,
    desc: &AttrDescriptor,
) -> Result<Option<AvailableValues>> {
    match desc.available {
        Some(companion) => {
            let raw = transport.read_attr(scope, companion)?;
            Ok(Some(AvailableValues::new(raw)))
        }
        None => Ok(None),
    }
}

// The write path shared by both scopes.
// Read-only attributes are refused before touching the transport, and
// constrained ones are checked against their companion first.
fn write_checked<T: AttrTransport + ?Sized>(
    transport: &T,
    scope: Scope<'_>,
    desc: &AttrDescriptor,
    val: &str,
) -> Result<()> {
    if !desc.is_writable() {
        return Err(Error::ReadOnly(desc.name));
    }

    if let Some(avail) = read_available(transport, scope, desc)? {
        if !avail.contains(val) {
            log::debug!("{}: rejected '{}' (available: {})", desc.name, val, avail);
            return Err(Error::InvalidOption {
                attr: desc.name,
                value: val.to_string(),
                available: avail.raw().to_string(),
            });
        }
    }

    log::debug!("{}/{} <- '{}'", scope, desc.name, val);
    transport.write_attr(scope, desc.name, val)
}

// --------------------------------------------------------------------------

/// Typed view of the device-level extended attributes.
#[derive(Debug, Clone, Copy)]
pub struct DeviceXattrs<'a, T: AttrTransport + ?Sized> {
    transport: &'a T,
}

impl<'a, T: AttrTransport + ?Sized> DeviceXattrs<'a, T> {
    /// Creates a view over the device transport
    pub fn new(transport: &'a T) -> Self {
        Self { transport }
    }

    /// Reads the attribute as a string
    pub fn get_str(&self, attr: DeviceAttr) -> Result<String> {
        read_str(self.transport, Scope::Device, &attr.descriptor())
    }

    /// Reads the attribute and converts it to the requested type
    pub fn get<V: FromAttribute>(&self, attr: DeviceAttr) -> Result<V> {
        let s = self.get_str(attr)?;
        V::from_attr(attr.name(), &s)
    }

    /// Writes the attribute, validating constrained values first.
    pub fn set<V: ToAttribute>(&self, attr: DeviceAttr, val: V) -> Result<()> {
        write_checked(self.transport, Scope::Device, &attr.descriptor(), &val.to_attr())
    }

    /// Gets the legal values for a constrained attribute.
    /// Returns `None` for an unconstrained one.
    pub fn available(&self, attr: DeviceAttr) -> Result<Option<AvailableValues>> {
        read_available(self.transport, Scope::Device, &attr.descriptor())
    }

    /// Gets a view of one channel's attributes
    pub fn channel(&self, id: &'a str) -> ChannelXattrs<'a, T> {
        ChannelXattrs::new(self.transport, id)
    }
}

// --------------------------------------------------------------------------

/// Typed view of one channel's attributes.
#[derive(Debug, Clone, Copy)]
pub struct ChannelXattrs<'a, T: AttrTransport + ?Sized> {
    transport: &'a T,
    id: &'a str,
}

impl<'a, T: AttrTransport + ?Sized> ChannelXattrs<'a, T> {
    /// Creates a view over the channel `id` of the device transport
    pub fn new(transport: &'a T, id: &'a str) -> Self {
        Self { transport, id }
    }

    /// The channel id
    pub fn id(&self) -> &'a str {
        self.id
    }

    fn scope(&self) -> Scope<'a> {
        Scope::Channel(self.id)
    }

    /// Reads the attribute as a string
    pub fn get_str(&self, attr: ChannelAttr) -> Result<String> {
        read_str(self.transport, self.scope(), &attr.descriptor())
    }

    /// Reads the attribute and converts it to the requested type
    pub fn get<V: FromAttribute>(&self, attr: ChannelAttr) -> Result<V> {
        let s = self.get_str(attr)?;
        V::from_attr(attr.name(), &s)
    }

    /// Writes the attribute, validating constrained values first.
    pub fn set<V: ToAttribute>(&self, attr: ChannelAttr, val: V) -> Result<()> {
        write_checked(self.transport, self.scope(), &attr.descriptor(), &val.to_attr())
    }

    /// Gets the legal values for a constrained attribute.
    pub fn available(&self, attr: ChannelAttr) -> Result<Option<AvailableValues>> {
        read_available(self.transport, self.scope(), &attr.descriptor())
    }

    /// Arms the firmware routine behind an action attribute.
    ///
    /// This only starts the routine. Its outcome has to be read back from
    /// the same attribute once the firmware has had time to settle.
    pub fn arm(&self, attr: ChannelAttr) -> Result<()> {
        let desc = attr.descriptor();
        match desc.access {
            Access::Action(sentinel) => {
                log::debug!("{}/{}: arming", self.id, desc.name);
                self.transport.write_attr(self.scope(), desc.name, sentinel)
            }
            _ => Err(Error::Unsupported(format!(
                "Attribute '{}' doesn't trigger a firmware routine",
                desc.name
            ))),
        }
    }
}

// --------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockFirmware;

    fn dac() -> MockFirmware {
        MockFirmware::new(&["voltage0", "voltage1"])
            .with_dev_attr("coding_select", "binary")
            .with_dev_attr("coding_select_available", "binary twos_complement")
            .with_dev_attr("sampling_frequency", "50000")
            .with_dev_attr("demo_config", "User Default")
            .with_chan_attr("voltage0", "thresh_alert", "none")
            .with_chan_attr("voltage0", "thresh_alert_available", "[none high low]")
            .with_chan_attr("voltage0", "scale", "0.000149011")
    }

    #[test]
    fn constrained_write_accepts_listed_value() {
        let fw = dac();
        let x = DeviceXattrs::new(&fw);
        x.set(DeviceAttr::CodingSelect, "twos_complement").unwrap();
        assert_eq!(x.get_str(DeviceAttr::CodingSelect).unwrap(), "twos_complement");
        assert_eq!(fw.writes().len(), 1);
    }

    #[test]
    fn constrained_write_rejects_and_skips_transport() {
        let fw = dac();
        let x = DeviceXattrs::new(&fw);
        let err = x.set(DeviceAttr::CodingSelect, "offset_binary").unwrap_err();

        match err {
            Error::InvalidOption { attr, value, available } => {
                assert_eq!(attr, "coding_select");
                assert_eq!(value, "offset_binary");
                assert_eq!(available, "binary twos_complement");
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(fw.writes().is_empty());
        assert_eq!(x.get_str(DeviceAttr::CodingSelect).unwrap(), "binary");
    }

    #[test]
    fn invalid_option_message_keeps_listing() {
        let fw = dac();
        let err = DeviceXattrs::new(&fw)
            .set(DeviceAttr::CodingSelect, "bogus")
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "coding_select setting not supported. Use one of: binary twos_complement"
        );
    }

    #[test]
    fn numeric_round_trip() {
        let fw = dac();
        let x = DeviceXattrs::new(&fw);
        x.set(DeviceAttr::SamplingFrequency, 100000_i64).unwrap();
        let freq: i64 = x.get(DeviceAttr::SamplingFrequency).unwrap();
        assert_eq!(freq, 100000);
    }

    #[test]
    fn read_only_refused() {
        let fw = dac();
        let err = DeviceXattrs::new(&fw)
            .set(DeviceAttr::DemoConfig, "Loadcell")
            .unwrap_err();
        assert!(matches!(err, Error::ReadOnly("demo_config")));
        assert!(fw.writes().is_empty());
    }

    #[test]
    fn diagnostic_mux_refused() {
        let fw = dac();
        let err = DeviceXattrs::new(&fw)
            .set(DeviceAttr::VcmAvssx, "1")
            .unwrap_err();
        assert!(matches!(err, Error::ReadOnly("vcm_avssx")));
        assert!(fw.writes().is_empty());
    }

    #[test]
    fn channel_constrained_and_typed() {
        let fw = dac();
        let x = DeviceXattrs::new(&fw);
        let ch = x.channel("voltage0");

        let scale: f64 = ch.get(ChannelAttr::Scale).unwrap();
        assert!((scale - 0.000149011).abs() < 1e-12);

        ch.set(ChannelAttr::ThreshAlert, "high").unwrap();
        assert!(ch.set(ChannelAttr::ThreshAlert, "both").is_err());

        let avail = ch.available(ChannelAttr::ThreshAlert).unwrap().unwrap();
        assert_eq!(avail.iter().collect::<Vec<_>>(), ["none", "high", "low"]);
        assert!(ch.available(ChannelAttr::Raw).unwrap().is_none());
    }

    #[test]
    fn missing_channel_is_fatal() {
        let fw = dac();
        let x = DeviceXattrs::new(&fw);
        let err = x.channel("voltage9").get_str(ChannelAttr::Raw).unwrap_err();
        assert!(matches!(err, Error::ChannelNotFound(_)));
    }

    #[test]
    fn arm_writes_sentinel() {
        let fw = dac();
        let ch = ChannelXattrs::new(&fw, "voltage1");
        ch.arm(ChannelAttr::InternalCalibration).unwrap();
        assert_eq!(
            fw.writes(),
            vec![(
                "voltage1".to_string(),
                "internal_calibration".to_string(),
                "start_calibration".to_string()
            )]
        );
        assert!(ch.arm(ChannelAttr::Raw).is_err());
    }
}
