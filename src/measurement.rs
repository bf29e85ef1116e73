// iio-eval/src/measurement.rs
//
// Copyright (c) 2018-2025, Frank Pagliughi
//
// Licensed under the MIT license:
//   <LICENSE or http://opensource.org/licenses/MIT>
// This file may not be copied, modified, or distributed except according
// to those terms.
//
//! Conversion of raw codes to physical units, per demo configuration.

use std::{collections::HashMap, fmt, str::FromStr};

use crate::accessor::ChannelXattrs;
use crate::attr::AttrTransport;
use crate::calibration::LoadcellCalibration;
use crate::capture::RowSink;
use crate::xattr::ChannelAttr;
use crate::{Error, Result};

/// Channel carrying the AVDD supply current in the power test.
pub const POWER_TEST_I_AVDD_CHN: usize = 2;

/// Channel carrying the IOVDD supply current in the power test.
pub const POWER_TEST_I_IOVDD_CHN: usize = 3;

const USER_DEFAULT_AIN: &[&str] = &[
    "AIN0-AVSS", "AIN1-AVSS", "AIN2-AVSS", "AIN3-AVSS", "AIN4-AVSS", "AIN5-AVSS",
    "AIN6-AVSS", "AIN7-AVSS", "AIN8-AVSS", "AIN9-AVSS", "AIN10-AVSS", "AIN11-AVSS",
    "AIN12-AVSS", "AIN13-AVSS", "AIN14-AVSS", "AIN15-AVSS",
];

/// The analog front-end configuration the firmware was built for.
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum DemoConfig {
    UserDefault,
    Thermistor,
    Thermocouple,
    Rtd2Wire,
    Rtd3Wire,
    Rtd4Wire,
    Loadcell,
    Ecg,
    NoiseTest,
    PowerTest,
    /// A configuration this crate doesn't know, kept verbatim
    Other(String),
}

impl DemoConfig {
    /// The analog inputs wired to each channel, by channel index.
    pub fn ain_mapping(&self) -> &'static [&'static str] {
        use DemoConfig::*;
        match self {
            UserDefault => USER_DEFAULT_AIN,
            Thermistor => &["AIN4-AIN5"],
            Thermocouple => &["AIN2-AIN3", "AIN4-AIN5"],
            Rtd2Wire | Rtd3Wire | Rtd4Wire => &["AIN2-AIN3"],
            Loadcell => &["AIN5-AIN6"],
            Ecg => &["AIN11-AIN14"],
            NoiseTest => &["AIN0-AIN1"],
            PowerTest | Other(_) => &[],
        }
    }

    /// The analog-input pair for a channel index, if the mapping has one
    pub fn analog_input(&self, idx: usize) -> Option<&'static str> {
        self.ain_mapping().get(idx).copied()
    }

    /// Determines if the configuration reports temperatures
    pub fn is_temperature(&self) -> bool {
        !matches!(
            self,
            DemoConfig::UserDefault
                | DemoConfig::Ecg
                | DemoConfig::NoiseTest
                | DemoConfig::PowerTest
                | DemoConfig::Loadcell
        )
    }
}

impl FromStr for DemoConfig {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        use DemoConfig::*;
        let cfg = match s.trim() {
            "User Default" => UserDefault,
            "Thermistor" => Thermistor,
            "Thermocouple" => Thermocouple,
            "2-Wire RTD" => Rtd2Wire,
            "3-Wire RTD" => Rtd3Wire,
            "4-Wire RTD" => Rtd4Wire,
            "Loadcell" => Loadcell,
            "ECG" => Ecg,
            "Noise Test" => NoiseTest,
            "Power Test" => PowerTest,
            other => Other(other.to_string()),
        };
        Ok(cfg)
    }
}

impl fmt::Display for DemoConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use DemoConfig::*;
        let s = match self {
            UserDefault => "User Default",
            Thermistor => "Thermistor",
            Thermocouple => "Thermocouple",
            Rtd2Wire => "2-Wire RTD",
            Rtd3Wire => "3-Wire RTD",
            Rtd4Wire => "4-Wire RTD",
            Loadcell => "Loadcell",
            Ecg => "ECG",
            NoiseTest => "Noise Test",
            PowerTest => "Power Test",
            Other(s) => s,
        };
        write!(f, "{}", s)
    }
}

/// Gets the index of a channel from the trailing digits of its id,
/// like `voltage12` or `temp3`.
pub fn channel_index(id: &str) -> Option<usize> {
    let digits = id.len() - id.trim_end_matches(|c: char| c.is_ascii_digit()).len();
    if digits == 0 {
        return None;
    }
    id[id.len() - digits..].parse().ok()
}

// --------------------------------------------------------------------------

/// The unit of a converted value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum Unit {
    Volts,
    Milliamps,
    Celsius,
    Grams,
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Unit::Volts => "V",
            Unit::Milliamps => "mA",
            Unit::Celsius => "C",
            Unit::Grams => " gram",
        };
        write!(f, "{}", s)
    }
}

/// A value in physical units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measurement {
    /// The converted value
    pub value: f64,
    /// Its unit
    pub unit: Unit,
}

impl fmt::Display for Measurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4}{}", self.value, self.unit)
    }
}

/// The `scale` and `offset` the driver reports for a channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelScaling {
    /// Multiplier to physical units
    pub scale: f64,
    /// Added to the raw code before scaling
    pub offset: f64,
}

impl Default for ChannelScaling {
    fn default() -> Self {
        Self { scale: 1.0, offset: 0.0 }
    }
}

impl ChannelScaling {
    /// Reads the scaling of a channel.
    /// A channel without an `offset` attribute gets an offset of zero.
    pub fn read<T: AttrTransport + ?Sized>(chan: &ChannelXattrs<'_, T>) -> Result<Self> {
        let scale = chan.get(ChannelAttr::Scale)?;
        let offset = match chan.get(ChannelAttr::Offset) {
            Ok(off) => off,
            Err(err) => {
                log::debug!("{}: no offset ({}), using 0", chan.id(), err);
                0.0
            }
        };
        Ok(Self { scale, offset })
    }

    /// Applies `(raw + offset) * scale`
    pub fn to_physical(&self, raw: i64) -> f64 {
        (raw as f64 + self.offset) * self.scale
    }
}

/// Converts raw channel codes according to the demo configuration.
#[derive(Debug, Clone)]
pub struct Converter {
    demo: DemoConfig,
    loadcells: HashMap<usize, LoadcellCalibration>,
}

impl Converter {
    /// Creates a converter for the configuration
    pub fn new(demo: DemoConfig) -> Self {
        Self { demo, loadcells: HashMap::new() }
    }

    /// The demo configuration
    pub fn demo(&self) -> &DemoConfig {
        &self.demo
    }

    /// Sets the loadcell calibration for a channel index
    pub fn set_loadcell(&mut self, idx: usize, cal: LoadcellCalibration) {
        self.loadcells.insert(idx, cal);
    }

    /// Converts one raw reading from the channel at `idx`.
    pub fn convert(&self, idx: usize, raw: i64, scaling: &ChannelScaling) -> Result<Measurement> {
        let m = match self.demo {
            DemoConfig::Loadcell => {
                let cal = self.loadcells.get(&idx).ok_or_else(|| {
                    Error::InvalidInput(format!("Loadcell channel {} is not calibrated", idx))
                })?;
                Measurement { value: cal.weight(raw)?, unit: Unit::Grams }
            }
            DemoConfig::PowerTest
                if idx == POWER_TEST_I_AVDD_CHN || idx == POWER_TEST_I_IOVDD_CHN =>
            {
                Measurement { value: scaling.to_physical(raw), unit: Unit::Milliamps }
            }
            DemoConfig::UserDefault
            | DemoConfig::Ecg
            | DemoConfig::NoiseTest
            | DemoConfig::PowerTest => Measurement {
                value: scaling.to_physical(raw) / 1000.0,
                unit: Unit::Volts,
            },
            _ => Measurement {
                value: raw as f64 * scaling.scale / 1000.0,
                unit: Unit::Celsius,
            },
        };
        Ok(m)
    }

    /// Reads and converts the channel's current value.
    pub fn measure<T: AttrTransport + ?Sized>(
        &self,
        chan: &ChannelXattrs<'_, T>,
    ) -> Result<Measurement> {
        let idx = channel_index(chan.id())
            .ok_or_else(|| Error::ChannelNotFound(chan.id().to_string()))?;
        let raw: i64 = chan.get(ChannelAttr::Raw)?;

        let scaling = match self.demo {
            DemoConfig::Loadcell => ChannelScaling::default(),
            _ => ChannelScaling::read(chan)?,
        };
        self.convert(idx, raw, &scaling)
    }
}

// --------------------------------------------------------------------------

/// Limits for the voltages in a capture, parsed from `MIN,MAX`.
///
/// Both limits are exclusive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoltageLimits {
    /// Every sample must be above this, in volts
    pub min: f64,
    /// Every sample must be below this, in volts
    pub max: f64,
}

impl VoltageLimits {
    /// Checks one voltage against the limits
    pub fn check(&self, volts: f64) -> Result<()> {
        if volts > self.min && volts < self.max {
            Ok(())
        }
        else {
            Err(Error::OutOfRange { value: volts, min: self.min, max: self.max })
        }
    }
}

impl FromStr for VoltageLimits {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let bad = || Error::InvalidInput(format!("'{}' is not a MIN,MAX voltage range", s));
        let (min, max) = s.split_once(',').ok_or_else(bad)?;
        let min: f64 = min.trim().parse().map_err(|_| bad())?;
        let max: f64 = max.trim().parse().map_err(|_| bad())?;
        if !(min < max) {
            return Err(bad());
        }
        Ok(Self { min, max })
    }
}

/// A sink that tracks the lowest and highest voltage of the rows passing
/// through it on their way to another sink.
///
/// Column `i` is converted with `scaling[i]` as `(raw + offset) * scale`
/// millivolts. Columns without a scaling aren't tracked.
#[derive(Debug)]
pub struct RangeCheck<K> {
    inner: K,
    scaling: Vec<ChannelScaling>,
    span: Option<(f64, f64)>,
}

impl<K: RowSink> RangeCheck<K> {
    /// Wraps `inner`, with one scaling per tracked column
    pub fn new(inner: K, scaling: Vec<ChannelScaling>) -> Self {
        Self { inner, scaling, span: None }
    }

    /// The lowest and highest voltage seen, if any sample was tracked
    pub fn span(&self) -> Option<(f64, f64)> {
        self.span
    }

    /// Checks the lowest and highest voltage against the limits.
    /// Returns them when both are inside. A capture with no tracked
    /// samples fails.
    pub fn verify(&self, limits: &VoltageLimits) -> Result<(f64, f64)> {
        let (lo, hi) = self
            .span
            .ok_or_else(|| Error::InvalidInput("no samples to check".into()))?;
        limits.check(lo)?;
        limits.check(hi)?;
        Ok((lo, hi))
    }

    /// Gets back the wrapped sink
    pub fn into_inner(self) -> K {
        self.inner
    }
}

impl<K: RowSink> RowSink for RangeCheck<K> {
    fn write_rows(&mut self, rows: &[Vec<i64>]) -> Result<()> {
        self.inner.write_rows(rows)?;
        for row in rows {
            for (raw, scaling) in row.iter().zip(&self.scaling) {
                let volts = scaling.to_physical(*raw) / 1000.0;
                self.span = Some(match self.span {
                    Some((lo, hi)) => (lo.min(volts), hi.max(volts)),
                    None => (volts, volts),
                });
            }
        }
        Ok(())
    }
}

// --------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockFirmware;

    #[test]
    fn demo_config_names() {
        assert_eq!("2-Wire RTD".parse::<DemoConfig>().unwrap(), DemoConfig::Rtd2Wire);
        assert_eq!("Power Test\n".parse::<DemoConfig>().unwrap(), DemoConfig::PowerTest);
        let other: DemoConfig = "Bridge".parse().unwrap();
        assert_eq!(other, DemoConfig::Other("Bridge".into()));
        assert_eq!(other.to_string(), "Bridge");
        assert_eq!(DemoConfig::NoiseTest.to_string(), "Noise Test");
    }

    #[test]
    fn ain_lookup() {
        assert_eq!(DemoConfig::UserDefault.analog_input(15), Some("AIN15-AVSS"));
        assert_eq!(DemoConfig::Thermocouple.analog_input(1), Some("AIN4-AIN5"));
        assert_eq!(DemoConfig::Loadcell.analog_input(1), None);
        assert_eq!(DemoConfig::PowerTest.analog_input(0), None);
    }

    #[test]
    fn index_from_id() {
        assert_eq!(channel_index("voltage0"), Some(0));
        assert_eq!(channel_index("current12"), Some(12));
        assert_eq!(channel_index("temp3"), Some(3));
        assert_eq!(channel_index("timestamp"), None);
    }

    #[test]
    fn voltage_and_current() {
        let scaling = ChannelScaling { scale: 0.5, offset: -100.0 };

        let conv = Converter::new(DemoConfig::UserDefault);
        let m = conv.convert(0, 2100, &scaling).unwrap();
        assert_eq!(m.unit, Unit::Volts);
        assert!((m.value - 1.0).abs() < 1e-12);
        assert_eq!(m.to_string(), "1.0000V");

        let conv = Converter::new(DemoConfig::PowerTest);
        let m = conv.convert(POWER_TEST_I_IOVDD_CHN, 2100, &scaling).unwrap();
        assert_eq!(m.unit, Unit::Milliamps);
        assert!((m.value - 1000.0).abs() < 1e-9);
        assert_eq!(conv.convert(0, 2100, &scaling).unwrap().unit, Unit::Volts);
    }

    #[test]
    fn temperature_ignores_offset() {
        let conv = Converter::new(DemoConfig::Rtd3Wire);
        let scaling = ChannelScaling { scale: 25.0, offset: 1e6 };
        let m = conv.convert(0, 1000, &scaling).unwrap();
        assert_eq!(m.unit, Unit::Celsius);
        assert!((m.value - 25.0).abs() < 1e-12);
    }

    #[test]
    fn loadcell_needs_calibration() {
        let mut conv = Converter::new(DemoConfig::Loadcell);
        assert!(conv.convert(0, 5, &ChannelScaling::default()).is_err());

        conv.set_loadcell(0, LoadcellCalibration { offset: 100, gain: 1100, weight_grams: 1000 });
        let m = conv.convert(0, 600, &ChannelScaling::default()).unwrap();
        assert_eq!(m.unit, Unit::Grams);
        assert!((m.value - 500.0).abs() < 1e-9);
    }

    #[test]
    fn measure_reads_raw_and_scaling() {
        let fw = MockFirmware::new(&["voltage1"])
            .with_chan_attr("voltage1", "raw", "3000")
            .with_chan_attr("voltage1", "scale", "0.5");
        let chan = ChannelXattrs::new(&fw, "voltage1");

        let m = Converter::new(DemoConfig::Ecg).measure(&chan).unwrap();
        assert!((m.value - 1.5).abs() < 1e-12);
    }

    #[derive(Default)]
    struct Rows(usize);

    impl RowSink for Rows {
        fn write_rows(&mut self, rows: &[Vec<i64>]) -> Result<()> {
            self.0 += rows.len();
            Ok(())
        }
    }

    #[test]
    fn voltage_limits_parse() {
        let lim: VoltageLimits = "1.7,1.9".parse().unwrap();
        assert_eq!(lim, VoltageLimits { min: 1.7, max: 1.9 });
        assert!("1.9,1.7".parse::<VoltageLimits>().is_err());
        assert!("1.7".parse::<VoltageLimits>().is_err());
        assert!("a,b".parse::<VoltageLimits>().is_err());
    }

    #[test]
    fn capture_inside_range() {
        // 1.8 V applied: codes near 1800 mV at unit scale
        let scaling = vec![ChannelScaling::default()];
        let mut chk = RangeCheck::new(Rows::default(), scaling);
        chk.write_rows(&[vec![1795], vec![1802], vec![1810]]).unwrap();

        let lim = VoltageLimits { min: 1.7, max: 1.9 };
        let (lo, hi) = chk.verify(&lim).unwrap();
        assert!((lo - 1.795).abs() < 1e-12);
        assert!((hi - 1.81).abs() < 1e-12);
        assert_eq!(chk.into_inner().0, 3);
    }

    #[test]
    fn capture_outside_range() {
        let scaling = vec![ChannelScaling { scale: 0.5, offset: 0.0 }, ChannelScaling::default()];
        let mut chk = RangeCheck::new(Rows::default(), scaling);
        chk.write_rows(&[vec![3600, 1800], vec![3900, 1750]]).unwrap();

        let lim = VoltageLimits { min: 1.7, max: 1.9 };
        match chk.verify(&lim) {
            Err(Error::OutOfRange { value, min, max }) => {
                assert!((value - 1.95).abs() < 1e-12);
                assert_eq!((min, max), (1.7, 1.9));
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn empty_capture_fails_check() {
        let chk = RangeCheck::new(Rows::default(), vec![ChannelScaling::default()]);
        assert!(chk.span().is_none());
        assert!(chk.verify(&VoltageLimits { min: 0.0, max: 1.0 }).is_err());
    }
}
