// iio-eval/src/calibration.rs
//
// Copyright (c) 2018-2025, Frank Pagliughi
//
// Licensed under the MIT license:
//   <LICENSE or http://opensource.org/licenses/MIT>
// This file may not be copied, modified, or distributed except according
// to those terms.
//
//! Firmware calibration routines.
//!
//! Calibration runs in the firmware. The host arms it by writing
//! `start_calibration` to the channel's calibration attribute, waits for
//! the routine to settle, and reads the same attribute back. The
//! readback packs the register values before and after the routine,
//! followed by a status token:
//!
//! ```text
//! [0:8]   gain before     [8:16]  gain after
//! [16:24] offset before   [24:32] offset after
//! [32:]   calibration_done | calibration_skipped | ...
//! ```
//!
//! A status other than the expected tokens, or a readback too short to
//! hold the fields, is reported, not raised.

use std::{fmt, str::FromStr, thread, time::Duration};

use crate::accessor::ChannelXattrs;
use crate::attr::AttrTransport;
use crate::measurement::{channel_index, DemoConfig};
use crate::xattr::ChannelAttr;
use crate::{Error, Result};

/// Settle time between arming a calibration and reading the result.
pub const DFLT_SETTLE: Duration = Duration::from_millis(200);

/// Time for a loadcell to settle after the load changes.
pub const DFLT_LOADCELL_SETTLE: Duration = Duration::from_secs(2);

const FIELD_LEN: usize = 8;
const FIELDS_LEN: usize = 4 * FIELD_LEN;

// --------------------------------------------------------------------------

/// The calibration strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationKind {
    /// On-chip reference switching
    Internal,
    /// Operator-applied zero- and full-scale voltages
    System,
}

impl CalibrationKind {
    /// The channel attribute that arms and reports this calibration
    pub fn attr(&self) -> ChannelAttr {
        match self {
            CalibrationKind::Internal => ChannelAttr::InternalCalibration,
            CalibrationKind::System => ChannelAttr::SystemCalibration,
        }
    }
}

impl FromStr for CalibrationKind {
    type Err = Error;

    /// Parses the console selection: `1` internal, `2` system.
    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "1" => Ok(CalibrationKind::Internal),
            "2" => Ok(CalibrationKind::System),
            other => Err(Error::InvalidInput(format!(
                "'{}' is not a calibration type",
                other
            ))),
        }
    }
}

impl fmt::Display for CalibrationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CalibrationKind::Internal => write!(f, "Internal"),
            CalibrationKind::System => write!(f, "System"),
        }
    }
}

/// The outcome token reported by the firmware.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CalibrationStatus {
    /// `calibration_done`
    Done,
    /// `calibration_skipped` (internal gain calibration at PGA=1)
    Skipped,
    /// Anything else, kept verbatim
    Failed(String),
}

impl From<&str> for CalibrationStatus {
    fn from(s: &str) -> Self {
        match s.trim() {
            "calibration_done" => CalibrationStatus::Done,
            "calibration_skipped" => CalibrationStatus::Skipped,
            other => CalibrationStatus::Failed(other.to_string()),
        }
    }
}

/// A decoded calibration readback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalibrationReadback {
    /// Gain register before the routine (hex digits)
    pub gain_before: String,
    /// Gain register after the routine (hex digits)
    pub gain_after: String,
    /// Offset register before the routine (hex digits)
    pub offset_before: String,
    /// Offset register after the routine (hex digits)
    pub offset_after: String,
    /// The status token
    pub status: CalibrationStatus,
}

impl CalibrationReadback {
    /// Slices a readback string into its fields.
    ///
    /// A readback too short to hold the register fields is kept whole as
    /// a failed status, with empty fields.
    pub fn parse(s: &str) -> Self {
        let s = s.trim_end_matches(['\0', '\n', '\r']);
        let field = |i: usize| s.get(i * FIELD_LEN..(i + 1) * FIELD_LEN);

        match (field(0), field(1), field(2), field(3), s.get(FIELDS_LEN..)) {
            (Some(gb), Some(ga), Some(ob), Some(oa), Some(status)) => Self {
                gain_before: gb.to_string(),
                gain_after: ga.to_string(),
                offset_before: ob.to_string(),
                offset_after: oa.to_string(),
                status: CalibrationStatus::from(status),
            },
            _ => Self {
                gain_before: String::new(),
                gain_after: String::new(),
                offset_before: String::new(),
                offset_after: String::new(),
                status: CalibrationStatus::Failed(s.to_string()),
            },
        }
    }

    /// Determines if the firmware reported success
    pub fn is_done(&self) -> bool {
        self.status == CalibrationStatus::Done
    }
}

/// Arms a calibration routine, waits `settle`, and decodes the readback.
pub fn calibrate<T: AttrTransport + ?Sized>(
    chan: &ChannelXattrs<'_, T>,
    kind: CalibrationKind,
    settle: Duration,
) -> Result<CalibrationReadback> {
    chan.arm(kind.attr())?;
    thread::sleep(settle);
    let readback = CalibrationReadback::parse(&chan.get_str(kind.attr())?);
    if !readback.is_done() {
        log::warn!("{}: {} calibration reported {:?}", chan.id(), kind, readback.status);
    }
    Ok(readback)
}

// --------------------------------------------------------------------------

/// The person at the bench.
///
/// Calibration steps that need the operator to change the analog setup
/// go through this trait, so the procedure can run from a console or a
/// script.
pub trait Operator {
    /// Shows a message and waits for acknowledgement.
    fn confirm(&mut self, msg: &str) -> Result<()>;

    /// Asks for the weight placed on a loadcell, in grams (> 0).
    fn weight_grams(&mut self) -> Result<u32>;

    /// Shows an informational line.
    fn report(&mut self, msg: &str);
}

/// Which register a calibration step targeted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Register {
    /// Zero-scale
    Offset,
    /// Full-scale
    Gain,
}

/// One arm/settle/readback step of a procedure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepResult {
    /// The channel id
    pub channel: String,
    /// The register the step calibrated
    pub register: Register,
    /// What the firmware reported
    pub readback: CalibrationReadback,
}

impl StepResult {
    /// Formats the before/after values and the outcome, as shown to the
    /// operator.
    pub fn describe(&self, kind: CalibrationKind) -> String {
        let (name, before, after) = match self.register {
            Register::Offset => ("offset", &self.readback.offset_before, &self.readback.offset_after),
            Register::Gain => ("gain", &self.readback.gain_before, &self.readback.gain_after),
        };
        let outcome = match &self.readback.status {
            CalibrationStatus::Done => "successful".to_string(),
            CalibrationStatus::Skipped => "skipped due to PGA=1".to_string(),
            CalibrationStatus::Failed(s) => format!("failed ({})", s),
        };
        format!(
            "{name} (before calibration): 0x{before}\n{name} (after calibration): 0x{after}\n{kind} {name} calibration {outcome}",
            name = name,
            before = before,
            after = after,
            kind = kind,
            outcome = outcome
        )
    }
}

/// Runs a calibration over every channel.
///
/// System calibration asks the operator to apply zero-scale and then
/// full-scale voltages on the channel's analog inputs. Internal
/// calibration runs gain first, then offset, with no operator steps.
pub fn calibrate_channels<T, O>(
    transport: &T,
    channels: &[String],
    demo: &DemoConfig,
    kind: CalibrationKind,
    settle: Duration,
    operator: &mut O,
) -> Result<Vec<StepResult>>
where
    T: AttrTransport + ?Sized,
    O: Operator + ?Sized,
{
    if *demo == DemoConfig::PowerTest {
        return Err(Error::Unsupported(
            "Invalid demo mode config. Calibration can't be performed on internal ADC channels"
                .into(),
        ));
    }

    let mut results = Vec::new();

    for id in channels {
        let chan = ChannelXattrs::new(transport, id.as_str());
        let idx = channel_index(id).ok_or_else(|| Error::ChannelNotFound(id.clone()))?;
        let ain = demo.analog_input(idx).unwrap_or("the analog inputs");

        operator.report(&format!("Calibrating channel {}", idx));

        let steps: &[Register] = match kind {
            CalibrationKind::System => &[Register::Offset, Register::Gain],
            CalibrationKind::Internal => &[Register::Gain, Register::Offset],
        };

        for &register in steps {
            if kind == CalibrationKind::System {
                let scale = match register {
                    Register::Offset => "zero-scale",
                    Register::Gain => "full-scale",
                };
                operator.confirm(&format!("Apply {} voltage between {} and press enter", scale, ain))?;
            }

            let readback = calibrate(&chan, kind, settle)?;
            let step = StepResult { channel: id.clone(), register, readback };
            operator.report(&step.describe(kind));
            results.push(step);
        }
    }
    Ok(results)
}

// --------------------------------------------------------------------------

/// Zero-load and known-load codes for one loadcell channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadcellCalibration {
    /// Code with no load
    pub offset: i64,
    /// Code with the reference weight applied
    pub gain: i64,
    /// The reference weight, in grams
    pub weight_grams: u32,
}

impl LoadcellCalibration {
    /// Converts a raw code to grams.
    pub fn weight(&self, raw: i64) -> Result<f64> {
        let span = self.gain - self.offset;
        if span == 0 {
            return Err(Error::Unsupported(
                "Invalid measurement result. Please check device settings".into(),
            ));
        }
        Ok((raw - self.offset) as f64 * f64::from(self.weight_grams) / span as f64)
    }
}

/// Runs the two-point loadcell calibration on one channel.
pub fn calibrate_loadcell<T, O>(
    chan: &ChannelXattrs<'_, T>,
    settle: Duration,
    operator: &mut O,
) -> Result<LoadcellCalibration>
where
    T: AttrTransport + ?Sized,
    O: Operator + ?Sized,
{
    operator.confirm("Please ensure no weight is applied on Loadcell and press enter to continue calibration")?;
    operator.report("Waiting to settle-down the Loadcell..");
    thread::sleep(settle);

    chan.arm(ChannelAttr::LoadcellOffsetCalibration)?;
    let offset: i64 = chan.get(ChannelAttr::LoadcellOffsetCalibration)?;
    operator.report(&format!("Loadcell offset: {}", offset));

    let weight_grams = operator.weight_grams()?;
    if weight_grams == 0 {
        return Err(Error::InvalidInput("weight must be > 0".into()));
    }

    operator.report("Waiting to settle-down the Loadcell..");
    thread::sleep(settle);

    chan.arm(ChannelAttr::LoadcellGainCalibration)?;
    let gain: i64 = chan.get(ChannelAttr::LoadcellGainCalibration)?;
    operator.report(&format!("Loadcell gain: {}", gain));

    Ok(LoadcellCalibration { offset, gain, weight_grams })
}

// --------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockFirmware;

    const DONE: &str = "0055AB1200556F0A800000007FFFF0C2calibration_done";

    #[derive(Default)]
    struct Script {
        confirms: Vec<String>,
        reports: Vec<String>,
        weight: u32,
    }

    impl Operator for Script {
        fn confirm(&mut self, msg: &str) -> Result<()> {
            self.confirms.push(msg.to_string());
            Ok(())
        }

        fn weight_grams(&mut self) -> Result<u32> {
            Ok(self.weight)
        }

        fn report(&mut self, msg: &str) {
            self.reports.push(msg.to_string());
        }
    }

    #[test]
    fn readback_slices_fields() {
        let rb = CalibrationReadback::parse(DONE);
        assert_eq!(rb.gain_before, "0055AB12");
        assert_eq!(rb.gain_after, "00556F0A");
        assert_eq!(rb.offset_before, "80000000");
        assert_eq!(rb.offset_after, "7FFFF0C2");
        assert_eq!(rb.status, CalibrationStatus::Done);
        assert!(rb.is_done());
    }

    #[test]
    fn readback_statuses() {
        let skipped = format!("{}calibration_skipped", "0".repeat(32));
        assert_eq!(
            CalibrationReadback::parse(&skipped).status,
            CalibrationStatus::Skipped
        );

        let odd = format!("{}calibration_failed", "0".repeat(32));
        assert_eq!(
            CalibrationReadback::parse(&odd).status,
            CalibrationStatus::Failed("calibration_failed".into())
        );

        let short = CalibrationReadback::parse("calibration_failed\n");
        assert_eq!(short.status, CalibrationStatus::Failed("calibration_failed".into()));
        assert!(short.gain_before.is_empty());
        assert!(short.offset_after.is_empty());
    }

    #[test]
    fn short_readback_moves_on_to_next_channel() {
        let fw = MockFirmware::new(&["voltage0", "voltage1"]);
        fw.queue_chan_reads("voltage0", "internal_calibration", &["calibration_failed", DONE]);
        fw.queue_chan_reads("voltage1", "internal_calibration", &[DONE, DONE]);
        let mut op = Script::default();
        let channels = vec!["voltage0".to_string(), "voltage1".to_string()];

        let results = calibrate_channels(
            &fw,
            &channels,
            &DemoConfig::UserDefault,
            CalibrationKind::Internal,
            Duration::ZERO,
            &mut op,
        )
        .unwrap();

        assert_eq!(results.len(), 4);
        assert_eq!(
            results[0].readback.status,
            CalibrationStatus::Failed("calibration_failed".into())
        );
        assert!(op.reports.iter().any(|r| r.contains("failed (calibration_failed)")));
        assert_eq!(results[2].channel, "voltage1");
        assert!(results[3].readback.is_done());
        assert_eq!(fw.writes().len(), 4);
    }

    #[test]
    fn kind_selection() {
        assert_eq!("1".parse::<CalibrationKind>().unwrap(), CalibrationKind::Internal);
        assert_eq!("2\n".parse::<CalibrationKind>().unwrap(), CalibrationKind::System);
        assert!("3".parse::<CalibrationKind>().is_err());
    }

    #[test]
    fn arm_then_poll() {
        let fw = MockFirmware::new(&["voltage0"]);
        fw.queue_chan_reads("voltage0", "internal_calibration", &[DONE]);
        let chan = ChannelXattrs::new(&fw, "voltage0");

        let rb = calibrate(&chan, CalibrationKind::Internal, Duration::ZERO).unwrap();
        assert!(rb.is_done());
        assert_eq!(
            fw.writes(),
            vec![(
                "voltage0".into(),
                "internal_calibration".into(),
                "start_calibration".into()
            )]
        );
    }

    #[test]
    fn system_procedure_prompts_per_step() {
        let fw = MockFirmware::new(&["voltage0", "voltage1"]);
        for ch in ["voltage0", "voltage1"] {
            fw.queue_chan_reads(ch, "system_calibration", &[DONE, DONE]);
        }
        let mut op = Script::default();
        let channels = vec!["voltage0".to_string(), "voltage1".to_string()];

        let results = calibrate_channels(
            &fw,
            &channels,
            &DemoConfig::Thermocouple,
            CalibrationKind::System,
            Duration::ZERO,
            &mut op,
        )
        .unwrap();

        assert_eq!(results.len(), 4);
        assert_eq!(results[0].register, Register::Offset);
        assert_eq!(results[1].register, Register::Gain);
        assert_eq!(op.confirms.len(), 4);
        assert!(op.confirms[0].contains("zero-scale"));
        assert!(op.confirms[0].contains("AIN2-AIN3"));
        assert!(op.confirms[3].contains("AIN4-AIN5"));
        assert_eq!(fw.writes().len(), 4);
    }

    #[test]
    fn internal_procedure_reports_skip() {
        let fw = MockFirmware::new(&["voltage0"]);
        let skipped = format!("{}calibration_skipped", "0".repeat(32));
        fw.queue_chan_reads("voltage0", "internal_calibration", &[skipped.as_str(), DONE]);
        let mut op = Script::default();

        let results = calibrate_channels(
            &fw,
            &["voltage0".to_string()],
            &DemoConfig::UserDefault,
            CalibrationKind::Internal,
            Duration::ZERO,
            &mut op,
        )
        .unwrap();

        assert!(op.confirms.is_empty());
        assert_eq!(results[0].register, Register::Gain);
        assert_eq!(results[0].readback.status, CalibrationStatus::Skipped);
        assert!(op.reports.iter().any(|r| r.contains("skipped due to PGA=1")));
        assert!(results[1].readback.is_done());
    }

    #[test]
    fn power_test_refuses() {
        let fw = MockFirmware::new(&["voltage0"]);
        let mut op = Script::default();
        let err = calibrate_channels(
            &fw,
            &["voltage0".to_string()],
            &DemoConfig::PowerTest,
            CalibrationKind::Internal,
            Duration::ZERO,
            &mut op,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Unsupported(_)));
        assert!(fw.writes().is_empty());
    }

    #[test]
    fn loadcell_two_point() {
        let fw = MockFirmware::new(&["voltage0"]);
        fw.queue_chan_reads("voltage0", "loadcell_offset_calibration", &["8388000"]);
        fw.queue_chan_reads("voltage0", "loadcell_gain_calibration", &["8398000"]);
        let mut op = Script { weight: 500, ..Script::default() };

        let chan = ChannelXattrs::new(&fw, "voltage0");
        let cal = calibrate_loadcell(&chan, Duration::ZERO, &mut op).unwrap();

        assert_eq!(cal, LoadcellCalibration { offset: 8388000, gain: 8398000, weight_grams: 500 });
        assert!((cal.weight(8393000).unwrap() - 250.0).abs() < 1e-9);
        assert_eq!(fw.writes().len(), 2);
    }

    #[test]
    fn loadcell_degenerate_span() {
        let cal = LoadcellCalibration { offset: 10, gain: 10, weight_grams: 100 };
        assert!(cal.weight(20).is_err());
    }
}
