// iio-eval/src/xattr.rs
//
// Copyright (c) 2018-2025, Frank Pagliughi
//
// Licensed under the MIT license:
//   <LICENSE or http://opensource.org/licenses/MIT>
// This file may not be copied, modified, or distributed except according
// to those terms.
//
//! The catalog of extended attributes.
//!
//! These are the attributes the evaluation firmware images add on top of
//! the stock Linux IIO set. Each one is named by an enum variant and
//! described by an [`AttrDescriptor`]. The string names are only used at
//! the edges (the transport and the command line).

use std::str::FromStr;

use crate::attr::{AttrDescriptor, ValueKind};
use crate::Error;

macro_rules! attr_catalog {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident => $desc:expr, )*
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $( $(#[$vmeta])* $variant, )*
        }

        impl $name {
            /// Every attribute in the catalog
            pub const ALL: &'static [$name] = &[ $( $name::$variant, )* ];

            /// Gets the static description of the attribute
            pub const fn descriptor(&self) -> AttrDescriptor {
                match self {
                    $( $name::$variant => $desc, )*
                }
            }

            /// The attribute name, as the firmware spells it
            pub const fn name(&self) -> &'static str {
                self.descriptor().name
            }
        }

        impl FromStr for $name {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                $name::ALL
                    .iter()
                    .copied()
                    .find(|a| a.name() == s)
                    .ok_or_else(|| Error::General(format!("Unknown attribute '{}'", s)))
            }
        }
    };
}

use AttrDescriptor as D;
use ValueKind::{Float, Integer, Text};

attr_catalog! {
    /// Device-level extended attributes.
    pub enum DeviceAttr {
        /// Active analog front-end configuration (e.g. "Thermocouple")
        DemoConfig => D::read_only("demo_config", Text),
        /// Output data rate in Hz
        SamplingFrequency => D::read_write("sampling_frequency", Integer),
        /// Converter operating mode
        OperatingMode => D::read_write("operating_mode", Text),
        /// Power-down mode
        PowerDownMode => D::read_write("power_down_mode", Text),
        /// Conversion mode (read-only on AD777x)
        ConversionMode => D::read_only("conversion_mode", Text),
        /// Error status register 1
        ErrorStatus1 => D::read_only("error_status1", Text),
        /// Error status register 2
        ErrorStatus2 => D::read_only("error_status2", Text),
        /// Error status register 3
        ErrorStatus3 => D::read_only("error_status3", Text),
        /// Integer part of the sampling rate converter
        SamplingRateConverterInt => D::read_only("sampling_rate_converter_int", Integer),
        /// Decimal part of the sampling rate converter
        SamplingRateConverterDec => D::read_only("sampling_rate_converter_dec", Integer),
        /// DAC coding (binary / two's complement)
        CodingSelect => D::constrained("coding_select", "coding_select_available"),
        /// DAC clear code register
        ClearCode => D::read_write("clear_code", Text),
        /// DAC output amplifier configuration
        OutputAmplifier => D::constrained("output_amplifier", "output_amplifier_available"),
        /// Asynchronous clear
        Clear => D::constrained("clear", "clear_available"),
        /// Hardware LDAC trigger
        HwLdacTrigger => D::constrained("hw_ldac_trigger", "hw_ldac_trigger_available"),
        /// Software LDAC trigger
        SwLdacTrigger => D::constrained("sw_ldac_trigger", "sw_ldac_trigger_available"),
        /// Reference voltage source
        ReferenceSelect => D::constrained("reference_select", "reference_select_available"),
        /// Operating mode for all DAC channels at once
        AllChOperatingMode => D::constrained("all_ch_operating_mode", "all_ch_operating_mode_available"),
        /// Input registers of all DAC channels at once
        AllChInputRegisters => D::read_write("all_ch_input_registers", Text),
        /// DAC registers of all channels at once
        AllChRaw => D::read_write("all_ch_raw", Text),
        /// ALERT/BUSY/GPO0 pin function
        AlertBsyGpo0En => D::constrained("alert_bsy_gpo0_en", "alert_bsy_gpo0_en_available"),
        /// ALERT polarity or GPO0 level
        AlertPolOrGp0Value => D::constrained("alert_pol_or_gp0_value", "alert_pol_or_gp0_value_available"),
        /// Diagnostic mux: AUXAINP to AUXAINN
        AuxainpAuxainn => D::read_only("auxainp_auxainn", Text),
        /// Diagnostic mux: DVBE to AVSSx
        DvbeAvssx => D::read_only("dvbe_avssx", Text),
        /// Diagnostic mux: REF1P to REF1N
        Ref1pRef1n => D::read_only("ref1p_ref1n", Text),
        /// Diagnostic mux: REF2P to REF2N
        Ref2pRef2n => D::read_only("ref2p_ref2n", Text),
        /// Diagnostic mux: REF_OUT to AVSSx
        RefOutAvssx => D::read_only("ref_out_avssx", Text),
        /// Diagnostic mux: VCM to AVSSx
        VcmAvssx => D::read_only("vcm_avssx", Text),
        /// Diagnostic mux: AREG1CAP to AVSSx
        Areg1capAvssx => D::read_only("areg1cap_avssx", Text),
        /// Diagnostic mux: AREG2CAP to AVSSx
        Areg2capAvssx => D::read_only("areg2cap_avssx", Text),
        /// Diagnostic mux: DREGCAP to DGND
        DregcapDgnd => D::read_only("dregcap_dgnd", Text),
        /// Diagnostic mux: AVDD1A to AVSSx
        Avdd1aAvssx => D::read_only("avdd1a_avssx", Text),
        /// Diagnostic mux: AVDD1B to AVSSx
        Avdd1bAvssx => D::read_only("avdd1b_avssx", Text),
        /// Diagnostic mux: AVDD2A to AVSSx
        Avdd2aAvssx => D::read_only("avdd2a_avssx", Text),
        /// Diagnostic mux: AVDD2B to AVSSx
        Avdd2bAvssx => D::read_only("avdd2b_avssx", Text),
        /// Diagnostic mux: IOVDD to DGND
        IovddDgnd => D::read_only("iovdd_dgnd", Text),
        /// Diagnostic mux: AVDD4 to AVSSx
        Avdd4Avssx => D::read_only("avdd4_avssx", Text),
        /// Diagnostic mux: DGND to AVSS1A
        DgndAvss1a => D::read_only("dgnd_avss1a", Text),
        /// Diagnostic mux: DGND to AVSS1B
        DgndAvss1b => D::read_only("dgnd_avss1b", Text),
        /// Diagnostic mux: REF1P to AVSSx
        Ref1pAvssx => D::read_only("ref1p_avssx", Text),
        /// Diagnostic mux: REF2P to AVSSx
        Ref2pAvssx => D::read_only("ref2p_avssx", Text),
        /// Diagnostic mux: AVSSx to AVDD4
        AvssxAvdd4 => D::read_only("avssx_avdd4", Text),
    }
}

attr_catalog! {
    /// Channel-level attributes, stock and extended.
    pub enum ChannelAttr {
        /// Raw converter code
        Raw => D::read_write("raw", Integer),
        /// Scale to physical units
        Scale => D::read_only("scale", Float),
        /// Offset applied before scaling
        Offset => D::read_only("offset", Float),
        /// System (external reference) calibration trigger and readback
        SystemCalibration => D::action("system_calibration"),
        /// Internal calibration trigger and readback
        InternalCalibration => D::action("internal_calibration"),
        /// Loadcell zero-load calibration trigger; reads back the code
        LoadcellOffsetCalibration => D::action("loadcell_offset_calibration"),
        /// Loadcell known-weight calibration trigger; reads back the code
        LoadcellGainCalibration => D::action("loadcell_gain_calibration"),
        /// Analog input range
        ChnRange => D::read_write("chn_range", Text),
        /// Die temperature
        Temperature => D::read_only("temperature", Float),
        /// Reference voltage
        Vref => D::read_only("vref", Float),
        /// Digital interface supply voltage
        Vdrive => D::read_only("vdrive", Float),
        /// Analog LDO output
        Aldo => D::read_only("ALDO", Float),
        /// Digital LDO output
        Dldo => D::read_only("DLDO", Float),
        /// Manual open-circuit detection result
        OpenCircuitDetectManual => D::read_only("open_circuit_detect_manual", Text),
        /// Automatic open-circuit detection
        OpenCircuitDetectAuto => D::read_write("open_circuit_detect_auto", Text),
        /// ADC offset calibration (runs on read)
        CalibrateAdcOffset => D::read_only("calibrate_adc_offset", Text),
        /// ADC gain calibration
        CalibrateAdcGain => D::read_write("calibrate_adc_gain", Text),
        /// Threshold alert status/config
        ThreshAlert => D::constrained("thresh_alert", "thresh_alert_available"),
    }
}

// --------------------------------------------------------------------------
