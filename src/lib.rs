// iio-eval/src/lib.rs
//
// Copyright (c) 2018-2025, Frank Pagliughi
//
// Licensed under the MIT license:
//   <LICENSE or http://opensource.org/licenses/MIT>
// This file may not be copied, modified, or distributed except according
// to those terms.
//
//!
//! Host tools for Analog Devices precision-converter evaluation firmware.
//!
//! The evaluation firmware exposes its converter through the Linux
//! Industrial I/O (IIO) model, served over a serial link. This crate
//! talks to it through _libiio_ and provides:
//!
//! - typed access to the firmware's extended attributes, with the legal
//!   values of constrained attributes checked before a write,
//! - a chunked streaming capture loop writing samples to CSV,
//! - the calibration and sensor-measurement procedures, and
//! - scripted checks against the menu-driven console firmware.
//!
//! The libiio transport is behind the `hardware` feature. Everything else
//! works against the [`AttrTransport`] and [`SampleSource`] traits.
//!
//! For more information, see:
//!
//!   [IIO Wiki](https://wiki.analog.com/software/linux/docs/iio/iio)
//!
//!   [libiio Wiki](https://wiki.analog.com/resources/tools-software/linux-software/libiio)
//!

// Lints
// This may be overkill.
#![deny(
    missing_docs,
    missing_debug_implementations,
    unstable_features,
    unused_import_braces,
    unused_qualifications
)]

pub use crate::accessor::*;
pub use crate::attr::*;
pub use crate::capture::*;
pub use crate::config::*;
pub use crate::errors::*;
pub use crate::xattr::*;

#[cfg(feature = "hardware")]
pub use crate::{buffer::*, channel::*, context::*, device::*};

pub mod accessor;
pub mod attr;
pub mod calibration;
pub mod cancel;
pub mod capture;
pub mod config;
pub mod console;
pub mod errors;
pub mod measurement;
pub mod prompt;
pub mod sink;
pub mod xattr;

#[cfg(feature = "hardware")]
pub mod buffer;
#[cfg(feature = "hardware")]
pub mod channel;
#[cfg(feature = "hardware")]
pub mod context;
#[cfg(feature = "hardware")]
pub mod device;

#[cfg(test)]
pub(crate) mod mock;

#[cfg(feature = "hardware")]
pub use self::hardware::{library_version, Version};
#[cfg(feature = "hardware")]
pub(crate) use self::hardware::{cstring_opt, ffi, sys_result, ATTR_BUF_SIZE};

#[cfg(feature = "hardware")]
mod hardware {
    use std::{
        ffi::CStr,
        fmt,
        os::raw::{c_char, c_uint},
    };

    pub(crate) use libiio_sys as ffi;
    use nix::errno::Errno;

    use crate::Result;

    /// According to the IIO samples, internal buffers need to be big enough
    /// for attributes coming back from the kernel.
    pub(crate) const ATTR_BUF_SIZE: usize = 16384;

    /// Gets an optional string value from a C const char pointer.
    /// If the pointer is NULL, this returns `None` otherwise it converts the
    /// string and returns it.
    pub(crate) fn cstring_opt(pstr: *const c_char) -> Option<String> {
        if pstr.is_null() {
            None
        }
        else {
            let name = unsafe { CStr::from_ptr(pstr) };
            Some(name.to_string_lossy().into_owned())
        }
    }

    /// Converts a negative errno return from the C library into an error.
    pub(crate) fn sys_result<T>(ret: i32, result: T) -> Result<T> {
        if ret < 0 {
            Err(Errno::from_i32(-ret).into())
        }
        else {
            Ok(result)
        }
    }

    /// A struct to hold version numbers
    #[derive(Debug, PartialEq, Eq)]
    pub struct Version {
        /// The Major version number
        pub major: u32,
        /// The Minor version number
        pub minor: u32,
        /// The git tag for the release
        pub git_tag: String,
    }

    impl fmt::Display for Version {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{}.{} tag: {}", self.major, self.minor, self.git_tag)
        }
    }

    /// Gets the libiio version as (Major, Minor, Git Tag)
    pub fn library_version() -> Version {
        let mut major: c_uint = 0;
        let mut minor: c_uint = 0;

        // The tag is 7 characters plus the terminator
        let mut buf = [0 as c_char; 8];
        unsafe { ffi::iio_library_get_version(&mut major, &mut minor, buf.as_mut_ptr()) };
        buf[7] = 0;

        let git_tag = cstring_opt(buf.as_ptr()).unwrap_or_default();
        Version { major, minor, git_tag }
    }
}
