// iio-eval/src/channel.rs
//
// Copyright (c) 2018-2025, Frank Pagliughi
//
// Licensed under the MIT license:
//   <LICENSE or http://opensource.org/licenses/MIT>
// This file may not be copied, modified, or distributed except according
// to those terms.
//
//! Industrial I/O Channels
//!

use std::{
    any::TypeId,
    ffi::{CStr, CString},
    mem,
    os::raw::{c_char, c_uint, c_void},
};

use crate::{cstring_opt, ffi, sys_result, Buffer, Context, Error, Result, ATTR_BUF_SIZE};

/// The integer type that holds one sample of a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum SampleType {
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    I64,
    U64,
}

impl SampleType {
    /// Picks the type for a sample of `nbytes`, if a standard integer
    /// holds it.
    pub fn for_size(nbytes: usize, signed: bool) -> Option<Self> {
        use SampleType::*;
        match (nbytes, signed) {
            (1, true) => Some(I8),
            (1, false) => Some(U8),
            (2, true) => Some(I16),
            (2, false) => Some(U16),
            (4, true) => Some(I32),
            (4, false) => Some(U32),
            (8, true) => Some(I64),
            (8, false) => Some(U64),
            _ => None,
        }
    }

    /// The Rust type id of the sample type
    pub fn rust_type(&self) -> TypeId {
        use SampleType::*;
        match self {
            I8 => TypeId::of::<i8>(),
            U8 => TypeId::of::<u8>(),
            I16 => TypeId::of::<i16>(),
            U16 => TypeId::of::<u16>(),
            I32 => TypeId::of::<i32>(),
            U32 => TypeId::of::<u32>(),
            I64 => TypeId::of::<i64>(),
            U64 => TypeId::of::<u64>(),
        }
    }
}

/// The format of a data sample.
#[derive(Debug, Copy, Clone)]
pub struct DataFormat {
    data_fmt: ffi::iio_data_format,
}

impl DataFormat {
    /// Gets total length of the sample, in bits.
    pub fn length(&self) -> u32 {
        u32::from(self.data_fmt.length)
    }

    /// Gets the length of valid data in the sample, in bits.
    pub fn bits(&self) -> u32 {
        u32::from(self.data_fmt.bits)
    }

    /// Determines if the sample is signed
    pub fn is_signed(&self) -> bool {
        self.data_fmt.is_signed
    }

    /// Number of times length repeats
    pub fn repeat(&self) -> u32 {
        u32::from(self.data_fmt.repeat)
    }

    /// The number of bytes required to hold a single sample from the channel.
    pub fn byte_length(&self) -> usize {
        ((self.length() / 8) * self.repeat()) as usize
    }

    /// Gets the integer type for a single sample from the channel.
    pub fn sample_type(&self) -> Option<SampleType> {
        SampleType::for_size(self.byte_length(), self.is_signed())
    }
}

/// An Industrial I/O Device Channel
#[derive(Debug, Clone)]
pub struct Channel {
    pub(crate) chan: *mut ffi::iio_channel,
    #[allow(dead_code)] // holds the context alive while the channel is in use
    pub(crate) ctx: Context,
}

impl Channel {
    pub(crate) fn new(chan: *mut ffi::iio_channel, ctx: Context) -> Self {
        Self { chan, ctx }
    }

    /// Retrieve the channel ID (e.g. <b><i>voltage0</i></b>)
    pub fn id(&self) -> Option<String> {
        let pstr = unsafe { ffi::iio_channel_get_id(self.chan) };
        cstring_opt(pstr)
    }

    /// Determines if this is an output channel.
    pub fn is_output(&self) -> bool {
        unsafe { ffi::iio_channel_is_output(self.chan) }
    }

    /// Determines if the channel is a scan element
    ///
    /// A scan element is a channel that can generate samples (for an
    /// input channel) or receive samples (for an output channel) after
    /// being enabled.
    pub fn is_scan_element(&self) -> bool {
        unsafe { ffi::iio_channel_is_scan_element(self.chan) }
    }

    /// Gets the names of the channel-specific attributes
    pub fn attr_names(&self) -> Vec<String> {
        let n = unsafe { ffi::iio_channel_get_attrs_count(self.chan) } as usize;
        (0..n)
            .filter_map(|i| cstring_opt(unsafe { ffi::iio_channel_get_attr(self.chan, i as c_uint) }))
            .collect()
    }

    /// Reads a channel-specific attribute as a string
    pub fn attr_read_str(&self, attr: &str) -> Result<String> {
        let mut buf = vec![0 as c_char; ATTR_BUF_SIZE];
        let attr = CString::new(attr)?;
        let ret = unsafe {
            ffi::iio_channel_attr_read(self.chan, attr.as_ptr(), buf.as_mut_ptr(), buf.len())
        };
        sys_result(ret as i32, ())?;
        let s = unsafe { CStr::from_ptr(buf.as_ptr()) };
        Ok(s.to_string_lossy().into_owned())
    }

    /// Writes a channel-specific attribute as a string
    pub fn attr_write_str(&self, attr: &str, val: &str) -> Result<()> {
        let attr = CString::new(attr)?;
        let sval = CString::new(val)?;
        let ret = unsafe { ffi::iio_channel_attr_write(self.chan, attr.as_ptr(), sval.as_ptr()) };
        sys_result(ret as i32, ())
    }

    /// Enable the channel
    ///
    /// Before creating a buffer, at least one channel of the device
    /// must be enabled.
    pub fn enable(&self) {
        unsafe { ffi::iio_channel_enable(self.chan) };
    }

    /// Disable the channel
    pub fn disable(&self) {
        unsafe { ffi::iio_channel_disable(self.chan) };
    }

    /// Gets the data format for the channel
    pub fn data_format(&self) -> DataFormat {
        unsafe {
            let pfmt = ffi::iio_channel_get_data_format(self.chan);
            DataFormat { data_fmt: *pfmt }
        }
    }

    /// Gets the integer type for a single sample from the channel.
    pub fn sample_type(&self) -> Option<SampleType> {
        self.data_format().sample_type()
    }

    /// Demultiplex and convert the samples of the channel.
    ///
    /// `T` has to be the channel's own sample type.
    pub fn read<T>(&self, buf: &Buffer) -> Result<Vec<T>>
    where
        T: Default + Copy + 'static,
    {
        if self.sample_type().map(|t| t.rust_type()) != Some(TypeId::of::<T>()) {
            return Err(Error::WrongDataType);
        }

        let n = buf.capacity();
        let sz_item = mem::size_of::<T>();
        let sz_in = n * sz_item;

        let mut v = vec![T::default(); n];
        let sz = unsafe {
            ffi::iio_channel_read(self.chan, buf.buf, v.as_mut_ptr() as *mut c_void, sz_in)
        };

        if sz > sz_in {
            return Err(Error::BadReturnSize); // This should never happen.
        }

        if sz < sz_in {
            v.truncate(sz / sz_item);
        }
        Ok(v)
    }

    /// Reads the samples of the channel, whatever their type, widened to
    /// `i64`.
    pub fn read_codes(&self, buf: &Buffer) -> Result<Vec<i64>> {
        fn widen<T: Into<i64>>(v: Vec<T>) -> Vec<i64> {
            v.into_iter().map(Into::into).collect()
        }

        use SampleType::*;
        match self.sample_type().ok_or(Error::WrongDataType)? {
            I8 => self.read::<i8>(buf).map(widen),
            U8 => self.read::<u8>(buf).map(widen),
            I16 => self.read::<i16>(buf).map(widen),
            U16 => self.read::<u16>(buf).map(widen),
            I32 => self.read::<i32>(buf).map(widen),
            U32 => self.read::<u32>(buf).map(widen),
            I64 => self.read::<i64>(buf),
            // Codes from converters of at most 32 bits never reach the sign bit
            U64 => Ok(self.read::<u64>(buf)?.into_iter().map(|v| v as i64).collect()),
        }
    }
}

// --------------------------------------------------------------------------
