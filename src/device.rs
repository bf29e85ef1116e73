// iio-eval/src/device.rs
//
// Copyright (c) 2018-2025, Frank Pagliughi
//
// Licensed under the MIT license:
//   <LICENSE or http://opensource.org/licenses/MIT>
// This file may not be copied, modified, or distributed except according
// to those terms.
//
//! Industrial I/O Devices
//!

use std::{
    ffi::{CStr, CString},
    os::raw::{c_char, c_uint},
};

use crate::attr::{AttrTransport, Scope};
use crate::{cstring_opt, ffi, sys_result, Buffer, Channel, Context, Error, Result, ATTR_BUF_SIZE};

/// An Industrial I/O Device
///
/// This can not be created directly. It is obtained from a context, and
/// keeps the context alive for as long as it exists.
#[derive(Debug, Clone)]
pub struct Device {
    pub(crate) dev: *mut ffi::iio_device,
    pub(crate) ctx: Context,
}

impl Device {
    pub(crate) fn new(dev: *mut ffi::iio_device, ctx: Context) -> Self {
        Self { dev, ctx }
    }

    /// Gets the context to which the device belongs
    pub fn context(&self) -> Context {
        self.ctx.clone()
    }

    /// Gets the device ID (e.g. <b><i>iio:device0</i></b>)
    pub fn id(&self) -> Option<String> {
        let pstr = unsafe { ffi::iio_device_get_id(self.dev) };
        cstring_opt(pstr)
    }

    /// Gets the name of the device
    pub fn name(&self) -> Option<String> {
        let pstr = unsafe { ffi::iio_device_get_name(self.dev) };
        cstring_opt(pstr)
    }

    /// Gets the number of device-specific attributes
    pub fn num_attrs(&self) -> usize {
        unsafe { ffi::iio_device_get_attrs_count(self.dev) as usize }
    }

    /// Gets the names of the device-specific attributes
    pub fn attr_names(&self) -> Vec<String> {
        (0..self.num_attrs())
            .filter_map(|i| cstring_opt(unsafe { ffi::iio_device_get_attr(self.dev, i as c_uint) }))
            .collect()
    }

    /// Reads a device-specific attribute as a string
    pub fn attr_read_str(&self, attr: &str) -> Result<String> {
        let mut buf = vec![0 as c_char; ATTR_BUF_SIZE];
        let attr = CString::new(attr)?;
        let ret = unsafe {
            ffi::iio_device_attr_read(self.dev, attr.as_ptr(), buf.as_mut_ptr(), buf.len())
        };
        sys_result(ret as i32, ())?;
        let s = unsafe { CStr::from_ptr(buf.as_ptr()) };
        Ok(s.to_string_lossy().into_owned())
    }

    /// Writes a device-specific attribute as a string
    pub fn attr_write_str(&self, attr: &str, val: &str) -> Result<()> {
        let attr = CString::new(attr)?;
        let sval = CString::new(val)?;
        let ret = unsafe { ffi::iio_device_attr_write(self.dev, attr.as_ptr(), sval.as_ptr()) };
        sys_result(ret as i32, ())
    }

    /// Gets the number of channels on the device
    pub fn num_channels(&self) -> usize {
        unsafe { ffi::iio_device_get_channels_count(self.dev) as usize }
    }

    /// Gets a channel by index
    pub fn get_channel(&self, idx: usize) -> Result<Channel> {
        let chan = unsafe { ffi::iio_device_get_channel(self.dev, idx as c_uint) };
        if chan.is_null() {
            return Err(Error::ChannelNotFound(format!("#{}", idx)));
        }
        Ok(Channel::new(chan, self.ctx.clone()))
    }

    /// Finds a channel by its ID, looking at the inputs first, then the
    /// outputs.
    pub fn find_channel(&self, id: &str) -> Result<Channel> {
        let cid = CString::new(id)?;
        for output in [false, true] {
            let chan = unsafe { ffi::iio_device_find_channel(self.dev, cid.as_ptr(), output) };
            if !chan.is_null() {
                return Ok(Channel::new(chan, self.ctx.clone()));
            }
        }
        Err(Error::ChannelNotFound(id.to_string()))
    }

    /// Gets an iterator for the channels in the device
    pub fn channels(&self) -> ChannelIterator {
        ChannelIterator { dev: self, idx: 0 }
    }

    /// Gets the channels that can stream samples into a buffer, or the
    /// requested subset of them, in order.
    pub fn scan_channels(&self, ids: &[String]) -> Result<Vec<Channel>> {
        if ids.is_empty() {
            return Ok(self
                .channels()
                .filter(|ch| !ch.is_output() && ch.is_scan_element())
                .collect());
        }
        ids.iter().map(|id| self.find_channel(id)).collect()
    }

    /// Creates a buffer for the enabled channels of the device.
    ///
    /// `sample_count` The number of samples the buffer holds, per channel
    pub fn create_buffer(&self, sample_count: usize) -> Result<Buffer> {
        let buf = unsafe { ffi::iio_device_create_buffer(self.dev, sample_count, false) };
        if buf.is_null() {
            return Err(nix::errno::Errno::last().into());
        }
        Ok(Buffer::new(buf, sample_count, self.clone()))
    }
}

impl PartialEq for Device {
    /// Two devices are the same if they refer to the same underlying
    /// object in the library.
    fn eq(&self, other: &Device) -> bool {
        self.dev == other.dev
    }
}

impl AttrTransport for Device {
    fn read_attr(&self, scope: Scope<'_>, attr: &str) -> Result<String> {
        match scope {
            Scope::Device => self.attr_read_str(attr),
            Scope::Channel(id) => self.find_channel(id)?.attr_read_str(attr),
        }
    }

    fn write_attr(&self, scope: Scope<'_>, attr: &str, val: &str) -> Result<()> {
        match scope {
            Scope::Device => self.attr_write_str(attr, val),
            Scope::Channel(id) => self.find_channel(id)?.attr_write_str(attr, val),
        }
    }
}

/// Iterator over the channels of a device
#[derive(Debug)]
pub struct ChannelIterator<'a> {
    dev: &'a Device,
    idx: usize,
}

impl<'a> Iterator for ChannelIterator<'a> {
    type Item = Channel;

    fn next(&mut self) -> Option<Self::Item> {
        match self.dev.get_channel(self.idx) {
            Ok(chan) => {
                self.idx += 1;
                Some(chan)
            }
            Err(_) => None,
        }
    }
}
