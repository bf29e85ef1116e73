// iio-eval/src/context.rs
//
// Copyright (c) 2018-2025, Frank Pagliughi
//
// Licensed under the MIT license:
//   <LICENSE or http://opensource.org/licenses/MIT>
// This file may not be copied, modified, or distributed except according
// to those terms.
//
//! Industrial I/O Contexts.
//!
//! A context is the connection to the evaluation board. The firmware
//! speaks the IIO daemon protocol over a serial link, so contexts are
//! created from a `serial:` URI.

use std::{
    ffi::CString,
    os::raw::c_uint,
    rc::Rc,
    time::Duration,
};

use crate::{cstring_opt, ffi, sys_result, Device, Error, Result, SerialUri};

/// An Industrial I/O Context
///
/// The underlying `iio_context` is reference counted and destroyed when
/// the last clone, and the last [`Device`] taken from it, is dropped.
/// libiio makes no thread safety guarantees, so this is neither `Send`
/// nor `Sync`.
#[derive(Debug, Clone)]
pub struct Context {
    inner: Rc<InnerContext>,
}

/// Holds the pointer to the C context.
#[derive(Debug)]
struct InnerContext {
    ctx: *mut ffi::iio_context,
}

impl Drop for InnerContext {
    fn drop(&mut self) {
        unsafe { ffi::iio_context_destroy(self.ctx) };
    }
}

impl Context {
    /// Creates a context from a libiio URI.
    pub fn from_uri(uri: &str) -> Result<Self> {
        let curi = CString::new(uri)?;
        let ctx = unsafe { ffi::iio_create_context_from_uri(curi.as_ptr()) };
        if ctx.is_null() {
            log::error!("Unable to create a context for '{}'", uri);
            return Err(Error::Connection(uri.to_string()));
        }
        log::info!("Connected to '{}'", uri);
        Ok(Self { inner: Rc::new(InnerContext { ctx }) })
    }

    /// Connects to a board over a serial link and sets the I/O timeout.
    pub fn connect(uri: &SerialUri, timeout: Duration) -> Result<Self> {
        let ctx = Self::from_uri(&uri.to_string())?;
        ctx.set_timeout(timeout)?;
        Ok(ctx)
    }

    /// Get a description of the context
    pub fn description(&self) -> String {
        let pstr = unsafe { ffi::iio_context_get_description(self.inner.ctx) };
        cstring_opt(pstr).unwrap_or_default()
    }

    /// Sets the timeout for I/O operations.
    ///
    /// A value of zero specifies that no timeout should be used.
    pub fn set_timeout(&self, timeout: Duration) -> Result<()> {
        let ms = c_uint::try_from(timeout.as_millis()).unwrap_or(c_uint::MAX);
        let ret = unsafe { ffi::iio_context_set_timeout(self.inner.ctx, ms) };
        sys_result(ret, ())
    }

    /// Get the number of devices in the context
    pub fn num_devices(&self) -> usize {
        let n = unsafe { ffi::iio_context_get_devices_count(self.inner.ctx) };
        n as usize
    }

    /// Gets a device by index
    pub fn get_device(&self, idx: usize) -> Result<Device> {
        let dev = unsafe { ffi::iio_context_get_device(self.inner.ctx, idx as c_uint) };
        if dev.is_null() {
            return Err(Error::DeviceNotFound(format!("#{}", idx)));
        }
        Ok(Device::new(dev, self.clone()))
    }

    /// Finds a device by name or ID.
    /// A missing device is an error: nothing else can be done without it.
    pub fn find_device(&self, name: &str) -> Result<Device> {
        let cname = CString::new(name)?;
        let dev = unsafe { ffi::iio_context_find_device(self.inner.ctx, cname.as_ptr()) };
        if dev.is_null() {
            return Err(Error::DeviceNotFound(name.to_string()));
        }
        Ok(Device::new(dev, self.clone()))
    }

    /// Gets an iterator for all the devices in the context.
    pub fn devices(&self) -> DeviceIterator {
        DeviceIterator { ctx: self, idx: 0 }
    }
}

impl PartialEq for Context {
    /// Two contexts are the same if they refer to the same underlying
    /// object in the library.
    fn eq(&self, other: &Context) -> bool {
        self.inner.ctx == other.inner.ctx
    }
}

/// Iterator over the devices in a context
#[derive(Debug)]
pub struct DeviceIterator<'a> {
    ctx: &'a Context,
    idx: usize,
}

impl<'a> Iterator for DeviceIterator<'a> {
    type Item = Device;

    fn next(&mut self) -> Option<Self::Item> {
        match self.ctx.get_device(self.idx) {
            Ok(dev) => {
                self.idx += 1;
                Some(dev)
            }
            Err(_) => None,
        }
    }
}
