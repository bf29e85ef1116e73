// iio-eval/src/buffer.rs
//
// Copyright (c) 2018-2025, Frank Pagliughi
//
// Licensed under the MIT license:
//   <LICENSE or http://opensource.org/licenses/MIT>
// This file may not be copied, modified, or distributed except according
// to those terms.
//
//! Industrial I/O Buffers.
//!
//! A [`Buffer`] is always coupled to exactly one [`Device`]. The channels
//! it captures are the ones [enabled](Channel::enable) on the device when
//! the buffer is created, and its capacity (samples per channel) is fixed
//! at creation.
//!
//! [`DeviceSource`] drives a buffer as a [`SampleSource`] for the capture
//! loop. Since the capacity can't change, a request for a different block
//! size (the short last block of a finite capture) re-creates the buffer.

use crate::capture::{Block, SampleSource};
use crate::{ffi, sys_result, Channel, Device, Error, Result};

/// An Industrial I/O input buffer.
#[derive(Debug)]
pub struct Buffer {
    /// The underlying buffer from the C library
    pub(crate) buf: *mut ffi::iio_buffer,
    /// The buffer capacity (# samples from each channel)
    pub(crate) cap: usize,
    /// Copy of the device to which this buffer is attached.
    pub(crate) dev: Device,
}

impl Buffer {
    pub(crate) fn new(buf: *mut ffi::iio_buffer, cap: usize, dev: Device) -> Self {
        Self { buf, cap, dev }
    }

    /// Get the buffer capacity in number of samples from each channel that
    /// the buffer can hold.
    pub fn capacity(&self) -> usize {
        self.cap
    }

    /// Gets a reference to the device to which this buffer is attached.
    pub fn device(&self) -> &Device {
        &self.dev
    }

    /// Fetch more samples from the hardware.
    /// Returns the number of bytes read.
    pub fn refill(&mut self) -> Result<usize> {
        let ret = unsafe { ffi::iio_buffer_refill(self.buf) };
        sys_result(ret as i32, ret as usize)
    }
}

/// Destroy the underlying buffer when the object scope ends.
impl Drop for Buffer {
    fn drop(&mut self) {
        unsafe { ffi::iio_buffer_destroy(self.buf) }
    }
}

// --------------------------------------------------------------------------

/// Streams blocks of samples from a set of device channels.
///
/// The channels are enabled when the source is created and disabled again
/// when it's dropped.
#[derive(Debug)]
pub struct DeviceSource {
    dev: Device,
    channels: Vec<Channel>,
    buf: Option<Buffer>,
}

impl DeviceSource {
    /// Creates a source for the channels, in the given order.
    pub fn new(dev: &Device, channels: Vec<Channel>) -> Result<Self> {
        if channels.is_empty() {
            return Err(Error::ChannelNotFound("no channel to capture".into()));
        }
        for chan in &channels {
            log::debug!("Enabling channel {}", chan.id().unwrap_or_default());
            chan.enable();
        }
        Ok(Self { dev: dev.clone(), channels, buf: None })
    }

    /// The channel ids, in column order
    pub fn channel_ids(&self) -> Vec<String> {
        self.channels.iter().map(|ch| ch.id().unwrap_or_default()).collect()
    }

    // Makes sure the buffer holds exactly `samples`, re-creating it if the
    // size changed.
    fn ensure_buffer(&mut self, samples: usize) -> Result<()> {
        if self.buf.as_ref().map(Buffer::capacity) != Some(samples) {
            // The old buffer has to be gone before the device takes a new one
            self.buf = None;
            log::debug!("Creating a buffer of {} samples", samples);
            self.buf = Some(self.dev.create_buffer(samples)?);
        }
        Ok(())
    }
}

impl SampleSource for DeviceSource {
    fn channel_count(&self) -> usize {
        self.channels.len()
    }

    fn read_block(&mut self, samples: usize) -> Result<Block> {
        self.ensure_buffer(samples)?;
        let buf = self.buf.as_mut().ok_or(Error::BadReturnSize)?;
        buf.refill()?;
        let buf = &*buf;

        let mut data = self
            .channels
            .iter()
            .map(|ch| ch.read_codes(buf))
            .collect::<Result<Vec<_>>>()?;

        if data.len() == 1 {
            Ok(Block::Flat(data.remove(0)))
        }
        else {
            Ok(Block::ChannelMajor(data))
        }
    }
}

impl Drop for DeviceSource {
    fn drop(&mut self) {
        self.buf = None;
        for chan in &self.channels {
            chan.disable();
        }
    }
}
