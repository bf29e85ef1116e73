// iio-eval/src/mock.rs
//
// Copyright (c) 2018-2025, Frank Pagliughi
//
// Licensed under the MIT license:
//   <LICENSE or http://opensource.org/licenses/MIT>
// This file may not be copied, modified, or distributed except according
// to those terms.
//
//! In-memory stand-ins for the firmware, used by the unit tests.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};

use crate::attr::{AttrTransport, Scope};
use crate::capture::{Block, SampleSource};
use crate::{Error, Result};

type Key = (String, String);

/// An attribute map with scripted readbacks and a write log.
#[derive(Debug, Default)]
pub(crate) struct MockFirmware {
    channels: Vec<String>,
    values: RefCell<HashMap<Key, String>>,
    queued: RefCell<HashMap<Key, VecDeque<String>>>,
    writes: RefCell<Vec<(String, String, String)>>,
}

fn key(scope: Scope<'_>, attr: &str) -> Key {
    (scope.to_string(), attr.to_string())
}

impl MockFirmware {
    pub fn new(channels: &[&str]) -> Self {
        Self {
            channels: channels.iter().map(|s| s.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn with_dev_attr(self, attr: &str, val: &str) -> Self {
        self.values.borrow_mut().insert(key(Scope::Device, attr), val.to_string());
        self
    }

    pub fn with_chan_attr(self, chan: &str, attr: &str, val: &str) -> Self {
        self.values
            .borrow_mut()
            .insert(key(Scope::Channel(chan), attr), val.to_string());
        self
    }

    /// Queues values returned by the next reads of the attribute,
    /// ahead of whatever was written.
    pub fn queue_chan_reads(&self, chan: &str, attr: &str, vals: &[&str]) {
        self.queued
            .borrow_mut()
            .entry(key(Scope::Channel(chan), attr))
            .or_default()
            .extend(vals.iter().map(|s| s.to_string()));
    }

    pub fn writes(&self) -> Vec<(String, String, String)> {
        self.writes.borrow().clone()
    }

    fn check_scope(&self, scope: Scope<'_>) -> Result<()> {
        match scope {
            Scope::Channel(id) if !self.channels.iter().any(|c| c == id) => {
                Err(Error::ChannelNotFound(id.to_string()))
            }
            _ => Ok(()),
        }
    }
}

impl AttrTransport for MockFirmware {
    fn read_attr(&self, scope: Scope<'_>, attr: &str) -> Result<String> {
        self.check_scope(scope)?;
        let k = key(scope, attr);

        if let Some(val) = self.queued.borrow_mut().get_mut(&k).and_then(|q| q.pop_front()) {
            return Ok(val);
        }
        self.values
            .borrow()
            .get(&k)
            .cloned()
            .ok_or_else(|| Error::General(format!("No attribute '{}' on {}", attr, scope)))
    }

    fn write_attr(&self, scope: Scope<'_>, attr: &str, val: &str) -> Result<()> {
        self.check_scope(scope)?;
        self.writes
            .borrow_mut()
            .push((scope.to_string(), attr.to_string(), val.to_string()));
        self.values.borrow_mut().insert(key(scope, attr), val.to_string());
        Ok(())
    }
}

// --------------------------------------------------------------------------

/// A sample source that counts up, one code per sample, and records the
/// size of every block requested.
#[derive(Debug)]
pub(crate) struct CountingSource {
    pub n_chan: usize,
    pub requests: Vec<usize>,
    next: i64,
}

impl CountingSource {
    pub fn new(n_chan: usize) -> Self {
        Self { n_chan, requests: Vec::new(), next: 0 }
    }
}

impl SampleSource for CountingSource {
    fn channel_count(&self) -> usize {
        self.n_chan
    }

    fn read_block(&mut self, samples: usize) -> Result<Block> {
        self.requests.push(samples);
        if self.n_chan == 1 {
            let v = (0..samples as i64).map(|i| self.next + i).collect();
            self.next += samples as i64;
            return Ok(Block::Flat(v));
        }

        // Channel `c` of sample `i` carries `1000 * c + running index`
        let data = (0..self.n_chan as i64)
            .map(|c| (0..samples as i64).map(|i| 1000 * c + self.next + i).collect())
            .collect();
        self.next += samples as i64;
        Ok(Block::ChannelMajor(data))
    }
}
