// iio-eval/src/capture.rs
//
// Copyright (c) 2018-2025, Frank Pagliughi
//
// Licensed under the MIT license:
//   <LICENSE or http://opensource.org/licenses/MIT>
// This file may not be copied, modified, or distributed except according
// to those terms.
//
//! Chunked streaming capture.
//!
//! The evaluation firmware can only return a limited number of samples per
//! request: its RAM holds one block, and a slow block can outlast the
//! client timeout. A larger capture is therefore split into blocks no
//! bigger than a ceiling. Each block is reshaped into sample tuples (one
//! value per enabled channel) and handed to a [`RowSink`].
//!
//! The loop is cooperative: a [`CancelToken`] is checked once between
//! blocks, never in the middle of one.

use std::{
    fmt,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use crate::{Error, Result};

/// The block ceiling used by the firmware images unless told otherwise.
pub const DFLT_BLOCK_SIZE: usize = 400;

/// Smallest finite sample count accepted at the console prompt.
pub const MIN_SAMPLE_COUNT: usize = 50;

/// Largest finite sample count accepted at the console prompt.
pub const MAX_SAMPLE_COUNT: usize = 1_000_000;

// --------------------------------------------------------------------------

/// How many samples a session should capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleTarget {
    /// A fixed number of samples (per channel)
    Finite(usize),
    /// Keep going until cancelled
    Continuous,
}

impl SampleTarget {
    /// Converts a console entry: `0` means continuous.
    pub fn from_count(n: usize) -> Self {
        if n == 0 {
            SampleTarget::Continuous
        }
        else {
            SampleTarget::Finite(n)
        }
    }
}

impl fmt::Display for SampleTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SampleTarget::Finite(n) => write!(f, "{} samples", n),
            SampleTarget::Continuous => write!(f, "continuous"),
        }
    }
}

/// The block schedule for a capture session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapturePlan {
    target: SampleTarget,
    ceiling: usize,
}

impl CapturePlan {
    /// Creates a plan for the target with the firmware's block ceiling.
    pub fn new(target: SampleTarget, ceiling: usize) -> Result<Self> {
        if ceiling == 0 {
            return Err(Error::InvalidInput("block size must be non-zero".into()));
        }
        if target == SampleTarget::Finite(0) {
            return Err(Error::InvalidInput("sample count must be non-zero".into()));
        }
        Ok(Self { target, ceiling })
    }

    /// The capture target
    pub fn target(&self) -> SampleTarget {
        self.target
    }

    /// The largest block ever requested
    pub fn ceiling(&self) -> usize {
        self.ceiling
    }

    /// The size of the device buffer to allocate: the whole capture if it
    /// fits in one block, otherwise the ceiling.
    pub fn buffer_size(&self) -> usize {
        match self.target {
            SampleTarget::Finite(n) => n.min(self.ceiling),
            SampleTarget::Continuous => self.ceiling,
        }
    }

    /// The number of blocks for a finite capture, `None` if continuous.
    pub fn iterations(&self) -> Option<usize> {
        match self.target {
            SampleTarget::Finite(n) if n <= self.ceiling => Some(1),
            SampleTarget::Finite(n) => Some(n / self.ceiling + usize::from(n % self.ceiling != 0)),
            SampleTarget::Continuous => None,
        }
    }

    /// The size of block `idx`.
    ///
    /// Every block is at the ceiling except the last block of a finite
    /// capture, which takes the remainder.
    pub fn block_size(&self, idx: usize) -> usize {
        match self.target {
            SampleTarget::Finite(n) => {
                let done = idx.saturating_mul(self.ceiling);
                n.saturating_sub(done).min(self.ceiling)
            }
            SampleTarget::Continuous => self.ceiling,
        }
    }

    /// Iterates the block sizes of a finite capture.
    /// For a continuous capture this never ends.
    pub fn blocks(&self) -> impl Iterator<Item = usize> + '_ {
        (0..)
            .map(move |i| self.block_size(i))
            .take_while(|&n| n > 0)
    }
}

// --------------------------------------------------------------------------

/// One block of raw codes as the device returned it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    /// The samples of a single channel
    Flat(Vec<i64>),
    /// One vector per channel, each holding that channel's samples
    ChannelMajor(Vec<Vec<i64>>),
}

impl Block {
    /// Number of samples per channel
    pub fn len(&self) -> usize {
        match self {
            Block::Flat(v) => v.len(),
            Block::ChannelMajor(chans) => chans.first().map_or(0, |c| c.len()),
        }
    }

    /// Determines if the block holds no samples
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reshapes the block into rows of sample tuples.
    ///
    /// A flat block becomes an N×1 column. A channel-major C×N block is
    /// transposed to N×C.
    pub fn into_rows(self) -> Result<Vec<Vec<i64>>> {
        match self {
            Block::Flat(v) => Ok(v.into_iter().map(|x| vec![x]).collect()),
            Block::ChannelMajor(chans) => {
                let n = chans.first().map_or(0, |c| c.len());
                for (channel, c) in chans.iter().enumerate() {
                    if c.len() != n {
                        return Err(Error::RaggedBlock { channel, len: c.len(), expected: n });
                    }
                }
                Ok((0..n)
                    .map(|i| chans.iter().map(|c| c[i]).collect())
                    .collect())
            }
        }
    }
}

/// Something that can produce blocks of samples on request.
pub trait SampleSource {
    /// The number of enabled channels in each block
    fn channel_count(&self) -> usize;

    /// Reads one block of `samples` samples per channel.
    /// Callers never ask for more than the plan's ceiling.
    fn read_block(&mut self, samples: usize) -> Result<Block>;
}

/// Somewhere to put the reshaped rows.
pub trait RowSink {
    /// Appends rows of sample tuples
    fn write_rows(&mut self, rows: &[Vec<i64>]) -> Result<()>;
}

// --------------------------------------------------------------------------

/// A shared cancellation flag.
///
/// Listeners only ever set it; the capture loop reads it between blocks.
/// No lock is needed: a late read costs at most one extra block.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Creates a token in the "not cancelled" state
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Determines if cancellation has been requested
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Clears any earlier request
    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

// --------------------------------------------------------------------------

/// The phases of a capture session, reported through the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    /// Nothing requested yet
    Idle,
    /// Channels and buffer size being set up
    Configuring,
    /// Blocks being read
    Iterating,
    /// Finished or cancelled
    Done,
}

/// What a finished capture did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CaptureSummary {
    /// Blocks read
    pub blocks: usize,
    /// Rows written to the sink
    pub rows: usize,
    /// Whether the loop stopped on the cancellation flag
    pub cancelled: bool,
}

/// Runs the capture loop.
///
/// Finite plans read their scheduled blocks; continuous plans read until
/// the token is set. A token that is already set when the loop starts
/// stops a continuous capture before its first block. `on_block` is
/// called after every block with the running block count, for progress
/// feedback.
pub fn run<S, K, F>(
    source: &mut S,
    sink: &mut K,
    plan: &CapturePlan,
    cancel: &CancelToken,
    mut on_block: F,
) -> Result<CaptureSummary>
where
    S: SampleSource + ?Sized,
    K: RowSink + ?Sized,
    F: FnMut(usize),
{
    let mut state = CaptureState::Idle;
    let mut summary = CaptureSummary::default();

    let mut transition = |to: CaptureState| {
        log::info!("capture: {:?} -> {:?}", state, to);
        state = to;
    };

    transition(CaptureState::Configuring);
    log::info!(
        "capture: {} on {} channel(s), blocks of at most {}",
        plan.target(),
        source.channel_count(),
        plan.ceiling()
    );
    if let Some(n) = plan.iterations() {
        log::info!("capture: {} block(s) scheduled", n);
    }

    transition(CaptureState::Iterating);

    let mut capture_block = |n: usize, summary: &mut CaptureSummary| -> Result<()> {
        let block = source.read_block(n)?;
        let rows = block.into_rows()?;
        log::debug!("capture: block {} of {} sample(s)", summary.blocks, rows.len());
        sink.write_rows(&rows)?;
        summary.blocks += 1;
        summary.rows += rows.len();
        on_block(summary.blocks);
        Ok(())
    };

    match plan.target() {
        SampleTarget::Finite(_) => {
            for n in plan.blocks() {
                capture_block(n, &mut summary)?;
            }
        }
        SampleTarget::Continuous => {
            while !cancel.is_cancelled() {
                capture_block(plan.ceiling(), &mut summary)?;
            }
            summary.cancelled = true;
        }
    }

    transition(CaptureState::Done);
    Ok(summary)
}

/// Console progress: one dot per block, a fresh line every 100 blocks.
#[derive(Debug, Default)]
pub struct DotProgress {
    line: usize,
}

impl DotProgress {
    /// Creates the progress printer
    pub fn new() -> Self {
        Self::default()
    }

    /// Prints progress for one more block
    pub fn tick(&mut self) {
        if self.line == 0 {
            println!("Data capture started >>");
        }
        print!("{}\r", ".".repeat(self.line));
        self.line += 1;
        if self.line == 100 {
            self.line = 1;
            println!();
        }
    }
}

// --------------------------------------------------------------------------
