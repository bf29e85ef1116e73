// iio-eval/src/sink.rs
//
// Copyright (c) 2018-2025, Frank Pagliughi
//
// Licensed under the MIT license:
//   <LICENSE or http://opensource.org/licenses/MIT>
// This file may not be copied, modified, or distributed except according
// to those terms.
//
//! CSV output for captured samples.

use std::{
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
};

use crate::capture::RowSink;
use crate::Result;

/// The file name used when the caller doesn't pick one.
pub const DFLT_CAPTURE_FILE: &str = "adc_data_capture.csv";

/// Directory that holds functional-test artifacts.
pub const RESULT_DIR: &str = "output";

/// Gets the default capture path, `<dir>/adc_data_capture.csv`.
pub fn capture_path(dir: &Path) -> PathBuf {
    dir.join(DFLT_CAPTURE_FILE)
}

/// Gets the test-artifact path `<dir>/output/<device>_<tag>_RESULT.csv`,
/// creating the `output` directory if it doesn't exist.
pub fn result_path(dir: &Path, device: &str, tag: &str) -> Result<PathBuf> {
    let out = dir.join(RESULT_DIR);
    fs::create_dir_all(&out)?;
    Ok(out.join(format!("{}_{}_RESULT.csv", device, tag)))
}

/// Writes sample tuples as CSV rows under a `Ch 0 … Ch N-1` header.
///
/// The writer is flushed by [`CsvSink::finish`], and again when dropped,
/// so an early return still leaves a complete file behind.
#[derive(Debug)]
pub struct CsvSink<W: Write> {
    writer: csv::Writer<W>,
    n_chan: usize,
}

impl CsvSink<File> {
    /// Creates (truncating) the file at `path` and writes the header.
    pub fn create<P: AsRef<Path>>(path: P, n_chan: usize) -> Result<Self> {
        let path = path.as_ref();
        log::info!("CSV output: '{}'", path.display());
        let file = File::create(path)?;
        Self::new(file, n_chan)
    }
}

impl<W: Write> CsvSink<W> {
    /// Wraps a writer and writes the header for `n_chan` channels.
    pub fn new(wr: W, n_chan: usize) -> Result<Self> {
        let mut writer = csv::WriterBuilder::new().flexible(false).from_writer(wr);
        let header: Vec<String> = (0..n_chan).map(|i| format!("Ch {}", i)).collect();
        writer.write_record(&header)?;
        Ok(Self { writer, n_chan })
    }

    /// The number of columns per row
    pub fn channel_count(&self) -> usize {
        self.n_chan
    }

    /// Writes a row of already-scaled values
    pub fn write_values(&mut self, vals: &[f64]) -> Result<()> {
        self.writer.write_record(vals.iter().map(|v| v.to_string()))?;
        Ok(())
    }

    /// Flushes and returns the underlying writer.
    pub fn finish(mut self) -> Result<W> {
        self.writer.flush()?;
        self.writer
            .into_inner()
            .map_err(|err| crate::Error::Io(err.into_error()))
    }
}

impl<W: Write> RowSink for CsvSink<W> {
    fn write_rows(&mut self, rows: &[Vec<i64>]) -> Result<()> {
        for row in rows {
            self.writer.write_record(row.iter().map(|v| v.to_string()))?;
        }
        Ok(())
    }
}

// --------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_and_rows() {
        let mut sink = CsvSink::new(Vec::new(), 3).unwrap();
        sink.write_rows(&[vec![1, -2, 3], vec![4, 5, 6]]).unwrap();
        let out = String::from_utf8(sink.finish().unwrap()).unwrap();
        assert_eq!(out, "Ch 0,Ch 1,Ch 2\n1,-2,3\n4,5,6\n");
    }

    #[test]
    fn single_channel_column() {
        let mut sink = CsvSink::new(Vec::new(), 1).unwrap();
        sink.write_rows(&[vec![8388463], vec![8388460]]).unwrap();
        let out = String::from_utf8(sink.finish().unwrap()).unwrap();
        assert_eq!(out, "Ch 0\n8388463\n8388460\n");
    }

    #[test]
    fn row_width_must_match_header() {
        let mut sink = CsvSink::new(Vec::new(), 2).unwrap();
        assert!(sink.write_rows(&[vec![1]]).is_err());
    }

    #[test]
    fn result_path_creates_output_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = result_path(dir.path(), "DEV_AD4130", "VCOM").unwrap();
        assert!(dir.path().join("output").is_dir());
        assert_eq!(path, dir.path().join("output").join("DEV_AD4130_VCOM_RESULT.csv"));
        assert_eq!(capture_path(dir.path()), dir.path().join("adc_data_capture.csv"));
    }

    #[test]
    fn file_sink_flushes_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cap.csv");
        {
            let mut sink = CsvSink::create(&path, 1).unwrap();
            sink.write_rows(&[vec![7]]).unwrap();
        }
        assert_eq!(fs::read_to_string(&path).unwrap(), "Ch 0\n7\n");
    }
}
