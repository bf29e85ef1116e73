// iio-eval/src/prompt.rs
//
// Copyright (c) 2018-2025, Frank Pagliughi
//
// Licensed under the MIT license:
//   <LICENSE or http://opensource.org/licenses/MIT>
// This file may not be copied, modified, or distributed except according
// to those terms.
//
//! Interactive console prompts.
//!
//! Prompts are generic over the input and output streams so that the
//! applications run them on stdin/stdout and the tests on byte buffers.

use std::io::{self, BufRead, Write};

use crate::calibration::{CalibrationKind, Operator};
use crate::capture::{SampleTarget, MAX_SAMPLE_COUNT, MIN_SAMPLE_COUNT};
use crate::{Error, Result};

/// A console on a pair of streams.
#[derive(Debug)]
pub struct Console<R, W> {
    input: R,
    output: W,
}

/// A console over the process's stdin and stdout.
pub type StdConsole = Console<io::StdinLock<'static>, io::Stdout>;

impl StdConsole {
    /// Creates a console on the process stdin/stdout
    pub fn stdio() -> Self {
        Console::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> Console<R, W> {
    /// Creates a console from an input and output stream
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Gets back the streams
    pub fn into_inner(self) -> (R, W) {
        (self.input, self.output)
    }

    /// Prints `msg` and reads one line, without the line terminator.
    /// The end of the input is an error.
    pub fn ask(&mut self, msg: &str) -> Result<String> {
        write!(self.output, "{}", msg)?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(Error::InvalidInput("end of console input".into()));
        }
        Ok(line.trim_end_matches(['\n', '\r']).to_string())
    }

    /// Prints a line
    pub fn say(&mut self, msg: &str) -> Result<()> {
        writeln!(self.output, "{}", msg)?;
        Ok(())
    }

    /// Asks for the number of samples to capture, until the entry is
    /// valid: `0` for continuous, or a count within the legal range.
    pub fn sample_target(&mut self) -> Result<SampleTarget> {
        loop {
            let entry = self.ask(&format!(
                "Enter the number of samples to be captured \n\
                 (0: Unlimited, {}-{}): ",
                MIN_SAMPLE_COUNT, MAX_SAMPLE_COUNT
            ))?;

            match entry.trim().parse::<usize>() {
                Ok(0) => return Ok(SampleTarget::Continuous),
                Ok(n) if (MIN_SAMPLE_COUNT..=MAX_SAMPLE_COUNT).contains(&n) => {
                    return Ok(SampleTarget::Finite(n))
                }
                _ => self.say("Invalid sample count")?,
            }
        }
    }

    /// Asks for the calibration type. An invalid choice is an error.
    pub fn calibration_kind(&mut self) -> Result<CalibrationKind> {
        self.say("Select Calibration Type:")?;
        self.say("  1. Internal Calibration")?;
        self.say("  2. System Calibration")?;
        let entry = self.ask("Enter choice: ")?;
        entry.parse().map_err(|err| {
            self.report("Invalid calibration type selected!!");
            err
        })
    }
}

impl<R: BufRead, W: Write> Operator for Console<R, W> {
    fn confirm(&mut self, msg: &str) -> Result<()> {
        self.ask(msg)?;
        Ok(())
    }

    fn weight_grams(&mut self) -> Result<u32> {
        loop {
            let entry = self.ask("\r\nApply the weight on loadcell and enter here (in grams): ")?;
            match entry.trim().parse::<i64>() {
                Ok(w) if w <= 0 => self.say("Please ensure weight is > 0!!")?,
                Ok(w) => match u32::try_from(w) {
                    Ok(w) => return Ok(w),
                    Err(_) => self.say("Invalid input")?,
                },
                Err(_) => self.say("Invalid input")?,
            }
        }
    }

    fn report(&mut self, msg: &str) {
        if let Err(err) = self.say(msg) {
            log::warn!("Console write failed: {}", err);
        }
    }
}

// --------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn console(input: &str) -> Console<&[u8], Vec<u8>> {
        Console::new(input.as_bytes(), Vec::new())
    }

    fn output(con: Console<&[u8], Vec<u8>>) -> String {
        String::from_utf8(con.into_inner().1).unwrap()
    }

    #[test]
    fn sample_count_retries_until_valid() {
        let mut con = console("10\nabc\n2000000\n1000\n");
        assert_eq!(con.sample_target().unwrap(), SampleTarget::Finite(1000));
        assert_eq!(output(con).matches("Invalid sample count").count(), 3);
    }

    #[test]
    fn sample_count_bounds_and_zero() {
        assert_eq!(console("0\n").sample_target().unwrap(), SampleTarget::Continuous);
        assert_eq!(console("50\n").sample_target().unwrap(), SampleTarget::Finite(50));
        assert_eq!(
            console("1000000\r\n").sample_target().unwrap(),
            SampleTarget::Finite(1_000_000)
        );
    }

    #[test]
    fn eof_is_an_error() {
        assert!(console("49\n").sample_target().is_err());
    }

    #[test]
    fn calibration_choice() {
        assert_eq!(console("1\n").calibration_kind().unwrap(), CalibrationKind::Internal);
        assert_eq!(console("2\n").calibration_kind().unwrap(), CalibrationKind::System);

        let mut con = console("7\n");
        assert!(con.calibration_kind().is_err());
        assert!(output(con).contains("Invalid calibration type"));
    }

    // Accepts everything except a line carrying the given text.
    struct Choked(&'static str);

    impl Write for Choked {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if String::from_utf8_lossy(buf).contains(self.0) {
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"));
            }
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn bad_choice_error_survives_failed_write() {
        let mut con = Console::new("9\n".as_bytes(), Choked("Invalid"));
        assert!(matches!(con.calibration_kind(), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn weight_must_be_positive() {
        let mut con = console("-5\n0\nten\n250\n");
        assert_eq!(con.weight_grams().unwrap(), 250);
        let out = output(con);
        assert_eq!(out.matches("Please ensure weight is > 0!!").count(), 2);
        assert_eq!(out.matches("Invalid input").count(), 1);
    }

    #[test]
    fn confirm_waits_for_a_line() {
        let mut con = console("\n");
        con.confirm("Apply zero-scale voltage").unwrap();
        assert!(con.confirm("again").is_err());
    }
}
