// iio-eval/src/console.rs
//
// Copyright (c) 2018-2025, Frank Pagliughi
//
// Licensed under the MIT license:
//   <LICENSE or http://opensource.org/licenses/MIT>
// This file may not be copied, modified, or distributed except according
// to those terms.
//
//! Scripted checks against the menu-driven console firmware.
//!
//! The console firmware images print a menu over the serial port and
//! respond to key presses. A check script sends keys, waits, and matches
//! the response with a regular expression:
//!
//! ```toml
//! name = "die temperature"
//!
//! [[step]]
//! send = "\\x1b"
//!
//! [[step]]
//! send = "t"
//! settle_ms = 200
//! expect = 'Temperature: (-?[0-9.]+)'
//! range = [0.0, 60.0]
//! ```

use std::{
    fmt, fs,
    io::{self, Read, Write},
    path::Path,
    thread,
    time::Duration,
};

use regex::Regex;
use serde::Deserialize;
use serialport::SerialPort;

use crate::config::SerialUri;
use crate::{Error, Result};

/// The serial read timeout that ends a response.
pub const DFLT_READ_TIMEOUT: Duration = Duration::from_millis(500);

/// The most lines collected for one response.
pub const DFLT_LINE_BUDGET: usize = 500;

/// A conversation with the console firmware over a byte port.
pub struct ConsoleSession<P: Read + Write> {
    port: P,
    line_budget: usize,
    lines: Vec<String>,
}

impl<P: Read + Write> fmt::Debug for ConsoleSession<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConsoleSession")
            .field("line_budget", &self.line_budget)
            .field("lines", &self.lines.len())
            .finish()
    }
}

impl ConsoleSession<Box<dyn SerialPort>> {
    /// Opens the serial port named by the URI.
    pub fn open(uri: &SerialUri, timeout: Duration) -> Result<Self> {
        log::info!("Opening console on {}", uri);
        let port = serialport::new(uri.port(), uri.baud()).timeout(timeout).open()?;
        Ok(Self::new(port))
    }
}

impl<P: Read + Write> ConsoleSession<P> {
    /// Creates a session on an open port
    pub fn new(port: P) -> Self {
        Self { port, line_budget: DFLT_LINE_BUDGET, lines: Vec::new() }
    }

    /// Sets the most lines collected for a single response
    pub fn line_budget(mut self, n: usize) -> Self {
        self.line_budget = n;
        self
    }

    /// The lines collected since the last send
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Gets back the port
    pub fn into_inner(self) -> P {
        self.port
    }

    /// Discards anything the firmware has already sent.
    pub fn clear(&mut self) -> Result<()> {
        let mut buf = [0u8; 256];
        loop {
            match self.port.read(&mut buf) {
                Ok(0) => return Ok(()),
                Ok(_) => continue,
                Err(err) if is_quiet(&err) => return Ok(()),
                Err(err) => return Err(err.into()),
            }
        }
    }

    /// Sends key bytes and forgets the previous response.
    pub fn send(&mut self, keys: &[u8]) -> Result<()> {
        log::debug!("console <- {:?}", String::from_utf8_lossy(keys));
        self.lines.clear();
        self.port.write_all(keys)?;
        self.port.flush()?;
        Ok(())
    }

    /// Reads lines until the port goes quiet or the line budget is spent.
    /// Returns the lines read by this call.
    pub fn read_lines(&mut self) -> Result<&[String]> {
        let start = self.lines.len();
        let mut pending = Vec::new();
        let mut buf = [0u8; 256];

        'read: while self.lines.len() - start < self.line_budget {
            let n = match self.port.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(err) if is_quiet(&err) => break,
                Err(err) => return Err(err.into()),
            };

            for &b in &buf[..n] {
                if b == b'\n' {
                    self.push_line(&pending);
                    pending.clear();
                    if self.lines.len() - start >= self.line_budget {
                        break 'read;
                    }
                }
                else {
                    pending.push(b);
                }
            }
        }

        if !pending.is_empty() && self.lines.len() - start < self.line_budget {
            self.push_line(&pending);
        }
        Ok(&self.lines[start..])
    }

    fn push_line(&mut self, bytes: &[u8]) {
        let line = String::from_utf8_lossy(bytes).trim_end_matches('\r').to_string();
        log::trace!("console -> {}", line);
        self.lines.push(line);
    }

    /// Searches the collected lines for the pattern.
    /// Returns the capture groups of the first match, the whole match at
    /// index 0.
    pub fn expect(&self, pattern: &Regex) -> Result<Vec<String>> {
        self.lines
            .iter()
            .find_map(|line| pattern.captures(line))
            .map(|caps| {
                caps.iter()
                    .map(|m| m.map(|m| m.as_str().to_string()).unwrap_or_default())
                    .collect()
            })
            .ok_or_else(|| Error::PatternNotFound(pattern.as_str().to_string()))
    }
}

fn is_quiet(err: &io::Error) -> bool {
    matches!(err.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock)
}

// --------------------------------------------------------------------------

/// Decodes the escapes in a `send` string: `\xNN`, `\r`, `\n`, `\t`, `\\`.
pub fn unescape(s: &str) -> Result<Vec<u8>> {
    let bad = || Error::InvalidInput(format!("bad escape in '{}'", s));
    let mut out = Vec::with_capacity(s.len());
    let mut chars = s.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            let mut buf = [0u8; 4];
            out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
            continue;
        }
        match chars.next().ok_or_else(bad)? {
            'r' => out.push(b'\r'),
            'n' => out.push(b'\n'),
            't' => out.push(b'\t'),
            '\\' => out.push(b'\\'),
            'x' => {
                let hex: String = chars.by_ref().take(2).collect();
                if hex.len() != 2 {
                    return Err(bad());
                }
                out.push(u8::from_str_radix(&hex, 16).map_err(|_| bad())?);
            }
            _ => return Err(bad()),
        }
    }
    Ok(out)
}

/// One step of a check script.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Step {
    /// Keys to send, with escapes
    pub send: String,
    /// Time to wait before reading the response
    pub settle_ms: u64,
    /// A pattern the response must contain
    pub expect: Option<String>,
    /// Limits for the first capture group of `expect`
    pub range: Option<[f64; 2]>,
}

/// A check script: an ordered list of steps.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CheckScript {
    /// A name for the report
    #[serde(default)]
    pub name: Option<String>,
    /// The steps, in order
    #[serde(rename = "step", default)]
    pub steps: Vec<Step>,
}

/// The outcome of one passing step.
#[derive(Debug, Clone, PartialEq)]
pub struct StepOutcome {
    /// Index of the step in the script
    pub index: usize,
    /// Capture groups of the `expect` match, if there was one
    pub captures: Vec<String>,
    /// The value checked against `range`
    pub value: Option<f64>,
}

impl CheckScript {
    /// Reads a script file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Ok(toml::from_str(&text)?)
    }

    /// Runs the steps in order, stopping at the first failure.
    pub fn run<P: Read + Write>(&self, session: &mut ConsoleSession<P>) -> Result<Vec<StepOutcome>> {
        session.clear()?;
        let mut outcomes = Vec::with_capacity(self.steps.len());

        for (index, step) in self.steps.iter().enumerate() {
            // Compile up front so a bad pattern fails before touching the port
            let pattern = step.expect.as_deref().map(Regex::new).transpose()?;

            session.send(&unescape(&step.send)?)?;
            if step.settle_ms > 0 {
                thread::sleep(Duration::from_millis(step.settle_ms));
            }
            session.read_lines()?;

            let captures = match &pattern {
                Some(re) => session.expect(re)?,
                None => Vec::new(),
            };

            let value = match step.range {
                Some([min, max]) => {
                    let text = captures.get(1).ok_or_else(|| {
                        Error::InvalidInput(format!("step {}: range needs a capture group", index))
                    })?;
                    let value: f64 = text.trim().parse().map_err(|_| {
                        Error::InvalidInput(format!("step {}: '{}' is not a number", index, text))
                    })?;
                    if !(min..=max).contains(&value) {
                        return Err(Error::OutOfRange { value, min, max });
                    }
                    Some(value)
                }
                None => None,
            };

            log::info!("step {}: pass", index);
            outcomes.push(StepOutcome { index, captures, value });
        }
        Ok(outcomes)
    }
}

// --------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    // A port that replies with canned text and records what was sent.
    struct LoopPort {
        rx: Cursor<Vec<u8>>,
        tx: Vec<u8>,
    }

    impl LoopPort {
        fn new(reply: &str) -> Self {
            Self { rx: Cursor::new(reply.as_bytes().to_vec()), tx: Vec::new() }
        }
    }

    impl Read for LoopPort {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.rx.read(buf)? {
                0 => Err(io::ErrorKind::TimedOut.into()),
                n => Ok(n),
            }
        }
    }

    impl Write for LoopPort {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.tx.write(buf)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn escapes() {
        assert_eq!(unescape("\\x1b").unwrap(), vec![0x1b]);
        assert_eq!(unescape("a\\r\\n").unwrap(), b"a\r\n".to_vec());
        assert_eq!(unescape("\\\\").unwrap(), b"\\".to_vec());
        assert!(unescape("\\x1").is_err());
        assert!(unescape("\\q").is_err());
        assert!(unescape("\\").is_err());
    }

    #[test]
    fn lines_and_expect() {
        let port = LoopPort::new("Main Menu\r\n\tVref: 2.500 V\r\nLast line");
        let mut con = ConsoleSession::new(port);
        con.send(b"v").unwrap();

        let lines = con.read_lines().unwrap().to_vec();
        assert_eq!(lines, ["Main Menu", "\tVref: 2.500 V", "Last line"]);

        let re = Regex::new(r"Vref: ([0-9.]+)").unwrap();
        assert_eq!(con.expect(&re).unwrap(), ["Vref: 2.500", "2.500"]);

        let missing = Regex::new("Temperature").unwrap();
        assert!(matches!(con.expect(&missing), Err(Error::PatternNotFound(_))));
        assert_eq!(con.into_inner().tx, b"v");
    }

    #[test]
    fn line_budget_stops_early() {
        let port = LoopPort::new("a\nb\nc\nd\n");
        let mut con = ConsoleSession::new(port).line_budget(2);
        assert_eq!(con.read_lines().unwrap(), ["a", "b"]);
    }

    // A port that only answers once a key has been sent.
    struct Responder {
        reply: Vec<u8>,
        armed: bool,
    }

    impl Responder {
        fn new(reply: &str) -> Self {
            Self { reply: reply.as_bytes().to_vec(), armed: false }
        }
    }

    impl Read for Responder {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if !self.armed || self.reply.is_empty() {
                return Err(io::ErrorKind::TimedOut.into());
            }
            let n = self.reply.len().min(buf.len());
            buf[..n].copy_from_slice(&self.reply[..n]);
            self.reply.drain(..n);
            Ok(n)
        }
    }

    impl Write for Responder {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.armed = true;
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn script_passes_and_checks_range() {
        let script: CheckScript = toml::from_str(
            r#"
            name = "temperature"

            [[step]]
            send = "t\r"
            expect = 'Temperature: (-?[0-9.]+) C'
            range = [0.0, 60.0]
            "#,
        )
        .unwrap();
        assert_eq!(script.steps.len(), 1);
        assert_eq!(unescape(&script.steps[0].send).unwrap(), b"t\r");

        let mut con = ConsoleSession::new(Responder::new("Temperature: 24.5 C\r\n"));
        let out = script.run(&mut con).unwrap();
        assert_eq!(out[0].value, Some(24.5));
        assert_eq!(out[0].captures[1], "24.5");

        // Output already pending before the first step is discarded
        let mut con = ConsoleSession::new(LoopPort::new("Temperature: 24.5 C\r\n"));
        assert!(matches!(script.run(&mut con), Err(Error::PatternNotFound(_))));
    }

    #[test]
    fn script_out_of_range() {
        let script = CheckScript {
            name: None,
            steps: vec![Step {
                send: "t".into(),
                expect: Some(r"T=([0-9]+)".into()),
                range: Some([0.0, 10.0]),
                ..Step::default()
            }],
        };

        let mut con = ConsoleSession::new(Responder::new("T=42\n"));
        match script.run(&mut con) {
            Err(Error::OutOfRange { value, .. }) => assert_eq!(value, 42.0),
            other => panic!("unexpected: {:?}", other),
        }
    }
}
