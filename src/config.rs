// iio-eval/src/config.rs
//
// Copyright (c) 2018-2025, Frank Pagliughi
//
// Licensed under the MIT license:
//   <LICENSE or http://opensource.org/licenses/MIT>
// This file may not be copied, modified, or distributed except according
// to those terms.
//
//! Session configuration: the transport URI and an optional TOML file.
//!
//! A session file looks like:
//!
//! ```toml
//! uri = "serial:/dev/ttyACM0,230400"
//! device = "ad4130-8"
//! channels = ["voltage0", "voltage1"]
//! block_size = 400
//! timeout_ms = 100000
//! output = "capture.csv"
//! ```
//!
//! Every field is optional. Values given on the command line win over the
//! ones in the file.

use std::{
    fmt, fs,
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};

use serde::{Deserialize, Serialize};

use crate::capture::DFLT_BLOCK_SIZE;
use crate::{Error, Result};

/// The default IIO context timeout, in milliseconds.
pub const DFLT_TIMEOUT_MS: u32 = 100_000;

const SERIAL_SCHEME: &str = "serial:";

/// A libiio serial-backend URI: `serial:<port>,<baud>[,<mode>]`.
///
/// The mode is the libiio framing string, like `8n1`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SerialUri {
    port: String,
    baud: u32,
    mode: Option<String>,
}

impl SerialUri {
    /// Creates a URI for the port at the baud rate
    pub fn new(port: &str, baud: u32) -> Self {
        Self { port: port.to_string(), baud, mode: None }
    }

    /// The serial port name, like `COM12` or `/dev/ttyACM0`
    pub fn port(&self) -> &str {
        &self.port
    }

    /// The baud rate
    pub fn baud(&self) -> u32 {
        self.baud
    }

    /// The framing mode, if one was given
    pub fn mode(&self) -> Option<&str> {
        self.mode.as_deref()
    }
}

impl FromStr for SerialUri {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let bad = |reason: &str| Error::Uri { uri: s.to_string(), reason: reason.to_string() };

        let rest = s.strip_prefix(SERIAL_SCHEME).ok_or_else(|| bad("expected a 'serial:' URI"))?;
        let mut parts = rest.split(',').map(str::trim);

        let port = match parts.next() {
            Some(p) if !p.is_empty() => p.to_string(),
            _ => return Err(bad("missing port")),
        };

        let baud = parts
            .next()
            .ok_or_else(|| bad("missing baud rate"))?
            .parse::<u32>()
            .ok()
            .filter(|b| *b > 0)
            .ok_or_else(|| bad("baud rate must be a positive integer"))?;

        let mode = match parts.next() {
            Some(m) if m.is_empty() => return Err(bad("empty mode")),
            Some(m) => Some(m.to_string()),
            None => None,
        };

        if parts.next().is_some() {
            return Err(bad("too many fields"));
        }
        Ok(Self { port, baud, mode })
    }
}

impl TryFrom<String> for SerialUri {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<SerialUri> for String {
    fn from(uri: SerialUri) -> Self {
        uri.to_string()
    }
}

impl fmt::Display for SerialUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{},{}", SERIAL_SCHEME, self.port, self.baud)?;
        if let Some(mode) = &self.mode {
            write!(f, ",{}", mode)?;
        }
        Ok(())
    }
}

// --------------------------------------------------------------------------

/// Settings for one session with an evaluation board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    /// Where the board is attached
    pub uri: Option<SerialUri>,
    /// The IIO device name
    pub device: Option<String>,
    /// Channels to use; empty selects all of them
    pub channels: Vec<String>,
    /// The largest block read from the device at once
    pub block_size: usize,
    /// IIO context timeout, in milliseconds
    pub timeout_ms: u32,
    /// Output file
    pub output: Option<PathBuf>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            uri: None,
            device: None,
            channels: Vec::new(),
            block_size: DFLT_BLOCK_SIZE,
            timeout_ms: DFLT_TIMEOUT_MS,
            output: None,
        }
    }
}

impl SessionConfig {
    /// Reads a session file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        log::debug!("Loading session file '{}'", path.display());
        let text = fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    /// Reads the session file, if one was given, otherwise the defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        path.map_or_else(|| Ok(Self::default()), Self::load)
    }

    /// Parses the TOML text of a session file.
    pub fn from_toml(text: &str) -> Result<Self> {
        let cfg: Self = toml::from_str(text)?;
        if cfg.block_size == 0 {
            return Err(Error::InvalidInput("block_size must be > 0".into()));
        }
        Ok(cfg)
    }

    /// The context timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(u64::from(self.timeout_ms))
    }
}

// --------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uri_parse() {
        let uri: SerialUri = "serial:COM12,230400".parse().unwrap();
        assert_eq!(uri.port(), "COM12");
        assert_eq!(uri.baud(), 230400);
        assert_eq!(uri.mode(), None);
        assert_eq!(uri.to_string(), "serial:COM12,230400");

        let uri: SerialUri = "serial:/dev/ttyACM0,115200,8n1".parse().unwrap();
        assert_eq!(uri.mode(), Some("8n1"));
        assert_eq!(uri.to_string(), "serial:/dev/ttyACM0,115200,8n1");
    }

    #[test]
    fn uri_rejects() {
        for s in [
            "ip:192.168.2.1",
            "serial:",
            "serial:,9600",
            "serial:COM3",
            "serial:COM3,fast",
            "serial:COM3,0",
            "serial:COM3,9600,",
            "serial:COM3,9600,8n1,x",
        ] {
            assert!(matches!(s.parse::<SerialUri>(), Err(Error::Uri { .. })), "{}", s);
        }
    }

    #[test]
    fn session_file() {
        let cfg = SessionConfig::from_toml(
            r#"
            uri = "serial:COM12,230400"
            device = "ad4130-8"
            channels = ["voltage0", "voltage3"]
            output = "cap.csv"
            "#,
        )
        .unwrap();

        assert_eq!(cfg.uri, Some(SerialUri::new("COM12", 230400)));
        assert_eq!(cfg.device.as_deref(), Some("ad4130-8"));
        assert_eq!(cfg.channels, ["voltage0", "voltage3"]);
        assert_eq!(cfg.block_size, DFLT_BLOCK_SIZE);
        assert_eq!(cfg.timeout(), Duration::from_secs(100));
        assert_eq!(cfg.output, Some(PathBuf::from("cap.csv")));
    }

    #[test]
    fn session_file_errors() {
        assert!(matches!(
            SessionConfig::from_toml("uri = \"tcp:1.2.3.4\""),
            Err(Error::Config(_))
        ));
        assert!(SessionConfig::from_toml("colour = 3").is_err());
        assert!(SessionConfig::from_toml("block_size = 0").is_err());
    }

    #[test]
    fn load_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.toml");
        fs::write(&path, "block_size = 256\ntimeout_ms = 5000\n").unwrap();

        let cfg = SessionConfig::load_or_default(Some(path.as_path())).unwrap();
        assert_eq!(cfg.block_size, 256);
        assert_eq!(cfg.timeout_ms, 5000);

        assert_eq!(SessionConfig::load_or_default(None).unwrap(), SessionConfig::default());
    }
}
