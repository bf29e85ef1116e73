// iio-eval/src/cancel.rs
//
// Copyright (c) 2018-2025, Frank Pagliughi
//
// Licensed under the MIT license:
//   <LICENSE or http://opensource.org/licenses/MIT>
// This file may not be copied, modified, or distributed except according
// to those terms.
//
//! Operator cancellation of long-running loops.
//!
//! The loops poll a [`CancelToken`]. The token is set from a background
//! thread when the operator presses Enter, or from the Ctrl-C handler.

use std::{
    io::{self, BufRead},
    thread,
};

use crate::capture::CancelToken;
use crate::{Error, Result};

/// Sets the token on Ctrl-C.
///
/// The process can only have one handler, so this should be called once,
/// early in `main()`.
pub fn cancel_on_ctrlc(token: &CancelToken) -> Result<()> {
    let token = token.clone();
    ctrlc::set_handler(move || {
        log::info!("Interrupted");
        token.cancel();
    })
    .map_err(|err| Error::General(format!("Unable to install the Ctrl-C handler: {}", err)))
}

/// Watches a line-oriented input in a background thread and sets the
/// token each time a line (or the end of the input) arrives.
///
/// The thread owns the input until it closes, so any prompts have to be
/// finished before it's started.
pub fn cancel_on_line<R>(input: R, token: &CancelToken) -> thread::JoinHandle<()>
where
    R: BufRead + Send + 'static,
{
    let token = token.clone();
    thread::spawn(move || {
        for line in input.lines() {
            if line.is_err() {
                break;
            }
            log::debug!("Key pressed");
            token.cancel();
        }
        token.cancel();
    })
}

/// Watches stdin for the Enter key.
pub fn cancel_on_enter(token: &CancelToken) -> thread::JoinHandle<()> {
    cancel_on_line(io::BufReader::new(io::stdin()), token)
}

// --------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn line_sets_token() {
        let token = CancelToken::new();
        let thr = cancel_on_line(Cursor::new(b"\n".to_vec()), &token);
        thr.join().unwrap();
        assert!(token.is_cancelled());
    }

    #[test]
    fn closed_input_sets_token() {
        let token = CancelToken::new();
        cancel_on_line(Cursor::new(Vec::new()), &token).join().unwrap();
        assert!(token.is_cancelled());
    }
}
