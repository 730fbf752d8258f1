//! Line input shared by the lobby prompts and the text client.
//!
//! One thread reads stdin for the whole process, and only when a line has
//! been asked for. A read abandoned midway (the session closed while a
//! command was being typed) hands its line to the next caller, and nothing
//! reads stdin while the TUI owns the terminal.

use std::{
    io::{self, BufRead, BufReader},
    sync::mpsc as std_mpsc,
    thread,
};
use tokio::sync::mpsc;

type LineResult = io::Result<Option<String>>;

pub struct InputLines {
    requests: std_mpsc::Sender<()>,
    lines: mpsc::UnboundedReceiver<LineResult>,
    /// A line was requested and has not been returned yet.
    pending: bool,
}

impl InputLines {
    pub fn stdin() -> io::Result<Self> {
        Self::from_reader(BufReader::new(io::stdin()))
    }

    pub fn from_reader<R>(mut reader: R) -> io::Result<Self>
    where
        R: BufRead + Send + 'static,
    {
        let (requests, rx_requests) = std_mpsc::channel::<()>();
        let (tx_lines, lines) = mpsc::unbounded_channel::<LineResult>();

        thread::Builder::new()
            .name("input".to_string())
            .spawn(move || {
                while rx_requests.recv().is_ok() {
                    let mut line = String::new();
                    let result = match reader.read_line(&mut line) {
                        Ok(0) => Ok(None),
                        Ok(_) => Ok(Some(line.trim_end_matches(['\r', '\n']).to_string())),
                        Err(e) => Err(e),
                    };
                    if tx_lines.send(result).is_err() {
                        break;
                    }
                }
            })?;

        Ok(Self {
            requests,
            lines,
            pending: false,
        })
    }

    /// Next line without its line ending, or `None` at end of input.
    ///
    /// Cancel safe: when the future is dropped before it completes, the line
    /// being read is returned by the following call.
    pub async fn next_line(&mut self) -> io::Result<Option<String>> {
        if !self.pending {
            if self.requests.send(()).is_err() {
                return Ok(None);
            }
            self.pending = true;
        }
        let line = self.lines.recv().await;
        self.pending = false;
        line.unwrap_or(Ok(None))
    }
}
