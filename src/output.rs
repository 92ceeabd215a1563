//! Output sinks.
//!
//! Every line the program shows the user goes through a [`Console`], which
//! owns the normal stream and the diagnostic stream. Message text is part of
//! the program's contract, so styling is limited to coloring the `Error:`
//! prefix and only when the diagnostic stream is a terminal.

use colored::Colorize;
use std::fmt::Display;
use std::io::{self, IsTerminal, Write};

/// The two text sinks of a run.
///
/// Write failures are ignored: there is nowhere left to report them.
pub struct Console<'a> {
    out: Box<dyn Write + 'a>,
    err: Box<dyn Write + 'a>,
    color: bool,
}

impl<'a> Console<'a> {
    /// Creates a console over arbitrary writers, without color.
    pub fn new(out: impl Write + 'a, err: impl Write + 'a) -> Self {
        Self {
            out: Box::new(out),
            err: Box::new(err),
            color: false,
        }
    }

    /// Creates a console over the process's stdout and stderr.
    pub fn stdio() -> Console<'static> {
        let color = io::stderr().is_terminal();
        Console {
            out: Box::new(io::stdout()),
            err: Box::new(io::stderr()),
            color,
        }
    }

    /// Prints a line on the normal stream.
    pub fn plain(&mut self, message: impl Display) {
        let _ = writeln!(self.out, "{}", message);
    }

    /// Prints `Error: <message>` on the diagnostic stream.
    pub fn error(&mut self, message: impl Display) {
        let prefix = if self.color {
            "Error:".red().bold().to_string()
        } else {
            "Error:".to_string()
        };
        let _ = writeln!(self.err, "{} {}", prefix, message);
    }

    /// Prints a line on the diagnostic stream without the error prefix.
    pub fn notice(&mut self, message: impl Display) {
        let _ = writeln!(self.err, "{}", message);
    }

    /// Writes pre-rendered text verbatim to the normal stream.
    pub fn raw_out(&mut self, text: &str) {
        let _ = self.out.write_all(text.as_bytes());
    }

    /// Writes pre-rendered text verbatim to the diagnostic stream.
    pub fn raw_err(&mut self, text: &str) {
        let _ = self.err.write_all(text.as_bytes());
    }
}

impl Drop for Console<'_> {
    fn drop(&mut self) {
        let _ = self.out.flush();
        let _ = self.err.flush();
    }
}
