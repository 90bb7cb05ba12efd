//! Status output and the between-steps key pause

use colored::Colorize;
use crossterm::cursor::MoveTo;
use crossterm::event::{self, Event, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{self, Clear, ClearType};
use std::fmt::Display;
use std::io::{self, IsTerminal, Write};
use std::sync::Mutex;

pub const CONTINUE_PROMPT: &str = "Press any key to continue ...";

/// Where walkthrough output goes
///
/// Pausing only happens when it was asked for and stdin is a terminal, so
/// piped and scripted runs never block.
pub struct Console {
    out: Mutex<Box<dyn Write + Send>>,
    interactive: bool,
}

impl Console {
    /// Console on stdout; `pause` enables the key pause between steps
    pub fn stdout(pause: bool) -> Self {
        Self {
            out: Mutex::new(Box::new(io::stdout())),
            interactive: pause && io::stdin().is_terminal(),
        }
    }

    fn write_line(&self, line: impl Display) -> io::Result<()> {
        let mut out = self
            .out
            .lock()
            .map_err(|_| io::Error::other("console output lock poisoned"))?;
        writeln!(out, "{}", line)?;
        out.flush()
    }

    /// Step completed
    pub fn status(&self, message: impl AsRef<str>) -> io::Result<()> {
        self.write_line(message.as_ref().green())
    }

    /// Plain line, e.g. a query result
    pub fn line(&self, message: impl AsRef<str>) -> io::Result<()> {
        self.write_line(message.as_ref())
    }

    /// Show `prompt`, wait for a key press, then clear the screen
    pub fn pause(&self, prompt: &str) -> io::Result<()> {
        if !self.interactive {
            return Ok(());
        }
        self.write_line(prompt.dimmed())?;

        terminal::enable_raw_mode()?;
        let waited = wait_for_key();
        terminal::disable_raw_mode()?;
        waited?;

        execute!(io::stdout(), Clear(ClearType::All), MoveTo(0, 0))
    }
}

fn wait_for_key() -> io::Result<()> {
    loop {
        if let Event::Key(key) = event::read()?
            && key.kind == KeyEventKind::Press
        {
            return Ok(());
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::Console;
    use std::io::{self, Write};
    use std::sync::{Arc, Mutex};

    /// Writer whose contents stay readable after the console owns it
    #[derive(Clone, Default)]
    pub struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Captured {
        /// Console writing here that never pauses
        pub fn console(&self) -> Console {
            Console {
                out: Mutex::new(Box::new(self.clone())),
                interactive: false,
            }
        }

        pub fn text(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }
}
