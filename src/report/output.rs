// Output sinks - stdout or a file, owned by exactly one formatter

use std::fmt;
use std::fs::File;
use std::io::{self, BufWriter, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::error::ConfigError;

/// Destination value meaning "the primary output stream"
pub const STDOUT_SENTINEL: &str = "-";

enum Target {
    Stdout(io::Stdout),
    File(BufWriter<File>),
    Writer(Box<dyn Write + Send>),
    Closed,
}

/// An output destination opened once at registration and closed once
pub struct Output {
    label: String,
    target: Target,
    terminal: bool,
}

impl Output {
    /// Open a destination: `-` is stdout, anything else is a file truncated on open
    pub fn open(destination: &str) -> Result<Self, ConfigError> {
        if destination == STDOUT_SENTINEL {
            return Ok(Self::stdout());
        }
        Self::file(Path::new(destination))
    }

    pub fn stdout() -> Self {
        let stdout = io::stdout();
        let terminal = stdout.is_terminal();
        Self {
            label: STDOUT_SENTINEL.to_string(),
            target: Target::Stdout(stdout),
            terminal,
        }
    }

    pub fn file(path: &Path) -> Result<Self, ConfigError> {
        let file = File::create(path).map_err(|source| ConfigError::Output {
            path: PathBuf::from(path),
            source,
        })?;
        Ok(Self {
            label: path.display().to_string(),
            target: Target::File(BufWriter::new(file)),
            terminal: false,
        })
    }

    /// Wrap an arbitrary writer (used for embedding and tests)
    pub fn writer(label: impl Into<String>, writer: impl Write + Send + 'static) -> Self {
        Self {
            label: label.into(),
            target: Target::Writer(Box::new(writer)),
            terminal: false,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn is_stdout(&self) -> bool {
        matches!(self.target, Target::Stdout(_))
    }

    pub fn is_terminal(&self) -> bool {
        self.terminal
    }

    pub fn is_closed(&self) -> bool {
        matches!(self.target, Target::Closed)
    }

    /// Flush and drop the underlying handle. Closing twice is a no-op.
    pub fn close(&mut self) -> io::Result<()> {
        self.flush()?;
        self.target = Target::Closed;
        Ok(())
    }
}

impl Write for Output {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match &mut self.target {
            Target::Stdout(out) => out.write(buf),
            Target::File(out) => out.write(buf),
            Target::Writer(out) => out.write(buf),
            Target::Closed => Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                format!("output {} already closed", self.label),
            )),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match &mut self.target {
            Target::Stdout(out) => out.flush(),
            Target::File(out) => out.flush(),
            Target::Writer(out) => out.flush(),
            Target::Closed => Ok(()),
        }
    }
}

impl fmt::Debug for Output {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Output")
            .field("label", &self.label)
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// In-memory writer that can be inspected after being handed to a formatter
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> String {
        let bytes = self.0.lock().map(|b| b.clone()).unwrap_or_default();
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut bytes = self
            .0
            .lock()
            .map_err(|_| io::Error::other("shared buffer poisoned"))?;
        bytes.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
