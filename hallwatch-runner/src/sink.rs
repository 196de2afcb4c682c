use std::io::{self, Write};

use hallwatch_simulation::Frame;

/// Sends rendered frames to a consuming surface.
pub trait FrameSink {
    fn send(&mut self, frame: &Frame) -> io::Result<()>;
}

/// Writes one JSON frame per line to standard output.
pub struct StdioFrameSink {
    stdout: io::Stdout,
}

impl StdioFrameSink {
    pub fn new() -> Self {
        StdioFrameSink { stdout: io::stdout() }
    }
}

impl FrameSink for StdioFrameSink {
    fn send(&mut self, frame: &Frame) -> io::Result<()> {
        let line = serde_json::to_string(frame)?;
        self.stdout.write_all(line.as_bytes())?;
        self.stdout.write_all(b"\n")?;
        self.stdout.flush()?;
        Ok(())
    }
}

impl Default for StdioFrameSink {
    fn default() -> Self {
        Self::new()
    }
}
