//! Atlas Scientific EZO pH / ORP circuit in UART mode.
//!
//! The circuit speaks ASCII lines terminated by `\r`.  A single reading is
//! requested with `R`; the reply is the value, optionally followed by a
//! `*OK` response code.  `*ER` means the circuit rejected the command.
//!
//! Every transaction is bounded by the configured read timeout.

use std::time::{Duration, Instant};

use log::{debug, warn};

use crate::error::SensorError;

/// Longest reply line the circuit produces.
const MAX_LINE: usize = 32;

/// Upper bound on one blocking UART read, so the deadline is rechecked.
const READ_SLICE: Duration = Duration::from_millis(100);

/// Byte-level access to one probe's serial link.
pub trait ProbeLink {
    fn write_all(&mut self, bytes: &[u8]) -> Result<(), SensorError>;

    /// Read whatever arrives within `timeout`; `Ok(0)` if nothing did.
    fn read(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize, SensorError>;

    /// Discard stale input (late replies, boot banners).
    fn clear_input(&mut self) -> Result<(), SensorError>;
}

#[cfg(target_os = "espidf")]
impl ProbeLink for esp_idf_hal::uart::UartDriver<'_> {
    fn write_all(&mut self, bytes: &[u8]) -> Result<(), SensorError> {
        let mut rest = bytes;
        while !rest.is_empty() {
            let n = self.write(rest).map_err(|_| SensorError::Io)?;
            rest = &rest[n..];
        }
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize, SensorError> {
        let ticks = esp_idf_hal::delay::TickType::from(timeout).ticks();
        esp_idf_hal::uart::UartDriver::read(self, buf, ticks).map_err(|_| SensorError::Io)
    }

    fn clear_input(&mut self) -> Result<(), SensorError> {
        self.clear_rx().map_err(|_| SensorError::Io)
    }
}

type Line = heapless::Vec<u8, MAX_LINE>;

pub struct EzoProbe<L> {
    name: &'static str,
    link: L,
    timeout: Duration,
}

impl<L: ProbeLink> EzoProbe<L> {
    pub fn new(name: &'static str, link: L, timeout: Duration) -> Self {
        Self {
            name,
            link,
            timeout,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Request one reading (`R`) and parse the reply.
    pub fn read(&mut self) -> Result<f32, SensorError> {
        self.link.clear_input()?;
        self.link.write_all(b"R\r")?;
        let deadline = Instant::now() + self.timeout;
        loop {
            let line = self.read_line(deadline)?;
            match classify(&line)? {
                Reply::Ok => continue,
                Reply::Value(v) => {
                    debug!("{}: {}", self.name, v);
                    return Ok(v);
                }
            }
        }
    }

    /// Send a raw command (terminator appended) and wait for its
    /// acknowledgement.  Circuits with response codes disabled stay
    /// silent; that is not an error.
    pub fn command(&mut self, command: &str) -> Result<(), SensorError> {
        self.link.clear_input()?;
        self.link.write_all(command.as_bytes())?;
        self.link.write_all(b"\r")?;
        match self.read_line(Instant::now() + self.timeout) {
            Ok(line) => match classify(&line) {
                Err(e) => {
                    warn!("{}: '{}' rejected", self.name, command);
                    Err(e)
                }
                Ok(_) => Ok(()),
            },
            Err(SensorError::Timeout) => {
                debug!("{}: no acknowledgement for '{}'", self.name, command);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    fn read_line(&mut self, deadline: Instant) -> Result<Line, SensorError> {
        let mut line = Line::new();
        let mut byte = [0u8; 1];
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(SensorError::Timeout);
            }
            if self.link.read(&mut byte, remaining.min(READ_SLICE))? == 0 {
                continue;
            }
            match byte[0] {
                b'\r' if line.is_empty() => {}
                b'\r' => return Ok(line),
                b'\n' => {}
                b => line.push(b).map_err(|_| SensorError::Malformed)?,
            }
        }
    }
}

enum Reply {
    Ok,
    Value(f32),
}

fn classify(line: &[u8]) -> Result<Reply, SensorError> {
    let text = core::str::from_utf8(line).map_err(|_| SensorError::Malformed)?;
    match text.trim() {
        "*OK" => Ok(Reply::Ok),
        t if t.starts_with('*') => Err(SensorError::Malformed),
        t => t
            .parse::<f32>()
            .ok()
            .filter(|v| v.is_finite())
            .map(Reply::Value)
            .ok_or(SensorError::Malformed),
    }
}
