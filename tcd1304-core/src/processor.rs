//! Command processor: turns inbound text into state changes and responses.
//!
//! Bytes are accumulated until a `\n` or `\r`. A terminator with nothing
//! accumulated is ignored, so `\r\n` pairs and stray line ends are harmless.
//! A line that reaches [`CMD_BUFFER_SIZE`] characters is discarded and
//! answered with `ERROR:CMD_TOO_LONG`; accumulation then starts over.
//!
//! Every command is answered with exactly one response line written through
//! the queued path of the [`CommandPort`].

use heapless::Vec;
use tcd1304_proto::{
    integration_time_in_range, parse_command, Command, Response, CMD_BUFFER_SIZE,
    DEFAULT_INTEGRATION_TIME_US, MAX_RESPONSE_SIZE,
};

use crate::link::Link;
use crate::timer::{IntegrationTimer, TimerConfig};
use crate::transport::Transport;

/// Byte source and response sink used by the processor.
pub trait CommandPort {
    /// Next inbound byte, if any.
    fn read_byte(&mut self) -> Option<u8>;

    /// Queue response bytes. Returns how many were accepted.
    fn write(&mut self, bytes: &[u8]) -> usize;
}

impl<L: Link, const RX: usize, const TX: usize> CommandPort for Transport<'_, L, RX, TX> {
    #[inline]
    fn read_byte(&mut self) -> Option<u8> {
        Transport::read_byte(self)
    }

    #[inline]
    fn write(&mut self, bytes: &[u8]) -> usize {
        Transport::write(self, bytes)
    }
}

impl<P: CommandPort + ?Sized> CommandPort for &mut P {
    fn read_byte(&mut self) -> Option<u8> {
        (**self).read_byte()
    }

    fn write(&mut self, bytes: &[u8]) -> usize {
        (**self).write(bytes)
    }
}

/// Whether frames are being produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AcquisitionState {
    #[default]
    Idle,
    Running,
}

/// Error type for command handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CommandError {
    /// Not allowed while acquiring.
    Busy,
    /// Integration time outside the accepted range.
    Range,
    /// Line exceeded the command buffer.
    TooLong,
    /// Unrecognized command.
    Unknown,
}

impl core::fmt::Display for CommandError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Busy => write!(f, "acquisition running"),
            Self::Range => write!(f, "integration time out of range"),
            Self::TooLong => write!(f, "command too long"),
            Self::Unknown => write!(f, "unknown command"),
        }
    }
}

/// Acquisition state, integration time and the command accumulator.
pub struct CommandProcessor<T> {
    timer: T,
    config: TimerConfig,
    state: AcquisitionState,
    integration_time_us: u32,
    buffer: Vec<u8, { CMD_BUFFER_SIZE - 1 }>,
}

impl<T: IntegrationTimer> CommandProcessor<T> {
    /// Create an idle processor and program `timer` for the default
    /// integration time.
    pub fn new(timer: T) -> Self {
        Self::with_config(timer, TimerConfig::default())
    }

    pub fn with_config(mut timer: T, config: TimerConfig) -> Self {
        config.apply(&mut timer, DEFAULT_INTEGRATION_TIME_US);
        Self {
            timer,
            config,
            state: AcquisitionState::Idle,
            integration_time_us: DEFAULT_INTEGRATION_TIME_US,
            buffer: Vec::new(),
        }
    }

    /// Announce readiness to the host. Sent once at startup.
    pub fn send_ready<P: CommandPort + ?Sized>(&mut self, port: &mut P) {
        respond(port, Response::Ready);
    }

    /// Consume every inbound byte currently available.
    ///
    /// Returns the number of lines dispatched (errors included).
    pub fn poll<P: CommandPort + ?Sized>(&mut self, port: &mut P) -> usize {
        let mut handled = 0;
        while let Some(byte) = port.read_byte() {
            if self.push_byte(byte, port).is_some() {
                handled += 1;
            }
        }
        handled
    }

    /// Feed one byte to the accumulator.
    ///
    /// Returns `None` while a line is still being accumulated, otherwise the
    /// outcome of the dispatched line.
    pub fn push_byte<P: CommandPort + ?Sized>(
        &mut self,
        byte: u8,
        port: &mut P,
    ) -> Option<Result<(), CommandError>> {
        match byte {
            b'\n' | b'\r' => {
                if self.buffer.is_empty() {
                    return None;
                }
                let line = core::mem::take(&mut self.buffer);
                Some(self.execute(&line, port))
            }
            _ => {
                if self.buffer.push(byte).is_ok() {
                    return None;
                }
                self.buffer.clear();
                warn!("command rejected: {}", CommandError::TooLong);
                respond(port, Response::CommandTooLong);
                Some(Err(CommandError::TooLong))
            }
        }
    }

    /// Parse and run one command line (terminator excluded) and queue the
    /// response.
    pub fn execute<P: CommandPort + ?Sized>(
        &mut self,
        line: &[u8],
        port: &mut P,
    ) -> Result<(), CommandError> {
        let command = parse_command(line);
        debug!("command: {}", command);

        let (response, result) = match command {
            Command::Start => {
                self.start();
                (Response::Started, Ok(()))
            }
            Command::Stop => {
                self.stop();
                (Response::Stopped, Ok(()))
            }
            Command::Status => (
                Response::Status {
                    running: self.is_acquiring(),
                    integration_time_us: self.integration_time_us,
                },
                Ok(()),
            ),
            Command::SetIntegrationTime(us) => match self.set_integration_time(us) {
                Ok(()) => (Response::IntegrationTimeSet(us), Ok(())),
                Err(CommandError::Busy) => (Response::MustStopFirst, Err(CommandError::Busy)),
                Err(error) => (Response::OutOfRange, Err(error)),
            },
            Command::Unknown(text) => {
                let echo = &text[..text.len().min(CMD_BUFFER_SIZE - 1)];
                (Response::UnknownCommand(echo), Err(CommandError::Unknown))
            }
        };

        if let Err(error) = result {
            warn!("command rejected: {}", error);
        }
        respond(port, response);
        result
    }

    pub fn start(&mut self) {
        self.state = AcquisitionState::Running;
        debug!("acquisition started");
    }

    pub fn stop(&mut self) {
        self.state = AcquisitionState::Idle;
        debug!("acquisition stopped");
    }

    /// Change the integration time.
    ///
    /// The timer is reprogrammed and restarted before the new value is
    /// stored.
    ///
    /// # Errors
    ///
    /// - [`CommandError::Busy`] while acquiring; nothing changes.
    /// - [`CommandError::Range`] outside 10..=100000 us; nothing changes.
    pub fn set_integration_time(&mut self, us: u32) -> Result<(), CommandError> {
        if self.is_acquiring() {
            return Err(CommandError::Busy);
        }
        if !integration_time_in_range(us) {
            return Err(CommandError::Range);
        }
        self.config.apply(&mut self.timer, us);
        self.integration_time_us = us;
        debug!("integration time set to {} us", us);
        Ok(())
    }

    #[inline]
    #[must_use]
    pub fn state(&self) -> AcquisitionState {
        self.state
    }

    #[inline]
    #[must_use]
    pub fn is_acquiring(&self) -> bool {
        self.state == AcquisitionState::Running
    }

    #[inline]
    #[must_use]
    pub fn integration_time_us(&self) -> u32 {
        self.integration_time_us
    }

    /// Characters accumulated toward the next command.
    #[inline]
    #[must_use]
    pub fn pending(&self) -> &[u8] {
        &self.buffer
    }

    pub fn timer(&self) -> &T {
        &self.timer
    }

    pub fn timer_mut(&mut self) -> &mut T {
        &mut self.timer
    }
}

/// Serialize `response` and queue it on `port`.
fn respond<P: CommandPort + ?Sized>(port: &mut P, response: Response<'_>) {
    let mut buf = [0u8; MAX_RESPONSE_SIZE];
    match response.serialize(&mut buf) {
        Ok(len) => {
            port.write(&buf[..len]);
        }
        Err(error) => warn!("response dropped: {}", error),
    }
}
