//! # URG Driver
//!
//! `urg` is a driver for Hokuyo URG series laser range finders speaking the
//! SCIP2.0 serial protocol. It frames the sensor's line-oriented byte
//! stream, validates response checksums, and decodes six-bit packed range
//! data into per-step distance captures.
//!
//! The crate deliberately stops at the protocol boundary: opening and
//! configuring the serial port, choosing baud rates and orchestrating
//! capture retries belong to the host program. Anything implementing
//! `Read + Write` with timeout-aware reads works as the transport.

extern crate log;

mod answers;
pub mod base;
mod checksum;
mod cmds;
mod internals;
mod protocol;
mod sixbit;
pub mod types;

pub use crate::answers::SensorParameters;
pub use crate::base::{Error, ExchangeDecoder, LineChannel, Result};
pub use crate::protocol::{CaptureDecoder, MessageType};
pub use crate::types::Capture;

use crate::answers::{ParametersDecoder, StatusDecoder};
use log::trace;
use std::io::{Read, Write};

/// Represents a connection to and control interface for a URG range finder.
///
/// Provides the SCIP2.0 command surface: the parameter query, measurement
/// state switching, baud-rate change requests and GD/MD range captures.
/// Exactly one exchange is in flight at a time; the protocol is strictly
/// half-duplex, so a multi-threaded host must serialize access externally.
///
/// # Example
/// ```ignore
/// # use urg::{LineChannel, UrgDevice};
/// # fn main() -> urg::Result<()> {
/// let serial_port = serialport::new("/dev/ttyACM0", 115200).open()?;
/// let mut urg = UrgDevice::with_stream(serial_port);
/// urg.start_measurement()?;
/// let capture = urg.capture_once()?;
/// println!("front: {:?}", capture.distance_at(540));
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct UrgDevice<T: ?Sized> {
    channel: LineChannel<T>,
    parameters: Option<SensorParameters>,
}

impl<T: ?Sized> UrgDevice<T>
where
    T: Read + Write,
{
    /// Constructs a new `UrgDevice` over an existing `LineChannel`.
    pub fn new(channel: LineChannel<T>) -> UrgDevice<T> {
        trace!("Creating new UrgDevice");
        UrgDevice {
            channel,
            parameters: None,
        }
    }

    /// Constructs a new `UrgDevice` directly from a communication stream
    /// (e.g. an opened serial port), using the default per-byte timeout.
    pub fn with_stream(stream: Box<T>) -> UrgDevice<T> {
        UrgDevice::new(LineChannel::new(stream))
    }

    /// Sends one command and drives the given decoder over the reply lines
    /// until it completes. A timeout after the first line means the stream
    /// died mid-response.
    fn invoke<D: ExchangeDecoder>(&mut self, tag: &str, mut decoder: D) -> Result<D::Output> {
        self.channel.send_line(tag)?;

        let mut any_line = false;
        loop {
            let line = match self.channel.read_line() {
                Ok(line) => line,
                Err(Error::OperationTimeout) if any_line => {
                    return Err(Error::IncompleteResponse);
                }
                Err(e) => return Err(e),
            };
            any_line = true;
            if let Some(output) = decoder.feed_line(&line)? {
                return Ok(output);
            }
        }
    }

    /// Sends a generic command and returns the sensor's 2-hex-digit reply
    /// status. The command echo and the status line checksum are verified.
    pub fn send_command(&mut self, tag: &str) -> Result<u8> {
        trace!("Sending command {:?}", tag);
        self.invoke(tag, StatusDecoder::new(tag))
    }

    /// Requests the switch from SCIP1.1 to SCIP2.0 mode. Old firmware
    /// replies on this command even when already in SCIP2.0 mode; a sensor
    /// that stays silent is either on a different baud rate or not a URG.
    pub fn request_scip2(&mut self) -> Result<u8> {
        self.send_command(cmds::CMD_SCIP2)
    }

    /// Switches the laser on and puts the sensor into the measurement
    /// state (BM). Returns the sensor's status code; 0 is success, 2 means
    /// the laser was already on.
    pub fn start_measurement(&mut self) -> Result<u8> {
        self.send_command(cmds::CMD_LASER_ON)
    }

    /// Stops measuring and returns the sensor to the idle state (QT). Also
    /// ends an open-ended MD capture stream.
    pub fn stop_measurement(&mut self) -> Result<u8> {
        self.send_command(cmds::CMD_LASER_OFF)
    }

    /// Asks the sensor to change its serial baud rate.
    ///
    /// Only the request is sent here; reconfiguring the port itself is the
    /// host's job, after this returns. Statuses 0, 3 and 4 count as
    /// acceptance, anything else fails with [`Error::CommandFail`].
    pub fn change_baudrate(&mut self, baudrate: u32) -> Result<()> {
        let status = self.send_command(&cmds::baudrate_command(baudrate))?;
        if cmds::BAUDRATE_ACCEPTED_STATUSES.contains(&status) {
            Ok(())
        } else {
            Err(Error::CommandFail { status })
        }
    }

    /// Returns the sensor's parameter block, querying it with PP on first
    /// use and answering from the cache afterwards. The parameters are
    /// fixed for the life of the connection.
    pub fn get_parameters(&mut self) -> Result<SensorParameters> {
        if let Some(parameters) = &self.parameters {
            return Ok(parameters.clone());
        }
        trace!("Querying sensor parameters");
        let parameters =
            self.invoke(cmds::CMD_GET_PARAMETERS, ParametersDecoder::new())?;
        trace!("Sensor parameters: {:?}", parameters);
        self.parameters = Some(parameters.clone());
        Ok(parameters)
    }

    /// Captures one scan with the GD command.
    ///
    /// Requires the measurement state (see [`start_measurement`]); covers
    /// the sensor's full measurable step range.
    ///
    /// [`start_measurement`]: UrgDevice::start_measurement
    pub fn capture_once(&mut self) -> Result<Capture> {
        let parameters = self.get_parameters()?;
        let tag = cmds::gd_command(parameters.first(), parameters.last());
        self.invoke(&tag, CaptureDecoder::new(&parameters))
    }

    /// Requests `times` successive scans with the MD command. 100 or more
    /// requests the open-ended form, which streams scans until
    /// [`stop_measurement`] is called.
    ///
    /// The scans themselves arrive one per [`receive_capture`] call.
    ///
    /// [`stop_measurement`]: UrgDevice::stop_measurement
    /// [`receive_capture`]: UrgDevice::receive_capture
    pub fn start_capture(&mut self, times: u32) -> Result<()> {
        let parameters = self.get_parameters()?;
        let tag = cmds::md_command(parameters.first(), parameters.last(), times);
        trace!("Requesting capture stream: {}", tag);
        self.channel.send_line(&tag)
    }

    /// Receives and decodes one scan of an MD capture stream.
    pub fn receive_capture(&mut self) -> Result<Capture> {
        let parameters = self.get_parameters()?;
        let mut decoder = CaptureDecoder::new(&parameters);

        let mut any_line = false;
        loop {
            let line = match self.channel.read_line() {
                Ok(line) => line,
                Err(Error::OperationTimeout) if any_line => {
                    return Err(Error::IncompleteResponse);
                }
                Err(e) => return Err(e),
            };
            any_line = true;
            if let Some(capture) = decoder.feed_line(&line)? {
                return Ok(capture);
            }
        }
    }
}
