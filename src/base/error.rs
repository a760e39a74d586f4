use std::error;
use std::fmt;
use std::io;

/// Represents errors that can occur while talking to a URG sensor.
#[derive(Debug)]
pub enum Error {
    /// No byte arrived within the per-byte timeout. Recoverable; the host
    /// may retry the whole command.
    OperationTimeout,

    /// A checksummed response line failed validation. Aborts the current
    /// exchange; no partial result is returned.
    ChecksumMismatch,

    /// The first line of a capture response did not start with 'G' or 'M'.
    MalformedHeader { found: Option<u8> },

    /// The "99b" status line of a capture response was missing or wrong.
    /// Contains the offending line.
    ProtocolStatus { line: Vec<u8> },

    /// The byte stream ended before the terminator line of an exchange.
    IncompleteResponse,

    /// An encoding unit could not be completed from the remaining bytes.
    DecodeUnderflow,

    /// The PP parameter block omitted one of its labeled lines. Contains
    /// the label of the first missing line.
    IncompleteParameters { missing: &'static str },

    /// The sensor rejected a command. Contains the reported status code.
    CommandFail { status: u8 },

    /// The reply structure is invalid according to SCIP2.0. Contains a
    /// description of the protocol error.
    ProtocolError { description: String },

    /// An I/O error occurred on the underlying stream (e.g. serial port).
    IoError(io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::OperationTimeout => write!(f, "operation timeout"),
            Error::ChecksumMismatch => write!(f, "response line checksum mismatch"),
            Error::MalformedHeader { found: Some(b) } => {
                write!(f, "malformed capture header: first byte {:02X}", b)
            }
            Error::MalformedHeader { found: None } => {
                write!(f, "malformed capture header: empty line")
            }
            Error::ProtocolStatus { line } => {
                write!(f, "capture status check failed on line {:?}", line)
            }
            Error::IncompleteResponse => write!(f, "stream ended before response terminator"),
            Error::DecodeUnderflow => write!(f, "incomplete encoding unit at end of data"),
            Error::IncompleteParameters { missing } => {
                write!(f, "parameter block is missing the {} line", missing)
            }
            Error::CommandFail { status } => {
                write!(f, "command rejected with status {:02}", status)
            }
            Error::ProtocolError { description } => write!(f, "protocol error: {}", description),
            Error::IoError(err) => write!(f, "io error: {}", err),
        }
    }
}

impl error::Error for Error {}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::IoError(err)
    }
}

/// A specialized `Result` type for URG operations.
pub type Result<T> = std::result::Result<T, Error>;
