use crate::base::error::{Error, Result};
use crate::base::ring_byte_buffer::RingByteBuffer;
use crate::internals::{DEFAULT_TIMEOUT, LINE_LENGTH};
use log::{error, trace};
use std::io;
use std::time::{Duration, Instant};

const DEFAULT_CHANNEL_READ_BUFFER_SIZE: usize = 1024;

/// Frames the raw byte stream of a URG sensor into SCIP2.0 lines, and sends
/// newline-terminated commands the other way.
///
/// SCIP2.0 is strictly line oriented: every response is a sequence of lines
/// delimited by CR or LF, and an empty line terminates a response block.
/// `LineChannel` owns the transport stream and turns its fragmented,
/// possibly-stalling reads into one framed line per `read_line` call.
///
/// # Examples
/// ```ignore
/// let mut channel = LineChannel::new(serial_port);
/// channel.send_line("PP")?;
/// let echo = channel.read_line()?;
/// ```
#[derive(Debug)]
pub struct LineChannel<T: ?Sized> {
    stream: Box<T>,
    read_buffer: RingByteBuffer,
    timeout: Duration,
}

impl<T: ?Sized> LineChannel<T>
where
    T: io::Read + io::Write,
{
    /// Creates a new `LineChannel` over a stream, using the protocol default
    /// per-byte timeout.
    pub fn new(stream: Box<T>) -> LineChannel<T> {
        LineChannel::with_timeout(stream, DEFAULT_TIMEOUT)
    }

    /// Creates a new `LineChannel` with a non-default per-byte timeout.
    ///
    /// The timeout bounds how long a single `read_line` call waits for each
    /// byte, not how long it waits for the whole line.
    pub fn with_timeout(stream: Box<T>, timeout: Duration) -> LineChannel<T> {
        trace!("Creating new LineChannel with per-byte timeout {:?}", timeout);
        LineChannel {
            stream,
            read_buffer: RingByteBuffer::with_capacity(DEFAULT_CHANNEL_READ_BUFFER_SIZE),
            timeout,
        }
    }

    /// Waits up to the per-byte timeout for the next byte of the stream.
    /// Returns `Ok(None)` when the timeout elapsed without data.
    fn next_byte(&mut self) -> Result<Option<u8>> {
        let deadline = Instant::now() + self.timeout;
        loop {
            if let Some(byte) = self.read_buffer.pop() {
                return Ok(Some(byte));
            }

            match self.read_buffer.fill_from(&mut self.stream) {
                Ok(_) => {}
                Err(e) => {
                    error!("IO error reading from stream: {}", e);
                    return Err(e.into());
                }
            }

            if let Some(byte) = self.read_buffer.pop() {
                return Ok(Some(byte));
            }

            if Instant::now() >= deadline {
                return Ok(None);
            }
        }
    }

    /// Reads one framed line from the stream.
    ///
    /// Bytes accumulate until a CR or LF is seen (the terminator is not part
    /// of the returned line) or `LINE_LENGTH - 1` bytes have been read, in
    /// which case the line is truncated rather than failed. A zero-length
    /// line is a valid result; it terminates a response block.
    ///
    /// A timeout on the very first byte yields `Error::OperationTimeout`. A
    /// timeout after at least one byte yields the partial line, since a short
    /// final line is normal framing.
    pub fn read_line(&mut self) -> Result<Vec<u8>> {
        let mut line = Vec::new();

        while line.len() < LINE_LENGTH - 1 {
            match self.next_byte()? {
                Some(b'\r') | Some(b'\n') => break,
                Some(byte) => line.push(byte),
                None => {
                    if line.is_empty() {
                        trace!("Timed out waiting for first byte of a line");
                        return Err(Error::OperationTimeout);
                    }
                    trace!("Timed out mid-line, returning {} byte partial line", line.len());
                    break;
                }
            }
        }

        trace!("Framed line ({} bytes): {:?}", line.len(), line);
        Ok(line)
    }

    /// Sends a newline-terminated command tag and flushes the stream.
    ///
    /// # Arguments
    ///
    /// * `tag` - The command text without its terminator, e.g. `"PP"` or
    ///   `"GD0000108001"`.
    pub fn send_line(&mut self, tag: &str) -> Result<()> {
        trace!("Sending command line: {}", tag);
        self.stream.write_all(tag.as_bytes())?;
        self.stream.write_all(b"\n")?;
        self.stream.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::LineChannel;
    use crate::base::Error;
    use crate::internals::LINE_LENGTH;
    use std::cell::RefCell;
    use std::io::{self, Read, Write};
    use std::rc::Rc;
    use std::time::Duration;

    // In-memory stand-in for a serial port: replies from a canned buffer,
    // collects whatever the driver writes into a shared sink.
    struct FakePort {
        reply: io::Cursor<Vec<u8>>,
        sent: Rc<RefCell<Vec<u8>>>,
    }

    impl FakePort {
        fn new(reply: &[u8]) -> FakePort {
            FakePort {
                reply: io::Cursor::new(reply.to_vec()),
                sent: Rc::new(RefCell::new(Vec::new())),
            }
        }
    }

    impl Read for FakePort {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.reply.read(buf)
        }
    }

    impl Write for FakePort {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.sent.borrow_mut().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn channel_over(reply: &[u8]) -> LineChannel<FakePort> {
        LineChannel::with_timeout(Box::new(FakePort::new(reply)), Duration::from_millis(5))
    }

    #[test]
    fn frames_lf_and_cr_delimited_lines() {
        let mut channel = channel_over(b"MODL\nDMIN\rDMAX\n");
        assert_eq!(channel.read_line().unwrap(), b"MODL");
        assert_eq!(channel.read_line().unwrap(), b"DMIN");
        assert_eq!(channel.read_line().unwrap(), b"DMAX");
    }

    #[test]
    fn empty_line_is_a_valid_result() {
        let mut channel = channel_over(b"\n\n");
        assert_eq!(channel.read_line().unwrap(), b"");
        assert_eq!(channel.read_line().unwrap(), b"");
    }

    #[test]
    fn first_byte_timeout_is_an_error() {
        let mut channel = channel_over(b"");
        assert!(matches!(
            channel.read_line(),
            Err(Error::OperationTimeout)
        ));
    }

    #[test]
    fn partial_final_line_is_returned() {
        let mut channel = channel_over(b"99b");
        assert_eq!(channel.read_line().unwrap(), b"99b");
    }

    #[test]
    fn overlong_line_is_truncated_not_failed() {
        let long = vec![b'0'; LINE_LENGTH + 10];
        let mut channel = channel_over(&long);
        let line = channel.read_line().unwrap();
        assert_eq!(line.len(), LINE_LENGTH - 1);
    }

    #[test]
    fn send_line_appends_terminator() {
        let port = FakePort::new(b"");
        let sent = Rc::clone(&port.sent);
        let mut channel =
            LineChannel::with_timeout(Box::new(port), Duration::from_millis(5));
        channel.send_line("BM").unwrap();
        assert_eq!(*sent.borrow(), b"BM\n");
    }
}
