use crate::answers::SensorParameters;
use crate::base::{Error, ExchangeDecoder, Result};
use crate::checksum;
use crate::internals::{
    DATA_LINE_LENGTH, NO_MEASUREMENT, SYNC_STATUS, TIMESTAMP_UNIT_WIDTH,
};
use crate::sixbit::{self, Carry};
use crate::types::Capture;
use log::{error, trace, warn};
use std::cmp::min;
use std::mem;

/// Style of a capture exchange, taken from its header line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MessageType {
    /// One-shot GD-style request. The device omits the separate status
    /// line, so the line after the header is skipped straight through.
    Query,
    /// Streaming MD-style request; each scan block carries its own status
    /// lines before the "99b" boundary.
    Continuous,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum DecodeStatus {
    /// Waiting for the echo/header line of the exchange.
    WaitHeader,
    /// Query style: the next line is consumed unparsed, then the timestamp.
    SkipStatus,
    /// Continuous style: passing status lines until the "99b" boundary.
    /// `ordinal` is the logical line position within the exchange.
    WaitSyncStatus { ordinal: u8 },
    /// The next line carries the 4-byte encoded capture timestamp.
    WaitTimestamp,
    /// Receiving encoded data lines until the empty terminator.
    ReceiveData,
    /// The terminator was seen and the capture handed out.
    Complete,
}

/// Decodes one capture response into a [`Capture`].
///
/// The line roles of a SCIP2.0 capture reply are positional: header, status
/// lines, the "99b" boundary, the timestamp, data lines, empty terminator.
/// This is modeled as an explicit state machine; in particular the
/// protocol's "a `99b` line can appear early and re-synchronizes the
/// exchange" behavior is a first-class transition rather than a counter
/// adjustment.
///
/// A decoder instance is valid for exactly one exchange. It starts with an
/// empty decode carry and pre-filled sentinels below the first measured
/// step; nothing survives into the next exchange.
#[derive(Debug)]
pub struct CaptureDecoder {
    status: DecodeStatus,
    message_type: Option<MessageType>,
    carry: Carry,
    distances: Vec<i64>,
    timestamp: u32,
    max_size: usize,
}

impl CaptureDecoder {
    /// Creates a decoder for one capture exchange against a sensor with the
    /// given parameters. Steps below `first()` are sentinel-filled up front.
    pub fn new(parameters: &SensorParameters) -> CaptureDecoder {
        let max_size = parameters.max_size();
        let mut distances = Vec::with_capacity(max_size);
        distances.resize(parameters.first() as usize, NO_MEASUREMENT);
        trace!(
            "New CaptureDecoder: first {}, max_size {}",
            parameters.first(),
            max_size
        );
        CaptureDecoder {
            status: DecodeStatus::WaitHeader,
            message_type: None,
            carry: Carry::new(),
            distances,
            timestamp: 0,
            max_size,
        }
    }

    /// Exchange style, known once the header line has been decoded.
    pub fn message_type(&self) -> Option<MessageType> {
        self.message_type
    }

    fn decode_header(&mut self, line: &[u8]) -> Result<()> {
        match line.first() {
            Some(b'G') => {
                trace!("Query-style header: {:?}", line);
                self.message_type = Some(MessageType::Query);
                self.status = DecodeStatus::SkipStatus;
                Ok(())
            }
            Some(b'M') => {
                trace!("Continuous-style header: {:?}", line);
                self.message_type = Some(MessageType::Continuous);
                self.status = DecodeStatus::WaitSyncStatus { ordinal: 1 };
                Ok(())
            }
            found => {
                error!("Malformed capture header: {:?}", line);
                Err(Error::MalformedHeader {
                    found: found.copied(),
                })
            }
        }
    }

    fn decode_data_line(&mut self, line: &[u8]) -> Result<()> {
        if line.len() > DATA_LINE_LENGTH {
            warn!(
                "Data line of {} bytes, ignoring everything past {}",
                line.len(),
                DATA_LINE_LENGTH
            );
        }
        let used = min(line.len(), DATA_LINE_LENGTH);
        // The last consumed byte is the checksum, already verified.
        let payload = &line[..used - 1];

        let max_size = self.max_size;
        let CaptureDecoder {
            carry, distances, ..
        } = self;
        let mut surplus = 0usize;
        carry.feed(payload, |value| {
            if distances.len() < max_size {
                distances.push(value);
            } else {
                surplus += 1;
            }
        });
        if surplus > 0 {
            warn!("Dropped {} measurements beyond max_size {}", surplus, max_size);
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<Capture> {
        if !self.carry.is_empty() {
            error!("Capture terminated with an incomplete encoding unit pending");
            return Err(Error::DecodeUnderflow);
        }
        let filled = self.distances.len();
        self.distances.resize(self.max_size, NO_MEASUREMENT);
        self.status = DecodeStatus::Complete;
        trace!(
            "Capture complete: {} of {} slots measured, timestamp {}",
            filled,
            self.max_size,
            self.timestamp
        );
        Ok(Capture {
            distances: mem::take(&mut self.distances),
            timestamp: self.timestamp,
        })
    }

    /// Checksum scope: every line of length >= 3 past the third logical
    /// line of the exchange. Echo and early status lines are exempt; the
    /// device does not checksum them.
    fn is_checksummed_position(&self) -> bool {
        matches!(
            self.status,
            DecodeStatus::WaitSyncStatus { ordinal: 4 }
                | DecodeStatus::WaitTimestamp
                | DecodeStatus::ReceiveData
        )
    }
}

impl ExchangeDecoder for CaptureDecoder {
    type Output = Capture;

    fn feed_line(&mut self, line: &[u8]) -> Result<Option<Capture>> {
        match self.status {
            DecodeStatus::WaitHeader => {
                self.decode_header(line)?;
                return Ok(None);
            }
            DecodeStatus::Complete => {
                return Err(Error::ProtocolError {
                    description: "capture decoder fed after completion".to_owned(),
                });
            }
            _ => {}
        }

        if self.status == DecodeStatus::ReceiveData && line.is_empty() {
            return self.finish().map(Some);
        }

        if self.is_checksummed_position() && line.len() >= 3 {
            let (payload, sum) = line.split_at(line.len() - 1);
            if !checksum::validate(payload, sum[0]) {
                error!("Checksum mismatch on line {:?}", line);
                return Err(Error::ChecksumMismatch);
            }
        }

        // The "99b" status is a synchronization point wherever it appears:
        // the line after it is always the timestamp.
        if line.len() >= 3 && &line[..3] == SYNC_STATUS {
            trace!("Sync status line, expecting timestamp next");
            self.status = DecodeStatus::WaitTimestamp;
            return Ok(None);
        }

        match self.status {
            DecodeStatus::SkipStatus => {
                trace!("Skipping query status line: {:?}", line);
                self.status = DecodeStatus::WaitTimestamp;
            }
            DecodeStatus::WaitSyncStatus { ordinal } => {
                if ordinal >= 4 {
                    error!("Expected \"99b\" status, got {:?}", line);
                    return Err(Error::ProtocolStatus {
                        line: line.to_vec(),
                    });
                }
                trace!("Passing preamble line {}: {:?}", ordinal, line);
                self.status = DecodeStatus::WaitSyncStatus {
                    ordinal: ordinal + 1,
                };
            }
            DecodeStatus::WaitTimestamp => {
                if line.len() < TIMESTAMP_UNIT_WIDTH {
                    error!("Timestamp line too short: {:?}", line);
                    return Err(Error::DecodeUnderflow);
                }
                self.timestamp = sixbit::decode(&line[..TIMESTAMP_UNIT_WIDTH]) as u32;
                trace!("Capture timestamp: {}", self.timestamp);
                self.status = DecodeStatus::ReceiveData;
            }
            DecodeStatus::ReceiveData => {
                self.decode_data_line(line)?;
            }
            DecodeStatus::WaitHeader | DecodeStatus::Complete => unreachable!(),
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::{CaptureDecoder, MessageType};
    use crate::answers::SensorParameters;
    use crate::base::{Error, ExchangeDecoder};
    use crate::checksum::Checksum;
    use crate::types::Capture;

    fn parameters(first: u32, last: u32) -> SensorParameters {
        SensorParameters {
            model: "UST-10LX".to_owned(),
            distance_min: 20,
            distance_max: 30000,
            area_total: 1440,
            area_min: first,
            area_max: last,
            area_front: first,
            scan_rpm: 2400,
        }
    }

    fn encode(value: i64, width: usize) -> Vec<u8> {
        (0..width)
            .rev()
            .map(|i| (((value >> (6 * i)) & 0x3f) as u8) + 0x30)
            .collect()
    }

    fn with_sum(payload: &[u8]) -> Vec<u8> {
        let mut line = payload.to_vec();
        let mut checksum = Checksum::new();
        checksum.push_slice(payload);
        line.push(checksum.checksum());
        line
    }

    fn timestamp_line(timestamp: u32) -> Vec<u8> {
        with_sum(&encode(i64::from(timestamp), 4))
    }

    fn data_lines(values: &[i64], split_at: &[usize]) -> Vec<Vec<u8>> {
        let payload: Vec<u8> = values.iter().flat_map(|&v| encode(v, 3)).collect();
        let mut lines = Vec::new();
        let mut start = 0;
        for &at in split_at {
            lines.push(with_sum(&payload[start..at]));
            start = at;
        }
        lines.push(with_sum(&payload[start..]));
        lines
    }

    fn run(decoder: &mut CaptureDecoder, lines: &[Vec<u8>]) -> crate::base::Result<Capture> {
        for line in lines {
            if let Some(capture) = decoder.feed_line(line)? {
                return Ok(capture);
            }
        }
        panic!("reply ended without completing the capture");
    }

    fn gd_reply(first: u32, last: u32, timestamp: u32, values: &[i64]) -> Vec<Vec<u8>> {
        let mut lines = vec![
            format!("GD{:04}{:04}01", first, last).into_bytes(),
            b"00P".to_vec(),
            timestamp_line(timestamp),
        ];
        lines.extend(data_lines(values, &[]));
        lines.push(Vec::new());
        lines
    }

    #[test]
    fn decodes_a_query_style_reply() {
        let params = parameters(5, 10);
        let values = [1200, 1210, 1220, 1230, 1240, 1250];
        let reply = gd_reply(5, 10, 0x1234, &values);

        let mut decoder = CaptureDecoder::new(&params);
        let capture = run(&mut decoder, &reply).unwrap();

        assert_eq!(decoder.message_type(), Some(MessageType::Query));
        assert_eq!(capture.timestamp, 0x1234);
        assert_eq!(capture.len(), 11);
        assert_eq!(&capture.distances[..5], &[-1; 5]);
        assert_eq!(capture.distances[5], 1200);
        assert_eq!(capture.distances[10], 1250);
    }

    #[test]
    fn sentinel_filling_covers_both_ends() {
        // first=5, last=10, max_size=11; only steps 5..=7 get data.
        let params = parameters(5, 10);
        let mut reply = vec![
            b"GD0005001001".to_vec(),
            b"00P".to_vec(),
            timestamp_line(99),
        ];
        reply.extend(data_lines(&[100, 200, 300], &[]));
        reply.push(Vec::new());

        let capture = run(&mut CaptureDecoder::new(&params), &reply).unwrap();
        assert_eq!(
            capture.distances,
            vec![-1, -1, -1, -1, -1, 100, 200, 300, -1, -1, -1]
        );
    }

    #[test]
    fn decodes_a_continuous_style_reply() {
        let params = parameters(0, 3);
        let lines = vec![
            b"MD0000000301000".to_vec(),
            b"00P".to_vec(),
            b"99b".to_vec(),
            timestamp_line(0xABCDE),
            data_lines(&[10, 20, 30, 40], &[])[0].clone(),
            Vec::new(),
        ];

        let mut decoder = CaptureDecoder::new(&params);
        let capture = run(&mut decoder, &lines).unwrap();
        assert_eq!(decoder.message_type(), Some(MessageType::Continuous));
        assert_eq!(capture.timestamp, 0xABCDE);
        assert_eq!(capture.distances, vec![10, 20, 30, 40]);
    }

    #[test]
    fn continuous_reply_with_full_preamble() {
        // Status lines up to the fourth position, where "99b" must appear.
        let params = parameters(0, 1);
        let lines = vec![
            b"MD0000000101000".to_vec(),
            b"00P".to_vec(),
            b"extra".to_vec(),
            b"lines".to_vec(),
            b"99b".to_vec(),
            timestamp_line(7),
            data_lines(&[11, 22], &[])[0].clone(),
            Vec::new(),
        ];
        let capture = run(&mut CaptureDecoder::new(&params), &lines).unwrap();
        assert_eq!(capture.distances, vec![11, 22]);
    }

    #[test]
    fn missing_sync_status_fails() {
        let params = parameters(0, 1);
        let mut decoder = CaptureDecoder::new(&params);
        decoder.feed_line(b"MD0000000101000").unwrap();
        for line in [&b"a"[..], b"b", b"c"] {
            decoder.feed_line(line).unwrap();
        }
        // Logical position 4 must be the "99b" status. "00P" checksums
        // correctly but is the wrong status.
        match decoder.feed_line(b"00P") {
            Err(Error::ProtocolStatus { line }) => assert_eq!(line, b"00P"),
            other => panic!("expected ProtocolStatus, got {:?}", other),
        }
    }

    #[test]
    fn malformed_header_fails() {
        let params = parameters(0, 10);
        let mut decoder = CaptureDecoder::new(&params);
        match decoder.feed_line(b"XD00000010") {
            Err(Error::MalformedHeader { found }) => assert_eq!(found, Some(b'X')),
            other => panic!("expected MalformedHeader, got {:?}", other),
        }
    }

    #[test]
    fn checksum_mismatch_aborts_the_capture() {
        let params = parameters(0, 3);
        let mut corrupt = data_lines(&[10, 20, 30, 40], &[])[0].clone();
        let last = corrupt.len() - 1;
        corrupt[last] ^= 0x01;

        let mut decoder = CaptureDecoder::new(&params);
        decoder.feed_line(b"GD0000000301").unwrap();
        decoder.feed_line(b"00P").unwrap();
        decoder.feed_line(&timestamp_line(1)).unwrap();
        match decoder.feed_line(&corrupt) {
            Err(Error::ChecksumMismatch) => {}
            other => panic!("expected ChecksumMismatch, got {:?}", other),
        }
    }

    #[test]
    fn data_split_across_lines_decodes_identically() {
        let params = parameters(0, 3);
        let values = [501, 502, 503, 504];
        let whole = {
            let reply = gd_reply(0, 3, 5, &values);
            run(&mut CaptureDecoder::new(&params), &reply).unwrap()
        };

        // Split the 12-byte data payload at every offset, leaving 0..2
        // leftover bytes straddling the line boundary.
        for at in 1..12 {
            let mut reply = vec![
                b"GD0000000301".to_vec(),
                b"00P".to_vec(),
                timestamp_line(5),
            ];
            reply.extend(data_lines(&values, &[at]));
            reply.push(Vec::new());
            let split = run(&mut CaptureDecoder::new(&params), &reply).unwrap();
            assert_eq!(split, whole, "split at {}", at);
        }
    }

    #[test]
    fn terminator_with_pending_unit_is_underflow() {
        let params = parameters(0, 3);
        let mut decoder = CaptureDecoder::new(&params);
        decoder.feed_line(b"GD0000000301").unwrap();
        decoder.feed_line(b"00P").unwrap();
        decoder.feed_line(&timestamp_line(5)).unwrap();
        // 4 encoded bytes: one full unit plus one dangling byte.
        let payload: Vec<u8> = encode(77, 3).into_iter().chain(encode(1, 1)).collect();
        decoder.feed_line(&with_sum(&payload)).unwrap();
        match decoder.feed_line(b"") {
            Err(Error::DecodeUnderflow) => {}
            other => panic!("expected DecodeUnderflow, got {:?}", other),
        }
    }

    #[test]
    fn short_timestamp_line_is_underflow() {
        let params = parameters(0, 3);
        let mut decoder = CaptureDecoder::new(&params);
        decoder.feed_line(b"GD0000000301").unwrap();
        decoder.feed_line(b"00P").unwrap();
        match decoder.feed_line(b"0A") {
            Err(Error::DecodeUnderflow) => {}
            other => panic!("expected DecodeUnderflow, got {:?}", other),
        }
    }

    #[test]
    fn surplus_measurements_are_dropped() {
        let params = parameters(0, 1); // max_size 2
        let reply = gd_reply(0, 1, 3, &[10, 20, 30, 40]);
        let capture = run(&mut CaptureDecoder::new(&params), &reply).unwrap();
        assert_eq!(capture.distances, vec![10, 20]);
    }

    #[test]
    fn decoding_the_same_bytes_twice_is_idempotent() {
        let params = parameters(2, 8);
        let reply = gd_reply(2, 8, 0x00F00D, &[1, 2, 3, 4, 5, 6, 7]);
        let first = run(&mut CaptureDecoder::new(&params), &reply).unwrap();
        let second = run(&mut CaptureDecoder::new(&params), &reply).unwrap();
        assert_eq!(first, second);
    }
}
