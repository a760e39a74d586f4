use std::time::Duration;

/// Default per-byte timeout while waiting for sensor responses.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(1000);

/// Maximum framed line length: 64 payload bytes, 3 header bytes, one
/// checksum byte, one terminator, plus reserve.
pub const LINE_LENGTH: usize = 64 + 3 + 1 + 1 + 1 + 16;

/// Maximum bytes of a data line that carry meaning: 64 encoded payload
/// bytes plus the trailing checksum byte. Anything beyond is ignored.
pub const DATA_LINE_LENGTH: usize = 64 + 1;

/// Width in bytes of one encoded distance unit.
pub const DISTANCE_UNIT_WIDTH: usize = 3;

/// Width in bytes of the encoded capture timestamp.
pub const TIMESTAMP_UNIT_WIDTH: usize = 4;

/// Sentinel distance meaning "no measurement at this step index".
pub const NO_MEASUREMENT: i64 = -1;

/// The distinguished capture status line: 2-digit status code "99" plus
/// its checksum byte. Marks the boundary before the timestamp line.
pub const SYNC_STATUS: &[u8; 3] = b"99b";
