use crate::base::{Error, ExchangeDecoder, Result};
use crate::checksum;
use log::{trace, warn};

/// Static sensor information obtained from the PP parameter query.
///
/// Created once per connection and immutable thereafter; the measurable
/// step range and buffer size of every capture derive from it.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorParameters {
    /// Sensor model information (MODL).
    pub model: String,
    /// Minimum measurable distance in millimeters (DMIN).
    pub distance_min: i64,
    /// Maximum measurable distance in millimeters (DMAX).
    pub distance_max: i64,
    /// Angular resolution: total step divisions per revolution (ARES).
    pub area_total: u32,
    /// First measurable step index (AMIN).
    pub area_min: u32,
    /// Last measurable step index (AMAX).
    pub area_max: u32,
    /// Step index of the sensor's front direction (AFRT).
    pub area_front: u32,
    /// Standard motor speed in rpm (SCAN).
    pub scan_rpm: u32,
}

impl SensorParameters {
    /// Starting step of a capture request.
    pub fn first(&self) -> u32 {
        self.area_min
    }

    /// Final step of a capture request.
    pub fn last(&self) -> u32 {
        self.area_max
    }

    /// Number of step slots a capture buffer must hold.
    pub fn max_size(&self) -> usize {
        self.area_max as usize + 1
    }
}

/// Labels of the PP reply's data lines, in the order the device sends them.
const PARAMETER_LABELS: [&str; 8] = [
    "MODL", "DMIN", "DMAX", "ARES", "AMIN", "AMAX", "AFRT", "SCAN",
];

/// Byte offset of the value within a `"XXXX:value..."` parameter line.
const PARAMETER_VALUE_OFFSET: usize = 5;

/// Decodes the PP parameter reply: echo line, status line, then the 8
/// labeled parameter lines, then the empty terminator.
///
/// Line order is fixed by the protocol. A terminator arriving early, or a
/// line carrying the wrong label, fails with
/// [`Error::IncompleteParameters`] naming the first missing line rather
/// than leaving fields uninitialized.
#[derive(Debug, Default)]
pub struct ParametersDecoder {
    line_index: usize,
    model: Option<String>,
    values: [Option<i64>; 7],
}

impl ParametersDecoder {
    pub fn new() -> ParametersDecoder {
        ParametersDecoder::default()
    }

    /// Label of the next expected parameter line, if any remain.
    fn expected_label(&self) -> Option<&'static str> {
        // Parameter lines occupy positions 2..=9, after echo and status.
        self.line_index
            .checked_sub(2)
            .and_then(|i| PARAMETER_LABELS.get(i))
            .copied()
    }

    fn parse_parameter_line(&mut self, label: &'static str, line: &[u8]) -> Result<()> {
        if !line.starts_with(label.as_bytes()) || line.len() <= PARAMETER_VALUE_OFFSET {
            return Err(Error::IncompleteParameters { missing: label });
        }
        let value = &line[PARAMETER_VALUE_OFFSET..];

        if label == "MODL" {
            // The model is free text ending in ';' plus a checksum byte.
            let end = value.len().saturating_sub(2);
            let model = String::from_utf8_lossy(&value[..end]).into_owned();
            trace!("Parameter MODL = {}", model);
            self.model = Some(model);
            return Ok(());
        }

        let digits: Vec<u8> = value
            .iter()
            .take_while(|b| b.is_ascii_digit())
            .copied()
            .collect();
        let parsed = std::str::from_utf8(&digits)
            .ok()
            .and_then(|s| s.parse::<i64>().ok())
            .ok_or_else(|| Error::ProtocolError {
                description: format!("unparsable {} value: {:?}", label, value),
            })?;
        trace!("Parameter {} = {}", label, parsed);
        self.values[self.line_index - 3] = Some(parsed);
        Ok(())
    }

    fn finish(&mut self) -> Result<SensorParameters> {
        let model = self.model.take().ok_or(Error::IncompleteParameters {
            missing: PARAMETER_LABELS[0],
        })?;
        let mut numbers = [0i64; 7];
        for (i, slot) in self.values.iter().enumerate() {
            numbers[i] = slot.ok_or(Error::IncompleteParameters {
                missing: PARAMETER_LABELS[i + 1],
            })?;
        }

        let parameters = SensorParameters {
            model,
            distance_min: numbers[0],
            distance_max: numbers[1],
            area_total: numbers[2] as u32,
            area_min: numbers[3] as u32,
            area_max: numbers[4] as u32,
            area_front: numbers[5] as u32,
            scan_rpm: numbers[6] as u32,
        };

        if !(parameters.area_min <= parameters.area_front
            && parameters.area_front <= parameters.area_max)
        {
            return Err(Error::ProtocolError {
                description: format!(
                    "inconsistent area parameters: AMIN {} AFRT {} AMAX {}",
                    parameters.area_min, parameters.area_front, parameters.area_max
                ),
            });
        }
        Ok(parameters)
    }
}

impl ExchangeDecoder for ParametersDecoder {
    type Output = SensorParameters;

    fn feed_line(&mut self, line: &[u8]) -> Result<Option<SensorParameters>> {
        if line.is_empty() {
            if let Some(label) = self.expected_label() {
                return Err(Error::IncompleteParameters { missing: label });
            }
            return self.finish().map(Some);
        }

        match self.line_index {
            // Echo and status lines; neither is individually parsed.
            0 | 1 => {}
            _ => match self.expected_label() {
                Some(label) => self.parse_parameter_line(label, line)?,
                None => warn!("Ignoring extra parameter line: {:?}", line),
            },
        }
        self.line_index += 1;
        Ok(None)
    }
}

/// Decodes a generic command reply: the command echo, a 2-hex-digit status
/// code with its checksum byte, then the empty terminator. Yields the
/// parsed status code.
#[derive(Debug)]
pub struct StatusDecoder {
    tag: String,
    line_index: usize,
    status: u8,
}

impl StatusDecoder {
    /// # Arguments
    ///
    /// * `tag` - The command text that was sent, used to verify the echo.
    pub fn new(tag: &str) -> StatusDecoder {
        StatusDecoder {
            tag: tag.to_owned(),
            line_index: 0,
            status: 0,
        }
    }

    fn parse_status_line(&mut self, line: &[u8]) -> Result<()> {
        if line.len() < 3 {
            return Err(Error::ProtocolError {
                description: format!("status line too short: {:?}", line),
            });
        }
        if !checksum::validate(&line[..line.len() - 1], line[line.len() - 1]) {
            return Err(Error::ChecksumMismatch);
        }
        let code = std::str::from_utf8(&line[..2])
            .ok()
            .and_then(|s| u8::from_str_radix(s, 16).ok())
            .ok_or_else(|| Error::ProtocolError {
                description: format!("non-hex status code: {:?}", &line[..2]),
            })?;
        trace!("Command {} replied with status {:02X}", self.tag, code);
        self.status = code;
        Ok(())
    }
}

impl ExchangeDecoder for StatusDecoder {
    type Output = u8;

    fn feed_line(&mut self, line: &[u8]) -> Result<Option<u8>> {
        match self.line_index {
            0 => {
                if line != self.tag.as_bytes() {
                    return Err(Error::ProtocolError {
                        description: format!(
                            "command echo mismatch: sent {:?}, got {:?}",
                            self.tag, line
                        ),
                    });
                }
            }
            1 => self.parse_status_line(line)?,
            _ => {
                if !line.is_empty() {
                    return Err(Error::ProtocolError {
                        description: format!("unexpected trailing line: {:?}", line),
                    });
                }
                return Ok(Some(self.status));
            }
        }
        self.line_index += 1;
        Ok(None)
    }
}
