// SCIP2.0 commands are ASCII tags, newline terminated and case sensitive.

/// Command to switch a sensor from SCIP1.1 to SCIP2.0 mode.
pub const CMD_SCIP2: &str = "SCIP2.0";

/// Command to query the sensor parameter block (PP).
pub const CMD_GET_PARAMETERS: &str = "PP";

/// Command to switch the laser on and enter the measurement state (BM).
pub const CMD_LASER_ON: &str = "BM";

/// Command to stop measuring and return to the idle state (QT).
pub const CMD_LASER_OFF: &str = "QT";

/// Status codes with which the sensor accepts an SS baud-change request.
/// 0 is plain success; 3 and 4 mean the rate was already in effect or the
/// interface ignores baud settings, both fine for the caller.
pub const BAUDRATE_ACCEPTED_STATUSES: [u8; 3] = [0, 3, 4];

/// Cluster count sent with every capture request; measurements are never
/// merged device-side.
const CLUSTER_COUNT: u32 = 1;

/// Builds the SS command requesting a new baud rate.
pub fn baudrate_command(baudrate: u32) -> String {
    format!("SS{:06}", baudrate)
}

/// Builds the GD command for a one-shot capture of steps `first..=last`.
pub fn gd_command(first: u32, last: u32) -> String {
    format!("GD{:04}{:04}{:02}", first, last, CLUSTER_COUNT)
}

/// Builds the MD command for `times` successive captures of steps
/// `first..=last`. The count field holds two digits; 100 or more requests
/// the open-ended form (0, capture until explicitly stopped).
pub fn md_command(first: u32, last: u32, times: u32) -> String {
    let times = if times >= 100 { 0 } else { times };
    format!("MD{:04}{:04}{:02}0{:02}", first, last, CLUSTER_COUNT, times)
}
