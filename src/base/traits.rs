use crate::base::error::Result;

/// Defines the behavior for interpreting the framed lines of one SCIP2.0
/// command/response exchange.
///
/// A decoder is created fresh for every exchange, fed each framed line in
/// order, and yields its output once the exchange terminates. Implementors
/// must not carry state from one exchange into the next.
pub trait ExchangeDecoder {
    /// The value produced when the exchange completes.
    type Output;

    /// Feeds the next framed line (terminator stripped) to the decoder.
    ///
    /// Returns `Ok(Some(output))` when the line completed the exchange,
    /// `Ok(None)` when more lines are expected, and an error when the line
    /// is invalid for the current position. Any error aborts the exchange;
    /// the decoder must not be fed afterwards.
    ///
    /// # Arguments
    ///
    /// * `line` - The payload bytes of one framed line. May be empty; a
    ///   zero-length line is a meaningful result (the exchange terminator).
    fn feed_line(&mut self, line: &[u8]) -> Result<Option<Self::Output>>;
}
