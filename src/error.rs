//! The driver's caller-actionable error type.
//!
//! Protocol-level faults (framing loss, CRC mismatch, queue overflow,
//! receive starvation) are *not* represented here - the parser's state
//! machine recovers or escalates those itself (see [`crate::parser::ParserState`]
//! and [`crate::parser::ParserFault`]). `DriverError` covers only the
//! handful of things a caller of `Driver::start`/`stop`/etc. can actually do
//! something about.

/// Errors returned by [`crate::Driver`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub enum DriverError {
    /// The transport did not accept every byte of a command frame.
    TransportWrite,
    /// `DriverConfig::max_queue_elements` exceeds the queue's const-generic
    /// capacity; caught at construction time instead of silently clamping.
    QueueTooSmall,
}
