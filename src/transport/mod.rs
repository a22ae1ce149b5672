//! USB bulk transport seam
//!
//! The engine never talks to the device controller directly; the embedding
//! firmware hands it something implementing [BulkTransport]. Descriptor
//! registration, endpoint setup and speed negotiation all happen on the
//! other side of this trait.

use core::fmt::Debug;

pub(crate) mod bulk;

/// Blocking packet I/O over the interface's bulk endpoint pair.
///
/// Both calls move at most one USB packet. `receive` blocks until an OUT
/// transfer completes. `send` blocks until the IN transfer completes or a
/// transport-defined timeout elapses; hosts stop draining the IN pipe when
/// a desktop dialog interrupts a copy, and a bounded wait (the reference
/// controller uses one millisecond) keeps the engine from stalling forever.
///
/// Errors abort the transaction in flight and surface from
/// [MtpResponder::poll]; the engine performs no bus-level recovery.
///
/// [MtpResponder::poll]: crate::responder::MtpResponder::poll
pub trait BulkTransport {
    type Error: Debug;

    /// Block until one OUT transfer lands in `buf`; returns the byte count.
    fn receive(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error>;

    /// Send `buf` as a single IN transfer.
    fn send(&mut self, buf: &[u8]) -> Result<(), Self::Error>;
}
