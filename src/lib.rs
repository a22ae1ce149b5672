//! PTP/MTP responder engine over a USB bulk transport
//!
//! The crate implements the responder half of the Media Transfer Protocol:
//! container framing on the bulk pipe pair, the Command/Data/Response
//! transaction machine, the operation dispatch table and the object-handle
//! allocator. The USB device controller and the filesystem stay outside,
//! behind the [BulkTransport] and [VolumeProvider] traits.
//!
//! One [MtpResponder::poll] call serves exactly one transaction: it blocks
//! until the initiator sends a Command container, runs the operation against
//! the registered storages, streams a Data container back when the operation
//! produces one, and finishes with a Response container carrying the same
//! transaction id.
//!
//! # Features
//! | Feature | Description                                                      |
//! | ------- |------------------------------------------------------------------|
//! | `defmt` | Enable logging via [defmt](https://crates.io/crates/defmt) crate |
//! | `log`   | Enable logging via [log](https://crates.io/crates/log) crate     |
//!
//! [BulkTransport]: crate::transport::BulkTransport
//! [VolumeProvider]: crate::volume::VolumeProvider
//! [MtpResponder::poll]: crate::responder::MtpResponder::poll

#![no_std]

extern crate alloc;

pub(crate) mod buffer;
pub(crate) mod codec;
pub(crate) mod fmt;
pub(crate) mod registry;

pub mod codes;
pub mod container;
pub mod responder;
pub mod transport;
pub mod volume;

pub use responder::{MtpCommand, MtpResponder};
pub use transport::BulkTransport;
pub use volume::{ObjectRead, ObjectTimes, VolumeProvider, VolumeStat};

/// Still Image interface class carrying PTP/MTP functions
pub const CLASS_STILL_IMAGE: u8 = 0x06;
/// Still Image Capture subclass
pub const SUBCLASS_STILL_IMAGE_CAPTURE: u8 = 0x01;
/// PIMA 15740 bulk-only interface protocol
pub const PROTOCOL_PIMA15740: u8 = 0x01;
