//! # Platform Handles
//!
//! Handles are opaque references to platform resources (pipe endpoints,
//! shared memory regions) that travel alongside an encoded message rather
//! than inside it. The codec never interprets a handle value; it only
//! assigns each one a dense index in the message handle table and writes
//! that index into the buffer as a 32-bit field.
//!
//! Most messages carry no handles and almost none carry more than a few,
//! so the table is a `SmallVec` that stays on the stack for the common
//! case.

use smallvec::SmallVec;

/// Ordered table of handles attached to one message. Append-only while
/// encoding, read-only while decoding.
pub type HandleList = SmallVec<[Handle; 4]>;

/// An opaque platform resource reference.
///
/// The wrapped value is whatever the platform uses to name the resource.
/// It is carried through encode and decode untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle(u64);

impl Handle {
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl From<u64> for Handle {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}
