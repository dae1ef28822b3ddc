//! # Wire Format
//!
//! Constants and header overlays for the canonical wire layout. Everything
//! the encoder emits and the decoder accepts is defined here; the cursor
//! pair in [`crate::encode`] and [`crate::decode`] never hard-codes a size
//! or flag value of its own.
//!
//! ## Message Layout
//!
//! Every message starts with a header whose first two fields describe the
//! header itself:
//!
//! ```text
//! offset  size  field
//! ------  ----  ------------------------------------------------
//!      0     4  header_size   total header bytes (16 or 24)
//!      4     4  field_count   2, or 3 when a request id is present
//!      8     4  name          schema ordinal of the message
//!     12     4  flags         request/response bits
//!     16     8  request_id    present only when field_count >= 3
//! ```
//!
//! The payload follows at `header_size`. All multi-byte fields are
//! little-endian. Pointers are 8-byte self-relative byte distances (zero
//! means null), arrays and strings carry an 8-byte `{num_bytes,
//! num_elements}` header, and every pointee region starts on an 8-byte
//! boundary.
//!
//! ## Header Overlays
//!
//! Header structs are `#[repr(C)]` zerocopy overlays with little-endian
//! field wrappers, so a header can be read in place from a byte slice or
//! blitted into a buffer without a serialization step. Compile-time
//! assertions pin each struct to its wire size.

use eyre::{ensure, eyre, Result};
use zerocopy::little_endian::{U32, U64};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

/// Every pointee region starts on a boundary of this many bytes.
pub const ALIGNMENT: usize = 8;

/// Encoded size of a pointer field (a self-relative byte distance).
pub const POINTER_SIZE: usize = 8;

/// Encoded size of the `{num_bytes, num_elements}` header that precedes
/// array and string payloads.
pub const ARRAY_HEADER_SIZE: usize = 8;

/// Encoded size of the `{size, version}` header that begins every
/// encoded struct.
pub const STRUCT_HEADER_SIZE: usize = 8;

/// Encoded size of a handle field (an index into the message handle table).
pub const HANDLE_SIZE: usize = 4;

/// Message header size without a request id.
pub const MESSAGE_HEADER_SIZE: usize = 16;

/// Message header size with a trailing 8-byte request id.
pub const MESSAGE_WITH_REQUEST_ID_HEADER_SIZE: usize = 24;

/// `field_count` value for a header without a request id.
pub const MESSAGE_HEADER_FIELD_COUNT: u32 = 2;

/// `field_count` value for a header carrying a request id.
pub const MESSAGE_WITH_REQUEST_ID_FIELD_COUNT: u32 = 3;

/// Flag bit set on a request that expects a paired response.
pub const MESSAGE_EXPECTS_RESPONSE: u32 = 1 << 0;

/// Flag bit set on a response message.
pub const MESSAGE_IS_RESPONSE: u32 = 1 << 1;

const _: () = assert!(ALIGNMENT.is_power_of_two());
const _: () = assert!(POINTER_SIZE == ALIGNMENT);
const _: () = assert!(MESSAGE_HEADER_SIZE % ALIGNMENT == 0);
const _: () = assert!(MESSAGE_WITH_REQUEST_ID_HEADER_SIZE == MESSAGE_HEADER_SIZE + 8);

/// Rounds `size` up to the next multiple of [`ALIGNMENT`].
#[inline]
pub const fn align(size: usize) -> usize {
    (size + (ALIGNMENT - 1)) & !(ALIGNMENT - 1)
}

/// Header preceding every encoded array or string payload.
///
/// `num_bytes` counts the header itself plus the payload (padding excluded);
/// `num_elements` counts logical elements, which for strings is the UTF-8
/// byte length.
#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct ArrayHeader {
    num_bytes: U32,
    num_elements: U32,
}

const _: () = assert!(std::mem::size_of::<ArrayHeader>() == ARRAY_HEADER_SIZE);

impl ArrayHeader {
    pub fn new(num_bytes: u32, num_elements: u32) -> Self {
        Self {
            num_bytes: U32::new(num_bytes),
            num_elements: U32::new(num_elements),
        }
    }

    le_accessors! {
        num_bytes: u32,
        num_elements: u32,
    }
}

/// Header beginning every encoded struct.
///
/// `size` is the encoded size of the struct including this header, and
/// `version` is the schema version the sender encoded against. A decoder
/// accepts sizes larger than the layout it knows and ignores the excess.
#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct StructHeader {
    size: U32,
    version: U32,
}

const _: () = assert!(std::mem::size_of::<StructHeader>() == STRUCT_HEADER_SIZE);

impl StructHeader {
    pub fn new(size: u32, version: u32) -> Self {
        Self {
            size: U32::new(size),
            version: U32::new(version),
        }
    }

    le_accessors! {
        size: u32,
        version: u32,
    }
}

/// The 16-byte message header used when no request id is carried.
#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct MessageHeader {
    header_size: U32,
    field_count: U32,
    name: U32,
    flags: U32,
}

const _: () = assert!(std::mem::size_of::<MessageHeader>() == MESSAGE_HEADER_SIZE);

impl MessageHeader {
    pub fn new(name: u32, flags: u32) -> Self {
        Self {
            header_size: U32::new(MESSAGE_HEADER_SIZE as u32),
            field_count: U32::new(MESSAGE_HEADER_FIELD_COUNT),
            name: U32::new(name),
            flags: U32::new(flags),
        }
    }

    /// Overlays the header on the front of `bytes` without copying.
    pub fn from_bytes(bytes: &[u8]) -> Result<&Self> {
        ensure!(
            bytes.len() >= MESSAGE_HEADER_SIZE,
            "buffer too small for message header: {} bytes",
            bytes.len()
        );
        Self::ref_from_bytes(&bytes[..MESSAGE_HEADER_SIZE])
            .map_err(|e| eyre!("failed to overlay message header: {e}"))
    }

    le_accessors! {
        header_size: u32,
        field_count: u32,
        name: u32,
        flags: u32,
    }
}

/// The 24-byte message header used when a request id is carried.
#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct MessageHeaderWithRequestId {
    header_size: U32,
    field_count: U32,
    name: U32,
    flags: U32,
    request_id: U64,
}

const _: () = assert!(
    std::mem::size_of::<MessageHeaderWithRequestId>() == MESSAGE_WITH_REQUEST_ID_HEADER_SIZE
);

impl MessageHeaderWithRequestId {
    pub fn new(name: u32, flags: u32, request_id: u64) -> Self {
        Self {
            header_size: U32::new(MESSAGE_WITH_REQUEST_ID_HEADER_SIZE as u32),
            field_count: U32::new(MESSAGE_WITH_REQUEST_ID_FIELD_COUNT),
            name: U32::new(name),
            flags: U32::new(flags),
            request_id: U64::new(request_id),
        }
    }

    /// Overlays the header on the front of `bytes` without copying.
    pub fn from_bytes(bytes: &[u8]) -> Result<&Self> {
        ensure!(
            bytes.len() >= MESSAGE_WITH_REQUEST_ID_HEADER_SIZE,
            "buffer too small for message header with request id: {} bytes",
            bytes.len()
        );
        Self::ref_from_bytes(&bytes[..MESSAGE_WITH_REQUEST_ID_HEADER_SIZE])
            .map_err(|e| eyre!("failed to overlay message header: {e}"))
    }

    /// Mutable overlay, used to patch the request id of a finished message
    /// in place.
    pub fn from_bytes_mut(bytes: &mut [u8]) -> Result<&mut Self> {
        ensure!(
            bytes.len() >= MESSAGE_WITH_REQUEST_ID_HEADER_SIZE,
            "buffer too small for message header with request id: {} bytes",
            bytes.len()
        );
        Self::mut_from_bytes(&mut bytes[..MESSAGE_WITH_REQUEST_ID_HEADER_SIZE])
            .map_err(|e| eyre!("failed to overlay message header: {e}"))
    }

    le_accessors! {
        header_size: u32,
        field_count: u32,
        name: u32,
        flags: u32,
        request_id: u64,
    }
}
