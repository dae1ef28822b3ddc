//! # wirebuf - Schema-Driven Binary Message Codec
//!
//! wirebuf encodes structured messages (structs, arrays, strings, handles)
//! into a flat byte buffer and decodes them back, for cross-process
//! messaging where the bytes must be bit-exact on both sides. The design
//! prioritizes:
//!
//! - **Position independence**: nested data is reached through relative
//!   pointers, so a finished buffer needs no relocation pass
//! - **Canonical bytes**: every field is little-endian on the wire
//!   regardless of host, with 8-byte aligned payload regions
//! - **Fail-fast decoding**: malformed input is rejected with a
//!   descriptive error, never partially decoded
//!
//! ## Quick Start
//!
//! ```ignore
//! use wirebuf::{MessageBuilder, MessageReader};
//!
//! // `Rect` is a generated binding implementing `WireStruct`.
//! let mut builder = MessageBuilder::new(MSG_DRAW_RECT, 64)?;
//! builder.encode_struct::<Rect>(&rect)?;
//! let message = builder.finish();
//!
//! // ... transport moves message.data() and message.handles() ...
//!
//! let mut reader = MessageReader::new(&message)?;
//! assert_eq!(reader.name(), MSG_DRAW_RECT);
//! let rect = reader.decode_struct::<Rect>()?;
//! ```
//!
//! ## Architecture
//!
//! wirebuf uses a layered architecture:
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │   Message / Builders / MessageReader     │  envelope + header
//! ├──────────────────────────────────────────┤
//! │ Type Descriptors (WireType / WireStruct) │  schema-driven dispatch
//! ├─────────────────────┬────────────────────┤
//! │    Encoder cursor   │   Decoder cursor   │  per-structure regions
//! ├─────────────────────┴────────────────────┤
//! │     Growable buffer + LE primitives      │  offsets, canonical bytes
//! └──────────────────────────────────────────┘
//! ```
//!
//! ## Wire Format
//!
//! A message is a 16-byte header (24 with a request id), then the payload
//! struct, then every pointer-indirected region in allocation order:
//!
//! ```text
//! ┌────────────────┬───────────────┬─────────────┬─────────────┬───┐
//! │ message header │ payload struct│ pointee #1  │ pointee #2  │...│
//! │   16/24 bytes  │ inline fields │ 8-aligned   │ 8-aligned   │   │
//! └────────────────┴───────────────┴─────────────┴─────────────┴───┘
//! ```
//!
//! Pointer fields hold the byte distance from the field to its pointee
//! (zero means null). Platform handles travel out-of-band in a table next
//! to the bytes; the buffer only stores their indices.
//!
//! ## Module Overview
//!
//! - [`buffer`]: growable byte store with canonical little-endian access
//! - [`wire`]: format constants and zerocopy header overlays
//! - [`encode`]: per-structure write cursor, pointer and region discipline
//! - [`decode`]: bounds-checked read cursor over untrusted bytes
//! - [`types`]: the closed descriptor table, open to generated bindings
//! - [`handle`]: opaque platform handles and the per-message table
//! - [`message`]: builders, sealed messages, validated reader

#[macro_use]
mod macros;

pub mod buffer;
pub mod decode;
pub mod encode;
pub mod handle;
pub mod message;
pub mod types;
pub mod wire;

pub use decode::Decoder;
pub use encode::Encoder;
pub use handle::{Handle, HandleList};
pub use message::{Message, MessageBuilder, MessageReader, MessageWithRequestIdBuilder};
pub use types::{ArrayOf, PointerTo, Utf8String, WireStruct, WireType};
