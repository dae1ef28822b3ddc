//! # Message Envelope
//!
//! The public entry points of the codec. A message is built once, shipped
//! as an immutable value, and read any number of times:
//!
//! ```text
//! MessageBuilder / MessageWithRequestIdBuilder
//!     │  encode_struct(payload)
//!     ▼
//! Message          trimmed bytes + handle table, immutable
//!     │  MessageReader::new
//!     ▼
//! MessageReader    validated header + decode_struct(payload)
//! ```
//!
//! The builder writes the fixed header described in [`crate::wire`] at
//! offset zero, then encodes the payload struct immediately after it.
//! `finish` consumes the builder, trims the buffer to its exact used
//! size, and yields the [`Message`]; there is no way to touch a builder
//! after finishing by construction.
//!
//! ## Request Correlation
//!
//! A message built with [`MessageWithRequestIdBuilder`] carries a 64-bit
//! request id in an extended 24-byte header, advertised on the wire by a
//! field count of 3. Routers may stamp the id later through
//! [`Message::set_request_id`], which verifies the header actually
//! reserved the field instead of writing into payload bytes.
//!
//! ## Reading
//!
//! [`MessageReader`] validates the header eagerly: a header size that
//! contradicts the message length, a field count the format does not
//! define, or a promised request id with no room for it all reject the
//! message up front. Payload decoding then starts exactly at
//! `header_size`, whatever padding the sender left.

use eyre::{ensure, Result};
use zerocopy::IntoBytes;

use crate::buffer::Buffer;
use crate::decode::Decoder;
use crate::encode::Encoder;
use crate::handle::HandleList;
use crate::types::WireStruct;
use crate::wire::{
    MessageHeader, MessageHeaderWithRequestId, MESSAGE_EXPECTS_RESPONSE,
    MESSAGE_HEADER_FIELD_COUNT, MESSAGE_HEADER_SIZE, MESSAGE_IS_RESPONSE,
    MESSAGE_WITH_REQUEST_ID_FIELD_COUNT, MESSAGE_WITH_REQUEST_ID_HEADER_SIZE,
};

/// A finalized message: exact-size encoded bytes plus the handle table
/// that travels alongside them.
#[derive(Debug)]
pub struct Message {
    data: Vec<u8>,
    handles: HandleList,
}

impl Message {
    /// Reassembles a message received from a transport.
    pub fn from_parts(data: Vec<u8>, handles: HandleList) -> Self {
        Self { data, handles }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn handles(&self) -> &HandleList {
        &self.handles
    }

    /// Splits the message for handoff to a transport.
    pub fn into_parts(self) -> (Vec<u8>, HandleList) {
        (self.data, self.handles)
    }

    pub fn name(&self) -> Result<u32> {
        Ok(MessageHeader::from_bytes(&self.data)?.name())
    }

    pub fn flags(&self) -> Result<u32> {
        Ok(MessageHeader::from_bytes(&self.data)?.flags())
    }

    pub fn expects_response(&self) -> Result<bool> {
        Ok(self.flags()? & MESSAGE_EXPECTS_RESPONSE != 0)
    }

    pub fn is_response(&self) -> Result<bool> {
        Ok(self.flags()? & MESSAGE_IS_RESPONSE != 0)
    }

    /// Overwrites the request id of an already-built message in place.
    ///
    /// Fails unless the header was built with room for the field, so a
    /// message without one can never have payload bytes clobbered.
    pub fn set_request_id(&mut self, request_id: u64) -> Result<()> {
        let header = MessageHeaderWithRequestId::from_bytes_mut(&mut self.data)?;
        ensure!(
            header.field_count() >= MESSAGE_WITH_REQUEST_ID_FIELD_COUNT
                && header.header_size() as usize >= MESSAGE_WITH_REQUEST_ID_HEADER_SIZE,
            "message header reserves no request id field (field count {}, header size {})",
            header.field_count(),
            header.header_size()
        );
        header.set_request_id(request_id);
        Ok(())
    }
}

/// Builds a message with the 16-byte header and no request id.
pub struct MessageBuilder {
    buffer: Buffer,
    handles: HandleList,
}

impl MessageBuilder {
    /// `payload_size_hint` pre-sizes the buffer; the buffer still grows
    /// if the payload runs larger.
    pub fn new(name: u32, payload_size_hint: usize) -> Result<Self> {
        let mut buffer = Buffer::with_capacity(MESSAGE_HEADER_SIZE + payload_size_hint)?;
        let header_at = buffer.alloc(MESSAGE_HEADER_SIZE)?;
        buffer.set_bytes(header_at, MessageHeader::new(name, 0).as_bytes());
        Ok(Self {
            buffer,
            handles: HandleList::new(),
        })
    }

    /// Encodes the payload struct immediately after the header.
    pub fn encode_struct<S: WireStruct>(&mut self, value: &S::Value) -> Result<()> {
        let base = self.buffer.alloc(S::ENCODED_SIZE)?;
        let limit = base + S::ENCODED_SIZE;
        let mut encoder = Encoder::new(&mut self.buffer, &mut self.handles, base, limit);
        S::encode_body(&mut encoder, value)
    }

    /// Trims the buffer to its exact used size and seals the message.
    pub fn finish(mut self) -> Message {
        self.buffer.trim();
        Message {
            data: self.buffer.into_vec(),
            handles: self.handles,
        }
    }
}

/// Builds a message with the 24-byte header carrying a request id and
/// caller-chosen flag bits.
pub struct MessageWithRequestIdBuilder {
    inner: MessageBuilder,
}

impl MessageWithRequestIdBuilder {
    pub fn new(name: u32, payload_size_hint: usize, flags: u32, request_id: u64) -> Result<Self> {
        let mut buffer =
            Buffer::with_capacity(MESSAGE_WITH_REQUEST_ID_HEADER_SIZE + payload_size_hint)?;
        let header_at = buffer.alloc(MESSAGE_WITH_REQUEST_ID_HEADER_SIZE)?;
        buffer.set_bytes(
            header_at,
            MessageHeaderWithRequestId::new(name, flags, request_id).as_bytes(),
        );
        Ok(Self {
            inner: MessageBuilder {
                buffer,
                handles: HandleList::new(),
            },
        })
    }

    pub fn encode_struct<S: WireStruct>(&mut self, value: &S::Value) -> Result<()> {
        self.inner.encode_struct::<S>(value)
    }

    pub fn finish(self) -> Message {
        self.inner.finish()
    }
}

/// Validated view over a received message, positioned to decode the
/// payload.
#[derive(Debug)]
pub struct MessageReader<'a> {
    decoder: Decoder<'a>,
    header_size: u32,
    field_count: u32,
    name: u32,
    flags: u32,
    request_id: Option<u64>,
    payload_size: usize,
}

impl<'a> MessageReader<'a> {
    pub fn new(message: &'a Message) -> Result<Self> {
        let mut decoder = Decoder::new(message.data(), message.handles(), 0);
        let header_size = decoder.read_u32()?;
        let field_count = decoder.read_u32()?;
        let name = decoder.read_u32()?;
        let flags = decoder.read_u32()?;

        ensure!(
            header_size as usize >= MESSAGE_HEADER_SIZE,
            "header size {header_size} below the {MESSAGE_HEADER_SIZE}-byte minimum"
        );
        ensure!(
            header_size as usize <= message.data().len(),
            "header size {header_size} exceeds the {}-byte message",
            message.data().len()
        );

        let request_id = if field_count >= MESSAGE_WITH_REQUEST_ID_FIELD_COUNT {
            ensure!(
                header_size as usize >= MESSAGE_WITH_REQUEST_ID_HEADER_SIZE,
                "field count {field_count} promises a request id but the header is only {header_size} bytes"
            );
            Some(decoder.read_u64()?)
        } else {
            ensure!(
                field_count == MESSAGE_HEADER_FIELD_COUNT,
                "unexpected header field count {field_count}"
            );
            None
        };

        // land exactly on header_size, past any padding
        let consumed = if request_id.is_some() {
            MESSAGE_WITH_REQUEST_ID_HEADER_SIZE
        } else {
            MESSAGE_HEADER_SIZE
        };
        decoder.skip(header_size as usize - consumed)?;

        Ok(Self {
            decoder,
            header_size,
            field_count,
            name,
            flags,
            request_id,
            payload_size: message.data().len() - header_size as usize,
        })
    }

    pub fn header_size(&self) -> u32 {
        self.header_size
    }

    pub fn field_count(&self) -> u32 {
        self.field_count
    }

    pub fn name(&self) -> u32 {
        self.name
    }

    pub fn flags(&self) -> u32 {
        self.flags
    }

    pub fn expects_response(&self) -> bool {
        self.flags & MESSAGE_EXPECTS_RESPONSE != 0
    }

    pub fn is_response(&self) -> bool {
        self.flags & MESSAGE_IS_RESPONSE != 0
    }

    /// Correlation id, present only when the header carries one.
    pub fn request_id(&self) -> Option<u64> {
        self.request_id
    }

    pub fn payload_size(&self) -> usize {
        self.payload_size
    }

    /// Decodes the payload struct starting at `header_size`.
    pub fn decode_struct<S: WireStruct>(&mut self) -> Result<S::Value> {
        self.decoder.decode_struct::<S>()
    }
}
