//! Fuzz testing for the message reader.
//!
//! This fuzz target feeds arbitrary byte sequences and handle tables
//! through `MessageReader` to ensure malformed messages are rejected
//! gracefully without panicking or reading out of bounds.

#![no_main]

use arbitrary::Arbitrary;
use eyre::Result;
use libfuzzer_sys::fuzz_target;

use wirebuf::wire::STRUCT_HEADER_SIZE;
use wirebuf::{Decoder, Encoder, Handle, HandleList, Message, MessageReader, WireStruct};

#[derive(Debug, Arbitrary)]
struct ReaderInput {
    data: Vec<u8>,
    handles: Vec<u64>,
}

#[derive(Debug)]
struct ProbeData {
    id: u32,
    endpoint: Handle,
    label: Option<String>,
    samples: Option<Vec<u64>>,
    origin: Option<(i32, i32)>,
}

/// Bare coordinate pair behind a pointer.
struct Pair;

impl WireStruct for Pair {
    type Value = (i32, i32);
    const ENCODED_SIZE: usize = 8;

    fn encode_body(encoder: &mut Encoder<'_>, value: &(i32, i32)) -> Result<()> {
        encoder.write_i32(value.0)?;
        encoder.write_i32(value.1)
    }

    fn decode_body(decoder: &mut Decoder<'_>) -> Result<(i32, i32)> {
        Ok((decoder.read_i32()?, decoder.read_i32()?))
    }
}

/// Touches every field shape the decoder knows: scalars, handles, and
/// all three pointer kinds.
struct Probe;

impl WireStruct for Probe {
    type Value = ProbeData;
    const ENCODED_SIZE: usize = STRUCT_HEADER_SIZE + 32;

    fn encode_body(encoder: &mut Encoder<'_>, value: &ProbeData) -> Result<()> {
        encoder.write_u32(Self::ENCODED_SIZE as u32)?;
        encoder.write_u32(0)?;
        encoder.write_u32(value.id)?;
        encoder.encode_handle(value.endpoint)?;
        encoder.encode_string_pointer(value.label.as_deref())?;
        encoder.encode_array_pointer::<u64>(value.samples.as_deref())?;
        encoder.encode_struct_pointer::<Pair>(value.origin.as_ref())
    }

    fn decode_body(decoder: &mut Decoder<'_>) -> Result<ProbeData> {
        decoder.skip(STRUCT_HEADER_SIZE)?;
        Ok(ProbeData {
            id: decoder.read_u32()?,
            endpoint: decoder.decode_handle()?,
            label: decoder.decode_string_pointer()?.map(str::to_owned),
            samples: decoder.decode_array_pointer::<u64>()?,
            origin: decoder.decode_struct_pointer::<Pair>()?,
        })
    }
}

fuzz_target!(|input: ReaderInput| {
    if input.data.len() > 1 << 16 || input.handles.len() > 64 {
        return;
    }

    let mut handles = HandleList::new();
    for raw in &input.handles {
        handles.push(Handle::from_raw(*raw));
    }
    let mut message = Message::from_parts(input.data, handles);

    let _ = message.name();
    let _ = message.flags();
    let _ = message.expects_response();
    let _ = message.set_request_id(7);

    if let Ok(mut reader) = MessageReader::new(&message) {
        let _ = reader.payload_size();
        let _ = reader.request_id();
        let _ = reader.decode_struct::<Probe>();
    }
});
