//! Fuzz testing for encode/decode round-trips.
//!
//! This fuzz target builds a message from arbitrary payload values and
//! reads it back to ensure the decoded payload always matches what was
//! encoded, across both envelope variants.

#![no_main]

use arbitrary::Arbitrary;
use eyre::Result;
use libfuzzer_sys::fuzz_target;

use wirebuf::wire::STRUCT_HEADER_SIZE;
use wirebuf::{
    Decoder, Encoder, Handle, MessageBuilder, MessageReader, MessageWithRequestIdBuilder,
    WireStruct,
};

#[derive(Debug, Arbitrary)]
struct RoundtripInput {
    name: u32,
    request_id: Option<u64>,
    id: u32,
    delta: i64,
    ratio: f64,
    endpoint: u64,
    label: Option<String>,
    samples: Option<Vec<u64>>,
}

#[derive(Debug)]
struct PayloadData {
    id: u32,
    endpoint: Handle,
    delta: i64,
    ratio: f64,
    label: Option<String>,
    samples: Option<Vec<u64>>,
}

struct Payload;

impl WireStruct for Payload {
    type Value = PayloadData;
    const ENCODED_SIZE: usize = STRUCT_HEADER_SIZE + 40;

    fn encode_body(encoder: &mut Encoder<'_>, value: &PayloadData) -> Result<()> {
        encoder.write_u32(Self::ENCODED_SIZE as u32)?;
        encoder.write_u32(0)?;
        encoder.write_u32(value.id)?;
        encoder.encode_handle(value.endpoint)?;
        encoder.write_i64(value.delta)?;
        encoder.write_f64(value.ratio)?;
        encoder.encode_string_pointer(value.label.as_deref())?;
        encoder.encode_array_pointer::<u64>(value.samples.as_deref())
    }

    fn decode_body(decoder: &mut Decoder<'_>) -> Result<PayloadData> {
        decoder.skip(STRUCT_HEADER_SIZE)?;
        Ok(PayloadData {
            id: decoder.read_u32()?,
            endpoint: decoder.decode_handle()?,
            delta: decoder.read_i64()?,
            ratio: decoder.read_f64()?,
            label: decoder.decode_string_pointer()?.map(str::to_owned),
            samples: decoder.decode_array_pointer::<u64>()?,
        })
    }
}

fuzz_target!(|input: RoundtripInput| {
    let label_len = input.label.as_ref().map_or(0, String::len);
    let samples_len = input.samples.as_ref().map_or(0, Vec::len);
    if label_len > 4096 || samples_len > 4096 {
        return;
    }

    let payload = PayloadData {
        id: input.id,
        endpoint: Handle::from_raw(input.endpoint),
        delta: input.delta,
        ratio: input.ratio,
        label: input.label,
        samples: input.samples,
    };

    let message = match input.request_id {
        Some(request_id) => {
            let mut builder =
                MessageWithRequestIdBuilder::new(input.name, 64, 1, request_id).unwrap();
            builder.encode_struct::<Payload>(&payload).unwrap();
            builder.finish()
        }
        None => {
            let mut builder = MessageBuilder::new(input.name, 64).unwrap();
            builder.encode_struct::<Payload>(&payload).unwrap();
            builder.finish()
        }
    };

    let mut reader = MessageReader::new(&message).unwrap();
    assert_eq!(reader.name(), input.name);
    assert_eq!(reader.request_id(), input.request_id);

    let decoded = reader.decode_struct::<Payload>().unwrap();
    assert_eq!(decoded.id, payload.id);
    assert_eq!(decoded.endpoint, payload.endpoint);
    assert_eq!(decoded.delta, payload.delta);
    assert_eq!(decoded.ratio.to_bits(), payload.ratio.to_bits());
    assert_eq!(decoded.label, payload.label);
    assert_eq!(decoded.samples, payload.samples);
});
