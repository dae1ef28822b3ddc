//! # Wire Type Descriptors
//!
//! The closed table of types the codec can put on the wire. Every
//! descriptor implements [`WireType`], which names the in-memory value it
//! carries, the fixed number of bytes its inline field occupies, and the
//! encode/decode entry points that drive the cursors.
//!
//! ## Descriptor Table
//!
//! | Descriptor          | Value                   | Inline bytes |
//! |---------------------|-------------------------|--------------|
//! | `i8`/`u8`           | itself                  | 1            |
//! | `i16`/`u16`         | itself                  | 2            |
//! | `i32`/`u32`/`f32`   | itself                  | 4            |
//! | `i64`/`u64`/`f64`   | itself                  | 8            |
//! | [`Handle`]          | `Handle`                | 4 (index)    |
//! | [`Utf8String`]      | `Option<String>`        | 8 (pointer)  |
//! | [`PointerTo<S>`]    | `Option<S::Value>`      | 8 (pointer)  |
//! | [`ArrayOf<T>`]      | `Option<Vec<T::Value>>` | 8 (pointer)  |
//!
//! Scalar primitives are their own descriptors, so `ArrayOf<u32>` reads
//! the way the schema language does. Pointer-indirected descriptors keep
//! an 8-byte slot inline and put the payload in a separately allocated
//! aligned region, which is what keeps the table closed under
//! composition: any descriptor can be an array element, and any struct
//! can sit behind a pointer.
//!
//! ## Structs
//!
//! Struct layouts come from generated bindings, one [`WireStruct`] impl
//! per schema struct. The implementation owns its body layout; bindings
//! begin the body with a [`StructHeader`](crate::wire::StructHeader) and
//! declare `ENCODED_SIZE` as the header plus all inline fields, rounded
//! up to a multiple of 8 by the generator.

use std::marker::PhantomData;

use eyre::Result;

use crate::decode::Decoder;
use crate::encode::Encoder;
use crate::handle::Handle;
use crate::wire::{HANDLE_SIZE, POINTER_SIZE};

/// One row of the descriptor table: how a single logical type is encoded
/// into and decoded out of a message.
pub trait WireType {
    /// In-memory representation this descriptor carries.
    type Value;

    /// Bytes the inline field occupies inside its enclosing structure.
    const ENCODED_SIZE: usize;

    fn encode(encoder: &mut Encoder<'_>, value: &Self::Value) -> Result<()>;

    fn decode(decoder: &mut Decoder<'_>) -> Result<Self::Value>;
}

/// A schema struct's wire layout, normally implemented by generated
/// bindings. `ENCODED_SIZE` is the full inline size of the struct body
/// including its leading struct header.
pub trait WireStruct {
    type Value;

    const ENCODED_SIZE: usize;

    fn encode_body(encoder: &mut Encoder<'_>, value: &Self::Value) -> Result<()>;

    fn decode_body(decoder: &mut Decoder<'_>) -> Result<Self::Value>;
}

impl WireType for u8 {
    type Value = u8;
    const ENCODED_SIZE: usize = 1;

    fn encode(encoder: &mut Encoder<'_>, value: &u8) -> Result<()> {
        encoder.write_u8(*value)
    }

    fn decode(decoder: &mut Decoder<'_>) -> Result<u8> {
        decoder.read_u8()
    }
}

impl WireType for i8 {
    type Value = i8;
    const ENCODED_SIZE: usize = 1;

    fn encode(encoder: &mut Encoder<'_>, value: &i8) -> Result<()> {
        encoder.write_i8(*value)
    }

    fn decode(decoder: &mut Decoder<'_>) -> Result<i8> {
        decoder.read_i8()
    }
}

impl WireType for u16 {
    type Value = u16;
    const ENCODED_SIZE: usize = 2;

    fn encode(encoder: &mut Encoder<'_>, value: &u16) -> Result<()> {
        encoder.write_u16(*value)
    }

    fn decode(decoder: &mut Decoder<'_>) -> Result<u16> {
        decoder.read_u16()
    }
}

impl WireType for i16 {
    type Value = i16;
    const ENCODED_SIZE: usize = 2;

    fn encode(encoder: &mut Encoder<'_>, value: &i16) -> Result<()> {
        encoder.write_i16(*value)
    }

    fn decode(decoder: &mut Decoder<'_>) -> Result<i16> {
        decoder.read_i16()
    }
}

impl WireType for u32 {
    type Value = u32;
    const ENCODED_SIZE: usize = 4;

    fn encode(encoder: &mut Encoder<'_>, value: &u32) -> Result<()> {
        encoder.write_u32(*value)
    }

    fn decode(decoder: &mut Decoder<'_>) -> Result<u32> {
        decoder.read_u32()
    }
}

impl WireType for i32 {
    type Value = i32;
    const ENCODED_SIZE: usize = 4;

    fn encode(encoder: &mut Encoder<'_>, value: &i32) -> Result<()> {
        encoder.write_i32(*value)
    }

    fn decode(decoder: &mut Decoder<'_>) -> Result<i32> {
        decoder.read_i32()
    }
}

impl WireType for u64 {
    type Value = u64;
    const ENCODED_SIZE: usize = 8;

    fn encode(encoder: &mut Encoder<'_>, value: &u64) -> Result<()> {
        encoder.write_u64(*value)
    }

    fn decode(decoder: &mut Decoder<'_>) -> Result<u64> {
        decoder.read_u64()
    }
}

impl WireType for i64 {
    type Value = i64;
    const ENCODED_SIZE: usize = 8;

    fn encode(encoder: &mut Encoder<'_>, value: &i64) -> Result<()> {
        encoder.write_i64(*value)
    }

    fn decode(decoder: &mut Decoder<'_>) -> Result<i64> {
        decoder.read_i64()
    }
}

impl WireType for f32 {
    type Value = f32;
    const ENCODED_SIZE: usize = 4;

    fn encode(encoder: &mut Encoder<'_>, value: &f32) -> Result<()> {
        encoder.write_f32(*value)
    }

    fn decode(decoder: &mut Decoder<'_>) -> Result<f32> {
        decoder.read_f32()
    }
}

impl WireType for f64 {
    type Value = f64;
    const ENCODED_SIZE: usize = 8;

    fn encode(encoder: &mut Encoder<'_>, value: &f64) -> Result<()> {
        encoder.write_f64(*value)
    }

    fn decode(decoder: &mut Decoder<'_>) -> Result<f64> {
        decoder.read_f64()
    }
}

impl WireType for Handle {
    type Value = Handle;
    const ENCODED_SIZE: usize = HANDLE_SIZE;

    fn encode(encoder: &mut Encoder<'_>, value: &Handle) -> Result<()> {
        encoder.encode_handle(*value)
    }

    fn decode(decoder: &mut Decoder<'_>) -> Result<Handle> {
        decoder.decode_handle()
    }
}

/// Nullable UTF-8 string carried behind a pointer.
pub struct Utf8String;

impl WireType for Utf8String {
    type Value = Option<String>;
    const ENCODED_SIZE: usize = POINTER_SIZE;

    fn encode(encoder: &mut Encoder<'_>, value: &Option<String>) -> Result<()> {
        encoder.encode_string_pointer(value.as_deref())
    }

    fn decode(decoder: &mut Decoder<'_>) -> Result<Option<String>> {
        Ok(decoder.decode_string_pointer()?.map(str::to_owned))
    }
}

/// Nullable struct carried behind a pointer.
pub struct PointerTo<S>(PhantomData<S>);

impl<S: WireStruct> WireType for PointerTo<S> {
    type Value = Option<S::Value>;
    const ENCODED_SIZE: usize = POINTER_SIZE;

    fn encode(encoder: &mut Encoder<'_>, value: &Option<S::Value>) -> Result<()> {
        encoder.encode_struct_pointer::<S>(value.as_ref())
    }

    fn decode(decoder: &mut Decoder<'_>) -> Result<Option<S::Value>> {
        decoder.decode_struct_pointer::<S>()
    }
}

/// Nullable array of any descriptor, carried behind a pointer.
pub struct ArrayOf<T>(PhantomData<T>);

impl<T: WireType> WireType for ArrayOf<T> {
    type Value = Option<Vec<T::Value>>;
    const ENCODED_SIZE: usize = POINTER_SIZE;

    fn encode(encoder: &mut Encoder<'_>, value: &Option<Vec<T::Value>>) -> Result<()> {
        encoder.encode_array_pointer::<T>(value.as_deref())
    }

    fn decode(decoder: &mut Decoder<'_>) -> Result<Option<Vec<T::Value>>> {
        decoder.decode_array_pointer::<T>()
    }
}
