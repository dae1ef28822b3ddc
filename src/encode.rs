//! # Encoder Cursor
//!
//! Writes one structure's fields in schema order into a shared [`Buffer`].
//! Each encoder owns a contiguous region `[base, limit)`; sequential writes
//! advance an internal cursor and fail rather than spill past the region
//! boundary.
//!
//! Nested structures never share a cursor. [`Encoder::nested`] allocates a
//! fresh 8-byte aligned region further along the buffer, writes the
//! connecting relative pointer into the current field slot, and returns a
//! child encoder that borrows the parent exclusively until the child's
//! structure is fully written.
//!
//! ## Pointers
//!
//! A pointer field stores the byte distance from the field itself to the
//! pointee, so a finished buffer can be handed to a transport without any
//! relocation pass. The zero distance encodes null. Pointees are always
//! allocated past their pointer field.
//!
//! ## Unsigned Writers
//!
//! `write_u8`..`write_u64` take native unsigned values and cannot express
//! invalid input. The `write_uint8`..`write_uint64` variants take `i64`
//! for callers holding signed intermediates and reject values that are
//! negative or too wide for the field, leaving the cursor untouched.

use eyre::{ensure, eyre, Result};
use zerocopy::IntoBytes;

use crate::buffer::Buffer;
use crate::handle::{Handle, HandleList};
use crate::types::{WireStruct, WireType};
use crate::wire::{align, ArrayHeader, ARRAY_HEADER_SIZE};

pub struct Encoder<'a> {
    buffer: &'a mut Buffer,
    handles: &'a mut HandleList,
    base: usize,
    next: usize,
    limit: usize,
}

impl<'a> Encoder<'a> {
    pub(crate) fn new(
        buffer: &'a mut Buffer,
        handles: &'a mut HandleList,
        base: usize,
        limit: usize,
    ) -> Self {
        Self {
            buffer,
            handles,
            base,
            next: base,
            limit,
        }
    }

    /// Start offset of the region this encoder writes.
    pub fn base(&self) -> usize {
        self.base
    }

    /// Claims `width` bytes at the cursor, failing without moving the
    /// cursor when the claim would cross the region boundary.
    fn advance(&mut self, width: usize) -> Result<usize> {
        let at = self.next;
        let end = at
            .checked_add(width)
            .ok_or_else(|| eyre!("write of {width} bytes overflows buffer addressing"))?;
        ensure!(
            end <= self.limit,
            "write of {width} bytes at offset {at} overruns the region ending at {}",
            self.limit
        );
        self.next = end;
        Ok(at)
    }

    /// Skips `width` bytes, leaving them zero.
    pub fn skip(&mut self, width: usize) -> Result<()> {
        self.advance(width)?;
        Ok(())
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        let at = self.advance(bytes.len())?;
        self.buffer.set_bytes(at, bytes);
        Ok(())
    }

    pub fn write_u8(&mut self, value: u8) -> Result<()> {
        let at = self.advance(1)?;
        self.buffer.set_u8(at, value);
        Ok(())
    }

    pub fn write_i8(&mut self, value: i8) -> Result<()> {
        let at = self.advance(1)?;
        self.buffer.set_i8(at, value);
        Ok(())
    }

    pub fn write_u16(&mut self, value: u16) -> Result<()> {
        let at = self.advance(2)?;
        self.buffer.set_u16(at, value);
        Ok(())
    }

    pub fn write_i16(&mut self, value: i16) -> Result<()> {
        let at = self.advance(2)?;
        self.buffer.set_i16(at, value);
        Ok(())
    }

    pub fn write_u32(&mut self, value: u32) -> Result<()> {
        let at = self.advance(4)?;
        self.buffer.set_u32(at, value);
        Ok(())
    }

    pub fn write_i32(&mut self, value: i32) -> Result<()> {
        let at = self.advance(4)?;
        self.buffer.set_i32(at, value);
        Ok(())
    }

    pub fn write_u64(&mut self, value: u64) -> Result<()> {
        let at = self.advance(8)?;
        self.buffer.set_u64(at, value);
        Ok(())
    }

    pub fn write_i64(&mut self, value: i64) -> Result<()> {
        let at = self.advance(8)?;
        self.buffer.set_i64(at, value);
        Ok(())
    }

    pub fn write_f32(&mut self, value: f32) -> Result<()> {
        let at = self.advance(4)?;
        self.buffer.set_f32(at, value);
        Ok(())
    }

    pub fn write_f64(&mut self, value: f64) -> Result<()> {
        let at = self.advance(8)?;
        self.buffer.set_f64(at, value);
        Ok(())
    }

    pub fn write_uint8(&mut self, value: i64) -> Result<()> {
        ensure!(value >= 0, "passing negative value to unsigned field");
        ensure!(
            value <= u8::MAX as i64,
            "value {value} does not fit in an unsigned 8-bit field"
        );
        self.write_u8(value as u8)
    }

    pub fn write_uint16(&mut self, value: i64) -> Result<()> {
        ensure!(value >= 0, "passing negative value to unsigned field");
        ensure!(
            value <= u16::MAX as i64,
            "value {value} does not fit in an unsigned 16-bit field"
        );
        self.write_u16(value as u16)
    }

    pub fn write_uint32(&mut self, value: i64) -> Result<()> {
        ensure!(value >= 0, "passing negative value to unsigned field");
        ensure!(
            value <= u32::MAX as i64,
            "value {value} does not fit in an unsigned 32-bit field"
        );
        self.write_u32(value as u32)
    }

    pub fn write_uint64(&mut self, value: i64) -> Result<()> {
        ensure!(value >= 0, "passing negative value to unsigned field");
        self.write_u64(value as u64)
    }

    /// Writes the relative pointer for `pointee` into the current field.
    /// `None` writes the null sentinel.
    pub fn encode_pointer(&mut self, pointee: Option<usize>) -> Result<()> {
        match pointee {
            None => self.write_u64(0),
            Some(offset) => {
                let at = self.next;
                ensure!(
                    offset > at,
                    "pointer target {offset} does not lie past its pointer field at {at}"
                );
                self.write_u64((offset - at) as u64)
            }
        }
    }

    /// Allocates an aligned `size`-byte region for a nested structure,
    /// writes the pointer to it at the current field, and returns the
    /// child encoder positioned at the region start.
    pub fn nested(&mut self, size: usize) -> Result<Encoder<'_>> {
        let pointee = self.buffer.alloc(align(size))?;
        self.encode_pointer(Some(pointee))?;
        Ok(Encoder {
            buffer: &mut *self.buffer,
            handles: &mut *self.handles,
            base: pointee,
            next: pointee,
            limit: pointee + size,
        })
    }

    /// Appends `handle` to the message handle table and writes its index.
    pub fn encode_handle(&mut self, handle: Handle) -> Result<()> {
        let index = self.handles.len();
        ensure!(
            index <= u32::MAX as usize,
            "handle table is full ({index} handles)"
        );
        self.write_u32(index as u32)?;
        self.handles.push(handle);
        Ok(())
    }

    /// Writes an array header followed by the UTF-8 bytes of `value`.
    pub fn encode_string(&mut self, value: &str) -> Result<()> {
        let payload = value.len();
        let num_bytes = ARRAY_HEADER_SIZE + payload;
        ensure!(
            num_bytes <= u32::MAX as usize,
            "string payload of {payload} bytes exceeds the 32-bit wire limit"
        );
        let header = ArrayHeader::new(num_bytes as u32, payload as u32);
        self.write_bytes(header.as_bytes())?;
        self.write_bytes(value.as_bytes())
    }

    /// Writes an array header followed by each element in order, packed
    /// with no per-element padding.
    pub fn encode_array<T: WireType>(&mut self, values: &[T::Value]) -> Result<()> {
        let num_bytes = array_num_bytes::<T>(values.len())?;
        let header = ArrayHeader::new(num_bytes as u32, values.len() as u32);
        self.write_bytes(header.as_bytes())?;
        for value in values {
            T::encode(self, value)?;
        }
        Ok(())
    }

    /// Writes the body of `value` at the cursor.
    pub fn encode_struct<S: WireStruct>(&mut self, value: &S::Value) -> Result<()> {
        S::encode_body(self, value)
    }

    /// Encodes an optional struct behind a pointer. `None` writes the null
    /// sentinel without allocating.
    pub fn encode_struct_pointer<S: WireStruct>(&mut self, value: Option<&S::Value>) -> Result<()> {
        match value {
            None => self.encode_pointer(None),
            Some(value) => {
                let mut child = self.nested(S::ENCODED_SIZE)?;
                S::encode_body(&mut child, value)
            }
        }
    }

    /// Encodes an optional array behind a pointer. `None` writes the null
    /// sentinel without allocating.
    pub fn encode_array_pointer<T: WireType>(&mut self, values: Option<&[T::Value]>) -> Result<()> {
        match values {
            None => self.encode_pointer(None),
            Some(values) => {
                let size = array_num_bytes::<T>(values.len())?;
                let mut child = self.nested(size)?;
                child.encode_array::<T>(values)
            }
        }
    }

    /// Encodes an optional string behind a pointer. `None` writes the null
    /// sentinel without allocating.
    pub fn encode_string_pointer(&mut self, value: Option<&str>) -> Result<()> {
        match value {
            None => self.encode_pointer(None),
            Some(value) => {
                let mut child = self.nested(ARRAY_HEADER_SIZE + value.len())?;
                child.encode_string(value)
            }
        }
    }
}

/// Total encoded size of an array region: header plus packed elements.
fn array_num_bytes<T: WireType>(len: usize) -> Result<usize> {
    let payload = T::ENCODED_SIZE
        .checked_mul(len)
        .ok_or_else(|| eyre!("array payload of {len} elements overflows size arithmetic"))?;
    let num_bytes = ARRAY_HEADER_SIZE
        .checked_add(payload)
        .ok_or_else(|| eyre!("array payload of {len} elements overflows size arithmetic"))?;
    ensure!(
        num_bytes <= u32::MAX as usize,
        "array payload of {len} elements needs {num_bytes} bytes, exceeding the 32-bit wire limit"
    );
    Ok(num_bytes)
}

impl std::fmt::Debug for Encoder<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Encoder")
            .field("base", &self.base)
            .field("next", &self.next)
            .field("limit", &self.limit)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture(region: usize) -> (Buffer, HandleList) {
        let mut buffer = Buffer::with_capacity(region).unwrap();
        buffer.alloc(region).unwrap();
        (buffer, HandleList::new())
    }

    #[test]
    fn sequential_writes_pack_without_padding() {
        let (mut buffer, mut handles) = fixture(16);
        let mut encoder = Encoder::new(&mut buffer, &mut handles, 0, 16);

        encoder.write_u8(0xab).unwrap();
        encoder.write_u16(0x1234).unwrap();
        encoder.write_i8(-1).unwrap();
        encoder.write_u32(0xdead_beef).unwrap();
        assert_eq!(encoder.next, 8);

        assert_eq!(
            &buffer.bytes()[0..8],
            &[0xab, 0x34, 0x12, 0xff, 0xef, 0xbe, 0xad, 0xde]
        );
    }

    #[test]
    fn unsigned_writers_reject_negative_values() {
        let (mut buffer, mut handles) = fixture(16);
        let mut encoder = Encoder::new(&mut buffer, &mut handles, 0, 16);

        for result in [
            encoder.write_uint8(-1),
            encoder.write_uint16(-1),
            encoder.write_uint32(-1),
            encoder.write_uint64(-1),
        ] {
            let err = result.unwrap_err();
            assert!(err
                .to_string()
                .contains("passing negative value to unsigned field"));
        }
        assert_eq!(encoder.next, 0);

        encoder.write_uint32(7).unwrap();
        assert_eq!(encoder.next, 4);
        assert_eq!(&buffer.bytes()[0..4], &7u32.to_le_bytes());
    }

    #[test]
    fn unsigned_writers_reject_oversized_values() {
        let (mut buffer, mut handles) = fixture(16);
        let mut encoder = Encoder::new(&mut buffer, &mut handles, 0, 16);

        assert!(encoder.write_uint8(256).is_err());
        assert!(encoder.write_uint16(65_536).is_err());
        assert!(encoder.write_uint32(4_294_967_296).is_err());
        assert_eq!(encoder.next, 0);

        encoder.write_uint8(255).unwrap();
        encoder.write_uint16(65_535).unwrap();
        assert_eq!(encoder.next, 3);
    }

    #[test]
    fn writes_cannot_overrun_the_region() {
        let (mut buffer, mut handles) = fixture(8);
        let mut encoder = Encoder::new(&mut buffer, &mut handles, 0, 8);

        encoder.write_u64(1).unwrap();
        let err = encoder.write_u8(2).unwrap_err();
        assert!(err.to_string().contains("overruns the region"));
        assert_eq!(encoder.next, 8);
    }

    #[test]
    fn null_pointer_is_eight_zero_bytes() {
        let (mut buffer, mut handles) = fixture(8);
        let mut encoder = Encoder::new(&mut buffer, &mut handles, 0, 8);

        encoder.encode_pointer(None).unwrap();
        assert_eq!(encoder.next, 8);
        assert_eq!(&buffer.bytes()[0..8], &[0u8; 8]);
    }

    #[test]
    fn pointer_stores_distance_from_its_own_field() {
        let (mut buffer, mut handles) = fixture(16);
        let mut encoder = Encoder::new(&mut buffer, &mut handles, 0, 16);

        encoder.write_u64(0).unwrap();
        let child = encoder.nested(8).unwrap();
        assert_eq!(child.base(), 16);
        drop(child);

        // pointer field sits at offset 8, pointee at 16
        assert_eq!(&buffer.bytes()[8..16], &8u64.to_le_bytes());
    }

    #[test]
    fn nested_regions_start_on_eight_byte_boundaries() {
        let (mut buffer, mut handles) = fixture(24);
        let mut encoder = Encoder::new(&mut buffer, &mut handles, 0, 24);

        let first = encoder.nested(13).unwrap();
        assert_eq!(first.base() % 8, 0);
        assert_eq!(first.base(), 24);
        drop(first);

        let second = encoder.nested(5).unwrap();
        assert_eq!(second.base() % 8, 0);
        assert_eq!(second.base(), 24 + 16);
        drop(second);

        let third = encoder.nested(8).unwrap();
        assert_eq!(third.base(), 24 + 16 + 8);
    }

    #[test]
    fn child_writes_stay_inside_their_region() {
        let (mut buffer, mut handles) = fixture(8);
        let mut encoder = Encoder::new(&mut buffer, &mut handles, 0, 8);

        let mut child = encoder.nested(4).unwrap();
        child.write_u32(1).unwrap();
        let err = child.write_u8(2).unwrap_err();
        assert!(err.to_string().contains("overruns the region"));
    }

    #[test]
    fn handle_indices_are_dense_and_in_encode_order() {
        let (mut buffer, mut handles) = fixture(16);
        let mut encoder = Encoder::new(&mut buffer, &mut handles, 0, 16);

        encoder.encode_handle(Handle::from_raw(300)).unwrap();
        encoder.encode_handle(Handle::from_raw(100)).unwrap();
        encoder.encode_handle(Handle::from_raw(200)).unwrap();

        assert_eq!(&buffer.bytes()[0..4], &0u32.to_le_bytes());
        assert_eq!(&buffer.bytes()[4..8], &1u32.to_le_bytes());
        assert_eq!(&buffer.bytes()[8..12], &2u32.to_le_bytes());
        assert_eq!(handles.len(), 3);
        assert_eq!(handles[0], Handle::from_raw(300));
        assert_eq!(handles[2], Handle::from_raw(200));
    }

    #[test]
    fn string_encoding_writes_header_then_utf8_payload() {
        let (mut buffer, mut handles) = fixture(24);
        let mut encoder = Encoder::new(&mut buffer, &mut handles, 0, 24);

        encoder.encode_string("héllo").unwrap();

        // "héllo" is six UTF-8 bytes
        assert_eq!(&buffer.bytes()[0..4], &14u32.to_le_bytes());
        assert_eq!(&buffer.bytes()[4..8], &6u32.to_le_bytes());
        assert_eq!(&buffer.bytes()[8..14], "héllo".as_bytes());
    }

    #[test]
    fn empty_string_still_carries_a_header() {
        let (mut buffer, mut handles) = fixture(8);
        let mut encoder = Encoder::new(&mut buffer, &mut handles, 0, 8);

        encoder.encode_string("").unwrap();
        assert_eq!(&buffer.bytes()[0..4], &8u32.to_le_bytes());
        assert_eq!(&buffer.bytes()[4..8], &0u32.to_le_bytes());
    }

    #[test]
    fn array_elements_pack_contiguously_after_the_header() {
        let (mut buffer, mut handles) = fixture(24);
        let mut encoder = Encoder::new(&mut buffer, &mut handles, 0, 24);

        encoder.encode_array::<u32>(&[1, 2, 3]).unwrap();

        assert_eq!(&buffer.bytes()[0..4], &20u32.to_le_bytes());
        assert_eq!(&buffer.bytes()[4..8], &3u32.to_le_bytes());
        assert_eq!(&buffer.bytes()[8..12], &1u32.to_le_bytes());
        assert_eq!(&buffer.bytes()[12..16], &2u32.to_le_bytes());
        assert_eq!(&buffer.bytes()[16..20], &3u32.to_le_bytes());
    }

    #[test]
    fn string_pointer_allocates_an_aligned_child_region() {
        let (mut buffer, mut handles) = fixture(8);
        let mut encoder = Encoder::new(&mut buffer, &mut handles, 0, 8);

        encoder.encode_string_pointer(Some("hello")).unwrap();

        // field at 0 points to the region at 8
        assert_eq!(&buffer.bytes()[0..8], &8u64.to_le_bytes());
        assert_eq!(&buffer.bytes()[8..12], &13u32.to_le_bytes());
        assert_eq!(&buffer.bytes()[12..16], &5u32.to_le_bytes());
        assert_eq!(&buffer.bytes()[16..21], b"hello");
        // align(13) reserves 16 bytes; the padding stays zero
        assert_eq!(&buffer.bytes()[21..24], &[0u8; 3]);
        assert!(buffer.len() >= 24);
    }

    #[test]
    fn null_string_pointer_writes_the_sentinel_without_allocating() {
        let (mut buffer, mut handles) = fixture(8);
        let len_before = buffer.len();
        let mut encoder = Encoder::new(&mut buffer, &mut handles, 0, 8);

        encoder.encode_string_pointer(None).unwrap();
        assert_eq!(&buffer.bytes()[0..8], &[0u8; 8]);
        assert_eq!(buffer.len(), len_before);
    }

    #[test]
    fn skip_leaves_zero_bytes() {
        let (mut buffer, mut handles) = fixture(16);
        let mut encoder = Encoder::new(&mut buffer, &mut handles, 0, 16);

        encoder.write_u32(0xffff_ffff).unwrap();
        encoder.skip(4).unwrap();
        encoder.write_u32(0xffff_ffff).unwrap();
        assert_eq!(&buffer.bytes()[4..8], &[0u8; 4]);
    }
}
