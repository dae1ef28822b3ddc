//! # Decoder Cursor
//!
//! Reads one structure's fields in schema order from a received message.
//! `Decoder` borrows the message bytes immutably and never copies payload
//! data; strings come back as `&str` views into the buffer.
//!
//! Message bytes are untrusted input. Every read is bounds-checked against
//! the message end, pointer distances are validated before they are
//! followed, and handle indices are checked against the table length. Any
//! inconsistency aborts the decode with an error; there is no best-effort
//! partial result.
//!
//! Nested structures get their own decoder via [`Decoder::nested`] at the
//! offset a pointer resolved to. Child decoders share the underlying slice
//! and handle table but keep an independent cursor, mirroring how the
//! encoder gives every structure its own region.

use eyre::{ensure, eyre, Result};

use crate::handle::{Handle, HandleList};
use crate::types::{WireStruct, WireType};
use crate::wire::ARRAY_HEADER_SIZE;

pub struct Decoder<'a> {
    data: &'a [u8],
    handles: &'a HandleList,
    base: usize,
    next: usize,
}

impl<'a> Decoder<'a> {
    pub(crate) fn new(data: &'a [u8], handles: &'a HandleList, base: usize) -> Self {
        Self {
            data,
            handles,
            base,
            next: base,
        }
    }

    /// Start offset of the structure this decoder reads.
    pub fn base(&self) -> usize {
        self.base
    }

    /// Claims `width` bytes at the cursor, failing without moving the
    /// cursor when the claim would run past the message end.
    fn advance(&mut self, width: usize) -> Result<usize> {
        let at = self.next;
        let end = at
            .checked_add(width)
            .ok_or_else(|| eyre!("read of {width} bytes overflows buffer addressing"))?;
        ensure!(
            end <= self.data.len(),
            "read of {width} bytes at offset {at} runs past the message end ({} bytes)",
            self.data.len()
        );
        self.next = end;
        Ok(at)
    }

    /// Skips `width` bytes without interpreting them.
    pub fn skip(&mut self, width: usize) -> Result<()> {
        self.advance(width)?;
        Ok(())
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        let at = self.advance(len)?;
        Ok(&self.data[at..at + len])
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        let at = self.advance(1)?;
        Ok(self.data[at])
    }

    pub fn read_i8(&mut self) -> Result<i8> {
        let at = self.advance(1)?;
        Ok(self.data[at] as i8)
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        let at = self.advance(2)?;
        Ok(u16::from_le_bytes([self.data[at], self.data[at + 1]]))
    }

    pub fn read_i16(&mut self) -> Result<i16> {
        let at = self.advance(2)?;
        Ok(i16::from_le_bytes([self.data[at], self.data[at + 1]]))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        let at = self.advance(4)?;
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(&self.data[at..at + 4]);
        Ok(u32::from_le_bytes(bytes))
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        let at = self.advance(4)?;
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(&self.data[at..at + 4]);
        Ok(i32::from_le_bytes(bytes))
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        let at = self.advance(8)?;
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&self.data[at..at + 8]);
        Ok(u64::from_le_bytes(bytes))
    }

    pub fn read_i64(&mut self) -> Result<i64> {
        let at = self.advance(8)?;
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&self.data[at..at + 8]);
        Ok(i64::from_le_bytes(bytes))
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        let at = self.advance(4)?;
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(&self.data[at..at + 4]);
        Ok(f32::from_le_bytes(bytes))
    }

    pub fn read_f64(&mut self) -> Result<f64> {
        let at = self.advance(8)?;
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&self.data[at..at + 8]);
        Ok(f64::from_le_bytes(bytes))
    }

    /// Reads a pointer field and resolves it to an absolute buffer offset.
    /// The distance is measured from the pointer field's own start; zero
    /// decodes to `None`.
    pub fn decode_pointer(&mut self) -> Result<Option<usize>> {
        let at = self.next;
        let distance = self.read_u64()?;
        if distance == 0 {
            return Ok(None);
        }
        let distance = usize::try_from(distance)
            .map_err(|_| eyre!("pointer at offset {at} has unrepresentable distance {distance}"))?;
        let offset = at
            .checked_add(distance)
            .ok_or_else(|| eyre!("pointer at offset {at} overflows buffer addressing"))?;
        ensure!(
            offset <= self.data.len(),
            "pointer at offset {at} resolves to {offset}, past the message end ({} bytes)",
            self.data.len()
        );
        Ok(Some(offset))
    }

    /// Spawns a child decoder for the structure starting at `base`.
    pub fn nested(&self, base: usize) -> Decoder<'a> {
        Decoder {
            data: self.data,
            handles: self.handles,
            base,
            next: base,
        }
    }

    /// Reads a handle index and looks it up in the message handle table.
    pub fn decode_handle(&mut self) -> Result<Handle> {
        let index = self.read_u32()? as usize;
        self.handles.get(index).copied().ok_or_else(|| {
            eyre!(
                "handle index {index} out of range for a table of {} handles",
                self.handles.len()
            )
        })
    }

    /// Reads an array header and the UTF-8 payload it describes.
    pub fn decode_string(&mut self) -> Result<&'a str> {
        let num_bytes = self.read_u32()? as usize;
        let num_elements = self.read_u32()? as usize;
        ensure!(
            num_bytes >= ARRAY_HEADER_SIZE,
            "string header claims {num_bytes} bytes, less than the header itself"
        );
        let payload = self.read_bytes(num_elements)?;
        std::str::from_utf8(payload).map_err(|e| eyre!("string payload is not valid utf-8: {e}"))
    }

    /// Reads an array header and decodes each element in order.
    pub fn decode_array<T: WireType>(&mut self) -> Result<Vec<T::Value>> {
        let num_bytes = self.read_u32()? as usize;
        let num_elements = self.read_u32()? as usize;
        ensure!(
            num_bytes >= ARRAY_HEADER_SIZE,
            "array header claims {num_bytes} bytes, less than the header itself"
        );
        // reject absurd element counts before reserving memory for them
        let payload = T::ENCODED_SIZE
            .checked_mul(num_elements)
            .ok_or_else(|| eyre!("array of {num_elements} elements overflows size arithmetic"))?;
        let end = self
            .next
            .checked_add(payload)
            .ok_or_else(|| eyre!("array of {num_elements} elements overflows size arithmetic"))?;
        ensure!(
            end <= self.data.len(),
            "array of {num_elements} elements needs {payload} bytes, past the message end"
        );
        let mut values = Vec::with_capacity(num_elements);
        for _ in 0..num_elements {
            values.push(T::decode(self)?);
        }
        Ok(values)
    }

    /// Decodes the body of a struct at the cursor.
    pub fn decode_struct<S: WireStruct>(&mut self) -> Result<S::Value> {
        S::decode_body(self)
    }

    /// Follows an optional struct pointer. The null sentinel decodes to
    /// `None` without spawning a child decoder.
    pub fn decode_struct_pointer<S: WireStruct>(&mut self) -> Result<Option<S::Value>> {
        match self.decode_pointer()? {
            None => Ok(None),
            Some(base) => {
                let mut child = self.nested(base);
                S::decode_body(&mut child).map(Some)
            }
        }
    }

    /// Follows an optional array pointer. The null sentinel decodes to
    /// `None` without spawning a child decoder.
    pub fn decode_array_pointer<T: WireType>(&mut self) -> Result<Option<Vec<T::Value>>> {
        match self.decode_pointer()? {
            None => Ok(None),
            Some(base) => {
                let mut child = self.nested(base);
                child.decode_array::<T>().map(Some)
            }
        }
    }

    /// Follows an optional string pointer. The null sentinel decodes to
    /// `None` without spawning a child decoder.
    pub fn decode_string_pointer(&mut self) -> Result<Option<&'a str>> {
        match self.decode_pointer()? {
            None => Ok(None),
            Some(base) => {
                let mut child = self.nested(base);
                child.decode_string().map(Some)
            }
        }
    }
}

impl std::fmt::Debug for Decoder<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Decoder")
            .field("len", &self.data.len())
            .field("base", &self.base)
            .field("next", &self.next)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalars_read_in_order_little_endian() {
        let data = [
            0xab, // u8
            0x34, 0x12, // u16
            0xfe, 0xff, 0xff, 0xff, // i32 = -2
            0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x80, // u64
        ];
        let handles = HandleList::new();
        let mut decoder = Decoder::new(&data, &handles, 0);

        assert_eq!(decoder.read_u8().unwrap(), 0xab);
        assert_eq!(decoder.read_u16().unwrap(), 0x1234);
        assert_eq!(decoder.read_i32().unwrap(), -2);
        assert_eq!(decoder.read_u64().unwrap(), 0x8000_0000_0000_0001);
        assert_eq!(decoder.next, 15);
    }

    #[test]
    fn float_reads_preserve_bit_patterns() {
        let mut data = Vec::new();
        data.extend_from_slice(&2.5f32.to_le_bytes());
        data.extend_from_slice(&(-0.0f64).to_le_bytes());
        let handles = HandleList::new();
        let mut decoder = Decoder::new(&data, &handles, 0);

        assert_eq!(decoder.read_f32().unwrap(), 2.5);
        assert_eq!(decoder.read_f64().unwrap().to_bits(), (-0.0f64).to_bits());
    }

    #[test]
    fn reads_past_the_end_fail_without_moving_the_cursor() {
        let data = [1u8, 0, 0, 0];
        let handles = HandleList::new();
        let mut decoder = Decoder::new(&data, &handles, 0);

        let err = decoder.read_u64().unwrap_err();
        assert!(err.to_string().contains("runs past the message end"));
        assert_eq!(decoder.next, 0);
        assert_eq!(decoder.read_u32().unwrap(), 1);
    }

    #[test]
    fn zero_distance_pointer_decodes_to_none() {
        let data = [0u8; 8];
        let handles = HandleList::new();
        let mut decoder = Decoder::new(&data, &handles, 0);

        assert_eq!(decoder.decode_pointer().unwrap(), None);
        assert_eq!(decoder.next, 8);
    }

    #[test]
    fn pointer_resolves_relative_to_its_own_field() {
        let mut data = vec![0u8; 32];
        // pointer field at offset 8 with distance 16 lands on offset 24
        data[8..16].copy_from_slice(&16u64.to_le_bytes());
        let handles = HandleList::new();
        let mut decoder = Decoder::new(&data, &handles, 0);

        decoder.skip(8).unwrap();
        assert_eq!(decoder.decode_pointer().unwrap(), Some(24));
    }

    #[test]
    fn pointer_past_the_end_is_rejected() {
        let mut data = vec![0u8; 16];
        data[0..8].copy_from_slice(&1000u64.to_le_bytes());
        let handles = HandleList::new();
        let mut decoder = Decoder::new(&data, &handles, 0);

        let err = decoder.decode_pointer().unwrap_err();
        assert!(err.to_string().contains("past the message end"));
    }

    #[test]
    fn handle_lookup_follows_the_table() {
        let mut data = vec![0u8; 8];
        data[0..4].copy_from_slice(&1u32.to_le_bytes());
        data[4..8].copy_from_slice(&5u32.to_le_bytes());
        let mut handles = HandleList::new();
        handles.push(Handle::from_raw(111));
        handles.push(Handle::from_raw(222));
        let mut decoder = Decoder::new(&data, &handles, 0);

        assert_eq!(decoder.decode_handle().unwrap(), Handle::from_raw(222));

        let err = decoder.decode_handle().unwrap_err();
        assert!(err.to_string().contains("handle index 5 out of range"));
    }

    #[test]
    fn string_decoding_handles_multibyte_utf8() {
        let payload = "dès ✓";
        let mut data = Vec::new();
        data.extend_from_slice(&((8 + payload.len()) as u32).to_le_bytes());
        data.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        data.extend_from_slice(payload.as_bytes());
        let handles = HandleList::new();
        let mut decoder = Decoder::new(&data, &handles, 0);

        assert_eq!(decoder.decode_string().unwrap(), payload);
    }

    #[test]
    fn invalid_utf8_is_rejected() {
        let mut data = Vec::new();
        data.extend_from_slice(&10u32.to_le_bytes());
        data.extend_from_slice(&2u32.to_le_bytes());
        data.extend_from_slice(&[0xff, 0xfe]);
        let handles = HandleList::new();
        let mut decoder = Decoder::new(&data, &handles, 0);

        let err = decoder.decode_string().unwrap_err();
        assert!(err.to_string().contains("not valid utf-8"));
    }

    #[test]
    fn truncated_string_payload_is_rejected() {
        let mut data = Vec::new();
        data.extend_from_slice(&28u32.to_le_bytes());
        data.extend_from_slice(&20u32.to_le_bytes());
        data.extend_from_slice(b"short");
        let handles = HandleList::new();
        let mut decoder = Decoder::new(&data, &handles, 0);

        let err = decoder.decode_string().unwrap_err();
        assert!(err.to_string().contains("runs past the message end"));
    }

    #[test]
    fn arrays_decode_packed_elements() {
        let mut data = Vec::new();
        data.extend_from_slice(&20u32.to_le_bytes());
        data.extend_from_slice(&3u32.to_le_bytes());
        for v in [10u32, 20, 30] {
            data.extend_from_slice(&v.to_le_bytes());
        }
        let handles = HandleList::new();
        let mut decoder = Decoder::new(&data, &handles, 0);

        assert_eq!(decoder.decode_array::<u32>().unwrap(), vec![10, 20, 30]);
    }

    #[test]
    fn empty_array_has_a_header_and_no_payload() {
        let mut data = Vec::new();
        data.extend_from_slice(&8u32.to_le_bytes());
        data.extend_from_slice(&0u32.to_le_bytes());
        let handles = HandleList::new();
        let mut decoder = Decoder::new(&data, &handles, 0);

        assert_eq!(decoder.decode_array::<u64>().unwrap(), Vec::<u64>::new());
        assert_eq!(decoder.next, 8);
    }

    #[test]
    fn absurd_element_counts_are_rejected_before_allocation() {
        let mut data = Vec::new();
        data.extend_from_slice(&8u32.to_le_bytes());
        data.extend_from_slice(&u32::MAX.to_le_bytes());
        let handles = HandleList::new();
        let mut decoder = Decoder::new(&data, &handles, 0);

        let err = decoder.decode_array::<u64>().unwrap_err();
        assert!(err.to_string().contains("past the message end"));
    }

    #[test]
    fn undersized_array_header_is_rejected() {
        let mut data = Vec::new();
        data.extend_from_slice(&4u32.to_le_bytes());
        data.extend_from_slice(&0u32.to_le_bytes());
        let handles = HandleList::new();
        let mut decoder = Decoder::new(&data, &handles, 0);

        let err = decoder.decode_array::<u32>().unwrap_err();
        assert!(err.to_string().contains("less than the header itself"));
    }

    #[test]
    fn nested_decoder_starts_at_the_given_base() {
        let mut data = vec![0u8; 24];
        data[16..20].copy_from_slice(&99u32.to_le_bytes());
        let handles = HandleList::new();
        let decoder = Decoder::new(&data, &handles, 0);

        let mut child = decoder.nested(16);
        assert_eq!(child.base(), 16);
        assert_eq!(child.read_u32().unwrap(), 99);
    }
}
