//! # Growable Wire Buffer
//!
//! Backing store for message encoding. `Buffer` owns a zero-initialized
//! contiguous byte region and a bump cursor; [`Buffer::alloc`] hands out
//! offsets rather than references, so growth can relocate the storage
//! without invalidating anything a caller holds. Padding bytes are never
//! written by the cursor machinery and therefore stay zero on the wire.
//!
//! ## Canonical Byte Order
//!
//! Every multi-byte accessor goes through `to_le_bytes`/`from_le_bytes`,
//! so encoded bytes are little-endian on every host. 64-bit values use the
//! native integer types directly; the wire layout is identical to a pair
//! of 32-bit words in little-endian order.
//!
//! ## Lifecycle
//!
//! A buffer grows monotonically while a message is encoded, then is
//! trimmed to its exact used size once at finish time. Trimming seals the
//! buffer: later `alloc` calls fail, while offset-addressed reads and
//! writes remain available for header patching.
//!
//! ## Usage
//!
//! ```ignore
//! let mut buffer = Buffer::with_capacity(64)?;
//! let at = buffer.alloc(8)?;
//! buffer.set_u32(at, 0xdead_beef);
//! buffer.set_u32(at + 4, 7);
//! buffer.trim();
//! let bytes = buffer.into_vec();
//! ```

use eyre::{ensure, eyre, Result};

pub struct Buffer {
    data: Vec<u8>,
    next: usize,
    sealed: bool,
}

impl Buffer {
    /// Creates a zero-filled buffer of `size_hint` bytes. The hint is
    /// advisory; writes past it grow the storage.
    pub fn with_capacity(size_hint: usize) -> Result<Self> {
        let mut data = Vec::new();
        data.try_reserve_exact(size_hint)
            .map_err(|e| eyre!("cannot reserve {size_hint}-byte buffer: {e}"))?;
        data.resize(size_hint, 0);
        Ok(Self {
            data,
            next: 0,
            sealed: false,
        })
    }

    /// Reserves `size` bytes at the cursor and returns their start offset.
    ///
    /// Grows the backing storage when the reservation does not fit;
    /// previously written bytes keep their offsets and contents across
    /// growth. Fails once the buffer is sealed.
    pub fn alloc(&mut self, size: usize) -> Result<usize> {
        ensure!(!self.sealed, "buffer is sealed; alloc after trim is not allowed");
        let offset = self.next;
        let end = offset
            .checked_add(size)
            .ok_or_else(|| eyre!("allocation of {size} bytes overflows buffer addressing"))?;
        if end > self.data.len() {
            self.grow(size)?;
        }
        self.next = end;
        Ok(offset)
    }

    /// Grows to at least one and a half times the current size plus the
    /// requested reservation, keeping total copy cost amortized linear.
    fn grow(&mut self, size: usize) -> Result<()> {
        let base = self
            .data
            .len()
            .checked_add(size)
            .ok_or_else(|| eyre!("allocation of {size} bytes overflows buffer addressing"))?;
        let target = base.saturating_add(base / 2);
        let additional = target - self.data.len();
        self.data
            .try_reserve_exact(additional)
            .map_err(|e| eyre!("buffer growth to {target} bytes failed: {e}"))?;
        self.data.resize(target, 0);
        Ok(())
    }

    /// Truncates the storage to the exact number of allocated bytes and
    /// seals the buffer against further allocation.
    pub fn trim(&mut self) {
        self.data.truncate(self.next);
        self.data.shrink_to_fit();
        self.sealed = true;
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }

    fn copy_at(&mut self, offset: usize, bytes: &[u8]) {
        self.data[offset..offset + bytes.len()].copy_from_slice(bytes);
    }

    pub fn set_bytes(&mut self, offset: usize, bytes: &[u8]) {
        self.copy_at(offset, bytes);
    }

    pub fn set_u8(&mut self, offset: usize, value: u8) {
        self.data[offset] = value;
    }

    pub fn set_i8(&mut self, offset: usize, value: i8) {
        self.data[offset] = value as u8;
    }

    pub fn set_u16(&mut self, offset: usize, value: u16) {
        self.copy_at(offset, &value.to_le_bytes());
    }

    pub fn set_i16(&mut self, offset: usize, value: i16) {
        self.copy_at(offset, &value.to_le_bytes());
    }

    pub fn set_u32(&mut self, offset: usize, value: u32) {
        self.copy_at(offset, &value.to_le_bytes());
    }

    pub fn set_i32(&mut self, offset: usize, value: i32) {
        self.copy_at(offset, &value.to_le_bytes());
    }

    pub fn set_u64(&mut self, offset: usize, value: u64) {
        self.copy_at(offset, &value.to_le_bytes());
    }

    pub fn set_i64(&mut self, offset: usize, value: i64) {
        self.copy_at(offset, &value.to_le_bytes());
    }

    pub fn set_f32(&mut self, offset: usize, value: f32) {
        self.copy_at(offset, &value.to_le_bytes());
    }

    pub fn set_f64(&mut self, offset: usize, value: f64) {
        self.copy_at(offset, &value.to_le_bytes());
    }

    pub fn get_u8(&self, offset: usize) -> u8 {
        self.data[offset]
    }

    pub fn get_i8(&self, offset: usize) -> i8 {
        self.data[offset] as i8
    }

    pub fn get_u16(&self, offset: usize) -> u16 {
        u16::from_le_bytes([self.data[offset], self.data[offset + 1]])
    }

    pub fn get_i16(&self, offset: usize) -> i16 {
        i16::from_le_bytes([self.data[offset], self.data[offset + 1]])
    }

    pub fn get_u32(&self, offset: usize) -> u32 {
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(&self.data[offset..offset + 4]);
        u32::from_le_bytes(bytes)
    }

    pub fn get_i32(&self, offset: usize) -> i32 {
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(&self.data[offset..offset + 4]);
        i32::from_le_bytes(bytes)
    }

    pub fn get_u64(&self, offset: usize) -> u64 {
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&self.data[offset..offset + 8]);
        u64::from_le_bytes(bytes)
    }

    pub fn get_i64(&self, offset: usize) -> i64 {
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&self.data[offset..offset + 8]);
        i64::from_le_bytes(bytes)
    }

    pub fn get_f32(&self, offset: usize) -> f32 {
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(&self.data[offset..offset + 4]);
        f32::from_le_bytes(bytes)
    }

    pub fn get_f64(&self, offset: usize) -> f64 {
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&self.data[offset..offset + 8]);
        f64::from_le_bytes(bytes)
    }
}

impl std::fmt::Debug for Buffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Buffer")
            .field("len", &self.data.len())
            .field("next", &self.next)
            .field("sealed", &self.sealed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alloc_advances_cursor_and_returns_start() {
        let mut buffer = Buffer::with_capacity(16).unwrap();
        assert_eq!(buffer.alloc(8).unwrap(), 0);
        assert_eq!(buffer.alloc(4).unwrap(), 8);
        assert_eq!(buffer.alloc(4).unwrap(), 12);
    }

    #[test]
    fn fresh_and_grown_regions_read_zero() {
        let mut buffer = Buffer::with_capacity(4).unwrap();
        let first = buffer.alloc(4).unwrap();
        let second = buffer.alloc(16).unwrap();
        assert_eq!(buffer.get_u32(first), 0);
        assert_eq!(buffer.get_u64(second), 0);
        assert_eq!(buffer.get_u64(second + 8), 0);
    }

    #[test]
    fn growth_preserves_written_bytes() {
        let mut buffer = Buffer::with_capacity(8).unwrap();
        let mut offsets = Vec::new();
        for i in 0..64u32 {
            let at = buffer.alloc(4).unwrap();
            buffer.set_u32(at, i.wrapping_mul(0x9e37_79b9));
            offsets.push(at);
        }
        for (i, at) in offsets.iter().enumerate() {
            assert_eq!(buffer.get_u32(*at), (i as u32).wrapping_mul(0x9e37_79b9));
        }
        assert!(buffer.len() >= 64 * 4);
    }

    #[test]
    fn trim_shrinks_to_exact_cursor() {
        let mut buffer = Buffer::with_capacity(128).unwrap();
        buffer.alloc(20).unwrap();
        buffer.trim();
        assert_eq!(buffer.len(), 20);
        assert_eq!(buffer.into_vec().len(), 20);
    }

    #[test]
    fn sealed_buffer_rejects_alloc() {
        let mut buffer = Buffer::with_capacity(8).unwrap();
        buffer.alloc(8).unwrap();
        buffer.trim();
        let err = buffer.alloc(1).unwrap_err();
        assert!(err.to_string().contains("sealed"));
    }

    #[test]
    fn sealed_buffer_still_allows_offset_writes() {
        let mut buffer = Buffer::with_capacity(8).unwrap();
        let at = buffer.alloc(8).unwrap();
        buffer.trim();
        buffer.set_u64(at, 42);
        assert_eq!(buffer.get_u64(at), 42);
    }

    #[test]
    fn multi_byte_values_are_little_endian() {
        let mut buffer = Buffer::with_capacity(32).unwrap();
        buffer.alloc(32).unwrap();

        buffer.set_u32(0, 0x1234_5678);
        assert_eq!(&buffer.bytes()[0..4], &[0x78, 0x56, 0x34, 0x12]);

        buffer.set_u16(4, 0xbeef);
        assert_eq!(&buffer.bytes()[4..6], &[0xef, 0xbe]);

        buffer.set_i16(6, -2);
        assert_eq!(&buffer.bytes()[6..8], &[0xfe, 0xff]);

        buffer.set_u64(8, 0x0102_0304_0506_0708);
        assert_eq!(
            &buffer.bytes()[8..16],
            &[0x08, 0x07, 0x06, 0x05, 0x04, 0x03, 0x02, 0x01]
        );

        buffer.set_f64(16, 1.0);
        assert_eq!(&buffer.bytes()[16..24], &1.0f64.to_le_bytes());
    }

    #[test]
    fn sixty_four_bit_values_stay_exact() {
        let mut buffer = Buffer::with_capacity(8).unwrap();
        buffer.alloc(8).unwrap();

        let edge_cases = [
            0u64,
            (1 << 53) - 1,
            1 << 53,
            (1 << 53) + 1,
            u64::MAX - 1,
            u64::MAX,
        ];
        for value in edge_cases {
            buffer.set_u64(0, value);
            assert_eq!(buffer.get_u64(0), value);
        }

        buffer.set_i64(0, i64::MIN);
        assert_eq!(buffer.get_i64(0), i64::MIN);
        buffer.set_i64(0, -1);
        assert_eq!(buffer.get_i64(0), -1);
    }

    #[test]
    fn signed_and_float_accessors_roundtrip() {
        let mut buffer = Buffer::with_capacity(32).unwrap();
        buffer.alloc(32).unwrap();

        buffer.set_i8(0, -128);
        assert_eq!(buffer.get_i8(0), -128);
        buffer.set_i32(4, i32::MIN);
        assert_eq!(buffer.get_i32(4), i32::MIN);
        buffer.set_f32(8, f32::MIN_POSITIVE);
        assert_eq!(buffer.get_f32(8), f32::MIN_POSITIVE);
        buffer.set_f64(16, -0.0);
        assert_eq!(buffer.get_f64(16).to_bits(), (-0.0f64).to_bits());
    }
}
