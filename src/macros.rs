//! # Internal Macros
//!
//! Helper macros for the zerocopy wire-header structs in [`crate::wire`].
//!
//! ## le_accessors!
//!
//! Generates getter and setter methods for struct fields stored as
//! little-endian wrapper types (`U32`, `U64`). Wire headers keep their
//! fields in canonical byte order at all times; the accessors convert to
//! and from native integers at the call boundary.
//!
//! ### Usage
//!
//! ```ignore
//! use zerocopy::little_endian::U32;
//!
//! #[repr(C)]
//! struct ArrayHeader {
//!     num_bytes: U32,
//!     num_elements: U32,
//! }
//!
//! impl ArrayHeader {
//!     le_accessors! {
//!         num_bytes: u32,
//!         num_elements: u32,
//!     }
//! }
//!
//! // Generates:
//! // pub fn num_bytes(&self) -> u32 { self.num_bytes.get() }
//! // pub fn set_num_bytes(&mut self, val: u32) { self.num_bytes = U32::new(val); }
//! // pub fn num_elements(&self) -> u32 { self.num_elements.get() }
//! // pub fn set_num_elements(&mut self, val: u32) { self.num_elements = U32::new(val); }
//! ```

/// Generates getter and setter methods for little-endian wire-header fields.
#[macro_export]
macro_rules! le_accessors {
    (@impl $field:ident, u32) => {
        ::paste::paste! {
            #[inline]
            pub fn $field(&self) -> u32 {
                self.$field.get()
            }

            #[inline]
            pub fn [<set_ $field>](&mut self, val: u32) {
                self.$field = ::zerocopy::little_endian::U32::new(val);
            }
        }
    };
    (@impl $field:ident, u64) => {
        ::paste::paste! {
            #[inline]
            pub fn $field(&self) -> u64 {
                self.$field.get()
            }

            #[inline]
            pub fn [<set_ $field>](&mut self, val: u64) {
                self.$field = ::zerocopy::little_endian::U64::new(val);
            }
        }
    };
    ($($field:ident : $ty:tt),* $(,)?) => {
        $(
            $crate::le_accessors!(@impl $field, $ty);
        )*
    };
}
