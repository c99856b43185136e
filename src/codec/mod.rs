//! Fixed-layout binary records
//!
//! Every wire message is a tightly packed little-endian record. A record is declared
//! once with [`wire_struct!`], which lays the fields out sequentially at compile time
//! and generates typed accessors bound to each field's byte offset.
//!
//! Accessors index the buffer directly. Callers must run the record's `verify`
//! predicate (or otherwise check the length) before touching any field of an
//! untrusted buffer; reading a too-short buffer is a programming error and panics.

use std::marker::PhantomData;

/// A primitive that can live inside a record
pub trait FieldType {
    /// Width in bytes
    const SIZE: usize;
    /// Rust value type produced by reads
    type Value: Copy + Default + PartialEq + std::fmt::Debug;

    fn read(bytes: &[u8]) -> Self::Value;
    fn write(bytes: &mut [u8], value: Self::Value);
}

/// Unsigned 8-bit field
pub struct U8;
/// Unsigned 16-bit little-endian field
pub struct U16;
/// Unsigned 32-bit little-endian field
pub struct U32;
/// 32-bit little-endian float field
pub struct F32;

impl FieldType for U8 {
    const SIZE: usize = 1;
    type Value = u8;

    fn read(bytes: &[u8]) -> u8 {
        bytes[0]
    }

    fn write(bytes: &mut [u8], value: u8) {
        bytes[0] = value;
    }
}

impl FieldType for U16 {
    const SIZE: usize = 2;
    type Value = u16;

    fn read(bytes: &[u8]) -> u16 {
        u16::from_le_bytes([bytes[0], bytes[1]])
    }

    fn write(bytes: &mut [u8], value: u16) {
        bytes[..2].copy_from_slice(&value.to_le_bytes());
    }
}

impl FieldType for U32 {
    const SIZE: usize = 4;
    type Value = u32;

    fn read(bytes: &[u8]) -> u32 {
        u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
    }

    fn write(bytes: &mut [u8], value: u32) {
        bytes[..4].copy_from_slice(&value.to_le_bytes());
    }
}

impl FieldType for F32 {
    const SIZE: usize = 4;
    type Value = f32;

    fn read(bytes: &[u8]) -> f32 {
        f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
    }

    fn write(bytes: &mut [u8], value: f32) {
        bytes[..4].copy_from_slice(&value.to_le_bytes());
    }
}

/// A field bound to a fixed byte offset inside a record
pub struct Field<T: FieldType> {
    offset: usize,
    _type: PhantomData<T>,
}

impl<T: FieldType> Field<T> {
    pub const fn at(offset: usize) -> Self {
        Self {
            offset,
            _type: PhantomData,
        }
    }

    pub const fn offset(&self) -> usize {
        self.offset
    }

    /// Offset of the first byte after this field
    pub const fn end(&self) -> usize {
        self.offset + T::SIZE
    }

    pub fn read(&self, buf: &[u8]) -> T::Value {
        T::read(&buf[self.offset..self.end()])
    }

    pub fn write(&self, buf: &mut [u8], value: T::Value) {
        T::write(&mut buf[self.offset..self.end()], value)
    }
}

/// Length check shared by all fixed-size messages: exact size and matching kind tag.
pub fn verify_exact(buf: &[u8], size: usize, kind: &Field<U8>, expected: u8) -> bool {
    buf.len() == size && kind.read(buf) == expected
}

/// Length check for batch messages: `header + k * record` for some `k >= 0`, plus kind tag.
pub fn verify_batch(
    buf: &[u8],
    header_size: usize,
    record_size: usize,
    kind: &Field<U8>,
    expected: u8,
) -> bool {
    buf.len() >= header_size
        && (buf.len() - header_size) % record_size == 0
        && kind.read(buf) == expected
}

/// Declares a fixed-layout record.
///
/// ```ignore
/// wire_struct! {
///     pub struct PingPongStruct => PingPong {
///         kind: U8,
///         timestamp: U32,
///     }
/// }
/// ```
///
/// expands to a plain value struct `PingPong { kind: u8, timestamp: u32 }` and a layout
/// type `PingPongStruct` with one `Field` constant per field (`PingPongStruct::timestamp`),
/// `SIZE`, `read`, `write` and `encode`.
#[macro_export]
macro_rules! wire_struct {
    (
        $(#[$meta:meta])*
        $vis:vis struct $layout:ident => $record:ident {
            $( $(#[$fmeta:meta])* $field:ident : $ty:ident ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Default)]
        $vis struct $record {
            $( $(#[$fmeta])* pub $field: <$crate::codec::$ty as $crate::codec::FieldType>::Value, )+
        }

        #[doc = concat!("Byte layout of [`", stringify!($record), "`]")]
        $vis struct $layout;

        impl $layout {
            $crate::wire_struct!(@fields 0usize; $( $field : $ty ),+);

            /// Total record size in bytes
            pub const SIZE: usize = 0 $( + <$crate::codec::$ty as $crate::codec::FieldType>::SIZE )+;

            pub fn read(buf: &[u8]) -> $record {
                $record {
                    $( $field: Self::$field.read(buf), )+
                }
            }

            pub fn write(buf: &mut [u8], value: &$record) {
                $( Self::$field.write(buf, value.$field); )+
            }

            /// Allocates a buffer of exactly `SIZE` bytes holding `value`
            pub fn encode(value: &$record) -> Vec<u8> {
                let mut buf = vec![0u8; Self::SIZE];
                Self::write(&mut buf, value);
                buf
            }
        }
    };

    (@fields $offset:expr; $field:ident : $ty:ident $(, $rest:ident : $rty:ident)*) => {
        #[allow(non_upper_case_globals)]
        pub const $field: $crate::codec::Field<$crate::codec::$ty> = $crate::codec::Field::at($offset);
        $crate::wire_struct!(@fields $offset + <$crate::codec::$ty as $crate::codec::FieldType>::SIZE; $( $rest : $rty ),*);
    };

    (@fields $offset:expr;) => {};
}

#[cfg(test)]
mod tests {
    use super::*;

    crate::wire_struct! {
        struct SampleStruct => Sample {
            kind: U8,
            count: U16,
            id: U32,
            value: F32,
            tail: U8,
        }
    }

    #[test]
    fn test_offsets_are_sequential() {
        assert_eq!(SampleStruct::kind.offset(), 0);
        assert_eq!(SampleStruct::count.offset(), 1);
        assert_eq!(SampleStruct::id.offset(), 3);
        assert_eq!(SampleStruct::value.offset(), 7);
        assert_eq!(SampleStruct::tail.offset(), 11);
        assert_eq!(SampleStruct::tail.end(), SampleStruct::SIZE);
        assert_eq!(SampleStruct::SIZE, 12);
    }

    #[test]
    fn test_little_endian_layout() {
        let buf = SampleStruct::encode(&Sample {
            kind: 7,
            count: 0x0102,
            id: 0x0A0B0C0D,
            value: 1.0,
            tail: 255,
        });

        assert_eq!(buf[0], 7);
        assert_eq!(&buf[1..3], &[0x02, 0x01]);
        assert_eq!(&buf[3..7], &[0x0D, 0x0C, 0x0B, 0x0A]);
        assert_eq!(&buf[7..11], &1.0f32.to_le_bytes());
        assert_eq!(buf[11], 255);
    }

    #[test]
    fn test_field_accessors_touch_only_their_bytes() {
        let mut buf = vec![0u8; SampleStruct::SIZE];
        SampleStruct::id.write(&mut buf, u32::MAX);

        assert_eq!(SampleStruct::kind.read(&buf), 0);
        assert_eq!(SampleStruct::count.read(&buf), 0);
        assert_eq!(SampleStruct::id.read(&buf), u32::MAX);
        assert_eq!(SampleStruct::value.read(&buf), 0.0);
        assert_eq!(SampleStruct::tail.read(&buf), 0);
    }

    #[test]
    fn test_verify_exact() {
        let mut buf = vec![0u8; SampleStruct::SIZE];
        SampleStruct::kind.write(&mut buf, 3);

        assert!(verify_exact(&buf, SampleStruct::SIZE, &SampleStruct::kind, 3));
        assert!(!verify_exact(&buf, SampleStruct::SIZE, &SampleStruct::kind, 4));
        assert!(!verify_exact(&buf[..SampleStruct::SIZE - 1], SampleStruct::SIZE, &SampleStruct::kind, 3));

        buf.push(0);
        assert!(!verify_exact(&buf, SampleStruct::SIZE, &SampleStruct::kind, 3));
    }

    #[test]
    fn test_verify_batch_lengths() {
        let header = 3;
        let record = 18;
        let kind = Field::<U8>::at(0);

        for k in 0..4 {
            let mut buf = vec![0u8; header + k * record];
            buf[0] = 5;
            assert!(verify_batch(&buf, header, record, &kind, 5), "k = {}", k);
            assert!(!verify_batch(&buf, header, record, &kind, 3));
        }

        let mut short = vec![0u8; header + record - 1];
        short[0] = 5;
        assert!(!verify_batch(&short, header, record, &kind, 5));

        let mut long = vec![0u8; header + record + 1];
        long[0] = 5;
        assert!(!verify_batch(&long, header, record, &kind, 5));

        assert!(!verify_batch(&[5, 0], header, record, &kind, 5));
    }
}
