//! Fixed-width binary layout codec.
//!
//! Every on-chain record handled by the SDK is a contiguous run of
//! fixed-width little-endian fields with no separators and no length
//! prefixes. A record type is declared once with [`layout_struct!`]; the
//! macro derives [`Layout`] (decode/encode at an offset) and [`Schema`]
//! (ordered field table) from the declaration order, so the span is always
//! the sum of the field widths and offsets are cumulative.
//!
//! ```text
//! Padding<N>   N opaque bytes (kept verbatim so re-encoding is byte-exact)
//! u8/u32/u64   little-endian unsigned
//! i64          little-endian two's complement
//! bool         1 byte, any non-zero byte decodes to true
//! Pubkey       32 raw bytes
//! [T; N]       N back-to-back repetitions of T
//! enum         1-byte discriminant (see `tagged_variant!`)
//! ```

use solana_sdk::pubkey::Pubkey;

use crate::error::{Error, Result};

// ─── Traits ───────────────────────────────────────────────────────────────────

/// A value with a fixed binary width.
pub trait Layout: Sized {
    /// Number of bytes the value occupies.
    const SPAN: usize;

    /// Decode a value starting at `offset`.
    ///
    /// Fails with [`Error::Format`] when fewer than [`Self::SPAN`] bytes
    /// remain after `offset`. Trailing bytes are ignored.
    fn decode(data: &[u8], offset: usize) -> Result<Self>;

    /// Encode the value at `offset`, returning the number of bytes written.
    fn encode(&self, data: &mut [u8], offset: usize) -> Result<usize>;
}

/// One named entry of a record schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    pub name: &'static str,
    pub span: usize,
}

/// Ordered field table of a record declared with [`layout_struct!`].
pub trait Schema: Layout {
    const FIELDS: &'static [Field];

    /// Byte offset of `name` from the start of the record.
    fn offset_of(name: &str) -> Option<usize> {
        let mut offset = 0;
        for field in Self::FIELDS {
            if field.name == name {
                return Some(offset);
            }
            offset += field.span;
        }
        None
    }
}

/// Closed set of unit variants selected by a 1-byte discriminant.
///
/// `VARIANTS[i]` names the variant whose tag is `i`.
pub trait TaggedVariant: Sized {
    const VARIANTS: &'static [&'static str];

    fn tag(&self) -> u8;

    fn from_tag(tag: u8) -> Option<Self>;

    fn variant_name(&self) -> &'static str {
        Self::VARIANTS
            .get(self.tag() as usize)
            .copied()
            .unwrap_or("<undeclared>")
    }
}

// ─── Entry points ─────────────────────────────────────────────────────────────

/// Decode a `T` from `data` at `offset`.
pub fn decode<T: Layout>(data: &[u8], offset: usize) -> Result<T> {
    T::decode(data, offset)
}

/// Encode `value` into `data` at `offset`; returns the bytes written.
pub fn encode<T: Layout>(value: &T, data: &mut [u8], offset: usize) -> Result<usize> {
    value.encode(data, offset)
}

/// Decode a `T` from the start of `data`.
pub fn from_bytes<T: Layout>(data: &[u8]) -> Result<T> {
    T::decode(data, 0)
}

/// Encode `value` into a freshly allocated buffer of exactly `T::SPAN` bytes.
pub fn to_bytes<T: Layout>(value: &T) -> Result<Vec<u8>> {
    let mut data = vec![0u8; T::SPAN];
    value.encode(&mut data, 0)?;
    Ok(data)
}

// ─── Byte-slice primitives ────────────────────────────────────────────────────

/// Ensure `span` bytes are available at `offset` in a buffer of `len` bytes.
pub fn check_span(len: usize, offset: usize, span: usize, what: &str) -> Result<()> {
    match offset.checked_add(span) {
        Some(end) if end <= len => Ok(()),
        _ => Err(Error::format(
            offset,
            format!(
                "{what} needs {span} bytes; buffer has {} left",
                len.saturating_sub(offset)
            ),
        )),
    }
}

fn read_array<const N: usize>(data: &[u8], offset: usize, what: &str) -> Result<[u8; N]> {
    check_span(data.len(), offset, N, what)?;
    let mut out = [0u8; N];
    out.copy_from_slice(&data[offset..offset + N]);
    Ok(out)
}

fn write_bytes(data: &mut [u8], offset: usize, bytes: &[u8], what: &str) -> Result<usize> {
    check_span(data.len(), offset, bytes.len(), what)?;
    data[offset..offset + bytes.len()].copy_from_slice(bytes);
    Ok(bytes.len())
}

// ─── Primitive codecs ─────────────────────────────────────────────────────────

macro_rules! int_layout {
    ($($ty:ty),* $(,)?) => {$(
        impl Layout for $ty {
            const SPAN: usize = std::mem::size_of::<$ty>();

            fn decode(data: &[u8], offset: usize) -> Result<Self> {
                Ok(<$ty>::from_le_bytes(read_array(data, offset, stringify!($ty))?))
            }

            fn encode(&self, data: &mut [u8], offset: usize) -> Result<usize> {
                write_bytes(data, offset, &self.to_le_bytes(), stringify!($ty))
            }
        }
    )*};
}

// i64 is the signed reading of the same 8 bytes: values >= 2^63 as u64 map to
// value - 2^64, which is exactly two's complement.
int_layout!(u8, u16, u32, u64, i64);

impl Layout for bool {
    const SPAN: usize = 1;

    fn decode(data: &[u8], offset: usize) -> Result<Self> {
        Ok(u8::decode(data, offset)? != 0)
    }

    fn encode(&self, data: &mut [u8], offset: usize) -> Result<usize> {
        u8::from(*self).encode(data, offset)
    }
}

impl Layout for Pubkey {
    const SPAN: usize = 32;

    fn decode(data: &[u8], offset: usize) -> Result<Self> {
        Ok(Pubkey::from(read_array::<32>(data, offset, "Pubkey")?))
    }

    fn encode(&self, data: &mut [u8], offset: usize) -> Result<usize> {
        write_bytes(data, offset, self.as_ref(), "Pubkey")
    }
}

/// Opaque fixed-size blob, e.g. the 8-byte Anchor account discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Padding<const N: usize>(pub [u8; N]);

impl<const N: usize> Default for Padding<N> {
    fn default() -> Self {
        Self([0u8; N])
    }
}

impl<const N: usize> Layout for Padding<N> {
    const SPAN: usize = N;

    fn decode(data: &[u8], offset: usize) -> Result<Self> {
        Ok(Self(read_array(data, offset, "padding")?))
    }

    fn encode(&self, data: &mut [u8], offset: usize) -> Result<usize> {
        write_bytes(data, offset, &self.0, "padding")
    }
}

impl<T: Layout, const N: usize> Layout for [T; N] {
    const SPAN: usize = T::SPAN * N;

    fn decode(data: &[u8], offset: usize) -> Result<Self> {
        check_span(data.len(), offset, Self::SPAN, "sequence")?;
        let items = (0..N)
            .map(|i| T::decode(data, offset + i * T::SPAN))
            .collect::<Result<Vec<T>>>()?;
        items
            .try_into()
            .map_err(|_: Vec<T>| Error::format(offset, "sequence length mismatch"))
    }

    fn encode(&self, data: &mut [u8], offset: usize) -> Result<usize> {
        check_span(data.len(), offset, Self::SPAN, "sequence")?;
        for (i, item) in self.iter().enumerate() {
            item.encode(data, offset + i * T::SPAN)?;
        }
        Ok(Self::SPAN)
    }
}

// ─── Tagged variants ──────────────────────────────────────────────────────────

/// Decode the discriminant byte at `offset` into a variant of `T`.
pub fn decode_tagged<T: TaggedVariant>(data: &[u8], offset: usize) -> Result<T> {
    let tag = u8::decode(data, offset)?;
    T::from_tag(tag).ok_or_else(|| {
        Error::format(
            offset,
            format!("unknown variant tag {tag}; {} variants declared", T::VARIANTS.len()),
        )
    })
}

/// Encode the discriminant of `value`; an index outside `T::VARIANTS` is a
/// declaration mistake, not a data problem.
pub fn encode_tagged<T: TaggedVariant>(value: &T, data: &mut [u8], offset: usize) -> Result<usize> {
    let tag = value.tag();
    if tag as usize >= T::VARIANTS.len() {
        return Err(Error::Config(format!(
            "variant tag {tag} is outside the declared table {:?}",
            T::VARIANTS
        )));
    }
    tag.encode(data, offset)
}

/// Declare a unit-variant enum encoded as a 1-byte discriminant.
///
/// Variants must be listed in tag order starting at 0.
#[macro_export]
macro_rules! tagged_variant {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident = $tag:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis enum $name {
            $( $(#[$vmeta])* $variant = $tag, )+
        }

        impl $crate::layout::TaggedVariant for $name {
            const VARIANTS: &'static [&'static str] = &[ $( stringify!($variant) ),+ ];

            fn tag(&self) -> u8 {
                *self as u8
            }

            fn from_tag(tag: u8) -> Option<Self> {
                match tag {
                    $( $tag => Some($name::$variant), )+
                    _ => None,
                }
            }
        }

        impl $crate::layout::Layout for $name {
            const SPAN: usize = 1;

            fn decode(data: &[u8], offset: usize) -> $crate::error::Result<Self> {
                $crate::layout::decode_tagged(data, offset)
            }

            fn encode(&self, data: &mut [u8], offset: usize) -> $crate::error::Result<usize> {
                $crate::layout::encode_tagged(self, data, offset)
            }
        }
    };
}

// ─── Records ──────────────────────────────────────────────────────────────────

/// Declare a record whose fields are laid out back to back in declaration
/// order. Field order is the wire contract; never reorder.
#[macro_export]
macro_rules! layout_struct {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $( $(#[$fmeta:meta])* $fvis:vis $field:ident : $ty:ty ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis struct $name {
            $( $(#[$fmeta])* $fvis $field: $ty, )+
        }

        impl $crate::layout::Layout for $name {
            const SPAN: usize = 0 $( + <$ty as $crate::layout::Layout>::SPAN )+;

            #[allow(unused_assignments)]
            fn decode(data: &[u8], offset: usize) -> $crate::error::Result<Self> {
                $crate::layout::check_span(data.len(), offset, Self::SPAN, stringify!($name))?;
                let mut cursor = offset;
                $(
                    let $field = <$ty as $crate::layout::Layout>::decode(data, cursor)?;
                    cursor += <$ty as $crate::layout::Layout>::SPAN;
                )+
                Ok(Self { $( $field, )+ })
            }

            fn encode(&self, data: &mut [u8], offset: usize) -> $crate::error::Result<usize> {
                $crate::layout::check_span(data.len(), offset, Self::SPAN, stringify!($name))?;
                let mut cursor = offset;
                $(
                    cursor += $crate::layout::Layout::encode(&self.$field, data, cursor)?;
                )+
                Ok(cursor - offset)
            }
        }

        impl $crate::layout::Schema for $name {
            const FIELDS: &'static [$crate::layout::Field] = &[
                $(
                    $crate::layout::Field {
                        name: stringify!($field),
                        span: <$ty as $crate::layout::Layout>::SPAN,
                    },
                )+
            ];
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    crate::tagged_variant! {
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        enum Direction {
            Up = 0,
            Down = 1,
        }
    }

    crate::layout_struct! {
        #[derive(Debug, Clone, PartialEq)]
        struct Sample {
            head:  Padding<8>,
            count: u64,
            delta: i64,
            flag:  bool,
            dir:   Direction,
            owner: Pubkey,
            ticks: [u32; 3],
        }
    }

    /// Declares two variants but reports tag 2 for one of them.
    #[derive(Debug, Clone, Copy)]
    struct Misdeclared;

    impl TaggedVariant for Misdeclared {
        const VARIANTS: &'static [&'static str] = &["A", "B"];

        fn tag(&self) -> u8 {
            2
        }

        fn from_tag(_tag: u8) -> Option<Self> {
            None
        }
    }

    fn sample() -> Sample {
        Sample {
            head:  Padding([7u8; 8]),
            count: 42,
            delta: -5,
            flag:  true,
            dir:   Direction::Down,
            owner: Pubkey::new_unique(),
            ticks: [1, 2, 3],
        }
    }

    #[test]
    fn span_is_sum_of_fields_and_offsets_are_cumulative() {
        assert_eq!(Sample::SPAN, 8 + 8 + 8 + 1 + 1 + 32 + 12);
        assert_eq!(Sample::FIELDS.iter().map(|f| f.span).sum::<usize>(), Sample::SPAN);
        assert_eq!(Sample::offset_of("head"), Some(0));
        assert_eq!(Sample::offset_of("count"), Some(8));
        assert_eq!(Sample::offset_of("flag"), Some(24));
        assert_eq!(Sample::offset_of("owner"), Some(26));
        assert_eq!(Sample::offset_of("missing"), None);
    }

    #[test]
    fn record_decodes_at_offset() {
        let value = sample();
        let mut buf = vec![0xAAu8; 3 + Sample::SPAN];
        assert_eq!(encode(&value, &mut buf, 3).unwrap(), Sample::SPAN);
        assert_eq!(buf[0..3], [0xAA; 3]);
        assert_eq!(decode::<Sample>(&buf, 3).unwrap(), value);
    }

    #[test]
    fn signed_integers_use_twos_complement() {
        let raw = u64::MAX.to_le_bytes();
        assert_eq!(i64::decode(&raw, 0).unwrap(), -1);
        assert_eq!(u64::decode(&raw, 0).unwrap(), u64::MAX);

        let mut buf = [0u8; 8];
        (-2i64).encode(&mut buf, 0).unwrap();
        assert_eq!(u64::from_le_bytes(buf), u64::MAX - 1);
    }

    #[test]
    fn any_nonzero_byte_is_true() {
        assert!(bool::decode(&[0x80], 0).unwrap());
        assert!(!bool::decode(&[0], 0).unwrap());

        let mut buf = [9u8; 1];
        true.encode(&mut buf, 0).unwrap();
        assert_eq!(buf, [1]);
    }

    #[test]
    fn bytes_survive_decode_then_encode() {
        let mut bytes = to_bytes(&sample()).unwrap();
        // A non-canonical boolean byte is normalised on encode; everything
        // else must come back untouched.
        bytes[Sample::offset_of("flag").unwrap()] = 1;
        let decoded: Sample = from_bytes(&bytes).unwrap();
        assert_eq!(to_bytes(&decoded).unwrap(), bytes);
    }

    #[test]
    fn truncated_buffer_is_a_format_error() {
        let bytes = to_bytes(&sample()).unwrap();
        let err = from_bytes::<Sample>(&bytes[..Sample::SPAN - 1]).unwrap_err();
        assert!(matches!(err, Error::Format { offset: 0, .. }));

        let err = decode::<u64>(&bytes, bytes.len() - 4).unwrap_err();
        assert!(matches!(err, Error::Format { .. }));

        let mut short = vec![0u8; Sample::SPAN - 1];
        assert!(matches!(sample().encode(&mut short, 0), Err(Error::Format { .. })));
    }

    #[test]
    fn tag_selects_variant_by_index() {
        assert_eq!(Direction::decode(&[0], 0).unwrap(), Direction::Up);
        assert_eq!(Direction::decode(&[1], 0).unwrap(), Direction::Down);
        assert_eq!(Direction::Down.variant_name(), "Down");

        let err = Direction::decode(&[2], 0).unwrap_err();
        assert!(matches!(err, Error::Format { offset: 0, .. }));
    }

    #[test]
    fn undeclared_tag_cannot_be_encoded() {
        let mut buf = [0u8; 1];
        let err = encode_tagged(&Misdeclared, &mut buf, 0).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert_eq!(buf, [0]);
    }
}
