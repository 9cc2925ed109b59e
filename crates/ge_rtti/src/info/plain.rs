use byteorder::{ByteOrder, LittleEndian};

use crate::error::FieldError;

// -----------------------------------------------------------------------------
// PlainType

/// A value stored in the stream as raw bytes, without field metadata of its own.
///
/// Fixed size types set [`STATIC_SIZE`](PlainType::STATIC_SIZE), which must
/// not exceed 255 bytes. Types whose encoding varies per value set
/// [`HAS_DYNAMIC_SIZE`](PlainType::HAS_DYNAMIC_SIZE); the serializer then
/// writes a byte-length prefix before every value.
///
/// All built-in implementations are little-endian.
///
/// # Examples
///
/// ```
/// use ge_rtti::error::FieldError;
/// use ge_rtti::info::PlainType;
///
/// #[derive(Debug, Default, Clone, Copy, PartialEq)]
/// struct Rgba([u8; 4]);
///
/// impl PlainType for Rgba {
///     const STATIC_SIZE: u32 = 4;
///
///     fn write_bytes(&self, out: &mut Vec<u8>) -> Result<(), FieldError> {
///         out.extend_from_slice(&self.0);
///         Ok(())
///     }
///
///     fn read_bytes(bytes: &[u8]) -> Result<Self, FieldError> {
///         <[u8; 4]>::read_bytes(bytes).map(Rgba)
///     }
/// }
///
/// let mut out = Vec::new();
/// Rgba([1, 2, 3, 4]).write_bytes(&mut out).unwrap();
/// assert_eq!(Rgba::read_bytes(&out).unwrap(), Rgba([1, 2, 3, 4]));
/// ```
pub trait PlainType: Sized + Send + Sync + 'static {
    /// Whether values carry their own length in the stream.
    const HAS_DYNAMIC_SIZE: bool = false;

    /// Encoded size of every value, `0` for dynamically sized types.
    const STATIC_SIZE: u32;

    /// Appends the encoded value to `out`.
    ///
    /// Fixed size types must append exactly `STATIC_SIZE` bytes.
    fn write_bytes(&self, out: &mut Vec<u8>) -> Result<(), FieldError>;

    /// Reads a value from exactly the bytes [`write_bytes`](PlainType::write_bytes) produced.
    fn read_bytes(bytes: &[u8]) -> Result<Self, FieldError>;
}

#[inline]
fn expect_len(bytes: &[u8], len: usize) -> Result<(), FieldError> {
    if bytes.len() == len {
        Ok(())
    } else {
        Err(FieldError::InvalidData {
            reason: "byte count does not match the type size",
        })
    }
}

// -----------------------------------------------------------------------------
// Numbers

macro_rules! impl_plain_number {
    ($($ty:ty => $write:ident, $read:ident;)*) => {$(
        impl PlainType for $ty {
            const STATIC_SIZE: u32 = size_of::<$ty>() as u32;

            #[inline]
            fn write_bytes(&self, out: &mut Vec<u8>) -> Result<(), FieldError> {
                let mut buf = [0_u8; size_of::<$ty>()];
                LittleEndian::$write(&mut buf, *self);
                out.extend_from_slice(&buf);
                Ok(())
            }

            #[inline]
            fn read_bytes(bytes: &[u8]) -> Result<Self, FieldError> {
                expect_len(bytes, size_of::<$ty>())?;
                Ok(LittleEndian::$read(bytes))
            }
        }
    )*};
}

impl_plain_number! {
    u16 => write_u16, read_u16;
    u32 => write_u32, read_u32;
    u64 => write_u64, read_u64;
    u128 => write_u128, read_u128;
    i16 => write_i16, read_i16;
    i32 => write_i32, read_i32;
    i64 => write_i64, read_i64;
    i128 => write_i128, read_i128;
    f32 => write_f32, read_f32;
    f64 => write_f64, read_f64;
}

impl PlainType for u8 {
    const STATIC_SIZE: u32 = 1;

    #[inline]
    fn write_bytes(&self, out: &mut Vec<u8>) -> Result<(), FieldError> {
        out.push(*self);
        Ok(())
    }

    #[inline]
    fn read_bytes(bytes: &[u8]) -> Result<Self, FieldError> {
        expect_len(bytes, 1)?;
        Ok(bytes[0])
    }
}

impl PlainType for i8 {
    const STATIC_SIZE: u32 = 1;

    #[inline]
    fn write_bytes(&self, out: &mut Vec<u8>) -> Result<(), FieldError> {
        out.push(*self as u8);
        Ok(())
    }

    #[inline]
    fn read_bytes(bytes: &[u8]) -> Result<Self, FieldError> {
        expect_len(bytes, 1)?;
        Ok(bytes[0] as i8)
    }
}

impl PlainType for bool {
    const STATIC_SIZE: u32 = 1;

    #[inline]
    fn write_bytes(&self, out: &mut Vec<u8>) -> Result<(), FieldError> {
        out.push(u8::from(*self));
        Ok(())
    }

    fn read_bytes(bytes: &[u8]) -> Result<Self, FieldError> {
        expect_len(bytes, 1)?;
        match bytes[0] {
            0 => Ok(false),
            1 => Ok(true),
            _ => Err(FieldError::InvalidData {
                reason: "bool must be 0 or 1",
            }),
        }
    }
}

impl PlainType for char {
    const STATIC_SIZE: u32 = 4;

    #[inline]
    fn write_bytes(&self, out: &mut Vec<u8>) -> Result<(), FieldError> {
        u32::from(*self).write_bytes(out)
    }

    fn read_bytes(bytes: &[u8]) -> Result<Self, FieldError> {
        char::from_u32(u32::read_bytes(bytes)?).ok_or(FieldError::InvalidData {
            reason: "invalid unicode scalar value",
        })
    }
}

// -----------------------------------------------------------------------------
// Dynamically sized

impl PlainType for String {
    const HAS_DYNAMIC_SIZE: bool = true;
    const STATIC_SIZE: u32 = 0;

    #[inline]
    fn write_bytes(&self, out: &mut Vec<u8>) -> Result<(), FieldError> {
        out.extend_from_slice(self.as_bytes());
        Ok(())
    }

    fn read_bytes(bytes: &[u8]) -> Result<Self, FieldError> {
        String::from_utf8(bytes.to_vec()).map_err(|_| FieldError::InvalidData {
            reason: "string is not valid utf-8",
        })
    }
}

/// A length as the `u32` the format stores.
#[inline]
pub(crate) fn encoded_len(len: usize) -> Result<u32, FieldError> {
    u32::try_from(len).map_err(|_| FieldError::InvalidData {
        reason: "length does not fit in 32 bits",
    })
}

/// `element * len`, saturating at `u32::MAX`. Oversized arrays then fail
/// the 255 byte limit at registration.
const fn sequence_size(element: u32, len: usize) -> u32 {
    let total = element as u128 * len as u128;
    if total > u32::MAX as u128 {
        u32::MAX
    } else {
        total as u32
    }
}

/// Writes one element of a sequence, prefixed with its length when dynamic.
fn write_element<T: PlainType>(value: &T, out: &mut Vec<u8>) -> Result<(), FieldError> {
    if T::HAS_DYNAMIC_SIZE {
        let start = out.len();
        out.extend_from_slice(&[0; 4]);
        value.write_bytes(out)?;
        let len = encoded_len(out.len() - start - 4)?;
        LittleEndian::write_u32(&mut out[start..start + 4], len);
        Ok(())
    } else {
        value.write_bytes(out)
    }
}

/// Splits `len` bytes off the front of `bytes`.
fn take<'a>(bytes: &mut &'a [u8], len: usize) -> Result<&'a [u8], FieldError> {
    if bytes.len() < len {
        return Err(FieldError::InvalidData {
            reason: "sequence ends early",
        });
    }
    let (head, tail) = bytes.split_at(len);
    *bytes = tail;
    Ok(head)
}

fn read_element<T: PlainType>(bytes: &mut &[u8]) -> Result<T, FieldError> {
    let len = if T::HAS_DYNAMIC_SIZE {
        LittleEndian::read_u32(take(bytes, 4)?) as usize
    } else {
        T::STATIC_SIZE as usize
    };
    T::read_bytes(take(bytes, len)?)
}

/// `u32` element count followed by the elements.
impl<T: PlainType> PlainType for Vec<T> {
    const HAS_DYNAMIC_SIZE: bool = true;
    const STATIC_SIZE: u32 = 0;

    fn write_bytes(&self, out: &mut Vec<u8>) -> Result<(), FieldError> {
        encoded_len(self.len())?.write_bytes(out)?;
        for value in self {
            write_element(value, out)?;
        }
        Ok(())
    }

    fn read_bytes(mut bytes: &[u8]) -> Result<Self, FieldError> {
        let count = LittleEndian::read_u32(take(&mut bytes, 4)?) as usize;
        // Bound the reservation by what the input can actually hold.
        let mut values = Vec::with_capacity(count.min(bytes.len()));
        for _ in 0..count {
            values.push(read_element(&mut bytes)?);
        }
        expect_len(bytes, 0)?;
        Ok(values)
    }
}

/// The elements back to back, dynamic elements length-prefixed.
impl<T: PlainType, const N: usize> PlainType for [T; N] {
    const HAS_DYNAMIC_SIZE: bool = T::HAS_DYNAMIC_SIZE;
    const STATIC_SIZE: u32 = if T::HAS_DYNAMIC_SIZE {
        0
    } else {
        sequence_size(T::STATIC_SIZE, N)
    };

    fn write_bytes(&self, out: &mut Vec<u8>) -> Result<(), FieldError> {
        for value in self {
            write_element(value, out)?;
        }
        Ok(())
    }

    fn read_bytes(mut bytes: &[u8]) -> Result<Self, FieldError> {
        let mut values = Vec::with_capacity(N);
        for _ in 0..N {
            values.push(read_element(&mut bytes)?);
        }
        expect_len(bytes, 0)?;
        <[T; N]>::try_from(values).map_err(|_| FieldError::InvalidData {
            reason: "array length mismatch",
        })
    }
}

/// A presence byte followed by the value.
impl<T: PlainType> PlainType for Option<T> {
    const HAS_DYNAMIC_SIZE: bool = true;
    const STATIC_SIZE: u32 = 0;

    fn write_bytes(&self, out: &mut Vec<u8>) -> Result<(), FieldError> {
        match self {
            Some(value) => {
                out.push(1);
                value.write_bytes(out)
            }
            None => {
                out.push(0);
                Ok(())
            }
        }
    }

    fn read_bytes(bytes: &[u8]) -> Result<Self, FieldError> {
        match bytes.split_first() {
            Some((0, [])) => Ok(None),
            Some((1, rest)) => T::read_bytes(rest).map(Some),
            _ => Err(FieldError::InvalidData {
                reason: "invalid option tag",
            }),
        }
    }
}
