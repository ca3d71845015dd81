use crate::{DeError, Endianness, SerError, WireDeserialize, WireSerialize};

// Primitive integer/float impls: each converts through `to_*_bytes`/`from_*_bytes`, picking
// little- or big-endian per the `Endianness` argument. `Native` is treated as `Little` since
// on-medium images never rely on the host's own byte order.
macro_rules! impl_wire_primitive {
    ($($t:ty),*) => {
        $(
            impl WireSerialize for $t {
                fn serialize(&self, endianness: Endianness, target: &mut [u8]) -> Result<usize, SerError> {
                    const SIZE: usize = core::mem::size_of::<$t>();
                    if target.len() < SIZE {
                        return Err(SerError::BufferTooSmall);
                    }
                    let bytes = match endianness {
                        Endianness::Native | Endianness::Little => self.to_le_bytes(),
                        Endianness::Big => self.to_be_bytes(),
                    };
                    target[..SIZE].copy_from_slice(&bytes);
                    Ok(SIZE)
                }
            }

            impl WireDeserialize for $t {
                fn deserialize(endianness: Endianness, input: &[u8]) -> Result<(Self, usize), DeError> {
                    const SIZE: usize = core::mem::size_of::<$t>();
                    if input.len() < SIZE {
                        return Err(DeError::BufferTooShort);
                    }
                    let mut bytes = [0u8; SIZE];
                    bytes.copy_from_slice(&input[..SIZE]);
                    let value = match endianness {
                        Endianness::Native | Endianness::Little => <$t>::from_le_bytes(bytes),
                        Endianness::Big => <$t>::from_be_bytes(bytes),
                    };
                    Ok((value, SIZE))
                }
            }
        )*
    };
}

impl_wire_primitive!(u8, u16, u32, u64, i8, i16, i32, i64, f32, f64);

// Fixed-size byte arrays serialize element-by-element through the primitive impl above. For
// `[u8; N]` this is a no-op swap per element (a single byte has no byte order), which is
// exactly the "filename is a byte array and is not byte-swapped" rule — no special case
// needed, it falls out of serializing each `u8` independently.
impl<const N: usize, T> WireSerialize for [T; N]
where
    T: WireSerialize,
{
    fn serialize(&self, endianness: Endianness, target: &mut [u8]) -> Result<usize, SerError> {
        let mut acc = 0;
        for elem in self.iter() {
            acc += elem.serialize(endianness, &mut target[acc..])?;
        }
        Ok(acc)
    }
}

impl<const N: usize, T> WireDeserialize for [T; N]
where
    T: WireDeserialize + Default + Copy,
{
    fn deserialize(endianness: Endianness, input: &[u8]) -> Result<(Self, usize), DeError> {
        let mut result = [T::default(); N];
        let mut acc = 0;
        for slot in result.iter_mut() {
            let (value, written) = T::deserialize(endianness, &input[acc..])?;
            *slot = value;
            acc += written;
        }
        Ok((result, acc))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn u32_round_trips_both_endians() {
        let value: u32 = 0xEEF5_1234;
        let mut buf = [0u8; 4];

        value.serialize(Endianness::Big, &mut buf).unwrap();
        assert_eq!(buf, [0xEE, 0xF5, 0x12, 0x34]);
        let (decoded, written) = u32::deserialize(Endianness::Big, &buf).unwrap();
        assert_eq!(decoded, value);
        assert_eq!(written, 4);

        value.serialize(Endianness::Little, &mut buf).unwrap();
        assert_eq!(buf, [0x34, 0x12, 0xF5, 0xEE]);
        let (decoded, _) = u32::deserialize(Endianness::Little, &buf).unwrap();
        assert_eq!(decoded, value);
    }

    #[test]
    fn byte_array_is_endian_invariant() {
        let filename: [u8; 8] = *b"hello.da";
        let mut little = [0u8; 8];
        let mut big = [0u8; 8];
        filename.serialize(Endianness::Little, &mut little).unwrap();
        filename.serialize(Endianness::Big, &mut big).unwrap();
        assert_eq!(little, big);
        assert_eq!(little, filename);
    }

    #[test]
    fn buffer_too_small_is_reported() {
        let value: u32 = 1;
        let mut buf = [0u8; 2];
        assert_eq!(value.serialize(Endianness::Big, &mut buf), Err(SerError::BufferTooSmall));
        assert_eq!(u32::deserialize(Endianness::Big, &buf), Err(DeError::BufferTooShort));
    }
}
