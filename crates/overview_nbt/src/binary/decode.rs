use std::io;

use byteorder::{BigEndian, ByteOrder, ReadBytesExt};
use cesu8::from_java_cesu8;

use crate::tag::Tag;
use crate::{Compound, Error, List, Result, Value, MAX_DEPTH};

/// Decodes uncompressed NBT binary data from the provided slice.
///
/// The string returned in the tuple is the name of the root compound
/// (typically the empty string). The slice is advanced past the decoded data,
/// so callers can check for trailing bytes.
pub fn from_binary(slice: &mut &[u8]) -> Result<(Compound, String)> {
    let mut state = DecodeState { slice, depth: 0 };

    let root_tag = state.read_tag()?;

    if root_tag != Tag::Compound {
        return Err(Error::RootNotCompound(root_tag));
    }

    let root_name = state.read_string()?;
    let root = state.read_compound()?;

    debug_assert_eq!(state.depth, 0);

    Ok((root, root_name))
}

/// Reading from a slice can only fail by running out of bytes.
fn eof(_: io::Error) -> Error {
    Error::UnexpectedEof
}

struct DecodeState<'a, 'b> {
    slice: &'a mut &'b [u8],
    /// Current recursion depth.
    depth: usize,
}

impl<'b> DecodeState<'_, 'b> {
    fn check_depth<T, F>(&mut self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Self) -> Result<T>,
    {
        if self.depth >= MAX_DEPTH {
            return Err(Error::DepthLimit);
        }

        self.depth += 1;
        let res = f(self);
        self.depth -= 1;
        res
    }

    fn read_tag(&mut self) -> Result<Tag> {
        Tag::from_u8(self.slice.read_u8().map_err(eof)?)
    }

    fn read_value(&mut self, tag: Tag) -> Result<Value> {
        Ok(match tag {
            Tag::End => unreachable!("end tag has no payload"),
            Tag::Byte => Value::Byte(self.slice.read_i8().map_err(eof)?),
            Tag::Short => Value::Short(self.slice.read_i16::<BigEndian>().map_err(eof)?),
            Tag::Int => Value::Int(self.read_int()?),
            Tag::Long => Value::Long(self.slice.read_i64::<BigEndian>().map_err(eof)?),
            Tag::Float => Value::Float(self.slice.read_f32::<BigEndian>().map_err(eof)?),
            Tag::Double => Value::Double(self.slice.read_f64::<BigEndian>().map_err(eof)?),
            Tag::ByteArray => Value::ByteArray(self.read_byte_array()?),
            Tag::String => Value::String(self.read_string()?),
            Tag::List => Value::List(self.check_depth(|st| st.read_any_list())?),
            Tag::Compound => Value::Compound(self.check_depth(|st| st.read_compound())?),
            Tag::IntArray => Value::IntArray(self.read_int_array()?),
            Tag::LongArray => Value::LongArray(self.read_long_array()?),
        })
    }

    fn read_int(&mut self) -> Result<i32> {
        self.slice.read_i32::<BigEndian>().map_err(eof)
    }

    /// Reads an `i32` length prefix for a value of type `tag`.
    fn read_len(&mut self, tag: Tag) -> Result<usize> {
        let len = self.read_int()?;

        usize::try_from(len).map_err(|_| Error::NegativeLength { tag, len })
    }

    /// Splits `n` bytes off the front of the input without copying.
    fn take(&mut self, n: usize) -> Result<&'b [u8]> {
        if self.slice.len() < n {
            return Err(Error::UnexpectedEof);
        }

        let (taken, rest) = self.slice.split_at(n);
        *self.slice = rest;
        Ok(taken)
    }

    /// Takes the bytes of an array of `len` elements of `elem_size` bytes,
    /// failing before anything is allocated if the input is too short.
    fn take_array(&mut self, len: usize, elem_size: usize) -> Result<&'b [u8]> {
        let n = len.checked_mul(elem_size).ok_or(Error::UnexpectedEof)?;
        self.take(n)
    }

    fn read_byte_array(&mut self) -> Result<Vec<i8>> {
        let len = self.read_len(Tag::ByteArray)?;
        let bytes = self.take_array(len, 1)?;

        Ok(bytes.iter().map(|&b| b as i8).collect())
    }

    fn read_int_array(&mut self) -> Result<Vec<i32>> {
        let len = self.read_len(Tag::IntArray)?;
        let bytes = self.take_array(len, 4)?;

        Ok(bytes.chunks_exact(4).map(BigEndian::read_i32).collect())
    }

    fn read_long_array(&mut self) -> Result<Vec<i64>> {
        let len = self.read_len(Tag::LongArray)?;
        let bytes = self.take_array(len, 8)?;

        Ok(bytes.chunks_exact(8).map(BigEndian::read_i64).collect())
    }

    fn read_string(&mut self) -> Result<String> {
        let len = self.slice.read_u16::<BigEndian>().map_err(eof)?;
        let bytes = self.take(usize::from(len))?;

        match from_java_cesu8(bytes) {
            Ok(s) => Ok(s.into_owned()),
            Err(_) => Err(Error::InvalidString),
        }
    }

    fn read_compound(&mut self) -> Result<Compound> {
        let mut compound = Compound::new();

        loop {
            let tag = self.read_tag()?;
            if tag == Tag::End {
                return Ok(compound);
            }

            let name = self.read_string()?;
            let value = self.read_value(tag)?;
            compound.insert(name, value);
        }
    }

    fn read_any_list(&mut self) -> Result<List> {
        let elem_tag = self.read_tag()?;
        let len = self.read_len(Tag::List)?;

        Ok(match elem_tag {
            Tag::End => {
                if len != 0 {
                    return Err(Error::NonEmptyEndList(len as i32));
                }
                List::End
            }
            Tag::Byte => List::Byte(self.take_array(len, 1)?.iter().map(|&b| b as i8).collect()),
            Tag::Short => List::Short(
                self.take_array(len, 2)?
                    .chunks_exact(2)
                    .map(BigEndian::read_i16)
                    .collect(),
            ),
            Tag::Int => List::Int(
                self.take_array(len, 4)?
                    .chunks_exact(4)
                    .map(BigEndian::read_i32)
                    .collect(),
            ),
            Tag::Long => List::Long(
                self.take_array(len, 8)?
                    .chunks_exact(8)
                    .map(BigEndian::read_i64)
                    .collect(),
            ),
            Tag::Float => List::Float(
                self.take_array(len, 4)?
                    .chunks_exact(4)
                    .map(BigEndian::read_f32)
                    .collect(),
            ),
            Tag::Double => List::Double(
                self.take_array(len, 8)?
                    .chunks_exact(8)
                    .map(BigEndian::read_f64)
                    .collect(),
            ),
            Tag::ByteArray => List::ByteArray(self.read_list(len, |st| st.read_byte_array())?),
            Tag::String => List::String(self.read_list(len, |st| st.read_string())?),
            Tag::List => {
                List::List(self.read_list(len, |st| st.check_depth(|st| st.read_any_list()))?)
            }
            Tag::Compound => {
                List::Compound(self.read_list(len, |st| st.check_depth(|st| st.read_compound()))?)
            }
            Tag::IntArray => List::IntArray(self.read_list(len, |st| st.read_int_array())?),
            Tag::LongArray => List::LongArray(self.read_list(len, |st| st.read_long_array())?),
        })
    }

    fn read_list<T, F>(&mut self, len: usize, mut read_elem: F) -> Result<Vec<T>>
    where
        F: FnMut(&mut Self) -> Result<T>,
    {
        // Every element occupies at least one byte, so the remaining input
        // bounds the allocation.
        let mut list = Vec::with_capacity(len.min(self.slice.len()));

        for _ in 0..len {
            list.push(read_elem(self)?);
        }

        Ok(list)
    }
}
