use std::io::Write;

use byteorder::{BigEndian, WriteBytesExt};
use cesu8::to_java_cesu8;

use crate::tag::Tag;
use crate::{Compound, Error, List, Result, Value};

/// Encodes uncompressed NBT binary data to the provided writer.
///
/// Only compounds are permitted at the top level. This is why the function
/// accepts a [`Compound`] reference rather than a [`Value`].
///
/// Additionally, the root compound can be given a name. Typically the empty
/// string `""` is used.
pub fn to_binary<W: Write>(comp: &Compound, writer: W, root_name: &str) -> Result<()> {
    let mut state = EncodeState { writer };

    state.write_tag(Tag::Compound)?;
    state.write_string(root_name)?;
    state.write_compound(comp)?;

    Ok(())
}

/// Returns the number of bytes that will be written when [`to_binary`] is
/// called with this compound and root name.
pub fn written_size(comp: &Compound, root_name: &str) -> usize {
    fn value_size(val: &Value) -> usize {
        match val {
            Value::Byte(_) => 1,
            Value::Short(_) => 2,
            Value::Int(_) | Value::Float(_) => 4,
            Value::Long(_) | Value::Double(_) => 8,
            Value::ByteArray(v) => 4 + v.len(),
            Value::String(v) => string_size(v),
            Value::List(v) => list_size(v),
            Value::Compound(v) => compound_size(v),
            Value::IntArray(v) => 4 + v.len() * 4,
            Value::LongArray(v) => 4 + v.len() * 8,
        }
    }

    fn list_size(l: &List) -> usize {
        let elems_size = match l {
            List::End => 0,
            List::Byte(v) => v.len(),
            List::Short(v) => v.len() * 2,
            List::Int(v) => v.len() * 4,
            List::Long(v) => v.len() * 8,
            List::Float(v) => v.len() * 4,
            List::Double(v) => v.len() * 8,
            List::ByteArray(v) => v.iter().map(|b| 4 + b.len()).sum(),
            List::String(v) => v.iter().map(|s| string_size(s)).sum(),
            List::List(v) => v.iter().map(list_size).sum(),
            List::Compound(v) => v.iter().map(compound_size).sum(),
            List::IntArray(v) => v.iter().map(|i| 4 + i.len() * 4).sum(),
            List::LongArray(v) => v.iter().map(|l| 4 + l.len() * 8).sum(),
        };

        1 + 4 + elems_size
    }

    fn string_size(s: &str) -> usize {
        2 + to_java_cesu8(s).len()
    }

    fn compound_size(c: &Compound) -> usize {
        c.iter()
            .map(|(k, v)| 1 + string_size(k) + value_size(v))
            .sum::<usize>()
            + 1
    }

    1 + string_size(root_name) + compound_size(comp)
}

struct EncodeState<W> {
    writer: W,
}

impl<W: Write> EncodeState<W> {
    fn write_tag(&mut self, tag: Tag) -> Result<()> {
        Ok(self.writer.write_u8(tag as u8)?)
    }

    fn write_value(&mut self, v: &Value) -> Result<()> {
        match v {
            Value::Byte(v) => Ok(self.writer.write_i8(*v)?),
            Value::Short(v) => Ok(self.writer.write_i16::<BigEndian>(*v)?),
            Value::Int(v) => Ok(self.writer.write_i32::<BigEndian>(*v)?),
            Value::Long(v) => Ok(self.writer.write_i64::<BigEndian>(*v)?),
            Value::Float(v) => Ok(self.writer.write_f32::<BigEndian>(*v)?),
            Value::Double(v) => Ok(self.writer.write_f64::<BigEndian>(*v)?),
            Value::ByteArray(v) => self.write_byte_array(v),
            Value::String(v) => self.write_string(v),
            Value::List(v) => self.write_any_list(v),
            Value::Compound(v) => self.write_compound(v),
            Value::IntArray(v) => self.write_int_array(v),
            Value::LongArray(v) => self.write_long_array(v),
        }
    }

    fn write_len(&mut self, tag: Tag, len: usize) -> Result<()> {
        match i32::try_from(len) {
            Ok(n) => Ok(self.writer.write_i32::<BigEndian>(n)?),
            Err(_) => Err(Error::TooLong { tag, len }),
        }
    }

    fn write_byte_array(&mut self, bytes: &[i8]) -> Result<()> {
        self.write_len(Tag::ByteArray, bytes.len())?;

        for b in bytes {
            self.writer.write_i8(*b)?;
        }

        Ok(())
    }

    fn write_string(&mut self, s: &str) -> Result<()> {
        let encoded = to_java_cesu8(s);

        match u16::try_from(encoded.len()) {
            Ok(n) => self.writer.write_u16::<BigEndian>(n)?,
            Err(_) => {
                return Err(Error::TooLong {
                    tag: Tag::String,
                    len: encoded.len(),
                })
            }
        }

        Ok(self.writer.write_all(&encoded)?)
    }

    fn write_any_list(&mut self, list: &List) -> Result<()> {
        match list {
            List::End => {
                self.write_tag(Tag::End)?;
                self.write_len(Tag::List, 0)
            }
            List::Byte(v) => self.write_list(v, Tag::Byte, |st, v| Ok(st.writer.write_i8(*v)?)),
            List::Short(v) => self.write_list(v, Tag::Short, |st, v| {
                Ok(st.writer.write_i16::<BigEndian>(*v)?)
            }),
            List::Int(v) => self.write_list(v, Tag::Int, |st, v| {
                Ok(st.writer.write_i32::<BigEndian>(*v)?)
            }),
            List::Long(v) => self.write_list(v, Tag::Long, |st, v| {
                Ok(st.writer.write_i64::<BigEndian>(*v)?)
            }),
            List::Float(v) => self.write_list(v, Tag::Float, |st, v| {
                Ok(st.writer.write_f32::<BigEndian>(*v)?)
            }),
            List::Double(v) => self.write_list(v, Tag::Double, |st, v| {
                Ok(st.writer.write_f64::<BigEndian>(*v)?)
            }),
            List::ByteArray(v) => {
                self.write_list(v, Tag::ByteArray, |st, v| st.write_byte_array(v))
            }
            List::String(v) => self.write_list(v, Tag::String, |st, v| st.write_string(v)),
            List::List(v) => self.write_list(v, Tag::List, |st, v| st.write_any_list(v)),
            List::Compound(v) => self.write_list(v, Tag::Compound, |st, v| st.write_compound(v)),
            List::IntArray(v) => self.write_list(v, Tag::IntArray, |st, v| st.write_int_array(v)),
            List::LongArray(v) => {
                self.write_list(v, Tag::LongArray, |st, v| st.write_long_array(v))
            }
        }
    }

    fn write_list<T, F>(&mut self, list: &[T], elem_type: Tag, mut write_elem: F) -> Result<()>
    where
        F: FnMut(&mut Self, &T) -> Result<()>,
    {
        self.write_tag(elem_type)?;
        self.write_len(Tag::List, list.len())?;

        for elem in list {
            write_elem(self, elem)?;
        }

        Ok(())
    }

    fn write_compound(&mut self, c: &Compound) -> Result<()> {
        for (k, v) in c {
            self.write_tag(v.tag())?;
            self.write_string(k)?;
            self.write_value(v)?;
        }

        self.write_tag(Tag::End)
    }

    fn write_int_array(&mut self, ia: &[i32]) -> Result<()> {
        self.write_len(Tag::IntArray, ia.len())?;

        for i in ia {
            self.writer.write_i32::<BigEndian>(*i)?;
        }

        Ok(())
    }

    fn write_long_array(&mut self, la: &[i64]) -> Result<()> {
        self.write_len(Tag::LongArray, la.len())?;

        for l in la {
            self.writer.write_i64::<BigEndian>(*l)?;
        }

        Ok(())
    }
}
