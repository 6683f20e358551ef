//! Support for decoding and encoding compounds in Java edition's binary
//! format.
//!
//! # Examples
//!
//! ```
//! use overview_nbt::{compound, from_binary, to_binary, List};
//!
//! let c = compound! {
//!     "DataVersion" => 2230,
//!     "Palette" => List::Compound(vec![compound! { "Name" => "minecraft:air" }]),
//! };
//!
//! let mut buf = vec![];
//! to_binary(&c, &mut buf, "").unwrap();
//!
//! let (decoded, root_name) = from_binary(&mut buf.as_slice()).unwrap();
//!
//! assert_eq!(decoded, c);
//! assert_eq!(root_name, "");
//! ```

mod decode;
mod encode;
#[cfg(test)]
mod tests;

pub use decode::*;
pub use encode::*;
