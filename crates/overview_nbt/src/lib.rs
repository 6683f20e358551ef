//! A reader for the Named Binary Tag format used by Java edition world files,
//! together with the bit-unpacking primitives needed to decode packed block
//! state arrays.
//!
//! The tree model ([`Compound`], [`List`], [`Value`]) is always available. The
//! binary codec lives behind the `binary` feature, which is enabled by
//! default.

#[cfg(feature = "binary")]
pub use binary::{from_binary, to_binary, written_size};
pub use compound::Compound;
pub use error::*;
pub use list::List;
pub use tag::*;
pub use value::Value;

#[cfg(feature = "binary")]
pub mod binary;
pub mod compound;
mod error;
pub mod list;
pub mod packed;
mod tag;
pub mod value;

/// A convenience macro for constructing [`Compound`]s.
///
/// Key expressions must implement `Into<String>` while value expressions must
/// implement `Into<Value>`.
///
/// # Examples
///
/// ```
/// use overview_nbt::{compound, List};
///
/// let c = compound! {
///     "DataVersion" => 1343,
///     "Level" => compound! {
///         "xPos" => 3,
///         "zPos" => -1,
///         "Sections" => List::Compound(vec![]),
///     },
///     "Blocks" => vec![0_i8; 4096],
/// };
///
/// assert_eq!(c.get_i32("DataVersion"), Some(1343));
/// ```
#[macro_export]
macro_rules! compound {
    ($($key:expr => $value:expr),* $(,)?) => {
        <$crate::Compound as ::std::iter::FromIterator<(::std::string::String, $crate::Value)>>::from_iter([
            $(
                (
                    ::std::convert::Into::<::std::string::String>::into($key),
                    ::std::convert::Into::<$crate::Value>::into($value)
                ),
            )*
        ])
    }
}
