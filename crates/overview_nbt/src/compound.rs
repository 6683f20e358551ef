use std::borrow::Borrow;
use std::collections::btree_map;
use std::collections::BTreeMap;
use std::fmt;
use std::ops::Index;

use crate::{List, Value};

/// A map type with [`String`] keys and [`Value`] values.
///
/// Keys are kept in sorted order, so iteration (and therefore encoding) is
/// deterministic.
#[derive(Clone, PartialEq, Default)]
pub struct Compound {
    map: BTreeMap<String, Value>,
}

impl fmt::Debug for Compound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.map.fmt(f)
    }
}

impl Compound {
    pub fn new() -> Self {
        Self {
            map: BTreeMap::new(),
        }
    }

    pub fn get<Q>(&self, k: &Q) -> Option<&Value>
    where
        String: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.map.get(k)
    }

    pub fn get_mut<Q>(&mut self, k: &Q) -> Option<&mut Value>
    where
        String: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.map.get_mut(k)
    }

    pub fn contains_key<Q>(&self, k: &Q) -> bool
    where
        String: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.map.contains_key(k)
    }

    pub fn insert<K, V>(&mut self, k: K, v: V) -> Option<Value>
    where
        K: Into<String>,
        V: Into<Value>,
    {
        self.map.insert(k.into(), v.into())
    }

    pub fn remove<Q>(&mut self, k: &Q) -> Option<Value>
    where
        String: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.map.remove(k)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, Value> {
        self.map.iter()
    }

    pub fn keys(&self) -> btree_map::Keys<'_, String, Value> {
        self.map.keys()
    }

    pub fn values(&self) -> btree_map::Values<'_, String, Value> {
        self.map.values()
    }

    pub fn get_i8(&self, k: &str) -> Option<i8> {
        match self.get(k)? {
            Value::Byte(v) => Some(*v),
            _ => None,
        }
    }

    pub fn get_i32(&self, k: &str) -> Option<i32> {
        match self.get(k)? {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns any integer scalar under `k` widened to `i64`. Fields whose
    /// width changed between format revisions are read through this.
    pub fn get_int_like(&self, k: &str) -> Option<i64> {
        self.get(k)?.as_int_like()
    }

    pub fn get_string(&self, k: &str) -> Option<&str> {
        self.get(k)?.as_str()
    }

    pub fn get_compound(&self, k: &str) -> Option<&Compound> {
        self.get(k)?.as_compound()
    }

    pub fn get_list(&self, k: &str) -> Option<&List> {
        self.get(k)?.as_list()
    }

    pub fn get_byte_array(&self, k: &str) -> Option<&[i8]> {
        match self.get(k)? {
            Value::ByteArray(v) => Some(v),
            _ => None,
        }
    }

    pub fn get_int_array(&self, k: &str) -> Option<&[i32]> {
        match self.get(k)? {
            Value::IntArray(v) => Some(v),
            _ => None,
        }
    }

    pub fn get_long_array(&self, k: &str) -> Option<&[i64]> {
        match self.get(k)? {
            Value::LongArray(v) => Some(v),
            _ => None,
        }
    }
}

impl Extend<(String, Value)> for Compound {
    fn extend<T>(&mut self, iter: T)
    where
        T: IntoIterator<Item = (String, Value)>,
    {
        self.map.extend(iter);
    }
}

impl FromIterator<(String, Value)> for Compound {
    fn from_iter<T>(iter: T) -> Self
    where
        T: IntoIterator<Item = (String, Value)>,
    {
        Self {
            map: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a Compound {
    type Item = (&'a String, &'a Value);
    type IntoIter = btree_map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.map.iter()
    }
}

impl IntoIterator for Compound {
    type Item = (String, Value);
    type IntoIter = btree_map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.map.into_iter()
    }
}

impl<Q> Index<&'_ Q> for Compound
where
    String: Borrow<Q>,
    Q: ?Sized + Ord,
{
    type Output = Value;

    fn index(&self, index: &Q) -> &Self::Output {
        self.map.index(index)
    }
}
