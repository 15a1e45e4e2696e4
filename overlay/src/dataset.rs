//! Minimal dataset abstraction for overlay attribute access.
//!
//! The overlay routines only need tag-indexed access to numeric,
//! string and binary element values; [`AttributeProvider`] captures
//! exactly that, so that any object model can back them. The in-memory
//! [`MemDataSet`] implementation serves the extraction tooling and the
//! test suites.

use std::collections::BTreeMap;

/// The value representation of a binary element.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum BinaryVr {
    /// Other Byte: a plain byte stream, endianness-neutral.
    Ob,
    /// Other Word: 16-bit words, sensitive to byte order.
    Ow,
}

/// Tag-indexed access to the element values of a dataset.
pub trait AttributeProvider {
    /// The first integer value of the element, if present.
    fn int_value(&self, tag: u32) -> Option<i32>;

    /// All integer values of the element, if present.
    fn int_values(&self, tag: u32) -> Option<Vec<i32>>;

    /// The string value of the element, if present.
    fn string_value(&self, tag: u32) -> Option<String>;

    /// The raw bytes of a binary element, if present.
    fn binary_value(&self, tag: u32) -> Option<&[u8]>;

    /// The value representation of a binary element, if present.
    fn binary_vr(&self, tag: u32) -> Option<BinaryVr>;

    /// Set the element to a single integer value.
    fn set_int_value(&mut self, tag: u32, value: i32);

    /// Set the element to a sequence of integer values.
    fn set_int_values(&mut self, tag: u32, values: &[i32]);

    /// Set the element to a string value.
    fn set_string_value(&mut self, tag: u32, value: &str);

    /// Set the element to raw bytes with the given value representation.
    fn set_binary_value(&mut self, tag: u32, data: Vec<u8>, vr: BinaryVr);

    /// Remove the element. Removing an absent element is a no-op.
    fn remove(&mut self, tag: u32);

    /// Whether the element is present.
    fn has(&self, tag: u32) -> bool {
        self.int_value(tag).is_some()
            || self.string_value(tag).is_some()
            || self.binary_value(tag).is_some()
    }
}

#[derive(Debug, Clone)]
enum Attribute {
    Ints(Vec<i32>),
    Str(String),
    Binary { data: Vec<u8>, vr: BinaryVr },
}

/// An in-memory [`AttributeProvider`] over a tag-ordered map.
#[derive(Debug, Default, Clone)]
pub struct MemDataSet {
    attributes: BTreeMap<u32, Attribute>,
}

impl MemDataSet {
    pub fn new() -> Self {
        MemDataSet::default()
    }

    /// All element tags currently present, in ascending order.
    pub fn tags(&self) -> impl Iterator<Item = u32> + '_ {
        self.attributes.keys().copied()
    }
}

impl AttributeProvider for MemDataSet {
    fn int_value(&self, tag: u32) -> Option<i32> {
        match self.attributes.get(&tag)? {
            Attribute::Ints(values) => values.first().copied(),
            // first component of a possibly multi-valued string
            Attribute::Str(value) => value.split('\\').next()?.trim().parse().ok(),
            Attribute::Binary { .. } => None,
        }
    }

    fn int_values(&self, tag: u32) -> Option<Vec<i32>> {
        match self.attributes.get(&tag)? {
            Attribute::Ints(values) => Some(values.clone()),
            Attribute::Str(value) => value
                .split('\\')
                .map(|v| v.trim().parse().ok())
                .collect(),
            Attribute::Binary { .. } => None,
        }
    }

    fn string_value(&self, tag: u32) -> Option<String> {
        match self.attributes.get(&tag)? {
            Attribute::Ints(values) => values.first().map(|v| v.to_string()),
            Attribute::Str(value) => Some(value.clone()),
            Attribute::Binary { .. } => None,
        }
    }

    fn binary_value(&self, tag: u32) -> Option<&[u8]> {
        match self.attributes.get(&tag)? {
            Attribute::Binary { data, .. } => Some(data),
            _ => None,
        }
    }

    fn binary_vr(&self, tag: u32) -> Option<BinaryVr> {
        match self.attributes.get(&tag)? {
            Attribute::Binary { vr, .. } => Some(*vr),
            _ => None,
        }
    }

    fn set_int_value(&mut self, tag: u32, value: i32) {
        self.attributes.insert(tag, Attribute::Ints(vec![value]));
    }

    fn set_int_values(&mut self, tag: u32, values: &[i32]) {
        self.attributes.insert(tag, Attribute::Ints(values.to_vec()));
    }

    fn set_string_value(&mut self, tag: u32, value: &str) {
        self.attributes.insert(tag, Attribute::Str(value.to_owned()));
    }

    fn set_binary_value(&mut self, tag: u32, data: Vec<u8>, vr: BinaryVr) {
        self.attributes.insert(tag, Attribute::Binary { data, vr });
    }

    fn remove(&mut self, tag: u32) {
        self.attributes.remove(&tag);
    }

    fn has(&self, tag: u32) -> bool {
        self.attributes.contains_key(&tag)
    }
}
