//! Custom property bags.
//!
//! Tiled attaches `{name, type, value}` property lists to maps, layers, tilesets and
//! tiles. [`CustomProperties`] buckets them by value type and supports dotted names
//! (`"stats.speed"`) to reach into nested class properties.

use std::collections::BTreeMap;
use std::path::Path;

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::json::{JsonObject, optional_str};

/// A queryable bag of resolved custom properties.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CustomProperties {
    pub bools: BTreeMap<String, bool>,
    pub numbers: BTreeMap<String, f64>,
    pub strings: BTreeMap<String, String>,
    pub files: BTreeMap<String, String>,
    pub colors: BTreeMap<String, Srgba>,
    pub classes: BTreeMap<String, CustomProperties>,
}

impl CustomProperties {
    /// Build a bag from a raw Tiled `properties` array.
    pub fn from_json(properties: &[Value]) -> Self {
        let mut bag = Self::default();
        bag.load(properties);
        bag
    }

    /// Replace the contents of this bag with the given `properties` array.
    ///
    /// An empty array leaves the bag untouched, so properties set by hand on a
    /// generated asset survive a reimport of a source that has none. Entries without
    /// a name or value are skipped with a warning.
    pub fn load(&mut self, properties: &[Value]) {
        if properties.is_empty() {
            return;
        }
        self.clear();

        for entry in properties {
            let Some(entry) = entry.as_object() else {
                warn!("Skipping custom property that is not an object: {entry}");
                continue;
            };
            let (Some(name), Some(value)) = (optional_str(entry, "name"), entry.get("value")) else {
                warn!("Skipping custom property without a name or value");
                continue;
            };
            let kind = optional_str(entry, "type").unwrap_or_default();
            self.insert(name, kind, value);
        }
    }

    fn insert(&mut self, name: &str, kind: &str, value: &Value) {
        let name = name.to_owned();
        match value {
            Value::Object(members) => {
                self.classes.insert(name, Self::from_class_members(members));
            }
            Value::Bool(flag) => {
                self.bools.insert(name, *flag);
            }
            Value::Number(number) => {
                self.numbers.insert(name, number.as_f64().unwrap_or_default());
            }
            Value::String(text) => match kind {
                "file" => {
                    self.files.insert(name, text.clone());
                }
                "color" => match parse_hex_color(text) {
                    Some(color) => {
                        self.colors.insert(name, color);
                    }
                    // Tiled writes "" for an unset color
                    None => debug!("Ignoring color property '{name}' with value '{text}'"),
                },
                _ => {
                    self.strings.insert(name, text.clone());
                }
            },
            _ => warn!("Skipping custom property '{name}' with unsupported value {value}"),
        }
    }

    /// Class values carry no per-member type, so members are bucketed by shape.
    fn from_class_members(members: &JsonObject) -> Self {
        let mut bag = Self::default();
        for (name, value) in members {
            let kind = match value {
                Value::String(text) if parse_hex_color(text).is_some() => "color",
                Value::String(text) if Path::new(text).extension().is_some() => "file",
                _ => "",
            };
            bag.insert(name, kind, value);
        }
        bag
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of top-level entries across every bucket.
    pub fn len(&self) -> usize {
        self.bools.len()
            + self.numbers.len()
            + self.strings.len()
            + self.files.len()
            + self.colors.len()
            + self.classes.len()
    }

    /// Walk dotted segments through nested classes and return the owning bag and the
    /// remaining key.
    fn resolve<'a, 'b>(&'a self, name: &'b str) -> (&'a Self, &'b str) {
        let mut bag = self;
        let mut rest = name;
        while let Some((head, tail)) = rest.split_once('.') {
            match bag.classes.get(head) {
                Some(class) => {
                    bag = class;
                    rest = tail;
                }
                None => break,
            }
        }
        (bag, rest)
    }

    /// Typed lookup, see [`FromCustomProperty`].
    pub fn get<T: FromCustomProperty>(&self, name: &str) -> Option<T> {
        let (bag, key) = self.resolve(name);
        T::from_bag(bag, key)
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        let (bag, key) = self.resolve(name);
        bag.bools.get(key).copied()
    }

    pub fn get_number(&self, name: &str) -> Option<f64> {
        let (bag, key) = self.resolve(name);
        bag.numbers.get(key).copied()
    }

    pub fn get_string(&self, name: &str) -> Option<&str> {
        let (bag, key) = self.resolve(name);
        bag.strings.get(key).map(String::as_str)
    }

    pub fn get_file(&self, name: &str) -> Option<&str> {
        let (bag, key) = self.resolve(name);
        bag.files.get(key).map(String::as_str)
    }

    pub fn get_color(&self, name: &str) -> Option<Srgba> {
        let (bag, key) = self.resolve(name);
        bag.colors.get(key).copied()
    }

    pub fn get_class(&self, name: &str) -> Option<&CustomProperties> {
        let (bag, key) = self.resolve(name);
        bag.classes.get(key)
    }
}

/// Types that can be read out of a [`CustomProperties`] bag.
///
/// # Example
///
/// ```rust
/// use bevy_tiledimport_assets::properties::CustomProperties;
/// use serde_json::json;
///
/// let raw = json!([{ "name": "PixelsPerUnit", "type": "float", "value": 16.0 }]);
/// let bag = CustomProperties::from_json(raw.as_array().unwrap());
/// assert_eq!(bag.get::<f32>("PixelsPerUnit"), Some(16.0));
/// ```
pub trait FromCustomProperty: Sized {
    fn from_bag(bag: &CustomProperties, key: &str) -> Option<Self>;
}

impl FromCustomProperty for bool {
    fn from_bag(bag: &CustomProperties, key: &str) -> Option<Self> {
        bag.bools.get(key).copied()
    }
}

impl FromCustomProperty for f64 {
    fn from_bag(bag: &CustomProperties, key: &str) -> Option<Self> {
        bag.numbers.get(key).copied()
    }
}

impl FromCustomProperty for f32 {
    fn from_bag(bag: &CustomProperties, key: &str) -> Option<Self> {
        bag.numbers.get(key).map(|number| *number as f32)
    }
}

impl FromCustomProperty for i32 {
    fn from_bag(bag: &CustomProperties, key: &str) -> Option<Self> {
        bag.numbers.get(key).map(|number| *number as i32)
    }
}

impl FromCustomProperty for String {
    fn from_bag(bag: &CustomProperties, key: &str) -> Option<Self> {
        bag.strings
            .get(key)
            .or_else(|| bag.files.get(key))
            .cloned()
    }
}

impl FromCustomProperty for Srgba {
    fn from_bag(bag: &CustomProperties, key: &str) -> Option<Self> {
        bag.colors.get(key).copied()
    }
}

impl FromCustomProperty for Color {
    fn from_bag(bag: &CustomProperties, key: &str) -> Option<Self> {
        bag.colors.get(key).map(|color| Color::Srgba(*color))
    }
}

/// Parse a Tiled color string.
///
/// Tiled writes colors as `#RRGGBB` or, with alpha, `#AARRGGBB`. The alpha byte is
/// moved to the end before parsing, so `#80FF0000` is half-transparent red.
pub fn parse_hex_color(text: &str) -> Option<Srgba> {
    if text.len() < 7 || !text.starts_with('#') || !text.is_ascii() {
        return None;
    }
    let hex = &text[1..];
    if hex.len() == 8 {
        let reordered = format!("{}{}", &hex[2..], &hex[..2]);
        Srgba::hex(reordered).ok()
    } else {
        Srgba::hex(hex).ok()
    }
}
