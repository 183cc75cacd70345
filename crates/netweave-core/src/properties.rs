// ── Flat property namespace ──
//
// Desired network state travels as a flat map of dotted keys
// (`net.interface.eth0.config.ip4.status`) to scalar values. Readers here
// accept both native and string-encoded scalars so that property files
// written by hand and maps produced by `serialize` parse identically.

use std::collections::BTreeMap;
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{NetError, Result};

/// Key listing every configured interface.
pub const INTERFACES_KEY: &str = "net.interfaces";
/// Key listing the interfaces touched by the last change.
pub const MODIFIED_INTERFACES_KEY: &str = "modified.interface.names";

/// Prefix shared by every per-interface key.
pub fn interface_prefix(name: &str) -> String {
    format!("net.interface.{name}.")
}

/// `net.interface.<name>.<suffix>`
pub fn interface_key(name: &str, suffix: &str) -> String {
    format!("net.interface.{name}.{suffix}")
}

/// `net.interface.<name>.config.<suffix>`
pub fn config_key(name: &str, suffix: &str) -> String {
    format!("net.interface.{name}.config.{suffix}")
}

// ── PropertyValue ────────────────────────────────────────────────────

/// A single scalar stored under a property key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Bool(bool),
    Int(i64),
    Str(String),
    List(Vec<String>),
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Str(s) => f.write_str(s),
            Self::List(items) => f.write_str(&items.join(",")),
        }
    }
}

impl From<bool> for PropertyValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for PropertyValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for PropertyValue {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<u32> for PropertyValue {
    fn from(v: u32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<u16> for PropertyValue {
    fn from(v: u16) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<u8> for PropertyValue {
    fn from(v: u8) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<u64> for PropertyValue {
    fn from(v: u64) -> Self {
        // Saturate rather than wrap: bitrates are the only u64 written.
        Self::Int(i64::try_from(v).unwrap_or(i64::MAX))
    }
}

impl From<&str> for PropertyValue {
    fn from(v: &str) -> Self {
        Self::Str(v.to_owned())
    }
}

impl From<String> for PropertyValue {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

impl From<Vec<String>> for PropertyValue {
    fn from(v: Vec<String>) -> Self {
        Self::List(v)
    }
}

// ── Properties ───────────────────────────────────────────────────────

/// Ordered property map with typed, lenient readers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Properties(BTreeMap<String, PropertyValue>);

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&PropertyValue> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<PropertyValue>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<PropertyValue> {
        self.0.remove(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &PropertyValue)> {
        self.0.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    /// Copy of every entry whose key starts with `prefix`.
    pub fn subset(&self, prefix: &str) -> Self {
        Self(
            self.0
                .range(prefix.to_owned()..)
                .take_while(|(k, _)| k.starts_with(prefix))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        )
    }

    // ── Typed readers ────────────────────────────────────────────────

    /// Text form of a value. Empty strings count as absent.
    pub fn text(&self, key: &str) -> Option<String> {
        match self.0.get(key)? {
            PropertyValue::Str(s) => {
                let trimmed = s.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_owned())
            }
            PropertyValue::List(items) if items.is_empty() => None,
            other => Some(other.to_string()),
        }
    }

    /// Raw string value, preserving surrounding whitespace (passphrases).
    pub fn raw_text(&self, key: &str) -> Option<String> {
        match self.0.get(key)? {
            PropertyValue::Str(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    pub fn bool(&self, key: &str) -> Result<Option<bool>> {
        match self.0.get(key) {
            None => Ok(None),
            Some(PropertyValue::Bool(b)) => Ok(Some(*b)),
            Some(PropertyValue::Int(i)) => Ok(Some(*i != 0)),
            Some(PropertyValue::Str(s)) => match s.trim() {
                "" => Ok(None),
                t if t.eq_ignore_ascii_case("true") => Ok(Some(true)),
                t if t.eq_ignore_ascii_case("false") => Ok(Some(false)),
                t => Err(NetError::invalid_property(key, t, "expected a boolean")),
            },
            Some(PropertyValue::List(items)) => Err(NetError::invalid_property(
                key,
                items.join(","),
                "expected a boolean",
            )),
        }
    }

    pub fn bool_or(&self, key: &str, default: bool) -> Result<bool> {
        Ok(self.bool(key)?.unwrap_or(default))
    }

    /// Integer value in the target type's range.
    pub fn int<T>(&self, key: &str) -> Result<Option<T>>
    where
        T: TryFrom<i64>,
    {
        let raw = match self.0.get(key) {
            None => return Ok(None),
            Some(PropertyValue::Int(i)) => *i,
            Some(PropertyValue::Str(s)) => {
                let t = s.trim();
                if t.is_empty() {
                    return Ok(None);
                }
                t.parse::<i64>()
                    .map_err(|_| NetError::invalid_property(key, t, "expected an integer"))?
            }
            Some(other) => {
                return Err(NetError::invalid_property(
                    key,
                    other.to_string(),
                    "expected an integer",
                ));
            }
        };
        T::try_from(raw)
            .map(Some)
            .map_err(|_| NetError::invalid_property(key, raw.to_string(), "out of range"))
    }

    pub fn int_or<T>(&self, key: &str, default: T) -> Result<T>
    where
        T: TryFrom<i64>,
    {
        Ok(self.int(key)?.unwrap_or(default))
    }

    /// Comma-separated (or native list) value, trimmed, empties dropped.
    pub fn list(&self, key: &str) -> Vec<String> {
        match self.0.get(key) {
            Some(PropertyValue::List(items)) => items
                .iter()
                .map(|s| s.trim())
                .filter(|s| !s.is_empty())
                .map(str::to_owned)
                .collect(),
            Some(PropertyValue::Str(s)) => split_list(s),
            Some(other) => vec![other.to_string()],
            None => Vec::new(),
        }
    }

    /// Parse a token with `FromStr` (enums, ports), naming the key on failure.
    pub fn parse<T>(&self, key: &str) -> Result<Option<T>>
    where
        T: FromStr,
    {
        let Some(text) = self.text(key) else {
            return Ok(None);
        };
        text.parse::<T>()
            .map(Some)
            .map_err(|_| NetError::invalid_property(key, text.clone(), "unrecognised value"))
    }

    /// Parse an IP address of a specific family.
    pub fn address<T>(&self, key: &str) -> Result<Option<T>>
    where
        T: FromStr,
    {
        let Some(text) = self.text(key) else {
            return Ok(None);
        };
        text.parse::<T>()
            .map(Some)
            .map_err(|_| NetError::invalid_address(key, text))
    }

    /// Parse a comma-separated address list.
    pub fn addresses<T>(&self, key: &str) -> Result<Vec<T>>
    where
        T: FromStr,
    {
        self.list(key)
            .into_iter()
            .map(|item| {
                item.parse::<T>()
                    .map_err(|_| NetError::invalid_address(key, item.clone()))
            })
            .collect()
    }
}

impl FromIterator<(String, PropertyValue)> for Properties {
    fn from_iter<I: IntoIterator<Item = (String, PropertyValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Extend<(String, PropertyValue)> for Properties {
    fn extend<I: IntoIterator<Item = (String, PropertyValue)>>(&mut self, iter: I) {
        self.0.extend(iter);
    }
}

impl IntoIterator for Properties {
    type Item = (String, PropertyValue);
    type IntoIter = std::collections::btree_map::IntoIter<String, PropertyValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Split a comma-joined list, trimming items and dropping empties.
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Join addresses as a comma list.
pub fn join_addresses<T: fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

/// Address text, empty when unset.
pub fn address_text(addr: Option<impl Into<IpAddr>>) -> String {
    addr.map(|a| a.into().to_string()).unwrap_or_default()
}
