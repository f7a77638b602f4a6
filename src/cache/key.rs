//! Deterministic cache key encoding for query descriptors.
//!
//! Keys are built as `kind|name:value|name:value...` in the order fields are
//! pushed. Absent values and empty lists are written as sentinels that can
//! never collide with an escaped literal value.

use super::traits::CacheKey;

/// Sentinel for an absent (unfiltered) field.
pub const ALL: &str = "@all";

/// Sentinel for an empty list field.
pub const NONE: &str = "@none";

const LIST_DELIMITER: &str = ",";

/// Builder for [`CacheKey`]s. Pure, no I/O.
#[derive(Debug, Clone)]
pub struct KeyEncoder {
  buf: String,
}

impl KeyEncoder {
  /// Start a key for the given query shape (e.g. "feed", "news").
  pub fn new(kind: &str) -> Self {
    Self {
      buf: escape(kind),
    }
  }

  /// Append a field that is always present.
  pub fn field(mut self, name: &str, value: impl ToString) -> Self {
    let value = escape(&value.to_string());
    self.push(name, &value);
    self
  }

  /// Append an optional field; `None` encodes as [`ALL`].
  pub fn opt<V: ToString>(self, name: &str, value: Option<V>) -> Self {
    match value {
      Some(v) => self.field(name, v),
      None => self.raw(name, ALL),
    }
  }

  /// Append a list field, joined in the order given. Empty encodes as [`NONE`].
  pub fn list<V: AsRef<str>>(self, name: &str, values: &[V]) -> Self {
    if values.is_empty() {
      return self.raw(name, NONE);
    }
    let joined = values
      .iter()
      .map(|v| escape(v.as_ref()))
      .collect::<Vec<_>>()
      .join(LIST_DELIMITER);
    self.raw(name, &joined)
  }

  /// Append a list field whose order carries no meaning.
  ///
  /// Values are sorted and de-duplicated before joining so that `[a, b]` and
  /// `[b, a]` share a cache entry.
  pub fn set<V: AsRef<str>>(self, name: &str, values: &[V]) -> Self {
    let mut sorted: Vec<&str> = values.iter().map(|v| v.as_ref()).collect();
    sorted.sort_unstable();
    sorted.dedup();
    self.list(name, &sorted)
  }

  pub fn finish(self) -> CacheKey {
    CacheKey::new(self.buf)
  }

  fn raw(mut self, name: &str, encoded: &str) -> Self {
    self.push(name, encoded);
    self
  }

  fn push(&mut self, name: &str, encoded: &str) {
    self.buf.push('|');
    self.buf.push_str(name);
    self.buf.push(':');
    self.buf.push_str(encoded);
  }
}

/// Percent-escape the characters that carry structure in an encoded key.
pub(crate) fn escape(value: &str) -> String {
  let mut out = String::with_capacity(value.len());
  for c in value.chars() {
    match c {
      '%' => out.push_str("%25"),
      '|' => out.push_str("%7C"),
      ',' => out.push_str("%2C"),
      ':' => out.push_str("%3A"),
      '@' => out.push_str("%40"),
      _ => out.push(c),
    }
  }
  out
}
