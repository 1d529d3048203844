//! Whitelisted SQL identifiers.
//!
//! Form and variable names come straight out of uploaded spreadsheets, yet
//! they name the table and column a reconciliation lookup reads from. They are
//! only ever interpolated into SQL text as an [`Identifier`], and the only way
//! to obtain one is [`Identifier::parse`].

use std::{fmt, sync::LazyLock};

use regex::Regex;

use crate::{Error, Result};

static SAFE_IDENTIFIER: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_]+$").expect("identifier pattern is valid"));

/// `true` iff `s` is non-empty and made only of ASCII letters, digits and `_`.
pub fn is_safe_identifier(s: &str) -> bool { SAFE_IDENTIFIER.is_match(s) }

/// A table or column name that passed [`is_safe_identifier`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identifier(String);

impl Identifier {
  pub fn parse(s: &str) -> Result<Self> {
    if is_safe_identifier(s) {
      Ok(Self(s.to_owned()))
    } else {
      Err(Error::UnsafeIdentifier(s.to_owned()))
    }
  }

  /// Source tables use lower-case names; lookups always go through this.
  pub fn to_lowercase(&self) -> Self { Self(self.0.to_ascii_lowercase()) }

  pub fn as_str(&self) -> &str { &self.0 }

  /// Double-quoted form for SQL text.
  pub fn quoted(&self) -> String { format!("\"{}\"", self.0) }
}

impl fmt::Display for Identifier {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

impl AsRef<str> for Identifier {
  fn as_ref(&self) -> &str { &self.0 }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn accepts_plain_names() {
    assert!(is_safe_identifier("mnh01"));
    assert!(is_safe_identifier("M_TYPE_VISIT_2"));
    assert_eq!(Identifier::parse("MNH01").unwrap().to_lowercase().as_str(), "mnh01");
  }

  #[test]
  fn rejects_everything_else() {
    for bad in [
      "",
      "mnh01; DROP TABLE x",
      "mnh 01",
      "\"mnh01\"",
      "mnh01--",
      "pregid=1",
      "tbl\n",
      "ünï",
    ] {
      assert!(!is_safe_identifier(bad), "{bad:?} should be rejected");
      assert!(matches!(Identifier::parse(bad), Err(Error::UnsafeIdentifier(_))));
    }
  }
}
