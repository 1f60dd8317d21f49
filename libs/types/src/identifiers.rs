//! Validator identifier sets
//!
//! Callers pass validators as a comma-separated list of indices
//! (`?validators=5,12,400`). [`IdentifierSet::parse`] turns that into a
//! bounded, duplicate-free sequence that keeps first-seen order.

use crate::common::errors::IdentifierError;
use serde::Serialize;
use std::collections::HashSet;

/// Numeric index of a validator on the beacon chain
pub type ValidatorIndex = u64;

/// Separator between identifiers in the raw query value
pub const IDENTIFIER_DELIMITER: char = ',';

/// Bounded, de-duplicated, order-preserving set of validator indices
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct IdentifierSet {
    indices: Vec<ValidatorIndex>,
}

impl IdentifierSet {
    /// Parse a delimited identifier list, bounded by `limit` tokens.
    ///
    /// The bound is checked against the raw token count before any token is
    /// parsed, so `"1,1,1"` with a limit of 2 fails even though it holds one
    /// unique value. Any malformed token fails the whole parse.
    pub fn parse(raw: &str, limit: usize) -> Result<Self, IdentifierError> {
        if raw.is_empty() {
            return Ok(Self::default());
        }

        let count = raw.split(IDENTIFIER_DELIMITER).count();
        if count > limit {
            return Err(IdentifierError::TooMany { count, limit });
        }

        let mut seen = HashSet::with_capacity(count);
        let mut indices = Vec::with_capacity(count);
        for token in raw.split(IDENTIFIER_DELIMITER) {
            let index = parse_index(token)?;
            if seen.insert(index) {
                indices.push(index);
            }
        }

        Ok(Self { indices })
    }

    pub fn as_slice(&self) -> &[ValidatorIndex] {
        &self.indices
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn contains(&self, index: ValidatorIndex) -> bool {
        self.indices.contains(&index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ValidatorIndex> {
        self.indices.iter()
    }

    /// Position of `index` in first-seen order
    pub fn position(&self, index: ValidatorIndex) -> Option<usize> {
        self.indices.iter().position(|&i| i == index)
    }
}

impl<'a> IntoIterator for &'a IdentifierSet {
    type Item = &'a ValidatorIndex;
    type IntoIter = std::slice::Iter<'a, ValidatorIndex>;

    fn into_iter(self) -> Self::IntoIter {
        self.indices.iter()
    }
}

/// Strict base-10 parse: `str::parse` would also accept a leading `+`
fn parse_index(token: &str) -> Result<ValidatorIndex, IdentifierError> {
    let malformed = || IdentifierError::Malformed {
        token: token.to_string(),
    };

    if token.is_empty() || !token.bytes().all(|b| b.is_ascii_digit()) {
        return Err(malformed());
    }
    token.parse::<ValidatorIndex>().map_err(|_| malformed())
}
