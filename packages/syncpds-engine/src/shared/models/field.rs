use serde::{Deserialize, Serialize};
use std::fmt;

const EMPTY: &str = "<empty>";
const ARRAY: &str = "<array>";
const EPSILON: &str = "<eps>";
const WILDCARD: &str = "<*>";

/// Field label, the stack symbol of the field automaton
///
/// Besides named fields there are four sentinels:
/// - `empty`: bottom of every field stack (the value itself)
/// - `array`: any array element
/// - `epsilon`: popped stack
/// - `wildcard`: matches any non-epsilon label in rules
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
}

impl Field {
    pub fn named(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn empty() -> Self {
        Self::named(EMPTY)
    }

    pub fn array() -> Self {
        Self::named(ARRAY)
    }

    pub fn epsilon() -> Self {
        Self::named(EPSILON)
    }

    pub fn wildcard() -> Self {
        Self::named(WILDCARD)
    }

    pub fn is_empty_field(&self) -> bool {
        self.name == EMPTY
    }

    pub fn is_array(&self) -> bool {
        self.name == ARRAY
    }

    pub fn is_epsilon(&self) -> bool {
        self.name == EPSILON
    }

    pub fn is_wildcard(&self) -> bool {
        self.name == WILDCARD
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
