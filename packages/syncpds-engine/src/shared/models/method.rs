use serde::{Deserialize, Serialize};
use std::fmt;

/// A method of the analyzed program, identified by declaring class + name
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Method {
    pub declaring_class: String,
    pub name: String,
}

impl Method {
    pub fn new(declaring_class: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            declaring_class: declaring_class.into(),
            name: name.into(),
        }
    }

    /// Placeholder method owning the epsilon statement
    pub fn epsilon() -> Self {
        Self::new("", "<epsilon>")
    }

    pub fn signature(&self) -> String {
        format!("{}.{}", self.declaring_class, self.name)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.declaring_class, self.name)
    }
}
