use super::method::Method;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Storage class of a value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ValKind {
    /// Method-local variable (including parameters and `this`)
    Local,
    /// Static field, visible in every method
    Static,
}

/// Data fact: a variable reference
///
/// `returned` marks a callee fact that has been popped back to a call
/// site and still has to be mapped into the caller's namespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Val {
    pub name: String,
    /// Owning method, `None` for statics
    pub method: Option<Method>,
    pub kind: ValKind,
    pub returned: bool,
}

impl Val {
    pub fn local(name: impl Into<String>, method: &Method) -> Self {
        Self {
            name: name.into(),
            method: Some(method.clone()),
            kind: ValKind::Local,
            returned: false,
        }
    }

    pub fn static_field(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            method: None,
            kind: ValKind::Static,
            returned: false,
        }
    }

    pub fn is_static(&self) -> bool {
        self.kind == ValKind::Static
    }

    pub fn is_returned(&self) -> bool {
        self.returned
    }

    /// Copy tagged as leaving its method
    pub fn returned(&self) -> Self {
        Self {
            returned: true,
            ..self.clone()
        }
    }

    /// Copy with the return tag cleared
    pub fn unreturned(&self) -> Self {
        Self {
            returned: false,
            ..self.clone()
        }
    }

    /// Statics belong to every method
    pub fn belongs_to(&self, method: &Method) -> bool {
        match &self.method {
            Some(m) => m == method,
            None => true,
        }
    }
}

impl fmt::Display for Val {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.method, self.returned) {
            (Some(m), false) => write!(f, "{}:{}", m.name, self.name),
            (Some(m), true) => write!(f, "{}:{}^ret", m.name, self.name),
            (None, false) => write!(f, "static:{}", self.name),
            (None, true) => write!(f, "static:{}^ret", self.name),
        }
    }
}
