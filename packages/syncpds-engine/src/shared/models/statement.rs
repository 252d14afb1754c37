use super::field::Field;
use super::method::Method;
use super::val::Val;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Control location: the `index`-th statement of `method`
///
/// Also the stack symbol of the call automaton; `Statement::epsilon()`
/// is its empty word.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Statement {
    pub method: Method,
    pub index: usize,
}

impl Statement {
    pub fn new(method: Method, index: usize) -> Self {
        Self { method, index }
    }

    pub fn epsilon() -> Self {
        Self {
            method: Method::epsilon(),
            index: usize::MAX,
        }
    }

    pub fn is_epsilon(&self) -> bool {
        self.index == usize::MAX && self.method == Method::epsilon()
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_epsilon() {
            f.write_str("<eps>")
        } else {
            write!(f, "{}#{}", self.method, self.index)
        }
    }
}

/// Right-hand side of an assignment
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Rvalue {
    /// `new T()`
    New { type_name: String },
    /// Plain copy
    Local(Val),
    /// `base.field`
    Load { base: Val, field: Field },
    Null,
}

/// Call expression
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InvokeExpr {
    pub method_name: String,
    /// `None` for static calls
    pub receiver: Option<Val>,
    pub args: Vec<Val>,
    /// Statically bound target (static and special calls)
    pub static_target: Option<Method>,
}

impl InvokeExpr {
    /// Dispatch depends on the receiver's runtime type
    pub fn is_virtual(&self) -> bool {
        self.receiver.is_some() && self.static_target.is_none()
    }

    /// Argument positions holding `val`
    pub fn arg_positions(&self, val: &Val) -> Vec<usize> {
        self.args
            .iter()
            .enumerate()
            .filter(|(_, a)| *a == val)
            .map(|(i, _)| i)
            .collect()
    }

    pub fn uses(&self, val: &Val) -> bool {
        self.receiver.as_ref() == Some(val) || self.args.contains(val)
    }
}

/// Statement shapes understood by the default flow functions
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatementKind {
    /// First statement of every method
    Entry,
    Assign { lhs: Val, rhs: Rvalue },
    /// `base.field = rhs`
    Store { base: Val, field: Field, rhs: Val },
    Invoke { lhs: Option<Val>, call: InvokeExpr },
    Return { value: Option<Val> },
    Nop,
}

impl StatementKind {
    pub fn invoke_expr(&self) -> Option<&InvokeExpr> {
        match self {
            StatementKind::Invoke { call, .. } => Some(call),
            _ => None,
        }
    }

    /// Variable defined by this statement
    pub fn lhs(&self) -> Option<&Val> {
        match self {
            StatementKind::Assign { lhs, .. } => Some(lhs),
            StatementKind::Invoke { lhs, .. } => lhs.as_ref(),
            _ => None,
        }
    }

    /// Allocated type when this is `val = new T()`
    pub fn allocation_type_of(&self, val: &Val) -> Option<&str> {
        match self {
            StatementKind::Assign {
                lhs,
                rhs: Rvalue::New { type_name },
            } if lhs == val => Some(type_name),
            _ => None,
        }
    }

    pub fn is_allocation(&self) -> bool {
        matches!(
            self,
            StatementKind::Assign {
                rhs: Rvalue::New { .. },
                ..
            }
        )
    }

    pub fn is_return(&self) -> bool {
        matches!(self, StatementKind::Return { .. })
    }
}
