//! Common test utilities for syncpds-engine
//!
//! Small programs built with `MethodBuilder`, shared by the integration
//! tests. Statement indices are fixed: `Entry` is 0, the first pushed
//! statement is 1.

#![allow(dead_code)]

mod fixtures;

pub use fixtures::*;
