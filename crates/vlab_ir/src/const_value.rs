//! Constant values for parameters, initial values, and compile-time expressions.
//!
//! [`ConstValue`] represents a resolved compile-time value after elaboration.

use vlab_common::LogicVec;
use serde::{Deserialize, Serialize};

/// A resolved compile-time constant value.
///
/// Used for parameter values, initial/reset values, and constant expressions
/// that have been fully evaluated during elaboration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ConstValue {
    /// An integer constant.
    Int(i64),
    /// A floating-point constant.
    Real(f64),
    /// A logic vector constant (bit pattern).
    Logic(LogicVec),
    /// A string constant.
    String(String),
    /// A boolean constant.
    Bool(bool),
}
