//! PForm module and UDP instantiation.

use serde::{Deserialize, Serialize};
use vlab_common::Ident;
use vlab_source::Span;

use crate::expr::PExpr;
use crate::gate::PDelayTriple;

/// How a module/UDP instance's ports are bound to outer expressions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PortConnections {
    /// Positional binding: one expression per declared port, in order.
    Positional(Vec<PExpr>),
    /// By-name binding: `.port(expr)` pairs. A `None` expression represents
    /// an explicitly unconnected port (`.port()`).
    ByName(Vec<(Ident, Option<PExpr>)>),
}

/// A parameter override supplied at instantiation, either positional
/// (`#(.8, .4)`) or by name (`#(.WIDTH(8))`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PParamOverrides {
    /// Positional parameter override list.
    Positional(Vec<PExpr>),
    /// By-name parameter override list.
    ByName(Vec<(Ident, PExpr)>),
    /// No overrides given at the instantiation site.
    None,
}

/// A module or UDP instantiation (possibly an instance array).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PModuleInstance {
    /// The instantiated type's name.
    pub type_name: Ident,
    /// The instance's local name.
    pub instance_name: Ident,
    /// Optional array range `[msb:lsb]` for an instance array.
    pub range: Option<(PExpr, PExpr)>,
    /// Parameter overrides.
    pub param_overrides: PParamOverrides,
    /// Port connections.
    pub ports: PortConnections,
    /// Optional delay triple (only meaningful for UDP instances, where it
    /// is reinterpreted as a constant delay rather than a parameter list).
    pub delay: Option<PDelayTriple>,
    /// Source span.
    pub span: Span,
}
