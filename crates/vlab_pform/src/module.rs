//! PForm module templates: ports, parameters, signals, and the per-module
//! item lists (gates, continuous assigns, instances, behaviors, generates,
//! specify blocks).

use serde::{Deserialize, Serialize};
use vlab_common::Ident;
use vlab_source::Span;

use crate::expr::PExpr;
use crate::gate::{PDelayTriple, PDriveStrength, PGate};
use crate::generate::PGenerateScheme;
use crate::instance::PModuleInstance;
use crate::specify::PSpecifyPath;
use crate::stmt::{PBehavior, PFunctionDecl, PTaskDecl};

/// Port direction as declared in PForm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PDirection {
    /// `input`
    Input,
    /// `output`
    Output,
    /// `inout`
    Inout,
    /// No direction given (non-ANSI list entry resolved later, or plain net).
    Implicit,
}

/// The declared net/variable kind of a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PNetKind {
    /// `wire` / `tri`
    Wire,
    /// `reg`
    Reg,
    /// `integer`
    Integer,
    /// `real`
    Real,
    /// `supply0`
    Supply0,
    /// `supply1`
    Supply1,
}

/// A declared signal (net or register), scalar or ranged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PSignalDecl {
    /// The signal's local name.
    pub name: Ident,
    /// The net/variable kind.
    pub kind: PNetKind,
    /// Port direction, or `Implicit` for an internal signal.
    pub direction: PDirection,
    /// Optional declared range `[msb:lsb]`.
    pub range: Option<(PExpr, PExpr)>,
    /// Optional memory dimension `[depth]` for array-of-word declarations.
    pub array_dim: Option<(PExpr, PExpr)>,
    /// Whether the declaration carries an explicit `signed` keyword.
    pub signed: bool,
    /// Source span.
    pub span: Span,
}

/// A declared parameter, with its default-value expression.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PParameterDecl {
    /// The parameter's local name.
    pub name: Ident,
    /// The default-value expression.
    pub default: PExpr,
    /// Whether this is a module-port parameter (`#(parameter ...)`) as
    /// opposed to a body-local `parameter`/`localparam`.
    pub is_port_param: bool,
    /// Whether this is a `localparam` (never overridable by instance/defparam).
    pub is_local: bool,
    /// Source span.
    pub span: Span,
}

/// A declared `specparam`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PSpecparamDecl {
    /// The specparam's local name.
    pub name: Ident,
    /// The value expression.
    pub value: PExpr,
    /// Source span.
    pub span: Span,
}

/// A `defparam target = expr;` override.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PDefparam {
    /// The dotted hierarchical path to the target parameter.
    pub target_path: Vec<Ident>,
    /// The override value expression.
    pub value: PExpr,
    /// Source span.
    pub span: Span,
}

/// A continuous assign statement (`assign lhs = rhs;`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PContinuousAssign {
    /// The l-value expression.
    pub lhs: PExpr,
    /// The r-value expression.
    pub rhs: PExpr,
    /// Optional propagation delay.
    pub delay: Option<PDelayTriple>,
    /// Drive strength for logic-0, if declared.
    pub strength0: Option<PDriveStrength>,
    /// Drive strength for logic-1, if declared.
    pub strength1: Option<PDriveStrength>,
    /// Source span.
    pub span: Span,
}

/// A complete module (or UDP-hosting) template as produced by the parser.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PModuleTemplate {
    /// The module's type name.
    pub name: Ident,
    /// Port list, in declaration order.
    pub ports: Vec<PSignalDecl>,
    /// Port parameters and body-local parameters/localparams.
    pub parameters: Vec<PParameterDecl>,
    /// Declared specparams.
    pub specparams: Vec<PSpecparamDecl>,
    /// Internal (non-port) signal declarations.
    pub signals: Vec<PSignalDecl>,
    /// Primitive gate instantiations.
    pub gates: Vec<PGate>,
    /// Continuous assign statements.
    pub continuous_assigns: Vec<PContinuousAssign>,
    /// Module/UDP instantiations.
    pub instances: Vec<PModuleInstance>,
    /// `initial`/`always` behaviors.
    pub behaviors: Vec<PBehavior>,
    /// Task definitions.
    pub tasks: Vec<PTaskDecl>,
    /// Function definitions.
    pub functions: Vec<PFunctionDecl>,
    /// Generate schemes (loop/if/case).
    pub generates: Vec<PGenerateScheme>,
    /// Specify-block timing paths.
    pub specify_paths: Vec<PSpecifyPath>,
    /// `defparam` overrides declared in this module's body.
    pub defparams: Vec<PDefparam>,
    /// The module's time unit, as a power-of-ten exponent (e.g. -9 for 1ns).
    pub time_unit: i32,
    /// The module's time precision, as a power-of-ten exponent.
    pub time_precision: i32,
    /// The default net kind for implicit declarations (`` `default_nettype ``).
    pub default_net_kind: Option<PNetKind>,
    /// Source span.
    pub span: Span,
}

#[cfg(test)]
mod tests {
    use super::*;
    use vlab_common::{Interner, LogicVec};

    fn ident(i: &Interner, s: &str) -> Ident {
        i.get_or_intern(s)
    }

    #[test]
    fn signal_decl_roundtrips_through_json() {
        let interner = Interner::new();
        let decl = PSignalDecl {
            name: ident(&interner, "a"),
            kind: PNetKind::Wire,
            direction: PDirection::Input,
            range: Some((
                PExpr::Literal {
                    value: LogicVec::from_u64(3, 4),
                    signed: false,
                    span: Span::DUMMY,
                },
                PExpr::Literal {
                    value: LogicVec::from_u64(0, 4),
                    signed: false,
                    span: Span::DUMMY,
                },
            )),
            array_dim: None,
            signed: false,
            span: Span::DUMMY,
        };
        let json = serde_json::to_string(&decl).unwrap();
        let back: PSignalDecl = serde_json::from_str(&json).unwrap();
        assert_eq!(back.kind, PNetKind::Wire);
        assert_eq!(back.direction, PDirection::Input);
    }
}
