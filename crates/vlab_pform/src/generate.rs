//! PForm generate constructs (compile-time loop/if/case scopes).

use serde::{Deserialize, Serialize};
use vlab_common::Ident;
use vlab_source::Span;

use crate::expr::PExpr;
use crate::gate::PGate;
use crate::instance::PModuleInstance;
use crate::module::{PContinuousAssign, PSignalDecl};
use crate::stmt::PBehavior;

/// The body of one generate arm/iteration: any mix of declarations, gates,
/// assigns, instances, and behaviors, exactly as a module body would hold.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PGenerateBody {
    /// Signal declarations local to this generate scope.
    pub signals: Vec<PSignalDecl>,
    /// Gate instantiations.
    pub gates: Vec<PGate>,
    /// Continuous assigns.
    pub continuous_assigns: Vec<PContinuousAssign>,
    /// Module/UDP instances.
    pub instances: Vec<PModuleInstance>,
    /// `initial`/`always` behaviors.
    pub behaviors: Vec<PBehavior>,
    /// Nested generate schemes.
    pub nested: Vec<PGenerateScheme>,
}

/// A compile-time generate construct.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PGenerateScheme {
    /// `generate for (...) ... endgenerate`.
    ///
    /// Produces one child scope per iteration, per §4.1. `block_name` is the
    /// user-given name, if any; unnamed blocks are named `genblk<n>` using a
    /// stable positional index assigned during scope construction.
    For {
        /// Optional user-given block name.
        block_name: Option<Ident>,
        /// The genvar's name.
        genvar: Ident,
        /// Initial value expression for the genvar.
        init: PExpr,
        /// Loop condition expression (evaluated against the current genvar
        /// binding each iteration).
        cond: PExpr,
        /// Per-iteration step expression (assigned back to the genvar).
        step: PExpr,
        /// The loop body, instantiated fresh per iteration.
        body: PGenerateBody,
        /// Source span.
        span: Span,
    },
    /// `generate if (...) ... else ... endgenerate`.
    ///
    /// Selects at most one arm; the unselected arm contributes nothing.
    If {
        /// Optional user-given block name (shared by both arms).
        block_name: Option<Ident>,
        /// The compile-time condition expression.
        cond: PExpr,
        /// The body used when `cond` is nonzero.
        then_body: PGenerateBody,
        /// The body used when `cond` is zero, if an `else` arm exists.
        else_body: Option<PGenerateBody>,
        /// Source span.
        span: Span,
    },
    /// `generate case (...) ... endgenerate`.
    ///
    /// Selects at most one arm, matching the first arm whose guard
    /// compile-time-equals the selector (or the `default` arm).
    Case {
        /// Optional user-given block name (shared by every arm).
        block_name: Option<Ident>,
        /// The selector expression.
        selector: PExpr,
        /// Arms: guard expressions (empty for `default`) paired with a body.
        arms: Vec<(Vec<PExpr>, PGenerateBody)>,
        /// Source span.
        span: Span,
    },
}

impl PGenerateScheme {
    /// The span covering this generate construct.
    pub fn span(&self) -> Span {
        match self {
            PGenerateScheme::For { span, .. }
            | PGenerateScheme::If { span, .. }
            | PGenerateScheme::Case { span, .. } => *span,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_body_default_is_empty() {
        let body = PGenerateBody::default();
        assert!(body.signals.is_empty());
        assert!(body.gates.is_empty());
        assert!(body.nested.is_empty());
    }
}
