//! PForm specify-block timing paths.

use serde::{Deserialize, Serialize};
use vlab_common::Ident;
use vlab_source::Span;

use crate::expr::PExpr;

/// An edge qualifier on a specify path's source list (`posedge`/`negedge`),
/// or none for a level-sensitive path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PSpecifyEdge {
    /// No edge qualifier: the path is always active.
    None,
    /// `posedge`
    Posedge,
    /// `negedge`
    Negedge,
}

/// The delay-value list attached to a specify path.
///
/// Per §4.4.5, the parser allows 1, 2, 3, 6, or 12 delay expressions; any
/// other count is rejected during structural elaboration (not here — PForm
/// stores whatever the grammar accepted and lets elaboration validate it).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpecifyDelayTable {
    /// The delay expressions, in source order.
    pub values: Vec<PExpr>,
}

/// A `(source *> destination) = delay;` (or `=>`) specify path declaration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PSpecifyPath {
    /// Source port names.
    pub sources: Vec<Ident>,
    /// Destination port names.
    pub destinations: Vec<Ident>,
    /// Whether the path is full (`*>`, every source affects every
    /// destination) or parallel (`=>`, sources/destinations pair up
    /// positionally).
    pub is_full: bool,
    /// Optional edge qualifier on the destination side.
    pub edge: PSpecifyEdge,
    /// Optional gating (`if (cond)`) condition.
    pub condition: Option<PExpr>,
    /// The delay value table.
    pub delays: SpecifyDelayTable,
    /// Source span.
    pub span: Span,
}
