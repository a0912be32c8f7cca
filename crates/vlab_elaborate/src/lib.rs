//! PForm-to-VlabIR elaboration engine.
//!
//! This crate drives the work-list elaborator that turns a [`vlab_pform`]
//! parse forest into a fully elaborated [`vlab_ir::Design`]: scope-tree
//! construction and generate-block expansion, parameter/defparam
//! resolution, signal and net elaboration, structural elaboration (gates,
//! module instances, UDPs, specify paths), and behavioral elaboration of
//! procedural statements and expressions.

#![warn(missing_docs)]

pub mod const_eval;
pub mod context;
mod expr_lower;
pub mod errors;
pub mod scope_builder;
pub mod params;
pub mod signals;
pub mod structure;
pub mod behavior;

pub use context::ElaborationContext;

use vlab_common::Ident;
use vlab_diagnostics::DiagnosticSink;
use vlab_ir::Design;

use crate::errors::error_top_not_found;

/// Elaborates every declared root in the PForm table and returns the
/// resulting design.
///
/// Each root is elaborated with an empty parameter environment, matching
/// §4's "roots are elaborated as if instantiated with default parameter
/// values" rule. If a root name cannot be found, an `E206` diagnostic is
/// emitted and that root is skipped.
pub fn elaborate_roots(ctx: &mut ElaborationContext<'_>, roots: &[Ident]) {
    for &root in roots {
        match scope_builder::build_module_scope(ctx, root, root, &[], None, vlab_source::Span::DUMMY) {
            Some(scope_id) => {
                ctx.design.roots.push(scope_id);
            }
            None => {
                ctx.sink.emit(error_top_not_found(
                    ctx.interner.resolve(root),
                    vlab_source::Span::DUMMY,
                ));
            }
        }
    }

    // The rest of the pipeline runs over the whole tree at once: every scope
    // must exist before defparams can be resolved (a defparam may target a
    // sibling instance elaborated later in the root list), every parameter
    // must be resolved before signals are sized (a range may reference a
    // parameter), and every signal must exist before structural/behavioral
    // elaboration can resolve an identifier against it.
    params::apply_defparams(ctx);
    signals::elaborate_signals(ctx);
    structure::elaborate_structure(ctx);
    behavior::elaborate_behavior(ctx);
}

/// Reports whether the sink accumulated any elaboration errors for `design`.
pub fn elaboration_succeeded(sink: &DiagnosticSink, design: &Design) -> bool {
    !sink.has_errors() && design.is_clean()
}
