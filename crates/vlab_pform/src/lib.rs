//! PForm — the parse-form tree the elaboration core consumes.
//!
//! PForm is produced by an upstream lexer/parser (not implemented in this
//! workspace) and handed to [`vlab_elaborate`](../vlab_elaborate) by
//! reference. Elaboration never mutates it. Every node carries a [`Span`]
//! for diagnostic rendering.

#![warn(missing_docs)]

pub mod expr;
pub mod gate;
pub mod generate;
pub mod instance;
pub mod loader;
pub mod module;
pub mod specify;
pub mod stmt;
pub mod table;
pub mod udp;

pub use expr::{BinaryOp, PExpr, UnaryOp};
pub use gate::{GateKind, PDelayTriple, PDriveStrength, PGate};
pub use generate::{PGenerateBody, PGenerateScheme};
pub use instance::{PModuleInstance, PParamOverrides, PortConnections};
pub use loader::{ClosedLoader, Loader};
pub use module::{
    PContinuousAssign, PDefparam, PDirection, PModuleTemplate, PNetKind, PParameterDecl,
    PSignalDecl, PSpecparamDecl,
};
pub use specify::{PSpecifyPath, SpecifyDelayTable};
pub use stmt::{PBehavior, PCaseKind, PEventControl, PEventExpr, PFunctionDecl, PStmt, PTaskDecl};
pub use table::PFormTable;
pub use udp::PUdpTemplate;
