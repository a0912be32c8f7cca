//! VlabIR — the unified intermediate representation for the vlab elaboration toolkit.
//!
//! This crate defines the core IR types — [`design::Design`], [`scope::Scope`],
//! [`signal::Signal`], [`cell::Cell`], [`nexus::Nexus`], [`event::Event`],
//! [`process::Process`], [`stmt::Stmt`], and [`expr::Expr`] — that serve as
//! the lingua franca between the Scope Builder, Parameter Resolver, Signal
//! Elaborator, Structural Elaborator, Behavioral Elaborator, and Back-End
//! Emitter pipeline stages.

#![warn(missing_docs)]

pub mod arena;
pub mod cell;
pub mod const_value;
pub mod design;
pub mod event;
pub mod expr;
pub mod ids;
pub mod nexus;
pub mod process;
pub mod scope;
pub mod signal;
pub mod source_map;
pub mod stmt;
pub mod types;

pub use arena::{Arena, ArenaId};
pub use cell::{Cell, CellKind, PartSelectDirection};
pub use const_value::ConstValue;
pub use design::Design;
pub use event::{EdgeKind, Event, Probe};
pub use expr::{BinaryOp, CallTarget, Expr, ReductionOp, UnaryOp};
pub use ids::{CellId, EventId, NexusId, ProcessId, ScopeId, SignalId, TypeId};
pub use nexus::{DelayTriple, DriveStrength, Nexus, NexusEndpoint, PinRef};
pub use process::{Process, ProcessKind};
pub use scope::{FunctionDef, ParamEntry, Scope, ScopeKind, TaskDef};
pub use signal::{PortDirection, Signal, SignalRef};
pub use source_map::SourceMap;
pub use stmt::{CaseArm, CaseKind, DelayValue, Stmt, TaskRef};
pub use types::{Type, TypeDb, ValueKind};
