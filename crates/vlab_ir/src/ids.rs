//! Opaque ID newtypes for all IR entities.
//!
//! Each ID is a thin `u32` wrapper that is `Copy`, `Hash`, and `Serialize`/`Deserialize`.
//! IDs are created by [`Arena::alloc`](crate::arena::Arena::alloc) and used for O(1) lookup.

use crate::arena::ArenaId;
use serde::{Deserialize, Serialize};

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
        pub struct $name(u32);

        impl $name {
            /// Creates an ID from a raw `u32` index.
            pub fn from_raw(index: u32) -> Self {
                Self(index)
            }

            /// Returns the raw `u32` index.
            pub fn as_raw(self) -> u32 {
                self.0
            }
        }

        impl ArenaId for $name {
            fn from_raw(index: u32) -> Self {
                Self(index)
            }

            fn as_raw(self) -> u32 {
                self.0
            }
        }
    };
}

define_id!(
    /// Opaque, copyable ID for a scope (module/task/function/named-block/
    /// generate-block) in the design's scope tree.
    ScopeId
);

define_id!(
    /// Opaque, copyable ID for a signal within a scope.
    SignalId
);

define_id!(
    /// Opaque, copyable ID for a netlist cell (gate, tran, part-select,
    /// concat, replicate, bufz, UDP instance, or net) within a scope.
    CellId
);

define_id!(
    /// Opaque, copyable ID for an `initial`/`always` process within a scope.
    ProcessId
);

define_id!(
    /// Opaque, copyable ID for a nexus — an equivalence class of pins.
    NexusId
);

define_id!(
    /// Opaque, copyable ID for an event (rendezvous object fanned into by
    /// probes/triggers and fanned out to waits).
    EventId
);

define_id!(
    /// Opaque, copyable ID for an interned type in the [`TypeDb`](crate::types::TypeDb).
    TypeId
);
