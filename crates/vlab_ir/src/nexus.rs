//! Nexuses: equivalence classes of pins that represent one electrical node.
//!
//! A netlist [`crate::cell::Cell`] has an ordered array of pins; each pin
//! belongs to exactly one cell and exactly one nexus. A [`Nexus`] carries,
//! per endpoint, the drive strength and delay annotation that applied at
//! the point the pin was connected — not a property of the cell itself.

use serde::{Deserialize, Serialize};

use crate::ids::CellId;

/// Drive strength for logic-0 or logic-1, per §3's nexus model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DriveStrength {
    /// High impedance: this endpoint does not drive the nexus.
    HighZ,
    /// Weak drive.
    Weak,
    /// Pull drive.
    Pull,
    /// Strong drive (the default for continuous assigns and most gates).
    Strong,
    /// Supply drive (`supply0`/`supply1` nets).
    Supply,
}

/// A resolved (constant, precision-scaled) rise/fall/decay delay triple, as
/// produced once parameter/constant folding has run. `fall`/`decay` default
/// to `rise`'s value when the source gave fewer than three delays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelayTriple {
    /// Rise-time delay, in design time-precision units.
    pub rise: u64,
    /// Fall-time delay, in design time-precision units.
    pub fall: u64,
    /// Turn-off (to high-Z) delay, in design time-precision units.
    pub decay: u64,
}

impl DelayTriple {
    /// A single delay value applied uniformly to rise, fall, and decay.
    pub fn uniform(value: u64) -> Self {
        Self {
            rise: value,
            fall: value,
            decay: value,
        }
    }
}

/// One pin, identified by the cell that owns it and its position in that
/// cell's ordered pin array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PinRef {
    /// The owning cell.
    pub cell: CellId,
    /// The pin's index within the cell's pin array.
    pub index: u32,
}

/// One endpoint on a [`Nexus`]: a pin plus the strength/delay that applied
/// where it was connected.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct NexusEndpoint {
    /// The pin this endpoint represents.
    pub pin: PinRef,
    /// Drive strength for logic-0 at this endpoint.
    pub drive0: DriveStrength,
    /// Drive strength for logic-1 at this endpoint.
    pub drive1: DriveStrength,
    /// An optional propagation delay carried by this endpoint (e.g. a gate
    /// or continuous-assign delay attached to its output pin).
    pub delay: Option<DelayTriple>,
}

/// An equivalence class of pins under the connect relation: one electrical
/// node in the elaborated design.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Nexus {
    /// The bit width shared by every endpoint on this nexus.
    pub width: u32,
    /// The endpoints making up this equivalence class.
    pub endpoints: Vec<NexusEndpoint>,
}

impl Nexus {
    /// An empty nexus of the given width, ready to receive endpoints.
    pub fn new(width: u32) -> Self {
        Self {
            width,
            endpoints: Vec::new(),
        }
    }

    /// Merges `other`'s endpoints into this nexus, preserving each
    /// endpoint's own strength/delay annotation.
    ///
    /// Per §3's invariant, the connect relation is symmetric and
    /// transitive and merges must not drop strength/delay information.
    pub fn merge(&mut self, other: Nexus) {
        self.endpoints.extend(other.endpoints);
    }

    /// Whether any endpoint drives something other than high-Z.
    pub fn has_driver(&self) -> bool {
        self.endpoints
            .iter()
            .any(|e| e.drive0 != DriveStrength::HighZ || e.drive1 != DriveStrength::HighZ)
    }
}
