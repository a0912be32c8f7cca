//! Type system for the IR, including interned types and a central type database.
//!
//! All types in the design are interned into a [`TypeDb`], which assigns each
//! unique type a [`TypeId`] for cheap comparison and storage.

use crate::ids::TypeId;
use serde::{Deserialize, Serialize};

/// A hardware type in the design.
///
/// After elaboration every declared signal and self-determined expression
/// result has one of these; width/sign information lives here rather than
/// being re-derived at use sites.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Type {
    /// A single bit (scalar net/reg).
    Bit,
    /// A bit vector of known width, optionally signed.
    BitVec {
        /// The number of bits.
        width: u32,
        /// Whether the vector is signed (for arithmetic operations).
        signed: bool,
    },
    /// An integer type (for parameters and constants).
    Integer,
    /// A real/floating-point type (for parameters, specparams, and
    /// simulation).
    Real,
    /// An array type, for "memory" (array-of-word) signal declarations.
    Array {
        /// The element type of one word.
        element: TypeId,
        /// The number of words.
        size: u32,
    },
    /// A placeholder for types that failed resolution.
    Error,
}

/// The self-determined value domain of an expression result, distinct from
/// its bit width. A [`Type::BitVec`]/[`Type::Bit`] result is normally
/// `LogicVector` (x/z-capable); the result of a comparison or logical
/// operator is `BoolVector` (always 0/1, never x/z unless an operand is
/// itself unknown); [`Type::Real`] results are `Real`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValueKind {
    /// A 4-state logic vector.
    LogicVector,
    /// A 2-state boolean result (comparisons, logical connectives).
    BoolVector,
    /// A real (floating-point) value.
    Real,
    /// No value (used for statement-position constructs with no result).
    NoType,
}

/// Central type database — interned types for cheap comparison.
///
/// Each unique [`Type`] is stored once and referenced by [`TypeId`].
/// This makes type equality checks O(1) via ID comparison.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TypeDb {
    types: Vec<Type>,
}

impl TypeDb {
    /// Creates a new, empty type database.
    pub fn new() -> Self {
        Self::default()
    }

    /// Interns a type, returning its [`TypeId`].
    ///
    /// If an identical type already exists, returns the existing ID.
    /// Otherwise, allocates a new entry.
    pub fn intern(&mut self, ty: Type) -> TypeId {
        // Check for existing identical type
        for (i, existing) in self.types.iter().enumerate() {
            if existing == &ty {
                return TypeId::from_raw(i as u32);
            }
        }
        let id = TypeId::from_raw(self.types.len() as u32);
        self.types.push(ty);
        id
    }

    /// Returns a reference to the type with the given ID.
    ///
    /// # Panics
    ///
    /// Panics if the ID is out of bounds.
    pub fn get(&self, id: TypeId) -> &Type {
        &self.types[id.as_raw() as usize]
    }

    /// Returns the bit width of a type, if it has a fixed width.
    ///
    /// Returns `None` for types without a fixed bit width (e.g., `Integer`).
    pub fn bit_width(&self, id: TypeId) -> Option<u32> {
        match self.get(id) {
            Type::Bit => Some(1),
            Type::BitVec { width, .. } => Some(*width),
            Type::Array { element, size } => self.bit_width(*element).map(|w| w * size),
            _ => None,
        }
    }

    /// Returns the number of interned types.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Returns `true` if no types have been interned.
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}
