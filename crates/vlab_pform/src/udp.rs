//! PForm user-defined primitive (UDP) templates.

use serde::{Deserialize, Serialize};
use vlab_common::Ident;
use vlab_source::Span;

/// One row of a UDP truth table.
///
/// `inputs` holds one character per input port (`0`, `1`, `x`, or `?` for
/// "don't care"); for sequential UDPs `state` holds the current-state
/// character and `output` is the next-state/output character (`-` meaning
/// "no change").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PUdpTableRow {
    /// One input-level character per input port.
    pub inputs: Vec<char>,
    /// The current-state character, for sequential UDPs only.
    pub state: Option<char>,
    /// The resulting output (or next-state) character.
    pub output: char,
}

/// A user-defined primitive template.
///
/// A UDP always has exactly one output port (index 0, by convention) and
/// one or more input ports, per §4.4.4.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PUdpTemplate {
    /// The UDP's type name.
    pub name: Ident,
    /// The output port's local name.
    pub output_name: Ident,
    /// The initial value of the output, for sequential UDPs.
    pub initial_value: Option<char>,
    /// Input port local names, in declared order.
    pub input_names: Vec<Ident>,
    /// Whether this UDP is sequential (has internal state) or combinational.
    pub sequential: bool,
    /// The truth table.
    pub table: Vec<PUdpTableRow>,
    /// Source span.
    pub span: Span,
}
