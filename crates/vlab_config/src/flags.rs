//! Elaboration environment flags — the `[flags]` table of `vlab.toml`.
//!
//! These mirror the handful of environment inputs that steer elaboration
//! decisions without changing the PForm being elaborated: which warnings are
//! gated on, whether synthesis-only restrictions apply, and whether an
//! implicit net declaration is an error or a warning.

use serde::Deserialize;

/// Elaboration-time compiler flags, resolved from `vlab.toml`'s `[flags]`
/// table and overridable by CLI flags of the same name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CompilerFlags {
    /// Emit a trace of work-list driver activity to stderr as scopes are
    /// elaborated.
    pub debug_elaborate: bool,
    /// Warn when a module instance leaves a port unconnected.
    pub warn_portbinding: bool,
    /// Warn when a `forever`/unbounded `while` loop has no delay or event
    /// control anywhere in its body (a likely synthesis/simulation hang).
    pub warn_inf_loop: bool,
    /// Elaborate `specify` blocks into timing-check cells rather than
    /// discarding them outright.
    pub gn_specify_blocks_flag: bool,
    /// Synthesis mode: the `@*` implicit sensitivity list only admits
    /// combinational-safe operands, and synthesis-unfriendly constructs
    /// (unbounded delays, most system tasks) are rejected rather than
    /// silently elaborated.
    pub synthesis: bool,
    /// Treat an implicit (undeclared) net reference as a hard error
    /// instead of a warning with an inferred 1-bit wire.
    pub error_implicit: bool,
}

impl Default for CompilerFlags {
    fn default() -> Self {
        Self {
            debug_elaborate: false,
            warn_portbinding: true,
            warn_inf_loop: true,
            gn_specify_blocks_flag: true,
            synthesis: false,
            error_implicit: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_conservative_elaboration() {
        let flags = CompilerFlags::default();
        assert!(!flags.debug_elaborate);
        assert!(flags.warn_portbinding);
        assert!(!flags.synthesis);
        assert!(!flags.error_implicit);
    }

    #[test]
    fn toml_overrides_individual_fields() {
        let toml = "debug_elaborate = true\nsynthesis = true\n";
        let flags: CompilerFlags = toml::from_str(toml).unwrap();
        assert!(flags.debug_elaborate);
        assert!(flags.synthesis);
        // Fields absent from the snippet keep their defaults.
        assert!(flags.warn_portbinding);
    }
}
