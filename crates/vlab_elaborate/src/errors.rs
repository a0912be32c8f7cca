//! Diagnostic codes and helper functions for elaboration errors and warnings.
//!
//! Error codes `E200`--`E218` cover elaboration failures (unknown modules,
//! duplicate signals, structural mismatches, etc.). Warning codes
//! `W200`--`W206` cover non-fatal issues (width mismatches, unconnected
//! ports, case-statement coverage, sensitivity-list gaps).

use vlab_diagnostics::{Category, Diagnostic, DiagnosticCode};
use vlab_source::Span;

/// Unknown module or primitive type referenced in an instantiation.
pub const E200: DiagnosticCode = DiagnosticCode {
    category: Category::Error,
    number: 200,
};

/// Port count or name mismatch in instantiation.
pub const E201: DiagnosticCode = DiagnosticCode {
    category: Category::Error,
    number: 201,
};

/// Duplicate module name across source files.
pub const E202: DiagnosticCode = DiagnosticCode {
    category: Category::Error,
    number: 202,
};

/// Duplicate signal name within a scope.
pub const E203: DiagnosticCode = DiagnosticCode {
    category: Category::Error,
    number: 203,
};

/// Reference to an unknown signal.
pub const E204: DiagnosticCode = DiagnosticCode {
    category: Category::Error,
    number: 204,
};

/// Type mismatch in assignment or connection.
pub const E205: DiagnosticCode = DiagnosticCode {
    category: Category::Error,
    number: 205,
};

/// Top-level module not found in any loaded source.
pub const E206: DiagnosticCode = DiagnosticCode {
    category: Category::Error,
    number: 206,
};

/// Circular instantiation detected.
pub const E207: DiagnosticCode = DiagnosticCode {
    category: Category::Error,
    number: 207,
};

/// Unknown port name in instantiation connection.
pub const E208: DiagnosticCode = DiagnosticCode {
    category: Category::Error,
    number: 208,
};

/// Parameter constant-expression evaluation failure.
pub const E209: DiagnosticCode = DiagnosticCode {
    category: Category::Error,
    number: 209,
};

/// Unsupported construct.
pub const E210: DiagnosticCode = DiagnosticCode {
    category: Category::Error,
    number: 210,
};

/// Gate or UDP instance connects the wrong number of pins.
pub const E211: DiagnosticCode = DiagnosticCode {
    category: Category::Error,
    number: 211,
};

/// Specify-path delay table has the wrong number of entries for its edges.
pub const E212: DiagnosticCode = DiagnosticCode {
    category: Category::Error,
    number: 212,
};

/// `defparam` names a scope or parameter that does not exist.
pub const E213: DiagnosticCode = DiagnosticCode {
    category: Category::Error,
    number: 213,
};

/// Implicit (undeclared) net reference, reported as an error under
/// `error_implicit`.
pub const E214: DiagnosticCode = DiagnosticCode {
    category: Category::Error,
    number: 214,
};

/// Array gate/instance pin expression's width is neither the array's
/// element count nor `1`.
pub const E215: DiagnosticCode = DiagnosticCode {
    category: Category::Error,
    number: 215,
};

/// A function body contains a non-blocking assign, delay, event control,
/// `wait`, or task call.
pub const E216: DiagnosticCode = DiagnosticCode {
    category: Category::Error,
    number: 216,
};

/// `disable` names a module or function scope rather than a named block or
/// task.
pub const E217: DiagnosticCode = DiagnosticCode {
    category: Category::Error,
    number: 217,
};

/// An `always` (or an `initial`'s unbounded loop) can provably never yield
/// to the scheduler.
pub const E218: DiagnosticCode = DiagnosticCode {
    category: Category::Error,
    number: 218,
};

/// Width mismatch in assignment or connection.
pub const W200: DiagnosticCode = DiagnosticCode {
    category: Category::Warning,
    number: 200,
};

/// Unconnected port in instantiation.
pub const W201: DiagnosticCode = DiagnosticCode {
    category: Category::Warning,
    number: 201,
};

/// `case` statement does not cover every value of its selector.
pub const W202: DiagnosticCode = DiagnosticCode {
    category: Category::Warning,
    number: 202,
};

/// `case` statement has overlapping (non-parallel) arms.
pub const W203: DiagnosticCode = DiagnosticCode {
    category: Category::Warning,
    number: 203,
};

/// Combinational `always` block reads a signal absent from its sensitivity
/// list.
pub const W204: DiagnosticCode = DiagnosticCode {
    category: Category::Warning,
    number: 204,
};

/// `forever`/unbounded `while` loop has no delay or event control anywhere
/// in its body.
pub const W205: DiagnosticCode = DiagnosticCode {
    category: Category::Warning,
    number: 205,
};

/// Implicit (undeclared) net reference, reported as a warning when
/// `error_implicit` is off.
pub const W206: DiagnosticCode = DiagnosticCode {
    category: Category::Warning,
    number: 206,
};

/// Creates a diagnostic for an unknown module or primitive in an
/// instantiation.
pub fn error_unknown_module(name: &str, span: Span) -> Diagnostic {
    Diagnostic::error(E200, format!("unknown module `{name}`"), span)
        .with_help("check that the module is defined or reachable by the loader")
}

/// Creates a diagnostic for a missing top-level module.
pub fn error_top_not_found(name: &str, span: Span) -> Diagnostic {
    Diagnostic::error(E206, format!("top-level module `{name}` not found"), span)
        .with_help("set `project.top` in vlab.toml to the name of an existing module")
}

/// Creates a diagnostic for a duplicate module name.
pub fn error_duplicate_module(name: &str, span: Span, prev_span: Span) -> Diagnostic {
    Diagnostic::error(E202, format!("duplicate module `{name}`"), span).with_label(
        vlab_diagnostics::Label::secondary(prev_span, "previously defined here"),
    )
}

/// Creates a diagnostic for a duplicate signal name within a scope.
pub fn error_duplicate_signal(name: &str, span: Span) -> Diagnostic {
    Diagnostic::error(E203, format!("duplicate signal `{name}`"), span)
}

/// Creates a diagnostic for an unknown signal reference.
pub fn error_unknown_signal(name: &str, span: Span) -> Diagnostic {
    Diagnostic::error(E204, format!("unknown signal `{name}`"), span)
}

/// Creates a diagnostic for a circular instantiation.
pub fn error_circular_instantiation(name: &str, span: Span) -> Diagnostic {
    Diagnostic::error(
        E207,
        format!("circular instantiation of module `{name}`"),
        span,
    )
    .with_note("the module directly or indirectly instantiates itself")
}

/// Creates a diagnostic when a parameter cannot be constant-evaluated.
pub fn error_param_not_const(msg: &str, span: Span) -> Diagnostic {
    Diagnostic::error(E209, format!("cannot evaluate parameter: {msg}"), span)
}

/// Creates a diagnostic for an unsupported construct.
pub fn error_unsupported(what: &str, span: Span) -> Diagnostic {
    Diagnostic::error(E210, format!("unsupported construct: {what}"), span)
        .with_note("this will be supported in a future release")
}

/// Creates a diagnostic for a port mismatch in instantiation.
pub fn error_port_mismatch(msg: &str, span: Span) -> Diagnostic {
    Diagnostic::error(E201, msg.to_string(), span)
}

/// Creates a diagnostic for an unknown port in an instantiation.
pub fn error_unknown_port(port_name: &str, module_name: &str, span: Span) -> Diagnostic {
    Diagnostic::error(
        E208,
        format!("unknown port `{port_name}` on module `{module_name}`"),
        span,
    )
}

/// Creates a diagnostic for a gate or UDP instance with the wrong pin count.
pub fn error_pin_count_mismatch(kind: &str, expected: u32, found: usize, span: Span) -> Diagnostic {
    Diagnostic::error(
        E211,
        format!("`{kind}` expects {expected} pins, found {found}"),
        span,
    )
}

/// Creates a diagnostic for a specify-path delay table with the wrong arity.
pub fn error_delay_table_arity(expected: usize, found: usize, span: Span) -> Diagnostic {
    Diagnostic::error(
        E212,
        format!("specify path delay table expects {expected} entries, found {found}"),
        span,
    )
}

/// Creates a diagnostic for a `defparam` naming an unknown target.
pub fn error_defparam_target_not_found(path: &str, span: Span) -> Diagnostic {
    Diagnostic::error(E213, format!("defparam target `{path}` not found"), span)
        .with_note("defparam targets are resolved after every instance tree is built")
}

/// Creates a diagnostic for an implicit net reference under `error_implicit`.
pub fn error_implicit_net(name: &str, span: Span) -> Diagnostic {
    Diagnostic::error(E214, format!("implicit wire `{name}` is not declared"), span)
        .with_help("declare the net explicitly, or clear `error_implicit` in vlab.toml")
}

/// Creates a diagnostic for an array gate/instance pin whose width fits
/// neither the broadcast case (`1`) nor the bit-split case (the array's
/// element count).
pub fn error_array_pin_width(name: &str, width: u32, count: u32, span: Span) -> Diagnostic {
    Diagnostic::error(
        E215,
        format!("pin `{name}` is {width} bits wide, but the array has {count} elements"),
        span,
    )
    .with_help("connect a 1-bit signal to broadcast, or one exactly as wide as the array")
}

/// Creates a diagnostic for a construct disallowed inside a function body.
pub fn error_function_body_construct(what: &str, span: Span) -> Diagnostic {
    Diagnostic::error(
        E216,
        format!("function body cannot contain {what}"),
        span,
    )
    .with_note("a function must return combinationally, within the same time step")
}

/// Creates a diagnostic for a `disable` that targets a module or function.
pub fn error_disable_invalid_target(span: Span) -> Diagnostic {
    Diagnostic::error(
        E217,
        "disable target must be a named block or task, not a module or function",
        span,
    )
}

/// Creates an error for an `always`/unbounded loop that can provably never
/// yield to the scheduler.
pub fn error_infinite_loop(span: Span) -> Diagnostic {
    Diagnostic::error(E218, "loop body has no delay or event control", span)
        .with_note("this process would run forever without ever yielding to the scheduler")
}

/// Creates a warning for a width mismatch.
pub fn warn_width_mismatch(msg: &str, span: Span) -> Diagnostic {
    Diagnostic::warning(W200, msg.to_string(), span)
}

/// Creates a warning for an unconnected port.
pub fn warn_unconnected_port(port_name: &str, instance_name: &str, span: Span) -> Diagnostic {
    Diagnostic::warning(
        W201,
        format!("port `{port_name}` is unconnected on instance `{instance_name}`"),
        span,
    )
}

/// Creates a warning that a `case` statement does not cover every selector
/// value.
pub fn warn_case_not_full(span: Span) -> Diagnostic {
    Diagnostic::warning(W202, "case statement is not full", span)
        .with_note("add a `default` arm or cover every selector value")
}

/// Creates a warning that a `case` statement has overlapping arms.
pub fn warn_case_not_parallel(span: Span) -> Diagnostic {
    Diagnostic::warning(W203, "case statement is not parallel", span)
        .with_note("two or more arms match the same selector value")
}

/// Creates a warning that a combinational `always` block omits a signal it
/// reads from its sensitivity list.
pub fn warn_incomplete_sensitivity(name: &str, span: Span) -> Diagnostic {
    Diagnostic::warning(
        W204,
        format!("signal `{name}` is read but missing from the sensitivity list"),
        span,
    )
    .with_help("use `always @*` or add the signal to the event list")
}

/// Creates a warning that an unbounded loop has no delay or event control.
pub fn warn_infinite_loop(span: Span) -> Diagnostic {
    Diagnostic::warning(W205, "loop body has no delay or event control", span)
        .with_note("this loop will never yield to the scheduler")
}

/// Creates a warning for an implicit net reference when `error_implicit` is
/// off.
pub fn warn_implicit_net(name: &str, span: Span) -> Diagnostic {
    Diagnostic::warning(
        W206,
        format!("implicit wire `{name}` is not declared"),
        span,
    )
    .with_note("an implicit 1-bit wire was inferred")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_code_formats() {
        assert_eq!(format!("{E200}"), "E200");
        assert_eq!(format!("{E206}"), "E206");
        assert_eq!(format!("{W200}"), "W200");
        assert_eq!(format!("{W201}"), "W201");
    }

    #[test]
    fn unknown_module_diagnostic() {
        let d = error_unknown_module("counter", Span::DUMMY);
        assert_eq!(d.code, E200);
        assert!(d.message.contains("counter"));
    }

    #[test]
    fn top_not_found_diagnostic() {
        let d = error_top_not_found("top", Span::DUMMY);
        assert_eq!(d.code, E206);
        assert!(d.message.contains("top"));
    }

    #[test]
    fn duplicate_module_diagnostic() {
        let d = error_duplicate_module("counter", Span::DUMMY, Span::DUMMY);
        assert_eq!(d.code, E202);
        assert_eq!(d.labels.len(), 1);
    }

    #[test]
    fn duplicate_signal_diagnostic() {
        let d = error_duplicate_signal("clk", Span::DUMMY);
        assert_eq!(d.code, E203);
    }

    #[test]
    fn unknown_signal_diagnostic() {
        let d = error_unknown_signal("rst", Span::DUMMY);
        assert_eq!(d.code, E204);
    }

    #[test]
    fn circular_instantiation_diagnostic() {
        let d = error_circular_instantiation("top", Span::DUMMY);
        assert_eq!(d.code, E207);
        assert!(!d.notes.is_empty());
    }

    #[test]
    fn param_not_const_diagnostic() {
        let d = error_param_not_const("non-constant expression", Span::DUMMY);
        assert_eq!(d.code, E209);
    }

    #[test]
    fn unsupported_diagnostic() {
        let d = error_unsupported("complex typedef", Span::DUMMY);
        assert_eq!(d.code, E210);
    }

    #[test]
    fn warning_diagnostics() {
        let d = warn_width_mismatch("8-bit to 4-bit", Span::DUMMY);
        assert_eq!(d.code, W200);

        let d = warn_unconnected_port("clk", "u1", Span::DUMMY);
        assert_eq!(d.code, W201);
        assert!(d.message.contains("clk"));
    }

    #[test]
    fn port_mismatch_diagnostic() {
        let d = error_port_mismatch("expected 3 ports, found 2", Span::DUMMY);
        assert_eq!(d.code, E201);
    }

    #[test]
    fn unknown_port_diagnostic() {
        let d = error_unknown_port("data", "counter", Span::DUMMY);
        assert_eq!(d.code, E208);
        assert!(d.message.contains("data"));
        assert!(d.message.contains("counter"));
    }

    #[test]
    fn pin_count_mismatch_diagnostic() {
        let d = error_pin_count_mismatch("nand", 3, 2, Span::DUMMY);
        assert_eq!(d.code, E211);
        assert!(d.message.contains("nand"));
    }

    #[test]
    fn delay_table_arity_diagnostic() {
        let d = error_delay_table_arity(6, 3, Span::DUMMY);
        assert_eq!(d.code, E212);
    }

    #[test]
    fn defparam_target_not_found_diagnostic() {
        let d = error_defparam_target_not_found("top.u1.WIDTH", Span::DUMMY);
        assert_eq!(d.code, E213);
        assert!(d.message.contains("top.u1.WIDTH"));
    }

    #[test]
    fn implicit_net_diagnostics() {
        let e = error_implicit_net("foo", Span::DUMMY);
        assert_eq!(e.code, E214);

        let w = warn_implicit_net("foo", Span::DUMMY);
        assert_eq!(w.code, W206);
    }

    #[test]
    fn case_coverage_diagnostics() {
        let full = warn_case_not_full(Span::DUMMY);
        assert_eq!(full.code, W202);

        let parallel = warn_case_not_parallel(Span::DUMMY);
        assert_eq!(parallel.code, W203);
    }

    #[test]
    fn sensitivity_and_loop_diagnostics() {
        let d = warn_incomplete_sensitivity("enable", Span::DUMMY);
        assert_eq!(d.code, W204);
        assert!(d.message.contains("enable"));

        let d = warn_infinite_loop(Span::DUMMY);
        assert_eq!(d.code, W205);
    }

    #[test]
    fn array_pin_width_diagnostic() {
        let d = error_array_pin_width("sel", 3, 4, Span::DUMMY);
        assert_eq!(d.code, E215);
        assert!(d.message.contains("sel"));
    }

    #[test]
    fn function_body_construct_diagnostic() {
        let d = error_function_body_construct("a non-blocking assign", Span::DUMMY);
        assert_eq!(d.code, E216);
    }

    #[test]
    fn disable_invalid_target_diagnostic() {
        let d = error_disable_invalid_target(Span::DUMMY);
        assert_eq!(d.code, E217);
    }

    #[test]
    fn infinite_loop_error_diagnostic() {
        let d = error_infinite_loop(Span::DUMMY);
        assert_eq!(d.code, E218);
    }
}
