//! Vlab CLI — reads a serialized PForm fixture, runs elaboration, and prints
//! diagnostics and/or the emitted assembly.
//!
//! The lexer and grammar-driven parser live upstream of this workspace; the
//! only "parsing" this binary does is deserializing `vlab_pform`'s own
//! `serde` schema, which stands in for handoff from that parser.

#![warn(missing_docs)]

mod fixture;

use std::path::PathBuf;
use std::process;

use clap::Parser;

use vlab_config::CompilerFlags;
use vlab_diagnostics::{DiagnosticRenderer, DiagnosticSink, TerminalRenderer};
use vlab_pform::ClosedLoader;
use vlab_source::SourceDb;

use fixture::Fixture;

/// Vlab — the elaboration core's command-line front end.
#[derive(Parser, Debug)]
#[command(name = "vlab", version, about = "Vlab elaboration core")]
pub struct Cli {
    /// Path to a JSON PForm fixture, as produced by `serde_json` from a
    /// `vlab_pform::PFormTable` (wrapped in a `Fixture` symbol table).
    pub fixture: PathBuf,

    /// Path to a `vlab.toml` manifest. Its `[flags]` table seeds the
    /// elaboration environment flags; CLI flags below override it.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Suppress the emitted assembly, printing only diagnostics.
    #[arg(long)]
    pub diagnostics_only: bool,

    /// Suppress diagnostics, printing only the emitted assembly. Implies
    /// nothing about whether elaboration produced errors; check the exit
    /// code for that.
    #[arg(long)]
    pub quiet: bool,

    /// Control colored diagnostic output.
    #[arg(long)]
    pub color: bool,

    /// Override `[flags] debug_elaborate`.
    #[arg(long)]
    pub debug_elaborate: bool,

    /// Override `[flags] synthesis`.
    #[arg(long)]
    pub synthesis: bool,

    /// Override `[flags] error_implicit`.
    #[arg(long)]
    pub error_implicit: bool,
}

fn main() {
    let cli = Cli::parse();
    match run(&cli) {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}

fn run(cli: &Cli) -> Result<i32, Box<dyn std::error::Error>> {
    let content = std::fs::read_to_string(&cli.fixture)?;
    let fixture: Fixture = serde_json::from_str(&content)?;

    let mut flags = match &cli.config {
        Some(path) => {
            let content = std::fs::read_to_string(path)?;
            vlab_config::load_config_from_str(&content)?.flags
        }
        None => CompilerFlags::default(),
    };
    if cli.debug_elaborate {
        flags.debug_elaborate = true;
    }
    if cli.synthesis {
        flags.synthesis = true;
    }
    if cli.error_implicit {
        flags.error_implicit = true;
    }

    let interner = vlab_common::Interner::new();
    fixture.intern_symbols(&interner);

    let sink = DiagnosticSink::new();
    let mut loader = ClosedLoader;
    let mut table = fixture.table;
    let roots = table.roots().to_vec();

    let mut ctx = vlab_elaborate::ElaborationContext::new(
        &mut table, &mut loader, &interner, &sink, flags,
    );
    vlab_elaborate::elaborate_roots(&mut ctx, &roots);
    let design = ctx.design;

    if !cli.quiet {
        let source_db = SourceDb::new();
        let renderer = TerminalRenderer::new(cli.color, 100);
        for diag in sink.diagnostics() {
            eprint!("{}", renderer.render(&diag, &source_db));
        }
    }

    let succeeded = vlab_elaborate::elaboration_succeeded(&sink, &design);
    if succeeded && !cli.diagnostics_only {
        let assembly = vlab_emit::emit_design(&design, &interner);
        print!("{assembly}");
    }

    Ok(if succeeded { 0 } else { 1 })
}
