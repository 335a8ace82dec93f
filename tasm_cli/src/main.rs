// Copyright 2026 the Tasm Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

#![doc = "Command-line front end for `tasm`.\n\n\
          Reads a `tvm-specification.json` document and a bag of cells, decodes one of its \
          roots as code, and prints the listing.\n"]

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing::{debug, info, trace};
use tracing_subscriber::{EnvFilter, fmt};

use tasm::boc::parse_boc;
use tasm::decompile::{Decompiler, Limits};
use tasm::specification::Specification;
use tasm::trace::{TraceMask, TraceSink};

#[derive(Parser, Debug)]
#[command(name = "tasm", version)]
#[command(about = "Disassemble TVM code stored in a bag of cells")]
struct Args {
    /// Path to the instruction specification (`tvm-specification.json`)
    spec: PathBuf,

    /// Bag-of-cells file holding the code; `-` reads standard input
    boc: PathBuf,

    /// Index of the root cell to decode
    #[arg(long, default_value_t = 0)]
    root: usize,

    /// Maximum nesting depth of decoded cells
    #[arg(long = "max-depth", default_value_t = Limits::default().max_depth)]
    max_depth: usize,

    /// Maximum number of decoded instructions
    #[arg(long = "max-nodes", default_value_t = Limits::default().max_nodes)]
    max_nodes: usize,

    /// Log every decoded cell, instruction, and dictionary entry
    #[arg(long)]
    trace: bool,
}

fn init_logging(trace: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if trace { "warn,tasm=trace" } else { "warn" })
    });

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

/// Forwards decoder events to `tracing`.
struct TracingSink;

impl TraceSink for TracingSink {
    fn mask(&self) -> TraceMask {
        TraceMask::ALL
    }

    fn cell_enter(&mut self, depth: usize, bits: usize, refs: usize) {
        trace!(depth, bits, refs, "enter cell");
    }

    fn cell_exit(&mut self, depth: usize, instructions: usize) {
        trace!(depth, instructions, "exit cell");
    }

    fn instr(&mut self, depth: usize, opcode: u32, name: &str) {
        debug!(depth, opcode = %format_args!("0x{opcode:06x}"), name, "instruction");
    }

    fn dict_entry(&mut self, depth: usize, key_bits: usize, id: u64) {
        debug!(depth, key_bits, id, "method");
    }
}

fn read_input(path: &Path) -> Result<Vec<u8>> {
    if path == Path::new("-") {
        let mut bytes = Vec::new();
        io::stdin()
            .read_to_end(&mut bytes)
            .context("read standard input")?;
        return Ok(bytes);
    }
    fs::read(path).with_context(|| format!("read {}", path.display()))
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.trace);

    let json = fs::read(&args.spec).with_context(|| format!("read {}", args.spec.display()))?;
    let spec = Specification::from_json_slice(&json)
        .with_context(|| format!("parse {}", args.spec.display()))?;
    info!(
        instructions = spec.instructions.len(),
        version = spec.version.as_deref().unwrap_or("unknown"),
        "loaded specification"
    );

    let limits = Limits {
        max_depth: args.max_depth,
        max_nodes: args.max_nodes,
    };
    let decompiler = Decompiler::with_limits(&spec, limits)
        .with_context(|| format!("index {}", args.spec.display()))?;

    let bytes = read_input(&args.boc)?;
    let roots = parse_boc(&bytes).with_context(|| format!("parse {}", args.boc.display()))?;
    let Some(root) = roots.get(args.root) else {
        bail!(
            "root {} out of range ({} root(s) in {})",
            args.root,
            roots.len(),
            args.boc.display()
        );
    };
    debug!(bits = root.bit_len(), refs = root.refs().len(), "decoding root {}", args.root);

    let code = if args.trace {
        let mut sink = TracingSink;
        let mask = sink.mask();
        decompiler.decompile_traced(root, mask, Some(&mut sink))
    } else {
        decompiler.decompile(root)
    }
    .context("decompile")?;

    print!("{code}");
    Ok(())
}
