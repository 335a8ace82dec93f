// Copyright 2026 the Tasm Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Text rendering of decoded code.
//!
//! One instruction per line, indented four spaces per nesting level. Nested code is wrapped in
//! `{ .. }` and method dictionaries in `[ .. ]`, with each method as `id => { .. }`:
//!
//! ```text
//! DICTPUSHCONST 19 [
//!     0 => {
//!         SETCP 0
//!     }
//! ]
//! ```

use alloc::borrow::Cow;
use alloc::string::{String, ToString};
use core::fmt;

use crate::decoded::{
    Argument, ControlRegister, DecodedCode, DecodedDictionary, DecodedInstruction, StackRegister,
};

const INDENT: &str = "    ";

/// Normalizes an instruction name for display.
///
/// A leading `2` moves to the end (`2DUP` becomes `DUP2`) and `#` becomes `_`.
#[must_use]
pub fn normalize_name(name: &str) -> Cow<'_, str> {
    let name = match name.strip_prefix('2') {
        Some(rest) => Cow::Owned([rest, "2"].concat()),
        None => Cow::Borrowed(name),
    };
    if name.contains('#') {
        Cow::Owned(name.replace('#', "_"))
    } else {
        name
    }
}

/// Renders `code` as a listing at nesting `depth`, one newline-terminated line per instruction.
#[must_use]
pub fn render_code(code: &DecodedCode<'_>, depth: usize) -> String {
    AtDepth { item: code, depth }.to_string()
}

/// Renders a single instruction line (without a trailing newline) at nesting `depth`.
#[must_use]
pub fn render_instruction(instr: &DecodedInstruction<'_>, depth: usize) -> String {
    AtDepth {
        item: instr,
        depth,
    }
    .to_string()
}

struct AtDepth<'a, T> {
    item: &'a T,
    depth: usize,
}

impl fmt::Display for AtDepth<'_, DecodedCode<'_>> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_lines(f, self.item, self.depth)
    }
}

impl fmt::Display for AtDepth<'_, DecodedInstruction<'_>> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_instruction(f, self.item, self.depth)
    }
}

fn write_indent(f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
    for _ in 0..depth {
        f.write_str(INDENT)?;
    }
    Ok(())
}

fn write_lines(f: &mut fmt::Formatter<'_>, code: &DecodedCode<'_>, depth: usize) -> fmt::Result {
    for instr in &code.instructions {
        write_instruction(f, instr, depth)?;
        f.write_str("\n")?;
    }
    Ok(())
}

// Every argument renders non-empty, so separators never leave trailing spaces.
fn write_instruction(
    f: &mut fmt::Formatter<'_>,
    instr: &DecodedInstruction<'_>,
    depth: usize,
) -> fmt::Result {
    write_indent(f, depth)?;
    f.write_str(&normalize_name(instr.name))?;
    for arg in &instr.args {
        f.write_str(" ")?;
        write_argument(f, arg, depth)?;
    }
    Ok(())
}

fn write_argument(f: &mut fmt::Formatter<'_>, arg: &Argument<'_>, depth: usize) -> fmt::Result {
    match arg {
        Argument::Int(v) => write!(f, "{v}"),
        Argument::Uint(v) => write!(f, "{v}"),
        Argument::BigInt(v) => write!(f, "{v}"),
        Argument::Stack(r) => write!(f, "{r}"),
        Argument::Control(r) => write!(f, "{r}"),
        Argument::Slice(cell) => write!(f, "{cell}"),
        Argument::Code(code) => {
            f.write_str("{\n")?;
            write_lines(f, code, depth + 1)?;
            write_indent(f, depth)?;
            f.write_str("}")
        }
        Argument::Dictionary(dict) => write_dictionary(f, dict, depth),
    }
}

fn write_dictionary(
    f: &mut fmt::Formatter<'_>,
    dict: &DecodedDictionary<'_>,
    depth: usize,
) -> fmt::Result {
    f.write_str("[\n")?;
    for method in &dict.methods {
        write_indent(f, depth + 1)?;
        writeln!(f, "{} => {{", method.id)?;
        write_lines(f, &method.code, depth + 2)?;
        write_indent(f, depth + 1)?;
        f.write_str("}\n")?;
    }
    write_indent(f, depth)?;
    f.write_str("]")
}

impl fmt::Display for StackRegister {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s{}", self.0)
    }
}

impl fmt::Display for ControlRegister {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "c{}", self.0)
    }
}

impl fmt::Display for DecodedCode<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_lines(f, self, 0)
    }
}

impl fmt::Display for DecodedInstruction<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_instruction(f, self, 0)
    }
}
