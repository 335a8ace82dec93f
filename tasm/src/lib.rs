// Copyright 2026 the Tasm Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! `tasm`: a specification-driven disassembler for TVM bytecode.
//!
//! TVM code lives in trees of [cells](cell::Cell), usually shipped as a
//! [bag of cells](boc). The set of instructions is not hard-coded: a
//! [`Specification`](specification::Specification) (the `tvm-specification.json` document) gives
//! each instruction's opcode range and argument layout, and a
//! [`Decompiler`](decompile::Decompiler) built from it turns a code cell into a tree of decoded
//! instructions that [renders](render) as an indented listing.
//!
//! ## Example
//!
//! ```
//! use tasm::cell::CellBuilder;
//! use tasm::decompile::Decompiler;
//! use tasm::specification::Specification;
//!
//! let spec = Specification::from_json(
//!     r#"{ "instructions": [
//!         { "name": "NOP", "layout": { "min": 0, "max": 65536, "checkLen": 8,
//!           "args": { "$": "simpleArgs", "children": [] } } },
//!         { "name": "PUSHINT", "layout": { "min": 65536, "max": 131072, "checkLen": 8,
//!           "args": { "$": "simpleArgs", "children": [ { "$": "int", "len": 8 } ] } } }
//!     ] }"#,
//! )?;
//! let decompiler = Decompiler::new(&spec)?;
//!
//! let mut code = CellBuilder::new();
//! code.store_bytes(&[0x00, 0x01, 0x2A])?;
//! let listing = decompiler.decompile(&code.build())?;
//!
//! assert_eq!(listing.to_string(), "NOP\nPUSHINT 42\n");
//! # Ok::<(), Box<dyn core::error::Error>>(())
//! ```

#![no_std]

extern crate alloc;

mod args;
pub mod boc;
pub mod cell;
pub mod decoded;
pub mod decompile;
pub mod dict;
pub mod opcode_index;
pub mod render;
pub mod specification;
pub mod trace;
