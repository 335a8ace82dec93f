// Copyright 2026 the Tasm Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Disassembler example.
//!
//! Run with:
//! `cargo run -p tasm --example disasm`

use std::sync::Arc;

use tasm::cell::CellBuilder;
use tasm::decompile::Decompiler;
use tasm::specification::Specification;

const SPEC: &str = r#"{ "instructions": [
    { "name": "NOP", "layout": { "min": 0, "max": 65536, "checkLen": 8,
      "args": { "$": "simpleArgs", "children": [] } } },
    { "name": "2DUP", "layout": { "min": 6029312, "max": 6094848, "checkLen": 8,
      "args": { "$": "simpleArgs", "children": [] } } },
    { "name": "PUSHINT_4", "layout": { "min": 7340032, "max": 8388608, "checkLen": 4,
      "args": { "$": "simpleArgs", "children": [ { "$": "tinyInt" } ] } } },
    { "name": "PUSHREFCONT", "layout": { "min": 9043968, "max": 9109504, "checkLen": 8,
      "args": { "$": "simpleArgs", "children": [ { "$": "refCodeSlice" } ] } } }
] }"#;

fn main() {
    let spec = Specification::from_json(SPEC).unwrap();
    let decompiler = Decompiler::new(&spec).unwrap();

    // PUSHREFCONT { PUSHINT_4 -1 2DUP } NOP
    let mut body = CellBuilder::new();
    body.store_bytes(&[0x7F, 0x5C]).unwrap();
    let mut root = CellBuilder::new();
    root.store_bytes(&[0x8A, 0x00]).unwrap();
    root.store_ref(Arc::new(body.build())).unwrap();

    let code = decompiler.decompile(&root.build()).unwrap();
    print!("{code}");
}
