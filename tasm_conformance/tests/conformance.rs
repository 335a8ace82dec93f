// Copyright 2026 the Tasm Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

#![allow(missing_docs, reason = "integration test crate")]

use std::sync::Arc;

use tasm::boc::{parse_boc, parse_boc_root};
use tasm::cell::{Cell, CellBuilder};
use tasm::decoded::Argument;
use tasm::decompile::{DecompileError, Decompiler, Limits};
use tasm::opcode_index::IndexError;
use tasm::specification::Specification;

/// A slice of the TVM instruction set, in the specification document's shape.
const SPEC: &str = r#"{
    "version": "test",
    "instructions": [
        { "name": "NOP", "layout": { "min": 0, "max": 65536, "checkLen": 8,
            "args": { "$": "simpleArgs", "children": [] } } },
        { "name": "XCHG_IJ", "layout": { "min": 1048576, "max": 1114112, "checkLen": 8,
            "args": { "$": "xchgArgs" } } },
        { "name": "PUSH", "layout": { "min": 2097152, "max": 3145728, "checkLen": 4,
            "args": { "$": "simpleArgs", "children": [ { "$": "stack", "len": 4 } ] } } },
        { "name": "2DUP", "layout": { "min": 6029312, "max": 6094848, "checkLen": 8,
            "args": { "$": "simpleArgs", "children": [] } } },
        { "name": "PUSHINT_4", "layout": { "min": 7340032, "max": 8388608, "checkLen": 4,
            "args": { "$": "simpleArgs", "children": [ { "$": "tinyInt" } ] } } },
        { "name": "PUSHINT_8", "layout": { "min": 8388608, "max": 8454144, "checkLen": 8,
            "args": { "$": "simpleArgs", "children": [ { "$": "int", "len": 8 } ] } } },
        { "name": "PUSH#REF", "layout": { "min": 8912896, "max": 8978432, "checkLen": 8,
            "args": { "$": "simpleArgs", "children": [ { "$": "exoticCell" } ] } } },
        { "name": "PUSHREFCONT", "layout": { "min": 9043968, "max": 9109504, "checkLen": 8,
            "args": { "$": "simpleArgs", "children": [ { "$": "refCodeSlice" } ] } } },
        { "name": "PUSHSLICE", "layout": { "min": 9109504, "max": 9175040, "checkLen": 8,
            "args": { "$": "simpleArgs", "children": [ { "$": "slice",
                "refs": { "$": "uint", "len": 0 },
                "bits": { "$": "uint", "len": 4 },
                "pad": 4 } ] } } },
        { "name": "PUSHCONT_SHORT", "layout": { "min": 9437184, "max": 10485760, "checkLen": 4,
            "args": { "$": "simpleArgs", "children": [ { "$": "inlineCodeSlice",
                "bits": { "$": "uint", "len": 4 } } ] } } },
        { "name": "DICTPUSHCONST", "layout": { "min": 16032768, "max": 16033792, "checkLen": 14,
            "args": { "$": "dictpush" } } },
        { "name": "SETCP", "layout": { "min": 16711680, "max": 16777216, "checkLen": 8,
            "args": { "$": "simpleArgs", "children": [ { "$": "setcpArg" } ] } } }
    ]
}"#;

fn spec() -> Specification {
    Specification::from_json(SPEC).unwrap()
}

fn cell(bytes: &[u8], refs: Vec<Cell>) -> Cell {
    let mut b = CellBuilder::new();
    b.store_bytes(bytes).unwrap();
    for r in refs {
        b.store_ref(Arc::new(r)).unwrap();
    }
    b.build()
}

/// Serializes a cell tree as a generic bag of cells (no index, no checksum).
///
/// Cells are laid out in pre-order, so shared sub-cells are written once per occurrence.
fn serialize_boc(root: &Cell) -> Vec<u8> {
    fn flatten<'a>(cell: &'a Cell, out: &mut Vec<(&'a Cell, Vec<usize>)>) -> usize {
        let ix = out.len();
        out.push((cell, Vec::new()));
        let refs = cell.refs().iter().map(|r| flatten(r, out)).collect();
        out[ix].1 = refs;
        ix
    }

    let mut cells = Vec::new();
    flatten(root, &mut cells);

    let mut body = Vec::new();
    for (cell, refs) in &cells {
        let bits = cell.bit_len();
        body.push(refs.len() as u8);
        body.push((bits / 8 + bits.div_ceil(8)) as u8);
        let mut data = cell.data().to_vec();
        if bits % 8 != 0 {
            *data.last_mut().unwrap() |= 0x80 >> (bits % 8);
        }
        body.extend_from_slice(&data);
        for &r in refs {
            body.extend_from_slice(&(r as u16).to_be_bytes());
        }
    }

    let mut out = vec![0xB5, 0xEE, 0x9C, 0x72];
    out.push(0x02); // no index, no crc, ref_size = 2
    out.push(0x02); // off_size
    out.extend_from_slice(&(cells.len() as u16).to_be_bytes());
    out.extend_from_slice(&1_u16.to_be_bytes()); // roots
    out.extend_from_slice(&0_u16.to_be_bytes()); // absent
    out.extend_from_slice(&(body.len() as u16).to_be_bytes());
    out.extend_from_slice(&0_u16.to_be_bytes()); // root index
    out.extend_from_slice(&body);
    out
}

fn listing(spec: &Specification, root: &Cell) -> String {
    Decompiler::new(spec)
        .unwrap()
        .decompile(root)
        .unwrap()
        .to_string()
}

#[test]
fn nop_pushint_end_to_end() {
    let spec = Specification::from_json(
        r#"{ "instructions": [
            { "name": "NOP", "layout": { "min": 0, "max": 65536, "checkLen": 8,
              "args": { "$": "simpleArgs", "children": [] } } },
            { "name": "PUSHINT", "layout": { "min": 65536, "max": 131072, "checkLen": 8,
              "args": { "$": "simpleArgs", "children": [ { "$": "int", "len": 8 } ] } } }
        ] }"#,
    )
    .unwrap();

    let boc = serialize_boc(&cell(&[0x00, 0x01, 0x2A], vec![]));
    let root = parse_boc_root(&boc).unwrap();
    assert_eq!(listing(&spec, &root), "NOP\nPUSHINT 42\n");
}

#[test]
fn mixed_program_listing() {
    let spec = spec();
    let root = cell(
        &[
            0xFF, 0x00, // SETCP 0
            0x77, // PUSHINT_4 7
            0x7F, // PUSHINT_4 -1
            0x23, // PUSH s3
            0x10, 0x12, // XCHG_IJ s1 s2
            0x5C, // 2DUP
            0x8B, 0x0B, // PUSHSLICE: 0 bytes + 4 bits `1011`
            0x91, 0x00, // PUSHCONT_SHORT: 1 byte { NOP }
        ],
        vec![cell(&[0x00], vec![])],
    );

    let boc = serialize_boc(&root);
    let root = parse_boc_root(&boc).unwrap();
    assert_eq!(
        listing(&spec, &root),
        "SETCP 0\n\
         PUSHINT_4 7\n\
         PUSHINT_4 -1\n\
         PUSH s3\n\
         XCHG_IJ s1 s2\n\
         DUP2\n\
         PUSHSLICE x{B_}\n\
         PUSHCONT_SHORT {\n    NOP\n}\n\
         ref {\n    NOP\n}\n"
    );
}

#[test]
fn hash_in_name_becomes_underscore() {
    let spec = spec();
    let root = cell(&[0x88], vec![cell(&[0xAB], vec![])]);
    assert_eq!(listing(&spec, &root), "PUSH_REF x{AB}\n");
}

#[test]
fn tiny_int_range() {
    let spec = spec();
    let bytes: Vec<u8> = (0x70..=0x7F).collect();
    let code = Decompiler::new(&spec)
        .unwrap()
        .decompile(&cell(&bytes, vec![]))
        .unwrap();
    let values: Vec<i64> = code
        .instructions
        .iter()
        .map(|i| match i.args.as_slice() {
            [Argument::Int(v)] => *v,
            other => panic!("unexpected args {other:?}"),
        })
        .collect();
    assert_eq!(values, (0..=10).chain(-5..=-1).collect::<Vec<i64>>());
}

#[test]
fn method_dictionary_in_ascending_order() {
    let spec = spec();

    // Keys 0 and 3 at width 8: shared prefix `000000` (hml_same), then a fork whose branches
    // each carry one more key bit (hml_short) followed by the method body.
    let mut left = CellBuilder::new();
    left.store_uint(0b0100, 4).unwrap();
    left.store_uint(0x00, 8).unwrap(); // NOP
    let mut right = CellBuilder::new();
    right.store_uint(0b0101, 4).unwrap();
    right.store_uint(0x73, 8).unwrap(); // PUSHINT_4 3
    let mut dict = CellBuilder::new();
    dict.store_uint(0b11, 2).unwrap();
    dict.store_bit(false).unwrap();
    dict.store_uint(6, 4).unwrap();
    dict.store_ref(Arc::new(left.build())).unwrap();
    dict.store_ref(Arc::new(right.build())).unwrap();

    // 14-bit DICTPUSHCONST prefix, then key width 8.
    let root = cell(&[0xF4, 0xA4, 0x08], vec![dict.build()]);
    let boc = serialize_boc(&root);
    let root = parse_boc_root(&boc).unwrap();

    assert_eq!(
        listing(&spec, &root),
        "DICTPUSHCONST 8 [\n\
         \x20   0 => {\n\
         \x20       NOP\n\
         \x20   }\n\
         \x20   3 => {\n\
         \x20       PUSHINT_4 3\n\
         \x20   }\n\
         ]\n"
    );
}

#[test]
fn empty_method_dictionary() {
    let spec = spec();
    let root = cell(&[0xF4, 0xA4, 0x13], vec![Cell::empty()]);
    assert_eq!(listing(&spec, &root), "DICTPUSHCONST 19 [\n]\n");
}

#[test]
fn nested_references_are_decoded_recursively() {
    let spec = spec();
    let leaf = cell(&[0x5C], vec![]);
    let middle = cell(&[0x8A], vec![leaf.clone(), leaf]);
    let root = cell(&[0x00], vec![middle]);
    assert_eq!(
        listing(&spec, &root),
        "NOP\n\
         ref {\n\
         \x20   PUSHREFCONT {\n\
         \x20       DUP2\n\
         \x20   }\n\
         \x20   ref {\n\
         \x20       DUP2\n\
         \x20   }\n\
         }\n"
    );
}

#[test]
fn shared_cells_are_decoded_per_reference() {
    let spec = spec();
    let shared = Arc::new(cell(&[0x00], vec![]));
    let mut b = CellBuilder::new();
    b.store_ref(Arc::clone(&shared)).unwrap();
    b.store_ref(shared).unwrap();
    assert_eq!(
        listing(&spec, &b.build()),
        "ref {\n    NOP\n}\nref {\n    NOP\n}\n"
    );
}

#[test]
fn cell_with_only_a_reference_is_a_single_ref() {
    let spec = spec();
    let root = cell(&[], vec![cell(&[0x00], vec![])]);
    let code = Decompiler::new(&spec).unwrap().decompile(&root).unwrap();
    assert_eq!(code.instructions.len(), 1);
    assert!(code.instructions[0].is_reference());
    assert_eq!(code.to_string(), "ref {\n    NOP\n}\n");
}

/// `levels` forks with empty labels, each pointing twice at the same child, over a `NOP`
/// method: 2^levels methods in `levels + 1` cells.
fn shared_fork_dictionary(levels: usize) -> Cell {
    let mut leaf = CellBuilder::new();
    leaf.store_uint(0b00, 2).unwrap();
    leaf.store_uint(0x00, 8).unwrap();
    let mut node = Arc::new(leaf.build());
    for _ in 0..levels {
        let mut b = CellBuilder::new();
        b.store_uint(0b00, 2).unwrap();
        b.store_ref(Arc::clone(&node)).unwrap();
        b.store_ref(node).unwrap();
        node = Arc::new(b.build());
    }
    Arc::unwrap_or_clone(node)
}

#[test]
fn shared_dictionary_forks_count_against_the_node_limit() {
    let spec = spec();

    // Key width 2: four methods.
    let root = cell(&[0xF4, 0xA4, 0x02], vec![shared_fork_dictionary(2)]);
    let code = Decompiler::new(&spec).unwrap().decompile(&root).unwrap();
    let Argument::Dictionary(dict) = &code.instructions[0].args[1] else {
        panic!("expected a dictionary, got {:?}", code.instructions[0].args);
    };
    let ids: Vec<u64> = dict.methods.iter().map(|m| m.id).collect();
    assert_eq!(ids, vec![0, 1, 2, 3]);

    // Key width 20: a million methods from 21 cells.
    let root = cell(&[0xF4, 0xA4, 0x14], vec![shared_fork_dictionary(20)]);
    let d = Decompiler::with_limits(
        &spec,
        Limits {
            max_depth: 256,
            max_nodes: 10,
        },
    )
    .unwrap();
    assert_eq!(
        d.decompile(&root),
        Err(DecompileError::NodeLimitExceeded { limit: 10 })
    );

    // Four methods and their bodies need more than five nodes.
    let root = cell(&[0xF4, 0xA4, 0x02], vec![shared_fork_dictionary(2)]);
    let d = Decompiler::with_limits(
        &spec,
        Limits {
            max_nodes: 5,
            ..Limits::default()
        },
    )
    .unwrap();
    assert_eq!(
        d.decompile(&root),
        Err(DecompileError::NodeLimitExceeded { limit: 5 })
    );
}

#[test]
fn unknown_opcode_aborts() {
    let spec = spec();
    let d = Decompiler::new(&spec).unwrap();
    assert_eq!(
        d.decompile(&cell(&[0x00, 0xE0], vec![])),
        Err(DecompileError::UnknownOpcode {
            opcode: 0xE0_0000,
            bits_left: 8
        })
    );
}

#[test]
fn deep_reference_chain_hits_depth_limit() {
    let spec = spec();
    let mut chain = cell(&[0x00], vec![]);
    for _ in 0..300 {
        chain = cell(&[], vec![chain]);
    }
    let d = Decompiler::new(&spec).unwrap();
    assert_eq!(
        d.decompile(&chain),
        Err(DecompileError::DepthExceeded { limit: 128 })
    );

    let d = Decompiler::with_limits(
        &spec,
        Limits {
            max_depth: 512,
            ..Limits::default()
        },
    )
    .unwrap();
    assert!(d.decompile(&chain).is_ok());
}

#[test]
fn continuation_chain_at_default_depth_fits_a_spawned_thread() {
    // Spawned threads get the platform default stack, not the test harness's.
    std::thread::spawn(|| {
        let spec = spec();
        let d = Decompiler::new(&spec).unwrap();
        let max_depth = Limits::default().max_depth;

        let mut chain = cell(&[0x00], vec![]);
        for _ in 1..max_depth {
            chain = cell(&[0x8A], vec![chain]);
        }
        let code = d.decompile(&chain).unwrap();
        assert!(code.to_string().contains("NOP"));

        let chain = cell(&[0x8A], vec![chain]);
        assert_eq!(
            d.decompile(&chain),
            Err(DecompileError::DepthExceeded { limit: max_depth })
        );
    })
    .join()
    .unwrap();
}

#[test]
fn overlapping_ranges_are_rejected() {
    let spec = Specification::from_json(
        r#"{ "instructions": [
            { "name": "A", "layout": { "min": 0, "max": 32, "checkLen": 8,
              "args": { "$": "simpleArgs" } } },
            { "name": "B", "layout": { "min": 16, "max": 48, "checkLen": 8,
              "args": { "$": "simpleArgs" } } }
        ] }"#,
    )
    .unwrap();
    assert!(matches!(
        Decompiler::new(&spec),
        Err(IndexError::Overlap { ref name, ref previous, .. }) if name == "B" && previous == "A"
    ));
}

#[test]
fn every_root_of_a_container_is_available() {
    let boc = serialize_boc(&cell(&[0x00], vec![cell(&[0x5C], vec![])]));
    let roots = parse_boc(&boc).unwrap();
    assert_eq!(roots.len(), 1);
    assert_eq!(roots[0].refs().len(), 1);
}
