// Copyright 2026 the Tasm Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Method dictionaries.
//!
//! A `DICTPUSHCONST`-style instruction carries a key width and a reference to the root of a
//! `Hashmap n X` trie. Each trie node starts with a label (`hml_short`, `hml_long`, or
//! `hml_same`) holding part of the key; a node whose label completes the key is a leaf and the
//! rest of it is the value, otherwise it is a fork with the `0` and `1` branches as its two
//! references. Values are method bodies and decode as code.

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use crate::cell::{Cell, CellError, CellSlice};
use crate::decoded::{DecodedDictionary, DecodedMethod};
use crate::decompile::{DecompileError, Session};
use crate::trace::TraceMask;

/// Widest supported dictionary key, in bits.
pub const MAX_KEY_BITS: u64 = 64;

/// A malformed dictionary.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DictError {
    /// The key width exceeds [`MAX_KEY_BITS`].
    KeyTooWide {
        /// Declared width.
        bits: u64,
    },
    /// A label claimed more key bits than remained.
    LabelTooLong {
        /// Label length.
        len: usize,
        /// Key bits that remained.
        max: usize,
    },
    /// The trie held more leaves than allowed.
    TooManyLeaves {
        /// The leaf budget.
        limit: usize,
    },
    /// A trie node could not be read.
    Cell(CellError),
}

impl fmt::Display for DictError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::KeyTooWide { bits } => {
                write!(f, "key width {bits} exceeds {MAX_KEY_BITS} bits")
            }
            Self::LabelTooLong { len, max } => {
                write!(f, "label of {len} bits with only {max} key bits left")
            }
            Self::TooManyLeaves { limit } => write!(f, "more than {limit} entries"),
            Self::Cell(e) => write!(f, "{e}"),
        }
    }
}

impl core::error::Error for DictError {
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        match self {
            Self::Cell(e) => Some(e),
            _ => None,
        }
    }
}

impl From<CellError> for DictError {
    fn from(e: CellError) -> Self {
        Self::Cell(e)
    }
}

/// Collects the `(key, value)` leaves of the trie rooted at `root`, in ascending key order.
///
/// A root with no bits and no references is an empty dictionary. Forks may share a child
/// cell, so a small trie can describe exponentially many leaves; the walk stops with
/// [`DictError::TooManyLeaves`] as soon as it finds more than `max_leaves`.
pub fn dictionary_leaves(
    root: &Cell,
    key_bits: u64,
    max_leaves: usize,
) -> Result<Vec<(u64, CellSlice<'_>)>, DictError> {
    if key_bits > MAX_KEY_BITS {
        return Err(DictError::KeyTooWide { bits: key_bits });
    }
    let mut walk = Walk {
        leaves: Vec::new(),
        max_leaves,
    };
    if root.bit_len() == 0 && root.refs().is_empty() {
        return Ok(walk.leaves);
    }
    walk.node(root, key_bits as usize, 0)?;
    Ok(walk.leaves)
}

struct Walk<'c> {
    leaves: Vec<(u64, CellSlice<'c>)>,
    max_leaves: usize,
}

impl<'c> Walk<'c> {
    fn node(&mut self, node: &'c Cell, remaining: usize, mut key: u64) -> Result<(), DictError> {
        let mut s = node.parse();
        let label_len = read_label(&mut s, remaining, &mut key)?;
        let remaining = remaining - label_len;
        if remaining == 0 {
            if self.leaves.len() >= self.max_leaves {
                return Err(DictError::TooManyLeaves {
                    limit: self.max_leaves,
                });
            }
            self.leaves.push((key, s));
            return Ok(());
        }
        let zero = s.load_ref()?;
        let one = s.load_ref()?;
        self.node(zero, remaining - 1, key << 1)?;
        self.node(one, remaining - 1, (key << 1) | 1)
    }
}

/// Reads a `HmLabel ~l n` with `n = max`, appending its bits to `key`. Returns `l`.
fn read_label(s: &mut CellSlice<'_>, max: usize, key: &mut u64) -> Result<usize, DictError> {
    // `#<= max` is stored in just enough bits to hold `max`.
    let len_bits = (usize::BITS - max.leading_zeros()) as usize;
    let check = |len: usize| {
        if len > max {
            Err(DictError::LabelTooLong { len, max })
        } else {
            Ok(len)
        }
    };

    if !s.load_bit()? {
        // hml_short: unary length, then the bits.
        let mut len = 0;
        while s.load_bit()? {
            len += 1;
        }
        let len = check(len)?;
        for _ in 0..len {
            *key = (*key << 1) | u64::from(s.load_bit()?);
        }
        Ok(len)
    } else if !s.load_bit()? {
        // hml_long
        let len = check(s.load_uint(len_bits)? as usize)?;
        for _ in 0..len {
            *key = (*key << 1) | u64::from(s.load_bit()?);
        }
        Ok(len)
    } else {
        // hml_same
        let bit = u64::from(s.load_bit()?);
        let len = check(s.load_uint(len_bits)? as usize)?;
        for _ in 0..len {
            *key = (*key << 1) | bit;
        }
        Ok(len)
    }
}

impl<'s> Session<'_, 's, '_> {
    /// Decodes every method of the dictionary rooted at `root`.
    ///
    /// Each method counts as one node against the session's budget, on top of its body.
    pub(crate) fn decode_dictionary(
        &mut self,
        root: &Cell,
        key_bits: u64,
        instruction: Option<&str>,
    ) -> Result<DecodedDictionary<'s>, DecompileError> {
        let leaves = dictionary_leaves(root, key_bits, self.remaining_nodes()).map_err(
            |error| match error {
                DictError::TooManyLeaves { .. } => self.node_limit_exceeded(),
                error => DecompileError::Dictionary {
                    instruction: instruction.map(String::from),
                    error,
                },
            },
        )?;

        let mut methods = Vec::with_capacity(leaves.len());
        for (id, value) in leaves {
            self.count_node()?;
            let depth = self.depth();
            if let Some(sink) = self.sink_for(TraceMask::DICT) {
                sink.dict_entry(depth, key_bits as usize, id);
            }
            let body = value.to_cell()?;
            methods.push(DecodedMethod {
                id,
                code: self.decode_code(&body)?,
            });
        }
        Ok(DecodedDictionary { methods })
    }
}
