// Copyright 2026 the Tasm Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Benchmarks for `tasm` live in `benches/`.
