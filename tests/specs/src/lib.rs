// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end scenario tests against `lsh-core` with fake `Clock`/
//! `ContextReader` collaborators and no live broker — the literal scenarios
//! from spec.md §8, plus a handful of the round-trip and universally
//! quantified properties from the same section.
