// SPDX-FileCopyrightText: 2026 Delve Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Delve integration tests.
//!
//! Provides mock adapters and test harness infrastructure for fast,
//! deterministic, CI-runnable tests without external services.
//!
//! # Components
//!
//! - [`MemoryStore`] - In-memory session store with fault injection
//! - [`MockBackend`] - Research backend with scripted results and call gates
//! - [`TestHarness`] - A running assistant over temp SQLite storage

pub mod harness;
pub mod memory_store;
pub mod mock_backend;

pub use harness::{TestHarness, collect_until_terminal};
pub use memory_store::{MemoryStore, StoreOp};
pub use mock_backend::{Gate, MockBackend, sample_analysis, sample_links};
