//! Common test utilities for mindstream integration tests
//!
//! Fixtures for wiring an API over scripted backends, plus seeded random
//! maps for property-style merge checks.

#![allow(dead_code)]

pub mod fixtures;
pub mod random_maps;

pub use fixtures::{api_over, chunk, heuristic_config, nodes_json, texts};
pub use random_maps::{random_batch, random_map, VOCAB};
