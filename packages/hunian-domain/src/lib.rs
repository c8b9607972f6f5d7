//! Core types and pure logic for listing search, candidate fusion and answer evaluation.

pub mod answer;
pub mod attributes;
pub mod constraint;
pub mod extract;
pub mod filter;
pub mod fusion;
pub mod fuzzy;
pub mod greeting;
pub mod intent;
pub mod listing;
pub mod scoring;
pub mod truth;

mod error;

pub use error::{Error, Result};
