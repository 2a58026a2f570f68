//! Sampling and autoregressive generation for charnn
//!
//! This crate provides:
//! - Top-N truncated categorical sampling
//! - Seed priming and token-by-token generation over any [`charnn_model::StatefulModel`]

pub mod generate;
pub mod sampler;

pub use generate::{generate_text, generated_lines, GenerateError, Generation};
pub use sampler::{sample_from_probs, select_index, truncate_top_n, SampleError, DEFAULT_TOP_N};
