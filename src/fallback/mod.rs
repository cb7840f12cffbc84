//! Fallback resolution for failed or silent providers.
//!
//! When a provider returns `Error` or `Unknown`, the resolver consults a
//! fixed matrix of substitutes and heals the entry from the first usable
//! one, either already present in the verdict map or fetched on demand
//! through a [`VerdictSource`].

mod matrix;
mod resolver;

pub use matrix::fallback_candidates;
pub use resolver::{FallbackResolver, Substitution, VerdictSource};
