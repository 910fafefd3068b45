//! Core business logic modules

pub mod normalize;

// Re-export commonly used types
pub use normalize::{canonicalize, normalize, normalize_rows};
