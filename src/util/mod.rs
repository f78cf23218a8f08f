//! Utility functions
//!
//! String transcoding between the narrow (UTF-8) and wide (UTF-16) encodings.

pub mod unicode;

pub use unicode::{WideString, narrow_to_wide, wide_to_narrow};
