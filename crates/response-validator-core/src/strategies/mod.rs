//! Format-specific validation strategies.
//!
//! Each strategy returns `Ok(())` for a conforming payload and an error
//! describing the first problem otherwise. Folding errors into a boolean is
//! the validator's job, not theirs.

pub mod json;
pub mod text;
pub mod xml;
