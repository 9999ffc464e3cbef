//! # Warband Development Tools
//!
//! Command-line tools for development:
//! - Data validators for the promotion and unit type tables

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod validate;
