//! Common utilities shared across the to-do service crates.

#![warn(clippy::pedantic)]

/// Module for JWT utilities (unverified decoding, size limits, time claims)
pub mod jwt;
