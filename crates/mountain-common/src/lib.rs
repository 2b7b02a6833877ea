//! # mountain-common
//!
//! Shared configuration model, error definitions, and constants used
//! across the mountain workspace.
//!
//! This crate is the leaf of the dependency graph: it depends on no other
//! internal crate and carries no OS-specific code.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod config;
pub mod constants;
pub mod error;
