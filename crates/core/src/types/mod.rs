//! Core types for Shipquote.
//!
//! This module provides type-safe wrappers for the entities the rate engine
//! refers to, plus the persisted enums describing shipping configuration.

pub mod id;
pub mod kind;

pub use id::*;
pub use kind::{MethodKind, TableFactor, UnknownVariant};
