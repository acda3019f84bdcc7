//! Marigold Core - Shared domain types.
//!
//! This crate provides common types used across all Marigold components:
//! - `api` - The storefront REST backend
//! - `cli` - Command-line tools for migrations and management
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no
//! database access, no HTTP clients. This keeps it lightweight and allows
//! it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, emails, money, and
//!   order statuses
//! - [`reminder`] - Event reminder bucketing

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod reminder;
pub mod types;

pub use reminder::ReminderBucket;
pub use types::*;
