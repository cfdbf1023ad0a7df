//! Webstore Core - Shared types library.
//!
//! This crate provides common types used across the webstore theme engine:
//! - `theme` - Storefront behavior layer (cart, modal, checkout, auth)
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no HTTP clients. This keeps
//! it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs and money formatting

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
