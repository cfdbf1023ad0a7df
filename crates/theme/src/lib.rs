//! Webstore theme behavior layer.
//!
//! This crate implements the interactive behavior of an e-commerce
//! storefront theme as an embeddable engine: cart drawer, cart state
//! synchronization, add-to-cart modal with variant resolution, checkout
//! price polling, delivery-zone selection, and the login modal. The REST
//! backend (`/webstoreapi/*`) is an external collaborator reached through
//! [`api::ApiClient`]; every UI surface is an explicit view-model owned by
//! [`ui::Page`] rather than ambient global state.
//!
//! Cross-component synchronization uses the typed broadcast bus in
//! [`events`]; controllers are generic over [`api::StorefrontApi`] so tests
//! can inject a scripted backend.

#![cfg_attr(not(test), forbid(unsafe_code))]
// Controllers are consumed through generics, not trait objects, and the
// engine is single-threaded by design, so no Send bound is wanted here.
#![allow(async_fn_in_trait)]

pub mod api;
pub mod auth;
pub mod cart;
pub mod checkout;
pub mod config;
pub mod error;
pub mod events;
pub mod modal;
pub mod sections;
pub mod session;
pub mod telemetry;
pub mod ui;
pub mod zones;
