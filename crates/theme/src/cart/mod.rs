//! Cart state, drawer, and add-to-cart orchestration.

pub mod drawer;
pub mod manager;
pub mod orchestrator;

pub use drawer::CartDrawer;
pub use manager::CartManager;
pub use orchestrator::{AddOutcome, CartActions};
