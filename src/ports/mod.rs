//! Ports layer: Trait definitions for external operations.
//!
//! Following Hexagonal Architecture, these traits define the boundary
//! between the services and whatever holds the trained model.

mod model;

pub use model::{Classifier, Model, Regressor};
