//! Collaborator traits.

mod production;

pub use production::*;
