//! Schema object model shared by layers and the resolver

mod objects;

pub use objects::*;
