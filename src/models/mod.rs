// src/models/mod.rs

pub mod location;
pub mod occupancy;
pub mod order;

pub use location::*;
pub use occupancy::*;
pub use order::*;
