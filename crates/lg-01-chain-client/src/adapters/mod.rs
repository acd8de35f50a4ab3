//! Chain client adapters.

pub mod sim;
