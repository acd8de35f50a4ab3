//! # Leadgate Test Suite
//!
//! Cross-subsystem integration tests. The harness wires the full
//! gateway stack (in-memory store, simulated chain, real enclave
//! signer, real services) and drives it block by block.

pub mod harness;

#[cfg(test)]
mod integration;
