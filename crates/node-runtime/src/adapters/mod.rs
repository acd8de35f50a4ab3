//! Runtime-owned adapters for the subsystem ports.

pub mod storage;
