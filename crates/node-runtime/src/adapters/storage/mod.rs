//! Persistent storage adapters.

pub mod rocksdb_adapter;
