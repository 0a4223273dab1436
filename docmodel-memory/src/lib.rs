//! In-memory store client for docmodel.
//!
//! This crate provides a [`MemoryStore`] implementation of the
//! [`StoreClient`](docmodel_core::client::StoreClient) trait, storing
//! storage maps in nested hash maps behind async-aware read-write locks.
//! It is the client of choice for tests and for schemas whose `meta`
//! names no real database.

#[allow(unused_extern_crates)]
extern crate self as docmodel_memory;

pub mod store;

pub use store::MemoryStore;
