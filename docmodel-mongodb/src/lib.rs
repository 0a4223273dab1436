//! MongoDB store client for docmodel.
//!
//! This crate provides a MongoDB-backed implementation of the
//! [`StoreClient`](docmodel_core::client::StoreClient) trait, plus a
//! [`ConnectionPool`] that hands out one shared driver client per
//! `(host, port)` pair, so schemas whose `meta` declares the same address
//! share a connection.
//!
//! To use this client, include the `mongodb` feature in your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! docmodel = { version = "x.y.z", features = ["mongodb"] }
//! ```
//!
//! # Example
//!
//! ```ignore
//! use docmodel::mongodb::ConnectionPool;
//! use docmodel_core::schema::DbAddress;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let pool = ConnectionPool::new();
//!     let store = pool
//!         .store_for(&DbAddress::new("allotments", "localhost", 27017))
//!         .await?;
//!
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as docmodel_mongodb;

pub mod pool;
pub mod store;

pub use pool::ConnectionPool;
pub use store::MongoStore;
