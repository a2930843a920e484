//! In-memory command executor for docsql.
//!
//! This crate provides a thread-safe, in-memory implementation of the
//! [`CommandExecutor`](docsql_core::executor::CommandExecutor) trait. It interprets the
//! `insert`, `update`, `delete` and `aggregate` command documents docsql produces, which
//! makes it the executor of choice for tests and local development.
//!
//! # Quick Start
//!
//! ```ignore
//! use docsql_core::executor::{CommandExecutor, ExecutorBuilder};
//! use docsql_memory::InMemoryExecutor;
//! use bson::doc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let executor = InMemoryExecutor::builder()
//!         .with_documents("books", [doc! { "_id": 1, "title": "War and Peace", "year": 1867 }])
//!         .build()
//!         .await?;
//!
//!     let deleted = executor
//!         .execute(doc! { "delete": "books", "deletes": [{ "q": { "_id": { "$eq": 1 } }, "limit": 0 }] })
//!         .await?
//!         .affected()?;
//!     assert_eq!(deleted, 1);
//!
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as docsql_memory;

pub mod evaluator;
pub mod executor;

pub use executor::{InMemoryExecutor, InMemoryExecutorBuilder};
