//! MongoDB translation backend for docsql.
//!
//! This crate turns relational statement trees into MongoDB database commands and,
//! with the `driver` feature (on by default), runs them through the official driver.
//!
//! - [`ast`] - the command tree: filters, pipeline stages, documents and root commands
//! - [`translate`] - [`MongoTranslator`], the relational walker producing command trees
//! - [`bind`] - substitution of parameter values while rendering
//! - [`executor`] - [`MongoDbExecutor`], a [`CommandExecutor`](docsql_core::executor::CommandExecutor)
//!   backed by a MongoDB deployment
//!
//! # Example
//!
//! ```ignore
//! use docsql_core::{executor::ExecutorBuilder, value::DefaultValueCodec};
//! use docsql_mongodb::{MongoDbExecutor, MongoTranslator};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let executor = MongoDbExecutor::builder("mongodb://localhost:27017", "library")
//!         .build()
//!         .await?;
//!
//!     let command = MongoTranslator::new(&metadata, DefaultValueCodec).translate(&statement)?;
//!     let result = executor.execute(command.to_bound_document(&parameters)?).await?;
//!
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as docsql_mongodb;

pub mod ast;
pub mod bind;
#[cfg(feature = "driver")]
pub mod executor;
pub mod translate;

pub use ast::Command;
pub use bind::BindingWriter;
#[cfg(feature = "driver")]
pub use executor::{MongoDbExecutor, MongoDbExecutorBuilder};
pub use translate::MongoTranslator;
