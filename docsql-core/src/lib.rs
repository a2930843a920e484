//! Core abstractions for translating relational ORM statements into document database commands.
//!
//! This crate is the core of the docsql project and provides:
//!
//! - **Relational statement trees** ([`sql`]) - The input model and its visitor protocol
//! - **Value exchange** ([`exchange`]) - Typed results out of value-less visitor methods
//! - **Streaming writers** ([`writer`]) - Event sinks that render command trees to BSON or JSON
//! - **Entity metadata** ([`metadata`]) - Table/collection and column/field lookups
//! - **Value codec** ([`value`]) - Domain values and their BSON wire form
//! - **Command execution** ([`executor`]) - Traits for backends that run rendered commands
//! - **Configuration** ([`config`]) - Connection and mapping settings
//! - **Error handling** ([`error`]) - Error types and result types
//!
//! Dialect crates such as `docsql-mongodb` build on these pieces to implement the
//! actual translation.

#[allow(unused_extern_crates)]
extern crate self as docsql_core;

pub mod config;
pub mod error;
pub mod exchange;
pub mod executor;
pub mod metadata;
pub mod sql;
pub mod value;
pub mod writer;
