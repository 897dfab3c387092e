//! MongoDB persistence for authenticated participations

pub mod mongo;
pub mod schemas;

pub use mongo::{redact_uri, IntoIndexes, MongoClient, MongoCollection, MutMetadata};
