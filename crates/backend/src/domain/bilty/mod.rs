pub mod document;
pub mod relational;
pub mod service;
pub(crate) mod snapshot;
pub mod store;
