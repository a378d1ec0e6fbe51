//! Wikimedia Commons upstream API integration

pub mod client;
pub mod types;

pub use client::{CommonsClient, QueryError, QueryOptions};
pub use types::{MediaItem, MediaType};
