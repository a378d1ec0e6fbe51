//! commons-relay library
//!
//! A small HTTP relay that fetches a random or time-matched media file
//! (image, audio, or video) from the Wikimedia Commons API and streams its
//! raw bytes back to the caller.

pub mod commons;
pub mod config;
pub mod logging;
pub mod media;
pub mod server;
