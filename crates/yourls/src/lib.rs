//! mlink-yourls: YOURLS adapter for mlink
//!
//! Implements the Shortener trait from mlink-core against the YOURLS
//! HTTP/JSON API.

pub mod client;

pub use client::YourlsClient;
