//! FeedLink Library
//!
//! Price-retrieval client for push (on-chain aggregator) and pull
//! (attestation service) oracle feeds

pub mod config;
pub mod oracle;
pub mod types;
