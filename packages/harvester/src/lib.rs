//! SRU Harvester - Harvest records from SRU (Search/Retrieve via URL) servers.
//!
//! This crate sends `searchRetrieve` and `explain` requests to an SRU
//! endpoint, pages through result sets lazily and converts each record
//! into a nested [`StructuredValue`](xml::StructuredValue).
//!
//! # Example
//!
//! ```
//! use sru_harvester::config::{HttpMethod, SruVersion};
//! use sru_harvester::ClientConfig;
//!
//! let config = ClientConfig::new("https://sru.example.org/sru")
//!     .with_http_method("POST".parse::<HttpMethod>().unwrap())
//!     .with_version(SruVersion::V1_2);
//! assert!(config.validate().is_ok());
//! assert!("PUT".parse::<HttpMethod>().is_err());
//! ```
//!
//! # Architecture
//!
//! The harvester is organized into several modules:
//!
//! - [`config`]: Configuration constants, protocol versions and validation
//! - [`types`]: Request parameters and search requests
//! - [`error`]: Error types and Result alias
//! - [`http`]: HTTP transport
//! - [`response`]: Response envelope
//! - [`harvester`]: Request execution with retries and error detection
//! - [`iterator`]: Paging record iterator
//! - [`models`]: Record, explain and echoed request models
//! - [`xml`]: XML utilities and tree-to-value conversion
//! - [`client`]: Client facade
//! - [`output`]: JSON, YAML and XML output
//! - [`cli`]: Command-line interface

pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod harvester;
pub mod http;
pub mod iterator;
pub mod models;
pub mod output;
pub mod response;
pub mod types;
pub mod xml;

#[cfg(test)]
mod testing;

// Re-export commonly used items
pub use client::SruClient;
pub use config::{ClientConfig, HttpMethod, SruVersion};
pub use error::{ProtocolError, ProtocolErrorKind, Result, SruError};
pub use iterator::{Advance, RecordIterator};
pub use models::{EchoedRequest, Explain, Record};
pub use response::ResponseEnvelope;
pub use types::{RequestParameters, SearchRequest};
