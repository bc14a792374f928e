//! HTTP module containing client setup and the request facade.
//!
//! # Overview
//!
//! The HTTP module is organized into two components:
//!
//! - [`client`] - HTTP client creation with timeouts, proxy, headers, and
//!   tracing middleware
//! - [`facade`] - The [`facade::head`] and [`facade::get`] operations the
//!   executor drives, plus HTTP date and Content-Range parsing
//!
//! # Examples
//!
//! ```rust
//! use mule::http::{create_http_client, HttpClientConfig};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = create_http_client(HttpClientConfig::default())?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod facade;

pub use client::{create_http_client, HttpClientConfig};
pub use facade::{get, head, GetResult, HeadResult};
