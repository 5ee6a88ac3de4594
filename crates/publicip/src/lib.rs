//! # publicip
//!
//! Looks up the public address of the current machine.
//!
//! Each request is bounded by a timeout and transient failures are retried
//! once by default. [`IpifyResolver`] implements
//! [`stackgraph::AddressResolver`], so it can be handed straight to
//! [`stackgraph::generate`].
//!
//! ## Example
//!
//! ```no_run
//! use publicip::{IpifyResolver, LookupOptions};
//! use std::time::Duration;
//!
//! let resolver = IpifyResolver::with_options(
//!     LookupOptions::default().timeout(Duration::from_secs(3)),
//! );
//! let document = stackgraph::generate(&stackgraph::StackConfig::default(), &resolver)
//!     .expect("generation failed");
//! println!("{}", document.to_json_pretty().unwrap());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod ipify;
pub mod retry;
pub mod types;

pub use error::{Error, ErrorCategory, Result};
pub use ipify::{IpifyResolver, parse_body};
pub use retry::with_retry;
pub use types::{DEFAULT_ENDPOINT, LookupOptions, RetryConfig};
