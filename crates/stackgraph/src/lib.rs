//! # Stackgraph
//!
//! Builds the provisioning template for a single virtual machine that
//! configures itself with a configuration-management playbook on boot.
//!
//! ## Core Concepts
//!
//! - **ResourceGraph**: write-once registry of parameters, resources and
//!   outputs. Every cross-reference is checked when it is declared.
//! - **PropertyValue**: tagged property value (literal, reference,
//!   attribute lookup, join, base64) rendered natively by the serializer
//! - **FrozenGraph**: read-only view handed to [`serialize`]
//! - **AddressResolver**: injected source of the caller's public address,
//!   used to scope ingress to a single host
//!
//! ## Example
//!
//! ```
//! use stackgraph::{StackConfig, StaticResolver, generate};
//!
//! let resolver = StaticResolver::new("203.0.113.7".parse().unwrap());
//! let document = generate(&StackConfig::default(), &resolver).unwrap();
//! let json = document.to_json_pretty().unwrap();
//! assert!(json.contains("203.0.113.7/32"));
//! ```

pub mod bootstrap;
pub mod error;
pub mod graph;
pub mod identity;
pub mod network;
pub mod policy;
pub mod resolver;
pub mod serializer;
pub mod stack;
pub mod types;

// Re-export main types at crate root
pub use bootstrap::{BootstrapMode, BootstrapScript};
pub use error::{Error, ErrorCategory, Result};
pub use graph::{FrozenGraph, ResourceGraph};
pub use identity::{IdentityGraph, IdentityRefs};
pub use network::{IngressRule, NetworkAddress, NetworkPolicy};
pub use policy::{Effect, PolicyDocument, Principal, Statement};
pub use resolver::{AddressResolver, StaticResolver};
pub use serializer::{Document, serialize};
pub use stack::{StackConfig, build_stack, generate};
pub use types::{
    Output, Parameter, ParameterRef, Properties, PropertyValue, Resource, ResourceKind,
    ResourceRef, properties,
};
