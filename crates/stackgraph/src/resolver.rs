//! Caller-address resolution
//!
//! Generation needs exactly one piece of runtime data: the public address
//! of the machine producing the template. The lookup itself lives outside
//! this crate behind [`AddressResolver`].

use crate::error::Result;
use crate::network::NetworkAddress;

/// Source of the caller's current public address
///
/// Implementations fail with `Error::Resolution` on network failure or a
/// malformed response. Retrying is the implementation's business.
pub trait AddressResolver {
    fn resolve(&self) -> Result<NetworkAddress>;
}

/// Resolver returning a fixed, already known address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaticResolver {
    address: NetworkAddress,
}

impl StaticResolver {
    pub fn new(address: NetworkAddress) -> Self {
        Self { address }
    }
}

impl AddressResolver for StaticResolver {
    fn resolve(&self) -> Result<NetworkAddress> {
        Ok(self.address)
    }
}

impl<F> AddressResolver for F
where
    F: Fn() -> Result<NetworkAddress>,
{
    fn resolve(&self) -> Result<NetworkAddress> {
        self()
    }
}
