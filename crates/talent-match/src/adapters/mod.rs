//! Implementations of the marketplace ports.

pub mod hosted;
pub mod memory;
pub mod resend;

pub use hosted::{HostedFileStore, HostedIdentityProvider, HostedStore};
pub use memory::{
    InMemoryFileStore, InMemoryMarketplaceStore, OutboxTransport, StaticIdentityProvider,
};
pub use resend::ResendTransport;
