//! Token models issued by the provider's token endpoint.

pub mod grant;
pub mod secret;
