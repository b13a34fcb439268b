//! Bearer-token authentication against an external OpenID Connect provider.

pub mod claims;
pub mod oidc;
