// Waitroom Infrastructure - Token Adapter
// Implements: TokenIssuer

mod opaque;

pub use opaque::{OpaqueTokenIssuer, DEFAULT_TOKEN_TTL_HOURS};
