//! Authentication module
//!
//! Bearer-token authentication against the identity provider's JWKS.
//!
//! ## Structure
//!
//! - `jwks`: key-set fetching and TTL cache
//! - `jwt`: token validation and decoded claims
//! - `extractors`: Axum extractor for authenticated users
//! - `helpers`: Pure helper functions (bearer extraction, fingerprints, HTTP client)
//!
//! ## Request Flow
//!
//! 1. Handler asks for `AuthenticatedUser` → bearer token read from `Authorization`
//! 2. `JwtValidator` resolves the signing key by `kid` from `JwksCache`
//! 3. Signature, lifetime, issuer and audience are checked → claims handed to the handler
//! 4. Any failure → 401 with `WWW-Authenticate: Bearer`

pub mod extractors;
pub mod helpers;
pub mod jwks;
pub mod jwt;

pub use extractors::{AuthError, AuthenticatedUser};
pub use helpers::{create_http_client, extract_bearer_token, BearerError};
pub use jwks::{JwksCache, JwksError, KeySet};
pub use jwt::{JwtValidator, TokenError, TokenPayload, ValidationOptions};
