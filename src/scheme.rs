//! Bundled authentication schemes.
//!
//! Each scheme owns its parameters after construction, tracks its lifecycle with
//! [`Lifecycle`](crate::provider::Lifecycle), and forwards signed requests through an
//! [`HttpTransport`](crate::transport::HttpTransport). `disabled`, `basic`, and `token` serve
//! static or file-backed credentials; `tls` serves client certificates; `athenz` and `oauth2`
//! fetch expiring tokens from a remote issuer and refresh them on demand.

pub mod athenz;
pub mod basic;
pub mod disabled;
pub mod oauth2;
pub mod tls;
pub mod token;

pub use self::oauth2::OAuth2Provider;
pub use athenz::AthenzProvider;
pub use basic::BasicProvider;
pub use disabled::DisabledProvider;
pub use tls::TlsProvider;
pub use token::TokenProvider;
