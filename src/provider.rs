//! The authentication provider contract shared by every scheme.
//!
//! A provider serves two channels with one configured credential: the broker's binary handshake
//! ([`Provider::data`], [`Provider::tls_certificate`]) and HTTP admin calls, where it acts as a
//! request-signing transport ([`HttpAuthProvider`]). Callers drive the lifecycle
//! `Uninitialized → Initialized → Closed`; credential calls outside the initialized window fail
//! with [`Error::InvalidState`].

pub mod certificate;
pub mod lifecycle;

pub use certificate::*;
pub use lifecycle::*;

// self
use crate::{
	_prelude::*,
	transport::{HttpRequest, HttpResponse, RoundTripper},
};

/// Boxed future returned by asynchronous provider operations.
pub type AuthFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + 'a + Send>>;

/// HTTP request-signing half of the provider contract.
///
/// Implementations wrap a single [`RoundTripper`] delegate and inject their credential into each
/// outbound request. Replacing the delegate is a configuration-time operation; requests already in
/// flight keep the delegate they started with.
pub trait HttpAuthProvider
where
	Self: Send + Sync,
{
	/// Signs `request` and forwards it through the current delegate.
	///
	/// Delegate failures are returned unchanged.
	fn round_trip(&self, request: HttpRequest) -> AuthFuture<'_, HttpResponse>;

	/// Returns the configured delegate, or `None` when the default transport is in use.
	fn transport(&self) -> Option<Arc<dyn RoundTripper>>;

	/// Replaces the delegate used by [`round_trip`](Self::round_trip).
	///
	/// Fails with [`Error::Configuration`] when the scheme cannot work with `delegate`.
	fn with_transport(&self, delegate: Arc<dyn RoundTripper>) -> Result<()>;
}

/// Full provider contract consumed by the broker connection layer and HTTP clients.
///
/// `data`, `tls_certificate`, and `round_trip` may be called concurrently once `init` has
/// completed. `init` and `close` bracket all other use and are not expected to race with it.
pub trait Provider
where
	Self: HttpAuthProvider + Debug,
{
	/// Performs one-time setup. Repeated calls on an initialized provider are no-ops.
	fn init(&self) -> AuthFuture<'_, ()>;

	/// Stable, non-empty identifier sent to the broker as the authentication method.
	fn name(&self) -> &'static str;

	/// Current lifecycle state.
	fn state(&self) -> ProviderState;

	/// Loads the client certificate chain, or `None` when the scheme does not use one.
	fn tls_certificate(&self) -> Result<Option<ClientCertificate>>;

	/// Returns the credential payload for the broker handshake, refreshing it when needed.
	fn data(&self) -> AuthFuture<'_, Vec<u8>>;

	/// Releases held resources. Safe before `init`; repeated calls return `Ok(())`.
	fn close(&self) -> Result<()>;
}
