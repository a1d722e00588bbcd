//! No-op provider used when no authentication is configured.

// self
use crate::{
	_prelude::*,
	obs::{self, AuthOperation},
	params::AuthParams,
	provider::{AuthFuture, ClientCertificate, HttpAuthProvider, Lifecycle, Provider, ProviderState},
	transport::{HttpRequest, HttpResponse, HttpTransport, RoundTripper},
};

const SCHEME: &str = "none";

/// Provider that sends no credentials and forwards HTTP requests untouched.
#[derive(Debug)]
pub struct DisabledProvider {
	lifecycle: Lifecycle,
	transport: HttpTransport,
}
impl DisabledProvider {
	pub(crate) fn new() -> Self {
		Self { lifecycle: Lifecycle::new(SCHEME), transport: HttpTransport::default() }
	}

	/// Factory constructor; any parameters are ignored.
	pub(crate) fn construct(_params: AuthParams) -> Result<Box<dyn Provider>> {
		Ok(Box::new(Self::new()))
	}
}
impl HttpAuthProvider for DisabledProvider {
	fn round_trip(&self, request: HttpRequest) -> AuthFuture<'_, HttpResponse> {
		Box::pin(obs::observe(SCHEME, AuthOperation::RoundTrip, async move {
			self.lifecycle.ensure_initialized()?;
			self.transport.dispatch(request).await
		}))
	}

	fn transport(&self) -> Option<Arc<dyn RoundTripper>> {
		self.transport.delegate()
	}

	fn with_transport(&self, delegate: Arc<dyn RoundTripper>) -> Result<()> {
		self.transport.replace(delegate);

		Ok(())
	}
}
impl Provider for DisabledProvider {
	fn init(&self) -> AuthFuture<'_, ()> {
		Box::pin(async move { self.lifecycle.initialize() })
	}

	fn name(&self) -> &'static str {
		SCHEME
	}

	fn state(&self) -> ProviderState {
		self.lifecycle.state()
	}

	fn tls_certificate(&self) -> Result<Option<ClientCertificate>> {
		self.lifecycle.ensure_initialized()?;

		Ok(None)
	}

	fn data(&self) -> AuthFuture<'_, Vec<u8>> {
		Box::pin(async move {
			self.lifecycle.ensure_initialized()?;

			Ok(Vec::new())
		})
	}

	fn close(&self) -> Result<()> {
		self.lifecycle.close();

		Ok(())
	}
}
