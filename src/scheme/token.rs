//! Bearer token authentication, from an inline value or a file re-read on every use.

// crates.io
use http::header::AUTHORIZATION;
// self
use crate::{
	_prelude::*,
	error::{ConstructionError, CredentialError},
	obs::{self, AuthOperation},
	params::AuthParams,
	provider::{AuthFuture, ClientCertificate, HttpAuthProvider, Lifecycle, Provider, ProviderState},
	source::{CredentialSource, Secret},
	transport::{self, HttpRequest, HttpResponse, HttpTransport, RoundTripper},
};

const SCHEME: &str = "token";

#[derive(Debug, Deserialize)]
struct TokenParams {
	token: Option<String>,
	file: Option<String>,
}

#[derive(Debug)]
enum TokenSource {
	Static(Secret),
	File(CredentialSource),
}
impl TokenSource {
	fn resolve(&self) -> Result<Secret, CredentialError> {
		let token = match self {
			Self::Static(secret) => secret.clone(),
			Self::File(source) => {
				let bytes = source.read()?;

				Secret::new(String::from_utf8_lossy(&bytes).trim())
			},
		};

		if token.expose().is_empty() {
			return Err(CredentialError::EmptyToken);
		}

		Ok(token)
	}
}

/// Provider presenting a bearer token to the broker and as `Authorization: Bearer` over HTTP.
///
/// File-backed tokens are read on each call so externally rotated tokens take effect on the next
/// handshake or request.
#[derive(Debug)]
pub struct TokenProvider {
	source: TokenSource,
	lifecycle: Lifecycle,
	transport: HttpTransport,
}
impl TokenProvider {
	/// Factory constructor; `token` takes precedence over `file`.
	pub(crate) fn construct(params: AuthParams) -> Result<Box<dyn Provider>> {
		let settings: TokenParams = params.decode(SCHEME)?;
		let source = match (settings.token, settings.file) {
			(Some(token), _) => TokenSource::Static(Secret::new(token)),
			(None, Some(file)) => TokenSource::File(CredentialSource::parse(&file).map_err(|e| {
				ConstructionError::InvalidValue { scheme: SCHEME, key: "file", reason: e.to_string() }
			})?),
			(None, None) =>
				return Err(ConstructionError::MissingParameter { scheme: SCHEME, key: "token" }.into()),
		};

		Ok(Box::new(Self {
			source,
			lifecycle: Lifecycle::new(SCHEME),
			transport: HttpTransport::default(),
		}))
	}
}
impl HttpAuthProvider for TokenProvider {
	fn round_trip(&self, request: HttpRequest) -> AuthFuture<'_, HttpResponse> {
		Box::pin(obs::observe(SCHEME, AuthOperation::RoundTrip, async move {
			self.lifecycle.ensure_initialized()?;

			let token = self.source.resolve()?;
			let request =
				transport::with_header(request, AUTHORIZATION, &format!("Bearer {}", token.expose()))?;

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
impl Provider for TokenProvider {
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
		Box::pin(obs::observe(SCHEME, AuthOperation::Data, async move {
			self.lifecycle.ensure_initialized()?;

			Ok(self.source.resolve()?.expose().as_bytes().to_vec())
		}))
	}

	fn close(&self) -> Result<()> {
		self.lifecycle.close();

		Ok(())
	}
}
