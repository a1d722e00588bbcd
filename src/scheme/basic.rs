//! HTTP basic authentication (`userId` + `password`).

// crates.io
use base64::{Engine, engine::general_purpose::STANDARD};
use http::header::AUTHORIZATION;
// self
use crate::{
	_prelude::*,
	obs::{self, AuthOperation},
	params::{self, AuthParams},
	provider::{AuthFuture, ClientCertificate, HttpAuthProvider, Lifecycle, Provider, ProviderState},
	source::Secret,
	transport::{self, HttpRequest, HttpResponse, HttpTransport, RoundTripper},
};

const SCHEME: &str = "basic";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BasicParams {
	user_id: Option<String>,
	password: Option<String>,
}

/// Provider sending `userId:password` to the broker and an `Authorization: Basic` header over
/// HTTP.
#[derive(Debug)]
pub struct BasicProvider {
	command_token: Secret,
	http_token: Secret,
	lifecycle: Lifecycle,
	transport: HttpTransport,
}
impl BasicProvider {
	/// Factory constructor; requires non-empty `userId` and `password`.
	pub(crate) fn construct(params: AuthParams) -> Result<Box<dyn Provider>> {
		let settings: BasicParams = params.decode(SCHEME)?;
		let user_id = params::required(SCHEME, "userId", settings.user_id)?;
		let password = params::required(SCHEME, "password", settings.password)?;
		let command_token = format!("{user_id}:{password}");
		let http_token = format!("Basic {}", STANDARD.encode(&command_token));

		Ok(Box::new(Self {
			command_token: Secret::new(command_token),
			http_token: Secret::new(http_token),
			lifecycle: Lifecycle::new(SCHEME),
			transport: HttpTransport::default(),
		}))
	}
}
impl HttpAuthProvider for BasicProvider {
	fn round_trip(&self, request: HttpRequest) -> AuthFuture<'_, HttpResponse> {
		Box::pin(obs::observe(SCHEME, AuthOperation::RoundTrip, async move {
			self.lifecycle.ensure_initialized()?;

			let request = transport::with_header(request, AUTHORIZATION, self.http_token.expose())?;

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
impl Provider for BasicProvider {
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

			Ok(self.command_token.expose().as_bytes().to_vec())
		})
	}

	fn close(&self) -> Result<()> {
		self.lifecycle.close();

		Ok(())
	}
}
