//! HTTP transport primitives wrapped by providers.
//!
//! [`RoundTripper`] is the delegate a provider forwards signed requests to. [`HttpTransport`]
//! holds the single configured delegate (or none, meaning "use the default"), and
//! [`OAuth2HttpClient`] adapts any delegate to the `oauth2` crate so token exchanges travel the
//! same path as signed admin calls.

// std
#[cfg(feature = "reqwest")] use std::ops::Deref;
// crates.io
use http::header::{HeaderName, HeaderValue};
use oauth2::{AsyncHttpClient, HttpClientError};
// self
use crate::{
	_prelude::*,
	error::{ConfigError, TransportError},
	provider::ClientCertificate,
};

/// Request type exchanged with delegates.
pub type HttpRequest = http::Request<Vec<u8>>;
/// Response type produced by delegates.
pub type HttpResponse = http::Response<Vec<u8>>;
/// Boxed future returned by [`RoundTripper::round_trip`].
pub type RoundTripFuture<'a> = Pin<Box<dyn Future<Output = Result<HttpResponse>> + 'a + Send>>;

/// Request-dispatch delegate that providers wrap to inject authentication.
pub trait RoundTripper
where
	Self: Send + Sync,
{
	/// Dispatches `request` and resolves with the full response.
	fn round_trip(&self, request: HttpRequest) -> RoundTripFuture<'_>;

	/// Returns a copy of this delegate that presents `certificate` during TLS handshakes.
	///
	/// `Ok(None)` means the delegate cannot present client certificates at all; an `Err` means it
	/// can, but failed to load this one. The default implementation returns `Ok(None)`.
	fn with_client_certificate(
		&self,
		_certificate: &ClientCertificate,
	) -> Result<Option<Arc<dyn RoundTripper>>> {
		Ok(None)
	}
}

/// Holder for the single delegate a provider forwards requests through.
#[derive(Default)]
pub struct HttpTransport {
	delegate: RwLock<Option<Arc<dyn RoundTripper>>>,
	#[cfg(feature = "reqwest")]
	fallback: Mutex<Option<Arc<dyn RoundTripper>>>,
}
impl HttpTransport {
	/// Returns the configured delegate, if any.
	pub fn delegate(&self) -> Option<Arc<dyn RoundTripper>> {
		self.delegate.read().clone()
	}

	/// Replaces the configured delegate.
	pub fn replace(&self, delegate: Arc<dyn RoundTripper>) {
		*self.delegate.write() = Some(delegate);
	}

	/// Returns the configured delegate or, when none is set, the default transport.
	///
	/// Without the `reqwest` feature there is no default and this fails with
	/// [`ConfigError::NoTransport`].
	pub fn resolve(&self) -> Result<Arc<dyn RoundTripper>> {
		if let Some(delegate) = self.delegate() {
			return Ok(delegate);
		}

		#[cfg(feature = "reqwest")]
		{
			let mut fallback = self.fallback.lock();

			if let Some(delegate) = fallback.as_ref() {
				return Ok(Arc::clone(delegate));
			}

			let delegate: Arc<dyn RoundTripper> = Arc::new(ReqwestTransport::new()?);

			*fallback = Some(Arc::clone(&delegate));

			Ok(delegate)
		}
		#[cfg(not(feature = "reqwest"))]
		{
			Err(ConfigError::NoTransport.into())
		}
	}

	/// Forwards `request` through the resolved delegate.
	pub async fn dispatch(&self, request: HttpRequest) -> Result<HttpResponse> {
		let delegate = self.resolve()?;

		delegate.round_trip(request).await
	}
}
impl Debug for HttpTransport {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("HttpTransport").field("configured", &self.delegate.read().is_some()).finish()
	}
}

/// Sets `name: value` on `request`, replacing any previous value and marking it sensitive.
pub fn with_header(mut request: HttpRequest, name: HeaderName, value: &str) -> Result<HttpRequest> {
	let mut value = HeaderValue::from_str(value).map_err(ConfigError::from)?;

	value.set_sensitive(true);
	request.headers_mut().insert(name, value);

	Ok(request)
}

/// Thin wrapper around [`ReqwestClient`], used as the default delegate.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransport(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestTransport {
	/// Builds a transport around a freshly configured client.
	pub fn new() -> Result<Self> {
		let client = ReqwestClient::builder().build().map_err(ConfigError::http_client_build)?;

		Ok(Self(client))
	}

	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestTransport {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl Deref for ReqwestTransport {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl RoundTripper for ReqwestTransport {
	fn round_trip(&self, request: HttpRequest) -> RoundTripFuture<'_> {
		let client = self.0.clone();

		Box::pin(async move {
			let request = reqwest::Request::try_from(request).map_err(TransportError::from)?;
			let response = client.execute(request).await.map_err(TransportError::from)?;
			let status = response.status();
			let version = response.version();
			let headers = response.headers().to_owned();
			let body = response.bytes().await.map_err(TransportError::from)?;
			let mut response_new = HttpResponse::new(body.to_vec());

			*response_new.status_mut() = status;
			*response_new.version_mut() = version;
			*response_new.headers_mut() = headers;

			Ok(response_new)
		})
	}

	/// Builds a new client carrying `certificate` as its identity.
	///
	/// The new client starts from reqwest defaults; settings of the wrapped client are not carried
	/// over.
	fn with_client_certificate(
		&self,
		certificate: &ClientCertificate,
	) -> Result<Option<Arc<dyn RoundTripper>>> {
		let identity = reqwest::Identity::from_pem(&certificate.to_pem())
			.map_err(ConfigError::http_client_build)?;
		let client =
			ReqwestClient::builder().identity(identity).build().map_err(ConfigError::http_client_build)?;

		Ok(Some(Arc::new(Self(client))))
	}
}

/// Adapter that lets the `oauth2` crate send token requests through a [`RoundTripper`].
///
/// The HTTP status of the most recent response is captured so error mapping can report it.
pub struct OAuth2HttpClient {
	delegate: Arc<dyn RoundTripper>,
	last_status: Mutex<Option<u16>>,
}
impl OAuth2HttpClient {
	/// Wraps `delegate`.
	pub fn new(delegate: Arc<dyn RoundTripper>) -> Self {
		Self { delegate, last_status: Mutex::new(None) }
	}

	/// Returns the status of the most recent response, consuming it.
	pub fn take_status(&self) -> Option<u16> {
		self.last_status.lock().take()
	}
}
impl Debug for OAuth2HttpClient {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("OAuth2HttpClient(..)")
	}
}
impl<'c> AsyncHttpClient<'c> for OAuth2HttpClient {
	type Error = HttpClientError<Error>;
	type Future = Pin<Box<dyn Future<Output = Result<HttpResponse, Self::Error>> + 'c + Send>>;

	fn call(&'c self, request: HttpRequest) -> Self::Future {
		Box::pin(async move {
			self.take_status();

			let response =
				self.delegate.round_trip(request).await.map_err(|e| HttpClientError::Reqwest(Box::new(e)))?;

			*self.last_status.lock() = Some(response.status().as_u16());

			Ok(response)
		})
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use http::header::AUTHORIZATION;
	// self
	use super::*;
	use crate::_preludet::{FailingTransport, RecordingTransport, get_request};

	#[tokio::test]
	async fn dispatch_prefers_the_configured_delegate() {
		let transport = HttpTransport::default();
		let recorder = RecordingTransport::default();

		assert!(transport.delegate().is_none());

		transport.replace(Arc::new(recorder.clone()));

		let response = transport
			.dispatch(get_request("https://admin.example.com/admin/v2/clusters"))
			.await
			.expect("Recording delegate should answer.");

		assert_eq!(response.status(), http::StatusCode::OK);
		assert_eq!(recorder.requests().len(), 1);
		assert!(transport.delegate().is_some());
	}

	#[tokio::test]
	async fn dispatch_surfaces_delegate_errors() {
		let transport = HttpTransport::default();

		transport.replace(Arc::new(FailingTransport { message: "connection refused" }));

		let err = transport
			.dispatch(get_request("https://admin.example.com/"))
			.await
			.expect_err("Failing delegate should surface its error.");

		assert!(matches!(err, Error::Transport(TransportError::Network { .. })));
	}

	#[cfg(not(feature = "reqwest"))]
	#[test]
	fn resolve_without_default_transport_fails() {
		let transport = HttpTransport::default();

		assert!(matches!(transport.resolve(), Err(Error::Configuration(ConfigError::NoTransport))));
	}

	#[test]
	fn with_header_replaces_and_marks_sensitive() {
		let request = get_request("https://admin.example.com/");
		let request = with_header(request, AUTHORIZATION, "Bearer old").expect("Header should apply.");
		let request = with_header(request, AUTHORIZATION, "Bearer new").expect("Header should apply.");
		let values = request.headers().get_all(AUTHORIZATION).iter().collect::<Vec<_>>();

		assert_eq!(values.len(), 1);
		assert_eq!(values[0], "Bearer new");
		assert!(values[0].is_sensitive());
		assert!(with_header(get_request("https://admin.example.com/"), AUTHORIZATION, "bad\nvalue").is_err());
	}

	#[test]
	fn plain_delegates_cannot_present_certificates() {
		let certificate = ClientCertificate::new(
			vec![rustls_pki_types::CertificateDer::from(vec![0x30, 0x00])],
			rustls_pki_types::PrivateKeyDer::Pkcs8(vec![0x30, 0x00].into()),
		);
		let copy = RecordingTransport::default()
			.with_client_certificate(&certificate)
			.expect("Default implementation should not fail.");

		assert!(copy.is_none());
	}

	#[cfg(feature = "reqwest")]
	#[test]
	fn reqwest_reports_identity_failures() {
		let certificate = ClientCertificate::new(
			vec![rustls_pki_types::CertificateDer::from(vec![0x30, 0x00])],
			rustls_pki_types::PrivateKeyDer::Pkcs8(vec![0x01, 0x02, 0x03].into()),
		);
		let transport = ReqwestTransport::new().expect("Default client should build.");
		let err = transport
			.with_client_certificate(&certificate)
			.err()
			.expect("Unusable key material should fail the client build.");

		assert!(matches!(err, Error::Configuration(ConfigError::HttpClientBuild { .. })));
	}

	#[tokio::test]
	async fn oauth2_adapter_records_status() {
		let recorder = RecordingTransport::default();
		let client = OAuth2HttpClient::new(Arc::new(recorder.clone()));
		let response =
			client.call(get_request("https://issuer.example.com/token")).await.expect("Call should succeed.");

		assert_eq!(response.status().as_u16(), 200);
		assert_eq!(client.take_status(), Some(200));
		assert_eq!(client.take_status(), None);
		assert_eq!(recorder.requests().len(), 1);
	}
}
