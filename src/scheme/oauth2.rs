//! OAuth 2.0 client-credentials authentication.
//!
//! The issuer's token endpoint is discovered from its OpenID metadata during `init`; the grant
//! itself runs through the `oauth2` crate with the provider's own delegate as HTTP client, so
//! token requests and signed admin calls share one transport.

// crates.io
use http::{Method, header::{ACCEPT, AUTHORIZATION}};
use oauth2::{
	ClientId, ClientSecret, EndpointNotSet, EndpointSet, HttpClientError, RequestTokenError, Scope,
	TokenResponse, TokenUrl,
	basic::{BasicClient, BasicErrorResponse},
};
// self
use crate::{
	_prelude::*,
	error::{ConfigError, ConstructionError, CredentialError, TransportError},
	obs::{self, AuthOperation},
	params::{self, AuthParams},
	provider::{AuthFuture, ClientCertificate, HttpAuthProvider, Lifecycle, Provider, ProviderState},
	source::{CredentialSource, Secret},
	transport::{self, HttpRequest, HttpResponse, HttpTransport, OAuth2HttpClient, RoundTripper},
};

const SCHEME: &str = "oauth2";
// The broker validates OAuth2 access tokens with its token authentication method.
const AUTH_METHOD: &str = "token";
const CLIENT_CREDENTIALS: &str = "client_credentials";

type ConfiguredClient =
	BasicClient<EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OAuth2Params {
	#[serde(rename = "type", default = "default_flow")]
	flow: String,
	issuer_url: Option<String>,
	private_key: Option<String>,
	audience: Option<String>,
	scope: Option<String>,
	client_id: Option<String>,
}

fn default_flow() -> String {
	CLIENT_CREDENTIALS.into()
}

/// Credentials file issued to the client. Unknown fields are ignored.
#[derive(Deserialize)]
struct KeyFile {
	client_id: String,
	client_secret: String,
}

#[derive(Deserialize)]
struct IssuerMetadata {
	token_endpoint: String,
}

#[derive(Clone, Debug)]
struct CachedToken {
	token: Secret,
	expires_at: Option<OffsetDateTime>,
}
impl CachedToken {
	fn is_fresh(&self, now: OffsetDateTime) -> bool {
		self.expires_at.is_none_or(|expires_at| expires_at > now)
	}
}

/// Provider authenticating with an OAuth 2.0 access token obtained by the client-credentials
/// grant.
///
/// The token is cached until its `expires_in` elapses; tokens issued without `expires_in` are
/// kept for the provider's lifetime.
#[derive(Debug)]
pub struct OAuth2Provider {
	discovery_url: Url,
	private_key: CredentialSource,
	client_id: Option<String>,
	audience: Option<String>,
	scopes: Vec<String>,
	client: RwLock<Option<Arc<ConfiguredClient>>>,
	token: RwLock<Option<CachedToken>>,
	refresh: AsyncMutex<()>,
	lifecycle: Lifecycle,
	transport: HttpTransport,
}
impl OAuth2Provider {
	/// Factory constructor; requires `issuerUrl` and `privateKey`.
	pub(crate) fn construct(params: AuthParams) -> Result<Box<dyn Provider>> {
		let settings: OAuth2Params = params.decode(SCHEME)?;

		if settings.flow != CLIENT_CREDENTIALS {
			return Err(ConstructionError::UnsupportedFlow { scheme: SCHEME, flow: settings.flow }.into());
		}

		let issuer_url = params::required(SCHEME, "issuerUrl", settings.issuer_url)?;
		let discovery_url = discovery_url(&issuer_url)?;
		let private_key = params::required(SCHEME, "privateKey", settings.private_key)?;
		let private_key = CredentialSource::parse(&private_key).map_err(|e| {
			ConstructionError::InvalidValue { scheme: SCHEME, key: "privateKey", reason: e.to_string() }
		})?;
		let scopes = settings
			.scope
			.as_deref()
			.unwrap_or_default()
			.split_whitespace()
			.map(str::to_owned)
			.collect();

		Ok(Box::new(Self {
			discovery_url,
			private_key,
			client_id: settings.client_id,
			audience: settings.audience,
			scopes,
			client: RwLock::new(None),
			token: RwLock::new(None),
			refresh: AsyncMutex::new(()),
			lifecycle: Lifecycle::new(SCHEME),
			transport: HttpTransport::default(),
		}))
	}

	async fn setup(&self) -> Result<()> {
		let key_file = self.key_file()?;
		let token_url = self.discover_token_endpoint().await?;
		let client_id = self.client_id.clone().unwrap_or(key_file.client_id);
		let client = BasicClient::new(ClientId::new(client_id))
			.set_client_secret(ClientSecret::new(key_file.client_secret))
			.set_token_uri(token_url);

		*self.client.write() = Some(Arc::new(client));

		self.access_token().await?;

		Ok(())
	}

	fn key_file(&self) -> Result<KeyFile> {
		let bytes = self.private_key.read()?;
		let mut de = serde_json::Deserializer::from_slice(&bytes);

		Ok(serde_path_to_error::deserialize(&mut de)
			.map_err(|source| CredentialError::KeyFileFormat { source })?)
	}

	async fn discover_token_endpoint(&self) -> Result<TokenUrl> {
		let request = http::Request::builder()
			.method(Method::GET)
			.uri(self.discovery_url.as_str())
			.header(ACCEPT, "application/json")
			.body(Vec::new())
			.map_err(ConfigError::from)?;
		let response = self.transport.dispatch(request).await?;
		let status = response.status();

		if !status.is_success() {
			return Err(CredentialError::TokenEndpoint {
				message: format!("issuer metadata request returned {status}"),
				status: Some(status.as_u16()),
			}
			.into());
		}

		let mut de = serde_json::Deserializer::from_slice(response.body());
		let metadata: IssuerMetadata = serde_path_to_error::deserialize(&mut de).map_err(|source| {
			CredentialError::TokenResponseParse { source, status: Some(status.as_u16()) }
		})?;

		Ok(TokenUrl::new(metadata.token_endpoint).map_err(ConfigError::from)?)
	}

	fn cached(&self, now: OffsetDateTime) -> Option<Secret> {
		self.token.read().as_ref().filter(|cached| cached.is_fresh(now)).map(|cached| cached.token.clone())
	}

	async fn access_token(&self) -> Result<Secret> {
		if let Some(token) = self.cached(OffsetDateTime::now_utc()) {
			return Ok(token);
		}

		let _singleflight = self.refresh.lock().await;

		if let Some(token) = self.cached(OffsetDateTime::now_utc()) {
			return Ok(token);
		}

		let client = self
			.client
			.read()
			.clone()
			.ok_or(Error::InvalidState { scheme: SCHEME, state: self.lifecycle.state() })?;
		let fresh = self.exchange(&client).await?;
		let token = fresh.token.clone();

		*self.token.write() = Some(fresh);

		Ok(token)
	}

	async fn exchange(&self, client: &ConfiguredClient) -> Result<CachedToken> {
		let http_client = OAuth2HttpClient::new(self.transport.resolve()?);
		let mut request = client.exchange_client_credentials();

		for scope in &self.scopes {
			request = request.add_scope(Scope::new(scope.clone()));
		}
		if let Some(audience) = &self.audience {
			request = request.add_extra_param("audience", audience.clone());
		}

		let response = request
			.request_async(&http_client)
			.await
			.map_err(|e| map_request_error(e, http_client.take_status()))?;
		let now = OffsetDateTime::now_utc();
		let expires_at = response.expires_in().and_then(|lifetime| {
			let secs = i64::try_from(lifetime.as_secs()).unwrap_or(i64::MAX);

			now.checked_add(Duration::seconds(secs))
		});
		let token = response.access_token().secret();

		if token.is_empty() {
			return Err(CredentialError::EmptyToken.into());
		}

		Ok(CachedToken { token: Secret::new(token.as_str()), expires_at })
	}
}
impl HttpAuthProvider for OAuth2Provider {
	fn round_trip(&self, request: HttpRequest) -> AuthFuture<'_, HttpResponse> {
		Box::pin(obs::observe(SCHEME, AuthOperation::RoundTrip, async move {
			self.lifecycle.ensure_initialized()?;

			let token = self.access_token().await?;
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
impl Provider for OAuth2Provider {
	fn init(&self) -> AuthFuture<'_, ()> {
		Box::pin(obs::observe(SCHEME, AuthOperation::Init, async move {
			if !self.lifecycle.begin_init()? {
				return Ok(());
			}

			self.setup().await.map_err(|e| Error::initialization(SCHEME, e))?;
			self.lifecycle.finish_init()
		}))
	}

	fn name(&self) -> &'static str {
		AUTH_METHOD
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

			Ok(self.access_token().await?.expose().as_bytes().to_vec())
		}))
	}

	fn close(&self) -> Result<()> {
		self.lifecycle.close();

		*self.token.write() = None;
		*self.client.write() = None;

		Ok(())
	}
}

fn discovery_url(issuer_url: &str) -> Result<Url, ConstructionError> {
	let invalid = |reason: String| ConstructionError::InvalidValue {
		scheme: SCHEME,
		key: "issuerUrl",
		reason,
	};
	let mut url = Url::parse(issuer_url).map_err(|e| invalid(e.to_string()))?;

	url.path_segments_mut()
		.map_err(|_| invalid("URL cannot carry a path".into()))?
		.pop_if_empty()
		.extend([".well-known", "openid-configuration"]);

	Ok(url)
}

fn map_request_error(
	err: RequestTokenError<HttpClientError<Error>, BasicErrorResponse>,
	status: Option<u16>,
) -> Error {
	match err {
		RequestTokenError::ServerResponse(response) => {
			let message = match response.error_description() {
				Some(description) => format!("{}: {description}", response.error().as_ref()),
				None => response.error().as_ref().to_owned(),
			};

			CredentialError::TokenEndpoint { message, status }.into()
		},
		RequestTokenError::Request(err) => match err {
			// Delegate failures come back unchanged.
			HttpClientError::Reqwest(inner) => *inner,
			HttpClientError::Http(inner) => ConfigError::from(inner).into(),
			HttpClientError::Io(inner) => TransportError::Io(inner).into(),
			HttpClientError::Other(message) => CredentialError::TokenEndpoint { message, status }.into(),
			_ => CredentialError::TokenEndpoint { message: "unknown HTTP client failure".into(), status }
				.into(),
		},
		RequestTokenError::Parse(source, _body) =>
			CredentialError::TokenResponseParse { source, status }.into(),
		RequestTokenError::Other(message) => CredentialError::TokenEndpoint { message, status }.into(),
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::{
		_preludet::{RecordingTransport, get_request},
		transport::RoundTripFuture,
	};

	const KEY_FILE: &str =
		r#"data:application/json,{"type":"client_credentials","client_id":"pulsar-client","client_secret":"s3cret"}"#;

	/// Serves OpenID metadata and numbered access tokens; everything else is recorded.
	#[derive(Clone)]
	struct IssuerStub {
		expires_in: Option<u64>,
		token_status: u16,
		token_requests: Arc<Mutex<Vec<HttpRequest>>>,
		other: RecordingTransport,
	}
	impl IssuerStub {
		fn new(expires_in: Option<u64>) -> Self {
			Self {
				expires_in,
				token_status: 200,
				token_requests: Default::default(),
				other: RecordingTransport::default(),
			}
		}

		fn issued(&self) -> usize {
			self.token_requests.lock().len()
		}
	}
	impl RoundTripper for IssuerStub {
		fn round_trip(&self, request: HttpRequest) -> RoundTripFuture<'_> {
			let path = request.uri().path().to_owned();
			let (status, body) = match path.as_str() {
				"/.well-known/openid-configuration" => (
					200,
					serde_json::json!({
						"issuer": "https://issuer.example.com",
						"token_endpoint": "https://issuer.example.com/oauth/token",
					}),
				),
				"/oauth/token" => {
					let issued = {
						let mut requests = self.token_requests.lock();

						requests.push(request);

						requests.len()
					};

					if self.token_status == 200 {
						let mut body = serde_json::json!({
							"access_token": format!("access-{issued}"),
							"token_type": "Bearer",
						});

						if let Some(expires_in) = self.expires_in {
							body["expires_in"] = expires_in.into();
						}

						(200, body)
					} else {
						(
							self.token_status,
							serde_json::json!({
								"error": "invalid_client",
								"error_description": "unknown client",
							}),
						)
					}
				},
				_ => return self.other.round_trip(request),
			};

			Box::pin(async move {
				let mut response = HttpResponse::new(body.to_string().into_bytes());

				*response.status_mut() =
					http::StatusCode::from_u16(status).expect("Stub status should be valid.");
				response
					.headers_mut()
					.insert(http::header::CONTENT_TYPE, "application/json".parse().expect("Static header."));

				Ok(response)
			})
		}
	}

	fn params(pairs: &[(&str, &str)]) -> AuthParams {
		pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
	}

	fn base_params() -> AuthParams {
		params(&[
			("type", "client_credentials"),
			("issuerUrl", "https://issuer.example.com"),
			("privateKey", KEY_FILE),
			("audience", "urn:pulsar:cluster"),
			("scope", "produce consume"),
		])
	}

	#[tokio::test]
	async fn exchanges_client_credentials_through_the_delegate() {
		let provider = OAuth2Provider::construct(base_params()).expect("OAuth2 params should construct.");
		let issuer = IssuerStub::new(Some(3600));

		provider.with_transport(Arc::new(issuer.clone())).expect("Delegate should be accepted.");
		provider.init().await.expect("OAuth2 provider should initialize.");

		assert_eq!(provider.name(), "token");
		assert_eq!(provider.data().await.expect("Token should be cached."), b"access-1");
		assert_eq!(issuer.issued(), 1);

		let requests = issuer.token_requests.lock().clone();
		let form = String::from_utf8(requests[0].body().clone()).expect("Form body should be UTF-8.");

		assert!(form.contains("grant_type=client_credentials"));
		assert!(form.contains("audience=urn%3Apulsar%3Acluster"));
		assert!(form.contains("scope=produce+consume"));
		assert!(
			requests[0]
				.headers()
				.get(AUTHORIZATION)
				.and_then(|value| value.to_str().ok())
				.is_some_and(|value| value.starts_with("Basic "))
		);

		provider
			.round_trip(get_request("https://admin.example.com/admin/v2/tenants"))
			.await
			.expect("Signed request should dispatch.");

		assert_eq!(issuer.other.last_header("authorization").as_deref(), Some("Bearer access-1"));
	}

	#[tokio::test]
	async fn expired_tokens_are_refreshed() {
		let provider = OAuth2Provider::construct(base_params()).expect("OAuth2 params should construct.");
		let issuer = IssuerStub::new(Some(0));

		provider.with_transport(Arc::new(issuer.clone())).expect("Delegate should be accepted.");
		provider.init().await.expect("OAuth2 provider should initialize.");

		assert_eq!(provider.data().await.expect("Token should be refreshed."), b"access-2");
		assert_eq!(issuer.issued(), 2);
	}

	#[tokio::test]
	async fn tokens_without_expiry_never_refresh() {
		let provider = OAuth2Provider::construct(base_params()).expect("OAuth2 params should construct.");
		let issuer = IssuerStub::new(None);

		provider.with_transport(Arc::new(issuer.clone())).expect("Delegate should be accepted.");
		provider.init().await.expect("OAuth2 provider should initialize.");

		for _ in 0..3 {
			assert_eq!(provider.data().await.expect("Token should be cached."), b"access-1");
		}
		assert_eq!(issuer.issued(), 1);
	}

	#[tokio::test]
	async fn endpoint_rejections_fail_init() {
		let provider = OAuth2Provider::construct(base_params()).expect("OAuth2 params should construct.");
		let issuer = IssuerStub { token_status: 401, ..IssuerStub::new(Some(3600)) };

		provider.with_transport(Arc::new(issuer)).expect("Delegate should be accepted.");

		let err = provider.init().await.expect_err("Rejected grant should fail init.");
		let source = match err {
			Error::Initialization { scheme: "oauth2", source } => source,
			other => panic!("Unexpected error: {other:?}"),
		};

		assert!(matches!(
			*source,
			Error::CredentialUnavailable(CredentialError::TokenEndpoint { status: Some(401), ref message })
				if message.contains("unknown client")
		));
	}

	#[test]
	fn unsupported_flows_and_bad_urls_are_rejected() {
		let err = OAuth2Provider::construct(params(&[
			("type", "authorization_code"),
			("issuerUrl", "https://issuer.example.com"),
			("privateKey", KEY_FILE),
		]))
		.expect_err("Only client credentials are supported.");

		assert!(matches!(
			err,
			Error::Construction(ConstructionError::UnsupportedFlow { scheme: "oauth2", ref flow })
				if flow == "authorization_code"
		));

		let err = OAuth2Provider::construct(params(&[("issuerUrl", "::"), ("privateKey", KEY_FILE)]))
			.expect_err("Invalid issuer URL should be rejected.");

		assert!(matches!(
			err,
			Error::Construction(ConstructionError::InvalidValue { key: "issuerUrl", .. })
		));
	}

	#[test]
	fn discovery_url_appends_well_known_path() {
		for (issuer, expected) in [
			("https://issuer.example.com", "https://issuer.example.com/.well-known/openid-configuration"),
			("https://issuer.example.com/", "https://issuer.example.com/.well-known/openid-configuration"),
			(
				"https://issuer.example.com/realms/pulsar",
				"https://issuer.example.com/realms/pulsar/.well-known/openid-configuration",
			),
		] {
			assert_eq!(discovery_url(issuer).expect("Issuer should be accepted.").as_str(), expected);
		}
	}
}
