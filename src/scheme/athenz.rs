//! Athenz authentication: a locally signed principal token is exchanged with ZTS for a role
//! token, which is cached and refreshed ahead of expiry.

// crates.io
use base64::{
	Engine,
	alphabet::Alphabet,
	engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
};
use http::{Method, header::HeaderName};
use ring::{
	rand::SystemRandom,
	signature::{ECDSA_P256_SHA256_ASN1_SIGNING, EcdsaKeyPair, RSA_PKCS1_SHA256, RsaKeyPair},
};
use rustls_pki_types::PrivateKeyDer;
// self
use crate::{
	_prelude::*,
	error::{ConfigError, ConstructionError, CredentialError},
	obs::{self, AuthOperation},
	params::{self, AuthParams},
	provider::{AuthFuture, ClientCertificate, HttpAuthProvider, Lifecycle, Provider, ProviderState},
	source::{CredentialSource, Secret},
	transport::{self, HttpRequest, HttpResponse, HttpTransport, RoundTripper},
};

const SCHEME: &str = "athenz";
const PRINCIPAL_TOKEN_TTL: Duration = Duration::hours(1);
const REFRESH_WINDOW: Duration = Duration::minutes(30);
const MIN_EXPIRY_SECS: &str = "7200";
const MAX_EXPIRY_SECS: &str = "86400";
const YBASE64_ALPHABET: Alphabet =
	match Alphabet::new("ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789._") {
		Ok(alphabet) => alphabet,
		Err(_) => panic!("ybase64 alphabet is invalid"),
	};
/// Athenz's URL-safe base64 variant: `+/` become `._`, and `-` pads instead of `=`.
const YBASE64: GeneralPurpose = GeneralPurpose::new(
	&YBASE64_ALPHABET,
	GeneralPurposeConfig::new()
		.with_encode_padding(false)
		.with_decode_padding_mode(DecodePaddingMode::RequireNone),
);

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AthenzParams {
	tenant_domain: Option<String>,
	tenant_service: Option<String>,
	provider_domain: Option<String>,
	private_key: Option<String>,
	zts_url: Option<String>,
	#[serde(default = "default_key_id")]
	key_id: String,
	#[serde(default = "default_principal_header")]
	principal_header: String,
	#[serde(default = "default_role_header")]
	role_header: String,
}

fn default_key_id() -> String {
	"0".into()
}

fn default_principal_header() -> String {
	"Athenz-Principal-Auth".into()
}

fn default_role_header() -> String {
	"Athenz-Role-Auth".into()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RoleTokenResponse {
	token: String,
	expiry_time: i64,
}

#[derive(Clone, Debug)]
struct RoleToken {
	token: Secret,
	expires_at: OffsetDateTime,
}
impl RoleToken {
	fn is_fresh(&self, now: OffsetDateTime) -> bool {
		self.expires_at.checked_sub(REFRESH_WINDOW).is_some_and(|refresh_at| refresh_at > now)
	}
}

/// Private key used to sign principal tokens.
enum PrincipalSigner {
	Rsa(RsaKeyPair),
	Ecdsa(EcdsaKeyPair),
}
impl PrincipalSigner {
	/// Accepts PKCS#1 RSA keys and PKCS#8 RSA or P-256 keys.
	fn from_pem(pem: &[u8], source_name: &str) -> Result<Self, CredentialError> {
		let key = rustls_pemfile::private_key(&mut &pem[..])
			.map_err(|source| CredentialError::Pem { source_name: source_name.into(), source })?
			.ok_or_else(|| CredentialError::NoPrivateKey { source_name: source_name.into() })?;

		match key {
			PrivateKeyDer::Pkcs1(der) =>
				RsaKeyPair::from_der(der.secret_pkcs1_der()).map(Self::Rsa).map_err(unusable),
			PrivateKeyDer::Pkcs8(der) => {
				let der = der.secret_pkcs8_der();

				match RsaKeyPair::from_pkcs8(der) {
					Ok(key) => Ok(Self::Rsa(key)),
					Err(_) => EcdsaKeyPair::from_pkcs8(
						&ECDSA_P256_SHA256_ASN1_SIGNING,
						der,
						&SystemRandom::new(),
					)
					.map(Self::Ecdsa)
					.map_err(unusable),
				}
			},
			_ => Err(CredentialError::UnusableKey {
				reason: "only PKCS#1 and PKCS#8 keys are supported".into(),
			}),
		}
	}

	fn sign(&self, message: &[u8]) -> Result<Vec<u8>, CredentialError> {
		let rng = SystemRandom::new();

		match self {
			Self::Rsa(key) => {
				let mut signature = vec![0; key.public().modulus_len()];

				key.sign(&RSA_PKCS1_SHA256, &rng, message, &mut signature).map_err(unusable)?;

				Ok(signature)
			},
			Self::Ecdsa(key) =>
				key.sign(&rng, message).map(|signature| signature.as_ref().to_vec()).map_err(unusable),
		}
	}
}
impl Debug for PrincipalSigner {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match self {
			Self::Rsa(_) => f.write_str("PrincipalSigner::Rsa(<redacted>)"),
			Self::Ecdsa(_) => f.write_str("PrincipalSigner::Ecdsa(<redacted>)"),
		}
	}
}

/// Provider authenticating with an Athenz role token.
///
/// `init` loads the tenant's private key and fetches the first role token from ZTS. Later calls
/// reuse the cached token until it is within thirty minutes of expiry; concurrent refreshes
/// collapse into one ZTS request.
#[derive(Debug)]
pub struct AthenzProvider {
	tenant_domain: String,
	tenant_service: String,
	key_id: String,
	private_key: CredentialSource,
	token_url: Url,
	principal_header: HeaderName,
	role_header: HeaderName,
	signer: RwLock<Option<Arc<PrincipalSigner>>>,
	role_token: RwLock<Option<RoleToken>>,
	refresh: AsyncMutex<()>,
	lifecycle: Lifecycle,
	transport: HttpTransport,
}
impl AthenzProvider {
	/// Factory constructor; validates URLs and header names eagerly.
	pub(crate) fn construct(params: AuthParams) -> Result<Box<dyn Provider>> {
		let settings: AthenzParams = params.decode(SCHEME)?;
		let tenant_domain = params::required(SCHEME, "tenantDomain", settings.tenant_domain)?;
		let tenant_service = params::required(SCHEME, "tenantService", settings.tenant_service)?;
		let provider_domain = params::required(SCHEME, "providerDomain", settings.provider_domain)?;
		let private_key = params::required(SCHEME, "privateKey", settings.private_key)?;
		let private_key = CredentialSource::parse(&private_key)
			.map_err(|e| invalid("privateKey", e.to_string()))?;
		let zts_url = params::required(SCHEME, "ztsUrl", settings.zts_url)?;
		let token_url = role_token_url(&zts_url, &provider_domain)?;
		let principal_header = header_name("principalHeader", &settings.principal_header)?;
		let role_header = header_name("roleHeader", &settings.role_header)?;

		Ok(Box::new(Self {
			tenant_domain,
			tenant_service,
			key_id: settings.key_id,
			private_key,
			token_url,
			principal_header,
			role_header,
			signer: RwLock::new(None),
			role_token: RwLock::new(None),
			refresh: AsyncMutex::new(()),
			lifecycle: Lifecycle::new(SCHEME),
			transport: HttpTransport::default(),
		}))
	}

	async fn setup(&self) -> Result<()> {
		let pem = self.private_key.read()?;
		let signer = PrincipalSigner::from_pem(&pem, &self.private_key.describe())?;

		*self.signer.write() = Some(Arc::new(signer));

		self.role_token().await?;

		Ok(())
	}

	fn cached(&self, now: OffsetDateTime) -> Option<Secret> {
		self.role_token.read().as_ref().filter(|cached| cached.is_fresh(now)).map(|cached| cached.token.clone())
	}

	async fn role_token(&self) -> Result<Secret> {
		if let Some(token) = self.cached(OffsetDateTime::now_utc()) {
			return Ok(token);
		}

		let _singleflight = self.refresh.lock().await;

		if let Some(token) = self.cached(OffsetDateTime::now_utc()) {
			return Ok(token);
		}

		let signer = self
			.signer
			.read()
			.clone()
			.ok_or(Error::InvalidState { scheme: SCHEME, state: self.lifecycle.state() })?;
		let fresh = self.fetch_role_token(&signer).await?;
		let token = fresh.token.clone();

		*self.role_token.write() = Some(fresh);

		Ok(token)
	}

	fn principal_token(&self, signer: &PrincipalSigner, now: OffsetDateTime) -> Result<String> {
		let salt = rand::random::<[u8; 8]>().iter().map(|b| format!("{b:02x}")).collect::<String>();
		let unsigned = format!(
			"v=S1;d={};n={};k={};a={salt};t={};e={}",
			self.tenant_domain,
			self.tenant_service,
			self.key_id,
			now.unix_timestamp(),
			(now + PRINCIPAL_TOKEN_TTL).unix_timestamp(),
		);
		let signature = signer.sign(unsigned.as_bytes())?;

		Ok(format!("{unsigned};s={}", ybase64(&signature)))
	}

	async fn fetch_role_token(&self, signer: &PrincipalSigner) -> Result<RoleToken> {
		let principal = self.principal_token(signer, OffsetDateTime::now_utc())?;
		let request = http::Request::builder()
			.method(Method::GET)
			.uri(self.token_url.as_str())
			.body(Vec::new())
			.map_err(ConfigError::from)?;
		let request = transport::with_header(request, self.principal_header.clone(), &principal)?;
		let response = self.transport.dispatch(request).await?;
		let status = response.status();

		if !status.is_success() {
			return Err(CredentialError::TokenEndpoint {
				message: format!("ZTS responded with {status}"),
				status: Some(status.as_u16()),
			}
			.into());
		}

		let mut de = serde_json::Deserializer::from_slice(response.body());
		let body: RoleTokenResponse = serde_path_to_error::deserialize(&mut de).map_err(|source| {
			CredentialError::TokenResponseParse { source, status: Some(status.as_u16()) }
		})?;
		let expires_at = OffsetDateTime::from_unix_timestamp(body.expiry_time).map_err(|_| {
			CredentialError::TokenEndpoint {
				message: format!("ZTS returned an out-of-range expiry {}", body.expiry_time),
				status: Some(status.as_u16()),
			}
		})?;

		if body.token.is_empty() {
			return Err(CredentialError::EmptyToken.into());
		}

		Ok(RoleToken { token: Secret::new(body.token), expires_at })
	}
}
impl HttpAuthProvider for AthenzProvider {
	fn round_trip(&self, request: HttpRequest) -> AuthFuture<'_, HttpResponse> {
		Box::pin(obs::observe(SCHEME, AuthOperation::RoundTrip, async move {
			self.lifecycle.ensure_initialized()?;

			let token = self.role_token().await?;
			let request = transport::with_header(request, self.role_header.clone(), token.expose())?;

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
impl Provider for AthenzProvider {
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

			Ok(self.role_token().await?.expose().as_bytes().to_vec())
		}))
	}

	fn close(&self) -> Result<()> {
		self.lifecycle.close();

		*self.role_token.write() = None;
		*self.signer.write() = None;

		Ok(())
	}
}

fn invalid(key: &'static str, reason: impl Into<String>) -> ConstructionError {
	ConstructionError::InvalidValue { scheme: SCHEME, key, reason: reason.into() }
}

fn unusable(e: impl Display) -> CredentialError {
	CredentialError::UnusableKey { reason: e.to_string() }
}

fn header_name(key: &'static str, value: &str) -> Result<HeaderName, ConstructionError> {
	HeaderName::from_bytes(value.as_bytes()).map_err(|e| invalid(key, e.to_string()))
}

fn role_token_url(zts_url: &str, provider_domain: &str) -> Result<Url, ConstructionError> {
	let mut url = Url::parse(zts_url).map_err(|e| invalid("ztsUrl", e.to_string()))?;

	url.path_segments_mut()
		.map_err(|_| invalid("ztsUrl", "URL cannot carry a path"))?
		.pop_if_empty()
		.extend(["zts", "v1", "domain", provider_domain, "token"]);
	url.query_pairs_mut()
		.append_pair("minExpiryTime", MIN_EXPIRY_SECS)
		.append_pair("maxExpiryTime", MAX_EXPIRY_SECS);

	Ok(url)
}

fn ybase64(bytes: &[u8]) -> String {
	let mut encoded = YBASE64.encode(bytes);

	encoded.extend(std::iter::repeat_n('-', (3 - bytes.len() % 3) % 3));

	encoded
}
