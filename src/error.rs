//! Error types shared by the factory, the provider contract, and the bundled schemes.

// self
use crate::{_prelude::*, provider::ProviderState};

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Authentication parameters are not a JSON object of string values.
	#[error("Authentication parameters are malformed at `{path}`.")]
	ParameterFormat {
		/// Path of the offending value (`.` for the document itself).
		path: String,
		/// Underlying JSON failure.
		#[source]
		source: serde_json::Error,
	},
	/// No scheme is registered under the requested name.
	#[error("Invalid auth provider '{name}'.")]
	UnknownScheme {
		/// Name as supplied by the caller.
		name: String,
	},
	/// Scheme-specific constructor rejected its parameters.
	#[error(transparent)]
	Construction(#[from] ConstructionError),
	/// One-time provider setup failed.
	#[error("Provider `{scheme}` failed to initialize.")]
	Initialization {
		/// Scheme name of the failing provider.
		scheme: &'static str,
		/// Underlying failure.
		#[source]
		source: Box<Error>,
	},
	/// No valid credential can currently be produced.
	#[error(transparent)]
	CredentialUnavailable(#[from] CredentialError),
	/// Local configuration problem.
	#[error(transparent)]
	Configuration(#[from] ConfigError),
	/// Provider was used outside its initialized window.
	#[error("Provider `{scheme}` is {state}.")]
	InvalidState {
		/// Scheme name of the provider.
		scheme: &'static str,
		/// Lifecycle state observed at call time.
		state: ProviderState,
	},
	/// Transport failure reported by the HTTP delegate.
	#[error(transparent)]
	Transport(#[from] TransportError),
}
impl Error {
	/// Wraps `source` as an initialization failure of `scheme`.
	pub fn initialization(scheme: &'static str, source: impl Into<Error>) -> Self {
		Self::Initialization { scheme, source: Box::new(source.into()) }
	}
}

/// Failures raised while a scheme builds a provider from its parameters.
#[derive(Debug, ThisError)]
pub enum ConstructionError {
	/// A required parameter is absent or empty.
	#[error("Scheme `{scheme}` requires the `{key}` parameter.")]
	MissingParameter {
		/// Scheme name.
		scheme: &'static str,
		/// Missing parameter key.
		key: &'static str,
	},
	/// Parameters could not be decoded into the scheme's typed settings.
	#[error("Scheme `{scheme}` received invalid parameters.")]
	InvalidParameters {
		/// Scheme name.
		scheme: &'static str,
		/// Decoding failure, including the offending key.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// A parameter is present but its value is unusable.
	#[error("Scheme `{scheme}` parameter `{key}` is invalid: {reason}.")]
	InvalidValue {
		/// Scheme name.
		scheme: &'static str,
		/// Offending parameter key.
		key: &'static str,
		/// Human-readable reason.
		reason: String,
	},
	/// The requested credential flow is not supported by the scheme.
	#[error("Scheme `{scheme}` does not support the `{flow}` flow.")]
	UnsupportedFlow {
		/// Scheme name.
		scheme: &'static str,
		/// Requested flow label.
		flow: String,
	},
}

/// Failures that prevent a provider from producing credential material.
#[derive(Debug, ThisError)]
pub enum CredentialError {
	/// Credential file could not be read.
	#[error("Credential file `{}` could not be read.", .path.display())]
	Io {
		/// File that failed to load.
		path: PathBuf,
		/// Underlying I/O failure.
		#[source]
		source: std::io::Error,
	},
	/// Inline `data:` payload could not be decoded.
	#[error("Inline credential payload is not valid base64.")]
	InlineDecode(#[from] base64::DecodeError),
	/// Inline `data:` URI lacks the `,` separating metadata from payload.
	#[error("Inline credential URI is missing its payload separator.")]
	InlineFormat,
	/// PEM content could not be parsed.
	#[error("PEM content in `{source_name}` is malformed.")]
	Pem {
		/// Human-readable source description.
		source_name: String,
		/// Underlying parsing failure.
		#[source]
		source: std::io::Error,
	},
	/// Token source resolved to an empty value.
	#[error("Empty token credentials.")]
	EmptyToken,
	/// PEM source holds no certificates.
	#[error("No certificates found in `{source_name}`.")]
	NoCertificates {
		/// Human-readable source description.
		source_name: String,
	},
	/// PEM source holds no private key.
	#[error("No private key found in `{source_name}`.")]
	NoPrivateKey {
		/// Human-readable source description.
		source_name: String,
	},
	/// Private key material cannot be used for signing.
	#[error("Private key is unusable: {reason}.")]
	UnusableKey {
		/// Human-readable reason.
		reason: String,
	},
	/// Credential file content is not in the expected shape.
	#[error("Credential file is malformed.")]
	KeyFileFormat {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// Token endpoint refused to issue a credential.
	#[error("Token endpoint rejected the request: {message}.")]
	TokenEndpoint {
		/// Endpoint- or crate-supplied message.
		message: String,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// Token endpoint responded with a body that could not be parsed.
	#[error("Token endpoint returned a malformed response.")]
	TokenResponseParse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
}
impl CredentialError {
	/// Wraps an I/O failure for the credential at `path`.
	pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
		Self::Io { path: path.into(), source }
	}
}

/// Configuration failures raised while wiring transports.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// Provider refused the supplied transport delegate.
	#[error("Provider `{scheme}` rejected the transport: {reason}.")]
	TransportRejected {
		/// Scheme name.
		scheme: &'static str,
		/// Human-readable reason.
		reason: &'static str,
	},
	/// No delegate is configured and no default transport is compiled in.
	#[error("No HTTP transport is configured.")]
	NoTransport,
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(#[from] http::Error),
	/// Header value contains bytes that are not allowed in HTTP headers.
	#[error("Header value is invalid.")]
	HeaderValue(#[from] http::header::InvalidHeaderValue),
	/// Endpoint URL cannot be parsed or joined.
	#[error("Endpoint URL is invalid.")]
	InvalidUrl(#[from] url::ParseError),
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while dispatching the request.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while dispatching the request.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}
