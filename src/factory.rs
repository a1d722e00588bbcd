//! Runtime selection of an authentication scheme by name.
//!
//! Every scheme is registered once in a static table together with the names it answers to: a
//! short alias and the fully qualified class name used by Pulsar's reference client. Lookup is
//! exact and case-sensitive.

// self
use crate::{
	_prelude::*,
	obs::{self, AuthOperation},
	params::AuthParams,
	provider::Provider,
	scheme::{AthenzProvider, BasicProvider, DisabledProvider, OAuth2Provider, TlsProvider, TokenProvider},
};

/// Scheme constructor receiving the decoded parameters.
pub type Constructor = fn(AuthParams) -> Result<Box<dyn Provider>>;

/// Bundled authentication schemes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Scheme {
	/// No authentication.
	Disabled,
	/// Mutual TLS with a client certificate.
	Tls,
	/// Static or file-backed bearer token.
	Token,
	/// Athenz role token.
	Athenz,
	/// OAuth 2.0 client credentials.
	OAuth2,
	/// HTTP basic credentials.
	Basic,
}
impl Scheme {
	/// All bundled schemes, in registration order.
	pub const ALL: [Scheme; 6] =
		[Scheme::Disabled, Scheme::Tls, Scheme::Token, Scheme::Athenz, Scheme::OAuth2, Scheme::Basic];

	/// Returns a stable label suitable for logs and metrics.
	pub const fn as_str(self) -> &'static str {
		match self {
			Scheme::Disabled => "disabled",
			Scheme::Tls => "tls",
			Scheme::Token => "token",
			Scheme::Athenz => "athenz",
			Scheme::OAuth2 => "oauth2",
			Scheme::Basic => "basic",
		}
	}

	/// Names the factory accepts for this scheme.
	pub fn names(self) -> &'static [&'static str] {
		self.entry().names
	}

	/// Looks up the scheme registered under `name`.
	pub fn resolve(name: &str) -> Option<Self> {
		SCHEMES
			.iter()
			.find(|entry| entry.names.iter().any(|candidate| *candidate == name))
			.map(|entry| entry.scheme)
	}

	/// Builds a provider of this scheme from already parsed parameters.
	pub fn construct(self, params: AuthParams) -> Result<Box<dyn Provider>> {
		let construct = self.entry().construct;

		obs::observe_sync(self.as_str(), AuthOperation::Construct, || construct(params))
	}

	fn entry(self) -> &'static SchemeEntry {
		// Every variant has exactly one entry; the table test keeps the two in sync.
		&SCHEMES[self as usize]
	}
}
impl Display for Scheme {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

struct SchemeEntry {
	scheme: Scheme,
	names: &'static [&'static str],
	construct: Constructor,
}

static SCHEMES: [SchemeEntry; 6] = [
	SchemeEntry { scheme: Scheme::Disabled, names: &[""], construct: DisabledProvider::construct },
	SchemeEntry {
		scheme: Scheme::Tls,
		names: &["tls", "org.apache.pulsar.client.impl.auth.AuthenticationTls"],
		construct: TlsProvider::construct,
	},
	SchemeEntry {
		scheme: Scheme::Token,
		names: &["token", "org.apache.pulsar.client.impl.auth.AuthenticationToken"],
		construct: TokenProvider::construct,
	},
	SchemeEntry {
		scheme: Scheme::Athenz,
		names: &["athenz", "org.apache.pulsar.client.impl.auth.AuthenticationAthenz"],
		construct: AthenzProvider::construct,
	},
	SchemeEntry {
		scheme: Scheme::OAuth2,
		names: &["oauth2", "org.apache.pulsar.client.impl.auth.oauth2.AuthenticationOAuth2"],
		construct: OAuth2Provider::construct,
	},
	SchemeEntry {
		scheme: Scheme::Basic,
		names: &["basic", "org.apache.pulsar.client.impl.auth.AuthenticationBasic"],
		construct: BasicProvider::construct,
	},
];

/// Builds a provider from a scheme `name` and its JSON `params`.
///
/// `params` must be a JSON object of string values; an empty string or `null` means "no
/// parameters". Parameters are decoded before the name is looked up, so a malformed document is
/// reported as [`Error::ParameterFormat`] even for unknown names. The returned provider is
/// uninitialized; call [`Provider::init`] before use.
///
/// ```
/// let provider = pulsar_auth::new_provider("token", r#"{"token":"abc"}"#)?;
///
/// assert_eq!(provider.name(), "token");
/// # Ok::<_, pulsar_auth::error::Error>(())
/// ```
pub fn new_provider(name: &str, params: &str) -> Result<Box<dyn Provider>> {
	let params = AuthParams::parse(params)?;
	let scheme = Scheme::resolve(name).ok_or_else(|| Error::UnknownScheme { name: name.into() })?;

	scheme.construct(params)
}
