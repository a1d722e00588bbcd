//! Credential material locations (`data:` URIs, `file:` URIs, plain paths) and the redacting
//! [`Secret`] wrapper that keeps resolved material out of logs.

// crates.io
use base64::{Engine, engine::general_purpose::STANDARD};
// self
use crate::{_prelude::*, error::CredentialError};

/// Redacted secret wrapper keeping sensitive material out of logs.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);
impl Secret {
	/// Wraps a new secret string.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Returns the inner value. Callers must avoid logging this string.
	pub fn expose(&self) -> &str {
		&self.0
	}
}
impl Debug for Secret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("Secret").field(&"<redacted>").finish()
	}
}
impl Display for Secret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}

/// Location of credential material referenced by a scheme parameter.
///
/// Parameters accept `data:[<mediatype>][;base64],<payload>` for inline material, `file://` or
/// `file:` URIs, and bare filesystem paths. Files are read on every [`read`](Self::read) so
/// rotated credentials are picked up without rebuilding the provider.
#[derive(Clone, PartialEq, Eq)]
pub enum CredentialSource {
	/// Material embedded in the parameter itself.
	Inline(Vec<u8>),
	/// Material stored on disk.
	File(PathBuf),
}
impl CredentialSource {
	/// Parses a parameter value into a credential location.
	pub fn parse(value: &str) -> Result<Self, CredentialError> {
		if let Some(rest) = value.strip_prefix("data:") {
			let (meta, payload) = rest.split_once(',').ok_or(CredentialError::InlineFormat)?;
			let bytes = if meta.ends_with(";base64") {
				STANDARD.decode(payload.trim())?
			} else {
				payload.as_bytes().to_vec()
			};

			return Ok(Self::Inline(bytes));
		}

		let path = value.strip_prefix("file://").or_else(|| value.strip_prefix("file:")).unwrap_or(value);

		Ok(Self::File(PathBuf::from(path)))
	}

	/// Reads the referenced material.
	pub fn read(&self) -> Result<Vec<u8>, CredentialError> {
		match self {
			Self::Inline(bytes) => Ok(bytes.clone()),
			Self::File(path) => std::fs::read(path).map_err(|e| CredentialError::io(path, e)),
		}
	}

	/// Returns a log-safe description of the location.
	pub fn describe(&self) -> String {
		match self {
			Self::Inline(_) => "inline data".into(),
			Self::File(path) => path.display().to_string(),
		}
	}
}
impl Debug for CredentialSource {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match self {
			Self::Inline(_) => f.debug_tuple("Inline").field(&"<redacted>").finish(),
			Self::File(path) => f.debug_tuple("File").field(path).finish(),
		}
	}
}
