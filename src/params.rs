//! Authentication parameters: the JSON object of string values supplied next to a scheme name,
//! and typed decoding into per-scheme settings.

// crates.io
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
// self
use crate::{_prelude::*, error::ConstructionError};

/// Owned string-to-string mapping handed to a scheme constructor.
///
/// No key is required at this level; each scheme validates its own. Empty values count as absent,
/// matching how Pulsar clients treat unset parameters.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AuthParams(BTreeMap<String, String>);
impl AuthParams {
	/// Parses `raw` as a JSON object whose values are all strings.
	///
	/// An empty (or whitespace-only) string and JSON `null` both yield an empty mapping. Anything
	/// else that is not an object of strings fails with [`Error::ParameterFormat`].
	pub fn parse(raw: &str) -> Result<Self> {
		if raw.trim().is_empty() {
			return Ok(Self::default());
		}

		let mut de = serde_json::Deserializer::from_str(raw);
		let map: Option<BTreeMap<String, String>> = serde_path_to_error::deserialize(&mut de)
			.map_err(|e| Error::ParameterFormat { path: e.path().to_string(), source: e.into_inner() })?;

		de.end().map_err(|source| Error::ParameterFormat { path: ".".into(), source })?;

		Ok(Self(map.unwrap_or_default()))
	}

	/// Returns the value for `key`, treating empty strings as absent.
	pub fn get(&self, key: &str) -> Option<&str> {
		self.0.get(key).map(String::as_str).filter(|value| !value.is_empty())
	}

	/// Returns the number of entries, empty values included.
	pub fn len(&self) -> usize {
		self.0.len()
	}

	/// Returns `true` when no entries are present.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// Decodes the non-empty entries into the scheme's typed settings.
	pub fn decode<T>(&self, scheme: &'static str) -> Result<T, ConstructionError>
	where
		T: DeserializeOwned,
	{
		let object = self
			.0
			.iter()
			.filter(|(_, value)| !value.is_empty())
			.map(|(key, value)| (key.clone(), Value::String(value.clone())))
			.collect::<Map<_, _>>();

		serde_path_to_error::deserialize(Value::Object(object))
			.map_err(|source| ConstructionError::InvalidParameters { scheme, source })
	}
}
impl FromIterator<(String, String)> for AuthParams {
	fn from_iter<I>(iter: I) -> Self
	where
		I: IntoIterator<Item = (String, String)>,
	{
		Self(iter.into_iter().collect())
	}
}

/// Unwraps a required setting, reporting `key` as missing when absent.
pub fn required<T>(scheme: &'static str, key: &'static str, value: Option<T>) -> Result<T, ConstructionError> {
	value.ok_or(ConstructionError::MissingParameter { scheme, key })
}
