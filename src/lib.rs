//! Pluggable authentication for Pulsar clients: one provider contract that serves both the
//! broker's binary handshake and HTTP request signing, with schemes picked at runtime by name.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod error;
pub mod factory;
pub mod obs;
pub mod params;
pub mod provider;
pub mod scheme;
pub mod source;
pub mod transport;
#[cfg(any(test, feature = "test"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// self
	use crate::{
		error::TransportError,
		transport::{HttpRequest, HttpResponse, RoundTripFuture, RoundTripper},
	};

	/// Delegate that records every request it receives and answers `200 OK` with an empty body.
	#[derive(Clone, Debug, Default)]
	pub struct RecordingTransport {
		requests: Arc<Mutex<Vec<HttpRequest>>>,
	}
	impl RecordingTransport {
		/// Returns a snapshot of the requests observed so far.
		pub fn requests(&self) -> Vec<HttpRequest> {
			self.requests.lock().clone()
		}

		/// Returns the value of `header` on the most recent request, if any.
		pub fn last_header(&self, header: &str) -> Option<String> {
			self.requests
				.lock()
				.last()
				.and_then(|request| request.headers().get(header))
				.and_then(|value| value.to_str().ok())
				.map(str::to_owned)
		}
	}
	impl RoundTripper for RecordingTransport {
		fn round_trip(&self, request: HttpRequest) -> RoundTripFuture<'_> {
			self.requests.lock().push(request);

			Box::pin(async move {
				let mut response = HttpResponse::new(Vec::new());

				*response.status_mut() = http::StatusCode::OK;

				Ok(response)
			})
		}
	}

	/// Delegate that fails every request with a network error carrying `message`.
	#[derive(Clone, Debug)]
	pub struct FailingTransport {
		/// Message reported by the injected network failure.
		pub message: &'static str,
	}
	impl RoundTripper for FailingTransport {
		fn round_trip(&self, _request: HttpRequest) -> RoundTripFuture<'_> {
			let message = self.message;

			Box::pin(async move {
				Err(TransportError::network(std::io::Error::other(message)).into())
			})
		}
	}

	/// Builds a `GET` request for `uri` with an empty body.
	pub fn get_request(uri: &str) -> HttpRequest {
		http::Request::builder()
			.method(http::Method::GET)
			.uri(uri)
			.body(Vec::new())
			.expect("Failed to build test request.")
	}
}

mod _prelude {
	pub use std::{
		collections::BTreeMap,
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		path::PathBuf,
		pin::Pin,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::Deserialize;
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use factory::{Scheme, new_provider};
pub use http;
pub use provider::{ClientCertificate, HttpAuthProvider, Provider, ProviderState};
#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _, rcgen as _, tempfile as _, tokio as _};
