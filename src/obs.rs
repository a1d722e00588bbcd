//! Optional observability helpers for provider operations.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `pulsar_auth.provider` with the `scheme` and
//!   `operation` fields, plus a `warn` event whenever an operation fails.
//! - Enable `metrics` to increment the `pulsar_auth_operation_total` counter for every
//!   attempt/success/failure, labeled by `scheme` + `operation` + `outcome`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Provider operations observed by the crate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AuthOperation {
	/// Factory construction of a provider.
	Construct,
	/// One-time provider setup.
	Init,
	/// Authentication data retrieval.
	Data,
	/// Client certificate retrieval.
	TlsCertificate,
	/// Signed HTTP request dispatch.
	RoundTrip,
}
impl AuthOperation {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			AuthOperation::Construct => "construct",
			AuthOperation::Init => "init",
			AuthOperation::Data => "data",
			AuthOperation::TlsCertificate => "tls_certificate",
			AuthOperation::RoundTrip => "round_trip",
		}
	}
}
impl Display for AuthOperation {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AuthOutcome {
	/// Entry to a provider operation.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl AuthOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			AuthOutcome::Attempt => "attempt",
			AuthOutcome::Success => "success",
			AuthOutcome::Failure => "failure",
		}
	}
}
impl Display for AuthOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Runs `fut` inside an operation span and records its outcome.
pub(crate) async fn observe<T, Fut>(
	scheme: &'static str,
	operation: AuthOperation,
	fut: Fut,
) -> Result<T>
where
	Fut: Future<Output = Result<T>>,
{
	let span = AuthSpan::new(scheme, operation);

	record_operation_outcome(scheme, operation, AuthOutcome::Attempt);

	let result = span.instrument(fut).await;

	record_result(scheme, operation, &result);

	result
}

/// Synchronous counterpart of [`observe`].
pub(crate) fn observe_sync<T>(
	scheme: &'static str,
	operation: AuthOperation,
	f: impl FnOnce() -> Result<T>,
) -> Result<T> {
	let _guard = AuthSpan::new(scheme, operation).entered();

	record_operation_outcome(scheme, operation, AuthOutcome::Attempt);

	let result = f();

	record_result(scheme, operation, &result);

	result
}

fn record_result<T>(scheme: &'static str, operation: AuthOperation, result: &Result<T>) {
	match result {
		Ok(_) => record_operation_outcome(scheme, operation, AuthOutcome::Success),
		Err(e) => {
			record_failure(scheme, operation, e);
			record_operation_outcome(scheme, operation, AuthOutcome::Failure);
		},
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn observe_sync_passes_results_through() {
		let ok = observe_sync("test", AuthOperation::Construct, || Ok(7));

		assert_eq!(ok.expect("Closure result should pass through."), 7);

		let err = observe_sync::<()>("test", AuthOperation::Construct, || {
			Err(Error::UnknownScheme { name: "x".into() })
		});

		assert!(matches!(err, Err(Error::UnknownScheme { .. })));
	}

	#[tokio::test]
	async fn observe_passes_results_through() {
		let value = observe("test", AuthOperation::Data, async { Ok(vec![1_u8]) })
			.await
			.expect("Future result should pass through.");

		assert_eq!(value, vec![1]);
	}
}
