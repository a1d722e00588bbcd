// self
use crate::obs::{AuthOperation, AuthOutcome};

/// Records an operation outcome via the global metrics recorder (when enabled).
pub fn record_operation_outcome(scheme: &'static str, operation: AuthOperation, outcome: AuthOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"pulsar_auth_operation_total",
			"scheme" => scheme,
			"operation" => operation.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (scheme, operation, outcome);
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn record_operation_outcome_noop_without_metrics() {
		record_operation_outcome("tls", AuthOperation::TlsCertificate, AuthOutcome::Failure);
	}
}
