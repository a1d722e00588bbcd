// self
use crate::{_prelude::*, obs::AuthOperation};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedOperation<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedOperation<F> = F;

/// A span builder used by provider operations.
#[derive(Clone, Debug)]
pub struct AuthSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl AuthSpan {
	/// Creates a new span tagged with the provided scheme + operation.
	pub fn new(scheme: &'static str, operation: AuthOperation) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span =
				tracing::info_span!("pulsar_auth.provider", scheme, operation = operation.as_str());

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (scheme, operation);

			Self {}
		}
	}

	/// Enters the span for synchronous sections.
	pub fn entered(self) -> AuthSpanGuard {
		#[cfg(feature = "tracing")]
		{
			AuthSpanGuard { guard: self.span.entered() }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = self;

			AuthSpanGuard {}
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedOperation<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

/// RAII guard returned by [`AuthSpan::entered`].
pub struct AuthSpanGuard {
	#[cfg(feature = "tracing")]
	#[allow(dead_code)]
	guard: tracing::span::EnteredSpan,
}
impl Debug for AuthSpanGuard {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("AuthSpanGuard(..)")
	}
}

/// Emits a `warn` event describing a failed operation (when tracing is enabled).
pub fn record_failure(scheme: &'static str, operation: AuthOperation, error: &Error) {
	#[cfg(feature = "tracing")]
	{
		tracing::warn!(scheme, operation = operation.as_str(), error = %error, "Provider operation failed.");
	}

	#[cfg(not(feature = "tracing"))]
	{
		let _ = (scheme, operation, error);
	}
}
