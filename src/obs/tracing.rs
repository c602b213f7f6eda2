// self
use crate::{_prelude::*, obs::FlowKind};

/// Future returned by [`FlowSpan::instrument`]; the bare future when `tracing` is off.
#[cfg(feature = "tracing")]
pub type InstrumentedFlow<F> = tracing::instrument::Instrumented<F>;
/// Future returned by [`FlowSpan::instrument`]; the bare future when `tracing` is off.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedFlow<F> = F;

/// `oauth2_qq.flow` span covering one login stage (redirect, code exchange, profile).
///
/// Carries `flow` (the [`FlowKind`] label) and `stage` (the strategy method). Without the
/// `tracing` feature the type is empty and every method is a passthrough.
#[derive(Clone, Debug)]
pub struct FlowSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl FlowSpan {
	/// Opens the span for `kind` at `stage`.
	#[cfg_attr(not(feature = "tracing"), allow(unused_variables))]
	pub fn new(kind: FlowKind, stage: &'static str) -> Self {
		Self {
			#[cfg(feature = "tracing")]
			span: tracing::info_span!("oauth2_qq.flow", flow = kind.as_str(), stage),
		}
	}

	/// Enters the span until the guard drops; for the synchronous redirect stage.
	pub fn entered(self) -> FlowSpanGuard {
		FlowSpanGuard {
			#[cfg(feature = "tracing")]
			_guard: self.span.entered(),
		}
	}

	/// Attaches the span to an async stage so no guard is held across `.await`.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedFlow<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			tracing::Instrument::instrument(fut, self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

/// Keeps a [`FlowSpan`] entered while alive.
pub struct FlowSpanGuard {
	#[cfg(feature = "tracing")]
	_guard: tracing::span::EnteredSpan,
}
impl Debug for FlowSpanGuard {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("FlowSpanGuard(..)")
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[tokio::test]
	async fn exchange_stage_passes_its_output_through() {
		let span = FlowSpan::new(FlowKind::TokenExchange, "exchange_code");
		let value = span.instrument(async { "TKN" }).await;

		assert_eq!(value, "TKN");
	}

	#[test]
	fn redirect_stage_guard_drops_cleanly() {
		let guard = FlowSpan::new(FlowKind::Authorization, "start_authorization").entered();

		assert_eq!(format!("{guard:?}"), "FlowSpanGuard(..)");
	}
}
