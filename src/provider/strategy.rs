//! Classification of token endpoint failures.
//!
//! The OAuth client reduces a failed code exchange to a [`ProviderErrorContext`] and asks
//! the configured [`ProviderStrategy`] which [`ProviderErrorKind`] it belongs to. QQ plugs
//! in its numeric codes through [`crate::qq::QqProviderStrategy`]; everything else lands on
//! [`DefaultProviderStrategy`].

// self
use crate::{_prelude::*, provider::descriptor::ProviderCall};

/// Provider hooks consulted around the code exchange.
pub trait ProviderStrategy: Send + Sync {
	/// Decides which [`ProviderErrorKind`] a failed exchange belongs to.
	fn classify_token_error(&self, ctx: &ProviderErrorContext) -> ProviderErrorKind;

	/// Adds provider-specific parameters to the code exchange. No-op by default.
	fn augment_token_request(&self, _form: &mut BTreeMap<String, String>) {}
}

/// Coarse failure buckets the strategy maps onto [`Error`] variants.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProviderErrorKind {
	/// The code or token is bad, expired or already used.
	InvalidGrant,
	/// App id, app key or redirect registration was rejected.
	InvalidClient,
	/// The user did not grant the requested scope.
	InsufficientScope,
	/// Provider outage or throttling.
	Transient,
}

/// Facts about a failed exchange, free of any HTTP client types.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProviderErrorContext {
	/// Call that failed.
	pub call: ProviderCall,
	/// HTTP status, when a response arrived.
	pub http_status: Option<u16>,
	/// OAuth `error` field. QQ's numeric codes arrive here as strings.
	pub oauth_error: Option<String>,
	/// OAuth `error_description` field.
	pub error_description: Option<String>,
	/// Truncated body for answers that carried no OAuth fields.
	pub body_preview: Option<String>,
	/// Set when no response arrived at all.
	pub network_error: bool,
}
impl ProviderErrorContext {
	const BODY_PREVIEW_LIMIT: usize = 256;

	/// Empty context for `call`.
	pub fn new(call: ProviderCall) -> Self {
		Self {
			call,
			http_status: None,
			oauth_error: None,
			error_description: None,
			body_preview: None,
			network_error: false,
		}
	}

	/// Context for a request that never got a response.
	pub fn network_failure(call: ProviderCall) -> Self {
		Self { network_error: true, ..Self::new(call) }
	}

	/// Records the HTTP status.
	pub fn with_http_status(mut self, status: u16) -> Self {
		self.http_status = Some(status);

		self
	}

	/// Records the OAuth `error` field.
	pub fn with_oauth_error(mut self, error: impl Into<String>) -> Self {
		self.oauth_error = Some(error.into());

		self
	}

	/// Records the OAuth `error_description` field.
	pub fn with_error_description(mut self, description: impl Into<String>) -> Self {
		self.error_description = Some(description.into());

		self
	}

	/// Records a truncated copy of the response body.
	pub fn with_body_preview(mut self, body: impl Into<String>) -> Self {
		self.body_preview = Some(truncate_preview(body.into()));

		self
	}
}

/// RFC 6749 error codes first, then keywords in the description or body, then the
/// HTTP status. Network failures are always transient.
#[derive(Debug, Default)]
pub struct DefaultProviderStrategy;
impl ProviderStrategy for DefaultProviderStrategy {
	fn classify_token_error(&self, ctx: &ProviderErrorContext) -> ProviderErrorKind {
		if ctx.network_error {
			return ProviderErrorKind::Transient;
		}

		[ctx.oauth_error.as_deref(), ctx.error_description.as_deref()]
			.into_iter()
			.flatten()
			.find_map(|value| classify_keyword(value, str::eq_ignore_ascii_case))
			.or_else(|| {
				[ctx.error_description.as_deref(), ctx.body_preview.as_deref()]
					.into_iter()
					.flatten()
					.find_map(|text| {
						let lowered = text.to_ascii_lowercase();

						classify_keyword(&lowered, |text, keyword| text.contains(keyword))
					})
			})
			.unwrap_or_else(|| classify_status(ctx.http_status))
	}
}

// Ordered: earlier rows win when a body mentions several keywords.
const KEYWORDS: &[(&str, ProviderErrorKind)] = &[
	("invalid_grant", ProviderErrorKind::InvalidGrant),
	("access_denied", ProviderErrorKind::InvalidGrant),
	("invalid_client", ProviderErrorKind::InvalidClient),
	("unauthorized_client", ProviderErrorKind::InvalidClient),
	("insufficient_scope", ProviderErrorKind::InsufficientScope),
	("invalid_scope", ProviderErrorKind::InsufficientScope),
	("temporarily_unavailable", ProviderErrorKind::Transient),
	("server_error", ProviderErrorKind::Transient),
];

fn classify_keyword(text: &str, hit: impl Fn(&str, &str) -> bool) -> Option<ProviderErrorKind> {
	KEYWORDS.iter().find(|(keyword, _)| hit(text, keyword)).map(|(_, kind)| *kind)
}

fn classify_status(status: Option<u16>) -> ProviderErrorKind {
	match status {
		Some(400 | 404 | 410) => ProviderErrorKind::InvalidGrant,
		Some(401) => ProviderErrorKind::InvalidClient,
		Some(403) => ProviderErrorKind::InsufficientScope,
		_ => ProviderErrorKind::Transient,
	}
}

pub(crate) fn truncate_preview(body: String) -> String {
	let limit = ProviderErrorContext::BODY_PREVIEW_LIMIT;

	match body.char_indices().nth(limit) {
		Some((cut, _)) => format!("{}…", &body[..cut]),
		None => body,
	}
}
