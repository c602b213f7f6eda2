//! Crate-level error types shared across the strategy, transport, and profile resolver.

// self
use crate::{_prelude::*, provider::ProviderCall};

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Boxed error used for transport sources and verify callback failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration problem (missing credentials, invalid endpoints).
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Temporary upstream failure; retry with backoff.
	#[error(transparent)]
	Transient(#[from] TransientError),
	/// Transport failure reaching the provider.
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Provider answered with a body that could not be understood.
	#[error(transparent)]
	Parse(#[from] ParseError),

	/// Requested scopes exceed what was granted.
	#[error("Token lacks the required scopes: {reason}.")]
	InsufficientScope {
		/// Provider- or strategy-supplied reason string.
		reason: String,
	},
	/// Provider rejected the grant (e.g., bad or reused authorization code).
	#[error("Provider rejected the grant: {reason}.")]
	InvalidGrant {
		/// Provider- or strategy-supplied reason string.
		reason: String,
	},
	/// Client authentication failed or credentials are malformed.
	#[error("Client authentication failed: {reason}.")]
	InvalidClient {
		/// Provider- or strategy-supplied reason string.
		reason: String,
	},
	/// Provider API reported an application-level error code.
	#[error("Provider returned error {code}: {message}.")]
	Provider {
		/// Provider-specific numeric error code.
		code: i64,
		/// Provider-supplied message.
		message: String,
	},
	/// The application's verify callback failed.
	#[error("Verify callback failed.")]
	Verify {
		/// Error returned by the callback.
		#[source]
		source: BoxError,
	},
}

/// Configuration and validation failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(#[from] oauth2::http::Error),
	/// Provider descriptor failed validation.
	#[error(transparent)]
	Descriptor(#[from] crate::provider::ProviderDescriptorError),
	/// Provider descriptor contains a URL `oauth2` refuses.
	#[error("Descriptor contains an invalid URL.")]
	InvalidDescriptor {
		/// Underlying parsing failure.
		#[source]
		source: oauth2::url::ParseError,
	},
	/// Redirect URI cannot be parsed.
	#[error("Redirect URI is invalid.")]
	InvalidRedirect {
		/// Underlying parsing failure.
		#[source]
		source: oauth2::url::ParseError,
	},

	/// No client identifier was configured.
	#[error("Strategy requires a client_id.")]
	MissingClientId,
	/// No client secret was configured.
	#[error("Strategy requires a client_secret.")]
	MissingClientSecret,
	/// No callback URL was configured for the authorization redirect.
	#[error("Strategy requires a callback_url.")]
	MissingCallbackUrl,
	/// Request scopes cannot be normalized.
	#[error("Requested scopes are invalid.")]
	InvalidScope(#[from] crate::auth::ScopeValidationError),
	/// Strategy name failed identifier validation.
	#[error("Strategy name is invalid.")]
	InvalidName(#[from] crate::auth::IdentifierError),
	/// Token grant builder validation failed.
	#[error("Unable to build token grant.")]
	TokenBuild(#[from] crate::auth::TokenGrantBuilderError),
	/// Token endpoint returned an excessively large `expires_in`.
	#[error("The expires_in value exceeds the supported range.")]
	ExpiresInOutOfRange,
	/// Token endpoint returned a non-positive duration.
	#[error("The expires_in value must be positive.")]
	NonPositiveExpiresIn,
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Temporary failure variants (safe to retry).
#[derive(Debug, ThisError)]
pub enum TransientError {
	/// Provider returned an unexpected but non-fatal response.
	#[error("The {call} endpoint returned an unexpected response: {message}.")]
	Endpoint {
		/// Provider call that failed.
		call: ProviderCall,
		/// Provider- or strategy-supplied message summarizing the failure.
		message: String,
		/// HTTP status code, when available.
		status: Option<u16>,
		/// Retry-After hint from upstream, if supplied.
		retry_after: Option<Duration>,
	},
}

/// Transport-level failures (network, IO, unexpected status).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the {call} endpoint.")]
	Network {
		/// Provider call that failed.
		call: ProviderCall,
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling a provider endpoint.")]
	Io(#[from] std::io::Error),
	/// Provider answered with a non-success HTTP status.
	#[error("The {call} endpoint answered with HTTP {status}.")]
	Status {
		/// Provider call that failed.
		call: ProviderCall,
		/// HTTP status code.
		status: u16,
		/// Truncated response body.
		body_preview: String,
	},
	/// Any failure while retrieving the user profile.
	#[error("Failed to fetch user profile.")]
	ProfileFetch {
		/// Underlying failure.
		#[source]
		source: BoxError,
	},
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(call: ProviderCall, src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { call, source: Box::new(src) }
	}

	/// Wraps any failure raised while fetching the user profile.
	pub fn profile_fetch(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::ProfileFetch { source: Box::new(src) }
	}
}

/// Malformed or unexpected provider response bodies.
#[derive(Debug, ThisError)]
pub enum ParseError {
	/// Body does not contain a `{...}` JSON object.
	#[error("The {call} response does not contain a JSON object.")]
	MissingObject {
		/// Provider call whose body was malformed.
		call: ProviderCall,
		/// Truncated response body.
		body_preview: String,
	},
	/// Body is not valid JSON.
	#[error("The {call} response is not valid JSON.")]
	Json {
		/// Provider call whose body was malformed.
		call: ProviderCall,
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// Body is valid JSON but lacks a required field.
	#[error("The {call} response is missing the `{field}` field.")]
	MissingField {
		/// Provider call whose body was incomplete.
		call: ProviderCall,
		/// Missing field name.
		field: &'static str,
	},
	/// Body was rejected before decoding (wrong content type, empty body).
	#[error("The {call} response could not be decoded: {message}.")]
	UnexpectedBody {
		/// Provider call whose body was rejected.
		call: ProviderCall,
		/// Decoder message.
		message: String,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// Body is not valid UTF-8.
	#[error("The {call} response is not valid UTF-8.")]
	Utf8 {
		/// Provider call whose body was malformed.
		call: ProviderCall,
		/// Decoding failure.
		#[source]
		source: std::string::FromUtf8Error,
	},
}
