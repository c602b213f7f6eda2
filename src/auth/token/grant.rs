//! Tokens issued by a successful authorization-code exchange.

// self
use crate::{_prelude::*, auth::token::secret::TokenSecret};

/// Errors produced by [`TokenGrantBuilder`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum TokenGrantBuilderError {
	/// Issued when no access token value was provided.
	#[error("Access token is required.")]
	MissingAccessToken,
	/// Issued when the expiry precedes the issued-at instant.
	#[error("Expiry must not precede the issued-at instant.")]
	ExpiryBeforeIssue,
}

/// Tokens handed to the verify callback after the code exchange.
///
/// The crate never persists grants; they live for the duration of one
/// authentication and are dropped afterwards unless the application keeps them.
#[derive(Clone, Serialize, Deserialize)]
pub struct TokenGrant {
	/// Access token secret; callers must avoid logging it.
	pub access_token: TokenSecret,
	/// Refresh token secret, if the provider issued one.
	pub refresh_token: Option<TokenSecret>,
	/// Instant the grant was received.
	pub issued_at: OffsetDateTime,
	/// Expiry derived from `expires_in`, when the provider supplied one.
	pub expires_at: Option<OffsetDateTime>,
}
impl TokenGrant {
	/// Returns a builder for assembling grants from token responses.
	pub fn builder() -> TokenGrantBuilder {
		TokenGrantBuilder::default()
	}

	/// Returns `true` if the access token has expired at the provided instant.
	///
	/// Grants without an expiry never expire locally.
	pub fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		self.expires_at.is_some_and(|expires_at| instant >= expires_at)
	}

	/// Returns `true` if the access token is expired relative to the current clock.
	pub fn is_expired(&self) -> bool {
		self.is_expired_at(OffsetDateTime::now_utc())
	}
}
impl Debug for TokenGrant {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenGrant")
			.field("access_token", &"<redacted>")
			.field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
			.field("issued_at", &self.issued_at)
			.field("expires_at", &self.expires_at)
			.finish()
	}
}

/// Builder for [`TokenGrant`].
#[derive(Clone, Debug, Default)]
pub struct TokenGrantBuilder {
	access_token: Option<TokenSecret>,
	refresh_token: Option<TokenSecret>,
	issued_at: Option<OffsetDateTime>,
	expires_in: Option<Duration>,
}
impl TokenGrantBuilder {
	/// Sets the issued-at instant.
	pub fn issued_at(mut self, instant: OffsetDateTime) -> Self {
		self.issued_at = Some(instant);

		self
	}

	/// Sets a relative expiry duration from the issued instant.
	pub fn expires_in(mut self, duration: Duration) -> Self {
		self.expires_in = Some(duration);

		self
	}

	/// Provides the access token value.
	pub fn access_token(mut self, token: impl Into<String>) -> Self {
		self.access_token = Some(TokenSecret::new(token));

		self
	}

	/// Provides the refresh token value.
	pub fn refresh_token(mut self, token: impl Into<String>) -> Self {
		self.refresh_token = Some(TokenSecret::new(token));

		self
	}

	/// Consumes the builder and produces a [`TokenGrant`].
	pub fn build(self) -> Result<TokenGrant, TokenGrantBuilderError> {
		let access_token = self.access_token.ok_or(TokenGrantBuilderError::MissingAccessToken)?;
		let issued_at = self.issued_at.unwrap_or_else(OffsetDateTime::now_utc);

		if self.expires_in.is_some_and(|delta| delta.is_negative()) {
			return Err(TokenGrantBuilderError::ExpiryBeforeIssue);
		}

		Ok(TokenGrant {
			access_token,
			refresh_token: self.refresh_token,
			issued_at,
			expires_at: self.expires_in.map(|delta| issued_at + delta),
		})
	}
}
