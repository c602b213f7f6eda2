//! QQ-specific token error classification.
//!
//! QQ reports token endpoint failures as numeric codes (`{"error":100019,...}`). The
//! quirk decorator stringifies the code before `oauth2` decodes it, so the code arrives
//! here as the OAuth `error` field.

// self
use crate::provider::{
	DefaultProviderStrategy, ProviderErrorContext, ProviderErrorKind, ProviderStrategy,
};

/// [`ProviderStrategy`] that understands QQ's numeric error codes.
#[derive(Debug, Default)]
pub struct QqProviderStrategy {
	fallback: DefaultProviderStrategy,
}
impl ProviderStrategy for QqProviderStrategy {
	fn classify_token_error(&self, ctx: &ProviderErrorContext) -> ProviderErrorKind {
		if let Some(kind) = ctx
			.oauth_error
			.as_deref()
			.and_then(|value| value.trim().parse::<i64>().ok())
			.and_then(classify_code)
		{
			return kind;
		}

		self.fallback.classify_token_error(ctx)
	}
}

/// Maps a QQ Connect error code onto the crate taxonomy.
pub fn classify_code(code: i64) -> Option<ProviderErrorKind> {
	match code {
		// Unknown app id, bad app key, unregistered redirect, app offline.
		100001 | 100002 | 100008 | 100009 | 100010 | 100011 =>
			Some(ProviderErrorKind::InvalidClient),
		// Missing, expired, revoked or reused codes and tokens.
		100005 | 100006 | 100007 | 100013 | 100014 | 100015 | 100016 | 100018 | 100019
		| 100020 => Some(ProviderErrorKind::InvalidGrant),
		100030 | 100031 => Some(ProviderErrorKind::InsufficientScope),
		_ => None,
	}
}
