//! Strategy contract shared by host applications and provider strategies.
//!
//! A host router keeps one [`StrategyRegistry`] per user type, sends browsers to the URL
//! returned by [`AuthenticationStrategy::start_authorization`], stores the
//! [`AuthorizationSession`] between the two legs, and feeds the provider's redirect back
//! through [`AuthenticationStrategy::authenticate`].

pub mod registry;
pub mod session;
pub mod verify;

pub use registry::*;
pub use session::*;
pub use verify::*;

// self
use crate::{
	_prelude::*,
	auth::{ScopeSet, TokenSecret},
};

/// Boxed future returned by [`AuthenticationStrategy`] operations.
pub type StrategyFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + 'a + Send>>;

/// Provider-neutral user profile handed to the verify callback.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
	/// Name of the provider that issued the profile (e.g. `"qq"`).
	pub provider: String,
	/// Provider-scoped stable user identifier.
	pub id: String,
	/// Display name, when the provider returned one.
	pub nickname: Option<String>,
	/// User-info body exactly as received.
	pub raw_body: String,
	/// User-info body parsed as JSON.
	pub raw_json: serde_json::Value,
}

/// Result of a completed callback.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AuthOutcome<U> {
	/// The verify callback accepted the user.
	Success {
		/// Application user returned by the verify callback.
		user: U,
	},
	/// The user denied consent or the verify callback declined the credentials.
	Rejected {
		/// Human-readable reason, when one is known.
		reason: Option<String>,
	},
}
impl<U> AuthOutcome<U> {
	/// Returns the authenticated user, if any.
	pub fn user(self) -> Option<U> {
		match self {
			AuthOutcome::Success { user } => Some(user),
			AuthOutcome::Rejected { .. } => None,
		}
	}

	/// Returns `true` for [`AuthOutcome::Success`].
	pub fn is_success(&self) -> bool {
		matches!(self, AuthOutcome::Success { .. })
	}
}

/// Capability set every login strategy exposes to the host.
pub trait AuthenticationStrategy
where
	Self: Send + Sync,
{
	/// Application user produced by the verify callback.
	type User;

	/// Symbolic name the host routes on.
	fn name(&self) -> &str;

	/// Builds the provider redirect for a new login attempt.
	///
	/// An empty `scope` falls back to the strategy's configured default.
	fn start_authorization(&self, scope: &ScopeSet) -> Result<AuthorizationSession>;

	/// Completes the login once the provider redirects back.
	fn authenticate<'a>(
		&'a self,
		session: &'a AuthorizationSession,
		callback: CallbackParams,
	) -> StrategyFuture<'a, AuthOutcome<Self::User>>;

	/// Resolves an access token into a normalized [`Profile`].
	fn user_profile<'a>(&'a self, access_token: &'a TokenSecret) -> StrategyFuture<'a, Profile>;
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn outcome_helpers() {
		let success = AuthOutcome::Success { user: 7 };

		assert!(success.is_success());
		assert_eq!(success.user(), Some(7));

		let rejected = AuthOutcome::<u8>::Rejected { reason: Some("access_denied".into()) };

		assert!(!rejected.is_success());
		assert_eq!(rejected.user(), None);
	}

	#[test]
	fn profile_serializes_with_raw_json() {
		let profile = Profile {
			provider: "qq".into(),
			id: "OID1".into(),
			nickname: Some("Alice".into()),
			raw_body: r#"{"nickname":"Alice"}"#.into(),
			raw_json: serde_json::json!({ "nickname": "Alice" }),
		};
		let value = serde_json::to_value(&profile).expect("Profile should serialize.");

		assert_eq!(value["provider"], "qq");
		assert_eq!(value["raw_json"]["nickname"], "Alice");
	}
}
