//! Verify callback contract.

// self
use crate::{_prelude::*, auth::TokenSecret};

/// Boxed future returned by [`Verify::verify`].
pub type VerifyFuture<'a, U> =
	Pin<Box<dyn Future<Output = std::result::Result<Option<U>, BoxError>> + 'a + Send>>;

/// Application hook that maps provider credentials onto a local user.
///
/// Returning `Ok(None)` declines the login; the strategy turns that into
/// [`AuthOutcome::Rejected`](crate::flows::AuthOutcome::Rejected). Errors surface as
/// [`Error::Verify`].
///
/// Any `Fn(TokenSecret, Option<TokenSecret>, P) -> impl Future` closure implements the
/// trait, so an `async move` block is usually enough.
pub trait Verify<P>
where
	Self: Send + Sync,
{
	/// Application user type.
	type User;

	/// Looks up or creates the user behind `profile`.
	fn verify(
		&self,
		access_token: TokenSecret,
		refresh_token: Option<TokenSecret>,
		profile: P,
	) -> VerifyFuture<'_, Self::User>;
}
impl<P, U, F, Fut> Verify<P> for F
where
	F: Send + Sync + Fn(TokenSecret, Option<TokenSecret>, P) -> Fut,
	Fut: 'static + Send + Future<Output = std::result::Result<Option<U>, BoxError>>,
{
	type User = U;

	fn verify(
		&self,
		access_token: TokenSecret,
		refresh_token: Option<TokenSecret>,
		profile: P,
	) -> VerifyFuture<'_, U> {
		Box::pin(self(access_token, refresh_token, profile))
	}
}
