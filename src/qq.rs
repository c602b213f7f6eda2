//! QQ Connect login strategy.
//!
//! [`QqStrategy`] wires the generic [`OAuth2Client`] to QQ's endpoints and quirks:
//!
//! - the token exchange is sent as a `GET` with every parameter in the query string;
//! - authenticated GETs carry `access_token` and `oauth_consumer_key`;
//! - the profile comes from two calls (identity, then user info), see [`profile`].
//!
//! ```no_run
//! # #[cfg(feature = "reqwest")]
//! # async fn demo() -> oauth2_qq::error::Result<()> {
//! use oauth2_qq::{
//! 	auth::{ScopeSet, TokenSecret},
//! 	error::BoxError,
//! 	flows::{AuthenticationStrategy, CallbackParams, Profile},
//! 	qq::{QqOptions, QqStrategy},
//! 	url::Url,
//! };
//!
//! let options = QqOptions::new("app-id", "app-key").callback_url(
//! 	Url::parse("https://app.example.com/auth/qq/callback").expect("static URL"),
//! );
//! let strategy = QqStrategy::new(
//! 	options,
//! 	|_access: TokenSecret, _refresh: Option<TokenSecret>, profile: Profile| async move {
//! 		Ok::<_, BoxError>(Some(profile.id))
//! 	},
//! )?;
//! let session = strategy.start_authorization(&ScopeSet::default())?;
//! // Redirect the browser to `session.authorize_url`, then on the callback:
//! let callback = CallbackParams::from_query("code=...&state=...");
//! let outcome = strategy.authenticate(&session, callback).await?;
//! # let _ = outcome;
//! # Ok(())
//! # }
//! ```

pub mod classify;
pub mod options;
pub mod profile;

pub use classify::*;
pub use options::*;
pub use profile::{AuthenticatedGet, ProfileEndpoints};

// self
use crate::{
	_prelude::*,
	auth::{ScopeSet, TokenSecret},
	error::ConfigError,
	flows::{
		AuthOutcome, AuthenticationStrategy, AuthorizationSession, CallbackParams, Profile,
		StrategyFuture, Verify,
	},
	http::ProviderHttpClient,
	oauth::{BasicOAuth2Client, ClientFuture, OAuth2Client, TransportErrorMapper},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	provider::ProviderCall,
};
#[cfg(feature = "reqwest")]
use crate::{
	http::ReqwestHttpClient,
	oauth::{ReqwestOAuth2Client, ReqwestTransportErrorMapper},
};

/// Provider name reported in profiles and used as the strategy name.
pub const PROVIDER: &str = "qq";

const ACCESS_DENIED: &str = "access_denied";

#[cfg(feature = "reqwest")]
/// Strategy specialized for the crate's default reqwest transport stack.
pub type ReqwestQqStrategy<V> = QqStrategy<V, ReqwestOAuth2Client>;

/// QQ Connect authentication strategy.
///
/// Generic over the verify callback `V` and the OAuth client `O`. Use
/// [`QqStrategy::new`] for the reqwest stack, [`QqStrategy::with_http_client`] to plug a
/// custom transport, or [`QqStrategy::with_oauth_client`] to supply a whole client.
pub struct QqStrategy<V, O> {
	client: O,
	verify: V,
	callback_url: Option<Url>,
	default_scope: ScopeSet,
	profile: ProfileEndpoints,
}
#[cfg(feature = "reqwest")]
impl<V> QqStrategy<V, ReqwestOAuth2Client> {
	/// Creates a strategy backed by a default reqwest client.
	pub fn new(options: QqOptions, verify: V) -> Result<Self> {
		Self::with_http_client(
			options,
			verify,
			ReqwestHttpClient::default(),
			ReqwestTransportErrorMapper,
		)
	}
}
impl<V, C, M> QqStrategy<V, BasicOAuth2Client<C, M>>
where
	C: ?Sized + ProviderHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Creates a strategy that sends every request through `http_client`.
	///
	/// The transport is wrapped with QQ's quirks; `mapper` converts its failures.
	pub fn with_http_client(
		options: QqOptions,
		verify: V,
		http_client: impl Into<Arc<C>>,
		mapper: impl Into<Arc<M>>,
	) -> Result<Self> {
		let client = BasicOAuth2Client::new(
			options.descriptor()?,
			options.client_id.clone(),
			options.client_secret.clone(),
			http_client,
			mapper,
		)
		.with_strategy(Arc::new(QqProviderStrategy::default()));

		Self::with_oauth_client(options, verify, client)
	}
}
impl<V, O> QqStrategy<V, O>
where
	O: OAuth2Client,
{
	/// Symbolic strategy name.
	pub const NAME: &'static str = PROVIDER;

	/// Creates a strategy around an existing OAuth client.
	///
	/// Authorization and token endpoints come from `client`'s descriptor; `options`
	/// supplies the callback URL, default scope, and profile endpoints.
	pub fn with_oauth_client(options: QqOptions, verify: V, client: O) -> Result<Self> {
		let (identity, user_info) = options.profile_endpoints()?;

		Ok(Self {
			client,
			verify,
			callback_url: options.callback_url,
			default_scope: options.scope,
			profile: ProfileEndpoints { identity, user_info, format: options.user_info_format },
		})
	}

	/// OAuth client backing the strategy.
	pub fn oauth_client(&self) -> &O {
		&self.client
	}

	/// Issues a GET carrying `access_token` and then `oauth_consumer_key`.
	pub fn authenticated_get<'a>(
		&'a self,
		call: ProviderCall,
		url: Url,
		access_token: &'a TokenSecret,
	) -> ClientFuture<'a, String>
	where
		V: Sync,
	{
		Box::pin(async move {
			let consumer_key = self.client.client_id()?.to_owned();

			self.client
				.authenticated_get(
					call,
					url,
					access_token,
					vec![("oauth_consumer_key", consumer_key)],
				)
				.await
		})
	}

	fn session_for(&self, scope: &ScopeSet) -> Result<AuthorizationSession> {
		let client_id = self.client.client_id()?;
		let redirect_uri = self.callback_url.clone().ok_or(ConfigError::MissingCallbackUrl)?;
		let scope = if scope.is_empty() { self.default_scope.clone() } else { scope.clone() };

		AuthorizationSession::start(self.client.descriptor(), client_id, redirect_uri, scope)
	}
}
impl<V, O> Debug for QqStrategy<V, O>
where
	O: OAuth2Client,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("QqStrategy")
			.field("descriptor", self.client.descriptor())
			.field("callback_url", &self.callback_url)
			.field("default_scope", &self.default_scope)
			.field("profile", &self.profile)
			.finish_non_exhaustive()
	}
}
impl<V, O> AuthenticatedGet for QqStrategy<V, O>
where
	V: Send + Sync,
	O: OAuth2Client,
{
	fn authenticated_get<'a>(
		&'a self,
		call: ProviderCall,
		url: Url,
		access_token: &'a TokenSecret,
	) -> ClientFuture<'a, String> {
		QqStrategy::authenticated_get(self, call, url, access_token)
	}
}
impl<V, O> AuthenticationStrategy for QqStrategy<V, O>
where
	V: Verify<Profile>,
	V::User: Send,
	O: OAuth2Client,
{
	type User = V::User;

	fn name(&self) -> &str {
		Self::NAME
	}

	fn start_authorization(&self, scope: &ScopeSet) -> Result<AuthorizationSession> {
		const KIND: FlowKind = FlowKind::Authorization;

		let _span = FlowSpan::new(KIND, "start_authorization").entered();

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = self.session_for(scope);

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(_) => obs::record_flow_outcome(KIND, FlowOutcome::Failure),
		}

		result
	}

	fn authenticate<'a>(
		&'a self,
		session: &'a AuthorizationSession,
		callback: CallbackParams,
	) -> StrategyFuture<'a, AuthOutcome<Self::User>> {
		Box::pin(async move {
			let CallbackParams { code, state, error, error_description } = callback;

			if let Some(error) = error {
				if error == ACCESS_DENIED {
					return Ok(AuthOutcome::Rejected { reason: error_description.or(Some(error)) });
				}

				let reason = match error_description {
					Some(description) => format!("{error}: {description}"),
					None => error,
				};

				return Err(Error::InvalidGrant { reason });
			}

			session.validate_state(state.as_deref())?;

			let code = code.ok_or_else(|| Error::InvalidGrant {
				reason: "callback is missing the authorization code".into(),
			})?;
			let grant = obs::observe(
				FlowKind::TokenExchange,
				"exchange_code",
				self.client.exchange_code(&code, &session.redirect_uri),
			)
			.await?;
			let profile = self.user_profile(&grant.access_token).await?;

			match self.verify.verify(grant.access_token, grant.refresh_token, profile).await {
				Ok(Some(user)) => Ok(AuthOutcome::Success { user }),
				Ok(None) => Ok(AuthOutcome::Rejected { reason: None }),
				Err(source) => Err(Error::Verify { source }),
			}
		})
	}

	fn user_profile<'a>(&'a self, access_token: &'a TokenSecret) -> StrategyFuture<'a, Profile> {
		Box::pin(obs::observe(
			FlowKind::UserProfile,
			"user_profile",
			profile::resolve(self, &self.profile, access_token),
		))
	}
}
