//! Authorization session state and callback parameter parsing.

// crates.io
use rand::{Rng, distr::Alphanumeric};
use url::form_urlencoded;
// self
use crate::{_prelude::*, auth::ScopeSet, error::ConfigError, provider::ProviderDescriptor};

const STATE_LEN: usize = 32;

/// Handshake metadata produced by a strategy's `start_authorization`.
///
/// Hosts persist the session (it is serializable) until the provider redirects back,
/// then pass it to `authenticate` together with the [`CallbackParams`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationSession {
	/// Requested scope set.
	pub scope: ScopeSet,
	/// Opaque state value that must round-trip via the redirect handler.
	pub state: String,
	/// Redirect URI supplied when constructing the authorize URL.
	pub redirect_uri: Url,
	/// Fully-formed authorize URL that callers should send end-users to.
	pub authorize_url: Url,
}
impl AuthorizationSession {
	/// Generates a fresh state value and builds the authorize URL for `descriptor`.
	pub fn start(
		descriptor: &ProviderDescriptor,
		client_id: &str,
		redirect_uri: Url,
		scope: ScopeSet,
	) -> Result<Self> {
		let state = random_string(STATE_LEN);
		let authorize_url =
			build_authorize_url(descriptor, client_id, &redirect_uri, &scope, &state)?;

		Ok(Self { scope, state, redirect_uri, authorize_url })
	}

	/// Validates the returned `state` parameter after the authorization redirect.
	pub fn validate_state(&self, returned_state: Option<&str>) -> Result<()> {
		if returned_state == Some(self.state.as_str()) {
			Ok(())
		} else {
			Err(Error::InvalidGrant { reason: "authorization state mismatch".into() })
		}
	}
}

/// Query parameters the provider appends to the redirect URI.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CallbackParams {
	/// Authorization code to exchange.
	pub code: Option<String>,
	/// State echoed back by the provider.
	pub state: Option<String>,
	/// OAuth error code when the user or provider aborted the flow.
	pub error: Option<String>,
	/// Optional human-readable error text.
	pub error_description: Option<String>,
}
impl CallbackParams {
	/// Parses a raw query string (without the leading `?`).
	pub fn from_query(query: &str) -> Self {
		let mut params = Self::default();

		for (key, value) in form_urlencoded::parse(query.as_bytes()) {
			let slot = match key.as_ref() {
				"code" => &mut params.code,
				"state" => &mut params.state,
				"error" => &mut params.error,
				"error_description" => &mut params.error_description,
				_ => continue,
			};

			if slot.is_none() && !value.is_empty() {
				*slot = Some(value.into_owned());
			}
		}

		params
	}

	/// Parses the query string of a full redirect URL.
	pub fn from_url(url: &Url) -> Self {
		url.query().map(Self::from_query).unwrap_or_default()
	}
}

fn build_authorize_url(
	descriptor: &ProviderDescriptor,
	client_id: &str,
	redirect_uri: &Url,
	scope: &ScopeSet,
	state: &str,
) -> Result<Url> {
	let scope_value = scope.join(descriptor.quirks.scope_delimiter).map_err(ConfigError::from)?;
	let mut url = descriptor.endpoints.authorization.clone();
	let mut pairs = url.query_pairs_mut();

	pairs.append_pair("response_type", "code");
	pairs.append_pair("client_id", client_id);
	pairs.append_pair("redirect_uri", redirect_uri.as_str());

	if let Some(scope_value) = scope_value {
		pairs.append_pair("scope", &scope_value);
	}

	pairs.append_pair("state", state);

	drop(pairs);

	Ok(url)
}

fn random_string(len: usize) -> String {
	rand::rng().sample_iter(Alphanumeric).take(len).map(char::from).collect()
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::{auth::ProviderId, provider::ProviderQuirks};

	fn descriptor() -> ProviderDescriptor {
		ProviderDescriptor::builder(ProviderId::new("qq").expect("Provider id fixture is valid."))
			.authorization_endpoint(
				Url::parse("https://graph.qq.com/oauth2.0/authorize")
					.expect("Authorization URL fixture should parse."),
			)
			.token_endpoint(
				Url::parse("https://graph.qq.com/oauth2.0/token")
					.expect("Token URL fixture should parse."),
			)
			.quirks(ProviderQuirks { scope_delimiter: ',', ..Default::default() })
			.build()
			.expect("Descriptor fixture should build.")
	}

	#[test]
	fn authorize_url_carries_client_redirect_scope_and_state() {
		let session = AuthorizationSession::start(
			&descriptor(),
			"app-id",
			Url::parse("https://app.example.com/cb").expect("Redirect fixture should parse."),
			ScopeSet::new(["get_user_info", "list_album"]).expect("Scope fixture is valid."),
		)
		.expect("Session should start.");
		let pairs = session.authorize_url.query_pairs().into_owned().collect::<HashMap<_, _>>();

		assert_eq!(session.state.len(), STATE_LEN);
		assert!(session.state.chars().all(|c| c.is_ascii_alphanumeric()));
		assert_eq!(pairs.get("response_type").map(String::as_str), Some("code"));
		assert_eq!(pairs.get("client_id").map(String::as_str), Some("app-id"));
		assert_eq!(
			pairs.get("redirect_uri").map(String::as_str),
			Some("https://app.example.com/cb")
		);
		assert_eq!(pairs.get("scope").map(String::as_str), Some("get_user_info,list_album"));
		assert_eq!(pairs.get("state"), Some(&session.state));
	}

	#[test]
	fn empty_scope_is_omitted() {
		let session = AuthorizationSession::start(
			&descriptor(),
			"app-id",
			Url::parse("https://app.example.com/cb").expect("Redirect fixture should parse."),
			ScopeSet::default(),
		)
		.expect("Session should start.");

		assert!(!session.authorize_url.query_pairs().any(|(key, _)| key == "scope"));
	}

	#[test]
	fn state_validation_errors_on_mismatch() {
		let session = AuthorizationSession {
			scope: ScopeSet::default(),
			state: "expected".into(),
			redirect_uri: Url::parse("https://example.com/cb")
				.expect("Redirect URL fixture should parse successfully."),
			authorize_url: Url::parse("https://example.com/auth?state=expected")
				.expect("Authorization URL fixture should parse successfully."),
		};

		assert!(session.validate_state(Some("expected")).is_ok());
		assert!(matches!(session.validate_state(Some("other")), Err(Error::InvalidGrant { .. })));
		assert!(matches!(session.validate_state(None), Err(Error::InvalidGrant { .. })));
	}

	#[test]
	fn callback_params_parse_from_redirect() {
		let url = Url::parse(
			"https://app.example.com/cb?code=C0DE&state=xyz&error_description=&unrelated=1",
		)
		.expect("Callback fixture should parse.");
		let params = CallbackParams::from_url(&url);

		assert_eq!(params.code.as_deref(), Some("C0DE"));
		assert_eq!(params.state.as_deref(), Some("xyz"));
		assert_eq!(params.error, None);
		assert_eq!(params.error_description, None);

		let denied = CallbackParams::from_query("error=access_denied&error_description=user+said+no");

		assert_eq!(denied.error.as_deref(), Some("access_denied"));
		assert_eq!(denied.error_description.as_deref(), Some("user said no"));
	}
}
