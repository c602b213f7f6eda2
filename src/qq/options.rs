//! QQ Connect configuration.

// self
use crate::{
	_prelude::*,
	auth::{ProviderId, ScopeSet},
	error::ConfigError,
	provider::{ProviderDescriptor, ProviderQuirks, validate_endpoint},
	qq::PROVIDER,
};

/// Default QQ authorization endpoint.
pub const DEFAULT_AUTHORIZATION_URL: &str = "https://graph.qq.com/oauth2.0/authorize";
/// Default QQ token endpoint.
pub const DEFAULT_TOKEN_URL: &str = "https://graph.qq.com/oauth2.0/token";
/// Default "who am I" endpoint resolving an access token to an openid.
pub const DEFAULT_IDENTITY_URL: &str = "https://graph.qq.com/oauth2.0/me";
/// Default user-info endpoint.
pub const DEFAULT_USER_INFO_URL: &str = "https://graph.qq.com/user/get_user_info";
/// Separator QQ expects between scopes.
pub const DEFAULT_SCOPE_SEPARATOR: char = ',';

/// Shape of the user-info request.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserInfoFormat {
	/// Sends `format=json` alongside `openid`.
	#[default]
	Json,
	/// Sends only `openid`, relying on the endpoint's default format.
	Plain,
}

/// Configuration for [`QqStrategy`](crate::qq::QqStrategy).
///
/// Every field is optional in serialized form; absent URLs fall back to the public QQ
/// endpoints. Credentials are checked when first needed rather than here, so a
/// partially configured strategy can still be registered.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QqOptions {
	/// QQ application id (`appid`).
	pub client_id: Option<String>,
	/// QQ application key (`appkey`).
	pub client_secret: Option<String>,
	/// Redirect URI registered with QQ.
	pub callback_url: Option<Url>,
	/// Authorization endpoint override.
	pub authorization_url: Option<Url>,
	/// Token endpoint override.
	pub token_url: Option<Url>,
	/// Identity endpoint override.
	pub identity_url: Option<Url>,
	/// User-info endpoint override.
	pub user_info_url: Option<Url>,
	/// Character joining requested scopes.
	pub scope_separator: char,
	/// Shape of the user-info request.
	pub user_info_format: UserInfoFormat,
	/// Scope requested when the caller passes an empty set.
	pub scope: ScopeSet,
}
impl QqOptions {
	/// Creates options for the given application credentials.
	pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
		Self {
			client_id: Some(client_id.into()),
			client_secret: Some(client_secret.into()),
			..Default::default()
		}
	}

	/// Sets the redirect URI.
	pub fn callback_url(mut self, url: Url) -> Self {
		self.callback_url = Some(url);

		self
	}

	/// Overrides the authorization endpoint.
	pub fn authorization_url(mut self, url: Url) -> Self {
		self.authorization_url = Some(url);

		self
	}

	/// Overrides the token endpoint.
	pub fn token_url(mut self, url: Url) -> Self {
		self.token_url = Some(url);

		self
	}

	/// Overrides the identity endpoint.
	pub fn identity_url(mut self, url: Url) -> Self {
		self.identity_url = Some(url);

		self
	}

	/// Overrides the user-info endpoint.
	pub fn user_info_url(mut self, url: Url) -> Self {
		self.user_info_url = Some(url);

		self
	}

	/// Overrides the scope separator.
	pub fn scope_separator(mut self, separator: char) -> Self {
		self.scope_separator = separator;

		self
	}

	/// Selects the user-info request shape.
	pub fn user_info_format(mut self, format: UserInfoFormat) -> Self {
		self.user_info_format = format;

		self
	}

	/// Sets the default scope.
	pub fn scope(mut self, scope: ScopeSet) -> Self {
		self.scope = scope;

		self
	}

	/// Builds the validated provider descriptor for these options.
	pub fn descriptor(&self) -> Result<ProviderDescriptor> {
		let id = ProviderId::new(PROVIDER).map_err(ConfigError::from)?;
		let descriptor = ProviderDescriptor::builder(id)
			.authorization_endpoint(resolve(&self.authorization_url, DEFAULT_AUTHORIZATION_URL)?)
			.token_endpoint(resolve(&self.token_url, DEFAULT_TOKEN_URL)?)
			.quirks(ProviderQuirks {
				query_string_requests: true,
				lenient_token_response: true,
				scope_delimiter: self.scope_separator,
			})
			.build()
			.map_err(ConfigError::from)?;

		Ok(descriptor)
	}

	/// Resolves and validates the identity and user-info endpoints.
	pub fn profile_endpoints(&self) -> Result<(Url, Url)> {
		let identity = resolve(&self.identity_url, DEFAULT_IDENTITY_URL)?;
		let user_info = resolve(&self.user_info_url, DEFAULT_USER_INFO_URL)?;

		validate_endpoint("identity", &identity).map_err(ConfigError::from)?;
		validate_endpoint("user_info", &user_info).map_err(ConfigError::from)?;

		Ok((identity, user_info))
	}
}
impl Default for QqOptions {
	fn default() -> Self {
		Self {
			client_id: None,
			client_secret: None,
			callback_url: None,
			authorization_url: None,
			token_url: None,
			identity_url: None,
			user_info_url: None,
			scope_separator: DEFAULT_SCOPE_SEPARATOR,
			user_info_format: UserInfoFormat::default(),
			scope: ScopeSet::default(),
		}
	}
}

fn resolve(configured: &Option<Url>, fallback: &str) -> Result<Url> {
	match configured {
		Some(url) => Ok(url.clone()),
		None => Url::parse(fallback).map_err(|source| ConfigError::InvalidDescriptor { source }.into()),
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::provider::ProviderDescriptorError;

	#[test]
	fn defaults_point_at_graph_qq_com() {
		let options = QqOptions::new("id", "secret");
		let descriptor = options.descriptor().expect("Default descriptor should build.");
		let (identity, user_info) =
			options.profile_endpoints().expect("Default profile endpoints should resolve.");

		assert_eq!(descriptor.id.as_ref(), "qq");
		assert_eq!(descriptor.endpoints.authorization.as_str(), DEFAULT_AUTHORIZATION_URL);
		assert_eq!(descriptor.endpoints.token.as_str(), DEFAULT_TOKEN_URL);
		assert_eq!(descriptor.quirks.scope_delimiter, ',');
		assert!(descriptor.quirks.query_string_requests);
		assert!(descriptor.quirks.lenient_token_response);
		assert_eq!(identity.as_str(), DEFAULT_IDENTITY_URL);
		assert_eq!(user_info.as_str(), DEFAULT_USER_INFO_URL);
		assert_eq!(options.user_info_format, UserInfoFormat::Json);
	}

	#[test]
	fn insecure_overrides_are_rejected() {
		let options = QqOptions::default().identity_url(
			Url::parse("http://graph.qq.com/oauth2.0/me").expect("URL fixture should parse."),
		);
		let err = options.profile_endpoints().expect_err("Remote HTTP must be rejected.");

		assert!(matches!(
			err,
			Error::Config(ConfigError::Descriptor(ProviderDescriptorError::InsecureEndpoint {
				endpoint: "identity",
				..
			}))
		));
	}

	#[test]
	fn options_deserialize_with_defaults() {
		let options: QqOptions = serde_json::from_value(serde_json::json!({
			"client_id": "101",
			"callback_url": "https://app.example.com/auth/qq/callback",
			"user_info_format": "plain",
			"scope": ["get_user_info"],
		}))
		.expect("Partial options should deserialize.");

		assert_eq!(options.client_id.as_deref(), Some("101"));
		assert_eq!(options.client_secret, None);
		assert_eq!(options.scope_separator, ',');
		assert_eq!(options.user_info_format, UserInfoFormat::Plain);
		assert!(options.scope.contains("get_user_info"));
	}
}
