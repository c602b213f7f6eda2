// self
use crate::{
	_prelude::*,
	auth::ProviderId,
	provider::{ProviderDescriptor, ProviderEndpoints, ProviderQuirks},
};

/// Reasons a descriptor is refused.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum ProviderDescriptorError {
	/// No authorization endpoint to redirect the user to.
	#[error("Missing authorization endpoint.")]
	MissingAuthorizationEndpoint,
	/// No token endpoint to exchange the code at.
	#[error("Missing token endpoint.")]
	MissingTokenEndpoint,
	/// Plain HTTP outside loopback hosts.
	#[error("The {endpoint} endpoint must use HTTPS: {url}.")]
	InsecureEndpoint {
		/// `authorization`, `token`, `identity` or `user_info`.
		endpoint: &'static str,
		/// Offending URL.
		url: String,
	},
	/// Control characters cannot join scopes.
	#[error("Scope delimiter must be a printable character.")]
	InvalidScopeDelimiter {
		/// Offending delimiter.
		delimiter: char,
	},
}

/// Fluent construction of a [`ProviderDescriptor`]; [`build`](Self::build) validates.
#[derive(Debug)]
pub struct ProviderDescriptorBuilder {
	/// Provider the descriptor belongs to.
	pub id: ProviderId,
	/// Where the user is sent to log in.
	pub authorization_endpoint: Option<Url>,
	/// Where the code is exchanged.
	pub token_endpoint: Option<Url>,
	/// Deviations the transport must correct.
	pub quirks: ProviderQuirks,
}
impl ProviderDescriptorBuilder {
	/// Starts a descriptor for `id` with RFC-compliant quirks.
	pub fn new(id: ProviderId) -> Self {
		Self { id, authorization_endpoint: None, token_endpoint: None, quirks: Default::default() }
	}

	/// Sets the authorization endpoint.
	pub fn authorization_endpoint(self, url: Url) -> Self {
		Self { authorization_endpoint: Some(url), ..self }
	}

	/// Sets the token endpoint.
	pub fn token_endpoint(self, url: Url) -> Self {
		Self { token_endpoint: Some(url), ..self }
	}

	/// Replaces the quirk set.
	pub fn quirks(self, quirks: ProviderQuirks) -> Self {
		Self { quirks, ..self }
	}

	/// Checks both endpoints and the scope delimiter, then freezes the descriptor.
	pub fn build(self) -> Result<ProviderDescriptor, ProviderDescriptorError> {
		let authorization = self
			.authorization_endpoint
			.ok_or(ProviderDescriptorError::MissingAuthorizationEndpoint)?;
		let token = self.token_endpoint.ok_or(ProviderDescriptorError::MissingTokenEndpoint)?;

		validate_endpoint("authorization", &authorization)?;
		validate_endpoint("token", &token)?;

		if self.quirks.scope_delimiter.is_control() {
			return Err(ProviderDescriptorError::InvalidScopeDelimiter {
				delimiter: self.quirks.scope_delimiter,
			});
		}

		Ok(ProviderDescriptor {
			id: self.id,
			endpoints: ProviderEndpoints { authorization, token },
			quirks: self.quirks,
		})
	}
}

/// Accepts `https`, and `http` only when the host is loopback (local mocks).
pub fn validate_endpoint(name: &'static str, url: &Url) -> Result<(), ProviderDescriptorError> {
	let loopback = match url.host() {
		Some(url::Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
		Some(url::Host::Ipv4(addr)) => addr.is_loopback(),
		Some(url::Host::Ipv6(addr)) => addr.is_loopback(),
		None => false,
	};

	match url.scheme() {
		"https" => Ok(()),
		"http" if loopback => Ok(()),
		_ => Err(ProviderDescriptorError::InsecureEndpoint { endpoint: name, url: url.to_string() }),
	}
}
