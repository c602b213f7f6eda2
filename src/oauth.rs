//! Generic OAuth 2.0 client capability and its `oauth2`-backed implementation.
//!
//! [`OAuth2Client`] is the seam between provider strategies and the protocol machinery:
//! strategies compose a client instead of extending one. [`BasicOAuth2Client`] builds an
//! `oauth2` [`BasicClient`] per exchange and routes every request through the
//! [`http::quirks`](crate::http::quirks) decorator configured by the provider descriptor.

pub use oauth2;

// std
use std::borrow::Cow;
// crates.io
use oauth2::{
	AsyncHttpClient, AuthType, AuthUrl, AuthorizationCode, ClientId, ClientSecret, EndpointNotSet,
	EndpointSet, HttpClientError, RedirectUrl, RequestTokenError, TokenResponse,
	TokenUrl,
	basic::{BasicClient, BasicErrorResponse, BasicRequestTokenError, BasicTokenResponse},
	http::{Method, Request},
};
// self
use crate::{
	_prelude::*,
	auth::{TokenGrant, TokenSecret},
	error::{ConfigError, ParseError, TransientError, TransportError},
	http::{
		ProviderHttpClient, ResponseMetadata, ResponseMetadataSlot,
		quirks::{self, QuirkTransport},
	},
	provider::{
		DefaultProviderStrategy, ProviderCall, ProviderDescriptor, ProviderErrorContext,
		ProviderErrorKind, ProviderStrategy, truncate_preview,
	},
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestHttpClient;

#[cfg(feature = "reqwest")]
/// OAuth client specialized for the crate's default reqwest transport stack.
pub type ReqwestOAuth2Client = BasicOAuth2Client<ReqwestHttpClient, ReqwestTransportErrorMapper>;

type ConfiguredBasicClient =
	BasicClient<EndpointSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

/// Boxed future returned by [`OAuth2Client`] operations.
pub type ClientFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + 'a + Send>>;

/// Maps HTTP transport failures into crate [`Error`] values.
pub trait TransportErrorMapper<E>
where
	Self: 'static + Send + Sync,
	E: 'static + Send + Sync + StdError,
{
	/// Converts an [`HttpClientError`] emitted by the transport into a crate error.
	fn map_transport_error(
		&self,
		strategy: &dyn ProviderStrategy,
		call: ProviderCall,
		metadata: Option<&ResponseMetadata>,
		error: HttpClientError<E>,
	) -> Error;
}

/// Default mapper for reqwest-backed transports.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransportErrorMapper;
#[cfg(feature = "reqwest")]
impl TransportErrorMapper<ReqwestError> for ReqwestTransportErrorMapper {
	fn map_transport_error(
		&self,
		_strategy: &dyn ProviderStrategy,
		call: ProviderCall,
		meta: Option<&ResponseMetadata>,
		err: HttpClientError<ReqwestError>,
	) -> Error {
		match err {
			HttpClientError::Reqwest(inner) => map_reqwest_error(call, meta, *inner),
			HttpClientError::Http(inner) => ConfigError::from(inner).into(),
			HttpClientError::Io(inner) => TransportError::Io(inner).into(),
			HttpClientError::Other(message) => map_generic_transport_error(call, meta, message),
			_ => map_unknown_transport_error(call, meta),
		}
	}
}

/// Capability set a provider strategy needs from an OAuth 2.0 client.
pub trait OAuth2Client
where
	Self: 'static + Send + Sync,
{
	/// Descriptor the client was configured with.
	fn descriptor(&self) -> &ProviderDescriptor;

	/// Configured client identifier.
	///
	/// Fails with [`ConfigError::MissingClientId`] when none was supplied.
	fn client_id(&self) -> Result<&str>;

	/// Exchanges an authorization code for a [`TokenGrant`].
	fn exchange_code<'a>(
		&'a self,
		code: &'a str,
		redirect_uri: &'a Url,
	) -> ClientFuture<'a, TokenGrant>;

	/// Issues a GET with `access_token` and then `extra_params` appended, returning the
	/// decoded body.
	///
	/// Non-2xx answers surface as [`TransportError::Status`].
	fn authenticated_get<'a>(
		&'a self,
		call: ProviderCall,
		url: Url,
		access_token: &'a TokenSecret,
		extra_params: Vec<(&'static str, String)>,
	) -> ClientFuture<'a, String>;
}

/// [`OAuth2Client`] backed by `oauth2`'s [`BasicClient`].
///
/// Credentials are optional at construction and checked when a request needs them.
/// Client credentials travel in the request body, which keeps them visible to the
/// quirk decorator when it folds the body into the query string.
pub struct BasicOAuth2Client<C, M>
where
	C: ?Sized + ProviderHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	descriptor: ProviderDescriptor,
	client_id: Option<String>,
	client_secret: Option<String>,
	http_client: QuirkTransport<C>,
	error_mapper: Arc<M>,
	strategy: Arc<dyn ProviderStrategy>,
}
impl<C, M> BasicOAuth2Client<C, M>
where
	C: ?Sized + ProviderHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Creates a client that sends every request through `http_client` decorated with the
	/// descriptor's quirks.
	pub fn new(
		descriptor: ProviderDescriptor,
		client_id: Option<String>,
		client_secret: Option<String>,
		http_client: impl Into<Arc<C>>,
		error_mapper: impl Into<Arc<M>>,
	) -> Self {
		let http_client = quirks::apply_provider_quirks(http_client.into(), descriptor.quirks);

		Self {
			descriptor,
			client_id: client_id.filter(|value| !value.is_empty()),
			client_secret: client_secret.filter(|value| !value.is_empty()),
			http_client,
			error_mapper: error_mapper.into(),
			strategy: Arc::new(DefaultProviderStrategy),
		}
	}

	/// Replaces the strategy used to classify token endpoint errors.
	pub fn with_strategy(mut self, strategy: Arc<dyn ProviderStrategy>) -> Self {
		self.strategy = strategy;

		self
	}

	fn client_secret(&self) -> Result<&str> {
		self.client_secret.as_deref().ok_or_else(|| ConfigError::MissingClientSecret.into())
	}

	fn oauth_client(&self) -> Result<ConfiguredBasicClient> {
		let auth_url = AuthUrl::new(self.descriptor.endpoints.authorization.to_string())
			.map_err(|source| ConfigError::InvalidDescriptor { source })?;
		let token_url = TokenUrl::new(self.descriptor.endpoints.token.to_string())
			.map_err(|source| ConfigError::InvalidDescriptor { source })?;

		Ok(BasicClient::new(ClientId::new(self.client_id()?.to_owned()))
			.set_client_secret(ClientSecret::new(self.client_secret()?.to_owned()))
			.set_auth_uri(auth_url)
			.set_token_uri(token_url)
			.set_auth_type(AuthType::RequestBody))
	}
}
impl<C, M> Debug for BasicOAuth2Client<C, M>
where
	C: ?Sized + ProviderHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("BasicOAuth2Client")
			.field("descriptor", &self.descriptor)
			.field("client_id", &self.client_id)
			.field("client_secret", &self.client_secret.as_ref().map(|_| "<redacted>"))
			.finish_non_exhaustive()
	}
}
impl<C, M> OAuth2Client for BasicOAuth2Client<C, M>
where
	C: ?Sized + ProviderHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn descriptor(&self) -> &ProviderDescriptor {
		&self.descriptor
	}

	fn client_id(&self) -> Result<&str> {
		self.client_id.as_deref().ok_or_else(|| ConfigError::MissingClientId.into())
	}

	fn exchange_code<'a>(
		&'a self,
		code: &'a str,
		redirect_uri: &'a Url,
	) -> ClientFuture<'a, TokenGrant> {
		Box::pin(async move {
			let oauth_client = self.oauth_client()?;
			let redirect_url = RedirectUrl::new(redirect_uri.to_string())
				.map_err(|source| ConfigError::InvalidRedirect { source })?;
			let mut extra = BTreeMap::new();

			self.strategy.augment_token_request(&mut extra);

			let mut request = oauth_client
				.exchange_code(AuthorizationCode::new(code.to_owned()))
				.set_redirect_uri(Cow::Owned(redirect_url));

			for (key, value) in extra {
				request = request.add_extra_param(key, value);
			}

			let meta = ResponseMetadataSlot::default();
			let handle = self.http_client.with_metadata(meta.clone());
			let response = request.request_async(&handle).await.map_err(|err| {
				map_request_error(
					self.strategy.as_ref(),
					ProviderCall::TokenExchange,
					meta.take(),
					err,
					self.error_mapper.as_ref(),
				)
			})?;

			map_token_response(response)
		})
	}

	fn authenticated_get<'a>(
		&'a self,
		call: ProviderCall,
		mut url: Url,
		access_token: &'a TokenSecret,
		extra_params: Vec<(&'static str, String)>,
	) -> ClientFuture<'a, String> {
		Box::pin(async move {
			{
				let mut pairs = url.query_pairs_mut();

				pairs.append_pair("access_token", access_token.expose());

				for (key, value) in &extra_params {
					pairs.append_pair(key, value);
				}
			}

			let request = Request::builder()
				.method(Method::GET)
				.uri(url.as_str())
				.body(Vec::new())
				.map_err(ConfigError::from)?;
			let meta = ResponseMetadataSlot::default();
			let handle = self.http_client.with_metadata(meta.clone());
			let response = handle.call(request).await.map_err(|err| {
				self.error_mapper.map_transport_error(
					self.strategy.as_ref(),
					call,
					meta.take().as_ref(),
					err,
				)
			})?;
			let status = response.status();
			let body = response.into_body();

			if !status.is_success() {
				return Err(TransportError::Status {
					call,
					status: status.as_u16(),
					body_preview: truncate_preview(String::from_utf8_lossy(&body).into_owned()),
				}
				.into());
			}

			String::from_utf8(body).map_err(|source| ParseError::Utf8 { call, source }.into())
		})
	}
}

fn map_token_response(response: BasicTokenResponse) -> Result<TokenGrant> {
	let mut builder = TokenGrant::builder()
		.access_token(response.access_token().secret().to_owned())
		.issued_at(OffsetDateTime::now_utc());

	if let Some(expires_in) = response.expires_in() {
		let expires_in =
			i64::try_from(expires_in.as_secs()).map_err(|_| ConfigError::ExpiresInOutOfRange)?;

		if expires_in <= 0 {
			return Err(ConfigError::NonPositiveExpiresIn.into());
		}

		builder = builder.expires_in(Duration::seconds(expires_in));
	}
	if let Some(refresh) = response.refresh_token() {
		builder = builder.refresh_token(refresh.secret().to_owned());
	}

	builder.build().map_err(|e| ConfigError::from(e).into())
}

fn map_request_error<E, M>(
	strategy: &dyn ProviderStrategy,
	call: ProviderCall,
	meta: Option<ResponseMetadata>,
	err: BasicRequestTokenError<HttpClientError<E>>,
	mapper: &M,
) -> Error
where
	E: 'static + Send + Sync + StdError,
	M: ?Sized + TransportErrorMapper<E>,
{
	let meta_ref = meta.as_ref();

	match err {
		RequestTokenError::ServerResponse(response) =>
			map_server_response_error(strategy, call, response, meta_ref),
		RequestTokenError::Request(error) =>
			mapper.map_transport_error(strategy, call, meta_ref, error),
		RequestTokenError::Parse(source, _body) if !is_server_failure(meta_ref) =>
			ParseError::Json { call, source }.into(),
		RequestTokenError::Other(message) if !is_server_failure(meta_ref) =>
			ParseError::UnexpectedBody { call, message, status: meta_status(meta_ref) }.into(),
		RequestTokenError::Parse(source, _body) => TransientError::Endpoint {
			call,
			message: source.to_string(),
			status: meta_status(meta_ref),
			retry_after: meta_retry_after(meta_ref),
		}
		.into(),
		RequestTokenError::Other(message) => TransientError::Endpoint {
			call,
			message,
			status: meta_status(meta_ref),
			retry_after: meta_retry_after(meta_ref),
		}
		.into(),
	}
}

// Undecodable bodies behind 5xx or 429 are outages, not malformed answers.
fn is_server_failure(meta: Option<&ResponseMetadata>) -> bool {
	matches!(meta_status(meta), Some(429 | 500..))
}

fn map_server_response_error(
	strategy: &dyn ProviderStrategy,
	call: ProviderCall,
	response: BasicErrorResponse,
	meta: Option<&ResponseMetadata>,
) -> Error {
	let mut ctx =
		ProviderErrorContext::new(call).with_oauth_error(response.error().as_ref().to_string());

	if let Some(description) = response.error_description() {
		ctx = ctx.with_error_description(description.clone());
	}
	if let Some(status) = meta_status(meta) {
		ctx = ctx.with_http_status(status);
	}

	let classification = strategy.classify_token_error(&ctx);
	let message = if let Some(description) = response.error_description() {
		format!("{} ({description})", response.error().as_ref())
	} else {
		response.error().as_ref().to_owned()
	};

	match classification {
		ProviderErrorKind::InvalidGrant => Error::InvalidGrant { reason: message },
		ProviderErrorKind::InvalidClient => Error::InvalidClient { reason: message },
		ProviderErrorKind::InsufficientScope => Error::InsufficientScope { reason: message },
		ProviderErrorKind::Transient => TransientError::Endpoint {
			call,
			message,
			status: meta_status(meta),
			retry_after: meta_retry_after(meta),
		}
		.into(),
	}
}

#[cfg(feature = "reqwest")]
fn map_reqwest_error(
	call: ProviderCall,
	meta: Option<&ResponseMetadata>,
	err: ReqwestError,
) -> Error {
	if err.is_builder() {
		return ConfigError::from(err).into();
	}
	if err.is_timeout() {
		return TransientError::Endpoint {
			call,
			message: "request timed out".into(),
			status: meta_status(meta).or_else(|| err.status().map(|code| code.as_u16())),
			retry_after: meta_retry_after(meta),
		}
		.into();
	}

	TransportError::network(call, err).into()
}

#[cfg(feature = "reqwest")]
fn map_generic_transport_error(
	call: ProviderCall,
	meta: Option<&ResponseMetadata>,
	message: impl Display,
) -> Error {
	TransientError::Endpoint {
		call,
		message: format!("HTTP client error: {message}"),
		status: meta_status(meta),
		retry_after: meta_retry_after(meta),
	}
	.into()
}

#[cfg(feature = "reqwest")]
fn map_unknown_transport_error(call: ProviderCall, meta: Option<&ResponseMetadata>) -> Error {
	TransientError::Endpoint {
		call,
		message: "HTTP client error".into(),
		status: meta_status(meta),
		retry_after: meta_retry_after(meta),
	}
	.into()
}

fn meta_status(meta: Option<&ResponseMetadata>) -> Option<u16> {
	meta.and_then(|value| value.status)
}

fn meta_retry_after(meta: Option<&ResponseMetadata>) -> Option<Duration> {
	meta.and_then(|value| value.retry_after)
}
