//! Custom transports plugged into the QQ strategy.

// std
use std::{
	error::Error as StdError,
	fmt::{Display, Formatter, Result as FmtResult},
	future::Future,
	pin::Pin,
	sync::Arc,
};
// crates.io
use parking_lot::Mutex;
use time::Duration;
// self
use oauth2_qq::{
	auth::{ScopeSet, TokenSecret},
	error::{BoxError, ConfigError, Error, TransientError, TransportError},
	flows::{AuthenticationStrategy, CallbackParams, Profile},
	http::{ProviderHttpClient, ResponseMetadata, ResponseMetadataSlot},
	oauth::{
		TransportErrorMapper,
		oauth2::{AsyncHttpClient, HttpClientError, HttpRequest, HttpResponse},
	},
	provider::{ProviderCall, ProviderStrategy},
	qq::{QqOptions, QqStrategy},
	url::Url,
};

type VerifyFn = fn(TokenSecret, Option<TokenSecret>, Profile) -> VerifyFuture;
type VerifyFuture = Pin<Box<dyn Future<Output = Result<Option<String>, BoxError>> + Send>>;

fn accept_all(_access: TokenSecret, _refresh: Option<TokenSecret>, profile: Profile) -> VerifyFuture {
	Box::pin(async move { Ok(Some(profile.id)) })
}

#[derive(Debug)]
enum FakeTransportError {
	Throttled,
}
impl Display for FakeTransportError {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match self {
			Self::Throttled => write!(f, "Transport throttled."),
		}
	}
}
impl StdError for FakeTransportError {}

#[derive(Clone, Default)]
struct FakeHttpClient {
	retry_after: Duration,
	requests: Arc<Mutex<Vec<HttpRequest>>>,
}
impl FakeHttpClient {
	fn throttled(retry_after: Duration) -> Self {
		Self { retry_after, ..Default::default() }
	}
}
impl ProviderHttpClient for FakeHttpClient {
	type Handle = FakeHttpHandle;
	type TransportError = FakeTransportError;

	fn with_metadata(&self, slot: ResponseMetadataSlot) -> Self::Handle {
		FakeHttpHandle { slot, client: self.clone() }
	}
}

struct FakeHttpHandle {
	slot: ResponseMetadataSlot,
	client: FakeHttpClient,
}
impl<'a> AsyncHttpClient<'a> for FakeHttpHandle {
	type Error = HttpClientError<FakeTransportError>;
	type Future =
		Pin<Box<dyn Future<Output = Result<HttpResponse, Self::Error>> + 'a + Send + Sync>>;

	fn call(&'a self, request: HttpRequest) -> Self::Future {
		let slot = self.slot.clone();
		let retry_after = self.client.retry_after;

		self.client.requests.lock().push(request);

		Box::pin(async move {
			assert!(
				slot.take().is_none(),
				"ResponseMetadataSlot must be clear before dispatching a request."
			);
			slot.store(ResponseMetadata { status: Some(429), retry_after: Some(retry_after) });

			Err(HttpClientError::Reqwest(Box::new(FakeTransportError::Throttled)))
		})
	}
}

#[derive(Clone, Default)]
struct RecordingTransportErrorMapper {
	calls: Arc<Mutex<Vec<(ProviderCall, Option<ResponseMetadata>)>>>,
}
impl TransportErrorMapper<FakeTransportError> for RecordingTransportErrorMapper {
	fn map_transport_error(
		&self,
		_strategy: &dyn ProviderStrategy,
		call: ProviderCall,
		meta: Option<&ResponseMetadata>,
		err: HttpClientError<FakeTransportError>,
	) -> Error {
		let status = meta.and_then(|value| value.status);
		let retry_after = meta.and_then(|value| value.retry_after);

		self.calls.lock().push((call, meta.cloned()));

		match err {
			HttpClientError::Reqwest(inner) => TransientError::Endpoint {
				call,
				message: format!("fake transport error: {inner}"),
				status,
				retry_after,
			}
			.into(),
			HttpClientError::Http(inner) => ConfigError::from(inner).into(),
			HttpClientError::Io(inner) => TransportError::Io(inner).into(),
			other => TransientError::Endpoint {
				call,
				message: format!("unhandled HTTP client error: {other:?}"),
				status,
				retry_after,
			}
			.into(),
		}
	}
}

type FakeStrategy = QqStrategy<
	VerifyFn,
	oauth2_qq::oauth::BasicOAuth2Client<FakeHttpClient, RecordingTransportErrorMapper>,
>;

fn build(http_client: FakeHttpClient, mapper: RecordingTransportErrorMapper) -> FakeStrategy {
	let options = QqOptions::new("101", "app-key")
		.callback_url(Url::parse("https://app.example.com/auth/qq/callback").expect("Callback fixture should parse."));

	QqStrategy::with_http_client(options, accept_all as VerifyFn, http_client, mapper)
		.expect("Strategy should build around a custom transport.")
}

#[tokio::test]
async fn throttled_exchange_surfaces_retry_metadata() {
	let http_client = FakeHttpClient::throttled(Duration::seconds(5));
	let mapper = RecordingTransportErrorMapper::default();
	let strategy = build(http_client.clone(), mapper.clone());
	let session = strategy
		.start_authorization(&ScopeSet::default())
		.expect("Authorization session should start.");
	let err = strategy
		.authenticate(
			&session,
			CallbackParams {
				code: Some("CODE".into()),
				state: Some(session.state.clone()),
				..Default::default()
			},
		)
		.await
		.expect_err("Request should be throttled with HTTP 429.");

	match err {
		Error::Transient(TransientError::Endpoint {
			call: ProviderCall::TokenExchange,
			status,
			retry_after,
			..
		}) => {
			assert_eq!(status, Some(429));
			assert_eq!(retry_after, Some(Duration::seconds(5)));
		},
		other => panic!("Unexpected error variant: {other:?}."),
	}

	let requests = http_client.requests.lock();
	let wire = &requests[0];

	assert_eq!(wire.method(), "GET");
	assert!(wire.headers().get("content-type").is_none());
	assert!(wire.body().is_empty());
	assert!(wire.uri().query().is_some_and(|query| query.contains("code=CODE")));
}

#[tokio::test]
async fn profile_transport_failures_are_wrapped() {
	let mapper = RecordingTransportErrorMapper::default();
	let strategy = build(FakeHttpClient::throttled(Duration::seconds(30)), mapper.clone());
	let err = strategy
		.user_profile(&TokenSecret::new("TKN"))
		.await
		.expect_err("Throttled identity lookups must fail.");

	assert!(matches!(err, Error::Transport(TransportError::ProfileFetch { .. })));

	let calls = mapper.calls.lock();

	assert_eq!(calls.len(), 1, "The user-info call must not be attempted.");
	assert_eq!(calls[0].0, ProviderCall::Identity);
	assert_eq!(
		calls[0].1.as_ref().and_then(|meta| meta.retry_after),
		Some(Duration::seconds(30))
	);
}
