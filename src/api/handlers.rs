//! API Handlers
//!
//! The avatar redirect handler and the state it shares with the reclaimer.

use std::sync::Arc;

use axum::{
    extract::State,
    http::{
        header::{ACCESS_CONTROL_ALLOW_ORIGIN, CACHE_CONTROL, LOCATION, ORIGIN},
        HeaderMap, HeaderValue, Method, StatusCode, Uri,
    },
    response::{IntoResponse, Response},
};

use crate::cache::{ResolutionCache, ResolvedIdentity};
use crate::config::Config;
use crate::error::{GatewayError, Result};
use crate::host::{EventLog, Gateway};
use crate::lookup::AccountStore;
use crate::origin::{HostPolicy, OriginPolicy, PatternPolicy};

/// Route prefix; the account is the single segment after it.
pub const ROUTE_PREFIX: &str = "/gravatar";

/// Application state shared across all handlers and the reclaimer.
///
/// Built once at startup; every request sees the same cache and config.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub cache: Arc<ResolutionCache>,
    pub store: Arc<dyn AccountStore>,
    pub origins: Arc<dyn OriginPolicy>,
    pub log: EventLog,
}

impl AppState {
    pub fn new(
        config: Config,
        store: Arc<dyn AccountStore>,
        origins: Arc<dyn OriginPolicy>,
        log: EventLog,
    ) -> Self {
        Self {
            config: Arc::new(config),
            cache: Arc::new(ResolutionCache::new()),
            store,
            origins,
            log,
        }
    }

    /// Standalone state: glob origin policy, logging through `tracing`.
    pub fn standalone(config: Config, store: Arc<dyn AccountStore>) -> Self {
        let log = EventLog::Tracing;
        let origins = Arc::new(PatternPolicy::new(&config.allow_origins, &log));
        Self::new(config, store, origins, log)
    }

    /// Embedded state: origin decisions and logging belong to the host.
    pub fn embedded(
        config: Config,
        store: Arc<dyn AccountStore>,
        gateway: Arc<dyn Gateway>,
    ) -> Self {
        let origins = Arc::new(HostPolicy::new(gateway.clone()));
        Self::new(config, store, origins, EventLog::Host(gateway))
    }
}

/// Handler for GET /gravatar/{account}
///
/// Validates origin, method and path, resolves the account through the
/// cache or the lookup store, and redirects to the avatar URL. A fresh
/// resolution is cached once the response has been built.
pub async fn gravatar_handler(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> Result<Response> {
    let origin = headers
        .get(ORIGIN)
        .cloned()
        .unwrap_or_else(|| HeaderValue::from_static(""));
    let origin_str = origin.to_str().map_err(|_| GatewayError::Forbidden)?;
    if !state.origins.is_allowed(origin_str) {
        state
            .log
            .debug(format_args!("Rejected origin {:?}", origin_str));
        return Err(GatewayError::Forbidden);
    }

    if method != Method::GET {
        return Err(GatewayError::MethodNotAllowed);
    }

    let account = parse_account(uri.path())?;
    let key = account.to_lowercase();
    let lifetime = state.config.cache_life;

    let cached = state
        .cache
        .get(&key)
        .await
        .filter(|identity| !identity.is_stale(lifetime));

    let (identity, fresh) = match cached {
        Some(identity) => (identity, false),
        None => (resolve(&state, key).await?, true),
    };

    let target = redirect_target(&state.config.gravatar_url, &identity.avatar_token, uri.query());
    let location = HeaderValue::try_from(target)
        .map_err(|e| GatewayError::Internal(format!("invalid redirect target: {}", e)))?;
    let cache_control = HeaderValue::try_from(cache_control(lifetime))
        .map_err(|e| GatewayError::Internal(format!("invalid cache-control: {}", e)))?;

    let response = (
        StatusCode::FOUND,
        [
            (LOCATION, location),
            (CACHE_CONTROL, cache_control),
            (ACCESS_CONTROL_ALLOW_ORIGIN, origin),
        ],
    )
        .into_response();

    if fresh {
        state.cache.insert(identity).await;
    }

    Ok(response)
}

/// Resolves `key` through the lookup store, applying the salted fallback to
/// unknown accounts. Runs outside any cache lock.
async fn resolve(state: &AppState, key: String) -> Result<ResolvedIdentity> {
    match state.store.lookup(&key).await {
        Ok(Some(record)) => Ok(ResolvedIdentity::found(key, record)),
        Ok(None) => Ok(ResolvedIdentity::fallback(key, &state.config.salt)),
        Err(e) => {
            state.log.error(format_args!("Database query error: {}", e));
            Err(e.into())
        }
    }
}

/// Extracts the account from a `/gravatar/{account}` path.
///
/// The path is percent-decoded first, so an encoded slash inside the
/// account makes the shape invalid.
pub fn parse_account(path: &str) -> Result<String> {
    let decoded = urlencoding::decode(path)
        .map_err(|_| GatewayError::BadRequest("path is not valid UTF-8".to_string()))?;

    match decoded.rsplit_once('/') {
        Some((dir, account)) if dir == ROUTE_PREFIX && !account.is_empty() => {
            Ok(account.to_string())
        }
        _ => Err(GatewayError::BadRequest(format!(
            "expected {}/{{account}}",
            ROUTE_PREFIX
        ))),
    }
}

/// Appends `token` to the base URL and carries the raw query over verbatim.
pub fn redirect_target(base: &str, token: &str, query: Option<&str>) -> String {
    let mut target = format!("{}/{}", base.trim_end_matches('/'), token);
    if let Some(query) = query.filter(|q| !q.is_empty()) {
        target.push('?');
        target.push_str(query);
    }
    target
}

fn cache_control(lifetime: std::time::Duration) -> String {
    format!("public, max-age:{}", lifetime.as_secs_f64().round_ties_even() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hasher::avatar_hash;
    use crate::lookup::MemoryStore;

    fn test_state(store: Arc<MemoryStore>) -> AppState {
        let mut config = Config::with_salt("xyz");
        config.gravatar_url = "https://grav.example/avatar".to_string();
        config.allow_origins = vec!["https://good.example".to_string()];
        AppState::standalone(config, store)
    }

    async fn call(state: &AppState, method: Method, uri: &str, origin: Option<&str>) -> Response {
        let mut headers = HeaderMap::new();
        if let Some(origin) = origin {
            headers.insert(ORIGIN, HeaderValue::from_str(origin).unwrap());
        }
        let uri: Uri = uri.parse().unwrap();
        match gravatar_handler(State(state.clone()), method, uri, headers).await {
            Ok(response) => response,
            Err(error) => error.into_response(),
        }
    }

    fn location(response: &Response) -> &str {
        response.headers()[LOCATION].to_str().unwrap()
    }

    #[test]
    fn test_parse_account() {
        assert_eq!(parse_account("/gravatar/alice").unwrap(), "alice");
        assert_eq!(parse_account("/gravatar/Al%5Bice%5D").unwrap(), "Al[ice]");
        assert!(parse_account("/gravatar/").is_err());
        assert!(parse_account("/gravatar").is_err());
        assert!(parse_account("/gravatar/a/b").is_err());
        assert!(parse_account("/gravatar/a%2Fb").is_err());
        assert!(parse_account("/other/alice").is_err());
        assert!(parse_account("/gravatar/%FF").is_err());
    }

    #[test]
    fn test_redirect_target() {
        assert_eq!(
            redirect_target("https://grav.example/avatar", "abc", Some("s=80")),
            "https://grav.example/avatar/abc?s=80"
        );
        assert_eq!(
            redirect_target("//www.gravatar.com/avatar/", "abc", None),
            "//www.gravatar.com/avatar/abc"
        );
        assert_eq!(
            redirect_target("https://grav.example", "abc", Some("")),
            "https://grav.example/abc"
        );
    }

    #[test]
    fn test_cache_control_format() {
        assert_eq!(
            cache_control(std::time::Duration::from_secs(6 * 3600)),
            "public, max-age:21600"
        );
        assert_eq!(
            cache_control(std::time::Duration::from_millis(1500)),
            "public, max-age:2"
        );
        // halves round to even
        assert_eq!(
            cache_control(std::time::Duration::from_millis(2500)),
            "public, max-age:2"
        );
        assert_eq!(
            cache_control(std::time::Duration::from_millis(3500)),
            "public, max-age:4"
        );
    }

    #[tokio::test]
    async fn test_redirect_for_known_account() {
        let store = Arc::new(MemoryStore::new().with_account("Alice", "alice@example.com"));
        let state = test_state(store.clone());

        let response = call(&state, Method::GET, "/gravatar/Alice?s=80", None).await;

        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(
            location(&response),
            format!(
                "https://grav.example/avatar/{}?s=80",
                avatar_hash("alice@example.com")
            )
        );
        assert_eq!(response.headers()[CACHE_CONTROL], "public, max-age:21600");
        assert_eq!(response.headers()[ACCESS_CONTROL_ALLOW_ORIGIN], "");

        let cached = state.cache.get("alice").await.unwrap();
        assert_eq!(cached.display_account, "Alice");
        assert_eq!(store.calls(), 1);
    }

    #[tokio::test]
    async fn test_unknown_account_uses_salted_fallback() {
        let store = Arc::new(MemoryStore::new());
        let state = test_state(store);

        let response = call(&state, Method::GET, "/gravatar/bob", None).await;

        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(
            location(&response),
            format!("https://grav.example/avatar/{}", avatar_hash("bobxyz"))
        );
        let cached = state.cache.get("bob").await.unwrap();
        assert_eq!(cached.email_or_fallback, "bobxyz");
    }

    #[tokio::test]
    async fn test_origin_echoed_when_allowed() {
        let state = test_state(Arc::new(MemoryStore::new()));

        let response = call(
            &state,
            Method::GET,
            "/gravatar/bob",
            Some("https://good.example"),
        )
        .await;

        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(
            response.headers()[ACCESS_CONTROL_ALLOW_ORIGIN],
            "https://good.example"
        );
    }

    #[tokio::test]
    async fn test_validation_failures() {
        let store = Arc::new(MemoryStore::new());
        let state = test_state(store.clone());

        let forbidden = call(
            &state,
            Method::GET,
            "/gravatar/bob",
            Some("https://evil.example"),
        )
        .await;
        assert_eq!(forbidden.status(), StatusCode::FORBIDDEN);

        let not_allowed = call(&state, Method::POST, "/gravatar/alice", None).await;
        assert_eq!(not_allowed.status(), StatusCode::METHOD_NOT_ALLOWED);

        let bad = call(&state, Method::GET, "/gravatar/", None).await;
        assert_eq!(bad.status(), StatusCode::BAD_REQUEST);

        // forbidden wins over a bad method
        let both = call(
            &state,
            Method::POST,
            "/gravatar/alice",
            Some("https://evil.example"),
        )
        .await;
        assert_eq!(both.status(), StatusCode::FORBIDDEN);

        assert_eq!(store.calls(), 0);
        assert!(state.cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_backend_error_is_not_cached() {
        let store = Arc::new(MemoryStore::new().with_account("alice", "alice@example.com"));
        store.set_failing(true);
        let state = test_state(store.clone());

        let response = call(&state, Method::GET, "/gravatar/alice", None).await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(state.cache.is_empty().await);

        store.set_failing(false);
        let response = call(&state, Method::GET, "/gravatar/alice", None).await;
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(store.calls(), 2);
    }

    #[tokio::test]
    async fn test_cache_hit_skips_lookup() {
        let store = Arc::new(MemoryStore::new().with_account("alice", "alice@example.com"));
        let state = test_state(store.clone());

        let first = call(&state, Method::GET, "/gravatar/alice", None).await;
        let second = call(&state, Method::GET, "/gravatar/ALICE?s=200", None).await;

        assert_eq!(store.calls(), 1);
        let token = avatar_hash("alice@example.com");
        assert!(location(&first).ends_with(&token));
        assert!(location(&second).ends_with(&format!("{}?s=200", token)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_entry_triggers_one_new_lookup() {
        let store = Arc::new(MemoryStore::new().with_account("alice", "alice@example.com"));
        let state = test_state(store.clone());
        let lifetime = state.config.cache_life;

        call(&state, Method::GET, "/gravatar/alice", None).await;
        tokio::time::advance(lifetime + std::time::Duration::from_secs(1)).await;
        call(&state, Method::GET, "/gravatar/alice", None).await;
        call(&state, Method::GET, "/gravatar/alice", None).await;

        assert_eq!(store.calls(), 2);
    }
}
