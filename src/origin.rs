//! Origin Validator
//!
//! Decides whether a cross-origin request may be served. Two policies exist:
//! standalone glob matching and delegation to an embedding host.

use std::sync::Arc;

use globset::{GlobBuilder, GlobMatcher};

use crate::host::{EventLog, Gateway};

// == Origin Policy ==
/// Decision point for the `Origin` request header.
pub trait OriginPolicy: Send + Sync {
    /// Returns true when a request carrying `origin` may be served.
    /// An empty string means the request carried no `Origin` header.
    fn is_allowed(&self, origin: &str) -> bool;
}

// == Pattern Policy ==
/// Standalone policy matching the raw origin against glob patterns.
#[derive(Debug)]
pub struct PatternPolicy {
    patterns: Vec<GlobMatcher>,
    /// No patterns were configured at all
    open: bool,
}

impl PatternPolicy {
    /// Compiles `allow_origins` once. Malformed patterns are logged and
    /// skipped; they never widen the policy.
    ///
    /// Patterns support `*`, `?`, `[...]` classes and `{a,b}` alternation.
    /// `*` crosses `/`, so `https://*` covers any https origin.
    pub fn new(allow_origins: &[String], log: &EventLog) -> Self {
        let patterns = allow_origins
            .iter()
            .filter_map(|raw| match compile(raw) {
                Ok(matcher) => Some(matcher),
                Err(e) => {
                    log.error(format_args!(
                        "Config allow_origin failed to parse glob {:?}: {}",
                        raw, e
                    ));
                    None
                }
            })
            .collect();

        Self {
            patterns,
            open: allow_origins.is_empty(),
        }
    }
}

impl OriginPolicy for PatternPolicy {
    fn is_allowed(&self, origin: &str) -> bool {
        if self.open || origin.is_empty() {
            return true;
        }
        self.patterns.iter().any(|matcher| matcher.is_match(origin))
    }
}

fn compile(pattern: &str) -> Result<GlobMatcher, globset::Error> {
    let glob = GlobBuilder::new(pattern)
        .literal_separator(false)
        .case_insensitive(false)
        .build()?;
    Ok(glob.compile_matcher())
}

// == Host Policy ==
/// Embedded policy: the host already polices origins, defer to it.
pub struct HostPolicy {
    gateway: Arc<dyn Gateway>,
}

impl HostPolicy {
    pub fn new(gateway: Arc<dyn Gateway>) -> Self {
        Self { gateway }
    }
}

impl OriginPolicy for HostPolicy {
    fn is_allowed(&self, origin: &str) -> bool {
        self.gateway.is_client_origin_allowed(origin)
    }
}
