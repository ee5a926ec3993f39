//! Origin policy for browser clients.
//!
//! Note:
//! - CORS is enforced by browsers. A denied origin only means the grant headers are
//!   omitted; the request itself still reaches the rest of the pipeline.
//! - Preflight (`OPTIONS`) is answered here with 204 and never reaches later stages.
//!
//! Policy:
//! - `Any`: every origin (a missing `Origin` is treated as `*`) is granted.
//! - `Exact`, `Pattern`, `Predicate`: granted only when the origin matches.

use std::fmt;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Request, State},
    http::{HeaderMap, HeaderValue, Method, StatusCode, header},
    middleware::Next,
    response::Response,
};
use regex::Regex;

const DEFAULT_ALLOW_HEADERS: &str = "content-type";
const DEFAULT_ALLOW_METHODS: &str = "GET,POST,PATCH,DELETE";

pub type OriginPredicate = Arc<dyn Fn(&str) -> bool + Send + Sync>;

#[derive(Clone, Default)]
pub enum OriginPolicy {
    #[default]
    Any,
    Exact(String),
    Pattern(Regex),
    Predicate(OriginPredicate),
}

impl OriginPolicy {
    pub fn predicate<F>(f: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        Self::Predicate(Arc::new(f))
    }

    pub fn allows(&self, origin: &str) -> bool {
        match self {
            Self::Any => true,
            Self::Exact(allowed) => allowed == origin,
            Self::Pattern(re) => re.is_match(origin),
            Self::Predicate(f) => f(origin),
        }
    }
}

impl fmt::Debug for OriginPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => write!(f, "OriginPolicy::Any"),
            Self::Exact(o) => f.debug_tuple("OriginPolicy::Exact").field(o).finish(),
            Self::Pattern(re) => f
                .debug_tuple("OriginPolicy::Pattern")
                .field(&re.as_str())
                .finish(),
            Self::Predicate(_) => write!(f, "OriginPolicy::Predicate(<fn>)"),
        }
    }
}

pub async fn evaluate(
    State(policy): State<Arc<OriginPolicy>>,
    req: Request,
    next: Next,
) -> Response {
    let origin = req
        .headers()
        .get(header::ORIGIN)
        .cloned()
        .unwrap_or_else(|| HeaderValue::from_static("*"));
    // A non-UTF-8 origin can match nothing but the allow-all policy.
    let allowed = match origin.to_str() {
        Ok(o) => policy.allows(o),
        Err(_) => matches!(*policy, OriginPolicy::Any),
    };

    let grant = allowed.then(|| grant_headers(origin, req.headers()));

    let mut res = if req.method() == Method::OPTIONS {
        let mut res = Response::new(Body::empty());
        *res.status_mut() = StatusCode::NO_CONTENT;
        res
    } else {
        next.run(req).await
    };

    if let Some(grant) = grant {
        res.headers_mut().extend(grant);
    }
    res
}

fn grant_headers(origin: HeaderValue, req_headers: &HeaderMap) -> HeaderMap {
    let mut out = HeaderMap::with_capacity(4);
    out.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin);
    out.insert(header::VARY, HeaderValue::from_static("Origin"));
    out.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        req_headers
            .get(header::ACCESS_CONTROL_REQUEST_HEADERS)
            .cloned()
            .unwrap_or_else(|| HeaderValue::from_static(DEFAULT_ALLOW_HEADERS)),
    );
    out.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        req_headers
            .get(header::ACCESS_CONTROL_REQUEST_METHOD)
            .cloned()
            .unwrap_or_else(|| HeaderValue::from_static(DEFAULT_ALLOW_METHODS)),
    );
    out
}
