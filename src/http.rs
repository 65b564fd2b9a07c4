//! HTTP API for website credibility ratings
//!
//! ## Scores
//! - `GET /score?site=URL` - Central credibility score (null if unset)
//! - `PUT /score?site=URL&score=N` - Assign a score, write-once (admin API only)
//!
//! ## Community ratings
//! - `GET /ratings?site=URL` - Up/down tally for the site's domain
//! - `PUT /ratings?site=URL&vote=V` - Cast a vote (-1, 0 or 1); 200 if changed, 204 if not
//! - `DELETE /ratings?site=URL` - Withdraw a vote; 200 if removed, 204 if none
//! - `GET /ratings/my?site=URL` - The caller's vote on a domain (0 if none)
//! - `GET /ratings/my/all` - Every vote the caller holds
//! - `GET /ratings/all` - Every tally
//!
//! The caller is identified by the TCP peer address.
//!
//! ## Example Usage
//!
//! ```bash
//! curl -X PUT "http://localhost:4269/ratings?site=https://example.com/news&vote=1"
//! curl "http://localhost:4269/ratings?site=https://example.com/"
//! ```

use crate::api::{self, ScoreQuery, SiteQuery, VoteQuery};
use crate::error::CrediError;
use crate::services::response::{self, HttpResponse};
use crate::services::Services;
use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response};
use hyper_util::rt::TokioIo;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

/// HTTP server state
pub struct HttpServer {
    services: Arc<Services>,
    bind_addr: SocketAddr,
    /// Serve `PUT /score`
    admin_api: bool,
}

impl HttpServer {
    /// Create a new HTTP server
    pub fn new(services: Arc<Services>, bind_addr: SocketAddr) -> Self {
        Self {
            services,
            bind_addr,
            admin_api: false,
        }
    }

    /// Enable the admin routes
    pub fn with_admin_api(mut self, enabled: bool) -> Self {
        self.admin_api = enabled;
        self
    }

    /// Run the HTTP server
    pub async fn run(self: Arc<Self>) -> Result<(), CrediError> {
        let listener = TcpListener::bind(self.bind_addr).await?;
        self.serve(listener).await
    }

    /// Serve connections from an already bound listener
    pub async fn serve(self: Arc<Self>, listener: TcpListener) -> Result<(), CrediError> {
        info!(addr = %listener.local_addr()?, "HTTP server listening");

        loop {
            let (stream, remote_addr) = listener.accept().await?;
            let io = TokioIo::new(stream);
            let server = self.clone();

            tokio::spawn(async move {
                let service = service_fn(move |req| {
                    let server = server.clone();
                    async move { server.handle_request(req, remote_addr).await }
                });

                if let Err(err) = http1::Builder::new()
                    .serve_connection(io, service)
                    .await
                {
                    warn!(addr = %remote_addr, error = %err, "Connection error");
                }
            });
        }
    }

    async fn handle_request(
        &self,
        req: Request<Incoming>,
        remote_addr: SocketAddr,
    ) -> Result<Response<Full<Bytes>>, hyper::Error> {
        let method = req.method().clone();
        let path = req.uri().path().to_string();
        let query = req.uri().query().map(str::to_string);

        debug!(method = %method, path = %path, client = %remote_addr, "Incoming request");

        Ok(self
            .route(&method, &path, query.as_deref(), Some(remote_addr.ip()))
            .await)
    }

    /// Route a request to its handler.
    ///
    /// `client` is the caller's address; `None` means it could not be
    /// determined and caller-scoped routes answer 401.
    pub async fn route(
        &self,
        method: &Method,
        path: &str,
        query: Option<&str>,
        client: Option<IpAddr>,
    ) -> HttpResponse {
        let result = match (method, path) {
            (&Method::OPTIONS, _) => Ok(response::preflight()),

            (&Method::GET, "/health") => self.handle_health().await,

            (&Method::GET, "/score") => self.handle_get_score(query).await,
            (&Method::PUT, "/score") if self.admin_api => self.handle_put_score(query).await,

            (&Method::GET, "/ratings") => self.handle_get_tally(query).await,
            (&Method::PUT, "/ratings") => self.handle_cast_vote(query, client).await,
            (&Method::DELETE, "/ratings") => self.handle_remove_vote(query, client).await,
            (&Method::GET, "/ratings/my") => self.handle_get_my_vote(query, client).await,
            (&Method::GET, "/ratings/my/all") => self.handle_get_my_votes(client).await,
            (&Method::GET, "/ratings/all") => self.handle_get_all_tallies().await,

            _ => Ok(response::not_found(&format!("No route for {} {}", method, path))),
        };

        result.unwrap_or_else(response::error_response)
    }

    // =========================================================================
    // Handlers
    // =========================================================================

    async fn handle_health(&self) -> Result<HttpResponse, CrediError> {
        let db = self.services.db.clone();
        let stats = blocking(move || db.stats()).await?;
        Ok(response::ok(&serde_json::json!({
            "status": "ok",
            "version": env!("CARGO_PKG_VERSION"),
            "stats": stats,
        })))
    }

    async fn handle_get_score(&self, query: Option<&str>) -> Result<HttpResponse, CrediError> {
        let domain = site_domain(query)?;
        let scores = self.services.scores.clone();
        let rating = blocking(move || scores.get_rating(&domain)).await?;
        Ok(response::ok(&rating))
    }

    async fn handle_put_score(&self, query: Option<&str>) -> Result<HttpResponse, CrediError> {
        let q: ScoreQuery = api::parse_query(query)?;
        let domain = api::domain_from_site(&q.site)?;
        let scores = self.services.scores.clone();
        let result = blocking(move || scores.set_score(&domain, q.score)).await;
        Ok(response::from_create_result(result))
    }

    async fn handle_get_tally(&self, query: Option<&str>) -> Result<HttpResponse, CrediError> {
        let domain = site_domain(query)?;
        let votes = self.services.votes.clone();
        let tally = blocking(move || votes.get_tally(&domain)).await?;
        Ok(response::ok(&tally))
    }

    async fn handle_cast_vote(
        &self,
        query: Option<&str>,
        client: Option<IpAddr>,
    ) -> Result<HttpResponse, CrediError> {
        let user = caller(client)?;
        let q: VoteQuery = api::parse_query(query)?;
        let domain = api::domain_from_site(&q.site)?;

        let votes = self.services.votes.clone();
        let result = blocking(move || votes.cast_vote(&user, &domain, q.vote)).await;
        Ok(response::from_changed_result(result))
    }

    async fn handle_remove_vote(
        &self,
        query: Option<&str>,
        client: Option<IpAddr>,
    ) -> Result<HttpResponse, CrediError> {
        let user = caller(client)?;
        let domain = site_domain(query)?;

        let votes = self.services.votes.clone();
        let result = blocking(move || {
            // A caller never seen before has nothing to remove
            if !votes.user_exists(&user)? {
                return Ok(false);
            }
            votes.remove_vote(&user, &domain)
        })
        .await;
        Ok(response::from_changed_result(result))
    }

    async fn handle_get_my_vote(
        &self,
        query: Option<&str>,
        client: Option<IpAddr>,
    ) -> Result<HttpResponse, CrediError> {
        let user = caller(client)?;
        let domain = site_domain(query)?;
        let votes = self.services.votes.clone();
        let value = blocking(move || votes.get_vote_for_user(&user, &domain)).await?;
        Ok(response::ok(&value))
    }

    async fn handle_get_my_votes(&self, client: Option<IpAddr>) -> Result<HttpResponse, CrediError> {
        let user = caller(client)?;
        let votes = self.services.votes.clone();
        let mine = blocking(move || votes.list_votes_for_user(&user)).await?;
        Ok(response::ok(&mine))
    }

    async fn handle_get_all_tallies(&self) -> Result<HttpResponse, CrediError> {
        let votes = self.services.votes.clone();
        let all = blocking(move || votes.list_tallies()).await?;
        Ok(response::ok(&all))
    }
}

/// Caller identity: the peer address, with IPv4-mapped IPv6 unwrapped
fn caller(client: Option<IpAddr>) -> Result<String, CrediError> {
    client
        .map(|ip| ip.to_canonical().to_string())
        .ok_or_else(|| CrediError::Unauthorized("Unauthorized".into()))
}

fn site_domain(query: Option<&str>) -> Result<String, CrediError> {
    let q: SiteQuery = api::parse_query(query)?;
    api::domain_from_site(&q.site)
}

/// Run a synchronous database call off the async reactor
async fn blocking<F, T>(f: F) -> Result<T, CrediError>
where
    F: FnOnce() -> Result<T, CrediError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| CrediError::Internal(format!("Blocking task failed: {}", e)))?
}
