//! HTTP API surface: route table, query parameters and site URL parsing
//!
//! The route table drives both the startup endpoint listing and the
//! generated JavaScript client, so the two cannot drift from the router.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use url::Url;

use crate::error::CrediError;

pub use crate::db::Tally;
pub use crate::services::{CredibilityRating, UserVote};

/// A query parameter accepted by a route
#[derive(Debug, Clone, Copy)]
pub struct ParamDef {
    pub name: &'static str,
    /// JSDoc type of the parameter
    pub js_type: &'static str,
    pub description: &'static str,
}

/// One endpoint of the API
#[derive(Debug, Clone, Copy)]
pub struct RouteDef {
    pub method: &'static str,
    pub path: &'static str,
    /// Method name on the generated JS client
    pub client_name: &'static str,
    pub summary: &'static str,
    pub description: &'static str,
    pub params: &'static [ParamDef],
    /// Mutating routes answer 200 (changed) or 204 (no change) with no body
    pub mutating: bool,
    /// Only served when the admin API is enabled; never in the JS client
    pub admin: bool,
}

const SITE: ParamDef = ParamDef {
    name: "site",
    js_type: "string",
    description: "Full URL of the page; its host is the rated domain",
};

const VOTE: ParamDef = ParamDef {
    name: "vote",
    js_type: "number",
    description: "-1 (down), 1 (up), or 0 to remove the vote",
};

const SCORE: ParamDef = ParamDef {
    name: "score",
    js_type: "number",
    description: "Non-negative credibility score",
};

/// Every route the server answers (besides OPTIONS preflight)
pub const ROUTES: &[RouteDef] = &[
    RouteDef {
        method: "GET",
        path: "/health",
        client_name: "getHealth",
        summary: "Health Check",
        description: "Returns service status and version.",
        params: &[],
        mutating: false,
        admin: false,
    },
    RouteDef {
        method: "GET",
        path: "/score",
        client_name: "getCredibilityRating",
        summary: "Get Credibility Rating",
        description: "Returns the central credibility rating for a given domain.",
        params: &[SITE],
        mutating: false,
        admin: false,
    },
    RouteDef {
        method: "PUT",
        path: "/score",
        client_name: "setCredibilityRating",
        summary: "Set Credibility Rating",
        description: "Assigns the central credibility rating for a domain. Write-once.",
        params: &[SITE, SCORE],
        mutating: false,
        admin: true,
    },
    RouteDef {
        method: "GET",
        path: "/ratings",
        client_name: "getCommunityRating",
        summary: "Get Community Rating",
        description: "Returns the aggregate community rating for a given domain.",
        params: &[SITE],
        mutating: false,
        admin: false,
    },
    RouteDef {
        method: "PUT",
        path: "/ratings",
        client_name: "castUserVote",
        summary: "Cast User Vote",
        description: "Casts a personal vote on a given domain. A value of 0 removes any existing vote.",
        params: &[SITE, VOTE],
        mutating: true,
        admin: false,
    },
    RouteDef {
        method: "DELETE",
        path: "/ratings",
        client_name: "removeUserVote",
        summary: "Remove User Vote",
        description: "Removes a personal vote on a given domain.",
        params: &[SITE],
        mutating: true,
        admin: false,
    },
    RouteDef {
        method: "GET",
        path: "/ratings/my/all",
        client_name: "getUserVotes",
        summary: "Get User Votes",
        description: "Returns all votes cast by request sender.",
        params: &[],
        mutating: false,
        admin: false,
    },
    RouteDef {
        method: "GET",
        path: "/ratings/my",
        client_name: "getUserVoteFor",
        summary: "Get User Vote For",
        description: "Returns the vote cast by request sender for a given domain.",
        params: &[SITE],
        mutating: false,
        admin: false,
    },
    RouteDef {
        method: "GET",
        path: "/ratings/all",
        client_name: "getAllRatings",
        summary: "Get All Ratings",
        description: "Returns all ratings in the database.",
        params: &[],
        mutating: false,
        admin: false,
    },
];

/// Routes visible for a given admin setting
pub fn routes(admin_api: bool) -> impl Iterator<Item = &'static RouteDef> {
    ROUTES.iter().filter(move |r| admin_api || !r.admin)
}

// ============================================================================
// Query Parameters
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct SiteQuery {
    pub site: String,
}

#[derive(Debug, Deserialize)]
pub struct VoteQuery {
    pub site: String,
    pub vote: i64,
}

#[derive(Debug, Deserialize)]
pub struct ScoreQuery {
    pub site: String,
    pub score: f64,
}

/// Decode a URL query string into `T`
pub fn parse_query<T: DeserializeOwned>(query: Option<&str>) -> Result<T, CrediError> {
    serde_urlencoded::from_str(query.unwrap_or(""))
        .map_err(|e| CrediError::InvalidInput(format!("Invalid query parameters: {}", e)))
}

/// Extract the rated domain from a page URL.
///
/// Only http(s) URLs are accepted. A bare host such as `example.com` is
/// read as `https://example.com`.
pub fn domain_from_site(site: &str) -> Result<String, CrediError> {
    let site = site.trim();
    let url = match Url::parse(site) {
        Ok(url) => url,
        Err(url::ParseError::RelativeUrlWithoutBase) => Url::parse(&format!("https://{}", site))
            .map_err(|e| CrediError::InvalidInput(format!("Invalid site URL: {}", e)))?,
        Err(e) => return Err(CrediError::InvalidInput(format!("Invalid site URL: {}", e))),
    };

    if !matches!(url.scheme(), "http" | "https") {
        return Err(CrediError::InvalidInput(format!(
            "Unsupported URL scheme: {}",
            url.scheme()
        )));
    }

    match url.host_str() {
        Some(host) if !host.is_empty() => Ok(host.trim_end_matches('.').to_ascii_lowercase()),
        _ => Err(CrediError::InvalidInput("Invalid domain in URL".into())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_from_site() {
        assert_eq!(
            domain_from_site("https://www.Example.com/news/article?id=3").unwrap(),
            "www.example.com"
        );
        assert_eq!(domain_from_site("http://example.org:8080/").unwrap(), "example.org");
        assert_eq!(domain_from_site("example.net/path").unwrap(), "example.net");
        assert_eq!(domain_from_site("http://127.0.0.1/").unwrap(), "127.0.0.1");
    }

    #[test]
    fn test_domain_from_site_rejects_garbage() {
        for bad in ["", "ftp://example.com/file", "mailto:someone@example.com", "http://"] {
            assert!(
                matches!(domain_from_site(bad), Err(CrediError::InvalidInput(_))),
                "{:?}",
                bad
            );
        }
    }

    #[test]
    fn test_parse_vote_query() {
        let q: VoteQuery =
            parse_query(Some("site=https%3A%2F%2Fexample.com%2Fa&vote=-1")).unwrap();
        assert_eq!(q.site, "https://example.com/a");
        assert_eq!(q.vote, -1);

        let missing = parse_query::<VoteQuery>(Some("site=x"));
        assert!(matches!(missing, Err(CrediError::InvalidInput(_))));

        let not_a_number = parse_query::<VoteQuery>(Some("site=x&vote=up"));
        assert!(matches!(not_a_number, Err(CrediError::InvalidInput(_))));
    }

    #[test]
    fn test_admin_routes_hidden_by_default() {
        assert!(routes(false).all(|r| !r.admin));
        assert!(routes(true).any(|r| r.admin));
    }
}
