//! JavaScript API client for the browser extension
//!
//! Rendered from [`api::ROUTES`], one async method per public route on a
//! global `apiClient` object. Admin routes are left out.

use std::fmt::Write;

use crate::api::{self, RouteDef};

/// Render the client source for a server at `base_url`
pub fn render_js_client(base_url: &str) -> String {
    let mut js = String::new();

    js.push_str("// Generated by credicheck-gen-client. Do not edit.\n");
    let _ = writeln!(js, "const BASE_URL = {};", js_string(base_url.trim_end_matches('/')));
    js.push_str(
        r#"
function buildURL(endpoint, params = {}) {
    const url = new URL(BASE_URL + endpoint);
    Object.entries(params).forEach(([key, value]) => url.searchParams.append(key, value));
    return url;
}

// Simple cache using localStorage
const cacheKey = (url) => `credicheck::${url}`;

const apiClient = {
"#,
    );

    for route in api::routes(false) {
        render_method(&mut js, route);
    }

    js.push_str(
        r#"    /**
     * Get Cached Community Rating
     * Returns the cached community rating for a given page, or fetches it if not cached.
     * @param {string} site - The URL of the page to get the community rating for
     * @returns {Promise<Object>} - The community rating
     */
    async getCachedCommunityRating(site) {
        const cached = localStorage.getItem(cacheKey(`ratings::${site}`));
        if (cached) return JSON.parse(cached);
        const rating = await apiClient.getCommunityRating(site);
        localStorage.setItem(cacheKey(`ratings::${site}`), JSON.stringify(rating));
        return rating;
    },
};

if (typeof window !== "undefined") {
    window.apiClient = apiClient;
}
"#,
    );

    js
}

fn render_method(js: &mut String, route: &RouteDef) {
    let names: Vec<&str> = route.params.iter().map(|p| p.name).collect();

    js.push_str("    /**\n");
    let _ = writeln!(js, "     * {}", route.summary);
    let _ = writeln!(js, "     * {}", route.description);
    for param in route.params {
        let _ = writeln!(
            js,
            "     * @param {{{}}} {} - {}",
            param.js_type, param.name, param.description
        );
    }
    if route.mutating {
        js.push_str("     * @returns {Promise<boolean>} - Resolves once the request succeeded\n");
    } else {
        js.push_str("     * @returns {Promise<Object>} - The response data\n");
    }
    js.push_str("     */\n");

    let _ = writeln!(js, "    async {}({}) {{", route.client_name, names.join(", "));

    let path = js_string(route.path);
    if names.is_empty() {
        let _ = writeln!(js, "        const url = buildURL({});", path);
    } else {
        let params: Vec<String> = names.iter().map(|n| format!("{}: {}", n, n)).collect();
        let _ = writeln!(
            js,
            "        const url = buildURL({}, {{ {} }});",
            path,
            params.join(", ")
        );
    }

    if route.method == "GET" {
        js.push_str("        const res = await fetch(url);\n");
    } else {
        let _ = writeln!(
            js,
            "        const res = await fetch(url, {{ method: {} }});",
            js_string(route.method)
        );
    }

    let failure = js_string(&format!("Failed to {}", route.summary));
    let _ = writeln!(js, "        if (!res.ok) throw new Error({});", failure);

    if route.mutating {
        if names.contains(&"site") {
            js.push_str("        localStorage.removeItem(cacheKey(`ratings::${site}`));\n");
        }
        js.push_str("        return true;\n");
    } else {
        js.push_str("        return await res.json();\n");
    }

    js.push_str("    },\n\n");
}

/// Quote a string as a JavaScript literal
fn js_string(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| "\"\"".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_renders_every_public_route() {
        let js = render_js_client("http://localhost:4269/");

        assert!(js.contains(r#"const BASE_URL = "http://localhost:4269";"#));
        for route in api::routes(false) {
            assert!(
                js.contains(&format!("async {}(", route.client_name)),
                "missing {}",
                route.client_name
            );
        }
        assert!(!js.contains("setCredibilityRating"));
        assert!(js.contains("window.apiClient = apiClient;"));
    }

    #[test]
    fn test_cast_vote_method() {
        let js = render_js_client("http://localhost:4269");

        assert!(js.contains("async castUserVote(site, vote) {"));
        assert!(js.contains(r#"buildURL("/ratings", { site: site, vote: vote })"#));
        assert!(js.contains(r#"fetch(url, { method: "PUT" })"#));
        assert!(js.contains("@param {number} vote"));
    }

    #[test]
    fn test_get_method_parses_json() {
        let js = render_js_client("http://localhost:4269");
        let start = js.find("async getUserVotes()").unwrap();
        let body = &js[start..start + js[start..].find("},").unwrap()];
        assert!(body.contains("await fetch(url);"));
        assert!(body.contains("return await res.json();"));
    }
}
