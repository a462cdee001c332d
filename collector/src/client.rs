use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use model::github::{
    GraphQLRequest, GraphQLResponse, SearchNode, SearchVariables, SEARCH_REPOSITORIES_QUERY,
};
use model::CollectorContext;
use reqwest::header::{HeaderMap, AUTHORIZATION, CONTENT_TYPE, RETRY_AFTER, USER_AGENT};
use reqwest::StatusCode;
use tracing::debug;

use crate::collector::{SearchPage, SearchSource};
use crate::error::CollectError;

const RATE_LIMIT_REMAINING: &str = "x-ratelimit-remaining";
const RATE_LIMIT_RESET: &str = "x-ratelimit-reset";

/// GraphQL search client. One request per page, no retries.
pub struct GithubClient {
    client: reqwest::Client,
    api_url: String,
    token: String,
    query_string: String,
}

impl GithubClient {
    pub fn new(ctx: &CollectorContext) -> Result<Self, CollectError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(ctx.settings.request_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            api_url: ctx.api_url.clone(),
            token: ctx.token.clone(),
            query_string: ctx.search_query(),
        })
    }

    async fn post_query(&self, variables: SearchVariables) -> Result<SearchPage, CollectError> {
        let request = GraphQLRequest {
            query: SEARCH_REPOSITORIES_QUERY,
            variables,
        };

        let response = self
            .client
            .post(&self.api_url)
            .header(AUTHORIZATION, format!("Bearer {}", self.token))
            .header(CONTENT_TYPE, "application/json")
            .header(USER_AGENT, concat!("java-quality-pipeline/", env!("CARGO_PKG_VERSION")))
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response.text().await?;
        read_search_page(status, &headers, &body, Utc::now())
    }
}

#[async_trait]
impl SearchSource for GithubClient {
    async fn fetch_page(&self, first: u32, after: Option<&str>) -> Result<SearchPage, CollectError> {
        debug!(first, after = ?after, "requesting search page");
        let variables = SearchVariables {
            query_string: self.query_string.clone(),
            first,
            after: after.map(str::to_owned),
        };
        self.post_query(variables).await
    }
}

/// Turns one GraphQL search response into a page, or into the error it
/// reports. A rate limit can arrive either as HTTP 403/429 or as a 200 whose
/// `errors` carry `RATE_LIMITED`.
fn read_search_page(
    status: StatusCode,
    headers: &HeaderMap,
    body: &str,
    now: DateTime<Utc>,
) -> Result<SearchPage, CollectError> {
    if is_rate_limited(status, headers) {
        return Err(CollectError::RateLimitExceeded {
            reset_at: rate_limit_reset(headers, now).unwrap_or(now),
        });
    }
    if !status.is_success() {
        return Err(CollectError::Http {
            status: status.as_u16(),
            body: body.to_owned(),
        });
    }

    let payload: GraphQLResponse = serde_json::from_str(body)?;
    if let Some(errors) = payload.errors.as_ref().filter(|e| !e.is_empty()) {
        if errors.iter().any(|e| e.is_rate_limited()) {
            return Err(CollectError::RateLimitExceeded {
                reset_at: rate_limit_reset(headers, now).unwrap_or(now),
            });
        }
        let messages: Vec<&str> = errors.iter().map(|e| e.message.as_str()).collect();
        return Err(CollectError::GraphQl(messages.join("; ")));
    }

    let search = payload.data.ok_or(CollectError::EmptyResponse)?.search;
    Ok(SearchPage {
        repository_count: search.repository_count,
        nodes: search
            .nodes
            .into_iter()
            .filter_map(SearchNode::into_repository)
            .collect(),
        end_cursor: search.page_info.end_cursor,
        has_next_page: search.page_info.has_next_page,
    })
}

fn is_rate_limited(status: StatusCode, headers: &HeaderMap) -> bool {
    if status == StatusCode::TOO_MANY_REQUESTS {
        return true;
    }
    status == StatusCode::FORBIDDEN
        && (header_str(headers, RATE_LIMIT_REMAINING) == Some("0")
            || headers.contains_key(RETRY_AFTER))
}

/// `retry-after` (seconds) wins over `x-ratelimit-reset` (epoch seconds).
fn rate_limit_reset(headers: &HeaderMap, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    if let Some(secs) = header_str(headers, RETRY_AFTER.as_str()).and_then(|v| v.parse::<i64>().ok())
    {
        return Some(now + Duration::seconds(secs));
    }
    header_str(headers, RATE_LIMIT_RESET)
        .and_then(|v| v.parse::<i64>().ok())
        .and_then(|epoch| DateTime::from_timestamp(epoch, 0))
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok()).map(str::trim)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use reqwest::header::HeaderValue;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_static(value));
        }
        map
    }

    #[test]
    fn test_forbidden_with_exhausted_quota_is_rate_limit() {
        let h = headers(&[(RATE_LIMIT_REMAINING, "0"), (RATE_LIMIT_RESET, "1717200000")]);
        assert!(is_rate_limited(StatusCode::FORBIDDEN, &h));
    }

    #[test]
    fn test_forbidden_with_quota_left_is_not_rate_limit() {
        let h = headers(&[(RATE_LIMIT_REMAINING, "42")]);
        assert!(!is_rate_limited(StatusCode::FORBIDDEN, &h));
        assert!(!is_rate_limited(StatusCode::OK, &headers(&[])));
    }

    #[test]
    fn test_too_many_requests_is_rate_limit() {
        assert!(is_rate_limited(StatusCode::TOO_MANY_REQUESTS, &headers(&[])));
    }

    #[test]
    fn test_reset_from_epoch_header() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let h = headers(&[(RATE_LIMIT_REMAINING, "0"), (RATE_LIMIT_RESET, "1717200000")]);
        let reset = rate_limit_reset(&h, now).unwrap();
        assert_eq!(reset.timestamp(), 1_717_200_000);
    }

    #[test]
    fn test_retry_after_takes_precedence() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let h = headers(&[("retry-after", "60"), (RATE_LIMIT_RESET, "1717200000")]);
        assert_eq!(rate_limit_reset(&h, now), Some(now + Duration::seconds(60)));
    }

    #[test]
    fn test_no_reset_headers() {
        let now = Utc::now();
        assert_eq!(rate_limit_reset(&headers(&[]), now), None);
    }

    fn june_first() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_search_page_is_read() {
        let body = r#"{"data": {"search": {
            "repositoryCount": 1234,
            "pageInfo": {"endCursor": "Y3Vyc29yOjE=", "hasNextPage": true},
            "nodes": [
                {"name": "guava", "owner": {"login": "google"}, "url": "https://github.com/google/guava",
                 "stargazerCount": 50000, "createdAt": "2014-05-29T16:23:17Z", "releases": {"totalCount": 40}},
                {}
            ]
        }}}"#;

        let page = read_search_page(StatusCode::OK, &headers(&[]), body, june_first()).unwrap();

        assert_eq!(page.repository_count, 1234);
        assert_eq!(page.nodes.len(), 1);
        assert_eq!(page.nodes[0].owner.login, "google");
        assert_eq!(page.end_cursor.as_deref(), Some("Y3Vyc29yOjE="));
        assert!(page.has_next_page);
    }

    #[test]
    fn test_rate_limited_error_in_ok_response() {
        let h = headers(&[(RATE_LIMIT_REMAINING, "0"), (RATE_LIMIT_RESET, "1717200000")]);
        let body = r#"{"data": null, "errors": [{"type": "RATE_LIMITED", "message": "API rate limit exceeded"}]}"#;

        let err = read_search_page(StatusCode::OK, &h, body, june_first()).unwrap_err();

        match err {
            CollectError::RateLimitExceeded { reset_at } => {
                assert_eq!(reset_at.timestamp(), 1_717_200_000)
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_graphql_errors_are_joined() {
        let body = r#"{"errors": [
            {"type": "INVALID_CURSOR_ARGUMENTS", "message": "bad cursor"},
            {"message": "something else"}
        ]}"#;

        let err = read_search_page(StatusCode::OK, &headers(&[]), body, june_first()).unwrap_err();

        match err {
            CollectError::GraphQl(message) => assert_eq!(message, "bad cursor; something else"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_null_data_is_empty_response() {
        let err = read_search_page(StatusCode::OK, &headers(&[]), r#"{"data": null}"#, june_first())
            .unwrap_err();
        assert!(matches!(err, CollectError::EmptyResponse));

        let err = read_search_page(StatusCode::OK, &headers(&[]), r#"{"data": null, "errors": []}"#, june_first())
            .unwrap_err();
        assert!(matches!(err, CollectError::EmptyResponse));
    }

    #[test]
    fn test_server_error_is_http_error() {
        let err = read_search_page(
            StatusCode::BAD_GATEWAY,
            &headers(&[]),
            "upstream unavailable",
            june_first(),
        )
        .unwrap_err();

        match err {
            CollectError::Http { status, body } => {
                assert_eq!(status, 502);
                assert_eq!(body, "upstream unavailable");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_forbidden_without_quota_headers_is_http_error() {
        let err = read_search_page(StatusCode::FORBIDDEN, &headers(&[]), "Bad credentials", june_first())
            .unwrap_err();
        assert!(matches!(err, CollectError::Http { status: 403, .. }));
    }

    #[test]
    fn test_malformed_body_is_decode_error() {
        let err = read_search_page(StatusCode::OK, &headers(&[]), "<html>", june_first()).unwrap_err();
        assert!(matches!(err, CollectError::Decode(_)));
    }
}
