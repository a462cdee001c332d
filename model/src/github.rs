use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// GraphQL search for the most starred repositories of a language.
pub const SEARCH_REPOSITORIES_QUERY: &str = r#"
query SearchPopularRepos($queryString: String!, $first: Int!, $after: String) {
  search(query: $queryString, type: REPOSITORY, first: $first, after: $after) {
    repositoryCount
    pageInfo {
      endCursor
      hasNextPage
    }
    nodes {
      ... on Repository {
        name
        owner {
          login
        }
        url
        stargazerCount
        createdAt
        releases {
          totalCount
        }
      }
    }
  }
}
"#;

#[derive(Debug, Serialize)]
pub struct GraphQLRequest<'a> {
    pub query: &'a str,
    pub variables: SearchVariables,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchVariables {
    pub query_string: String,
    pub first: u32,
    pub after: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphQLResponse {
    pub data: Option<SearchData>,
    pub errors: Option<Vec<GitHubError>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchData {
    pub search: SearchResult,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    #[serde(default)]
    pub repository_count: u64,
    pub page_info: PageInfo,
    #[serde(default)]
    pub nodes: Vec<SearchNode>,
}

/// Search results that are not repositories come back as `{}` or `null`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum SearchNode {
    Repository(RepositoryNode),
    Other(serde_json::Value),
}

impl SearchNode {
    pub fn into_repository(self) -> Option<RepositoryNode> {
        match self {
            SearchNode::Repository(node) => Some(node),
            SearchNode::Other(_) => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryNode {
    pub name: String,
    pub owner: Owner,
    pub url: String,
    pub stargazer_count: u64,
    pub created_at: DateTime<Utc>,
    pub releases: Count,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Owner {
    pub login: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Count {
    pub total_count: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub end_cursor: Option<String>,
    pub has_next_page: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GitHubError {
    #[serde(default)]
    pub message: String,
    #[serde(rename = "type", default)]
    pub type_: Option<String>,
}

impl GitHubError {
    pub fn is_rate_limited(&self) -> bool {
        self.type_.as_deref() == Some("RATE_LIMITED")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_page_skips_non_repository_nodes() {
        let body = r#"{
            "data": {
                "search": {
                    "repositoryCount": 2,
                    "pageInfo": {"endCursor": "Y3Vyc29yOjI=", "hasNextPage": true},
                    "nodes": [
                        {
                            "name": "guava",
                            "owner": {"login": "google"},
                            "url": "https://github.com/google/guava",
                            "stargazerCount": 50000,
                            "createdAt": "2014-05-29T16:23:17Z",
                            "releases": {"totalCount": 40}
                        },
                        {},
                        null
                    ]
                }
            }
        }"#;
        let response: GraphQLResponse = serde_json::from_str(body).unwrap();
        let search = response.data.unwrap().search;
        assert!(search.page_info.has_next_page);
        assert_eq!(search.page_info.end_cursor.as_deref(), Some("Y3Vyc29yOjI="));

        let repos: Vec<RepositoryNode> = search
            .nodes
            .into_iter()
            .filter_map(SearchNode::into_repository)
            .collect();
        assert_eq!(repos.len(), 1);
        assert_eq!(repos[0].owner.login, "google");
        assert_eq!(repos[0].releases.total_count, 40);
    }

    #[test]
    fn test_rate_limited_error_type() {
        let body = r#"{"errors": [{"type": "RATE_LIMITED", "message": "API rate limit exceeded"}]}"#;
        let response: GraphQLResponse = serde_json::from_str(body).unwrap();
        assert!(response.data.is_none());
        let errors = response.errors.unwrap();
        assert!(errors[0].is_rate_limited());
    }

    #[test]
    fn test_variables_serialize_camel_case() {
        let variables = SearchVariables {
            query_string: "language:java sort:stars-desc".to_owned(),
            first: 50,
            after: None,
        };
        let json = serde_json::to_value(&variables).unwrap();
        assert_eq!(json["queryString"], "language:java sort:stars-desc");
        assert_eq!(json["first"], 50);
        assert!(json["after"].is_null());
    }
}
