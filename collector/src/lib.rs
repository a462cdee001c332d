//! Repository Collector: ranks repositories of one language by stars through
//! the GitHub GraphQL search API and persists them as `repos.csv`.

pub mod client;
pub mod collector;
pub mod error;

pub use client::GithubClient;
pub use collector::{collect_and_store, collect_repositories, SearchPage, SearchSource};
pub use error::CollectError;
