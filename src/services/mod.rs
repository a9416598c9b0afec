//! Remote code host access.
//!
//! The pipeline talks to the host through the [`CodeHost`] trait;
//! [`GithubClient`] is the production implementation.

mod github;

pub use github::{
    CodeHost, FileContent, GithubClient, IssueOutcome, SearchItem, SearchOwner, SearchPage,
    SearchRepository,
};
