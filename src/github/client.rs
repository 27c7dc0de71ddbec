//! GitHub-style REST client (blocking)

use super::{CodeHost, MergeRequest, NewPullRequest, NewRelease, PAGE_SIZE, PullRequest, RefState, Release, UserProfile};
use crate::core::context::RepositoryContext;
use crate::core::error::{CredentialError, ReleaseError, ReleaseResult, RemoteError};
use crate::credential::Credential;
use reqwest::StatusCode;
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue, USER_AGENT};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const API_VERSION: &str = "2022-11-28";

/// REST client authenticated with an explicitly loaded credential
#[derive(Debug, Clone)]
pub struct GitHubClient {
  http: Client,
}

#[derive(Deserialize)]
struct WireRef {
  #[serde(rename = "ref")]
  name: String,
}

#[derive(Deserialize)]
struct WireUser {
  login: String,
}

#[derive(Deserialize)]
struct WirePullRequest {
  number: u64,
  head: WireRef,
  base: WireRef,
  #[serde(default)]
  title: String,
  #[serde(default)]
  body: Option<String>,
  #[serde(default)]
  state: String,
  #[serde(default)]
  merged: Option<bool>,
  #[serde(default)]
  merged_at: Option<String>,
  #[serde(default)]
  user: Option<WireUser>,
}

impl From<WirePullRequest> for PullRequest {
  fn from(wire: WirePullRequest) -> Self {
    // List responses omit `merged`; `merged_at` is set on merged ones
    let merged = wire.merged.unwrap_or(wire.merged_at.is_some());
    PullRequest {
      number: wire.number,
      head_ref: wire.head.name,
      base_ref: wire.base.name,
      title: wire.title,
      body: wire.body.unwrap_or_default(),
      state: wire.state,
      merged,
      author: wire.user.map(|u| u.login).unwrap_or_default(),
    }
  }
}

#[derive(Deserialize)]
struct WireStatus {
  state: String,
}

#[derive(Serialize)]
struct WireMerge<'a> {
  commit_title: &'a str,
  commit_message: &'a str,
  merge_method: &'a str,
}

impl GitHubClient {
  /// Build a client; an empty token is treated as no credential at all
  pub fn new(credential: &Credential) -> ReleaseResult<Self> {
    if credential.is_empty() {
      return Err(
        CredentialError::Missing {
          path: credential.source().to_path_buf(),
        }
        .into(),
      );
    }

    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
    headers.insert("X-GitHub-Api-Version", HeaderValue::from_static(API_VERSION));
    headers.insert(
      USER_AGENT,
      HeaderValue::from_static(concat!("stig-release/", env!("CARGO_PKG_VERSION"))),
    );

    let mut auth = HeaderValue::from_str(&format!("Bearer {}", credential.expose().trim()))
      .map_err(|_| ReleaseError::message("API token contains characters not allowed in a header"))?;
    auth.set_sensitive(true);
    headers.insert(AUTHORIZATION, auth);

    let http = Client::builder()
      .default_headers(headers)
      .timeout(Duration::from_secs(60))
      .build()
      .map_err(|e| ReleaseError::message(format!("Failed to create HTTP client: {}", e)))?;

    Ok(Self { http })
  }

  fn execute(&self, operation: &str, request: RequestBuilder) -> ReleaseResult<Response> {
    request.send().map_err(|e| {
      ReleaseError::Remote(RemoteError {
        operation: operation.to_string(),
        status: None,
        message: e.to_string(),
      })
    })
  }

  fn fail(operation: &str, response: Response) -> ReleaseError {
    let status = response.status().as_u16();
    let message = response.text().unwrap_or_default();
    tracing::debug!(operation, status, "request failed");
    ReleaseError::Remote(RemoteError {
      operation: operation.to_string(),
      status: Some(status),
      message,
    })
  }

  fn decode<T: DeserializeOwned>(operation: &str, response: Response) -> ReleaseResult<T> {
    let status = response.status().as_u16();
    response.json().map_err(|e| {
      ReleaseError::Remote(RemoteError {
        operation: operation.to_string(),
        status: Some(status),
        message: format!("unexpected response body: {}", e),
      })
    })
  }

  fn send<T: DeserializeOwned>(&self, operation: &str, request: RequestBuilder) -> ReleaseResult<T> {
    let response = self.execute(operation, request)?;
    if !response.status().is_success() {
      return Err(Self::fail(operation, response));
    }
    Self::decode(operation, response)
  }

  /// Like `send`, but a 404 is `None`
  fn send_optional<T: DeserializeOwned>(&self, operation: &str, request: RequestBuilder) -> ReleaseResult<Option<T>> {
    let response = self.execute(operation, request)?;
    if response.status() == StatusCode::NOT_FOUND {
      return Ok(None);
    }
    if !response.status().is_success() {
      return Err(Self::fail(operation, response));
    }
    Self::decode(operation, response).map(Some)
  }

  fn list_pull_requests(
    &self,
    ctx: &RepositoryContext,
    state: &str,
    base: &str,
    page: u32,
  ) -> ReleaseResult<Vec<PullRequest>> {
    let url = format!("{}/pulls", ctx.api_base_url);
    let per_page = PAGE_SIZE.to_string();
    let page = page.to_string();
    let request = self.http.get(&url).query(&[
      ("state", state),
      ("base", base),
      ("per_page", per_page.as_str()),
      ("page", page.as_str()),
    ]);
    let pulls: Vec<WirePullRequest> = self.send("list pull requests", request)?;
    Ok(pulls.into_iter().map(PullRequest::from).collect())
  }
}

impl CodeHost for GitHubClient {
  fn list_closed_pull_requests(&self, ctx: &RepositoryContext, base: &str, page: u32) -> ReleaseResult<Vec<PullRequest>> {
    tracing::debug!(base, page, "listing closed pull requests");
    self.list_pull_requests(ctx, "closed", base, page)
  }

  fn list_open_pull_requests(&self, ctx: &RepositoryContext, base: &str, page: u32) -> ReleaseResult<Vec<PullRequest>> {
    tracing::debug!(base, page, "listing open pull requests");
    self.list_pull_requests(ctx, "open", base, page)
  }

  fn get_user(&self, ctx: &RepositoryContext, login: &str) -> ReleaseResult<UserProfile> {
    let url = format!("{}/users/{}", ctx.api_root(), login);
    self.send("get user", self.http.get(&url))
  }

  fn create_pull_request(&self, ctx: &RepositoryContext, request: &NewPullRequest) -> ReleaseResult<PullRequest> {
    tracing::info!(head = %request.head, base = %request.base, "creating pull request");
    let url = format!("{}/pulls", ctx.api_base_url);
    let pr: WirePullRequest = self.send("create pull request", self.http.post(&url).json(request))?;
    Ok(pr.into())
  }

  fn get_pull_request(&self, ctx: &RepositoryContext, number: u64) -> ReleaseResult<PullRequest> {
    let url = format!("{}/pulls/{}", ctx.api_base_url, number);
    let pr: WirePullRequest = self.send("get pull request", self.http.get(&url))?;
    Ok(pr.into())
  }

  fn merge_pull_request(&self, ctx: &RepositoryContext, number: u64, request: &MergeRequest) -> ReleaseResult<PullRequest> {
    tracing::info!(number, method = request.method.as_str(), "merging pull request");
    let url = format!("{}/pulls/{}/merge", ctx.api_base_url, number);
    let body = WireMerge {
      commit_title: &request.title,
      commit_message: &request.message,
      merge_method: request.method.as_str(),
    };
    let _: serde_json::Value = self.send("merge pull request", self.http.put(&url).json(&body))?;
    self.get_pull_request(ctx, number)
  }

  fn ref_state(&self, ctx: &RepositoryContext, reference: &str) -> ReleaseResult<RefState> {
    let url = format!("{}/commits/{}/status", ctx.api_base_url, reference);
    let status: WireStatus = self.send("get ref status", self.http.get(&url))?;
    let state = RefState::from_wire(&status.state);
    tracing::debug!(reference, %state, "observed ref status");
    Ok(state)
  }

  fn create_release(&self, ctx: &RepositoryContext, request: &NewRelease) -> ReleaseResult<Release> {
    tracing::info!(tag = %request.tag_name, "creating release");
    let url = format!("{}/releases", ctx.api_base_url);
    self.send("create release", self.http.post(&url).json(request))
  }

  fn find_release_by_tag(&self, ctx: &RepositoryContext, tag: &str) -> ReleaseResult<Option<Release>> {
    let url = format!("{}/releases/tags/{}", ctx.api_base_url, tag);
    self.send_optional("get release by tag", self.http.get(&url))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::core::config::MergeMethod;
  use serde_json::json;
  use wiremock::matchers::{body_json, header, method, path, query_param};
  use wiremock::{Mock, MockServer, ResponseTemplate};

  fn context(server: &MockServer) -> RepositoryContext {
    RepositoryContext {
      name: "Proj".into(),
      web_url: "https://code.example.com/Org/Proj".into(),
      api_base_url: format!("{}/repos/Org/Proj", server.uri()),
    }
  }

  fn pull_json(number: u64, head: &str, base: &str) -> serde_json::Value {
    json!({
      "number": number,
      "head": { "ref": head },
      "base": { "ref": base },
      "title": "t",
      "body": null,
      "state": "open",
      "user": { "login": "octo" }
    })
  }

  /// The blocking client must be created and dropped off the async runtime
  async fn blocking<T: Send + 'static>(f: impl FnOnce(GitHubClient) -> T + Send + 'static) -> T {
    tokio::task::spawn_blocking(move || {
      let client = GitHubClient::new(&Credential::new("token-123")).unwrap();
      f(client)
    })
    .await
    .unwrap()
  }

  #[test]
  fn test_empty_credential_is_missing() {
    let err = GitHubClient::new(&Credential::new("")).unwrap_err();
    assert!(matches!(err, ReleaseError::Credential(CredentialError::Missing { .. })));
  }

  #[tokio::test(flavor = "multi_thread")]
  async fn test_create_pull_request_sends_headers_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .and(path("/repos/Org/Proj/pulls"))
      .and(header("authorization", "Bearer token-123"))
      .and(header("accept", "application/vnd.github+json"))
      .and(header("x-github-api-version", "2022-11-28"))
      .and(body_json(json!({
        "title": "4.2.0.1",
        "head": "4.2.0.1",
        "base": "dev",
        "body": "notes"
      })))
      .respond_with(ResponseTemplate::new(201).set_body_json(pull_json(42, "4.2.0.1", "dev")))
      .expect(1)
      .mount(&server)
      .await;

    let ctx = context(&server);
    let pr = blocking(move |client| {
      client.create_pull_request(
        &ctx,
        &NewPullRequest {
          title: "4.2.0.1".into(),
          head: "4.2.0.1".into(),
          base: "dev".into(),
          body: "notes".into(),
        },
      )
    })
    .await
    .unwrap();

    assert_eq!(pr.number, 42);
    assert_eq!(pr.head_ref, "4.2.0.1");
    assert_eq!(pr.base_ref, "dev");
    assert_eq!(pr.body, "");
    assert_eq!(pr.author, "octo");
  }

  #[tokio::test(flavor = "multi_thread")]
  async fn test_non_success_keeps_host_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .and(path("/repos/Org/Proj/pulls"))
      .respond_with(ResponseTemplate::new(422).set_body_string("{\"message\":\"Validation Failed\"}"))
      .mount(&server)
      .await;

    let ctx = context(&server);
    let err = blocking(move |client| {
      client.create_pull_request(
        &ctx,
        &NewPullRequest {
          title: "t".into(),
          head: "h".into(),
          base: "dev".into(),
          body: String::new(),
        },
      )
    })
    .await
    .unwrap_err();

    match err {
      ReleaseError::Remote(remote) => {
        assert_eq!(remote.operation, "create pull request");
        assert_eq!(remote.status, Some(422));
        assert_eq!(remote.message, "{\"message\":\"Validation Failed\"}");
      }
      other => panic!("unexpected error: {:?}", other),
    }
  }

  #[tokio::test(flavor = "multi_thread")]
  async fn test_merge_uses_lowercase_method_and_rereads() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
      .and(path("/repos/Org/Proj/pulls/7/merge"))
      .and(body_json(json!({
        "commit_title": "Merge",
        "commit_message": "Merged",
        "merge_method": "squash"
      })))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "merged": true, "sha": "abc" })))
      .expect(1)
      .mount(&server)
      .await;

    let mut merged = pull_json(7, "4.2.0.1", "dev");
    merged["merged"] = json!(true);
    merged["state"] = json!("closed");
    Mock::given(method("GET"))
      .and(path("/repos/Org/Proj/pulls/7"))
      .respond_with(ResponseTemplate::new(200).set_body_json(merged))
      .expect(1)
      .mount(&server)
      .await;

    let ctx = context(&server);
    let pr = blocking(move |client| {
      client.merge_pull_request(
        &ctx,
        7,
        &MergeRequest {
          title: "Merge".into(),
          message: "Merged".into(),
          method: MergeMethod::Squash,
        },
      )
    })
    .await
    .unwrap();

    assert!(pr.merged);
    assert_eq!(pr.state, "closed");
  }

  #[tokio::test(flavor = "multi_thread")]
  async fn test_list_closed_reads_merged_at() {
    let server = MockServer::start().await;
    let mut merged = pull_json(1, "a", "dev");
    merged["merged_at"] = json!("2024-01-01T00:00:00Z");
    let unmerged = pull_json(2, "b", "dev");
    Mock::given(method("GET"))
      .and(path("/repos/Org/Proj/pulls"))
      .and(query_param("state", "closed"))
      .and(query_param("base", "dev"))
      .and(query_param("per_page", "100"))
      .and(query_param("page", "2"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!([merged, unmerged])))
      .mount(&server)
      .await;

    let ctx = context(&server);
    let pulls = blocking(move |client| client.list_closed_pull_requests(&ctx, "dev", 2))
      .await
      .unwrap();

    assert_eq!(pulls.len(), 2);
    assert!(pulls[0].merged);
    assert!(!pulls[1].merged);
  }

  #[tokio::test(flavor = "multi_thread")]
  async fn test_ref_state_maps_error_to_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/repos/Org/Proj/commits/dev/status"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "state": "error", "statuses": [] })))
      .mount(&server)
      .await;

    let ctx = context(&server);
    let state = blocking(move |client| client.ref_state(&ctx, "dev")).await.unwrap();
    assert_eq!(state, RefState::Failure);
  }

  #[tokio::test(flavor = "multi_thread")]
  async fn test_user_lookup_uses_api_root() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/users/octo"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "login": "octo", "name": null })))
      .expect(1)
      .mount(&server)
      .await;

    let ctx = context(&server);
    let user = blocking(move |client| client.get_user(&ctx, "octo")).await.unwrap();
    assert_eq!(user.display_name(), "octo");
  }

  #[tokio::test(flavor = "multi_thread")]
  async fn test_release_by_tag_missing_is_none() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/repos/Org/Proj/releases/tags/4.2.0.1-PSGallery"))
      .respond_with(ResponseTemplate::new(404).set_body_string("{\"message\":\"Not Found\"}"))
      .mount(&server)
      .await;

    let ctx = context(&server);
    let release = blocking(move |client| client.find_release_by_tag(&ctx, "4.2.0.1-PSGallery"))
      .await
      .unwrap();
    assert!(release.is_none());
  }

  #[tokio::test(flavor = "multi_thread")]
  async fn test_create_release_targets_stable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .and(path("/repos/Org/Proj/releases"))
      .and(body_json(json!({
        "tag_name": "4.2.0.1-PSGallery",
        "target_commitish": "master",
        "name": "Release 4.2.0.1",
        "body": "notes",
        "draft": false,
        "prerelease": false
      })))
      .respond_with(ResponseTemplate::new(201).set_body_json(json!({
        "id": 9,
        "tag_name": "4.2.0.1-PSGallery",
        "name": "Release 4.2.0.1",
        "body": "notes",
        "draft": false,
        "prerelease": false,
        "html_url": "https://code.example.com/Org/Proj/releases/9"
      })))
      .expect(1)
      .mount(&server)
      .await;

    let ctx = context(&server);
    let release = blocking(move |client| {
      client.create_release(
        &ctx,
        &NewRelease {
          tag_name: "4.2.0.1-PSGallery".into(),
          target_commitish: "master".into(),
          name: "Release 4.2.0.1".into(),
          body: "notes".into(),
          draft: false,
          prerelease: false,
        },
      )
    })
    .await
    .unwrap();

    assert_eq!(release.id, 9);
  }
}
