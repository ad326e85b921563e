//! GitHub REST v3 repository host.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use super::{
    FileCommit, FileMetadata, FileWrite, HostError, HostResult, NewRepository, PagesSite,
    PagesSource, RepositoryHost, RepositoryInfo,
};
use crate::config::{ConfigError, GithubConfig};

const GITHUB_API_VERSION: &str = "2022-11-28";
const ACCEPT: &str = "application/vnd.github+json";
const USER_AGENT: &str = concat!("pageforge/", env!("CARGO_PKG_VERSION"));

/// GitHub client authenticated with a personal access token.
pub struct GithubClient {
    http: reqwest::Client,
    api_url: String,
    web_host: String,
    token: String,
}

impl GithubClient {
    pub fn new(config: &GithubConfig) -> Result<Self, ConfigError> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;

        Ok(Self {
            http,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            web_host: web_host_for(&config.api_url),
            token: config.token.clone(),
        })
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .bearer_auth(&self.token)
            .header("Accept", ACCEPT)
            .header("X-GitHub-Api-Version", GITHUB_API_VERSION)
    }

    fn repo_url(&self, owner: &str, repo: &str) -> String {
        format!("{}/repos/{}/{}", self.api_url, owner, repo)
    }
}

/// `api.github.com` serves `github.com`; an Enterprise `https://host/api/v3`
/// serves `host`.
fn web_host_for(api_url: &str) -> String {
    let without_scheme = api_url
        .trim_start_matches("https://")
        .trim_start_matches("http://");
    let host = without_scheme.split('/').next().unwrap_or(without_scheme);
    host.strip_prefix("api.").unwrap_or(host).to_string()
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    errors: Vec<Value>,
}

/// Map a non-success response to the host error taxonomy.
fn classify(status: StatusCode, body: &str) -> HostError {
    let parsed: Option<ErrorBody> = serde_json::from_str(body).ok();
    let message = parsed
        .as_ref()
        .map(|b| b.message.clone())
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| body.chars().take(200).collect());
    let mentions_exists = parsed
        .as_ref()
        .map(|b| {
            b.message.contains("already exists")
                || b.errors.iter().any(|e| e.to_string().contains("already exists"))
        })
        .unwrap_or(false);

    match status {
        StatusCode::NOT_FOUND => HostError::NotFound(message),
        StatusCode::CONFLICT => HostError::Conflict(message),
        StatusCode::UNPROCESSABLE_ENTITY if mentions_exists => HostError::AlreadyExists(message),
        other => HostError::Status {
            status: other.as_u16(),
            message,
        },
    }
}

async fn ensure_success(response: Response) -> HostResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(classify(status, &body))
}

fn put_body(write: &FileWrite) -> Value {
    let mut body = json!({
        "message": write.message,
        "content": BASE64.encode(write.content.as_bytes()),
    });
    if let Some(sha) = &write.sha {
        body["sha"] = json!(sha);
    }
    if let Some(branch) = &write.branch {
        body["branch"] = json!(branch);
    }
    body
}

#[derive(Debug, Deserialize)]
struct PutFileResponse {
    content: ShaRef,
    commit: ShaRef,
}

#[derive(Debug, Deserialize)]
struct ShaRef {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct BranchResponse {
    commit: ShaRef,
}

#[async_trait]
impl RepositoryHost for GithubClient {
    fn web_host(&self) -> &str {
        &self.web_host
    }

    async fn create_repository(&self, repo: &NewRepository) -> HostResult<RepositoryInfo> {
        debug!(repo = %repo.name, "Creating repository");
        let request = self
            .authorized(self.http.post(format!("{}/user/repos", self.api_url)))
            .json(repo);
        let response = ensure_success(request.send().await?).await?;
        Ok(response.json().await?)
    }

    async fn file_metadata(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
        branch: &str,
    ) -> HostResult<FileMetadata> {
        let url = format!("{}/contents/{}", self.repo_url(owner, repo), path);
        let request = self.authorized(self.http.get(url)).query(&[("ref", branch)]);
        let response = ensure_success(request.send().await?).await?;
        Ok(response.json().await?)
    }

    async fn put_file(&self, owner: &str, repo: &str, write: &FileWrite) -> HostResult<FileCommit> {
        debug!(
            repo = %repo,
            path = %write.path,
            replace = write.sha.is_some(),
            "Writing file"
        );
        let url = format!("{}/contents/{}", self.repo_url(owner, repo), write.path);
        let request = self.authorized(self.http.put(url)).json(&put_body(write));
        let response = ensure_success(request.send().await?).await?;
        let body: PutFileResponse = response.json().await?;
        Ok(FileCommit {
            blob_sha: body.content.sha,
            commit_sha: body.commit.sha,
        })
    }

    async fn enable_pages(
        &self,
        owner: &str,
        repo: &str,
        source: &PagesSource,
    ) -> HostResult<PagesSite> {
        let url = format!("{}/pages", self.repo_url(owner, repo));
        let request = self
            .authorized(self.http.post(url))
            .json(&json!({ "source": source }));
        let response = ensure_success(request.send().await?).await?;
        Ok(response.json().await?)
    }

    async fn branch_head(&self, owner: &str, repo: &str, branch: &str) -> HostResult<String> {
        let url = format!("{}/branches/{}", self.repo_url(owner, repo), branch);
        let response = ensure_success(self.authorized(self.http.get(url)).send().await?).await?;
        let body: BranchResponse = response.json().await?;
        Ok(body.commit.sha)
    }
}
