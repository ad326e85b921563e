//! In-memory fakes for the remote seams (testing only)
//!
//! Provides `ScriptedProvider`, `MemoryRepositoryHost`, `ScriptedCallback`
//! and `RecordingSleeper`, which satisfy the trait contracts without any
//! network access and record every call for assertions.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use crate::backoff::Sleeper;
use crate::domain::NotificationPayload;
use crate::generator::{GenerationError, GenerationProvider, GenerationRequest};
use crate::host::{
    FileCommit, FileMetadata, FileWrite, HostError, HostResult, NewRepository, PagesSite,
    PagesSource, RepositoryHost, RepositoryInfo,
};
use crate::notifier::CallbackTransport;

fn short_digest(parts: &[&str]) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part.as_bytes());
        hasher.update([0u8]);
    }
    let bytes = hasher.finalize();
    bytes[..20].iter().map(|b| format!("{b:02x}")).collect()
}

// ---------------------------------------------------------------------------
// ScriptedProvider
// ---------------------------------------------------------------------------

/// Generation provider answering primary and README requests with fixed
/// results. README requests are recognised by their prompt.
#[derive(Debug)]
pub struct ScriptedProvider {
    primary: Result<String, GenerationError>,
    companion: Result<String, GenerationError>,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl ScriptedProvider {
    pub fn new(
        primary: Result<String, GenerationError>,
        companion: Result<String, GenerationError>,
    ) -> Self {
        Self {
            primary,
            companion,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Same answer for every request.
    pub fn always(result: Result<String, GenerationError>) -> Self {
        Self::new(result.clone(), result)
    }

    pub fn failing() -> Self {
        Self::always(Err(GenerationError::Status {
            status: 500,
            message: "provider unavailable".to_string(),
        }))
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl GenerationProvider for ScriptedProvider {
    async fn complete(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        self.requests.lock().unwrap().push(request.clone());
        if request.prompt.starts_with("Write a README.md") {
            self.companion.clone()
        } else {
            self.primary.clone()
        }
    }
}

// ---------------------------------------------------------------------------
// MemoryRepositoryHost
// ---------------------------------------------------------------------------

/// Operations of [`RepositoryHost`], for call counting and failure injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostOp {
    CreateRepository,
    FileMetadata,
    PutFile,
    EnablePages,
    BranchHead,
}

#[derive(Debug)]
struct StoredFile {
    content: String,
    sha: String,
}

#[derive(Debug, Default)]
struct RepoState {
    files: BTreeMap<String, StoredFile>,
    branches: HashMap<String, String>,
    pages: bool,
    commits: u64,
}

impl RepoState {
    fn commit(&mut self, repo: &str, branch: &str, message: &str) -> String {
        self.commits += 1;
        let sha = short_digest(&[repo, message, &self.commits.to_string()]);
        self.branches.insert(branch.to_string(), sha.clone());
        sha
    }
}

/// In-memory repository host that enforces revision markers the way the
/// real service does: replacing an existing file requires its current marker,
/// and reads or writes naming a branch require that branch to exist.
#[derive(Debug)]
pub struct MemoryRepositoryHost {
    owner: String,
    web_host: String,
    default_branch: String,
    repos: Mutex<HashMap<String, RepoState>>,
    calls: Mutex<HashMap<HostOp, usize>>,
    failures: Mutex<HashMap<HostOp, VecDeque<HostError>>>,
    writes: Mutex<Vec<FileWrite>>,
}

impl Default for MemoryRepositoryHost {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRepositoryHost {
    pub fn new() -> Self {
        Self {
            owner: "octo".to_string(),
            web_host: "github.com".to_string(),
            default_branch: "main".to_string(),
            repos: Mutex::new(HashMap::new()),
            calls: Mutex::new(HashMap::new()),
            failures: Mutex::new(HashMap::new()),
            writes: Mutex::new(Vec::new()),
        }
    }

    /// Account that `create_repository` creates repositories under.
    pub fn with_owner(mut self, owner: &str) -> Self {
        self.owner = owner.to_string();
        self
    }

    /// Queue a failure returned by the next call of `op`.
    pub fn fail_next(&self, op: HostOp, error: HostError) {
        self.failures
            .lock()
            .unwrap()
            .entry(op)
            .or_default()
            .push_back(error);
    }

    pub fn calls(&self, op: HostOp) -> usize {
        self.calls.lock().unwrap().get(&op).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }

    /// Every attempted file write, in order, including rejected ones.
    pub fn writes(&self) -> Vec<FileWrite> {
        self.writes.lock().unwrap().clone()
    }

    pub fn file_content(&self, repo: &str, path: &str) -> Option<String> {
        let repos = self.repos.lock().unwrap();
        repos
            .get(repo)
            .and_then(|r| r.files.get(path))
            .map(|f| f.content.clone())
    }

    pub fn file_sha(&self, repo: &str, path: &str) -> Option<String> {
        let repos = self.repos.lock().unwrap();
        repos
            .get(repo)
            .and_then(|r| r.files.get(path))
            .map(|f| f.sha.clone())
    }

    pub fn pages_enabled(&self, repo: &str) -> bool {
        let repos = self.repos.lock().unwrap();
        repos.get(repo).map(|r| r.pages).unwrap_or(false)
    }

    fn begin(&self, op: HostOp) -> HostResult<()> {
        *self.calls.lock().unwrap().entry(op).or_insert(0) += 1;
        match self
            .failures
            .lock()
            .unwrap()
            .get_mut(&op)
            .and_then(|q| q.pop_front())
        {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

fn repo_not_found(repo: &str) -> HostError {
    HostError::NotFound(format!("repository {repo} not found"))
}

fn branch_not_found(branch: &str) -> HostError {
    HostError::NotFound(format!("Branch {branch} not found"))
}

#[async_trait]
impl RepositoryHost for MemoryRepositoryHost {
    fn web_host(&self) -> &str {
        &self.web_host
    }

    async fn create_repository(&self, repo: &NewRepository) -> HostResult<RepositoryInfo> {
        self.begin(HostOp::CreateRepository)?;
        let mut repos = self.repos.lock().unwrap();
        if repos.contains_key(&repo.name) {
            return Err(HostError::AlreadyExists(
                "name already exists on this account".to_string(),
            ));
        }

        let mut state = RepoState::default();
        if repo.auto_init {
            let readme = format!("# {}\n", repo.name);
            state.files.insert(
                "README.md".to_string(),
                StoredFile {
                    sha: short_digest(&["blob", &readme]),
                    content: readme,
                },
            );
            if let Some(license) = &repo.license_template {
                let text = format!("{} license\n", license.to_uppercase());
                state.files.insert(
                    "LICENSE".to_string(),
                    StoredFile {
                        sha: short_digest(&["blob", &text]),
                        content: text,
                    },
                );
            }
            state.commit(&repo.name, &self.default_branch, "Initial commit");
        }
        repos.insert(repo.name.clone(), state);

        Ok(RepositoryInfo {
            html_url: format!("https://{}/{}/{}", self.web_host, self.owner, repo.name),
        })
    }

    async fn file_metadata(
        &self,
        _owner: &str,
        repo: &str,
        path: &str,
        branch: &str,
    ) -> HostResult<FileMetadata> {
        self.begin(HostOp::FileMetadata)?;
        let repos = self.repos.lock().unwrap();
        let state = repos.get(repo).ok_or_else(|| repo_not_found(repo))?;
        if !state.branches.contains_key(branch) {
            return Err(branch_not_found(branch));
        }
        state
            .files
            .get(path)
            .map(|f| FileMetadata {
                path: path.to_string(),
                sha: f.sha.clone(),
            })
            .ok_or_else(|| HostError::NotFound(format!("{path} not found")))
    }

    async fn put_file(&self, _owner: &str, repo: &str, write: &FileWrite) -> HostResult<FileCommit> {
        self.writes.lock().unwrap().push(write.clone());
        self.begin(HostOp::PutFile)?;
        let mut repos = self.repos.lock().unwrap();
        let state = repos.get_mut(repo).ok_or_else(|| repo_not_found(repo))?;
        // An explicit branch must already exist; no branch means the default.
        let branch = match &write.branch {
            Some(branch) if !state.branches.contains_key(branch) => {
                return Err(branch_not_found(branch))
            }
            Some(branch) => branch.clone(),
            None => self.default_branch.clone(),
        };

        let current = state.files.get(&write.path).map(|f| f.sha.clone());
        match (&current, &write.sha) {
            (Some(_), None) => {
                return Err(HostError::Status {
                    status: 422,
                    message: "\"sha\" wasn't supplied.".to_string(),
                })
            }
            (Some(stored), Some(given)) if stored != given => {
                return Err(HostError::Conflict(format!(
                    "{} does not match {}",
                    write.path, given
                )))
            }
            (None, Some(given)) => {
                return Err(HostError::Conflict(format!(
                    "{} does not exist but sha {} was supplied",
                    write.path, given
                )))
            }
            _ => {}
        }

        let blob_sha = short_digest(&["blob", &write.content]);
        state.files.insert(
            write.path.clone(),
            StoredFile {
                content: write.content.clone(),
                sha: blob_sha.clone(),
            },
        );
        let commit_sha = state.commit(repo, &branch, &write.message);

        Ok(FileCommit {
            blob_sha,
            commit_sha,
        })
    }

    async fn enable_pages(&self, owner: &str, repo: &str, source: &PagesSource) -> HostResult<PagesSite> {
        self.begin(HostOp::EnablePages)?;
        let mut repos = self.repos.lock().unwrap();
        let state = repos.get_mut(repo).ok_or_else(|| repo_not_found(repo))?;
        if state.pages {
            return Err(HostError::Conflict(
                "GitHub Pages is already enabled.".to_string(),
            ));
        }
        if !state.branches.contains_key(&source.branch) {
            return Err(HostError::Status {
                status: 422,
                message: format!("branch {} does not exist", source.branch),
            });
        }
        state.pages = true;
        Ok(PagesSite {
            html_url: Some(format!("https://{}.github.io/{}/", owner.to_lowercase(), repo)),
        })
    }

    async fn branch_head(&self, _owner: &str, repo: &str, branch: &str) -> HostResult<String> {
        self.begin(HostOp::BranchHead)?;
        let repos = self.repos.lock().unwrap();
        let state = repos.get(repo).ok_or_else(|| repo_not_found(repo))?;
        state
            .branches
            .get(branch)
            .cloned()
            .ok_or_else(|| HostError::NotFound("Branch not found".to_string()))
    }
}

// ---------------------------------------------------------------------------
// ScriptedCallback
// ---------------------------------------------------------------------------

/// Callback endpoint replaying a script of outcomes. Once the script is
/// exhausted every further attempt gets `fallback`.
#[derive(Debug)]
pub struct ScriptedCallback {
    script: Mutex<VecDeque<Result<u16, String>>>,
    fallback: Result<u16, String>,
    received: Mutex<Vec<(String, NotificationPayload)>>,
}

impl ScriptedCallback {
    pub fn new(script: Vec<Result<u16, String>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback: Ok(500),
            received: Mutex::new(Vec::new()),
        }
    }

    pub fn always_ok() -> Self {
        Self::with_fallback(Vec::new(), Ok(200))
    }

    pub fn always_failing() -> Self {
        Self::with_fallback(Vec::new(), Ok(500))
    }

    pub fn with_fallback(script: Vec<Result<u16, String>>, fallback: Result<u16, String>) -> Self {
        Self {
            fallback,
            ..Self::new(script)
        }
    }

    pub fn call_count(&self) -> usize {
        self.received.lock().unwrap().len()
    }

    pub fn received(&self) -> Vec<(String, NotificationPayload)> {
        self.received.lock().unwrap().clone()
    }
}

#[async_trait]
impl CallbackTransport for ScriptedCallback {
    async fn post(&self, url: &str, payload: &NotificationPayload) -> Result<u16, String> {
        self.received
            .lock()
            .unwrap()
            .push((url.to_string(), payload.clone()));
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone())
    }
}

// ---------------------------------------------------------------------------
// RecordingSleeper
// ---------------------------------------------------------------------------

/// Sleeper that returns immediately and records requested delays.
#[derive(Debug, Default)]
pub struct RecordingSleeper {
    delays: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn delays(&self) -> Vec<Duration> {
        self.delays.lock().unwrap().clone()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.delays.lock().unwrap().push(duration);
    }
}
