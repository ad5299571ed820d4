// src/services/backup_sink.rs

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use reqwest::{header, Client, StatusCode};
use serde::{Deserialize, Serialize};

use crate::{common::error::AppError, config::BackupConfig};

/// Remote storage for CSV snapshots. Files live under a fixed `backup/` folder.
#[async_trait]
pub trait BackupSink: Send + Sync {
    /// CSV file names, newest first.
    async fn list(&self) -> Result<Vec<String>, AppError>;

    async fn fetch(&self, filename: &str) -> Result<Vec<u8>, AppError>;

    /// Creates the file or overwrites an existing one.
    async fn store(&self, filename: &str, content: &[u8], message: &str) -> Result<(), AppError>;
}

#[derive(Debug, Clone)]
pub struct GitHubSinkConfig {
    pub api_url: String,
    pub repo: String,
    pub token: String,
    pub branch: String,
    pub timeout: Duration,
}

impl From<&BackupConfig> for GitHubSinkConfig {
    fn from(c: &BackupConfig) -> Self {
        Self {
            api_url: c.api_url.trim_end_matches('/').to_string(),
            repo: c.repo.clone(),
            token: c.token.clone(),
            branch: c.branch.clone(),
            timeout: c.timeout,
        }
    }
}

// --- GitHub contents API wire types ---

#[derive(Debug, Deserialize)]
struct RemoteFile {
    sha: String,
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RemoteEntry {
    name: String,
}

#[derive(Debug, Serialize)]
struct PutFileRequest<'a> {
    message: &'a str,
    content: String,
    branch: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<String>,
}

/// Sink backed by a GitHub-style repository contents API.
/// Writes are read-modify-write on the file's `sha` with no conflict detection.
pub struct GitHubBackupSink {
    client: Client,
    config: GitHubSinkConfig,
}

impl GitHubBackupSink {
    pub fn new(config: GitHubSinkConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client, config })
    }

    fn folder_url(&self) -> String {
        format!("{}/repos/{}/contents/backup", self.config.api_url, self.config.repo)
    }

    fn file_url(&self, filename: &str) -> String {
        format!("{}/{}", self.folder_url(), filename)
    }

    fn get(&self, url: &str) -> reqwest::RequestBuilder {
        self.client
            .get(url)
            .bearer_auth(&self.config.token)
            .header(header::ACCEPT, "application/vnd.github+json")
            .query(&[("ref", self.config.branch.as_str())])
    }

    async fn failure(response: reqwest::Response) -> AppError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        AppError::BackupFailed(format!("{}: {}", status, body))
    }

    async fn existing_sha(&self, filename: &str) -> Result<Option<String>, AppError> {
        let response = self.get(&self.file_url(filename)).send().await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            s if s.is_success() => Ok(Some(response.json::<RemoteFile>().await?.sha)),
            _ => Err(Self::failure(response).await),
        }
    }
}

#[async_trait]
impl BackupSink for GitHubBackupSink {
    async fn list(&self) -> Result<Vec<String>, AppError> {
        let response = self.get(&self.folder_url()).send().await?;
        match response.status() {
            // no backup folder yet
            StatusCode::NOT_FOUND => Ok(Vec::new()),
            s if s.is_success() => {
                let entries = response.json::<Vec<RemoteEntry>>().await?;
                let mut names: Vec<String> = entries
                    .into_iter()
                    .map(|e| e.name)
                    .filter(|name| name.ends_with(".csv"))
                    .collect();
                names.sort_unstable_by(|a, b| b.cmp(a));
                Ok(names)
            }
            _ => Err(Self::failure(response).await),
        }
    }

    async fn fetch(&self, filename: &str) -> Result<Vec<u8>, AppError> {
        let response = self.get(&self.file_url(filename)).send().await?;
        match response.status() {
            StatusCode::NOT_FOUND => Err(AppError::BackupNotFound(filename.to_string())),
            s if s.is_success() => {
                let file = response.json::<RemoteFile>().await?;
                let encoded = file
                    .content
                    .ok_or_else(|| AppError::InvalidBackup("remote file has no inline content".into()))?;
                // the API wraps base64 at 60 columns
                let compact: String = encoded.split_whitespace().collect();
                base64::engine::general_purpose::STANDARD
                    .decode(compact)
                    .map_err(|e| AppError::InvalidBackup(e.to_string()))
            }
            _ => Err(Self::failure(response).await),
        }
    }

    async fn store(&self, filename: &str, content: &[u8], message: &str) -> Result<(), AppError> {
        let sha = self.existing_sha(filename).await?;
        let body = PutFileRequest {
            message,
            content: base64::engine::general_purpose::STANDARD.encode(content),
            branch: &self.config.branch,
            sha,
        };

        let response = self
            .client
            .put(self.file_url(filename))
            .bearer_auth(&self.config.token)
            .header(header::ACCEPT, "application/vnd.github+json")
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::failure(response).await);
        }
        tracing::info!("☁️ Backup stored remotely: {}", filename);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        extract::{Path, State},
        http::{HeaderMap, StatusCode as AxumStatus},
        routing::get,
        Json, Router,
    };
    use serde_json::{json, Value};
    use std::{
        collections::HashMap,
        sync::{Arc, Mutex},
    };

    const TOKEN: &str = "test-token";

    // name -> (sha, base64 content)
    type Files = Arc<Mutex<HashMap<String, (String, String)>>>;

    fn authorized(headers: &HeaderMap) -> bool {
        headers.get("authorization").and_then(|v| v.to_str().ok()) == Some("Bearer test-token")
    }

    async fn list_folder(State(files): State<Files>, headers: HeaderMap) -> (AxumStatus, Json<Value>) {
        if !authorized(&headers) {
            return (AxumStatus::UNAUTHORIZED, Json(json!({ "message": "Bad credentials" })));
        }
        let files = files.lock().unwrap();
        if files.is_empty() {
            return (AxumStatus::NOT_FOUND, Json(json!({ "message": "Not Found" })));
        }
        let mut entries: Vec<Value> = files.keys().map(|n| json!({ "name": n, "type": "file" })).collect();
        entries.push(json!({ "name": "notes.txt", "type": "file" }));
        (AxumStatus::OK, Json(Value::Array(entries)))
    }

    async fn get_file(
        State(files): State<Files>,
        Path((_owner, _repo, name)): Path<(String, String, String)>,
        headers: HeaderMap,
    ) -> (AxumStatus, Json<Value>) {
        if !authorized(&headers) {
            return (AxumStatus::UNAUTHORIZED, Json(json!({ "message": "Bad credentials" })));
        }
        match files.lock().unwrap().get(&name) {
            Some((sha, content)) => {
                // emulate the API's line wrapping
                let wrapped: Vec<String> = content
                    .as_bytes()
                    .chunks(60)
                    .map(|c| String::from_utf8_lossy(c).into_owned())
                    .collect();
                (AxumStatus::OK, Json(json!({ "sha": sha, "content": wrapped.join("\n") })))
            }
            None => (AxumStatus::NOT_FOUND, Json(json!({ "message": "Not Found" }))),
        }
    }

    async fn put_file(
        State(files): State<Files>,
        Path((_owner, _repo, name)): Path<(String, String, String)>,
        Json(body): Json<Value>,
    ) -> (AxumStatus, Json<Value>) {
        let mut files = files.lock().unwrap();
        let sent_sha = body["sha"].as_str().map(str::to_string);
        let current_sha = files.get(&name).map(|(sha, _)| sha.clone());
        if sent_sha != current_sha {
            return (AxumStatus::CONFLICT, Json(json!({ "message": "sha mismatch" })));
        }
        let new_sha = format!("sha-{}", current_sha.map(|s| s.len()).unwrap_or(0) + 1);
        let content = body["content"].as_str().unwrap_or_default().to_string();
        let status = if files.contains_key(&name) { AxumStatus::OK } else { AxumStatus::CREATED };
        files.insert(name, (new_sha, content));
        (status, Json(json!({})))
    }

    async fn fake_api() -> (String, Files) {
        let files = Files::default();
        let app = Router::new()
            .route("/repos/{owner}/{repo}/contents/backup", get(list_folder))
            .route("/repos/{owner}/{repo}/contents/backup/{name}", get(get_file).put(put_file))
            .with_state(files.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        (format!("http://{}", addr), files)
    }

    fn sink(api_url: String, token: &str) -> GitHubBackupSink {
        GitHubBackupSink::new(GitHubSinkConfig {
            api_url,
            repo: "harlur/traceability".into(),
            token: token.into(),
            branch: "main".into(),
            timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn store_creates_then_overwrites() {
        let (url, files) = fake_api().await;
        let sink = sink(url, TOKEN);

        sink.store("backup_1.csv", b"first", "Backup manual").await.unwrap();
        sink.store("backup_1.csv", b"second", "Backup manual").await.unwrap();

        assert_eq!(files.lock().unwrap().len(), 1);
        assert_eq!(sink.fetch("backup_1.csv").await.unwrap(), b"second");
    }

    #[tokio::test]
    async fn fetch_decodes_wrapped_content() {
        let (url, _files) = fake_api().await;
        let sink = sink(url, TOKEN);
        let big = "batch_id,variant\n".repeat(20);

        sink.store("backup_big.csv", big.as_bytes(), "m").await.unwrap();
        assert_eq!(sink.fetch("backup_big.csv").await.unwrap(), big.as_bytes());
    }

    #[tokio::test]
    async fn missing_remote_file_is_not_found() {
        let (url, _files) = fake_api().await;
        let err = sink(url, TOKEN).fetch("nope.csv").await.unwrap_err();
        assert!(matches!(err, AppError::BackupNotFound(name) if name == "nope.csv"));
    }

    #[tokio::test]
    async fn list_keeps_csv_newest_first() {
        let (url, _files) = fake_api().await;
        let sink = sink(url, TOKEN);
        assert!(sink.list().await.unwrap().is_empty());

        sink.store("backup_20251110_0900.csv", b"a", "m").await.unwrap();
        sink.store("backup_20251111_0900.csv", b"b", "m").await.unwrap();
        assert_eq!(
            sink.list().await.unwrap(),
            ["backup_20251111_0900.csv", "backup_20251110_0900.csv"]
        );
    }

    #[tokio::test]
    async fn bad_credential_surfaces_as_backup_failure() {
        let (url, _files) = fake_api().await;
        let err = sink(url, "wrong").store("x.csv", b"a", "m").await.unwrap_err();
        assert!(matches!(err, AppError::BackupFailed(_)));
    }
}
