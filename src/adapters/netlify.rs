use crate::domain::model::Deployment;
use crate::domain::ports::DeployProvider;
use crate::utils::error::{Result, SiteError};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::time::Duration;
use zip::write::{FileOptions, ZipWriter};

#[derive(Debug, Clone)]
pub struct ReadinessSettings {
    /// 0 disables polling and falls back to the fixed settle delay.
    pub poll_attempts: u32,
    pub poll_interval_secs: u64,
    pub settle_delay_secs: u64,
}

impl Default for ReadinessSettings {
    fn default() -> Self {
        Self {
            poll_attempts: 10,
            poll_interval_secs: 3,
            settle_delay_secs: 15,
        }
    }
}

/// Static-hosting deploy client. Packages the materialized tree as a zip
/// and uploads it in one request; 429 is reported as a distinct,
/// retryable condition rather than a fatal failure.
pub struct NetlifyDeployer {
    client: Client,
    api_base: String,
    token: String,
    readiness: ReadinessSettings,
}

impl NetlifyDeployer {
    pub fn new(
        api_base: impl Into<String>,
        token: impl Into<String>,
        readiness: ReadinessSettings,
    ) -> Self {
        Self {
            client: Client::new(),
            api_base: api_base.into(),
            token: token.into(),
            readiness,
        }
    }
}

#[derive(Debug, Deserialize)]
struct DeployResponse {
    id: String,
    state: Option<String>,
    ssl_url: Option<String>,
    deploy_ssl_url: Option<String>,
    url: Option<String>,
}

#[async_trait]
impl DeployProvider for NetlifyDeployer {
    async fn deploy(&self, slug: &str, source_dir: &Path) -> Result<Deployment> {
        let archive = zip_directory(source_dir)?;
        tracing::info!(
            "📤 Uploading {} bytes for site '{}'",
            archive.len(),
            slug
        );

        let response = self
            .client
            .post(format!("{}/sites/{}/deploys", self.api_base, slug))
            .bearer_auth(&self.token)
            .header("Content-Type", "application/zip")
            .body(archive)
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() == 429 {
            tracing::warn!("🔶 Provider rate limit hit for site '{}'", slug);
            return Err(SiteError::RateLimitedError);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SiteError::DeployError {
                message: format!("Provider returned {}: {}", status, body),
            });
        }

        let payload: DeployResponse = response.json().await?;
        let url = payload
            .ssl_url
            .or(payload.deploy_ssl_url)
            .or(payload.url)
            .unwrap_or_else(|| format!("https://{}", slug));

        tracing::info!("📤 Deploy created: {} ({})", payload.id, url);
        Ok(Deployment {
            id: payload.id,
            url,
            state: payload.state,
        })
    }

    async fn wait_until_ready(&self, deployment: &Deployment) -> Result<()> {
        if self.readiness.poll_attempts == 0 {
            // provider readiness signal disabled; minimum viable settle wait
            tokio::time::sleep(Duration::from_secs(self.readiness.settle_delay_secs)).await;
            return Ok(());
        }

        for attempt in 1..=self.readiness.poll_attempts {
            let response = self
                .client
                .get(format!("{}/deploys/{}", self.api_base, deployment.id))
                .bearer_auth(&self.token)
                .send()
                .await?;

            if response.status().is_success() {
                let payload: DeployResponse = response.json().await?;
                if payload.state.as_deref() == Some("ready") {
                    tracing::info!(
                        "✅ Deploy {} ready after {} poll(s)",
                        deployment.id,
                        attempt
                    );
                    return Ok(());
                }
            }

            tokio::time::sleep(Duration::from_secs(self.readiness.poll_interval_secs)).await;
        }

        tracing::warn!(
            "🔶 Deploy {} not confirmed ready after {} poll(s); continuing",
            deployment.id,
            self.readiness.poll_attempts
        );
        Ok(())
    }
}

fn zip_directory(dir: &Path) -> Result<Vec<u8>> {
    let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));
    add_dir_entries(&mut zip, dir, "")?;
    let cursor = zip.finish()?;
    Ok(cursor.into_inner())
}

fn add_dir_entries(
    zip: &mut ZipWriter<std::io::Cursor<Vec<u8>>>,
    dir: &Path,
    prefix: &str,
) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().to_string();
        let rel = if prefix.is_empty() {
            name
        } else {
            format!("{}/{}", prefix, name)
        };
        if entry.file_type()?.is_dir() {
            add_dir_entries(zip, &entry.path(), &rel)?;
        } else {
            zip.start_file::<_, ()>(rel.as_str(), FileOptions::default())?;
            zip.write_all(&fs::read(entry.path())?)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zip_directory_keeps_relative_paths() {
        let dir = tempfile::TempDir::new().unwrap();
        fs::write(dir.path().join("index.html"), "<html></html>").unwrap();
        fs::create_dir(dir.path().join("images")).unwrap();
        fs::write(dir.path().join("images/logo.png"), b"png").unwrap();

        let data = zip_directory(dir.path()).unwrap();
        let cursor = std::io::Cursor::new(data);
        let mut archive = zip::ZipArchive::new(cursor).unwrap();

        let mut names: Vec<String> = (0..archive.len())
            .map(|i| archive.by_index(i).unwrap().name().to_string())
            .collect();
        names.sort();

        assert_eq!(names, vec!["images/logo.png", "index.html"]);
    }
}
