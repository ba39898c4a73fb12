//! arXiv snapshot download
//!
//! Fetches the zipped metadata snapshot, unpacks it, and returns the path of
//! the line-delimited JSON file inside.

use crate::config::DownloadConfig;
use arxiv_common::{PipelineError, Result};
use futures::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::Client;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::info;

/// File name the archive is saved under inside the output directory
pub const ARCHIVE_NAME: &str = "arxiv.zip";

/// Download and extract the snapshot described by `config`
pub async fn download_snapshot(config: &DownloadConfig) -> Result<PathBuf> {
    config.validate()?;
    tokio::fs::create_dir_all(&config.output_dir).await?;

    info!(url = %config.url, output = %config.output_dir.display(), "Downloading snapshot");

    let archive = config.output_dir.join(ARCHIVE_NAME);
    download_file(&config.url, &archive, config).await?;

    let dir = config.output_dir.clone();
    let archive_for_extract = archive.clone();
    tokio::task::spawn_blocking(move || extract_archive(&archive_for_extract, &dir))
        .await
        .map_err(|e| PipelineError::download(format!("extraction task failed: {}", e)))??;

    let snapshot = find_snapshot(&config.output_dir)?;
    info!(snapshot = %snapshot.display(), "Snapshot ready");
    Ok(snapshot)
}

/// Stream a URL to disk with a progress bar
async fn download_file(url: &str, output_path: &Path, config: &DownloadConfig) -> Result<()> {
    let client = Client::builder()
        .connect_timeout(config.timeout)
        .build()
        .map_err(|e| PipelineError::download(format!("failed to build HTTP client: {}", e)))?;

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| PipelineError::download(format!("request to {} failed: {}", url, e)))?;

    if !response.status().is_success() {
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        return Err(PipelineError::download(format!(
            "failed to download {}: {} {}",
            url, status, text
        )));
    }

    let total_size = response.content_length().unwrap_or(0);
    let pb = ProgressBar::new(total_size);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{msg}\n{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {bytes}/{total_bytes} ({eta})")
            .map_err(|e| PipelineError::download(format!("invalid progress template: {}", e)))?
            .progress_chars("#>-"),
    );
    pb.set_message(format!("Downloading {}", ARCHIVE_NAME));

    let mut file = tokio::fs::File::create(output_path).await?;
    let mut downloaded = 0u64;
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| PipelineError::download(format!("download interrupted: {}", e)))?;
        file.write_all(&chunk).await?;
        downloaded += chunk.len() as u64;
        pb.set_position(downloaded);
    }
    file.flush().await?;

    pb.finish_with_message(format!("Downloaded {}", ARCHIVE_NAME));
    info!(bytes = downloaded, path = %output_path.display(), "Archive saved");
    Ok(())
}

fn extract_archive(archive: &Path, dest: &Path) -> Result<()> {
    let file = std::fs::File::open(archive)?;
    let mut zip = zip::ZipArchive::new(file)
        .map_err(|e| PipelineError::download(format!("not a valid zip archive: {}", e)))?;
    zip.extract(dest)
        .map_err(|e| PipelineError::download(format!("failed to extract archive: {}", e)))?;
    Ok(())
}

/// First `.json` file in the directory, by name
fn find_snapshot(dir: &Path) -> Result<PathBuf> {
    let mut candidates: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "json"))
        .collect();
    candidates.sort();

    candidates.into_iter().next().ok_or_else(|| {
        PipelineError::download(format!("no .json snapshot found in {}", dir.display()))
    })
}
