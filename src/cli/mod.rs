pub mod doctor;
pub mod enqueue;
pub mod import;
pub mod inspect;
pub mod recommend;
pub mod similar;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use tokio::io::AsyncWriteExt;

const MODEL_BASE_URL: &str =
    "https://huggingface.co/sentence-transformers/all-MiniLM-L6-v2/resolve/main";

/// Files the local provider loads: (file name, path under the model repo, label).
const MODEL_FILES: [(&str, &str, &str); 2] = [
    ("model.onnx", "onnx/model.onnx", "ONNX model (~90MB)"),
    ("tokenizer.json", "tokenizer.json", "tokenizer"),
];

/// Download the ONNX skill-embedding model and tokenizer into the cache directory.
pub async fn model_download(config: &crate::config::EmbeddingConfig) -> Result<()> {
    if config.provider != "local" {
        println!(
            "Embedding provider is \"{}\"; model files are only used by the \"local\" provider.",
            config.provider
        );
    }

    let cache_dir = crate::config::expand_tilde(&config.cache_dir);
    std::fs::create_dir_all(&cache_dir)
        .with_context(|| format!("failed to create cache dir: {}", cache_dir.display()))?;

    for (file_name, remote_path, label) in MODEL_FILES {
        let dest = cache_dir.join(file_name);
        if dest.exists() {
            println!("{file_name} already present at {}", dest.display());
            continue;
        }
        println!("Downloading {label}...");
        download_file(&format!("{MODEL_BASE_URL}/{remote_path}"), &dest).await?;
        tracing::info!(file = %dest.display(), "model file downloaded");
    }

    println!("Model ready in {}", cache_dir.display());
    Ok(())
}

/// Fetch `url` into `dest` via a temp file and rename, showing progress.
async fn download_file(url: &str, dest: &Path) -> Result<()> {
    let response = reqwest::get(url)
        .await
        .with_context(|| format!("HTTP request failed for {url}"))?;

    anyhow::ensure!(
        response.status().is_success(),
        "download of {url} failed with HTTP {}",
        response.status()
    );

    let pb = match response.content_length() {
        Some(size) => {
            let pb = ProgressBar::new(size);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("  {bar:40.green/white} {bytes}/{total_bytes} ({eta})")
                    .context("invalid progress template")?
                    .progress_chars("=>-"),
            );
            pb
        }
        None => ProgressBar::new_spinner(),
    };

    let tmp_path = dest.with_extension("part");
    let mut file = tokio::fs::File::create(&tmp_path)
        .await
        .with_context(|| format!("failed to create temp file: {}", tmp_path.display()))?;

    let bytes = response.bytes().await.context("error reading response body")?;
    pb.inc(bytes.len() as u64);
    file.write_all(&bytes).await.context("error writing model file")?;
    file.flush().await?;
    drop(file);

    tokio::fs::rename(&tmp_path, dest)
        .await
        .with_context(|| format!("failed to move download into {}", dest.display()))?;

    pb.finish_and_clear();
    Ok(())
}
