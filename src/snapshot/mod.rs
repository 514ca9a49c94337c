//! Page snapshot fetching.
//!
//! Fetches a page's HTML over plain HTTP and caches the `<body>` under a
//! content-addressed filename, so repeated runs against the same page skip
//! the network.

pub mod refs;

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use url::Url;

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Fetch a page and save its body HTML into `output_dir`. Returns the
/// cached file's path.
pub async fn fetch_and_save_html(url: &str, output_dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create snapshot dir: {}", output_dir.display()))?;

    let filename = snapshot_filename(url)?;
    let file_path = output_dir.join(filename);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(30))
        .build()?;
    let response = client
        .get(url)
        .header(reqwest::header::USER_AGENT, USER_AGENT)
        .send()
        .await
        .with_context(|| format!("Failed to fetch {}", url))?
        .error_for_status()?;

    let html = response.text().await?;
    let content = extract_body(&html).unwrap_or(html);

    std::fs::write(&file_path, content)
        .with_context(|| format!("Failed to save snapshot: {}", file_path.display()))?;

    println!("Saved HTML snapshot of {} to {}", url, file_path.display());
    Ok(file_path)
}

/// Cache filename for a URL: `<host>_<path>_<hash8>.html`.
pub fn snapshot_filename(url: &str) -> Result<String> {
    let parsed = Url::parse(url).with_context(|| format!("Invalid URL: {}", url))?;
    let domain = parsed.host_str().unwrap_or("page");
    let path_part = parsed.path().trim_matches('/').replace('/', "_");

    let digest = Sha256::digest(url.as_bytes());
    let hash: String = digest
        .iter()
        .take(4)
        .map(|b| format!("{:02x}", b))
        .collect();

    Ok(if path_part.is_empty() {
        format!("{}_{}.html", domain, hash)
    } else {
        format!("{}_{}_{}.html", domain, path_part, hash)
    })
}

/// The `<body>…</body>` slice of an HTML document, tags included.
fn extract_body(html: &str) -> Option<String> {
    let lower = html.to_lowercase();
    let start = lower.find("<body")?;
    let end = lower.rfind("</body>")?;
    if end <= start {
        return None;
    }
    Some(html[start..end + "</body>".len()].to_string())
}
