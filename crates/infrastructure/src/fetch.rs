use janus_dns_domain::DnsError;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// Make an external resource available as a local file: URLs are downloaded
/// to `dest`, plain paths are used in place after an existence check.
pub async fn ensure_file(source: &str, dest: &Path) -> Result<PathBuf, DnsError> {
    if source.starts_with("http://") || source.starts_with("https://") {
        download(source, dest).await?;
        return Ok(dest.to_path_buf());
    }

    let path = PathBuf::from(source);
    if !path.exists() {
        return Err(DnsError::Config(format!(
            "file '{}' does not exist",
            source
        )));
    }
    Ok(path)
}

async fn download(url: &str, dest: &Path) -> Result<(), DnsError> {
    let client = reqwest::Client::builder()
        .use_rustls_tls()
        .timeout(Duration::from_secs(120))
        .build()
        .map_err(|e| DnsError::Io(format!("failed to build download client: {}", e)))?;

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| DnsError::Io(format!("download of {} failed: {}", url, e)))?;

    if !response.status().is_success() {
        return Err(DnsError::Io(format!(
            "download of {} failed: HTTP {}",
            url,
            response.status().as_u16()
        )));
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| DnsError::Io(format!("download of {} failed: {}", url, e)))?;

    tokio::fs::write(dest, &bytes)
        .await
        .map_err(|e| DnsError::Io(format!("failed to write {:?}: {}", dest, e)))?;

    info!(url = %url, dest = %dest.display(), bytes = bytes.len(), "Downloaded");
    Ok(())
}
