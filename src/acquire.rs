//! Fetching the GEO series matrix and platform annotation

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::info;
use reqwest::blocking::Client;

use crate::config::{DataLayout, SourceUrls};
use crate::error::{DegError, Result};

const USER_AGENT: &str = concat!("crc_degs/", env!("CARGO_PKG_VERSION"));
const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Build the blocking HTTP client used for all downloads
pub fn http_client() -> Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
        // Platform annotations are large; no overall deadline
        .timeout(None)
        .build()
        .map_err(|e| DegError::HttpClient {
            reason: e.to_string(),
        })
}

fn part_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".part");
    dest.with_file_name(name)
}

fn fetch_into(client: &Client, url: &str, part: &Path) -> Result<u64> {
    let download_err = |reason: String| DegError::Download {
        url: url.to_string(),
        reason,
    };

    let mut response = client.get(url).send().map_err(|e| download_err(e.to_string()))?;
    let status = response.status();
    if !status.is_success() {
        return Err(download_err(format!("HTTP status {}", status)));
    }

    let mut writer = BufWriter::new(File::create(part)?);
    let bytes = response
        .copy_to(&mut writer)
        .map_err(|e| download_err(e.to_string()))?;
    writer.flush()?;
    Ok(bytes)
}

/// Download `url` to `dest`.
///
/// The body is streamed into `<dest>.part` and renamed on success, so a
/// failed transfer never leaves a file at `dest`. An existing `dest` is
/// kept unless `force` is set. Returns whether a transfer happened.
pub fn download_file(client: &Client, url: &str, dest: &Path, force: bool) -> Result<bool> {
    if dest.is_file() && !force {
        info!("{} already present, skipping download", dest.display());
        return Ok(false);
    }
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }

    info!("Downloading {}", url);
    let part = part_path(dest);
    match fetch_into(client, url, &part) {
        Ok(bytes) => {
            fs::rename(&part, dest)?;
            info!("Wrote {} ({} bytes)", dest.display(), bytes);
        }
        Err(e) => {
            if part.exists() {
                let _ = fs::remove_file(&part);
            }
            return Err(e);
        }
    }

    if !dest.is_file() {
        return Err(DegError::Download {
            url: url.to_string(),
            reason: format!("{} missing after download", dest.display()),
        });
    }
    Ok(true)
}

/// Fetch both GEO files into the raw data directory
pub fn download_all(layout: &DataLayout, sources: &SourceUrls, force: bool) -> Result<()> {
    let client = http_client()?;
    download_file(&client, &sources.series_matrix, &layout.series_matrix(), force)?;
    download_file(
        &client,
        &sources.platform_annotation,
        &layout.platform_annotation(),
        force,
    )?;
    Ok(())
}
