//! Host allow-list check and batch assembly.

use crate::error::{DlError, Result};
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::warn;
use url::Url;

/// Accepts `candidate` only when it parses as a URL whose host contains one
/// of `allowed_hosts`. Reachability is not checked.
pub fn is_supported_url(candidate: &str, allowed_hosts: &[String]) -> bool {
    let Ok(parsed) = Url::parse(candidate.trim()) else {
        return false;
    };
    let Some(host) = parsed.host_str() else {
        return false;
    };
    let host = host.to_lowercase();
    allowed_hosts
        .iter()
        .any(|allowed| host.contains(&allowed.to_lowercase()))
}

/// Turns raw inputs into the ordered list of URLs to download.
///
/// Blank inputs are skipped and repeated URLs keep their first position.
/// Any invalid entry rejects the whole batch.
pub fn build_batch(inputs: &[String], allowed_hosts: &[String], max_urls: usize) -> Result<Vec<String>> {
    let mut seen = HashSet::new();
    let mut urls = Vec::new();

    for input in inputs.iter().map(|s| s.trim()).filter(|s| !s.is_empty()) {
        if seen.insert(input.to_string()) {
            urls.push(input.to_string());
        } else {
            warn!(url = input, "dropping duplicate URL");
        }
    }

    if urls.is_empty() {
        return Err(DlError::EmptyBatch);
    }

    if urls.len() > max_urls {
        return Err(DlError::TooManyUrls {
            count: urls.len(),
            max: max_urls,
        });
    }

    let invalid: Vec<String> = urls
        .iter()
        .filter(|url| !is_supported_url(url, allowed_hosts))
        .cloned()
        .collect();
    if !invalid.is_empty() {
        return Err(DlError::InvalidUrls { urls: invalid });
    }

    Ok(urls)
}

/// Reads one URL per line, skipping blank lines and `#` comments.
pub fn read_url_file(path: &Path) -> Result<Vec<String>> {
    let reader = BufReader::new(File::open(path)?);

    let mut urls = Vec::new();
    for line in reader.lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        urls.push(line.to_string());
    }

    Ok(urls)
}
