//! Team history: commits of the project repository

use std::path::Path;

use chrono::{DateTime, Utc};
use git2::{Repository, Sort};

use crate::error::{RecallError, Result};
use crate::search::document::meta;
use crate::search::{Document, MemoryLayer};

/// Newest `max` commits reachable from HEAD, one document each.
pub fn load_commits(project_root: &Path, max: usize) -> Result<Vec<Document>> {
    let repo = Repository::discover(project_root).map_err(|err| {
        if err.code() == git2::ErrorCode::NotFound {
            RecallError::NotFound(format!(
                "no git repository at or above {}",
                project_root.display()
            ))
        } else {
            RecallError::Git(err)
        }
    })?;

    let mut results = Vec::new();
    let mut revwalk = repo.revwalk()?;
    match repo.head() {
        Ok(head) => {
            if let Some(oid) = head.target() {
                revwalk.push(oid)?;
            } else {
                return Ok(results);
            }
        }
        Err(_) => return Ok(results),
    }
    revwalk.set_sorting(Sort::TIME)?;

    let browse_base = remote_browse_base(&repo);

    for oid in revwalk.take(max) {
        let oid = oid?;
        let commit = repo.find_commit(oid)?;
        let message = commit.message().unwrap_or_default().trim().to_string();
        if message.is_empty() {
            continue;
        }
        let summary = commit.summary().unwrap_or_default().to_string();
        let author = commit.author();
        let author_name = author.name().unwrap_or("unknown").to_string();
        let timestamp = DateTime::<Utc>::from_timestamp(commit.time().seconds(), 0)
            .map(|ts| ts.to_rfc3339())
            .unwrap_or_default();

        let sha = oid.to_string();
        let mut doc = Document::new(sha.clone(), message, 0.0, MemoryLayer::Team)
            .with_meta(meta::AUTHOR, author_name)
            .with_meta(meta::TITLE, summary);
        if !timestamp.is_empty() {
            doc = doc.with_meta(meta::TIMESTAMP, timestamp);
        }
        if let Some(base) = &browse_base {
            doc = doc.with_browse_url(format!("{base}/commit/{sha}"));
        }
        results.push(doc);
    }

    Ok(results)
}

/// `https://host/owner/repo` for an `origin` remote on a known forge
fn remote_browse_base(repo: &Repository) -> Option<String> {
    let remote = repo.find_remote("origin").ok()?;
    browse_base_from_url(remote.url()?)
}

fn browse_base_from_url(url: &str) -> Option<String> {
    let trimmed = url.trim().trim_end_matches(".git").trim_end_matches('/');
    if let Some(rest) = trimmed.strip_prefix("git@") {
        let (host, path) = rest.split_once(':')?;
        return Some(format!("https://{host}/{path}"));
    }
    if trimmed.starts_with("https://") || trimmed.starts_with("http://") {
        return Some(trimmed.to_string());
    }
    None
}
