//! Project conventions: `CLAUDE.md` files and `.claude/rules/**/*.md`

use std::path::{Path, PathBuf};

use serde::Deserialize;
use walkdir::WalkDir;

use crate::error::Result;
use crate::search::document::meta;
use crate::search::{Document, MemoryLayer};

/// Optional YAML front matter of a rules file
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RuleFrontMatter {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Globs the rule applies to
    #[serde(default)]
    pub paths: Vec<String>,
}

/// Split `---` delimited front matter from the body.
pub fn split_front_matter(raw: &str) -> Result<(RuleFrontMatter, &str)> {
    let Some(rest) = raw
        .strip_prefix("---\n")
        .or_else(|| raw.strip_prefix("---\r\n"))
    else {
        return Ok((RuleFrontMatter::default(), raw));
    };

    let Some(end) = rest.find("\n---") else {
        return Ok((RuleFrontMatter::default(), raw));
    };

    let yaml = &rest[..end];
    let after = &rest[end + 4..];
    let body = after
        .strip_prefix("\r\n")
        .or_else(|| after.strip_prefix('\n'))
        .unwrap_or(after);

    let front: Option<RuleFrontMatter> = serde_yaml::from_str(yaml)?;
    Ok((front.unwrap_or_default(), body))
}

/// Files holding project conventions, in a stable order
pub fn rule_files(project_root: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for candidate in [
        project_root.join("CLAUDE.md"),
        project_root.join(".claude/CLAUDE.md"),
    ] {
        if candidate.is_file() {
            files.push(candidate);
        }
    }

    let rules_dir = project_root.join(".claude/rules");
    if rules_dir.is_dir() {
        let mut nested: Vec<PathBuf> = WalkDir::new(&rules_dir)
            .follow_links(true)
            .into_iter()
            .filter_map(std::result::Result::ok)
            .filter(|entry| entry.file_type().is_file())
            .map(walkdir::DirEntry::into_path)
            .filter(|path| path.extension().is_some_and(|ext| ext == "md"))
            .collect();
        nested.sort();
        files.extend(nested);
    }

    files
}

/// Parse one rules file into a document keyed by its project-relative path.
pub fn parse_rule_file(project_root: &Path, path: &Path) -> Result<Document> {
    let raw = std::fs::read_to_string(path)?;
    let (front, body) = split_front_matter(&raw)?;

    let relative = path
        .strip_prefix(project_root)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/");

    let title = front
        .title
        .clone()
        .or_else(|| first_heading(body))
        .unwrap_or_else(|| {
            path.file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_else(|| relative.clone())
        });

    let mut content = String::new();
    if let Some(description) = &front.description {
        content.push_str(description.trim());
        content.push_str("\n\n");
    }
    content.push_str(body.trim());

    let mut doc = Document::new(format!("rules:{relative}"), content, 0.0, MemoryLayer::Rules)
        .with_meta(meta::TITLE, title)
        .with_meta(meta::FILE_PATH, relative);
    if !front.paths.is_empty() {
        doc = doc.with_meta("applies_to", front.paths.join(","));
    }
    Ok(doc)
}

/// Load every rules file, skipping unreadable ones.
pub fn load_rules(project_root: &Path) -> Vec<Document> {
    rule_files(project_root)
        .into_iter()
        .filter_map(|path| match parse_rule_file(project_root, &path) {
            Ok(doc) => Some(doc),
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "skipping rules file");
                None
            }
        })
        .collect()
}

fn first_heading(body: &str) -> Option<String> {
    body.lines()
        .map(str::trim)
        .find(|line| line.starts_with('#'))
        .map(|line| line.trim_start_matches('#').trim().to_string())
        .filter(|line| !line.is_empty())
}
