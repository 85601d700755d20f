//! Shells out to the system `git` to maintain a local bare mirror of each
//! repository a project references, and derives a changelog by walking
//! the commits reachable from `tip` but not from `base`. Submodule pins
//! that moved within that range get their own recursively generated
//! changelog, keyed by submodule path.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use indexer_core::entities::Commit;
use indexer_util::errors::{IndexerError, IndexerResult};
use indexer_util::process::CommandBuilder;
use md5::{Digest, Md5};

use crate::provider::ChangelogProvider;

const SIGNED_OFF_BY: &str = "Signed-off-by:";
const RECORD_SEP: char = '\x1e';
const FIELD_SEP: char = '\x1f';

/// `ChangelogProvider` backed by bare clones of upstream repositories,
/// cached under a directory keyed by the MD5 of each repository's URL.
pub struct GitChangelogProvider {
    cache_dir: PathBuf,
}

impl GitChangelogProvider {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
        }
    }
}

#[async_trait]
impl ChangelogProvider for GitChangelogProvider {
    async fn generate(&self, repo_url: &str, tip: &str, base: &str) -> IndexerResult<Vec<Commit>> {
        let cache_dir = self.cache_dir.clone();
        let repo_url = repo_url.to_string();
        let tip = tip.to_string();
        let base = base.to_string();

        tokio::task::spawn_blocking(move || generate_changelog(&cache_dir, &repo_url, &tip, &base))
            .await
            .map_err(|e| IndexerError::InternalError(format!("git task panicked: {e}")))?
    }
}

fn repo_cache_path(cache_dir: &Path, url: &str) -> PathBuf {
    let mut hasher = Md5::new();
    hasher.update(url.as_bytes());
    cache_dir.join(hex::encode(hasher.finalize()))
}

fn ensure_repo(dir: &Path, url: &str) -> IndexerResult<()> {
    let dir_str = dir
        .to_str()
        .ok_or_else(|| IndexerError::InternalError("non-utf8 cache path".to_string()))?;

    let output = if dir.exists() {
        CommandBuilder::new("git")
            .args(["--git-dir", dir_str, "fetch", "--quiet", "origin"])
            .exec()?
    } else {
        if let Some(parent) = dir.parent() {
            indexer_util::fs::ensure_dir(parent).map_err(IndexerError::from)?;
        }
        CommandBuilder::new("git")
            .args(["clone", "--bare", "--quiet", url, dir_str])
            .exec()?
    };

    if !output.status.success() {
        return Err(IndexerError::InternalError(format!(
            "git failed to open {url}: {}",
            String::from_utf8_lossy(&output.stderr)
        )));
    }

    Ok(())
}

struct RawCommit {
    id: String,
    author: String,
    date: String,
    parents: Vec<String>,
    body: String,
}

fn git_log(dir: &Path, tip: &str, base: &str) -> IndexerResult<Vec<RawCommit>> {
    let dir_str = dir
        .to_str()
        .ok_or_else(|| IndexerError::InternalError("non-utf8 cache path".to_string()))?;

    let format = format!("%H{FIELD_SEP}%an{FIELD_SEP}%aI{FIELD_SEP}%P{FIELD_SEP}%B{RECORD_SEP}");
    let range = format!("{base}..{tip}");

    let output = CommandBuilder::new("git")
        .args([
            "--git-dir",
            dir_str,
            "log",
            "--topo-order",
            &format!("--pretty=format:{format}"),
            &range,
        ])
        .exec()?;

    if !output.status.success() {
        return Err(IndexerError::InternalError(format!(
            "git log failed for {range}: {}",
            String::from_utf8_lossy(&output.stderr)
        )));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    Ok(stdout
        .split(RECORD_SEP)
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .filter_map(|entry| {
            let mut fields = entry.splitn(5, FIELD_SEP);
            Some(RawCommit {
                id: fields.next()?.to_string(),
                author: fields.next()?.to_string(),
                date: fields.next()?.to_string(),
                parents: fields
                    .next()?
                    .split_whitespace()
                    .map(str::to_string)
                    .collect(),
                body: fields.next().unwrap_or_default().to_string(),
            })
        })
        .collect())
}

/// The submodule gitlink SHA pinned at `path` in `commit`, or `None` if
/// the path doesn't exist or isn't a gitlink.
fn submodule_pin(dir: &Path, commit: &str, path: &str) -> IndexerResult<Option<String>> {
    let dir_str = dir
        .to_str()
        .ok_or_else(|| IndexerError::InternalError("non-utf8 cache path".to_string()))?;

    let output = CommandBuilder::new("git")
        .args(["--git-dir", dir_str, "ls-tree", commit, "--", path])
        .exec()?;

    if !output.status.success() {
        return Ok(None);
    }

    let line = String::from_utf8_lossy(&output.stdout);
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    // "<mode> <type> <sha>\t<path>"
    let mut parts = line.splitn(2, '\t');
    let info = parts.next().unwrap_or_default();
    let mut fields = info.split_whitespace();
    let mode = fields.next().unwrap_or_default();
    let object_type = fields.next().unwrap_or_default();
    let sha = fields.next().unwrap_or_default();

    if mode == "160000" && object_type == "commit" && !sha.is_empty() {
        Ok(Some(sha.to_string()))
    } else {
        Ok(None)
    }
}

/// The `path -> url` map from `.gitmodules` as it existed at `commit`, or
/// an empty map if the commit has no submodules.
fn read_gitmodules(dir: &Path, commit: &str) -> IndexerResult<HashMap<String, String>> {
    let dir_str = dir
        .to_str()
        .ok_or_else(|| IndexerError::InternalError("non-utf8 cache path".to_string()))?;

    let output = CommandBuilder::new("git")
        .args(["--git-dir", dir_str, "show", &format!("{commit}:.gitmodules")])
        .exec()?;

    if !output.status.success() {
        return Ok(HashMap::new());
    }

    Ok(parse_gitmodules(&String::from_utf8_lossy(&output.stdout)))
}

fn parse_gitmodules(contents: &str) -> HashMap<String, String> {
    let mut result = HashMap::new();
    let mut in_submodule_section = false;
    let mut path = String::new();
    let mut url = String::new();

    for raw_line in contents.lines() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }

        if line.starts_with('[') && line.ends_with(']') {
            in_submodule_section = line.starts_with("[submodule");
            if in_submodule_section {
                path.clear();
                url.clear();
            }
            continue;
        }

        if !in_submodule_section {
            continue;
        }

        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim();
        let value = value.trim();

        match key {
            "path" => path = value.to_string(),
            "url" => url = value.to_string(),
            _ => continue,
        }

        if !path.is_empty() && !url.is_empty() {
            result.insert(path.clone(), url.clone());
            path.clear();
            url.clear();
        }
    }

    result
}

fn generate_submodule_changelog(
    cache_dir: &Path,
    dir: &Path,
    commit: &str,
    parent: &str,
) -> IndexerResult<HashMap<String, Vec<Commit>>> {
    let submodules = read_gitmodules(dir, commit)?;
    if submodules.is_empty() {
        return Ok(HashMap::new());
    }

    let mut result = HashMap::new();
    for (path, url) in submodules {
        let (Some(sub_pin), Some(parent_pin)) = (
            submodule_pin(dir, commit, &path)?,
            submodule_pin(dir, parent, &path)?,
        ) else {
            continue;
        };

        if sub_pin == parent_pin {
            continue;
        }

        match generate_changelog(cache_dir, &url, &sub_pin, &parent_pin) {
            Ok(commits) if !commits.is_empty() => {
                result.insert(path, commits);
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(%path, error = %e, "failed to generate submodule changelog");
            }
        }
    }

    Ok(result)
}

fn generate_changelog(cache_dir: &Path, repo_url: &str, tip: &str, base: &str) -> IndexerResult<Vec<Commit>> {
    let dir = repo_cache_path(cache_dir, repo_url);
    ensure_repo(&dir, repo_url)?;

    let raw_commits = git_log(&dir, tip, base)?;
    let mut commits = Vec::with_capacity(raw_commits.len());

    for raw in raw_commits {
        let (title, description) = split_commit_message(&raw.body);
        let date = DateTime::parse_from_rfc3339(&raw.date)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| IndexerError::InternalError(format!("bad commit date {}: {e}", raw.date)))?;

        let submodules = if raw.parents.len() == 1 {
            generate_submodule_changelog(cache_dir, &dir, &raw.id, &raw.parents[0])?
        } else {
            HashMap::new()
        };

        commits.push(Commit {
            id: raw.id,
            author: raw.author,
            date,
            title,
            description,
            submodules,
        });
    }

    Ok(commits)
}

/// Strip a trailing `Signed-off-by:` trailer, normalize line endings, and
/// split at the first remaining newline into (title, description).
fn split_commit_message(input: &str) -> (String, String) {
    let input = match input.rfind(SIGNED_OFF_BY) {
        Some(i) => &input[..i],
        None => input,
    };

    let normalized = input.replace("\r\n", "\n").replace('\r', "\n");
    let normalized = normalized.trim();

    match normalized.split_once('\n') {
        Some((title, rest)) => (title.trim().to_string(), rest.trim().to_string()),
        None => (normalized.to_string(), String::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repo_cache_path_is_keyed_by_md5_of_url() {
        let cache = Path::new("/var/cache/vcs");
        let a = repo_cache_path(cache, "https://github.com/example/a.git");
        let b = repo_cache_path(cache, "https://github.com/example/b.git");
        assert_ne!(a, b);
        assert!(a.starts_with(cache));
    }

    #[test]
    fn splits_title_and_description() {
        let (title, description) = split_commit_message("Fix thing\n\nLonger explanation here.");
        assert_eq!(title, "Fix thing");
        assert_eq!(description, "Longer explanation here.");
    }

    #[test]
    fn strips_signed_off_by_trailer() {
        let (title, description) =
            split_commit_message("Fix thing\n\nDetails.\n\nSigned-off-by: Alice <alice@example.com>");
        assert_eq!(title, "Fix thing");
        assert_eq!(description, "Details.");
    }

    #[test]
    fn title_only_commit_has_empty_description() {
        let (title, description) = split_commit_message("Just a title");
        assert_eq!(title, "Just a title");
        assert_eq!(description, "");
    }

    #[test]
    fn normalizes_crlf_line_endings() {
        let (title, description) = split_commit_message("Title\r\n\r\nBody line.\r\n");
        assert_eq!(title, "Title");
        assert_eq!(description, "Body line.");
    }

    #[test]
    fn parses_gitmodules_path_and_url_pairs() {
        let contents = r#"
[submodule "lib/foo"]
	path = lib/foo
	url = https://github.com/example/foo.git
[submodule "lib/bar"]
	path = lib/bar
	url = https://github.com/example/bar.git
"#;
        let parsed = parse_gitmodules(contents);
        assert_eq!(
            parsed.get("lib/foo").map(String::as_str),
            Some("https://github.com/example/foo.git")
        );
        assert_eq!(
            parsed.get("lib/bar").map(String::as_str),
            Some("https://github.com/example/bar.git")
        );
    }

    #[test]
    fn parse_gitmodules_ignores_non_submodule_sections() {
        let contents = r#"
[core]
	path = ignored
	url = ignored
[submodule "lib/foo"]
	path = lib/foo
	url = https://github.com/example/foo.git
"#;
        let parsed = parse_gitmodules(contents);
        assert_eq!(parsed.len(), 1);
        assert!(parsed.contains_key("lib/foo"));
    }
}
