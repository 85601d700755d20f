//! Path Parser: decode a repository-relative upload path into its Maven
//! coordinates, filename class, and sidecar kind.
//!
//! Grounded directly on the reference indexer's path-walking algorithm:
//! strip a trailing checksum suffix, then walk the path from the right one
//! slash-delimited segment at a time.

use indexer_util::errors::{IndexerError, IndexerResult};

const MAVEN_METADATA_FILE: &str = "maven-metadata.xml";
const MD5_EXTENSION: &str = ".md5";
const SHA1_EXTENSION: &str = ".sha1";
const SNAPSHOT_SUFFIX: &str = "-SNAPSHOT";

/// Which sidecar (if any) a path names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SidecarKind {
    File,
    Md5,
    Sha1,
}

/// The classifier/extension pair identifying one artifact slot within a
/// download. A `None` classifier denotes the primary artifact.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArtifactType {
    pub classifier: Option<String>,
    pub extension: String,
}

/// A fully decoded upload path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedPath {
    pub group_id: String,
    pub artifact_id: String,
    pub sidecar: SidecarKind,
    pub metadata: bool,
    /// The Maven version segment from the path (e.g. `1.1-SNAPSHOT`), empty
    /// for project-level metadata.
    pub version: String,
    /// The version as it appears in the filename: for snapshots this is the
    /// timestamped form (`1.1-20240201.100000-5`), otherwise equal to
    /// `version`.
    pub display_version: String,
    pub snapshot: bool,
    pub artifact: Option<ArtifactType>,
}

impl ParsedPath {
    pub fn is_primary_jar(&self) -> bool {
        match &self.artifact {
            Some(a) => a.classifier.is_none() && a.extension == "jar",
            None => false,
        }
    }
}

/// Parse `path` (slash-delimited, no leading slash). When `parse_artifact`
/// is true the path is expected to resolve to a concrete artifact (a PUT);
/// when false, only group/artifact/version/metadata segments are required
/// and the filename itself is not decomposed (a GET, which is allowed to
/// name `maven-metadata.xml`).
pub fn parse_path(path: &str, parse_artifact: bool) -> IndexerResult<ParsedPath> {
    let (sidecar, trimmed) = if let Some(stem) = path.strip_suffix(MD5_EXTENSION) {
        (SidecarKind::Md5, stem)
    } else if let Some(stem) = path.strip_suffix(SHA1_EXTENSION) {
        (SidecarKind::Sha1, stem)
    } else {
        (SidecarKind::File, path)
    };

    let bytes = trimmed.as_bytes();
    let mut pos = bytes.len();

    let filename = find_path_segment(trimmed, &mut pos)?;
    let mut next = find_path_segment(trimmed, &mut pos)?;

    let metadata = filename == MAVEN_METADATA_FILE;

    let mut version = String::new();
    let mut display_version = String::new();
    if !metadata || next.ends_with(SNAPSHOT_SUFFIX) {
        version = next.to_string();
        display_version = next.to_string();
        next = find_path_segment(trimmed, &mut pos)?;
    }

    let artifact_id = next.to_string();
    let group_id = trimmed[..pos].replace('/', ".");

    let mut snapshot = false;
    let mut artifact = None;

    if parse_artifact && !metadata {
        if !filename.starts_with(&artifact_id)
            || filename.as_bytes().get(artifact_id.len()) != Some(&b'-')
        {
            return Err(IndexerError::BadRequest(format!(
                "invalid filename (missing artifact ID): {filename}"
            )));
        }

        let mut rest = &filename[artifact_id.len() + 1..];

        if version.ends_with(SNAPSHOT_SUFFIX) {
            let prefix_len = version.len() - SNAPSHOT_SUFFIX.len() + 1;
            let prefix = &version[..prefix_len];

            if !rest.starts_with(prefix) {
                return Err(IndexerError::BadRequest(format!(
                    "invalid filename (missing version): {filename}"
                )));
            }

            let end = find_non_numeric(rest, prefix_len + 16);
            display_version = rest[..end].to_string();
            snapshot = true;
            rest = &rest[end..];
        } else {
            if !rest.starts_with(version.as_str()) {
                return Err(IndexerError::BadRequest(format!(
                    "invalid filename (missing version): {filename}"
                )));
            }
            rest = &rest[version.len()..];
        }

        let rest_bytes = rest.as_bytes();
        if rest_bytes.is_empty() {
            return Err(IndexerError::BadRequest(format!(
                "invalid filename (invalid version): {filename}"
            )));
        }

        let classifier;
        if rest_bytes[0] == b'-' {
            let end = rest
                .rfind('.')
                .ok_or_else(|| IndexerError::BadRequest(format!("invalid filename (missing extension): {filename}")))?;
            classifier = Some(rest[1..end].to_string());
            rest = &rest[end..];
        } else if rest_bytes[0] != b'.' {
            return Err(IndexerError::BadRequest(format!(
                "invalid filename (invalid version): {filename}"
            )));
        } else {
            classifier = None;
        }

        artifact = Some(ArtifactType {
            classifier,
            extension: rest[1..].to_string(),
        });
    }

    Ok(ParsedPath {
        group_id,
        artifact_id,
        sidecar,
        metadata,
        version,
        display_version,
        snapshot,
        artifact,
    })
}

/// Find the first non-digit byte in `s` at or after `start`. If the whole
/// remainder is numeric, return `s.len()` — the reference implementation
/// returns -1 here, which would be an out-of-bounds slice; running to the
/// end of the string is the sensible interpretation for an all-numeric
/// build-number-and-timestamp tail.
fn find_non_numeric(s: &str, start: usize) -> usize {
    let bytes = s.as_bytes();
    for (i, b) in bytes.iter().enumerate().skip(start) {
        if !b.is_ascii_digit() {
            return i;
        }
    }
    bytes.len()
}

/// Consume one `/`-delimited segment ending at `*pos`, moving `*pos` to the
/// position of the separating slash (or 0 if none remains).
fn find_path_segment<'a>(s: &'a str, pos: &mut usize) -> IndexerResult<&'a str> {
    let bytes = s.as_bytes();
    let mut i = *pos;
    while i > 0 {
        i -= 1;
        if bytes[i] == b'/' {
            let result = &s[i + 1..*pos];
            *pos = i;
            return Ok(result);
        }
    }
    if *pos > 0 {
        let result = &s[..*pos];
        *pos = 0;
        return Ok(result);
    }
    Err(IndexerError::BadRequest("missing path segment".to_string()))
}

/// Split a branch name at its first `-`, returning the build-type prefix.
/// Used to infer a branch's build type on first sight (`stable-1.12` →
/// `stable`).
pub fn substring_before_dash(s: &str) -> &str {
    match s.find('-') {
        Some(i) => &s[..i],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_concrete_release_artifact() {
        let p = parse_path("org/example/y/1.0.0/y-1.0.0.jar", true).unwrap();
        assert_eq!(p.group_id, "org.example");
        assert_eq!(p.artifact_id, "y");
        assert_eq!(p.version, "1.0.0");
        assert_eq!(p.display_version, "1.0.0");
        assert!(!p.metadata);
        assert!(!p.snapshot);
        let a = p.artifact.unwrap();
        assert_eq!(a.classifier, None);
        assert_eq!(a.extension, "jar");
    }

    #[test]
    fn parses_classifier_artifact() {
        let p = parse_path("org/example/y/1.0.0/y-1.0.0-sources.jar", true).unwrap();
        let a = p.artifact.unwrap();
        assert_eq!(a.classifier, Some("sources".to_string()));
        assert_eq!(a.extension, "jar");
    }

    #[test]
    fn parses_md5_sidecar() {
        let p = parse_path("org/example/y/1.0.0/y-1.0.0.jar.md5", true).unwrap();
        assert_eq!(p.sidecar, SidecarKind::Md5);
        assert_eq!(p.artifact.unwrap().extension, "jar");
    }

    #[test]
    fn parses_snapshot_timestamped_filename() {
        let p = parse_path(
            "org/example/y/1.0-SNAPSHOT/y-1.0-20240101.120000-3.jar",
            true,
        )
        .unwrap();
        assert_eq!(p.version, "1.0-SNAPSHOT");
        assert_eq!(p.display_version, "1.0-20240101.120000-3");
        assert!(p.snapshot);
        assert_eq!(p.artifact.unwrap().extension, "jar");
    }

    #[test]
    fn parses_project_level_metadata() {
        let p = parse_path("org/example/y/maven-metadata.xml", false).unwrap();
        assert!(p.metadata);
        assert_eq!(p.version, "");
        assert_eq!(p.artifact_id, "y");
        assert_eq!(p.group_id, "org.example");
    }

    #[test]
    fn parses_version_level_metadata_for_snapshot() {
        let p = parse_path("org/example/y/1.0-SNAPSHOT/maven-metadata.xml", false).unwrap();
        assert!(p.metadata);
        assert_eq!(p.version, "1.0-SNAPSHOT");
        assert_eq!(p.artifact_id, "y");
    }

    #[test]
    fn rejects_missing_artifact_id_prefix() {
        let err = parse_path("org/example/y/1.0.0/other-1.0.0.jar", true).unwrap_err();
        assert!(matches!(err, IndexerError::BadRequest(_)));
    }

    #[test]
    fn substring_before_dash_splits_on_first_dash() {
        assert_eq!(substring_before_dash("stable-1.12"), "stable");
        assert_eq!(substring_before_dash("bleeding"), "bleeding");
    }

    #[test]
    fn round_trips_group_path() {
        let p = parse_path("org/example/sub/y/1.0.0/y-1.0.0.jar", true).unwrap();
        assert_eq!(p.group_id, "org.example.sub");
    }
}
