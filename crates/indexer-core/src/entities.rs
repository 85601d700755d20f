//! Catalog entities persisted by the database (§ Catalog Schema).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A build type a project can accept releases under, e.g. `stable`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildType {
    pub id: i32,
    pub name: String,
    /// Whether a download under this build type may be labeled `recommended`.
    pub allows_promotion: bool,
}

/// A registered project, loaded once at boot and held read-only for the
/// lifetime of the process. `allowed_build_types` mirrors the
/// `project_build_types` join table so the controller never needs a
/// database round trip to validate an inferred build type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: i32,
    pub group: String,
    pub artifact: String,
    pub plugin_id: Option<String>,
    pub github_owner: String,
    pub github_repo: String,
    pub use_snapshots: bool,
    pub use_semver: bool,
    pub name: String,
    pub allowed_build_types: Vec<BuildType>,
}

impl Project {
    pub fn identifier(&self) -> (String, String) {
        (self.group.clone(), self.artifact.clone())
    }

    pub fn build_type_by_name(&self, name: &str) -> Option<&BuildType> {
        self.allowed_build_types.iter().find(|bt| bt.name == name)
    }

    pub fn repo_url(&self) -> String {
        format!("https://github.com/{}/{}", self.github_owner, self.github_repo)
    }
}

/// A branch of a project, created lazily on first upload that names it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Branch {
    pub id: i32,
    pub project_id: i32,
    pub build_type_id: i32,
    pub name: String,
    pub created: DateTime<Utc>,
    pub active: bool,
}

/// One commit, as produced by a changelog provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Commit {
    pub id: String,
    pub author: String,
    pub date: DateTime<Utc>,
    pub title: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// Submodule path -> the commits that moved that submodule's pinned
    /// revision forward within this commit's range, if any changed.
    #[serde(default, skip_serializing_if = "std::collections::HashMap::is_empty")]
    pub submodules: std::collections::HashMap<String, Vec<Commit>>,
}

/// One ingested release.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Download {
    pub id: i32,
    pub project_id: i32,
    pub branch_id: i32,
    pub version: String,
    pub snapshot_version: Option<String>,
    pub published: DateTime<Utc>,
    pub commit: String,
    pub label: Option<String>,
    pub changelog: Option<Vec<Commit>>,
}

/// A named, versioned dependency of one download.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    pub download_id: i32,
    pub name: String,
    pub version: String,
}

/// The classifier/extension pair naming one artifact slot within a
/// download. A `None` classifier denotes the primary artifact.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArtifactKey {
    pub classifier: Option<String>,
    pub extension: String,
}

impl ArtifactKey {
    pub fn is_primary(&self) -> bool {
        self.classifier.is_none() && self.extension == super::INDEXED_EXTENSION
    }
}

/// A cataloged artifact file: size plus both checksums.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artifact {
    pub download_id: i32,
    pub key: ArtifactKey,
    pub size: i64,
    pub sha1: String,
    pub md5: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_type(name: &str, allows_promotion: bool) -> BuildType {
        BuildType {
            id: 1,
            name: name.to_string(),
            allows_promotion,
        }
    }

    #[test]
    fn build_type_lookup_by_name() {
        let project = Project {
            id: 1,
            group: "org.example".to_string(),
            artifact: "y".to_string(),
            plugin_id: None,
            github_owner: "example".to_string(),
            github_repo: "y".to_string(),
            use_snapshots: true,
            use_semver: false,
            name: "Y".to_string(),
            allowed_build_types: vec![build_type("stable", true), build_type("bleeding", false)],
        };

        assert!(project.build_type_by_name("stable").unwrap().allows_promotion);
        assert!(!project.build_type_by_name("bleeding").unwrap().allows_promotion);
        assert!(project.build_type_by_name("unstable").is_none());
    }

    #[test]
    fn primary_artifact_key() {
        let primary = ArtifactKey {
            classifier: None,
            extension: "jar".to_string(),
        };
        assert!(primary.is_primary());

        let sources = ArtifactKey {
            classifier: Some("sources".to_string()),
            extension: "jar".to_string(),
        };
        assert!(!sources.is_primary());

        let pom = ArtifactKey {
            classifier: None,
            extension: "pom".to_string(),
        };
        assert!(!pom.is_primary());
    }
}
