//! JAR Reader: scan uploaded ZIP bytes for `META-INF/MANIFEST.MF` and an
//! optional `mcmod.info` plugin-metadata array.

use std::collections::HashMap;
use std::io::Read;

use indexer_util::errors::{IndexerError, IndexerResult};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

const MANIFEST_PATH: &str = "META-INF/MANIFEST.MF";
const MCMOD_FILE_NAME: &str = "mcmod.info";

/// The parsed `META-INF/MANIFEST.MF` key/value block.
pub type Manifest = HashMap<String, String>;

/// One entry of an `mcmod.info` plugin-metadata array.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginMetadata {
    pub modid: String,
    #[serde(default)]
    pub version: String,
    #[serde(default, rename = "requiredMods")]
    pub required_mods: Vec<String>,
}

/// A single `requiredMods` entry, split at `@` into `(id, version)`.
pub fn split_dependency(entry: &str) -> (String, Option<String>) {
    match entry.split_once('@') {
        Some((id, version)) => (id.to_string(), Some(version.to_string())),
        None => (entry.to_string(), None),
    }
}

/// Result of reading a JAR: the manifest (if present), the manifest entry's
/// modification time (if the ZIP recorded one), and the plugin metadata
/// array (only populated when `read_plugin_metadata` is true).
pub struct JarContents {
    pub manifest: Option<Manifest>,
    pub manifest_time: Option<OffsetDateTime>,
    pub plugin_metadata: Option<Vec<PluginMetadata>>,
}

/// Scan `zip_bytes` once for the manifest and, when `read_plugin_metadata`
/// is set, the `mcmod.info` array.
pub fn read_jar(zip_bytes: &[u8], read_plugin_metadata: bool) -> IndexerResult<JarContents> {
    let cursor = std::io::Cursor::new(zip_bytes);
    let mut archive = zip::ZipArchive::new(cursor)
        .map_err(|e| IndexerError::BadRequest(format!("invalid JAR file: {e}")))?;

    let mut manifest = None;
    let mut manifest_time = None;
    let mut plugin_metadata = None;

    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|e| IndexerError::BadRequest(format!("invalid JAR entry: {e}")))?;

        match entry.name() {
            MANIFEST_PATH => {
                if let Some(dt) = zip_modified_time(&entry) {
                    manifest_time = Some(dt);
                }
                manifest = Some(read_manifest(&mut entry)?);
            }
            MCMOD_FILE_NAME if read_plugin_metadata => {
                plugin_metadata = Some(read_plugin_metadata_array(&mut entry)?);
            }
            _ => {}
        }

        if manifest.is_some() && (!read_plugin_metadata || plugin_metadata.is_some()) {
            break;
        }
    }

    Ok(JarContents {
        manifest,
        manifest_time,
        plugin_metadata,
    })
}

/// The ZIP date/time fields default to the MS-DOS epoch (1980-01-01) when
/// unset; only trust a modification time when the raw date part is past
/// that default.
fn zip_modified_time(entry: &zip::read::ZipFile) -> Option<OffsetDateTime> {
    let dt = entry.last_modified();
    if dt.datepart() <= 33 && dt.timepart() == 0 {
        return None;
    }
    dt.to_time().ok()
}

fn read_manifest(entry: &mut zip::read::ZipFile) -> IndexerResult<Manifest> {
    let mut contents = String::new();
    entry
        .read_to_string(&mut contents)
        .map_err(|e| IndexerError::BadRequest(format!("unreadable manifest: {e}")))?;

    let mut map = Manifest::new();
    for line in contents.lines() {
        if let Some((key, value)) = line.split_once(':') {
            map.insert(key.trim().to_string(), value.trim().to_string());
        }
    }
    Ok(map)
}

fn read_plugin_metadata_array(entry: &mut zip::read::ZipFile) -> IndexerResult<Vec<PluginMetadata>> {
    let mut contents = String::new();
    entry
        .read_to_string(&mut contents)
        .map_err(|e| IndexerError::BadRequest(format!("unreadable mcmod.info: {e}")))?;
    serde_json::from_str(&contents)
        .map_err(|e| IndexerError::BadRequest(format!("malformed mcmod.info: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn build_jar(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut buf = Vec::new();
        {
            let cursor = std::io::Cursor::new(&mut buf);
            let mut writer = zip::ZipWriter::new(cursor);
            let options: zip::write::FileOptions<()> = zip::write::FileOptions::default();
            for (name, data) in entries {
                writer.start_file(*name, options).unwrap();
                writer.write_all(data).unwrap();
            }
            writer.finish().unwrap();
        }
        buf
    }

    #[test]
    fn reads_manifest_key_values() {
        let manifest = b"Git-Commit: abc123\nGit-Branch: stable-1.12\n";
        let jar = build_jar(&[(MANIFEST_PATH, manifest)]);
        let contents = read_jar(&jar, false).unwrap();
        let m = contents.manifest.unwrap();
        assert_eq!(m.get("Git-Commit"), Some(&"abc123".to_string()));
        assert_eq!(m.get("Git-Branch"), Some(&"stable-1.12".to_string()));
    }

    #[test]
    fn skips_lines_without_colon() {
        let manifest = b"Git-Commit: abc123\nnocolonhere\n";
        let jar = build_jar(&[(MANIFEST_PATH, manifest)]);
        let contents = read_jar(&jar, false).unwrap();
        let m = contents.manifest.unwrap();
        assert_eq!(m.len(), 1);
    }

    #[test]
    fn reads_plugin_metadata_when_requested() {
        let manifest = b"Git-Commit: abc123\n";
        let mcmod = br#"[{"modid":"foo","version":"1.0","requiredMods":["bar@1.2","baz"]}]"#;
        let jar = build_jar(&[(MANIFEST_PATH, manifest), (MCMOD_FILE_NAME, mcmod)]);
        let contents = read_jar(&jar, true).unwrap();
        let meta = contents.plugin_metadata.unwrap();
        assert_eq!(meta.len(), 1);
        assert_eq!(meta[0].modid, "foo");
        assert_eq!(meta[0].required_mods, vec!["bar@1.2", "baz"]);
    }

    #[test]
    fn ignores_plugin_metadata_when_not_requested() {
        let manifest = b"Git-Commit: abc123\n";
        let mcmod = br#"[{"modid":"foo"}]"#;
        let jar = build_jar(&[(MANIFEST_PATH, manifest), (MCMOD_FILE_NAME, mcmod)]);
        let contents = read_jar(&jar, false).unwrap();
        assert!(contents.plugin_metadata.is_none());
    }

    #[test]
    fn split_dependency_with_version() {
        assert_eq!(
            split_dependency("bar@1.2"),
            ("bar".to_string(), Some("1.2".to_string()))
        );
    }

    #[test]
    fn split_dependency_without_version() {
        assert_eq!(split_dependency("bar"), ("bar".to_string(), None));
    }

    #[test]
    fn truncated_zip_is_bad_request() {
        let err = read_jar(b"not a zip", false).unwrap_err();
        assert!(matches!(err, IndexerError::BadRequest(_)));
    }
}
