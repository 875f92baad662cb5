use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::score::ScoredReference;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("could not access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path} is not a valid scored references file: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

pub fn scored_references_path(dir: &Path, paper_id: &str) -> PathBuf {
    dir.join(format!("{}_scoredReferences.json", file_stem(paper_id)))
}

/// Paper ids may carry a `DOI:`/`ArXiv:` prefix or slashes; keep file names flat.
pub(crate) fn file_stem(paper_id: &str) -> String {
    paper_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

pub fn save(dir: &Path, paper_id: &str, scored: &[ScoredReference]) -> Result<PathBuf, StoreError> {
    let path = scored_references_path(dir, paper_id);
    let json = serde_json::to_string_pretty(scored).map_err(|source| StoreError::Json {
        path: path.clone(),
        source,
    })?;
    fs::create_dir_all(dir).map_err(|source| StoreError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    fs::write(&path, json).map_err(|source| StoreError::Io {
        path: path.clone(),
        source,
    })?;
    debug!(path = %path.display(), count = scored.len(), "scored references saved");
    Ok(path)
}

pub fn load(path: &Path) -> Result<Vec<ScoredReference>, StoreError> {
    let text = fs::read_to_string(path).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let scored = serde_json::from_str(&text).map_err(|source| StoreError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(scored)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scholar::types::{Author, Paper};
    use crate::score::IntentColor;

    fn scored(id: &str, score: f32) -> ScoredReference {
        ScoredReference {
            paper: Paper {
                paper_id: Some(id.into()),
                title: format!("Paper {id}"),
                authors: vec![Author {
                    author_id: Some("42".into()),
                    name: "Grace Hopper".into(),
                }],
                year: Some(1999),
                abstract_: Some("Ünïcode abstract".into()),
            },
            score,
            cite_count: 2,
            similarity: 0.25,
            is_influential: true,
            intent: IntentColor::Blue,
        }
    }

    #[test]
    fn file_stem_flattens_prefixed_ids() {
        assert_eq!(file_stem("DOI:10.1000/xyz"), "DOI_10.1000_xyz");
        assert_eq!(file_stem("abc123"), "abc123");
    }

    #[test]
    fn save_then_load_preserves_order_and_fields() {
        let dir = tempfile::tempdir().unwrap();
        let refs = vec![scored("a", 0.9), scored("b", 0.1)];

        let path = save(dir.path(), "root", &refs).unwrap();
        assert_eq!(path.file_name().unwrap(), "root_scoredReferences.json");

        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"paperId\": \"a\""));
        assert!(raw.contains("Ünïcode"), "non-ASCII written verbatim");

        assert_eq!(load(&path).unwrap(), refs);
    }

    #[test]
    fn save_creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("out/graphs");
        let path = save(&nested, "root", &[]).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let err = load(Path::new("/nonexistent/refs.json")).unwrap_err();
        assert!(matches!(err, StoreError::Io { .. }));
    }

    #[test]
    fn load_malformed_file_is_json_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, "[{\"score\": 1}]").unwrap();
        let err = load(&path).unwrap_err();
        assert!(matches!(err, StoreError::Json { .. }));
        assert!(err.to_string().contains("bad.json"));
    }
}
