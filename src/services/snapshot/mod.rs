//! On-disk model snapshots.
//!
//! A snapshot holds the fitted vectorizer and the sparse tag matrix for one
//! corpus. It is keyed by the corpus content hash and only reused when the
//! hash, the snapshot format, the tokenizer version and the feature settings
//! all match; otherwise the model is rebuilt and the snapshot rewritten.
//! Unreadable snapshots are rebuilt, never fatal.

use crate::algorithms::tokenizer::TOKENIZER_VERSION;
use crate::algorithms::vectorizer::VectorMatrix;
use crate::algorithms::TfIdfVectorizer;
use crate::config::FeatureConfig;
use crate::error::BuildError;
use crate::services::corpus::Corpus;
use crate::services::features::{FeatureBuilder, FeatureSet};
use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSnapshot {
    pub format_version: u32,
    pub tokenizer_version: u32,
    pub features: FeatureConfig,
    pub corpus_hash: String,
    pub created_at: DateTime<Utc>,
    pub vectorizer: TfIdfVectorizer,
    pub matrix: VectorMatrix,
}

impl ModelSnapshot {
    fn matches(&self, corpus_hash: &str, features: &FeatureConfig, rows: usize) -> bool {
        self.format_version == FORMAT_VERSION
            && self.tokenizer_version == TOKENIZER_VERSION
            && self.corpus_hash == corpus_hash
            && &self.features == features
            && self.vectorizer.document_count() == rows
            && self.matrix.row_count() == rows
    }
}

pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, corpus_hash: &str) -> PathBuf {
        let key = corpus_hash.get(..16).unwrap_or(corpus_hash);
        self.dir.join(format!("model-{key}.json"))
    }

    /// Returns the features for `corpus` and whether they came from disk.
    pub fn load_or_build(&self, corpus: &Corpus, features: &FeatureConfig) -> (FeatureSet, bool) {
        let hash = corpus.content_hash();
        let path = self.path_for(&hash);

        match read_snapshot(&path) {
            Ok(Some(snapshot)) if snapshot.matches(&hash, features, corpus.len()) => {
                info!("Reusing model snapshot {}", path.display());
                let set = FeatureBuilder::assemble(corpus, snapshot.vectorizer, snapshot.matrix);
                return (set, true);
            }
            Ok(Some(_)) => info!("Model snapshot {} is stale, rebuilding", path.display()),
            Ok(None) => {}
            Err(e) => warn!("Ignoring unreadable model snapshot {}: {:#}", path.display(), e),
        }

        let set = FeatureBuilder::new(features.clone()).build(corpus);
        let snapshot = ModelSnapshot {
            format_version: FORMAT_VERSION,
            tokenizer_version: TOKENIZER_VERSION,
            features: features.clone(),
            corpus_hash: hash,
            created_at: Utc::now(),
            vectorizer: set.vectorizer.clone(),
            matrix: (*set.matrix).clone(),
        };
        if let Err(e) = self.write(&path, &snapshot) {
            warn!("Failed to write model snapshot {}: {:#}", path.display(), e);
        }

        (set, false)
    }

    fn write(&self, path: &Path, snapshot: &ModelSnapshot) -> anyhow::Result<()> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("failed to create {}", self.dir.display()))?;

        let tmp = path.with_extension("json.tmp");
        let file = std::fs::File::create(&tmp)
            .with_context(|| format!("failed to create {}", tmp.display()))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, snapshot)?;
        writer.flush()?;
        std::fs::rename(&tmp, path)
            .with_context(|| format!("failed to move snapshot into {}", path.display()))?;

        info!("Wrote model snapshot {}", path.display());
        Ok(())
    }

    /// Deletes the snapshot for `corpus`, if any.
    pub fn invalidate(&self, corpus: &Corpus) -> Result<(), BuildError> {
        let path = self.path_for(&corpus.content_hash());
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(BuildError::Snapshot(format!(
                "failed to remove {}: {}",
                path.display(),
                e
            ))),
        }
    }
}

fn read_snapshot(path: &Path) -> anyhow::Result<Option<ModelSnapshot>> {
    let file = match std::fs::File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let snapshot = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("failed to parse {}", path.display()))?;
    Ok(Some(snapshot))
}
