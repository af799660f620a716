//! 分析結果のファイルキャッシュ。
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::util::best_effort::BestEffort;

use super::model::AnalysisResult;

/// 書き込み先パス、または回復済みの失敗。
pub type PersistOutcome = BestEffort<PathBuf>;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache I/O failed for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cache entry could not be (de)serialized: {0}")]
    Serde(#[from] serde_json::Error),
}

#[async_trait]
pub trait ResultCache: Send + Sync {
    /// 結果を保存する。失敗しても呼び出し側には伝播させない。
    async fn persist(&self, topic: &str, result: &AnalysisResult) -> PersistOutcome;

    /// 保存済みの結果を読む。未保存なら `None`。
    async fn load(&self, topic: &str) -> Result<Option<AnalysisResult>, CacheError>;
}

/// トピックからキャッシュファイル名を作る。
///
/// 小文字化したうえで英数字以外を `-` に置き換え、`.json` を付ける。
/// 置換済みの語幹に再適用しても変わらない。
#[must_use]
pub fn cache_key(topic: &str) -> String {
    let stem: String = topic
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '-' })
        .collect();
    format!("{stem}.json")
}

/// ディレクトリ配下に1トピック1ファイルで保存するキャッシュ。
#[derive(Debug, Clone)]
pub struct FileResultCache {
    dir: PathBuf,
}

impl FileResultCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    #[must_use]
    pub fn path_for(&self, topic: &str) -> PathBuf {
        self.dir.join(cache_key(topic))
    }

    async fn write(&self, topic: &str, result: &AnalysisResult) -> Result<PathBuf, CacheError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| CacheError::Io {
                path: self.dir.clone(),
                source,
            })?;

        let body = serde_json::to_vec_pretty(result)?;
        let path = self.path_for(topic);
        // 読み手が書きかけのファイルを見ないよう、一時ファイル経由で置き換える
        let temp = self
            .dir
            .join(format!(".{}.{}.tmp", cache_key(topic), Uuid::new_v4()));

        if let Err(source) = tokio::fs::write(&temp, &body).await {
            return Err(CacheError::Io { path: temp, source });
        }
        if let Err(source) = tokio::fs::rename(&temp, &path).await {
            let _ = tokio::fs::remove_file(&temp).await;
            return Err(CacheError::Io { path, source });
        }
        Ok(path)
    }
}

#[async_trait]
impl ResultCache for FileResultCache {
    async fn persist(&self, topic: &str, result: &AnalysisResult) -> PersistOutcome {
        match self.write(topic, result).await {
            Ok(path) => {
                debug!(topic, path = %path.display(), "cached analysis result");
                BestEffort::Done(path)
            }
            Err(error) => {
                warn!(topic, error = %error, "failed to cache analysis result");
                BestEffort::recovered(error.to_string())
            }
        }
    }

    async fn load(&self, topic: &str) -> Result<Option<AnalysisResult>, CacheError> {
        let path = self.path_for(topic);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(source) if source.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(CacheError::Io { path, source }),
        };
        Ok(Some(serde_json::from_slice(&bytes)?))
    }
}
