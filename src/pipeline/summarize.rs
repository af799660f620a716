//! 認証情報フォールバック付きの要約生成。
//!
//! 認証情報プールを宣言順に1つずつ試し、最初に成功した生成結果を返す。
//! 全滅した場合も実行は失敗させず、各認証情報の失敗理由を連結した文字列を要約として返す。
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::util::redact::{credential_suffix, scrub_credential};

/// 生成バックエンドが利用できないときに返す固定文言。
pub const BACKEND_UNAVAILABLE: &str = "Generation backend unavailable";

const ALL_FAILED_PREFIX: &str = "All generation credentials failed. Errors: ";

/// 1つの認証情報での生成失敗。
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("generation request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("generation backend returned {status}: {message}")]
    Status {
        status: reqwest::StatusCode,
        message: String,
    },
    #[error("generation response was blocked: {0}")]
    Blocked(String),
    #[error("generation response contained no text")]
    EmptyResponse,
    #[error("failed to decode generation response: {0}")]
    Decode(String),
}

/// プロンプトと認証情報からテキストを生成する外部ケイパビリティ。
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    async fn generate(&self, prompt: &str, credential: &str) -> Result<String, GenerationError>;
}

/// 宣言順に並んだ読み取り専用の認証情報プール。
#[derive(Clone, Default)]
pub struct CredentialPool {
    credentials: Arc<[String]>,
}

impl CredentialPool {
    /// 空白のみの値を除いてプールを作る。
    #[must_use]
    pub fn new<I, S>(credentials: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let credentials: Vec<String> = credentials
            .into_iter()
            .map(Into::into)
            .map(|credential| credential.trim().to_string())
            .filter(|credential| !credential.is_empty())
            .collect();
        Self {
            credentials: credentials.into(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.credentials.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.credentials.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.credentials.iter().map(String::as_str)
    }
}

impl fmt::Debug for CredentialPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let suffixes: Vec<String> = self
            .iter()
            .map(|credential| format!("...{}", credential_suffix(credential)))
            .collect();
        f.debug_struct("CredentialPool")
            .field("credentials", &suffixes)
            .finish()
    }
}

/// 要約生成の結果。オーケストレータがログとメトリクスに使う。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SummaryOutcome {
    /// いずれかの認証情報で生成に成功した。`failed_attempts` は先行して失敗した数。
    Generated { text: String, failed_attempts: usize },
    /// すべての認証情報が失敗した。`message` は連結済みの失敗理由。
    Exhausted { message: String, failed_attempts: usize },
    /// バックエンド未設定、または認証情報が空。
    Unavailable,
}

impl SummaryOutcome {
    #[must_use]
    pub fn failed_attempts(&self) -> usize {
        match self {
            Self::Generated {
                failed_attempts, ..
            }
            | Self::Exhausted {
                failed_attempts, ..
            } => *failed_attempts,
            Self::Unavailable => 0,
        }
    }

    #[must_use]
    pub fn is_degraded(&self) -> bool {
        !matches!(self, Self::Generated { .. })
    }

    /// 結果に格納する要約文字列。
    #[must_use]
    pub fn into_text(self) -> String {
        match self {
            Self::Generated { text, .. } => text,
            Self::Exhausted { message, .. } => message,
            Self::Unavailable => BACKEND_UNAVAILABLE.to_string(),
        }
    }
}

pub struct Summarizer {
    backend: Option<Arc<dyn GenerationBackend>>,
    credentials: CredentialPool,
}

impl Summarizer {
    #[must_use]
    pub fn new(backend: Option<Arc<dyn GenerationBackend>>, credentials: CredentialPool) -> Self {
        Self {
            backend,
            credentials,
        }
    }

    /// 要約文字列を返す。失敗はすべて文字列として表現される。
    pub async fn summarize(&self, prompt: &str) -> String {
        self.summarize_with_outcome(prompt).await.into_text()
    }

    /// 認証情報を宣言順に試し、最初の成功で打ち切る。
    pub async fn summarize_with_outcome(&self, prompt: &str) -> SummaryOutcome {
        let Some(backend) = self.backend.as_ref() else {
            debug!("generation backend is not configured");
            return SummaryOutcome::Unavailable;
        };
        if self.credentials.is_empty() {
            debug!("credential pool is empty");
            return SummaryOutcome::Unavailable;
        }

        let mut failures: Vec<String> = Vec::new();
        for credential in self.credentials.iter() {
            let suffix = credential_suffix(credential);
            match backend.generate(prompt, credential).await {
                Ok(text) => {
                    if !failures.is_empty() {
                        info!(
                            credential = %format!("...{suffix}"),
                            failed_attempts = failures.len(),
                            "generation succeeded after credential fallback"
                        );
                    }
                    return SummaryOutcome::Generated {
                        text,
                        failed_attempts: failures.len(),
                    };
                }
                Err(error) => {
                    let message = scrub_credential(&error.to_string(), credential);
                    warn!(
                        credential = %format!("...{suffix}"),
                        error = %message,
                        "generation credential failed"
                    );
                    failures.push(format!("Key ...{suffix} failed: {message}"));
                }
            }
        }

        SummaryOutcome::Exhausted {
            message: format!("{ALL_FAILED_PREFIX}{}", failures.join("; ")),
            failed_attempts: failures.len(),
        }
    }
}
