/// ベストエフォート処理の結果表現。
///
/// 画像解決やキャッシュ書き込みのように失敗しても実行全体を止めない処理は、
/// 例外を内部で握りつぶさずにこの型で結果を返し、扱いはオーケストレータが決める。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BestEffort<T> {
    /// 処理が成功した。
    Done(T),
    /// 失敗を検知し、既定値で回復した。
    Recovered { reason: String },
}

impl<T> BestEffort<T> {
    #[must_use]
    pub fn recovered(reason: impl Into<String>) -> Self {
        Self::Recovered {
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn is_recovered(&self) -> bool {
        matches!(self, Self::Recovered { .. })
    }

    /// 回復理由があれば返す。
    #[must_use]
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Done(_) => None,
            Self::Recovered { reason } => Some(reason),
        }
    }

    /// 値を取り出す。回復済みの場合は `None`。
    #[must_use]
    pub fn into_value(self) -> Option<T> {
        match self {
            Self::Done(value) => Some(value),
            Self::Recovered { .. } => None,
        }
    }
}

impl<T> BestEffort<Option<T>> {
    /// `Option` を包む結果を平坦化する。回復済みは `None` になる。
    #[must_use]
    pub fn flatten(self) -> Option<T> {
        self.into_value().flatten()
    }
}
