/// 認証情報をログやエラー文に載せるための伏せ字処理。

/// 末尾4文字だけを残した表示用サフィックスを返す。
///
/// 4文字以下の値は全体が漏れるため `****` に置き換える。
#[must_use]
pub fn credential_suffix(credential: &str) -> String {
    let chars: Vec<char> = credential.chars().collect();
    if chars.len() <= 4 {
        return "****".to_string();
    }
    chars[chars.len() - 4..].iter().collect()
}

/// メッセージ中に含まれる認証情報本体をサフィックス表記に置き換える。
#[must_use]
pub fn scrub_credential(message: &str, credential: &str) -> String {
    if credential.is_empty() {
        return message.to_string();
    }
    message.replace(credential, &format!("...{}", credential_suffix(credential)))
}
