//! チャンクファイルの中身となるバイト列リテラル `b'...'` の書き出しと解析
//!
//! 中身はBase64テキスト（暗号化時はFernetトークン）だけなので、
//! エスケープを含まない単純な形式のみを受け付ける。何かを評価・実行することはない。

use thiserror::Error;

const PREFIX: &str = "b'";
const SUFFIX: &str = "'";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum LiteralError {
    #[error("先頭が b' ではありません")]
    MissingPrefix,
    #[error("末尾が ' ではありません")]
    MissingSuffix,
    #[error("{position}文字目に使用できない文字があります: {found:?}")]
    UnexpectedChar { position: usize, found: char },
}

/// Base64（標準・URLセーフ）のアルファベットとパディング
fn is_allowed(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '+' | '/' | '-' | '_' | '=')
}

fn check_body(body: &str, offset: usize) -> Result<(), LiteralError> {
    match body.char_indices().find(|&(_, c)| !is_allowed(c)) {
        Some((i, found)) => Err(LiteralError::UnexpectedChar {
            position: offset + i,
            found,
        }),
        None => Ok(()),
    }
}

/// バイト列をリテラル形式のテキストに変換
pub fn to_literal(bytes: &[u8]) -> Result<String, LiteralError> {
    let body = std::str::from_utf8(bytes).map_err(|e| LiteralError::UnexpectedChar {
        position: PREFIX.len() + e.valid_up_to(),
        found: char::REPLACEMENT_CHARACTER,
    })?;
    check_body(body, PREFIX.len())?;
    Ok(format!("{PREFIX}{body}{SUFFIX}"))
}

/// リテラル形式のテキストをバイト列に戻す
///
/// 末尾の空白（エディタが付けた改行など）は無視する。
pub fn parse_literal(text: &str) -> Result<Vec<u8>, LiteralError> {
    let text = text.trim_end();
    let rest = text.strip_prefix(PREFIX).ok_or(LiteralError::MissingPrefix)?;
    let body = rest.strip_suffix(SUFFIX).ok_or(LiteralError::MissingSuffix)?;
    check_body(body, PREFIX.len())?;
    Ok(body.as_bytes().to_vec())
}
