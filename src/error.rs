use std::path::PathBuf;
use thiserror::Error;

/// ライブラリ全体のエラー型
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/Oエラー: {0}")]
    Io(#[from] std::io::Error),

    /// 分割対象のファイルが存在しない
    #[error("ファイルが存在しません: {}", .0.display())]
    SourceNotFound(PathBuf),

    /// 結合対象のチャンクファイルが1つも見つからない
    #[error("一致するチャンクファイルが見つかりません: {pattern}")]
    NoMatchingChunks { pattern: String },

    /// パスワード違い、または暗号文の改ざん
    #[error("復号化に失敗しました。パスワードを確認してください")]
    DecryptionFailed,

    /// チャンクファイルの内容がバイト列リテラルとして不正
    #[error("チャンクファイルの形式が不正です ({}): {reason}", .path.display())]
    MalformedChunkText { path: PathBuf, reason: String },

    #[error("Base64デコードに失敗: {0}")]
    InvalidBase64(#[from] base64::DecodeError),

    #[error("キー導出に失敗: {0}")]
    KeyDerivation(String),

    #[error("設定エラー: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;
