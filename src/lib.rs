pub mod chunk;
pub mod config;
pub mod crypto;
pub mod error;
pub mod file_ops;
pub mod key_derivation;
pub mod literal;

// 公開API
pub use config::{Config, KdfConfig};
pub use error::{Error, Result};
pub use file_ops::{decode_by_file_name, merge_chunks, split_file, MergeOptions, SplitOptions};
pub use key_derivation::{derive_key, FernetKey};

// 共通ユーティリティ
use base64::{engine::general_purpose, Engine as _};

/// 標準Base64でエンコード（チャンクの中身）
pub fn base64_encode(data: &[u8]) -> String {
    general_purpose::STANDARD.encode(data)
}

pub fn base64_decode(data: &[u8]) -> std::result::Result<Vec<u8>, base64::DecodeError> {
    general_purpose::STANDARD.decode(data)
}
