use crate::error::{Error, Result};
use base64::{engine::general_purpose, Engine as _};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

/// 既定のPBKDF2ソルト（16バイト固定）
///
/// ファイルごとにランダム化していないため、事前計算された辞書攻撃への耐性はない。
/// 同じパスワードから常に同じキーが得られることを優先した簡易的な保護である。
pub const DEFAULT_SALT: [u8; 16] = [
    0xae, 0xc5, 0xea, 0xce, 0x3c, 0xdd, 0x83, 0x42, 0x95, 0xbd, 0x8c, 0x68, 0x30, 0xb9, 0x4e, 0x76,
];

/// 既定のPBKDF2繰り返し回数
pub const DEFAULT_ITERATIONS: u32 = 480_000;

/// 設定ファイルの構造
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 設定ファイルのバージョン
    pub version: String,
    /// デフォルトのチャンクサイズ（MB、0以下で分割しない）
    pub default_chunk_size: i64,
    /// 詳細出力をデフォルトで有効にするか
    pub default_verbose: bool,
    /// 進捗バーを表示するか
    pub show_progress: bool,
    /// キー導出の設定
    pub kdf: KdfConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KdfConfig {
    /// PBKDF2の繰り返し回数
    pub iterations: u32,
    /// ソルト（標準Base64）
    pub salt: String,
}

impl Default for KdfConfig {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_ITERATIONS,
            salt: general_purpose::STANDARD.encode(DEFAULT_SALT),
        }
    }
}

impl KdfConfig {
    /// ソルトをバイト列にデコード
    pub fn salt_bytes(&self) -> Result<Vec<u8>> {
        let salt = general_purpose::STANDARD
            .decode(self.salt.trim())
            .map_err(|e| Error::Config(format!("ソルトのBase64デコードに失敗: {e}")))?;
        if salt.is_empty() {
            return Err(Error::Config("ソルトが空です".to_string()));
        }
        Ok(salt)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            default_chunk_size: -1,
            default_verbose: false,
            show_progress: true,
            kdf: KdfConfig::default(),
        }
    }
}

/// 設定ファイルを読み込み
pub fn load_config(config_path: Option<&Path>) -> Result<Config> {
    let path = match config_path {
        Some(p) => p.to_path_buf(),
        None => get_default_config_path()?,
    };

    if !path.exists() {
        return Ok(Config::default());
    }

    let content = fs::read_to_string(&path)?;
    let config: Config = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("設定ファイルの解析に失敗: {}: {e}", path.display())))?;

    Ok(config)
}

/// デフォルトの設定ファイルパスを取得
pub fn get_default_config_path() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .ok_or_else(|| Error::Config("設定ディレクトリが見つかりません".to_string()))?;

    Ok(config_dir.join("file2base64").join("config.toml"))
}

/// デフォルト設定で設定ファイルを作成
pub fn create_config_file(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let toml_content = toml::to_string_pretty(&Config::default())
        .map_err(|e| Error::Config(format!("設定ファイルの生成に失敗: {e}")))?;
    fs::write(path, toml_content)?;

    Ok(())
}
