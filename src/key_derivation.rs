use crate::config::KdfConfig;
use crate::error::{Error, Result};
use base64::{engine::general_purpose, Engine as _};
use hmac::Hmac;
use pbkdf2::pbkdf2;
use sha2::Sha256;
use tracing::debug;

/// Fernet形式の32バイトキー（前半16バイト: 署名用、後半16バイト: 暗号化用）
#[derive(Clone, PartialEq, Eq)]
pub struct FernetKey([u8; 32]);

impl FernetKey {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// URLセーフBase64形式のキーから生成
    pub fn from_encoded(encoded: &str) -> Result<Self> {
        let bytes = general_purpose::URL_SAFE
            .decode(encoded.trim())
            .map_err(|e| Error::KeyDerivation(format!("キーのデコードに失敗: {e}")))?;
        let bytes: [u8; 32] = bytes
            .try_into()
            .map_err(|_| Error::KeyDerivation("キーは32バイトである必要があります".to_string()))?;
        Ok(Self(bytes))
    }

    /// URLセーフBase64形式のキー
    pub fn encoded(&self) -> String {
        general_purpose::URL_SAFE.encode(self.0)
    }

    pub fn signing_key(&self) -> &[u8] {
        &self.0[..16]
    }

    pub fn encryption_key(&self) -> [u8; 16] {
        let mut key = [0u8; 16];
        key.copy_from_slice(&self.0[16..]);
        key
    }
}

impl std::fmt::Debug for FernetKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("FernetKey(..)")
    }
}

/// パスワードからキーを導出（PBKDF2-HMAC-SHA256）
///
/// 空のパスワードは「暗号化しない」を意味し、キー導出は行わずに `None` を返す。
/// 同じパスワードと設定からは常に同じキーが得られるため、キーを別途保存する必要はない。
pub fn derive_key(password: &str, config: &KdfConfig) -> Result<Option<FernetKey>> {
    if password.is_empty() {
        return Ok(None);
    }

    if config.iterations == 0 {
        return Err(Error::KeyDerivation(
            "PBKDF2の繰り返し回数は1以上である必要があります".to_string(),
        ));
    }
    let salt = config.salt_bytes()?;

    debug!(iterations = config.iterations, salt_len = salt.len(), "PBKDF2キー導出開始");
    let start_time = std::time::Instant::now();

    let mut key = [0u8; 32];
    pbkdf2::<Hmac<Sha256>>(password.as_bytes(), &salt, config.iterations, &mut key)
        .map_err(|e| Error::KeyDerivation(format!("PBKDF2に失敗: {e}")))?;

    debug!(
        elapsed_secs = start_time.elapsed().as_secs_f64(),
        "PBKDF2キー導出完了"
    );

    Ok(Some(FernetKey(key)))
}
