use crate::error::{Error, Result};
use crate::key_derivation::FernetKey;
use aes::Aes128;
use base64::{engine::general_purpose, Engine as _};
use cbc::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;
use std::time::{SystemTime, UNIX_EPOCH};

type HmacSha256 = Hmac<Sha256>;

/// Fernetトークンのバージョンバイト
const VERSION: u8 = 0x80;
const TIMESTAMP_LEN: usize = 8;
const IV_LEN: usize = 16;
const HMAC_LEN: usize = 32;
/// バージョン + タイムスタンプ + IV
const HEADER_LEN: usize = 1 + TIMESTAMP_LEN + IV_LEN;

/// データをFernetトークンとして暗号化
///
/// 出力はURLセーフBase64のASCIIバイト列で、タイムスタンプと改ざん検知用のHMACを含む。
pub fn encrypt(plaintext: &[u8], key: &FernetKey) -> Vec<u8> {
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);

    let mut iv = [0u8; IV_LEN];
    rand::rng().fill_bytes(&mut iv);

    encrypt_with_parts(plaintext, key, timestamp, &iv)
}

/// タイムスタンプとIVを指定して暗号化
fn encrypt_with_parts(
    plaintext: &[u8],
    key: &FernetKey,
    timestamp: u64,
    iv: &[u8; IV_LEN],
) -> Vec<u8> {
    let encryption_key = key.encryption_key();
    let ciphertext = cbc::Encryptor::<Aes128>::new(&encryption_key.into(), iv.into())
        .encrypt_padded_vec_mut::<Pkcs7>(plaintext);

    let mut token = Vec::with_capacity(HEADER_LEN + ciphertext.len() + HMAC_LEN);
    token.push(VERSION);
    token.extend_from_slice(&timestamp.to_be_bytes());
    token.extend_from_slice(iv);
    token.extend_from_slice(&ciphertext);

    let tag = signer(key).chain_update(&token).finalize().into_bytes();
    token.extend_from_slice(&tag);

    general_purpose::URL_SAFE.encode(token).into_bytes()
}

/// Fernetトークンを復号化
///
/// パスワード違い・改ざん・形式不正はすべて `Error::DecryptionFailed` になる。
pub fn decrypt(token: &[u8], key: &FernetKey) -> Result<Vec<u8>> {
    let data = general_purpose::URL_SAFE
        .decode(token)
        .map_err(|_| Error::DecryptionFailed)?;

    // 暗号文は最低1ブロック
    if data.len() < HEADER_LEN + 16 + HMAC_LEN || data[0] != VERSION {
        return Err(Error::DecryptionFailed);
    }

    let (signed, tag) = data.split_at(data.len() - HMAC_LEN);
    signer(key)
        .chain_update(signed)
        .verify_slice(tag)
        .map_err(|_| Error::DecryptionFailed)?;

    let mut iv = [0u8; IV_LEN];
    iv.copy_from_slice(&signed[1 + TIMESTAMP_LEN..HEADER_LEN]);
    let ciphertext = &signed[HEADER_LEN..];

    let encryption_key = key.encryption_key();
    cbc::Decryptor::<Aes128>::new(&encryption_key.into(), &iv.into())
        .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
        .map_err(|_| Error::DecryptionFailed)
}

fn signer(key: &FernetKey) -> HmacSha256 {
    // HMACは任意長のキーを受け付ける
    <HmacSha256 as Mac>::new_from_slice(key.signing_key())
        .unwrap_or_else(|_| unreachable!("HMAC-SHA256 accepts any key length"))
}
