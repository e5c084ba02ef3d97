use crate::chunk::{chunk_path, recovered_path, sort_chunks, CHUNK_MARKER};
use crate::config::Config;
use crate::crypto;
use crate::error::{Error, Result};
use crate::key_derivation::{derive_key, FernetKey};
use crate::literal::{parse_literal, to_literal};
use crate::{base64_decode, base64_encode};
use indicatif::{ProgressBar, ProgressStyle};
use std::{
    ffi::OsStr,
    fs::{self, File},
    io::{self, BufReader, BufWriter, Read, Write},
    path::{Path, PathBuf},
};
use tracing::{debug, info, warn};

/// 1MB
const MEGABYTE: u64 = 1024 * 1024;

/// 分割（エンコード）のオプション
#[derive(Debug, Clone, Default)]
pub struct SplitOptions {
    /// チャンクのバイト数（`None` または 0 で分割しない）
    pub chunk_bytes: Option<u64>,
    /// 空文字列なら暗号化しない
    pub password: String,
    pub show_progress: bool,
}

impl SplitOptions {
    /// MB単位のチャンクサイズから作成（0以下は分割しない）
    pub fn with_chunk_size_mb(chunk_size_mb: i64, password: impl Into<String>) -> Self {
        let chunk_bytes = u64::try_from(chunk_size_mb)
            .ok()
            .filter(|&mb| mb > 0)
            .map(|mb| mb.saturating_mul(MEGABYTE));
        Self {
            chunk_bytes,
            password: password.into(),
            show_progress: false,
        }
    }
}

/// 結合（デコード）のオプション
#[derive(Debug, Clone, Default)]
pub struct MergeOptions {
    /// 空文字列なら復号化しない
    pub password: String,
    pub show_progress: bool,
}

impl MergeOptions {
    pub fn new(password: impl Into<String>) -> Self {
        Self {
            password: password.into(),
            show_progress: false,
        }
    }
}

/// 処理バイト数の進捗バー
fn progress_bar(len: u64, enabled: bool) -> ProgressBar {
    if !enabled {
        return ProgressBar::hidden();
    }
    let progress = ProgressBar::new(len);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})")
    {
        progress.set_style(style.progress_chars("#>-"));
    }
    progress
}

/// 最大 `limit` バイト（`None` なら残り全部）を読み込む
fn read_chunk<R: Read>(reader: &mut R, limit: Option<u64>) -> io::Result<Vec<u8>> {
    let mut buffer = Vec::new();
    match limit {
        Some(limit) => reader.by_ref().take(limit).read_to_end(&mut buffer)?,
        None => reader.read_to_end(&mut buffer)?,
    };
    Ok(buffer)
}

/// ファイルをBase64チャンクファイル（`<元のファイル名>.64.<番号>`）に分割
///
/// 各チャンクは元ファイルのバイト数で区切られ、個別にBase64化（と暗号化）される。
/// 書き出したチャンクファイルのパスを順番に返す。空のファイルからはチャンクを作らない。
pub fn split_file(source: &Path, options: &SplitOptions, config: &Config) -> Result<Vec<PathBuf>> {
    if !source.exists() {
        return Err(Error::SourceNotFound(source.to_path_buf()));
    }

    let key = derive_key(&options.password, &config.kdf)?;
    let chunk_bytes = options.chunk_bytes.filter(|&n| n > 0);

    // チャンクは元ファイルと同じディレクトリに置く
    let source_abs = std::path::absolute(source)?;
    let file_size = fs::metadata(source)?.len();

    info!(
        source = %source_abs.display(),
        file_size,
        chunk_bytes = ?chunk_bytes,
        encrypted = key.is_some(),
        "分割開始"
    );

    let progress = progress_bar(file_size, options.show_progress);
    let mut reader = BufReader::new(File::open(source)?);
    let mut outputs = Vec::new();

    loop {
        let raw = read_chunk(&mut reader, chunk_bytes)?;
        if raw.is_empty() {
            break; // EOF
        }

        let index = u32::try_from(outputs.len() + 1)
            .map_err(|_| Error::Io(io::Error::other("チャンク数が多すぎます")))?;
        let output_path = chunk_path(&source_abs, index);
        write_chunk(&output_path, &raw, key.as_ref())?;

        progress.inc(raw.len() as u64);
        progress.suspend(|| println!("=>{}", output_path.display()));
        outputs.push(output_path);
    }

    progress.finish_and_clear();

    if outputs.is_empty() {
        warn!(source = %source_abs.display(), "空のファイルのためチャンクは作成されません");
    } else {
        info!(chunks = outputs.len(), "分割完了");
    }

    Ok(outputs)
}

/// 1チャンク分をエンコードして書き出す
fn write_chunk(output_path: &Path, raw: &[u8], key: Option<&FernetKey>) -> Result<()> {
    let mut encoded = base64_encode(raw).into_bytes();
    if let Some(key) = key {
        encoded = crypto::encrypt(&encoded, key);
    }

    write_chunk_text(output_path, &encoded)?;

    debug!(
        path = %output_path.display(),
        raw_len = raw.len(),
        encoded_len = encoded.len(),
        "チャンク書き込み完了"
    );
    Ok(())
}

/// エンコード済みの内容をリテラル形式で書き出す
fn write_chunk_text(output_path: &Path, encoded: &[u8]) -> Result<()> {
    let text = to_literal(encoded)
        .map_err(|e| Error::Io(io::Error::other(format!("チャンクのエンコードに失敗: {e}"))))?;
    fs::write(output_path, text)?;
    Ok(())
}

/// チャンクファイル群から元のファイル（`<元のファイル名>.r64`）を復元
///
/// 存在しない・名前が `.64.<数字>` で終わらないパスは無視し、番号順に連結する。
/// 欠けたチャンクは検出しない。出力は一時ファイルに書き、すべて成功した場合のみ
/// 復元ファイル名に置き換えるため、パスワード違いでは復元ファイルは作られない。
pub fn merge_chunks<P: AsRef<Path>>(
    paths: &[P],
    options: &MergeOptions,
    config: &Config,
) -> Result<PathBuf> {
    let chunks = sort_chunks(paths);
    let no_match = || Error::NoMatchingChunks {
        pattern: paths
            .iter()
            .map(|p| p.as_ref().display().to_string())
            .collect::<Vec<_>>()
            .join(", "),
    };

    let first = chunks.first().ok_or_else(no_match)?;
    let recovered = recovered_path(first).ok_or_else(no_match)?;
    let key = derive_key(&options.password, &config.kdf)?;

    let mut staging_name = recovered.file_name().unwrap_or_default().to_os_string();
    staging_name.push(".part");
    let staging = recovered.with_file_name(staging_name);

    info!(
        chunks = chunks.len(),
        recovered = %recovered.display(),
        encrypted = key.is_some(),
        "結合開始"
    );

    let total_size = chunks
        .iter()
        .filter_map(|path| fs::metadata(path).ok())
        .map(|metadata| metadata.len())
        .sum();
    let progress = progress_bar(total_size, options.show_progress);

    match write_recovered(&chunks, &staging, key.as_ref(), &progress) {
        Ok(()) => fs::rename(&staging, &recovered)?,
        Err(e) => {
            progress.abandon();
            if let Err(remove_err) = fs::remove_file(&staging) {
                debug!(error = %remove_err, "一時ファイルの削除に失敗");
            }
            return Err(e);
        }
    }

    progress.finish_and_clear();
    println!("=>{}", recovered.display());
    info!("結合完了");

    Ok(recovered)
}

fn write_recovered(
    chunks: &[PathBuf],
    staging: &Path,
    key: Option<&FernetKey>,
    progress: &ProgressBar,
) -> Result<()> {
    let mut writer = BufWriter::new(File::create(staging)?);

    for path in chunks {
        progress.suspend(|| println!("<={}", path.display()));

        let malformed = |reason: String| Error::MalformedChunkText {
            path: path.clone(),
            reason,
        };

        let bytes = fs::read(path)?;
        let text = std::str::from_utf8(&bytes).map_err(|e| malformed(e.to_string()))?;
        let mut raw = parse_literal(text).map_err(|e| malformed(e.to_string()))?;
        if let Some(key) = key {
            raw = crypto::decrypt(&raw, key)?;
        }
        let decoded = base64_decode(&raw)?;
        writer.write_all(&decoded)?;

        progress.inc(bytes.len() as u64);
        debug!(path = %path.display(), decoded_len = decoded.len(), "チャンク読み込み完了");
    }

    writer.flush()?;
    Ok(())
}

/// ファイル名の一部からチャンクファイルを探して復元
///
/// `<ディレクトリ>/<名前の一部>` の形で指定し、そのディレクトリ内で
/// 名前の一部を含み、その後に `.64.` が続くファイルをすべて対象にする。
pub fn decode_by_file_name(
    pattern: &str,
    options: &MergeOptions,
    config: &Config,
) -> Result<PathBuf> {
    let matches = find_chunk_candidates(pattern)?;
    if matches.is_empty() {
        return Err(Error::NoMatchingChunks {
            pattern: pattern.to_string(),
        });
    }

    debug!(pattern, candidates = matches.len(), "候補ファイル");
    merge_chunks(&matches, options, config).map_err(|e| match e {
        Error::NoMatchingChunks { .. } => Error::NoMatchingChunks {
            pattern: pattern.to_string(),
        },
        other => other,
    })
}

/// パターンを (検索ディレクトリ, 名前の一部) に分ける
///
/// 区切り文字で終わるパターンはディレクトリそのものを指し、名前の一部は空になる。
fn split_pattern(pattern: &str) -> (Option<&Path>, &str) {
    if pattern.ends_with(std::path::is_separator) {
        return (Some(Path::new(pattern)), "");
    }
    let pattern_path = Path::new(pattern);
    let fragment = pattern_path
        .file_name()
        .and_then(OsStr::to_str)
        .unwrap_or_default();
    let dir = pattern_path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty());
    (dir, fragment)
}

/// パターンに一致するチャンクファイル候補を列挙
pub fn find_chunk_candidates(pattern: &str) -> Result<Vec<PathBuf>> {
    let (dir, fragment) = split_pattern(pattern);

    let entries = match fs::read_dir(dir.unwrap_or(Path::new("."))) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut matches = Vec::new();
    for entry in entries {
        let entry = entry?;
        let file_name = entry.file_name();
        let Some(name) = file_name.to_str() else {
            continue;
        };
        if matches_pattern(name, fragment) {
            matches.push(match dir {
                Some(dir) => dir.join(name),
                None => PathBuf::from(name),
            });
        }
    }

    matches.sort();
    Ok(matches)
}

/// `*<fragment>*.64.*` 相当の判定（隠しファイルは対象外）
fn matches_pattern(name: &str, fragment: &str) -> bool {
    if name.starts_with('.') {
        return false;
    }
    name.find(fragment)
        .is_some_and(|pos| name[pos + fragment.len()..].contains(CHUNK_MARKER))
}
