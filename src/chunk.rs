use std::{
    ffi::OsStr,
    path::{Path, PathBuf},
};

/// チャンクファイル名の区切り（`<元のファイル名>.64.<番号>`）
pub const CHUNK_MARKER: &str = ".64.";
/// 復元ファイルの拡張子
pub const RECOVERED_EXTENSION: &str = "r64";
/// 番号のゼロ埋め桁数
const INDEX_WIDTH: usize = 3;

/// 元ファイルと番号からチャンクファイルのパスを作る（番号は1始まり）
pub fn chunk_path(source: &Path, index: u32) -> PathBuf {
    let mut name = source.file_name().unwrap_or_default().to_os_string();
    name.push(format!("{CHUNK_MARKER}{index:0width$}", width = INDEX_WIDTH));
    source.with_file_name(name)
}

/// ファイル名を (元のファイル名, 番号の数字列) に分解
///
/// ファイル名が `.64.` + 1桁以上の数字で終わる場合のみ `Some` を返す。
fn split_chunk_name(name: &str) -> Option<(&str, &str)> {
    let (stem, digits) = name.rsplit_once(CHUNK_MARKER)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some((stem, digits))
}

/// 数字列を桁数に制限なく数値順に比較するためのキー
fn index_key(digits: &str) -> (usize, &str) {
    let significant = digits.trim_start_matches('0');
    (significant.len(), significant)
}

/// チャンクファイルの番号（`u64` に収まらない番号は `None`）
pub fn chunk_index(path: &Path) -> Option<u64> {
    let name = path.file_name().and_then(OsStr::to_str)?;
    let (_, digits) = split_chunk_name(name)?;
    digits.parse().ok()
}

/// 先頭のチャンクファイルから復元ファイルのパスを決定
///
/// 末尾の `.64.<番号>` を取り除き `.r64` を付ける。
pub fn recovered_path(first_chunk: &Path) -> Option<PathBuf> {
    let name = first_chunk.file_name().and_then(OsStr::to_str)?;
    let (stem, _) = split_chunk_name(name)?;
    Some(first_chunk.with_file_name(format!("{stem}.{RECOVERED_EXTENSION}")))
}

/// 存在するチャンクファイルだけを残し、番号順に並べる
///
/// 文字列順ではなく数値順に並べるため、1000個以上のチャンク（`.64.1000`）でも順序が崩れない。
pub fn sort_chunks<P: AsRef<Path>>(paths: &[P]) -> Vec<PathBuf> {
    let mut chunks: Vec<(PathBuf, String, String)> = paths
        .iter()
        .map(|path| AsRef::<Path>::as_ref(path))
        .filter(|path| path.is_file())
        .filter_map(|path| {
            let name = path.file_name().and_then(OsStr::to_str)?;
            let (stem, digits) = split_chunk_name(name)?;
            let prefix = path.with_file_name(stem).to_string_lossy().into_owned();
            Some((path.to_path_buf(), prefix, digits.to_string()))
        })
        .collect();

    chunks.sort_by(|a, b| {
        a.1.cmp(&b.1)
            .then_with(|| index_key(&a.2).cmp(&index_key(&b.2)))
    });
    chunks.dedup_by(|a, b| a.0 == b.0);
    chunks.into_iter().map(|(path, _, _)| path).collect()
}
