use file2base64::{
    chunk::chunk_index, decode_by_file_name, merge_chunks, split_file, Config, Error, KdfConfig,
    MergeOptions, SplitOptions,
};
use std::error::Error as StdError;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

/// テスト用にキー導出を軽くした設定
fn fast_config() -> Config {
    Config {
        show_progress: false,
        kdf: KdfConfig {
            iterations: 1000,
            ..KdfConfig::default()
        },
        ..Config::default()
    }
}

/// 0..=250 を繰り返す非テキストのデータ
fn sample_bytes(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

fn split_bytes(chunk_bytes: Option<u64>, password: &str) -> SplitOptions {
    SplitOptions {
        chunk_bytes,
        password: password.to_string(),
        show_progress: false,
    }
}

fn file_names(paths: &[PathBuf]) -> Vec<String> {
    paths
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect()
}

#[test]
fn single_chunk_roundtrip_without_password() -> Result<(), Box<dyn StdError>> {
    let dir = tempdir()?;
    let source = dir.path().join("photo.jpg");
    let original = sample_bytes(10_000);
    fs::write(&source, &original)?;

    let config = fast_config();
    let chunks = split_file(&source, &SplitOptions::with_chunk_size_mb(-1, ""), &config)?;
    assert_eq!(file_names(&chunks), ["photo.jpg.64.001"]);

    let recovered = merge_chunks(&chunks, &MergeOptions::new(""), &config)?;
    assert_eq!(recovered, dir.path().join("photo.jpg.r64"));
    assert_eq!(fs::read(&recovered)?, original);
    Ok(())
}

#[test]
fn chunk_count_is_ceiling_of_size_over_chunk_size() -> Result<(), Box<dyn StdError>> {
    let dir = tempdir()?;
    let source = dir.path().join("archive.tar");
    let original = sample_bytes(2_500);
    fs::write(&source, &original)?;

    let config = fast_config();
    let chunks = split_file(&source, &split_bytes(Some(1_000), ""), &config)?;
    assert_eq!(
        file_names(&chunks),
        ["archive.tar.64.001", "archive.tar.64.002", "archive.tar.64.003"]
    );

    let recovered = merge_chunks(&chunks, &MergeOptions::new(""), &config)?;
    assert_eq!(fs::read(recovered)?, original);
    Ok(())
}

#[test]
fn megabyte_chunks_cut_at_exact_byte_counts() -> Result<(), Box<dyn StdError>> {
    let dir = tempdir()?;
    let source = dir.path().join("big.bin");
    let original = sample_bytes(2 * 1024 * 1024 + 512 * 1024);
    fs::write(&source, &original)?;

    let config = fast_config();
    let chunks = split_file(&source, &SplitOptions::with_chunk_size_mb(1, ""), &config)?;
    assert_eq!(chunks.len(), 3);

    // 各チャンクは元ファイルの連続した区間を単独でデコードできる
    let text = fs::read_to_string(&chunks[1])?;
    let body = text.strip_prefix("b'").unwrap().strip_suffix('\'').unwrap();
    let decoded = file2base64::base64_decode(body.as_bytes())?;
    assert_eq!(decoded, &original[1024 * 1024..2 * 1024 * 1024]);

    let recovered = merge_chunks(&chunks, &MergeOptions::new(""), &config)?;
    assert_eq!(fs::read(recovered)?, original);
    Ok(())
}

#[test]
fn password_roundtrip() -> Result<(), Box<dyn StdError>> {
    let dir = tempdir()?;
    let source = dir.path().join("notes.txt");
    let original = b"top secret notes\n".repeat(200);
    fs::write(&source, &original)?;

    let config = fast_config();
    let chunks = split_file(&source, &split_bytes(Some(1_024), "correct horse"), &config)?;
    assert_eq!(chunks.len(), 4);

    // 暗号化されたチャンクの中身はFernetトークン
    let text = fs::read_to_string(&chunks[0])?;
    assert!(text.starts_with("b'gAAAAA"), "unexpected chunk text: {text}");

    let recovered = merge_chunks(&chunks, &MergeOptions::new("correct horse"), &config)?;
    assert_eq!(fs::read(recovered)?, original);
    Ok(())
}

#[test]
fn wrong_password_fails_without_leaving_output() -> Result<(), Box<dyn StdError>> {
    let dir = tempdir()?;
    let source = dir.path().join("notes.txt");
    fs::write(&source, b"top secret")?;

    let config = fast_config();
    let chunks = split_file(&source, &split_bytes(None, "right"), &config)?;

    let err = merge_chunks(&chunks, &MergeOptions::new("wrong"), &config).unwrap_err();
    assert!(matches!(err, Error::DecryptionFailed), "got {err:?}");

    assert!(!dir.path().join("notes.txt.r64").exists());
    assert!(!dir.path().join("notes.txt.r64.part").exists());
    Ok(())
}

#[test]
fn missing_password_on_encrypted_chunks_does_not_recover_original() -> Result<(), Box<dyn StdError>>
{
    let dir = tempdir()?;
    let source = dir.path().join("notes.txt");
    let original = b"top secret".to_vec();
    fs::write(&source, &original)?;

    let config = fast_config();
    let chunks = split_file(&source, &split_bytes(None, "right"), &config)?;

    // トークンもBase64アルファベットなので形式上はデコードできるが、元のデータにはならない
    match merge_chunks(&chunks, &MergeOptions::new(""), &config) {
        Ok(recovered) => assert_ne!(fs::read(recovered)?, original),
        Err(err) => assert!(matches!(err, Error::InvalidBase64(_)), "got {err:?}"),
    }
    Ok(())
}

#[test]
fn more_than_999_chunks_keep_numeric_order() -> Result<(), Box<dyn StdError>> {
    let dir = tempdir()?;
    let source = dir.path().join("many.bin");
    let original = sample_bytes(1_234);
    fs::write(&source, &original)?;

    let config = fast_config();
    let chunks = split_file(&source, &split_bytes(Some(1), ""), &config)?;
    assert_eq!(chunks.len(), 1_234);
    assert!(chunks[999].ends_with("many.bin.64.1000"));

    // 文字列順に並べた入力を渡しても番号順に連結される
    let mut shuffled = chunks.clone();
    shuffled.sort();
    shuffled.reverse();

    let recovered = merge_chunks(&shuffled, &MergeOptions::new(""), &config)?;
    assert_eq!(fs::read(recovered)?, original);
    Ok(())
}

#[test]
fn empty_password_means_plain_base64() -> Result<(), Box<dyn StdError>> {
    let dir = tempdir()?;
    let source = dir.path().join("hello.txt");
    fs::write(&source, b"hello world")?;

    // 繰り返し回数0はキー導出を行うとエラーになる
    let config = Config {
        kdf: KdfConfig {
            iterations: 0,
            ..KdfConfig::default()
        },
        ..fast_config()
    };

    let chunks = split_file(&source, &split_bytes(None, ""), &config)?;
    assert_eq!(fs::read_to_string(&chunks[0])?, "b'aGVsbG8gd29ybGQ='");

    let recovered = merge_chunks(&chunks, &MergeOptions::default(), &config)?;
    assert_eq!(fs::read(recovered)?, b"hello world");
    Ok(())
}

#[test]
fn decrypts_chunk_produced_by_another_fernet_implementation() -> Result<(), Box<dyn StdError>> {
    let dir = tempdir()?;
    let chunk = dir.path().join("greeting.txt.64.001");
    fs::write(
        &chunk,
        "b'gAAAAABlU_EAAAECAwQFBgcICQoLDA0ODwY_y1k80_D4kptRDfFI9-ZkAEyuGk-GW7-BGcmc9Fr6DChuOe0777nN_E28zQ4g2FPg08FMQ3Wlbvdb3A02MDI='",
    )?;

    let config = Config {
        show_progress: false,
        ..Config::default()
    };
    let recovered = merge_chunks(&[&chunk], &MergeOptions::new("secret"), &config)?;
    assert_eq!(fs::read(recovered)?, b"hello world");
    Ok(())
}

#[test]
fn missing_source_is_reported() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("nope.bin");
    let err = split_file(&missing, &split_bytes(None, ""), &fast_config()).unwrap_err();
    assert!(matches!(err, Error::SourceNotFound(path) if path == missing));
}

#[test]
fn empty_source_writes_no_chunks() -> Result<(), Box<dyn StdError>> {
    let dir = tempdir()?;
    let source = dir.path().join("empty.dat");
    fs::write(&source, b"")?;

    let chunks = split_file(&source, &split_bytes(Some(10), ""), &fast_config())?;
    assert!(chunks.is_empty());
    assert_eq!(fs::read_dir(dir.path())?.count(), 1);
    Ok(())
}

#[test]
fn merge_ignores_non_chunk_paths() -> Result<(), Box<dyn StdError>> {
    let dir = tempdir()?;
    let source = dir.path().join("doc.pdf");
    fs::write(&source, b"%PDF-1.7")?;
    let config = fast_config();
    let mut paths = split_file(&source, &split_bytes(None, ""), &config)?;

    let decoy = dir.path().join("doc.pdf.64.001.bak");
    fs::write(&decoy, b"garbage")?;
    paths.push(decoy);
    paths.push(dir.path().join("doc.pdf.64.002"));
    paths.push(source.clone());

    let recovered = merge_chunks(&paths, &MergeOptions::new(""), &config)?;
    assert_eq!(fs::read(recovered)?, b"%PDF-1.7");
    Ok(())
}

#[test]
fn merge_without_valid_chunks_is_reported() {
    let dir = tempdir().unwrap();
    let other = dir.path().join("readme.md");
    fs::write(&other, b"# hi").unwrap();

    let err = merge_chunks(&[&other], &MergeOptions::new(""), &fast_config()).unwrap_err();
    assert!(matches!(err, Error::NoMatchingChunks { .. }), "got {err:?}");
}

#[test]
fn malformed_chunk_text_is_rejected() -> Result<(), Box<dyn StdError>> {
    let dir = tempdir()?;
    let chunk = dir.path().join("evil.py.64.001");
    fs::write(&chunk, "__import__('os').system('echo pwned')")?;

    let err = merge_chunks(&[&chunk], &MergeOptions::new(""), &fast_config()).unwrap_err();
    match err {
        Error::MalformedChunkText { path, .. } => assert_eq!(path, chunk),
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(!dir.path().join("evil.py.r64").exists());
    Ok(())
}

#[test]
fn partial_chunk_set_yields_truncated_file() -> Result<(), Box<dyn StdError>> {
    let dir = tempdir()?;
    let source = dir.path().join("data.bin");
    let original = sample_bytes(300);
    fs::write(&source, &original)?;

    let config = fast_config();
    let chunks = split_file(&source, &split_bytes(Some(100), ""), &config)?;
    let recovered = merge_chunks(&chunks[..2], &MergeOptions::new(""), &config)?;
    assert_eq!(fs::read(recovered)?, &original[..200]);
    Ok(())
}

#[test]
fn fuzzy_lookup_finds_chunks_by_partial_name() -> Result<(), Box<dyn StdError>> {
    let dir = tempdir()?;
    let source = dir.path().join("holiday-video.mp4");
    let original = sample_bytes(5_000);
    fs::write(&source, &original)?;

    let config = fast_config();
    let chunks = split_file(&source, &split_bytes(Some(2_000), "pw"), &config)?;
    assert!(chunks.iter().all(|c| chunk_index(c).is_some()));

    let pattern = dir.path().join("video");
    let recovered = decode_by_file_name(
        pattern.to_str().unwrap(),
        &MergeOptions::new("pw"),
        &config,
    )?;
    assert_eq!(recovered, dir.path().join("holiday-video.mp4.r64"));
    assert_eq!(fs::read(recovered)?, original);
    Ok(())
}

#[test]
fn fuzzy_lookup_with_trailing_separator_searches_that_directory() -> Result<(), Box<dyn StdError>> {
    let dir = tempdir()?;
    let chunks_dir = dir.path().join("chunks");
    fs::create_dir(&chunks_dir)?;
    let source = chunks_dir.join("a.bin");
    let original = sample_bytes(700);
    fs::write(&source, &original)?;

    let config = fast_config();
    split_file(&source, &split_bytes(Some(300), ""), &config)?;

    let pattern = format!("{}{}", chunks_dir.display(), std::path::MAIN_SEPARATOR);
    let recovered = decode_by_file_name(&pattern, &MergeOptions::new(""), &config)?;
    assert_eq!(recovered, chunks_dir.join("a.bin.r64"));
    assert_eq!(fs::read(recovered)?, original);
    Ok(())
}

#[test]
fn fuzzy_lookup_without_matches_is_reported() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("unrelated.txt"), b"x").unwrap();

    let pattern = dir.path().join("video");
    let err = decode_by_file_name(pattern.to_str().unwrap(), &MergeOptions::new(""), &fast_config())
        .unwrap_err();
    match err {
        Error::NoMatchingChunks { pattern: reported } => {
            assert_eq!(Path::new(&reported), pattern)
        }
        other => panic!("unexpected error: {other:?}"),
    }
}
