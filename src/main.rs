use anyhow::{Context, Result};
use clap::Parser;
use file2base64::{
    config::{create_config_file, get_default_config_path, load_config},
    decode_by_file_name, split_file, Error, MergeOptions, SplitOptions,
};
use std::{
    path::{Path, PathBuf},
    process::ExitCode,
};
use tracing_subscriber::{prelude::*, EnvFilter};

/// --split と --merge が両方指定された
const EXIT_BOTH_MODES: u8 = 1;
/// --split も --merge も指定されていない
const EXIT_NO_MODE: u8 = 2;
/// パスワード違い・暗号文の破損
const EXIT_DECRYPTION_FAILED: u8 = 3;
/// その他のエラー（I/O、チャンク形式不正、設定不正など）
const EXIT_FAILURE: u8 = 4;

#[derive(Parser)]
#[command(name = "file2base64", version)]
#[command(about = "任意のファイルをBase64テキストのチャンクファイルに分割・復元するツール")]
struct Cli {
    /// ファイルをBase64チャンクファイルに分割
    #[arg(long)]
    split: bool,

    /// Base64チャンクファイルを元のファイルに復元
    #[arg(long)]
    merge: bool,

    /// 分割時はファイルパス、復元時はチャンクファイル名の一部
    #[arg(long, required_unless_present = "init_config")]
    file: Option<String>,

    /// チャンクの最大サイズ（MB）。0以下で分割しない。Base64化後のサイズは元より大きくなる
    #[arg(long, allow_negative_numbers = true)]
    chunksize: Option<i64>,

    /// 指定すると分割時に暗号化、復元時に復号化する
    #[arg(long, default_value = "")]
    password: String,

    /// 設定ファイルのパス
    #[arg(long)]
    config: Option<PathBuf>,

    /// 詳細出力
    #[arg(short, long)]
    verbose: bool,

    /// デフォルト設定で設定ファイルを作成して終了
    #[arg(long)]
    init_config: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("エラー: {e:#}");
            ExitCode::from(EXIT_FAILURE)
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    if cli.init_config {
        let path = match &cli.config {
            Some(path) => path.clone(),
            None => get_default_config_path()?,
        };
        create_config_file(&path)
            .with_context(|| format!("設定ファイルの作成に失敗: {}", path.display()))?;
        println!("設定ファイルを作成しました: {}", path.display());
        return Ok(ExitCode::SUCCESS);
    }

    // モード指定の検証はファイル操作より先に行う
    if cli.split && cli.merge {
        println!("--split と --merge はどちらか一方のみ指定してください");
        return Ok(ExitCode::from(EXIT_BOTH_MODES));
    }
    if !cli.split && !cli.merge {
        println!("--split または --merge のどちらかを指定してください");
        return Ok(ExitCode::from(EXIT_NO_MODE));
    }
    let Some(file) = cli.file else {
        println!("--file を指定してください");
        return Ok(ExitCode::from(EXIT_NO_MODE));
    };

    let config = load_config(cli.config.as_deref()).context("設定ファイルの読み込みに失敗")?;
    init_tracing(cli.verbose || config.default_verbose);

    let result = if cli.split {
        let chunk_size = cli.chunksize.unwrap_or(config.default_chunk_size);
        let mut options = SplitOptions::with_chunk_size_mb(chunk_size, cli.password);
        options.show_progress = config.show_progress;
        split_file(Path::new(&file), &options, &config).map(|_| ())
    } else {
        let mut options = MergeOptions::new(cli.password);
        options.show_progress = config.show_progress;
        decode_by_file_name(&file, &options, &config).map(|_| ())
    };

    match result {
        Ok(()) => Ok(ExitCode::SUCCESS),
        // 入力が見つからないだけなら正常終了扱い
        Err(e @ (Error::SourceNotFound(_) | Error::NoMatchingChunks { .. })) => {
            println!("{e}");
            Ok(ExitCode::SUCCESS)
        }
        Err(e @ Error::DecryptionFailed) => {
            println!("{e}");
            Ok(ExitCode::from(EXIT_DECRYPTION_FAILED))
        }
        Err(e) => Err(e.into()),
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .with(filter)
        .init();
}
