use std::time::Duration;

use clap::Parser;
use emotion_client::{cli, client, config, error, predict, scanner, store};
use emotion_common::{HistoryStore, KeyValueStore, MemoryStore, ResultView, UploadPredictor};
use cli::{Cli, Commands};
use client::HttpClient;
use config::Config;
use error::Result;
use store::{FileStore, TerminalPrompt};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = Config::load()?;

    match cli.command {
        Commands::Predict { inputs, recursive, no_history } => {
            println!("😀 emotion-cli - 表情推論\n");

            let paths = scanner::collect_images(&inputs, recursive)?;
            println!("✔ {}枚の画像を検出\n", paths.len());

            let http = match &cli.endpoint {
                Some(endpoint) => HttpClient::new(
                    endpoint.clone(),
                    Duration::from_secs(config.timeout_seconds),
                )?,
                None => HttpClient::from_config(&config)?,
            };
            log::info!("Using endpoint {}", http.endpoint());

            let result = if no_history {
                run_predict(http, HistoryStore::new(MemoryStore::new()), &paths).await
            } else {
                let history = HistoryStore::new(FileStore::new(config.history_dir()?));
                run_predict(http, history, &paths).await
            };

            match &result {
                Ok(()) => println!("\n✅ 推論完了"),
                Err(e) => println!("\n⚠ {}", e),
            }
            result?;
        }

        Commands::History { clear, yes, json } => {
            let history = HistoryStore::new(FileStore::new(config.history_dir()?));

            if clear {
                if history.clear(&TerminalPrompt { assume_yes: yes })? {
                    println!("✔ 履歴を削除しました");
                } else {
                    println!("キャンセルしました");
                }
                return Ok(());
            }

            let entries = history.read_all();
            if json {
                println!("{}", serde_json::to_string_pretty(&entries)?);
                return Ok(());
            }

            let view = history.view();
            if view.show_empty_message {
                println!("No predictions yet.");
            }
            for (i, card) in view.cards.iter().enumerate() {
                println!(
                    "{:>2}. {}  {}  {}",
                    i + 1,
                    card.timestamp_text,
                    card.predicted_class,
                    card.confidence_text
                );
                for (name, value) in &card.probabilities {
                    println!("      {}: {}", name, value);
                }
            }
        }

        Commands::Config { set_endpoint, set_timeout, show } => {
            if let Some(endpoint) = set_endpoint {
                config.set_endpoint(endpoint)?;
                println!("✔ エンドポイントを設定しました");
            }

            if let Some(seconds) = set_timeout {
                config.set_timeout(seconds)?;
                println!("✔ タイムアウトを設定しました");
            }

            if show {
                println!("設定:");
                println!("  エンドポイント: {}", config.resolve_endpoint());
                println!("  タイムアウト: {}秒", config.timeout_seconds);
                println!("  履歴: {}", config.history_dir()?.display());
                println!("  設定ファイル: {}", Config::config_path()?.display());
            }
        }
    }

    Ok(())
}

/// 推論して結果を表示し、失敗件数を返す
async fn run_predict<S: KeyValueStore>(
    http: HttpClient,
    history: HistoryStore<S>,
    paths: &[std::path::PathBuf],
) -> Result<()> {
    let predictor = UploadPredictor::new(http, history);
    let outcomes = predict::predict_paths(&predictor, paths, true).await;

    for outcome in &outcomes {
        println!("📷 {}", outcome.path.display());
        match &outcome.view {
            ResultView::Success(_) => print!("{}", outcome.view),
            other => println!("✖ {}", other),
        }
        println!();
    }

    predict::ensure_all_succeeded(&outcomes)
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .init();
}
