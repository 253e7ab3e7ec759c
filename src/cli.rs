use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "emotion-cli")]
#[command(about = "顔表情推論クライアント", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// 詳細ログを出力
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// 推論エンドポイント（設定・環境変数より優先）
    #[arg(long, global = true)]
    pub endpoint: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 画像を送信して表情を推論
    Predict {
        /// 画像ファイルまたはフォルダ
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// サブフォルダも再帰的にスキャン
        #[arg(short = 'r', long)]
        recursive: bool,

        /// 履歴に保存しない
        #[arg(long)]
        no_history: bool,
    },

    /// 推論履歴を表示/削除
    History {
        /// 履歴を削除
        #[arg(long)]
        clear: bool,

        /// 確認なしで削除
        #[arg(short, long)]
        yes: bool,

        /// JSONで出力
        #[arg(long)]
        json: bool,
    },

    /// 設定を表示/編集
    Config {
        /// エンドポイントを設定
        #[arg(long)]
        set_endpoint: Option<String>,

        /// タイムアウト（秒）を設定
        #[arg(long)]
        set_timeout: Option<u64>,

        /// 設定を表示
        #[arg(long)]
        show: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_predict() {
        let cli = Cli::try_parse_from(["emotion-cli", "predict", "a.jpg", "photos", "--no-history"]).unwrap();
        match cli.command {
            Commands::Predict { inputs, recursive, no_history } => {
                assert_eq!(inputs.len(), 2);
                assert!(!recursive);
                assert!(no_history);
            }
            _ => panic!("predict expected"),
        }
    }

    #[test]
    fn test_parse_history_clear() {
        let cli = Cli::try_parse_from(["emotion-cli", "history", "--clear", "-y", "-v"]).unwrap();
        assert!(cli.verbose);
        assert!(matches!(cli.command, Commands::History { clear: true, yes: true, json: false }));
    }

    #[test]
    fn test_predict_requires_input() {
        assert!(Cli::try_parse_from(["emotion-cli", "predict"]).is_err());
    }
}
