//! Face Emotion Client CLI
//!
//! 共通ライブラリ（emotion-common）の上に、reqwestによる送信と
//! ファイルベースの履歴保存を載せたネイティブ版。

pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod predict;
pub mod scanner;
pub mod store;
