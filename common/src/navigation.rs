//! セクション切り替え
//!
//! 常にちょうど1つのセクションがアクティブ。URLフラグメント (`#section-id`) と
//! 双方向に同期し、切り替え時の副作用（Webカメラ停止、履歴再読込など）を
//! [`Transition`] として呼び出し側に返す。

use std::fmt;

/// UIセクション
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Section {
    MainPrediction,
    LivePrediction,
    PredictionHistory,
    About,
}

impl Section {
    pub const DEFAULT: Section = Section::MainPrediction;

    pub const ALL: [Section; 4] = [
        Section::MainPrediction,
        Section::LivePrediction,
        Section::PredictionHistory,
        Section::About,
    ];

    /// DOM id / URLフラグメント
    pub fn id(&self) -> &'static str {
        match self {
            Section::MainPrediction => "main-prediction-section",
            Section::LivePrediction => "live-prediction-section",
            Section::PredictionHistory => "prediction-history-section",
            Section::About => "about-section",
        }
    }

    /// ナビゲーションの表示名
    pub fn label(&self) -> &'static str {
        match self {
            Section::MainPrediction => "Upload",
            Section::LivePrediction => "Live",
            Section::PredictionHistory => "History",
            Section::About => "About",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.id() == id)
    }

    pub fn fragment(&self) -> String {
        format!("#{}", self.id())
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// 切り替えに伴う副作用
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SideEffect {
    /// ライブセクションを離れる: カメラを停止
    StopLiveSession,
    /// 履歴セクションに入る: 履歴を読み直して再描画
    ReloadHistory,
    /// ライブセクションに入る: 状態表示とボタンを初期化
    ResetLiveStatus,
}

/// URLへの反映方法
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UrlUpdate {
    /// 変更なし（URLがすでに正しい）
    Keep,
    /// 新しい履歴エントリを積む
    Push(String),
    /// 現在の履歴エントリを書き換える
    Replace(String),
}

/// 1回の切り替え結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub from: Option<Section>,
    pub to: Section,
    /// 不明なidのためデフォルトにフォールバックした
    pub fell_back: bool,
    pub effects: Vec<SideEffect>,
    pub url: UrlUpdate,
}

impl Transition {
    pub fn has_effect(&self, effect: SideEffect) -> bool {
        self.effects.contains(&effect)
    }
}

/// ナビゲーションコントローラ
#[derive(Debug, Clone, Default)]
pub struct NavigationController {
    active: Option<Section>,
}

impl NavigationController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active(&self) -> Section {
        self.active.unwrap_or(Section::DEFAULT)
    }

    /// ページ読み込み時: URLフラグメントから初期セクションを決める
    pub fn initial(&mut self, fragment: &str) -> Transition {
        let mut transition = self.activate(strip_hash(fragment));
        if transition.fell_back {
            transition.url = UrlUpdate::Replace(transition.to.fragment());
        }
        transition
    }

    /// ナビゲーションのクリック
    pub fn navigate(&mut self, id: &str) -> Transition {
        let mut transition = self.activate(id);
        transition.url = if transition.fell_back {
            UrlUpdate::Replace(transition.to.fragment())
        } else {
            UrlUpdate::Push(transition.to.fragment())
        };
        transition
    }

    /// 戻る/進む（hashchange）
    pub fn on_hash_change(&mut self, fragment: &str) -> Transition {
        let mut transition = self.activate(strip_hash(fragment));
        if transition.fell_back {
            transition.url = UrlUpdate::Replace(transition.to.fragment());
        }
        transition
    }

    /// 全セクションを非アクティブにし、対象をアクティブにする
    ///
    /// URLは変更しない（`url` は常に `Keep`）。
    pub fn activate(&mut self, id: &str) -> Transition {
        let (to, fell_back) = match Section::from_id(id) {
            Some(section) => (section, false),
            None => {
                if !id.is_empty() {
                    log::warn!("Section with ID '{}' not found.", id);
                }
                (Section::DEFAULT, true)
            }
        };

        let from = self.active.replace(to);
        let mut effects = Vec::new();

        // 全セクションの非アクティブ化でライブセクションも必ず停止する
        if from == Some(Section::LivePrediction) {
            effects.push(SideEffect::StopLiveSession);
        }
        match to {
            Section::PredictionHistory => effects.push(SideEffect::ReloadHistory),
            Section::LivePrediction => effects.push(SideEffect::ResetLiveStatus),
            _ => {}
        }

        log::debug!("Activated section {} (from {:?})", to, from);

        Transition {
            from,
            to,
            fell_back,
            effects,
            url: UrlUpdate::Keep,
        }
    }
}

fn strip_hash(fragment: &str) -> &str {
    fragment.strip_prefix('#').unwrap_or(fragment)
}
