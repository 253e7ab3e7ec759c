//! /predict レスポンスパーサー
//!
//! ネイティブ(reqwest)とブラウザ(fetch)はどちらもステータスとボディ文字列を
//! 取り出してここに渡す。判定ロジックを一箇所にまとめるため。

use crate::error::{Error, Result};
use crate::types::PredictResponse;

/// ステータスとボディから PredictResponse を得る
///
/// # Arguments
/// * `status` - HTTPステータスコード
/// * `body` - レスポンスボディ（JSON想定）
///
/// # Returns
/// * `Ok(PredictResponse)` - 2xx かつ JSON としてデコードできた場合
///   （必須フィールドの検証は呼び出し側）
/// * `Err(Error::Http)` - 2xx 以外。ボディに `detail` があればそれをメッセージにする
/// * `Err(Error::Json)` - 2xx だがボディが JSON でない
pub fn parse_predict_response(status: u16, body: &str) -> Result<PredictResponse> {
    if !(200..300).contains(&status) {
        let detail = extract_detail(body);
        return Err(Error::http(status, detail));
    }

    let response: PredictResponse = serde_json::from_str(body.trim())?;
    Ok(response)
}

/// エラーボディの `detail` を取り出す
///
/// FastAPI のバリデーションエラーのように detail が文字列以外の場合は
/// JSON のまま文字列化する。
pub fn extract_detail(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body.trim()).ok()?;
    match value.get("detail")? {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) if s.is_empty() => None,
        serde_json::Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
