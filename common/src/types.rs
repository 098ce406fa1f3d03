//! 解析APIの型定義
//!
//! - Question: `/api/questions` の設問
//! - AnalyzeRequest: `/api/analyze` へ送るJSON
//! - AnalysisResult: 解析結果（中身はサーバー任せのマップ）

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// 文字列だけの設問に付ける選択肢
pub const DEFAULT_CHOICES: [&str; 2] = ["yes", "no"];

/// 画像解析の失敗時、サーバーが理由を返さなかった場合の文言
pub const GENERIC_UPLOAD_FAILURE: &str = "Upload failed";

/// 設問
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    #[serde(default, deserialize_with = "id_from_number_or_string")]
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub choices: Vec<String>,
}

impl Question {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            choices: DEFAULT_CHOICES.iter().map(|c| c.to_string()).collect(),
        }
    }
}

fn id_from_number_or_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Num(i64),
        Text(String),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Num(n) => n.to_string(),
        RawId::Text(s) => s,
    })
}

/// 設問一覧の要素（サーバーは文字列だけを返すこともある）
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum QuestionEntry {
    Text(String),
    Record(Question),
}

/// `GET /api/questions` のレスポンス
#[derive(Debug, Default, Deserialize)]
pub struct QuestionsResponse {
    #[serde(default)]
    questions: Vec<QuestionEntry>,
}

impl QuestionsResponse {
    /// 設問レコードへ正規化する
    ///
    /// 文字列だけの設問は位置をIDにし、yes/noの選択肢を付ける。
    /// レコードでIDや選択肢が欠けている場合も同様に補う。
    pub fn into_questions(self) -> Vec<Question> {
        self.questions
            .into_iter()
            .enumerate()
            .map(|(i, entry)| match entry {
                QuestionEntry::Text(text) => Question::new(i.to_string(), text),
                QuestionEntry::Record(mut q) => {
                    if q.id.is_empty() {
                        q.id = i.to_string();
                    }
                    if q.choices.is_empty() {
                        q.choices = DEFAULT_CHOICES.iter().map(|c| c.to_string()).collect();
                    }
                    q
                }
            })
            .collect()
    }
}

/// 設問一覧JSONをパース
pub fn parse_questions(json: &str) -> crate::Result<Vec<Question>> {
    let response: QuestionsResponse = serde_json::from_str(json)?;
    Ok(response.into_questions())
}

/// `POST /api/analyze` のリクエスト
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzeRequest {
    pub answers: Vec<String>,
    pub name: String,
}

/// 解析結果
///
/// キーの意味はサーバー側が決める。表示でよく使う項目だけアクセサを用意する。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnalysisResult(pub Map<String, Value>);

impl AnalysisResult {
    pub fn from_json(json: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn level(&self) -> Option<&str> {
        self.0.get("level").and_then(Value::as_str)
    }

    pub fn description(&self) -> Option<&str> {
        self.0.get("description").and_then(Value::as_str)
    }

    pub fn score(&self) -> Option<i64> {
        self.0.get("score").and_then(Value::as_i64)
    }

    pub fn total(&self) -> Option<i64> {
        self.0.get("total").and_then(Value::as_i64)
    }

    /// 画像解析の計測値（brightness, redness など）
    pub fn metrics(&self) -> Vec<(String, f64)> {
        self.0
            .get("metrics")
            .and_then(Value::as_object)
            .map(|m| {
                m.iter()
                    .filter_map(|(k, v)| v.as_f64().map(|n| (k.clone(), n)))
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// 失敗レスポンスの本文
#[derive(Debug, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub error: Option<String>,
}

/// 失敗レスポンス本文から表示用の理由を取り出す
pub fn failure_message(body: &str) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.error)
        .filter(|e| !e.trim().is_empty())
        .unwrap_or_else(|| GENERIC_UPLOAD_FAILURE.to_string())
}
