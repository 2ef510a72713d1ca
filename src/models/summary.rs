use serde::{Deserialize, Serialize};

use super::question::PresentedQuestion;

/// AI 摘要请求体（流式与非流式接口共用）
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryRequest {
    pub question: String,
    pub options: Vec<String>,
    /// 呈现坐标下的正确下标，未知时为 -1
    pub correct_index: i64,
    pub selected_index: Option<usize>,
    pub explanation: String,
}

impl SummaryRequest {
    /// `selected_index` 为呈现坐标下的已选选项，未作答时为 `None`
    pub fn from_presented(question: &PresentedQuestion, selected_index: Option<usize>) -> Self {
        Self {
            question: question.question.clone(),
            options: question.options.clone(),
            correct_index: question.correct_index_wire(),
            selected_index,
            explanation: question.explanation.clone(),
        }
    }
}

/// `POST /api/ai-summary` 的响应，成功时有 `summary`，失败时有 `error`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SummaryResponse {
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// 追加解析请求体
#[derive(Debug, Clone, Serialize)]
pub struct AppendRequest {
    pub summary: String,
}

/// 追加解析的响应，`explanation` 为服务端合并后的完整解析
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppendResponse {
    #[serde(default)]
    pub explanation: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// 通用错误体 `{ "error": "..." }`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub error: Option<String>,
}
