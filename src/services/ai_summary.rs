//! AI 摘要服务 - 业务能力层
//!
//! 只负责"获取一道题的 AI 摘要 / 把摘要追加到解析"能力，不关心当前显示的是哪道题。
//!
//! ## 状态机
//!
//! ```text
//! Idle → RequestingStream → Streaming → Complete
//!             │                 │
//!             └──────┬──────────┘  (连接失败 / 非 2xx / 读取出错 / 空结果)
//!                    ↓
//!           RequestingFallback → Complete | Failed
//! ```
//!
//! 流式失败不会直接展示给用户，而是转入非流式兜底请求。

use futures::StreamExt;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::{ApiError, ApiResult};
use crate::infrastructure::QuizApi;
use crate::models::SummaryRequest;

/// 展示文本前缀
pub const SUMMARY_PREFIX: &str = "AI Summary: ";

const STREAM_ENDPOINT: &str = "/api/ai-summary-stream";
const MSG_NO_SUMMARY: &str = "No summary returned.";
const MSG_FALLBACK_FAILED: &str = "Unable to generate summary.";
const MSG_GENERIC_FAILED: &str = "Unable to generate AI summary.";
const MSG_APPEND_FAILED: &str = "Failed to append explanation.";

/// 一次请求周期内的阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SummaryPhase {
    #[default]
    Idle,
    RequestingStream,
    Streaming,
    RequestingFallback,
    Complete,
    Failed,
}

/// 推送给调用方的进度
#[derive(Debug, Clone, PartialEq)]
pub enum SummaryUpdate {
    /// 进入新阶段
    Phase(SummaryPhase),
    /// 流式过程中的最新展示文本（前缀 + 已累积内容）
    Partial { display: String },
    /// 成功，`summary` 已去除首尾空白
    Complete { summary: String, display: String },
    /// 失败，`message` 为面向用户的最具体消息
    Failed { message: String },
}

/// 追加解析的结果
#[derive(Debug, Clone, PartialEq)]
pub enum AppendOutcome {
    /// 服务端返回的完整解析
    Appended { explanation: String },
    Failed { message: String },
}

/// 增量 UTF-8 解码器
///
/// 跨块切开的多字节字符会保留到下一块再输出；非法字节替换为 U+FFFD
#[derive(Debug, Default)]
pub struct Utf8ChunkDecoder {
    pending: Vec<u8>,
}

impl Utf8ChunkDecoder {
    pub fn push(&mut self, bytes: &[u8]) -> String {
        self.pending.extend_from_slice(bytes);
        let mut out = String::new();

        loop {
            match std::str::from_utf8(&self.pending) {
                Ok(text) => {
                    out.push_str(text);
                    self.pending.clear();
                    break;
                }
                Err(err) => {
                    let valid = err.valid_up_to();
                    if let Ok(text) = std::str::from_utf8(&self.pending[..valid]) {
                        out.push_str(text);
                    }
                    match err.error_len() {
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            self.pending.drain(..valid + len);
                        }
                        None => {
                            // 末尾是不完整的字符，等下一块
                            self.pending.drain(..valid);
                            break;
                        }
                    }
                }
            }
        }

        out
    }

    /// 流结束时输出剩余字节
    pub fn finish(&mut self) -> String {
        let rest = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        rest
    }
}

/// AI 摘要客户端
///
/// 职责：
/// - 先走流式接口，失败后走一次非流式兜底
/// - 按到达顺序逐块推送展示文本
/// - 不持有会话状态，不判断结果是否过期（由会话层负责）
pub struct AiSummaryClient<A> {
    api: Arc<A>,
}

impl<A> Clone for AiSummaryClient<A> {
    fn clone(&self) -> Self {
        Self {
            api: Arc::clone(&self.api),
        }
    }
}

impl<A: QuizApi> AiSummaryClient<A> {
    pub fn new(api: Arc<A>) -> Self {
        Self { api }
    }

    /// 生成摘要
    ///
    /// 所有进度（包括最终结果）都通过 `on_update` 推送，最终结果同时作为返回值。
    pub async fn generate<F>(&self, request: &SummaryRequest, mut on_update: F) -> SummaryUpdate
    where
        F: FnMut(SummaryUpdate) + Send,
    {
        on_update(SummaryUpdate::Phase(SummaryPhase::RequestingStream));

        let stream_error = match self.stream_summary(request, &mut on_update).await {
            Ok(summary) => {
                info!("✓ 流式摘要完成 ({} 字符)", summary.chars().count());
                return finish(complete(summary), &mut on_update);
            }
            Err(err) => {
                debug!("流式摘要不可用，改用兜底接口: {}", err);
                err
            }
        };

        on_update(SummaryUpdate::Phase(SummaryPhase::RequestingFallback));

        let outcome = match self.api.fetch_summary(request).await {
            Ok(text) => {
                let summary = text.trim();
                if summary.is_empty() {
                    warn!("⚠️ 兜底接口返回空摘要");
                    failed(MSG_NO_SUMMARY.to_string())
                } else {
                    info!("✓ 兜底摘要完成 ({} 字符)", summary.chars().count());
                    complete(summary.to_string())
                }
            }
            Err(err) => {
                warn!("⚠️ 兜底摘要失败: {}", err);
                let message = fallback_message(&err)
                    .or_else(|| stream_message(&stream_error))
                    .unwrap_or_else(|| MSG_GENERIC_FAILED.to_string());
                failed(message)
            }
        };

        finish(outcome, &mut on_update)
    }

    /// 流式读取；任何失败（包括空结果）都以 `Err` 返回
    async fn stream_summary<F>(
        &self,
        request: &SummaryRequest,
        on_update: &mut F,
    ) -> ApiResult<String>
    where
        F: FnMut(SummaryUpdate) + Send,
    {
        let mut stream = self.api.open_summary_stream(request).await?;

        on_update(SummaryUpdate::Phase(SummaryPhase::Streaming));
        on_update(SummaryUpdate::Partial {
            display: SUMMARY_PREFIX.to_string(),
        });

        let mut decoder = Utf8ChunkDecoder::default();
        let mut summary = String::new();

        while let Some(chunk) = stream.next().await {
            let text = decoder.push(&chunk?);
            if text.is_empty() {
                continue;
            }
            summary.push_str(&text);
            on_update(SummaryUpdate::Partial {
                display: format!("{}{}", SUMMARY_PREFIX, summary),
            });
        }

        let rest = decoder.finish();
        if !rest.is_empty() {
            summary.push_str(&rest);
            on_update(SummaryUpdate::Partial {
                display: format!("{}{}", SUMMARY_PREFIX, summary),
            });
        }

        let summary = summary.trim();
        if summary.is_empty() {
            return Err(ApiError::empty(STREAM_ENDPOINT));
        }
        Ok(summary.to_string())
    }

    /// 把摘要追加到题目解析
    pub async fn append(
        &self,
        test_id: u64,
        original_index: usize,
        summary: &str,
    ) -> AppendOutcome {
        match self
            .api
            .append_explanation(test_id, original_index, summary)
            .await
        {
            Ok(explanation) => {
                info!("✓ 摘要已追加到原始题目 {} 的解析", original_index);
                AppendOutcome::Appended { explanation }
            }
            Err(err) => {
                warn!("⚠️ 追加解析失败: {}", err);
                AppendOutcome::Failed {
                    message: err
                        .server_message()
                        .unwrap_or(MSG_APPEND_FAILED)
                        .to_string(),
                }
            }
        }
    }
}

fn complete(summary: String) -> SummaryUpdate {
    SummaryUpdate::Complete {
        display: format!("{}{}", SUMMARY_PREFIX, summary),
        summary,
    }
}

fn failed(message: String) -> SummaryUpdate {
    SummaryUpdate::Failed { message }
}

/// 推送终态阶段和结果
fn finish<F: FnMut(SummaryUpdate)>(outcome: SummaryUpdate, on_update: &mut F) -> SummaryUpdate {
    let phase = match outcome {
        SummaryUpdate::Complete { .. } => SummaryPhase::Complete,
        _ => SummaryPhase::Failed,
    };
    on_update(SummaryUpdate::Phase(phase));
    on_update(outcome.clone());
    outcome
}

/// 兜底请求失败时的消息：服务端拒绝时总有消息，传输失败时没有
fn fallback_message(err: &ApiError) -> Option<String> {
    match err {
        ApiError::ServerRejected { message, .. } => Some(
            message
                .clone()
                .unwrap_or_else(|| MSG_FALLBACK_FAILED.to_string()),
        ),
        ApiError::EmptyResult { .. } => Some(MSG_NO_SUMMARY.to_string()),
        _ => None,
    }
}

fn stream_message(err: &ApiError) -> Option<String> {
    match err {
        ApiError::ServerRejected {
            message: Some(message),
            ..
        } => Some(message.clone()),
        ApiError::EmptyResult { .. } => Some(MSG_NO_SUMMARY.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::{ScriptedQuizApi, StreamReply, TextReply};

    fn request() -> SummaryRequest {
        SummaryRequest {
            question: "Which letter?".to_string(),
            options: vec!["A".into(), "B".into()],
            correct_index: 1,
            selected_index: None,
            explanation: String::new(),
        }
    }

    fn run(api: ScriptedQuizApi) -> (SummaryUpdate, Vec<SummaryUpdate>, Arc<ScriptedQuizApi>) {
        let api = Arc::new(api);
        let client = AiSummaryClient::new(Arc::clone(&api));
        let mut updates = Vec::new();
        let outcome = tokio_test::block_on(client.generate(&request(), |u| updates.push(u)));
        (outcome, updates, api)
    }

    fn partials(updates: &[SummaryUpdate]) -> Vec<String> {
        updates
            .iter()
            .filter_map(|u| match u {
                SummaryUpdate::Partial { display } => Some(display.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_stream_chunks_applied_in_order() {
        let api = ScriptedQuizApi::new().with_stream(StreamReply::Chunks(vec![
            b"The ".to_vec(),
            b"answer ".to_vec(),
            b"is B.".to_vec(),
        ]));
        let (outcome, updates, api) = run(api);

        assert_eq!(
            partials(&updates),
            vec![
                "AI Summary: ",
                "AI Summary: The ",
                "AI Summary: The answer ",
                "AI Summary: The answer is B.",
            ]
        );
        assert_eq!(
            outcome,
            SummaryUpdate::Complete {
                summary: "The answer is B.".to_string(),
                display: "AI Summary: The answer is B.".to_string(),
            }
        );
        assert!(!api.calls().iter().any(|c| c == "POST /api/ai-summary"));
    }

    #[test]
    fn test_phases_for_streaming_success() {
        let api = ScriptedQuizApi::new().with_stream(StreamReply::Chunks(vec![b"ok".to_vec()]));
        let (_, updates, _) = run(api);
        let phases: Vec<SummaryPhase> = updates
            .iter()
            .filter_map(|u| match u {
                SummaryUpdate::Phase(p) => Some(*p),
                _ => None,
            })
            .collect();
        assert_eq!(
            phases,
            vec![
                SummaryPhase::RequestingStream,
                SummaryPhase::Streaming,
                SummaryPhase::Complete,
            ]
        );
    }

    #[test]
    fn test_stream_500_falls_back() {
        let api = ScriptedQuizApi::new()
            .with_stream(StreamReply::Status(500))
            .with_summary(TextReply::Ok("X".to_string()));
        let (outcome, updates, _) = run(api);

        assert!(updates.contains(&SummaryUpdate::Phase(SummaryPhase::RequestingFallback)));
        assert_eq!(
            outcome,
            SummaryUpdate::Complete {
                summary: "X".to_string(),
                display: "AI Summary: X".to_string(),
            }
        );
    }

    #[test]
    fn test_empty_stream_and_fallback_error_shows_server_message() {
        let api = ScriptedQuizApi::new()
            .with_stream(StreamReply::Chunks(vec![]))
            .with_summary(TextReply::Rejected(503, Some("down".to_string())));
        let (outcome, updates, _) = run(api);

        assert_eq!(
            outcome,
            SummaryUpdate::Failed {
                message: "down".to_string()
            }
        );
        assert_eq!(updates.last(), Some(&outcome));
    }

    #[test]
    fn test_whitespace_stream_is_failure() {
        let api = ScriptedQuizApi::new()
            .with_stream(StreamReply::Chunks(vec![b"  \n ".to_vec()]))
            .with_summary(TextReply::Ok("   ".to_string()));
        let (outcome, _, _) = run(api);
        assert_eq!(
            outcome,
            SummaryUpdate::Failed {
                message: "No summary returned.".to_string()
            }
        );
    }

    #[test]
    fn test_broken_stream_falls_back() {
        let api = ScriptedQuizApi::new()
            .with_stream(StreamReply::BrokenAfter(vec![b"partial".to_vec()]))
            .with_summary(TextReply::Ok(" full summary ".to_string()));
        let (outcome, _, api) = run(api);
        assert_eq!(
            outcome,
            SummaryUpdate::Complete {
                summary: "full summary".to_string(),
                display: "AI Summary: full summary".to_string(),
            }
        );
        assert_eq!(api.summary_requests().len(), 2);
    }

    #[test]
    fn test_fallback_rejected_without_message_uses_generic() {
        let api = ScriptedQuizApi::new()
            .with_stream(StreamReply::Unreachable)
            .with_summary(TextReply::Rejected(500, None));
        let (outcome, _, _) = run(api);
        assert_eq!(
            outcome,
            SummaryUpdate::Failed {
                message: "Unable to generate summary.".to_string()
            }
        );
    }

    #[test]
    fn test_both_unreachable_uses_most_generic_message() {
        let api = ScriptedQuizApi::new()
            .with_stream(StreamReply::Unreachable)
            .with_summary(TextReply::Unreachable);
        let (outcome, _, _) = run(api);
        assert_eq!(
            outcome,
            SummaryUpdate::Failed {
                message: "Unable to generate AI summary.".to_string()
            }
        );
    }

    #[test]
    fn test_decoder_joins_split_multibyte() {
        let bytes = "é答".as_bytes();
        let mut decoder = Utf8ChunkDecoder::default();
        assert_eq!(decoder.push(&bytes[..1]), "");
        assert_eq!(decoder.push(&bytes[1..3]), "é");
        assert_eq!(decoder.push(&bytes[3..]), "答");
        assert_eq!(decoder.finish(), "");
    }

    #[test]
    fn test_decoder_replaces_invalid_bytes() {
        let mut decoder = Utf8ChunkDecoder::default();
        assert_eq!(decoder.push(&[b'a', 0xFF, b'b']), "a\u{FFFD}b");
        assert_eq!(decoder.push(&[0xE7]), "");
        assert_eq!(decoder.finish(), "\u{FFFD}");
    }

    #[test]
    fn test_append_outcomes() {
        let api = Arc::new(
            ScriptedQuizApi::new().with_append(TextReply::Ok("old\n\nAI: new".to_string())),
        );
        let client = AiSummaryClient::new(Arc::clone(&api));
        let outcome = tokio_test::block_on(client.append(7, 2, "new"));
        assert_eq!(
            outcome,
            AppendOutcome::Appended {
                explanation: "old\n\nAI: new".to_string()
            }
        );
        assert_eq!(api.appended(), vec![(7, 2, "new".to_string())]);

        api.set_append(TextReply::Rejected(400, None));
        let outcome = tokio_test::block_on(client.append(7, 2, "new"));
        assert_eq!(
            outcome,
            AppendOutcome::Failed {
                message: "Failed to append explanation.".to_string()
            }
        );
    }
}
