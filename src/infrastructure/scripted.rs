//! 脚本化的内存后端 - 基础设施层
//!
//! 按预设脚本应答，记录所有调用。用于离线演练和测试。

use futures::stream;
use futures::StreamExt;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use super::api::{ChunkStream, QuizApi};
use crate::error::{ApiError, ApiResult};
use crate::models::{ResultsReport, SummaryRequest, TestDefinition};

/// 流式摘要接口的预设应答
#[derive(Debug, Clone)]
pub enum StreamReply {
    /// 连接失败
    Unreachable,
    /// 非 2xx 状态
    Status(u16),
    /// 依次返回这些字节块后正常结束
    Chunks(Vec<Vec<u8>>),
    /// 返回这些字节块后读取出错
    BrokenAfter(Vec<Vec<u8>>),
}

/// 非流式接口（摘要 / 追加解析）的预设应答
#[derive(Debug, Clone)]
pub enum TextReply {
    Ok(String),
    Rejected(u16, Option<String>),
    Unreachable,
}

#[derive(Debug, Default)]
struct Script {
    tests: HashMap<u64, TestDefinition>,
    stream: Option<StreamReply>,
    summary: Option<TextReply>,
    append: Option<TextReply>,
    results: HashMap<String, ResultsReport>,
    result_token: String,
    calls: Vec<String>,
    summary_requests: Vec<SummaryRequest>,
    appended: Vec<(u64, usize, String)>,
    submitted: Vec<(u64, Vec<(String, String)>)>,
}

/// 脚本化后端
#[derive(Debug, Default)]
pub struct ScriptedQuizApi {
    script: Mutex<Script>,
}

impl ScriptedQuizApi {
    pub fn new() -> Self {
        Self::default()
    }

    fn script(&self) -> MutexGuard<'_, Script> {
        // 锁中毒只可能来自测试线程 panic，数据仍然可用
        self.script.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn with_test(self, test: TestDefinition) -> Self {
        self.script().tests.insert(test.id, test);
        self
    }

    pub fn with_stream(self, reply: StreamReply) -> Self {
        self.script().stream = Some(reply);
        self
    }

    pub fn with_summary(self, reply: TextReply) -> Self {
        self.script().summary = Some(reply);
        self
    }

    pub fn with_append(self, reply: TextReply) -> Self {
        self.script().append = Some(reply);
        self
    }

    pub fn with_results(self, token: impl Into<String>, report: ResultsReport) -> Self {
        let token = token.into();
        {
            let mut script = self.script();
            script.result_token = token.clone();
            script.results.insert(token, report);
        }
        self
    }

    pub fn set_summary(&self, reply: TextReply) {
        self.script().summary = Some(reply);
    }

    pub fn set_append(&self, reply: TextReply) {
        self.script().append = Some(reply);
    }

    /// 已发生的调用，形如 `"POST /api/ai-summary"`
    pub fn calls(&self) -> Vec<String> {
        self.script().calls.clone()
    }

    pub fn summary_requests(&self) -> Vec<SummaryRequest> {
        self.script().summary_requests.clone()
    }

    pub fn appended(&self) -> Vec<(u64, usize, String)> {
        self.script().appended.clone()
    }

    pub fn submitted(&self) -> Vec<(u64, Vec<(String, String)>)> {
        self.script().submitted.clone()
    }

    fn record(&self, call: String) {
        self.script().calls.push(call);
    }
}

fn text_reply(endpoint: &str, reply: Option<TextReply>) -> ApiResult<String> {
    match reply {
        Some(TextReply::Ok(text)) => Ok(text),
        Some(TextReply::Rejected(status, message)) => {
            Err(ApiError::rejected(endpoint, status, message))
        }
        Some(TextReply::Unreachable) | None => Err(ApiError::transport(endpoint, "unreachable")),
    }
}

impl QuizApi for ScriptedQuizApi {
    async fn fetch_test(&self, test_id: u64) -> ApiResult<TestDefinition> {
        self.record(format!("GET /api/tests/{}", test_id));
        self.script()
            .tests
            .get(&test_id)
            .cloned()
            .ok_or_else(|| ApiError::NotFound {
                resource: "Test".to_string(),
            })
    }

    async fn open_summary_stream(&self, request: &SummaryRequest) -> ApiResult<ChunkStream> {
        let endpoint = "/api/ai-summary-stream";
        self.record(format!("POST {}", endpoint));
        let reply = {
            let mut script = self.script();
            script.summary_requests.push(request.clone());
            script.stream.clone()
        };

        match reply {
            Some(StreamReply::Chunks(chunks)) => {
                Ok(stream::iter(chunks.into_iter().map(Ok::<Vec<u8>, ApiError>)).boxed())
            }
            Some(StreamReply::BrokenAfter(chunks)) => {
                let tail = stream::once(async move { Err(ApiError::transport(endpoint, "reset")) });
                Ok(stream::iter(chunks.into_iter().map(Ok::<Vec<u8>, ApiError>))
                    .chain(tail)
                    .boxed())
            }
            Some(StreamReply::Status(status)) => Err(ApiError::rejected(endpoint, status, None)),
            Some(StreamReply::Unreachable) | None => {
                Err(ApiError::transport(endpoint, "unreachable"))
            }
        }
    }

    async fn fetch_summary(&self, request: &SummaryRequest) -> ApiResult<String> {
        let endpoint = "/api/ai-summary";
        self.record(format!("POST {}", endpoint));
        let reply = {
            let mut script = self.script();
            script.summary_requests.push(request.clone());
            script.summary.clone()
        };
        text_reply(endpoint, reply)
    }

    async fn append_explanation(
        &self,
        test_id: u64,
        original_index: usize,
        summary: &str,
    ) -> ApiResult<String> {
        let endpoint = format!(
            "/api/tests/{}/questions/{}/append-explanation",
            test_id, original_index
        );
        self.record(format!("POST {}", endpoint));
        let reply = self.script().append.clone();
        let result = text_reply(&endpoint, reply);
        if result.is_ok() {
            self.script()
                .appended
                .push((test_id, original_index, summary.to_string()));
        }
        result
    }

    async fn submit_answers(&self, test_id: u64, fields: &[(String, String)]) -> ApiResult<String> {
        let endpoint = format!("/take/{}", test_id);
        self.record(format!("POST {}", endpoint));
        let mut script = self.script();
        if !script.tests.contains_key(&test_id) {
            return Err(ApiError::NotFound {
                resource: "Test".to_string(),
            });
        }
        script.submitted.push((test_id, fields.to_vec()));
        if script.result_token.is_empty() {
            return Err(ApiError::empty(endpoint));
        }
        Ok(script.result_token.clone())
    }

    async fn fetch_results(&self, token: &str) -> ApiResult<ResultsReport> {
        self.record(format!("GET /api/results/{}", token));
        self.script()
            .results
            .get(token)
            .cloned()
            .ok_or_else(|| ApiError::NotFound {
                resource: "Results".to_string(),
            })
    }
}
