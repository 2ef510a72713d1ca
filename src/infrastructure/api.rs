//! 后端 API 传输层 - 基础设施层
//!
//! 持有唯一的 HTTP 客户端资源，只暴露"调用后端"的能力

use futures::stream::BoxStream;
use futures::StreamExt;
use regex::Regex;
use std::future::Future;
use tracing::debug;

use crate::config::Config;
use crate::error::{ApiError, ApiResult, AppResult};
use crate::models::{
    AppendRequest, AppendResponse, ErrorBody, ResultsReport, SummaryRequest, SummaryResponse,
    TestDefinition,
};

/// 流式摘要的原始字节块（按到达顺序）
pub type ChunkStream = BoxStream<'static, ApiResult<Vec<u8>>>;

/// 后端能力接口
///
/// 职责：
/// - 只描述与后端交互的请求/响应
/// - 不认识会话 / 导航 / 打乱
/// - 不做重试，失败直接返回
pub trait QuizApi: Send + Sync {
    /// `GET /api/tests/{id}`
    fn fetch_test(&self, test_id: u64) -> impl Future<Output = ApiResult<TestDefinition>> + Send;

    /// `POST /api/ai-summary-stream`，返回按到达顺序的字节流
    fn open_summary_stream(
        &self,
        request: &SummaryRequest,
    ) -> impl Future<Output = ApiResult<ChunkStream>> + Send;

    /// `POST /api/ai-summary`，成功时返回（可能为空的）摘要文本
    fn fetch_summary(
        &self,
        request: &SummaryRequest,
    ) -> impl Future<Output = ApiResult<String>> + Send;

    /// `POST /api/tests/{id}/questions/{orig}/append-explanation`
    ///
    /// 成功时返回服务端合并后的完整解析
    fn append_explanation(
        &self,
        test_id: u64,
        original_index: usize,
        summary: &str,
    ) -> impl Future<Output = ApiResult<String>> + Send;

    /// `POST /take/{id}` 表单提交，返回成绩 token
    fn submit_answers(
        &self,
        test_id: u64,
        fields: &[(String, String)],
    ) -> impl Future<Output = ApiResult<String>> + Send;

    /// `GET /api/results/{token}`
    fn fetch_results(&self, token: &str) -> impl Future<Output = ApiResult<ResultsReport>> + Send;
}

/// 基于 reqwest 的后端客户端
#[derive(Clone)]
pub struct HttpQuizApi {
    client: reqwest::Client,
    base_url: String,
}

impl HttpQuizApi {
    /// 创建新的后端客户端
    pub fn new(config: &Config) -> AppResult<Self> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl QuizApi for HttpQuizApi {
    async fn fetch_test(&self, test_id: u64) -> ApiResult<TestDefinition> {
        let endpoint = format!("/api/tests/{}", test_id);
        debug!("GET {}", endpoint);

        let response = self
            .client
            .get(self.url(&endpoint))
            .send()
            .await
            .map_err(|e| ApiError::transport(&endpoint, e))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ApiError::NotFound {
                resource: "Test".to_string(),
            });
        }
        if !status.is_success() {
            return Err(ApiError::transport(
                &endpoint,
                format!("status {}", status.as_u16()),
            ));
        }

        response
            .json::<TestDefinition>()
            .await
            .map_err(|e| ApiError::transport(&endpoint, e))
    }

    async fn open_summary_stream(&self, request: &SummaryRequest) -> ApiResult<ChunkStream> {
        let endpoint = "/api/ai-summary-stream";
        debug!("POST {} (stream)", endpoint);

        let response = self
            .client
            .post(self.url(endpoint))
            .json(request)
            .send()
            .await
            .map_err(|e| ApiError::transport(endpoint, e))?;

        let status = response.status();
        if !status.is_success() {
            let message = read_error_message(response).await;
            return Err(ApiError::rejected(endpoint, status.as_u16(), message));
        }

        let stream = response
            .bytes_stream()
            .map(move |chunk| {
                chunk
                    .map(|bytes| bytes.to_vec())
                    .map_err(|e| ApiError::transport(endpoint, e))
            })
            .boxed();
        Ok(stream)
    }

    async fn fetch_summary(&self, request: &SummaryRequest) -> ApiResult<String> {
        let endpoint = "/api/ai-summary";
        debug!("POST {}", endpoint);

        let response = self
            .client
            .post(self.url(endpoint))
            .json(request)
            .send()
            .await
            .map_err(|e| ApiError::transport(endpoint, e))?;

        let status = response.status();
        if !status.is_success() {
            let message = read_error_message(response).await;
            return Err(ApiError::rejected(endpoint, status.as_u16(), message));
        }

        let body: SummaryResponse = response
            .json()
            .await
            .map_err(|e| ApiError::transport(endpoint, e))?;
        summary_from_body(endpoint, status.as_u16(), body)
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
        debug!("POST {}", endpoint);

        let response = self
            .client
            .post(self.url(&endpoint))
            .json(&AppendRequest {
                summary: summary.to_string(),
            })
            .send()
            .await
            .map_err(|e| ApiError::transport(&endpoint, e))?;

        let status = response.status();
        // 失败响应也可能不是 JSON
        let body: AppendResponse = response.json().await.unwrap_or_default();
        if !status.is_success() {
            return Err(ApiError::rejected(&endpoint, status.as_u16(), body.error));
        }
        Ok(body.explanation.unwrap_or_default())
    }

    async fn submit_answers(&self, test_id: u64, fields: &[(String, String)]) -> ApiResult<String> {
        let endpoint = format!("/take/{}", test_id);
        debug!("POST {} ({} 个字段)", endpoint, fields.len());

        let response = self
            .client
            .post(self.url(&endpoint))
            .form(fields)
            .send()
            .await
            .map_err(|e| ApiError::transport(&endpoint, e))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ApiError::NotFound {
                resource: "Test".to_string(),
            });
        }
        if !status.is_success() {
            return Err(ApiError::rejected(&endpoint, status.as_u16(), None));
        }

        // 提交后服务端重定向到 /results/{token}
        extract_result_token(response.url().path()).ok_or_else(|| ApiError::empty(&endpoint))
    }

    async fn fetch_results(&self, token: &str) -> ApiResult<ResultsReport> {
        let endpoint = format!("/api/results/{}", token);
        debug!("GET {}", endpoint);

        let response = self
            .client
            .get(self.url(&endpoint))
            .send()
            .await
            .map_err(|e| ApiError::transport(&endpoint, e))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ApiError::NotFound {
                resource: "Results".to_string(),
            });
        }
        if !status.is_success() {
            return Err(ApiError::transport(
                &endpoint,
                format!("status {}", status.as_u16()),
            ));
        }

        response
            .json::<ResultsReport>()
            .await
            .map_err(|e| ApiError::transport(&endpoint, e))
    }
}

/// 2xx 响应体：有摘要就用摘要；摘要为空但带 `error` 时按服务端拒绝处理
fn summary_from_body(endpoint: &str, status: u16, body: SummaryResponse) -> ApiResult<String> {
    match body {
        SummaryResponse {
            summary: Some(summary),
            ..
        } if !summary.trim().is_empty() => Ok(summary),
        SummaryResponse {
            error: Some(error), ..
        } if !error.trim().is_empty() => Err(ApiError::rejected(endpoint, status, Some(error))),
        SummaryResponse { summary, .. } => Ok(summary.unwrap_or_default()),
    }
}

/// 尽力读取 `{ "error": "..." }`，读不到时返回 `None`
async fn read_error_message(response: reqwest::Response) -> Option<String> {
    response
        .json::<ErrorBody>()
        .await
        .ok()
        .and_then(|body| body.error)
}

/// 从 `/results/{token}` 路径中提取成绩 token
pub fn extract_result_token(path: &str) -> Option<String> {
    let re = Regex::new(r"/results/([^/?#]+)").ok()?;
    re.captures(path)
        .and_then(|cap| cap.get(1))
        .map(|m| m.as_str().to_string())
}
