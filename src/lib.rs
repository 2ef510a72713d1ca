//! # Quiz Session
//!
//! 选择题答题客户端核心：打乱、作答、导航、AI 摘要和交卷
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有稀缺资源（HTTP 客户端），只暴露能力
//! - `QuizApi` - 后端能力接口；`HttpQuizApi` 为真实实现，`ScriptedQuizApi` 为脚本化实现
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，不持有会话状态
//! - `ShuffleEngine` - 打乱题目和选项，记录映射
//! - `AnswerState` / `SubmissionProjector` - 作答记录与坐标投影
//! - `QuestionNavigator` - 前后导航
//! - `AiSummaryClient` - 流式摘要（带兜底）与追加解析
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一次加载"的完整状态与操作
//! - `TestSession` - 会话控制器（load / reset / 导航 / 摘要凭证 / 交卷）
//! - `AiSummarySession` - 当前题目的摘要会话
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/app` - 终端命令循环，管理资源和后台任务
//!
//! ## 模块结构

pub mod config;
pub mod error;
pub mod infrastructure;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::Config;
pub use error::{ApiError, AppError, AppResult};
pub use infrastructure::{HttpQuizApi, QuizApi, ScriptedQuizApi};
pub use models::{PresentedQuestion, Question, TestDefinition};
pub use orchestrator::App;
pub use services::{AiSummaryClient, ShuffleEngine, SubmissionProjector};
pub use workflow::{SessionFlags, TestSession};
