//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责资源持有和事件调度，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `app` - 终端答题应用
//! - 管理应用生命周期（初始化、运行、交卷）
//! - 持有后端客户端和答题会话
//! - 在后台任务中执行摘要 / 追加解析，通过 mpsc 回报结果
//!
//! ### `commands` - 终端命令解析
//!
//! ### `submission` - 交卷与成绩展示
//!
//! ## 层次关系
//!
//! ```text
//! app (命令循环 + 后台任务)
//!     ↓
//! workflow::TestSession (一次加载的全部状态)
//!     ↓
//! services (能力层：shuffle / answers / projector / navigator / ai_summary)
//!     ↓
//! infrastructure (基础设施：QuizApi)
//! ```
//!
//! ## 设计原则
//!
//! 1. **资源隔离**：只有编排层持有后端客户端
//! 2. **单一写者**：会话只在命令循环中被修改
//! 3. **向下依赖**：编排层 → workflow → services → infrastructure
//! 4. **无业务逻辑**：只做调度和展示，不做具体业务判断

pub mod app;
pub mod commands;
pub mod submission;

// 重新导出主要类型
pub use app::{App, AppEvent, Flow, Output, Step};
pub use commands::Command;
pub use submission::{render_report, submit_and_fetch};
