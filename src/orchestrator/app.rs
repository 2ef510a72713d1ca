//! 终端答题应用 - 编排层
//!
//! ## 职责
//!
//! 本模块是整个应用的入口，负责资源管理和事件调度。
//!
//! ## 核心功能
//!
//! 1. **应用初始化**：写日志文件头、创建后端客户端
//! 2. **加载试卷**：拉取试卷并交给会话打乱
//! 3. **命令循环**：`tokio::select!` 同时等待终端输入和后台事件
//! 4. **后台任务**：摘要 / 追加解析在 `tokio::spawn` 中运行，通过 mpsc 回报
//! 5. **交卷**：确认、提交、展示成绩、输出统计
//!
//! ## 设计特点
//!
//! - **资源所有者**：唯一持有后端客户端和会话的模块
//! - **单一写者**：会话只在命令循环中被修改，后台任务只持有输入的副本
//! - **向下委托**：业务判断全部交给 workflow 层

use anyhow::{bail, Result};
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, error, info, warn};

use super::commands::{parse_confirmation, Command, HELP_TEXT};
use super::submission::{render_report, submit_and_fetch};
use crate::config::Config;
use crate::error::{ApiError, AppError, AppResult};
use crate::infrastructure::{HttpQuizApi, QuizApi};
use crate::models::ResultsReport;
use crate::services::{
    AiSummaryClient, AppendOutcome, NavOutcome, SubmissionPayload, SummaryUpdate,
};
use crate::utils::logging::{
    append_log_line, init_log_file, log_startup, log_test_loaded, print_final_stats,
};
use crate::utils::truncate_text;
use crate::workflow::{AppendTicket, SessionFlags, SummaryEvent, TestSession};

/// 后台任务回报给命令循环的事件
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    Summary(SummaryEvent),
    Append {
        ticket: AppendTicket,
        outcome: AppendOutcome,
    },
}

/// 一次命令处理后的走向
#[derive(Debug, Clone, PartialEq)]
pub enum Flow {
    Continue,
    Quit,
    Submitted(ResultsReport),
}

/// 终端输出
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Output {
    /// 独占一行
    Line(String),
    /// 接在当前行后面（流式摘要）
    Inline(String),
}

/// 命令处理结果
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub flow: Flow,
    pub output: Vec<Output>,
}

impl Step {
    fn lines(lines: impl IntoIterator<Item = String>) -> Self {
        Self {
            flow: Flow::Continue,
            output: lines.into_iter().map(Output::Line).collect(),
        }
    }

    fn line(line: impl Into<String>) -> Self {
        Self::lines([line.into()])
    }

    fn quit(line: impl Into<String>) -> Self {
        Self {
            flow: Flow::Quit,
            output: vec![Output::Line(line.into())],
        }
    }
}

/// 应用主结构
pub struct App<A> {
    config: Config,
    api: Arc<A>,
    client: AiSummaryClient<A>,
    session: TestSession,
    events_tx: UnboundedSender<AppEvent>,
    events_rx: Option<UnboundedReceiver<AppEvent>>,
    /// 等待用户确认的提交
    pending_submission: Option<SubmissionPayload>,
}

impl App<HttpQuizApi> {
    /// 初始化应用
    pub async fn initialize(config: Config) -> Result<Self> {
        // 初始化日志文件
        init_log_file(&config.output_log_file, config.test_id)?;

        log_startup(&config.api_base_url, config.test_id, config.flashcard_mode);

        let api = HttpQuizApi::new(&config)?;
        Ok(Self::with_api(config, Arc::new(api)))
    }
}

impl<A: QuizApi + 'static> App<A> {
    pub fn with_api(config: Config, api: Arc<A>) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let session = TestSession::new(SessionFlags::from(&config));
        Self {
            client: AiSummaryClient::new(Arc::clone(&api)),
            config,
            api,
            session,
            events_tx,
            events_rx: Some(events_rx),
            pending_submission: None,
        }
    }

    pub fn session(&self) -> &TestSession {
        &self.session
    }

    /// 拉取试卷并加载到会话
    ///
    /// 拉取失败时给出用户提示并以 `Flow::Quit` 结束，成功时输出第一题
    pub async fn load_test(&mut self) -> Step {
        let test_id = self.config.test_id;
        let test = match self.api.fetch_test(test_id).await {
            Ok(test) => test,
            Err(ApiError::NotFound { .. }) => {
                error!("❌ 试卷 #{} 不存在", test_id);
                return Step::quit("Test not found.");
            }
            Err(e) => {
                error!("❌ 拉取试卷失败: {}", e);
                return Step::quit("Failed to fetch test data.");
            }
        };

        self.session.load(&test, &mut rand::thread_rng());
        log_test_loaded(self.session.title(), self.session.question_count());
        self.log(&format!(
            "加载试卷: {} ({} 道题)",
            self.session.title(),
            self.session.question_count()
        ));

        let mut step = self.render_question();
        step.output
            .push(Output::Line("(type 'help' for commands)".to_string()));
        step
    }

    /// 加载试卷后进入命令循环；加载失败只打印提示并正常返回
    pub async fn launch(&mut self) -> Result<()> {
        let step = self.load_test().await;
        print_outputs(&step.output);
        if step.flow == Flow::Quit {
            return Ok(());
        }
        self.run().await
    }

    /// 运行命令循环，直到交卷或退出
    pub async fn run(&mut self) -> Result<()> {
        let Some(mut events) = self.events_rx.take() else {
            bail!("命令循环已在运行");
        };
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        loop {
            tokio::select! {
                line = lines.next_line() => {
                    let Some(line) = line? else {
                        info!("输入结束，退出");
                        break;
                    };
                    let step = self.handle_line(&line).await?;
                    print_outputs(&step.output);
                    match step.flow {
                        Flow::Continue => {}
                        Flow::Quit => break,
                        Flow::Submitted(_) => return Ok(()),
                    }
                }
                Some(event) = events.recv() => {
                    print_outputs(&self.apply_event(event));
                }
            }
        }

        print_final_stats(
            self.session.answers().answered_count(),
            self.session.question_count(),
            &self.config.output_log_file,
        );
        Ok(())
    }

    /// 测试和离线演练用：等待下一个后台事件
    pub async fn next_event(&mut self) -> Option<AppEvent> {
        self.events_rx.as_mut()?.recv().await
    }

    /// 处理一行终端输入
    pub async fn handle_line(&mut self, line: &str) -> AppResult<Step> {
        if let Some(payload) = self.pending_submission.take() {
            if parse_confirmation(line) {
                return self.submit(payload).await;
            }
            info!("用户取消提交");
            return Ok(Step::line("Submission cancelled."));
        }

        let Some(command) = Command::parse(line) else {
            return Ok(Step::line("Unknown command. Type 'help' for the list."));
        };
        debug!("命令: {:?}", command);

        match command {
            Command::Select(option) => Ok(self.select(option)),
            Command::Next => match self.session.next() {
                NavOutcome::Moved(_) => Ok(self.render_question()),
                NavOutcome::Finish => self.finish().await,
                NavOutcome::Blocked => Ok(self.blocked("Already at the last question.")),
            },
            Command::Prev => match self.session.prev() {
                NavOutcome::Moved(_) => Ok(self.render_question()),
                _ => Ok(self.blocked("Already at the first question.")),
            },
            Command::Check => Ok(Step::line(self.session.check_answer().message())),
            Command::Reveal => Ok(self.reveal()),
            Command::Summary => Ok(self.start_summary()),
            Command::Append => Ok(self.start_append()),
            Command::Finish if self.session.flags().flashcard_mode => {
                Ok(Step::line("Flashcard mode has nothing to submit."))
            }
            Command::Finish => self.finish().await,
            Command::Help => Ok(Step::line(HELP_TEXT)),
            Command::Quit => Ok(Step {
                flow: Flow::Quit,
                output: Vec::new(),
            }),
        }
    }

    /// 应用后台事件；过期事件不产生任何输出
    pub fn apply_event(&mut self, event: AppEvent) -> Vec<Output> {
        match event {
            AppEvent::Summary(event) => {
                let before = self.session.summary().display.clone();
                let update = event.update.clone();
                if !self.session.apply_summary_event(event) {
                    return Vec::new();
                }
                let after = &self.session.summary().display;
                match update {
                    SummaryUpdate::Partial { .. } => match after.strip_prefix(before.as_str()) {
                        Some(delta) if !before.is_empty() => {
                            vec![Output::Inline(delta.to_string())]
                        }
                        _ => vec![Output::Inline(format!("\n{}", after))],
                    },
                    SummaryUpdate::Complete { summary, .. } => {
                        self.log(&format!("AI 摘要: {}", truncate_text(&summary, 80)));
                        vec![Output::Line(String::new())]
                    }
                    SummaryUpdate::Failed { message } => vec![Output::Line(message)],
                    SummaryUpdate::Phase(_) => Vec::new(),
                }
            }
            AppEvent::Append { ticket, outcome } => {
                if !self.session.finish_append(&ticket, &outcome) {
                    return Vec::new();
                }
                match outcome {
                    AppendOutcome::Appended { explanation } => {
                        self.log(&format!("追加解析: 原始题目 {}", ticket.original_index));
                        vec![
                            Output::Line(self.session.summary().append.label().to_string()),
                            Output::Line(format!("Explanation: {}", explanation)),
                        ]
                    }
                    AppendOutcome::Failed { message } => vec![Output::Line(message)],
                }
            }
        }
    }

    // ========== 命令实现 ==========

    fn select(&mut self, option: usize) -> Step {
        if !self.session.select_option(option) {
            return Step::line("Invalid option.");
        }
        let text = self
            .session
            .current_question()
            .and_then(|q| q.options.get(option))
            .cloned()
            .unwrap_or_default();
        Step::line(format!("Selected: {}", text))
    }

    fn blocked(&self, message: &str) -> Step {
        if self.session.question_count() == 0 {
            Step::line("No questions available in this test.")
        } else {
            Step::line(message)
        }
    }

    fn reveal(&mut self) -> Step {
        let Some(answer) = self.session.reveal_answer() else {
            return self.blocked("");
        };
        let mut lines = vec![format!("Answer: {}", answer)];
        if let Some(question) = self.session.current_question() {
            if question.has_explanation() {
                lines.push(format!("Explanation: {}", question.explanation));
            }
        }
        Step::lines(lines)
    }

    fn start_summary(&mut self) -> Step {
        if !self.session.flags().ai_summary_enabled {
            return Step::line("AI summary is disabled.");
        }
        let Some(ticket) = self.session.begin_summary() else {
            return if self.session.summary().is_busy() {
                Step::line("AI summary is already running.")
            } else {
                self.blocked("")
            };
        };
        info!("🤖 开始生成摘要 {}", ticket);

        let client = self.client.clone();
        let tx = self.events_tx.clone();
        let generation = ticket.generation;
        tokio::spawn(async move {
            client
                .generate(&ticket.request, move |update| {
                    // 接收端关闭说明程序正在退出
                    let _ = tx.send(AppEvent::Summary(SummaryEvent { generation, update }));
                })
                .await;
        });

        Step::line(self.session.summary().display.clone())
    }

    fn start_append(&mut self) -> Step {
        let Some(ticket) = self.session.begin_append() else {
            return Step::line("Nothing to append.");
        };

        let client = self.client.clone();
        let tx = self.events_tx.clone();
        let label = self.session.summary().append.label().to_string();
        tokio::spawn(async move {
            let outcome = client
                .append(ticket.test_id, ticket.original_index, &ticket.summary)
                .await;
            let _ = tx.send(AppEvent::Append { ticket, outcome });
        });

        Step::line(label)
    }

    /// 交卷入口：空试卷拒绝，未答完需要确认
    async fn finish(&mut self) -> AppResult<Step> {
        let payload = match self.session.prepare_submission() {
            Ok(payload) => payload,
            Err(AppError::Session(message)) => return Ok(Step::line(message)),
            Err(e) => return Err(e),
        };

        if payload.needs_confirmation() {
            let prompt = format!("{} [y/N]", payload.confirmation_prompt());
            self.pending_submission = Some(payload);
            return Ok(Step::line(prompt));
        }
        self.submit(payload).await
    }

    async fn submit(&mut self, payload: SubmissionPayload) -> AppResult<Step> {
        let test_id = self.session.test_id();
        match submit_and_fetch(self.api.as_ref(), test_id, &payload).await {
            Ok(report) => {
                self.log(&format!(
                    "交卷: {}/{} 已作答，得分 {}/{}",
                    payload.answered(),
                    payload.total(),
                    report.score,
                    report.total
                ));
                print_final_stats(
                    payload.answered(),
                    payload.total(),
                    &self.config.output_log_file,
                );
                Ok(Step {
                    output: vec![Output::Line(render_report(&report))],
                    flow: Flow::Submitted(report),
                })
            }
            Err(AppError::Api(e)) => {
                warn!("⚠️ 交卷失败: {}", e);
                Ok(Step::line(e.user_message()))
            }
            Err(e) => Err(e),
        }
    }

    /// 渲染当前题目
    fn render_question(&self) -> Step {
        let Some(question) = self.session.current_question() else {
            return Step::line("No questions available in this test.");
        };
        let Some(index) = self.session.current_index() else {
            return Step::line("No questions available in this test.");
        };

        let title = if question.question.trim().is_empty() {
            "Untitled question"
        } else {
            &question.question
        };
        let mut lines = vec![
            String::new(),
            format!("{} | {}", self.session.title(), self.session.progress_label()),
            format!("Question {}: {}", index + 1, title),
        ];
        if let Some(image) = &question.image {
            lines.push(format!("[image: {}]", image));
        }
        if !self.session.flags().flashcard_mode {
            let selected = self.session.selected();
            for (idx, option) in question.options.iter().enumerate() {
                let marker = if selected == Some(idx) { "*" } else { " " };
                lines.push(format!(" {} {}) {}", marker, idx + 1, option));
            }
        }
        Step::lines(lines)
    }

    fn log(&self, line: &str) {
        if let Err(e) = append_log_line(&self.config.output_log_file, line) {
            warn!("⚠️ 写入日志文件失败: {}", e);
        }
    }
}

fn print_outputs(outputs: &[Output]) {
    let mut stdout = std::io::stdout();
    for output in outputs {
        match output {
            Output::Line(line) => {
                let _ = writeln!(stdout, "{}", line);
            }
            Output::Inline(text) => {
                let _ = write!(stdout, "{}", text);
            }
        }
    }
    let _ = stdout.flush();
}
