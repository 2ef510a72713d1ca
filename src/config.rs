use serde::Deserialize;
use std::path::Path;

use crate::error::{AppResult, ConfigError};

/// 程序配置文件
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 后端 API 地址
    pub api_base_url: String,
    /// 要加载的试卷 ID
    pub test_id: u64,
    /// 是否启用 AI 摘要
    pub ai_summary_enabled: bool,
    /// 闪卡模式：只打乱题目顺序，不打乱选项，不提交
    pub flashcard_mode: bool,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    /// 输出日志文件
    pub output_log_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: "http://127.0.0.1:5000".to_string(),
            test_id: 0,
            ai_summary_enabled: true,
            flashcard_mode: false,
            verbose_logging: false,
            output_log_file: "session.log".to_string(),
        }
    }
}

impl Config {
    /// 加载配置
    ///
    /// 若设置了 `QUIZ_CONFIG`，先读取该 TOML 文件，再用环境变量覆盖。
    pub fn load() -> AppResult<Self> {
        let base = match std::env::var("QUIZ_CONFIG") {
            Ok(path) => Self::from_toml_file(Path::new(&path))?,
            Err(_) => Self::default(),
        };
        base.with_env_overrides()
    }

    /// 从 TOML 文件读取配置，缺省字段使用默认值
    pub fn from_toml_file(path: &Path) -> AppResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFailed {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_toml_str(&content).map_err(|e| match e {
            crate::AppError::Config(ConfigError::TomlParseFailed { reason, .. }) => {
                ConfigError::TomlParseFailed {
                    path: path.display().to_string(),
                    reason,
                }
                .into()
            }
            other => other,
        })
    }

    pub fn from_toml_str(content: &str) -> AppResult<Self> {
        Ok(toml::from_str(content)?)
    }

    fn with_env_overrides(self) -> AppResult<Self> {
        Ok(Self {
            api_base_url: std::env::var("API_BASE_URL").unwrap_or(self.api_base_url),
            test_id: parse_env("TEST_ID", "u64")?.unwrap_or(self.test_id),
            ai_summary_enabled: parse_env("AI_SUMMARY_ENABLED", "bool")?
                .unwrap_or(self.ai_summary_enabled),
            flashcard_mode: parse_env("FLASHCARD_MODE", "bool")?.unwrap_or(self.flashcard_mode),
            verbose_logging: parse_env("VERBOSE_LOGGING", "bool")?
                .unwrap_or(self.verbose_logging),
            output_log_file: std::env::var("OUTPUT_LOG_FILE").unwrap_or(self.output_log_file),
        })
    }
}

/// 读取并解析环境变量；未设置时返回 `None`
fn parse_env<T: std::str::FromStr>(var_name: &str, expected_type: &str) -> AppResult<Option<T>> {
    match std::env::var(var_name) {
        Ok(value) => value.trim().parse().map(Some).map_err(|_| {
            ConfigError::EnvVarParseFailed {
                var_name: var_name.to_string(),
                value,
                expected_type: expected_type.to_string(),
            }
            .into()
        }),
        Err(_) => Ok(None),
    }
}
