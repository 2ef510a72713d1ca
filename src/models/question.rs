use serde::{Deserialize, Serialize};

/// 后端返回的题目
///
/// 在原始序列中的位置（original index）是它的持久身份。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Question {
    #[serde(default)]
    pub question: String,
    #[serde(default, deserialize_with = "deserialize_options")]
    pub options: Vec<String>,
    /// 正确选项的原始下标；缺失、非数字或非整数时为 `None`
    #[serde(default, deserialize_with = "deserialize_lenient_index")]
    pub correct_index: Option<i64>,
    #[serde(default, deserialize_with = "deserialize_text")]
    pub explanation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl Question {
    /// 校验后的正确选项下标（在选项范围内才返回）
    pub fn valid_correct_index(&self) -> Option<usize> {
        self.correct_index
            .and_then(|idx| usize::try_from(idx).ok())
            .filter(|idx| *idx < self.options.len())
    }
}

/// `GET /api/tests/{id}` 的响应
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TestDefinition {
    #[serde(default)]
    pub id: u64,
    #[serde(default, deserialize_with = "deserialize_text")]
    pub title: String,
    #[serde(default, deserialize_with = "deserialize_questions")]
    pub questions: Vec<Question>,
}

impl TestDefinition {
    /// 展示用标题，空标题时返回 "Untitled Test"
    pub fn display_title(&self) -> &str {
        if self.title.trim().is_empty() {
            "Untitled Test"
        } else {
            &self.title
        }
    }
}

/// 打乱后呈现给用户的题目
///
/// `options` 已按 `option_permutation` 重排，`correct_index` 已重映射到新位置。
/// 来源信息（`original_index` / `option_permutation`）在一次加载内不会被修改。
#[derive(Debug, Clone, PartialEq)]
pub struct PresentedQuestion {
    pub question: String,
    pub options: Vec<String>,
    /// 重映射后的正确下标；`None` 表示"没有已知的正确答案"（即 -1 哨兵值）
    pub correct_index: Option<usize>,
    pub explanation: String,
    pub image: Option<String>,
    pub original_index: usize,
    /// `option_permutation[presented] = original`
    pub option_permutation: Vec<usize>,
}

impl PresentedQuestion {
    /// 发送给后端时使用的正确下标，未知时为 -1
    pub fn correct_index_wire(&self) -> i64 {
        self.correct_index.map(|idx| idx as i64).unwrap_or(-1)
    }

    /// 正确答案文本，未知时返回 `None`
    pub fn correct_option(&self) -> Option<&str> {
        self.correct_index
            .and_then(|idx| self.options.get(idx))
            .map(String::as_str)
    }

    pub fn has_explanation(&self) -> bool {
        !self.explanation.trim().is_empty()
    }
}

// ========== 宽松反序列化 ==========
// 后端数据来自可手工编辑的 JSON，字段类型不可信

/// 下标只接受整数或小数部分为 0 的浮点数，其余一律视为未知
fn deserialize_lenient_index<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::{IgnoredAny, MapAccess, SeqAccess, Visitor};
    use std::fmt;

    struct IndexVisitor;

    impl<'de> Visitor<'de> for IndexVisitor {
        type Value = Option<i64>;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("an integer index or any other JSON value")
        }

        fn visit_i64<E: serde::de::Error>(self, value: i64) -> Result<Self::Value, E> {
            Ok(Some(value))
        }

        fn visit_u64<E: serde::de::Error>(self, value: u64) -> Result<Self::Value, E> {
            Ok(i64::try_from(value).ok())
        }

        fn visit_f64<E: serde::de::Error>(self, value: f64) -> Result<Self::Value, E> {
            if value.is_finite() && value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
                Ok(Some(value as i64))
            } else {
                Ok(None)
            }
        }

        fn visit_str<E: serde::de::Error>(self, _value: &str) -> Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_bool<E: serde::de::Error>(self, _value: bool) -> Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_unit<E: serde::de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_none<E: serde::de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_some<D2>(self, deserializer: D2) -> Result<Self::Value, D2::Error>
        where
            D2: serde::Deserializer<'de>,
        {
            deserializer.deserialize_any(IndexVisitor)
        }

        fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
        where
            A: SeqAccess<'de>,
        {
            while seq.next_element::<IgnoredAny>()?.is_some() {}
            Ok(None)
        }

        fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            while map.next_entry::<IgnoredAny, IgnoredAny>()?.is_some() {}
            Ok(None)
        }
    }

    deserializer.deserialize_any(IndexVisitor)
}

/// 选项必须是数组，非数组视为空；非字符串元素转为字符串
fn deserialize_options<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Array(items) => items.into_iter().map(value_to_text).collect(),
        _ => Vec::new(),
    })
}

/// 题目列表必须是数组，非数组视为空试卷
fn deserialize_questions<'de, D>(deserializer: D) -> Result<Vec<Question>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    match value {
        serde_json::Value::Array(_) => {
            serde_json::from_value(value).map_err(serde::de::Error::custom)
        }
        _ => Ok(Vec::new()),
    }
}

/// 文本字段：null 视为空字符串
fn deserialize_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(value_to_text(value))
}

fn value_to_text(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    }
}
