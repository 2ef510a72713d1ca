//! 终端命令解析 - 编排层

/// 用户在终端输入的一条命令
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// 选择选项（呈现下标，从 0 开始）
    Select(usize),
    Next,
    Prev,
    Check,
    Reveal,
    Summary,
    Append,
    Finish,
    Help,
    Quit,
}

impl Command {
    /// 解析一行输入；选项编号按 1 开始输入
    ///
    /// 无法识别时返回 `None`
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim().to_lowercase();
        if let Ok(number) = line.parse::<usize>() {
            return number.checked_sub(1).map(Command::Select);
        }
        if let Some(rest) = line.strip_prefix("select ") {
            return rest
                .trim()
                .parse::<usize>()
                .ok()
                .and_then(|n| n.checked_sub(1))
                .map(Command::Select);
        }
        let command = match line.as_str() {
            "n" | "next" => Command::Next,
            "p" | "prev" => Command::Prev,
            "c" | "check" => Command::Check,
            "r" | "reveal" => Command::Reveal,
            "s" | "summary" => Command::Summary,
            "a" | "append" => Command::Append,
            "f" | "finish" => Command::Finish,
            "h" | "help" | "?" => Command::Help,
            "q" | "quit" | "exit" => Command::Quit,
            _ => return None,
        };
        Some(command)
    }
}

/// 确认提示的回答
pub fn parse_confirmation(line: &str) -> bool {
    matches!(line.trim().to_lowercase().as_str(), "y" | "yes")
}

pub const HELP_TEXT: &str = "\
Commands:
  1..9 / select N   choose option N
  n / next          next question (finishes on the last one)
  p / prev          previous question
  c / check         check the selected answer
  r / reveal        reveal the correct answer
  s / summary       generate an AI summary
  a / append        append the AI summary to the explanation
  f / finish        submit the test
  q / quit          leave without submitting";
