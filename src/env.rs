//! 环境变量覆盖
//!
//! 提供类型安全、可验证的 `SMARTREADER_*` 环境变量访问，用于在不修改配置文件的情况下
//! 调整批次大小、防抖间隔、加粗策略和强调标签。

use std::env;
use std::fmt;

use crate::config::{constants, PolicyKind};

/// 环境变量解析错误
#[derive(Debug, Clone)]
pub struct EnvError {
    pub variable: String,
    pub message: String,
}

impl fmt::Display for EnvError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Environment variable '{}': {}", self.variable, self.message)
    }
}

impl std::error::Error for EnvError {}

pub type EnvResult<T> = Result<T, EnvError>;

/// 环境变量访问器特性
pub trait EnvVar<T> {
    const NAME: &'static str;
    const DESCRIPTION: &'static str;

    fn parse(value: &str) -> EnvResult<T>;

    /// 未设置时返回 `Ok(None)`
    fn get() -> EnvResult<Option<T>> {
        match env::var(Self::NAME) {
            Ok(value) => Self::parse(&value).map(Some),
            Err(_) => Ok(None),
        }
    }

    fn error(message: String) -> EnvError {
        EnvError {
            variable: Self::NAME.to_string(),
            message,
        }
    }
}

/// 单次遍历的批次大小
pub struct BatchSize;
impl EnvVar<usize> for BatchSize {
    const NAME: &'static str = "SMARTREADER_BATCH_SIZE";
    const DESCRIPTION: &'static str = "Maximum number of elements processed per pass";

    fn parse(value: &str) -> EnvResult<usize> {
        match value.trim().parse::<usize>() {
            Ok(size) if (1..=constants::MAX_BATCH_SIZE).contains(&size) => Ok(size),
            Ok(size) => Err(Self::error(format!(
                "Batch size {} out of range 1..={}",
                size,
                constants::MAX_BATCH_SIZE
            ))),
            Err(_) => Err(Self::error(format!("Invalid number '{}'", value))),
        }
    }
}

/// 防抖间隔（毫秒）
pub struct DebounceMs;
impl EnvVar<u64> for DebounceMs {
    const NAME: &'static str = "SMARTREADER_DEBOUNCE_MS";
    const DESCRIPTION: &'static str = "Mutation debounce window in milliseconds";

    fn parse(value: &str) -> EnvResult<u64> {
        match value.trim().parse::<u64>() {
            Ok(ms) if ms <= 60_000 => Ok(ms),
            Ok(ms) => Err(Self::error(format!("Debounce {}ms is longer than 60s", ms))),
            Err(_) => Err(Self::error(format!("Invalid number '{}'", value))),
        }
    }
}

/// 加粗长度策略
pub struct Policy;
impl EnvVar<PolicyKind> for Policy {
    const NAME: &'static str = "SMARTREADER_POLICY";
    const DESCRIPTION: &'static str = "Bold length policy: fixed, percentage";

    fn parse(value: &str) -> EnvResult<PolicyKind> {
        value.trim().parse().map_err(Self::error)
    }
}

/// 强调标签
pub struct MarkerTag;
impl EnvVar<String> for MarkerTag {
    const NAME: &'static str = "SMARTREADER_MARKER_TAG";
    const DESCRIPTION: &'static str = "Tag used to wrap emphasised word prefixes";

    fn parse(value: &str) -> EnvResult<String> {
        let tag = value.trim().to_lowercase();
        if !tag.is_empty() && tag.chars().all(|c| c.is_ascii_alphanumeric()) {
            Ok(tag)
        } else {
            Err(Self::error(format!("Invalid tag name '{}'", value)))
        }
    }
}

/// 生成环境变量文档
pub fn generate_env_docs() -> String {
    let mut docs = String::from("# SmartReader Environment Variables\n\n");
    for (name, description) in [
        (BatchSize::NAME, BatchSize::DESCRIPTION),
        (DebounceMs::NAME, DebounceMs::DESCRIPTION),
        (Policy::NAME, Policy::DESCRIPTION),
        (MarkerTag::NAME, MarkerTag::DESCRIPTION),
    ] {
        docs.push_str(&format!("- `{}`: {}\n", name, description));
    }
    docs
}
