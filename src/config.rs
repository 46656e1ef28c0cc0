//! 配置管理模块
//!
//! 启动时读取的静态配置：语言表、排除标签、加粗长度边界、批次大小、防抖间隔和耗时阈值。
//! 运行期只有启用标志和按语言的加粗长度覆盖会从存储中重新读取。

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::env::{self, EnvVar};
use crate::error::{ReaderError, ReaderResult};

/// 配置常量
pub mod constants {
    pub const DEFAULT_LANGUAGE: &str = "en";
    pub const DEFAULT_BOLD_LENGTH: usize = 2;
    pub const MARKER_TAG: &str = "b";
    pub const WORD_SEPARATOR: &str = r"\s+";

    pub const EXCLUDED_TAGS: &[&str] = &[
        "script", "style", "pre", "code", "textarea", "input", "select", "option", "button",
        "img", "svg", "canvas", "math", "noscript", "template", "iframe",
    ];

    pub const BATCH_SIZE: usize = 50;
    pub const MAX_BATCH_SIZE: usize = 10_000;
    pub const MAX_RECURSION_DEPTH: usize = 100;

    pub const DEBOUNCE_MS: u64 = 250;
    pub const PROCESSING_TIME_THRESHOLD_MS: u64 = 1000;

    pub const LONG_WORD_THRESHOLD: usize = 6;
    pub const BOLD_PERCENTAGE: f64 = 0.4;
    pub const MIN_BOLD_PERCENTAGE: f64 = 0.3;
    pub const MAX_BOLD_PERCENTAGE: f64 = 0.6;

    pub const DEFAULT_STATE: bool = true;

    /// 存储键
    pub mod keys {
        pub const ENABLED: &str = "enabled";
        pub const STATS: &str = "stats";
        pub const SETTINGS: &str = "settings";
    }
}

/// 单个语言的配置
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct LanguageConfig {
    /// 语言代码，例如 `ru`
    pub code: String,
    /// 字符类检测正则，例如 `[а-яА-ЯёЁ]`
    pub pattern: String,
    pub bold_length: usize,
    #[serde(default = "default_min_bold_length")]
    pub min_bold_length: usize,
    #[serde(default = "default_max_bold_length")]
    pub max_bold_length: usize,
}

fn default_min_bold_length() -> usize {
    1
}

fn default_max_bold_length() -> usize {
    5
}

impl LanguageConfig {
    pub fn new(code: &str, pattern: &str, bold_length: usize) -> Self {
        Self {
            code: code.to_string(),
            pattern: pattern.to_string(),
            bold_length,
            min_bold_length: default_min_bold_length(),
            max_bold_length: default_max_bold_length(),
        }
    }

    /// 把加粗长度钳制到 `[min_bold_length, max_bold_length]`
    pub fn clamp_bold_length(&self, bold_length: usize) -> usize {
        bold_length.clamp(self.min_bold_length, self.max_bold_length.max(self.min_bold_length))
    }
}

/// 加粗长度策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyKind {
    /// 固定长度，最多为单词长度的一半
    #[default]
    Fixed,
    /// 长单词按百分比计算
    Percentage,
}

impl std::str::FromStr for PolicyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fixed" => Ok(PolicyKind::Fixed),
            "percentage" | "percent" => Ok(PolicyKind::Percentage),
            _ => Err(format!("Invalid policy '{}'. Use: fixed, percentage", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PercentageConfig {
    /// 超过该长度的单词使用百分比规则
    pub long_word_threshold: usize,
    pub bold_percentage: f64,
    pub min_bold_percentage: f64,
    pub max_bold_percentage: f64,
}

impl Default for PercentageConfig {
    fn default() -> Self {
        Self {
            long_word_threshold: constants::LONG_WORD_THRESHOLD,
            bold_percentage: constants::BOLD_PERCENTAGE,
            min_bold_percentage: constants::MIN_BOLD_PERCENTAGE,
            max_bold_percentage: constants::MAX_BOLD_PERCENTAGE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DomConfig {
    /// 强调标记使用的标签
    pub marker_tag: String,
    /// 分隔符正则（空白串）
    pub word_separator: String,
    pub excluded_tags: Vec<String>,
}

impl Default for DomConfig {
    fn default() -> Self {
        Self {
            marker_tag: constants::MARKER_TAG.to_string(),
            word_separator: constants::WORD_SEPARATOR.to_string(),
            excluded_tags: constants::EXCLUDED_TAGS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ProcessingConfig {
    /// 单次调用最多处理的元素数
    pub batch_size: usize,
    /// 祖先扫描的最大深度
    pub max_recursion_depth: usize,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            batch_size: constants::BATCH_SIZE,
            max_recursion_depth: constants::MAX_RECURSION_DEPTH,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PerformanceConfig {
    pub debounce_ms: u64,
    /// 超过该耗时的遍历不计入统计
    pub processing_time_threshold_ms: u64,
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            debounce_ms: constants::DEBOUNCE_MS,
            processing_time_threshold_ms: constants::PROCESSING_TIME_THRESHOLD_MS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    /// 存储中没有启用标志时使用的值
    pub default_state: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            default_state: constants::DEFAULT_STATE,
        }
    }
}

/// SmartReader 配置
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ReaderConfig {
    /// 按优先级排列的语言表，先匹配者胜出
    pub languages: Vec<LanguageConfig>,
    pub default_language: String,
    pub default_bold_length: usize,
    pub policy: PolicyKind,
    pub percentage: PercentageConfig,
    pub dom: DomConfig,
    pub processing: ProcessingConfig,
    pub performance: PerformanceConfig,
    pub storage: StorageConfig,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        let mut ru = LanguageConfig::new("ru", "[а-яА-ЯёЁ]", 3);
        ru.max_bold_length = 6;

        Self {
            languages: vec![ru, LanguageConfig::new("en", "[a-zA-Z]", 2)],
            default_language: constants::DEFAULT_LANGUAGE.to_string(),
            default_bold_length: constants::DEFAULT_BOLD_LENGTH,
            policy: PolicyKind::default(),
            percentage: PercentageConfig::default(),
            dom: DomConfig::default(),
            processing: ProcessingConfig::default(),
            performance: PerformanceConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}

/// 按语言持久化的设置
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LanguageSettings {
    pub bold_length: usize,
}

/// 语言代码 -> 设置
pub type Settings = BTreeMap<String, LanguageSettings>;

impl ReaderConfig {
    /// 从 TOML 文本解析配置，并应用校验
    pub fn from_toml_str(content: &str) -> ReaderResult<Self> {
        let mut config: ReaderConfig = toml::from_str(content)?;
        config.validate();
        Ok(config)
    }

    /// 从文件加载配置，随后应用环境变量覆盖
    pub fn load<P: AsRef<Path>>(path: P) -> ReaderResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ReaderError::Config(format!("无法读取配置文件 {}: {}", path.display(), e))
        })?;

        let mut config: ReaderConfig = toml::from_str(&content)
            .map_err(|e| ReaderError::from(e).with_context(path.display()))?;
        tracing::info!("加载配置文件: {}", path.display());

        config.apply_env_overrides();
        config.validate();
        Ok(config)
    }

    /// 应用 `SMARTREADER_*` 环境变量
    pub fn apply_env_overrides(&mut self) {
        match env::BatchSize::get() {
            Ok(Some(size)) => self.processing.batch_size = size,
            Ok(None) => {}
            Err(e) => tracing::warn!("{}", e),
        }
        match env::DebounceMs::get() {
            Ok(Some(ms)) => self.performance.debounce_ms = ms,
            Ok(None) => {}
            Err(e) => tracing::warn!("{}", e),
        }
        match env::Policy::get() {
            Ok(Some(policy)) => self.policy = policy,
            Ok(None) => {}
            Err(e) => tracing::warn!("{}", e),
        }
        match env::MarkerTag::get() {
            Ok(Some(tag)) => self.dom.marker_tag = tag,
            Ok(None) => {}
            Err(e) => tracing::warn!("{}", e),
        }
    }

    /// 将越界值钳制到最近的合法值，返回修正的项数
    pub fn validate(&mut self) -> usize {
        let mut corrections = 0;

        let batch_size = self
            .processing
            .batch_size
            .clamp(1, constants::MAX_BATCH_SIZE);
        if batch_size != self.processing.batch_size {
            tracing::warn!(
                "batch_size {} 超出范围，已修正为 {}",
                self.processing.batch_size,
                batch_size
            );
            self.processing.batch_size = batch_size;
            corrections += 1;
        }

        if self.processing.max_recursion_depth == 0 {
            tracing::warn!("max_recursion_depth 不能为 0，已修正为 1");
            self.processing.max_recursion_depth = 1;
            corrections += 1;
        }

        let percentage = &mut self.percentage;
        for (name, value) in [
            ("bold_percentage", &mut percentage.bold_percentage),
            ("min_bold_percentage", &mut percentage.min_bold_percentage),
            ("max_bold_percentage", &mut percentage.max_bold_percentage),
        ] {
            let clamped = if (*value).is_finite() {
                (*value).clamp(0.0, 1.0)
            } else {
                0.0
            };
            if clamped != *value {
                tracing::warn!("{} {} 超出 [0, 1]，已修正为 {}", name, value, clamped);
                *value = clamped;
                corrections += 1;
            }
        }
        if percentage.min_bold_percentage > percentage.max_bold_percentage {
            tracing::warn!(
                "min_bold_percentage 大于 max_bold_percentage，已修正为 {}",
                percentage.max_bold_percentage
            );
            percentage.min_bold_percentage = percentage.max_bold_percentage;
            corrections += 1;
        }

        for language in &mut self.languages {
            if language.min_bold_length > language.max_bold_length {
                tracing::warn!(
                    "语言 {} 的 min_bold_length 大于 max_bold_length，已修正为 {}",
                    language.code,
                    language.max_bold_length
                );
                language.min_bold_length = language.max_bold_length;
                corrections += 1;
            }

            let bold_length = language.clamp_bold_length(language.bold_length);
            if bold_length != language.bold_length {
                tracing::warn!(
                    "语言 {} 的 bold_length {} 超出 [{}, {}]，已修正为 {}",
                    language.code,
                    language.bold_length,
                    language.min_bold_length,
                    language.max_bold_length,
                    bold_length
                );
                language.bold_length = bold_length;
                corrections += 1;
            }
        }

        if !is_valid_tag_name(&self.dom.marker_tag) {
            tracing::warn!(
                "marker_tag '{}' 无效，已修正为 {}",
                self.dom.marker_tag,
                constants::MARKER_TAG
            );
            self.dom.marker_tag = constants::MARKER_TAG.to_string();
            corrections += 1;
        }
        self.dom.marker_tag = self.dom.marker_tag.to_lowercase();
        for tag in &mut self.dom.excluded_tags {
            *tag = tag.to_lowercase();
        }

        if regex::Regex::new(&self.dom.word_separator).is_err() {
            tracing::warn!(
                "word_separator '{}' 无效，已修正为 {}",
                self.dom.word_separator,
                constants::WORD_SEPARATOR
            );
            self.dom.word_separator = constants::WORD_SEPARATOR.to_string();
            corrections += 1;
        }

        corrections
    }

    /// 以持久化设置覆盖各语言的加粗长度
    pub fn with_language_overrides(&self, settings: &Settings) -> ReaderConfig {
        let mut config = self.clone();
        for language in &mut config.languages {
            if let Some(overrides) = settings.get(&language.code) {
                let bold_length = language.clamp_bold_length(overrides.bold_length);
                if bold_length != overrides.bold_length {
                    tracing::warn!(
                        "语言 {} 保存的 bold_length {} 超出 [{}, {}]，按 {} 处理",
                        language.code,
                        overrides.bold_length,
                        language.min_bold_length,
                        language.max_bold_length,
                        bold_length
                    );
                }
                language.bold_length = bold_length;
            }
        }
        config
    }

    /// 默认设置：每种语言当前的加粗长度
    pub fn default_settings(&self) -> Settings {
        self.languages
            .iter()
            .map(|language| {
                (
                    language.code.clone(),
                    LanguageSettings {
                        bold_length: language.bold_length,
                    },
                )
            })
            .collect()
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.performance.debounce_ms)
    }

    pub fn processing_time_threshold(&self) -> Duration {
        Duration::from_millis(self.performance.processing_time_threshold_ms)
    }
}

fn is_valid_tag_name(tag: &str) -> bool {
    !tag.is_empty()
        && tag.chars().next().is_some_and(|c| c.is_ascii_alphabetic())
        && tag.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
}
