//! 加粗长度策略
//!
//! 两种策略实现同一个 trait，调用方无需关心配置选择了哪一种。
//! 长度一律按字符（而不是字节）计算，结果满足 `0 <= n <= chars(word)`。

use std::fmt;

use crate::config::{PercentageConfig, PolicyKind, ReaderConfig};

use super::language::Language;

/// 计算单词开头需要加粗的字符数
pub trait BoldLengthPolicy: fmt::Debug {
    fn bold_length(&self, word: &str, language: &Language) -> usize;
}

/// 固定长度策略
///
/// 比配置长度更长的单词加粗 `language.bold_length` 个字符；不长于配置长度的短单词
/// 最多加粗一半（`ceil(len / 2)`）。因此只有单字符单词会被整体加粗。
///
/// 注意这与 `min(bold_length, ceil(len / 2))` 不同：长于 `bold_length` 的单词不再受
/// 半长上限约束。`len` 落在 `(bold_length, 2 * bold_length - 1)` 区间时加粗会超过一半，
/// 例如 `bold_length = 3` 时 `тест` 加粗 3 个字符（`тес` + `т`），而不是 2 个。
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedLengthPolicy;

impl BoldLengthPolicy for FixedLengthPolicy {
    fn bold_length(&self, word: &str, language: &Language) -> usize {
        fixed_length(word.chars().count(), language)
    }
}

fn fixed_length(len: usize, language: &Language) -> usize {
    if len == 0 {
        return 0;
    }
    if len > language.bold_length {
        language.bold_length
    } else {
        language.bold_length.min(len.div_ceil(2))
    }
}

/// 百分比策略：长单词按比例加粗，短单词退回固定长度
#[derive(Debug, Clone)]
pub struct PercentagePolicy {
    config: PercentageConfig,
}

impl PercentagePolicy {
    pub fn new(config: PercentageConfig) -> Self {
        Self { config }
    }
}

impl BoldLengthPolicy for PercentagePolicy {
    fn bold_length(&self, word: &str, language: &Language) -> usize {
        let len = word.chars().count();
        if len == 0 {
            return 0;
        }

        if len <= self.config.long_word_threshold {
            return fixed_length(len, language)
                .min(len)
                .min(language.max_bold_length);
        }

        let percent_length = ceil_fraction(len, self.config.bold_percentage);
        let min_length =
            ceil_fraction(len, self.config.min_bold_percentage).max(language.min_bold_length);
        let max_length =
            ceil_fraction(len, self.config.max_bold_percentage).min(language.max_bold_length);

        // min > max 时以 max 为准
        percent_length.max(min_length).min(max_length).min(len)
    }
}

/// `ceil(len * fraction)`，容忍浮点乘法的末位误差
fn ceil_fraction(len: usize, fraction: f64) -> usize {
    let product = len as f64 * fraction;
    if !product.is_finite() || product <= 0.0 {
        return 0;
    }
    (product - 1e-9).ceil() as usize
}

/// 根据配置构造策略
pub fn policy_for(config: &ReaderConfig) -> Box<dyn BoldLengthPolicy> {
    match config.policy {
        PolicyKind::Fixed => Box::new(FixedLengthPolicy),
        PolicyKind::Percentage => Box::new(PercentagePolicy::new(config.percentage.clone())),
    }
}
