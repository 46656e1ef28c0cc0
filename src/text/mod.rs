//! 文本变换模块
//!
//! 纯函数部分，不涉及任何 I/O：
//!
//! - `language`: 基于字符类的语言检测
//! - `policy`: 加粗长度策略（固定长度 / 百分比）
//! - `transformer`: 分词、加粗前缀、去除强调标记

pub mod language;
pub mod policy;
pub mod transformer;

pub use language::{Language, LanguageClassifier};
pub use policy::{BoldLengthPolicy, FixedLengthPolicy, PercentagePolicy};
pub use transformer::{split_word, BoldSpec, Segment, Token, WordTransformer};
