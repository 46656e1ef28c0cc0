//! 语言检测
//!
//! 不使用词典：每种语言由一个字符类正则描述，按配置顺序逐一测试，先匹配者胜出。
//! 检测对整个单词进行（单词中任一字符落入字符类即匹配），因此 `«тест»` 这类被标点包围的
//! 单词也能识别；都不匹配时返回配置的默认语言。

use regex::Regex;

use crate::config::{LanguageConfig, ReaderConfig};

/// 已编译的语言条目
#[derive(Debug, Clone)]
pub struct Language {
    pub code: String,
    detector: Option<Regex>,
    pub bold_length: usize,
    pub min_bold_length: usize,
    pub max_bold_length: usize,
}

impl Language {
    pub fn from_config(config: &LanguageConfig) -> Result<Self, regex::Error> {
        Ok(Self {
            code: config.code.clone(),
            detector: Some(Regex::new(&config.pattern)?),
            bold_length: config.bold_length,
            min_bold_length: config.min_bold_length,
            max_bold_length: config.max_bold_length,
        })
    }

    /// 语言表中找不到代码时使用的条目，不匹配任何字符
    pub fn fallback(code: &str, bold_length: usize) -> Self {
        Self {
            code: code.to_string(),
            detector: None,
            bold_length,
            min_bold_length: 1,
            max_bold_length: usize::MAX,
        }
    }

    pub fn matches(&self, word: &str) -> bool {
        self.detector
            .as_ref()
            .is_some_and(|detector| detector.is_match(word))
    }

    pub fn matches_char(&self, c: char) -> bool {
        let mut buf = [0u8; 4];
        self.matches(c.encode_utf8(&mut buf))
    }
}

/// 语言分类器
#[derive(Debug, Clone)]
pub struct LanguageClassifier {
    languages: Vec<Language>,
    default_code: String,
    fallback: Language,
}

impl LanguageClassifier {
    pub fn new(config: &ReaderConfig) -> Self {
        let languages = config
            .languages
            .iter()
            .filter_map(|language| match Language::from_config(language) {
                Ok(compiled) => Some(compiled),
                Err(e) => {
                    tracing::warn!(
                        "语言 {} 的检测模式 '{}' 无效，已跳过: {}",
                        language.code,
                        language.pattern,
                        e
                    );
                    None
                }
            })
            .collect();

        Self {
            languages,
            default_code: config.default_language.clone(),
            fallback: Language::fallback(&config.default_language, config.default_bold_length),
        }
    }

    /// 检测单词的语言代码
    pub fn detect(&self, word: &str) -> &str {
        self.languages
            .iter()
            .find(|language| language.matches(word))
            .map(|language| language.code.as_str())
            .unwrap_or(self.default_code.as_str())
    }

    /// 检测单个字符的语言代码
    pub fn detect_char(&self, c: char) -> &str {
        self.languages
            .iter()
            .find(|language| language.matches_char(c))
            .map(|language| language.code.as_str())
            .unwrap_or(self.default_code.as_str())
    }

    /// 按代码查找语言，缺失时返回以默认加粗长度构造的条目
    pub fn language(&self, code: &str) -> &Language {
        self.languages
            .iter()
            .find(|language| language.code == code)
            .unwrap_or(&self.fallback)
    }

    pub fn languages(&self) -> &[Language] {
        &self.languages
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> LanguageClassifier {
        LanguageClassifier::new(&ReaderConfig::default())
    }

    #[test]
    fn test_detect_languages() {
        let classifier = classifier();
        assert_eq!(classifier.detect("тест"), "ru");
        assert_eq!(classifier.detect("test"), "en");
        assert_eq!(classifier.detect("«Ёлка»"), "ru");
        assert_eq!(classifier.detect("42"), "en");
    }

    #[test]
    fn test_priority_order() {
        // 两种字符都有时，排在前面的语言胜出
        let classifier = classifier();
        assert_eq!(classifier.detect("testтест"), "ru");
    }

    #[test]
    fn test_detect_char() {
        let classifier = classifier();
        assert_eq!(classifier.detect_char('ж'), "ru");
        assert_eq!(classifier.detect_char('q'), "en");
        assert_eq!(classifier.detect_char('字'), "en");
    }

    #[test]
    fn test_invalid_pattern_is_skipped() {
        let mut config = ReaderConfig::default();
        config.languages[0].pattern = "[unclosed".to_string();
        let classifier = LanguageClassifier::new(&config);

        assert_eq!(classifier.languages().len(), 1);
        assert_eq!(classifier.detect("тест"), "en");
    }

    #[test]
    fn test_missing_default_language_uses_fallback() {
        let mut config = ReaderConfig::default();
        config.default_language = "xx".to_string();
        config.default_bold_length = 4;
        let classifier = LanguageClassifier::new(&config);

        let language = classifier.language(classifier.detect("123"));
        assert_eq!(language.code, "xx");
        assert_eq!(language.bold_length, 4);
        assert!(!language.matches("abc"));
    }
}
