//! 单词变换器
//!
//! 把文本切分为单词和分隔符（空白串），为每个单词的前缀加上强调标记。
//!
//! - 分隔符原样保留，因此去掉标记后可以逐字节还原原文
//! - 强调总是加在前缀上，后缀从不加标记
//! - 除了序列化后的字符串，还可以得到结构化的 [`Segment`] 列表，DOM 回写时直接据此
//!   构造节点，不需要再解析标记

use std::sync::OnceLock;

use regex::Regex;

use crate::config::{constants, ReaderConfig};

use super::language::LanguageClassifier;
use super::policy::{policy_for, BoldLengthPolicy};

/// 分词结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token<'a> {
    Word(&'a str),
    Separator(&'a str),
}

impl<'a> Token<'a> {
    pub fn as_str(&self) -> &'a str {
        match self {
            Token::Word(s) | Token::Separator(s) => s,
        }
    }
}

/// 单词的加粗拆分，`start + end == word`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoldSpec<'a> {
    pub start: &'a str,
    pub end: &'a str,
}

/// 变换后的文本片段
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Plain(String),
    Emphasis(String),
}

impl Segment {
    pub fn text(&self) -> &str {
        match self {
            Segment::Plain(s) | Segment::Emphasis(s) => s,
        }
    }
}

/// 在第 `chars` 个字符处拆分单词，超出长度时整个单词都是 `start`
pub fn split_word(word: &str, chars: usize) -> BoldSpec<'_> {
    let offset = word
        .char_indices()
        .nth(chars)
        .map(|(index, _)| index)
        .unwrap_or(word.len());
    let (start, end) = word.split_at(offset);
    BoldSpec { start, end }
}

// 以下两个模式都是常量字面量，编译不会失败，只初始化一次
fn default_separator() -> &'static Regex {
    static SEPARATOR: OnceLock<Regex> = OnceLock::new();
    SEPARATOR.get_or_init(|| Regex::new(constants::WORD_SEPARATOR).unwrap())
}

fn default_marker_pattern() -> &'static Regex {
    static MARKER: OnceLock<Regex> = OnceLock::new();
    MARKER.get_or_init(|| Regex::new(&format!("</?{}>", constants::MARKER_TAG)).unwrap())
}

/// 单词变换器
#[derive(Debug)]
pub struct WordTransformer {
    classifier: LanguageClassifier,
    policy: Box<dyn BoldLengthPolicy>,
    separator: Regex,
    marker_tag: String,
    marker_pattern: Regex,
}

impl WordTransformer {
    pub fn new(config: &ReaderConfig) -> Self {
        let separator = Regex::new(&config.dom.word_separator).unwrap_or_else(|e| {
            tracing::warn!("分隔符模式无效，使用默认值: {}", e);
            default_separator().clone()
        });
        let marker_tag = config.dom.marker_tag.clone();
        let marker_pattern = Regex::new(&format!("</?{}>", regex::escape(&marker_tag)))
            .unwrap_or_else(|e| {
                tracing::warn!("标记模式无效，使用默认标记 {}: {}", constants::MARKER_TAG, e);
                default_marker_pattern().clone()
            });

        Self {
            classifier: LanguageClassifier::new(config),
            policy: policy_for(config),
            separator,
            marker_tag,
            marker_pattern,
        }
    }

    pub fn marker_tag(&self) -> &str {
        &self.marker_tag
    }

    pub fn classifier(&self) -> &LanguageClassifier {
        &self.classifier
    }

    /// 切分文本；所有 token 按顺序拼接即为原文
    pub fn tokenize<'a>(&self, text: &'a str) -> Vec<Token<'a>> {
        let mut tokens = Vec::new();
        let mut last = 0;

        for found in self.separator.find_iter(text) {
            if found.start() == found.end() {
                continue;
            }
            if found.start() > last {
                tokens.push(Token::Word(&text[last..found.start()]));
            }
            tokens.push(Token::Separator(found.as_str()));
            last = found.end();
        }

        if last < text.len() {
            tokens.push(Token::Word(&text[last..]));
        }

        tokens
    }

    /// 计算单词的加粗拆分
    pub fn bold_spec<'a>(&self, word: &'a str) -> BoldSpec<'a> {
        if word.is_empty() {
            return BoldSpec {
                start: "",
                end: word,
            };
        }
        let code = self.classifier.detect(word);
        let language = self.classifier.language(code);
        let length = self.policy.bold_length(word, language);
        split_word(word, length)
    }

    /// 变换为结构化片段，相邻的普通文本会被合并
    pub fn segments(&self, text: &str) -> Vec<Segment> {
        let mut segments = Vec::new();

        for token in self.tokenize(text) {
            match token {
                Token::Separator(separator) => push_plain(&mut segments, separator),
                Token::Word(word) => {
                    let spec = self.bold_spec(word);
                    if !spec.start.is_empty() {
                        segments.push(Segment::Emphasis(spec.start.to_string()));
                    }
                    push_plain(&mut segments, spec.end);
                }
            }
        }

        segments
    }

    /// 变换文本，返回带强调标记的字符串
    pub fn transform(&self, text: &str) -> String {
        self.render(&self.segments(text))
    }

    /// 变换单个单词
    pub fn transform_word(&self, word: &str) -> String {
        let spec = self.bold_spec(word);
        let mut out = String::with_capacity(word.len() + 2 * self.marker_tag.len() + 5);
        self.push_emphasis(&mut out, spec.start);
        out.push_str(spec.end);
        out
    }

    /// 把片段序列化为标记字符串
    pub fn render(&self, segments: &[Segment]) -> String {
        let mut out = String::new();
        for segment in segments {
            match segment {
                Segment::Plain(text) => out.push_str(text),
                Segment::Emphasis(text) => self.push_emphasis(&mut out, text),
            }
        }
        out
    }

    /// 去除所有强调标记
    pub fn remove_emphasis(&self, text: &str) -> String {
        self.marker_pattern.replace_all(text, "").into_owned()
    }

    fn push_emphasis(&self, out: &mut String, text: &str) {
        if text.is_empty() {
            return;
        }
        out.push('<');
        out.push_str(&self.marker_tag);
        out.push('>');
        out.push_str(text);
        out.push_str("</");
        out.push_str(&self.marker_tag);
        out.push('>');
    }
}

fn push_plain(segments: &mut Vec<Segment>, text: &str) {
    if text.is_empty() {
        return;
    }
    if let Some(Segment::Plain(last)) = segments.last_mut() {
        last.push_str(text);
    } else {
        segments.push(Segment::Plain(text.to_string()));
    }
}
