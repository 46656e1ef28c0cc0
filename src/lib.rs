//! # SmartReader Library
//!
//! “仿生阅读”引擎：把页面可见文本中每个单词的前几个字符包进强调标记（默认 `<b>`），
//! 帮助视线快速定位单词。
//!
//! ## 模块组织
//!
//! - `text` - 纯文本变换：语言检测、加粗长度策略、分词与标记
//! - `dom` - 可观察变更的 HTML 文档
//! - `engine` - 遍历、已处理集合、变更观察、统计以及组装它们的 [`SmartReader`]
//! - `storage` - 异步键值存储与类型化读写
//! - `messages` - 控制消息
//! - `config` / `env` - 配置与环境变量覆盖
//! - `error` - 错误类型
//!
//! ```no_run
//! use smartreader::{ReaderConfig, WordTransformer};
//!
//! let transformer = WordTransformer::new(&ReaderConfig::default());
//! assert_eq!(transformer.transform("test"), "<b>te</b>st");
//! ```

pub mod config;
pub mod dom;
pub mod engine;
pub mod env;
pub mod error;
pub mod messages;
pub mod storage;
pub mod text;

pub use config::{ReaderConfig, Settings};
pub use dom::Page;
pub use engine::{PassSummary, SmartReader, Stats};
pub use error::{ReaderError, ReaderResult};
pub use messages::{Message, Response};
pub use storage::{JsonFileStore, KeyValueStore, MemoryStore};
pub use text::WordTransformer;
