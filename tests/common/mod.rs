// 集成测试公共模块
//
// 提供测试辅助工具和共享功能

use std::rc::Rc;

use serde_json::Value;

use smartreader::dom::{find_nodes, serialize_document, text_content, Page};
use smartreader::error::{ReaderError, ReaderResult};
use smartreader::{KeyValueStore, MemoryStore, ReaderConfig, SmartReader};

/// 测试配置构建器
pub struct TestConfigBuilder {
    config: ReaderConfig,
}

impl TestConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: ReaderConfig::default(),
        }
    }

    pub fn with_marker(mut self, tag: &str) -> Self {
        self.config.dom.marker_tag = tag.to_string();
        self
    }

    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.config.processing.batch_size = size;
        self
    }

    pub fn with_debounce_ms(mut self, ms: u64) -> Self {
        self.config.performance.debounce_ms = ms;
        self
    }

    pub fn with_threshold_ms(mut self, ms: u64) -> Self {
        self.config.performance.processing_time_threshold_ms = ms;
        self
    }

    pub fn with_default_state(mut self, enabled: bool) -> Self {
        self.config.storage.default_state = enabled;
        self
    }

    pub fn build(mut self) -> ReaderConfig {
        self.config.validate();
        self.config
    }
}

/// HTML 测试辅助
pub struct HtmlTestHelper;

impl HtmlTestHelper {
    pub fn page(html: &str) -> Rc<Page> {
        Rc::new(Page::parse(html).expect("test html parses"))
    }

    /// 第 `index` 个 `tag` 元素
    pub fn element(page: &Page, tag: &str, index: usize) -> markup5ever_rcdom::Handle {
        find_nodes(page.document(), &[tag]).remove(index)
    }

    /// 第一个 `tag` 元素的内部 HTML
    pub fn inner_html(page: &Page, tag: &str) -> String {
        let node = Self::element(page, tag, 0);
        String::from_utf8(serialize_document(&node, "").expect("serializes")).expect("utf-8")
    }

    pub fn body_text(page: &Page) -> String {
        text_content(&page.body())
    }

    pub fn count_tags(page: &Page, tag: &str) -> usize {
        find_nodes(page.document(), &[tag]).len()
    }
}

pub fn reader(html: &str, config: ReaderConfig) -> SmartReader<MemoryStore> {
    SmartReader::new(HtmlTestHelper::page(html), config, MemoryStore::new())
}

/// 所有操作都失败的存储
#[derive(Debug, Default)]
pub struct FailingStore;

impl KeyValueStore for FailingStore {
    async fn get(&self, key: &str) -> ReaderResult<Option<Value>> {
        Err(ReaderError::Storage(format!("无法读取 {}", key)))
    }

    async fn set(&self, key: &str, _value: Value) -> ReaderResult<()> {
        Err(ReaderError::Storage(format!("无法写入 {}", key)))
    }

    async fn remove(&self, key: &str) -> ReaderResult<()> {
        Err(ReaderError::Storage(format!("无法删除 {}", key)))
    }
}
