//! 键值存储
//!
//! 启用标志、统计记录和按语言设置都保存在一个异步键值存储里。存储失败从不中断处理：
//! 读失败回退到安全默认值（启用标志回退为关闭），写失败只记录日志。

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use crate::config::constants::keys;
use crate::config::{LanguageSettings, ReaderConfig, Settings};
use crate::engine::stats::Stats;
use crate::error::{ReaderError, ReaderResult};

/// 异步键值存储
#[allow(async_fn_in_trait)]
pub trait KeyValueStore {
    async fn get(&self, key: &str) -> ReaderResult<Option<Value>>;
    async fn set(&self, key: &str, value: Value) -> ReaderResult<()>;
    async fn remove(&self, key: &str) -> ReaderResult<()>;
}

/// 内存存储
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: RefCell<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_values<I>(values: I) -> Self
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        Self {
            values: RefCell::new(values.into_iter().collect()),
        }
    }

    pub fn snapshot(&self) -> HashMap<String, Value> {
        self.values.borrow().clone()
    }
}

impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> ReaderResult<Option<Value>> {
        Ok(self.values.borrow().get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> ReaderResult<()> {
        self.values.borrow_mut().insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> ReaderResult<()> {
        self.values.borrow_mut().remove(key);
        Ok(())
    }
}

/// 以单个 JSON 对象文件保存的存储
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_all(&self) -> ReaderResult<Map<String, Value>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => return Err(e.into()),
        };
        if content.trim().is_empty() {
            return Ok(Map::new());
        }

        match serde_json::from_str(&content)? {
            Value::Object(map) => Ok(map),
            _ => Err(ReaderError::Storage(format!(
                "{} 不是 JSON 对象",
                self.path.display()
            ))),
        }
    }

    async fn write_all(&self, map: Map<String, Value>) -> ReaderResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let content = serde_json::to_string_pretty(&Value::Object(map))?;
        tokio::fs::write(&self.path, content).await?;
        Ok(())
    }
}

impl KeyValueStore for JsonFileStore {
    async fn get(&self, key: &str) -> ReaderResult<Option<Value>> {
        Ok(self.read_all().await?.remove(key))
    }

    async fn set(&self, key: &str, value: Value) -> ReaderResult<()> {
        let mut map = self.read_all().await?;
        map.insert(key.to_string(), value);
        self.write_all(map).await
    }

    async fn remove(&self, key: &str) -> ReaderResult<()> {
        let mut map = self.read_all().await?;
        if map.remove(key).is_some() {
            self.write_all(map).await?;
        }
        Ok(())
    }
}

/// 读取启用标志；缺失时返回 `default_state`，读取失败时返回 `false`
pub async fn load_enabled<S: KeyValueStore>(store: &S, default_state: bool) -> bool {
    match store.get(keys::ENABLED).await {
        Ok(Some(Value::Bool(enabled))) => enabled,
        Ok(Some(other)) => {
            tracing::warn!("启用标志类型无效: {}，视为关闭", other);
            false
        }
        Ok(None) => default_state,
        Err(e) => {
            tracing::error!("读取启用标志失败: {}", e);
            false
        }
    }
}

pub async fn set_enabled<S: KeyValueStore>(store: &S, enabled: bool) -> ReaderResult<()> {
    store.set(keys::ENABLED, Value::Bool(enabled)).await
}

/// 读取按语言设置，与配置中的默认值合并
pub async fn load_settings<S: KeyValueStore>(store: &S, config: &ReaderConfig) -> Settings {
    let mut settings = config.default_settings();

    let stored = match store.get(keys::SETTINGS).await {
        Ok(Some(value)) => value,
        Ok(None) => return settings,
        Err(e) => {
            tracing::warn!("读取语言设置失败，使用默认值: {}", e);
            return settings;
        }
    };

    match serde_json::from_value::<Settings>(stored) {
        Ok(overrides) => settings.extend(overrides),
        Err(e) => tracing::warn!("语言设置格式无效，使用默认值: {}", e),
    }
    settings
}

/// 更新单个语言的加粗长度并保存，返回更新后的完整设置
pub async fn update_language_settings<S: KeyValueStore>(
    store: &S,
    config: &ReaderConfig,
    language: &str,
    bold_length: usize,
) -> ReaderResult<Settings> {
    let mut settings = load_settings(store, config).await;
    settings.insert(language.to_string(), LanguageSettings { bold_length });
    store
        .set(keys::SETTINGS, serde_json::to_value(&settings)?)
        .await?;
    tracing::info!("语言设置已更新: {} -> {}", language, bold_length);
    Ok(settings)
}

pub async fn load_stats<S: KeyValueStore>(store: &S) -> Option<Stats> {
    match store.get(keys::STATS).await {
        Ok(Some(value)) => match serde_json::from_value(value) {
            Ok(stats) => Some(stats),
            Err(e) => {
                tracing::warn!("统计记录格式无效: {}", e);
                None
            }
        },
        Ok(None) => None,
        Err(e) => {
            tracing::warn!("读取统计记录失败: {}", e);
            None
        }
    }
}

pub async fn save_stats<S: KeyValueStore>(store: &S, stats: &Stats) -> ReaderResult<()> {
    store.set(keys::STATS, serde_json::to_value(stats)?).await
}
