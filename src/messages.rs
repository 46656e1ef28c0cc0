//! 控制消息
//!
//! 弹出窗口和后台发给页面的请求，以及页面的应答。JSON 形态以 `type` 字段区分：
//!
//! ```json
//! { "type": "updateLanguageSettings", "language": "ru", "boldLength": 4 }
//! ```

use serde::{Deserialize, Serialize};

use crate::engine::stats::Stats;
use crate::engine::PassSummary;
use crate::error::ReaderResult;

/// 请求消息
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Message {
    /// 清空已处理集合并重新处理整个文档
    RequestReprocess,
    /// 保存关闭状态并移除所有强调标记
    RequestDisable,
    /// 保存启用状态并处理整个文档
    RequestEnable,
    /// 查询启用标志
    RequestState,
    GetStats,
    ResetStats,
    #[serde(rename_all = "camelCase")]
    UpdateLanguageSettings { language: String, bold_length: usize },
}

/// 应答
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Response {
    Ack,
    State { enabled: bool },
    Stats(Stats),
    Pass(PassSummary),
}

impl Message {
    pub fn from_json(json: &str) -> ReaderResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> ReaderResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

impl Response {
    pub fn to_json(&self) -> ReaderResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}
