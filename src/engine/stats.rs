//! 处理统计

use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// 持久化的统计记录
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub total_processed: u64,
    /// 毫秒
    pub last_processing_time: f64,
    /// 毫秒
    pub average_processing_time: f64,
    /// 会话开始时间（Unix 毫秒）
    pub session_start_time: i64,
}

impl Stats {
    /// 从当前时刻开始的空记录
    pub fn new() -> Self {
        Self::started_at(now_millis())
    }

    pub fn started_at(session_start_time: i64) -> Self {
        Self {
            total_processed: 0,
            last_processing_time: 0.0,
            average_processing_time: 0.0,
            session_start_time,
        }
    }
}

impl Default for Stats {
    fn default() -> Self {
        Self::new()
    }
}

pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// 统计收集器
///
/// 耗时不低于阈值的遍历不计入统计。平均耗时是按遍历次数计算的滑动平均，
/// 次数只保存在内存中，从存储恢复时以已有平均值作为第一次样本。
#[derive(Debug, Clone)]
pub struct StatsCollector {
    stats: Stats,
    passes: u64,
    threshold: Duration,
}

impl StatsCollector {
    pub fn new(threshold: Duration) -> Self {
        Self::with_stats(Stats::new(), threshold)
    }

    pub fn with_stats(stats: Stats, threshold: Duration) -> Self {
        let passes = u64::from(stats.total_processed > 0);
        Self {
            stats,
            passes,
            threshold,
        }
    }

    pub fn stats(&self) -> Stats {
        self.stats
    }

    /// 记录一次遍历，返回是否计入
    pub fn record(&mut self, count: usize, elapsed: Duration) -> bool {
        if elapsed >= self.threshold {
            tracing::debug!("遍历耗时 {:?} 超过阈值 {:?}，不计入统计", elapsed, self.threshold);
            return false;
        }

        let millis = elapsed.as_secs_f64() * 1000.0;
        let passes = self.passes as f64;
        self.stats.total_processed += count as u64;
        self.stats.last_processing_time = millis;
        self.stats.average_processing_time =
            (self.stats.average_processing_time * passes + millis) / (passes + 1.0);
        self.passes += 1;
        true
    }

    /// 清零并开始新的会话
    pub fn reset(&mut self) -> Stats {
        self.stats = Stats::new();
        self.passes = 0;
        self.stats
    }
}

/// 把会话时长格式化为 `"1h 5m"`，开始时间无效时返回空串
pub fn format_session_time(start: i64, now: i64) -> String {
    const MINUTE: i64 = 60 * 1000;
    const HOUR: i64 = 60 * MINUTE;

    if start <= 0 || now - start <= 0 {
        return String::new();
    }

    let diff = now - start;
    let hours = diff / HOUR;
    let minutes = (diff % HOUR) / MINUTE;
    format!("{}h {}m", hours, minutes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_accumulates() {
        let mut collector = StatsCollector::new(Duration::from_millis(1000));
        assert!(collector.record(3, Duration::from_millis(10)));
        assert!(collector.record(2, Duration::from_millis(30)));

        let stats = collector.stats();
        assert_eq!(stats.total_processed, 5);
        assert!((stats.last_processing_time - 30.0).abs() < 1e-9);
        assert!((stats.average_processing_time - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_slow_pass_is_ignored() {
        let mut collector = StatsCollector::new(Duration::from_millis(100));
        assert!(!collector.record(7, Duration::from_millis(100)));
        assert_eq!(collector.stats().total_processed, 0);
    }

    #[test]
    fn test_reset() {
        let mut collector = StatsCollector::new(Duration::from_secs(1));
        collector.record(4, Duration::from_millis(5));
        let stats = collector.reset();
        assert_eq!(stats.total_processed, 0);
        assert_eq!(stats.average_processing_time, 0.0);
        assert!(stats.session_start_time > 0);
    }

    #[test]
    fn test_format_session_time() {
        let start = 1_000_000;
        let now = start + 65 * 60 * 1000 + 59_000;
        assert_eq!(format_session_time(start, now), "1h 5m");
        assert_eq!(format_session_time(start, start + 30_000), "0h 0m");
        assert_eq!(format_session_time(0, now), "");
        assert_eq!(format_session_time(now, start), "");
    }

    #[test]
    fn test_stats_json_shape() {
        let json = serde_json::to_value(Stats::started_at(42)).unwrap();
        assert_eq!(json["totalProcessed"], 0);
        assert_eq!(json["sessionStartTime"], 42);
    }
}
