//! Prometheus 指标：触发次数、推送成功/失败数与处理耗时
//!
//! 通过 `init()` 安装全局 Recorder，通过 HTTP GET `/metrics` 暴露抓取端点。

use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::OnceLock;

static HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// 指标名称
const COUNTER_TRIGGERS_TOTAL: &str = "push_relay_triggers_total";
const COUNTER_PUSH_SENT: &str = "push_relay_push_sent_total";
const COUNTER_PUSH_FAILED: &str = "push_relay_push_failed_total";
const HISTOGRAM_TRIGGER_DURATION: &str = "push_relay_trigger_duration_seconds";

/// 初始化 Prometheus 指标（安装全局 Recorder，返回 Handle 用于 HTTP 暴露）。
/// 仅需在进程内调用一次；重复调用会返回 Err。
pub fn init() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let handle = metrics_exporter_prometheus::PrometheusBuilder::new().install_recorder()?;
    HANDLE
        .set(handle)
        .map_err(|_| "metrics already initialized")?;
    Ok(())
}

/// 是否已初始化（可供 /metrics 使用）
pub fn is_initialized() -> bool {
    HANDLE.get().is_some()
}

/// 渲染当前指标为 Prometheus 文本格式，供 GET /metrics 使用。
pub fn render_metrics() -> Option<String> {
    HANDLE.get().map(|h| h.render())
}

/// 记录一次触发：按集合与结果（skipped / sent / failed）计数 + 耗时直方图。
pub fn record_trigger(collection: &str, outcome: &'static str, duration_secs: f64) {
    metrics::counter!(
        COUNTER_TRIGGERS_TOTAL,
        "collection" => collection.to_string(),
        "outcome" => outcome
    )
    .increment(1);
    metrics::histogram!(HISTOGRAM_TRIGGER_DURATION, "collection" => collection.to_string())
        .record(duration_secs);
}

/// 记录推送结果（成功数 / 失败数）。
pub fn record_push(sent: usize, failed: usize) {
    metrics::counter!(COUNTER_PUSH_SENT).increment(sent as u64);
    metrics::counter!(COUNTER_PUSH_FAILED).increment(failed as u64);
}
