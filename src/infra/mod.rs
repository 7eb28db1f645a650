//! 基础设施：Prometheus 指标

pub mod metrics;
