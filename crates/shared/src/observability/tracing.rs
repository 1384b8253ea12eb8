//! 日志与追踪初始化
//!
//! 领取链路的日志通过 `tracing-subscriber` 输出；配置了 OTLP 端点时，
//! span 同时导出到追踪后端，HTTP 中间件据此把 trace ID 回写到响应头。

use anyhow::Result;
use opentelemetry::trace::{TraceContextExt, TracerProvider as _};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{
    Resource,
    trace::{Sampler, SdkTracerProvider},
};
use tracing_opentelemetry::OpenTelemetrySpanExt;
use tracing_subscriber::{
    EnvFilter, Layer, fmt, fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt,
};

use super::ObservabilityConfig;

/// 依赖库的默认日志级别，避免逐条 SQL 与连接日志淹没领取日志
const DEPENDENCY_DIRECTIVES: &[&str] = &["sqlx::query=warn", "hyper=warn", "h2=warn", "tower=warn"];

/// 追踪资源守卫，Drop 时刷新并关闭 span 导出
pub struct TracingGuard {
    provider: Option<SdkTracerProvider>,
}

impl Drop for TracingGuard {
    fn drop(&mut self) {
        if let Some(provider) = self.provider.take()
            && let Err(e) = provider.shutdown()
        {
            eprintln!("关闭追踪导出失败: {e:?}");
        }
    }
}

/// 初始化日志与追踪
///
/// `RUST_LOG` 优先于配置中的 `log_level`。
pub fn init(config: &ObservabilityConfig) -> Result<TracingGuard> {
    let filter = match std::env::var(EnvFilter::DEFAULT_ENV) {
        Ok(directives) if !directives.trim().is_empty() => build_filter(&directives),
        _ => build_filter(&config.log_level),
    };

    let fmt_layer = if config.json_logs {
        fmt::layer()
            .json()
            .with_span_events(FmtSpan::CLOSE)
            .with_current_span(true)
            .boxed()
    } else {
        fmt::layer().with_target(true).boxed()
    };

    let provider = config
        .otlp_endpoint
        .as_deref()
        .map(|endpoint| span_exporter_provider(&config.service_name, endpoint))
        .transpose()?;
    let otel_layer = provider.as_ref().map(|provider| {
        tracing_opentelemetry::layer().with_tracer(provider.tracer(config.service_name.clone()))
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .with(otel_layer)
        .try_init()?;

    Ok(TracingGuard { provider })
}

/// 由日志级别构造过滤器，非法指令回退到 info
fn build_filter(directives: &str) -> EnvFilter {
    let base = EnvFilter::try_new(directives).unwrap_or_else(|_| EnvFilter::new("info"));
    DEPENDENCY_DIRECTIVES
        .iter()
        .filter(|d| {
            let target = d.split('=').next().unwrap_or_default();
            !directives.contains(target)
        })
        .filter_map(|d| d.parse().ok())
        .fold(base, EnvFilter::add_directive)
}

/// 构造 OTLP span 导出
///
/// 采样跟随上游 traceparent，无上游时全量采样。
fn span_exporter_provider(service_name: &str, endpoint: &str) -> Result<SdkTracerProvider> {
    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()?;

    let provider = SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .with_sampler(Sampler::ParentBased(Box::new(Sampler::AlwaysOn)))
        .with_resource(
            Resource::builder()
                .with_service_name(service_name.to_string())
                .build(),
        )
        .build();

    opentelemetry::global::set_tracer_provider(provider.clone());
    Ok(provider)
}

/// 当前 span 的 trace ID，未启用导出时为 None
pub fn current_trace_id() -> Option<String> {
    let context = tracing::Span::current().context();
    let span = context.span();
    let span_context = span.span_context();
    span_context
        .is_valid()
        .then(|| span_context.trace_id().to_string())
}
