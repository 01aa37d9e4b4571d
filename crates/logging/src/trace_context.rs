use boutique_core::ids::{SpanId, TraceId};
use opentelemetry::trace::{self as otel, TraceContextExt};
use tracing_opentelemetry::OtelData;
use tracing_subscriber::registry::{LookupSpan, SpanRef};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TraceContext {
    pub trace_id: TraceId,
    pub span_id: SpanId,
}

impl TraceContext {
    /// Reads the ids `tracing-opentelemetry` assigned to `span`.
    ///
    /// A valid parent context (a parent span, or a remote caller set with
    /// `set_parent`) owns the trace id; only root spans use their own.
    pub fn from_span<S>(span: &SpanRef<'_, S>) -> Self
    where
        S: for<'a> LookupSpan<'a>,
    {
        let extensions = span.extensions();
        let Some(otel_data) = extensions.get::<OtelData>() else {
            return Self::default();
        };

        let parent = otel_data.parent_cx.span();
        let parent_trace = parent.span_context().trace_id();
        let trace_id = if parent_trace != otel::TraceId::INVALID {
            parent_trace
        } else {
            otel_data.builder.trace_id.unwrap_or(otel::TraceId::INVALID)
        };
        let span_id = otel_data.builder.span_id.unwrap_or(otel::SpanId::INVALID);
        Self::from_otel(trace_id, span_id)
    }

    pub fn from_otel(trace_id: otel::TraceId, span_id: otel::SpanId) -> Self {
        Self {
            trace_id: TraceId::from_u128(u128::from_be_bytes(trace_id.to_bytes())),
            span_id: SpanId::from_u64(u64::from_be_bytes(span_id.to_bytes())),
        }
    }

    pub fn is_zero(&self) -> bool {
        self.trace_id.is_zero() && self.span_id.is_zero()
    }
}
