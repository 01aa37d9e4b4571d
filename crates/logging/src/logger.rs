use std::sync::{Mutex, OnceLock};

use opentelemetry::trace::TracerProvider as _;
use opentelemetry_sdk::Resource;
use opentelemetry_sdk::propagation::TraceContextPropagator;
use opentelemetry_sdk::trace::{SdkTracerProvider, Tracer};
use tracing::Subscriber;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;

use crate::layer::JsonLogLayer;

const OTEL_DIRECTIVES: [&str; 3] = [
    "opentelemetry=warn",
    "opentelemetry_sdk=warn",
    "opentelemetry_otlp=warn",
];

#[derive(Debug, Clone)]
pub struct LoggerConfig {
    pub name: String,
    pub default_directive: String,
}

impl LoggerConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default_directive: "info".to_string(),
        }
    }

    pub fn with_default_directive(mut self, directive: impl Into<String>) -> Self {
        self.default_directive = directive.into();
        self
    }

    pub fn env_filter(&self) -> EnvFilter {
        if let Ok(filter) = EnvFilter::try_from_default_env() {
            return filter;
        }
        OTEL_DIRECTIVES
            .iter()
            .filter_map(|directive| directive.parse::<Directive>().ok())
            .fold(EnvFilter::new(&self.default_directive), |filter, directive| {
                filter.add_directive(directive)
            })
    }

    pub fn into_subscriber<W>(
        self,
        tracer: Tracer,
        make_writer: W,
    ) -> impl Subscriber + Send + Sync + for<'a> LookupSpan<'a> + 'static
    where
        W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
    {
        let filter = self.env_filter();
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_opentelemetry::layer().with_tracer(tracer))
            .with(
                JsonLogLayer::new()
                    .with_name(self.name)
                    .with_writer(make_writer),
            )
    }

    /// Installs the JSON logger on stdout as the global subscriber.
    ///
    /// Returns `false` when a global subscriber already exists; the existing one is kept.
    pub fn init(self) -> bool {
        let provider = tracer_provider(&self.name);
        let tracer = provider.tracer(self.name.clone());

        if self
            .into_subscriber(tracer, std::io::stdout)
            .try_init()
            .is_err()
        {
            let _ = provider.shutdown();
            return false;
        }

        opentelemetry::global::set_text_map_propagator(TraceContextPropagator::new());
        opentelemetry::global::set_tracer_provider(provider.clone());
        if let Ok(mut slot) = provider_slot().lock() {
            *slot = Some(provider);
        }
        true
    }
}

pub fn json_logger(name: &str) -> bool {
    LoggerConfig::new(name).init()
}

pub fn tracer_provider(service_name: &str) -> SdkTracerProvider {
    let resource = Resource::builder()
        .with_service_name(service_name.to_string())
        .build();
    let builder = SdkTracerProvider::builder().with_resource(resource);

    if std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT").is_err() {
        return builder.build();
    }

    match opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .build()
    {
        Ok(exporter) => builder.with_batch_exporter(exporter).build(),
        Err(err) => {
            eprintln!("otlp span exporter unavailable, spans stay local: {err}");
            builder.build()
        }
    }
}

pub fn shutdown_tracing() {
    if let Some(provider) = provider_slot()
        .lock()
        .ok()
        .and_then(|mut slot| slot.take())
    {
        let _ = provider.shutdown();
    }
}

fn provider_slot() -> &'static Mutex<Option<SdkTracerProvider>> {
    static SLOT: OnceLock<Mutex<Option<SdkTracerProvider>>> = OnceLock::new();
    SLOT.get_or_init(|| Mutex::new(None))
}
