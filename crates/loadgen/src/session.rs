use std::sync::Arc;
use std::time::{Duration, Instant};

use boutique_core::error::{BoutiqueError, Result};
use opentelemetry::propagation::Injector;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;
use reqwest::Client;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use tokio::sync::watch;
use tracing::Instrument;
use tracing_opentelemetry::OpenTelemetrySpanExt;

use crate::behavior::{Action, Catalog, HttpMethod, PlannedRequest, Profile};
use crate::identity::CheckoutProfile;
use crate::stats::Stats;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitTime {
    pub min: Duration,
    pub max: Duration,
}

impl WaitTime {
    pub fn between(min: Duration, max: Duration) -> Result<Self> {
        if min > max {
            return Err(BoutiqueError::Config(format!(
                "wait time minimum {min:?} exceeds maximum {max:?}"
            )));
        }
        Ok(Self { min, max })
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        if self.min == self.max {
            self.min
        } else {
            rng.gen_range(self.min..=self.max)
        }
    }
}

#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub base_url: String,
    pub wait: WaitTime,
    pub request_timeout: Duration,
}

pub struct UserSession {
    index: usize,
    profile: Profile,
    identity: CheckoutProfile,
    rng: Pcg64,
    client: Client,
    catalog: Arc<Catalog>,
    settings: Arc<SessionSettings>,
    stats: Arc<Stats>,
}

impl UserSession {
    pub fn start(
        index: usize,
        profile: Profile,
        seed: u64,
        catalog: Arc<Catalog>,
        settings: Arc<SessionSettings>,
        stats: Arc<Stats>,
    ) -> Result<Self> {
        let client = Client::builder()
            .cookie_store(true)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|e| BoutiqueError::Http(format!("build http client: {e}")))?;
        let mut rng = Pcg64::seed_from_u64(seed);
        let identity = CheckoutProfile::generate(&mut rng);

        Ok(Self {
            index,
            profile,
            identity,
            rng,
            client,
            catalog,
            settings,
            stats,
        })
    }

    pub async fn run(mut self, mut stop: watch::Receiver<bool>) {
        tracing::debug!(user = self.index, profile = %self.profile, "user session started");
        loop {
            if *stop.borrow() {
                break;
            }

            let action = self.catalog.choose_action(self.profile, &mut self.rng);
            self.execute(action).await;

            let pause = self.settings.wait.sample(&mut self.rng);
            tokio::select! {
                _ = tokio::time::sleep(pause) => {}
                _ = stop.changed() => break,
            }
        }
        tracing::debug!(user = self.index, "user session stopped");
    }

    async fn execute(&mut self, action: Action) {
        let requests = self
            .catalog
            .plan(action, &mut self.rng, &self.identity);
        let span = tracing::info_span!(
            "user_action",
            action = action.name(),
            user = self.index,
            profile = %self.profile,
        );

        async {
            for request in &requests {
                self.send(request).await;
            }
        }
        .instrument(span)
        .await
    }

    async fn send(&self, request: &PlannedRequest) {
        let url = format!("{}{}", self.settings.base_url, request.path);
        let builder = match request.method {
            HttpMethod::Get => self.client.get(&url),
            HttpMethod::Post => self.client.post(&url).form(&request.form),
        };

        let started = Instant::now();
        let outcome = match builder.headers(trace_headers()).send().await {
            Ok(response) => {
                let status = response.status();
                // drain the body so the timing covers the full response
                match response.bytes().await {
                    Err(err) => Err(format!("read body: {err}")),
                    Ok(_) if status.is_success() || status.is_redirection() => Ok(()),
                    Ok(_) => Err(format!("HTTP {status}")),
                }
            }
            Err(err) => Err(err.to_string()),
        };
        let elapsed = started.elapsed();

        self.stats
            .record(&request.stats_name(), elapsed, outcome.is_ok());
        if let Err(reason) = outcome {
            tracing::warn!(
                user = self.index,
                method = %request.method,
                path = %request.path,
                error = %reason,
                "request failed"
            );
        }
    }
}

fn trace_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    let cx = tracing::Span::current().context();
    opentelemetry::global::get_text_map_propagator(|propagator| {
        propagator.inject_context(&cx, &mut HeaderInjector(&mut headers));
    });
    headers
}

struct HeaderInjector<'a>(&'a mut HeaderMap);

impl Injector for HeaderInjector<'_> {
    fn set(&mut self, key: &str, value: String) {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(key.as_bytes()),
            HeaderValue::from_str(&value),
        ) {
            self.0.insert(name, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wait_time_stays_in_bounds() {
        let wait = WaitTime::between(Duration::from_secs(1), Duration::from_secs(10)).unwrap();
        let mut rng = Pcg64::seed_from_u64(9);
        for _ in 0..1000 {
            let pause = wait.sample(&mut rng);
            assert!(pause >= Duration::from_secs(1));
            assert!(pause <= Duration::from_secs(10));
        }
    }

    #[test]
    fn fixed_wait_time_is_constant() {
        let wait = WaitTime::between(Duration::from_millis(5), Duration::from_millis(5)).unwrap();
        let mut rng = Pcg64::seed_from_u64(1);
        assert_eq!(wait.sample(&mut rng), Duration::from_millis(5));
    }

    #[test]
    fn inverted_wait_time_is_rejected() {
        assert!(WaitTime::between(Duration::from_secs(3), Duration::from_secs(1)).is_err());
    }

    #[test]
    fn injector_skips_invalid_header_names() {
        let mut headers = HeaderMap::new();
        let mut injector = HeaderInjector(&mut headers);
        injector.set("traceparent", "00-abc-def-01".to_string());
        injector.set("bad header", "x".to_string());
        assert_eq!(headers.len(), 1);
        assert_eq!(headers["traceparent"], "00-abc-def-01");
    }
}
