use std::time::Duration;

use boutique_loadgen::session::WaitTime;
use boutique_loadgen::{SwarmConfig, run_swarm};
use boutique_logging::LoggerConfig;
use opentelemetry::trace::TracerProvider as _;
use opentelemetry_sdk::propagation::TraceContextPropagator;
use opentelemetry_sdk::trace::SdkTracerProvider;
use testkit::{CapturedWriter, MockStorefront, UNKNOWN_PRODUCT};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

const KNOWN_PATHS: [&str; 4] = ["/", "/setCurrency", "/cart", "/cart/checkout"];

fn swarm_config(host: String, users: usize, hacker: bool) -> SwarmConfig {
    SwarmConfig {
        host,
        users,
        spawn_rate: 100.0,
        run_time: Some(Duration::from_millis(600)),
        seed: 42,
        wait: WaitTime::between(Duration::from_millis(1), Duration::from_millis(5)).unwrap(),
        request_timeout: Duration::from_secs(5),
        standard_weight: u32::from(!hacker),
        hacker_weight: u32::from(hacker),
    }
}

#[tokio::test]
async fn standard_users_only_hit_storefront_routes() -> anyhow::Result<()> {
    let shop = MockStorefront::start().await?;
    let snapshot = run_swarm(
        swarm_config(shop.base_url(), 3, false),
        std::future::pending(),
    )
    .await?;

    let requests = shop.requests();
    assert!(!requests.is_empty());
    for req in &requests {
        assert!(
            KNOWN_PATHS.contains(&req.path.as_str()) || req.path.starts_with("/product/"),
            "unexpected path {}",
            req.path
        );
    }
    assert_eq!(snapshot.total.requests, requests.len() as u64);
    assert!(snapshot.get("GET /product/[id]").is_some());
    Ok(())
}

#[tokio::test]
async fn one_user_checks_out_with_a_single_identity() -> anyhow::Result<()> {
    let shop = MockStorefront::start().await?;
    let mut cfg = swarm_config(shop.base_url(), 1, false);
    cfg.run_time = Some(Duration::from_millis(1500));
    run_swarm(cfg, std::future::pending()).await?;

    let checkouts: Vec<_> = shop
        .requests()
        .into_iter()
        .filter(|r| r.path == "/cart/checkout")
        .collect();
    assert!(!checkouts.is_empty(), "no checkout within the run");
    let email = checkouts[0].form_value("email").unwrap().to_string();
    for checkout in &checkouts {
        assert_eq!(checkout.method, "POST");
        assert_eq!(checkout.form_value("email"), Some(email.as_str()));
        assert_eq!(checkout.form_value("credit_card_expiration_month"), Some("1"));
        assert_eq!(checkout.form_value("credit_card_expiration_year"), Some("2039"));
        assert_eq!(checkout.form_value("country"), Some("United States"));
    }
    Ok(())
}

#[tokio::test]
async fn hackers_request_the_unknown_product_and_fail() -> anyhow::Result<()> {
    opentelemetry::global::set_text_map_propagator(TraceContextPropagator::new());
    let writer = CapturedWriter::new();
    let provider = SdkTracerProvider::builder().build();
    let subscriber = LoggerConfig::new("loadgenerator")
        .with_default_directive("info")
        .into_subscriber(provider.tracer("swarm-test"), writer.clone());
    let _guard = tracing::subscriber::set_default(subscriber);

    let shop = MockStorefront::start().await?;
    let snapshot = run_swarm(
        swarm_config(shop.base_url(), 2, true),
        std::future::pending(),
    )
    .await?;

    let requests = shop.requests();
    assert!(!requests.is_empty());
    for req in &requests {
        assert_eq!(req.path, format!("/product/{UNKNOWN_PRODUCT}"));
        let traceparent = req.traceparent.as_deref().unwrap_or_default();
        assert!(traceparent.starts_with("00-"), "traceparent={traceparent:?}");
    }

    let product = snapshot.get("GET /product/[id]").unwrap();
    assert_eq!(product.requests, product.failures);
    assert_eq!(snapshot.entries.len(), 1);

    let failures: Vec<_> = writer
        .json_lines()
        .into_iter()
        .filter(|l| l["message"] == "request failed")
        .collect();
    assert_eq!(failures.len() as u64, product.failures);
    assert!(
        failures
            .iter()
            .all(|l| l["trace_id"] != boutique_core::ids::ZERO_TRACE_ID)
    );
    Ok(())
}

#[tokio::test]
async fn shutdown_future_stops_an_unbounded_run() -> anyhow::Result<()> {
    let shop = MockStorefront::start().await?;
    let mut cfg = swarm_config(shop.base_url(), 2, false);
    cfg.run_time = None;
    let snapshot = run_swarm(cfg, tokio::time::sleep(Duration::from_millis(300))).await?;
    assert_eq!(snapshot.total.requests, shop.requests().len() as u64);
    Ok(())
}

/// Answers every request with a 200 whose body ends early.
async fn truncating_storefront() -> anyhow::Result<String> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut buf = [0_u8; 8192];
                let _ = socket.read(&mut buf).await;
                let _ = socket
                    .write_all(b"HTTP/1.1 200 OK\r\ncontent-length: 64\r\n\r\npartial")
                    .await;
            });
        }
    });
    Ok(format!("http://{addr}"))
}

#[tokio::test]
async fn truncated_bodies_count_as_failures() -> anyhow::Result<()> {
    let host = truncating_storefront().await?;
    let mut cfg = swarm_config(host, 1, false);
    cfg.run_time = Some(Duration::from_millis(300));
    let snapshot = run_swarm(cfg, std::future::pending()).await?;

    assert!(snapshot.total.requests > 0);
    assert_eq!(snapshot.total.failures, snapshot.total.requests);
    Ok(())
}
