use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use boutique_core::config::Config;
use boutique_core::error::{BoutiqueError, Result};
use rand::SeedableRng;
use rand_pcg::Pcg64;
use tokio::sync::watch;
use tokio::task::JoinSet;

use crate::behavior::{Catalog, Profile};
use crate::session::{SessionSettings, UserSession, WaitTime};
use crate::stats::{Stats, StatsSnapshot};
use crate::weights::WeightedTable;

#[derive(Debug, Clone)]
pub struct SwarmConfig {
    pub host: String,
    pub users: usize,
    pub spawn_rate: f64,
    pub run_time: Option<Duration>,
    // User class draws use this seed; user `i` runs on `seed + i + 1`.
    pub seed: u64,
    pub wait: WaitTime,
    pub request_timeout: Duration,
    pub standard_weight: u32,
    pub hacker_weight: u32,
}

impl SwarmConfig {
    pub fn from_config(cfg: &Config) -> Result<Self> {
        cfg.validate()?;
        Ok(Self {
            host: cfg.host.trim_end_matches('/').to_string(),
            users: cfg.users,
            spawn_rate: cfg.spawn_rate,
            run_time: cfg.run_time,
            seed: cfg.seed.unwrap_or_else(rand::random),
            wait: WaitTime::between(cfg.wait_min, cfg.wait_max)?,
            request_timeout: cfg.request_timeout,
            standard_weight: cfg.standard_weight,
            hacker_weight: cfg.hacker_weight,
        })
    }

    fn spawn_interval(&self) -> Result<Duration> {
        if !self.spawn_rate.is_finite() || self.spawn_rate <= 0.0 {
            return Err(BoutiqueError::Config(format!(
                "spawn_rate must be positive (value={})",
                self.spawn_rate
            )));
        }
        Duration::try_from_secs_f64(1.0 / self.spawn_rate).map_err(|e| {
            BoutiqueError::Config(format!(
                "spawn_rate {} gives an unusable spawn interval: {e}",
                self.spawn_rate
            ))
        })
    }

    fn user_classes(&self) -> Result<WeightedTable<Profile>> {
        WeightedTable::new(
            vec![Profile::Standard, Profile::Hacker],
            vec![
                f64::from(self.standard_weight),
                f64::from(self.hacker_weight),
            ],
        )
    }
}

pub async fn run_swarm<F>(cfg: SwarmConfig, shutdown: F) -> Result<StatsSnapshot>
where
    F: Future<Output = ()>,
{
    let interval = cfg.spawn_interval()?;
    let catalog = Arc::new(Catalog::new()?);
    let classes = cfg.user_classes()?;
    let stats = Arc::new(Stats::new());
    let settings = Arc::new(SessionSettings {
        base_url: cfg.host.clone(),
        wait: cfg.wait,
        request_timeout: cfg.request_timeout,
    });
    let (stop_tx, stop_rx) = watch::channel(false);

    tracing::info!(
        host = %cfg.host,
        users = cfg.users,
        spawn_rate = cfg.spawn_rate,
        seed = cfg.seed,
        "starting load generation"
    );

    let spawner = tokio::spawn(spawn_users(
        cfg.clone(),
        interval,
        classes,
        catalog,
        settings,
        stats.clone(),
        stop_rx,
    ));

    let deadline = async {
        match cfg.run_time {
            Some(run_time) => tokio::time::sleep(run_time).await,
            None => std::future::pending::<()>().await,
        }
    };
    tokio::select! {
        _ = deadline => tracing::info!("run time elapsed, stopping users"),
        _ = shutdown => tracing::info!("shutdown requested, stopping users"),
    }

    let _ = stop_tx.send(true);
    spawner
        .await
        .map_err(|e| BoutiqueError::Internal(format!("user spawner failed: {e}")))?;

    let snapshot = stats.snapshot();
    tracing::info!(
        requests = snapshot.total.requests,
        failures = snapshot.total.failures,
        "load generation finished"
    );
    Ok(snapshot)
}

async fn spawn_users(
    cfg: SwarmConfig,
    interval: Duration,
    classes: WeightedTable<Profile>,
    catalog: Arc<Catalog>,
    settings: Arc<SessionSettings>,
    stats: Arc<Stats>,
    mut stop: watch::Receiver<bool>,
) {
    let mut class_rng = Pcg64::seed_from_u64(cfg.seed);
    let mut sessions = JoinSet::new();

    for index in 0..cfg.users {
        if index > 0 {
            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                _ = stop.changed() => break,
            }
        }
        if *stop.borrow() {
            break;
        }

        let profile = *classes.sample(&mut class_rng);
        let seed = cfg.seed.wrapping_add(index as u64 + 1);
        match UserSession::start(
            index,
            profile,
            seed,
            catalog.clone(),
            settings.clone(),
            stats.clone(),
        ) {
            Ok(session) => {
                sessions.spawn(session.run(stop.clone()));
            }
            Err(err) => tracing::warn!(user = index, error = %err, "failed to start user"),
        }
    }
    tracing::info!(active = sessions.len(), "user spawning complete");

    while let Some(joined) = sessions.join_next().await {
        if let Err(err) = joined {
            tracing::warn!(error = %err, "user session panicked");
        }
    }
}
