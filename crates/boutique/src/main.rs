mod output;
mod telemetry;

use std::str::FromStr;

use anyhow::Context;
use boutique_core::config::{Config, ConfigOverrides};
use boutique_loadgen::{Catalog, Profile, SwarmConfig, dry_run, run_swarm};
use clap::{Parser, Subcommand};
use serde::Serialize;

use crate::output::{print_plan_human, print_stats_human};
use crate::telemetry::{init_cli_tracing, init_json_logging, shutdown_tracing};

#[derive(Parser, Debug)]
#[command(name = "boutique")]
#[command(about = "Storefront load generator with trace-correlated JSON logs")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(about = "Drive simulated shoppers against a storefront")]
    Loadgen {
        #[arg(long, help = "Storefront base URL, e.g. http://frontend:80")]
        host: Option<String>,
        #[arg(short = 'u', long)]
        users: Option<usize>,
        #[arg(short = 'r', long, help = "Users started per second")]
        spawn_rate: Option<f64>,
        #[arg(short = 't', long, help = "Stop after this long (e.g. 5m); runs until Ctrl-C otherwise")]
        run_time: Option<String>,
        #[arg(long)]
        seed: Option<u64>,
        #[arg(long)]
        wait_min: Option<String>,
        #[arg(long)]
        wait_max: Option<String>,
        #[arg(long)]
        request_timeout: Option<String>,
        #[arg(long)]
        standard_weight: Option<u32>,
        #[arg(long)]
        hacker_weight: Option<u32>,
    },
    #[command(about = "Print the actions a seeded user would take, without sending them")]
    Plan {
        #[arg(long, default_value = "standard")]
        profile: String,
        #[arg(long, default_value_t = 0)]
        seed: u64,
        #[arg(long, default_value_t = 20)]
        count: usize,
    },
    #[command(about = "Emit sample JSON log lines inside and outside a span")]
    LogDemo {
        #[arg(long)]
        name: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Loadgen {
            host,
            users,
            spawn_rate,
            run_time,
            seed,
            wait_min,
            wait_max,
            request_timeout,
            standard_weight,
            hacker_weight,
        } => {
            let mut cfg = Config::load().context("load configuration")?;
            cfg.apply(
                ConfigOverrides {
                    host,
                    users,
                    spawn_rate,
                    run_time,
                    seed,
                    wait_min,
                    wait_max,
                    request_timeout,
                    standard_weight,
                    hacker_weight,
                    log_name: None,
                },
                "command line",
            )?;
            let swarm = SwarmConfig::from_config(&cfg)?;

            init_json_logging(&cfg.log_name);
            let result = run_swarm(swarm, shutdown_signal()).await;
            shutdown_tracing();

            let snapshot = result?;
            if cli.json {
                println!("{}", serde_json::to_string(&snapshot)?);
            } else {
                print_stats_human(&snapshot);
            }
            Ok(())
        }
        Commands::Plan {
            profile,
            seed,
            count,
        } => {
            init_cli_tracing();
            let profile = Profile::from_str(&profile)?;
            let catalog = Catalog::new()?;
            let (identity, actions) = dry_run(&catalog, profile, seed, count);
            tracing::debug!(%profile, seed, count, "planned dry run");

            if cli.json {
                let payload = PlanOutput {
                    profile,
                    seed,
                    identity: &identity,
                    actions: &actions,
                };
                println!("{}", serde_json::to_string_pretty(&payload)?);
            } else {
                print_plan_human(profile, seed, &identity, &actions);
            }
            Ok(())
        }
        Commands::LogDemo { name } => {
            let name = match name {
                Some(name) => name,
                None => Config::from_env()?.log_name,
            };
            init_json_logging(&name);
            run_log_demo();
            shutdown_tracing();
            Ok(())
        }
    }
}

#[derive(Serialize)]
struct PlanOutput<'a> {
    profile: Profile,
    seed: u64,
    identity: &'a boutique_loadgen::identity::CheckoutProfile,
    actions: &'a [boutique_loadgen::PlannedAction],
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %err, "ctrl-c handler unavailable; waiting for run time");
        std::future::pending::<()>().await;
    }
}

fn run_log_demo() {
    tracing::info!("no span active");

    let request = tracing::info_span!("demo_request", http.route = "/cart");
    request.in_scope(|| {
        tracing::info!(currency = "EUR", items = 3, "cart rendered");
        tracing::info_span!("demo_child").in_scope(|| {
            tracing::warn!(product_id = "OLJCESPRRR", "product not found");
        });
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loadgen_flags_parse() {
        let cli = Cli::parse_from([
            "boutique",
            "loadgen",
            "--host",
            "http://frontend:80",
            "-u",
            "5",
            "-r",
            "2.5",
            "-t",
            "30s",
            "--hacker-weight",
            "1",
            "--json",
        ]);
        assert!(cli.json);
        match cli.command {
            Commands::Loadgen {
                host,
                users,
                spawn_rate,
                run_time,
                hacker_weight,
                seed,
                ..
            } => {
                assert_eq!(host.as_deref(), Some("http://frontend:80"));
                assert_eq!(users, Some(5));
                assert_eq!(spawn_rate, Some(2.5));
                assert_eq!(run_time.as_deref(), Some("30s"));
                assert_eq!(hacker_weight, Some(1));
                assert_eq!(seed, None);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn plan_defaults() {
        let cli = Cli::parse_from(["boutique", "plan"]);
        match cli.command {
            Commands::Plan {
                profile,
                seed,
                count,
            } => {
                assert_eq!(profile, "standard");
                assert_eq!(seed, 0);
                assert_eq!(count, 20);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
