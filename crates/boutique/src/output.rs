use std::io::IsTerminal;

use boutique_loadgen::identity::CheckoutProfile;
use boutique_loadgen::{PlannedAction, Profile, RequestStats, StatsSnapshot};
use owo_colors::OwoColorize;

pub fn print_stats_human(v: &StatsSnapshot) {
    let color = std::io::stdout().is_terminal();
    println!(
        "{:<28} {:>8} {:>8} {:>10} {:>10} {:>10}",
        "Name", "# reqs", "# fails", "Avg (ms)", "Min (ms)", "Max (ms)"
    );
    for row in &v.entries {
        print_stats_row(row, color);
    }
    println!("{}", "-".repeat(79));
    print_stats_row(&v.total, color);
    println!(
        "-- {} requests ({:.2}% failed) --",
        v.total.requests,
        failure_percent(&v.total)
    );
}

fn print_stats_row(row: &RequestStats, color: bool) {
    let fails = format!("{:>8}", row.failures);
    let fails = if color && row.failures > 0 {
        fails.red().to_string()
    } else {
        fails
    };
    println!(
        "{:<28} {:>8} {} {:>10.0} {:>10.0} {:>10.0}",
        row.name, row.requests, fails, row.avg_ms, row.min_ms, row.max_ms
    );
}

fn failure_percent(row: &RequestStats) -> f64 {
    if row.requests == 0 {
        0.0
    } else {
        row.failures as f64 * 100.0 / row.requests as f64
    }
}

pub fn print_plan_human(
    profile: Profile,
    seed: u64,
    identity: &CheckoutProfile,
    actions: &[PlannedAction],
) {
    println!(
        "USER profile={profile} seed={seed} email={} card={}",
        identity.email, identity.credit_card_number
    );
    for planned in actions {
        let requests: Vec<String> = planned
            .requests
            .iter()
            .map(|req| {
                if req.form.is_empty() {
                    format!("{} {}", req.method, req.path)
                } else {
                    let form: Vec<String> =
                        req.form.iter().map(|(k, v)| format!("{k}={v}")).collect();
                    format!("{} {} {}", req.method, req.path, form.join("&"))
                }
            })
            .collect();
        println!("{:<14} {}", planned.action.name(), requests.join(" ; "));
    }
    let total: usize = actions.iter().map(|a| a.requests.len()).sum();
    println!("-- {} actions ({} requests) --", actions.len(), total);
}
