//! Terminal rendering: format helpers, metric cards, and the period table.
//!
//! Formatting only happens here; engine output stays raw.

use hashvest_engine::{PeriodRecord, ProjectionSummary, SimulationParams};
use hashvest_fleet::{FleetSummary, MinerGroup, MinerStatus};

/// Compact USD: `$1.23M`, `$45,678`, `$123.45`, `N/A` for non-finite
pub fn fmt_usd(v: f64) -> String {
    if !v.is_finite() {
        return "N/A".to_string();
    }
    let neg = v < 0.0;
    let abs = v.abs();
    let body = if abs >= 1e6 {
        format!("${:.2}M", abs / 1e6)
    } else if abs >= 1e4 {
        format!("${}", group_thousands(abs.round() as u64))
    } else {
        format!("${}", with_cents(abs))
    };
    if neg {
        format!("-{body}")
    } else {
        body
    }
}

/// Full USD with cents and thousands separators
pub fn fmt_usd_full(v: f64) -> String {
    if !v.is_finite() {
        return "N/A".to_string();
    }
    let neg = v < 0.0;
    let body = format!("${}", with_cents(v.abs()));
    if neg {
        format!("-{body}")
    } else {
        body
    }
}

/// Fixed-precision BTC amount
pub fn fmt_btc(v: f64, decimals: usize) -> String {
    if !v.is_finite() {
        return "N/A".to_string();
    }
    format!("{v:.decimals$}")
}

fn with_cents(abs: f64) -> String {
    let cents = (abs * 100.0).round() as u64;
    format!("{}.{:02}", group_thousands(cents / 100), cents % 100)
}

fn group_thousands(mut n: u64) -> String {
    let mut groups = Vec::new();
    loop {
        let group = n % 1000;
        n /= 1000;
        if n == 0 {
            groups.push(group.to_string());
            break;
        }
        groups.push(format!("{group:03}"));
    }
    groups.reverse();
    groups.join(",")
}

/// Headline metric cards for a finished projection
pub fn print_summary(summary: &ProjectionSummary, params: &SimulationParams) {
    let period_label = params.period.label();

    println!();
    println!("── Day-1 Economics ─────────────────────────────────────────");
    println!("  Daily revenue      {}", fmt_usd(summary.daily_revenue));
    println!("  Daily electricity  {}", fmt_usd(summary.daily_elec_cost));
    println!(
        "  Daily profit       {} {}",
        fmt_usd(summary.daily_profit),
        if summary.daily_profit >= 0.0 { "↑" } else { "↓" }
    );
    println!("  Cost per BTC       {}", fmt_usd(summary.cost_per_btc));
    println!(
        "  Efficiency         {:.1} W/TH",
        summary.efficiency_w_per_th
    );

    println!();
    println!(
        "── Projection over {} {} ───────────────────────────────",
        params.num_periods, period_label
    );
    println!("  BTC mined          {}", fmt_btc(summary.btc_mined, 6));
    println!("  BTC held           {}", fmt_btc(summary.btc_held, 6));
    println!(
        "  Held value         {} (at {}/BTC)",
        fmt_usd(summary.held_btc_value),
        fmt_usd(summary.final_btc_price)
    );
    if summary.total_capex > 0.0 {
        println!(
            "  Total P/L          {} ({}{:.1}% ROI)",
            fmt_usd(summary.total_pl),
            if summary.roi_pct >= 0.0 { "+" } else { "" },
            summary.roi_pct
        );
    } else {
        println!("  Total P/L          {}", fmt_usd(summary.total_pl));
    }
    match summary.breakeven_period {
        Some(p) => println!(
            "  Breakeven          {} {}",
            p,
            params.period.label_singular()
        ),
        None => println!("  Breakeven          Never"),
    }

    if summary.fleet_changed() {
        let mut parts = Vec::new();
        if summary.units_reinvested > 0 {
            parts.push(format!("+{} reinvested", summary.units_reinvested));
        }
        if summary.units_scheduled > 0 {
            parts.push(format!("+{} scheduled", summary.units_scheduled));
        }
        if summary.units_retired > 0 {
            parts.push(format!("{} retired", summary.units_retired));
        }
        println!(
            "  Fleet              {} units ({})",
            summary.active_units,
            parts.join(", ")
        );
    }
    println!();
}

/// Period-by-period breakdown table
pub fn print_table(records: &[PeriodRecord]) {
    println!(
        "{:>5}  {:>12}  {:>9}  {:>9}  {:>6}  {:>12}  {:>11}  {:>13}  {:>13}  {:>13}",
        "#", "BTC price", "Diff (T)", "Reward", "Units", "BTC mined", "BTC held", "Electricity",
        "Cash flow", "Cumul. value"
    );
    for record in records {
        let mut unit_notes = String::new();
        if record.units_retired > 0 && record.units_replaced > 0 {
            unit_notes = format!(" ({} replaced)", record.units_replaced);
        } else if record.units_retired > 0 {
            unit_notes = format!(" (-{} retired)", record.units_retired);
        }
        if record.units_reinvested > 0 {
            unit_notes.push_str(&format!(" (+{})", record.units_reinvested));
        }
        if record.units_scheduled > 0 {
            unit_notes.push_str(&format!(" (+{} sched)", record.units_scheduled));
        }
        println!(
            "{:>5}  {:>12}  {:>9.2}  {:>9}  {:>6}  {:>12}  {:>11}  {:>13}  {:>13}  {:>13}{}{}",
            record.period,
            fmt_usd_full(record.btc_price),
            record.difficulty_t,
            record.block_reward,
            record.active_units,
            fmt_btc(record.btc_mined, 8),
            fmt_btc(record.btc_held, 6),
            fmt_usd_full(record.elec_cost),
            fmt_usd_full(record.net_cash_flow),
            fmt_usd_full(record.total_value),
            unit_notes,
            if record.halving { "  ⚠ HALVING" } else { "" },
        );
    }
}

/// Fleet overview cards for the dashboard
pub fn print_fleet_overview(summary: &FleetSummary, daily_btc: f64, daily_usd: f64) {
    println!();
    println!("── Fleet Overview ──────────────────────────────────────────");
    println!("  Hashrate           {:.1} TH/s", summary.total_hashrate_ths);
    if summary.offline_units > 0 {
        println!(
            "  Miners online      {} ({} offline)",
            summary.online_units, summary.offline_units
        );
    } else {
        println!(
            "  Miners online      {} (all miners online)",
            summary.online_units
        );
    }
    println!(
        "  Daily estimate     {} BTC ({})",
        fmt_btc(daily_btc, 6),
        fmt_usd(daily_usd)
    );
    println!("  Power draw         {:.2} kW", summary.total_power_kw);
    println!(
        "  Efficiency         {:.1} W/TH",
        summary.efficiency_w_per_th
    );
    println!(
        "  Avg unit cost      {} (total {})",
        fmt_usd(summary.avg_cost),
        fmt_usd(summary.total_cost)
    );
}

/// One card per miner group
pub fn print_miner_cards(miners: &[MinerGroup], daily_usd_per_ths: f64) {
    println!();
    for group in miners {
        let efficiency = if group.hashrate_ths > 0.0 {
            group.power_kw * 1000.0 / group.hashrate_ths
        } else {
            0.0
        };
        let daily = match group.status {
            MinerStatus::Online => group.hashrate_ths * daily_usd_per_ths,
            MinerStatus::Offline => 0.0,
        };
        println!(
            "  [{}] {} ×{}  {} TH/s  {} kW  {:.1} W/TH  {}  {}/day  {}",
            &group.id[..group.id.len().min(8)],
            group.model,
            group.quantity,
            group.hashrate_ths,
            group.power_kw,
            efficiency,
            match group.status {
                MinerStatus::Online => "online",
                MinerStatus::Offline => "offline",
            },
            fmt_usd(daily),
            if group.cost > 0.0 {
                fmt_usd(group.cost)
            } else {
                "--".to_string()
            },
        );
    }
}
