//! Hashvest CLI
//!
//! Terminal front-end for the mining planner: runs projections, manages
//! the miner fleet, and shows a live-ish dashboard.

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use chrono::Utc;
use hashvest_engine::{simulate, summarize, PeriodLength, RawParams, SimulationParams};
use hashvest_fleet::{FleetStore, MinerGroup, MinerStatus};
use hashvest_market::MarketClient;
use rand::Rng;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod render;

#[derive(Parser)]
#[command(name = "hashvest")]
#[command(author = "Ion Mining Group")]
#[command(version = "0.1.0")]
#[command(about = "BTC mining profitability planner and fleet tracker", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Data directory
    #[arg(short, long, default_value = "~/.hashvest", global = true)]
    data_dir: PathBuf,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the profitability projection
    Project {
        #[command(flatten)]
        inputs: ProjectInputs,

        /// Fetch live price and difficulty before projecting
        #[arg(long)]
        live: bool,

        /// Pre-fill hardware inputs from the saved fleet
        #[arg(long)]
        use_fleet: bool,

        /// Show the full period breakdown table
        #[arg(long)]
        table: bool,

        /// Emit records and summary as JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Manage the miner fleet
    Fleet {
        #[command(subcommand)]
        fleet: FleetCommands,
    },

    /// Fleet overview with an earnings estimate
    Dashboard,

    /// Fetch live market data
    Market {
        /// Also fetch price and difficulty history series
        #[arg(long)]
        history: bool,
    },
}

/// Calculator input overrides; anything omitted falls back to the saved
/// settings, then to the documented defaults.
#[derive(Args, Clone)]
struct ProjectInputs {
    /// BTC price in USD
    #[arg(long)]
    btc_price: Option<String>,
    /// Price drift, % per month
    #[arg(long)]
    price_change: Option<String>,
    /// Network difficulty in T
    #[arg(long)]
    difficulty: Option<String>,
    /// Difficulty drift, % per month
    #[arg(long)]
    diff_change: Option<String>,
    /// Projection horizon in periods
    #[arg(long)]
    periods: Option<String>,
    /// Period granularity
    #[arg(long, value_enum)]
    period_length: Option<PeriodArg>,
    /// Per-unit hashrate, TH/s
    #[arg(long)]
    hashrate: Option<String>,
    /// Per-unit power, kW
    #[arg(long)]
    power: Option<String>,
    /// Per-unit cost, USD
    #[arg(long)]
    capex: Option<String>,
    /// Number of units
    #[arg(long)]
    units: Option<String>,
    /// Electricity cost, $/kWh
    #[arg(long)]
    elec_cost: Option<String>,
    /// Pool fee, %
    #[arg(long)]
    pool_fee: Option<String>,
    /// Uptime, %
    #[arg(long)]
    uptime: Option<String>,
    /// Share of mined BTC held rather than sold, %
    #[arg(long)]
    hold_ratio: Option<String>,
    /// Starting BTC treasury
    #[arg(long)]
    treasury: Option<String>,
    /// Miner lifespan in months
    #[arg(long)]
    lifespan: Option<String>,
    /// Salvage value at retirement, %
    #[arg(long)]
    salvage: Option<String>,
    /// Scheduled monthly unit additions
    #[arg(long)]
    additions: Option<String>,
    /// Reinvest positive cash flow into new units
    #[arg(long)]
    reinvest: Option<bool>,
    /// Deduct scheduled-addition capex from cash flow
    #[arg(long)]
    deduct_addition_capex: Option<bool>,
    /// Treat electricity as already netted out of the hold/sell split
    #[arg(long)]
    elec_pre_deducted: Option<bool>,
    /// Replace retired units automatically
    #[arg(long)]
    auto_replace: Option<bool>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum PeriodArg {
    Daily,
    Weekly,
    Monthly,
}

impl From<PeriodArg> for PeriodLength {
    fn from(arg: PeriodArg) -> Self {
        match arg {
            PeriodArg::Daily => PeriodLength::Daily,
            PeriodArg::Weekly => PeriodLength::Weekly,
            PeriodArg::Monthly => PeriodLength::Monthly,
        }
    }
}

#[derive(Subcommand)]
enum FleetCommands {
    /// Add a miner group
    Add {
        /// Model name
        model: String,
        /// Per-unit hashrate, TH/s
        #[arg(long)]
        hashrate: f64,
        /// Per-unit power, kW
        #[arg(long)]
        power: f64,
        /// Per-unit cost, USD
        #[arg(long, default_value_t = 0.0)]
        cost: f64,
        /// Unit count
        #[arg(long, default_value_t = 1)]
        quantity: u32,
        /// Add as offline
        #[arg(long)]
        offline: bool,
    },
    /// List miner groups
    List,
    /// Remove a whole group, or one unit with --one
    Remove {
        id: String,
        /// Remove a single unit instead of the whole group
        #[arg(long)]
        one: bool,
    },
    /// Show the fleet summary
    Summary,
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_file(false),
        )
        .init();
}

fn expand_path(path: &PathBuf) -> PathBuf {
    if let Some(path_str) = path.to_str() {
        if let Some(rest) = path_str.strip_prefix("~/") {
            if let Some(home) = dirs::home_dir() {
                return home.join(rest);
            }
        }
    }
    path.clone()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let data_dir = expand_path(&cli.data_dir);
    let store = FleetStore::open(&data_dir)
        .with_context(|| format!("opening data directory {}", data_dir.display()))?;

    match cli.command {
        Commands::Project {
            inputs,
            live,
            use_fleet,
            table,
            json,
        } => run_project(&store, inputs, live, use_fleet, table, json).await?,
        Commands::Fleet { fleet } => run_fleet(&store, fleet)?,
        Commands::Dashboard => run_dashboard(&store).await,
        Commands::Market { history } => run_market(history).await?,
    }

    Ok(())
}

async fn run_project(
    store: &FleetStore,
    inputs: ProjectInputs,
    live: bool,
    use_fleet: bool,
    table: bool,
    json: bool,
) -> anyhow::Result<()> {
    let mut settings = store.calculator_settings();
    apply_overrides(&mut settings.inputs, &inputs);

    if live {
        let snapshot = MarketClient::new().snapshot().await;
        if let Some(price) = snapshot.price_usd {
            settings.inputs.btc_price = Some(price.to_string());
        }
        if let Some(difficulty) = snapshot.difficulty_t {
            settings.inputs.difficulty_t = Some(difficulty.to_string());
        }
        if snapshot.is_live() {
            tracing::info!("live market data loaded");
        } else {
            tracing::warn!("market sources unreachable, using saved values");
        }
    }

    if use_fleet {
        let summary = store.summary();
        if summary.total_units > 0 {
            summary.apply_to(&mut settings.inputs);
            tracing::info!(units = summary.total_units, "inputs pre-filled from fleet");
        } else {
            tracing::warn!("fleet is empty, keeping saved inputs");
        }
        let mut app = store.app_settings();
        app.use_fleet_data = true;
        if let Err(e) = store.save_app_settings(&app) {
            tracing::warn!(error = %e, "could not persist app settings");
        }
    }

    let params = SimulationParams::from_raw(&settings.inputs, Utc::now().naive_utc());
    let projection = simulate(&params);
    let summary = summarize(&projection, &params);

    if json {
        let out = serde_json::json!({
            "params": params,
            "records": projection.records,
            "summary": summary,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        render::print_summary(&summary, &params);
        if table {
            render::print_table(&projection.records);
        }
    }

    // fleet-supplied hardware numbers are not the user's own inputs
    if !use_fleet {
        store.save_calculator_settings(&settings)?;
    }
    Ok(())
}

fn apply_overrides(raw: &mut RawParams, inputs: &ProjectInputs) {
    let ProjectInputs {
        btc_price,
        price_change,
        difficulty,
        diff_change,
        periods,
        period_length,
        hashrate,
        power,
        capex,
        units,
        elec_cost,
        pool_fee,
        uptime,
        hold_ratio,
        treasury,
        lifespan,
        salvage,
        additions,
        reinvest,
        deduct_addition_capex,
        elec_pre_deducted,
        auto_replace,
    } = inputs.clone();

    merge(&mut raw.btc_price, btc_price);
    merge(&mut raw.price_change_pct, price_change);
    merge(&mut raw.difficulty_t, difficulty);
    merge(&mut raw.diff_change_pct, diff_change);
    merge(&mut raw.num_periods, periods);
    if let Some(period) = period_length {
        raw.period = Some(period.into());
    }
    merge(&mut raw.unit_hashrate_ths, hashrate);
    merge(&mut raw.unit_power_kw, power);
    merge(&mut raw.unit_capex, capex);
    merge(&mut raw.unit_count, units);
    merge(&mut raw.elec_cost, elec_cost);
    merge(&mut raw.pool_fee_pct, pool_fee);
    merge(&mut raw.uptime_pct, uptime);
    merge(&mut raw.hold_ratio_pct, hold_ratio);
    merge(&mut raw.btc_treasury, treasury);
    merge(&mut raw.lifespan_months, lifespan);
    merge(&mut raw.salvage_pct, salvage);
    merge(&mut raw.monthly_additions, additions);
    merge(&mut raw.reinvest, reinvest);
    merge(&mut raw.deduct_addition_capex, deduct_addition_capex);
    merge(&mut raw.elec_pre_deducted, elec_pre_deducted);
    merge(&mut raw.auto_replace, auto_replace);
}

fn merge<T>(slot: &mut Option<T>, value: Option<T>) {
    if value.is_some() {
        *slot = value;
    }
}

fn run_fleet(store: &FleetStore, command: FleetCommands) -> anyhow::Result<()> {
    match command {
        FleetCommands::Add {
            model,
            hashrate,
            power,
            cost,
            quantity,
            offline,
        } => {
            let group = store.add_miner(MinerGroup {
                id: String::new(),
                model,
                hashrate_ths: hashrate,
                power_kw: power,
                cost,
                quantity,
                status: if offline {
                    MinerStatus::Offline
                } else {
                    MinerStatus::Online
                },
                added: Utc::now(),
            })?;
            println!("Added {} ×{} ({})", group.model, group.quantity, group.id);
        }
        FleetCommands::List => {
            let fleet = store.fleet();
            if fleet.miners.is_empty() {
                println!("No miners added yet — showing nothing to list.");
                return Ok(());
            }
            for group in &fleet.miners {
                println!(
                    "{}  {} ×{}  {} TH/s  {} kW  {}  added {}",
                    group.id,
                    group.model,
                    group.quantity,
                    group.hashrate_ths,
                    group.power_kw,
                    match group.status {
                        MinerStatus::Online => "online",
                        MinerStatus::Offline => "offline",
                    },
                    group.added.format("%Y-%m-%d"),
                );
            }
        }
        FleetCommands::Remove { id, one } => {
            if one {
                store.reduce_quantity(&id)?;
                println!("Removed one unit from {id}");
            } else {
                store.remove_miner(&id)?;
                println!("Removed group {id}");
            }
        }
        FleetCommands::Summary => {
            let summary = store.summary();
            println!("Units:      {} ({} online, {} offline)",
                summary.total_units, summary.online_units, summary.offline_units);
            println!("Hashrate:   {:.1} TH/s", summary.total_hashrate_ths);
            println!("Power:      {:.2} kW", summary.total_power_kw);
            println!("Efficiency: {:.1} W/TH", summary.efficiency_w_per_th);
            println!(
                "Cost:       {} total, {} avg/unit",
                render::fmt_usd(summary.total_cost),
                render::fmt_usd(summary.avg_cost)
            );
        }
    }
    Ok(())
}

async fn run_dashboard(store: &FleetStore) {
    let snapshot = MarketClient::new().snapshot().await;
    let price = snapshot
        .price_usd
        .unwrap_or(hashvest_engine::DEFAULT_BTC_PRICE);
    let difficulty_t = snapshot
        .difficulty_t
        .unwrap_or(hashvest_engine::DEFAULT_DIFFICULTY_T);
    if !snapshot.is_live() {
        tracing::warn!("market sources unreachable, dashboard uses defaults");
    }

    let sample = store.is_empty();
    let miners = if sample {
        println!("(no miners saved yet — showing a sample fleet)");
        FleetStore::sample_fleet()
    } else {
        store.fleet().miners
    };

    let mut online_hashrate = 0.0;
    for group in &miners {
        if group.status == MinerStatus::Online {
            online_hashrate += group.hashrate_ths * group.quantity as f64;
        }
    }

    let reward = hashvest_engine::HalvingSchedule::mainnet().reward_at(Utc::now().naive_utc());
    let daily_btc = daily_btc_for(online_hashrate, difficulty_t, reward);
    let daily_usd = daily_btc * price;
    let daily_usd_per_ths = if online_hashrate > 0.0 {
        daily_usd / online_hashrate
    } else {
        0.0
    };

    let summary = if sample {
        summarize_sample(&miners)
    } else {
        store.summary()
    };
    render::print_fleet_overview(&summary, daily_btc, daily_usd);
    render::print_miner_cards(&miners, daily_usd_per_ths);
    print_earnings_strip(daily_usd);
}

/// Expected daily BTC for a hashrate at a given difficulty
fn daily_btc_for(hashrate_ths: f64, difficulty_t: f64, reward: f64) -> f64 {
    use hashvest_engine::constants::{SECONDS_PER_DAY, TERA, TWO_POW_32};
    if difficulty_t <= 0.0 {
        return 0.0;
    }
    (hashrate_ths * TERA * SECONDS_PER_DAY * reward) / (difficulty_t * TERA * TWO_POW_32)
}

/// Aggregate a sample fleet without touching the store
fn summarize_sample(miners: &[MinerGroup]) -> hashvest_fleet::FleetSummary {
    let mut total_hashrate = 0.0;
    let mut total_power = 0.0;
    let mut online = 0u32;
    let mut offline = 0u32;
    let mut total_units = 0u32;
    let mut total_cost = 0.0;
    for group in miners {
        total_units += group.quantity;
        total_cost += group.cost * group.quantity as f64;
        match group.status {
            MinerStatus::Online => {
                online += group.quantity;
                total_hashrate += group.hashrate_ths * group.quantity as f64;
                total_power += group.power_kw * group.quantity as f64;
            }
            MinerStatus::Offline => offline += group.quantity,
        }
    }
    hashvest_fleet::FleetSummary {
        total_hashrate_ths: total_hashrate,
        total_power_kw: total_power,
        online_units: online,
        offline_units: offline,
        total_units,
        efficiency_w_per_th: if total_hashrate > 0.0 {
            total_power * 1000.0 / total_hashrate
        } else {
            0.0
        },
        total_cost,
        avg_cost: if total_units > 0 {
            total_cost / total_units as f64
        } else {
            0.0
        },
        defaults: Default::default(),
    }
}

/// Last-two-weeks earnings strip. The ±8% wobble is purely decorative —
/// real per-day variance comes from luck the estimate cannot know.
fn print_earnings_strip(base_daily_usd: f64) {
    let mut rng = rand::thread_rng();
    let today = Utc::now().date_naive();
    println!();
    println!("── Estimated Daily Earnings (last 14 days) ─────────────────");
    for days_back in (0..14).rev() {
        let date = today - chrono::Duration::days(days_back);
        let wobble: f64 = 1.0 + rng.gen_range(-0.08..0.08);
        let bar = "█".repeat(((wobble - 0.9) * 40.0).max(1.0) as usize);
        println!(
            "  {}  {:<10}  {}",
            date.format("%m/%d"),
            render::fmt_usd(base_daily_usd * wobble),
            bar
        );
    }
}

async fn run_market(history: bool) -> anyhow::Result<()> {
    let client = MarketClient::new();
    let snapshot = client.snapshot().await;
    match snapshot.price_usd {
        Some(price) => println!("BTC price:   {}", render::fmt_usd(price)),
        None => println!("BTC price:   unavailable"),
    }
    match snapshot.difficulty_t {
        Some(difficulty) => println!("Difficulty:  {difficulty:.2} T"),
        None => println!("Difficulty:  unavailable"),
    }

    if history {
        match client.price_history().await {
            Ok(points) => {
                println!();
                println!("90-day price history ({} points):", points.len());
                for point in points.iter().rev().take(10).rev() {
                    println!(
                        "  {}  {}",
                        point.at.format("%Y-%m-%d"),
                        render::fmt_usd(point.usd)
                    );
                }
            }
            Err(e) => tracing::warn!(error = %e, "price history unavailable"),
        }
        match client.difficulty_history().await {
            Ok(points) => {
                println!();
                println!("1-year difficulty history ({} points):", points.len());
                for point in points.iter().rev().take(10).rev() {
                    println!("  {}  {:.2} T", point.at.format("%Y-%m-%d"), point.value);
                }
            }
            Err(e) => tracing::warn!(error = %e, "difficulty history unavailable"),
        }
    }
    Ok(())
}
