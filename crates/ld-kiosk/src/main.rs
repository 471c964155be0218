//! Lucky Draw Kiosk — headless spin runner
//!
//! Usage:
//!   ld-kiosk spin --spins 50 --seed 7   - Run spins on the demo wheel
//!   ld-kiosk spin --config draw.json    - Run spins on a custom wheel
//!   ld-kiosk odds                       - Show per-slot win odds
//!   ld-kiosk export                     - Print the draw config as JSON

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};

use ld_draw::{
    DrawConfig, FailSlotRule, MemoryQuantityStore, NameBook, RealtimeScheduler, Scheduler,
    SpinEngine, SpinTiming, TimingProfile, VirtualClock,
};
use ld_stage::{SLOW_PHASE_TAG, StageCategory, StageTrace};

#[derive(Parser)]
#[command(name = "ld-kiosk", about = "Lucky draw kiosk simulator")]
struct Cli {
    /// Draw config JSON (defaults to the built-in demo wheel)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run spins and print outcomes and landing stats
    Spin {
        /// Number of spins
        #[arg(short = 'n', long, default_value_t = 10)]
        spins: u32,

        /// RNG seed for reproducible runs
        #[arg(short, long)]
        seed: Option<u64>,

        /// Timing profile (overrides the config's timing)
        #[arg(short, long, value_enum)]
        profile: Option<Profile>,

        /// Fail-slot rule (overrides the config's rule)
        #[arg(long, value_enum)]
        fail_rule: Option<Rule>,

        /// Sleep for real instead of using a virtual clock
        #[arg(long)]
        realtime: bool,

        /// Quantity state file, loaded before and saved after the run
        #[arg(long)]
        state: Option<PathBuf>,

        /// Reward name overrides file
        #[arg(long)]
        names: Option<PathBuf>,

        /// Print the last spin's stage trace as JSON
        #[arg(long)]
        trace: bool,
    },
    /// Show per-slot win odds for the next spin
    Odds,
    /// Print the draw config as JSON
    Export,
}

#[derive(Clone, Copy, ValueEnum)]
enum Profile {
    Normal,
    Turbo,
    Studio,
}

impl From<Profile> for TimingProfile {
    fn from(p: Profile) -> Self {
        match p {
            Profile::Normal => TimingProfile::Normal,
            Profile::Turbo => TimingProfile::Turbo,
            Profile::Studio => TimingProfile::Studio,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum Rule {
    RequiresStockedReward,
    RequiresSelectableReward,
    Always,
}

impl From<Rule> for FailSlotRule {
    fn from(r: Rule) -> Self {
        match r {
            Rule::RequiresStockedReward => FailSlotRule::RequiresStockedReward,
            Rule::RequiresSelectableReward => FailSlotRule::RequiresSelectableReward,
            Rule::Always => FailSlotRule::Always,
        }
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Spin {
            spins,
            seed,
            profile,
            fail_rule,
            realtime,
            state,
            names,
            trace,
        } => {
            let mut config = config;
            if let Some(profile) = profile {
                config.timing = SpinTiming::from_profile(profile.into());
            }
            if let Some(rule) = fail_rule {
                config.fail_rule = rule.into();
            }
            let options = SpinOptions {
                spins,
                seed,
                state,
                names,
                trace,
            };
            if realtime {
                run_spins(config, &options, &mut RealtimeScheduler)
            } else {
                run_spins(config, &options, &mut VirtualClock::new())
            }
        }
        Commands::Odds => show_odds(config),
        Commands::Export => {
            println!("{}", config.to_json()?);
            Ok(())
        }
    }
}

struct SpinOptions {
    spins: u32,
    seed: Option<u64>,
    state: Option<PathBuf>,
    names: Option<PathBuf>,
    trace: bool,
}

fn load_config(path: Option<&Path>) -> Result<DrawConfig> {
    let Some(path) = path else {
        log::info!("No config given, using the demo wheel");
        return Ok(DrawConfig::demo());
    };
    let json = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    DrawConfig::from_json(&json).with_context(|| format!("Invalid config {}", path.display()))
}

fn load_state(path: &Path) -> Result<MemoryQuantityStore> {
    if !path.exists() {
        log::info!("State file {} not found, starting from defaults", path.display());
        return Ok(MemoryQuantityStore::new());
    }
    let json = fs::read_to_string(path)
        .with_context(|| format!("Failed to read state {}", path.display()))?;
    let quantities: BTreeMap<String, u32> = serde_json::from_str(&json)
        .with_context(|| format!("Invalid state {}", path.display()))?;
    Ok(MemoryQuantityStore::with_quantities(quantities))
}

fn save_state(path: &Path, store: &MemoryQuantityStore) -> Result<()> {
    let quantities: BTreeMap<String, u32> = store.snapshot().into_iter().collect();
    let json = serde_json::to_string_pretty(&quantities)?;
    fs::write(path, json).with_context(|| format!("Failed to write state {}", path.display()))
}

fn run_spins<S: Scheduler>(
    config: DrawConfig,
    options: &SpinOptions,
    scheduler: &mut S,
) -> Result<()> {
    let store = match &options.state {
        Some(path) => Some(Arc::new(load_state(path)?)),
        None => None,
    };

    let mut engine = SpinEngine::new(config).context("Failed to build engine")?;
    if let Some(seed) = options.seed {
        engine.seed(seed);
    }
    if let Some(store) = &store {
        engine = engine.with_store(store.clone());
    }
    if let Some(path) = &options.names {
        let json = fs::read_to_string(path)
            .with_context(|| format!("Failed to read names {}", path.display()))?;
        let book = NameBook::from_json(&json)?;
        let applied = engine.apply_names(&book)?;
        log::info!("Applied {} name overrides", applied);
    }

    println!("Draw: {} ({} slots)", engine.draw_id(), engine.slots().len());

    for _ in 0..options.spins {
        match engine.spin_blocking(scheduler) {
            Ok(outcome) => {
                let stock = outcome
                    .quantity_after
                    .map_or_else(|| "-".to_string(), |q| format!("{q} left"));
                println!(
                    "#{:<4} {:02}. {:<20} {}",
                    outcome.spin_id, outcome.index, outcome.display_name, stock
                );
                scheduler.sleep(outcome.reveal_after);
                engine.acknowledge_result();
            }
            Err(reason) => {
                println!("Spin rejected: {reason}");
                break;
            }
        }
    }

    println!();
    print!("{}", engine.landing_stats().report(engine.slots()));
    println!("Hit rate: {:.1}%", engine.landing_stats().hit_rate() * 100.0);

    if options.trace {
        if let Some(trace) = engine.last_trace() {
            let validation = trace.validate();
            for warning in validation.warnings() {
                log::warn!("Trace: {}", warning);
            }
            print_trace_summary(trace);
            println!("{}", serde_json::to_string_pretty(trace)?);
        }
    }

    if let (Some(path), Some(store)) = (&options.state, &store) {
        save_state(path, store)?;
        log::info!("Saved {} quantities to {}", store.len(), path.display());
    }
    Ok(())
}

fn print_trace_summary(trace: &StageTrace) {
    println!();
    println!("Trace of spin #{} ({:.0} ms)", trace.spin_id, trace.duration_ms());
    for category in StageCategory::ALL {
        let count = trace.events_by_category(category).len();
        if count > 0 {
            println!("  {:<16} {} events", category.display_name(), count);
        }
    }
    println!(
        "  {:<16} {} ({} slow)",
        "Steps",
        trace.step_count(),
        trace.tagged(SLOW_PHASE_TAG).len()
    );
}

fn show_odds(config: DrawConfig) -> Result<()> {
    let engine = SpinEngine::new(config).context("Failed to build engine")?;
    let odds = engine.odds();

    println!("{:<4} {:<20} {:>6} {:>6} {:>8}", "#", "Reward", "Weight", "Stock", "Odds");
    for (i, (slot, p)) in engine.slots().iter().zip(odds).enumerate() {
        let stock = if slot.is_fail_slot() {
            "-".to_string()
        } else {
            slot.quantity().to_string()
        };
        println!(
            "{:02}.  {:<20} {:>6} {:>6} {:>7.2}%",
            i,
            slot.display_name(),
            slot.weight(),
            stock,
            p * 100.0
        );
    }
    Ok(())
}
