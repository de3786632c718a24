mod assets;
mod live;
mod logic;
mod scenarios;
mod util;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use colored::Colorize;
use std::fs::File;
use std::io::{BufWriter, Write, stdout};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use assets::{DirContentLoader, PackFilter, TesterAssets};
use live::{LiveOptions, run_live};
use logic::{GameTester, GameplayStrategy, LogicTester, resolve_seed_inputs};
use scenarios::{all_scenario_keys, get_scenario, list_scenarios};
use util::split_csv;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TestMode {
    /// Scenario sweeps against the engine (fast, headless)
    Logic,
    /// One autonomous run played on a timer, streaming the log
    Live,
}

#[derive(Debug, Parser)]
#[command(name = "rabbithole-tester", version = "0.1.0")]
#[command(about = "Automated scenario testing and live playback for the Rabbithole engine")]
struct Args {
    /// Test mode: logic sweeps or a live run
    #[arg(long, value_enum, default_value_t = TestMode::Logic)]
    mode: TestMode,

    /// Content directory holding base.json and packs/
    #[arg(long)]
    content: Option<PathBuf>,

    /// Packs to enable: all, none, or comma-separated pack names
    #[arg(long, default_value = "all")]
    packs: String,

    /// Scenarios to run (comma-separated, or `all`)
    #[arg(long, default_value = "smoke")]
    scenarios: String,

    /// List all available scenarios and exit
    #[arg(long)]
    list_scenarios: bool,

    /// Seeds to run (comma-separated; integers, 0x hex or ranges like 1..5)
    #[arg(long, default_value = "1337")]
    seeds: String,

    /// Number of iterations per scenario and seed (logic mode only)
    #[arg(long, default_value_t = 10)]
    iterations: usize,

    /// Override every scenario's play strategy
    #[arg(long, value_enum)]
    strategy: Option<GameplayStrategy>,

    /// Override every scenario's turn limit; also bounds live runs
    #[arg(long)]
    max_turns: Option<u32>,

    /// Output report format
    #[arg(long, default_value = "console")]
    #[arg(value_parser = ["json", "markdown", "console"])]
    report: String,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Optional path to write the report output instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,

    // Live-specific options
    /// Milliseconds between live turns
    #[arg(long, default_value_t = 250)]
    tick_ms: u64,

    /// Talents for the live run (comma-separated)
    #[arg(long, default_value = "")]
    talents: String,

    /// Save slot to resume the live run from
    #[arg(long)]
    resume: Option<String>,

    /// Save slot to write when the live run stops
    #[arg(long)]
    save: Option<String>,

    /// Directory holding save slots
    #[arg(long, default_value = "target/rabbithole-saves")]
    save_dir: PathBuf,
}

const DEFAULT_LIVE_TURNS: u32 = 500;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    if maybe_list_scenarios(&args)? {
        return Ok(());
    }

    let assets = Arc::new(load_assets(&args)?);
    let passed = match args.mode {
        TestMode::Logic => run_logic_mode(&args, &assets)?,
        TestMode::Live => run_live_mode(&args, &assets).await?,
    };

    if !passed {
        std::process::exit(1);
    }
    Ok(())
}

fn maybe_list_scenarios(args: &Args) -> Result<bool> {
    if !args.list_scenarios {
        return Ok(false);
    }
    let mut output_target = OutputTarget::new(args.output.clone())?;
    writeln!(output_target.writer(), "Available scenarios:")?;
    for (key, description) in list_scenarios() {
        writeln!(output_target.writer(), "  {key:25} - {description}")?;
    }
    output_target.flush_inner()?;
    Ok(true)
}

fn load_assets(args: &Args) -> Result<TesterAssets> {
    let root = args
        .content
        .clone()
        .unwrap_or_else(DirContentLoader::default_root);
    let assets = TesterAssets::load(&root, PackFilter::parse(&args.packs), &args.save_dir)
        .with_context(|| format!("failed to load content from {}", root.display()))?;
    for skipped in &assets.import.skipped {
        eprintln!(
            "⚠️  Skipped pack {}: {}",
            skipped.source.yellow(),
            skipped.reason
        );
    }
    Ok(assets)
}

fn prints_banner(args: &Args) -> bool {
    args.output.is_some() || matches!(args.mode, TestMode::Live) || !is_structured(args)
}

fn is_structured(args: &Args) -> bool {
    matches!(args.report.as_str(), "json" | "markdown")
}

fn announce_banner() {
    println!("{}", "🐇 Rabbithole Automated Tester".bright_cyan().bold());
    println!("{}", "================================".cyan());
}

fn expand_scenarios(scenarios_arg: &str) -> Vec<String> {
    let mut scenarios = split_csv(scenarios_arg);
    if scenarios.iter().any(|s| s.eq_ignore_ascii_case("all")) {
        scenarios.retain(|s| !s.eq_ignore_ascii_case("all"));
        for key in all_scenario_keys() {
            if !scenarios.contains(&key) {
                scenarios.push(key);
            }
        }
    }
    scenarios
}

fn run_logic_mode(args: &Args, assets: &Arc<TesterAssets>) -> Result<bool> {
    if prints_banner(args) {
        announce_banner();
    }
    let start_time = Instant::now();
    let seeds = resolve_seed_inputs(&split_csv(&args.seeds))?;
    let game_tester = GameTester::new(Arc::clone(assets), args.verbose);
    let results = run_logic_scenarios(args, &expand_scenarios(&args.scenarios), &seeds, game_tester);
    write_reports(args, &results, start_time)?;
    Ok(results.iter().all(|r| r.passed))
}

fn run_logic_scenarios(
    args: &Args,
    scenarios: &[String],
    seeds: &[u64],
    game_tester: GameTester,
) -> Vec<logic::ScenarioResult> {
    let mut results: Vec<logic::ScenarioResult> = Vec::new();
    let announce = prints_banner(args);
    if announce {
        println!("{}", "🧠 Running Logic Tests".bright_yellow().bold());
        println!("{}", "-".repeat(30).yellow());
    }

    let logic_tester = LogicTester::new(game_tester);

    for scenario_name in scenarios {
        let Some(mut scenario) = get_scenario(scenario_name) else {
            eprintln!("⚠️  Unknown scenario: {}", scenario_name.yellow());
            continue;
        };
        if let Some(strategy) = args.strategy {
            scenario.plan.strategy = strategy;
        }
        if let Some(max_turns) = args.max_turns {
            scenario.plan.max_turns = max_turns;
        }
        if args.verbose {
            println!("📋 {}: {}", scenario.name.bold(), scenario.description);
        }
        let scenario_results = logic_tester.run_scenario(&scenario, seeds, args.iterations);
        if announce {
            for result in &scenario_results {
                let mark = if result.passed {
                    "✅".green()
                } else {
                    "❌".red()
                };
                println!(
                    "{mark} {} seed {} - {}/{}",
                    result.scenario_name,
                    result.seed,
                    result.successful_iterations,
                    result.iterations_run
                );
            }
        }
        results.extend(scenario_results);
    }

    results
}

fn write_reports(
    args: &Args,
    results: &[logic::ScenarioResult],
    start_time: Instant,
) -> Result<()> {
    let mut output_target = OutputTarget::new(args.output.clone())?;
    match args.report.as_str() {
        "json" => logic::reports::generate_json_report(&mut output_target, results)?,
        "markdown" => logic::reports::generate_markdown_report(&mut output_target, results)?,
        _ => {
            if results.is_empty() {
                writeln!(&mut output_target, "No logic scenarios executed.")?;
            } else {
                logic::reports::generate_console_report(
                    &mut output_target,
                    results,
                    start_time.elapsed(),
                )?;
            }
            writeln!(&mut output_target)?;
            writeln!(&mut output_target, "🏁 Total time: {:?}", start_time.elapsed())?;
        }
    }
    output_target.flush_inner()?;
    Ok(())
}

fn live_options(args: &Args) -> Result<LiveOptions> {
    let seeds = resolve_seed_inputs(&split_csv(&args.seeds))?;
    Ok(LiveOptions {
        seed: seeds.first().copied().unwrap_or_default(),
        tick: Duration::from_millis(args.tick_ms),
        max_turns: args.max_turns.unwrap_or(DEFAULT_LIVE_TURNS),
        talents: split_csv(&args.talents),
        resume: args.resume.clone(),
        save: args.save.clone(),
        styled: args.output.is_none(),
    })
}

async fn run_live_mode(args: &Args, assets: &TesterAssets) -> Result<bool> {
    announce_banner();
    let opts = live_options(args)?;
    println!(
        "{} seed {} every {:?}",
        "📺 Live run".bright_blue().bold(),
        opts.seed,
        opts.tick
    );
    let mut output_target = OutputTarget::new(args.output.clone())?;
    let summary = run_live(&assets.engine, &opts, &mut output_target).await?;
    output_target.flush_inner()?;

    let reason = summary.reason.as_deref().unwrap_or("-");
    println!(
        "🏁 {} after {} turns (turn {}), reason {}{}",
        summary.lifecycle.to_string().bold(),
        summary.turns_played,
        summary.final_turn,
        reason,
        if summary.interrupted { ", interrupted" } else { "" }
    );
    Ok(true)
}

enum OutputTarget {
    Stdout(BufWriter<std::io::Stdout>),
    File(BufWriter<File>),
}

impl OutputTarget {
    fn new(path: Option<PathBuf>) -> Result<Self> {
        if let Some(path) = path {
            let file = File::create(&path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            Ok(Self::File(BufWriter::new(file)))
        } else {
            Ok(Self::Stdout(BufWriter::new(stdout())))
        }
    }

    fn writer(&mut self) -> &mut dyn Write {
        match self {
            Self::Stdout(w) => w,
            Self::File(w) => w,
        }
    }

    fn flush_inner(&mut self) -> std::io::Result<()> {
        match self {
            Self::Stdout(w) => w.flush(),
            Self::File(w) => w.flush(),
        }
    }
}

impl Write for OutputTarget {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.writer().write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.flush_inner()
    }
}
