use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

// Import from chatlens-core
use chatlens_core::classifier::CategoryClassifier;
use chatlens_core::export::{default_export_name, listing, paginate, save_records_csv, save_report_json};
use chatlens_core::{default_analyzer, load_messages, AnalysisConfig, AnalysisPipeline, Category, StepProfiler};

// Import CLI utilities
use chatlens_cli::display::{category_lines, keyword_lines, page_lines};
use chatlens_cli::{resolve_range, select_storage};

#[derive(Parser)]
#[command(name = "chatlens")]
#[command(about = "Keyword ranking and category classification for support chat logs")]
struct Args {
    /// Path to the chat log CSV (columns: timestamp, user_id, message)
    #[arg(short, long, default_value = "data/sample_chat.csv")]
    input: String,

    /// Path to custom config file (YAML format)
    #[arg(short, long)]
    config: Option<String>,

    /// First day of the date filter (YYYY-MM-DD)
    #[arg(long)]
    start: Option<NaiveDate>,

    /// Last day of the date filter (YYYY-MM-DD, default: today)
    #[arg(long)]
    end: Option<NaiveDate>,

    /// Analyze the whole dataset, ignoring the date filter
    #[arg(long, conflicts_with_all = ["start", "end"])]
    all: bool,

    /// Gemini API key; without one, messages are classified with keyword rules only
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Number of keywords to show (overrides config)
    #[arg(short = 'n', long)]
    top_n: Option<usize>,

    /// Only list messages of this category (e.g. error/trouble, feature-request)
    #[arg(long)]
    category: Option<String>,

    /// Page of the message listing to show
    #[arg(short, long, default_value_t = 1)]
    page: usize,

    /// Export the listed messages as CSV (default name: chat_analysis_YYYYMMDD.csv)
    #[arg(long, num_args = 0..=1, default_missing_value = "")]
    export: Option<String>,

    /// Write the full report as JSON to this path
    #[arg(short, long)]
    output: Option<String>,

    /// Keep classification results on disk and reuse them in later runs
    /// (off by default: results are only reused within one run)
    #[arg(long)]
    persist_cache: bool,

    /// Directory for persisted classification results (with --persist-cache)
    #[arg(long, requires = "persist_cache")]
    cache_dir: Option<String>,

    /// Enable timing of all pipeline steps
    #[arg(long)]
    profile: bool,

    /// Debug-level logging (RUST_LOG takes precedence)
    #[arg(short, long)]
    verbose: bool,

    /// Show available config options and exit
    #[arg(long)]
    show_configs: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    println!("🦀 Chatlens Chat Log Analyzer");

    if args.show_configs {
        show_help();
        return Ok(());
    }

    if !Path::new(&args.input).exists() {
        println!("⚠️  Chat log not found at: {}", args.input);
        println!("   Please check the file path.");
        return Ok(());
    }

    if let Err(e) = run(&args) {
        eprintln!("❌ Analysis failed: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn run(args: &Args) -> Result<()> {
    let mut config = AnalysisConfig::load_with_fallback(args.config.as_deref());
    if let Some(config_path) = &args.config {
        println!("📋 Loaded config from: {}", config_path);
    } else {
        println!("📋 Using default config");
    }
    if let Some(top_n) = args.top_n {
        config.keywords.top_n = top_n;
    }

    let category_filter = match args.category.as_deref() {
        Some(key) => Some(parse_category(key, &config)?),
        None => None,
    };

    let messages = load_messages(&args.input)
        .with_context(|| format!("Failed to load chat log {}", args.input))?;
    println!("📄 Loaded {} messages from {}", messages.len(), args.input);

    let today = Local::now().date_naive();
    let range = resolve_range(
        args.start,
        args.end,
        args.all,
        config.dashboard.default_range_days,
        today,
    )?;
    match &range {
        Some(range) => println!("📅 Period: {} .. {}", range.start, range.end),
        None => println!("📅 Period: all messages"),
    }

    let mut pipeline = create_pipeline(args, config)?;
    let mut profiler = StepProfiler::new(args.profile);
    let report = pipeline.run_with_profiler(&messages, range, &mut profiler)?;
    let config = pipeline.config();

    if report.from_cache {
        println!("🎯 Cache hit: reused classification for this batch");
    }
    if let Some(model) = &report.preferred_model {
        println!("🤖 Classified with model: {}", model);
    }

    println!("\n🔑 Top {} keywords:", config.keywords.top_n);
    print_lines(&keyword_lines(&report.keywords));

    println!("\n📊 Messages per category:");
    print_lines(&category_lines(&report.category_counts, &config.taxonomy));

    let listed = listing(&report.records, category_filter);
    let page = paginate(&listed, args.page, config.dashboard.page_size);
    match category_filter {
        Some(category) => println!("\n📝 Messages ({}):", config.taxonomy.label(category)),
        None => println!("\n📝 Messages:"),
    }
    print_lines(&page_lines(&page, &config.taxonomy, config.dashboard.page_size));

    if !report.diagnostics.is_empty() {
        println!("\nℹ️  Notes:");
        for diagnostic in &report.diagnostics {
            println!("   - {}", diagnostic);
        }
    }

    if let Some(export) = &args.export {
        let path = if export.is_empty() {
            PathBuf::from(default_export_name(today))
        } else {
            PathBuf::from(export)
        };
        save_records_csv(&path, &listed, &config.taxonomy)?;
        println!("\n💾 Exported {} messages to: {}", listed.len(), path.display());
    }

    if let Some(output) = &args.output {
        save_report_json(&report, output)?;
        println!("💾 Report saved to: {}", output);
    }

    let summary = profiler.summary_lines();
    if !summary.is_empty() {
        println!("\n📊 Performance Summary:");
        for line in summary {
            println!("   {}", line);
        }
    }

    Ok(())
}

fn create_pipeline(args: &Args, config: AnalysisConfig) -> Result<AnalysisPipeline> {
    let analyzer = default_analyzer()?;
    println!("🔤 Tokenizer: {}", analyzer.name());

    let classifier = CategoryClassifier::from_credential(&config, args.api_key.as_deref());
    if classifier.is_offline() {
        println!("🧭 No API key set, classifying with keyword rules");
    } else {
        println!("🚀 Using {} classification backend", classifier.backend_name());
    }

    let storage = select_storage(args.persist_cache, args.cache_dir.as_deref().map(Path::new))?;
    if args.persist_cache {
        println!("💾 Persistent classification cache enabled");
    }

    AnalysisPipeline::new_with_dependencies(config, analyzer, classifier, storage)
}

fn parse_category(key: &str, config: &AnalysisConfig) -> Result<Category> {
    Category::from_key(key)
        .or_else(|| {
            config
                .taxonomy
                .labels()
                .find(|(_, label)| *label == key)
                .map(|(category, _)| category)
        })
        .ok_or_else(|| {
            let keys: Vec<&str> = Category::ALL.iter().map(|c| c.key()).collect();
            anyhow::anyhow!("Unknown category '{}' (expected one of: {})", key, keys.join(", "))
        })
}

fn print_lines(lines: &[String]) {
    for line in lines {
        println!("{}", line);
    }
}

fn show_help() {
    println!("\n📋 Available Configuration Options:");
    println!("  --input <path>          Chat log CSV (timestamp, user_id, message)");
    println!("  --config <path>         Load custom config file");
    println!("  --start/--end <date>    Date filter, inclusive (default: last 60 days)");
    println!("  --all                   Analyze every message");
    println!("  --api-key <key>         Gemini API key (or GEMINI_API_KEY)");
    println!("  --top-n <n>             Number of keywords to show");
    println!("  --category <key>        List only one category");
    println!("  --page <n>              Page of the message listing");
    println!("  --export [path]         Export listed messages as CSV");
    println!("  --output <path>         Save the full report as JSON");
    println!("  --persist-cache         Reuse classifications across runs");
    println!("  --cache-dir <path>      Persistent cache location (default: ~/.local/share/chatlens/cache)");

    println!("\n🏷️  Categories:");
    let defaults = AnalysisConfig::default();
    for (category, label) in defaults.taxonomy.labels() {
        println!("  {:<20} {}", category.key(), label);
    }

    println!("\n📁 Example config files in ./configs/:");
    println!("  default.yaml  - Default keyword filters, labels, rules and models");

    println!("\n📝 Usage Examples:");
    println!("  cargo run -- -i data/sample_chat.csv --all");
    println!("  cargo run -- --start 2024-05-01 --end 2024-05-31 --category error/trouble");
    println!("  GEMINI_API_KEY=... cargo run -- --all --export");
}
