use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use log::{info, warn, LevelFilter};
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};

use rust_triage::cli::{Args, CollectOpts, Commands, ParseEvtxOpts};
use rust_triage::collectors::{collect_kinds, store_batches};
use rust_triage::config::{load_or_default, TriageConfig};
use rust_triage::context::CollectionContext;
use rust_triage::evtx::{parse_selected, stage_file, validate_selection, StaticPathProvider};
use rust_triage::export::{JsonSink, RecordSink};
use rust_triage::models::{ArtifactKind, ArtifactRecord};
use rust_triage::privileges;
use rust_triage::store::Store;

fn main() -> Result<()> {
    let args = Args::parse();

    initialize_logging(args.verbose)?;

    match &args.command {
        Commands::InitConfig { path } => init_config(path),
        Commands::Collect(opts) => run_collection(&args, opts),
        Commands::ParseEvtx(opts) => run_parse_evtx(&args, opts),
    }
}

/// Initialize logging with the specified verbosity level
fn initialize_logging(verbose: bool) -> Result<()> {
    let log_level = if verbose { LevelFilter::Debug } else { LevelFilter::Info };
    TermLogger::init(log_level, Config::default(), TerminalMode::Mixed, ColorChoice::Auto)
        .context("Failed to initialize logger")?;
    Ok(())
}

fn init_config(path: &Path) -> Result<()> {
    info!("Creating default configuration file at {}", path.display());
    TriageConfig::create_default_config_file(path)?;
    info!("Configuration created successfully");
    Ok(())
}

/// Load configuration and process environment variables
fn load_and_process_config(args: &Args) -> Result<TriageConfig> {
    let mut config = load_or_default(args.config.as_deref())?;
    config.process_environment_variables();
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn check_privileges(args: &Args) -> Result<()> {
    if !privileges::check_elevation(args.force) {
        return Err(anyhow!(
            "Elevated privileges required. {} or use --force to continue anyway",
            privileges::get_elevation_instructions()
        ));
    }
    Ok(())
}

fn run_collection(args: &Args, opts: &CollectOpts) -> Result<()> {
    let config = load_and_process_config(args)?;
    check_privileges(args)?;

    let db_path = opts
        .db
        .clone()
        .unwrap_or_else(|| PathBuf::from(&config.database_path));
    let kinds = opts.selected_kinds();

    let store = if opts.no_store {
        None
    } else {
        let store = Store::open(&db_path)
            .with_context(|| format!("Failed to open database {}", db_path.display()))?;
        Some(store)
    };

    let ctx = CollectionContext::new(config);
    info!("Starting triage collection of {} artifact kinds on {}", kinds.len(), ctx.platform);

    let batches = collect_kinds(&kinds, &ctx);
    let total: usize = batches.iter().map(|(_, records)| records.len()).sum();
    info!("Triage collection completed: {} records", total);
    ctx.tracker.report_failures();

    if let Some(output) = &opts.output {
        export_batches(output, &batches)?;
    }

    if let Some(store) = &store {
        let rows = store_batches(store, &batches).context("Failed to store collected records")?;
        info!("Saved {} rows to {}", rows, db_path.display());
    }
    Ok(())
}

fn export_batches(path: &Path, batches: &[(ArtifactKind, Vec<ArtifactRecord>)]) -> Result<()> {
    let mut sink = JsonSink::create(path)
        .with_context(|| format!("Failed to create output file {}", path.display()))?;
    for (kind, records) in batches {
        sink.write_records(*kind, records)?;
    }
    sink.finish()?;
    info!("Records exported to {}", path.display());
    Ok(())
}

fn run_parse_evtx(args: &Args, opts: &ParseEvtxOpts) -> Result<()> {
    if !validate_selection(&opts.path) {
        return Err(anyhow!("Not an existing .evtx file: {}", opts.path.display()));
    }
    if args.config.is_some() {
        warn!("The configuration file is not used when parsing event logs");
    }

    let path = if opts.stage {
        stage_file(&opts.path).context("Failed to stage event log")?
    } else {
        opts.path.clone()
    };

    let provider = StaticPathProvider::new(Some(path));
    let events = match parse_selected(&provider)
        .with_context(|| format!("Failed to parse {}", opts.path.display()))?
    {
        Some(events) => events,
        None => return Ok(()),
    };
    info!("Parsed {} events from {}", events.len(), opts.path.display());

    if let Some(db) = &opts.db {
        let store = Store::open(db).with_context(|| format!("Failed to open database {}", db.display()))?;
        let rows = store.save_evtx_events(&events).context("Failed to store events")?;
        info!("Saved {} events to {}", rows, db.display());
    }

    let records: Vec<ArtifactRecord> = events.into_iter().map(ArtifactRecord::Evtx).collect();
    match &opts.output {
        Some(output) => {
            let mut sink = JsonSink::create(output)
                .with_context(|| format!("Failed to create output file {}", output.display()))?;
            sink.write_batch("evtx", &records)?;
            sink.finish()?;
        }
        None if opts.db.is_none() => {
            let mut sink = JsonSink::stdout();
            sink.write_batch("evtx", &records)?;
            sink.finish()?;
        }
        None => {}
    }
    Ok(())
}
