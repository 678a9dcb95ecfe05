use std::sync::Arc;
use tiervec::config::Config;
use tiervec::partition::FsPartitionStore;
use tiervec::registry::{MigrationCriteria, TierRegistry, TierTarget};
use tiervec::search::{ColdVectorSearch, SearchConfig, SearchOptions};
use tiervec::vector::{SourceTable, Tier};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = log_filter_from_args();
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match parse_command()? {
        Command::Stats { source_table } => run_stats(source_table).await,
        Command::Record(opts) => run_record(opts).await,
        Command::Migrate(opts) => run_migrate(opts).await,
        Command::Eligible(opts) => run_eligible(opts).await,
        Command::Search(opts) => run_search(opts).await,
    }
}

async fn run_stats(source_table: Option<SourceTable>) -> anyhow::Result<()> {
    let registry = open_registry()?;
    let stats = registry.statistics(source_table).await?;
    println!(
        "hot={} warm={} cold={} total={}",
        stats.hot, stats.warm, stats.cold, stats.total
    );
    Ok(())
}

async fn run_record(opts: RecordCommand) -> anyhow::Result<()> {
    let registry = open_registry()?;
    let entry = registry
        .record(&opts.id, opts.source_table, opts.tier, opts.location)
        .await?;
    println!(
        "recorded `{}` tier={} location={}",
        entry.id,
        entry.tier,
        entry.location.as_deref().unwrap_or("-")
    );
    Ok(())
}

async fn run_migrate(opts: MigrateCommand) -> anyhow::Result<()> {
    let registry = open_registry()?;
    let target = TierTarget {
        tier: opts.tier,
        location: opts.location,
    };
    match registry.migrate(&opts.id, target).await? {
        Some(entry) => println!(
            "migrated `{}` to tier={} location={}",
            entry.id,
            entry.tier,
            entry.location.as_deref().unwrap_or("-")
        ),
        None => println!("id `{}` is not tracked", opts.id),
    }
    Ok(())
}

async fn run_eligible(opts: EligibleCommand) -> anyhow::Result<()> {
    let registry = open_registry()?;
    let mut criteria = MigrationCriteria::from_tier(opts.from_tier);
    criteria.access_threshold_ms = opts.threshold_ms;
    criteria.max_access_count = opts.max_access_count;
    criteria.limit = opts.limit;
    let entries = registry.find_eligible_for_migration(criteria).await?;
    for entry in &entries {
        println!(
            "{}\ttier={}\taccessed_at={}\taccess_count={}",
            entry.id,
            entry.tier,
            entry
                .accessed_at_ms
                .map(|v| v.to_string())
                .unwrap_or_else(|| "never".to_string()),
            entry.access_count
        );
    }
    println!("{} entries eligible", entries.len());
    Ok(())
}

async fn run_search(opts: SearchCommand) -> anyhow::Result<()> {
    let config = Config::from_env()?;
    let partitions_dir = config
        .partitions_dir()
        .ok_or_else(|| anyhow::anyhow!("search requires DATA_DIR"))?;
    let store = FsPartitionStore::open(&partitions_dir)?;
    let index = store
        .load_cluster_index()?
        .ok_or_else(|| anyhow::anyhow!("no cluster index at {}", partitions_dir.display()))?;
    let engine = ColdVectorSearch::new(
        Arc::new(store),
        index,
        SearchConfig::from_config(&config),
    );
    let k = opts.k.map(|k| k.min(config.max_k));
    let outcome = engine
        .search_with_metadata(SearchOptions {
            vector: opts.vector,
            limit: k,
            max_clusters: None,
            ns: opts.ns,
            entity_type: opts.entity_type,
        })
        .await?;
    for hit in &outcome.results {
        println!(
            "{}\tsimilarity={:.6}\tcluster={}",
            hit.id, hit.similarity, hit.cluster_id
        );
    }
    let meta = &outcome.metadata;
    println!(
        "clusters_searched={:?} vectors_scanned={} missing_partitions={:?} took_ms={}",
        meta.clusters_searched, meta.total_vectors_scanned, meta.missing_partitions, meta.search_time_ms
    );
    Ok(())
}

fn open_registry() -> anyhow::Result<TierRegistry> {
    let config = Config::from_env()?;
    let path = config
        .registry_path()
        .ok_or_else(|| anyhow::anyhow!("DATA_DIR or REGISTRY_DB_PATH required"))?;
    Ok(TierRegistry::open(path)?)
}

enum Command {
    Stats { source_table: Option<SourceTable> },
    Record(RecordCommand),
    Migrate(MigrateCommand),
    Eligible(EligibleCommand),
    Search(SearchCommand),
}

struct RecordCommand {
    id: String,
    source_table: SourceTable,
    tier: Tier,
    location: Option<String>,
}

struct MigrateCommand {
    id: String,
    tier: Tier,
    location: Option<String>,
}

struct EligibleCommand {
    from_tier: Tier,
    threshold_ms: Option<u64>,
    max_access_count: Option<u64>,
    limit: Option<usize>,
}

struct SearchCommand {
    vector: Vec<f32>,
    k: Option<usize>,
    ns: Option<String>,
    entity_type: Option<String>,
}

fn parse_command() -> anyhow::Result<Command> {
    let args: Vec<String> = std::env::args().collect();
    let Some(subcommand) = args.get(1) else {
        anyhow::bail!("usage: tiervec <stats|record|migrate|eligible|search> [flags]");
    };
    match subcommand.as_str() {
        "stats" => {
            let source_table = flag_value(&args[2..], "--source-table")
                .map(|raw| parse_source_table(&raw))
                .transpose()?;
            Ok(Command::Stats { source_table })
        }
        "record" => {
            let id = required_flag(&args[2..], "--id")?;
            let source_table = parse_source_table(&required_flag(&args[2..], "--source-table")?)?;
            let tier = parse_tier(&required_flag(&args[2..], "--tier")?)?;
            let location = flag_value(&args[2..], "--location");
            Ok(Command::Record(RecordCommand {
                id,
                source_table,
                tier,
                location,
            }))
        }
        "migrate" => {
            let id = required_flag(&args[2..], "--id")?;
            let tier = parse_tier(&required_flag(&args[2..], "--tier")?)?;
            let location = flag_value(&args[2..], "--location");
            Ok(Command::Migrate(MigrateCommand { id, tier, location }))
        }
        "eligible" => {
            let from_tier = parse_tier(&required_flag(&args[2..], "--from-tier")?)?;
            let threshold_ms = parse_optional(&args[2..], "--threshold-ms")?;
            let max_access_count = parse_optional(&args[2..], "--max-access-count")?;
            let limit = parse_optional(&args[2..], "--limit")?;
            Ok(Command::Eligible(EligibleCommand {
                from_tier,
                threshold_ms,
                max_access_count,
                limit,
            }))
        }
        "search" => {
            let raw = required_flag(&args[2..], "--vector")?;
            let vector = raw
                .split(',')
                .map(|part| part.trim().parse::<f32>())
                .collect::<Result<Vec<_>, _>>()
                .map_err(|_| anyhow::anyhow!("--vector expects comma-separated floats"))?;
            if vector.is_empty() {
                anyhow::bail!("--vector must not be empty");
            }
            let k = parse_optional(&args[2..], "--k")?;
            let ns = flag_value(&args[2..], "--ns");
            let entity_type = flag_value(&args[2..], "--type");
            Ok(Command::Search(SearchCommand {
                vector,
                k,
                ns,
                entity_type,
            }))
        }
        other => anyhow::bail!(
            "unknown subcommand `{other}` (use stats|record|migrate|eligible|search)"
        ),
    }
}

fn flag_value(args: &[String], flag: &str) -> Option<String> {
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if arg == flag {
            return iter.next().cloned();
        }
    }
    None
}

fn required_flag(args: &[String], flag: &str) -> anyhow::Result<String> {
    flag_value(args, flag).ok_or_else(|| anyhow::anyhow!("`{flag} <value>` is required"))
}

fn parse_optional<T: std::str::FromStr>(args: &[String], flag: &str) -> anyhow::Result<Option<T>> {
    let Some(raw) = flag_value(args, flag) else {
        return Ok(None);
    };
    raw.parse::<T>()
        .map(Some)
        .map_err(|_| anyhow::anyhow!("`{flag}` has an invalid value `{raw}`"))
}

fn parse_tier(raw: &str) -> anyhow::Result<Tier> {
    Tier::parse(raw).ok_or_else(|| anyhow::anyhow!("unknown tier `{raw}` (hot|warm|cold)"))
}

fn parse_source_table(raw: &str) -> anyhow::Result<SourceTable> {
    SourceTable::parse(raw)
        .ok_or_else(|| anyhow::anyhow!("unknown source table `{raw}` (things|relationships)"))
}

fn log_filter_from_args() -> EnvFilter {
    if let Some(level) = parse_log_arg() {
        return EnvFilter::new(level);
    }
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

fn parse_log_arg() -> Option<String> {
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--logs" {
            let Some(raw) = args.next() else {
                eprintln!("`--logs` expects a value (info|warning|error). Using `info`.");
                return Some("info".to_string());
            };
            if let Some(level) = map_log_level(&raw) {
                return Some(level.to_string());
            }
            eprintln!("Unknown log level `{raw}`. Use info, warning or error. Using `info`.");
            return Some("info".to_string());
        }
    }
    None
}

fn map_log_level(raw: &str) -> Option<&'static str> {
    match raw.to_ascii_lowercase().as_str() {
        "info" => Some("info"),
        "warning" | "warn" => Some("warn"),
        "error" | "critical" => Some("error"),
        _ => None,
    }
}
