//! Ontoclosure CLI
//!
//! Operator entry point for:
//! - Running the closure indexer over a query-result CSV of filtering terms
//! - Inspecting ancestors, descendants and "including descendants" expansions
//! - Importing and querying the term catalog (where each term is used)

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use ontoclosure_indexer::store::{FileStore, IndexStore};
use ontoclosure_indexer::{
    classify, ClosureIndexer, ClosureLookup, CsvTermSource, IndexerConfig, RunSummary,
    TermCatalog, TermSource,
};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "ontoclosure")]
#[command(
    author,
    version,
    about = "Ontoclosure: ancestor/descendant closure index for ontology terms"
)]
struct Cli {
    /// JSON config file (env vars and flags override it)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Index snapshot (`.cbor`, or `.json` for a readable snapshot)
    #[arg(long, global = true, default_value = "ontoclosure-index.cbor")]
    store: PathBuf,

    /// Log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch ancestors for every unindexed term and update the closure index.
    Index {
        /// Query-result CSV: header row, then one term per row
        #[arg(long)]
        terms: PathBuf,
        /// Override the worker pool capacity
        #[arg(long)]
        workers: Option<usize>,
        /// Print the run summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show how a term file partitions into namespaces (no network).
    Classify {
        #[arg(long)]
        terms: PathBuf,
    },

    /// Print the indexed ancestors of a term.
    Ancestors { term: String },

    /// Print the indexed descendants of a term.
    Descendants { term: String },

    /// Expand terms to themselves plus all indexed descendants.
    Expand {
        #[arg(required = true)]
        terms: Vec<String>,
    },

    /// Term catalog (table/column occurrences of terms).
    Catalog {
        #[command(subcommand)]
        command: CatalogCommands,
    },
}

#[derive(Subcommand)]
enum CatalogCommands {
    /// Upsert rows of a `term,tablename,colname,type,label` CSV.
    Import {
        #[arg(long)]
        input: PathBuf,
    },
    /// List catalog entries by term or by table.
    Show {
        #[arg(long, conflicts_with = "table")]
        term: Option<String>,
        #[arg(long)]
        table: Option<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Index {
            terms,
            workers,
            json,
        } => cmd_index(cli.config.as_deref(), &cli.store, &terms, workers, json),
        Commands::Classify { terms } => cmd_classify(&terms),
        Commands::Ancestors { term } => cmd_ancestors(&cli.store, &term),
        Commands::Descendants { term } => cmd_descendants(&cli.store, &term),
        Commands::Expand { terms } => cmd_expand(&cli.store, &terms),
        Commands::Catalog { command } => match command {
            CatalogCommands::Import { input } => cmd_catalog_import(&cli.store, &input),
            CatalogCommands::Show { term, table } => {
                cmd_catalog_show(&cli.store, term.as_deref(), table.as_deref())
            }
        },
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        _ => tracing::Level::DEBUG,
    };
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn open_store(path: &Path) -> Result<Arc<dyn IndexStore>> {
    let store = FileStore::open(path)
        .with_context(|| format!("failed to open index store {}", path.display()))?;
    Ok(Arc::new(store))
}

fn load_config(path: Option<&Path>, workers: Option<usize>) -> Result<IndexerConfig> {
    let mut config = IndexerConfig::load(path).context("failed to load indexer config")?;
    if let Some(workers) = workers {
        config.max_workers = workers;
    }
    config.validate()?;
    Ok(config)
}

// ============================================================================
// Commands
// ============================================================================

fn cmd_index(
    config_path: Option<&Path>,
    store_path: &Path,
    terms: &Path,
    workers: Option<usize>,
    json: bool,
) -> Result<()> {
    let config = load_config(config_path, workers)?;
    let store = open_store(store_path)?;
    let indexer = ClosureIndexer::new(&config, store).context("failed to build indexer")?;

    eprintln!("{} {}", "Indexing".green().bold(), terms.display());
    let summary = indexer
        .run(&CsvTermSource::new(terms))
        .with_context(|| format!("indexing run over {} failed", terms.display()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary, store_path);
    }
    Ok(())
}

fn print_summary(summary: &RunSummary, store_path: &Path) {
    println!(
        "{} {} distinct terms, {} already indexed, {} scheduled",
        "ok".green().bold(),
        summary.distinct_terms,
        summary.already_indexed,
        summary.scheduled
    );
    println!(
        "  resolved: {}  ancestor records: {}  descendant records: {} new, {} merged",
        summary.resolved,
        summary.ancestor_records,
        summary.descendant_records_created,
        summary.descendant_records_merged
    );
    if !summary.unresolved.is_empty() {
        println!(
            "  {} {} terms unresolved (retried next run)",
            "info:".yellow().bold(),
            summary.unresolved.len()
        );
        for term in &summary.unresolved {
            println!("    {term}");
        }
    }
    if !summary.skipped_namespaces.is_empty() {
        let names: Vec<&str> = summary.skipped_namespaces.iter().map(String::as_str).collect();
        println!(
            "  {} unregistered namespaces skipped: {}",
            "info:".yellow().bold(),
            names.join(", ")
        );
    }
    println!("  store: {}", store_path.display().to_string().bold());
}

fn cmd_classify(terms: &Path) -> Result<()> {
    let source = CsvTermSource::new(terms);
    let rows = source
        .terms()
        .with_context(|| format!("failed to read {}", terms.display()))?;
    let clusters = classify(&rows);
    for (namespace, members) in &clusters {
        println!("{} {}", namespace.bold(), members.len());
    }
    Ok(())
}

fn print_terms<'a>(terms: impl IntoIterator<Item = &'a ontoclosure_indexer::Term>) {
    for term in terms {
        println!("{term}");
    }
}

fn cmd_ancestors(store_path: &Path, term: &str) -> Result<()> {
    let lookup = ClosureLookup::new(open_store(store_path)?);
    let ancestors = lookup
        .ancestors(term)?
        .ok_or_else(|| anyhow!("`{term}` is not indexed"))?;
    print_terms(&ancestors);
    Ok(())
}

fn cmd_descendants(store_path: &Path, term: &str) -> Result<()> {
    let lookup = ClosureLookup::new(open_store(store_path)?);
    match lookup.descendants(term)? {
        Some(descendants) => print_terms(&descendants),
        None => eprintln!("{} no descendants recorded for `{term}`", "info:".yellow().bold()),
    }
    Ok(())
}

fn cmd_expand(store_path: &Path, terms: &[String]) -> Result<()> {
    let lookup = ClosureLookup::new(open_store(store_path)?);
    print_terms(&lookup.expand_all(terms)?);
    Ok(())
}

fn cmd_catalog_import(store_path: &Path, input: &Path) -> Result<()> {
    let catalog = TermCatalog::new(open_store(store_path)?);
    let written = catalog
        .import_csv(input)
        .with_context(|| format!("failed to import catalog {}", input.display()))?;
    println!(
        "{} imported {written} catalog entries into {}",
        "ok".green().bold(),
        store_path.display()
    );
    Ok(())
}

fn cmd_catalog_show(store_path: &Path, term: Option<&str>, table: Option<&str>) -> Result<()> {
    let catalog = TermCatalog::new(open_store(store_path)?);
    let entries = match (term, table) {
        (Some(term), _) => catalog.by_term(term)?,
        (None, Some(table)) => catalog.by_table(table)?,
        (None, None) => return Err(anyhow!("pass --term or --table")),
    };
    let tables: BTreeSet<&str> = entries.iter().map(|e| e.table_name.as_str()).collect();
    for entry in &entries {
        println!(
            "{}.{}\t{}\t{}\t{}",
            entry.table_name, entry.column_name, entry.term, entry.kind, entry.label
        );
    }
    eprintln!("{} entries across {} tables", entries.len(), tables.len());
    Ok(())
}
