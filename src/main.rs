mod clean;
mod config;
mod crawler;
mod db;
mod literal;
mod load;
mod parser;
mod records;

use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{Parser, Subcommand};

use config::CrawlSettings;

#[derive(Parser)]
#[command(name = "pokedex_etl", about = "Pokédex crawler, cleaner and loader")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Crawl the listing and every species page into a raw CSV
    Crawl {
        /// Listing page to start from
        #[arg(long, default_value = config::START_URL)]
        start_url: String,
        /// Raw CSV destination
        #[arg(short, long, default_value = config::RAW_CSV_PATH)]
        output: PathBuf,
        /// Max concurrent requests
        #[arg(short, long, default_value_t = config::CONCURRENCY)]
        concurrency: usize,
        /// Max species pages to crawl (default: all)
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
    /// Normalize the raw CSV into the cleaned CSV
    Clean {
        #[arg(short, long, default_value = config::RAW_CSV_PATH)]
        input: PathBuf,
        #[arg(short, long, default_value = config::CLEAN_CSV_PATH)]
        output: PathBuf,
    },
    /// Upsert the cleaned CSV into the document store
    Load {
        #[arg(short, long, default_value = config::CLEAN_CSV_PATH)]
        input: PathBuf,
        /// Keep existing documents instead of clearing first
        #[arg(long)]
        append: bool,
    },
    /// Crawl + clean + load with the default paths
    Run {
        /// Max species pages to crawl
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
    /// Canned queries over the loaded documents
    Query {
        /// Count species with at least this many types
        #[arg(long, default_value_t = 2)]
        min_types: usize,
        /// Type for the late-evolver listing
        #[arg(long = "type", default_value = "Water")]
        tipo: String,
        /// List species evolving strictly above this level
        #[arg(long, default_value_t = 30)]
        level: i64,
    },
    /// Print one stored document as JSON
    Show {
        /// National dex number
        numero: i64,
    },
    /// Show document store statistics
    Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Crawl {
            start_url,
            output,
            concurrency,
            limit,
        } => {
            let settings = CrawlSettings {
                start_url,
                concurrency,
                limit,
                ..Default::default()
            };
            run_crawl(&settings, &output).await
        }
        Commands::Clean { input, output } => run_clean(&input, &output),
        Commands::Load { input, append } => run_load(&input, append),
        Commands::Run { limit } => {
            let raw = Path::new(config::RAW_CSV_PATH);
            let cleaned = Path::new(config::CLEAN_CSV_PATH);
            let settings = CrawlSettings {
                limit,
                ..Default::default()
            };

            // Phase 1: Crawl
            let t_crawl = Instant::now();
            run_crawl(&settings, raw).await?;
            println!("Crawled in {}", format_duration(t_crawl.elapsed()));

            // Phase 2: Clean
            let t_clean = Instant::now();
            run_clean(raw, cleaned)?;
            println!("Cleaned in {}", format_duration(t_clean.elapsed()));

            // Phase 3: Load
            let t_load = Instant::now();
            run_load(cleaned, false)?;
            println!("Loaded in {}", format_duration(t_load.elapsed()));
            Ok(())
        }
        Commands::Query {
            min_types,
            tipo,
            level,
        } => {
            let conn = db::connect(&config::db_path())?;
            db::init_schema(&conn)?;

            let n = db::count_with_min_types(&conn, min_types)?;
            println!("Species with at least {} types: {}", min_types, n);

            let rows = db::evolving_after_level(&conn, &tipo, level)?;
            if rows.is_empty() {
                println!("No {} species evolve after level {}.", tipo, level);
                return Ok(());
            }
            println!("\n{} species evolving after level {}:", tipo, level);
            println!("{:>5} | {:<16} | {:>5} | {:<16}", "#", "Name", "Level", "Evolves to");
            println!("{}", "-".repeat(52));
            for r in &rows {
                let numero = r.numero.map(|n| n.to_string()).unwrap_or_else(|| "-".into());
                println!(
                    "{:>5} | {:<16} | {:>5} | {:<16}",
                    numero,
                    r.nome.as_deref().unwrap_or("-"),
                    r.level,
                    r.evolves_to.as_deref().unwrap_or("-"),
                );
            }
            println!("\n{} species", rows.len());
            Ok(())
        }
        Commands::Show { numero } => {
            let conn = db::connect(&config::db_path())?;
            db::init_schema(&conn)?;
            match db::fetch_by_numero(&conn, numero)? {
                Some(doc) => println!("{}", serde_json::to_string_pretty(&doc)?),
                None => println!("No document with numero {}.", numero),
            }
            Ok(())
        }
        Commands::Stats => {
            let conn = db::connect(&config::db_path())?;
            db::init_schema(&conn)?;
            let s = db::get_stats(&conn)?;
            println!("Documents:      {}", s.total);
            println!("With number:    {}", s.numbered);
            println!("With evolution: {}", s.with_evolution);
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

async fn run_crawl(settings: &CrawlSettings, output: &Path) -> anyhow::Result<()> {
    println!("Crawling {} (writing {})...", settings.start_url, output.display());
    let stats = crawler::crawl(settings, output).await?;
    println!(
        "Done: {} pages ({} ok, {} errors).",
        stats.total, stats.ok, stats.errors
    );
    Ok(())
}

fn run_clean(input: &Path, output: &Path) -> anyhow::Result<()> {
    let stats = clean::clean_file(input, output)?;
    println!(
        "Read {} rows: {} duplicates, {} blank, {} written to {}.",
        stats.read,
        stats.duplicates,
        stats.dropped,
        stats.written,
        output.display()
    );
    Ok(())
}

fn run_load(input: &Path, append: bool) -> anyhow::Result<()> {
    let conn = db::connect(&config::db_path())?;
    db::init_schema(&conn)?;
    let stats = load::load_file(&conn, input, append)?;
    println!(
        "Saved {} inserted, {} modified, {} unchanged, {} failed.",
        stats.inserted, stats.modified, stats.unchanged, stats.failed
    );
    Ok(())
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
