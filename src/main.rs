use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use code_indexer::config::{Config, ProviderKind};
use code_indexer::db::{ChunkStore, Db, IndexStats};
use code_indexer::embedder::Embedder;
use code_indexer::embedder::mock::MockEmbedder;
use code_indexer::embedder::openai::OpenAiEmbedder;
use code_indexer::indexer::Indexer;
use code_indexer::indexer::extractor::chunk_directory;
use code_indexer::retriever::{Retriever, SearchResult};

#[derive(Parser)]
#[command(
    name = "code-indexer",
    version,
    about = "Index TypeScript/JavaScript code units and search them semantically"
)]
struct Cli {
    /// Path to configuration file (default: code-indexer.json)
    #[arg(long, global = true, default_value = "")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Chunk a source directory and index every chunk
    Index {
        /// Directory to index (default: source_dir from config)
        path: Option<PathBuf>,
        /// Embedding API key (overrides config and OPENAI_API_KEY)
        api_key: Option<String>,
    },
    /// Semantic search over indexed chunks
    Search {
        query: String,
        #[arg(long)]
        limit: Option<usize>,
        #[arg(long)]
        threshold: Option<f32>,
    },
    /// Substring search over chunk code and names
    Keyword {
        keyword: String,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Show index statistics
    Stats,
    /// Read queries from stdin and search each one
    Interactive,
}

/// Everything a command needs: configuration, the open store and the
/// embedding provider.
struct App {
    config: Config,
    db: Db,
    embedder: Box<dyn Embedder>,
}

impl App {
    fn open(config: Config, api_key: Option<&str>) -> Result<Self> {
        let db = open_store(&config)?;
        let embedder = build_embedder(&config, api_key)?;
        Ok(Self {
            config,
            db,
            embedder,
        })
    }

    fn retriever(&self) -> Retriever<'_, Db, dyn Embedder> {
        Retriever::new(&self.db, self.embedder.as_ref())
    }
}

/// Validates the configuration and opens the index. Keyword lookup and
/// statistics need nothing else.
fn open_store(config: &Config) -> Result<Db> {
    config.validate().context("invalid configuration")?;
    Db::open(&config.db_path, &config.store_options())
        .with_context(|| format!("failed to open index at {}", config.db_path))
}

fn build_embedder(config: &Config, api_key: Option<&str>) -> Result<Box<dyn Embedder>> {
    let emb = &config.embedding;
    match emb.provider {
        ProviderKind::Mock => Ok(Box::new(MockEmbedder::new(emb.dimensions))),
        ProviderKind::Openai => {
            let key = config.api_key(api_key).unwrap_or_default();
            let embedder = OpenAiEmbedder::new(
                &key,
                &emb.api_base,
                &emb.model,
                emb.dimensions,
                Duration::from_secs(emb.timeout_secs),
            )
            .context("failed to create OpenAI embedder")?;
            info!("Using OpenAI embeddings ({}, {} dims)", embedder.model(), emb.dimensions);
            Ok(Box::new(embedder))
        }
    }
}

fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) =
        ProgressStyle::default_spinner().template("{spinner:.cyan} {msg} [{elapsed}]")
    {
        pb.set_style(style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

fn print_stats(out: &mut impl Write, stats: &IndexStats) -> io::Result<()> {
    writeln!(out, "\nDatabase Statistics:")?;
    writeln!(out, "Total chunks: {}", stats.total_chunks)?;
    writeln!(out, "Chunk types: {:?}", stats.chunk_types)?;
    writeln!(out, "Files indexed: {}", stats.files.len())
}

fn print_results(out: &mut impl Write, results: &[SearchResult]) -> io::Result<()> {
    if results.is_empty() {
        return writeln!(out, "No results found.");
    }

    writeln!(out, "\nFound {} results:", results.len())?;
    writeln!(out, "{}", "=".repeat(80))?;

    for (i, result) in results.iter().enumerate() {
        let r = &result.record;
        writeln!(out, "\n{}. {} ({})", i + 1, r.chunk_name, r.chunk_type)?;
        writeln!(out, "   File: {}", r.file_name)?;
        writeln!(out, "   Lines: {}-{}", r.start_line, r.end_line)?;
        writeln!(out, "   Similarity: {:.3}", result.similarity)?;
        writeln!(out, "   Code preview:")?;

        let lines: Vec<&str> = r.code.split('\n').collect();
        for line in lines.iter().take(5) {
            writeln!(out, "   {line}")?;
        }
        if lines.len() > 5 {
            writeln!(out, "   ...")?;
        }
        writeln!(out, "{}", "-".repeat(40))?;
    }
    Ok(())
}

fn run_index(app: &mut App, path: Option<PathBuf>) -> Result<()> {
    let root = path.unwrap_or_else(|| PathBuf::from(&app.config.source_dir));
    println!("Starting codebase indexing from {}...", root.display());

    let extractor = app.config.extractor.build();
    let found = chunk_directory(extractor.as_ref(), &root, &app.config.extensions);

    println!("Found {} source files:", found.files.len());
    for f in found.files.iter().take(5) {
        println!("  - {}", f.display());
    }
    if found.files.len() > 5 {
        println!("  ... and {} more files", found.files.len() - 5);
    }
    if !found.failed.is_empty() {
        println!("Skipped {} files that could not be chunked", found.failed.len());
    }

    println!("Chunks found: {}", found.chunks.len());
    if let Some(first) = found.chunks.first() {
        let preview: String = first.code.chars().take(100).collect();
        println!("First chunk details:");
        println!("  Type: {}", first.chunk_type);
        println!("  Name: {}", first.name);
        println!("  File: {}", first.file.file_path);
        println!("  Lines: {}-{}", first.start_line, first.end_line);
        println!("  Code preview: {preview}...");
    }

    let pb = spinner(&format!("Indexing {} chunks...", found.chunks.len()));
    let indexed = {
        let mut indexer = Indexer::new(
            &mut app.db,
            app.embedder.as_ref(),
            app.config.splitter(),
            app.config.embed_text,
        );
        indexer.index_chunks(&found.chunks)
    };
    pb.finish_and_clear();

    println!("Indexing completed! Indexed {indexed} chunks");
    let stats = app.db.stats().context("failed to read statistics")?;
    print_stats(&mut io::stdout(), &stats)?;
    Ok(())
}

fn run_keyword(
    store: &impl ChunkStore,
    out: &mut impl Write,
    keyword: &str,
    limit: usize,
) -> Result<()> {
    let records = store
        .keyword_search(keyword, limit)
        .context("keyword search failed")?;
    writeln!(out, "Found {} matches for '{keyword}':", records.len())?;
    for r in &records {
        writeln!(
            out,
            "  {} ({}) {}:{}-{}",
            r.chunk_name, r.chunk_type, r.file_path, r.start_line, r.end_line
        )?;
    }
    Ok(())
}

fn run_search(
    app: &App,
    out: &mut impl Write,
    query: &str,
    limit: usize,
    threshold: f32,
) -> Result<()> {
    writeln!(out, "Searching for: '{query}'")?;
    let results = app
        .retriever()
        .search_similar(query, limit, threshold)
        .context("search failed")?;
    print_results(out, &results)?;
    Ok(())
}

/// Search loop: one query per line until `quit` or end of input. Errors are
/// printed and the loop continues.
fn run_interactive(app: &App, input: impl BufRead, out: &mut impl Write) -> Result<()> {
    writeln!(out, "Interactive Code Search Mode")?;
    writeln!(out, "Type 'quit' to exit")?;
    writeln!(out, "{}", "-".repeat(40))?;

    let mut lines = input.lines();
    loop {
        write!(out, "\nEnter search query: ")?;
        out.flush()?;

        let Some(line) = lines.next() else {
            break;
        };
        let query = line?;
        let query = query.trim();

        if query.eq_ignore_ascii_case("quit") {
            break;
        }
        if query.is_empty() {
            continue;
        }

        let (limit, threshold) = (app.config.search_limit, app.config.search_threshold);
        if let Err(e) = run_search(app, out, query, limit, threshold) {
            writeln!(out, "Error: {e:#}")?;
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::load(&cli.config)?;

    match cli.command {
        Command::Index { path, api_key } => {
            let mut app = App::open(config, api_key.as_deref())?;
            run_index(&mut app, path)?;
        }
        Command::Search {
            query,
            limit,
            threshold,
        } => {
            let app = App::open(config, None)?;
            let limit = limit.unwrap_or(app.config.search_limit);
            let threshold = threshold.unwrap_or(app.config.search_threshold);
            run_search(&app, &mut io::stdout(), &query, limit, threshold)?;
        }
        Command::Keyword { keyword, limit } => {
            let db = open_store(&config)?;
            let limit = limit.unwrap_or(config.search_limit);
            run_keyword(&db, &mut io::stdout(), &keyword, limit)?;
        }
        Command::Stats => {
            let db = open_store(&config)?;
            let stats = db.stats().context("failed to read statistics")?;
            print_stats(&mut io::stdout(), &stats)?;
        }
        Command::Interactive => {
            let app = App::open(config, None)?;
            info!("Interactive search over {}", app.config.db_path);
            run_interactive(&app, io::stdin().lock(), &mut io::stdout())?;
        }
    }

    Ok(())
}
