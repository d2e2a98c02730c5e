use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use fynd::{api, load_catalog, EngineConfig, Product, SearchEngine};
use std::io::{self, BufRead, Write};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

// CLI Arguments
#[derive(Parser, Debug)]
#[command(author, version, about = "Product search over a marketplace catalog", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the JSON search API
    Serve {
        #[command(flatten)]
        source: CatalogArgs,

        #[arg(long, default_value = "0.0.0.0")]
        host: String,

        #[arg(short, long, default_value_t = 5000)]
        port: u16,
    },
    /// Print ranked products for one query, or prompt for queries when
    /// `--query` is omitted
    Search {
        #[command(flatten)]
        source: CatalogArgs,

        #[arg(short, long)]
        query: Option<String>,

        #[arg(short, long, default_value_t = fynd::config::DEFAULT_TOP_N)]
        limit: usize,
    },
}

#[derive(Args, Debug)]
struct CatalogArgs {
    /// Catalog export: .csv with a header row or a JSON array, optionally .gz
    #[arg(short, long, default_value = "flipkart_com-ecommerce_sample.csv")]
    catalog: PathBuf,

    /// Rank on text relevance only, ignoring discount and rating
    #[arg(long)]
    no_popularity_boost: bool,
}

impl CatalogArgs {
    fn build_engine(&self) -> Result<SearchEngine> {
        let start = Instant::now();
        let products = load_catalog(&self.catalog)
            .with_context(|| format!("Failed to load catalog {}", self.catalog.display()))?;

        let mut config = EngineConfig::default();
        if self.no_popularity_boost {
            config = config.without_popularity_boost();
        }

        let engine = SearchEngine::build(products, config).context("Failed to build index")?;
        tracing::info!(elapsed = ?start.elapsed(), "engine ready");
        Ok(engine)
    }
}

const EMPTY_INPUT_HINT: &str =
    "Please describe a product (e.g., 'wireless headphones under ₹2000')";

fn print_results<W: Write>(
    out: &mut W,
    engine: &SearchEngine,
    query: &str,
    limit: usize,
) -> io::Result<()> {
    let start = Instant::now();
    let outcome = engine.execute(query, limit);
    let duration = start.elapsed();

    if outcome.results.is_empty() {
        return writeln!(out, "No matching products found. Try different keywords or filters.");
    }

    writeln!(out, "Found {} products in {:?}", outcome.results.len(), duration)?;
    writeln!(out, "{}", "━".repeat(56))?;

    for (rank, result) in outcome.results.iter().enumerate() {
        if let Some(product) = engine.product(result.doc_id) {
            print_product(out, rank + 1, product, result.score)?;
        }
    }
    Ok(())
}

fn print_product<W: Write>(
    out: &mut W,
    rank: usize,
    product: &Product,
    score: f64,
) -> io::Result<()> {
    let name: String = if product.name.chars().count() > 60 {
        format!("{}...", product.name.chars().take(57).collect::<String>())
    } else {
        product.name.clone()
    };
    writeln!(out, "{}. {}  [{:.3}]", rank, name, score)?;

    if !product.brand.is_empty() {
        writeln!(out, "   Brand: {}", product.brand)?;
    }

    if let Some(price) = product.discounted_price {
        match product.discount_percentage() {
            Some(pct) => writeln!(out, "   Price: ₹{:.2} ({:.0}% OFF)", price, pct)?,
            None => writeln!(out, "   Price: ₹{:.2}", price)?,
        }
    }

    if let Some(rating) = product.rating {
        writeln!(out, "   Rating: {}/5", rating)?;
    }

    if !product.categories.is_empty() {
        let path: Vec<&str> = product.categories.iter().take(3).map(String::as_str).collect();
        writeln!(out, "   Category: {}", path.join(" → "))?;
    }

    writeln!(out, "{}", "━".repeat(56))
}

/// Prompt for queries until `exit`, `quit` or end of input.
fn interactive<R: BufRead, W: Write>(
    engine: &SearchEngine,
    input: R,
    mut out: W,
    limit: usize,
) -> io::Result<()> {
    writeln!(out, "Describe what you are looking for, or type 'exit' to quit.")?;

    let mut lines = input.lines();
    loop {
        write!(out, "\nSearch: ")?;
        out.flush()?;

        let line = match lines.next() {
            Some(line) => line?,
            None => break,
        };
        let query = line.trim();

        if query.eq_ignore_ascii_case("exit") || query.eq_ignore_ascii_case("quit") {
            break;
        }
        if query.is_empty() {
            writeln!(out, "{}", EMPTY_INPUT_HINT)?;
            continue;
        }

        print_results(&mut out, engine, query, limit)?;
    }

    writeln!(out, "Goodbye!")
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Serve {
            source,
            host,
            port,
        } => {
            let engine = Arc::new(source.build_engine()?);
            let addr: SocketAddr = format!("{}:{}", host, port)
                .parse()
                .with_context(|| format!("Invalid listen address {}:{}", host, port))?;

            let listener = tokio::net::TcpListener::bind(addr)
                .await
                .with_context(|| format!("Failed to bind {}", addr))?;
            tracing::info!(%addr, "serving search API");

            axum::serve(listener, api::create_router(engine)).await?;
        }
        Command::Search {
            source,
            query,
            limit,
        } => {
            anyhow::ensure!(limit >= 1, "--limit must be at least 1");
            let engine = source.build_engine()?;

            match query {
                Some(query) => {
                    let mut out = io::stdout().lock();
                    writeln!(out, "Searching for: \"{}\"\n", query)?;
                    print_results(&mut out, &engine, &query, limit)?;
                }
                None => interactive(&engine, io::stdin().lock(), io::stdout().lock(), limit)?,
            }
        }
    }

    Ok(())
}
