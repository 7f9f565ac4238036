use anyhow::Result;
use bisearch_core::query::run_query;
use bisearch_core::{IndexPaths, SearchIndex};
use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

use std::io::{self, BufRead};
use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser)]
#[command(name = "search")]
#[command(about = "Evaluate boolean queries against a built index", long_about = None)]
struct Args {
    /// Index directory
    #[arg(long)]
    index: PathBuf,
    /// Boolean query; omit to read one query per line from stdin
    #[arg(long)]
    query: Option<String>,
    /// Maximum number of results to print
    #[arg(long, default_value_t = 20)]
    top: usize,
}

fn main() {
    // results go to stdout, diagnostics to stderr
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();
    if let Err(err) = run(Args::parse()) {
        tracing::error!(%err, "fatal");
        std::process::exit(2);
    }
}

fn run(args: Args) -> Result<()> {
    let started = Instant::now();
    let mut ix = SearchIndex::open(&IndexPaths::new(&args.index))?;
    tracing::info!(
        docs = ix.num_docs(),
        universe = ix.universe().len(),
        terms = ix.num_terms(),
        elapsed_s = started.elapsed().as_secs_f64(),
        "index loaded"
    );

    // one-shot mode: a parse error is fatal
    if let Some(query) = &args.query {
        return handle_one(&mut ix, query, args.top);
    }

    // interactive mode: report and keep reading
    let stdin = io::stdin().lock();
    for line in stdin.lines() {
        let line = line?;
        if line.starts_with('#') {
            continue;
        }
        if let Err(err) = handle_one(&mut ix, &line, args.top) {
            tracing::warn!(%err, query = %line, "query failed");
        }
        println!("----");
    }
    Ok(())
}

fn handle_one(ix: &mut SearchIndex, query: &str, top: usize) -> Result<()> {
    let started = Instant::now();
    let hits = run_query(ix, query)?;
    tracing::info!(
        hits = hits.len(),
        elapsed_s = started.elapsed().as_secs_f64(),
        query,
        "query evaluated"
    );
    for &docid in hits.iter().take(top) {
        match ix.doc(docid) {
            Some(d) => println!("{docid}\t{}\t{}\t{}", d.lang, d.title, d.url),
            None => println!("{docid}\t?\t?\t?"),
        }
    }
    Ok(())
}
