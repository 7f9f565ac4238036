use anyhow::{bail, Result};
use bisearch_core::builder;
use bisearch_core::tokenizer::{normalize_term, tokenize_line};
use bisearch_core::{IndexPaths, SearchIndex};
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};
use walkdir::WalkDir;

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

const HEADER_LINES: usize = 6;
const LOOKUP_SHOW: usize = 30;

#[derive(Parser)]
#[command(name = "index")]
#[command(about = "Build and inspect the boolean inverted index", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the index from a corpus directory
    Build {
        /// Corpus root directory
        #[arg(long)]
        corpus: PathBuf,
        /// Output index directory
        #[arg(long)]
        out: PathBuf,
        /// Maximum number of documents to index (0 = no limit)
        #[arg(long, default_value_t = 0)]
        limit: u32,
    },
    /// Look up one term and print its posting list
    Lookup {
        /// Index directory
        #[arg(long)]
        index: PathBuf,
        /// Term to look up (normalized before the search)
        #[arg(long)]
        term: String,
    },
    /// Tokenize corpus files without indexing them
    Tokenize {
        /// Input file or directory
        #[arg(long)]
        input: PathBuf,
        /// Print every token to stdout
        #[arg(long, default_value_t = false)]
        print: bool,
        /// Maximum number of files to process (0 = no limit)
        #[arg(long, default_value_t = 0)]
        limit: u64,
        /// Write a term/count table sorted by descending count
        #[arg(long)]
        freq_out: Option<PathBuf>,
    },
}

fn main() {
    // token and lookup output goes to stdout, diagnostics to stderr
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();

    match run(cli) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            tracing::error!(%err, "fatal");
            std::process::exit(2);
        }
    }
}

fn run(cli: Cli) -> Result<i32> {
    match cli.command {
        Commands::Build { corpus, out, limit } => {
            builder::build(&corpus, &out, limit)?;
            Ok(0)
        }
        Commands::Lookup { index, term } => {
            lookup(&index, &term)?;
            Ok(0)
        }
        Commands::Tokenize {
            input,
            print,
            limit,
            freq_out,
        } => tokenize_cmd(&input, print, limit, freq_out.as_deref()),
    }
}

fn lookup(index_dir: &Path, term: &str) -> Result<()> {
    let mut ix = SearchIndex::open(&IndexPaths::new(index_dir))?;
    let term = normalize_term(term);
    let Some(idx) = ix.lookup(&term) else {
        println!("NOT FOUND");
        return Ok(());
    };
    let docs = ix.postings_at(idx)?;
    println!("term={term} df={}", docs.len());
    for docid in docs.iter().take(LOOKUP_SHOW) {
        println!("{docid}");
    }
    if docs.len() > LOOKUP_SHOW {
        println!("... ({} more)", docs.len() - LOOKUP_SHOW);
    }
    Ok(())
}

#[derive(Default)]
struct TokenizeStats {
    files: u64,
    bytes: u64,
    tokens: u64,
    token_len_sum: u64,
    errors: u64,
}

fn tokenize_cmd(input: &Path, print: bool, limit: u64, freq_out: Option<&Path>) -> Result<i32> {
    let mut files: Vec<PathBuf> = if input.is_file() {
        vec![input.to_path_buf()]
    } else if input.is_dir() {
        let mut v: Vec<PathBuf> = WalkDir::new(input)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .filter(|p| p.extension().and_then(|s| s.to_str()) == Some("txt"))
            .collect();
        v.sort();
        v
    } else {
        bail!("input path does not exist: {}", input.display());
    };
    if limit != 0 && (limit as usize) < files.len() {
        files.truncate(limit as usize);
    }

    let mut stats = TokenizeStats::default();
    let mut freq: Option<HashMap<String, u64>> = freq_out.map(|_| HashMap::new());
    let mut tokens: Vec<String> = Vec::new();
    let started = Instant::now();

    for path in &files {
        if let Err(err) = tokenize_file(path, print, &mut stats, freq.as_mut(), &mut tokens) {
            tracing::warn!(path = %path.display(), %err, "cannot read file, skipping");
            stats.errors += 1;
        }
    }

    let avg_len = if stats.tokens > 0 {
        stats.token_len_sum as f64 / stats.tokens as f64
    } else {
        0.0
    };
    tracing::info!(
        files = stats.files,
        bytes = stats.bytes,
        tokens = stats.tokens,
        avg_token_len = avg_len,
        elapsed_s = started.elapsed().as_secs_f64(),
        errors = stats.errors,
        "tokenize complete"
    );

    if let (Some(out), Some(freq)) = (freq_out, freq.as_ref()) {
        write_freq(out, freq)?;
        tracing::info!(path = %out.display(), unique_terms = freq.len(), "frequency table written");
    }

    Ok(if stats.errors > 0 { 1 } else { 0 })
}

fn tokenize_file(
    path: &Path,
    print: bool,
    stats: &mut TokenizeStats,
    mut freq: Option<&mut HashMap<String, u64>>,
    tokens: &mut Vec<String>,
) -> std::io::Result<()> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut buf = Vec::new();
    for _ in 0..HEADER_LINES {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            stats.files += 1;
            return Ok(());
        }
    }
    loop {
        buf.clear();
        let n = reader.read_until(b'\n', &mut buf)?;
        if n == 0 {
            break;
        }
        stats.bytes += n as u64;
        if buf.last() == Some(&b'\n') {
            buf.pop();
        }
        tokens.clear();
        tokenize_line(&buf, tokens);
        for tok in tokens.iter() {
            stats.tokens += 1;
            stats.token_len_sum += tok.chars().count() as u64;
            if print {
                println!("{tok}");
            }
            if let Some(freq) = freq.as_mut() {
                *freq.entry(tok.clone()).or_insert(0) += 1;
            }
        }
    }
    stats.files += 1;
    Ok(())
}

fn write_freq(path: &Path, freq: &HashMap<String, u64>) -> std::io::Result<()> {
    let mut entries: Vec<(&String, &u64)> = freq.iter().collect();
    entries.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
    let mut out = BufWriter::new(File::create(path)?);
    for (term, count) in entries {
        writeln!(out, "{term}\t{count}")?;
    }
    out.flush()
}
