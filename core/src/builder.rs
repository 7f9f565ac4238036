//! Corpus ingestion: walks a corpus tree, feeds the tokenizer into the term
//! dictionary with per-document dedup, and writes the on-disk artifacts.

use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use walkdir::WalkDir;

use crate::dictionary::{SeenSet, TermTable};
use crate::error::{Result, SearchError};
use crate::persist::IndexPaths;
use crate::tokenizer::tokenize_line;

/// Docids of Russian documents are shifted past the English docid space.
/// Assumes English filename-derived docids stay below 30000.
const RU_DOCID_OFFSET: u32 = 30000;

const HEADER_LINES: usize = 6;

#[derive(Debug, Default, Clone, Copy)]
pub struct BuildStats {
    pub docs: u32,
    pub bytes: u64,
    pub tokens: u64,
    pub unique_terms: u64,
    pub postings: u64,
}

/// Regular `.txt` files whose path contains a `/text/` segment, sorted by
/// path so builds are reproducible.
pub fn collect_text_files(corpus: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(corpus)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| {
            p.extension().and_then(|s| s.to_str()) == Some("txt")
                && p.to_string_lossy().contains("/text/")
        })
        .collect();
    files.sort();
    files
}

/// Language tag from the corpus layout.
pub fn detect_lang(path: &Path) -> &'static str {
    let s = path.to_string_lossy();
    if s.contains("/enwiki/") {
        "en"
    } else if s.contains("/ruwiki/") {
        "ru"
    } else {
        "unk"
    }
}

/// The filename's digit characters, left to right, form the base-10 docid;
/// Russian documents get the language offset on top.
pub fn docid_for(path: &Path, lang: &str) -> u32 {
    let mut v: u32 = 0;
    if let Some(stem) = path.file_stem() {
        for c in stem.to_string_lossy().chars() {
            if let Some(d) = c.to_digit(10) {
                v = v.wrapping_mul(10).wrapping_add(d);
            }
        }
    }
    if lang == "ru" {
        v = v.wrapping_add(RU_DOCID_OFFSET);
    }
    v
}

/// Consume the six metadata lines at the top of a corpus file, returning
/// the `Title:` and `URL:` values found among them.
fn parse_header<R: BufRead>(reader: &mut R) -> std::io::Result<(String, String)> {
    let mut title = String::new();
    let mut url = String::new();
    let mut buf = Vec::new();
    for _ in 0..HEADER_LINES {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        if buf.last() == Some(&b'\n') {
            buf.pop();
        }
        let line = String::from_utf8_lossy(&buf);
        if let Some(rest) = line.strip_prefix("Title:") {
            title = rest.strip_prefix(' ').unwrap_or(rest).to_owned();
        } else if let Some(rest) = line.strip_prefix("URL:") {
            url = rest.strip_prefix(' ').unwrap_or(rest).to_owned();
        }
    }
    Ok((title, url))
}

fn ingest_body<R: BufRead>(
    reader: &mut R,
    docid: u32,
    table: &mut TermTable,
    seen: &mut SeenSet,
    tokens: &mut Vec<String>,
    stats: &mut BuildStats,
) -> std::io::Result<()> {
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        stats.bytes += buf.len() as u64;
        if buf.last() == Some(&b'\n') {
            buf.pop();
        }
        tokens.clear();
        tokenize_line(&buf, tokens);
        for tok in tokens.iter() {
            stats.tokens += 1;
            let h = table.get_or_add(tok);
            if seen.insert(h) {
                table.append_posting(h, docid);
                stats.postings += 1;
            }
        }
    }
    Ok(())
}

/// Build an index from `corpus` into `out_dir`. `limit` caps the number of
/// documents processed, 0 means no cap. Unreadable corpus files are skipped
/// with a warning; failure to create an output artifact is fatal.
pub fn build(corpus: &Path, out_dir: &Path, limit: u32) -> Result<BuildStats> {
    fs::create_dir_all(out_dir)?;

    let mut files = collect_text_files(corpus);
    if files.is_empty() {
        return Err(SearchError::EmptyCorpus(corpus.display().to_string()));
    }
    if limit != 0 && (limit as usize) < files.len() {
        files.truncate(limit as usize);
    }

    let paths = IndexPaths::new(out_dir);
    let mut docs_out = BufWriter::new(File::create(paths.docs())?);

    let mut table = TermTable::new();
    let mut seen = SeenSet::new();
    let mut tokens: Vec<String> = Vec::new();
    let mut stats = BuildStats::default();
    let started = Instant::now();

    for path in &files {
        let file = match File::open(path) {
            Ok(f) => f,
            Err(err) => {
                tracing::warn!(path = %path.display(), %err, "cannot open file, skipping");
                continue;
            }
        };
        let mut reader = BufReader::new(file);

        let lang = detect_lang(path);
        let (title, url) = match parse_header(&mut reader) {
            Ok(h) => h,
            Err(err) => {
                tracing::warn!(path = %path.display(), %err, "cannot read header, skipping");
                continue;
            }
        };
        let docid = docid_for(path, lang);
        writeln!(
            docs_out,
            "{docid}\t{lang}\t{title}\t{url}\t{}",
            path.display()
        )?;

        seen.reset();
        if let Err(err) = ingest_body(&mut reader, docid, &mut table, &mut seen, &mut tokens, &mut stats)
        {
            tracing::warn!(path = %path.display(), %err, "read error, rest of file skipped");
            continue;
        }

        stats.docs += 1;
        if stats.docs % 500 == 0 {
            tracing::info!(
                docs = stats.docs,
                terms = table.len(),
                postings = stats.postings,
                tokens = stats.tokens,
                "build progress"
            );
        }
    }

    stats.unique_terms = table.len() as u64;

    let mut terms_out = BufWriter::new(File::create(paths.terms())?);
    let mut postings_out = BufWriter::new(File::create(paths.postings())?);
    let mut offset: u64 = 0;
    for h in table.sorted_handles() {
        table.finalize_entry(h);
        let e = table.entry(h);
        let bytes_len = e.postings.len() as u64 * 4;
        writeln!(terms_out, "{}\t{}\t{}\t{}", e.term(), e.df, offset, bytes_len)?;
        for &docid in &e.postings {
            postings_out.write_all(&docid.to_le_bytes())?;
        }
        offset += bytes_len;
    }
    terms_out.flush()?;
    postings_out.flush()?;
    docs_out.flush()?;

    tracing::info!(
        docs = stats.docs,
        unique_terms = stats.unique_terms,
        postings = stats.postings,
        tokens = stats.tokens,
        bytes = stats.bytes,
        elapsed_s = started.elapsed().as_secs_f64(),
        "build complete"
    );
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn docid_takes_filename_digits() {
        assert_eq!(docid_for(Path::new("/c/enwiki/text/AA/00042.txt"), "en"), 42);
        assert_eq!(docid_for(Path::new("/c/ruwiki/text/AA/00001.txt"), "ru"), 30001);
        assert_eq!(docid_for(Path::new("/c/text/wiki_07.txt"), "unk"), 7);
        assert_eq!(docid_for(Path::new("/c/text/nodigits.txt"), "en"), 0);
    }

    #[test]
    fn lang_from_path_segment() {
        assert_eq!(detect_lang(Path::new("/c/enwiki/text/AA/1.txt")), "en");
        assert_eq!(detect_lang(Path::new("/c/ruwiki/text/AA/1.txt")), "ru");
        assert_eq!(detect_lang(Path::new("/c/other/text/1.txt")), "unk");
    }

    #[test]
    fn header_parse_strips_one_leading_space() {
        let data = b"id: 1\nLang: en\nTitle: Hello World\nURL: http://x/y\nDate: d\n----\nbody\n";
        let mut reader = std::io::BufReader::new(&data[..]);
        let (title, url) = parse_header(&mut reader).unwrap();
        assert_eq!(title, "Hello World");
        assert_eq!(url, "http://x/y");
        let mut rest = String::new();
        std::io::BufRead::read_line(&mut reader, &mut rest).unwrap();
        assert_eq!(rest, "body\n");
    }

    #[test]
    fn header_parse_tolerates_short_files() {
        let data = b"only line\n";
        let mut reader = std::io::BufReader::new(&data[..]);
        let (title, url) = parse_header(&mut reader).unwrap();
        assert!(title.is_empty() && url.is_empty());
    }
}
