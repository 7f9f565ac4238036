//! On-disk index layout and the memory-resident loader used at search time.
//!
//! An index directory holds three artifacts:
//!
//! - `docs.tsv` — `docid\tlang\ttitle\turl\tpath` per document, any order
//! - `terms.tsv` — `term\tdf\toffset\tbytes_len` per term, ascending by
//!   term bytes
//! - `postings.bin` — concatenated per-term runs of little-endian u32
//!   docids, in `terms.tsv` order

use std::fs::File;
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use crate::error::{Result, SearchError};

pub struct IndexPaths {
    pub root: PathBuf,
}

impl IndexPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn docs(&self) -> PathBuf {
        self.root.join("docs.tsv")
    }

    pub fn terms(&self) -> PathBuf {
        self.root.join("terms.tsv")
    }

    pub fn postings(&self) -> PathBuf {
        self.root.join("postings.bin")
    }
}

#[derive(Debug, Clone)]
pub struct DocRec {
    pub docid: u32,
    pub lang: String,
    pub title: String,
    pub url: String,
    pub path: String,
}

struct DictEntry {
    term_off: u32,
    term_len: u32,
    df: u32,
    post_off: u64,
    post_len: u64,
}

/// Loaded index: pooled term bytes, the sorted dictionary, documents sorted
/// by docid, the universe, and one open read handle on the postings file.
pub struct SearchIndex {
    term_pool: Vec<u8>,
    dict: Vec<DictEntry>,
    postings: File,
    docs: Vec<DocRec>,
    universe: Vec<u32>,
}

impl SearchIndex {
    pub fn open(paths: &IndexPaths) -> Result<Self> {
        let docs = load_docs(&paths.docs())?;
        let (term_pool, dict) = load_dict(&paths.terms())?;
        let postings = File::open(paths.postings())?;

        let mut universe: Vec<u32> = docs.iter().map(|d| d.docid).collect();
        universe.sort_unstable();
        universe.dedup();

        Ok(Self {
            term_pool,
            dict,
            postings,
            docs,
            universe,
        })
    }

    fn term_bytes(&self, e: &DictEntry) -> &[u8] {
        let off = e.term_off as usize;
        &self.term_pool[off..off + e.term_len as usize]
    }

    /// Binary search for an already-normalized term. Byte-lexicographic
    /// compare, shorter-is-smaller on a common prefix.
    pub fn lookup(&self, term: &str) -> Option<usize> {
        self.dict
            .binary_search_by(|e| self.term_bytes(e).cmp(term.as_bytes()))
            .ok()
    }

    pub fn term_at(&self, idx: usize) -> &str {
        // the pool is built from terms.tsv lines, which are UTF-8
        std::str::from_utf8(self.term_bytes(&self.dict[idx])).unwrap_or("")
    }

    pub fn df_at(&self, idx: usize) -> u32 {
        self.dict[idx].df
    }

    /// Read the posting list of dictionary entry `idx` into a fresh buffer.
    pub fn postings_at(&mut self, idx: usize) -> Result<Vec<u32>> {
        let e = &self.dict[idx];
        if e.df == 0 || e.post_len == 0 {
            return Ok(Vec::new());
        }
        if e.post_len % 4 != 0 {
            return Err(SearchError::Corrupt(format!(
                "posting length {} is not a multiple of 4",
                e.post_len
            )));
        }
        let (off, len) = (e.post_off, e.post_len as usize);
        let mut buf = vec![0u8; len];
        self.postings.seek(SeekFrom::Start(off))?;
        self.postings.read_exact(&mut buf)?;
        let out = buf
            .chunks_exact(4)
            .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        Ok(out)
    }

    /// Posting list for an already-normalized term; empty if the term is
    /// not in the dictionary.
    pub fn postings_for(&mut self, term: &str) -> Result<Vec<u32>> {
        match self.lookup(term) {
            Some(idx) => self.postings_at(idx),
            None => Ok(Vec::new()),
        }
    }

    /// Sorted unique docids of every document in the docs table.
    pub fn universe(&self) -> &[u32] {
        &self.universe
    }

    pub fn doc(&self, docid: u32) -> Option<&DocRec> {
        self.docs
            .binary_search_by_key(&docid, |d| d.docid)
            .ok()
            .map(|i| &self.docs[i])
    }

    pub fn docs(&self) -> &[DocRec] {
        &self.docs
    }

    pub fn num_terms(&self) -> usize {
        self.dict.len()
    }

    pub fn num_docs(&self) -> usize {
        self.docs.len()
    }
}

fn load_docs(path: &Path) -> Result<Vec<DocRec>> {
    let reader = BufReader::new(File::open(path)?);
    let mut docs = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.is_empty() {
            continue;
        }
        let mut fields = line.splitn(5, '\t');
        let (Some(id), Some(lang), Some(title), Some(url), Some(src)) = (
            fields.next(),
            fields.next(),
            fields.next(),
            fields.next(),
            fields.next(),
        ) else {
            continue;
        };
        let Ok(docid) = id.parse::<u32>() else {
            continue;
        };
        docs.push(DocRec {
            docid,
            lang: lang.to_owned(),
            title: title.to_owned(),
            url: url.to_owned(),
            path: src.to_owned(),
        });
    }
    docs.sort_by_key(|d| d.docid);
    Ok(docs)
}

fn load_dict(path: &Path) -> Result<(Vec<u8>, Vec<DictEntry>)> {
    let reader = BufReader::new(File::open(path)?);
    let mut pool: Vec<u8> = Vec::new();
    let mut dict: Vec<DictEntry> = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.is_empty() {
            continue;
        }
        let mut fields = line.splitn(4, '\t');
        let (Some(term), Some(df), Some(off), Some(len)) = (
            fields.next(),
            fields.next(),
            fields.next(),
            fields.next(),
        ) else {
            continue;
        };
        let (Ok(df), Ok(post_off), Ok(post_len)) =
            (df.parse::<u32>(), off.parse::<u64>(), len.parse::<u64>())
        else {
            continue;
        };
        let term_off = pool.len() as u32;
        pool.extend_from_slice(term.as_bytes());
        dict.push(DictEntry {
            term_off,
            term_len: term.len() as u32,
            df,
            post_off,
            post_len,
        });
    }
    Ok((pool, dict))
}
