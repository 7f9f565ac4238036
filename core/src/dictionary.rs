//! In-memory term dictionary used during index construction.
//!
//! A bucketed hash table with chaining, specialized for term strings under
//! heavy churn: entries live in an arena and are addressed by stable `u32`
//! handles, buckets hold the head of an intrusive chain. FNV-1a over the
//! term bytes selects the bucket.

/// Stable handle into the entry arena.
pub type TermHandle = u32;

const NO_ENTRY: u32 = u32::MAX;

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

fn fnv1a64(bytes: &[u8]) -> u64 {
    let mut h = FNV_OFFSET;
    for &b in bytes {
        h ^= b as u64;
        h = h.wrapping_mul(FNV_PRIME);
    }
    h
}

pub struct TermEntry {
    term: String,
    /// Number of distinct documents containing the term. Provisional until
    /// finalization dedups the posting list.
    pub df: u32,
    /// Unsorted, possibly-duplicated until finalization.
    pub postings: Vec<u32>,
    next: u32,
}

impl TermEntry {
    pub fn term(&self) -> &str {
        &self.term
    }
}

pub struct TermTable {
    buckets: Vec<u32>,
    entries: Vec<TermEntry>,
    mask: u64,
}

impl TermTable {
    /// `nbuckets` must be a power of two; 2^20 suits corpora up to ~10^6
    /// unique terms without resizing.
    pub fn with_bucket_count(nbuckets: usize) -> Self {
        debug_assert!(nbuckets.is_power_of_two());
        Self {
            buckets: vec![NO_ENTRY; nbuckets],
            entries: Vec::new(),
            mask: (nbuckets - 1) as u64,
        }
    }

    pub fn new() -> Self {
        Self::with_bucket_count(1 << 20)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Return the handle for `term`, inserting an empty entry on first sight.
    pub fn get_or_add(&mut self, term: &str) -> TermHandle {
        let bi = (fnv1a64(term.as_bytes()) & self.mask) as usize;
        let mut h = self.buckets[bi];
        while h != NO_ENTRY {
            let e = &self.entries[h as usize];
            if e.term == term {
                return h;
            }
            h = e.next;
        }
        let handle = self.entries.len() as u32;
        self.entries.push(TermEntry {
            term: term.to_owned(),
            df: 0,
            postings: Vec::new(),
            next: self.buckets[bi],
        });
        self.buckets[bi] = handle;
        handle
    }

    pub fn entry(&self, h: TermHandle) -> &TermEntry {
        &self.entries[h as usize]
    }

    /// Append `docid` to the entry's posting list and bump its df. The
    /// caller is responsible for per-document dedup (see [`SeenSet`]).
    pub fn append_posting(&mut self, h: TermHandle, docid: u32) {
        let e = &mut self.entries[h as usize];
        e.postings.push(docid);
        e.df += 1;
    }

    /// Handles of all entries sorted by term bytes, for finalization.
    pub fn sorted_handles(&self) -> Vec<TermHandle> {
        let mut handles: Vec<TermHandle> = (0..self.entries.len() as u32).collect();
        handles.sort_by(|&a, &b| {
            self.entries[a as usize]
                .term
                .as_bytes()
                .cmp(self.entries[b as usize].term.as_bytes())
        });
        handles
    }

    /// Sort the entry's posting list, drop adjacent duplicates and rewrite
    /// df to the deduplicated length.
    pub fn finalize_entry(&mut self, h: TermHandle) {
        let e = &mut self.entries[h as usize];
        e.postings.sort_unstable();
        e.postings.dedup();
        e.df = e.postings.len() as u32;
    }
}

impl Default for TermTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-document set of term handles, used to append each docid to a posting
/// list at most once per document. Open addressing over a fixed power-of-two
/// slot array; reset by zeroing. Slots store handle + 1 so that zero means
/// empty.
pub struct SeenSet {
    slots: Vec<u32>,
    mask: u64,
}

fn mix64(mut x: u64) -> u64 {
    x ^= x >> 33;
    x = x.wrapping_mul(0xff51_afd7_ed55_8ccd);
    x ^= x >> 33;
    x = x.wrapping_mul(0xc4ce_b9fe_1a85_ec53);
    x ^= x >> 33;
    x
}

impl SeenSet {
    /// `capacity` must be a power of two; 2^15 slots cover any realistic
    /// per-document distinct-term count.
    pub fn with_capacity(capacity: usize) -> Self {
        debug_assert!(capacity.is_power_of_two());
        Self {
            slots: vec![0; capacity],
            mask: (capacity - 1) as u64,
        }
    }

    pub fn new() -> Self {
        Self::with_capacity(1 << 15)
    }

    /// Clear the set for the next document.
    pub fn reset(&mut self) {
        self.slots.fill(0);
    }

    /// Insert `h`, returning true iff it was not already present. A full
    /// set stops accepting new handles after one sweep of the probe.
    pub fn insert(&mut self, h: TermHandle) -> bool {
        let tagged = h + 1;
        let mut i = (mix64(h as u64) & self.mask) as usize;
        for _ in 0..self.slots.len() {
            let cur = self.slots[i];
            if cur == 0 {
                self.slots[i] = tagged;
                return true;
            }
            if cur == tagged {
                return false;
            }
            i = (i + 1) & self.mask as usize;
        }
        false
    }
}

impl Default for SeenSet {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_or_add_returns_same_handle_for_same_bytes() {
        let mut tt = TermTable::with_bucket_count(8);
        let a = tt.get_or_add("alpha");
        let b = tt.get_or_add("beta");
        assert_ne!(a, b);
        assert_eq!(tt.get_or_add("alpha"), a);
        assert_eq!(tt.len(), 2);
    }

    #[test]
    fn chaining_survives_bucket_collisions() {
        // two buckets force chains
        let mut tt = TermTable::with_bucket_count(2);
        let handles: Vec<_> = ["a", "b", "c", "d", "e"]
            .iter()
            .map(|t| tt.get_or_add(t))
            .collect();
        assert_eq!(tt.len(), 5);
        for (i, t) in ["a", "b", "c", "d", "e"].iter().enumerate() {
            assert_eq!(tt.get_or_add(t), handles[i]);
        }
    }

    #[test]
    fn append_posting_bumps_df() {
        let mut tt = TermTable::with_bucket_count(8);
        let h = tt.get_or_add("term");
        tt.append_posting(h, 3);
        tt.append_posting(h, 1);
        tt.append_posting(h, 3);
        let e = tt.entry(h);
        assert_eq!(e.df, 3);
        assert_eq!(e.postings, vec![3, 1, 3]);
    }

    #[test]
    fn finalize_sorts_dedups_and_rewrites_df() {
        let mut tt = TermTable::with_bucket_count(8);
        let h = tt.get_or_add("term");
        for d in [5, 2, 5, 9, 2] {
            tt.append_posting(h, d);
        }
        tt.finalize_entry(h);
        let e = tt.entry(h);
        assert_eq!(e.postings, vec![2, 5, 9]);
        assert_eq!(e.df, 3);
    }

    #[test]
    fn sorted_handles_orders_by_term_bytes() {
        let mut tt = TermTable::with_bucket_count(8);
        for t in ["zebra", "кот", "alpha", "3.14"] {
            tt.get_or_add(t);
        }
        let terms: Vec<&str> = tt
            .sorted_handles()
            .into_iter()
            .map(|h| tt.entry(h).term())
            .collect();
        // byte-lexicographic: digits < latin < cyrillic (utf-8)
        assert_eq!(terms, vec!["3.14", "alpha", "zebra", "кот"]);
    }

    #[test]
    fn seen_set_dedups_until_reset() {
        let mut seen = SeenSet::with_capacity(8);
        assert!(seen.insert(7));
        assert!(!seen.insert(7));
        assert!(seen.insert(1));
        seen.reset();
        assert!(seen.insert(7));
    }

    #[test]
    fn seen_set_full_rejects_new_handles() {
        let mut seen = SeenSet::with_capacity(4);
        for h in 0..4 {
            assert!(seen.insert(h));
        }
        assert!(!seen.insert(99));
        // existing handles still report as seen
        assert!(!seen.insert(2));
    }
}
