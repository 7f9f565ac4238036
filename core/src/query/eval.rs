//! Set algebra over sorted posting lists.
//!
//! Every input and output is strictly increasing; each operator is linear
//! in the total input length.

use super::parser::{parse, QueryNode};
use crate::error::Result;
use crate::persist::SearchIndex;
use crate::tokenizer::normalize_term;

/// Two-pointer intersection.
pub fn intersect(a: &[u32], b: &[u32]) -> Vec<u32> {
    let mut out = Vec::with_capacity(a.len().min(b.len()));
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            std::cmp::Ordering::Equal => {
                out.push(a[i]);
                i += 1;
                j += 1;
            }
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
        }
    }
    out
}

/// Two-pointer union; equal elements are emitted once.
pub fn union(a: &[u32], b: &[u32]) -> Vec<u32> {
    let mut out = Vec::with_capacity(a.len() + b.len());
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            std::cmp::Ordering::Equal => {
                out.push(a[i]);
                i += 1;
                j += 1;
            }
            std::cmp::Ordering::Less => {
                out.push(a[i]);
                i += 1;
            }
            std::cmp::Ordering::Greater => {
                out.push(b[j]);
                j += 1;
            }
        }
    }
    out.extend_from_slice(&a[i..]);
    out.extend_from_slice(&b[j..]);
    out
}

/// Universe elements not present in `a`.
pub fn complement(universe: &[u32], a: &[u32]) -> Vec<u32> {
    let mut out = Vec::with_capacity(universe.len());
    let mut j = 0;
    for &u in universe {
        while j < a.len() && a[j] < u {
            j += 1;
        }
        if j < a.len() && a[j] == u {
            continue;
        }
        out.push(u);
    }
    out
}

/// Post-order evaluation of a parsed query against the loaded index.
/// Term leaves are normalized with the tokenizer's folding; unknown terms
/// evaluate to the empty list.
pub fn evaluate(index: &mut SearchIndex, node: &QueryNode) -> Result<Vec<u32>> {
    match node {
        QueryNode::Term(t) => index.postings_for(&normalize_term(t)),
        QueryNode::Not(a) => {
            let inner = evaluate(index, a)?;
            Ok(complement(index.universe(), &inner))
        }
        QueryNode::And(a, b) => {
            let left = evaluate(index, a)?;
            let right = evaluate(index, b)?;
            Ok(intersect(&left, &right))
        }
        QueryNode::Or(a, b) => {
            let left = evaluate(index, a)?;
            let right = evaluate(index, b)?;
            Ok(union(&left, &right))
        }
    }
}

/// Parse and evaluate in one step.
pub fn run_query(index: &mut SearchIndex, query: &str) -> Result<Vec<u32>> {
    let node = parse(query)?;
    evaluate(index, &node)
}
