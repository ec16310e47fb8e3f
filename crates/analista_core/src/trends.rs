//! crates/analista_core/src/trends.rs
//!
//! Turns a raw model answer into trend records and source citations.

use std::collections::HashSet;

use crate::domain::{Impact, SourceCitation, Trend};
use crate::ports::{GroundingChunk, PortError, PortResult};

/// The dashboard always shows this many trends.
pub const TREND_COUNT: usize = 3;

const DEFAULT_CATEGORY: &str = "General";
const DEFAULT_TITLE: &str = "Untitled";
const DEFAULT_SOURCE_TITLE: &str = "External source";

/// Parses `CATEGORY | TITLE | IMPACT` lines out of a model answer.
///
/// Only lines containing a `|` are considered and only the first
/// [`TREND_COUNT`] of them are used. An answer with no such line at all is
/// a [`PortError::Malformed`] rather than an empty list.
pub fn parse_trend_lines(text: &str) -> PortResult<Vec<Trend>> {
    let trends: Vec<Trend> = text
        .lines()
        .filter(|line| line.contains('|'))
        .take(TREND_COUNT)
        .map(parse_line)
        .collect();

    if trends.is_empty() {
        return Err(PortError::Malformed(
            "expected lines formatted as CATEGORY | TITLE | IMPACT".to_string(),
        ));
    }
    Ok(trends)
}

fn parse_line(line: &str) -> Trend {
    let mut parts = line.split('|').map(str::trim);
    let mut next_or = |fallback: &str| match parts.next() {
        Some(part) if !part.is_empty() => part.to_string(),
        _ => fallback.to_string(),
    };

    let category = next_or(DEFAULT_CATEGORY);
    let title = next_or(DEFAULT_TITLE);
    let impact = Impact::from_label(&next_or(""));

    Trend {
        title,
        category,
        impact,
    }
}

/// Builds the citation list from grounding chunks.
///
/// Chunks without a real uri are dropped, duplicates are collapsed onto the first
/// occurrence, and the result is cut to at most `limit` entries.
pub fn collect_sources(chunks: &[GroundingChunk], limit: usize) -> Vec<SourceCitation> {
    let mut seen = HashSet::new();

    chunks
        .iter()
        .filter_map(|chunk| {
            let uri = chunk.uri.as_deref().map(str::trim)?;
            if uri.is_empty() || uri == "#" {
                return None;
            }
            let title = chunk
                .title
                .as_deref()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .unwrap_or(DEFAULT_SOURCE_TITLE);
            Some(SourceCitation {
                title: title.to_string(),
                uri: uri.to_string(),
            })
        })
        .filter(|source| seen.insert(source.uri.clone()))
        .take(limit)
        .collect()
}
