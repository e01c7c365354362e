//! Recursive text chunking with overlapping windows.
//!
//! Splits document text into segments close to a target size, preferring to
//! break at natural boundaries (paragraph, then sentence, then whitespace,
//! then raw characters). Adjacent segments overlap by 20% of the target size
//! so nothing meaningful is lost at a boundary.

/// Boundary separators in decreasing priority order. Characters are the
/// final fallback when no separator produces small enough pieces.
const SEPARATORS: [&str; 3] = ["\n\n", ". ", " "];

/// Fraction of the target size carried over between adjacent segments.
const OVERLAP_DIVISOR: usize = 5;

/// Split `text` into segments of at most `target_size` plus the overlap
/// carried from the previous segment.
///
/// A `target_size` of 1 (the minimal-unit case) or a text that already fits
/// returns the whole text as a single segment. Every token of the input is
/// preserved across the concatenation of all segments; the only duplication
/// is the intentional overlap.
pub fn chunk_text(text: &str, target_size: usize) -> Vec<String> {
    if target_size <= 1 || text.len() <= target_size {
        return vec![text.to_string()];
    }

    let overlap = target_size / OVERLAP_DIVISOR;
    let units = split_units(text, target_size, &SEPARATORS);
    merge_units(&units, target_size, overlap)
}

/// Recursively split `text` into pieces no longer than `target`, trying each
/// separator in priority order and falling back to character cuts.
/// Separators stay attached to the preceding piece, so concatenating all
/// pieces reproduces the input exactly.
fn split_units<'a>(text: &'a str, target: usize, separators: &[&str]) -> Vec<&'a str> {
    if text.len() <= target {
        return vec![text];
    }

    let Some((separator, rest)) = separators.split_first() else {
        return split_characters(text, target);
    };

    let mut units = Vec::new();
    for piece in split_keeping_separator(text, separator) {
        if piece.len() <= target {
            units.push(piece);
        } else {
            units.extend(split_units(piece, target, rest));
        }
    }
    units
}

/// Split on `separator`, keeping the separator at the end of each piece.
fn split_keeping_separator<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    let mut pieces = Vec::new();
    let mut start = 0;
    for (idx, matched) in text.match_indices(separator) {
        let end = idx + matched.len();
        pieces.push(&text[start..end]);
        start = end;
    }
    if start < text.len() {
        pieces.push(&text[start..]);
    }
    pieces
}

/// Hard cut every `target` bytes, rounded down to a char boundary.
fn split_characters(text: &str, target: usize) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut start = 0;
    while start < text.len() {
        let mut end = (start + target).min(text.len());
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        if end == start {
            // A single char wider than the target; take it whole.
            let width = text[start..]
                .chars()
                .next()
                .map(char::len_utf8)
                .unwrap_or(text.len() - start);
            end = start + width;
        }
        pieces.push(&text[start..end]);
        start = end;
    }
    pieces
}

/// Greedily pack units into segments up to `target` bytes, seeding each new
/// segment with the trailing `overlap` bytes of the previous one.
fn merge_units(units: &[&str], target: usize, overlap: usize) -> Vec<String> {
    let mut segments: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut seed_len = 0;

    for unit in units {
        let has_fresh_content = current.len() > seed_len;
        if has_fresh_content && current.len() + unit.len() > target {
            let seed = overlap_tail(&current, overlap).to_string();
            segments.push(std::mem::take(&mut current));
            seed_len = seed.len();
            current = seed;
        }
        current.push_str(unit);
    }

    if current.len() > seed_len {
        segments.push(current);
    }
    segments
}

/// Trailing `overlap` bytes of a segment, widened to a char boundary.
fn overlap_tail(segment: &str, overlap: usize) -> &str {
    if overlap == 0 {
        return "";
    }
    if segment.len() <= overlap {
        return segment;
    }
    let mut start = segment.len() - overlap;
    while !segment.is_char_boundary(start) {
        start += 1;
    }
    &segment[start..]
}
