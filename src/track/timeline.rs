//! ASCII rendering of sparse track timelines, for debug output.
//!
//! Each frame index from the origin onwards gets one fixed-width column; frames
//! where the object was not seen are blank. Rendered from frame 0, an object
//! seen in frames 11, 12, 13 and 16 shows eleven blank columns first:
//!
//! ```text
//! [                                  11 12 13       16]
//! ```
//!
//! and from its first observation it is `[ 11 12 13       16]`.

/// Narrowest column: two digits plus a separating space.
const MIN_COLUMN_WIDTH: usize = 3;

/// Column width that fits every index up to `max_idx` plus a leading space.
pub fn column_width(max_idx: i64) -> usize {
    (max_idx.to_string().len() + 1).max(MIN_COLUMN_WIDTH)
}

/// Render sorted frame indices as a bracketed row of columns starting at `origin`.
///
/// Indices before `origin` are skipped.
pub fn render(indices: &[i64], origin: i64, width: usize) -> String {
    let mut out = String::with_capacity(2 + indices.len() * width);
    out.push('[');

    let mut cursor = origin;
    for &idx in indices.iter().filter(|&&idx| idx >= origin) {
        while cursor < idx {
            out.push_str(&" ".repeat(width));
            cursor += 1;
        }
        out.push_str(&format!("{:>width$}", idx, width = width));
        cursor = idx + 1;
    }

    out.push(']');
    out
}
