use std::collections::BTreeMap;

use tracing::instrument;

use crate::result::{TextLine, WordBox};

/// Column boundary positions `[left, dividers.., right]`. Dividers that fall
/// outside `(left, right)` are skipped; they can be left behind when an edge
/// is moved after the divider was placed. Dividers are sorted here rather
/// than trusted, since layouts can arrive from hand-edited template files.
pub fn column_boundaries(left: f32, right: f32, dividers: &[f32]) -> Vec<f32> {
    let mut inside = dividers
        .iter()
        .copied()
        .filter(|d| *d > left && *d < right)
        .collect::<Vec<_>>();
    inside.sort_by(|a, b| a.total_cmp(b));

    let mut boundaries = Vec::with_capacity(inside.len() + 2);
    boundaries.push(left);
    boundaries.append(&mut inside);
    boundaries.push(right);
    boundaries
}

// Boundaries are calibrated in page space but OCR runs on the cropped region,
// so word coordinates have their origin at the left table edge.
pub(crate) fn to_crop_space(boundaries: &[f32]) -> Vec<f32> {
    let origin = boundaries.first().copied().unwrap_or(0.0);
    boundaries.iter().map(|b| b - origin).collect()
}

/// Assign every word of one text line to a column by the horizontal midpoint
/// of its bounding box. Column `c` is the half-open interval
/// `[boundaries[c], boundaries[c+1])`; words whose midpoint falls outside the
/// full span are dropped rather than snapped to the nearest column. Returns
/// `None` when every cell trims to empty, which marks the line as OCR noise.
pub fn bucket_line(words: &[WordBox], boundaries: &[f32]) -> Option<Vec<String>> {
    if boundaries.len() < 2 {
        return None;
    }
    let mut cells = vec![String::new(); boundaries.len() - 1];
    for word in words {
        let mid = word.mid_x();
        match column_index(mid, boundaries) {
            Some(column) => {
                cells[column].push_str(&word.text);
                cells[column].push(' ');
            }
            None => log::trace!("dropping word {:?} at midpoint {mid}", word.text),
        }
    }
    for cell in &mut cells {
        *cell = cell.trim().to_string();
    }
    if cells.iter().all(String::is_empty) {
        None
    } else {
        Some(cells)
    }
}

fn column_index(mid: f32, boundaries: &[f32]) -> Option<usize> {
    // linear scan; column counts are single digits to low tens
    boundaries.windows(2).position(|w| mid >= w[0] && mid < w[1])
}

/// Bucket the header strip's words without line grouping and return one title
/// per column, falling back to `"Untitled"` where no header words landed.
#[instrument(level = "debug", skip(words, boundaries))]
pub fn read_header_titles(words: &[WordBox], boundaries: &[f32]) -> Vec<String> {
    match bucket_line(words, boundaries) {
        Some(cells) => cells
            .into_iter()
            .map(|cell| {
                if cell.is_empty() {
                    "Untitled".to_string()
                } else {
                    cell
                }
            })
            .collect(),
        None => vec!["Untitled".to_string(); boundaries.len().saturating_sub(1)],
    }
}

/// Regroup recognized words into uniform-height bands by the vertical midpoint
/// of each bounding box, for documents whose OCR line grouping is unreliable.
/// Words within a band are ordered left to right. A non-positive row height
/// leaves the input grouping untouched.
#[instrument(level = "debug", skip(lines))]
pub fn fixed_bands(lines: &[TextLine], row_height: f32) -> Vec<TextLine> {
    if row_height <= 0.0 {
        return lines.to_vec();
    }
    let mut bands: BTreeMap<i64, Vec<WordBox>> = BTreeMap::new();
    for word in lines.iter().flat_map(|line| &line.words) {
        let band = (word.mid_y() / row_height).floor() as i64;
        bands.entry(band).or_default().push(word.clone());
    }
    log::debug!("regrouped {} lines into {} bands", lines.len(), bands.len());
    bands
        .into_values()
        .map(|mut words| {
            words.sort_by(|a, b| a.x0.total_cmp(&b.x0));
            TextLine { words }
        })
        .collect()
}
