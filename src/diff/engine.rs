use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

use super::pairing::FilingPair;

/// One added or removed line.
///
/// `position` is the 1-based index of the entry in the merged edit script,
/// counting unchanged lines too. `line_number` is the 1-based line in the
/// document the text comes from: the latest filing for additions, the
/// previous filing for removals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiffLine {
    pub position: usize,
    pub line_number: usize,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ComparisonResult {
    NoPreviousFiling,
    NoDifferences,
    Changes {
        added: Vec<DiffLine>,
        removed: Vec<DiffLine>,
    },
}

impl ComparisonResult {
    pub fn added(&self) -> &[DiffLine] {
        match self {
            ComparisonResult::Changes { added, .. } => added,
            _ => &[],
        }
    }

    pub fn removed(&self) -> &[DiffLine] {
        match self {
            ComparisonResult::Changes { removed, .. } => removed,
            _ => &[],
        }
    }

    pub fn has_changes(&self) -> bool {
        matches!(self, ComparisonResult::Changes { .. })
    }

    pub fn label(&self) -> &'static str {
        match self {
            ComparisonResult::NoPreviousFiling => "no_previous_filing",
            ComparisonResult::NoDifferences => "no_differences",
            ComparisonResult::Changes { .. } => "changes",
        }
    }
}

impl fmt::Display for ComparisonResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComparisonResult::NoPreviousFiling => write!(f, "No previous filing to compare"),
            ComparisonResult::NoDifferences => write!(f, "No differences"),
            ComparisonResult::Changes { added, removed } => {
                let mut sections = Vec::new();
                if !added.is_empty() {
                    sections.push(render_section("Added lines:", added));
                }
                if !removed.is_empty() {
                    sections.push(render_section("Removed lines:", removed));
                }
                write!(f, "{}", sections.join("\n"))
            }
        }
    }
}

fn render_section(heading: &str, lines: &[DiffLine]) -> String {
    let mut rendered = heading.to_string();
    for line in lines {
        rendered.push_str(&format!("\n  Line {}: {}", line.position, line.text));
    }
    rendered
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Edit {
    Equal,
    Removed(usize),
    Added(usize),
}

fn common_prefix(old: &[u32], new: &[u32]) -> usize {
    old.iter().zip(new).take_while(|(a, b)| a == b).count()
}

fn common_suffix(old: &[u32], new: &[u32]) -> usize {
    old.iter()
        .rev()
        .zip(new.iter().rev())
        .take_while(|(a, b)| a == b)
        .count()
}

/// Finds where the forward and backward searches of Myers' algorithm meet
/// and returns that split point, relative to the slices. `None` means the
/// slices share no line.
///
/// Both slices must be non-empty and must not share a first or last line.
fn bisect(old: &[u32], new: &[u32]) -> Option<(usize, usize)> {
    let (n, m) = (old.len() as isize, new.len() as isize);
    let max_d = (n + m + 1) / 2;
    let offset = max_d + 1;
    let width = (2 * max_d + 3) as usize;
    let mut forward = vec![-1isize; width];
    let mut backward = vec![-1isize; width];
    forward[(offset + 1) as usize] = 0;
    backward[(offset + 1) as usize] = 0;

    let delta = n - m;
    let front = delta % 2 != 0;
    // Diagonals whose paths left the grid are skipped from then on.
    let (mut k1_start, mut k1_end, mut k2_start, mut k2_end) = (0, 0, 0, 0);

    for d in 0..max_d {
        let mut k1 = -d + k1_start;
        while k1 <= d - k1_end {
            let at = (offset + k1) as usize;
            let mut x1 = if k1 == -d || (k1 != d && forward[at - 1] < forward[at + 1]) {
                forward[at + 1]
            } else {
                forward[at - 1] + 1
            };
            let mut y1 = x1 - k1;
            while x1 >= 0 && y1 >= 0 && x1 < n && y1 < m && old[x1 as usize] == new[y1 as usize] {
                x1 += 1;
                y1 += 1;
            }
            forward[at] = x1;
            if x1 > n {
                k1_end += 2;
            } else if y1 > m {
                k1_start += 2;
            } else if front {
                let mirror = offset + delta - k1;
                if mirror >= 0 && (mirror as usize) < width && backward[mirror as usize] != -1 {
                    let x2 = n - backward[mirror as usize];
                    if x1 >= x2 && y1 >= 0 {
                        return Some((x1 as usize, y1 as usize));
                    }
                }
            }
            k1 += 2;
        }

        let mut k2 = -d + k2_start;
        while k2 <= d - k2_end {
            let at = (offset + k2) as usize;
            let mut x2 = if k2 == -d || (k2 != d && backward[at - 1] < backward[at + 1]) {
                backward[at + 1]
            } else {
                backward[at - 1] + 1
            };
            let mut y2 = x2 - k2;
            while x2 >= 0
                && y2 >= 0
                && x2 < n
                && y2 < m
                && old[(n - x2 - 1) as usize] == new[(m - y2 - 1) as usize]
            {
                x2 += 1;
                y2 += 1;
            }
            backward[at] = x2;
            if x2 > n {
                k2_end += 2;
            } else if y2 > m {
                k2_start += 2;
            } else if !front {
                let mirror = offset + delta - k2;
                if mirror >= 0 && (mirror as usize) < width && forward[mirror as usize] != -1 {
                    let x1 = forward[mirror as usize];
                    let y1 = x1 - (mirror - offset);
                    if x1 >= n - x2 && (0..=n).contains(&x1) && (0..=m).contains(&y1) {
                        return Some((x1 as usize, y1 as usize));
                    }
                }
            }
            k2 += 2;
        }
    }
    None
}

/// Appends the edits for `old[old_lo..old_hi]` against `new[new_lo..new_hi]`,
/// splitting recursively at the point found by [`bisect`].
fn conquer(
    old: &[u32],
    (mut old_lo, mut old_hi): (usize, usize),
    new: &[u32],
    (mut new_lo, mut new_hi): (usize, usize),
    script: &mut Vec<Edit>,
) {
    let prefix = common_prefix(&old[old_lo..old_hi], &new[new_lo..new_hi]);
    script.extend(std::iter::repeat(Edit::Equal).take(prefix));
    old_lo += prefix;
    new_lo += prefix;

    let suffix = common_suffix(&old[old_lo..old_hi], &new[new_lo..new_hi]);
    old_hi -= suffix;
    new_hi -= suffix;

    if old_lo == old_hi {
        script.extend((new_lo..new_hi).map(Edit::Added));
    } else if new_lo == new_hi {
        script.extend((old_lo..old_hi).map(Edit::Removed));
    } else {
        let (old_len, new_len) = (old_hi - old_lo, new_hi - new_lo);
        match bisect(&old[old_lo..old_hi], &new[new_lo..new_hi]) {
            Some((x, y)) if (x, y) != (0, 0) && (x, y) != (old_len, new_len) => {
                let (old_mid, new_mid) = (old_lo + x, new_lo + y);
                conquer(old, (old_lo, old_mid), new, (new_lo, new_mid), script);
                conquer(old, (old_mid, old_hi), new, (new_mid, new_hi), script);
            }
            _ => {
                script.extend((old_lo..old_hi).map(Edit::Removed));
                script.extend((new_lo..new_hi).map(Edit::Added));
            }
        }
    }

    script.extend(std::iter::repeat(Edit::Equal).take(suffix));
}

/// Moves the removals of every changed block ahead of its additions.
fn removals_first(script: Vec<Edit>) -> Vec<Edit> {
    let mut ordered = Vec::with_capacity(script.len());
    let mut pending = Vec::new();
    for edit in script {
        match edit {
            Edit::Added(_) => pending.push(edit),
            Edit::Removed(_) => ordered.push(edit),
            Edit::Equal => {
                ordered.append(&mut pending);
                ordered.push(edit);
            }
        }
    }
    ordered.append(&mut pending);
    ordered
}

/// Shortest edit script from `old` to `new` (Myers, linear space). Indices in
/// `Removed`/`Added` are 0-based line indices into `old`/`new`.
fn edit_script<'a>(old: &[&'a str], new: &[&'a str]) -> Vec<Edit> {
    let mut ids: HashMap<&'a str, u32> = HashMap::new();
    let mut intern = |lines: &[&'a str]| -> Vec<u32> {
        lines
            .iter()
            .map(|line| {
                let next = ids.len() as u32;
                *ids.entry(*line).or_insert(next)
            })
            .collect()
    };
    let old_ids = intern(old);
    let new_ids = intern(new);

    let mut script = Vec::with_capacity(old.len().max(new.len()));
    conquer(
        &old_ids,
        (0, old_ids.len()),
        &new_ids,
        (0, new_ids.len()),
        &mut script,
    );
    removals_first(script)
}

/// Line diff of two texts, `previous` being the older one.
pub fn diff_texts(previous: &str, latest: &str) -> ComparisonResult {
    let old: Vec<&str> = previous.lines().collect();
    let new: Vec<&str> = latest.lines().collect();

    let mut added = Vec::new();
    let mut removed = Vec::new();
    for (index, edit) in edit_script(&old, &new).into_iter().enumerate() {
        match edit {
            Edit::Equal => {}
            Edit::Removed(line) => removed.push(DiffLine {
                position: index + 1,
                line_number: line + 1,
                text: old[line].to_string(),
            }),
            Edit::Added(line) => added.push(DiffLine {
                position: index + 1,
                line_number: line + 1,
                text: new[line].to_string(),
            }),
        }
    }

    if added.is_empty() && removed.is_empty() {
        ComparisonResult::NoDifferences
    } else {
        ComparisonResult::Changes { added, removed }
    }
}

/// Compares the two filings of a pair.
pub fn compare(pair: &FilingPair) -> ComparisonResult {
    match &pair.previous {
        None => ComparisonResult::NoPreviousFiling,
        Some(previous) => diff_texts(&previous.content, &pair.latest.content),
    }
}
