//! Parsers for `virsh` command output.
//!
//! All text scraping lives here so that output-format drift shows up as a
//! failing test in one place instead of a silently wrong inventory.

use crate::platform::pal::Volume;

/// Parse `virsh list --name` / `pool-list --name` output: one name per line,
/// blank lines ignored.
#[must_use]
pub fn parse_name_list(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parse the `virsh vol-list --pool <pool>` table.
///
/// ```text
///  Name                 Path
/// ---------------------------------------------------------
///  lab1_web.img         /var/lib/libvirt/images/lab1_web.img
///  installer.iso        rbdpool/installer.iso
/// ```
///
/// The path column is not always absolute (rbd prints `pool/image`, gluster a
/// URL), so rows are split at the header's `Path` offset. Rows that do not
/// line up with the header fall back to the first run of two or more spaces.
/// Names containing single spaces survive. Rows without a path keep the whole
/// row as the name.
#[must_use]
pub fn parse_vol_list(stdout: &str, pool: &str) -> Vec<Volume> {
    let mut volumes = Vec::new();
    let mut path_column = None;
    let mut past_rule = false;
    for line in stdout.lines() {
        if !past_rule {
            if is_rule(line.trim()) {
                past_rule = true;
            } else if let Some(col) = line.find("Path") {
                path_column = Some(col);
            }
            continue;
        }
        if line.trim().is_empty() {
            continue;
        }
        let name = row_name(line, path_column);
        if !name.is_empty() {
            volumes.push(Volume::new(pool, name));
        }
    }
    volumes
}

fn row_name(row: &str, path_column: Option<usize>) -> &str {
    if let Some(col) = path_column {
        if let (Some(head), Some(tail)) = (row.get(..col), row.get(col..)) {
            if head.ends_with(char::is_whitespace) && tail.starts_with(|c: char| !c.is_whitespace()) {
                return head.trim();
            }
        }
    }
    let trimmed = row.trim();
    match trimmed.find("  ") {
        Some(idx) => trimmed[..idx].trim_end(),
        None => trimmed,
    }
}

fn is_rule(line: &str) -> bool {
    !line.is_empty() && line.chars().all(|c| c == '-')
}

/// Whether virsh stderr says the named pool does not exist.
#[must_use]
pub fn is_missing_pool_error(stderr: &str) -> bool {
    let lower = stderr.to_ascii_lowercase();
    lower.contains("storage pool not found") || lower.contains("no storage pool with matching name")
}
