//! Dotted-numeric version comparison.
//!
//! Release versions are plain dotted numerics ("1.4.0"). Special builds are
//! not comparable and are handled before this comparator is consulted.

/// Returns true when `candidate` is strictly newer than `baseline`.
///
/// Missing components are treated as zero (`"1.4" < "1.4.1"`). Components
/// that fail to parse compare as zero, which makes unparsable versions sort
/// oldest - the safe direction for "should I offer an update" checks.
pub fn is_newer(candidate: &str, baseline: &str) -> bool {
    let candidate = parse(candidate);
    let baseline = parse(baseline);
    let len = candidate.len().max(baseline.len());

    for i in 0..len {
        let c = candidate.get(i).copied().unwrap_or(0);
        let b = baseline.get(i).copied().unwrap_or(0);
        if c != b {
            return c > b;
        }
    }
    false
}

fn parse(version: &str) -> Vec<u64> {
    version
        .trim()
        .split('.')
        .map(|part| part.trim().parse::<u64>().unwrap_or(0))
        .collect()
}
