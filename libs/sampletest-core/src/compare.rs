/// Output Comparator - Exact and Float-Tolerant Judging
///
/// **Core Responsibility:**
/// Compare a run's stdout against the sample answer and produce a verdict.
///
/// **Critical Properties:**
/// - Pure function of the two texts; knows nothing about processes, files
///   or languages.
/// - Normalization first: whole-text trim, then per-line trim, line order
///   and count preserved. Idempotent.
/// - Exact equality wins outright; the float fallback only runs on a
///   mismatch, and bails out entirely on the first pair of tokens it
///   cannot treat as numbers.
///
/// **Tolerance Rule:**
/// The float pass accepts when the largest absolute error stays below 1.0.
/// That is a deliberately coarse ceiling for round-off noise, not a
/// per-problem epsilon judge - it will wave through some wrong answers on
/// problems with huge expected magnitudes, and that tradeoff is accepted.
use crate::process::ExitKind;

/// Accepted ceiling for the largest absolute error in the float fallback.
const ABS_TOLERANCE: f64 = 1.0;

/// Per-sample verdict. `Accepted`/`AcceptedApprox`/`WrongOutput` come from
/// the comparator; `RuntimeFailure` and `Skipped` are produced directly by
/// the driver when no comparison is possible.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    Accepted,
    /// All token pairs were equal-as-numbers within tolerance.
    AcceptedApprox { abs_err: f64, rel_err: f64 },
    /// Carries both normalized texts for display.
    WrongOutput { actual: String, expected: String },
    RuntimeFailure(ExitKind),
    Skipped,
}

impl Verdict {
    /// Counts toward the aggregate as a pass. `Skipped` is neither a pass
    /// nor a failure; it never reaches the aggregate.
    pub fn is_accepted(&self) -> bool {
        matches!(self, Verdict::Accepted | Verdict::AcceptedApprox { .. })
    }
}

/// Strip leading/trailing whitespace from the whole text, then from each
/// line, preserving line order and count.
pub fn normalize(text: &str) -> String {
    text.trim()
        .lines()
        .map(str::trim)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Compare actual program output against the expected answer.
pub fn compare(actual: &str, expected: &str) -> Verdict {
    let actual = normalize(actual);
    let expected = normalize(expected);

    if actual == expected {
        return Verdict::Accepted;
    }

    if let Some((abs_err, rel_err)) = float_errors(&actual, &expected) {
        if abs_err < ABS_TOLERANCE {
            // All mismatches were different spellings of the same numbers,
            // e.g. "1.0" vs "1".
            if abs_err == 0.0 && rel_err == 0.0 {
                return Verdict::Accepted;
            }
            return Verdict::AcceptedApprox { abs_err, rel_err };
        }
    }

    Verdict::WrongOutput { actual, expected }
}

/// Line/token-aligned float comparison.
///
/// Returns the accumulated (max absolute, max relative) errors, or `None`
/// when the texts are not comparable: differing line counts, differing
/// token counts on any line, a non-identical token pair where either side
/// fails to parse as a float, or a NaN parse. A zero expected value skips
/// the relative term silently.
fn float_errors(actual: &str, expected: &str) -> Option<(f64, f64)> {
    let actual_lines: Vec<&str> = actual.lines().collect();
    let expected_lines: Vec<&str> = expected.lines().collect();
    if actual_lines.len() != expected_lines.len() {
        return None;
    }

    let mut abs_err: f64 = 0.0;
    let mut rel_err: f64 = 0.0;

    for (a_line, e_line) in actual_lines.iter().zip(&expected_lines) {
        let a_tokens: Vec<&str> = a_line.split_whitespace().collect();
        let e_tokens: Vec<&str> = e_line.split_whitespace().collect();
        if a_tokens.len() != e_tokens.len() {
            return None;
        }

        for (a_tok, e_tok) in a_tokens.iter().zip(&e_tokens) {
            if a_tok == e_tok {
                continue;
            }
            let a: f64 = a_tok.parse().ok()?;
            let e: f64 = e_tok.parse().ok()?;
            if a.is_nan() || e.is_nan() {
                return None;
            }
            let diff = (a - e).abs();
            abs_err = abs_err.max(diff);
            if e != 0.0 {
                rel_err = rel_err.max(diff / e.abs());
            }
        }
    }

    Some((abs_err, rel_err))
}
