//! Mechanical text rewrites applied before the statement scan.
//!
//! Both passes preserve semantic content and never fail; malformed input is
//! passed through unchanged for the statement parser to deal with.

/// Run both normalization passes in order.
pub(crate) fn normalize(input: &str) -> String {
    canonicalize_inline_labels(&fold_quoted_newlines(input))
}

/// Fold literal newlines inside `"..."` spans into the two-character escape
/// `\n`, consuming any horizontal whitespace that starts the continuation
/// line. After this pass every statement occupies a single physical line.
pub(crate) fn fold_quoted_newlines(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    let mut in_quote = false;
    let mut escaped = false;

    while let Some(ch) = chars.next() {
        if !in_quote {
            if ch == '"' {
                in_quote = true;
            }
            out.push(ch);
            continue;
        }

        if escaped {
            escaped = false;
            out.push(ch);
            continue;
        }

        match ch {
            '\\' => {
                escaped = true;
                out.push(ch);
            }
            '"' => {
                in_quote = false;
                out.push(ch);
            }
            '\r' => {} // swallowed; the following '\n' drives the fold
            '\n' => {
                out.push_str("\\n");
                while matches!(chars.peek(), Some(' ' | '\t')) {
                    let _ = chars.next();
                }
            }
            other => out.push(other),
        }
    }

    out
}

/// Inline edge-label spellings, longest opener first. `-. x .->` must be
/// tried before `-- x -->` so the dotted opener is never read as a dash.
const INLINE_LABEL_FORMS: [(&str, &str, &str); 3] = [
    ("==", "==>", "==>"),
    ("-.", ".->", "-.->"),
    ("--", "-->", "-->"),
];

/// Rewrite the three "label in the arrow gap" spellings into the canonical
/// `arrow|label|` form so the edge parser only ever sees pipe labels.
pub(crate) fn canonicalize_inline_labels(input: &str) -> String {
    let mut lines: Vec<String> = input.lines().map(rewrite_line).collect();
    if input.ends_with('\n') {
        lines.push(String::new());
    }
    lines.join("\n")
}

fn rewrite_line(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut in_quote = false;
    let mut i = 0;

    while i < line.len() {
        let rest = &line[i..];
        let ch = rest.chars().next().unwrap_or_default();

        if in_quote {
            if ch == '"' {
                in_quote = false;
            }
            out.push(ch);
            i += ch.len_utf8();
            continue;
        }
        if ch == '"' {
            in_quote = true;
            out.push(ch);
            i += ch.len_utf8();
            continue;
        }

        let mut matched = false;
        for (open, close, canonical) in INLINE_LABEL_FORMS {
            if let Some((consumed, replacement)) = rewrite_gap_label(rest, open, close, canonical) {
                out.push_str(&replacement);
                i += consumed;
                matched = true;
                break;
            }
        }
        if !matched {
            out.push(ch);
            i += ch.len_utf8();
        }
    }

    out
}

/// Try to read `<open> label <close>` at the start of `rest`. The gap must
/// hold visible text that is not itself arrow punctuation, otherwise the
/// plain arrow token is left alone.
fn rewrite_gap_label(
    rest: &str,
    open: &str,
    close: &str,
    canonical: &str,
) -> Option<(usize, String)> {
    let tail = rest.strip_prefix(open)?;
    let close_at = tail.find(close)?;
    let gap = tail[..close_at].trim();
    if gap.is_empty() || gap.starts_with(['-', '=', '.', '>', '|']) {
        return None;
    }
    let text = gap.trim_matches('"').trim();
    if text.is_empty() {
        return None;
    }
    let consumed = open.len() + close_at + close.len();
    Some((consumed, format!("{canonical}|{text}|")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn folds_newlines_only_inside_quotes() {
        let input = "A[\"Line 1\n    Line 2\"]\nB[next]";
        assert_eq!(fold_quoted_newlines(input), "A[\"Line 1\\nLine 2\"]\nB[next]");
    }

    #[test]
    fn escaped_quote_does_not_close_the_span() {
        let input = "A[\"say \\\"hi\n  there\"]";
        assert_eq!(fold_quoted_newlines(input), "A[\"say \\\"hi\\nthere\"]");
    }

    #[test]
    fn rewrites_dash_gap_labels() {
        assert_eq!(canonicalize_inline_labels("A -- yes --> B"), "A -->|yes| B");
    }

    #[test]
    fn rewrites_dotted_and_thick_gap_labels() {
        assert_eq!(canonicalize_inline_labels("A -. maybe .-> B"), "A -.->|maybe| B");
        assert_eq!(canonicalize_inline_labels("A == go ==> B"), "A ==>|go| B");
    }

    #[test]
    fn plain_arrows_pass_through_unchanged() {
        for line in ["A --> B", "A -.-> B", "A ==> B", "A-->B-->C"] {
            assert_eq!(canonicalize_inline_labels(line), line);
        }
    }

    #[test]
    fn quoted_dashes_are_not_label_gaps() {
        let line = "A[\"a -- b --> c\"] --> D";
        assert_eq!(canonicalize_inline_labels(line), line);
    }
}
