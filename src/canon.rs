//! Canonical surface form of query text.
//!
//! Two query strings are considered equal when their canonical forms are
//! byte-identical. The canonicalizer is total: it never fails.

/// Normalize raw query text.
///
/// - single quotes become double quotes
/// - every whitespace character is removed, string contents included
/// - `'''…'''` / `"""…"""` wrappers, `{}` tokens and `.toArray()` calls are dropped
/// - decimal and exponent literals outside strings are rewritten by
///   [`format_float`]
///
/// # Example
///
/// ```
/// use qail_mql::canon::canonicalize;
///
/// let text = "db.events.find({ 'speed': { '$gt': 20.50 } }).toArray()";
/// assert_eq!(canonicalize(text), r#"db.events.find({"speed":{"$gt":20.5}})"#);
/// ```
pub fn canonicalize(text: &str) -> String {
    let mut out: String = text
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| if c == '\'' { '"' } else { c })
        .collect();

    // Removing one token can expose another, so run to a fixpoint.
    loop {
        let next = strip_triple_quotes(&out)
            .replace("{}", "")
            .replace(".toArray()", "");
        if next == out {
            break;
        }
        out = next;
    }

    normalize_decimals(&out)
}

fn strip_triple_quotes(s: &str) -> String {
    let mut s = s;
    while s.len() >= 6 && s.starts_with("\"\"\"") && s.ends_with("\"\"\"") {
        s = &s[3..s.len() - 3];
    }
    s.to_string()
}

/// Canonical decimal text of a float: shortest round-trip digits, never
/// an exponent, always a fractional part (`100.0`, `1.5`, `0.00001`).
pub fn format_float(f: f64) -> String {
    let s = f.to_string();
    if !f.is_finite() || s.contains('.') {
        s
    } else {
        format!("{}.0", s)
    }
}

fn is_word(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Rewrite `\d+\.\d+` and `\d+(\.\d+)?[eE][+-]?\d+` runs that stand
/// alone outside string literals.
///
/// A run touching a quote or a word character on either side is left
/// untouched, as is one that overflows to infinity.
fn normalize_decimals(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut out = String::with_capacity(s.len());
    let mut in_string = false;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if in_string {
            out.push(c);
            if c == '\\' {
                if let Some(&next) = chars.get(i + 1) {
                    out.push(next);
                    i += 1;
                }
            } else if c == '"' {
                in_string = false;
            }
            i += 1;
            continue;
        }

        if c == '"' {
            in_string = true;
            out.push(c);
            i += 1;
            continue;
        }

        let starts_run = c.is_ascii_digit()
            && i.checked_sub(1)
                .map(|p| chars[p])
                .is_none_or(|p| p != '"' && !is_word(p));

        if starts_run {
            if let Some(end) = decimal_end(&chars, i) {
                let boundary_ok = chars.get(end).is_none_or(|&n| n != '"' && !is_word(n));
                if boundary_ok {
                    let literal: String = chars[i..end].iter().collect();
                    match literal.parse::<f64>() {
                        Ok(f) if f.is_finite() => out.push_str(&format_float(f)),
                        _ => out.push_str(&literal),
                    }
                    i = end;
                    continue;
                }
            }
            // Not a standalone decimal: copy the whole digit run.
            while i < chars.len() && chars[i].is_ascii_digit() {
                out.push(chars[i]);
                i += 1;
            }
            continue;
        }

        out.push(c);
        i += 1;
    }

    out
}

/// End index of a decimal or exponent literal starting at `start`.
///
/// Plain integers are not matched.
fn decimal_end(chars: &[char], start: usize) -> Option<usize> {
    let digits = |from: usize| {
        let mut i = from;
        while i < chars.len() && chars[i].is_ascii_digit() {
            i += 1;
        }
        i
    };

    let mut end = digits(start);
    let mut fraction = false;
    if chars.get(end) == Some(&'.') {
        let frac_end = digits(end + 1);
        if frac_end > end + 1 {
            end = frac_end;
            fraction = true;
        }
    }

    let mut exponent = false;
    if matches!(chars.get(end), Some('e' | 'E')) {
        let mut exp_start = end + 1;
        if matches!(chars.get(exp_start), Some('+' | '-')) {
            exp_start += 1;
        }
        let exp_end = digits(exp_start);
        if exp_end > exp_start {
            end = exp_end;
            exponent = true;
        }
    }

    (fraction || exponent).then_some(end)
}
