//! Shell glob matching over directory entry names.
//!
//! Supports `*`, `?`, and `[...]` classes (with ranges and `!`/`^`
//! negation). Matching is anchored at both ends and never crosses a `/`:
//! patterns apply to one directory's immediate child names only.

use crate::error::VfsError;

/// True when the string contains any glob metacharacter.
pub fn has_wildcards(s: &str) -> bool {
    s.chars().any(|c| matches!(c, '*' | '?' | '['))
}

/// Match `pattern` against `name`.
///
/// Fails with `InvalidPattern` on an unterminated `[...]` class.
pub fn glob_match(pattern: &str, name: &str) -> Result<bool, VfsError> {
    let pat: Vec<char> = pattern.chars().collect();
    let text: Vec<char> = name.chars().collect();
    match_from(&pat, 0, &text, 0)
}

fn match_from(pat: &[char], mut p: usize, text: &[char], mut t: usize) -> Result<bool, VfsError> {
    while p < pat.len() {
        match pat[p] {
            '*' => {
                // Collapse consecutive stars, then try every remaining split.
                while p + 1 < pat.len() && pat[p + 1] == '*' {
                    p += 1;
                }
                if p + 1 == pat.len() {
                    return Ok(true);
                }
                for start in t..=text.len() {
                    if match_from(pat, p + 1, text, start)? {
                        return Ok(true);
                    }
                }
                return Ok(false);
            }
            '?' => {
                if t >= text.len() {
                    return Ok(false);
                }
                p += 1;
                t += 1;
            }
            '[' => {
                let (matched, next) = match_class(pat, p, text.get(t).copied())?;
                if !matched {
                    return Ok(false);
                }
                p = next;
                t += 1;
            }
            c => {
                if t >= text.len() || text[t] != c {
                    return Ok(false);
                }
                p += 1;
                t += 1;
            }
        }
    }
    Ok(t == text.len())
}

/// Match the `[...]` class opening at `open` against `ch`.
///
/// Returns the result and the index just past the closing bracket. A `]` as
/// the first class character is a literal; `a-z` inside a class is a range.
fn match_class(
    pat: &[char],
    open: usize,
    ch: Option<char>,
) -> Result<(bool, usize), VfsError> {
    let invalid = || VfsError::InvalidPattern(pat.iter().collect());
    let mut i = open + 1;
    let negate = matches!(pat.get(i), Some('!') | Some('^'));
    if negate {
        i += 1;
    }
    let mut matched = false;
    let mut first = true;
    loop {
        let c = *pat.get(i).ok_or_else(invalid)?;
        if c == ']' && !first {
            i += 1;
            break;
        }
        first = false;
        let range_end = match (pat.get(i + 1), pat.get(i + 2)) {
            (Some('-'), Some(&e)) if e != ']' => Some(e),
            _ => None,
        };
        match range_end {
            Some(end) => {
                if let Some(ch) = ch {
                    if ch >= c && ch <= end {
                        matched = true;
                    }
                }
                i += 3;
            }
            None => {
                if Some(c) == ch {
                    matched = true;
                }
                i += 1;
            }
        }
    }
    match ch {
        None => Ok((false, i)),
        Some(_) => Ok((if negate { !matched } else { matched }, i)),
    }
}
