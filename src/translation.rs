//! Placeholder rewriting for dialects that number their parameters.
//!
//! Generated SQL always uses bare `?`. Dialects such as PostgreSQL expect
//! `$1, $2, ...` instead; [`number_placeholders`] rewrites them while
//! leaving string literals, quoted identifiers, comments and dollar-quoted
//! bodies untouched.

use std::borrow::Cow;

#[derive(Clone)]
enum State {
    Normal,
    SingleQuoted,
    DoubleQuoted,
    LineComment,
    BlockComment(u32),
    DollarQuoted(String),
}

/// Rewrite every `?` outside literals and comments into `$n`, numbered from 1
/// in order of appearance. An explicit `?N` keeps its number and becomes `$N`.
///
/// Returns a borrowed `Cow` when the text has no placeholders.
#[must_use]
pub fn number_placeholders(sql: &str) -> Cow<'_, str> {
    let bytes = sql.as_bytes();
    let mut out: Option<String> = None;
    // start of the not yet copied input
    let mut copied = 0;
    let mut state = State::Normal;
    let mut next = 1usize;
    let mut idx = 0;

    while idx < bytes.len() {
        let b = bytes[idx];
        match state {
            State::Normal => match b {
                b'\'' => state = State::SingleQuoted,
                b'"' => state = State::DoubleQuoted,
                b'-' if bytes.get(idx + 1) == Some(&b'-') => {
                    state = State::LineComment;
                    idx += 1;
                }
                b'/' if bytes.get(idx + 1) == Some(&b'*') => {
                    state = State::BlockComment(1);
                    idx += 1;
                }
                b'$' => {
                    if let Some((tag, end)) = dollar_quote_tag(bytes, idx) {
                        state = State::DollarQuoted(tag);
                        idx = end;
                    }
                }
                b'?' => {
                    let buf = out.get_or_insert_with(|| String::with_capacity(sql.len() + 8));
                    buf.push_str(&sql[copied..idx]);
                    buf.push('$');
                    match scan_digits(bytes, idx + 1) {
                        Some(end) => {
                            buf.push_str(&sql[idx + 1..end]);
                            idx = end - 1;
                        }
                        None => {
                            buf.push_str(&next.to_string());
                            next += 1;
                        }
                    }
                    copied = idx + 1;
                }
                _ => {}
            },
            State::SingleQuoted => {
                if b == b'\'' {
                    if bytes.get(idx + 1) == Some(&b'\'') {
                        idx += 1;
                    } else {
                        state = State::Normal;
                    }
                }
            }
            State::DoubleQuoted => {
                if b == b'"' {
                    if bytes.get(idx + 1) == Some(&b'"') {
                        idx += 1;
                    } else {
                        state = State::Normal;
                    }
                }
            }
            State::LineComment => {
                if b == b'\n' {
                    state = State::Normal;
                }
            }
            State::BlockComment(depth) => {
                if b == b'/' && bytes.get(idx + 1) == Some(&b'*') {
                    state = State::BlockComment(depth + 1);
                    idx += 1;
                } else if b == b'*' && bytes.get(idx + 1) == Some(&b'/') {
                    state = if depth == 1 {
                        State::Normal
                    } else {
                        State::BlockComment(depth - 1)
                    };
                    idx += 1;
                }
            }
            State::DollarQuoted(ref tag) => {
                if b == b'$' && closes_tag(bytes, idx, tag) {
                    idx += tag.len() + 1;
                    state = State::Normal;
                }
            }
        }
        idx += 1;
    }

    match out {
        Some(mut buf) => {
            buf.push_str(&sql[copied..]);
            Cow::Owned(buf)
        }
        None => Cow::Borrowed(sql),
    }
}

/// End of the digit run starting at `start`, if there is one.
fn scan_digits(bytes: &[u8], start: usize) -> Option<usize> {
    let end = start
        + bytes[start.min(bytes.len())..]
            .iter()
            .take_while(|b| b.is_ascii_digit())
            .count();
    (end > start).then_some(end)
}

/// `$tag$` opening at `start`: the tag and the index of its closing `$`.
fn dollar_quote_tag(bytes: &[u8], start: usize) -> Option<(String, usize)> {
    let mut idx = start + 1;
    while idx < bytes.len() && bytes[idx] != b'$' {
        let b = bytes[idx];
        if !(b.is_ascii_alphabetic() || b == b'_' || (idx > start + 1 && b.is_ascii_digit())) {
            return None;
        }
        idx += 1;
    }
    if idx < bytes.len() {
        let tag = String::from_utf8(bytes[start + 1..idx].to_vec()).ok()?;
        Some((tag, idx))
    } else {
        None
    }
}

fn closes_tag(bytes: &[u8], idx: usize, tag: &str) -> bool {
    let end = idx + 1 + tag.len();
    bytes.get(idx + 1..end) == Some(tag.as_bytes()) && bytes.get(end) == Some(&b'$')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_bare_placeholders() {
        let sql = "UPDATE t SET a=?,b=? WHERE id=?";
        assert_eq!(number_placeholders(sql), "UPDATE t SET a=$1,b=$2 WHERE id=$3");
    }

    #[test]
    fn keeps_explicit_numbers() {
        let sql = "select * from t where a = ?2 and b = ?1";
        assert_eq!(
            number_placeholders(sql),
            "select * from t where a = $2 and b = $1"
        );
    }

    #[test]
    fn skips_inside_literals_and_comments() {
        let sql = "select '?', \"a?\" -- ?\n/* ? /* ? */ */ from t where a = ?";
        assert_eq!(
            number_placeholders(sql),
            "select '?', \"a?\" -- ?\n/* ? /* ? */ */ from t where a = $1"
        );
    }

    #[test]
    fn skips_dollar_quoted_blocks() {
        let sql = "$body$ select ? $body$ where a = ?";
        assert_eq!(number_placeholders(sql), "$body$ select ? $body$ where a = $1");
    }

    #[test]
    fn borrows_when_unchanged() {
        let sql = "SELECT 1";
        assert!(matches!(number_placeholders(sql), Cow::Borrowed(_)));
    }

    #[test]
    fn preserves_multibyte_text() {
        let sql = "SELECT 'héllo' FROM t WHERE name=?";
        assert_eq!(
            number_placeholders(sql),
            "SELECT 'héllo' FROM t WHERE name=$1"
        );
    }
}
