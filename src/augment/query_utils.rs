//! Textual query rewriting
//!
//! Clause keywords are matched case-insensitively and only at the top
//! level: text inside parentheses, string literals, attribute paths and
//! parameter names is never treated as a clause boundary.

use std::sync::OnceLock;

use regex::Regex;

static ALIAS_PATTERN: OnceLock<Option<Regex>> = OnceLock::new();

const NOT_AN_ALIAS: &[&str] = &[
    "where", "group", "order", "having", "join", "left", "right", "inner", "outer", "fetch", "on",
    "set", "union",
];

/// Alias of the first source of the query's FROM clause
pub fn detect_alias(query: &str) -> Option<String> {
    let pattern = ALIAS_PATTERN
        .get_or_init(|| Regex::new(r"(?i)\bfrom\s+([\w.$]+)(?:\s+as\b)?\s+(\w+)").ok())
        .as_ref()?;
    let captures = pattern.captures(query)?;
    let alias = captures.get(2)?.as_str();
    if NOT_AN_ALIAS.iter().any(|k| k.eq_ignore_ascii_case(alias)) {
        return None;
    }
    Some(alias.to_string())
}

/// Appends `from` as an additional source and `where_` as an additional
/// condition.
///
/// - A blank `from` leaves the FROM clause unchanged
/// - A blank `where_` leaves the WHERE clause unchanged
/// - An existing WHERE condition is parenthesized and conjoined:
///   `where (<existing>) and <where_>`
/// - GROUP BY, HAVING and ORDER BY clauses are kept after the WHERE clause
///
/// Text without a top-level FROM clause is returned unchanged.
pub fn add_from_and_where(query: &str, from: &str, where_: &str) -> String {
    let clauses = Clauses::scan(query);
    let Some(from_pos) = clauses.from else {
        return query.to_string();
    };

    let end = query.len();
    let tail = clauses.tail.filter(|&t| t > from_pos);
    let where_pos = clauses.where_.filter(|&w| w > from_pos);
    let from_end = where_pos.or(tail).unwrap_or(end);

    let mut result = query[..from_end].trim_end().to_string();
    if !from.trim().is_empty() {
        result.push_str(", ");
        result.push_str(from.trim());
    }

    let existing = where_pos.map(|w| query[w + "where".len()..tail.unwrap_or(end)].trim());
    match (existing, where_.trim()) {
        (Some(condition), "") => {
            result.push_str(" where ");
            result.push_str(condition);
        }
        (Some(condition), extra) => {
            result.push_str(" where (");
            result.push_str(condition);
            result.push_str(") and ");
            result.push_str(extra);
        }
        (None, "") => {}
        (None, extra) => {
            result.push_str(" where ");
            result.push_str(extra);
        }
    }

    if let Some(tail) = tail {
        result.push(' ');
        result.push_str(query[tail..].trim());
    }
    result
}

/// Byte offsets of top-level clause keywords
#[derive(Debug, Default)]
struct Clauses {
    from: Option<usize>,
    where_: Option<usize>,
    /// First of GROUP BY, HAVING, ORDER BY
    tail: Option<usize>,
}

impl Clauses {
    fn scan(query: &str) -> Self {
        let words = top_level_words(query);
        let mut clauses = Clauses::default();

        for (i, (pos, word)) in words.iter().enumerate() {
            let next_is_by = words
                .get(i + 1)
                .is_some_and(|(_, next)| next.as_str() == "by");
            match word.as_str() {
                "from" if clauses.from.is_none() => clauses.from = Some(*pos),
                "where" if clauses.from.is_some() && clauses.where_.is_none() && clauses.tail.is_none() => {
                    clauses.where_ = Some(*pos)
                }
                "group" | "order" if next_is_by && clauses.from.is_some() && clauses.tail.is_none() => {
                    clauses.tail = Some(*pos)
                }
                "having" if clauses.from.is_some() && clauses.tail.is_none() => clauses.tail = Some(*pos),
                _ => {}
            }
        }
        clauses
    }
}

/// Lower-cased words outside parentheses and string literals, with offsets
fn top_level_words(query: &str) -> Vec<(usize, String)> {
    let mut words = Vec::new();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut start: Option<usize> = None;
    let mut prev: Option<char> = None;
    let mut qualified = false;

    let mut flush = |start: &mut Option<usize>, end: usize, qualified: bool, depth: usize| {
        if let Some(s) = start.take() {
            if depth == 0 && !qualified {
                words.push((s, query[s..end].to_ascii_lowercase()));
            }
        }
    };

    for (i, c) in query.char_indices() {
        if in_string {
            if c == '\'' {
                in_string = false;
            }
            prev = Some(c);
            continue;
        }
        if c.is_alphanumeric() || c == '_' {
            if start.is_none() {
                start = Some(i);
                qualified = matches!(prev, Some(':') | Some('.'));
            }
        } else {
            flush(&mut start, i, qualified, depth);
            match c {
                '\'' => in_string = true,
                '(' => depth += 1,
                ')' => depth = depth.saturating_sub(1),
                _ => {}
            }
        }
        prev = Some(c);
    }
    flush(&mut start, query.len(), qualified, depth);
    words
}
