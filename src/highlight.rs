//! Query highlighting inside suggestion labels.

/// A label split around the first case-insensitive match of a query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Highlight<'a> {
    pub prefix: &'a str,
    pub matched: &'a str,
    pub suffix: &'a str,
}

impl<'a> Highlight<'a> {
    /// The whole label with nothing emphasized.
    pub fn plain(label: &'a str) -> Self {
        Self {
            prefix: label,
            matched: "",
            suffix: "",
        }
    }
}

/// Split `label` around the first occurrence of `query`, ignoring case.
///
/// The query is matched literally. When it does not occur (or is empty) the
/// whole label ends up in `prefix` and `matched` is empty.
pub fn highlight<'a>(label: &'a str, query: &str) -> Highlight<'a> {
    if query.is_empty() {
        return Highlight::plain(label);
    }

    for (start, _) in label.char_indices() {
        if let Some(len) = match_len_at(&label[start..], query) {
            let end = start + len;
            return Highlight {
                prefix: &label[..start],
                matched: &label[start..end],
                suffix: &label[end..],
            };
        }
    }

    Highlight::plain(label)
}

/// Byte length of the prefix of `haystack` that equals `query` case-insensitively.
fn match_len_at(haystack: &str, query: &str) -> Option<usize> {
    let mut hay = haystack.char_indices();
    for q in query.chars() {
        let (_, h) = hay.next()?;
        if !h.to_lowercase().eq(q.to_lowercase()) {
            return None;
        }
    }
    Some(hay.next().map(|(i, _)| i).unwrap_or(haystack.len()))
}
