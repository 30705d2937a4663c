//! Text manipulation utilities for working with source code.

/// Check if a character may start an identifier.
#[inline]
pub fn is_identifier_start(c: char) -> bool {
    c == '_' || c == '$' || unicode_ident::is_xid_start(c)
}

/// Check if a character is considered part of a word (identifier).
///
/// Uses Unicode Standard Annex #31 rules for identifier characters.
#[inline]
pub fn is_word_character(c: char) -> bool {
    c == '$' || unicode_ident::is_xid_continue(c)
}

/// True if `text` is a syntactically valid identifier.
pub fn is_valid_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) if is_identifier_start(first) => chars.all(is_word_character),
        _ => false,
    }
}

/// Return the text of a 0-based line, without its terminator.
pub fn line_text(source: &str, line: u32) -> &str {
    source
        .split('\n')
        .nth(line as usize)
        .map(|l| l.strip_suffix('\r').unwrap_or(l))
        .unwrap_or("")
}

/// Byte offsets at which each line starts.
pub fn line_starts(source: &str) -> Vec<usize> {
    std::iter::once(0)
        .chain(source.match_indices('\n').map(|(idx, _)| idx + 1))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_identifiers() {
        assert!(is_valid_identifier("foo"));
        assert!(is_valid_identifier("_bar9"));
        assert!(!is_valid_identifier("9bar"));
        assert!(!is_valid_identifier(""));
        assert!(!is_valid_identifier("a-b"));
    }

    #[test]
    fn test_line_text_strips_carriage_return() {
        let source = "first\r\nsecond\nthird";
        assert_eq!(line_text(source, 0), "first");
        assert_eq!(line_text(source, 1), "second");
        assert_eq!(line_text(source, 5), "");
    }

    #[test]
    fn test_line_starts() {
        assert_eq!(line_starts("a\nbc\n"), vec![0, 2, 5]);
    }
}
