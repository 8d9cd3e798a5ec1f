//! Command-line tokenizer with POSIX-shell quoting rules.

pub use shell_words::ParseError;

/// Splits a raw line into tokens, honouring single quotes, double quotes and
/// backslash escapes. Fails on unterminated quoting.
pub fn tokenize(line: &str) -> Result<Vec<String>, ParseError> {
    shell_words::split(line)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quotes_group_words() {
        assert_eq!(
            tokenize(r#"ls "a b" 'c d'"#).unwrap(),
            vec!["ls", "a b", "c d"]
        );
    }

    #[test]
    fn test_backslash_escapes() {
        assert_eq!(
            tokenize(r#"cat my\ file "say \"hi\"""#).unwrap(),
            vec!["cat", "my file", r#"say "hi""#]
        );
    }

    #[test]
    fn test_blank_line_is_empty() {
        assert!(tokenize("   \t ").unwrap().is_empty());
    }

    #[test]
    fn test_unterminated_quote_fails() {
        assert!(tokenize(r#"cat "foo"#).is_err());
        assert!(tokenize("echo 'bar").is_err());
    }
}
