//! Human-readable rendering of jaq load and compile errors

use jaq_core::compile::Undefined;
use jaq_core::load::{self, lex};

/// Longest excerpt of offending input quoted in a message
const EXCERPT_CHARS: usize = 16;

/// Render lexer and parser errors
pub(super) fn load_errors<F>(errors: Vec<(F, load::Error<&str>)>) -> String {
    let messages: Vec<String> = errors
        .into_iter()
        .flat_map(|(_, error)| match error {
            load::Error::Lex(errs) => errs
                .into_iter()
                .map(|(expected, found)| lex_error(&expected, found))
                .collect::<Vec<_>>(),
            load::Error::Parse(errs) => errs
                .into_iter()
                .map(|(_, found)| unexpected(found))
                .collect(),
            _ => vec!["invalid filter".to_string()],
        })
        .collect();
    join(messages)
}

/// Render references to undefined filters, variables and modules
pub(super) fn compile_errors<F>(errors: Vec<(F, Vec<(&str, Undefined)>)>) -> String {
    let messages = errors
        .into_iter()
        .flat_map(|(_, undefined)| undefined)
        .map(|(name, kind)| match kind {
            Undefined::Filter(arity) => format!("undefined filter `{name}/{arity}`"),
            _ => format!("undefined symbol `{name}`"),
        })
        .collect();
    join(messages)
}

fn lex_error(expected: &lex::Expect<&str>, found: &str) -> String {
    let what = match expected {
        lex::Expect::Delim(delim) => return format!("unclosed delimiter `{delim}`"),
        lex::Expect::Digit => "digit",
        lex::Expect::Ident => "identifier",
        lex::Expect::Escape => "string escape sequence",
        lex::Expect::Unicode => "4-digit hexadecimal code point",
        lex::Expect::Token => "token",
        #[allow(unreachable_patterns)]
        _ => return unexpected(found),
    };
    format!("expected {what}, {}", found_text(found))
}

fn unexpected(found: &str) -> String {
    format!("syntax error: unexpected {}", found_text(found))
}

fn found_text(found: &str) -> String {
    if found.is_empty() {
        return "end of input".to_string();
    }
    let excerpt: String = found.chars().take(EXCERPT_CHARS).collect();
    if excerpt.len() < found.len() {
        format!("`{excerpt}...`")
    } else {
        format!("`{excerpt}`")
    }
}

fn join(messages: Vec<String>) -> String {
    if messages.is_empty() {
        return "invalid filter".to_string();
    }
    messages.join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_found_text_end_of_input() {
        assert_eq!(found_text(""), "end of input");
    }

    #[test]
    fn test_found_text_truncates_long_input() {
        assert_eq!(found_text(")"), "`)`");
        assert_eq!(
            found_text("abcdefghijklmnopqrstuvwxyz"),
            "`abcdefghijklmnop...`"
        );
    }

    #[test]
    fn test_unclosed_delimiter() {
        assert_eq!(
            lex_error(&lex::Expect::Delim("("), ""),
            "unclosed delimiter `(`"
        );
    }

    #[test]
    fn test_empty_error_list() {
        assert_eq!(join(Vec::new()), "invalid filter");
    }
}
