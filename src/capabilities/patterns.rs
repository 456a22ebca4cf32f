use regex::Regex;

use super::CapabilityError;

/// Translate a resource glob into an anchored regex. `*` stays within a
/// path segment, `**` crosses segments, `?` matches a single character,
/// and `[...]` character classes pass through.
pub fn compile_glob(pattern: &str) -> Result<Regex, CapabilityError> {
    if pattern.is_empty() {
        return Err(CapabilityError::InvalidGlob {
            pattern: pattern.to_owned(),
            message: "empty pattern".to_owned(),
        });
    }

    let mut regex = String::from("^");
    let mut chars = pattern.chars().peekable();
    let mut in_class = false;

    while let Some(ch) = chars.next() {
        match ch {
            '*' if !in_class => {
                if chars.peek() == Some(&'*') {
                    chars.next();
                    regex.push_str(".*");
                } else {
                    regex.push_str("[^/]*");
                }
            }
            '?' if !in_class => regex.push('.'),
            '[' if !in_class => {
                in_class = true;
                regex.push('[');
                if chars.peek() == Some(&'!') {
                    chars.next();
                    regex.push('^');
                }
            }
            ']' if in_class => {
                in_class = false;
                regex.push(']');
            }
            ch if in_class => regex.push(ch),
            ch if regex_syntax_char(ch) => {
                regex.push('\\');
                regex.push(ch);
            }
            ch => regex.push(ch),
        }
    }

    if in_class {
        return Err(CapabilityError::InvalidGlob {
            pattern: pattern.to_owned(),
            message: "unterminated character class".to_owned(),
        });
    }

    regex.push('$');

    Regex::new(&regex).map_err(|err| CapabilityError::InvalidGlob {
        pattern: pattern.to_owned(),
        message: err.to_string(),
    })
}

pub fn is_valid_glob(pattern: &str) -> bool {
    compile_glob(pattern).is_ok()
}

fn regex_syntax_char(ch: char) -> bool {
    matches!(
        ch,
        '.' | '+' | '(' | ')' | '{' | '}' | '^' | '$' | '|' | '\\'
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_star_stays_in_segment() {
        let regex = compile_glob("*.txt").expect("valid glob");
        assert!(regex.is_match("notes.txt"));
        assert!(!regex.is_match("nested/notes.txt"));
    }

    #[test]
    fn test_double_star_crosses_segments() {
        let regex = compile_glob("data/**").expect("valid glob");
        assert!(regex.is_match("data/a/b/c.bin"));
    }

    #[test]
    fn test_question_mark() {
        let regex = compile_glob("file?.log").expect("valid glob");
        assert!(regex.is_match("file1.log"));
        assert!(!regex.is_match("file12.log"));
    }

    #[test]
    fn test_unterminated_class_is_invalid() {
        assert!(!is_valid_glob("data[01.txt"));
    }

    #[test]
    fn test_empty_pattern_is_invalid() {
        assert!(!is_valid_glob(""));
    }
}
