//! Line-oriented reader for INI configuration sources.
use std::path::Path;

use crate::error::ConfigError;

/// A section as written in a configuration source, before guard evaluation.
///
/// # Examples
///
/// ```
/// use dotfiles_features::config::ini::RawSection;
///
/// let section = RawSection {
///     header: "commands :: distribution == 'arch'".to_string(),
///     line: 1,
///     entries: vec![("package_install".to_string(), Some("pacman -S ${name}".to_string()))],
/// };
/// assert_eq!(section.entries.len(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawSection {
    /// The raw header text between the brackets, trimmed.
    pub header: String,
    /// 1-based line number of the header.
    pub line: usize,
    /// Entries in declaration order; bare keys carry `None`.
    pub entries: Vec<(String, Option<String>)>,
}

/// Read and parse a configuration source.
///
/// A missing file is not an error: it contributes no sections.
///
/// # Errors
///
/// Returns an error if an existing file cannot be read or contains invalid
/// syntax.
pub fn parse_file(path: &Path) -> Result<Vec<RawSection>, ConfigError> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(source) => {
            return Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    parse_str(&content, path)
}

/// Parse configuration content from a string.
///
/// Format:
/// ```ini
/// # comment
/// [section]
/// key = value
/// flag
///
/// [section :: distribution == 'debian']
/// key = other
/// ```
///
/// `path` is only used for error messages.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use dotfiles_features::config::ini::parse_str;
///
/// let sections = parse_str("[blacklist]\nbrew\n[commands]\nx = y\n", Path::new("c.conf")).unwrap();
/// assert_eq!(sections[0].header, "blacklist");
/// assert_eq!(sections[0].entries[0], ("brew".to_string(), None));
/// assert_eq!(sections[1].entries[0].1.as_deref(), Some("y"));
/// ```
///
/// # Errors
///
/// Returns an error if an entry appears outside of a section or a header is
/// empty.
pub fn parse_str(content: &str, path: &Path) -> Result<Vec<RawSection>, ConfigError> {
    let mut sections = Vec::new();
    let mut current: Option<RawSection> = None;

    for (index, line) in content.lines().enumerate() {
        let line_num = index + 1;
        let trimmed = line.trim();

        if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with(';') {
            continue;
        }

        // Indented lines continue the previous value
        let indented = line.starts_with(' ') || line.starts_with('\t');
        if indented
            && let Some(section) = current.as_mut()
            && let Some((_, value)) = section.entries.last_mut()
        {
            match value {
                Some(v) => {
                    v.push('\n');
                    v.push_str(trimmed);
                }
                None => *value = Some(trimmed.to_string()),
            }
            continue;
        }

        if let Some(header) = parse_header(trimmed) {
            if header.is_empty() {
                return Err(syntax_error(path, line_num, "empty section header"));
            }
            if let Some(section) = current.take() {
                sections.push(section);
            }
            current = Some(RawSection {
                header,
                line: line_num,
                entries: Vec::new(),
            });
        } else if let Some(section) = current.as_mut() {
            section.entries.push(parse_entry(trimmed));
        } else {
            return Err(syntax_error(
                path,
                line_num,
                &format!("entry outside of section: {trimmed}"),
            ));
        }
    }

    if let Some(section) = current {
        sections.push(section);
    }

    Ok(sections)
}

/// Parse a `[header]` line, returning the trimmed inner text.
fn parse_header(line: &str) -> Option<String> {
    let inner = line.strip_prefix('[')?.strip_suffix(']')?;
    Some(inner.trim().to_string())
}

/// Parse a `key = value` or bare `key` line.
fn parse_entry(line: &str) -> (String, Option<String>) {
    match line.split_once('=') {
        Some((key, value)) => (key.trim().to_string(), Some(value.trim().to_string())),
        None => (line.to_string(), None),
    }
}

fn syntax_error(path: &Path, line: usize, message: &str) -> ConfigError {
    ConfigError::InvalidSyntax {
        file: path.to_path_buf(),
        line,
        message: message.to_string(),
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn parse(content: &str) -> Vec<RawSection> {
        parse_str(content, Path::new("test.conf")).expect("test data should parse")
    }

    #[test]
    fn parse_key_values_and_flags() {
        let sections = parse("[s]\nk = 1\nflag\nother=two words\n");
        assert_eq!(sections.len(), 1);
        assert_eq!(
            sections[0].entries,
            vec![
                ("k".to_string(), Some("1".to_string())),
                ("flag".to_string(), None),
                ("other".to_string(), Some("two words".to_string())),
            ]
        );
    }

    #[test]
    fn parse_keeps_header_text_and_line() {
        let sections = parse("# leading comment\n\n[ s :: distribution == 'debian' ]\nk\n");
        assert_eq!(sections[0].header, "s :: distribution == 'debian'");
        assert_eq!(sections[0].line, 3);
    }

    #[test]
    fn parse_preserves_key_case() {
        let sections = parse("[package_names]\nPython3-Pip = python-pip\n");
        assert_eq!(sections[0].entries[0].0, "Python3-Pip");
    }

    #[test]
    fn parse_value_with_equals() {
        let sections = parse("[s]\nk = a=b\n");
        assert_eq!(sections[0].entries[0].1.as_deref(), Some("a=b"));
    }

    #[test]
    fn parse_semicolon_comments_ignored() {
        let sections = parse("[s]\n; note\nk\n");
        assert_eq!(sections[0].entries.len(), 1);
    }

    #[test]
    fn parse_continuation_lines() {
        let sections = parse("[s]\nk = first\n    second\n");
        assert_eq!(sections[0].entries[0].1.as_deref(), Some("first\nsecond"));
    }

    #[test]
    fn parse_repeated_headers_stay_separate() {
        let sections = parse("[s]\na\n[t]\nb\n[s]\nc\n");
        assert_eq!(sections.len(), 3);
        assert_eq!(sections[2].header, "s");
    }

    #[test]
    fn parse_entry_outside_section_fails() {
        let err = parse_str("orphan\n", Path::new("x.conf")).unwrap_err();
        assert!(
            matches!(err, ConfigError::InvalidSyntax { line: 1, .. }),
            "unexpected error: {err}"
        );
    }

    #[test]
    fn parse_empty_header_fails() {
        assert!(parse_str("[ ]\n", Path::new("x.conf")).is_err());
    }

    #[test]
    fn missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let sections = parse_file(&dir.path().join("absent.conf")).expect("missing file is fine");
        assert!(sections.is_empty());
    }

    #[test]
    fn existing_file_is_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("c.conf");
        std::fs::write(&path, "[blacklist]\nbrew\n").unwrap();
        let sections = parse_file(&path).unwrap();
        assert_eq!(sections[0].header, "blacklist");
    }
}
