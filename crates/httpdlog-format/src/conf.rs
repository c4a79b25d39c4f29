//! Apache configuration parsing for `read_httpd_conf`.
//!
//! Extracts log-format definitions from `LogFormat`, `CustomLog`,
//! `ErrorLogFormat`, and `ErrorLog` directives. The parser consumes lines the
//! caller has already read; it handles backslash continuations, comments, and
//! quoted arguments with escapes.

/// How a format definition was declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfFormatType {
    /// `LogFormat "..." nickname`
    Named,
    /// `LogFormat "..."` or `ErrorLogFormat "..."`
    Default,
    /// `CustomLog path "..."` with an inline quoted format.
    Inline,
}

impl ConfFormatType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Named => "named",
            Self::Default => "default",
            Self::Inline => "inline",
        }
    }
}

/// One format definition extracted from a config file.
#[derive(Debug, Clone)]
pub struct ConfigEntry {
    /// `"access"` or `"error"`.
    pub log_type: &'static str,
    pub format_type: ConfFormatType,
    pub nickname: Option<String>,
    pub format_string: Option<String>,
    pub config_file: String,
    /// 1-based line the directive starts on (continuations keep the first
    /// line's number).
    pub line_number: u64,
}

/// An argument token with its original quoting preserved, so `CustomLog` can
/// tell an inline format string from a nickname reference.
#[derive(Debug, PartialEq, Eq)]
struct Token {
    text: String,
    quoted: bool,
}

/// Split the argument part of a directive line into tokens. Quoted strings
/// may contain whitespace and backslash-escaped characters.
fn tokenize_arguments(line: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut quoted = false;
    let mut escape_next = false;

    for c in line.chars() {
        if escape_next {
            current.push(c);
            escape_next = false;
            continue;
        }
        if c == '\\' {
            escape_next = true;
            continue;
        }
        if c == '"' {
            if in_quotes {
                tokens.push(Token {
                    text: std::mem::take(&mut current),
                    quoted: true,
                });
                in_quotes = false;
                quoted = false;
            } else {
                in_quotes = true;
                quoted = true;
            }
            continue;
        }
        if !in_quotes && (c == ' ' || c == '\t') {
            if !current.is_empty() {
                tokens.push(Token {
                    text: std::mem::take(&mut current),
                    quoted: false,
                });
            }
            continue;
        }
        current.push(c);
    }

    if !current.is_empty() {
        tokens.push(Token {
            text: current,
            quoted,
        });
    }

    tokens
}

/// Parse config lines into format definitions.
///
/// `config_file` is recorded on every entry for provenance. Lines ending in a
/// backslash are joined with the following line and attributed to the line
/// the directive started on.
pub fn parse_config_lines<I>(lines: I, config_file: &str) -> Vec<ConfigEntry>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    let mut entries = Vec::new();
    let mut continued = String::new();
    let mut continued_start = 0u64;
    let mut line_number = 0u64;

    for line in lines {
        line_number += 1;
        let line = line.as_ref();

        if continued.is_empty() {
            continued_start = line_number;
            continued.push_str(line);
        } else {
            continued.push(' ');
            continued.push_str(line);
        }

        if continued.ends_with('\\') {
            continued.pop();
            continue;
        }

        let directive_line = std::mem::take(&mut continued);
        let trimmed = directive_line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        if let Some(entry) = parse_directive(trimmed, config_file, continued_start) {
            entries.push(entry);
        }
    }

    entries
}

fn parse_directive(line: &str, config_file: &str, line_number: u64) -> Option<ConfigEntry> {
    let (word, rest) = match line.find([' ', '\t']) {
        Some(pos) => (&line[..pos], &line[pos..]),
        None => (line, ""),
    };

    match word.to_ascii_lowercase().as_str() {
        "logformat" => parse_log_format(rest, config_file, line_number),
        "customlog" => parse_custom_log(rest, config_file, line_number),
        "errorlogformat" => {
            let tokens = tokenize_arguments(rest);
            let format = tokens.first()?;
            Some(ConfigEntry {
                log_type: "error",
                format_type: ConfFormatType::Default,
                nickname: None,
                format_string: Some(format.text.clone()),
                config_file: config_file.to_owned(),
                line_number,
            })
        }
        // ErrorLog names a destination, not a format; recognized but not a
        // definition.
        "errorlog" => None,
        _ => None,
    }
}

fn parse_log_format(rest: &str, config_file: &str, line_number: u64) -> Option<ConfigEntry> {
    let tokens = tokenize_arguments(rest);
    let format = tokens.first()?;

    // A second token is a nickname unless it is an env= style condition.
    let nickname = tokens
        .get(1)
        .filter(|t| !t.text.contains('='))
        .map(|t| t.text.clone());

    let format_type = if nickname.is_some() {
        ConfFormatType::Named
    } else {
        ConfFormatType::Default
    };

    Some(ConfigEntry {
        log_type: "access",
        format_type,
        nickname,
        format_string: Some(format.text.clone()),
        config_file: config_file.to_owned(),
        line_number,
    })
}

fn parse_custom_log(rest: &str, config_file: &str, line_number: u64) -> Option<ConfigEntry> {
    let tokens = tokenize_arguments(rest);
    if tokens.len() < 2 {
        return None;
    }

    // The second argument is either a quoted inline format or an unquoted
    // nickname reference; references do not define new formats.
    let second = &tokens[1];
    if !second.quoted {
        return None;
    }

    Some(ConfigEntry {
        log_type: "access",
        format_type: ConfFormatType::Inline,
        nickname: None,
        format_string: Some(second.text.clone()),
        config_file: config_file.to_owned(),
        line_number,
    })
}
