//! `{keyword: value}` directive lines.

/// A recognized (or explicitly unrecognized) directive line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Directive {
    StartOfChorus,
    EndOfChorus,
    Title(String),
    Section(String),
    Comment(String),
    /// Suppress stanza numbering.
    NoNumber,
    /// The line carries an inline echo and is processed as lyrics.
    Echo,
    /// Anything else starting with `{`; holds the whole line.
    Unknown(String),
}

/// Result of tokenizing one directive line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DirectiveToken {
    pub directive: Directive,
    /// The closing `}` was missing; a value, if any, ran to the end of the line.
    pub unterminated: bool,
}

enum Keyword {
    Flag(Directive),
    Valued(fn(String) -> Directive),
}

const KEYWORDS: &[(&str, Keyword)] = &[
    ("{start_of_chorus}", Keyword::Flag(Directive::StartOfChorus)),
    ("{end_of_chorus}", Keyword::Flag(Directive::EndOfChorus)),
    ("{title:", Keyword::Valued(Directive::Title)),
    ("{section:", Keyword::Valued(Directive::Section)),
    ("{comments:", Keyword::Valued(Directive::Comment)),
    ("{comment:", Keyword::Valued(Directive::Comment)),
    ("{no_number", Keyword::Flag(Directive::NoNumber)),
];

const ECHO_MARKER: &str = "{echo";

fn starts_with_ignore_case(text: &str, prefix: &str) -> bool {
    text.get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
}

/// Byte offset of `needle` in `haystack`, ignoring ASCII case.
pub(crate) fn find_ignore_case(haystack: &str, needle: &str) -> Option<usize> {
    haystack
        .char_indices()
        .map(|(idx, _)| idx)
        .find(|&idx| starts_with_ignore_case(&haystack[idx..], needle))
}

/// The trimmed text between the first `:` and the next `}`.
///
/// Returns the value and whether the `}` was missing.
fn directive_value(line: &str) -> (String, bool) {
    let Some(colon) = line.find(':') else {
        return (String::new(), !line.contains('}'));
    };
    let rest = &line[colon + 1..];
    match rest.find('}') {
        Some(close) => (rest[..close].trim().to_string(), false),
        None => (rest.trim().to_string(), true),
    }
}

/// Tokenize a line if it is a directive line.
///
/// Returns `None` unless the first non-whitespace character is `{`.
/// Keywords match case-insensitively; values keep their original case.
pub fn tokenize(line: &str) -> Option<DirectiveToken> {
    let line = line.trim_start();
    if !line.starts_with('{') {
        return None;
    }

    for (prefix, keyword) in KEYWORDS {
        if !starts_with_ignore_case(line, prefix) {
            continue;
        }
        let token = match keyword {
            Keyword::Flag(directive) => DirectiveToken {
                directive: directive.clone(),
                unterminated: !line.contains('}'),
            },
            Keyword::Valued(make) => {
                let (value, unterminated) = directive_value(line);
                DirectiveToken {
                    directive: make(value),
                    unterminated,
                }
            }
        };
        return Some(token);
    }

    let directive = if find_ignore_case(line, ECHO_MARKER).is_some() {
        Directive::Echo
    } else {
        Directive::Unknown(line.trim_end().to_string())
    };
    Some(DirectiveToken {
        directive,
        unterminated: false,
    })
}
