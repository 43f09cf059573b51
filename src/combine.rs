//! Combining Formatter
//!
//! Merges combinable text resources (client stylesheets) into one output.
//! In pretty-print modes each resource is appended verbatim; otherwise the
//! resources are joined first and the minifier runs once over the whole
//! text, so rules can be merged across resource boundaries.

use std::fmt;
use tracing::debug;

use crate::error::SyncError;
use crate::mode::Mode;

// ═══════════════════════════════════════════════════════════════════════════════
// COLLABORATORS
// ═══════════════════════════════════════════════════════════════════════════════

/// A unit of text eligible to be merged with its siblings.
pub trait Combinable {
    fn contents(&self) -> &str;
}

impl Combinable for str {
    fn contents(&self) -> &str {
        self
    }
}

impl Combinable for String {
    fn contents(&self) -> &str {
        self
    }
}

impl<T: Combinable + ?Sized> Combinable for &T {
    fn contents(&self) -> &str {
        (**self).contents()
    }
}

/// A client library stylesheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientLibrary {
    pub url: String,
    pub contents: String,
}

impl ClientLibrary {
    pub fn new(url: impl Into<String>, contents: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            contents: contents.into(),
        }
    }
}

impl Combinable for ClientLibrary {
    fn contents(&self) -> &str {
        &self.contents
    }
}

/// Opaque text-to-text minification transform.
pub trait Minifier {
    fn minify(&self, input: &str) -> Result<String, SyncError>;
}

impl<M: Minifier + ?Sized> Minifier for &M {
    fn minify(&self, input: &str) -> Result<String, SyncError> {
        (**self).minify(input)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// CSS MINIFIER
// ═══════════════════════════════════════════════════════════════════════════════

/// Whitespace and comment stripping for CSS.
///
/// Quoted strings are copied untouched. Whitespace is dropped next to
/// `{ } ; , >` and after `:`; before `:` only inside a block, since
/// `a :hover` and `a:hover` are different selectors.
#[derive(Debug, Clone, Copy, Default)]
pub struct CssMinifier;

const TIGHT: [char; 6] = ['{', '}', ';', ',', '>', ':'];

#[derive(Clone, Copy)]
enum State {
    Normal,
    InString(char),
    InStringEscape(char),
    InComment,
    InCommentStar,
}

impl Minifier for CssMinifier {
    fn minify(&self, input: &str) -> Result<String, SyncError> {
        let mut out = String::with_capacity(input.len());
        let mut state = State::Normal;
        let mut depth = 0usize;
        let mut pending_space = false;
        let mut chars = input.chars().peekable();

        while let Some(ch) = chars.next() {
            state = match state {
                State::InString(quote) => {
                    out.push(ch);
                    match ch {
                        '\\' => State::InStringEscape(quote),
                        c if c == quote => State::Normal,
                        _ => State::InString(quote),
                    }
                }
                State::InStringEscape(quote) => {
                    out.push(ch);
                    State::InString(quote)
                }
                State::InComment => match ch {
                    '*' => State::InCommentStar,
                    _ => State::InComment,
                },
                State::InCommentStar => match ch {
                    // A comment separates tokens like whitespace does.
                    '/' => {
                        pending_space = true;
                        State::Normal
                    }
                    '*' => State::InCommentStar,
                    _ => State::InComment,
                },
                State::Normal => {
                    if ch.is_whitespace() {
                        pending_space = true;
                        continue;
                    }
                    if ch == '/' && chars.peek() == Some(&'*') {
                        chars.next();
                        State::InComment
                    } else {
                        if pending_space {
                            pending_space = false;
                            let keep = match out.chars().last() {
                                None => false,
                                Some(prev) => {
                                    !TIGHT.contains(&prev)
                                        && !(TIGHT.contains(&ch) && (ch != ':' || depth > 0))
                                }
                            };
                            if keep {
                                out.push(' ');
                            }
                        }
                        match ch {
                            '{' => {
                                depth += 1;
                                out.push(ch);
                                State::Normal
                            }
                            '}' => {
                                depth = depth.checked_sub(1).ok_or_else(|| {
                                    SyncError::Minify("unexpected '}'".to_string())
                                })?;
                                if out.ends_with(';') {
                                    out.pop();
                                }
                                out.push(ch);
                                State::Normal
                            }
                            '"' | '\'' => {
                                out.push(ch);
                                State::InString(ch)
                            }
                            _ => {
                                out.push(ch);
                                State::Normal
                            }
                        }
                    }
                }
            };
        }

        match state {
            State::InComment | State::InCommentStar => {
                Err(SyncError::Minify("unterminated comment".to_string()))
            }
            State::InString(_) | State::InStringEscape(_) => {
                Err(SyncError::Minify("unterminated string".to_string()))
            }
            State::Normal if depth > 0 => Err(SyncError::Minify(format!(
                "{} unclosed block(s)",
                depth
            ))),
            State::Normal => Ok(out),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// FORMATTER
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Default)]
pub struct CombiningFormatter<M = CssMinifier> {
    minifier: M,
}

impl<M: Minifier> CombiningFormatter<M> {
    pub fn new(minifier: M) -> Self {
        Self { minifier }
    }

    /// Write `values` to `out` in order, skipping `None` entries.
    ///
    /// Minifies unless `mode` pretty-prints. When minifying, nothing reaches
    /// `out` until the minifier has succeeded on the joined text.
    pub fn write_collection<C, W>(
        &self,
        mode: Mode,
        values: &[Option<C>],
        out: &mut W,
    ) -> Result<(), SyncError>
    where
        C: Combinable,
        W: fmt::Write + ?Sized,
    {
        let compress = !mode.pretty_print();

        if !compress {
            for value in values.iter().flatten() {
                out.write_str(value.contents())?;
            }
            return Ok(());
        }

        let mut joined = String::new();
        let mut count = 0usize;
        for value in values.iter().flatten() {
            joined.push_str(value.contents());
            count += 1;
        }

        let minified = self.minifier.minify(&joined)?;
        debug!(
            %mode,
            resources = count,
            input_len = joined.len(),
            output_len = minified.len(),
            "combined resources minified"
        );
        out.write_str(&minified)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minify(css: &str) -> String {
        CssMinifier.minify(css).unwrap()
    }

    #[test]
    fn test_minify_whitespace_and_comments() {
        assert_eq!(
            minify("/* header */\na {\n  color : red ;\n  margin: 0 auto;\n}\n\n.b , .c > d { }"),
            "a{color:red;margin:0 auto}.b,.c>d{}"
        );
    }

    #[test]
    fn test_minify_comment_separates_tokens() {
        assert_eq!(minify("a{margin:0/**/auto}"), "a{margin:0 auto}");
        assert_eq!(minify("a{/* x */color:red/* y */;}"), "a{color:red}");
    }

    #[test]
    fn test_minify_keeps_descendant_pseudo_selector() {
        assert_eq!(minify("a :hover { x: y }"), "a :hover{x:y}");
        assert_eq!(minify("a:hover{x:y}"), "a:hover{x:y}");
    }

    #[test]
    fn test_minify_leaves_strings_alone() {
        assert_eq!(
            minify(r#"a::after { content: "  /* no */ ; \" }" }"#),
            r#"a::after{content:"  /* no */ ; \" }"}"#
        );
    }

    #[test]
    fn test_minify_nested_blocks() {
        assert_eq!(
            minify("@media screen and (min-width: 10px) {\n  a { b: c; }\n}"),
            "@media screen and (min-width:10px){a{b:c}}"
        );
    }

    #[test]
    fn test_minify_rejects_malformed_input() {
        assert!(matches!(CssMinifier.minify("a { b: c"), Err(SyncError::Minify(_))));
        assert!(matches!(CssMinifier.minify("a { } }"), Err(SyncError::Minify(_))));
        assert!(matches!(CssMinifier.minify("a { } /* open"), Err(SyncError::Minify(_))));
        assert!(matches!(CssMinifier.minify("a { b: 'c }"), Err(SyncError::Minify(_))));
    }
}
