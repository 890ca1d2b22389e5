//! Directive line classification.
//!
//! A directive is a specially marked line that controls preprocessing rather
//! than contributing pattern content. Markers are recognized after optional
//! leading whitespace only; a line with other text before `##!` is plain
//! content. The first matching classification wins.

use std::sync::LazyLock;

use regex::Regex;

static BLOCK_START: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*##!>\s*(.*)$").unwrap());
static BLOCK_END: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*##!<").unwrap());
static STORE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*##!=<\s*(.*)$").unwrap());
static RECALL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*##!=>\s*(.*)$").unwrap());
static FLAGS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*##!\+\s*(.*)$").unwrap());
static PREFIX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*##!\^\s*(.*)$").unwrap());
static SUFFIX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*##!\$\s*(.*)$").unwrap());
static COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*##!(?:[^><=+^$]|$)").unwrap());

/// Classification of one input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive<'a> {
    /// `##!` comment; contributes nothing to any block.
    Comment,
    /// `##!>` NAME [ARGS…] — begin a nested block run by processor NAME.
    BlockStart {
        /// Registered processor name.
        name: &'a str,
        /// Whitespace-separated arguments after the name.
        args: Vec<&'a str>,
    },
    /// `##!<` — end the innermost nested block.
    BlockEnd,
    /// `##!=<` IDENT — store the accumulated expression under IDENT.
    Store(&'a str),
    /// `##!=>` IDENT — recall a stored expression (empty IDENT flushes
    /// pending fragments instead).
    Recall(&'a str),
    /// `##!+` FLAGS — finalize-only mode flags.
    Flags(&'a str),
    /// `##!^` TEXT — finalize-only literal prefix.
    Prefix(&'a str),
    /// `##!$` TEXT — finalize-only literal suffix.
    Suffix(&'a str),
    /// Ordinary content line.
    Plain(&'a str),
}

impl<'a> Directive<'a> {
    /// Classify `line` against the marker grammar.
    #[must_use]
    pub fn parse(line: &'a str) -> Self {
        if let Some(caps) = BLOCK_START.captures(line) {
            let mut words = capture_text(&caps).split_whitespace();
            let name = words.next().unwrap_or_default();
            return Directive::BlockStart {
                name,
                args: words.collect(),
            };
        }
        if BLOCK_END.is_match(line) {
            return Directive::BlockEnd;
        }
        if let Some(caps) = STORE.captures(line) {
            return Directive::Store(capture_text(&caps));
        }
        if let Some(caps) = RECALL.captures(line) {
            return Directive::Recall(capture_text(&caps));
        }
        if let Some(caps) = FLAGS.captures(line) {
            return Directive::Flags(capture_text(&caps));
        }
        if let Some(caps) = PREFIX.captures(line) {
            return Directive::Prefix(capture_text(&caps));
        }
        if let Some(caps) = SUFFIX.captures(line) {
            return Directive::Suffix(capture_text(&caps));
        }
        if COMMENT.is_match(line) {
            return Directive::Comment;
        }
        Directive::Plain(line)
    }
}

fn capture_text<'a>(caps: &regex::Captures<'a>) -> &'a str {
    caps.get(1).map_or("", |m| m.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn comments_are_recognized_with_leading_whitespace() {
        assert_eq!(Directive::parse("##!line1"), Directive::Comment);
        assert_eq!(Directive::parse(" ##! line2"), Directive::Comment);
        assert_eq!(Directive::parse("\t\t##!foo"), Directive::Comment);
        assert_eq!(Directive::parse("##!\tline3"), Directive::Comment);
        assert_eq!(Directive::parse("##!"), Directive::Comment);
    }

    #[test]
    fn markers_after_other_text_are_plain_content() {
        let line = " not blank ##!+smx ";
        assert_eq!(Directive::parse(line), Directive::Plain(line));
    }

    #[test]
    fn block_start_splits_name_and_args() {
        assert_eq!(
            Directive::parse("##!> assemble"),
            Directive::BlockStart {
                name: "assemble",
                args: vec![]
            }
        );
        assert_eq!(
            Directive::parse("  ##!> cmdline unix"),
            Directive::BlockStart {
                name: "cmdline",
                args: vec!["unix"]
            }
        );
        assert_eq!(
            Directive::parse("##!>"),
            Directive::BlockStart {
                name: "",
                args: vec![]
            }
        );
    }

    #[test]
    fn block_end_matches_with_leading_whitespace() {
        assert_eq!(Directive::parse("##!<"), Directive::BlockEnd);
        assert_eq!(Directive::parse("    ##!<"), Directive::BlockEnd);
    }

    #[test]
    fn store_and_recall_capture_the_identifier() {
        assert_eq!(Directive::parse("##!=< slashes"), Directive::Store("slashes"));
        assert_eq!(Directive::parse("##!=<slashes"), Directive::Store("slashes"));
        assert_eq!(Directive::parse("##!=< "), Directive::Store(""));
        assert_eq!(Directive::parse("##!=> slashes"), Directive::Recall("slashes"));
        assert_eq!(Directive::parse("##!=>"), Directive::Recall(""));
    }

    #[test]
    fn finalize_markers_capture_their_text() {
        assert_eq!(Directive::parse("##!+i"), Directive::Flags("i"));
        assert_eq!(Directive::parse("##!+   smx"), Directive::Flags("smx"));
        assert_eq!(Directive::parse("##!^ a prefix"), Directive::Prefix("a prefix"));
        assert_eq!(Directive::parse("##!$ a suffix"), Directive::Suffix("a suffix"));
    }

    #[test]
    fn everything_else_is_plain() {
        assert_eq!(Directive::parse("foo.*bar"), Directive::Plain("foo.*bar"));
        assert_eq!(Directive::parse("# not ours"), Directive::Plain("# not ours"));
        assert_eq!(Directive::parse("##!="), Directive::Plain("##!="));
    }
}
