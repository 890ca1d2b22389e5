//! Finalize processor for the outermost assembly.
//!
//! Extends the leaf processor with mode flags, literal prefix/suffix text,
//! and the normalization passes applied to the completed pattern before it
//! is written into a rule file.

use std::collections::BTreeSet;

use crate::assemble::Assemble;
use crate::directive::Directive;
use crate::error::AssembleError;
use crate::processor::{Processor, RunContext};

/// Flags the target dialect supports; anything else is silently dropped.
const SUPPORTED_FLAGS: &[char] = &['i', 's'];

/// Processor for the outermost (implicit) block.
///
/// Recognizes `##!+` (mode flags), `##!^` (prefix) and `##!$` (suffix)
/// before falling back to leaf behavior. `complete` builds the final
/// pattern: body from the leaf, wrapped when prefix/suffix text is present,
/// one simplification round through the engine, then quote escaping,
/// backslash hexification and the whitespace-class fix-up, in that order.
#[derive(Debug)]
pub struct FinalAssemble {
    inner: Assemble,
    flags: BTreeSet<char>,
    prefixes: String,
    suffixes: String,
}

impl FinalAssemble {
    /// Create an empty finalize processor.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Assemble::new(),
            flags: BTreeSet::new(),
            prefixes: String::new(),
            suffixes: String::new(),
        }
    }

    /// Inline flag group for the collected flags, empty when none were set.
    fn flags_token(&self) -> String {
        if self.flags.is_empty() {
            return String::new();
        }
        let mut token = String::from("(?");
        token.extend(self.flags.iter());
        token.push(')');
        token
    }
}

impl Default for FinalAssemble {
    fn default() -> Self {
        Self::new()
    }
}

impl Processor for FinalAssemble {
    fn process_line(
        &mut self,
        ctx: &mut RunContext<'_>,
        line: &str,
    ) -> Result<(), AssembleError> {
        match Directive::parse(line) {
            Directive::Flags(chars) => {
                for flag in chars.chars().filter(|c| SUPPORTED_FLAGS.contains(c)) {
                    tracing::debug!(flag = %flag, "registering mode flag");
                    self.flags.insert(flag);
                }
                Ok(())
            }
            Directive::Prefix(text) => {
                self.prefixes.push_str(text);
                Ok(())
            }
            Directive::Suffix(text) => {
                self.suffixes.push_str(text);
                Ok(())
            }
            _ => self.inner.process_line(ctx, line),
        }
    }

    fn complete(&mut self, ctx: &mut RunContext<'_>) -> Result<Option<String>, AssembleError> {
        let body = self.inner.complete(ctx)?;
        let flags_token = self.flags_token();

        let mut regex = body.unwrap_or_default();
        if (!self.prefixes.is_empty() || !self.suffixes.is_empty()) && !regex.is_empty() {
            regex = format!("(?:{regex})");
        }
        regex = format!("{}{}{}", self.prefixes, regex, self.suffixes);

        if !regex.is_empty() {
            // One more engine round so redundant nested groups collapse,
            // then the compatibility rewrites. The order is load-bearing:
            // quotes must be escaped before backslash pairs are hexified,
            // and the whitespace fix-up runs on the engine's spellings.
            regex = self.inner.union_whole(ctx, regex)?;
            regex = escape_double_quotes(&regex);
            regex = use_hex_backslashes(&regex);
            regex = use_backslash_s(&regex);
        }

        if !flags_token.is_empty() {
            regex = format!("{flags_token}{regex}");
        }
        Ok((!regex.is_empty()).then_some(regex))
    }
}

/// Escape every double quote not already preceded by a backslash.
///
/// Rule files delimit patterns with double quotes, so a bare `"` in the
/// pattern would terminate the rule early.
fn escape_double_quotes(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut prev_backslash = false;
    for c in input.chars() {
        if c == '"' && !prev_backslash {
            out.push('\\');
        }
        out.push(c);
        prev_backslash = c == '\\';
    }
    out
}

/// Rewrite every literal backslash pair as its hex escape.
///
/// Apache httpd and nginx disagree on backslash sequence handling; the hex
/// spelling reads the same to both.
fn use_hex_backslashes(input: &str) -> String {
    input.replace(r"\\", r"\x5c")
}

/// Rewrite the engine's expansion of the whitespace shorthand back to `\s`.
///
/// The engine's reference dialect excludes vertical tab from `\s` and emits
/// the expanded class instead; the target dialect includes it, so the
/// shorthand is both correct and shorter. The bracket forms must be
/// rewritten before the bare one so a full class is not left half-replaced.
fn use_backslash_s(input: &str) -> String {
    input
        .replace(r"[\t-\n\f-\r ]", r"\s")
        .replace(r"[^\t-\n\f-\r ]", r"[^\s]")
        .replace(r"\t-\n\f-\r ", r"\s")
}
