//! Leaf assembly processor.
//!
//! Accumulates literal pattern fragments, resolves store/recall directives
//! against the run stash, and folds the accumulated fragments through the
//! union engine.

use std::sync::LazyLock;

use regex::Regex;

use crate::directive::Directive;
use crate::error::AssembleError;
use crate::processor::{Processor, RunContext};

/// Matches a guarded hex escape in the engine's response: `_x_\\xhh_x_`.
static GUARD_RECOVERY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"_x_\\(\\x[0-9a-f]{2})_x_").unwrap());

/// Processor for `##!> assemble` blocks (and the base of the outermost
/// finalize processor).
///
/// Plain lines are collected as pending fragments. A store marker flushes
/// the fragments and saves the accumulated expression in the run stash; a
/// recall marker appends a previously stored expression verbatim. On
/// [`complete`](Processor::complete) the remaining fragments are unioned
/// and combined with the accumulated output into at most one line.
#[derive(Debug)]
pub struct Assemble {
    pending: Vec<String>,
    output: String,
}

impl Assemble {
    /// Create an empty processor.
    #[must_use]
    pub fn new() -> Self {
        Self {
            pending: Vec::new(),
            output: String::new(),
        }
    }

    /// Force all pending fragments through the union engine.
    ///
    /// Returns the raw minimized union with guarded escapes recovered, or an
    /// empty string when nothing is pending.
    fn run_union(&mut self, ctx: &mut RunContext<'_>) -> Result<String, AssembleError> {
        if self.pending.is_empty() {
            return Ok(String::new());
        }
        let inputs: Vec<String> = self
            .pending
            .drain(..)
            .map(|line| guard_hex_escapes(&line))
            .collect();
        tracing::debug!(fragments = inputs.len(), "running union engine");
        let result = ctx.engine.union(&inputs)?;
        Ok(recover_guarded_escapes(&result))
    }

    /// Run one already-assembled expression through the engine, bypassing
    /// the single-fragment shortcut, so redundant nested groups collapse.
    pub(crate) fn union_whole(
        &mut self,
        ctx: &mut RunContext<'_>,
        expr: String,
    ) -> Result<String, AssembleError> {
        self.pending.push(expr);
        self.run_union(ctx)
    }

    /// Append-flush: move pending fragments into the output accumulator.
    ///
    /// A single pending fragment is appended verbatim: it may be a partial
    /// construct (the start of a group or a range) that the engine cannot
    /// parse on its own. Multiple fragments are unioned and wrapped in a
    /// non-capturing group.
    fn flush(&mut self, ctx: &mut RunContext<'_>) -> Result<(), AssembleError> {
        match self.pending.len() {
            0 => {}
            1 => {
                if let Some(line) = self.pending.pop() {
                    self.output.push_str(&line);
                }
            }
            _ => {
                let unioned = self.run_union(ctx)?;
                self.output.push_str("(?:");
                self.output.push_str(&unioned);
                self.output.push(')');
            }
        }
        Ok(())
    }

    /// Flush pending fragments, then save the accumulated expression in the
    /// stash under `identifier`.
    fn store(&mut self, ctx: &mut RunContext<'_>, identifier: &str) -> Result<(), AssembleError> {
        if identifier.is_empty() {
            return Err(AssembleError::MissingIdentifier);
        }
        self.flush(ctx)?;
        tracing::debug!(identifier, expression = %self.output, "storing expression");
        ctx.stash.insert(identifier.to_owned(), self.output.clone());
        // The stored value must not leak into this block's own result.
        self.output.clear();
        Ok(())
    }

    /// Append a stored expression, or flush when the identifier is empty.
    fn recall(&mut self, ctx: &mut RunContext<'_>, identifier: &str) -> Result<(), AssembleError> {
        if identifier.is_empty() {
            return self.flush(ctx);
        }
        let stored = ctx
            .stash
            .get(identifier)
            .ok_or_else(|| AssembleError::UnknownIdentifier(identifier.to_owned()))?;
        tracing::debug!(identifier, "appending stored expression");
        self.output.push_str(stored);
        Ok(())
    }
}

impl Default for Assemble {
    fn default() -> Self {
        Self::new()
    }
}

impl Processor for Assemble {
    fn process_line(
        &mut self,
        ctx: &mut RunContext<'_>,
        line: &str,
    ) -> Result<(), AssembleError> {
        match Directive::parse(line) {
            Directive::Store(identifier) => self.store(ctx, identifier),
            Directive::Recall(identifier) => self.recall(ctx, identifier),
            _ => {
                self.pending.push(line.to_owned());
                Ok(())
            }
        }
    }

    fn complete(&mut self, ctx: &mut RunContext<'_>) -> Result<Option<String>, AssembleError> {
        // Same single-vs-multi rule as flush, but the multi branch stays
        // unwrapped here; the combine step below adds the group.
        let unioned = match self.pending.len() {
            1 => self.pending.pop().unwrap_or_default(),
            _ => self.run_union(ctx)?,
        };
        let result = wrap_completed(&self.output, &unioned);
        tracing::debug!(result = %result, "completed assembly");
        self.output.clear();
        Ok((!result.is_empty()).then_some(result))
    }
}

/// Combine the accumulated output and the final union into the block result.
fn wrap_completed(output: &str, unioned: &str) -> String {
    match (output.is_empty(), unioned.is_empty()) {
        (true, true) => String::new(),
        (false, false) => format!("(?:{output}(?:{unioned}))"),
        (false, true) => format!("(?:{output})"),
        (true, false) => format!("(?:{unioned})"),
    }
}

/// Wrap hex escapes outside character classes in literal-quoting markers.
///
/// The engine has no "treat as literal" mode: an unguarded `\xhh` would be
/// decoded to its byte value and reprinted in whatever spelling the engine
/// prefers. Quoting it as `\Q_x_\xhh_x_\E` survives the round trip, and the
/// `_x_` markers let the response be rewritten back to the original escape.
/// Escapes inside a bracketed class are already treated literally there and
/// must not be quoted.
pub(crate) fn guard_hex_escapes(input: &str) -> String {
    let mut out = String::with_capacity(input.len() + 16);
    let mut chars = input.char_indices().peekable();
    let mut in_class = false;
    while let Some((i, c)) = chars.next() {
        match c {
            '\\' => {
                let Some(&(_, next)) = chars.peek() else {
                    out.push('\\');
                    continue;
                };
                if !in_class && next == 'x' && is_hex_escape_at(input, i) {
                    out.push_str(r"\Q_x_");
                    out.push_str(&input[i..i + 4]);
                    out.push_str(r"_x_\E");
                    chars.next();
                    chars.next();
                    chars.next();
                } else {
                    out.push('\\');
                    out.push(next);
                    chars.next();
                }
            }
            '[' => {
                in_class = true;
                out.push(c);
            }
            ']' => {
                in_class = false;
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    out
}

/// Strip the guard markers from the engine's response, restoring `\xhh`.
///
/// The markers are required: without them an intended literal double
/// backslash in the response would be indistinguishable from the backslash
/// the engine adds in front of a quoted escape.
pub(crate) fn recover_guarded_escapes(input: &str) -> String {
    GUARD_RECOVERY.replace_all(input, "$1").into_owned()
}

/// Whether `input[backslash..]` starts a two-digit lowercase hex escape.
fn is_hex_escape_at(input: &str, backslash: usize) -> bool {
    let bytes = input.as_bytes();
    backslash + 3 < bytes.len()
        && bytes[backslash + 1] == b'x'
        && is_lower_hex(bytes[backslash + 2])
        && is_lower_hex(bytes[backslash + 3])
}

fn is_lower_hex(byte: u8) -> bool {
    matches!(byte, b'0'..=b'9' | b'a'..=b'f')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FailingEngine, ScriptedEngine};
    use pretty_assertions::assert_eq;

    fn complete(engine: &ScriptedEngine, lines: &[&str]) -> Option<String> {
        let mut ctx = RunContext::new(engine);
        let mut processor = Assemble::new();
        for line in lines {
            processor.process_line(&mut ctx, line).unwrap();
        }
        processor.complete(&mut ctx).unwrap()
    }

    #[test]
    fn empty_block_produces_no_line() {
        let engine = ScriptedEngine::new();
        assert_eq!(complete(&engine, &[]), None);
        assert!(engine.calls().is_empty());
    }

    #[test]
    fn single_fragment_is_never_sent_to_the_engine() {
        let engine = ScriptedEngine::new();
        assert_eq!(complete(&engine, &["[a-"]), Some("(?:[a-)".to_owned()));
        assert!(engine.calls().is_empty());
    }

    #[test]
    fn multiple_fragments_are_unioned_and_wrapped() {
        let engine = ScriptedEngine::new();
        assert_eq!(complete(&engine, &["a", "b"]), Some("(?:a|b)".to_owned()));
        assert_eq!(engine.calls(), vec![vec!["a".to_owned(), "b".to_owned()]]);
    }

    #[test]
    fn store_then_recall_round_trips_exactly() {
        let engine = ScriptedEngine::new();
        let mut ctx = RunContext::new(&engine);

        let mut first = Assemble::new();
        first.process_line(&mut ctx, "slash.es").unwrap();
        first.process_line(&mut ctx, "##!=< stored").unwrap();
        assert_eq!(first.complete(&mut ctx).unwrap(), None);
        assert_eq!(ctx.stash.get("stored").map(String::as_str), Some("slash.es"));

        let mut second = Assemble::new();
        second.process_line(&mut ctx, "##!=> stored").unwrap();
        assert_eq!(
            second.complete(&mut ctx).unwrap(),
            Some("(?:slash.es)".to_owned())
        );
    }

    #[test]
    fn store_flushes_multiple_pending_fragments_first() {
        let engine = ScriptedEngine::new();
        let mut ctx = RunContext::new(&engine);
        let mut processor = Assemble::new();
        processor.process_line(&mut ctx, "a").unwrap();
        processor.process_line(&mut ctx, "b").unwrap();
        processor.process_line(&mut ctx, "##!=< ab").unwrap();
        assert_eq!(ctx.stash.get("ab").map(String::as_str), Some("(?:a|b)"));
        // The stored value must not reappear in the block's own result.
        assert_eq!(processor.complete(&mut ctx).unwrap(), None);
    }

    #[test]
    fn store_without_identifier_faults() {
        let engine = ScriptedEngine::new();
        let mut ctx = RunContext::new(&engine);
        let mut processor = Assemble::new();
        let err = processor.process_line(&mut ctx, "##!=<").unwrap_err();
        assert!(matches!(err, AssembleError::MissingIdentifier));
    }

    #[test]
    fn recall_of_unknown_identifier_faults() {
        let engine = ScriptedEngine::new();
        let mut ctx = RunContext::new(&engine);
        let mut processor = Assemble::new();
        let err = processor.process_line(&mut ctx, "##!=> nope").unwrap_err();
        assert!(matches!(err, AssembleError::UnknownIdentifier(name) if name == "nope"));
    }

    #[test]
    fn recall_without_identifier_flushes_pending_fragments() {
        let engine = ScriptedEngine::new();
        let mut ctx = RunContext::new(&engine);
        let mut processor = Assemble::new();
        processor.process_line(&mut ctx, "a").unwrap();
        processor.process_line(&mut ctx, "b").unwrap();
        processor.process_line(&mut ctx, "##!=>").unwrap();
        processor.process_line(&mut ctx, "c").unwrap();
        assert_eq!(
            processor.complete(&mut ctx).unwrap(),
            Some("(?:(?:a|b)(?:c))".to_owned())
        );
    }

    #[test]
    fn engine_failure_propagates() {
        let engine = FailingEngine;
        let mut ctx = RunContext::new(&engine);
        let mut processor = Assemble::new();
        processor.process_line(&mut ctx, "a").unwrap();
        processor.process_line(&mut ctx, "b").unwrap();
        let err = processor.complete(&mut ctx).unwrap_err();
        assert!(matches!(err, AssembleError::Engine(_)));
    }

    #[test]
    fn guard_wraps_bare_hex_escapes() {
        assert_eq!(
            guard_hex_escapes(r"a\x5cb"),
            r"a\Q_x_\x5c_x_\Eb"
        );
        assert_eq!(
            guard_hex_escapes(r"\x48\xe2"),
            r"\Q_x_\x48_x_\E\Q_x_\xe2_x_\E"
        );
    }

    #[test]
    fn guard_skips_escapes_inside_character_classes() {
        assert_eq!(guard_hex_escapes(r"[\x5c']*"), r"[\x5c']*");
        assert_eq!(
            guard_hex_escapes(r"[\x41]\x42[\x43]"),
            r"[\x41]\Q_x_\x42_x_\E[\x43]"
        );
    }

    #[test]
    fn guard_skips_escaped_backslash_before_x() {
        // `\\x48` is a literal backslash followed by plain text, not an escape.
        assert_eq!(guard_hex_escapes(r"a\\x48b"), r"a\\x48b");
    }

    #[test]
    fn guard_requires_two_lowercase_hex_digits() {
        assert_eq!(guard_hex_escapes(r"\x5"), r"\x5");
        assert_eq!(guard_hex_escapes(r"\x5C"), r"\x5C");
        assert_eq!(guard_hex_escapes(r"\xgg"), r"\xgg");
    }

    #[test]
    fn recovery_strips_the_added_backslash() {
        assert_eq!(recover_guarded_escapes(r"_x_\\x5c_x_"), r"\x5c");
        assert_eq!(
            recover_guarded_escapes(r"a_x_\\x48_x_b_x_\\xe2_x_c"),
            r"a\x48b\xe2c"
        );
    }

    #[test]
    fn recovery_leaves_plain_double_backslashes_alone() {
        assert_eq!(recover_guarded_escapes(r"a\\b"), r"a\\b");
    }

    #[test]
    fn guard_recover_round_trips_every_hex_pair() {
        for digits in ["00", "1f", "a0", "ff", "5c", "48"] {
            let escape = format!(r"\x{digits}");
            let guarded = guard_hex_escapes(&escape);
            assert_eq!(guarded, format!(r"\Q_x_{escape}_x_\E"));
            // Simulate the engine unquoting the marker and re-escaping the
            // literal backslash.
            let response = format!(r"_x_\{escape}_x_");
            assert_eq!(recover_guarded_escapes(&response), escape);
        }
    }
}
