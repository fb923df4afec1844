//! Main activity patching: bridge injection into the generated Kotlin source.
//!
//! Order of operations on one file:
//! 1. Retire the immersive-mode feature if its marker is present
//! 2. Locate the activity class, synthesizing `{ }` for the single-line form
//! 3. Per bridge: hook the existing callback or queue a fresh override, then
//!    queue the core block unless its marker is present
//! 4. Splice the queued blocks before the class's closing brace
//! 5. Annotate entry points that lack `@Keep`
//! 6. Refuse the result if it unbalanced a balanced input

use once_cell::sync::Lazy;
use regex::Regex;

use super::locator::{
    body_indent, find_class_declaration, find_method_declaration, has_method, line_end_inclusive,
    line_start, parameter_names, BlockBoundaryLocator,
};
use super::markers::{marker_for, Capability, MarkerRole, IMMERSIVE_RETIRED};
use super::templates::{
    core_block, fresh_override, hook_marker, hook_method, hook_snippet, indent_block,
    ENTRY_POINTS, KEEP_ANNOTATION,
};
use super::TextPatch;
use crate::error::{PatchError, PatchResult};

const RETIRED_METHOD: &str = "enableImmersiveMode";
const RETIRED_CALL: &str = "enableImmersiveMode(";

/// Whole-line call sites of the retired method, including `if (x) call()`
static IMMERSIVE_CALL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?m)^[ \t]*(?:if[ \t]*\([^\n]*\)[ \t]*)?(?:this\.)?enableImmersiveMode\(\)[ \t]*;?[ \t]*(?://[^\n]*)?(?:\r?\n|$)",
    )
    .expect("Invalid immersive call-site regex")
});

static IMMERSIVE_MARKER_LINE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?m)^[^\n]*{}[^\n]*(?:\r?\n|$)",
        regex::escape(IMMERSIVE_RETIRED.text)
    ))
    .expect("Invalid immersive marker regex")
});

static BLANK_RUN_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\n[ \t]*\n([ \t]*\n)+").expect("Invalid blank run regex")
});

/// Per-file activity patch options.
pub struct ActivityOptions<'a> {
    /// `None` picks the first class extending an `...Activity()`
    pub class_name: Option<&'a str>,
    pub bridges: &'a [Capability],
    pub locator: &'a dyn BlockBoundaryLocator,
}

/// Apply every enabled bridge to one activity source file.
pub fn patch_activity(text: &str, opts: &ActivityOptions<'_>) -> PatchResult<TextPatch> {
    let locator = opts.locator;
    let was_balanced = locator.is_balanced(text);
    let mut patch = TextPatch::unchanged(text);

    retire_immersive_mode(&mut patch, locator);

    let class = find_class_declaration(&patch.text, opts.class_name).ok_or_else(|| {
        PatchError::LocatorMiss(format!(
            "activity class {} not found",
            opts.class_name.unwrap_or("<*Activity subclass>")
        ))
    })?;

    if class.open_brace.is_none() {
        let body = format!(" {{\n{}}}", class.indent);
        patch.text.insert_str(class.header_end, &body);
        patch.note(format!("synthesized body for single-line class {}", class.name));
    }

    let mut batch: Vec<String> = Vec::new();
    let member_indent = class_member_indent(&patch.text, opts.class_name, locator)?;

    for &capability in opts.bridges {
        match inject_hook(&mut patch, capability, locator) {
            HookPlan::Skip => continue,
            HookPlan::Done => {}
            HookPlan::FreshOverride => {
                if let Some(text) = fresh_override(capability) {
                    batch.push(indent_block(&text, &member_indent));
                    patch.note(format!(
                        "{}: synthesized {} override",
                        capability.tag(),
                        hook_method(capability).unwrap_or("callback")
                    ));
                }
            }
        }

        let core_present = marker_for(capability, MarkerRole::Core)
            .map(|m| m.is_present(&patch.text))
            .unwrap_or(true);
        if !core_present {
            if let Some(block) = core_block(capability) {
                batch.push(indent_block(&block, &member_indent));
                patch.note(format!("{}: injected core block", capability.tag()));
            }
        }
    }

    if !batch.is_empty() {
        splice_before_class_end(&mut patch.text, opts.class_name, &batch, locator)?;
    }

    annotate_entry_points(&mut patch);

    if was_balanced && !locator.is_balanced(&patch.text) {
        return Err(PatchError::ValidationFailed(format!(
            "braces unbalanced after patching (locator: {})",
            locator.name()
        )));
    }

    Ok(patch)
}

enum HookPlan {
    /// Hook present or just injected
    Done,
    /// No callback yet; queue a full override
    FreshOverride,
    /// Callback exists but cannot be hooked; leave the capability alone
    Skip,
}

fn inject_hook(patch: &mut TextPatch, capability: Capability, locator: &dyn BlockBoundaryLocator) -> HookPlan {
    let (marker, method) = match (hook_marker(capability), hook_method(capability)) {
        (Some(marker), Some(method)) => (marker, method),
        _ => return HookPlan::Skip,
    };
    if marker.is_present(&patch.text) {
        return HookPlan::Done;
    }

    let decl = match find_method_declaration(&patch.text, method) {
        Some(decl) => decl,
        None if has_method(&patch.text, method) => {
            let msg = format!(
                "{}: {} exists without a block body, capability skipped",
                capability.tag(),
                method
            );
            log::warn!("[Patcher] [ACTIVITY] {}", msg);
            patch.note(msg);
            return HookPlan::Skip;
        }
        None => return HookPlan::FreshOverride,
    };

    let close = match locator.find_block_end(&patch.text, decl.open_brace) {
        Some(close) => close,
        None => {
            let msg = format!("{}: body of {} not balanced, capability skipped", capability.tag(), method);
            log::warn!("[Patcher] [ACTIVITY] {}", msg);
            patch.note(msg);
            return HookPlan::Skip;
        }
    };

    let indent = body_indent(&patch.text, decl.open_brace, close)
        .unwrap_or_else(|| format!("{}    ", decl.indent));
    let params = parameter_names(&decl.params);
    let snippet = match hook_snippet(capability, &params, &indent) {
        Some(snippet) => snippet,
        None => {
            let msg = format!(
                "{}: {} parameters ({}) do not fit the dispatch hook, capability skipped",
                capability.tag(),
                method,
                decl.params.trim()
            );
            log::warn!("[Patcher] [ACTIVITY] {}", msg);
            patch.note(msg);
            return HookPlan::Skip;
        }
    };

    let insert_at = decl.open_brace + 1;
    let rest_of_line = &patch.text[insert_at..line_end_inclusive(&patch.text, insert_at)];
    if rest_of_line.trim().is_empty() {
        let insertion = format!("\n{}", snippet.trim_end_matches('\n'));
        patch.text.insert_str(insert_at, &insertion);
    } else {
        // `{ body }` on one line: move the trailing code to its own line
        let leading = rest_of_line.len() - rest_of_line.trim_start().len();
        let insertion = format!("\n{}{}", snippet, indent);
        patch.text.replace_range(insert_at..insert_at + leading, &insertion);
    }
    patch.note(format!("{}: hooked existing {}", capability.tag(), method));
    log::info!("[Patcher] [ACTIVITY] {}: hooked existing {}", capability.tag(), method);
    HookPlan::Done
}

/// Indent used by the class's members
fn class_member_indent(
    text: &str,
    class_name: Option<&str>,
    locator: &dyn BlockBoundaryLocator,
) -> PatchResult<String> {
    let (open, close, class_indent) = class_body(text, class_name, locator)?;
    Ok(body_indent(text, open, close).unwrap_or_else(|| format!("{}    ", class_indent)))
}

/// `(open brace, close brace, class indent)` of the activity class
fn class_body(
    text: &str,
    class_name: Option<&str>,
    locator: &dyn BlockBoundaryLocator,
) -> PatchResult<(usize, usize, String)> {
    let class = find_class_declaration(text, class_name)
        .ok_or_else(|| PatchError::LocatorMiss("activity class vanished while patching".to_string()))?;
    let open = class
        .open_brace
        .ok_or_else(|| PatchError::LocatorMiss(format!("class {} has no body", class.name)))?;
    let close = locator
        .find_block_end(text, open)
        .or_else(|| locator.last_top_level_close(text).filter(|c| *c > open))
        .ok_or_else(|| PatchError::LocatorMiss(format!("end of class {} not found", class.name)))?;
    Ok((open, close, class.indent))
}

fn splice_before_class_end(
    text: &mut String,
    class_name: Option<&str>,
    batch: &[String],
    locator: &dyn BlockBoundaryLocator,
) -> PatchResult<()> {
    let (open, close, class_indent) = class_body(text, class_name, locator)?;
    let blocks = batch.join("\n");
    let close_line = line_start(text, close);

    if close_line > open && text[close_line..close].trim().is_empty() {
        let before = &text[..close_line];
        let body_is_empty = text[open + 1..close_line].trim().is_empty();
        let separator = if body_is_empty || before.ends_with("\n\n") { "" } else { "\n" };
        text.insert_str(close_line, &format!("{}{}", separator, blocks));
    } else {
        // Closing brace shares its line with other code
        text.insert_str(close, &format!("\n{}{}", blocks, class_indent));
    }
    Ok(())
}

fn retire_immersive_mode(patch: &mut TextPatch, locator: &dyn BlockBoundaryLocator) {
    if !IMMERSIVE_RETIRED.is_present(&patch.text) {
        return;
    }

    let calls = IMMERSIVE_CALL_REGEX.find_iter(&patch.text).count();
    if calls > 0 {
        patch.text = IMMERSIVE_CALL_REGEX.replace_all(&patch.text, "").into_owned();
    }

    let mut removed_definition = false;
    if let Some(decl) = find_method_declaration(&patch.text, RETIRED_METHOD) {
        match locator.find_block_end(&patch.text, decl.open_brace) {
            Some(close) => {
                let start = annotations_start(&patch.text, decl.start);
                let end = line_end_inclusive(&patch.text, close);
                let remaining = format!("{}{}", &patch.text[..start], &patch.text[end..]);
                if remaining.contains(RETIRED_CALL) {
                    let msg = format!(
                        "IMMERSIVE: {} still called outside a whole-line statement, definition left in place",
                        RETIRED_METHOD
                    );
                    log::warn!("[Patcher] [ACTIVITY] {}", msg);
                    patch.note(msg);
                } else {
                    patch.text = remaining;
                    removed_definition = true;
                }
            }
            None => {
                let msg = format!("IMMERSIVE: {} body not balanced, definition left in place", RETIRED_METHOD);
                log::warn!("[Patcher] [ACTIVITY] {}", msg);
                patch.note(msg);
            }
        }
    }

    if removed_definition || !has_method(&patch.text, RETIRED_METHOD) {
        patch.text = IMMERSIVE_MARKER_LINE_REGEX.replace_all(&patch.text, "").into_owned();
        patch.text = BLANK_RUN_REGEX.replace_all(&patch.text, "\n\n").into_owned();
    }

    patch.note(format!(
        "IMMERSIVE: removed {} call site(s){}",
        calls,
        if removed_definition { " and definition" } else { "" }
    ));
    log::info!("[Patcher] [ACTIVITY] retired immersive mode ({} call sites)", calls);
}

/// Add `@androidx.annotation.Keep` above entry points that lack it
fn annotate_entry_points(patch: &mut TextPatch) {
    let mut inserts: Vec<(usize, String, &str)> = Vec::new();

    for (_, name) in ENTRY_POINTS {
        let pattern = format!(
            r"(?m)^([ \t]*)(?:(?:public|internal|open|final|override)[ \t]+)*fun[ \t]+{}[ \t]*\(",
            regex::escape(name)
        );
        let regex = match Regex::new(&pattern) {
            Ok(regex) => regex,
            Err(_) => continue,
        };
        for caps in regex.captures_iter(&patch.text) {
            let (whole, indent) = match (caps.get(0), caps.get(1)) {
                (Some(whole), Some(indent)) => (whole, indent.as_str()),
                _ => continue,
            };
            if !has_keep_annotation(&patch.text, whole.start()) {
                inserts.push((whole.start(), format!("{}{}\n", indent, KEEP_ANNOTATION), name));
            }
        }
    }

    inserts.sort_by(|a, b| b.0.cmp(&a.0));
    for (at, line, name) in inserts {
        patch.text.insert_str(at, &line);
        patch.note(format!("KEEP: annotated {}", name));
    }
}

/// Start of the contiguous `@...` lines directly above `decl_start`
fn annotations_start(text: &str, decl_start: usize) -> usize {
    let mut start = decl_start;
    while start > 0 {
        let prev = line_start(text, start - 1);
        if !text[prev..start].trim().starts_with('@') {
            break;
        }
        start = prev;
    }
    start
}

/// Whether the annotation lines directly above `decl_start` include `@Keep`
fn has_keep_annotation(text: &str, decl_start: usize) -> bool {
    let start = annotations_start(text, decl_start);
    text[start..decl_start].lines().any(|line| is_keep(line.trim()))
}

fn is_keep(line: &str) -> bool {
    line.split_whitespace()
        .any(|tok| tok == "@Keep" || tok == KEEP_ANNOTATION || tok.starts_with("@Keep(") || tok.starts_with("@androidx.annotation.Keep("))
}
