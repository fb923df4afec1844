//! AndroidManifest.xml permission declarations.
//!
//! The permission identifier itself is the idempotence signal; the comment
//! above the block only identifies where the declarations came from.

use super::locator::{find_xml_open_tag, line_end_inclusive};
use super::markers::MANIFEST_BLOCK_COMMENT;
use super::templates::{manifest_comment, manifest_permission, manifest_queries};
use super::TextPatch;
use crate::error::{PatchError, PatchResult};

/// Add missing `<uses-permission>` lines and `<queries>` intent actions
/// directly after the root `<manifest>` tag.
pub fn patch_manifest(text: &str, permissions: &[String], query_actions: &[String]) -> PatchResult<TextPatch> {
    let mut patch = TextPatch::unchanged(text);

    let missing_permissions: Vec<&String> = permissions.iter().filter(|p| !text.contains(p.as_str())).collect();
    let missing_actions: Vec<&String> = query_actions.iter().filter(|a| !text.contains(a.as_str())).collect();
    if missing_permissions.is_empty() && missing_actions.is_empty() {
        return Ok(patch);
    }

    let tag = find_xml_open_tag(text, "manifest")
        .ok_or_else(|| PatchError::LocatorMiss("<manifest> root tag not found".to_string()))?;
    let indent = child_indent(text, tag.end);

    let mut block = String::new();
    let comment = format!("<!-- {} -->", MANIFEST_BLOCK_COMMENT);
    let comment_at = text.find(&comment);
    if comment_at.is_none() {
        block.push_str(&manifest_comment(&indent));
    }
    for permission in &missing_permissions {
        block.push_str(&manifest_permission(permission, &indent));
        patch.note(format!("added permission {}", permission));
    }
    for action in &missing_actions {
        block.push_str(&manifest_queries(action, &indent));
        patch.note(format!("added queries entry for {}", action));
    }

    // Existing block: append under its comment. Otherwise right after the tag.
    let anchor = comment_at.map(|at| at + comment.len()).unwrap_or(tag.end);
    let line_end = line_end_inclusive(text, anchor);
    let rest = &text[anchor..line_end];
    if rest.trim().is_empty() && rest.ends_with('\n') {
        patch.text.insert_str(line_end, &block);
    } else {
        patch.text.insert_str(anchor, &format!("\n{}", block));
    }

    Ok(patch)
}

/// Indent of the first child line after the root tag
fn child_indent(text: &str, after: usize) -> String {
    text[after..]
        .lines()
        .skip(1)
        .find(|l| !l.trim().is_empty())
        .map(|l| l[..l.len() - l.trim_start().len()].to_string())
        .filter(|indent| !indent.is_empty())
        .unwrap_or_else(|| "    ".to_string())
}
