//! Frontmatter analysis: split the fenced script into its module-scope and
//! render-scope segments and pull out the `getStaticPaths` export.

use crate::js_scanner::{find_get_static_paths, scan_imports};
use crate::TransformContext;
use astro_parser::{Document, NodeKind};
use std::ops::Range;
use tracing::debug;

pub fn analyze_frontmatter(doc: &Document, ctx: &mut TransformContext) {
    let fm = match doc.find(Document::ROOT, |n| n.kind == NodeKind::Frontmatter) {
        Some(id) => id,
        None => return,
    };
    let text = doc.node(fm).data.clone();
    let base = doc.node(fm).span.start;

    ctx.imports = scan_imports(&text);

    let gsp = find_get_static_paths(&text);
    if let Some(range) = &gsp {
        ctx.get_static_paths = Some(text[range.clone()].trim().to_string());
        ctx.get_static_paths_offset = Some(base + range.start);
        debug!(start = range.start, "hoisted getStaticPaths out of frontmatter");
    }

    // module-scope segment: imports with their attached comments, in order
    let mut removed: Vec<Range<usize>> = ctx.imports.iter().map(|i| i.full_span.clone()).collect();
    let module_chunks: Vec<&str> = removed.iter().map(|r| text[r.clone()].trim_end()).collect();
    ctx.frontmatter_module = module_chunks.join("\n");
    ctx.frontmatter_module_offset = ctx.imports.first().map(|i| base + i.full_span.start);

    // render-scope segment: whatever is left
    if let Some(range) = gsp {
        removed.push(range);
    }
    removed.sort_by_key(|r| r.start);
    let mut render = String::new();
    let mut render_offset = None;
    let mut cursor = 0usize;
    for range in &removed {
        if range.start > cursor {
            push_remainder(&text[cursor..range.start], cursor, base, &mut render, &mut render_offset);
        }
        cursor = cursor.max(range.end);
    }
    if cursor < text.len() {
        push_remainder(&text[cursor..], cursor, base, &mut render, &mut render_offset);
    }
    ctx.frontmatter_render = render.trim().to_string();
    ctx.frontmatter_render_offset = render_offset;
}

fn push_remainder(
    piece: &str,
    piece_offset: usize,
    base: usize,
    render: &mut String,
    render_offset: &mut Option<usize>,
) {
    if render_offset.is_none() && !piece.trim().is_empty() {
        let leading_ws = piece.len() - piece.trim_start().len();
        *render_offset = Some(base + piece_offset + leading_ws);
    }
    render.push_str(piece);
}
