//! Paints a laid-out [`Dom`] into a [`FrameBuffer`].
//!
//! Pre-order walk carrying each node's absolute origin. Boxes fill their
//! background and draw their border; text nodes wrap (or truncate) into
//! their own box. Nodes without a background inherit the nearest
//! ancestor's, so text drawn over a filled box keeps its color.

use weft_term::buffer::{CellStyle, ClipRect, FrameBuffer};
use weft_term::color::{CellColor, Rgb};

use crate::node::{Node, NodeId, NodeKind};
use crate::style::{Display, WrapMode};
use crate::text::{truncate, wrap_text};
use crate::tree::Dom;

const ELLIPSIS: &str = "…";

/// Paint `root` and its subtree using the boxes from the last
/// [`Dom::compute_layout`].
pub fn render_tree(dom: &Dom, root: NodeId, buf: &mut FrameBuffer) {
    let mut stack = vec![(root, 0.0_f32, 0.0_f32, None::<Rgb>)];

    while let Some((id, origin_x, origin_y, inherited_bg)) = stack.pop() {
        let Some(node) = dom.get(id) else {
            continue;
        };
        if node.layout_style.display == Display::None {
            continue;
        }

        let x = origin_x + node.computed.x;
        let y = origin_y + node.computed.y;
        let rect = ClipRect::new(cell(x), cell(y), span(node.computed.width), span(node.computed.height));
        let bg = node.style.bg.or(inherited_bg);

        match node.kind {
            NodeKind::Box => paint_box(node, rect, bg, buf),
            NodeKind::Text => paint_text(node, rect, bg, buf),
            NodeKind::Static | NodeKind::Newline | NodeKind::Spacer => {}
        }

        for &child in node.children.iter().rev() {
            stack.push((child, x, y, bg));
        }
    }
}

fn paint_box(node: &Node, rect: ClipRect, bg: Option<Rgb>, buf: &mut FrameBuffer) {
    if node.style.bg.is_some() {
        let fill = CellStyle::new(CellColor::Default, bg.into(), node.style.attrs);
        buf.fill_rect(rect, fill, None);
    }

    let Some(chars) = node.border.style.chars() else {
        return;
    };
    if rect.width < 2 || rect.height < 2 {
        return;
    }

    let [top, right, bottom, left] = node.border.edge_colors().map(|c| {
        CellStyle::new(c.or(node.style.fg).into(), bg.into(), node.style.attrs)
    });
    let (x0, y0) = (rect.x, rect.y);
    let (x1, y1) = (rect.right() - 1, rect.bottom() - 1);

    for x in x0 + 1..x1 {
        buf.set_cell(x, y0, chars.horizontal, top, None);
        buf.set_cell(x, y1, chars.horizontal, bottom, None);
    }
    for y in y0 + 1..y1 {
        buf.set_cell(x0, y, chars.vertical, left, None);
        buf.set_cell(x1, y, chars.vertical, right, None);
    }
    buf.set_cell(x0, y0, chars.top_left, top, None);
    buf.set_cell(x1, y0, chars.top_right, top, None);
    buf.set_cell(x0, y1, chars.bottom_left, bottom, None);
    buf.set_cell(x1, y1, chars.bottom_right, bottom, None);
}

fn paint_text(node: &Node, rect: ClipRect, bg: Option<Rgb>, buf: &mut FrameBuffer) {
    let Some(content) = node.text.as_deref() else {
        return;
    };
    if rect.is_empty() {
        return;
    }

    let mut style = CellStyle::new(node.style.fg.into(), bg.into(), node.style.attrs);
    if let Some(link) = &node.link {
        style = style.with_link(buf.intern_link(&link.url, link.id.as_deref()));
    }

    let width = usize::from(rect.width);
    let lines = if node.wrap == WrapMode::None {
        content.split('\n').map(|line| truncate(line, width, ELLIPSIS)).collect()
    } else {
        wrap_text(content, width, node.wrap)
    };

    for (row, line) in (rect.y..rect.bottom()).zip(&lines) {
        buf.write_text(rect.x, row, line, style, Some(&rect));
    }
}

// Layout output is a small cell count; rounding keeps adjacent boxes flush.
#[allow(clippy::cast_possible_truncation)]
fn cell(v: f32) -> i32 {
    v.round() as i32
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn span(v: f32) -> u16 {
    v.round().clamp(0.0, f32::from(u16::MAX)) as u16
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
