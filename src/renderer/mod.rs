//! Terminal presentation surface.
//!
//! Draws one `RenderContext` onto the terminal: menu bar, the active scene
//! reference, the dialogue lines, and a status bar. It is stateless and never
//! writes back into the context; layout is a pure function of the context and
//! the terminal size.

use std::io::{self, Write};

use crossterm::{cursor, queue, style, terminal};

use crate::config::KeyBindings;
use crate::menubar::{menu_items, print_menu_item};
use crate::types::RenderContext;

/// Rows reserved above the text block: menu bar, scene line, spacer.
const TEXT_OFFSET: u16 = 3;

pub struct Renderer;

impl Renderer {
    /// Redraw the whole screen.
    pub fn draw(
        out: &mut impl Write,
        ctx: &RenderContext,
        bindings: &KeyBindings,
        status: &str,
        (width, height): (u16, u16),
    ) -> io::Result<()> {
        queue!(out, terminal::Clear(terminal::ClearType::All))?;
        Self::draw_menubar(out, bindings)?;

        let mut scene = style::ContentStyle::default();
        scene.attributes.set(style::Attribute::Bold);
        queue!(
            out,
            cursor::MoveTo(0, 1),
            style::PrintStyledContent(style::StyledContent::new(scene, scene_line(ctx))),
        )?;

        let rows = height.saturating_sub(TEXT_OFFSET + 1) as usize;
        for (y, line) in Self::layout_text(ctx, width as usize, rows).iter().enumerate() {
            queue!(out, cursor::MoveTo(0, y as u16 + TEXT_OFFSET), style::Print(line))?;
        }

        let mut dim = style::ContentStyle::default();
        dim.attributes.set(style::Attribute::Dim);
        queue!(
            out,
            cursor::MoveTo(0, height.saturating_sub(1)),
            style::PrintStyledContent(style::StyledContent::new(dim, format!(" {status} "))),
        )?;
        out.flush()
    }

    fn draw_menubar(out: &mut impl Write, bindings: &KeyBindings) -> io::Result<()> {
        queue!(out, cursor::MoveTo(0, 0), style::Print(" "))?;
        for (i, item) in menu_items(bindings).iter().enumerate() {
            if i > 0 {
                queue!(out, style::Print("  "))?;
            }
            print_menu_item(out, item)?;
        }
        Ok(())
    }

    /// Wrap the dialogue into at most `rows` rows of `width` columns.
    ///
    /// Paragraphs are separated by a blank row. When the text does not fit,
    /// the newest rows are kept.
    pub fn layout_text(ctx: &RenderContext, width: usize, rows: usize) -> Vec<String> {
        let mut lines = Vec::new();
        for (i, paragraph) in ctx.text.iter().enumerate() {
            if i > 0 {
                lines.push(String::new());
            }
            lines.extend(wrap_line(paragraph, width.max(1)));
        }
        let skip = lines.len().saturating_sub(rows);
        lines.split_off(skip)
    }
}

fn scene_line(ctx: &RenderContext) -> String {
    match ctx.background() {
        Some(bg) => format!("▣ {bg}"),
        None => "▣ (no scene)".to_string(),
    }
}

/// Word-wrap one paragraph. Breaks at spaces, consuming the space; a word
/// longer than the width is hard-broken.
fn wrap_line(line: &str, w: usize) -> Vec<String> {
    let chars: Vec<char> = line.trim_end().chars().collect();
    if chars.is_empty() {
        return vec![String::new()];
    }

    let mut rows = Vec::new();
    let mut pos = 0usize;
    while pos < chars.len() {
        let remaining = &chars[pos..];
        if remaining.len() <= w {
            rows.push(remaining.iter().collect());
            break;
        }

        let chunk = &remaining[..w];
        let (row_len, advance) = match chunk.iter().rposition(|&c| c == ' ') {
            Some(sp) if sp > 0 => (sp, sp + 1),
            _ => (w, w),
        };
        rows.push(remaining[..row_len].iter().collect());
        pos += advance;

        while pos < chars.len() && chars[pos] == ' ' {
            pos += 1;
        }
    }
    rows
}
