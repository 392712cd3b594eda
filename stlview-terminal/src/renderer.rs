/// Character-cell presentation of rendered frames
use crossterm::{
    cursor,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal::{Clear, ClearType},
    QueueableCommand,
};
use log::warn;
use std::io::{self, Write};
use stlview_core::{Fragment, Frame, RenderSurface, Rgb};

/// Character luminosity ramp for shading (darkest to lightest)
const LUMINOSITY_RAMP: &[char] = &[' ', '.', ':', '-', '=', '+', '*', '#', '%', '@'];

/// Character drawn for a cell
pub fn cell_char(fragment: Option<Fragment>) -> char {
    let Some(fragment) = fragment else {
        return ' ';
    };
    let last = LUMINOSITY_RAMP.len() - 1;
    // Covered cells never use the blank at index 0
    let index = (fragment.intensity.clamp(0.0, 1.0) * last as f32).round() as usize;
    LUMINOSITY_RAMP[index.clamp(1, last)]
}

pub fn terminal_color(color: Rgb) -> Color {
    let c = color.to_rgb8();
    Color::Rgb {
        r: c.r,
        g: c.g,
        b: c.b,
    }
}

/// Write `frame` starting at terminal row `top`
pub fn draw_frame<W: Write>(frame: &Frame, writer: &mut W, top: u16) -> io::Result<()> {
    for y in 0..frame.height() {
        writer.queue(cursor::MoveTo(0, top + y as u16))?;
        let mut current: Option<Color> = None;
        for x in 0..frame.width() {
            let fragment = frame.fragment(x, y);
            if let Some(f) = fragment {
                // Glyph carries the shading; show the unshaded actor color
                let color = terminal_color(f.color.scaled(1.0 / f.intensity.max(0.2)));
                if current != Some(color) {
                    writer.queue(SetForegroundColor(color))?;
                    current = Some(color);
                }
            }
            writer.queue(Print(cell_char(fragment)))?;
        }
    }
    writer.queue(ResetColor)?;
    Ok(())
}

/// Render surface over a terminal writer, leaving `top` rows for the header
pub struct TerminalSurface<W: Write> {
    writer: W,
    width: u16,
    height: u16,
    top: u16,
    cell_aspect: f32,
}

impl<W: Write> TerminalSurface<W> {
    pub fn new(writer: W, width: u16, height: u16, top: u16, cell_aspect: f32) -> Self {
        Self {
            writer,
            width,
            height,
            top,
            cell_aspect,
        }
    }

    pub fn set_size(&mut self, width: u16, height: u16) {
        self.width = width;
        self.height = height;
    }

    pub fn writer_mut(&mut self) -> &mut W {
        &mut self.writer
    }

    /// Blank the whole terminal, e.g. after a resize left stale cells
    pub fn clear(&mut self) -> io::Result<()> {
        self.writer.queue(ResetColor)?;
        self.writer.queue(Clear(ClearType::All))?;
        self.writer.flush()
    }
}

impl<W: Write> RenderSurface for TerminalSurface<W> {
    fn size(&self) -> (u32, u32) {
        (self.width as u32, self.height as u32)
    }

    fn pixel_aspect(&self) -> f32 {
        self.cell_aspect
    }

    fn present(&mut self, frame: &Frame) -> stlview_core::Result<()> {
        draw_frame(frame, &mut self.writer, self.top)?;
        self.writer.flush()?;
        Ok(())
    }

    fn release(&mut self) {
        if let Err(e) = self.clear() {
            warn!("failed to clear terminal on release: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fragment(intensity: f32) -> Option<Fragment> {
        Some(Fragment {
            color: Rgb::WHITE,
            intensity,
        })
    }

    #[test]
    fn empty_cell_is_blank() {
        assert_eq!(cell_char(None), ' ');
    }

    #[test]
    fn dim_fragment_is_still_visible() {
        assert_eq!(cell_char(fragment(0.0)), '.');
        assert_eq!(cell_char(fragment(1.0)), '@');
    }

    #[test]
    fn present_writes_every_cell() {
        let mut surface = TerminalSurface::new(Vec::new(), 3, 2, 1, 2.0);
        let frame = Frame::new(3, 2, Rgb::BLACK);
        surface.present(&frame).unwrap();
        let out = String::from_utf8(surface.writer_mut().clone()).unwrap();
        assert_eq!(out.matches(' ').count(), 6);
    }

    #[test]
    fn clear_blanks_the_screen() {
        let mut surface = TerminalSurface::new(Vec::new(), 3, 2, 1, 2.0);
        surface.clear().unwrap();
        let out = String::from_utf8(surface.writer_mut().clone()).unwrap();
        assert!(out.contains("\x1b[2J"));
    }
}
