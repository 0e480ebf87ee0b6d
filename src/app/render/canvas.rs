use std::fmt;

use glam::DVec2;
use unicode_width::UnicodeWidthChar;

use crate::memory::LinkKind;

/// Semantic style of a cell. The terminal host maps tones to colours.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Tone {
    #[default]
    Plain,
    Link(LinkKind),
    Arrow,
    Node,
    Branch,
    Pinned,
    Selected,
    Header,
    Footer,
    Muted,
    Error,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Cell {
    pub glyph: char,
    pub tone: Tone,
}

impl Cell {
    pub const BLANK: Self = Self {
        glyph: ' ',
        tone: Tone::Plain,
    };

    /// Right half of a two-column glyph. Hosts print nothing for it.
    pub const CONTINUATION: char = '\0';

    pub fn is_blank(&self) -> bool {
        *self == Self::BLANK
    }

    pub fn is_continuation(&self) -> bool {
        self.glyph == Self::CONTINUATION
    }

    /// Terminal columns the glyph occupies: 0 for continuations, 2 for wide
    /// glyphs, 1 otherwise.
    pub fn columns(&self) -> u16 {
        if self.is_continuation() {
            0
        } else {
            glyph_columns(self.glyph).max(1) as u16
        }
    }
}

fn glyph_columns(glyph: char) -> usize {
    if glyph.is_control() {
        return 0;
    }
    glyph.width().unwrap_or(0)
}

impl Default for Cell {
    fn default() -> Self {
        Self::BLANK
    }
}

/// Fixed-size character buffer, row-major.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Canvas {
    width: u16,
    height: u16,
    cells: Vec<Cell>,
}

impl Canvas {
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            width,
            height,
            cells: vec![Cell::BLANK; usize::from(width) * usize::from(height)],
        }
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    pub fn size(&self) -> (u16, u16) {
        (self.width, self.height)
    }

    fn offset(&self, x: i32, y: i32) -> Option<usize> {
        let x = usize::try_from(x).ok()?;
        let y = usize::try_from(y).ok()?;
        (x < usize::from(self.width) && y < usize::from(self.height))
            .then(|| y * usize::from(self.width) + x)
    }

    pub fn get(&self, x: u16, y: u16) -> Option<Cell> {
        self.offset(i32::from(x), i32::from(y))
            .map(|offset| self.cells[offset])
    }

    /// Writes one narrow cell; coordinates outside the buffer are ignored.
    /// A wide glyph cut in half by the write is blanked on both columns.
    pub fn put(&mut self, x: i32, y: i32, glyph: char, tone: Tone) {
        let Some(offset) = self.offset(x, y) else {
            return;
        };

        if self.cells[offset].is_continuation()
            && let Some(head) = self.offset(x - 1, y)
        {
            self.cells[head] = Cell { glyph: ' ', ..self.cells[head] };
        }
        if let Some(tail) = self.offset(x + 1, y)
            && self.cells[tail].is_continuation()
        {
            self.cells[tail] = Cell { glyph: ' ', ..self.cells[tail] };
        }
        self.cells[offset] = Cell { glyph, tone };
    }

    /// Writes `text` left to right from `(x, y)` by display width. Wide
    /// glyphs take two cells, the second a continuation; zero-width and
    /// control chars are dropped. Returns the column after the text.
    pub fn draw_text(&mut self, x: i32, y: i32, text: &str, tone: Tone) -> i32 {
        let mut column = x;
        for glyph in text.chars() {
            match glyph_columns(glyph) {
                0 => {}
                1 => {
                    self.put(column, y, glyph, tone);
                    column += 1;
                }
                _ => {
                    if column >= 0 && self.offset(column + 1, y).is_some() {
                        self.put(column, y, glyph, tone);
                        self.put(column + 1, y, Cell::CONTINUATION, tone);
                    } else {
                        // Half of the glyph would fall outside the buffer.
                        self.put(column, y, ' ', tone);
                        self.put(column + 1, y, ' ', tone);
                    }
                    column += 2;
                }
            }
        }
        column
    }

    pub fn fill_row(&mut self, y: i32, tone: Tone) {
        for x in 0..i32::from(self.width) {
            self.put(x, y, ' ', tone);
        }
    }

    /// Bresenham rasterisation between two cells. The glyph is picked once
    /// from the visual slope, counting vertical distance double.
    pub fn draw_line(&mut self, from: (i32, i32), to: (i32, i32), tone: Tone) {
        let glyph = line_glyph(DVec2::new(
            f64::from(to.0 - from.0),
            f64::from(to.1 - from.1),
        ));

        let (mut x, mut y) = from;
        let dx = (to.0 - from.0).abs();
        let dy = -(to.1 - from.1).abs();
        let step_x = if from.0 < to.0 { 1 } else { -1 };
        let step_y = if from.1 < to.1 { 1 } else { -1 };
        let mut error = dx + dy;

        loop {
            self.put(x, y, glyph, tone);
            if x == to.0 && y == to.1 {
                break;
            }
            let doubled = 2 * error;
            if doubled >= dy {
                error += dy;
                x += step_x;
            }
            if doubled <= dx {
                error += dx;
                y += step_y;
            }
        }
    }

    pub fn row_text(&self, y: u16) -> String {
        if y >= self.height {
            return String::new();
        }
        let start = usize::from(y) * usize::from(self.width);
        self.cells[start..start + usize::from(self.width)]
            .iter()
            .filter(|cell| !cell.is_continuation())
            .map(|cell| cell.glyph)
            .collect()
    }

    pub fn cells(&self) -> impl Iterator<Item = (u16, u16, Cell)> + '_ {
        let width = self.width.max(1);
        self.cells.iter().enumerate().map(move |(offset, cell)| {
            let x = (offset % usize::from(width)) as u16;
            let y = (offset / usize::from(width)) as u16;
            (x, y, *cell)
        })
    }
}

impl fmt::Display for Canvas {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for y in 0..self.height {
            if y > 0 {
                f.write_str("\n")?;
            }
            f.write_str(self.row_text(y).trim_end())?;
        }
        Ok(())
    }
}

/// `tan(22.5°)`: slopes flatter than this draw as straight lines.
const OCTANT_SLOPE: f64 = 0.414_213_562;

fn line_glyph(delta: DVec2) -> char {
    let visual = DVec2::new(delta.x.abs(), (delta.y * 2.0).abs());
    if visual.y <= visual.x * OCTANT_SLOPE {
        '─'
    } else if visual.x <= visual.y * OCTANT_SLOPE {
        '│'
    } else if (delta.x > 0.0) == (delta.y > 0.0) {
        '╲'
    } else {
        '╱'
    }
}
