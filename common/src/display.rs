//! Eight-cell status line for a seven-segment module.
//!
//! Cells are numbered 7 (leftmost) down to 0. Cell 7 carries the mode glyph
//! with its decimal point lit while the compressor lock is engaged, cells 6-4
//! the setpoint, cell 3 is a gap and cells 2-0 the measured temperature.

use std::fmt;

use crate::types::Mode;

pub const CELL_COUNT: usize = 8;

const DP_SEGMENT: u8 = 0x80;
const DIGIT_SEGMENTS: [u8; 10] = [0x7E, 0x30, 0x6D, 0x79, 0x33, 0x5B, 0x5F, 0x70, 0x7F, 0x7B];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Glyph {
    Blank,
    Digit(u8),
    Minus,
    H,
    C,
    E,
    R,
}

impl Glyph {
    pub fn as_char(self) -> char {
        match self {
            Self::Blank => ' ',
            Self::Digit(d) => char::from(b'0' + d % 10),
            Self::Minus => '-',
            Self::H => 'H',
            Self::C => 'C',
            Self::E => 'E',
            Self::R => 'r',
        }
    }

    /// Segment bits in `.abcdefg` order.
    pub fn segments(self) -> u8 {
        match self {
            Self::Blank => 0x00,
            Self::Digit(d) => DIGIT_SEGMENTS[usize::from(d % 10)],
            Self::Minus => 0x01,
            Self::H => 0x37,
            Self::C => 0x4E,
            Self::E => 0x4F,
            Self::R => 0x05,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    pub glyph: Glyph,
    pub point: bool,
}

impl Cell {
    pub const BLANK: Cell = Cell::plain(Glyph::Blank);

    pub const fn plain(glyph: Glyph) -> Self {
        Self {
            glyph,
            point: false,
        }
    }

    pub const fn dotted(glyph: Glyph) -> Self {
        Self { glyph, point: true }
    }

    pub fn segments(self) -> u8 {
        let dp = if self.point { DP_SEGMENT } else { 0 };
        self.glyph.segments() | dp
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedStatus {
    cells: [Cell; CELL_COUNT],
}

impl FixedStatus {
    /// `None` past cell 7.
    pub fn cell(&self, index: usize) -> Option<Cell> {
        self.cells.get(index).copied()
    }

    /// Left to right, cell 7 first.
    pub fn cells_left_to_right(&self) -> impl Iterator<Item = Cell> + '_ {
        self.cells.iter().rev().copied()
    }

    /// Raw bytes for a no-decode driver, indexed by cell number.
    pub fn segments(&self) -> [u8; CELL_COUNT] {
        self.cells.map(Cell::segments)
    }

    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for FixedStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for cell in self.cells_left_to_right() {
            write!(f, "{}", cell.glyph.as_char())?;
            if cell.point {
                f.write_str(".")?;
            }
        }
        Ok(())
    }
}

pub struct StatusEncoder;

impl StatusEncoder {
    pub fn encode(
        mode: Mode,
        protection_active: bool,
        setpoint: f32,
        temperature: f32,
    ) -> FixedStatus {
        let mut cells = Self::frame(mode, protection_active, setpoint);
        cells[..3].copy_from_slice(&right_to_left(format_value(temperature)));
        FixedStatus { cells }
    }

    pub fn encode_error(mode: Mode, protection_active: bool, setpoint: f32) -> FixedStatus {
        let mut cells = Self::frame(mode, protection_active, setpoint);
        cells[2] = Cell::BLANK;
        cells[1] = Cell::plain(Glyph::E);
        cells[0] = Cell::dotted(Glyph::R);
        FixedStatus { cells }
    }

    fn frame(mode: Mode, protection_active: bool, setpoint: f32) -> [Cell; CELL_COUNT] {
        let mode_glyph = match mode {
            Mode::Heat => Glyph::H,
            Mode::Cool => Glyph::C,
        };

        let mut cells = [Cell::BLANK; CELL_COUNT];
        cells[7] = Cell {
            glyph: mode_glyph,
            point: protection_active,
        };
        cells[4..7].copy_from_slice(&right_to_left(format_value(setpoint)));
        cells[3] = Cell::BLANK;
        cells
    }
}

fn right_to_left(field: [Cell; 3]) -> [Cell; 3] {
    [field[2], field[1], field[0]]
}

/// Three cells, left to right, for one value shown to a tenth of a degree.
pub fn format_value(value: f32) -> [Cell; 3] {
    if !value.is_finite() {
        return [Cell::plain(Glyph::Minus); 3];
    }

    // Rounded first so the chosen layout always matches the digits shown.
    let tenths = (value.abs() * 10.0).round().min(9_999.0) as u32;
    let negative = value < 0.0 && tenths > 0;

    if tenths >= 1_000 {
        let whole = tenths / 10;
        return [
            digit(whole / 100 % 10),
            digit(whole / 10 % 10),
            digit(whole % 10),
        ];
    }

    if !negative {
        let tens = tenths / 100;
        let tens_cell = if tens == 0 { Cell::BLANK } else { digit(tens) };
        return [tens_cell, dotted_digit(tenths / 10 % 10), digit(tenths % 10)];
    }

    if tenths < 100 {
        return [
            Cell::plain(Glyph::Minus),
            dotted_digit(tenths / 10),
            digit(tenths % 10),
        ];
    }

    let whole = tenths / 10;
    [Cell::plain(Glyph::Minus), digit(whole / 10), digit(whole % 10)]
}

fn digit(value: u32) -> Cell {
    Cell::plain(Glyph::Digit((value % 10) as u8))
}

fn dotted_digit(value: u32) -> Cell {
    Cell::dotted(Glyph::Digit((value % 10) as u8))
}
