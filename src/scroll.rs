//! Text windowing shared by the HAL's software scroll and the buffered renderer's animations.
//!
//! Two windows are provided. The horizontal ring window slides a `width`-wide view along the
//! text followed by one window of blanks, so repetitions are separated by a visible gap. The
//! vertical window shows consecutive lines of newline-separated text, wrapping at the last line.
//! Both cost O(width) per refresh.

use core::iter;

use heapless::Vec;

/// Blank cell used for padding.
pub const BLANK: u8 = b' ';

/// Longest text a horizontal scroll keeps.
pub const H_SCROLL_CAPACITY: usize = 160;
/// Longest text a vertical scroll or crawl keeps.
pub const V_SCROLL_CAPACITY: usize = 256;

/// Which way a scroll step moves the offset.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ScrollDirection {
    /// Offset + 1: text moves left, or lines move up.
    Forward,
    /// Offset - 1: text moves right, or lines move down.
    Backward,
}

impl ScrollDirection {
    /// Step `offset` one place in this direction on a ring of `len` positions.
    pub fn step(self, offset: usize, len: usize) -> usize {
        if len == 0 {
            return 0;
        }
        match self {
            ScrollDirection::Forward => (offset + 1) % len,
            ScrollDirection::Backward => (offset + len - 1) % len,
        }
    }
}

/// Split `len` blanks of a `cols`-wide row into left and right padding around a text of `len`
/// characters. `None` when the text fills the row, in which case it is written flush left.
pub fn center_padding(len: usize, cols: usize) -> Option<(usize, usize)> {
    if len >= cols {
        return None;
    }
    let left = (cols - len) / 2;
    Some((left, cols - len - left))
}

/// One visible row of the ring track at `offset`.
#[derive(Clone, Debug)]
pub struct RingWindow<'a> {
    text: &'a [u8],
    track_len: usize,
    pos: usize,
    end: usize,
}

impl<'a> RingWindow<'a> {
    pub fn new(text: &'a [u8], width: usize, offset: usize) -> Self {
        let track_len = text.len() + width;
        let start = if track_len == 0 { 0 } else { offset % track_len };
        RingWindow {
            text,
            track_len,
            pos: start,
            end: start + width,
        }
    }
}

impl<'a> Iterator for RingWindow<'a> {
    type Item = u8;

    fn next(&mut self) -> Option<u8> {
        if self.pos >= self.end {
            return None;
        }
        let p = self.pos;
        self.pos += 1;
        let len = self.text.len();
        let byte = if p < len {
            self.text[p]
        } else if p < self.track_len {
            BLANK
        } else {
            // Wrapped past the trailing pad into the next repetition.
            self.text.get(p - self.track_len).copied().unwrap_or(BLANK)
        };
        Some(byte)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.end - self.pos;
        (n, Some(n))
    }
}

impl<'a> ExactSizeIterator for RingWindow<'a> {}

/// Number of lines in `text`; a trailing newline starts an empty last line.
pub fn count_lines(text: &[u8]) -> usize {
    1 + text.iter().filter(|b| **b == b'\n').count()
}

/// Line `n` of `text`, without its newline. Empty if `text` has fewer lines.
pub fn nth_line(text: &[u8], n: usize) -> &[u8] {
    text.split(|b| *b == b'\n').nth(n).unwrap_or(&[])
}

/// `line` cut or blank-padded to exactly `width` cells.
pub fn padded(line: &[u8], width: usize) -> impl Iterator<Item = u8> + '_ {
    let shown = usize::min(line.len(), width);
    line[..shown]
        .iter()
        .copied()
        .chain(iter::repeat(BLANK).take(width - shown))
}

/// Copy `src` into `dst`, keeping only what fits.
fn store_truncated<const N: usize>(dst: &mut Vec<u8, N>, src: &[u8]) {
    dst.clear();
    let n = usize::min(src.len(), N);
    // Cannot fail, `n` is within capacity.
    let _ = dst.extend_from_slice(&src[..n]);
}

/// Center every line of `text` in `width` columns. Lines wider than the row are kept flush left.
pub fn center_lines<const N: usize>(text: &[u8], width: usize) -> Vec<u8, N> {
    let mut out = Vec::new();
    for (i, line) in text.split(|b| *b == b'\n').enumerate() {
        let newline = if i == 0 { None } else { Some(b'\n') };
        let (left, right) = center_padding(line.len(), width).unwrap_or((0, 0));
        let bytes = newline
            .into_iter()
            .chain(iter::repeat(BLANK).take(left))
            .chain(line.iter().copied())
            .chain(iter::repeat(BLANK).take(right));
        for b in bytes {
            if out.push(b).is_err() {
                warn!("centered text truncated at {} bytes", N);
                return out;
            }
        }
    }
    out
}

/// Persistent state of a horizontal ring-window scroll.
#[derive(Clone, Debug, Default)]
pub struct HorizontalScroll<const N: usize> {
    text: Vec<u8, N>,
    offset: usize,
    row: u8,
}

impl<const N: usize> HorizontalScroll<N> {
    pub fn new() -> Self {
        HorizontalScroll {
            text: Vec::new(),
            offset: 0,
            row: 0,
        }
    }

    /// Load `text` for `row`. Returns true and rewinds to the start when either differs from what
    /// is already loaded. Text longer than the capacity is truncated.
    pub fn load(&mut self, text: &[u8], row: u8) -> bool {
        let n = usize::min(text.len(), N);
        if self.text[..] == text[..n] && self.row == row {
            return false;
        }
        store_truncated(&mut self.text, text);
        self.row = row;
        self.offset = 0;
        true
    }

    /// Back to the start of the loaded text.
    pub fn rewind(&mut self) {
        self.offset = 0;
    }

    pub fn step(&mut self, direction: ScrollDirection, width: usize) {
        self.offset = direction.step(self.offset, self.text.len() + width);
    }

    pub fn window(&self, width: usize) -> RingWindow<'_> {
        RingWindow::new(&self.text, width, self.offset)
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn row(&self) -> u8 {
        self.row
    }

    pub fn text(&self) -> &[u8] {
        &self.text
    }
}

/// Persistent state of a vertical line-window scroll.
#[derive(Clone, Debug, Default)]
pub struct VerticalScroll<const N: usize> {
    text: Vec<u8, N>,
    lines: usize,
    offset: usize,
    start_row: u8,
}

impl<const N: usize> VerticalScroll<N> {
    pub fn new() -> Self {
        VerticalScroll {
            text: Vec::new(),
            lines: 1,
            offset: 0,
            start_row: 0,
        }
    }

    /// Load `text`, recounting its lines only when it differs from the stored text. Returns true
    /// when the scroll was rewound.
    pub fn load(&mut self, text: &[u8], start_row: u8) -> bool {
        let n = usize::min(text.len(), N);
        if self.text[..] == text[..n] && self.start_row == start_row {
            return false;
        }
        store_truncated(&mut self.text, text);
        self.lines = count_lines(&self.text);
        self.start_row = start_row;
        self.offset = 0;
        true
    }

    pub fn rewind(&mut self) {
        self.offset = 0;
    }

    pub fn step(&mut self, direction: ScrollDirection) {
        self.offset = direction.step(self.offset, self.lines);
    }

    /// The text line shown on visible row `k`.
    pub fn visible_line(&self, k: usize) -> &[u8] {
        nth_line(&self.text, (self.offset + k) % self.lines)
    }

    pub fn line_count(&self) -> usize {
        self.lines
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn start_row(&self) -> u8 {
        self.start_row
    }
}
