//! A double-buffered text renderer on top of any [`VfdHal`].
//!
//! Drawing calls only touch the front grid. [`flush_diff`](BufferedVfd::flush_diff) compares it
//! with the back grid, which mirrors what the display shows, and sends each maximal run of changed
//! cells on a row as one `write_at`. Animations are stepped from the caller's loop and also draw
//! into the front grid, so they reach the display on the next flush.

pub mod animation;

use core::convert::Infallible;
use core::iter;

use itertools::izip;

use crate::error::Error;
use crate::hal::VfdHal;
use crate::scroll::{self, ScrollDirection, BLANK};

use self::animation::{FlashAnimation, HScrollAnimation, VScrollAnimation};

/// Largest geometry the renderer buffers.
pub const MAX_ROWS: usize = 8;
pub const MAX_COLS: usize = 40;

/// A blank-initialized character grid of up to `MAX_ROWS` by `MAX_COLS` cells.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Grid {
    cells: [[u8; MAX_COLS]; MAX_ROWS],
    rows: u8,
    cols: u8,
}

impl Grid {
    /// An all-blank grid. Dimensions are clamped to the maximum.
    pub fn blank(rows: u8, cols: u8) -> Self {
        Grid {
            cells: [[BLANK; MAX_COLS]; MAX_ROWS],
            rows: rows.min(MAX_ROWS as u8),
            cols: cols.min(MAX_COLS as u8),
        }
    }

    pub fn rows(&self) -> u8 {
        self.rows
    }

    pub fn cols(&self) -> u8 {
        self.cols
    }

    /// The visible cells of `row`; empty past the last row.
    pub fn row(&self, row: u8) -> &[u8] {
        match self.cells.get(row as usize) {
            Some(cells) if row < self.rows => &cells[..self.cols as usize],
            _ => &[],
        }
    }

    pub fn row_mut(&mut self, row: u8) -> &mut [u8] {
        let cols = self.cols as usize;
        match self.cells.get_mut(row as usize) {
            Some(cells) if row < self.rows => &mut cells[..cols],
            _ => &mut [],
        }
    }

    pub fn fill(&mut self, byte: u8) {
        for row in self.cells.iter_mut() {
            row.fill(byte);
        }
    }

    /// Copy `text` onto `row` from `col`, dropping whatever runs past the row end.
    pub fn put(&mut self, row: u8, col: u8, text: &[u8]) {
        self.put_iter(row, col, text.iter().copied());
    }

    pub fn put_iter(&mut self, row: u8, col: u8, bytes: impl Iterator<Item = u8>) {
        let cells = self.row_mut(row);
        let start = usize::min(col as usize, cells.len());
        for (cell, b) in cells[start..].iter_mut().zip(bytes) {
            *cell = b;
        }
    }
}

/// Column ranges of `front` that differ from `back`, each as long as possible.
struct DiffRuns<'a> {
    front: &'a [u8],
    back: &'a [u8],
    pos: usize,
}

impl<'a> DiffRuns<'a> {
    fn new(front: &'a [u8], back: &'a [u8]) -> Self {
        DiffRuns {
            front,
            back,
            pos: 0,
        }
    }

    fn span(&self, from: usize, equal: bool) -> usize {
        izip!(&self.front[from..], &self.back[from..])
            .take_while(|(f, b)| (f == b) == equal)
            .count()
    }
}

impl<'a> Iterator for DiffRuns<'a> {
    type Item = (usize, usize);

    fn next(&mut self) -> Option<(usize, usize)> {
        let start = self.pos + self.span(self.pos, true);
        if start >= self.front.len() {
            self.pos = start;
            return None;
        }
        let end = start + self.span(start, false);
        self.pos = end;
        Some((start, end))
    }
}

pub struct BufferedVfd<H> {
    hal: H,
    front: Grid,
    back: Grid,
    h_scroll: HScrollAnimation,
    v_scroll: VScrollAnimation,
    flash: FlashAnimation,
}

impl<H> BufferedVfd<H>
where
    H: VfdHal,
{
    /// Wrap `hal`. Nothing can be drawn until [`init`](BufferedVfd::init) has sized the grids.
    pub fn new(hal: H) -> Self {
        BufferedVfd {
            hal,
            front: Grid::blank(0, 0),
            back: Grid::blank(0, 0),
            h_scroll: HScrollAnimation::new(),
            v_scroll: VScrollAnimation::new(),
            flash: FlashAnimation::new(),
        }
    }

    /// Size both grids from the HAL's capabilities and blank them. The HAL itself is not touched;
    /// bring it up with its own `init` first.
    pub fn init(&mut self) -> Result<(), Error> {
        let caps = self.hal.capabilities();
        let (rows, cols) = (caps.text_rows(), caps.text_columns());
        if rows == 0 || cols == 0 || rows as usize > MAX_ROWS || cols as usize > MAX_COLS {
            warn!("cannot buffer a {}x{} display", rows, cols);
            return Err(Error::InvalidArgs);
        }
        self.front = Grid::blank(rows, cols);
        self.back = self.front.clone();
        Ok(())
    }

    pub fn hal(&self) -> &H {
        &self.hal
    }

    /// Direct access to the HAL. Anything written through it bypasses the back buffer, so a
    /// full [`flush`](BufferedVfd::flush) may be needed afterwards.
    pub fn hal_mut(&mut self) -> &mut H {
        &mut self.hal
    }

    pub fn release(self) -> H {
        self.hal
    }

    pub fn front(&self) -> &Grid {
        &self.front
    }

    pub fn clear_buffer(&mut self) {
        self.front.fill(BLANK);
    }

    /// Put `text` into the front grid at `(row, col)`, clipped at the row end.
    pub fn write_at(&mut self, row: u8, col: u8, text: &[u8]) -> Result<(), Error> {
        if row >= self.front.rows() || col >= self.front.cols() {
            return Err(Error::InvalidArgs);
        }
        self.front.put(row, col, text);
        Ok(())
    }

    /// Blank `row` and put `text` centered on it. Text wider than the row is cut to fit.
    pub fn center_text(&mut self, row: u8, text: &[u8]) -> Result<(), Error> {
        if row >= self.front.rows() {
            return Err(Error::InvalidArgs);
        }
        let cols = self.front.cols() as usize;
        let shown = &text[..usize::min(text.len(), cols)];
        let (left, right) = scroll::center_padding(shown.len(), cols).unwrap_or((0, 0));
        let line = iter::repeat(BLANK)
            .take(left)
            .chain(shown.iter().copied())
            .chain(iter::repeat(BLANK).take(right));
        self.front.put_iter(row, 0, line);
        Ok(())
    }

    /// Send every row. The back grid matches the front grid afterwards.
    pub fn flush(&mut self) -> Result<(), Error> {
        for row in 0..self.front.rows() {
            self.hal.write_at(row, 0, self.front.row(row))?;
        }
        self.back.clone_from(&self.front);
        Ok(())
    }

    /// Send only the changed runs. On failure the back grid is left as it was, so the next call
    /// sends every run again.
    pub fn flush_diff(&mut self) -> Result<(), Error> {
        for row in 0..self.front.rows() {
            let front = self.front.row(row);
            for (start, end) in DiffRuns::new(front, self.back.row(row)) {
                trace!("row {} cells {}..{} changed", row, start, end);
                self.hal.write_at(row, start as u8, &front[start..end])?;
            }
        }
        self.back.clone_from(&self.front);
        Ok(())
    }

    /// Start a horizontal marquee of `text` on `row`, one cell per `interval_ms`.
    pub fn h_scroll_start(
        &mut self,
        row: u8,
        text: &[u8],
        direction: ScrollDirection,
        interval_ms: u32,
    ) -> Result<(), Error> {
        if row >= self.front.rows() {
            return Err(Error::InvalidArgs);
        }
        self.h_scroll.start(row, text, direction, interval_ms);
        Ok(())
    }

    pub fn h_scroll_stop(&mut self) {
        self.h_scroll.stop();
    }

    pub fn h_scroll_step(&mut self, now_ms: u32) -> nb::Result<(), Infallible> {
        self.h_scroll.step(now_ms, &mut self.front)
    }

    pub fn h_scroll_active(&self) -> bool {
        self.h_scroll.is_active()
    }

    /// Start scrolling the lines of `text` through the rows from `start_row` down.
    pub fn v_scroll_start(
        &mut self,
        start_row: u8,
        text: &[u8],
        direction: ScrollDirection,
        interval_ms: u32,
    ) -> Result<(), Error> {
        if start_row >= self.front.rows() {
            return Err(Error::InvalidArgs);
        }
        self.v_scroll.start(start_row, text, direction, interval_ms);
        Ok(())
    }

    pub fn v_scroll_stop(&mut self) {
        self.v_scroll.stop();
    }

    pub fn v_scroll_step(&mut self, now_ms: u32) -> nb::Result<(), Infallible> {
        self.v_scroll.step(now_ms, &mut self.front)
    }

    pub fn v_scroll_active(&self) -> bool {
        self.v_scroll.is_active()
    }

    /// Blink `text` at `(row, col)`: `on_ms` shown, `off_ms` blanked, `repeat` times, ending
    /// shown.
    pub fn flash_start(
        &mut self,
        row: u8,
        col: u8,
        text: &[u8],
        on_ms: u32,
        off_ms: u32,
        repeat: u8,
    ) -> Result<(), Error> {
        if row >= self.front.rows() || col >= self.front.cols() {
            return Err(Error::InvalidArgs);
        }
        self.flash.start(row, col, text, on_ms, off_ms, repeat);
        Ok(())
    }

    pub fn flash_stop(&mut self) {
        self.flash.stop();
    }

    pub fn flash_step(&mut self, now_ms: u32) -> nb::Result<(), Infallible> {
        self.flash.step(now_ms, &mut self.front)
    }

    pub fn flash_active(&self) -> bool {
        self.flash.is_active()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::{presets, Capabilities};
    use crate::hal::escape::{Escape, EscapeConfig};
    use crate::hal::Driver;
    use crate::interface::test_spy::{sends, SpyHandle, SpyTransport};

    type Hal = Driver<SpyTransport, Escape>;

    fn renderer(caps: Capabilities) -> (BufferedVfd<Hal>, SpyHandle) {
        let (spy, handle) = SpyTransport::new().split();
        let mut hal = Driver::new(spy, Escape::new(EscapeConfig::vfd20t202()), caps);
        hal.init().unwrap();
        let mut vfd = BufferedVfd::new(hal);
        vfd.init().unwrap();
        handle.clear();
        (vfd, handle)
    }

    fn small() -> (BufferedVfd<Hal>, SpyHandle) {
        renderer(presets::generic_20x2().with_text_dimensions(2, 8))
    }

    #[test]
    fn diff_runs() {
        let runs: std::vec::Vec<_> = DiffRuns::new(b"abcdefgh", b"aXcdYYgZ").collect();
        assert_eq!(runs, [(1, 2), (4, 6), (7, 8)]);
        assert_eq!(DiffRuns::new(b"same", b"same").count(), 0);
        assert_eq!(DiffRuns::new(b"", b"").count(), 0);
    }

    #[test]
    fn init_rejects_bad_geometry() {
        let (spy, _) = SpyTransport::new().split();
        let hal = Driver::new(spy, Escape::new(EscapeConfig::vfd20t202()), Capabilities::new());
        let mut vfd = BufferedVfd::new(hal);
        assert_eq!(vfd.init(), Err(Error::InvalidArgs));

        let (spy, _) = SpyTransport::new().split();
        let caps = presets::generic_20x2().with_text_dimensions(2, 41);
        let mut vfd = BufferedVfd::new(Driver::new(spy, Escape::new(EscapeConfig::vfd20t202()), caps));
        assert_eq!(vfd.init(), Err(Error::InvalidArgs));
    }

    #[test]
    fn drawing_is_buffered() {
        let (mut vfd, handle) = small();
        vfd.write_at(0, 6, b"clip").unwrap();
        vfd.center_text(1, b"hi").unwrap();
        assert_eq!(vfd.front().row(0), b"      cl");
        assert_eq!(vfd.front().row(1), b"   hi   ");
        assert_eq!(vfd.write_at(2, 0, b"x"), Err(Error::InvalidArgs));
        assert_eq!(vfd.write_at(0, 8, b"x"), Err(Error::InvalidArgs));
        assert!(handle.bytes().is_empty());
    }

    #[test]
    fn flush_diff_coalesces_runs() {
        let (mut vfd, handle) = small();
        vfd.write_at(0, 1, b"AB").unwrap();
        vfd.write_at(0, 5, b"C").unwrap();
        vfd.write_at(1, 0, b"D").unwrap();
        vfd.flush_diff().unwrap();
        handle.check(&sends!(
            [0x1B, 0x48, 1],
            *b"AB",
            [0x1B, 0x48, 5],
            *b"C",
            [0x1B, 0x48, 8],
            *b"D"
        ));

        handle.clear();
        vfd.flush_diff().unwrap();
        assert!(handle.bytes().is_empty());
    }

    #[test]
    fn flush_diff_failure_keeps_back() {
        let (mut vfd, handle) = small();
        vfd.write_at(1, 2, b"ok").unwrap();
        handle.fail_writes_after(0);
        assert_eq!(vfd.flush_diff(), Err(Error::TransportFail));

        let (spy, handle) = SpyTransport::new().split();
        vfd.hal_mut().set_transport(spy);
        vfd.hal_mut().init().unwrap();
        handle.clear();
        vfd.flush_diff().unwrap();
        handle.check(&sends!([0x1B, 0x48, 10], *b"ok"));
    }

    #[test]
    fn full_flush_sends_every_row() {
        let (mut vfd, handle) = small();
        vfd.write_at(0, 0, b"top").unwrap();
        vfd.flush().unwrap();
        handle.check(&sends!(
            [0x1B, 0x48, 0],
            *b"top     ",
            [0x1B, 0x48, 8],
            *b"        "
        ));
        handle.clear();
        vfd.flush_diff().unwrap();
        assert!(handle.bytes().is_empty());
    }

    #[test]
    fn clear_buffer_diffs_to_blanks() {
        let (mut vfd, handle) = small();
        vfd.write_at(0, 3, b"xy").unwrap();
        vfd.flush_diff().unwrap();
        handle.clear();
        vfd.clear_buffer();
        vfd.flush_diff().unwrap();
        handle.check(&sends!([0x1B, 0x48, 3], *b"  "));
    }

    #[test]
    fn animations_reach_display_on_flush() {
        let (mut vfd, handle) = small();
        assert_eq!(
            vfd.h_scroll_start(2, b"news", ScrollDirection::Forward, 10),
            Err(Error::InvalidArgs)
        );
        vfd.h_scroll_start(0, b"news", ScrollDirection::Forward, 10).unwrap();
        assert!(vfd.h_scroll_active());
        vfd.h_scroll_step(0).unwrap();
        vfd.flush_diff().unwrap();
        handle.check(&sends!([0x1B, 0x48, 0], *b"news"));

        handle.clear();
        assert_eq!(vfd.h_scroll_step(5), Err(nb::Error::WouldBlock));
        vfd.h_scroll_step(10).unwrap();
        vfd.flush_diff().unwrap();
        handle.check(&sends!([0x1B, 0x48, 0], *b"ews "));

        vfd.h_scroll_stop();
        assert!(!vfd.h_scroll_active());
    }

    #[test]
    fn vertical_and_flash_share_the_grid() {
        let (mut vfd, _) = small();
        vfd.v_scroll_start(0, b"a\nb\nc", ScrollDirection::Backward, 1).unwrap();
        vfd.v_scroll_step(0).unwrap();
        vfd.v_scroll_step(1).unwrap();
        assert_eq!(vfd.front().row(0), b"c       ");
        assert_eq!(vfd.front().row(1), b"a       ");
        vfd.v_scroll_stop();

        vfd.flash_start(1, 4, b"!!", 5, 5, 1).unwrap();
        assert!(vfd.flash_active());
        vfd.flash_step(0).unwrap();
        assert_eq!(vfd.front().row(1), b"a   !!  ");
        vfd.flash_step(5).unwrap();
        assert_eq!(vfd.front().row(1), b"a       ");
        vfd.flash_step(10).unwrap();
        assert_eq!(vfd.front().row(1), b"a   !!  ");
        assert!(!vfd.flash_active());
        assert_eq!(vfd.flash_start(1, 8, b"!", 1, 1, 1), Err(Error::InvalidArgs));
    }
}
