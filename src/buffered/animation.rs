//! Non-blocking animations over the front buffer.
//!
//! Each animation is a small state machine stepped with a caller-supplied millisecond timestamp.
//! A step that is not yet due returns `WouldBlock` without touching the grid, so the steps can be
//! called on every pass of a main loop. Timestamps are free-running `u32`s; intervals are measured
//! with wrapping arithmetic.

use core::convert::Infallible;

use heapless::Vec;

use crate::scroll::{
    self, HorizontalScroll, ScrollDirection, VerticalScroll, BLANK, H_SCROLL_CAPACITY,
    V_SCROLL_CAPACITY,
};

use super::Grid;

/// Longest text a flash animation keeps.
pub const FLASH_TEXT_CAPACITY: usize = 40;

/// Progress of a scroll animation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    Idle,
    /// Started, first frame not drawn yet.
    Armed,
    /// Last frame drawn at `last`.
    Running { last: u32 },
}

impl Phase {
    /// Whether a step at `now` should draw, given the frame `interval`.
    fn due(self, now: u32, interval: u32) -> bool {
        match self {
            Phase::Idle => false,
            Phase::Armed => true,
            Phase::Running { last } => now.wrapping_sub(last) >= interval,
        }
    }
}

/// Horizontal ring-window marquee on one row.
#[derive(Clone, Debug)]
pub struct HScrollAnimation {
    scroll: HorizontalScroll<H_SCROLL_CAPACITY>,
    direction: ScrollDirection,
    interval: u32,
    phase: Phase,
}

impl HScrollAnimation {
    pub fn new() -> Self {
        HScrollAnimation {
            scroll: HorizontalScroll::new(),
            direction: ScrollDirection::Forward,
            interval: 0,
            phase: Phase::Idle,
        }
    }

    pub fn start(&mut self, row: u8, text: &[u8], direction: ScrollDirection, interval_ms: u32) {
        if !self.scroll.load(text, row) {
            self.scroll.rewind();
        }
        self.direction = direction;
        self.interval = interval_ms;
        self.phase = Phase::Armed;
    }

    pub fn stop(&mut self) {
        self.phase = Phase::Idle;
    }

    pub fn is_active(&self) -> bool {
        self.phase != Phase::Idle
    }

    /// Draw the next frame into `grid` if one is due. The first frame shows the start of the text.
    pub fn step(&mut self, now: u32, grid: &mut Grid) -> nb::Result<(), Infallible> {
        if !self.phase.due(now, self.interval) {
            return Err(nb::Error::WouldBlock);
        }
        let cols = grid.cols() as usize;
        if let Phase::Running { .. } = self.phase {
            self.scroll.step(self.direction, cols);
        }
        self.phase = Phase::Running { last: now };
        for (cell, b) in grid.row_mut(self.scroll.row()).iter_mut().zip(self.scroll.window(cols)) {
            *cell = b;
        }
        Ok(())
    }
}

/// Vertical line-window scroll over the rows from `start_row` down.
#[derive(Clone, Debug)]
pub struct VScrollAnimation {
    scroll: VerticalScroll<V_SCROLL_CAPACITY>,
    direction: ScrollDirection,
    interval: u32,
    phase: Phase,
}

impl VScrollAnimation {
    pub fn new() -> Self {
        VScrollAnimation {
            scroll: VerticalScroll::new(),
            direction: ScrollDirection::Forward,
            interval: 0,
            phase: Phase::Idle,
        }
    }

    pub fn start(&mut self, start_row: u8, text: &[u8], direction: ScrollDirection, interval_ms: u32) {
        if !self.scroll.load(text, start_row) {
            self.scroll.rewind();
        }
        self.direction = direction;
        self.interval = interval_ms;
        self.phase = Phase::Armed;
    }

    pub fn stop(&mut self) {
        self.phase = Phase::Idle;
    }

    pub fn is_active(&self) -> bool {
        self.phase != Phase::Idle
    }

    pub fn step(&mut self, now: u32, grid: &mut Grid) -> nb::Result<(), Infallible> {
        if !self.phase.due(now, self.interval) {
            return Err(nb::Error::WouldBlock);
        }
        if let Phase::Running { .. } = self.phase {
            self.scroll.step(self.direction);
        }
        self.phase = Phase::Running { last: now };
        let cols = grid.cols() as usize;
        let start = self.scroll.start_row();
        for (k, row) in (start..grid.rows()).enumerate() {
            let line = scroll::padded(self.scroll.visible_line(k), cols);
            for (cell, b) in grid.row_mut(row).iter_mut().zip(line) {
                *cell = b;
            }
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum FlashPhase {
    Idle,
    Armed,
    Shown { since: u32 },
    Hidden { since: u32 },
}

/// Blink a text on and off `repeat` times, leaving it shown at the end.
#[derive(Clone, Debug)]
pub struct FlashAnimation {
    text: Vec<u8, FLASH_TEXT_CAPACITY>,
    row: u8,
    col: u8,
    on_ms: u32,
    off_ms: u32,
    repeat: u8,
    cycles: u8,
    phase: FlashPhase,
}

impl FlashAnimation {
    pub fn new() -> Self {
        FlashAnimation {
            text: Vec::new(),
            row: 0,
            col: 0,
            on_ms: 0,
            off_ms: 0,
            repeat: 0,
            cycles: 0,
            phase: FlashPhase::Idle,
        }
    }

    pub fn start(&mut self, row: u8, col: u8, text: &[u8], on_ms: u32, off_ms: u32, repeat: u8) {
        let n = usize::min(text.len(), FLASH_TEXT_CAPACITY);
        self.text.clear();
        // Cannot fail, `n` is within capacity.
        let _ = self.text.extend_from_slice(&text[..n]);
        self.row = row;
        self.col = col;
        self.on_ms = on_ms;
        self.off_ms = off_ms;
        self.repeat = repeat;
        self.cycles = 0;
        self.phase = FlashPhase::Armed;
    }

    pub fn stop(&mut self) {
        self.phase = FlashPhase::Idle;
    }

    pub fn is_active(&self) -> bool {
        self.phase != FlashPhase::Idle
    }

    pub fn step(&mut self, now: u32, grid: &mut Grid) -> nb::Result<(), Infallible> {
        self.phase = match self.phase {
            FlashPhase::Idle => return Err(nb::Error::WouldBlock),
            FlashPhase::Armed => {
                self.draw(grid, true);
                if self.repeat == 0 {
                    FlashPhase::Idle
                } else {
                    FlashPhase::Shown { since: now }
                }
            }
            FlashPhase::Shown { since } => {
                if now.wrapping_sub(since) < self.on_ms {
                    return Err(nb::Error::WouldBlock);
                }
                self.draw(grid, false);
                FlashPhase::Hidden { since: now }
            }
            FlashPhase::Hidden { since } => {
                if now.wrapping_sub(since) < self.off_ms {
                    return Err(nb::Error::WouldBlock);
                }
                self.draw(grid, true);
                self.cycles += 1;
                if self.cycles >= self.repeat {
                    trace!("flash finished after {} cycles", self.cycles);
                    FlashPhase::Idle
                } else {
                    FlashPhase::Shown { since: now }
                }
            }
        };
        Ok(())
    }

    fn draw(&self, grid: &mut Grid, on: bool) {
        if on {
            grid.put(self.row, self.col, &self.text);
        } else {
            let len = self.text.len();
            grid.put_iter(self.row, self.col, core::iter::repeat(BLANK).take(len));
        }
    }
}
