/// Presentation layer: double-buffered, diff-based terminal renderer.
///
/// How it works:
///   1. Build the next frame into `front` buffer (array of Cell)
///   2. Compare each cell with `back` buffer (previous frame)
///   3. Only emit terminal commands for cells that changed
///   4. All commands are batched with `queue!`, flushed once at the end
///   5. Swap front/back
///
/// ## Pixel blocks
///
/// One terminal cell shows a `BLOCK_W x BLOCK_H` pixel area of the map as
/// two stacked half blocks. Each half samples the map at its center pixel
/// and is drawn with `▀`/`▄`/`█` so the upper and lower halves can differ.

use std::io::{self, BufWriter, Write};

use crossterm::{
    cursor::{self, MoveTo},
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType},
};

use sloperunner::domain::geom::Rect;
use sloperunner::sim::world::WorldState;
use sloperunner::PhysicsState;

// ── Cell: the unit of the back-buffer ──

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
struct Cell {
    ch: char,
    fg: Color,
    bg: Color,
}

impl Cell {
    /// Explicit dark background for all "empty" terminal cells.
    ///
    /// Using the same RGB for `Clear(ClearType::All)` and every cell keeps
    /// the inter-row gap on VTE terminals the same color as the cells.
    const BASE_BG: Color = Color::Rgb { r: 22, g: 22, b: 35 };

    const BLANK: Cell = Cell { ch: ' ', fg: Color::White, bg: Cell::BASE_BG };

    /// Sentinel cell used to invalidate the back buffer.
    /// Different from any real cell, so every position will be diff'd.
    const INVALID: Cell = Cell { ch: '?', fg: Color::Magenta, bg: Color::Magenta };

    /// Normalize bg: Color::Reset → BASE_BG so that every cell gets an
    /// explicit background color (never terminal-default).
    #[inline]
    fn norm_bg(bg: Color) -> Color {
        match bg {
            Color::Reset => Self::BASE_BG,
            other => other,
        }
    }

    fn from_char(ch: char, fg: Color, bg: Color) -> Self {
        Cell { ch, fg, bg: Self::norm_bg(bg) }
    }

    /// Two stacked half blocks. `None` shows the background.
    fn halves(top: Option<Color>, bottom: Option<Color>) -> Self {
        match (top, bottom) {
            (None, None) => Cell::BLANK,
            (Some(t), None) => Cell::from_char('▀', t, Cell::BASE_BG),
            (None, Some(b)) => Cell::from_char('▄', b, Cell::BASE_BG),
            (Some(t), Some(b)) if t == b => Cell::from_char('█', t, Cell::BASE_BG),
            (Some(t), Some(b)) => Cell::from_char('▀', t, b),
        }
    }
}

// ── FrameBuffer: a 2D grid of Cells ──

struct FrameBuffer {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl FrameBuffer {
    fn new(w: usize, h: usize) -> Self {
        FrameBuffer {
            width: w,
            height: h,
            cells: vec![Cell::BLANK; w * h],
        }
    }

    fn resize(&mut self, w: usize, h: usize) {
        if self.width != w || self.height != h {
            self.width = w;
            self.height = h;
            self.cells = vec![Cell::BLANK; w * h];
        }
    }

    fn clear(&mut self) {
        self.cells.fill(Cell::BLANK);
    }

    fn set(&mut self, x: usize, y: usize, cell: Cell) {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x] = cell;
        }
    }

    fn get(&self, x: usize, y: usize) -> Cell {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x]
        } else {
            Cell::BLANK
        }
    }

    /// Write a string at (x, y) with given colors. Each char occupies 1 column.
    fn put_str(&mut self, x: usize, y: usize, s: &str, fg: Color, bg: Color) {
        for (i, ch) in s.chars().enumerate() {
            if x + i >= self.width { break; }
            self.set(x + i, y, Cell::from_char(ch, fg, bg));
        }
    }

    /// Fill a whole row with a background color, then write `s` on it.
    fn put_bar(&mut self, y: usize, s: &str, fg: Color, bg: Color) {
        for x in 0..self.width {
            self.set(x, y, Cell::from_char(' ', fg, bg));
        }
        self.put_str(0, y, s, fg, bg);
    }
}

// ── Renderer ──

/// Map pixels per terminal cell.
pub const BLOCK_W: i32 = 8;
pub const BLOCK_H: i32 = 16;

/// Vertical offsets
const HUD_ROW: usize = 0;
const MAP_ROW: usize = 2;
/// HUD + gap above the map, message + gap + help below it.
const RESERVED_ROWS: usize = MAP_ROW + 3;

const HUD_BG: Color = Color::Rgb { r: 20, g: 20, b: 60 };
const MSG_BG: Color = Color::Rgb { r: 200, g: 180, b: 50 };
const GRASS: Color = Color::Rgb { r: 90, g: 170, b: 70 };
const SOIL: Color = Color::Rgb { r: 120, g: 85, b: 50 };
const ACTOR_GROUNDED: Color = Color::Rgb { r: 250, g: 220, b: 60 };
const ACTOR_AIRBORNE: Color = Color::Rgb { r: 250, g: 150, b: 40 };
const FLOOR_PROBE: Color = Color::Rgb { r: 230, g: 50, b: 50 };
const WALL_PROBE: Color = Color::Rgb { r: 60, g: 210, b: 230 };

pub struct Renderer {
    writer: BufWriter<io::Stdout>,
    front: FrameBuffer,
    back: FrameBuffer,
    term_w: usize,
    term_h: usize,
    frame: u64,
}

impl Renderer {
    pub fn new() -> Self {
        Renderer {
            writer: BufWriter::with_capacity(16384, io::stdout()),
            front: FrameBuffer::new(0, 0),
            back: FrameBuffer::new(0, 0),
            term_w: 0,
            term_h: 0,
            frame: 0,
        }
    }

    pub fn init(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(
            self.writer,
            terminal::EnterAlternateScreen,
            cursor::Hide,
            SetBackgroundColor(Cell::BASE_BG),
            Clear(ClearType::All)
        )?;

        let (tw, th) = terminal::size().unwrap_or((80, 24));
        self.term_w = tw as usize;
        self.term_h = th as usize;
        self.front.resize(self.term_w, self.term_h);
        self.back.resize(self.term_w, self.term_h);
        // Force full repaint on first frame: back ≠ front for every cell.
        self.back.cells.fill(Cell::INVALID);

        Ok(())
    }

    pub fn cleanup(&mut self) -> io::Result<()> {
        execute!(
            self.writer,
            ResetColor,
            cursor::Show,
            terminal::LeaveAlternateScreen
        )?;
        terminal::disable_raw_mode()
    }

    pub fn render(&mut self, world: &mut WorldState) -> io::Result<()> {
        self.frame += 1;

        // Detect terminal resize
        let (tw, th) = terminal::size().unwrap_or((80, 24));
        if tw as usize != self.term_w || th as usize != self.term_h {
            self.term_w = tw as usize;
            self.term_h = th as usize;
            self.front.resize(self.term_w, self.term_h);
            self.back.resize(self.term_w, self.term_h);
            // Force full repaint after resize.
            self.back.cells.fill(Cell::INVALID);
            queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))?;
        }

        // Viewport in map pixels from the terminal size.
        let view_rows = self.term_h.saturating_sub(RESERVED_ROWS).max(1);
        let view_w = self.term_w as i32 * BLOCK_W;
        let view_h = view_rows as i32 * BLOCK_H;
        if world.camera.view_w != view_w || world.camera.view_h != view_h {
            world.camera.view_w = view_w;
            world.camera.view_h = view_h;
            let (cx, cy) = world.actor_center();
            let (mw, mh) = world.map.pixel_size();
            world.camera.center_on(cx, cy, mw, mh);
        }

        self.front.clear();
        self.compose_hud(world);
        self.compose_map(world, view_rows);
        self.compose_footer(world, view_rows);
        if world.paused {
            self.compose_pause_overlay(view_rows);
        }

        self.flush_diff()?;

        // Swap: current front becomes next back
        std::mem::swap(&mut self.front, &mut self.back);

        Ok(())
    }

    // ── Diff flush: only write changed cells ──

    fn flush_diff(&mut self) -> io::Result<()> {
        let mut last_fg = Color::White;
        let mut last_bg = Cell::BASE_BG;
        let mut need_move = true;
        let mut last_x: usize = 0;
        let mut last_y: usize = 0;

        // Explicit base colors at the start of the frame; ResetColor would
        // fall back to the terminal default and leave line artifacts.
        queue!(self.writer,
            SetForegroundColor(Color::White),
            SetBackgroundColor(Cell::BASE_BG),
        )?;

        for y in 0..self.front.height {
            for x in 0..self.front.width {
                let cell = self.front.get(x, y);
                if cell == self.back.get(x, y) {
                    need_move = true;
                    continue;
                }

                // Position cursor if needed
                if need_move || x != last_x + 1 || y != last_y {
                    queue!(self.writer, MoveTo(x as u16, y as u16))?;
                    need_move = false;
                }

                // Set colors only if changed
                if cell.fg != last_fg {
                    queue!(self.writer, SetForegroundColor(cell.fg))?;
                    last_fg = cell.fg;
                }
                if cell.bg != last_bg {
                    queue!(self.writer, SetBackgroundColor(cell.bg))?;
                    last_bg = cell.bg;
                }

                queue!(self.writer, Print(cell.ch))?;
                last_x = x;
                last_y = y;
            }
        }

        self.writer.flush()
    }

    // ── Compose: build front buffer content ──

    fn compose_hud(&mut self, w: &WorldState) {
        let a = &w.actor;
        let state = match a.state {
            PhysicsState::Grounded => "GROUNDED",
            PhysicsState::Airborne => "AIRBORNE",
        };
        let hud = format!(
            " {} ({}/{})  {:<8}  pos {:>5},{:<5}  vel {:>5.2},{:<6.2} ",
            w.level_name, w.current_level + 1, w.total_levels,
            state, a.rect.x, a.rect.y, a.vel.x, a.vel.y,
        );
        self.front.put_bar(HUD_ROW, &hud, Color::White, HUD_BG);
    }

    fn compose_map(&mut self, w: &WorldState, view_rows: usize) {
        let cam = &w.camera;
        for vy in 0..view_rows {
            let row = MAP_ROW + vy;
            if row >= self.front.height { break; }
            let wy = cam.y + vy as i32 * BLOCK_H;

            for col in 0..self.front.width {
                let wx = cam.x + col as i32 * BLOCK_W;
                let top = sample(w, Rect::new(wx, wy, BLOCK_W, BLOCK_H / 2));
                let bottom = sample(w, Rect::new(wx, wy + BLOCK_H / 2, BLOCK_W, BLOCK_H / 2));
                self.front.set(col, row, Cell::halves(top, bottom));
            }
        }
    }

    fn compose_footer(&mut self, w: &WorldState, view_rows: usize) {
        let msg_row = MAP_ROW + view_rows;
        if msg_row < self.front.height && !w.message.is_empty() {
            let msg = format!(" ◈ {} ", w.message);
            self.front.put_bar(msg_row, &msg, Color::Black, MSG_BG);
        }

        let help_row = msg_row + 2;
        if help_row < self.front.height {
            let help = " ←/→ A/D:Move  Space/W/↑:Jump  F1:Pause  F2:Restart  F3:Detectors  Tab:Next  Esc:Quit";
            self.front.put_str(0, help_row, help, Color::DarkGrey, Color::Reset);
        }
    }

    fn compose_pause_overlay(&mut self, view_rows: usize) {
        let dim = Color::Rgb { r: 40, g: 40, b: 40 };
        let hdr = Color::Rgb { r: 255, g: 220, b: 50 };
        let key_c = Color::Rgb { r: 100, g: 200, b: 255 };
        let blink = (self.frame / 30) % 2 == 0;

        // Center the overlay in the viewport
        let box_w = 30_usize.min(self.front.width);
        let box_h = 9_usize.min(view_rows);
        let box_x = self.front.width.saturating_sub(box_w) / 2;
        let box_y = MAP_ROW + view_rows.saturating_sub(box_h) / 2;

        for y in box_y..box_y + box_h {
            for x in box_x..box_x + box_w {
                self.front.set(x, y, Cell::from_char(' ', Color::Reset, dim));
            }
        }

        let label = if blink { "▶  PAUSED  ◀" } else { "   PAUSED   " };
        self.front.put_str(box_x + 9, box_y + 1, label, hdr, dim);
        self.front.put_str(box_x + 3, box_y + 3, "F1   Resume", key_c, dim);
        self.front.put_str(box_x + 3, box_y + 4, "F2   Restart level", key_c, dim);
        self.front.put_str(box_x + 3, box_y + 5, "Tab  Next level", key_c, dim);
        self.front.put_str(box_x + 3, box_y + 6, "Esc  Quit", key_c, dim);
    }
}

/// Color of one half block: actor over detectors over terrain.
fn sample(w: &WorldState, area: Rect) -> Option<Color> {
    let actor = &w.actor;
    if actor.rect.intersects(&area) {
        return Some(match actor.state {
            PhysicsState::Grounded => ACTOR_GROUNDED,
            PhysicsState::Airborne => ACTOR_AIRBORNE,
        });
    }
    if w.show_detectors {
        let d = actor.detectors();
        if d.floor.iter().any(|p| p.intersects(&area)) {
            return Some(FLOOR_PROBE);
        }
        if d.wall.intersects(&area) {
            return Some(WALL_PROBE);
        }
    }
    terrain_color(w, area)
}

/// Terrain sampled at the area's center; grass where the area above is open.
fn terrain_color(w: &WorldState, area: Rect) -> Option<Color> {
    let (cx, cy) = (area.x + area.w / 2, area.y + area.h / 2);
    if !w.map.pixel_solid(cx, cy) {
        return None;
    }
    if w.map.pixel_solid(cx, cy - area.h) {
        Some(SOIL)
    } else {
        Some(GRASS)
    }
}
