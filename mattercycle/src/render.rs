use crate::model::{Phase, RateReadout, SceneId, Substance, Tab, LENS_SPAN};
use crate::sim::{curve_max_time, curve_temp, ke_gauge, SimState};
use crossterm::{
    cursor, execute, queue,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal::{
        self, BeginSynchronizedUpdate, DisableLineWrap, EnableLineWrap, EndSynchronizedUpdate,
        EnterAlternateScreen, LeaveAlternateScreen,
    },
};
use std::io::{self, Stdout, Write};

#[derive(Clone, Copy, PartialEq, Eq)]
pub(crate) struct Cell {
    pub(crate) ch: char,
    pub(crate) fg: Color,
}

impl Default for Cell {
    fn default() -> Self {
        Self {
            ch: ' ',
            fg: Color::White,
        }
    }
}

pub(crate) struct CellBuffer {
    pub(crate) w: u16,
    pub(crate) h: u16,
    cells: Vec<Cell>,
}

impl CellBuffer {
    fn new(w: u16, h: u16) -> Self {
        Self {
            w,
            h,
            cells: vec![Cell::default(); w as usize * h as usize],
        }
    }

    fn idx(&self, x: u16, y: u16) -> usize {
        y as usize * self.w as usize + x as usize
    }

    pub(crate) fn set(&mut self, x: u16, y: u16, ch: char, fg: Color) {
        if x < self.w && y < self.h {
            let i = self.idx(x, y);
            self.cells[i] = Cell { ch, fg };
        }
    }

    pub(crate) fn text(&mut self, x: u16, y: u16, s: &str, fg: Color) {
        for (i, ch) in s.chars().enumerate() {
            self.set(x + i as u16, y, ch, fg);
        }
    }

    /// Like `text` but stops at `max` characters so panel content cannot run
    /// over a neighbouring border.
    pub(crate) fn text_clipped(&mut self, x: u16, y: u16, s: &str, fg: Color, max: u16) {
        for (i, ch) in s.chars().take(max as usize).enumerate() {
            self.set(x + i as u16, y, ch, fg);
        }
    }

    fn clear(&mut self) {
        self.cells.fill(Cell::default());
    }
}

pub(crate) struct Terminal {
    pub(crate) cols: u16,
    pub(crate) rows: u16,
    pub(crate) cur: CellBuffer,
    prev: CellBuffer,
    out: Stdout,
}

impl Terminal {
    pub(crate) fn begin() -> anyhow::Result<Self> {
        let mut out = io::stdout();
        execute!(out, EnterAlternateScreen, DisableLineWrap, cursor::Hide)?;
        terminal::enable_raw_mode()?;
        let (cols, rows) = terminal::size()?;
        Ok(Self {
            cols,
            rows,
            cur: CellBuffer::new(cols, rows),
            prev: CellBuffer::new(cols, rows),
            out,
        })
    }

    pub(crate) fn end(&mut self) -> anyhow::Result<()> {
        terminal::disable_raw_mode()?;
        execute!(
            self.out,
            ResetColor,
            cursor::Show,
            EnableLineWrap,
            LeaveAlternateScreen
        )?;
        Ok(())
    }

    pub(crate) fn resize_if_needed(&mut self) -> anyhow::Result<bool> {
        let (cols, rows) = terminal::size()?;
        if cols != self.cols || rows != self.rows {
            self.cols = cols;
            self.rows = rows;
            self.cur = CellBuffer::new(cols, rows);
            self.prev = CellBuffer::new(cols, rows);
            execute!(self.out, terminal::Clear(terminal::ClearType::All))?;
            return Ok(true);
        }
        Ok(false)
    }

    pub(crate) fn present(&mut self, enable_color: bool) -> anyhow::Result<()> {
        queue!(self.out, BeginSynchronizedUpdate)?;
        let mut last_fg: Option<Color> = None;
        for y in 0..self.rows {
            for x in 0..self.cols {
                let i = self.cur.idx(x, y);
                if self.cur.cells[i] == self.prev.cells[i] {
                    continue;
                }
                let c = self.cur.cells[i];
                queue!(self.out, cursor::MoveTo(x, y))?;
                if enable_color && last_fg != Some(c.fg) {
                    queue!(self.out, SetForegroundColor(c.fg))?;
                    last_fg = Some(c.fg);
                }
                queue!(self.out, Print(c.ch))?;
            }
        }
        queue!(self.out, ResetColor, EndSynchronizedUpdate)?;
        self.out.flush()?;
        std::mem::swap(&mut self.cur, &mut self.prev);
        self.cur.clear();
        Ok(())
    }
}

const EDGE: Color = Color::Rgb { r: 90, g: 110, b: 150 };
const TEXT: Color = Color::Rgb { r: 210, g: 220, b: 245 };
const DIM: Color = Color::Rgb { r: 150, g: 165, b: 190 };
const HOT: Color = Color::Rgb { r: 239, g: 68, b: 68 };
const COOL: Color = Color::Rgb { r: 59, g: 130, b: 246 };
const HAZE: Color = Color::Rgb { r: 139, g: 92, b: 246 };

fn phase_color(phase: Phase) -> Color {
    match phase {
        Phase::Solid => Color::Rgb { r: 245, g: 158, b: 11 },
        Phase::Liquid => Color::Rgb { r: 96, g: 165, b: 250 },
        Phase::Gas => Color::Rgb { r: 167, g: 243, b: 208 },
        Phase::Melting | Phase::Boiling => HOT,
    }
}

fn draw_box(buf: &mut CellBuffer, x: u16, y: u16, w: u16, h: u16) {
    if w < 2 || h < 2 {
        return;
    }
    for i in 1..w - 1 {
        buf.set(x + i, y, '─', EDGE);
        buf.set(x + i, y + h - 1, '─', EDGE);
    }
    for j in 1..h - 1 {
        buf.set(x, y + j, '│', EDGE);
        buf.set(x + w - 1, y + j, '│', EDGE);
    }
    buf.set(x, y, '╭', EDGE);
    buf.set(x + w - 1, y, '╮', EDGE);
    buf.set(x, y + h - 1, '╰', EDGE);
    buf.set(x + w - 1, y + h - 1, '╯', EDGE);
}

fn draw_stage(buf: &mut CellBuffer, st: &SimState, x: u16, y: u16, w: u16, h: u16) {
    draw_box(buf, x, y, w, h);
    buf.text(x + 2, y, &format!(" {} ", st.scene.name()), TEXT);
    if w < 12 || h < 7 {
        return;
    }
    let ix = x + 2;
    let iy = y + 2;
    let iw = w - 4;
    let ih = h - 4;
    match st.scene {
        SceneId::ParticleEvidence => {
            // beaker of dye; more drops mix the haze away
            let haze = (1.0 - st.controls.area / 3.0).max(0.0);
            let glyph = if haze > 0.4 {
                '▓'
            } else if haze > 0.15 {
                '▒'
            } else {
                '░'
            };
            for yy in iy + ih / 3..iy + ih {
                for xx in ix..ix + iw {
                    buf.set(xx, yy, glyph, HAZE);
                }
            }
            buf.text(ix, iy + ih / 3 - 1, "dye drops ↓", DIM);
        }
        SceneId::DiffusionRate => {
            let mid = iy + ih / 2;
            for xx in ix..ix + iw {
                buf.set(xx, mid, '─', EDGE);
            }
            buf.text(ix + 1, iy, "hot water", HOT);
            buf.text(ix + 1, mid + 1, "cold water", COOL);
            // dye spread widens as diffusion time shrinks
            let spread = match st.rate {
                RateReadout::Value(t) => ((20.0 / t).min(iw as f32 / 2.0)) as u16,
                RateReadout::Phase(_) => 1,
            };
            let cx = ix + iw / 2;
            for d in 0..=spread {
                buf.set(cx + d, iy + ih / 4, '•', HOT);
                buf.set(cx.saturating_sub(d), iy + ih / 4, '•', HOT);
                buf.set(cx + d / 2, mid + ih / 4, '•', COOL);
                buf.set(cx.saturating_sub(d / 2), mid + ih / 4, '•', COOL);
            }
        }
        SceneId::StatesOfMatter => {
            // fill height follows the reported volume
            let vol = st.secondary;
            let fill = ((vol / 120.0).clamp(0.0, 1.0) * (ih - 1) as f32) as u16;
            for j in 0..fill {
                let yy = iy + ih - 1 - j;
                for xx in ix..ix + iw {
                    buf.set(xx, yy, '▒', phase_color(st.phase));
                }
            }
            buf.text(ix, iy, "sealed container", DIM);
        }
        SceneId::LatentHeat => draw_curve_chart(buf, st, ix, iy, iw, ih),
        SceneId::Evaporation => {
            let surface = iy + ih * 2 / 3;
            for xx in ix..ix + iw {
                buf.set(xx, surface, '~', COOL);
            }
            for yy in surface + 1..iy + ih {
                for xx in ix..ix + iw {
                    buf.set(xx, yy, '≈', COOL);
                }
            }
            // transient vapor motes rising off the surface
            for m in &st.vapor {
                let fx = (m.x / 100.0).clamp(0.0, 1.0);
                let fy = (m.y / 100.0).clamp(0.0, 1.0);
                let xx = ix + (fx * (iw - 1) as f32) as u16;
                let yy = iy + (fy * (ih - 1) as f32) as u16;
                if yy <= surface {
                    buf.set(xx, yy, '°', TEXT);
                }
            }
            buf.text(ix, iy, &format!("wind → {:.0}", st.controls.wind), DIM);
        }
    }
}

fn draw_curve_chart(buf: &mut CellBuffer, st: &SimState, x: u16, y: u16, w: u16, h: u16) {
    if w < 6 || h < 4 {
        return;
    }
    let max_t = curve_max_time();
    let temp_to_row = |temp: f32| -> u16 {
        let f = ((temp + 20.0) / 140.0).clamp(0.0, 1.0);
        y + h - 1 - (f * (h - 1) as f32).round() as u16
    };
    for col in 0..w {
        let time = col as f32 / (w - 1).max(1) as f32 * max_t;
        buf.set(x + col, temp_to_row(curve_temp(time)), '·', DIM);
    }
    let pos = st.curve_position();
    let cur_col = (pos / max_t * (w - 1) as f32).round() as u16;
    buf.set(x + cur_col.min(w - 1), temp_to_row(st.controls.temp), '●', HOT);
    buf.text(x, y, "°C", DIM);
    let label = "heat added →";
    if w as usize > label.len() {
        buf.text(x + w - label.len() as u16, y + h - 1, label, DIM);
    }
}

fn draw_lens(buf: &mut CellBuffer, st: &SimState, x: u16, y: u16, w: u16, h: u16) {
    draw_box(buf, x, y, w, h);
    buf.text(x + 2, y, " Micro View ", TEXT);
    if w < 6 || h < 4 {
        return;
    }
    let iw = (w - 2) as f32;
    let ih = (h - 2) as f32;
    let glyph = match st.phase {
        Phase::Solid => '◆',
        Phase::Liquid => '●',
        Phase::Gas => '○',
        Phase::Melting | Phase::Boiling => '◉',
    };
    for d in &st.dots {
        let xx = x + 1 + ((d.x / LENS_SPAN) * (iw - 1.0)).clamp(0.0, iw - 1.0) as u16;
        let yy = y + 1 + ((d.y / LENS_SPAN) * (ih - 1.0)).clamp(0.0, ih - 1.0) as u16;
        buf.set(xx, yy, glyph, phase_color(st.phase));
    }
    let state_line = format!("state: {}", st.phase.label());
    buf.text(x + 2, y + h - 1, &state_line, phase_color(st.phase));
}

fn draw_gauge(buf: &mut CellBuffer, st: &SimState, x: u16, y: u16, h: u16) {
    let fill = ke_gauge(st.controls.temp);
    let lit = ((fill / 100.0) * h as f32).round() as u16;
    for j in 0..h {
        let from_bottom = h - 1 - j;
        let on = from_bottom < lit;
        let color = if from_bottom as f32 / h.max(1) as f32 > 0.5 {
            HOT
        } else {
            COOL
        };
        buf.set(x, y + j, if on { '█' } else { '░' }, if on { color } else { EDGE });
    }
    buf.text(x.saturating_sub(2), y + h, &format!("KE {:>3.0}", fill), DIM);
}

fn draw_controls(buf: &mut CellBuffer, st: &SimState, x: u16, y: u16, w: u16, h: u16) {
    draw_box(buf, x, y, w, h);
    buf.text(x + 2, y, " Controls ", TEXT);
    let mut row = y + 1;
    for id in st.scene.controls() {
        if row >= y + h - 1 {
            break;
        }
        let d = id.desc();
        let v = st.controls.get(*id);
        let frac = ((v - d.min) / (d.max - d.min)).clamp(0.0, 1.0);
        let bar_w = (w.saturating_sub(24)).max(6);
        let filled = (frac * bar_w as f32).round() as u16;
        let mut bar = String::new();
        for i in 0..bar_w {
            bar.push(if i < filled { '■' } else { '·' });
        }
        let line = format!("{:<12} {bar} {:>6.1}{}", d.label, v, d.unit);
        buf.text_clipped(x + 2, row, &line, TEXT, w.saturating_sub(4));
        row += 1;
    }
    if row < y + h - 1 {
        let subs: Vec<&str> = Substance::all().iter().map(|s| s.name()).collect();
        let line = format!("Substance: {}  ({})", st.substance.name(), subs.join("/"));
        buf.text_clipped(x + 2, row, &line, DIM, w.saturating_sub(4));
    }
}

fn draw_tabs(buf: &mut CellBuffer, st: &SimState, x: u16, y: u16, w: u16, h: u16) {
    draw_box(buf, x, y, w, h);
    let mut cx = x + 2;
    for tab in Tab::all() {
        let color = if *tab == st.tab { HOT } else { DIM };
        buf.text(cx, y, tab.title(), color);
        cx += tab.title().len() as u16 + 2;
    }
    for (j, line) in st.tab.body().iter().enumerate() {
        let yy = y + 1 + j as u16;
        if yy >= y + h - 1 {
            break;
        }
        buf.text_clipped(x + 2, yy, line, TEXT, w.saturating_sub(4));
    }
    if st.phase.is_plateau() {
        let badge = format!("{} plateau!", st.phase.label());
        buf.text(x + w - badge.len() as u16 - 2, y, &badge, HOT);
    }
}

pub(crate) fn frame(term: &mut Terminal, st: &SimState) {
    let w = term.cols;
    let h = term.rows;
    let buf = &mut term.cur;
    if w < 60 || h < 20 {
        buf.text(0, 0, "mattercycle needs at least a 60x20 terminal", HOT);
        return;
    }

    let rate_text = match st.rate {
        RateReadout::Value(v) => format!("{v:.2} {}", st.scene.rate_unit()),
        RateReadout::Phase(p) => p.label().to_string(),
    };
    let line1 = format!(
        "Matter Cycle  [{}]  {}: {}  {}: {:.2}{}",
        st.scene.name(),
        st.scene.rate_label(),
        rate_text,
        st.scene.secondary_label(),
        st.secondary,
        if st.running { "" } else { "  [PAUSED]" }
    );
    buf.text(0, 0, &line1, TEXT);
    buf.text(
        0,
        1,
        "Keys: 1-5 scene  ↑/↓ temp  ←/→ wind  [/] area  -/= pressure  S substance  Space run  R reset  T tab  Q quit",
        DIM,
    );

    let tab_h = 6u16;
    let ctrl_h = 7u16;
    let body_y = 2;
    let body_h = h - body_y - tab_h;
    let stage_w = w * 11 / 20;
    let right_x = stage_w + 1;
    let right_w = w - right_x - 5;

    draw_stage(buf, st, 0, body_y, stage_w, body_h);
    draw_lens(buf, st, right_x, body_y, right_w, body_h - ctrl_h);
    draw_controls(buf, st, right_x, body_y + body_h - ctrl_h, right_w, ctrl_h);
    draw_gauge(buf, st, w - 3, body_y + 1, body_h.saturating_sub(3));
    draw_tabs(buf, st, 0, h - tab_h, w, tab_h);
}
