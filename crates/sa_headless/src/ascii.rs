//! ASCII battle view for terminal snapshots.
//!
//! [`AsciiCanvas`] implements the engine's [`Canvas`] hooks over a character
//! grid. [`render_game`] frames the battle's live area and adds a header and
//! a per-side legend.

use sa_core::entity::Side;
use sa_core::game::Game;
use sa_core::math::{Transform, Vec2};
use sa_core::render::{Canvas, ModuleState, ProjectileStyle};
use sa_core::spatial::Bounds;
use sa_core::units::Distance;

/// ASCII view configuration.
#[derive(Debug, Clone)]
pub struct AsciiConfig {
    /// Width of the viewport in characters.
    pub width: usize,
    /// Height of the viewport in characters.
    pub height: usize,
    /// Show the per-side legend.
    pub show_legend: bool,
    /// Use ANSI colours.
    pub use_color: bool,
}

impl Default for AsciiConfig {
    fn default() -> Self {
        Self {
            width: 80,
            height: 30,
            show_legend: true,
            use_color: true,
        }
    }
}

/// ANSI color codes.
mod colors {
    pub const RESET: &str = "\x1b[0m";
    pub const BOLD: &str = "\x1b[1m";

    pub const BLUE: &str = "\x1b[34m";
    pub const CYAN: &str = "\x1b[36m";
    pub const RED: &str = "\x1b[31m";
    pub const YELLOW: &str = "\x1b[33m";
    pub const GREEN: &str = "\x1b[32m";
    pub const GRAY: &str = "\x1b[90m";
}

fn side_color(side: Side) -> &'static str {
    match side {
        Side::Zero => colors::BLUE,
        Side::One => colors::YELLOW,
    }
}

fn health_color(health: f64) -> &'static str {
    if health > 0.66 {
        colors::GREEN
    } else if health > 0.33 {
        colors::YELLOW
    } else {
        colors::RED
    }
}

/// Module glyph by state.
fn module_char(state: ModuleState) -> char {
    match state {
        ModuleState::Intact { health } if health > 0.66 => '#',
        ModuleState::Intact { health } if health > 0.33 => '+',
        ModuleState::Intact { .. } => ':',
        ModuleState::Depowered => 'o',
        ModuleState::Destroyed => 'x',
    }
}

fn projectile_char(style: ProjectileStyle) -> char {
    match style {
        ProjectileStyle::Bullet => '*',
        ProjectileStyle::Missile => 'm',
        ProjectileStyle::Torpedo => 'T',
        ProjectileStyle::Mine => '%',
        ProjectileStyle::Junk => '&',
    }
}

// Draw layers; a cell keeps the glyph of the highest layer drawn on it.
const LAYER_SHIELD: u8 = 1;
const LAYER_BEAM: u8 = 2;
const LAYER_PROJECTILE: u8 = 3;
const LAYER_MODULE: u8 = 4;
const LAYER_MARKER: u8 = 5;

#[derive(Debug, Clone, Copy)]
struct Cell {
    ch: char,
    color: &'static str,
    layer: u8,
}

const EMPTY: Cell = Cell {
    ch: ' ',
    color: "",
    layer: 0,
};

/// Character grid covering a world rectangle. Up is positive y.
#[derive(Debug, Clone)]
pub struct AsciiCanvas {
    view: Bounds,
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl AsciiCanvas {
    /// Blank canvas showing `view` on `width` x `height` characters.
    #[must_use]
    pub fn new(view: Bounds, width: usize, height: usize) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        Self {
            view,
            width,
            height,
            cells: vec![EMPTY; width * height],
        }
    }

    /// Viewport width in characters.
    #[must_use]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Viewport height in characters.
    #[must_use]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Glyph at a character position, row 0 on top.
    #[must_use]
    pub fn char_at(&self, column: usize, row: usize) -> Option<char> {
        (column < self.width && row < self.height).then(|| self.cells[row * self.width + column].ch)
    }

    /// Character position of a world point, if it is in view.
    #[must_use]
    pub fn locate(&self, point: Vec2) -> Option<(usize, usize)> {
        let span_x = self.view.width().max(f64::EPSILON);
        let span_y = self.view.height().max(f64::EPSILON);
        let fx = (point.x - self.view.min.x) / span_x;
        let fy = (self.view.max.y - point.y) / span_y;
        if !(0.0..=1.0).contains(&fx) || !(0.0..=1.0).contains(&fy) {
            return None;
        }
        let column = ((fx * self.width as f64) as usize).min(self.width - 1);
        let row = ((fy * self.height as f64) as usize).min(self.height - 1);
        Some((column, row))
    }

    /// World distance covered by one character, the smaller axis.
    fn cell_size(&self) -> f64 {
        let x = self.view.width() / self.width as f64;
        let y = self.view.height() / self.height as f64;
        x.min(y).max(f64::EPSILON)
    }

    fn plot(&mut self, point: Vec2, ch: char, color: &'static str, layer: u8) {
        if let Some((column, row)) = self.locate(point) {
            let cell = &mut self.cells[row * self.width + column];
            if layer >= cell.layer {
                *cell = Cell { ch, color, layer };
            }
        }
    }

    fn line(&mut self, from: Vec2, to: Vec2, ch: char, color: &'static str, layer: u8) {
        let step = self.cell_size() * 0.5;
        let samples = ((from.distance(to) / step).ceil() as usize).clamp(1, 4096);
        for i in 0..=samples {
            let t = i as f64 / samples as f64;
            self.plot(from + (to - from) * t, ch, color, layer);
        }
    }

    /// Render the grid, one line per row.
    #[must_use]
    pub fn rows(&self, use_color: bool) -> Vec<String> {
        self.cells
            .chunks(self.width)
            .map(|row| {
                let mut line = String::with_capacity(self.width);
                for cell in row {
                    if use_color && !cell.color.is_empty() {
                        line.push_str(cell.color);
                        line.push(cell.ch);
                        line.push_str(colors::RESET);
                    } else {
                        line.push(cell.ch);
                    }
                }
                line
            })
            .collect()
    }
}

impl Canvas for AsciiCanvas {
    fn module_cell(
        &mut self,
        transform: Transform,
        width: f64,
        height: f64,
        side: Side,
        state: ModuleState,
    ) {
        let ch = module_char(state);
        let color = match state {
            ModuleState::Intact { health } if health < 1.0 => health_color(health),
            ModuleState::Intact { .. } => side_color(side),
            ModuleState::Depowered | ModuleState::Destroyed => colors::GRAY,
        };
        // Sample the footprint so large modules span several characters
        // when zoomed in.
        let step = self.cell_size().min(1.0) * 0.5;
        let nx = ((width / step).ceil() as usize).clamp(1, 64);
        let ny = ((height / step).ceil() as usize).clamp(1, 64);
        for i in 0..nx {
            for j in 0..ny {
                let local = Vec2 {
                    x: ((i as f64 + 0.5) / nx as f64 - 0.5) * width,
                    y: ((j as f64 + 0.5) / ny as f64 - 0.5) * height,
                };
                self.plot(transform.apply(local), ch, color, LAYER_MODULE);
            }
        }
    }

    fn shield_bubble(&mut self, center: Vec2, radius: Distance, strength: f64, flash: f64) {
        if strength <= 0.0 {
            return;
        }
        let color = if flash > 0.0 { colors::CYAN } else { colors::GRAY };
        let r = radius.as_cells();
        let step = self.cell_size() * 0.5;
        let samples = ((std::f64::consts::TAU * r / step).ceil() as usize).clamp(8, 4096);
        for i in 0..samples {
            let angle = std::f64::consts::TAU * i as f64 / samples as f64;
            let point = Vec2 {
                x: center.x + r * angle.cos(),
                y: center.y + r * angle.sin(),
            };
            self.plot(point, '.', color, LAYER_SHIELD);
        }
    }

    fn beam(&mut self, from: Vec2, to: Vec2, side: Side) {
        self.line(from, to, '~', side_color(side), LAYER_BEAM);
    }

    fn projectile(&mut self, from: Vec2, to: Vec2, side: Side, style: ProjectileStyle) {
        if style == ProjectileStyle::Bullet {
            self.line(from, to, '-', colors::GRAY, LAYER_PROJECTILE);
        }
        self.plot(to, projectile_char(style), side_color(side), LAYER_PROJECTILE);
    }

    fn unpowered_marker(&mut self, transform: Transform, _size: Distance) {
        self.plot(transform.position(), '!', colors::RED, LAYER_MARKER);
    }
}

fn border(left: char, fill: char, right: char, width: usize) -> String {
    let mut line = String::with_capacity(width + 2);
    line.push(left);
    line.extend(std::iter::repeat(fill).take(width));
    line.push(right);
    line
}

fn pad(text: &str, width: usize) -> String {
    let len = text.chars().count();
    if len >= width {
        text.chars().take(width).collect()
    } else {
        format!("{text}{}", " ".repeat(width - len))
    }
}

/// Render the current state of `game` as framed ASCII art.
#[must_use]
pub fn render_game(game: &Game, config: &AsciiConfig) -> String {
    let width = config.width.max(20);
    let height = config.height.max(4);
    let mut canvas = AsciiCanvas::new(game.bounds().expand(5.0), width, height);
    game.draw(&mut canvas);

    let stats = game.stats();
    let (bold, reset) = if config.use_color {
        (colors::BOLD, colors::RESET)
    } else {
        ("", "")
    };

    let mut lines = Vec::with_capacity(height + 6);
    let title = format!(
        " Tick {} | {:.1}s | {} ",
        stats.ticks,
        stats.elapsed.as_seconds(),
        stats.result
    );
    lines.push(format!("{bold}{}{reset}", border('╔', '═', '╗', width)));
    lines.push(format!("║{}║", pad(&title, width)));
    lines.push(border('╠', '═', '╣', width));
    for row in canvas.rows(config.use_color) {
        lines.push(format!("║{row}║"));
    }

    if config.show_legend {
        lines.push(border('╠', '═', '╣', width));
        for side in Side::BOTH {
            let i = side.index();
            let text = format!(
                " side {i}: {} ships, {} modules",
                stats.live_ships[i], stats.live_modules[i]
            );
            let padded = pad(&text, width);
            if config.use_color {
                lines.push(format!("║{}{padded}{}║", side_color(side), colors::RESET));
            } else {
                lines.push(format!("║{padded}║"));
            }
        }
        lines.push(format!(
            "║{}║",
            pad(" # intact  + damaged  : critical  o depowered  x wreck  ! no power", width)
        ));
    }
    lines.push(border('╚', '═', '╝', width));

    let mut output = lines.join("\n");
    output.push('\n');
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use sa_core::units::UnitExt;
    use sa_test_utils::fixtures;

    fn view() -> Bounds {
        Bounds {
            min: Vec2 { x: 0.0, y: 0.0 },
            max: Vec2 { x: 10.0, y: 10.0 },
        }
    }

    #[test]
    fn test_module_char() {
        assert_eq!(module_char(ModuleState::Intact { health: 1.0 }), '#');
        assert_eq!(module_char(ModuleState::Intact { health: 0.5 }), '+');
        assert_eq!(module_char(ModuleState::Intact { health: 0.1 }), ':');
        assert_eq!(module_char(ModuleState::Destroyed), 'x');
    }

    #[test]
    fn test_locate_flips_y() {
        let canvas = AsciiCanvas::new(view(), 10, 10);
        assert_eq!(canvas.locate(Vec2 { x: 0.5, y: 9.5 }), Some((0, 0)));
        assert_eq!(canvas.locate(Vec2 { x: 9.5, y: 0.5 }), Some((9, 9)));
        assert_eq!(canvas.locate(Vec2 { x: 10.0, y: 0.0 }), Some((9, 9)));
        assert_eq!(canvas.locate(Vec2 { x: -1.0, y: 5.0 }), None);
    }

    #[test]
    fn test_module_over_shield() {
        let mut canvas = AsciiCanvas::new(view(), 10, 10);
        let center = Vec2 { x: 5.5, y: 5.5 };
        canvas.module_cell(
            Transform::at(center, sa_core::units::Angle::ZERO),
            1.0,
            1.0,
            Side::Zero,
            ModuleState::Destroyed,
        );
        canvas.shield_bubble(center, Distance::cells(0.2), 1.0, 0.0);
        assert_eq!(canvas.char_at(5, 4), Some('x'));
    }

    #[test]
    fn test_beam_and_projectile() {
        let mut canvas = AsciiCanvas::new(view(), 10, 10);
        canvas.beam(Vec2 { x: 0.5, y: 0.5 }, Vec2 { x: 9.5, y: 0.5 }, Side::One);
        canvas.projectile(
            Vec2 { x: 2.5, y: 5.5 },
            Vec2 { x: 3.5, y: 5.5 },
            Side::Zero,
            ProjectileStyle::Torpedo,
        );
        assert!((0..10).all(|c| canvas.char_at(c, 9) == Some('~')));
        assert_eq!(canvas.char_at(3, 4), Some('T'));
    }

    #[test]
    fn test_plain_rows_have_fixed_width() {
        let canvas = AsciiCanvas::new(view(), 12, 3);
        let rows = canvas.rows(false);
        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|r| r.chars().count() == 12));
    }

    #[test]
    fn test_render_game_frame() {
        let game = fixtures::game(&fixtures::skirmish(), fixtures::quick_config(), 1);
        let config = AsciiConfig {
            width: 40,
            height: 16,
            show_legend: true,
            use_color: false,
        };
        let text = render_game(&game, &config);
        let lines: Vec<&str> = text.lines().collect();

        // Top border, title, separator, grid, separator, two sides, key, bottom.
        assert_eq!(lines.len(), 3 + 16 + 5);
        assert!(lines.iter().all(|l| l.chars().count() == 42));
        assert!(text.contains("Tick 0"));
        assert!(text.contains("side 1:"));
        assert!(text.contains('#'));
    }

    #[test]
    fn test_render_finished_game() {
        let mut game = fixtures::game(
            &fixtures::skirmish(),
            fixtures::quick_config().with_timeout(1.seconds()),
            4,
        );
        game.run_to_completion();
        let text = render_game(&game, &AsciiConfig::default());
        assert!(text.contains(&game.result().to_string()));
        assert!(text.contains("\x1b["));
    }
}
