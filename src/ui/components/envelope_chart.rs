use std::fmt::Write;

use crate::domain::{
    envelope::{LimitLine, PathSegment, PlottedPoint, Tick},
    Condition, EnvelopeScene, ScreenPoint, UnitSystem, ViewMode,
};

const COLS: usize = 64;
const ROWS: usize = 20;

/// Character-cell rendering of an envelope scene.
struct Canvas {
    cells: Vec<Vec<char>>,
}

impl Canvas {
    fn new() -> Self {
        Self {
            cells: vec![vec![' '; COLS]; ROWS],
        }
    }

    fn cell(scene: &EnvelopeScene, pos: ScreenPoint) -> (usize, usize) {
        let area = scene.projection.area;
        let fx = ((pos.x - area.left) / area.width).clamp(0.0, 1.0);
        let fy = ((pos.y - area.top) / area.height).clamp(0.0, 1.0);
        (
            (fx * (COLS - 1) as f64).round() as usize,
            (fy * (ROWS - 1) as f64).round() as usize,
        )
    }

    fn put(&mut self, (col, row): (usize, usize), ch: char) {
        self.cells[row][col] = ch;
    }

    fn line(&mut self, from: (usize, usize), to: (usize, usize), ch: char) {
        let (c0, r0) = (from.0 as f64, from.1 as f64);
        let (c1, r1) = (to.0 as f64, to.1 as f64);
        let steps = (c1 - c0).abs().max((r1 - r0).abs()).max(1.0) as usize;
        for i in 0..=steps {
            let t = i as f64 / steps as f64;
            let col = (c0 + (c1 - c0) * t).round() as usize;
            let row = (r0 + (r1 - r0) * t).round() as usize;
            if self.cells[row][col] == ' ' {
                self.cells[row][col] = ch;
            }
        }
    }
}

fn marker(point: &PlottedPoint) -> char {
    let ch = match point.condition {
        Condition::ZeroFuel => 'Z',
        Condition::TakeOff => 'T',
        Condition::Landing => 'L',
    };
    if point.within_limits {
        ch
    } else {
        ch.to_ascii_lowercase()
    }
}

pub fn render(scene: &EnvelopeScene, unit: UnitSystem) -> String {
    let mut canvas = Canvas::new();

    for line in &scene.limit_lines {
        let from = Canvas::cell(scene, line.start);
        let to = Canvas::cell(scene, line.end);
        canvas.line(from, to, ':');
    }
    for segment in &scene.flight_path {
        let from = Canvas::cell(scene, segment.start);
        let to = Canvas::cell(scene, segment.end);
        canvas.line(from, to, '.');
        let tip = Canvas::cell(scene, segment.arrow.tip);
        for wing in [segment.arrow.left, segment.arrow.right] {
            canvas.line(Canvas::cell(scene, wing), tip, '.');
        }
        canvas.put(tip, '>');
    }
    for point in &scene.points {
        canvas.put(Canvas::cell(scene, point.screen), marker(point));
    }

    let y_ticks = scene.y_ticks();
    let mut out = String::new();
    let _ = writeln!(out, "{}", scene.y_label);
    for (row, cells) in canvas.cells.iter().enumerate() {
        let label = y_label_for_row(scene, &y_ticks, row).unwrap_or_default();
        let line: String = cells.iter().collect();
        let _ = writeln!(out, "{label:>9} |{}", line.trim_end());
    }
    let _ = writeln!(out, "{:>9} +{}", "", "-".repeat(COLS));
    let _ = writeln!(out, "{:>10}{}", "", x_axis_labels(scene, &scene.x_ticks()));
    let _ = writeln!(out, "{:>10}{}", "", scene.x_label);

    for line in &scene.limit_lines {
        let _ = writeln!(out, "{}", limit_legend(scene.mode, line, unit));
    }
    if let Some(path) = path_legend(&scene.flight_path) {
        let _ = writeln!(out, "Path: {path}");
    }
    if scene.points.is_empty() {
        let _ = writeln!(out, "No weight loaded.");
    }
    for point in &scene.points {
        let _ = writeln!(out, "{}", point_details(point, unit));
    }
    out
}

fn limit_legend(mode: ViewMode, line: &LimitLine, unit: UnitSystem) -> String {
    match mode {
        ViewMode::CgWeight => format!(
            "Limits at {:.0} {}: CG {:.2} to {:.2} {}",
            line.from.1,
            unit.weight_unit(),
            line.from.0,
            line.to.0,
            unit.length_unit(),
        ),
        ViewMode::MacWeight => format!("Limit: {:.1}% MAC", line.from.0),
    }
}

/// "ZFW → TOW → LDW", or whatever part of it is present.
fn path_legend(segments: &[PathSegment]) -> Option<String> {
    let first = segments.first()?;
    let mut codes = vec![first.from.code()];
    codes.extend(segments.iter().map(|segment| segment.to.code()));
    Some(codes.join(" → "))
}

fn y_label_for_row(scene: &EnvelopeScene, ticks: &[Tick], row: usize) -> Option<String> {
    let left = scene.projection.area.left;
    ticks
        .iter()
        .find(|tick| Canvas::cell(scene, ScreenPoint::new(left, tick.position)).1 == row)
        .map(|tick| format!("{:.0}", tick.value))
}

fn x_axis_labels(scene: &EnvelopeScene, ticks: &[Tick]) -> String {
    let mut labels = vec![' '; COLS + 8];
    for tick in ticks {
        let col = Canvas::cell(scene, ScreenPoint::new(tick.position, scene.projection.area.top)).0;
        let text = format!("{:.1}", tick.value);
        let start = col.saturating_sub(text.len() / 2);
        for (i, ch) in text.chars().enumerate() {
            if let Some(slot) = labels.get_mut(start + i) {
                *slot = ch;
            }
        }
    }
    labels.into_iter().collect::<String>().trim_end().to_string()
}

/// Hover text for a plotted point.
pub fn point_details(point: &PlottedPoint, unit: UnitSystem) -> String {
    format!(
        "{} ({}): weight {:.1} {}, CG {:.3} {}, {:.2}% MAC, {}",
        point.condition.code(),
        point.condition.name(),
        point.data.weight,
        unit.weight_unit(),
        point.data.cg,
        unit.length_unit(),
        point.data.mac_percent,
        super::summary::status_label(point.within_limits),
    )
}
