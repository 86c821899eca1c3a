use academy_common::{
    bundles::SideBundle,
    field_support::FIELD_MAX_PERCENT,
    scene::{Frame, Point},
};

pub const GRID_COLS: usize = 60;
pub const GRID_ROWS: usize = 20;

const STROKE_GLYPH: char = '.';

/// Draws a frame as a bordered character grid. Tokens are placed by their
/// percentage position, strokes are converted from the pixel space of a
/// `field` sized container. Tokens later in the list are drawn on top.
pub fn render_grid(frame: &Frame, field: (f64, f64), cols: usize, rows: usize) -> String {
    let cols = cols.max(2);
    let rows = rows.max(2);
    let mut grid = vec![vec![' '; cols]; rows];

    let (width, height) = field;
    let strokes = frame.strokes.iter().chain(frame.current_stroke.iter());
    for point in strokes.flat_map(|s| s.points.iter()) {
        if let Some((col, row)) = pixel_cell(*point, width, height, cols, rows) {
            grid[row][col] = STROKE_GLYPH;
        }
    }

    for token in &frame.tokens {
        let col = percent_cell(token.x(), cols);
        let row = percent_cell(token.y(), rows);
        grid[row][col] = token.kind.glyph();
    }

    let border = format!("+{}+", "-".repeat(cols));
    let mut out = String::with_capacity((cols + 3) * (rows + 2));
    out.push_str(&border);
    out.push('\n');
    for line in grid {
        out.push('|');
        out.extend(line);
        out.push_str("|\n");
    }
    out.push_str(&border);
    out
}

/// One line describing what's on a frame
pub fn summary(frame: &Frame) -> String {
    let players: SideBundle<usize> = frame
        .tokens
        .iter()
        .filter_map(|t| t.kind.side())
        .fold(SideBundle::default(), |mut counts, side| {
            counts[side] += 1;
            counts
        });
    let others = frame.tokens.len() - players.team_a - players.team_b;

    let mut line = format!("{players}, {others} other tokens, {} strokes", frame.strokes.len());
    if frame.current_stroke.is_some() {
        line.push_str(" (+1 being drawn)");
    }
    line
}

fn percent_cell(percent: f64, cells: usize) -> usize {
    let scaled = (percent / FIELD_MAX_PERCENT * (cells - 1) as f64).round();
    (scaled.max(0.0) as usize).min(cells - 1)
}

fn pixel_cell(
    point: Point,
    width: f64,
    height: f64,
    cols: usize,
    rows: usize,
) -> Option<(usize, usize)> {
    if width <= 0.0 || height <= 0.0 {
        return None;
    }
    let x = point.x / width * FIELD_MAX_PERCENT;
    let y = point.y / height * FIELD_MAX_PERCENT;
    if !(0.0..=FIELD_MAX_PERCENT).contains(&x) || !(0.0..=FIELD_MAX_PERCENT).contains(&y) {
        return None;
    }
    Some((percent_cell(x, cols), percent_cell(y, rows)))
}
