//! ASCII plotting for terminal output.
//!
//! This is intentionally "dumb" (fixed-size grid), optimized for:
//! - quick visual sanity checks in a terminal
//! - deterministic output (helpful for golden tests)
//!
//! Each series is drawn as a line in its fuel's glyph:
//! `P` propane, `G` natural gas, `E` electricity, `O` heating oil.
//! Gaps (e.g. summer months for heating fuels) break the line.

use crate::domain::{FuelType, PriceSeries, period_key};

pub fn glyph(fuel: FuelType) -> char {
    match fuel {
        FuelType::Propane => 'P',
        FuelType::NaturalGas => 'G',
        FuelType::Electricity => 'E',
        FuelType::HeatingOil => 'O',
    }
}

/// Months since year 0, so consecutive months differ by one.
pub fn month_index(year: i32, month: u32) -> i64 {
    year as i64 * 12 + (month as i64 - 1)
}

/// `(month_index, price)` points of a series, in period order.
pub fn series_points(series: &PriceSeries) -> Vec<(i64, f64)> {
    let mut pts: Vec<(i64, f64)> = series
        .points()
        .iter()
        .filter(|p| p.price.is_finite())
        .filter_map(|p| period_key(&p.period).map(|(y, m)| (month_index(y, m), p.price)))
        .collect();
    pts.sort_by_key(|(x, _)| *x);
    pts
}

/// Render one or more series on a shared grid.
pub fn render_ascii_plot(series: &[PriceSeries], width: usize, height: usize) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let lines: Vec<(char, Vec<(i64, f64)>)> = series
        .iter()
        .map(|s| (glyph(s.fuel), series_points(s)))
        .collect();

    let Some((x_min, x_max)) = x_range(&lines) else {
        return "Plot: no data\n".to_string();
    };
    let (y_min, y_max) = y_range(&lines).unwrap_or((0.0, 1.0));
    let (y_min, y_max) = pad_range(y_min, y_max, 0.05);

    let mut grid = vec![vec![' '; width]; height];
    for (ch, pts) in &lines {
        draw_series(&mut grid, pts, *ch, x_min, x_max, y_min, y_max);
    }

    // Build final string. We include a small header with ranges.
    let mut out = String::new();
    out.push_str(&format!(
        "Plot: months=[{}, {}] | y=[{y_min:.2}, {y_max:.2}] $/MMBtu\n",
        month_label(x_min),
        month_label(x_max)
    ));

    for row in grid {
        out.push_str(&row.into_iter().collect::<String>());
        out.push('\n');
    }

    out
}

pub fn month_label(index: i64) -> String {
    format!("{}-{:02}", index.div_euclid(12), index.rem_euclid(12) + 1)
}

fn x_range(lines: &[(char, Vec<(i64, f64)>)]) -> Option<(i64, i64)> {
    let min = lines.iter().flat_map(|(_, p)| p.iter().map(|(x, _)| *x)).min()?;
    let max = lines.iter().flat_map(|(_, p)| p.iter().map(|(x, _)| *x)).max()?;
    Some((min, max))
}

fn y_range(lines: &[(char, Vec<(i64, f64)>)]) -> Option<(f64, f64)> {
    let mut min_y = f64::INFINITY;
    let mut max_y = f64::NEG_INFINITY;
    for (_, pts) in lines {
        for &(_, y) in pts {
            min_y = min_y.min(y);
            max_y = max_y.max(y);
        }
    }

    if min_y.is_finite() && max_y.is_finite() && max_y > min_y {
        Some((min_y, max_y))
    } else if min_y.is_finite() && max_y.is_finite() {
        // Flat series: center it.
        Some((min_y - 0.5, max_y + 0.5))
    } else {
        None
    }
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let span = (max - min).abs();
    let pad = (span * frac).max(1e-12);
    (min - pad, max + pad)
}

fn map_x(x: i64, x_min: i64, x_max: i64, width: usize) -> usize {
    let width = width.max(2);
    if x_max == x_min {
        return 0;
    }
    let u = ((x - x_min) as f64 / (x_max - x_min) as f64).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let height = height.max(2);
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // y=top is max -> row 0
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

fn draw_series(
    grid: &mut [Vec<char>],
    pts: &[(i64, f64)],
    ch: char,
    x_min: i64,
    x_max: i64,
    y_min: f64,
    y_max: f64,
) {
    let height = grid.len();
    let width = grid[0].len();

    let mut prev: Option<(i64, usize, usize)> = None;
    for &(x, y) in pts {
        let gx = map_x(x, x_min, x_max, width);
        let gy = map_y(y, y_min, y_max, height);
        match prev {
            Some((px, x0, y0)) if x - px == 1 => draw_line(grid, x0, y0, gx, gy, ch),
            _ => grid[gy][gx] = ch,
        }
        prev = Some((x, gx, gy));
    }
}

/// Integer line drawing (Bresenham-ish).
fn draw_line(grid: &mut [Vec<char>], x0: usize, y0: usize, x1: usize, y1: usize, ch: char) {
    let mut x0 = x0 as isize;
    let mut y0 = y0 as isize;
    let x1 = x1 as isize;
    let y1 = y1 as isize;

    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if y0 >= 0 && (y0 as usize) < grid.len() && x0 >= 0 && (x0 as usize) < grid[0].len() {
            grid[y0 as usize][x0 as usize] = ch;
        }

        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}
