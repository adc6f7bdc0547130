//! Fixed-grid ASCII charts: delay profiles, yearly delay vs exchange rate and
//! actual vs predicted delay per test day.
//!
//! Lines are drawn before markers, so observed points stay on top of
//! predicted lines.

use crate::report::{DayComparison, DelayProfile, YearlyRate};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Style {
    /// Connect consecutive points with `ch`.
    Line(char),
    /// Mark each point with `ch`.
    Points(char),
}

#[derive(Debug, Clone)]
pub struct Series {
    pub name: String,
    pub style: Style,
    pub points: Vec<(f64, f64)>,
}

/// Render series on a shared grid with a one-line header and a legend.
pub fn render_series(title: &str, series: &[Series], width: usize, height: usize) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let all = series.iter().flat_map(|s| s.points.iter().copied());
    let (x_min, x_max, y_min, y_max) = bounds(all).unwrap_or((0.0, 1.0, 0.0, 1.0));
    let (y_min, y_max) = pad_range(y_min, y_max, 0.05);

    let mut grid = vec![vec![' '; width]; height];

    let lines = series.iter().filter(|s| matches!(s.style, Style::Line(_)));
    let markers = series.iter().filter(|s| matches!(s.style, Style::Points(_)));
    for s in lines.chain(markers) {
        let cells: Vec<(usize, usize)> = s
            .points
            .iter()
            .map(|&(x, y)| (map_x(x, x_min, x_max, width), map_y(y, y_min, y_max, height)))
            .collect();
        match s.style {
            Style::Line(ch) => {
                if let [(x, y)] = cells.as_slice() {
                    grid[*y][*x] = ch;
                }
                for w in cells.windows(2) {
                    draw_line(&mut grid, w[0].0, w[0].1, w[1].0, w[1].1, ch);
                }
            }
            Style::Points(ch) => {
                for (x, y) in cells {
                    grid[y][x] = ch;
                }
            }
        }
    }

    let mut out = String::new();
    out.push_str(&format!(
        "{title}: x=[{x_min:.2}, {x_max:.2}] | y=[{y_min:.2}, {y_max:.2}]\n"
    ));
    for row in grid {
        out.push_str(row.into_iter().collect::<String>().trim_end());
        out.push('\n');
    }
    if series.len() > 1 {
        let legend: Vec<String> = series
            .iter()
            .map(|s| {
                let ch = match s.style {
                    Style::Line(c) | Style::Points(c) => c,
                };
                format!("{ch} {}", s.name)
            })
            .collect();
        out.push_str(&legend.join("  "));
        out.push('\n');
    }
    out
}

/// Mean delay against one calendar dimension.
pub fn render_profile(profile: &DelayProfile, width: usize, height: usize) -> String {
    let series = Series {
        name: "mean delay".to_string(),
        style: Style::Line('*'),
        points: profile.points.iter().map(|p| (p.key as f64, p.mean_delay)).collect(),
    };
    render_series(
        &format!("Mean delay (min) by {}", profile.dimension.label()),
        &[series],
        width,
        height,
    )
}

/// Yearly mean delay and exchange rate, each on its own grid.
pub fn render_yearly_rate(yearly: &[YearlyRate], width: usize, height: usize) -> String {
    let delay = Series {
        name: "mean delay".to_string(),
        style: Style::Line('*'),
        points: yearly.iter().map(|y| (y.year as f64, y.mean_delay)).collect(),
    };
    let rate = Series {
        name: "USD/CAD".to_string(),
        style: Style::Line('$'),
        points: yearly.iter().map(|y| (y.year as f64, y.mean_rate)).collect(),
    };
    let mut out = render_series("Mean delay (min) by Year", &[delay], width, height);
    out.push_str(&render_series("Mean exchange rate by Year", &[rate], width, height));
    out
}

/// Actual (`o`) vs predicted (`-`) delay over the hours of one test day.
pub fn render_day(day: &DayComparison, width: usize, height: usize) -> String {
    let actual = Series {
        name: "actual".to_string(),
        style: Style::Points('o'),
        points: day.hours.iter().map(|&(h, a, _)| (h as f64, a)).collect(),
    };
    let predicted = Series {
        name: "predicted".to_string(),
        style: Style::Line('-'),
        points: day.hours.iter().map(|&(h, _, p)| (h as f64, p)).collect(),
    };
    render_series(
        &format!("{} ({})", day.date, day.date.format("%a")),
        &[actual, predicted],
        width,
        height,
    )
}

fn bounds(points: impl Iterator<Item = (f64, f64)>) -> Option<(f64, f64, f64, f64)> {
    let mut x_min = f64::INFINITY;
    let mut x_max = f64::NEG_INFINITY;
    let mut y_min = f64::INFINITY;
    let mut y_max = f64::NEG_INFINITY;
    for (x, y) in points.filter(|(x, y)| x.is_finite() && y.is_finite()) {
        x_min = x_min.min(x);
        x_max = x_max.max(x);
        y_min = y_min.min(y);
        y_max = y_max.max(y);
    }
    if !(x_min.is_finite() && y_min.is_finite()) {
        return None;
    }
    if x_max <= x_min {
        x_max = x_min + 1.0;
    }
    if y_max <= y_min {
        y_max = y_min + 1.0;
    }
    Some((x_min, x_max, y_min, y_max))
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let span = (max - min).abs();
    let pad = (span * frac).max(1e-12);
    (min - pad, max + pad)
}

fn map_x(x: f64, x_min: f64, x_max: f64, width: usize) -> usize {
    let width = width.max(2);
    let u = ((x - x_min) / (x_max - x_min)).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let height = height.max(2);
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // y=top is max -> row 0
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

/// Integer line drawing (Bresenham-ish). Never overwrites a filled cell.
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
        if y0 >= 0
            && (y0 as usize) < grid.len()
            && x0 >= 0
            && (x0 as usize) < grid[0].len()
            && grid[y0 as usize][x0 as usize] == ' '
        {
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
