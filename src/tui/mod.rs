//! Ratatui-based terminal UI.
//!
//! The dashboard is keyed by state: a settings panel selects the state, the
//! fuel (or all four), and the year range; the chart shows the resulting
//! $/MMBtu series and a side table summarizes the latest month per fuel.

use std::io;
use std::time::Duration;

use chrono::NaiveDate;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use plotters::style::RGBColor;
use ratatui::{
    Terminal,
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Row, Table},
};

use crate::app::pipeline::{FuelComparison, compare_fuels, monthly_price_per_btu};
use crate::cli::TuiArgs;
use crate::data::EiaClient;
use crate::domain::{ConversionTable, FuelType, PriceSeries, RegionCode, geo};
use crate::error::AppError;
use crate::plot::ascii::{month_label, series_points};

mod plotters_chart;

use plotters_chart::{ChartLine, PricePlottersChart};

const FIRST_YEAR: i32 = 2000;
const LAST_YEAR: i32 = 2100;
const FIELD_COUNT: usize = 4;

/// Start the TUI.
pub fn run(args: TuiArgs) -> Result<(), AppError> {
    let mut app = App::new(args)?;

    let _guard = TerminalGuard::new()?;

    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal =
        Terminal::new(backend).map_err(|e| AppError::terminal(format!("Failed to initialize terminal: {e}")))?;

    app.refresh();
    app.event_loop(&mut terminal)
}

/// Ensures the terminal is restored (raw mode, alternate screen) on exit.
struct TerminalGuard;

impl TerminalGuard {
    fn new() -> Result<Self, AppError> {
        enable_raw_mode().map_err(|e| AppError::terminal(format!("Failed to enable raw mode: {e}")))?;
        if let Err(e) = execute!(io::stdout(), EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(AppError::terminal(format!("Failed to enter alternate screen: {e}")));
        }
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
    }
}

/// Dashboard selections.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Settings {
    state_idx: usize,
    /// `None` shows every fuel.
    fuel: Option<FuelType>,
    start_year: i32,
    end_year: i32,
}

impl Settings {
    fn from_args(args: &TuiArgs) -> Result<Self, AppError> {
        let region = RegionCode::parse(&args.state)?;
        let state_idx = geo::state_index(region.as_str())
            .ok_or_else(|| AppError::unsupported(format!("Unknown state code: {region}")))?;
        if args.end_year < args.start_year {
            return Err(AppError::unsupported(format!(
                "End year {} is before start year {}.",
                args.end_year, args.start_year
            )));
        }
        Ok(Self {
            state_idx,
            fuel: args.fuel,
            start_year: args.start_year.clamp(FIRST_YEAR, LAST_YEAR),
            end_year: args.end_year.clamp(FIRST_YEAR, LAST_YEAR),
        })
    }

    fn region(&self) -> Result<RegionCode, AppError> {
        RegionCode::parse(geo::STATES[self.state_idx].code)
    }

    /// `[Jan 1 of start_year, Jan 1 after end_year)`.
    fn date_range(&self) -> Result<(NaiveDate, NaiveDate), AppError> {
        let start = NaiveDate::from_ymd_opt(self.start_year, 1, 1);
        let end = NaiveDate::from_ymd_opt(self.end_year + 1, 1, 1);
        match (start, end) {
            (Some(start), Some(end)) => Ok((start, end)),
            _ => Err(AppError::unsupported(format!(
                "Invalid year range {}..{}.",
                self.start_year, self.end_year
            ))),
        }
    }

    fn fuel_label(&self) -> &'static str {
        self.fuel.map(FuelType::display_name).unwrap_or("All fuels")
    }

    fn adjust(&mut self, field: usize, delta: i32) {
        match field {
            0 => {
                let n = geo::STATES.len();
                self.state_idx = if delta >= 0 {
                    (self.state_idx + 1) % n
                } else {
                    (self.state_idx + n - 1) % n
                };
            }
            1 => self.fuel = cycle_fuel(self.fuel, delta),
            2 => {
                // Start never passes end.
                self.start_year = (self.start_year + delta).clamp(FIRST_YEAR, self.end_year);
            }
            3 => {
                self.end_year = (self.end_year + delta).clamp(self.start_year, LAST_YEAR);
            }
            _ => {}
        }
    }
}

/// All fuels -> Propane -> ... -> HeatingOil -> All fuels.
fn cycle_fuel(cur: Option<FuelType>, delta: i32) -> Option<FuelType> {
    let first = FuelType::ALL[0];
    let last = FuelType::ALL[FuelType::ALL.len() - 1];
    match (cur, delta >= 0) {
        (None, true) => Some(first),
        (None, false) => Some(last),
        (Some(f), true) if f == last => None,
        (Some(f), false) if f == first => None,
        (Some(f), true) => Some(f.next()),
        (Some(f), false) => Some(f.prev()),
    }
}

struct App {
    settings: Settings,
    selected_field: usize,
    status: String,
    eia: EiaClient,
    table: ConversionTable,
    result: Option<FuelComparison>,
    /// Settings the current `result` was fetched with.
    fetched: Option<Settings>,
}

impl App {
    fn new(args: TuiArgs) -> Result<Self, AppError> {
        let settings = Settings::from_args(&args)?;
        let eia = EiaClient::from_env()?;
        Ok(Self {
            settings,
            selected_field: 0,
            status: "Press Enter to fetch.".to_string(),
            eia,
            table: ConversionTable::standard(),
            result: None,
            fetched: None,
        })
    }

    fn event_loop<B: ratatui::backend::Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<(), AppError> {
        let mut needs_redraw = true;
        loop {
            if needs_redraw {
                terminal
                    .draw(|f| self.draw(f))
                    .map_err(|e| AppError::terminal(format!("Terminal draw error: {e}")))?;
                needs_redraw = false;
            }

            if !event::poll(Duration::from_millis(100))
                .map_err(|e| AppError::terminal(format!("Event poll error: {e}")))?
            {
                continue;
            }

            match event::read().map_err(|e| AppError::terminal(format!("Event read error: {e}")))? {
                Event::Key(key) => {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    if self.handle_key(key.code) {
                        break;
                    }
                    needs_redraw = true;
                }
                Event::Resize(_, _) => {
                    needs_redraw = true;
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Returns `true` when the app should quit.
    fn handle_key(&mut self, code: KeyCode) -> bool {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => return true,
            KeyCode::Up => {
                if self.selected_field > 0 {
                    self.selected_field -= 1;
                }
            }
            KeyCode::Down => {
                if self.selected_field + 1 < FIELD_COUNT {
                    self.selected_field += 1;
                }
            }
            KeyCode::Left => self.adjust_field(-1),
            KeyCode::Right => self.adjust_field(1),
            KeyCode::Enter | KeyCode::Char('r') => self.refresh(),
            _ => {}
        }
        false
    }

    fn adjust_field(&mut self, delta: i32) {
        self.settings.adjust(self.selected_field, delta);
        self.status = if self.fetched.as_ref() == Some(&self.settings) {
            "Up to date.".to_string()
        } else {
            "Settings changed. Press Enter to fetch.".to_string()
        };
    }

    /// Fetch for the current settings. Failures land in the status line.
    fn refresh(&mut self) {
        match self.fetch() {
            Ok(result) => {
                let n = result.series.len();
                let failed = result.failures.len();
                self.status = if failed == 0 {
                    format!("Fetched {n} series for {}.", result.region)
                } else {
                    format!("Fetched {n} series for {}, {failed} failed.", result.region)
                };
                self.result = Some(result);
                self.fetched = Some(self.settings.clone());
            }
            Err(err) => {
                log::warn!("dashboard fetch failed: {err}");
                self.status = format!("Fetch failed: {err}");
            }
        }
    }

    fn fetch(&self) -> Result<FuelComparison, AppError> {
        let region = self.settings.region()?;
        let (start, end) = self.settings.date_range()?;
        match self.settings.fuel {
            None => Ok(compare_fuels(&self.eia, &self.table, &region, start, end)),
            Some(fuel) => {
                let series = monthly_price_per_btu(&self.eia, &self.table, fuel, &region, start, end)?;
                Ok(FuelComparison {
                    region,
                    series: vec![series],
                    failures: Vec::new(),
                })
            }
        }
    }

    fn draw(&mut self, frame: &mut ratatui::Frame<'_>) {
        let size = frame.area();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(4), Constraint::Min(0), Constraint::Length(3)])
            .split(size);

        self.draw_header(frame, chunks[0]);
        self.draw_body(frame, chunks[1]);
        self.draw_footer(frame, chunks[2]);
    }

    fn draw_header(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let state = &geo::STATES[self.settings.state_idx];
        let mut lines: Vec<Line> = Vec::new();
        lines.push(Line::from(vec![
            Span::styled("btu", Style::default().fg(Color::Cyan)),
            Span::raw(" - residential energy prices per MMBtu (EIA)"),
        ]));
        lines.push(Line::from(Span::styled(
            format!(
                "state: {} ({}) | fuel: {} | years: {}-{}",
                state.name,
                state.code,
                self.settings.fuel_label(),
                self.settings.start_year,
                self.settings.end_year,
            ),
            Style::default().fg(Color::Gray),
        )));

        let p = Paragraph::new(Text::from(lines)).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }

    fn draw_body(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(8)])
            .split(area);
        let bottom = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
            .split(rows[1]);

        self.draw_chart(frame, rows[0]);
        self.draw_settings(frame, bottom[0]);
        self.draw_latest(frame, bottom[1]);
    }

    fn draw_chart(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let block = Block::default().title("Price per MMBtu").borders(Borders::ALL);
        let inner = block.inner(area);
        frame.render_widget(block, area);
        frame.render_widget(Clear, inner);

        let lines = self.result.as_ref().map(|r| chart_lines(&r.series)).unwrap_or_default();
        let Some((x_bounds, y_bounds)) = chart_bounds(&lines) else {
            let text = if self.result.is_some() { "No data for this selection." } else { "Waiting for data..." };
            let msg = Paragraph::new(text)
                .style(Style::default().fg(Color::Yellow))
                .block(Block::default());
            frame.render_widget(msg, inner);
            return;
        };

        let (chart_rect, insets) = chart_layout(inner);
        let widget = PricePlottersChart {
            lines: &lines,
            x_bounds,
            y_bounds,
            x_label: "month",
            y_label: "$/MMBtu",
            fmt_x: fmt_axis_month,
            fmt_y: fmt_axis_price,
        };

        frame.render_widget(widget, chart_rect);
        if let Some(insets) = insets {
            draw_axis_ticks(frame, inner, chart_rect, insets, x_bounds, y_bounds);
        }
    }

    fn draw_settings(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let state = &geo::STATES[self.settings.state_idx];
        let items = vec![
            ListItem::new(format!("State: {} ({})", state.name, state.code)),
            ListItem::new(format!("Fuel: {}", self.settings.fuel_label())),
            ListItem::new(format!("Start year: {}", self.settings.start_year)),
            ListItem::new(format!("End year: {}", self.settings.end_year)),
        ];

        let list = List::new(items)
            .block(Block::default().title("Settings").borders(Borders::ALL))
            .highlight_style(Style::default().fg(Color::Black).bg(Color::White))
            .highlight_symbol("» ");

        let mut state = ratatui::widgets::ListState::default();
        state.select(Some(self.selected_field));
        frame.render_stateful_widget(list, area, &mut state);
    }

    fn draw_latest(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let block = Block::default().title("Latest month").borders(Borders::ALL);
        let Some(result) = &self.result else {
            frame.render_widget(Paragraph::new("-").block(block), area);
            return;
        };

        let mut rows: Vec<Row> = result
            .series
            .iter()
            .map(|s| {
                let (period, price) = s
                    .points()
                    .last()
                    .map(|p| (p.period.clone(), format!("{:.3}", p.price)))
                    .unwrap_or_else(|| ("-".to_string(), "-".to_string()));
                let mean = s.stats().map(|st| format!("{:.3}", st.mean)).unwrap_or_else(|| "-".to_string());
                Row::new(vec![s.fuel.display_name().to_string(), period, price, mean])
                    .style(Style::default().fg(fuel_color(s.fuel)))
            })
            .collect();
        for (fuel, err) in &result.failures {
            rows.push(
                Row::new(vec![fuel.display_name().to_string(), "error".to_string(), err.to_string()])
                    .style(Style::default().fg(Color::Red)),
            );
        }

        let table = Table::new(
            rows,
            [
                Constraint::Length(12),
                Constraint::Length(8),
                Constraint::Length(10),
                Constraint::Min(8),
            ],
        )
        .header(
            Row::new(vec!["fuel", "period", "$/MMBtu", "mean"])
                .style(Style::default().add_modifier(Modifier::BOLD)),
        )
        .block(block);
        frame.render_widget(table, area);
    }

    fn draw_footer(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let help = "↑/↓ select  ←/→ adjust  Enter fetch  q quit";
        let line = Line::from(vec![
            Span::styled(help, Style::default().fg(Color::Gray)),
            Span::raw(" | "),
            Span::styled(&self.status, Style::default().fg(Color::Yellow)),
        ]);
        let p = Paragraph::new(line).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }
}

fn fuel_color(fuel: FuelType) -> Color {
    let RGBColor(r, g, b) = fuel_rgb(fuel);
    Color::Rgb(r, g, b)
}

fn fuel_rgb(fuel: FuelType) -> RGBColor {
    match fuel {
        FuelType::Propane => RGBColor(255, 165, 0),
        FuelType::NaturalGas => RGBColor(0, 255, 255),
        FuelType::Electricity => RGBColor(255, 255, 0),
        FuelType::HeatingOil => RGBColor(255, 0, 255),
    }
}

/// Build chart lines for Plotters, one per non-empty series.
fn chart_lines(series: &[PriceSeries]) -> Vec<ChartLine> {
    series
        .iter()
        .map(|s| ChartLine {
            points: series_points(s).into_iter().map(|(x, y)| (x as f64, y)).collect(),
            color: fuel_rgb(s.fuel),
        })
        .filter(|line| !line.points.is_empty())
        .collect()
}

/// X and Y bounds covering every line, with 5% vertical padding.
fn chart_bounds(lines: &[ChartLine]) -> Option<([f64; 2], [f64; 2])> {
    let (mut x_min, mut x_max) = (f64::INFINITY, f64::NEG_INFINITY);
    let (mut y_min, mut y_max) = (f64::INFINITY, f64::NEG_INFINITY);
    for &(x, y) in lines.iter().flat_map(|l| l.points.iter()) {
        x_min = x_min.min(x);
        x_max = x_max.max(x);
        y_min = y_min.min(y);
        y_max = y_max.max(y);
    }
    if !x_min.is_finite() || !y_min.is_finite() {
        return None;
    }

    // A single month still needs a non-empty range.
    if x_max <= x_min {
        x_min -= 0.5;
        x_max += 0.5;
    }
    if y_max <= y_min {
        y_min -= 0.5;
        y_max += 0.5;
    }

    let pad = ((y_max - y_min).abs() * 0.05).max(1e-12);
    Some(([x_min, x_max], [y_min - pad, y_max + pad]))
}

fn fmt_axis_month(v: f64) -> String {
    month_label(v.round() as i64)
}

fn fmt_axis_price(v: f64) -> String {
    format!("{v:.1}")
}

#[derive(Debug, Clone, Copy)]
struct AxisInsets {
    left: u16,
    right: u16,
    top: u16,
    bottom: u16,
}

fn chart_layout(inner: Rect) -> (Rect, Option<AxisInsets>) {
    let insets = AxisInsets {
        left: 8,
        right: 2,
        top: 1,
        bottom: 2,
    };

    if inner.width <= insets.left + insets.right + 10 || inner.height <= insets.top + insets.bottom + 5 {
        return (inner, None);
    }

    let rect = Rect {
        x: inner.x + insets.left,
        y: inner.y + insets.top,
        width: inner.width - insets.left - insets.right,
        height: inner.height - insets.top - insets.bottom,
    };

    (rect, Some(insets))
}

fn draw_axis_ticks(
    frame: &mut ratatui::Frame<'_>,
    inner: Rect,
    chart: Rect,
    insets: AxisInsets,
    x_bounds: [f64; 2],
    y_bounds: [f64; 2],
) {
    let ticks = 5usize;
    let style = Style::default().fg(Color::Gray);

    for i in 0..ticks {
        let u = i as f64 / (ticks as f64 - 1.0);
        let x_val = x_bounds[0] + u * (x_bounds[1] - x_bounds[0]);
        let x = chart.x + ((chart.width - 1) as f64 * u).round() as u16;
        let label = fmt_axis_month(x_val);
        let label_len = label.len() as u16;
        let start = x.saturating_sub((label.len() / 2) as u16);
        let y = chart.y + chart.height;
        if y >= inner.y + inner.height - 1 {
            continue;
        }
        frame.render_widget(
            Paragraph::new(label).style(style),
            Rect {
                x: start,
                y,
                width: label_len,
                height: 1,
            },
        );
    }

    for i in 0..ticks {
        let u = i as f64 / (ticks as f64 - 1.0);
        let y_val = y_bounds[0] + u * (y_bounds[1] - y_bounds[0]);
        let y = chart.y + (chart.height - 1) - ((chart.height - 1) as f64 * u).round() as u16;
        let label = fmt_axis_price(y_val);
        let label_len = label.len() as u16;
        let x = inner.x + insets.left.saturating_sub(1);
        let start = x.saturating_sub(label.len() as u16);
        if start < inner.x {
            continue;
        }
        frame.render_widget(
            Paragraph::new(label).style(style),
            Rect {
                x: start,
                y,
                width: label_len,
                height: 1,
            },
        );
    }

    let x_label = Paragraph::new("month")
        .alignment(Alignment::Center)
        .style(Style::default().fg(Color::Gray));
    let x_rect = Rect {
        x: chart.x,
        y: chart.y + chart.height + 1,
        width: chart.width,
        height: 1,
    };
    if x_rect.y < inner.y + inner.height {
        frame.render_widget(x_label, x_rect);
    }

    let y_label = Paragraph::new("$/MMBtu").style(Style::default().fg(Color::Gray).add_modifier(Modifier::BOLD));
    let y_rect = Rect {
        x: inner.x,
        y: inner.y,
        width: insets.left.saturating_sub(1),
        height: 1,
    };
    frame.render_widget(y_label, y_rect);
}
