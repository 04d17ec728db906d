//! Chart of the run log.
//!
//! Three panels share one time axis: speed, distance and run time. Each one
//! carries its trailing rolling mean, the speed and distance panels also their
//! global average and personal-best marker. The legend and the stats box sit
//! in a side column.

use crate::analysis::Analysis;
use crate::config::ChartConfig;
use crate::model::RunTable;
use crate::stats::first_argmax;
use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
use plotters::coord::Shift;
use plotters::coord::ranged1d::{DefaultFormatting, KeyPointHint, Ranged};
use plotters::prelude::*;
use plotters::series::DashedLineSeries;
use plotters::style::FontTransform;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use std::{ops::Range, path::Path};

const SPEED_COLOR: RGBColor = RGBColor(220, 20, 20);
const DISTANCE_COLOR: RGBColor = RGBColor(0, 128, 0);
const TIME_COLOR: RGBColor = RGBColor(20, 20, 220);

const MIN_SPEED: f64 = 2.0;
const MIN_DISTANCE: f64 = 2.0;
const MIN_TIME: f64 = 20.0;
const TIME_STEP: f64 = 5.0;

/// Bar width in days.
const BAR_WIDTH: f64 = 1.5;

/// Height of the bottom panel's date area and the gap above its labels, in pixels.
const X_LABEL_AREA: u32 = 110;
const X_LABEL_GAP: i32 = 8;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Linear axis with an explicit list of tick positions.
#[derive(Debug, Clone, PartialEq)]
pub struct TickedRange {
    range: Range<f64>,
    ticks: Vec<f64>,
}

impl TickedRange {
    pub fn new(range: Range<f64>, ticks: Vec<f64>) -> Self {
        Self { range, ticks }
    }

    pub fn ticks(&self) -> &[f64] {
        &self.ticks
    }
}

impl Ranged for TickedRange {
    type FormatOption = DefaultFormatting;
    type ValueType = f64;

    fn map(&self, value: &f64, limit: (i32, i32)) -> i32 {
        let span = self.range.end - self.range.start;
        let frac = (value - self.range.start) / span;
        limit.0.saturating_add((frac * (limit.1 - limit.0) as f64).round() as i32)
    }

    fn key_points<Hint: KeyPointHint>(&self, hint: Hint) -> Vec<f64> {
        let visible: Vec<f64> = self
            .ticks
            .iter()
            .copied()
            .filter(|tick| self.range.start <= *tick && *tick <= self.range.end)
            .collect();
        let max_points = hint.max_num_points().max(1);
        let step = visible.len().div_ceil(max_points).max(1);
        visible.into_iter().step_by(step).collect()
    }

    fn range(&self) -> Range<f64> {
        self.range.clone()
    }
}

/// Axis geometry and labels of the chart, computed from the data alone.
#[derive(Debug, Clone)]
pub struct Layout {
    pub title: String,
    origin: NaiveDateTime,
    pub x: TickedRange,
    pub speed_y: TickedRange,
    pub distance_y: TickedRange,
    pub time_y: TickedRange,
}

impl Layout {
    pub fn new(table: &RunTable, title: &str, today: NaiveDate) -> Self {
        let first_date = table.first().date_time().date();
        let origin = first_date.and_time(NaiveTime::MIN);

        let position = |date_time: NaiveDateTime| days_between(origin, date_time);
        let x_ticks: Vec<f64> = table
            .rows()
            .iter()
            .map(|row| position(row.date_time()))
            .collect();
        let x_start = x_ticks[0] - 1.0;
        let x_end = x_ticks[x_ticks.len() - 1] + 1.0;

        let max_speed = finite_max(&table.speeds(), MIN_SPEED);
        let max_distance = finite_max(&table.distances(), MIN_DISTANCE);
        let max_time = finite_max(&table.total_times(), MIN_TIME);

        // Speed and distance panels share their upper bound.
        let y_top = max_speed.max(max_distance).ceil().max(MIN_SPEED + 1.0);
        let time_top = ((max_time / TIME_STEP).ceil() * TIME_STEP).max(MIN_TIME + TIME_STEP);

        Self {
            title: format!("{title} from {first_date} to {today}"),
            origin,
            x: TickedRange::new(x_start..x_end, x_ticks),
            speed_y: TickedRange::new(
                MIN_SPEED..y_top,
                step_ticks(MIN_SPEED, max_speed.ceil() + 1.0, 1.0),
            ),
            distance_y: TickedRange::new(
                MIN_DISTANCE..y_top,
                step_ticks(MIN_DISTANCE, max_distance.ceil() + 1.0, 1.0),
            ),
            time_y: TickedRange::new(
                MIN_TIME..time_top,
                step_ticks(MIN_TIME, max_time.ceil() + TIME_STEP, TIME_STEP),
            ),
        }
    }

    /// Position of a timestamp on the x axis, in days.
    pub fn position(&self, date_time: NaiveDateTime) -> f64 {
        days_between(self.origin, date_time)
    }

    /// Date shown at an x axis position.
    pub fn date_label(&self, x: f64) -> String {
        let seconds = (x * SECONDS_PER_DAY).round() as i64;
        (self.origin + TimeDelta::seconds(seconds))
            .date()
            .format("%Y-%m-%d")
            .to_string()
    }

    /// Tick positions on the x axis with their date labels.
    pub fn x_labels(&self) -> Vec<(f64, String)> {
        self.x
            .ticks()
            .iter()
            .map(|&x| (x, self.date_label(x)))
            .collect()
    }
}

fn days_between(origin: NaiveDateTime, date_time: NaiveDateTime) -> f64 {
    (date_time - origin).num_seconds() as f64 / SECONDS_PER_DAY
}

/// Largest finite value, but never below `floor`.
fn finite_max(vals: &[f64], floor: f64) -> f64 {
    vals.iter()
        .copied()
        .filter(|val| val.is_finite())
        .fold(floor, f64::max)
}

/// Values `start, start + step, ...` below `stop`.
fn step_ticks(start: f64, stop: f64, step: f64) -> Vec<f64> {
    let n_ticks = ((stop - start) / step).ceil().max(0.0) as usize;
    (0..n_ticks).map(|idx| start + idx as f64 * step).collect()
}

enum ChartKind {
    Png,
    Svg,
}

impl ChartKind {
    fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("svg") => Self::Svg,
            _ => Self::Png,
        }
    }
}

/// Render the chart of an analysis into an image file.
pub fn render(ana: &Analysis, cfg: &ChartConfig, path: &Path, today: NaiveDate) -> Result<()> {
    let layout = Layout::new(&ana.table, &cfg.title, today);
    let size = (cfg.width, cfg.height);

    let result = match ChartKind::from_path(path) {
        ChartKind::Png => {
            let root = BitMapBackend::new(path, size).into_drawing_area();
            draw_chart(root, ana, &layout)
        }
        ChartKind::Svg => {
            let root = SVGBackend::new(path, size).into_drawing_area();
            draw_chart(root, ana, &layout)
        }
    };
    result.with_context(|| format!("failed to draw chart into {path:?}"))
}

struct Panel<'a> {
    y: &'a TickedRange,
    y_desc: &'a str,
    color: RGBColor,
    points: Vec<(f64, f64)>,
    rolling: Vec<(f64, f64)>,
    reference: Option<f64>,
    pb: Option<(f64, f64)>,
    bars: bool,
    x_labels: bool,
}

fn draw_chart<DB>(root: DrawingArea<DB, Shift>, ana: &Analysis, layout: &Layout) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    root.fill(&WHITE)?;
    let root = root.titled(&layout.title, ("sans-serif", 28))?;

    let (width, _) = root.dim_in_pixel();
    let (plot_area, side_area) = root.split_horizontally(width * 4 / 5);
    let panel_areas = plot_area.split_evenly((3, 1));

    let table = &ana.table;
    let rows = table.rows();
    let at = |idx: usize| layout.position(rows[idx].date_time());
    let series = |vals: Vec<f64>| -> Vec<(f64, f64)> {
        vals.into_iter()
            .enumerate()
            .filter(|(_, val)| val.is_finite())
            .map(|(idx, val)| (at(idx), val))
            .collect()
    };
    let rolling = |vals: Vec<Option<f64>>| -> Vec<(f64, f64)> {
        vals.into_iter()
            .enumerate()
            .filter_map(|(idx, val)| val.filter(|val| val.is_finite()).map(|val| (at(idx), val)))
            .collect()
    };
    let pb = |vals: &[f64]| {
        first_argmax(vals)
            .filter(|&idx| vals[idx].is_finite())
            .map(|idx| (at(idx), vals[idx]))
    };

    let speeds = table.speeds();
    let distances = table.distances();

    let panels = [
        Panel {
            y: &layout.speed_y,
            y_desc: "avg speed [km/h]",
            color: SPEED_COLOR,
            points: series(speeds.clone()),
            rolling: rolling(rows.iter().map(|row| row.speed_rolling_mean).collect()),
            reference: Some(ana.avg_speed()).filter(|val| val.is_finite()),
            pb: pb(&speeds),
            bars: false,
            x_labels: false,
        },
        Panel {
            y: &layout.distance_y,
            y_desc: "Distance [km]",
            color: DISTANCE_COLOR,
            points: series(distances.clone()),
            rolling: rolling(rows.iter().map(|row| row.distance_rolling_mean).collect()),
            reference: Some(ana.avg_distance()).filter(|val| val.is_finite()),
            pb: pb(&distances),
            bars: false,
            x_labels: false,
        },
        Panel {
            y: &layout.time_y,
            y_desc: "Run time [min]",
            color: TIME_COLOR,
            points: series(table.total_times()),
            rolling: rolling(rows.iter().map(|row| row.runtime_rolling_mean).collect()),
            reference: None,
            pb: None,
            bars: true,
            x_labels: true,
        },
    ];

    for (area, panel) in panel_areas.iter().zip(&panels) {
        draw_panel(area, layout, panel)?;
    }

    let legend_bottom = draw_legend(&side_area, table.rolling_window())?;
    draw_stats_box(&side_area, &ana.summary_text(), legend_bottom + 30)?;

    root.present()?;
    Ok(())
}

fn draw_panel<DB>(area: &DrawingArea<DB, Shift>, layout: &Layout, panel: &Panel) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let x_label_area = if panel.x_labels { X_LABEL_AREA } else { 0 };
    let mut chart = ChartBuilder::on(area)
        .margin(10)
        .set_label_area_size(LabelAreaPosition::Left, 70)
        .set_label_area_size(LabelAreaPosition::Bottom, x_label_area)
        .build_cartesian_2d(layout.x.clone(), panel.y.clone())?;

    // Mesh labels are anchored on their center, so rotated dates would
    // straddle the axis. Draw them below it instead.
    let no_label = |_: &f64| String::new();
    let y_label = |y: &f64| format!("{y:.0}");
    {
        let mut mesh = chart.configure_mesh();
        mesh.x_labels(layout.x.ticks().len())
            .y_labels(panel.y.ticks().len())
            .x_label_formatter(&no_label)
            .y_label_formatter(&y_label)
            .light_line_style(WHITE.mix(0.0))
            .y_desc(panel.y_desc)
            .axis_desc_style(("sans-serif", 16).into_font().color(&panel.color))
            .y_label_style(("sans-serif", 12).into_font().color(&panel.color));
        if panel.x_labels {
            mesh.x_desc("Date");
        }
        mesh.draw()?;
    }

    if panel.x_labels {
        let (base_x, base_y) = area.get_base_pixel();
        let (_, plot_y) = chart.plotting_area().get_pixel_range();
        let style = date_label_style();
        for (x, label) in layout.x_labels() {
            let (px, _) = chart.backend_coord(&(x, panel.y.range().start));
            let pos = (px - base_x, plot_y.end - base_y + X_LABEL_GAP);
            area.draw(&Text::new(label, pos, &style))?;
        }
    }

    let color = panel.color;
    if panel.bars {
        let floor = panel.y.range().start;
        chart.draw_series(panel.points.iter().map(|&(x, y)| {
            Rectangle::new(
                [(x - BAR_WIDTH / 2.0, floor), (x + BAR_WIDTH / 2.0, y)],
                color.mix(0.2).filled(),
            )
        }))?;
    } else {
        chart.draw_series(LineSeries::new(
            panel.points.iter().copied(),
            color.stroke_width(2),
        ))?;
        chart.draw_series(
            panel
                .points
                .iter()
                .map(|&point| Circle::new(point, 4, color.filled())),
        )?;
    }

    if let Some(reference) = panel.reference {
        let Range { start, end } = layout.x.range();
        chart.draw_series(LineSeries::new(
            [(start, reference), (end, reference)],
            color.mix(0.3).stroke_width(2),
        ))?;
    }

    chart.draw_series(DashedLineSeries::new(
        panel.rolling.iter().copied(),
        8,
        5,
        color.stroke_width(2),
    ))?;

    if let Some(pb) = panel.pb {
        chart.draw_series(std::iter::once(
            EmptyElement::at(pb) + Polygon::new(star_points(14), color.filled()),
        ))?;
    }

    Ok(())
}

/// Style of the x axis dates: rotated to run downwards from their anchor
/// and centered on the tick.
fn date_label_style() -> TextStyle<'static> {
    TextStyle::from(("sans-serif", 12).into_font())
        .transform(FontTransform::Rotate90)
        .pos(Pos::new(HPos::Left, VPos::Center))
}

/// Five-pointed star around the origin, in pixels.
fn star_points(radius: i32) -> Vec<(i32, i32)> {
    (0..10)
        .map(|idx| {
            let r = if idx % 2 == 0 {
                radius as f64
            } else {
                radius as f64 * 0.4
            };
            let angle = std::f64::consts::PI * (idx as f64 / 5.0 - 0.5);
            ((r * angle.cos()).round() as i32, (r * angle.sin()).round() as i32)
        })
        .collect()
}

/// Draw the legend at the top of the side column and return its bottom edge.
fn draw_legend<DB>(area: &DrawingArea<DB, Shift>, rolling_window: usize) -> Result<i32>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let roll = |name: &str| format!("{name} roll_mean_{rolling_window}");
    let entries = [
        ("Avg speed [km/h]".to_string(), SPEED_COLOR.to_rgba(), false),
        ("Avg speed abs".to_string(), SPEED_COLOR.mix(0.3), false),
        (roll("Speed"), SPEED_COLOR.to_rgba(), true),
        ("Distance [km]".to_string(), DISTANCE_COLOR.to_rgba(), false),
        ("Avg dist abs".to_string(), DISTANCE_COLOR.mix(0.3), false),
        (roll("Dist"), DISTANCE_COLOR.to_rgba(), true),
        ("Run time [min]".to_string(), TIME_COLOR.mix(0.2), false),
        (roll("Time"), TIME_COLOR.to_rgba(), true),
    ];

    let x = 20;
    let line_height = 24;
    let mut y = 30;
    for (label, color, dashed) in entries {
        let style = color.stroke_width(3);
        if dashed {
            area.draw(&PathElement::new(vec![(x, y), (x + 12, y)], style))?;
            area.draw(&PathElement::new(vec![(x + 18, y), (x + 30, y)], style))?;
        } else {
            area.draw(&PathElement::new(vec![(x, y), (x + 30, y)], style))?;
        }
        area.draw(&Text::new(
            label,
            (x + 40, y - 8),
            ("sans-serif", 16).into_font(),
        ))?;
        y += line_height;
    }

    Ok(y)
}

fn draw_stats_box<DB>(area: &DrawingArea<DB, Shift>, text: &str, top: i32) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let lines: Vec<&str> = text.lines().collect();
    let line_height = 20;
    let (width, _) = area.dim_in_pixel();
    let left = 15;
    let right = width as i32 - 15;
    let bottom = top + line_height * (lines.len() as i32 + 1);

    area.draw(&Rectangle::new(
        [(left, top), (right, bottom)],
        WHITE.mix(0.7).filled(),
    ))?;
    area.draw(&Rectangle::new([(left, top), (right, bottom)], BLACK))?;

    for (idx, line) in lines.iter().enumerate() {
        area.draw(&Text::new(
            line.to_string(),
            (left + 10, top + line_height / 2 + idx as i32 * line_height),
            ("monospace", 14).into_font(),
        ))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RunRecord;
    use crate::model::tests::at;

    fn table() -> RunTable {
        // Speeds: 9.375, 9, 11.25, 8.5.
        let records = vec![
            RunRecord::new(at(1, 0, 32), 5.0),
            RunRecord::new(at(3, 0, 40), 6.0),
            RunRecord::new(at(6, 0, 32), 6.0),
            RunRecord::new(at(9, 0, 48), 6.8),
        ];
        RunTable::new(records, 5).unwrap()
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 4, 2).unwrap()
    }

    #[test]
    fn y_ranges_follow_the_data() {
        let layout = Layout::new(&table(), "Run log", today());
        assert_eq!(layout.speed_y.range(), 2.0..12.0);
        assert_eq!(layout.distance_y.range(), 2.0..12.0);
        assert_eq!(layout.time_y.range(), 20.0..50.0);

        assert_eq!(layout.speed_y.ticks().first(), Some(&2.0));
        assert_eq!(layout.speed_y.ticks().last(), Some(&12.0));
        assert_eq!(layout.distance_y.ticks().last(), Some(&7.0));
        assert_eq!(
            layout.time_y.ticks(),
            &[20.0, 25.0, 30.0, 35.0, 40.0, 45.0, 50.0]
        );
    }

    #[test]
    fn one_x_tick_per_run() {
        let layout = Layout::new(&table(), "Run log", today());
        assert_eq!(layout.x.ticks().len(), 4);
        let labels: Vec<String> = layout.x_labels().into_iter().map(|(_, label)| label).collect();
        assert_eq!(
            labels,
            vec!["2024-03-01", "2024-03-03", "2024-03-06", "2024-03-09"]
        );
        let first = layout.x.ticks()[0];
        assert!((first - 32.0 / 1440.0).abs() < 1e-9);
        assert!(layout.x.range().start < first);
        assert!(layout.x.range().end > layout.x.ticks()[3]);
    }

    #[test]
    fn date_labels_hang_below_their_tick() {
        let style = date_label_style();
        assert!(matches!(style.pos.h_pos, HPos::Left));
        assert!(matches!(style.pos.v_pos, VPos::Center));
        assert!(matches!(style.font.get_transform(), FontTransform::Rotate90));
    }

    #[test]
    fn title_spans_first_run_to_today() {
        let layout = Layout::new(&table(), "Rob's run log", today());
        assert_eq!(layout.title, "Rob's run log from 2024-03-01 to 2024-04-02");
    }

    #[test]
    fn key_points_are_thinned_to_the_hint() {
        let axis = TickedRange::new(0.0..10.0, (0..=10).map(f64::from).collect());
        assert_eq!(axis.key_points(20usize).len(), 11);
        assert_eq!(axis.key_points(4usize), vec![0.0, 3.0, 6.0, 9.0]);
        assert_eq!(axis.map(&5.0, (0, 100)), 50);
    }

    #[test]
    fn star_has_ten_vertices() {
        let points = star_points(10);
        assert_eq!(points.len(), 10);
        assert_eq!(points[0], (0, -10));
    }
}
