//! PNG rendering of pull request activity.
//!
//! Draws on an in-memory RGB bitmap with `plotters` and encodes it with
//! `image`. Nothing here renders text, so no system fonts are required.

use chrono::{DateTime, Utc};
use image::ImageEncoder;
use image::codecs::png::PngEncoder;
use plotters::coord::types::RangedCoordf64;
use plotters::prelude::*;

use crate::domain::intervals::consecutive_deltas;
use crate::domain::IntervalSummary;
use crate::error::MonitorError;

/// Number of histogram buckets in the interval panel.
pub const HISTOGRAM_BINS: usize = 20;

/// Output image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChartSize {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Default for ChartSize {
    fn default() -> Self {
        Self {
            width: 1200,
            height: 500,
        }
    }
}

fn render_error(e: impl std::fmt::Display) -> MonitorError {
    MonitorError::Internal(format!("chart rendering failed: {e}"))
}

/// Buckets `values` into `bins` equal-width bins spanning their range.
///
/// Returns `(lower_edge, bin_width, counts)`. A zero-width range is widened
/// to one unit so identical values still land in a single visible bin.
#[must_use]
pub fn histogram(values: &[f64], bins: usize) -> (f64, f64, Vec<usize>) {
    let bins = bins.max(1);
    let lo = values.iter().copied().fold(f64::INFINITY, f64::min);
    let hi = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !lo.is_finite() || !hi.is_finite() {
        return (0.0, 1.0, vec![0; bins]);
    }
    let span = if hi > lo { hi - lo } else { 1.0 };
    let width = span / bins as f64;
    let mut counts = vec![0_usize; bins];
    for v in values {
        let idx = (((v - lo) / width) as usize).min(bins - 1);
        if let Some(slot) = counts.get_mut(idx) {
            *slot += 1;
        }
    }
    (lo, width, counts)
}

/// Renders the two-panel PR chart and returns PNG bytes.
///
/// Left: PR creation times (hours since the first PR) against PR index.
/// Right: histogram of intervals in hours, with the mean in red and the
/// median in green.
///
/// # Errors
///
/// Returns [`MonitorError::NoData`] for fewer than two timestamps and
/// [`MonitorError::Internal`] if drawing or encoding fails.
pub fn render_pr_chart(
    timestamps: &[DateTime<Utc>],
    size: ChartSize,
) -> Result<Vec<u8>, MonitorError> {
    let summary = IntervalSummary::from_timestamps(timestamps)
        .ok_or_else(|| MonitorError::NoData("at least 2 pull requests are needed".to_string()))?;

    let mut sorted = timestamps.to_vec();
    sorted.sort_unstable();
    let first = sorted.first().copied().unwrap_or_else(Utc::now);
    let points: Vec<(f64, f64)> = sorted
        .iter()
        .enumerate()
        .map(|(i, t)| ((*t - first).num_seconds() as f64 / 3600.0, i as f64))
        .collect();
    let interval_hours: Vec<f64> = consecutive_deltas(&sorted)
        .into_iter()
        .map(|secs| secs / 3600.0)
        .collect();

    let ChartSize { width, height } = size;
    let mut buffer = vec![0_u8; width as usize * height as usize * 3];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (width, height)).into_drawing_area();
        root.fill(&WHITE).map_err(render_error)?;
        let mut panels = root.split_evenly((1, 2)).into_iter();
        let (Some(left), Some(right)) = (panels.next(), panels.next()) else {
            return Err(render_error("drawing area split"));
        };

        // (a) PR timeline scatter
        let x_max = points.last().map_or(1.0, |(x, _)| x.max(1.0)) * 1.05;
        let y_max = points.len() as f64;
        let mut timeline = ChartBuilder::on(&left)
            .margin(24)
            .build_cartesian_2d(-0.02 * x_max..x_max, -0.5..y_max)
            .map_err(render_error)?;
        draw_axes(&mut timeline, (-0.02 * x_max, x_max), (-0.5, y_max))?;
        timeline
            .draw_series(
                points
                    .iter()
                    .map(|&p| Circle::new(p, 4, BLUE.mix(0.6).filled())),
            )
            .map_err(render_error)?;

        // (b) interval distribution
        let (lo, bin_width, counts) = histogram(&interval_hours, HISTOGRAM_BINS);
        let x_lo = lo.min(0.0);
        let x_hi = lo + bin_width * counts.len() as f64;
        let y_hi = counts.iter().copied().max().unwrap_or(1).max(1) as f64 * 1.1;
        let mut distribution = ChartBuilder::on(&right)
            .margin(24)
            .build_cartesian_2d(x_lo..x_hi, 0.0..y_hi)
            .map_err(render_error)?;
        draw_axes(&mut distribution, (x_lo, x_hi), (0.0, y_hi))?;
        distribution
            .draw_series(counts.iter().enumerate().map(|(i, &count)| {
                let x0 = lo + bin_width * i as f64;
                Rectangle::new(
                    [(x0, 0.0), (x0 + bin_width, count as f64)],
                    BLUE.mix(0.5).filled(),
                )
            }))
            .map_err(render_error)?;

        let mean_h = summary.average_seconds / 3600.0;
        let median_h = summary.median_seconds / 3600.0;
        distribution
            .draw_series([
                PathElement::new(vec![(mean_h, 0.0), (mean_h, y_hi)], RED.stroke_width(2)),
                PathElement::new(vec![(median_h, 0.0), (median_h, y_hi)], GREEN.stroke_width(2)),
            ])
            .map_err(render_error)?;

        root.present().map_err(render_error)?;
    }

    let mut png = Vec::new();
    PngEncoder::new(&mut png)
        .write_image(&buffer, width, height, image::ColorType::Rgb8)
        .map_err(render_error)?;
    Ok(png)
}

type Panel<'a, 'b> = ChartContext<'a, BitMapBackend<'b>, Cartesian2d<RangedCoordf64, RangedCoordf64>>;

fn draw_axes(chart: &mut Panel<'_, '_>, x: (f64, f64), y: (f64, f64)) -> Result<(), MonitorError> {
    chart
        .draw_series([
            PathElement::new(vec![(x.0, y.0), (x.1, y.0)], BLACK.stroke_width(1)),
            PathElement::new(vec![(x.0, y.0), (x.0, y.1)], BLACK.stroke_width(1)),
        ])
        .map_err(render_error)?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use chrono::Duration;

    const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

    #[test]
    fn renders_png_for_pr_history() {
        let t0 = Utc::now() - Duration::days(3);
        let timestamps = [
            t0,
            t0 + Duration::hours(2),
            t0 + Duration::hours(5),
            t0 + Duration::hours(30),
        ];
        let Ok(png) = render_pr_chart(&timestamps, ChartSize { width: 400, height: 200 }) else {
            panic!("chart should render");
        };
        assert!(png.starts_with(&PNG_SIGNATURE));
    }

    #[test]
    fn identical_timestamps_still_render() {
        let t = Utc::now();
        let result = render_pr_chart(&[t, t], ChartSize::default());
        assert!(result.is_ok());
    }

    #[test]
    fn single_pr_is_no_data() {
        let result = render_pr_chart(&[Utc::now()], ChartSize::default());
        assert!(matches!(result, Err(MonitorError::NoData(_))));
    }

    #[test]
    fn histogram_counts_every_value() {
        let (lo, width, counts) = histogram(&[0.0, 1.0, 2.0, 10.0], 5);
        assert!((lo - 0.0).abs() < f64::EPSILON);
        assert!((width - 2.0).abs() < f64::EPSILON);
        assert_eq!(counts, vec![2, 1, 0, 0, 1]);
        assert_eq!(counts.iter().sum::<usize>(), 4);
    }
}
