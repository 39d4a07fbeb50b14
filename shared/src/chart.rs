//! Chart rendering for sensor readings.
//!
//! Draws the sound level and light intensity series against time and writes
//! the result as a PNG image.

use crate::models::SensorReading;
use chrono::{DateTime, Duration, Utc};
use plotters::prelude::*;
use plotters::style::{register_font, FontStyle};
use std::collections::HashMap;
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock, PoisonError};
use thiserror::Error;

/// Default chart title.
pub const DEFAULT_TITLE: &str = "Sound Level and Light Intensity Over Time";

/// Name the bundled font is reported under.
pub const BUNDLED_FONT_NAME: &str = "DejaVuSans.ttf";

/// DejaVu Sans (Bitstream Vera license, see `assets/LICENSE-DejaVu.txt`).
static BUNDLED_FONT: &[u8] = include_bytes!("../assets/DejaVuSans.ttf");
const BUNDLED_FAMILY: &str = "caretaker-dejavu-sans";

static BUNDLED_REGISTERED: OnceLock<bool> = OnceLock::new();

/// Font files already registered, keyed by path, with their family names.
static FILE_FONTS: OnceLock<Mutex<HashMap<PathBuf, String>>> = OnceLock::new();

/// Errors that can occur while rendering a chart.
#[derive(Debug, Error)]
pub enum RenderError {
    /// There are no readings to plot.
    #[error("No readings to plot")]
    NoData,

    /// The font could not be loaded.
    #[error("Failed to load font {path}: {reason}")]
    Font {
        /// Path of the font file.
        path: PathBuf,
        /// Why loading failed.
        reason: String,
    },

    /// Drawing or encoding the image failed.
    #[error("Failed to draw chart: {0}")]
    Drawing(String),
}

fn drawing_error(err: impl std::fmt::Display) -> RenderError {
    RenderError::Drawing(err.to_string())
}

/// Chart rendering options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartOptions {
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
    /// Chart title.
    pub title: String,
    /// TrueType font used for text; `None` uses the bundled DejaVu Sans.
    pub font_path: Option<PathBuf>,
}

impl Default for ChartOptions {
    fn default() -> Self {
        Self {
            width: 1000,
            height: 600,
            title: DEFAULT_TITLE.to_string(),
            font_path: None,
        }
    }
}

impl ChartOptions {
    /// Sets the font path.
    #[must_use]
    pub fn with_font_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.font_path = Some(path.into());
        self
    }
}

fn bundled_family() -> Result<String, RenderError> {
    let registered = *BUNDLED_REGISTERED
        .get_or_init(|| register_font(BUNDLED_FAMILY, FontStyle::Normal, BUNDLED_FONT).is_ok());
    if registered {
        Ok(BUNDLED_FAMILY.to_string())
    } else {
        Err(RenderError::Font {
            path: PathBuf::from(BUNDLED_FONT_NAME),
            reason: "bundled font is not a valid TrueType font".to_string(),
        })
    }
}

/// Returns the font family to draw text with, registering the font on first use.
///
/// Each distinct path gets its own family, so a path that cannot be read
/// fails even after another font was registered.
fn font_family(font_path: Option<&Path>) -> Result<String, RenderError> {
    let Some(path) = font_path else {
        return bundled_family();
    };

    let mut fonts = FILE_FONTS
        .get_or_init(Mutex::default)
        .lock()
        .unwrap_or_else(PoisonError::into_inner);
    if let Some(family) = fonts.get(path) {
        return Ok(family.clone());
    }

    let bytes = std::fs::read(path).map_err(|e| RenderError::Font {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    let bytes: &'static [u8] = Box::leak(bytes.into_boxed_slice());

    let family = format!("caretaker-font-{}", fonts.len());
    register_font(&family, FontStyle::Normal, bytes).map_err(|_| RenderError::Font {
        path: path.to_path_buf(),
        reason: "not a valid TrueType font".to_string(),
    })?;

    tracing::debug!(font = %path.display(), %family, "Registered chart font");
    fonts.insert(path.to_path_buf(), family.clone());
    Ok(family)
}

fn time_range(readings: &[SensorReading]) -> Range<DateTime<Utc>> {
    let start = readings.iter().map(|r| r.time).min().unwrap_or_else(Utc::now);
    let end = readings.iter().map(|r| r.time).max().unwrap_or(start);
    if start == end {
        start - Duration::minutes(1)..end + Duration::minutes(1)
    } else {
        start..end
    }
}

fn value_range(readings: &[SensorReading]) -> Range<f64> {
    let values = readings
        .iter()
        .flat_map(|r| [r.sound_level, r.light_intensity])
        .filter(|v| v.is_finite());

    let (min, max) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });

    if min > max {
        return 0.0..1.0;
    }
    if (max - min).abs() < f64::EPSILON {
        return min - 1.0..max + 1.0;
    }
    let pad = (max - min) * 0.05;
    min - pad..max + pad
}

/// Renders both measurement series as a line chart and writes it to `path`.
///
/// An existing file at `path` is replaced. Readings are plotted in the order
/// given.
///
/// # Errors
///
/// Returns an error if:
/// - `readings` is empty
/// - The configured font file cannot be read or is not a TrueType font
/// - Drawing or writing the PNG fails
pub fn render_chart(
    readings: &[SensorReading],
    path: &Path,
    options: &ChartOptions,
) -> Result<(), RenderError> {
    if readings.is_empty() {
        return Err(RenderError::NoData);
    }

    let family = font_family(options.font_path.as_deref())?;
    let family = family.as_str();

    let root = BitMapBackend::new(path, (options.width, options.height)).into_drawing_area();
    root.fill(&WHITE).map_err(drawing_error)?;

    let mut chart = ChartBuilder::on(&root)
        .margin(20)
        .caption(&options.title, (family, 28))
        .x_label_area_size(50)
        .y_label_area_size(60)
        .build_cartesian_2d(time_range(readings), value_range(readings))
        .map_err(drawing_error)?;

    chart
        .configure_mesh()
        .label_style((family, 12))
        .axis_desc_style((family, 16))
        .x_desc("Time")
        .y_desc("Measurement")
        .x_label_formatter(&|t: &DateTime<Utc>| t.format("%m-%d %H:%M").to_string())
        .draw()
        .map_err(drawing_error)?;

    chart
        .draw_series(LineSeries::new(
            readings.iter().map(|r| (r.time, r.sound_level)),
            BLUE.stroke_width(2),
        ))
        .map_err(drawing_error)?
        .label("Sound Level")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], BLUE));

    chart
        .draw_series(LineSeries::new(
            readings.iter().map(|r| (r.time, r.light_intensity)),
            RED.stroke_width(2),
        ))
        .map_err(drawing_error)?
        .label("Light Intensity")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], RED));

    chart
        .configure_series_labels()
        .label_font((family, 14))
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()
        .map_err(drawing_error)?;

    root.present().map_err(drawing_error)?;

    tracing::debug!(
        path = %path.display(),
        readings = readings.len(),
        "Rendered chart"
    );
    Ok(())
}
