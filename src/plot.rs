//! Rendering of predicted waves.

use ndarray::{s, Array2};
use plotly::common::{DashType, Font, Line, Mode, Title};
use plotly::layout::Axis;
use plotly::{Layout, Plot, Scatter};
use std::path::Path;
use tracing::info;

use crate::errors::TrainingError;

const COLORS: [&str; 3] = ["red", "green", "blue"];

/// Builds the prediction figure for up to three waves.
///
/// The first `input_len` points of each row are drawn solid, the rest
/// (the free-running forecast) dotted.
pub fn prediction_plot(predictions: &Array2<f64>, input_len: usize) -> Plot {
    let mut plot = Plot::new();
    let input_len = input_len.min(predictions.ncols());

    for (row, color) in predictions.rows().into_iter().zip(COLORS) {
        let trace = Scatter::new((0..input_len).collect::<Vec<usize>>(), row.slice(s![..input_len]).to_vec())
            .mode(Mode::Lines)
            .line(Line::new().color(color).width(2.0))
            .show_legend(false);
        plot.add_trace(trace);

        if input_len < row.len() {
            let forecast = row.slice(s![input_len..]).to_vec();
            let trace = Scatter::new((input_len..row.len()).collect::<Vec<usize>>(), forecast)
                .mode(Mode::Lines)
                .line(Line::new().color(color).width(2.0).dash(DashType::Dot))
                .show_legend(false);
            plot.add_trace(trace);
        }
    }

    let layout = Layout::new()
        .title(
            Title::new("Predict future values for time sequences<br>(Dashlines are predicted values)")
                .font(Font::new().size(30)),
        )
        .x_axis(Axis::new().title(Title::new("x").font(Font::new().size(20))).tick_font(Font::new().size(20)))
        .y_axis(Axis::new().title(Title::new("y").font(Font::new().size(20))).tick_font(Font::new().size(20)))
        .width(3000)
        .height(1000);
    plot.set_layout(layout);

    plot
}

/// Writes the prediction figure to `path` as a standalone HTML page
pub fn draw_result<P: AsRef<Path>>(predictions: &Array2<f64>, input_len: usize, path: P) -> Result<(), TrainingError> {
    let path = path.as_ref();
    let html = prediction_plot(predictions, input_len).to_html();
    std::fs::write(path, html).map_err(|source| TrainingError::Plot {
        path: path.display().to_string(),
        source,
    })?;
    info!(path = %path.display(), "prediction plot written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;
    use tempfile::tempdir;

    #[test]
    fn test_draw_result_writes_html() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("predict0.html");
        let predictions = Array2::from_shape_fn((3, 12), |(r, c)| (r as f64 + c as f64 * 0.1).sin());

        draw_result(&predictions, 8, &path).unwrap();

        let html = std::fs::read_to_string(&path).unwrap();
        assert!(html.contains("Predict future values for time sequences"));
        assert!(html.contains("dot"));
    }

    #[test]
    fn test_forecast_traces_split_at_input_len() {
        let predictions = Array2::from_shape_fn((2, 6), |(r, c)| (r * 10 + c) as f64);

        let with_forecast = prediction_plot(&predictions, 4).to_json();
        assert!(with_forecast.contains("[4.0,5.0]"));
        assert!(with_forecast.contains("[14.0,15.0]"));

        let observed_only = prediction_plot(&predictions, 6).to_json();
        assert!(!observed_only.contains("dot"));
    }

    #[test]
    fn test_draw_result_reports_unwritable_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing").join("predict.html");
        let predictions = Array2::zeros((3, 4));

        let result = draw_result(&predictions, 2, &path);
        assert!(matches!(result, Err(TrainingError::Plot { .. })));
    }
}
