//! Render command - render a job file to a PDF or page JPEGs.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use mapprint::config::{DecorationSettings, JobFile, LayerSettings, OutputFormat};
use mapprint::decoration::{ConstantDeclination, Grid, LabelFont, MagneticMeridians, OverlayScale};
use mapprint::executor::TokioExecutor;
use mapprint::job::{PaperSize, ProgressCallback, RenderJob};
use mapprint::layer::{AsyncReqwestClient, LayerKind, LayerOptions, XyzLayer};
use mapprint::render::MapRenderer;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::CliError;
use crate::runner::CliRunner;

/// Arguments for the render command.
pub struct RenderArgs {
    pub job: PathBuf,
    pub output: Option<PathBuf>,
    pub debug: bool,
}

/// Run the render command.
pub fn run(args: RenderArgs) -> Result<(), CliError> {
    let runner = CliRunner::with_debug(args.debug)?;
    runner.log_startup("render");

    let job_file = JobFile::load_from(&args.job)?;
    let pages = job_file.build_pages()?;
    let zooms = job_file.zoom_selection(&pages);
    info!(
        job = %args.job.display(),
        pages = pages.len(),
        layers = job_file.layers.len(),
        map_zoom = zooms.map_zoom,
        sat_zoom = zooms.sat_zoom,
        "Job loaded"
    );

    let client = AsyncReqwestClient::with_timeout(job_file.download.timeout)?;
    let font = job_file
        .decorations
        .font
        .as_deref()
        .map(LabelFont::load)
        .transpose()?;

    let cancellation = CancellationToken::new();
    let mut job = RenderJob::new(pages, zooms, job_file.job.resolution, job_file.job.scale)
        .with_max_active(job_file.job.max_active)
        .with_jpeg_quality(job_file.job.jpeg_quality)
        .with_progress(progress_printer())
        .with_cancellation(cancellation.clone());
    for settings in &job_file.layers {
        job = job.with_layer(
            LayerKind::raster(build_layer(&client, settings)),
            settings.order.clone(),
        );
    }
    for decoration in build_decorations(&job_file.decorations, font) {
        job = job.with_decoration(decoration);
    }

    let format = job_file.job.format;
    let output = args.output.unwrap_or_else(|| {
        let short_names: Vec<&str> = job_file
            .layers
            .iter()
            .filter(|layer| layer.print)
            .map(|layer| layer.short_name.as_str())
            .collect();
        PathBuf::from(output_file_name(
            &short_names,
            job_file.job.scale,
            &job_file.job.paper(),
            format,
        ))
    });

    runner.spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling render");
            cancellation.cancel();
        }
    });

    let renderer = MapRenderer::new(TokioExecutor::new());
    let start = std::time::Instant::now();

    match format {
        OutputFormat::Pdf => {
            let pdf = runner.block_on(renderer.render_pdf(&job));
            println!();
            runner.write_file(&output, &pdf?)?;
        }
        OutputFormat::Jpeg => {
            let images = runner.block_on(renderer.render_pages(&job));
            println!();
            let images = images?;
            let count = images.len();
            for image in &images {
                runner.write_file(&page_file_name(&output, &image.label, count), &image.jpeg)?;
            }
        }
    }

    info!(elapsed_secs = start.elapsed().as_secs_f64(), "Render complete");
    println!("Done in {:.1}s", start.elapsed().as_secs_f64());
    Ok(())
}

fn build_layer(client: &AsyncReqwestClient, settings: &LayerSettings) -> XyzLayer<AsyncReqwestClient> {
    let options = if settings.overlay {
        LayerOptions::overlay(settings.short_name.clone())
    } else {
        LayerOptions::base(settings.short_name.clone())
    }
    .with_print(settings.print)
    .with_transparency(settings.transparent)
    .with_scale_dependent(settings.scale_dependent);

    XyzLayer::new(client.clone(), settings.url.clone(), options)
        .with_subdomains(settings.subdomains.clone())
        .with_tile_size(settings.tile_size)
        .with_max_zoom(settings.max_zoom)
        .with_weight(settings.weight)
}

/// Enabled decorations, the scale caption last so it stays on top.
fn build_decorations(settings: &DecorationSettings, font: Option<LabelFont>) -> Vec<LayerKind> {
    let mut decorations = Vec::new();

    if settings.grid {
        let grid = match &font {
            Some(font) => Grid::new().with_font(font.clone()),
            None => Grid::new(),
        };
        decorations.push(LayerKind::decoration(grid));
    }
    if settings.magnetic_meridians {
        let model = Arc::new(ConstantDeclination(settings.declination));
        decorations.push(LayerKind::decoration(MagneticMeridians::new(model)));
    }
    if settings.scale {
        match font {
            Some(font) => decorations.push(LayerKind::decoration(OverlayScale::new(font))),
            None => warn!("Scale caption needs [decorations] font, skipping it"),
        }
    }

    decorations
}

/// Running whole-percent total of progress increments.
#[derive(Debug, Default)]
struct PercentCounter {
    done: f64,
    shown: Option<u32>,
}

impl PercentCounter {
    /// Adds `increment` and returns the new percentage when it changed.
    fn add(&mut self, increment: f64, total: f64) -> Option<u32> {
        self.done += increment;
        let percent = if total > 0.0 {
            (self.done / total * 100.0).clamp(0.0, 100.0).floor() as u32
        } else {
            100
        };
        if self.shown == Some(percent) {
            return None;
        }
        self.shown = Some(percent);
        Some(percent)
    }
}

/// Prints a percentage line whenever the whole percent changes.
fn progress_printer() -> ProgressCallback {
    let counter = Mutex::new(PercentCounter::default());
    Arc::new(move |increment, total| {
        let Ok(mut counter) = counter.lock() else {
            return;
        };
        if let Some(percent) = counter.add(increment, total) {
            print!("\rRendering... {:>3}%", percent);
            let _ = std::io::stdout().flush();
        }
    })
}

/// Default output name: `{short names}_{scale}m_{W}x{H}.{ext}`.
pub fn output_file_name(
    short_names: &[&str],
    scale: f64,
    paper: &PaperSize,
    format: OutputFormat,
) -> String {
    let names = if short_names.is_empty() {
        "map".to_string()
    } else {
        short_names.join("-")
    };
    format!(
        "{}_{}m_{}x{}.{}",
        names,
        scale,
        paper.width_mm,
        paper.height_mm,
        format.extension()
    )
}

/// Per-page JPEG path; a single page uses `output` unchanged.
pub fn page_file_name(output: &Path, label: &str, pages_count: usize) -> PathBuf {
    if pages_count <= 1 {
        return output.to_path_buf();
    }
    let stem = output
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "map".to_string());
    let extension = output
        .extension()
        .map(|e| e.to_string_lossy().to_string())
        .unwrap_or_else(|| OutputFormat::Jpeg.extension().to_string());
    output.with_file_name(format!("{}_{}.{}", stem, label, extension))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_file_name() {
        let name = output_file_name(&["O", "S"], 500.0, &PaperSize::a4(7.0), OutputFormat::Pdf);
        assert_eq!(name, "O-S_500m_210x297.pdf");
    }

    #[test]
    fn test_output_file_name_jpeg_and_fractional_scale() {
        let paper = PaperSize {
            width_mm: 297.0,
            height_mm: 420.0,
            margins: Default::default(),
        };
        let name = output_file_name(&["T"], 1250.5, &paper, OutputFormat::Jpeg);
        assert_eq!(name, "T_1250.5m_297x420.jpg");
    }

    #[test]
    fn test_output_file_name_without_layers() {
        let name = output_file_name(&[], 1000.0, &PaperSize::a4(7.0), OutputFormat::Pdf);
        assert_eq!(name, "map_1000m_210x297.pdf");
    }

    #[test]
    fn test_page_file_name() {
        let output = Path::new("out/O_500m_210x297.jpg");
        assert_eq!(page_file_name(output, "1", 1), output);
        assert_eq!(
            page_file_name(output, "2", 3),
            Path::new("out/O_500m_210x297_2.jpg")
        );
    }

    #[test]
    fn test_percent_counter_reports_whole_percent_changes() {
        let mut counter = PercentCounter::default();
        assert_eq!(counter.add(0.0, 8.0), Some(0));
        assert_eq!(counter.add(0.0625, 8.0), None);
        assert_eq!(counter.add(1.9375, 8.0), Some(25));
        assert_eq!(counter.add(6.0, 8.0), Some(100));
        assert_eq!(counter.add(0.5, 8.0), None);
    }

    #[test]
    fn test_percent_counter_without_work_is_complete() {
        let mut counter = PercentCounter::default();
        assert_eq!(counter.add(0.0, 0.0), Some(100));
    }

    #[test]
    fn test_decorations_without_font_skip_scale() {
        let settings = DecorationSettings {
            grid: true,
            scale: true,
            magnetic_meridians: true,
            ..Default::default()
        };
        let decorations = build_decorations(&settings, None);
        let names: Vec<&str> = decorations.iter().map(|d| d.short_name()).collect();
        assert_eq!(decorations.len(), 2);
        assert_eq!(names[1], "Magnetic");
    }

    #[test]
    fn test_build_layer_options() {
        let client = AsyncReqwestClient::new().unwrap();
        let mut settings = LayerSettings::new("trails", "https://t.example/{z}/{x}/{y}.png");
        settings.overlay = true;
        settings.transparent = true;
        settings.short_name = "T".to_string();

        let layer = LayerKind::raster(build_layer(&client, &settings));
        let options = layer.options();
        assert_eq!(options.short_name, "T");
        assert!(options.is_overlay && options.is_overlay_transparent);
    }
}
