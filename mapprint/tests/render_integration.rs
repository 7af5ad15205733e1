//! Integration tests for whole-job rendering.
//!
//! Tiles are served by an in-memory HTTP client, so these tests exercise
//! the full path (layer selection, tile scheduling, compositing, JPEG
//! encoding and PDF assembly) without touching the network.

use std::io::Cursor;
use std::sync::{Arc, Mutex};

use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use mapprint::coord::LatLng;
use mapprint::executor::TokioExecutor;
use mapprint::job::{Page, PaperSize, PrintSize, RenderJob, ZoomSelection};
use mapprint::layer::{AsyncHttpClient, HttpError, LayerKind, LayerOptions, XyzLayer};
use mapprint::render::{MapRenderer, RenderError};
use tokio_util::sync::CancellationToken;

const BASE_URL: &str = "https://base.test/{z}/{x}/{y}.png";
const OVERLAY_URL: &str = "https://overlay.test/{z}/{x}/{y}.png";

fn png(rgba: [u8; 4]) -> Vec<u8> {
    let image = RgbaImage::from_pixel(256, 256, Rgba(rgba));
    let mut bytes = Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(image)
        .write_to(&mut bytes, ImageFormat::Png)
        .unwrap();
    bytes.into_inner()
}

/// Serves one flat tile per host and records every request.
#[derive(Clone)]
struct TileServer {
    base: Arc<Vec<u8>>,
    overlay: Arc<Vec<u8>>,
    failing_host: Option<&'static str>,
    requested: Arc<Mutex<Vec<String>>>,
}

impl TileServer {
    fn new() -> Self {
        Self {
            base: Arc::new(png([200, 200, 200, 255])),
            overlay: Arc::new(png([255, 0, 0, 128])),
            failing_host: None,
            requested: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn failing(host: &'static str) -> Self {
        Self {
            failing_host: Some(host),
            ..Self::new()
        }
    }

    fn requested(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }
}

impl AsyncHttpClient for TileServer {
    async fn get(&self, url: &str) -> Result<Vec<u8>, HttpError> {
        self.requested.lock().unwrap().push(url.to_string());
        if self.failing_host.is_some_and(|host| url.contains(host)) {
            return Err(HttpError::Status {
                status: 404,
                url: url.to_string(),
            });
        }
        if url.contains("overlay.test") {
            Ok(self.overlay.as_ref().clone())
        } else {
            Ok(self.base.as_ref().clone())
        }
    }
}

fn page(label: &str, center: LatLng) -> Page {
    Page::from_center(center, PrintSize::new(60.0, 45.0), 500.0, label).unwrap()
}

fn job(server: &TileServer, pages: Vec<Page>) -> RenderJob {
    job_at(server, pages, 150.0, ZoomSelection::new(15, 16))
}

fn job_at(server: &TileServer, pages: Vec<Page>, dpi: f64, zooms: ZoomSelection) -> RenderJob {
    let base = XyzLayer::new(
        server.clone(),
        BASE_URL,
        LayerOptions::base("B").with_scale_dependent(true),
    );
    let overlay = XyzLayer::new(
        server.clone(),
        OVERLAY_URL,
        LayerOptions::overlay("T").with_transparency(true),
    );
    RenderJob::new(pages, zooms, dpi, 500.0)
        .with_layer(LayerKind::raster(overlay), vec![2])
        .with_layer(LayerKind::raster(base), vec![1])
        .with_max_active(8)
}

fn count(haystack: &[u8], needle: &str) -> usize {
    String::from_utf8_lossy(haystack).matches(needle).count()
}

#[tokio::test]
async fn test_renders_a4_page_to_single_page_pdf() {
    let server = TileServer::new();
    let paper = PaperSize::a4(7.0);
    let page = Page::from_center(
        LatLng::new(55.75, 37.61),
        paper.printable(Default::default()),
        500.0,
        "1",
    )
    .unwrap();
    assert_eq!(page.pixel_size(300.0), (2315, 3343));
    let job = job_at(&server, vec![page], 300.0, ZoomSelection::new(13, 14));

    let pdf = MapRenderer::new(TokioExecutor::new())
        .render_pdf(&job)
        .await
        .unwrap();

    assert!(pdf.starts_with(b"%PDF-1."));
    assert!(pdf.ends_with(b"%%EOF\n"));
    assert_eq!(count(&pdf, "/Count 1\n"), 1);
    assert_eq!(count(&pdf, "/DCTDecode"), 1);
    assert_eq!(count(&pdf, "/Width 2315\n/Height 3343\n"), 1);

    let requested = server.requested();
    assert!(requested.iter().any(|url| url.starts_with("https://base.test/13/")));
    assert!(requested.iter().any(|url| url.starts_with("https://overlay.test/14/")));
}

#[tokio::test]
async fn test_transparent_overlay_is_drawn_over_base() {
    let server = TileServer::new();
    let job = job(
        &server,
        vec![
            page("1", LatLng::new(55.75, 37.61)),
            page("2", LatLng::new(55.80, 37.61)),
        ],
    );

    let images = MapRenderer::new(TokioExecutor::new())
        .render_pages(&job)
        .await
        .unwrap();

    assert_eq!(images.len(), 2);
    assert_eq!(images[1].label, "2");
    for image in &images {
        let decoded = image::load_from_memory(&image.jpeg).unwrap().to_rgb8();
        assert_eq!((decoded.width(), decoded.height()), (image.width, image.height));

        // Half-alpha red over grey 200 on a fully covered page
        let pixel = decoded.get_pixel(image.width / 2, image.height / 2);
        let expected = [228, 100, 100];
        for (channel, want) in pixel.0.into_iter().zip(expected) {
            assert!(channel.abs_diff(want) <= 8, "pixel {:?}", pixel);
        }
    }
}

#[tokio::test]
async fn test_failed_base_tile_fails_the_render() {
    let server = TileServer::failing("base.test");
    let job = job(&server, vec![page("1", LatLng::new(55.75, 37.61))]);

    let err = MapRenderer::new(TokioExecutor::new())
        .render_pdf(&job)
        .await
        .unwrap_err();

    assert!(matches!(err, RenderError::Fetch(_)));
    assert!(err.to_string().starts_with("HTTP 404 from https://base.test/15/"));
    assert!(!server
        .requested()
        .iter()
        .any(|url| url.contains("overlay.test")));
}

#[tokio::test]
async fn test_non_printable_base_fails_before_fetching() {
    let server = TileServer::new();
    let base = XyzLayer::new(server.clone(), BASE_URL, LayerOptions::base("B").with_print(false));
    let job = RenderJob::new(
        vec![page("1", LatLng::new(0.0, 0.0))],
        ZoomSelection::new(15, 15),
        150.0,
        500.0,
    )
    .with_layer(LayerKind::raster(base), vec![]);

    let err = MapRenderer::new(TokioExecutor::new())
        .render_pages(&job)
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "Printing layer \"B\" is not supported");
    assert!(server.requested().is_empty());
}

#[tokio::test]
async fn test_cancelled_job() {
    let server = TileServer::new();
    let token = CancellationToken::new();
    token.cancel();
    let job = job(&server, vec![page("1", LatLng::new(55.75, 37.61))]).with_cancellation(token);

    let err = MapRenderer::new(TokioExecutor::new())
        .render_pdf(&job)
        .await
        .unwrap_err();

    assert!(err.is_cancelled());
    assert!(server.requested().is_empty());
}
