//! End-to-end export scenarios with in-memory collaborators.

use std::collections::HashMap;
use std::io::Cursor;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use image::{ImageFormat, Rgba, RgbaImage};
use pretty_assertions::assert_eq;
use resvg::usvg::fontdb;

use mockup_renderer::assets::to_data_url;
use mockup_renderer::{
    Action, CompositionSession, Delivery, ExportFormat, ExportPipeline, ExportSettings,
    ImageFetcher, MockupError, PhotoAssets, ProductRegistry, RenderMode, RenderSurface, Result,
};

const LOGO_URL: &str = "https://cdn.test/logo.png";

/// Serves canned bytes, yielding a few times to interleave with other tasks.
#[derive(Default)]
struct MemoryFetcher {
    files: HashMap<String, Vec<u8>>,
    requests: Mutex<Vec<String>>,
}

impl MemoryFetcher {
    fn with(mut self, url: &str, bytes: Vec<u8>) -> Self {
        self.files.insert(url.to_string(), bytes);
        self
    }

    fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ImageFetcher for MemoryFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        self.requests.lock().unwrap().push(url.to_string());
        for _ in 0..3 {
            tokio::task::yield_now().await;
        }
        self.files
            .get(url)
            .cloned()
            .ok_or_else(|| MockupError::ImageLoad(format!("{url}: HTTP 404 Not Found")))
    }
}

#[derive(Default)]
struct MemoryDelivery {
    files: Mutex<Vec<(String, String, Vec<u8>)>>,
}

#[async_trait]
impl Delivery for MemoryDelivery {
    async fn deliver(&self, file_name: &str, mime_type: &str, bytes: Vec<u8>) -> Result<String> {
        self.files
            .lock()
            .unwrap()
            .push((file_name.to_string(), mime_type.to_string(), bytes));
        Ok(format!("memory://{file_name}"))
    }
}

fn png(color: [u8; 4]) -> Vec<u8> {
    let img = RgbaImage::from_pixel(8, 8, Rgba(color));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png).unwrap();
    out.into_inner()
}

fn surface() -> RenderSurface {
    RenderSurface::with_fonts(120, fontdb::Database::new())
}

fn session(product: &str) -> CompositionSession {
    let registry = ProductRegistry::builtin().unwrap();
    CompositionSession::from_registry(&registry, product, "Acme & Co").unwrap()
}

fn pipeline(fetcher: Arc<MemoryFetcher>, delivery: Arc<MemoryDelivery>, density: f32) -> ExportPipeline {
    ExportPipeline::new(ExportSettings::default(), density, fetcher, delivery)
}

#[tokio::test]
async fn png_export_is_delivered_with_slugged_name() {
    let fetcher = Arc::new(MemoryFetcher::default().with(LOGO_URL, png([255, 0, 0, 255])));
    let delivery = Arc::new(MemoryDelivery::default());
    let pipeline = pipeline(fetcher, delivery.clone(), 2.0);
    let session = session("tshirt");
    session.dispatch(Action::SetLogoSource(Some(LOGO_URL.into())));
    let surface = surface();

    let outcome = pipeline
        .export(&session, Some(&surface), ExportFormat::Png)
        .await
        .unwrap();

    assert_eq!(outcome.file_name, "tshirt-acme-co.png");
    assert_eq!(outcome.location, "memory://tshirt-acme-co.png");
    assert_eq!((outcome.width, outcome.height), (240, 288));

    let files = delivery.files.lock().unwrap();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].1, "image/png");
    let decoded = image::load_from_memory(&files[0].2).unwrap().to_rgba8();
    assert_eq!(decoded.dimensions(), (240, 288));
    // Backdrop is hidden in captures
    assert_eq!(decoded.get_pixel(0, 0)[3], 0);
    assert!(!session.is_exporting());
}

#[tokio::test]
async fn export_during_logo_removal_captures_current_logo() {
    let fetcher = Arc::new(MemoryFetcher::default().with(LOGO_URL, png([255, 0, 0, 255])));
    let delivery = Arc::new(MemoryDelivery::default());
    let pipeline = pipeline(fetcher.clone(), delivery, 1.0);
    let session = session("tshirt");
    let surface = surface();

    session.dispatch(Action::SetLogoSource(Some(LOGO_URL.into())));
    let request = session.begin_logo_removal().unwrap();
    let processed = to_data_url(&png([0, 0, 255, 255]));

    let (outcome, _) = tokio::join!(
        pipeline.export(&session, Some(&surface), ExportFormat::Png),
        async {
            tokio::task::yield_now().await;
            session.complete_removal(&request, Ok(processed.clone()));
        }
    );
    let outcome = outcome.unwrap();

    // The removal landed while the raw logo was loading
    assert_eq!(fetcher.requests(), vec![LOGO_URL.to_string()]);
    assert_eq!(outcome.snapshot.effective_logo_url(), Some(processed.as_str()));
    assert!(surface.image(&processed).is_some());
    assert_eq!(surface.backdrop_cycles(), (1, 1));
    assert!(!surface.backdrop_frozen());
}

#[tokio::test]
async fn failed_capture_still_restores_backdrop() {
    let fetcher = Arc::new(MemoryFetcher::default());
    let delivery = Arc::new(MemoryDelivery::default());
    let pipeline = pipeline(fetcher.clone(), delivery.clone(), 0.001);
    let session = session("tshirt");
    let surface = surface();

    let err = pipeline
        .export(&session, Some(&surface), ExportFormat::Png)
        .await
        .unwrap_err();
    assert!(matches!(err, MockupError::Capture(_)));
    assert_eq!(surface.backdrop_cycles(), (1, 1));
    assert!(!surface.backdrop_frozen());
    assert!(delivery.files.lock().unwrap().is_empty());

    // The guard is released for the next attempt
    assert!(!session.is_exporting());
}

#[tokio::test]
async fn missing_surface_fails_before_any_work() {
    let fetcher = Arc::new(MemoryFetcher::default().with(LOGO_URL, png([255, 0, 0, 255])));
    let delivery = Arc::new(MemoryDelivery::default());
    let pipeline = pipeline(fetcher.clone(), delivery, 1.0);
    let session = session("tshirt");
    session.dispatch(Action::SetLogoSource(Some(LOGO_URL.into())));

    let err = pipeline
        .export(&session, None, ExportFormat::Png)
        .await
        .unwrap_err();
    assert!(matches!(err, MockupError::SurfaceUnavailable));
    assert!(fetcher.requests().is_empty());
}

#[tokio::test]
async fn duplicate_export_is_dropped() {
    let fetcher = Arc::new(MemoryFetcher::default().with(LOGO_URL, png([255, 0, 0, 255])));
    let delivery = Arc::new(MemoryDelivery::default());
    let pipeline = pipeline(fetcher, delivery.clone(), 1.0);
    let session = session("mug");
    session.dispatch(Action::SetLogoSource(Some(LOGO_URL.into())));
    let surface = surface();

    let (first, second) = tokio::join!(
        pipeline.export(&session, Some(&surface), ExportFormat::Svg),
        pipeline.export(&session, Some(&surface), ExportFormat::Svg),
    );

    let results = [first, second];
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(
        results
            .iter()
            .any(|r| matches!(r, Err(MockupError::ExportInProgress)))
    );
    assert_eq!(delivery.files.lock().unwrap().len(), 1);
    assert_eq!(surface.backdrop_cycles(), (1, 1));
}

#[tokio::test]
async fn second_pipeline_waits_for_the_same_session() {
    let fetcher = Arc::new(MemoryFetcher::default().with(LOGO_URL, png([255, 0, 0, 255])));
    let delivery = Arc::new(MemoryDelivery::default());
    let first = pipeline(fetcher.clone(), delivery.clone(), 1.0);
    let second = pipeline(fetcher, delivery.clone(), 1.0);
    let other = session("tote");
    let session = session("tote");
    session.dispatch(Action::SetLogoSource(Some(LOGO_URL.into())));
    let other_surface = surface();
    let surface = surface();

    let (a, b) = tokio::join!(
        first.export(&session, Some(&surface), ExportFormat::Png),
        second.export(&session, Some(&surface), ExportFormat::Png),
    );
    let results = [a, b];
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(
        results
            .iter()
            .any(|r| matches!(r, Err(MockupError::ExportInProgress)))
    );
    assert!(!session.is_exporting());

    // Another composition is independent
    let (a, b) = tokio::join!(
        first.export(&session, Some(&surface), ExportFormat::Png),
        second.export(&other, Some(&other_surface), ExportFormat::Png),
    );
    assert!(a.is_ok());
    assert!(b.is_ok());
    assert_eq!(delivery.files.lock().unwrap().len(), 3);
}

#[tokio::test]
async fn photo_404_falls_back_until_color_changes() {
    let mut config = (*ProductRegistry::builtin().unwrap().require("tshirt").unwrap()).clone();
    config.render_mode = RenderMode::Photographic;
    config.photo = Some(PhotoAssets {
        base_url: "https://photos.test/tshirt/".into(),
        color_map: [("white".to_string(), "white.png".to_string())].into(),
        fallback: Some("any.png".into()),
    });
    let session = CompositionSession::new(Arc::new(config), "Acme");
    let fetcher = Arc::new(
        MemoryFetcher::default().with("https://photos.test/tshirt/any.png", png([0, 128, 0, 255])),
    );
    let delivery = Arc::new(MemoryDelivery::default());
    let pipeline = pipeline(fetcher, delivery.clone(), 1.0);
    let surface = surface();

    // white.png is missing: the export still succeeds with the vector silhouette
    let outcome = pipeline
        .export(&session, Some(&surface), ExportFormat::Png)
        .await
        .unwrap();
    assert!(session.state().ui.photo_load_failed);
    assert!(outcome.snapshot.ui.photo_load_failed);

    // Another color resets the flag and its photo loads
    session.dispatch(Action::SelectColor("navy".into()));
    assert!(!session.state().ui.photo_load_failed);
    let outcome = pipeline
        .export(&session, Some(&surface), ExportFormat::Pdf)
        .await
        .unwrap();
    assert!(!outcome.snapshot.ui.photo_load_failed);
    assert!(surface.image("https://photos.test/tshirt/any.png").is_some());

    let files = delivery.files.lock().unwrap();
    assert_eq!(files[1].0, "tshirt-acme.pdf");
    assert!(files[1].2.starts_with(b"%PDF"));
}
