//! # mockup CLI
//!
//! Composes product mockups from the command line.
//!
//! ## Usage
//!
//! ```bash
//! # List catalogue products and their colors
//! mockup products
//!
//! # Export a navy t-shirt with a logo and brand text
//! mockup export tshirt --brand "Acme" --color navy --logo logo.png
//!
//! # Add extra text, restore a preset and write a PDF
//! mockup export mug --brand "Acme" --text "Est. 1999" --preset brand.json --format pdf
//!
//! # Remove the logo background through the configured service first
//! mockup --config engine.json export tote --logo https://cdn.example/logo.png --remove-background
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use mockup_renderer::{
    Action, BrandSettings, CompositionSession, EngineConfig, ExportFormat, ExportPipeline,
    HttpBackgroundRemover, HttpFetcher, MockupError, ProductRegistry, ProductView, RemovalSlot,
    RenderSurface, TextEffect, TextItem, TextPatch,
};

/// mockup - Product mockup composer
#[derive(Parser, Debug)]
#[command(name = "mockup")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Engine configuration file (JSON)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Product catalogue replacing the built-in one (JSON)
    #[arg(long, global = true, value_name = "FILE")]
    catalogue: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List catalogue products
    Products,

    /// Compose a mockup and write it to the output directory
    Export {
        /// Product id from the catalogue
        product: String,

        /// Brand text
        #[arg(long, default_value = "Your Brand")]
        brand: String,

        /// Swatch id (defaults to the product's default color)
        #[arg(long)]
        color: Option<String>,

        /// Product view
        #[arg(long, value_enum)]
        view: Option<ProductView>,

        /// Logo image: path, http(s) URL or data URL
        #[arg(long)]
        logo: Option<String>,

        /// Logo scale (0.5 - 2.0)
        #[arg(long)]
        logo_scale: Option<f32>,

        /// Custom product photo replacing the catalogue artwork
        #[arg(long)]
        photo: Option<String>,

        /// Additional text item (repeatable)
        #[arg(long = "text", value_name = "TEXT")]
        texts: Vec<String>,

        /// Effect applied to the brand text
        #[arg(long, value_enum)]
        effect: Option<TextEffect>,

        /// Brand preset to restore (JSON)
        #[arg(long, value_name = "FILE")]
        preset: Option<PathBuf>,

        /// Remove logo and photo backgrounds through the configured service
        #[arg(long)]
        remove_background: bool,

        /// Output format
        #[arg(long, value_enum, default_value = "png")]
        format: ExportFormat,

        /// Output directory (overrides the configuration)
        #[arg(long, short, value_name = "DIR")]
        out: Option<PathBuf>,

        /// Pixel density of the capture (overrides the configuration)
        #[arg(long)]
        density: Option<f32>,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run(Cli::parse()).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), MockupError> {
    let mut config = match &cli.config {
        Some(path) => EngineConfig::from_path(path)?,
        None => EngineConfig::default(),
    };
    let registry = match &cli.catalogue {
        Some(path) => ProductRegistry::from_json(&std::fs::read_to_string(path)?)?,
        None => ProductRegistry::builtin()?,
    };

    match cli.command {
        Commands::Products => {
            for id in registry.ids() {
                let Some(product) = registry.get(id) else {
                    continue;
                };
                let colors: Vec<&str> = product.colors.iter().map(|c| c.id.as_str()).collect();
                println!("{:<10} {:<24} {}", product.id, product.name, colors.join(", "));
            }
            Ok(())
        }
        Commands::Export {
            product,
            brand,
            color,
            view,
            logo,
            logo_scale,
            photo,
            texts,
            effect,
            preset,
            remove_background,
            format,
            out,
            density,
        } => {
            if let Some(out) = out {
                config.export.output_dir = out;
            }
            if let Some(density) = density {
                config.pixel_density = density;
            }
            config.validate()?;

            let session = CompositionSession::from_registry(&registry, &product, &brand)?;
            let mut actions = Vec::new();
            if let Some(color) = color {
                if session.config().color(&color).is_none() {
                    log::warn!("{product} has no color {color:?}, keeping the default");
                }
                actions.push(Action::SelectColor(color));
            }
            if let Some(view) = view {
                actions.push(Action::SetView(view));
            }
            if let Some(path) = preset {
                let settings = BrandSettings::from_json(&std::fs::read_to_string(path)?)?;
                actions.push(Action::RestoreBrandSettings(settings));
            }
            if let Some(effect) = effect {
                actions.push(Action::UpdateBrand(TextPatch {
                    effect: Some(effect),
                    ..TextPatch::default()
                }));
            }
            for text in texts {
                actions.push(Action::AddText(TextItem::new(session.config(), text)));
            }
            if let Some(scale) = logo_scale {
                actions.push(Action::SetLogoScale(scale));
            }
            actions.push(Action::SetLogoSource(logo));
            actions.push(Action::SetCustomPhoto(photo));
            session.dispatch_all(actions);

            let fetcher = Arc::new(HttpFetcher::new(&config.network)?);
            if remove_background {
                match HttpBackgroundRemover::from_settings(&config.network)? {
                    Some(remover) => {
                        for slot in [RemovalSlot::Logo, RemovalSlot::ProductPhoto] {
                            session.remove_background(slot, &remover, fetcher.as_ref()).await;
                        }
                    }
                    None => log::warn!("no background removal service configured, skipping"),
                }
            }

            let surface = RenderSurface::new(&config);
            let pipeline = ExportPipeline::from_config(&config, fetcher);
            let outcome = pipeline.export(&session, Some(&surface), format).await?;
            println!("{}", outcome.location);
            Ok(())
        }
    }
}
