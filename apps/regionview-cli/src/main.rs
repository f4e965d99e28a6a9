use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use glam::Vec3;
use regionview_assets::{LayerMap, ObjectCatalog, TextureIndex};
use regionview_common::RegionCoord;
use regionview_formats::{ObjectRegion, ResourceBundle, TerrainRegion};
use regionview_mesh::build_region_mesh;
use regionview_render::HeadlessBackend;
use regionview_stream::{RegionCatalog, StreamConfig, StreamingCache};
use regionview_tools::RegionInspector;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "regionview-cli", about = "CLI tool for region, object and bundle files")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Streaming config (JSON); flags override its values
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print version and crate info
    Info,
    /// Scan a map root and report its region catalog
    Index {
        root: PathBuf,
        /// List every cataloged file
        #[arg(short, long)]
        list: bool,
    },
    /// Decode a terrain region file
    Terrain {
        file: PathBuf,
        /// Region coordinate as `x,z`; defaults to the `<Z>/<X>.m` path
        #[arg(long)]
        coord: Option<String>,
        /// Also build the mesh and report its size
        #[arg(long)]
        mesh: bool,
        #[arg(long)]
        json: bool,
    },
    /// Decode an object region file
    Objects {
        file: PathBuf,
        #[arg(long)]
        coord: Option<String>,
        /// `object.ifo` used to resolve object ids to paths
        #[arg(long)]
        catalog: Option<PathBuf>,
        #[arg(long)]
        json: bool,
    },
    /// Decode a resource bundle
    Bundle {
        file: PathBuf,
        /// Print the full decoded bundle as JSON
        #[arg(long)]
        json: bool,
    },
    /// Parse `tile2d.ifo` and assign texture layers
    Textures {
        root: PathBuf,
        /// Only assign layers to textures whose image exists
        #[arg(long)]
        require_images: bool,
        /// Write the layer map as JSON
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Walk a viewpoint between two regions through the streaming cache
    Walk {
        root: PathBuf,
        /// Start region `x,z`
        #[arg(long, default_value = "0,0")]
        from: String,
        /// End region `x,z`
        #[arg(long, default_value = "4,4")]
        to: String,
        /// Simulated frames
        #[arg(long, default_value = "120")]
        frames: u32,
        /// Seconds per frame
        #[arg(long, default_value = "0.016")]
        dt: f32,
        #[arg(long)]
        range: Option<u32>,
        #[arg(long)]
        budget: Option<usize>,
        /// Skip `tile2d.ifo`; every texture uses the default layer
        #[arg(long)]
        no_textures: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();

    let mut config = match &cli.config {
        Some(path) => StreamConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => StreamConfig::default(),
    };

    match cli.command {
        Commands::Info => {
            println!("regionview-cli v{}", env!("CARGO_PKG_VERSION"));
            println!("common: {}", regionview_common::crate_info());
            println!("formats: {}", regionview_formats::crate_info());
            println!("mesh: {}", regionview_mesh::crate_info());
            println!("render: {}", regionview_render::crate_info());
            println!("assets: {}", regionview_assets::crate_info());
            println!("stream: {}", regionview_stream::crate_info());
            println!("tools: {}", regionview_tools::crate_info());
        }
        Commands::Index { root, list } => {
            let catalog = RegionCatalog::scan(&root)
                .with_context(|| format!("indexing {}", root.display()))?;
            tracing::info!(
                root = %root.display(),
                regions = catalog.len(),
                skipped = catalog.skipped().len(),
                "catalog built"
            );
            println!(
                "Catalog {}: terrain={} objects={} skipped={}",
                root.display(),
                catalog.terrain_count(),
                catalog.objects_count(),
                catalog.skipped().len()
            );
            if let Some((min, max)) = catalog.bounds() {
                println!("Bounds: {min}..{max}");
            }
            if list {
                for entry in catalog.entries() {
                    println!("  {} {:?} {}", entry.coord, entry.kind, entry.path.display());
                }
            }
        }
        Commands::Terrain {
            file,
            coord,
            mesh,
            json,
        } => {
            let coord = resolve_coord(&file, coord.as_deref())?;
            let bytes = read(&file)?;
            let region = TerrainRegion::try_decode(&bytes, coord)
                .with_context(|| format!("decoding {}", file.display()))?;
            tracing::info!(%coord, blocks = region.block_count(), "terrain decoded");
            let summary = RegionInspector::terrain(&region);
            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                println!("{summary}");
            }
            if mesh {
                let built = build_region_mesh(
                    &region,
                    &LayerMap::default(),
                    config.default_layer,
                    config.region_size,
                );
                println!(
                    "Mesh: vertices={} triangles={} bytes={} origin=({:.0}, {:.0}, {:.0})",
                    built.vertex_count(),
                    built.triangle_count(),
                    built.as_bytes().len(),
                    built.origin.x,
                    built.origin.y,
                    built.origin.z
                );
            }
        }
        Commands::Objects {
            file,
            coord,
            catalog,
            json,
        } => {
            let coord = resolve_coord(&file, coord.as_deref())?;
            let bytes = read(&file)?;
            let region = ObjectRegion::try_decode(&bytes, coord)
                .with_context(|| format!("decoding {}", file.display()))?;
            let catalog = catalog.map(ObjectCatalog::load).transpose()?;
            if json {
                let objects: Vec<_> = region.objects().collect();
                println!("{}", serde_json::to_string_pretty(&objects)?);
            } else {
                println!(
                    "Objects {coord}: {} unique of {} records",
                    region.len(),
                    region.record_count()
                );
                for obj in region.objects() {
                    let path = catalog
                        .as_ref()
                        .and_then(|c| c.resolve(obj.object_id))
                        .map_or("?", |e| e.path.as_str());
                    println!(
                        "  [{}] id={} pos=({:.1}, {:.1}, {:.1}) yaw={:.2} static={} {path}",
                        obj.unique_id,
                        obj.object_id,
                        obj.position.x,
                        obj.position.y,
                        obj.position.z,
                        obj.yaw,
                        obj.is_static()
                    );
                }
            }
        }
        Commands::Bundle { file, json } => {
            let bytes = read(&file)?;
            let bundle = ResourceBundle::try_decode(&bytes)
                .with_context(|| format!("decoding {}", file.display()))?;
            tracing::info!(file = %file.display(), "bundle decoded");
            if json {
                println!("{}", serde_json::to_string_pretty(&bundle)?);
            } else {
                println!("{}", RegionInspector::bundle(&bundle));
            }
        }
        Commands::Textures {
            root,
            require_images,
            out,
        } => {
            let index = TextureIndex::load(&root)?;
            let layers = index.layer_map(require_images);
            println!(
                "Textures: {} entries, {} skipped lines, {} layers",
                index.len(),
                index.skipped(),
                layers.len()
            );
            for (id, layer) in layers.iter() {
                if let Some(entry) = index.get(id) {
                    println!("  {id:>4} -> layer {layer:>3}  {}", entry.path);
                }
            }
            if let Some(out) = out {
                layers
                    .save(&out)
                    .with_context(|| format!("writing {}", out.display()))?;
                println!("Layer map written to {}", out.display());
            }
        }
        Commands::Walk {
            root,
            from,
            to,
            frames,
            dt,
            range,
            budget,
            no_textures,
        } => {
            if let Some(range) = range {
                config.load_range = range;
            }
            if budget.is_some() {
                config.load_budget = budget;
            }
            let from = parse_coord(&from)?;
            let to = parse_coord(&to)?;

            let mut cache = StreamingCache::new(HeadlessBackend::new(), config.clone());
            if !no_textures {
                // The texture index is required next to the region tree.
                let index = TextureIndex::load(&root)?;
                cache.set_layers(index.layer_map(true));
            }
            let regions = cache
                .reindex(&root)
                .with_context(|| format!("indexing {}", root.display()))?;
            tracing::info!(%from, %to, frames, terrain = regions, "walk started");

            let start = region_center(from, config.region_size);
            let end = region_center(to, config.region_size);
            for frame in 0..=frames {
                let t = if frames == 0 { 1.0 } else { frame as f32 / frames as f32 };
                let pos = start.lerp(end, t);
                if let Some(outcome) = cache.tick(dt, pos) {
                    if !outcome.is_noop() || outcome.deferred > 0 {
                        println!(
                            "frame {frame:>4} at {}: +{} -{} failed={} deferred={}",
                            RegionCoord::from_world(pos, config.region_size),
                            outcome.loaded.len(),
                            outcome.evicted.len(),
                            outcome.failed.len(),
                            outcome.deferred
                        );
                    }
                }
            }
            tracing::info!(
                loaded = cache.loaded_count(),
                uploads = cache.backend().uploads(),
                releases = cache.backend().releases(),
                "walk finished"
            );
            println!("{}", RegionInspector::summary(&cache));
            println!("{}", cache.backend().describe());
        }
    }

    Ok(())
}

fn read(path: &Path) -> anyhow::Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("reading {}", path.display()))
}

fn region_center(coord: RegionCoord, region_size: f32) -> Vec3 {
    coord.world_origin(region_size) + Vec3::new(region_size / 2.0, 0.0, region_size / 2.0)
}

/// Parse `x,z`.
fn parse_coord(s: &str) -> anyhow::Result<RegionCoord> {
    let Some((x, z)) = s.split_once(',') else {
        bail!("expected `x,z`, got {s:?}");
    };
    Ok(RegionCoord::new(
        x.trim().parse().with_context(|| format!("bad x in {s:?}"))?,
        z.trim().parse().with_context(|| format!("bad z in {s:?}"))?,
    ))
}

/// Coordinate from `--coord`, or from a `<Z>/<X>.ext` path.
fn resolve_coord(file: &Path, explicit: Option<&str>) -> anyhow::Result<RegionCoord> {
    if let Some(s) = explicit {
        return parse_coord(s);
    }
    coord_from_path(file)
        .with_context(|| format!("cannot infer region from {}; pass --coord x,z", file.display()))
}

fn coord_from_path(file: &Path) -> Option<RegionCoord> {
    let x = file.file_stem()?.to_str()?.parse().ok()?;
    let z = file.parent()?.file_name()?.to_str()?.parse().ok()?;
    Some(RegionCoord::new(x, z))
}
