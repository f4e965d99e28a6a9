use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use glam::Vec3;
use regionview_common::{BLOCKS_PER_REGION, RegionCoord};
use regionview_formats::{PlacedObject, TerrainBlock, TerrainRegion, encode_object_blocks};

#[derive(Parser)]
#[command(name = "xtask", about = "Workspace automation for regionview")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run all checks: fmt, clippy, tests, doc
    Check,
    /// Run cargo fmt --check on all crates
    Fmt,
    /// Run clippy on all crates
    Clippy,
    /// Run all tests
    Test,
    /// Build rustdoc for the workspace
    Doc,
    /// Build the entire workspace
    Build,
    /// Write a synthetic map tree (`<Z>/<X>.m`, `<Z>/<X>.o`, `tile2d.ifo`)
    Fixtures {
        out: PathBuf,
        /// Regions per side, centered on (0, 0)
        #[arg(long, default_value = "5")]
        side: i32,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Check => {
            cargo(&["fmt", "--all", "--", "--check"], "fmt check")?;
            run_clippy()?;
            cargo(&["test", "--workspace"], "test")?;
            cargo(&["doc", "--workspace", "--no-deps"], "doc")?;
        }
        Commands::Fmt => cargo(&["fmt", "--all", "--", "--check"], "fmt check")?,
        Commands::Clippy => run_clippy()?,
        Commands::Test => cargo(&["test", "--workspace"], "test")?,
        Commands::Doc => cargo(&["doc", "--workspace", "--no-deps"], "doc")?,
        Commands::Build => cargo(&["build", "--workspace"], "build")?,
        Commands::Fixtures { out, side } => write_fixtures(&out, side)?,
    }

    Ok(())
}

fn cargo(args: &[&str], what: &str) -> Result<()> {
    println!("==> Running cargo {}", args.join(" "));
    let status = Command::new("cargo").args(args).status()?;
    if !status.success() {
        anyhow::bail!("cargo {what} failed");
    }
    Ok(())
}

fn run_clippy() -> Result<()> {
    cargo(
        &["clippy", "--workspace", "--all-targets", "--", "-D", "warnings"],
        "clippy",
    )
}

const TEXTURE_INDEX: &str = "\
JMXVOBJI1000
3
0 0x00000000 \"fixture\" \"grass\\g01.ddj\"
1 0x00000000 \"fixture\" \"rock\\r01.ddj\"
2 0x00000000 \"fixture\" \"water\\w01.ddj\"
";

fn write_fixtures(out: &Path, side: i32) -> Result<()> {
    let side = side.max(1);
    let half = side / 2;
    println!("==> Writing {side}x{side} fixture regions to {}", out.display());

    for z in -half..side - half {
        let dir = out.join(z.to_string());
        std::fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;
        for x in -half..side - half {
            let coord = RegionCoord::new(x, z);
            let region = TerrainRegion::from_fn(coord, |block| {
                let texture = ((block.x as i32 + x + z).rem_euclid(3)) as u16;
                TerrainBlock::from_fn(*b"fixtur", texture, |cx, cz| {
                    ((cx + block.x as usize * 16) as f32 * 0.3).sin() * 20.0
                        + ((cz + block.z as usize * 16) as f32 * 0.2).cos() * 15.0
                })
            });
            let bytes = region
                .encode()
                .context("fixture region is initialized")?;
            std::fs::write(dir.join(format!("{x}.m")), bytes)?;

            let mut blocks = vec![Vec::new(); BLOCKS_PER_REGION];
            blocks[0].push(PlacedObject {
                object_id: (x.rem_euclid(4)) as u32,
                position: Vec3::new(96.0, 0.0, 96.0),
                static_flag: -1,
                yaw: 0.0,
                unique_id: 1,
                reserved: 0,
                is_big: 0,
                is_struct: 0,
            });
            std::fs::write(dir.join(format!("{x}.o")), encode_object_blocks(&blocks))?;
        }
    }

    std::fs::write(out.join("tile2d.ifo"), TEXTURE_INDEX)?;
    println!("==> Done");
    Ok(())
}
