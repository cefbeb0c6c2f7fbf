//! riccimap CLI - conformal maps by tangential Ricci flow.
//!
//! Usage: riccimap <COMMAND> [OPTIONS] <INPUT> [OUTPUT]
//!
//! Run `riccimap --help` for available commands.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{Args, Parser, Subcommand};

use riccimap::algo::boundary::trace_boundary;
use riccimap::algo::embed::{embed, extremal_length, EmbedOptions};
use riccimap::algo::flow::{ricci_flow_with_progress, FlowOptions, TargetCurvature};
use riccimap::algo::Progress;
use riccimap::io::{self, Attributes};
use riccimap::mesh::HalfEdgeMesh;

#[derive(Parser)]
#[command(name = "riccimap")]
#[command(author, version, about = "Conformal parameterization by tangential Ricci flow", long_about = None)]
struct Cli {
    /// Print a summary of each stage and info-level logs
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Flatten a surface onto a disk with circular holes
    TangentRicci {
        /// Input mesh file (.m or .ply)
        input: PathBuf,

        /// Output mesh file with uv coordinates
        output: PathBuf,

        #[command(flatten)]
        flow: FlowArgs,
    },

    /// Flatten a quadrilateral onto a rectangle and print its extremal length
    ExtremalLength {
        /// Input mesh file; the outer boundary needs four sharp/non-sharp corners
        input: PathBuf,

        /// Output mesh file with uv coordinates
        output: PathBuf,

        #[command(flatten)]
        flow: FlowArgs,
    },

    /// Display mesh information
    Info {
        /// Input mesh file
        input: PathBuf,
    },

    /// Write a boundary loop as `source target` vertex id pairs
    Loops {
        /// Input mesh file
        input: PathBuf,

        /// Output text file
        output: PathBuf,

        /// Loop to write, 0 is the longest
        #[arg(short, long, default_value = "0")]
        index: usize,
    },
}

#[derive(Args)]
struct FlowArgs {
    /// Stop once the largest curvature error is below this value
    #[arg(short, long, default_value = "1e-6")]
    threshold: f64,

    /// Gradient step size
    #[arg(short, long, default_value = "0.02")]
    step: f64,

    /// Gradient steps per round
    #[arg(long, default_value = "64")]
    inner_iterations: usize,

    /// Round budget
    #[arg(short = 'r', long, default_value = "1000")]
    max_rounds: usize,

    /// Gradient descent only, no Newton steps
    #[arg(long)]
    no_newton: bool,

    /// Fail on degenerate corner angles instead of clamping them
    #[arg(long)]
    strict_angles: bool,

    /// Face laid out first
    #[arg(long, default_value = "0")]
    seed_face: usize,

    /// Show a progress line on stderr
    #[arg(long)]
    progress: bool,
}

impl FlowArgs {
    fn flow_options(&self, target: TargetCurvature) -> FlowOptions {
        FlowOptions::default()
            .with_target(target)
            .with_threshold(self.threshold)
            .with_step(self.step)
            .with_inner_iterations(self.inner_iterations)
            .with_max_rounds(self.max_rounds)
            .with_newton(!self.no_newton)
            .with_strict_angles(self.strict_angles)
    }

    fn embed_options(&self) -> EmbedOptions {
        EmbedOptions::default().with_seed_face(self.seed_face)
    }
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let verbose = cli.verbose;
    match cli.command {
        Commands::TangentRicci { input, output, flow } => {
            cmd_flatten(&input, &output, &flow, TargetCurvature::DiskWithHoles, verbose)?;
        }

        Commands::ExtremalLength { input, output, flow } => {
            let mesh =
                cmd_flatten(&input, &output, &flow, TargetCurvature::ExtremalLength, verbose)?;
            let loops = trace_boundary(&mesh);
            let outer = loops.first().ok_or("mesh has no boundary")?;
            println!("Extremal length: {:.6}", extremal_length(&mesh, outer)?);
        }

        Commands::Info { input } => {
            cmd_info(&input)?;
        }

        Commands::Loops {
            input,
            output,
            index,
        } => {
            cmd_loops(&input, &output, index, verbose)?;
        }
    }

    Ok(())
}

/// A progress line showing the round and current error.
fn create_progress() -> Progress {
    Progress::new(|p| {
        let bar_width = 30;
        let filled = ((p.fraction() * bar_width as f64) as usize).min(bar_width);
        let bar = "=".repeat(filled);
        let space = " ".repeat(bar_width - filled);

        eprint!(
            "\r[{}{}] round {:>5}/{} error {:.3e}",
            bar,
            space,
            p.round + 1,
            p.max_rounds,
            p.error
        );
        let _ = std::io::stderr().flush();
    })
}

fn cmd_flatten(
    input: &Path,
    output: &Path,
    args: &FlowArgs,
    target: TargetCurvature,
    verbose: bool,
) -> Result<HalfEdgeMesh, Box<dyn std::error::Error>> {
    let mut mesh: HalfEdgeMesh = io::load(input)?;
    if verbose {
        println!("Loaded: {} vertices, {} faces", mesh.num_vertices(), mesh.num_faces());
    }

    let progress = if args.progress {
        create_progress()
    } else {
        Progress::none()
    };

    let start = Instant::now();
    let result = ricci_flow_with_progress(&mut mesh, &args.flow_options(target), &progress);
    if args.progress {
        eprintln!();
    }
    let report = result?;
    if verbose {
        println!(
            "Converged: {} rounds, {} iterations, {} Newton steps, error {:.3e} ({:.2?})",
            report.rounds,
            report.iterations,
            report.newton_steps,
            report.error,
            start.elapsed()
        );
        if report.degenerate_angles > 0 {
            println!("Clamped corner angles: {}", report.degenerate_angles);
        }
    }

    let layout = embed(&mut mesh, &args.embed_options())?;
    if verbose {
        println!("Embedded: {} faces, {} component(s)", layout.faces, layout.components);
    }

    io::save(
        &mesh,
        output,
        Attributes::UV | Attributes::FATHER | Attributes::RGB | Attributes::SHARP,
    )?;
    if verbose {
        println!("Saved: {}", output.display());
    }

    Ok(mesh)
}

fn cmd_info(input: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let mesh: HalfEdgeMesh = io::load(input)?;

    println!("File: {}", input.display());
    println!("Vertices: {}", mesh.num_vertices());
    println!("Edges: {}", mesh.num_edges());
    println!("Faces: {}", mesh.num_faces());
    println!("Euler characteristic: {}", mesh.euler_characteristic());
    println!("Surface area: {:.6}", mesh.surface_area());

    if let Some((min, max)) = mesh.bounding_box() {
        println!(
            "Bounding box: ({:.3}, {:.3}, {:.3}) to ({:.3}, {:.3}, {:.3})",
            min.x, min.y, min.z, max.x, max.y, max.z
        );
    }

    let sharp = mesh.edge_ids().filter(|&e| mesh.edge(e).sharp).count();
    println!("Sharp edges: {}", sharp);

    let loops = trace_boundary(&mesh);
    if loops.is_empty() {
        println!("Topology: Closed (no boundary)");
    } else {
        println!("Boundary loops: {}", loops.len());
        for l in &loops {
            println!(
                "  [{}] {} edges, length {:.6}{}",
                l.index(),
                l.len(),
                l.length(),
                if l.is_outer() { " (outer)" } else { "" }
            );
        }
    }

    Ok(())
}

fn cmd_loops(
    input: &Path,
    output: &Path,
    index: usize,
    verbose: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mesh: HalfEdgeMesh = io::load(input)?;
    let loops = trace_boundary(&mesh);

    let boundary = loops
        .get(index)
        .ok_or_else(|| format!("loop {} requested, mesh has {} boundary loop(s)", index, loops.len()))?;
    boundary.write(&mesh, output)?;
    if verbose {
        println!(
            "Saved loop {} ({} edges) to {}",
            index,
            boundary.len(),
            output.display()
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::ffi::OsStr;

    use super::*;

    #[test]
    fn test_quiet_by_default() {
        let cli = Cli::try_parse_from(["riccimap", "tangent-ricci", "in.m", "out.m"]).unwrap();
        assert!(!cli.verbose);
    }

    #[test]
    fn test_verbose_after_subcommand() {
        let cli = Cli::try_parse_from(["riccimap", "loops", "in.m", "out.txt", "-v"]).unwrap();
        assert!(cli.verbose);
        assert!(matches!(cli.command, Commands::Loops { index: 0, .. }));
    }

    #[test]
    fn test_silent_flatten_writes_output() {
        let dir = std::env::temp_dir();
        let input = dir.join(format!("riccimap-cli-{}.m", std::process::id()));
        let output = dir.join(format!("riccimap-cli-{}.uv.m", std::process::id()));
        std::fs::write(
            &input,
            "Vertex 1 0 0 0\nVertex 2 1 0 0\nVertex 3 0 1 0\nFace 1 1 2 3\n",
        )
        .unwrap();

        let cli = Cli::try_parse_from([
            OsStr::new("riccimap"),
            OsStr::new("tangent-ricci"),
            input.as_os_str(),
            output.as_os_str(),
        ])
        .unwrap();
        run(cli).unwrap();
        assert!(std::fs::read_to_string(&output).unwrap().contains("uv=("));

        std::fs::remove_file(&input).ok();
        std::fs::remove_file(&output).ok();
    }
}
