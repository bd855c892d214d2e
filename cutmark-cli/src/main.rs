//! `cutmark`: mark cut points on a sampled mesh and split meshes along them.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use cutmark_algorithms::{
    curvature_cut_labels, decompose, normalize_with_mesh, sample_surface, CutPlaneOptions,
};
use cutmark_core::{ColoredPointCloud3f, Point3f, TriangleMesh};
use cutmark_inference::{load_model, mark_cuts, MarkOptions, PointBatch};
use cutmark_io::{load_config, read_mesh, write_mesh, CutmarkConfig, PlyReader};
use cutmark_visualization::{rescale_scores, show_point_cloud, RenderOptions};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Score the points of a cloud as cuts and write them jet colored
    Mark(MarkArgs),
    /// Fit planes to marked cut points and clip the mesh into pieces
    Decompose(DecomposeArgs),
}

#[derive(Args, Debug)]
struct MarkArgs {
    #[arg(long, help = "mesh to sample (obj or ply)")]
    mesh: Option<PathBuf>,
    #[arg(long, help = "point cloud with a per point cut label (ply)")]
    labels: Option<PathBuf>,
    #[arg(long, default_value = "model/checkpoint.pt", help = "scripted model checkpoint")]
    checkpoint: PathBuf,
    #[arg(long, default_value = "config/config.yaml")]
    config: PathBuf,
    #[arg(long, help = "random seed for surface sampling")]
    seed: Option<u64>,
    #[arg(long, help = "show the ground truth labels instead of predictions")]
    gt: bool,
    #[arg(long = "no-threshold", help = "keep raw model scores")]
    no_threshold: bool,
    #[arg(long = "use-curvature", help = "mark cuts from discrete Gaussian curvature")]
    use_curvature: bool,
    #[arg(long, short = 'o', default_value = "cuts.ply", help = "colored point cloud output")]
    output: PathBuf,
    #[arg(long, help = "also render a PNG preview")]
    render: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct DecomposeArgs {
    #[arg(long, help = "mesh to decompose (obj or ply)")]
    mesh: PathBuf,
    #[arg(long, help = "labeled point cloud; points at or above the cut threshold are cuts")]
    labels: PathBuf,
    #[arg(long, default_value = "config/config.yaml")]
    config: PathBuf,
    #[arg(long, help = "random seed for plane fitting")]
    seed: Option<u64>,
    #[arg(long = "output-dir", default_value = "pieces")]
    output_dir: PathBuf,
}

/// Where the per point scores come from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScoreSource {
    GroundTruth,
    Curvature,
    Model,
}

fn score_source(args: &MarkArgs) -> Result<ScoreSource> {
    if args.gt {
        if args.labels.is_none() {
            bail!("--gt needs --labels");
        }
        Ok(ScoreSource::GroundTruth)
    } else if args.use_curvature {
        if args.mesh.is_none() {
            bail!("--use-curvature needs --mesh");
        }
        Ok(ScoreSource::Curvature)
    } else {
        Ok(ScoreSource::Model)
    }
}

fn config_or_default(path: &Path) -> Result<CutmarkConfig> {
    if path.exists() {
        load_config(path).with_context(|| format!("loading {}", path.display()))
    } else {
        log::warn!("{} not found, using default configuration", path.display());
        Ok(CutmarkConfig::default())
    }
}

fn read_mesh_checked(path: &Path) -> Result<TriangleMesh> {
    read_mesh(path).with_context(|| format!("reading mesh {}", path.display()))
}

fn run_mark(args: MarkArgs) -> Result<ColoredPointCloud3f> {
    let source = score_source(&args)?;
    let config = config_or_default(&args.config)?;

    let mut mesh = args.mesh.as_deref().map(read_mesh_checked).transpose()?;
    let mut labels = None;

    let points: Vec<Point3f> = if let Some(path) = &args.labels {
        let cloud = PlyReader::read_labeled_point_cloud(path)
            .with_context(|| format!("reading labeled cloud {}", path.display()))?;
        labels = Some(cloud.labels());
        cloud.positions()
    } else {
        let Some(mesh) = mesh.as_mut() else {
            bail!("either --labels or --mesh is required");
        };
        let mut cloud = sample_surface(mesh, config.sampling.num_points, args.seed)?;
        normalize_with_mesh(&mut cloud, mesh)?;
        cloud.points
    };
    log::info!("{} points, scoring with {:?}", points.len(), source);

    let scores = match (source, labels) {
        (ScoreSource::GroundTruth, Some(labels)) => labels,
        (ScoreSource::GroundTruth, None) => bail!("--gt needs --labels"),
        (ScoreSource::Curvature, _) => {
            let Some(mesh) = mesh.as_ref() else {
                bail!("--use-curvature needs --mesh");
            };
            curvature_cut_labels(mesh, &points, config.curvature.radius, config.curvature.threshold)?
        }
        (ScoreSource::Model, _) => {
            let model = load_model(&args.checkpoint)
                .with_context(|| format!("loading model {}", args.checkpoint.display()))?;
            let options = MarkOptions {
                batch_size: config.model.batch_size,
                cut_point_threshold: config.general.cut_point_threshold,
                no_threshold: args.no_threshold,
            };
            mark_cuts(&PointBatch::Single(points.clone()), &model, &options)?
                .into_rows()
                .into_iter()
                .next()
                .unwrap_or_default()
        }
    };

    let colors = display_scores(source, args.no_threshold, scores, config.general.cut_point_threshold);

    let render_options = RenderOptions::from(&config.render);
    let preview = args.render.as_deref().map(|path| (path, &render_options));
    show_point_cloud(&points, &colors, &args.output, preview)
        .with_context(|| format!("writing {}", args.output.display()))
}

/// Scores as they are colored; raw model output is stretched onto `[0, 1]`
fn display_scores(source: ScoreSource, no_threshold: bool, scores: Vec<f32>, threshold: f32) -> Vec<f32> {
    if source == ScoreSource::Model && no_threshold {
        let (lo, hi) = scores
            .iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &s| (lo.min(s), hi.max(s)));
        log::info!("raw scores over {} points range from {} to {}", scores.len(), lo, hi);
        return rescale_scores(&scores);
    }
    let cuts = count_cuts(source, &scores, threshold);
    log::info!("{} of {} points marked as cuts", cuts, scores.len());
    scores
}

/// Ground truth may carry continuous values; curvature and thresholded model output are 0/1
fn count_cuts(source: ScoreSource, scores: &[f32], threshold: f32) -> usize {
    match source {
        ScoreSource::GroundTruth => scores.iter().filter(|&&s| s >= threshold).count(),
        ScoreSource::Curvature | ScoreSource::Model => scores.iter().filter(|&&s| s > 0.0).count(),
    }
}

fn run_decompose(args: DecomposeArgs) -> Result<()> {
    let config = config_or_default(&args.config)?;
    let mesh = read_mesh_checked(&args.mesh)?;
    let cloud = PlyReader::read_labeled_point_cloud(&args.labels)
        .with_context(|| format!("reading labeled cloud {}", args.labels.display()))?;

    let threshold = config.general.cut_point_threshold;
    let cut_points: Vec<Point3f> = cloud
        .iter()
        .filter(|p| p.label >= threshold)
        .map(|p| p.position)
        .collect();
    log::info!("{} cut points out of {}", cut_points.len(), cloud.len());

    let options = CutPlaneOptions {
        distance_threshold: config.decomposition.distance_threshold,
        max_iterations: config.decomposition.max_iterations,
        min_inliers: config.decomposition.min_inliers,
        max_planes: config.decomposition.max_planes,
        seed: args.seed,
    };
    let pieces = decompose(&mesh, &cut_points, &options)?;

    fs::create_dir_all(&args.output_dir)
        .with_context(|| format!("creating {}", args.output_dir.display()))?;
    for (i, piece) in pieces.iter().enumerate() {
        let path = args.output_dir.join(format!("piece_{}.ply", i));
        write_mesh(piece, &path).with_context(|| format!("writing {}", path.display()))?;
    }
    log::info!("wrote {} pieces to {}", pieces.len(), args.output_dir.display());
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    log::debug!("{:?}", cli);

    match cli.command {
        Command::Mark(args) => run_mark(args).map(|_| ()),
        Command::Decompose(args) => run_decompose(args),
    }
}
