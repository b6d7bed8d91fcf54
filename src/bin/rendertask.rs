use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand};

use rendertask::action::{ActionHistory, ActionRegistry};
use rendertask::{PlanSummary, ProgressCallback, RenderOpts, Scene};

#[derive(Parser, Debug)]
#[command(name = "rendertask", version)]
struct Cli {
    /// Maximum log level written to stderr.
    #[arg(long, global = true, default_value_t = tracing::Level::WARN)]
    log_level: tracing::Level,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a scene as a PNG.
    Render(RenderArgs),
    /// Print the optimized task list of a scene as JSON.
    Plan(PlanArgs),
}

#[derive(Parser, Debug)]
struct SceneArgs {
    /// Input scene JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Render options JSON.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Only render `x0,y0,x1,y1` output pixels.
    #[arg(long, value_delimiter = ',', num_args = 4)]
    region: Option<Vec<i32>>,

    /// Override a scene value before rendering, as `/json/pointer=<json>`. Repeatable.
    #[arg(long = "set")]
    set: Vec<String>,
}

#[derive(Parser, Debug)]
struct RenderArgs {
    #[command(flatten)]
    scene: SceneArgs,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Parser, Debug)]
struct PlanArgs {
    #[command(flatten)]
    scene: SceneArgs,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_max_level(cli.log_level)
        .with_writer(std::io::stderr)
        .init();

    match cli.cmd {
        Command::Render(args) => cmd_render(args),
        Command::Plan(args) => cmd_plan(args),
    }
}

fn load(args: &SceneArgs) -> anyhow::Result<(Scene, RenderOpts)> {
    let mut scene = Scene::from_path(&args.in_path)?;
    let mut opts = match &args.config {
        Some(path) => RenderOpts::from_path(path)?,
        None => RenderOpts::default(),
    };
    if let Some(r) = &args.region {
        let [x0, y0, x1, y1] = <[i32; 4]>::try_from(r.as_slice())
            .map_err(|_| anyhow::anyhow!("--region takes exactly four values"))?;
        opts.region = Some([x0, y0, x1, y1]);
    }

    let registry = ActionRegistry::with_builtin();
    let mut history = ActionHistory::new();
    for edit in &args.set {
        let (pointer, raw) = edit
            .split_once('=')
            .with_context(|| format!("--set '{edit}' is not of the form pointer=value"))?;
        let value: serde_json::Value = serde_json::from_str(raw)
            .with_context(|| format!("--set '{edit}': value is not JSON"))?;
        let action = registry.create(
            "set_param",
            &serde_json::json!({ "pointer": pointer, "value": value }),
        )?;
        history.perform(action, &mut scene)?;
    }
    Ok((scene, opts))
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let (scene, opts) = load(&args.scene)?;
    let mut frame = rendertask::render_scene(&scene, &opts, &mut LogProgress)?;
    frame.unpremultiply();

    if let Some(parent) = args.out.parent().filter(|p| *p != Path::new("")) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }

    image::save_buffer_with_format(
        &args.out,
        &frame.data,
        frame.width,
        frame.height,
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write png '{}'", args.out.display()))?;

    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_plan(args: PlanArgs) -> anyhow::Result<()> {
    let (scene, opts) = load(&args.scene)?;
    let prepared = rendertask::plan_scene(&scene, &opts)?;
    let summary = PlanSummary::new(&prepared);
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

struct LogProgress;

impl ProgressCallback for LogProgress {
    fn error(&mut self, msg: &str) -> bool {
        tracing::error!("{msg}");
        true
    }

    fn warning(&mut self, msg: &str) -> bool {
        tracing::warn!("{msg}");
        true
    }

    fn amount_complete(&mut self, current: usize, total: usize) -> bool {
        tracing::info!(current, total, "progress");
        true
    }
}
