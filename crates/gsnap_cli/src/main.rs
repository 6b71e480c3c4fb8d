use anyhow::{anyhow, bail, Context, Result};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};

use gsnap_core::{ComConfig, Framing, ParticleSet, Snapshot};

#[derive(Parser)]
#[command(
    name = "gsnap",
    about = "Snapshot tool: robust center of mass of the star particles",
    args_conflicts_with_subcommands = true
)]
struct Cli {
    #[command(subcommand)]
    cmd: Option<Cmd>,

    /// Snapshot file (type 2) to compute the center of mass of
    input: Option<PathBuf>,

    /// JSON file overriding the estimator settings
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Include species 0 and 1 (excluded by default)
    #[arg(long, default_value_t = false)]
    all_species: bool,

    /// More log output on stderr (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(ValueEnum, Clone, Copy)]
enum CliFraming {
    Type1,
    Type2,
}

impl From<CliFraming> for Framing {
    fn from(f: CliFraming) -> Self {
        match f {
            CliFraming::Type1 => Framing::Type1,
            CliFraming::Type2 => Framing::Type2,
        }
    }
}

#[derive(Subcommand)]
enum Cmd {
    /// Print header counts, masses and blocks as JSON
    Info {
        input: PathBuf,
        #[arg(long, value_enum, default_value_t = CliFraming::Type2)]
        framing: CliFraming,
    },

    /// Read a snapshot, apply edits, write it again
    Rewrite {
        input: PathBuf,
        output: PathBuf,
        /// Framing of the input file
        #[arg(long, value_enum, default_value_t = CliFraming::Type2)]
        from: CliFraming,
        /// Framing of the output file
        #[arg(long, value_enum, default_value_t = CliFraming::Type2)]
        framing: CliFraming,
        /// Remove the first block with this name (repeatable)
        #[arg(long, value_name = "NAME")]
        drop_block: Vec<String>,
        /// Append a block from a JSON array of floats (repeatable)
        #[arg(long, value_name = "NAME=FILE")]
        append_block: Vec<String>,
        /// Fold species 1 into species 0
        #[arg(long, default_value_t = false)]
        merge_species: bool,
        /// Zero all header masses
        #[arg(long, default_value_t = false)]
        clear_masses: bool,
    },
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        _ => tracing::Level::DEBUG,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

fn read_floats(path: &Path) -> Result<Vec<f32>> {
    let s = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let values: Vec<f32> =
        serde_json::from_str(&s).with_context(|| format!("{} is not a JSON array of numbers", path.display()))?;
    Ok(values)
}

fn center_of_mass(input: &Path, config: Option<&Path>, all_species: bool) -> Result<[f64; 3]> {
    let snapshot = Snapshot::read(input).with_context(|| format!("reading {}", input.display()))?;
    let counts = snapshot.particle_counts();
    // species 0 and 1 are not stars
    let skip = if all_species { 0 } else { counts[0] as usize + counts[1] as usize };
    let positions = snapshot.positions()?;
    let particles = ParticleSet::from_positions(&positions, skip);
    let cfg = match config {
        Some(p) => ComConfig::load(p).with_context(|| format!("loading config {}", p.display()))?,
        None => ComConfig::default(),
    };
    let est = particles.estimate(&cfg)?;
    tracing::info!(
        particles = particles.len(),
        iterations = est.iterations,
        selected = est.selected,
        radius = est.radius,
        "center of mass"
    );
    Ok(est.center)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.cmd {
        None => {
            let input = cli
                .input
                .ok_or_else(|| anyhow!("Not enough arguments provided: expected a snapshot path"))?;
            let c = center_of_mass(&input, cli.config.as_deref(), cli.all_species)?;
            println!("{}\t{}\t{}", c[0], c[1], c[2]);
        }
        Some(Cmd::Info { input, framing }) => {
            let snapshot = Snapshot::read_with(&input, framing.into())
                .with_context(|| format!("reading {}", input.display()))?;
            println!("{}", serde_json::to_string_pretty(&snapshot.summary())?);
        }
        Some(Cmd::Rewrite {
            input,
            output,
            from,
            framing,
            drop_block,
            append_block,
            merge_species,
            clear_masses,
        }) => {
            let mut snapshot = Snapshot::read_with(&input, from.into())
                .with_context(|| format!("reading {}", input.display()))?;
            for name in &drop_block {
                snapshot.remove_block(name)?;
            }
            for spec in &append_block {
                let Some((name, file)) = spec.split_once('=') else {
                    bail!("--append-block expects NAME=FILE, got {spec:?}");
                };
                let values = read_floats(Path::new(file))?;
                snapshot.append_block(name, &values);
            }
            if merge_species {
                snapshot.merge_species(0, 1)?;
            }
            if clear_masses {
                snapshot.clear_masses();
            }
            snapshot
                .write(&output, framing.into())
                .with_context(|| format!("writing {}", output.display()))?;
            println!("rewrite: {} -> {} ({} blocks)", input.display(), output.display(), snapshot.blocks().len());
        }
    }
    Ok(())
}
