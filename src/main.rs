use clap::{Args, Parser, Subcommand};
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use vdjstream::config::{DispatchConfig, LsfConfig, DEFAULT_PACKET_SIZE};
use vdjstream::io::{CompressedReader, CompressedWriter, DataSink, DataSource};
use vdjstream::jobs::{await_all, JobHandle, JobQueue, LocalQueue, LsfQueue};
use vdjstream::operations::{
    barcode_id, clone_counts, filter_and, filter_or, isotype_id, size_select, BarcodeSet,
    IsotypeSet,
};
use vdjstream::partition::{
    read_categories, split_into_parts, split_into_vj_parts, PartManifest,
};
use vdjstream::{Result, VdjError, VdjxmlReader, VdjxmlWriter};

/// Placeholder substituted with each part path in a dispatch command template
const PART_PLACEHOLDER: &str = "{part}";

#[derive(Parser)]
#[command(name = "vdjstream")]
#[command(about = "Streaming VDJXML processing and batch dispatch", long_about = None)]
#[command(version)]
struct Cli {
    /// Verbose level: 1=error, 2=warning, 3=message, 4=debug, 5+=trace
    #[arg(short = 'v', long, value_name = "INT", default_value_t = 3, global = true)]
    verbosity: i32,

    #[command(subcommand)]
    command: Commands,
}

/// Input and output of a stream-to-stream command
#[derive(Args)]
struct StreamArgs {
    /// Input VDJXML, plain or gzip (default: stdin)
    #[arg(short = 'i', long, value_name = "FILE")]
    input: Option<PathBuf>,

    /// Output VDJXML, gzip if it ends in .gz (default: stdout)
    #[arg(short = 'o', long, value_name = "FILE")]
    output: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Keep records carrying every given tag
    FilterAnd {
        /// Tags (segment names and descriptions count as tags)
        #[arg(value_name = "TAG", required = true)]
        tags: Vec<String>,

        #[command(flatten)]
        io: StreamArgs,
    },

    /// Keep records carrying at least one given tag
    FilterOr {
        /// Tags (segment names and descriptions count as tags)
        #[arg(value_name = "TAG", required = true)]
        tags: Vec<String>,

        #[command(flatten)]
        io: StreamArgs,
    },

    /// Keep records whose sequence length lies within bounds
    SizeSelect {
        /// Minimum length, inclusive
        #[arg(long, value_name = "INT")]
        min: Option<usize>,

        /// Maximum length, inclusive
        #[arg(long, value_name = "INT")]
        max: Option<usize>,

        #[command(flatten)]
        io: StreamArgs,
    },

    /// Tag records with their 5' barcode and strip it
    BarcodeId {
        /// Barcodes, one `name<TAB>sequence` per line
        #[arg(short = 'b', long, value_name = "FILE")]
        barcodes: PathBuf,

        #[command(flatten)]
        io: StreamArgs,
    },

    /// Assign isotypes from constant-region sequences near the 3' end
    IsotypeId {
        /// Constant regions, one `name<TAB>sequence` per line
        #[arg(short = 'r', long, value_name = "FILE")]
        isotypes: PathBuf,

        #[command(flatten)]
        io: StreamArgs,
    },

    /// Split into fixed-size parts named BASE.0, BASE.1, ...
    Split {
        /// Input VDJXML (default: stdin)
        #[arg(short = 'i', long, value_name = "FILE")]
        input: Option<PathBuf>,

        /// Base path of the parts
        #[arg(value_name = "BASE")]
        base: PathBuf,

        /// Records per part
        #[arg(short = 'n', long, value_name = "INT", default_value_t = DEFAULT_PACKET_SIZE)]
        packet_size: usize,

        /// Also write a manifest listing the parts
        #[arg(short = 'm', long, value_name = "FILE")]
        manifest: Option<PathBuf>,
    },

    /// Split into one part per (V, J) segment pair
    SplitVj {
        /// Input VDJXML (default: stdin)
        #[arg(short = 'i', long, value_name = "FILE")]
        input: Option<PathBuf>,

        /// Base path of the parts
        #[arg(value_name = "BASE")]
        base: PathBuf,

        /// V segment names, one per line
        #[arg(long = "v-segments", value_name = "FILE")]
        v_segments: PathBuf,

        /// J segment names, one per line
        #[arg(long = "j-segments", value_name = "FILE")]
        j_segments: PathBuf,

        /// Also write a manifest listing parts and category keys
        #[arg(short = 'm', long, value_name = "FILE")]
        manifest: Option<PathBuf>,
    },

    /// Concatenate the parts listed in a manifest
    CatParts {
        /// Manifest written by split, split-vj or dispatch
        #[arg(value_name = "MANIFEST")]
        manifest: PathBuf,

        /// Output VDJXML (default: stdout)
        #[arg(short = 'o', long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Count records per clone tag, as `clone<TAB>count`
    CloneCounts {
        /// Input VDJXML (default: stdin)
        #[arg(short = 'i', long, value_name = "FILE")]
        input: Option<PathBuf>,

        /// Output table (default: stdout)
        #[arg(short = 'o', long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Split into parts, run a command per part, and wait for all of them
    Dispatch {
        /// Input VDJXML (default: stdin)
        #[arg(short = 'i', long, value_name = "FILE")]
        input: Option<PathBuf>,

        /// Base path of the parts
        #[arg(value_name = "BASE")]
        base: PathBuf,

        /// Shell command run per part; `{part}` is replaced by the part path
        #[arg(short = 'c', long, value_name = "TEMPLATE")]
        command: String,

        /// Run jobs as local subprocesses instead of submitting to LSF
        #[arg(long)]
        local: bool,

        /// Also write a manifest listing the parts
        #[arg(short = 'm', long, value_name = "FILE")]
        manifest: Option<PathBuf>,

        #[command(flatten)]
        dispatch: DispatchConfig,

        #[command(flatten)]
        lsf: LsfConfig,
    },
}

fn open_reader(input: Option<&Path>) -> Result<VdjxmlReader<CompressedReader>> {
    match input {
        Some(path) => VdjxmlReader::from_path(path),
        None => VdjxmlReader::new(DataSource::stdin()),
    }
}

fn open_sink(output: Option<&Path>) -> DataSink {
    match output {
        Some(path) => DataSink::from_path(path),
        None => DataSink::stdout(),
    }
}

fn write_stream<I>(output: Option<&Path>, records: I) -> Result<usize>
where
    I: IntoIterator<Item = Result<vdjstream::ImmuneChain>>,
{
    let mut writer = VdjxmlWriter::new(open_sink(output))?;
    writer.write_all(records)?;
    let written = writer.records_written();
    writer.finish()?;
    Ok(written)
}

/// Parse `name<TAB>sequence` lines, skipping blank and `#` lines
fn read_named_sequences(path: &Path) -> Result<Vec<(String, String)>> {
    let file = File::open(path)
        .map_err(|e| VdjError::NotFound(format!("{}: {}", path.display(), e)))?;

    let mut pairs = Vec::new();
    for (i, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        match line.split_once('\t') {
            Some((name, seq)) if !name.trim().is_empty() && !seq.trim().is_empty() => {
                pairs.push((name.trim().to_string(), seq.trim().to_string()));
            }
            _ => {
                return Err(VdjError::Format {
                    line: i + 1,
                    msg: format!("expected name<TAB>sequence in {}", path.display()),
                })
            }
        }
    }
    Ok(pairs)
}

fn save_manifest(manifest: &PartManifest, path: Option<&Path>) -> Result<()> {
    if let Some(path) = path {
        manifest.save(path)?;
        log::info!("Wrote manifest {}", path.display());
    }
    Ok(())
}

fn submit_parts<Q: JobQueue>(
    queue: &mut Q,
    template: &str,
    parts: &[PathBuf],
) -> Result<Vec<JobHandle>> {
    parts
        .iter()
        .map(|part| queue.submit(&template.replace(PART_PLACEHOLDER, &part.display().to_string())))
        .collect()
}

fn dispatch(
    input: Option<&Path>,
    base: &Path,
    template: &str,
    local: bool,
    manifest: Option<&Path>,
    dispatch: &DispatchConfig,
    lsf: LsfConfig,
) -> Result<()> {
    if !template.contains(PART_PLACEHOLDER) {
        return Err(VdjError::Precondition(format!(
            "command template must contain {}",
            PART_PLACEHOLDER
        )));
    }

    let parts = split_into_parts(dispatch.packet_size, open_reader(input)?, base)?;
    save_manifest(&PartManifest::from(parts.clone()), manifest)?;

    if local {
        let mut queue = LocalQueue::new();
        let handles = submit_parts(&mut queue, template, &parts)?;
        await_all(&mut queue, &handles, dispatch.poll_interval())?;

        let failed: Vec<&JobHandle> = handles
            .iter()
            .filter(|h| !queue.exit_status(h).map_or(false, |s| s.success()))
            .collect();
        if !failed.is_empty() {
            for handle in &failed {
                log::error!("Job {} failed: {:?}", handle, queue.exit_status(handle));
            }
            return Err(VdjError::Queue(format!(
                "{} of {} local job(s) failed",
                failed.len(),
                handles.len()
            )));
        }
    } else {
        let mut queue = LsfQueue::new(lsf);
        let handles = submit_parts(&mut queue, template, &parts)?;
        await_all(&mut queue, &handles, dispatch.poll_interval())?;
    }

    log::info!("All {} part(s) processed", parts.len());
    Ok(())
}

fn run(command: Commands) -> Result<()> {
    match command {
        Commands::FilterAnd { tags, io } => {
            let reader = open_reader(io.input.as_deref())?;
            let n = write_stream(io.output.as_deref(), filter_and(tags, reader))?;
            log::info!("Kept {} record(s)", n);
        }

        Commands::FilterOr { tags, io } => {
            let reader = open_reader(io.input.as_deref())?;
            let n = write_stream(io.output.as_deref(), filter_or(tags, reader))?;
            log::info!("Kept {} record(s)", n);
        }

        Commands::SizeSelect { min, max, io } => {
            let reader = open_reader(io.input.as_deref())?;
            let n = write_stream(io.output.as_deref(), size_select(min, max, reader))?;
            log::info!("Kept {} record(s)", n);
        }

        Commands::BarcodeId { barcodes, io } => {
            let barcodes = BarcodeSet::new(read_named_sequences(&barcodes)?)?;
            let reader = open_reader(io.input.as_deref())?;
            write_stream(io.output.as_deref(), barcode_id(&barcodes, reader))?;
        }

        Commands::IsotypeId { isotypes, io } => {
            let isotypes = IsotypeSet::new(read_named_sequences(&isotypes)?);
            let reader = open_reader(io.input.as_deref())?;
            write_stream(io.output.as_deref(), isotype_id(&isotypes, reader))?;
        }

        Commands::Split {
            input,
            base,
            packet_size,
            manifest,
        } => {
            let parts = split_into_parts(packet_size, open_reader(input.as_deref())?, &base)?;
            save_manifest(&PartManifest::from(parts), manifest.as_deref())?;
        }

        Commands::SplitVj {
            input,
            base,
            v_segments,
            j_segments,
            manifest,
        } => {
            let v = read_categories(&v_segments)?;
            let j = read_categories(&j_segments)?;
            let vj = split_into_vj_parts(open_reader(input.as_deref())?, &base, &v, &j)?;
            save_manifest(&PartManifest::from(vj), manifest.as_deref())?;
        }

        Commands::CatParts { manifest, output } => {
            let manifest = PartManifest::load(&manifest)?;
            let n = write_stream(output.as_deref(), manifest.records())?;
            log::info!("Recombined {} record(s) from {} part(s)", n, manifest.len());
        }

        Commands::CloneCounts { input, output } => {
            let counts = clone_counts(open_reader(input.as_deref())?)?;
            let mut writer = CompressedWriter::new(open_sink(output.as_deref()))?;
            for (clone, count) in &counts {
                writeln!(writer, "{}\t{}", clone, count)?;
            }
            writer.finish()?;
        }

        Commands::Dispatch {
            input,
            base,
            command,
            local,
            manifest,
            dispatch: config,
            lsf,
        } => dispatch(
            input.as_deref(),
            &base,
            &command,
            local,
            manifest.as_deref(),
            &config,
            lsf,
        )?,
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();

    // 1=error, 2=warning, 3=message, 4=debug, 5+=trace
    let log_level = match cli.verbosity {
        v if v <= 1 => log::LevelFilter::Error,
        2 => log::LevelFilter::Warn,
        3 => log::LevelFilter::Info,
        4 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .format_timestamp(None)
        .format_target(false)
        .init();

    if let Err(e) = run(cli.command) {
        log::error!("{}", e);
        std::process::exit(1);
    }
}
