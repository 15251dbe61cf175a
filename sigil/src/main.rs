mod output;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use output::{
    AssetOutput, CleanInfo, CleanOutput, DigestOutput, InitOutput, LsOutput, NukeOutput,
    OutputWriter,
};
use sigil_core::{Manifest, ManifestSelection};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Sigil - content-hash fingerprinting for static assets
#[derive(Parser)]
#[command(name = "sigil")]
#[command(about = "Fingerprint static assets and maintain their manifest", long_about = None)]
#[command(version)]
struct Cli {
    /// Asset directory (defaults to SIGIL_ASSET_DIR env var or ./public/assets)
    #[arg(short, long, global = true)]
    base_dir: Option<PathBuf>,

    /// Fail instead of picking one when several manifest files exist
    #[arg(long, global = true)]
    strict: bool,

    /// Output JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Find or create the manifest
    Init,

    /// Fingerprint all assets and replace the manifest
    Digest {
        /// Remove unreferenced files afterwards
        #[arg(long)]
        clean: bool,
    },

    /// Remove files not referenced by the manifest
    Clean {
        /// Dry run - show what would be deleted without deleting
        #[arg(long)]
        dry_run: bool,
    },

    /// Remove all fingerprinted files and the manifest
    Nuke,

    /// Print the fingerprinted path of an asset
    Asset {
        /// Original asset path, relative to the asset directory
        path: String,

        /// Print the original path when the asset is not in the manifest
        #[arg(long)]
        fallback: bool,
    },

    /// List manifest entries
    Ls,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let output = OutputWriter::new(cli.json);
    match run(cli, &output) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output.write_error(&e, 1);
            ExitCode::FAILURE
        }
    }
}

/// Log to stderr: 0 = warn, 1 = info, 2+ = debug. RUST_LOG wins when set.
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "sigil=warn,sigil_core=warn",
        1 => "sigil=info,sigil_core=info",
        _ => "sigil=debug,sigil_core=debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}

fn run(cli: Cli, output: &OutputWriter) -> Result<()> {
    // Determine asset directory: CLI arg > SIGIL_ASSET_DIR env var > ./public/assets default
    let base_dir = cli
        .base_dir
        .or_else(|| std::env::var("SIGIL_ASSET_DIR").ok().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("./public/assets"));
    tracing::debug!(base_dir = %base_dir.display(), "resolved asset directory");

    let selection = if cli.strict {
        ManifestSelection::Strict
    } else {
        ManifestSelection::First
    };

    match cli.command {
        Commands::Init => cmd_init(&base_dir, selection, output),
        Commands::Digest { clean } => cmd_digest(&base_dir, selection, clean, output),
        Commands::Clean { dry_run } => cmd_clean(&base_dir, selection, dry_run, output),
        Commands::Nuke => cmd_nuke(&base_dir, selection, output),
        Commands::Asset { path, fallback } => {
            cmd_asset(&base_dir, selection, &path, fallback, output)
        }
        Commands::Ls => cmd_ls(&base_dir, selection, output),
    }
}

fn open(base_dir: &Path, selection: ManifestSelection) -> Result<Manifest> {
    Manifest::open_with(base_dir, selection)
        .with_context(|| format!("Failed to open manifest in {}", base_dir.display()))
}

fn cmd_init(base_dir: &Path, selection: ManifestSelection, output: &OutputWriter) -> Result<()> {
    let manifest = open(base_dir, selection)?;

    let data = InitOutput {
        success: true,
        result_code: 0,
        base_dir: base_dir.display().to_string(),
        manifest: manifest.manifest_path().display().to_string(),
        entries: manifest.mapping().len(),
    };

    output.write(&data, || format!("Manifest: {}\nEntries: {}\n", data.manifest, data.entries))
}

fn cmd_digest(
    base_dir: &Path,
    selection: ManifestSelection,
    clean: bool,
    output: &OutputWriter,
) -> Result<()> {
    let mut manifest = open(base_dir, selection)?;

    let stats = manifest
        .digest()
        .with_context(|| format!("Failed to digest assets in {}", base_dir.display()))?;

    let clean = if clean {
        let stats = manifest.clean(false).context("Failed to clean after digest")?;
        Some(CleanInfo::new(stats, false))
    } else {
        None
    };

    let data = DigestOutput {
        success: true,
        result_code: 0,
        manifest: manifest.manifest_path().display().to_string(),
        files_digested: stats.files_digested,
        bytes_written: stats.bytes_written,
        clean,
    };

    output.write(&data, || {
        let mut text = format!(
            "Digested {} files ({} bytes)\nManifest: {}\n",
            data.files_digested, data.bytes_written, data.manifest
        );
        if let Some(ref clean) = data.clean {
            let _ = writeln!(
                text,
                "Deleted {} files\nFreed {} bytes",
                clean.files_deleted, clean.bytes_freed
            );
        }
        text
    })
}

fn cmd_clean(
    base_dir: &Path,
    selection: ManifestSelection,
    dry_run: bool,
    output: &OutputWriter,
) -> Result<()> {
    let mut manifest = open(base_dir, selection)?;

    let stats = manifest
        .clean(dry_run)
        .with_context(|| format!("Failed to clean {}", base_dir.display()))?;

    let data = CleanOutput {
        success: true,
        result_code: 0,
        clean: CleanInfo::new(stats, dry_run),
    };

    output.write(&data, || {
        let mut text = String::new();
        for path in &data.clean.deleted {
            let _ = writeln!(text, "{}", path);
        }
        if dry_run {
            let _ = writeln!(text, "Dry run - no files deleted");
            let _ = writeln!(text, "Would delete {} files", data.clean.files_deleted);
            let _ = writeln!(text, "Would free {} bytes", data.clean.bytes_freed);
        } else {
            let _ = writeln!(text, "Deleted {} files", data.clean.files_deleted);
            let _ = writeln!(text, "Freed {} bytes", data.clean.bytes_freed);
        }
        text
    })
}

fn cmd_nuke(base_dir: &Path, selection: ManifestSelection, output: &OutputWriter) -> Result<()> {
    let manifest = open(base_dir, selection)?;

    let stats = manifest
        .nuke()
        .with_context(|| format!("Failed to nuke {}", base_dir.display()))?;

    let data = NukeOutput {
        success: true,
        result_code: 0,
        files_deleted: stats.files_deleted,
        manifest_removed: stats.manifest_removed,
    };

    output.write(&data, || {
        format!(
            "Deleted {} fingerprinted files\nManifest removed: {}\n",
            data.files_deleted, data.manifest_removed
        )
    })
}

fn cmd_asset(
    base_dir: &Path,
    selection: ManifestSelection,
    path: &str,
    fallback: bool,
    output: &OutputWriter,
) -> Result<()> {
    let manifest = open(base_dir, selection)?;

    let fingerprinted = manifest.asset(path).map(str::to_string);
    if fingerprinted.is_none() && !fallback {
        anyhow::bail!("No manifest entry for {}", path);
    }

    let data = AssetOutput {
        success: true,
        result_code: 0,
        original: path.to_string(),
        resolved: manifest.asset_or_original(path).to_string(),
        fingerprinted,
    };

    output.write(&data, || format!("{}\n", data.resolved))
}

fn cmd_ls(base_dir: &Path, selection: ManifestSelection, output: &OutputWriter) -> Result<()> {
    let manifest = open(base_dir, selection)?;

    let data = LsOutput::new(
        manifest.manifest_path().display().to_string(),
        manifest.mapping(),
    );

    output.write(&data, || {
        if data.entries.is_empty() {
            return "No entries (use 'sigil digest' to create them)\n".to_string();
        }
        let mut text = String::new();
        for entry in &data.entries {
            let _ = writeln!(text, "{} -> {}", entry.original, entry.fingerprinted);
        }
        text
    })
}
