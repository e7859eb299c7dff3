//! Stowage CLI - Command line interface for disk operations.
//!
//! This tool operates on the disks described in a JSON configuration file,
//! using the same drivers a program embedding Stowage would use.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use stowage_common::Visibility;
use stowage_disk::{Disk, DiskManager, FilesystemConfig, NameRule};

#[derive(Parser)]
#[command(name = "stowage")]
#[command(about = "Stowage - One file API over local, FTP and cloud disks")]
#[command(version)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,

    /// Filesystem configuration file.
    #[arg(short, long, default_value = "stowage.json")]
    config: PathBuf,

    /// Disk to operate on (default: the configured default disk).
    #[arg(short, long)]
    disk: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Store a local file on the disk.
    Put {
        /// Destination path, or directory with --hashed.
        path: String,

        /// Local file to upload.
        source: PathBuf,

        /// Name the stored file after its content hash.
        #[arg(long)]
        hashed: bool,
    },

    /// Read a file from the disk.
    Get {
        /// Path on the disk.
        path: String,

        /// Local destination (default: stdout).
        dest: Option<PathBuf>,
    },

    /// Delete files.
    Rm {
        /// Paths to delete.
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// List a directory.
    Ls {
        /// Directory on the disk (default: root).
        #[arg(default_value = "")]
        dir: String,

        /// Recurse into subdirectories.
        #[arg(short, long)]
        recursive: bool,

        /// List directories instead of files.
        #[arg(long)]
        dirs: bool,
    },

    /// Create a directory.
    Mkdir {
        /// Directory path to create.
        path: String,
    },

    /// Delete a directory and its contents.
    Rmdir {
        /// Directory path to delete.
        path: String,
    },

    /// Copy a file.
    Cp { from: String, to: String },

    /// Move a file.
    Mv { from: String, to: String },

    /// Print the URL of a file.
    Url {
        path: String,

        /// Print a temporary URL valid for this many seconds.
        #[arg(short, long)]
        expires: Option<u64>,
    },

    /// Show or change the visibility of a file.
    Visibility {
        path: String,

        /// New visibility: "public" or "private".
        value: Option<String>,
    },

    /// Show file metadata.
    Stat { path: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let disk = open_disk(&cli.config, cli.disk.as_deref()).await?;

    match cli.command {
        Commands::Put {
            path,
            source,
            hashed,
        } => cmd_put(&disk, &path, &source, hashed).await,

        Commands::Get { path, dest } => cmd_get(&disk, &path, dest.as_deref()).await,

        Commands::Rm { paths } => cmd_rm(&disk, &paths).await,

        Commands::Ls {
            dir,
            recursive,
            dirs,
        } => cmd_ls(&disk, &dir, recursive, dirs).await,

        Commands::Mkdir { path } => cmd_mkdir(&disk, &path).await,

        Commands::Rmdir { path } => cmd_rmdir(&disk, &path).await,

        Commands::Cp { from, to } => cmd_cp(&disk, &from, &to).await,

        Commands::Mv { from, to } => cmd_mv(&disk, &from, &to).await,

        Commands::Url { path, expires } => cmd_url(&disk, &path, expires).await,

        Commands::Visibility { path, value } => {
            cmd_visibility(&disk, &path, value.as_deref()).await
        }

        Commands::Stat { path } => cmd_stat(&disk, &path).await,
    }
}

/// Load the configuration and resolve the requested disk.
async fn open_disk(config_path: &Path, name: Option<&str>) -> Result<Arc<Disk>> {
    let config = FilesystemConfig::from_file(config_path)
        .with_context(|| format!("Failed to load {}", config_path.display()))?;
    let manager = DiskManager::new(config);

    let disk = match name {
        Some(name) => manager.disk(name).await,
        None => manager.default_disk().await,
    }
    .context("Failed to open disk")?;

    info!("Using disk: {}", disk.name());
    Ok(disk)
}

/// Turn a lenient-mode `false` into an error.
fn ensure(ok: bool, what: impl FnOnce() -> String) -> Result<()> {
    if !ok {
        anyhow::bail!("{} (run with -v for details)", what());
    }
    Ok(())
}

/// Upload a local file.
async fn cmd_put(disk: &Disk, path: &str, source: &Path, hashed: bool) -> Result<()> {
    if hashed {
        let stored = disk
            .put_file(path, source, &NameRule::Hash)
            .await
            .context("Failed to store file")?;
        let Some(stored) = stored else {
            anyhow::bail!("Failed to store {} (run with -v for details)", source.display());
        };
        println!("{}", stored);
        return Ok(());
    }

    let name = Path::new(path)
        .file_name()
        .and_then(|n| n.to_str())
        .context("Destination must name a file")?;
    let directory = path.strip_suffix(name).unwrap_or("");
    let stored = disk
        .put_file_as(directory, source, name)
        .await
        .context("Failed to store file")?;
    let Some(stored) = stored else {
        anyhow::bail!("Failed to store {} (run with -v for details)", source.display());
    };

    println!("Stored {} as {}", source.display(), stored);
    Ok(())
}

/// Download a file to a local path or stdout.
async fn cmd_get(disk: &Disk, path: &str, dest: Option<&Path>) -> Result<()> {
    let content = disk
        .get(path)
        .await
        .context("Failed to read file")?
        .with_context(|| format!("Cannot read {} (run with -v for details)", path))?;

    match dest {
        Some(dest) => {
            tokio::fs::write(dest, &content)
                .await
                .context("Failed to write destination file")?;
            println!("Saved {} ({} bytes)", dest.display(), content.len());
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&content)?;
            stdout.flush()?;
        }
    }
    Ok(())
}

/// Delete files.
async fn cmd_rm(disk: &Disk, paths: &[String]) -> Result<()> {
    let ok = disk.delete_many(paths).await.context("Failed to delete")?;
    ensure(ok, || "Some files could not be deleted".to_string())?;
    println!("Deleted {} file(s)", paths.len());
    Ok(())
}

/// List directory contents.
async fn cmd_ls(disk: &Disk, dir: &str, recursive: bool, dirs: bool) -> Result<()> {
    let entries = match (recursive, dirs) {
        (false, false) => disk.files(dir).await,
        (true, false) => disk.all_files(dir).await,
        (false, true) => disk.directories(dir).await,
        (true, true) => disk.all_directories(dir).await,
    }
    .context("Failed to list directory")?;

    for entry in entries {
        if dirs {
            println!("{}/", entry);
        } else {
            println!("{}", entry);
        }
    }
    Ok(())
}

/// Create a directory.
async fn cmd_mkdir(disk: &Disk, path: &str) -> Result<()> {
    let ok = disk.make_directory(path).await.context("Failed to create directory")?;
    ensure(ok, || format!("Cannot create directory {}", path))?;
    println!("Directory created: {}", path);
    Ok(())
}

/// Delete a directory.
async fn cmd_rmdir(disk: &Disk, path: &str) -> Result<()> {
    let ok = disk
        .delete_directory(path)
        .await
        .context("Failed to delete directory")?;
    ensure(ok, || format!("Cannot delete directory {}", path))?;
    println!("Directory deleted: {}", path);
    Ok(())
}

/// Copy a file.
async fn cmd_cp(disk: &Disk, from: &str, to: &str) -> Result<()> {
    let ok = disk.copy(from, to).await.context("Failed to copy")?;
    ensure(ok, || format!("Cannot copy {} to {}", from, to))?;
    println!("Copied {} -> {}", from, to);
    Ok(())
}

/// Move a file.
async fn cmd_mv(disk: &Disk, from: &str, to: &str) -> Result<()> {
    let ok = disk.move_file(from, to).await.context("Failed to move")?;
    ensure(ok, || format!("Cannot move {} to {}", from, to))?;
    println!("Moved {} -> {}", from, to);
    Ok(())
}

/// Print a public or temporary URL.
async fn cmd_url(disk: &Disk, path: &str, expires: Option<u64>) -> Result<()> {
    let url = match expires {
        Some(secs) => disk
            .temporary_url(path, Duration::from_secs(secs))
            .await
            .context("Failed to create temporary URL")?,
        None => disk.url(path).context("Failed to build URL")?,
    };
    println!("{}", url);
    Ok(())
}

/// Show or change visibility.
async fn cmd_visibility(disk: &Disk, path: &str, value: Option<&str>) -> Result<()> {
    match value {
        Some(value) => {
            let visibility: Visibility = value
                .parse()
                .context("Invalid visibility. Use: public or private")?;
            let ok = disk
                .set_visibility(path, visibility)
                .await
                .context("Failed to set visibility")?;
            ensure(ok, || format!("Cannot set visibility of {}", path))?;
            println!("{}: {}", path, visibility);
        }
        None => {
            let visibility = disk
                .visibility(path)
                .await
                .context("Failed to read visibility")?;
            println!("{}: {}", path, visibility);
        }
    }
    Ok(())
}

/// Show file metadata.
async fn cmd_stat(disk: &Disk, path: &str) -> Result<()> {
    let size = disk.size(path).await.context("Failed to read size")?;
    let modified = disk
        .last_modified(path)
        .await
        .context("Failed to read modification time")?;
    let mime = disk.mime_type(path).await?.unwrap_or_else(|| "unknown".to_string());

    println!("Path:      {}", path);
    println!("Location:  {}", disk.path(path));
    println!("Size:      {} bytes", size);
    println!("Type:      {}", mime);
    println!("Modified:  {}", modified.to_rfc3339_opts(chrono::SecondsFormat::Secs, true));
    if let Ok(visibility) = disk.visibility(path).await {
        println!("Visibility: {}", visibility);
    }
    Ok(())
}
