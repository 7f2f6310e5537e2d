use std::path::PathBuf;

use clap::{Parser, Subcommand};
use typed_bytesize::ByteSizeIec;

#[derive(Parser)]
pub struct Cli {
    /// Filesystem image path
    #[arg(long, short, default_value = "fs.img")]
    pub image: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create a fresh volume on the image
    Format {
        /// Volume size, e.g. `512KiB` or `16MiB`
        #[arg(long, short, default_value = "512KiB")]
        size: ByteSizeIec,
    },
    /// Create a directory under the root
    Mkdir { name: String },
    /// Create an empty file under the root
    Touch { name: String },
    /// Append text to the end of a file
    Append { name: String, text: String },
    /// List the root directory
    Ls,
    /// Print the volume layout and counters
    Info,
}
