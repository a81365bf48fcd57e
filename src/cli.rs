use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "glowfic-gallery", about = "Glowfic gallery browser & icon uploader")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "config/default.toml")]
    pub config: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List your galleries
    Galleries,
    /// List the icons of one gallery
    Icons {
        /// Gallery id
        #[arg(short, long)]
        gallery: String,
    },
    /// Print any page as seen by the logged-in session
    Fetch {
        /// Path relative to the site, e.g. /users/471
        path: String,
    },
    /// Upload icons to a gallery
    Upload {
        /// Gallery id (0 for galleryless)
        #[arg(short, long)]
        gallery: String,

        /// Image files, directories of images, or zip archives of images
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Keyword for every icon (defaults to each file name)
        #[arg(short, long)]
        keyword: Option<String>,

        /// Credit line
        #[arg(long)]
        credit: Option<String>,

        /// Where the icon originally came from
        #[arg(long)]
        icon_url: Option<String>,
    },
    /// Convert one image to an icon-sized JPEG without uploading it
    Resize {
        input: PathBuf,
        output: PathBuf,
    },
}
