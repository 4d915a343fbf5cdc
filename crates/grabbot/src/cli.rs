use clap::{Parser, Subcommand};
use std::path::PathBuf;

use grabcore::MediaKind;

#[derive(Parser)]
#[command(name = "grabbot")]
#[command(author, version, about = "Telegram bot that turns a media link into an audio or video file", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the bot (long polling)
    Run,

    /// Probe a URL and show which format constraint each kind would get
    Probe {
        /// Media URL
        url: String,
    },

    /// Download a URL through the same pipeline the bot uses, without Telegram
    Fetch {
        /// Media URL
        url: String,

        /// Output kind: audio (mp3) or video (mp4)
        #[arg(short, long, default_value = "audio")]
        kind: MediaKind,

        /// Directory to keep the file in
        #[arg(short, long, default_value = ".")]
        output: PathBuf,

        /// Skip the delivery size check
        #[arg(long)]
        no_gate: bool,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
