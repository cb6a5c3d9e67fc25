//! Command-line interface

use clap::builder::{PossibleValuesParser, TypedValueParser};
use clap::{Parser, Subcommand};
use youtube_playlists::SortCriteria;

#[derive(Debug, Parser)]
#[command(
    name = "playlist-reorder",
    version,
    about = "Save sorted copies of your YouTube playlists",
    arg_required_else_help = true
)]
pub struct Cli {
    /// Configuration file (default: playlist-reorder.toml)
    #[arg(long, global = true, env = "CONFIG_PATH", value_name = "PATH")]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Sign in with Google in the browser
    Login,
    /// Revoke and forget the saved login
    Logout,
    /// Show the saved login
    Status,
    /// List your playlists
    Playlists,
    /// List a playlist's videos
    Show {
        /// Playlist URL or id
        playlist: String,
    },
    /// Save a sorted copy of a playlist
    Reorder {
        /// Id of the playlist to copy
        playlist_id: String,
        /// Sort order for the copy
        #[arg(long = "by", value_name = "CRITERIA", value_parser = criteria_parser())]
        criteria: SortCriteria,
        /// Title of the new playlist [default: "<source title> (by <criteria>)"]
        #[arg(long)]
        title: Option<String>,
    },
}

fn criteria_parser() -> impl TypedValueParser<Value = SortCriteria> {
    PossibleValuesParser::new(SortCriteria::ALL.map(|c| c.as_str()))
        .try_map(|s| s.parse::<SortCriteria>())
}
