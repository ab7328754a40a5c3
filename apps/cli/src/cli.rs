//! Command-line interface.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Publish static build output to Cloudinary.
#[derive(Parser, Debug)]
#[command(name = "assetdeploy")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Deploy configuration file (TOML)
    #[arg(short, long, global = true, default_value = "deploy.toml")]
    pub config: PathBuf,

    /// State file shared between pipeline stages
    #[arg(long, global = true, default_value = ".assetdeploy-state.json")]
    pub state: PathBuf,

    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(flatten)]
    pub credentials: Credentials,

    #[command(subcommand)]
    pub command: Command,
}

/// Credential overrides for the configuration file.
#[derive(Args, Debug, Default, Clone)]
pub struct Credentials {
    /// Cloudinary cloud name
    #[arg(long, global = true, env = "CLOUDINARY_CLOUD_NAME")]
    pub cloud_name: Option<String>,

    /// Cloudinary API key
    #[arg(long, global = true, env = "CLOUDINARY_API_KEY")]
    pub api_key: Option<String>,

    /// Cloudinary API secret
    #[arg(long, global = true, env = "CLOUDINARY_API_SECRET", hide_env_values = true)]
    pub api_secret: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compute the fingerprint prefix before the build and print it as
    /// `CDN_FINGERPRINT_PREPEND=<prefix>`
    Prepare,

    /// Upload the build output, using the state written by `prepare`
    Upload(UploadArgs),

    /// Run every stage in one process
    Deploy(UploadArgs),
}

#[derive(Args, Debug, Default, Clone)]
pub struct UploadArgs {
    /// Build output directory (overrides the config file)
    #[arg(long)]
    pub dist_dir: Option<PathBuf>,

    /// Print the upload result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Log filter used when `RUST_LOG` is unset.
pub fn default_level(verbose: u8) -> &'static str {
    match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn upload_with_global_flags() {
        let cli = Cli::try_parse_from([
            "assetdeploy",
            "upload",
            "--dist-dir",
            "public",
            "--json",
            "-vv",
            "--config",
            "site.toml",
        ])
        .unwrap();

        assert_eq!(cli.config, PathBuf::from("site.toml"));
        assert_eq!(cli.state, PathBuf::from(".assetdeploy-state.json"));
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Command::Upload(args) => {
                assert_eq!(args.dist_dir, Some(PathBuf::from("public")));
                assert!(args.json);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn prepare_takes_no_args() {
        let cli = Cli::try_parse_from(["assetdeploy", "prepare"]).unwrap();
        assert!(matches!(cli.command, Command::Prepare));
        assert!(Cli::try_parse_from(["assetdeploy", "prepare", "--json"]).is_err());
    }

    #[test]
    fn verbosity_levels() {
        assert_eq!(default_level(0), "info");
        assert_eq!(default_level(1), "debug");
        assert_eq!(default_level(3), "trace");
    }
}
