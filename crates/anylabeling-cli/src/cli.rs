use anylabeling_config::Settings;
use anylabeling_gateway::BindOptions;
use clap::builder::NonEmptyStringValueParser;
use clap::{Arg, ArgAction, ArgMatches, Command, CommandFactory, FromArgMatches, Parser};

#[derive(Parser, Debug)]
#[command(
    name = "x-anylabeling-server",
    version,
    disable_version_flag = true,
    about = "X-AnyLabeling Server - AI Model Inference Service"
)]
pub struct Cli {
    /// Server host (default: from config)
    #[arg(long, value_parser = NonEmptyStringValueParser::new())]
    pub host: Option<String>,

    /// Server port (default: from config)
    #[arg(long, value_parser = clap::value_parser!(u16).range(1..))]
    pub port: Option<u16>,

    /// Number of workers (default: from config)
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub workers: Option<u32>,

    /// Enable auto-reload (for development)
    #[arg(long)]
    pub reload: bool,
}

impl Cli {
    /// The command definition, with `-v`/`--version` in place of clap's `-V`.
    pub fn cli_command() -> Command {
        <Self as CommandFactory>::command().arg(
            Arg::new("version")
                .short('v')
                .long("version")
                .action(ArgAction::Version)
                .help("Print version and exit"),
        )
    }

    /// Parse the process arguments, exiting on `--version` or invalid input.
    pub fn parse_args() -> Self {
        let matches = Self::cli_command().get_matches();
        Self::from_matches(&matches).unwrap_or_else(|e| e.exit())
    }

    pub fn try_parse_args<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let matches = Self::cli_command().try_get_matches_from(args)?;
        Self::from_matches(&matches)
    }

    fn from_matches(matches: &ArgMatches) -> Result<Self, clap::Error> {
        <Self as FromArgMatches>::from_arg_matches(matches)
    }

    /// Apply command-line overrides on top of the loaded settings. Only flags
    /// that were given take effect; `settings` itself is left untouched.
    pub fn resolve(&self, settings: &Settings) -> BindOptions {
        BindOptions {
            host: self
                .host
                .clone()
                .unwrap_or_else(|| settings.server.host.clone()),
            port: self.port.unwrap_or(settings.server.port),
            workers: self.workers.unwrap_or(settings.server.workers),
            reload: self.reload,
        }
    }
}
