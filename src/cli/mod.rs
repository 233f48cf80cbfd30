use clap::error::ErrorKind;
use clap::Parser;
use std::ffi::OsString;
use std::path::PathBuf;

const CONFIG_ENV: &str = "YT_TRANSCRIPT_CONFIG";

#[derive(Parser, Debug)]
#[command(
    name = "get-transcript",
    about = "Fetch the transcript of a YouTube video and print it as JSON",
    version,
    long_about = "Looks up the caption tracks of a YouTube video, picks the manual track in the preferred language, then the auto-generated one, then the first available track, and prints a single JSON object on stdout: {\"success\": true, \"transcript\": ...} or {\"success\": false, \"error\": ...}."
)]
pub struct Cli {
    /// YouTube video id (e.g. dQw4w9WgXcQ or -x9aB_cDeFg)
    #[arg(value_name = "VIDEO_ID", allow_hyphen_values = true)]
    pub video_id: Option<String>,

    /// Preferred transcript language code (overrides the config file)
    #[arg(short, long, value_name = "LANG")]
    pub language: Option<String>,

    /// Path to a YAML config file
    #[arg(short, long, value_name = "FILE", env = CONFIG_ENV)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging (written to stderr)
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub log_json: bool,

    /// Parse error that was worked around by taking the first argument as the video id
    #[arg(skip)]
    pub parse_error: Option<String>,
}

impl Cli {
    /// Parse the process arguments without ever exiting on bad input
    pub fn parse_lenient() -> Self {
        Self::parse_lenient_from(std::env::args_os())
    }

    /// Parse `args`, falling back to the first argument taken verbatim as the video id.
    ///
    /// Only `--help` and `--version` still exit the process.
    pub fn parse_lenient_from<I, T>(args: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        let args: Vec<OsString> = args.into_iter().map(Into::into).collect();

        match Self::try_parse_from(&args) {
            Ok(cli) => cli,
            Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
                err.exit()
            }
            Err(err) => Self {
                video_id: args.get(1).map(|raw| raw.to_string_lossy().into_owned()),
                language: None,
                config: std::env::var_os(CONFIG_ENV).map(PathBuf::from),
                verbose: false,
                log_json: false,
                parse_error: Some(err.kind().to_string()),
            },
        }
    }

    /// The video id, if one was supplied and is not empty
    pub fn video_id(&self) -> Option<&str> {
        self.video_id.as_deref().filter(|id| !id.is_empty())
    }
}
