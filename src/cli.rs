use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "shaderlab", about = "Apply GPU post-processing effects to an image")]
pub struct Cli {
    /// Source image (path or http(s) URL)
    pub input: Option<String>,

    /// Output PNG file
    #[arg(short, long, default_value = "output.png")]
    pub output: PathBuf,

    /// Effect id, or "all" to render every effect
    #[arg(short, long, default_value = "none")]
    pub effect: String,

    /// Parameter override, e.g. uIntensity=0.5 or uColor=1,0,0
    #[arg(short = 'p', long = "param")]
    pub params: Vec<String>,

    /// Viewport width in pixels (defaults to the image width)
    #[arg(long)]
    pub width: Option<u32>,

    /// Viewport height in pixels (defaults to the image height)
    #[arg(long)]
    pub height: Option<u32>,

    /// Clamp parameter overrides to the effect's editor ranges
    #[arg(long)]
    pub clamp: bool,

    /// List available effects and exit
    #[arg(long)]
    pub list_effects: bool,

    /// Print an effect's defaults and editor controls as JSON and exit
    #[arg(long, value_name = "ID")]
    pub describe: Option<String>,

    /// Config file (defaults to ./shaderlab.toml, then the user config dir)
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl Cli {
    /// Split `key=value` overrides; malformed entries are dropped with a warning.
    pub fn param_pairs(&self) -> Vec<(String, String)> {
        self.params
            .iter()
            .filter_map(|s| {
                let mut parts = s.splitn(2, '=');
                let key = parts.next()?.trim();
                let val = parts.next();
                match val {
                    Some(val) if !key.is_empty() => Some((key.to_string(), val.trim().to_string())),
                    _ => {
                        log::warn!("Ignoring malformed parameter '{}', expected key=value", s);
                        None
                    }
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_repeated_params() {
        let cli = Cli::parse_from([
            "shaderlab",
            "Lenna.png",
            "-e",
            "vignette",
            "-p",
            "uIntensity=0.5",
            "--param",
            "uColor=1,0,0",
            "-p",
            "broken",
        ]);
        assert_eq!(cli.effect, "vignette");
        assert_eq!(
            cli.param_pairs(),
            vec![
                ("uIntensity".to_string(), "0.5".to_string()),
                ("uColor".to_string(), "1,0,0".to_string()),
            ]
        );
    }

    #[test]
    fn defaults() {
        let cli = Cli::parse_from(["shaderlab"]);
        assert_eq!(cli.effect, "none");
        assert_eq!(cli.output, PathBuf::from("output.png"));
        assert!(cli.input.is_none());
        assert!(cli.width.is_none());
    }
}
