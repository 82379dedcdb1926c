use std::path::PathBuf;

use bili_wbi::{ParamValue, SearchKind};
use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(author, version, about = "WBI signing and signed Bilibili API calls", long_about = None)]
pub struct Args {
    /// Path to a TOML config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Attempts made by the retried search call
    #[arg(long, env = "BILI_WBI_MAX_RETRIES", global = true)]
    pub max_retries: Option<u32>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Derive the mixin key from a 64 character seed (img key + sub key)
    Mixin { seed: String },

    /// Sign parameters offline with a known key pair
    Sign {
        /// img key (32 hex characters)
        #[arg(long)]
        img: String,

        /// sub key (32 hex characters)
        #[arg(long)]
        sub: String,

        /// Unix timestamp for `wts`, defaults to now
        #[arg(long)]
        wts: Option<i64>,

        /// Parameters as key=value
        #[arg(value_parser = parse_param)]
        params: Vec<(String, ParamValue)>,
    },

    /// Fetch today's WBI key pair and the anonymous cookie
    Keys,

    /// Scrape the web id of an actor
    WebId { mid: String },

    /// List an actor's uploads (signed)
    Works {
        mid: String,

        #[arg(short, long, default_value_t = 1)]
        page: u32,
    },

    /// List comments of a video (signed)
    Comments { aid: String },

    /// Search the catalog, retrying on failure
    Search {
        keyword: String,

        #[arg(short, long, default_value_t = 1)]
        page: u32,

        #[arg(short, long, value_enum, default_value_t = Kind::Video)]
        kind: Kind,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Video,
    User,
}

impl From<Kind> for SearchKind {
    fn from(kind: Kind) -> Self {
        match kind {
            Kind::Video => SearchKind::Video,
            Kind::User => SearchKind::User,
        }
    }
}

fn parse_param(raw: &str) -> Result<(String, ParamValue), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got `{raw}`"))?;
    if key.is_empty() {
        return Err(format!("empty key in `{raw}`"));
    }
    Ok((key.to_string(), ParamValue::infer(value)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_param() {
        assert_eq!(
            parse_param("mid=123").unwrap(),
            ("mid".to_string(), ParamValue::Int(123))
        );
        assert_eq!(
            parse_param("q=a=b").unwrap(),
            ("q".to_string(), ParamValue::Str("a=b".to_string()))
        );
        assert!(parse_param("novalue").is_err());
        assert!(parse_param("=1").is_err());
    }

    #[test]
    fn test_parse_sign_args() {
        let args = Args::try_parse_from([
            "bili-wbi", "sign", "--img", "a", "--sub", "b", "--wts", "1", "mid=1", "ps=30",
        ])
        .unwrap();
        match args.command {
            Commands::Sign { params, wts, .. } => {
                assert_eq!(params.len(), 2);
                assert_eq!(wts, Some(1));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_verbose_conflicts_with_quiet() {
        assert!(Args::try_parse_from(["bili-wbi", "-v", "-q", "keys"]).is_err());
    }
}
