use anyhow::Result;
use clap::{Arg, Command};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

use langclip::config::Config;
use langclip::subtitles::SubtitleService;
use langclip::video_id::extract_video_id;

#[tokio::main]
async fn main() -> Result<()> {
    let matches = Command::new("LangClip")
        .version("0.1.0")
        .about("YouTube caption fetcher and language-learning companion")
        .arg(
            Arg::new("video")
                .value_name("URL_OR_ID")
                .help("YouTube URL or 11-character video ID to fetch captions for")
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Path to a TOML configuration file")
        )
        .arg(
            Arg::new("serve")
                .short('s')
                .long("serve")
                .help("Run the caption proxy service instead of a one-shot fetch")
                .action(clap::ArgAction::SetTrue)
        )
        .arg(
            Arg::new("port")
                .short('p')
                .long("port")
                .value_name("PORT")
                .help("Override the caption proxy port")
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose logging")
                .action(clap::ArgAction::SetTrue)
        )
        .get_matches();

    let verbose = matches.get_flag("verbose");
    let filter = if verbose {
        "langclip=debug,tower_http=debug"
    } else {
        "langclip=info,warn"
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // Load configuration
    let mut config = match matches.get_one::<String>("config") {
        Some(path) => Config::load(&PathBuf::from(path))?,
        None => Config::default(),
    };

    if let Some(port) = matches.get_one::<String>("port") {
        config.proxy.port = port.parse()?;
    }

    if matches.get_flag("serve") {
        info!("🚀 LangClip caption proxy starting...");
        return langclip::proxy::serve(Arc::new(config)).await;
    }

    let Some(input) = matches.get_one::<String>("video") else {
        error!("No video given; pass a YouTube URL or ID, or use --serve");
        return Err(anyhow::anyhow!("missing video argument"));
    };

    let Some(video_id) = extract_video_id(input) else {
        error!("Could not extract a video ID from: {}", input);
        return Err(anyhow::anyhow!("unrecognized video URL or ID"));
    };

    info!("🎬 Fetching captions for {}", video_id);
    let service = SubtitleService::from_config(&config.subtitles);
    match service.fetch_units(&video_id).await {
        Some(units) => {
            info!("✅ Resolved {} subtitle units", units.len());
            for unit in &units {
                println!("[{}] {}", format_time(unit.start_seconds), unit.text);
            }
        }
        None => {
            warn!("No captions available for {}", video_id);
        }
    }

    Ok(())
}

/// h:mm:ss above an hour, m:ss below
fn format_time(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let secs = total % 60;
    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{}:{:02}", minutes, secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_time() {
        assert_eq!(format_time(0.0), "0:00");
        assert_eq!(format_time(65.4), "1:05");
        assert_eq!(format_time(3725.0), "1:02:05");
    }
}
