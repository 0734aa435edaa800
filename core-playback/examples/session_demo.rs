//! Plays two short virtual tracks and prints progress bar labels.
//!
//! ```bash
//! cargo run -p core-playback --example session_demo
//! ```

use std::sync::Arc;
use std::time::Duration;

use bridge_desktop::VirtualMediaEngine;
use bridge_traits::logging::LogLevel;
use core_playback::{MediaSession, ProgressBinding, TrackBinding, TrackDescriptor, TrackHooks};
use core_runtime::logging::{init_logging, LogFormat, LoggingConfig};
use core_runtime::SessionConfig;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging(
        LoggingConfig::default()
            .with_format(LogFormat::Compact)
            .with_level(LogLevel::Debug),
    )?;

    let engine = VirtualMediaEngine::new();
    engine.set_track_length("https://cdn.example.com/intro.mp3", Duration::from_secs(4));
    engine.set_track_length("https://cdn.example.com/theme.mp3", Duration::from_secs(3));

    let config = SessionConfig::builder()
        .engine(Arc::new(engine))
        .await_release_ack(Duration::from_secs(1))
        .build()?;
    let session = MediaSession::start(config)?;

    let intro = TrackBinding::mount(
        &session,
        TrackDescriptor::new("https://cdn.example.com/intro.mp3")
            .with_title("Intro")
            .with_artist("House Band"),
        TrackHooks::new().on_success(|| println!("intro finished")),
        false,
    )?;
    let theme = TrackBinding::mount(
        &session,
        TrackDescriptor::new("https://cdn.example.com/theme.mp3")
            .with_title("Theme")
            .with_artist("House Band"),
        TrackHooks::new().on_error(|err| eprintln!("theme failed: {err}")),
        false,
    )?;

    let mut bar = ProgressBinding::detached(&session);

    intro.play()?;
    for _ in 0..3 {
        tokio::time::sleep(Duration::from_secs(1)).await;
        bar.refresh();
        println!(
            "[{}] {} / {}",
            bar.info_label(),
            bar.progress_label(),
            bar.duration_label()
        );
    }

    theme.play()?;
    tokio::time::sleep(Duration::from_millis(3_500)).await;
    bar.refresh();
    println!("now showing: {}", bar.info_label());

    theme.unmount()?;
    session.shutdown().await?;
    Ok(())
}
