//! Output volume probes
//!
//! The controller refuses to start speech while the output volume is zero.

use crate::config::Config;
use crate::error::{SpeakError, SpeakResult};
use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tokio::process::Command;
use tracing::{debug, info, warn};

lazy_static! {
    static ref PERCENT: Regex = Regex::new(r"(\d+)%").expect("valid percent regex");
}

/// Query for the current output volume, as a percentage (0 means silent)
#[async_trait]
pub trait VolumeProbe: Send + Sync + std::fmt::Debug {
    async fn current_volume(&self) -> SpeakResult<u32>;
}

/// Volume fixed by configuration, adjustable at runtime
#[derive(Debug)]
pub struct FixedVolume {
    level: AtomicU32,
}

impl FixedVolume {
    pub fn new(level: u32) -> Self {
        Self {
            level: AtomicU32::new(level),
        }
    }

    pub fn set(&self, level: u32) {
        self.level.store(level, Ordering::SeqCst);
    }
}

#[async_trait]
impl VolumeProbe for FixedVolume {
    async fn current_volume(&self) -> SpeakResult<u32> {
        Ok(self.level.load(Ordering::SeqCst))
    }
}

/// Default PulseAudio/PipeWire sink volume via `pactl`
#[derive(Debug, Default)]
pub struct PactlVolume;

impl PactlVolume {
    pub fn new() -> Self {
        Self
    }

    async fn pactl(args: &[&str]) -> SpeakResult<String> {
        let output = Command::new("pactl")
            .args(args)
            .output()
            .await
            .map_err(|e| SpeakError::Volume(format!("Failed to run pactl: {}", e)))?;
        if !output.status.success() {
            return Err(SpeakError::Volume(format!(
                "pactl {} exited with {}",
                args.join(" "),
                output.status
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait]
impl VolumeProbe for PactlVolume {
    async fn current_volume(&self) -> SpeakResult<u32> {
        let mute = Self::pactl(&["get-sink-mute", "@DEFAULT_SINK@"]).await?;
        if parse_mute(&mute) {
            debug!("Default sink is muted");
            return Ok(0);
        }

        let volume = Self::pactl(&["get-sink-volume", "@DEFAULT_SINK@"]).await?;
        parse_volume(&volume)
            .ok_or_else(|| SpeakError::Volume(format!("Unrecognized pactl output: {}", volume.trim())))
    }
}

/// `Mute: yes` / `Mute: no`
pub fn parse_mute(output: &str) -> bool {
    output
        .lines()
        .filter_map(|line| line.trim().strip_prefix("Mute:"))
        .any(|value| value.trim().eq_ignore_ascii_case("yes"))
}

/// Loudest channel percentage in `pactl get-sink-volume` output
pub fn parse_volume(output: &str) -> Option<u32> {
    PERCENT
        .captures_iter(output)
        .filter_map(|caps| caps[1].parse::<u32>().ok())
        .max()
}

/// Factory to create the configured volume probe
pub fn create_probe(config: &Config) -> Arc<dyn VolumeProbe> {
    match config.volume_source.as_str() {
        "pactl" => {
            info!("🔈 Volume source: pactl");
            Arc::new(PactlVolume::new())
        }
        "fixed" => {
            info!("🔈 Volume source: fixed ({}%)", config.fixed_volume);
            Arc::new(FixedVolume::new(config.fixed_volume))
        }
        other => {
            warn!(
                "⚠️ Unknown volume source '{}', using fixed {}%",
                other, config.fixed_volume
            );
            Arc::new(FixedVolume::new(config.fixed_volume))
        }
    }
}
