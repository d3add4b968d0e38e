use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::overlay::{FitConfig, LayoutConfig, OverlayStyle};

const DEFAULT_SETTINGS_TOML: &str = include_str!("../settings.toml");

#[derive(Debug, Clone)]
pub struct Settings {
    pub overlay_text_color: String,
    pub overlay_fill_color: String,
    pub overlay_font_path: Option<String>,
    pub overlay_font_family: Option<String>,
    pub min_font_size: u32,
    pub max_font_size: u32,
    pub font_step: u32,
    pub line_spacing: u32,
    pub cover_padding: u32,
    pub fallback_font_size: u32,
    pub server_addr: String,
    pub fetch_timeout_secs: u64,
    pub fetch_retries: usize,
    pub user_agent: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            overlay_text_color: "#000000".to_string(),
            overlay_fill_color: "#ffffff".to_string(),
            overlay_font_path: None,
            overlay_font_family: None,
            min_font_size: 8,
            max_font_size: 96,
            font_step: 2,
            line_spacing: 2,
            cover_padding: 2,
            fallback_font_size: 14,
            server_addr: "127.0.0.1:5000".to_string(),
            fetch_timeout_secs: 10,
            fetch_retries: 3,
            user_agent: concat!("overlay-translator/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct SettingsFile {
    overlay: Option<OverlaySettings>,
    layout: Option<LayoutSettings>,
    server: Option<ServerSettings>,
}

#[derive(Debug, Default, Deserialize)]
struct OverlaySettings {
    text_color: Option<String>,
    fill_color: Option<String>,
    font_path: Option<String>,
    font_family: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LayoutSettings {
    min_font_size: Option<u32>,
    max_font_size: Option<u32>,
    font_step: Option<u32>,
    line_spacing: Option<u32>,
    cover_padding: Option<u32>,
    fallback_font_size: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerSettings {
    addr: Option<String>,
    fetch_timeout_secs: Option<u64>,
    fetch_retries: Option<usize>,
    user_agent: Option<String>,
}

pub fn load_settings(extra_path: Option<&Path>) -> Result<Settings> {
    let mut settings = Settings::default();
    settings.merge_str(DEFAULT_SETTINGS_TOML, "built-in settings")?;

    let mut ordered_paths = Vec::new();
    ordered_paths.push(PathBuf::from("settings.toml"));
    ordered_paths.push(PathBuf::from("settings.local.toml"));

    if let Some(home) = home_dir() {
        ordered_paths.push(home.join("settings.toml"));
        ordered_paths.push(home.join("settings.local.toml"));
    }

    if let Some(extra) = extra_path {
        if !extra.exists() {
            return Err(anyhow!("settings file not found: {}", extra.display()));
        }
        ordered_paths.push(extra.to_path_buf());
    }

    for path in ordered_paths {
        if path.exists() {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("failed to read settings: {}", path.display()))?;
            settings.merge_str(&content, &path.display().to_string())?;
        }
    }

    Ok(settings)
}

impl Settings {
    pub fn fit_config(&self) -> FitConfig {
        FitConfig {
            min_size: self.min_font_size,
            max_size: self.max_font_size.max(self.min_font_size),
            step: self.font_step,
            line_spacing: self.line_spacing,
            fallback_size: self.fallback_font_size,
        }
    }

    pub fn layout_config(&self) -> LayoutConfig {
        LayoutConfig {
            fit: self.fit_config(),
            cover_padding: self.cover_padding,
        }
    }

    pub fn overlay_style(&self) -> OverlayStyle {
        OverlayStyle {
            text_color: self.overlay_text_color.clone(),
            fill_color: self.overlay_fill_color.clone(),
        }
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    fn merge_str(&mut self, content: &str, origin: &str) -> Result<()> {
        let parsed: SettingsFile = toml::from_str(content)
            .with_context(|| format!("failed to parse settings: {}", origin))?;
        self.merge(parsed);
        Ok(())
    }

    fn merge(&mut self, incoming: SettingsFile) {
        if let Some(overlay) = incoming.overlay {
            if let Some(color) = non_empty(overlay.text_color) {
                self.overlay_text_color = color;
            }
            if let Some(color) = non_empty(overlay.fill_color) {
                self.overlay_fill_color = color;
            }
            if let Some(path) = non_empty(overlay.font_path) {
                self.overlay_font_path = Some(path);
            }
            if let Some(family) = non_empty(overlay.font_family) {
                self.overlay_font_family = Some(family);
            }
        }
        if let Some(layout) = incoming.layout {
            merge_positive(&mut self.min_font_size, layout.min_font_size);
            merge_positive(&mut self.max_font_size, layout.max_font_size);
            merge_positive(&mut self.font_step, layout.font_step);
            merge_positive(&mut self.fallback_font_size, layout.fallback_font_size);
            if let Some(spacing) = layout.line_spacing {
                self.line_spacing = spacing;
            }
            if let Some(padding) = layout.cover_padding {
                self.cover_padding = padding;
            }
        }
        if let Some(server) = incoming.server {
            if let Some(addr) = non_empty(server.addr) {
                self.server_addr = addr;
            }
            if let Some(secs) = server.fetch_timeout_secs {
                if secs > 0 {
                    self.fetch_timeout_secs = secs;
                }
            }
            if let Some(retries) = server.fetch_retries {
                self.fetch_retries = retries;
            }
            if let Some(agent) = non_empty(server.user_agent) {
                self.user_agent = agent;
            }
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}

fn merge_positive(target: &mut u32, value: Option<u32>) {
    if let Some(value) = value {
        if value > 0 {
            *target = value;
        }
    }
}

fn home_dir() -> Option<PathBuf> {
    std::env::var("HOME").ok().and_then(|home| {
        let home = home.trim();
        if home.is_empty() {
            None
        } else {
            Some(Path::new(home).join(".overlay-translator"))
        }
    })
}
