use std::path::PathBuf;
use serde::Deserialize;

/// All configuration for the busticket application.
///
/// Precedence (lowest to highest): defaults → config file → env var → CLI arg.
/// CLI arg merging is done by the caller after `Config::load()`.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    // Storage
    pub storage_dir: PathBuf,

    // Server
    pub port: u16,

    // Logging
    pub log_level: String,
    pub utc: bool,

    // Booking time
    pub timezone: String,
    pub booking_time_format: String,

    // QR image
    pub qr_width: u32,
    pub qr_margin: u32,
    pub qr_foreground: String,
    pub qr_background: String,
}

/// Config file layout (~/.busticket/config.toml). All fields optional; they
/// layer on top of compiled-in defaults.
#[derive(Debug, Deserialize, Default)]
struct FileConfig {
    storage_dir: Option<PathBuf>,
    port: Option<u16>,
    log_level: Option<String>,
    utc: Option<bool>,
    timezone: Option<String>,
    booking_time_format: Option<String>,
    qr_width: Option<u32>,
    qr_margin: Option<u32>,
    qr_foreground: Option<String>,
    qr_background: Option<String>,
}

impl Config {
    /// Config directory: ~/.busticket/
    pub fn dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".busticket")
    }

    /// Config file path: ~/.busticket/config.toml
    pub fn file_path() -> PathBuf {
        Self::dir().join("config.toml")
    }

    /// Load config: defaults → config file → env vars.
    /// CLI args should be merged by the caller afterward.
    pub fn load() -> Self {
        let mut config = Self::defaults();

        // Layer 2: config file
        if let Ok(contents) = std::fs::read_to_string(Self::file_path()) {
            config.apply_toml(&contents);
        }

        // Layer 3: environment variables
        config.apply_env(|name| std::env::var(name).ok());

        config
    }

    // --- Private helpers ---

    fn defaults() -> Self {
        Self {
            storage_dir: Self::dir().join("storage"),
            port: 3000,
            log_level: "info".to_string(),
            utc: false,
            timezone: "Asia/Kolkata".to_string(),
            booking_time_format: "%-m/%-d/%Y, %-I:%M:%S %p".to_string(),
            qr_width: 300,
            qr_margin: 3,
            qr_foreground: "#000000".to_string(),
            qr_background: "#FFFFFF".to_string(),
        }
    }

    /// Unparseable files are ignored wholesale.
    fn apply_toml(&mut self, contents: &str) {
        if let Ok(file) = toml::from_str::<FileConfig>(contents) {
            self.apply_file(file);
        }
    }

    fn apply_file(&mut self, file: FileConfig) {
        if let Some(v) = file.storage_dir { self.storage_dir = v; }
        if let Some(v) = file.port { self.port = v; }
        if let Some(v) = file.log_level { self.log_level = v; }
        if let Some(v) = file.utc { self.utc = v; }
        if let Some(v) = file.timezone { self.timezone = v; }
        if let Some(v) = file.booking_time_format { self.booking_time_format = v; }
        if let Some(v) = file.qr_width { self.qr_width = v; }
        if let Some(v) = file.qr_margin { self.qr_margin = v; }
        if let Some(v) = file.qr_foreground { self.qr_foreground = v; }
        if let Some(v) = file.qr_background { self.qr_background = v; }
    }

    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(v) = var("BUSTICKET_STORAGE_DIR") { self.storage_dir = PathBuf::from(v); }
        if let Some(v) = var("BUSTICKET_PORT") {
            if let Ok(p) = v.parse() { self.port = p; }
        }
        if let Some(v) = var("BUSTICKET_LOG_LEVEL") { self.log_level = v; }
        if let Some(v) = var("BUSTICKET_UTC") {
            self.utc = v == "1" || v.eq_ignore_ascii_case("true");
        }
        if let Some(v) = var("BUSTICKET_TIMEZONE") { self.timezone = v; }
        if let Some(v) = var("BUSTICKET_TIME_FORMAT") { self.booking_time_format = v; }
        if let Some(v) = var("BUSTICKET_QR_WIDTH") {
            if let Ok(w) = v.parse() { self.qr_width = w; }
        }
        if let Some(v) = var("BUSTICKET_QR_MARGIN") {
            if let Ok(m) = v.parse() { self.qr_margin = m; }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn file_overrides_defaults() {
        let mut config = Config::defaults();

        config.apply_toml(
            r#"
            port = 8080
            timezone = "UTC"
            qr_margin = 2
            "#,
        );

        assert_eq!(config.port, 8080);
        assert_eq!(config.timezone, "UTC");
        assert_eq!(config.qr_margin, 2);
        assert_eq!(config.qr_width, 300);
    }

    #[test]
    fn malformed_file_is_ignored() {
        let mut config = Config::defaults();

        config.apply_toml("port = \"not a number\"");

        assert_eq!(config, Config::defaults());
    }

    #[test]
    fn env_overrides_file() {
        let mut config = Config::defaults();
        config.apply_toml("log_level = \"warn\"\nutc = false");
        let env: HashMap<&str, &str> = HashMap::from([
            ("BUSTICKET_LOG_LEVEL", "debug"),
            ("BUSTICKET_UTC", "TRUE"),
            ("BUSTICKET_QR_WIDTH", "abc"),
        ]);

        config.apply_env(|name| env.get(name).map(|v| v.to_string()));

        assert_eq!(config.log_level, "debug");
        assert!(config.utc);
        assert_eq!(config.qr_width, 300);
    }
}
