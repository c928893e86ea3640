use log::{info, warn};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use std::sync::Mutex;

const CONFIG_PATH: &str = "rushcore.ini";

// --- Minimal INI reader ---
#[derive(Debug, Default)]
pub struct SimpleIni {
    sections: HashMap<String, HashMap<String, String>>,
}

impl SimpleIni {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load<P: AsRef<Path>>(&mut self, path: P) -> Result<(), std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        self.sections.clear();

        let mut current_section: Option<String> = None;

        for raw_line in content.lines() {
            let line = raw_line.trim();
            if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
                continue;
            }

            // Section header: [SectionName]
            if line.starts_with('[') && line.ends_with(']') && line.len() >= 2 {
                let name = &line[1..line.len() - 1];
                let section = name.trim().to_string();
                current_section = Some(section.clone());
                self.sections.entry(section).or_default();
                continue;
            }

            // Key/value pair: key=value
            if let Some(eq_idx) = line.find('=') {
                let (key_raw, value_raw) = line.split_at(eq_idx);
                let key = key_raw.trim();
                if key.is_empty() {
                    continue;
                }
                let value = value_raw[1..].trim().to_string();
                let section = current_section.clone().unwrap_or_default();
                self.sections
                    .entry(section)
                    .or_default()
                    .insert(key.to_string(), value);
            }
        }

        Ok(())
    }

    pub fn get(&self, section: &str, key: &str) -> Option<String> {
        self.sections.get(section).and_then(|s| s.get(key)).cloned()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    const fn as_str(&self) -> &'static str {
        match self {
            Self::Error => "Error",
            Self::Warn => "Warn",
            Self::Info => "Info",
            Self::Debug => "Debug",
            Self::Trace => "Trace",
        }
    }

    pub const fn as_level_filter(&self) -> log::LevelFilter {
        match self {
            Self::Error => log::LevelFilter::Error,
            Self::Warn => log::LevelFilter::Warn,
            Self::Info => log::LevelFilter::Info,
            Self::Debug => log::LevelFilter::Debug,
            Self::Trace => log::LevelFilter::Trace,
        }
    }
}

impl FromStr for LogLevel {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "error" => Ok(Self::Error),
            "warn" => Ok(Self::Warn),
            "info" => Ok(Self::Info),
            "debug" => Ok(Self::Debug),
            "trace" => Ok(Self::Trace),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: LogLevel,

    // [Telemetry]
    pub telemetry_url: String,
    pub poll_interval_ms: u64,

    // [Filter] one-euro parameters shared by both lanes.
    pub filter_min_cutoff: f32,
    pub filter_beta: f32,
    pub filter_derivative_cutoff: f32,

    // [Cursor] latency-compensated follow gains for the track cursor.
    pub cursor_lookahead_ms: f32,
    pub cursor_gain_base: f32,
    pub cursor_gain_error: f32,
    pub cursor_gain_min: f32,
    pub cursor_gain_max: f32,
    pub cursor_snap_distance: f32,

    // [Judge]
    pub swipe_speed: f32,
    pub hit_z_window: f32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Warn,
            telemetry_url: "http://127.0.0.1:8081/api/control/status".to_string(),
            poll_interval_ms: 33,
            filter_min_cutoff: 1.15,
            filter_beta: 0.03,
            filter_derivative_cutoff: 1.0,
            cursor_lookahead_ms: 65.0,
            cursor_gain_base: 38.0,
            cursor_gain_error: 0.08,
            cursor_gain_min: 38.0,
            cursor_gain_max: 95.0,
            cursor_snap_distance: 2.2,
            swipe_speed: 2.2,
            hit_z_window: 1.6,
        }
    }
}

// Global, mutable configuration instance.
static CONFIG: std::sync::LazyLock<Mutex<Config>> =
    std::sync::LazyLock::new(|| Mutex::new(Config::default()));

fn create_default_config_file() -> Result<(), std::io::Error> {
    info!("'{CONFIG_PATH}' not found, creating with default values.");
    let default = Config::default();

    let mut content = String::new();

    content.push_str("[Options]\n");
    content.push_str(&format!("LogLevel={}\n", default.log_level.as_str()));
    content.push('\n');

    content.push_str("[Telemetry]\n");
    content.push_str(&format!("Url={}\n", default.telemetry_url));
    content.push_str(&format!("PollIntervalMs={}\n", default.poll_interval_ms));
    content.push('\n');

    content.push_str("[Filter]\n");
    content.push_str(&format!("MinCutoff={}\n", default.filter_min_cutoff));
    content.push_str(&format!("Beta={}\n", default.filter_beta));
    content.push_str(&format!(
        "DerivativeCutoff={}\n",
        default.filter_derivative_cutoff
    ));
    content.push('\n');

    content.push_str("[Cursor]\n");
    content.push_str(&format!("LookaheadMs={}\n", default.cursor_lookahead_ms));
    content.push_str(&format!("GainBase={}\n", default.cursor_gain_base));
    content.push_str(&format!("GainError={}\n", default.cursor_gain_error));
    content.push_str(&format!("GainMin={}\n", default.cursor_gain_min));
    content.push_str(&format!("GainMax={}\n", default.cursor_gain_max));
    content.push_str(&format!("SnapDistance={}\n", default.cursor_snap_distance));
    content.push('\n');

    content.push_str("[Judge]\n");
    content.push_str(&format!("SwipeSpeed={}\n", default.swipe_speed));
    content.push_str(&format!("HitZWindow={}\n", default.hit_z_window));
    content.push('\n');

    std::fs::write(CONFIG_PATH, content)
}

pub fn load() {
    if !Path::new(CONFIG_PATH).exists()
        && let Err(e) = create_default_config_file()
    {
        warn!("Failed to create default config file: {e}");
    }

    let mut conf = SimpleIni::new();
    match conf.load(CONFIG_PATH) {
        Ok(()) => {
            let mut cfg = CONFIG.lock().unwrap();
            let default = Config::default();

            cfg.log_level = conf
                .get("Options", "LogLevel")
                .and_then(|v| LogLevel::from_str(&v).ok())
                .unwrap_or(default.log_level);
            cfg.telemetry_url = conf
                .get("Telemetry", "Url")
                .filter(|v| !v.is_empty())
                .unwrap_or(default.telemetry_url);
            cfg.poll_interval_ms = conf
                .get("Telemetry", "PollIntervalMs")
                .and_then(|v| v.parse::<u64>().ok())
                .map(|v| v.max(1))
                .unwrap_or(default.poll_interval_ms);

            cfg.filter_min_cutoff = parse_positive_f32(&conf, "Filter", "MinCutoff")
                .unwrap_or(default.filter_min_cutoff);
            cfg.filter_beta = conf
                .get("Filter", "Beta")
                .and_then(|v| v.parse::<f32>().ok())
                .filter(|v| v.is_finite() && *v >= 0.0)
                .unwrap_or(default.filter_beta);
            cfg.filter_derivative_cutoff = parse_positive_f32(&conf, "Filter", "DerivativeCutoff")
                .unwrap_or(default.filter_derivative_cutoff);

            cfg.cursor_lookahead_ms = parse_positive_f32(&conf, "Cursor", "LookaheadMs")
                .unwrap_or(default.cursor_lookahead_ms);
            cfg.cursor_gain_base =
                parse_positive_f32(&conf, "Cursor", "GainBase").unwrap_or(default.cursor_gain_base);
            cfg.cursor_gain_error = conf
                .get("Cursor", "GainError")
                .and_then(|v| v.parse::<f32>().ok())
                .filter(|v| v.is_finite() && *v >= 0.0)
                .unwrap_or(default.cursor_gain_error);
            cfg.cursor_gain_min =
                parse_positive_f32(&conf, "Cursor", "GainMin").unwrap_or(default.cursor_gain_min);
            cfg.cursor_gain_max =
                parse_positive_f32(&conf, "Cursor", "GainMax").unwrap_or(default.cursor_gain_max);
            if cfg.cursor_gain_max < cfg.cursor_gain_min {
                cfg.cursor_gain_max = cfg.cursor_gain_min;
            }
            cfg.cursor_snap_distance = parse_positive_f32(&conf, "Cursor", "SnapDistance")
                .unwrap_or(default.cursor_snap_distance);

            cfg.swipe_speed =
                parse_positive_f32(&conf, "Judge", "SwipeSpeed").unwrap_or(default.swipe_speed);
            cfg.hit_z_window =
                parse_positive_f32(&conf, "Judge", "HitZWindow").unwrap_or(default.hit_z_window);
        }
        Err(e) => {
            warn!("Could not load '{CONFIG_PATH}', using defaults: {e}");
        }
    }
}

fn parse_positive_f32(conf: &SimpleIni, section: &str, key: &str) -> Option<f32> {
    conf.get(section, key)
        .and_then(|v| v.parse::<f32>().ok())
        .filter(|v| v.is_finite() && *v > 0.0)
}

pub fn get() -> Config {
    CONFIG.lock().unwrap().clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let cfg = Config::default();
        assert!(cfg.filter_min_cutoff > 0.0);
        assert!(cfg.cursor_gain_min <= cfg.cursor_gain_max);
        assert!(cfg.hit_z_window > 0.0);
    }

    #[test]
    fn ini_reader_parses_sections_and_comments() {
        let dir = std::env::temp_dir().join("rushcore_ini_test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("a.ini");
        std::fs::write(&path, "; comment\n[Judge]\nSwipeSpeed = 1.4\n").unwrap();

        let mut ini = SimpleIni::new();
        ini.load(&path).unwrap();
        assert_eq!(ini.get("Judge", "SwipeSpeed").as_deref(), Some("1.4"));
        assert_eq!(ini.get("Judge", "Missing"), None);
    }
}
