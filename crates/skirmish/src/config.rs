//! Driver configuration read from the process environment.
use std::env;
use std::path::PathBuf;

#[derive(Clone, Debug, PartialEq)]
pub struct SkirmishConfig {
    pub content_dir: PathBuf,
    pub seed: u64,
    /// Seconds simulated per frame.
    pub frame_dt: f32,
    pub max_frames: u64,
    pub log_dir: Option<PathBuf>,
    pub save_path: Option<PathBuf>,
}

impl Default for SkirmishConfig {
    fn default() -> Self {
        Self {
            content_dir: PathBuf::from("content"),
            seed: 0,
            frame_dt: 0.05,
            max_frames: 20_000,
            log_dir: None,
            save_path: None,
        }
    }
}

impl SkirmishConfig {
    /// Construct configuration from process environment variables.
    ///
    /// Environment variables:
    /// - `SKIRMISH_CONTENT_DIR` - Content directory (default: `content`)
    /// - `SKIRMISH_SEED` - Game seed (default: 0)
    /// - `SKIRMISH_FRAME_DT` - Seconds per frame (default: 0.05)
    /// - `SKIRMISH_MAX_FRAMES` - Frame limit (default: 20000)
    /// - `SKIRMISH_LOG_DIR` - Also log to `skirmish.log` in this directory
    /// - `SKIRMISH_SAVE_PATH` - Write the final action state here as RON
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let read = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(dir) = read("SKIRMISH_CONTENT_DIR") {
            config.content_dir = PathBuf::from(dir);
        }
        if let Some(seed) = parse(read("SKIRMISH_SEED")) {
            config.seed = seed;
        }
        if let Some(dt) = parse::<f32>(read("SKIRMISH_FRAME_DT")).filter(|dt| *dt > 0.0) {
            config.frame_dt = dt;
        }
        if let Some(frames) = parse::<u64>(read("SKIRMISH_MAX_FRAMES")) {
            config.max_frames = frames.max(1);
        }
        config.log_dir = read("SKIRMISH_LOG_DIR").map(PathBuf::from);
        config.save_path = read("SKIRMISH_SAVE_PATH").map(PathBuf::from);

        config
    }
}

fn parse<T>(value: Option<String>) -> Option<T>
where
    T: std::str::FromStr,
{
    value?.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> SkirmishConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        SkirmishConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn empty_environment_gives_defaults() {
        assert_eq!(config(&[]), SkirmishConfig::default());
    }

    #[test]
    fn variables_override_defaults() {
        let config = config(&[
            ("SKIRMISH_CONTENT_DIR", "/srv/content"),
            ("SKIRMISH_SEED", "77"),
            ("SKIRMISH_FRAME_DT", "0.1"),
            ("SKIRMISH_MAX_FRAMES", "500"),
            ("SKIRMISH_SAVE_PATH", "out/save.ron"),
        ]);
        assert_eq!(config.content_dir, PathBuf::from("/srv/content"));
        assert_eq!(config.seed, 77);
        assert_eq!(config.frame_dt, 0.1);
        assert_eq!(config.max_frames, 500);
        assert_eq!(config.save_path, Some(PathBuf::from("out/save.ron")));
        assert_eq!(config.log_dir, None);
    }

    #[test]
    fn garbage_values_are_ignored() {
        let config = config(&[
            ("SKIRMISH_SEED", "many"),
            ("SKIRMISH_FRAME_DT", "-1"),
            ("SKIRMISH_MAX_FRAMES", "0"),
            ("SKIRMISH_LOG_DIR", "  "),
        ]);
        assert_eq!(config.seed, 0);
        assert_eq!(config.frame_dt, 0.05);
        assert_eq!(config.max_frames, 1);
        assert_eq!(config.log_dir, None);
    }
}
