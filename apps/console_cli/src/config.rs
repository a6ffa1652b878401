use std::{collections::HashMap, fs};

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub api_root: String,
    pub session_db: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_root: "http://localhost:5240".into(),
            session_db: "sqlite://./data/session.db".into(),
        }
    }
}

/// Settings come from `console.toml` in the working directory, overridden by
/// environment variables.
pub fn load_settings() -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string("console.toml") {
        apply_file_settings(&mut settings, &raw);
    }

    if let Ok(v) = std::env::var("CONSOLE_API_ROOT") {
        settings.api_root = v;
    }
    if let Ok(v) = std::env::var("CONSOLE_SESSION_DB") {
        settings.session_db = v;
    }

    settings
}

fn apply_file_settings(settings: &mut Settings, raw: &str) {
    if let Ok(file_cfg) = toml::from_str::<HashMap<String, String>>(raw) {
        if let Some(v) = file_cfg.get("api_root") {
            settings.api_root = v.clone();
        }
        if let Some(v) = file_cfg.get("session_db") {
            settings.session_db = v.clone();
        }
    }
}
