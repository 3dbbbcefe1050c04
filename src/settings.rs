//! 用户偏好设置
//!
//! 目前只有主题一项，以独立的 JSON 文件持久化，与词库互不影响。

use std::fmt;
use std::io;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// 界面主题
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            other => Err(format!("未知主题: {other}（可选 light / dark）")),
        }
    }
}

/// 持久化的用户偏好
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default)]
    pub theme: Theme,
}

/// 偏好文件存取
pub struct PreferencesStore {
    path: PathBuf,
}

impl PreferencesStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// 默认路径：用户配置目录下的 zenvocab/settings.json
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("zenvocab")
            .join("settings.json")
    }

    /// 读取偏好，文件缺失或损坏时返回默认值
    pub fn load(&self) -> Preferences {
        std::fs::read_to_string(&self.path)
            .ok()
            .and_then(|raw| serde_json::from_str(&raw).ok())
            .unwrap_or_default()
    }

    /// 写回偏好
    pub fn save(&self, preferences: &Preferences) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(preferences)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        std::fs::write(&self.path, json)
    }

    /// 切换主题并持久化，返回新主题
    pub fn toggle_theme(&self) -> io::Result<Theme> {
        let mut preferences = self.load();
        preferences.theme = preferences.theme.toggled();
        self.save(&preferences)?;
        Ok(preferences.theme)
    }

    /// 设置指定主题并持久化
    pub fn set_theme(&self, theme: Theme) -> io::Result<()> {
        let mut preferences = self.load();
        preferences.theme = theme;
        self.save(&preferences)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store() -> (tempfile::TempDir, PreferencesStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = PreferencesStore::new(dir.path().join("settings.json"));
        (dir, store)
    }

    #[test]
    fn test_load_missing_file_defaults_to_light() {
        let (_dir, store) = temp_store();
        assert_eq!(store.load().theme, Theme::Light);
    }

    #[test]
    fn test_toggle_persists() {
        let (_dir, store) = temp_store();

        assert_eq!(store.toggle_theme().unwrap(), Theme::Dark);
        assert_eq!(store.load().theme, Theme::Dark);

        assert_eq!(store.toggle_theme().unwrap(), Theme::Light);
        assert_eq!(store.load().theme, Theme::Light);
    }

    #[test]
    fn test_theme_serializes_lowercase() {
        let json = serde_json::to_string(&Preferences { theme: Theme::Dark }).unwrap();
        assert_eq!(json, r#"{"theme":"dark"}"#);
    }

    #[test]
    fn test_corrupt_file_falls_back_to_default() {
        let (_dir, store) = temp_store();
        std::fs::write(store.path.clone(), "not json at all").unwrap();
        assert_eq!(store.load().theme, Theme::Light);
    }
}
