use eframe::Storage;

pub const THEME_KEY: &str = "theme";
pub const SPLIT_KEY: &str = "relionui-split";

pub const DEFAULT_SPLIT: f32 = 55.0;
pub const MIN_SPLIT: f32 = 15.0;
pub const MAX_SPLIT: f32 = 85.0;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ThemeName {
    #[default]
    Dark,
    Light,
}

impl ThemeName {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Dark => "dark",
            Self::Light => "light",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "dark" => Some(Self::Dark),
            "light" => Some(Self::Light),
            _ => None,
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Self::Dark => Self::Light,
            Self::Light => Self::Dark,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Preferences {
    pub theme: ThemeName,
    split_percent: f32,
    dirty: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            theme: ThemeName::default(),
            split_percent: DEFAULT_SPLIT,
            dirty: false,
        }
    }
}

impl Preferences {
    pub fn load(storage: Option<&dyn Storage>) -> Self {
        let Some(storage) = storage else {
            return Self::default();
        };

        let theme = storage
            .get_string(THEME_KEY)
            .and_then(|value| ThemeName::parse(&value))
            .unwrap_or_default();
        let split_percent = storage
            .get_string(SPLIT_KEY)
            .and_then(|value| value.trim().parse::<f32>().ok())
            .filter(|value| value.is_finite())
            .map(|value| value.clamp(MIN_SPLIT, MAX_SPLIT))
            .unwrap_or(DEFAULT_SPLIT);

        Self {
            theme,
            split_percent,
            dirty: false,
        }
    }

    pub fn split_percent(&self) -> f32 {
        self.split_percent
    }

    pub fn set_split(&mut self, percent: f32) {
        if percent.is_finite() {
            self.split_percent = percent.clamp(MIN_SPLIT, MAX_SPLIT);
        }
    }

    pub fn commit_split(&mut self) {
        self.dirty = true;
    }

    pub fn toggle_theme(&mut self) {
        self.theme = self.theme.toggled();
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn save(&mut self, storage: &mut dyn Storage) {
        storage.set_string(THEME_KEY, self.theme.as_str().to_owned());
        storage.set_string(SPLIT_KEY, self.split_percent.to_string());
        self.dirty = false;
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[derive(Default)]
    struct MemoryStorage(HashMap<String, String>);

    impl Storage for MemoryStorage {
        fn get_string(&self, key: &str) -> Option<String> {
            self.0.get(key).cloned()
        }

        fn set_string(&mut self, key: &str, value: String) {
            self.0.insert(key.to_owned(), value);
        }

        fn flush(&mut self) {}
    }

    #[test]
    fn missing_storage_uses_defaults() {
        let prefs = Preferences::load(None);
        assert_eq!(prefs.theme, ThemeName::Dark);
        assert_eq!(prefs.split_percent(), 55.0);
    }

    #[test]
    fn invalid_values_fall_back() {
        let mut storage = MemoryStorage::default();
        storage.set_string(THEME_KEY, "solarized".to_owned());
        storage.set_string(SPLIT_KEY, "wide".to_owned());
        let prefs = Preferences::load(Some(&storage));
        assert_eq!(prefs.theme, ThemeName::Dark);
        assert_eq!(prefs.split_percent(), DEFAULT_SPLIT);
    }

    #[test]
    fn stored_values_round_trip_through_save() {
        let mut storage = MemoryStorage::default();
        let mut prefs = Preferences::default();
        prefs.toggle_theme();
        prefs.set_split(70.0);
        prefs.commit_split();
        assert!(prefs.is_dirty());

        prefs.save(&mut storage);
        assert!(!prefs.is_dirty());
        assert_eq!(storage.0.get(THEME_KEY).map(String::as_str), Some("light"));

        let loaded = Preferences::load(Some(&storage));
        assert_eq!(loaded.theme, ThemeName::Light);
        assert_eq!(loaded.split_percent(), 70.0);
    }

    #[test]
    fn split_is_clamped() {
        let mut prefs = Preferences::default();
        prefs.set_split(3.0);
        assert_eq!(prefs.split_percent(), MIN_SPLIT);
        prefs.set_split(99.0);
        assert_eq!(prefs.split_percent(), MAX_SPLIT);
        prefs.set_split(f32::NAN);
        assert_eq!(prefs.split_percent(), MAX_SPLIT);
    }
}
