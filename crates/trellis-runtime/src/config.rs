/// Runtime-wide settings.
#[derive(Clone, Debug)]
pub struct RuntimeConfig {
    /// Locale used to pick plural categories (default: `en`).
    pub(crate) locale: String,
    /// Claim server-rendered nodes instead of creating them (default: off).
    pub(crate) hydration: bool,
    /// Run a verifying second pass after every change detection (default: off).
    pub(crate) check_no_changes: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            locale: "en".to_string(),
            hydration: false,
            check_no_changes: false,
        }
    }
}

impl RuntimeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn locale(mut self, locale: &str) -> Self {
        self.locale = locale.to_string();
        self
    }

    pub fn hydration(mut self, enabled: bool) -> Self {
        self.hydration = enabled;
        self
    }

    pub fn check_no_changes(mut self, enabled: bool) -> Self {
        self.check_no_changes = enabled;
        self
    }

    pub fn get_locale(&self) -> &str {
        &self.locale
    }

    pub fn get_hydration(&self) -> bool {
        self.hydration
    }

    pub fn get_check_no_changes(&self) -> bool {
        self.check_no_changes
    }
}
