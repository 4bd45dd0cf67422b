//! Page Controls
//!
//! Track selector, caption toggle and player/placeholder visibility.

use crate::registry::{TrackId, TrackRegistry};

/// Text of the sentinel option
pub const NO_SUBTITLES: &str = "No subtitles";

/// `<option>` of the track selector
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectOption {
    pub value: String,
    pub text: String,
}

impl SelectOption {
    fn new(value: &str, text: &str) -> Self {
        Self {
            value: value.to_string(),
            text: text.to_string(),
        }
    }
}

/// Track selector `<select>`
#[derive(Debug, Clone)]
pub struct TrackSelector {
    options: Vec<SelectOption>,
    value: String,
}

impl TrackSelector {
    pub fn new() -> Self {
        Self {
            options: vec![SelectOption::new(TrackId::NONE, NO_SUBTITLES)],
            value: TrackId::NONE.to_string(),
        }
    }

    /// Rebuild options from the registry, sentinel first
    pub fn sync(&mut self, registry: &TrackRegistry) {
        self.options.truncate(1);
        self.options.extend(
            registry
                .entries()
                .iter()
                .map(|entry| SelectOption::new(entry.id.as_str(), &entry.label)),
        );
        if !self.has_option(&self.value) {
            self.value = TrackId::NONE.to_string();
        }
    }

    pub fn options(&self) -> &[SelectOption] {
        &self.options
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    /// Returns false if no option has that value
    pub fn set_value(&mut self, value: &str) -> bool {
        if !self.has_option(value) {
            return false;
        }
        self.value = value.to_string();
        true
    }

    fn has_option(&self, value: &str) -> bool {
        self.options.iter().any(|o| o.value == value)
    }
}

impl Default for TrackSelector {
    fn default() -> Self {
        Self::new()
    }
}

/// Show/hide captions button
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptionToggle {
    enabled: bool,
    disabled: bool,
}

impl CaptionToggle {
    pub fn new() -> Self {
        Self {
            enabled: true,
            disabled: true,
        }
    }

    /// Reflect the selection state
    pub fn update(&mut self, has_active_track: bool, captions_enabled: bool) {
        self.disabled = !has_active_track;
        self.enabled = captions_enabled;
    }

    pub fn label(&self) -> &'static str {
        if self.enabled {
            "Hide captions"
        } else {
            "Show captions"
        }
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled
    }
}

impl Default for CaptionToggle {
    fn default() -> Self {
        Self::new()
    }
}

/// Which of player and "no video" placeholder is shown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageView {
    pub player_visible: bool,
    pub placeholder_visible: bool,
}

impl PageView {
    pub fn show_player(&mut self) {
        self.player_visible = true;
        self.placeholder_visible = false;
    }
}

impl Default for PageView {
    fn default() -> Self {
        Self {
            player_visible: false,
            placeholder_visible: true,
        }
    }
}
