//! Back-press handler categories.
//!
//! The declaration order is the dispatch priority: lower ordinals are asked
//! first. The order is an external contract shared with metric consumers, so
//! new categories must only be inserted where product requirements place them.

use std::fmt;
use std::str::FromStr;

use compact_str::CompactString;
use enum_map::Enum;
use serde::{Deserialize, Serialize};

use crate::error::BackPressError;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Enum, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
#[repr(u8)]
pub enum BackPressCategory {
    TextBubble = 0,
    VrDelegate = 1,
    ArDelegate = 2,
    SceneOverlay = 3,
    StartSurface = 4,
    BottomSheet = 5,
    SelectionPopup = 6,
    ManualFilling = 7,
    Fullscreen = 8,
    TabSwitcher = 9,
    LocationBar = 10,
    TabModal = 11,
    CloseWatcher = 12,
    FindToolbar = 13,
    PageInsightsSheet = 14,
    TabHistory = 15,
    ShowReadingList = 16,
    // Last resort: leaves the app or closes the tab.
    MinimizeAppAndCloseTab = 17,
}

impl BackPressCategory {
    pub const COUNT: usize = 18;

    /// All categories in dispatch order.
    pub const ALL: [Self; Self::COUNT] = [
        Self::TextBubble,
        Self::VrDelegate,
        Self::ArDelegate,
        Self::SceneOverlay,
        Self::StartSurface,
        Self::BottomSheet,
        Self::SelectionPopup,
        Self::ManualFilling,
        Self::Fullscreen,
        Self::TabSwitcher,
        Self::LocationBar,
        Self::TabModal,
        Self::CloseWatcher,
        Self::FindToolbar,
        Self::PageInsightsSheet,
        Self::TabHistory,
        Self::ShowReadingList,
        Self::MinimizeAppAndCloseTab,
    ];

    #[inline]
    #[must_use]
    pub const fn ordinal(self) -> u8 {
        self as u8
    }

    /// Stable kebab-case name used in config files and logs.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::TextBubble => "text-bubble",
            Self::VrDelegate => "vr-delegate",
            Self::ArDelegate => "ar-delegate",
            Self::SceneOverlay => "scene-overlay",
            Self::StartSurface => "start-surface",
            Self::BottomSheet => "bottom-sheet",
            Self::SelectionPopup => "selection-popup",
            Self::ManualFilling => "manual-filling",
            Self::Fullscreen => "fullscreen",
            Self::TabSwitcher => "tab-switcher",
            Self::LocationBar => "location-bar",
            Self::TabModal => "tab-modal",
            Self::CloseWatcher => "close-watcher",
            Self::FindToolbar => "find-toolbar",
            Self::PageInsightsSheet => "page-insights-sheet",
            Self::TabHistory => "tab-history",
            Self::ShowReadingList => "show-reading-list",
            Self::MinimizeAppAndCloseTab => "minimize-app-and-close-tab",
        }
    }
}

impl fmt::Display for BackPressCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BackPressCategory {
    type Err = BackPressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|category| category.name() == s)
            .ok_or_else(|| BackPressError::UnknownCategory(CompactString::new(s)))
    }
}
