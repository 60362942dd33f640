use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoStaticStr};

/// When a stored item may be read by the process.
///
/// The variants carry the backend's raw accessibility values. Variants ending
/// in `ThisDeviceOnly` are excluded from backups and never migrate to another
/// device.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    AsRefStr,
    Display,
    EnumIter,
    EnumString,
    IntoStaticStr,
    Serialize,
    Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum AccessibilityPolicy {
    /// Readable only while the device is unlocked. Items migrate to new
    /// devices through encrypted backups.
    #[default]
    #[strum(serialize = "ak")]
    WhenUnlocked,

    /// Readable only while the device is unlocked; never leaves the device.
    #[strum(serialize = "aku")]
    WhenUnlockedThisDeviceOnly,

    /// Readable after the first unlock following a restart, until the next
    /// restart. Suitable for background work.
    #[strum(serialize = "ck")]
    AfterFirstUnlock,

    /// Same as [`Self::AfterFirstUnlock`] but never leaves the device.
    #[strum(serialize = "cku")]
    AfterFirstUnlockThisDeviceOnly,

    /// Readable only while unlocked, and only if a passcode is set. Removing
    /// the passcode deletes the item.
    #[strum(serialize = "akpu")]
    WhenPasscodeSetThisDeviceOnly,
}

impl AccessibilityPolicy {
    /// Returns the raw value submitted to the backend.
    #[must_use]
    pub fn value(self) -> &'static str {
        self.into()
    }

    /// Returns the caller's policy or the default.
    #[must_use]
    pub fn or_default(policy: Option<Self>) -> Self {
        policy.unwrap_or_default()
    }
}
