//! Quality selection
//!
//! Picks the variant to play from the ranked list produced by the playlist
//! parser. The default policy conserves mobile data:
//! - An explicit user choice always wins
//! - Low-performance devices get 240p, 360p, or the cheapest variant under
//!   600 kbps
//! - Otherwise the network class maps to a preferred tier
//! - Anything unmatched falls back to the adaptive entry
//!
//! Selection is a pure function of its inputs, so reselecting with an
//! unchanged context always returns the same variant.

use crate::types::*;
use tracing::{debug, instrument};

/// Bitrate ceiling for the low-performance cheapest-variant fallback
pub const LOW_PERFORMANCE_MAX_BPS: u64 = 600_000;

/// Inputs to a selection decision
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionContext {
    pub network_type: NetworkType,
    pub low_performance: bool,
    /// Quality label pinned by the viewer
    pub explicit_label: Option<String>,
}

impl SelectionContext {
    pub fn new(network_type: NetworkType, device: DeviceProfile) -> Self {
        Self {
            network_type,
            low_performance: device.low_performance,
            explicit_label: None,
        }
    }

    pub fn with_label(mut self, label: Option<String>) -> Self {
        self.explicit_label = label;
        self
    }
}

/// Selection policy trait
pub trait SelectionPolicy: Send + Sync {
    /// Return the preferred variant, or `None` to fall back to Auto
    fn select<'a>(&self, variants: &'a [Variant], context: &SelectionContext)
        -> Option<&'a Variant>;

    /// Get policy name
    fn name(&self) -> &'static str;
}

/// Data-conserving policy for mobile playback
#[derive(Debug, Clone)]
pub struct MobileDataPolicy {
    low_performance_max_bps: u64,
}

impl MobileDataPolicy {
    pub fn new() -> Self {
        Self {
            low_performance_max_bps: LOW_PERFORMANCE_MAX_BPS,
        }
    }

    /// Preferred labels per network class, in order
    fn network_preferences(network: NetworkType) -> &'static [&'static str] {
        match network {
            NetworkType::Wifi => &["720p", "1080p"],
            NetworkType::Cellular4G => &["480p"],
            NetworkType::Cellular3G => &["360p"],
            NetworkType::Unknown => &[],
        }
    }

    fn low_performance_pick<'a>(&self, variants: &'a [Variant]) -> Option<&'a Variant> {
        find_first_label(variants, &["240p", "360p"]).or_else(|| {
            variants
                .iter()
                .filter(|v| !v.is_auto && v.bandwidth_bps < self.low_performance_max_bps)
                .min_by_key(|v| v.bandwidth_bps)
        })
    }
}

impl Default for MobileDataPolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl SelectionPolicy for MobileDataPolicy {
    fn select<'a>(
        &self,
        variants: &'a [Variant],
        context: &SelectionContext,
    ) -> Option<&'a Variant> {
        if let Some(label) = context.explicit_label.as_deref() {
            if let Some(pinned) = variants.iter().find(|v| v.quality_label == label) {
                return Some(pinned);
            }
        }

        if context.low_performance {
            return self.low_performance_pick(variants);
        }

        find_first_label(variants, Self::network_preferences(context.network_type))
    }

    fn name(&self) -> &'static str {
        "mobile-data"
    }
}

/// First concrete variant matching any label, tried in label order
fn find_first_label<'a>(variants: &'a [Variant], labels: &[&str]) -> Option<&'a Variant> {
    labels.iter().find_map(|label| {
        variants
            .iter()
            .find(|v| !v.is_auto && v.quality_label == *label)
    })
}

/// Selector wrapping a policy with the Auto fallback
pub struct QualitySelector {
    policy: Box<dyn SelectionPolicy>,
}

impl QualitySelector {
    pub fn new() -> Self {
        Self::with_policy(Box::new(MobileDataPolicy::new()))
    }

    pub fn with_policy(policy: Box<dyn SelectionPolicy>) -> Self {
        Self { policy }
    }

    /// Select a variant; `None` only when the list is empty
    #[instrument(skip(self, variants), fields(policy = self.policy.name()))]
    pub fn select<'a>(
        &self,
        variants: &'a [Variant],
        context: &SelectionContext,
    ) -> Option<&'a Variant> {
        let selected = self
            .policy
            .select(variants, context)
            .or_else(|| variants.iter().find(|v| v.is_auto))
            .or_else(|| variants.first())?;

        debug!(
            label = %selected.quality_label,
            bandwidth = selected.bandwidth_bps,
            playlist_ref = %selected.playlist_ref,
            "Variant selected"
        );

        Some(selected)
    }

    pub fn policy_name(&self) -> &'static str {
        self.policy.name()
    }
}

impl Default for QualitySelector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ladder() -> Vec<Variant> {
        vec![
            Variant::auto("https://api.example.com/stream/android/1"),
            Variant::new("240.m3u8", 300_000, Some(Resolution::new(426, 240)), None, None),
            Variant::new("360.m3u8", 500_000, Some(Resolution::new(640, 360)), None, None),
            Variant::new("480.m3u8", 900_000, Some(Resolution::new(854, 480)), None, None),
            Variant::new("720.m3u8", 1_500_000, Some(Resolution::new(1280, 720)), None, None),
            Variant::new("1080.m3u8", 4_000_000, Some(Resolution::new(1920, 1080)), None, None),
        ]
    }

    fn pick(variants: &[Variant], context: SelectionContext) -> String {
        QualitySelector::new()
            .select(variants, &context)
            .map(|v| v.quality_label.clone())
            .unwrap_or_default()
    }

    #[test]
    fn test_network_preferences() {
        let variants = ladder();
        let device = DeviceProfile::standard();

        assert_eq!(pick(&variants, SelectionContext::new(NetworkType::Wifi, device)), "720p");
        assert_eq!(pick(&variants, SelectionContext::new(NetworkType::Cellular4G, device)), "480p");
        assert_eq!(pick(&variants, SelectionContext::new(NetworkType::Cellular3G, device)), "360p");
        assert_eq!(pick(&variants, SelectionContext::new(NetworkType::Unknown, device)), AUTO_LABEL);
    }

    #[test]
    fn test_wifi_falls_through_to_1080p() {
        let variants: Vec<_> = ladder().into_iter().filter(|v| v.quality_label != "720p").collect();
        let context = SelectionContext::new(NetworkType::Wifi, DeviceProfile::standard());
        assert_eq!(pick(&variants, context), "1080p");
    }

    #[test]
    fn test_explicit_label_wins() {
        let variants = ladder();
        let context = SelectionContext::new(NetworkType::Cellular3G, DeviceProfile::low_performance())
            .with_label(Some("1080p".to_string()));
        assert_eq!(pick(&variants, context), "1080p");

        // Unknown labels fall through to the remaining rules
        let context = SelectionContext::new(NetworkType::Cellular3G, DeviceProfile::standard())
            .with_label(Some("8K".to_string()));
        assert_eq!(pick(&variants, context), "360p");
    }

    #[test]
    fn test_low_performance_rules() {
        let device = DeviceProfile::low_performance();
        let context = SelectionContext::new(NetworkType::Wifi, device);
        assert_eq!(pick(&ladder(), context.clone()), "240p");

        let no_240: Vec<_> = ladder().into_iter().filter(|v| v.quality_label != "240p").collect();
        assert_eq!(pick(&no_240, context.clone()), "360p");

        let bitrate_only = vec![
            Variant::auto("master.m3u8"),
            Variant::new("b.m3u8", 550_000, None, None, None),
            Variant::new("a.m3u8", 450_000, None, None, None),
            Variant::new("c.m3u8", 2_000_000, None, None, None),
        ];
        assert_eq!(pick(&bitrate_only, context.clone()), "450kbps");

        let too_rich = vec![
            Variant::auto("master.m3u8"),
            Variant::new("c.m3u8", 2_000_000, Some(Resolution::new(1280, 720)), None, None),
        ];
        assert_eq!(pick(&too_rich, context), AUTO_LABEL);
    }

    #[test]
    fn test_no_auto_falls_back_to_first() {
        let variants = vec![Variant::new("only.m3u8", 2_000_000, Some(Resolution::new(1920, 1080)), None, None)];
        let context = SelectionContext::new(NetworkType::Unknown, DeviceProfile::standard());
        assert_eq!(pick(&variants, context), "1080p");
        assert!(QualitySelector::new()
            .select(&[], &SelectionContext::default())
            .is_none());
    }

    #[test]
    fn test_selection_is_deterministic() {
        let variants = ladder();
        let selector = QualitySelector::new();
        for network in [NetworkType::Wifi, NetworkType::Cellular4G, NetworkType::Cellular3G, NetworkType::Unknown] {
            let context = SelectionContext::new(network, DeviceProfile::standard());
            let first = selector.select(&variants, &context).map(|v| v.playlist_ref.clone());
            let second = selector.select(&variants, &context).map(|v| v.playlist_ref.clone());
            assert_eq!(first, second);
        }
    }
}
