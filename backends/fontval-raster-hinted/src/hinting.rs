// this_file: backends/fontval-raster-hinted/src/hinting.rs

//! Hinting profiles and the instance cache behind them

use std::num::NonZeroUsize;

use fontval_core::{ClearTypeFlags, RenderModes};
use lru::LruCache;
use skrifa::{
    instance::{LocationRef, Size},
    outline::{Engine, HintingInstance, HintingOptions, OutlineGlyphCollection, SmoothMode, Target},
};

/// Default number of cached hinting instances
const DEFAULT_CAPACITY: NonZeroUsize = match NonZeroUsize::new(64) {
    Some(v) => v,
    None => unreachable!(),
};

/// How outlines are hinted for one purpose
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HintProfile {
    /// Font's own instructions, mono target: the metrics tables use this
    Metrics,
    Mono,
    Gray,
    Lcd,
    LcdVertical,
}

impl HintProfile {
    pub fn options(self) -> HintingOptions {
        let smooth = |mode| Target::Smooth {
            mode,
            symmetric_rendering: true,
            preserve_linear_metrics: false,
        };
        match self {
            HintProfile::Metrics => HintingOptions {
                engine: Engine::Interpreter,
                target: Target::Mono,
            },
            HintProfile::Mono => HintingOptions {
                engine: Engine::AutoFallback,
                target: Target::Mono,
            },
            HintProfile::Gray => HintingOptions {
                engine: Engine::AutoFallback,
                target: smooth(SmoothMode::Normal),
            },
            HintProfile::Lcd => HintingOptions {
                engine: Engine::AutoFallback,
                target: smooth(SmoothMode::Lcd),
            },
            HintProfile::LcdVertical => HintingOptions {
                engine: Engine::AutoFallback,
                target: smooth(SmoothMode::VerticalLcd),
            },
        }
    }

    /// One `(label, profile)` per mode in the set, in a fixed order
    pub fn for_modes(modes: RenderModes, cleartype: ClearTypeFlags) -> Vec<(String, HintProfile)> {
        let mut out = Vec::with_capacity(3);
        if modes.contains(RenderModes::BLACK_AND_WHITE) {
            out.push(("black-and-white".to_string(), HintProfile::Mono));
        }
        if modes.contains(RenderModes::GRAYSCALE) {
            out.push(("grayscale".to_string(), HintProfile::Gray));
        }
        if modes.contains(RenderModes::CLEARTYPE) {
            let profile = if cleartype.contains(ClearTypeFlags::VERTICAL) {
                HintProfile::LcdVertical
            } else {
                HintProfile::Lcd
            };
            let flags: Vec<&str> = cleartype.iter_names().map(|(name, _)| name).collect();
            let label = if flags.is_empty() {
                "cleartype".to_string()
            } else {
                format!("cleartype [{}]", flags.join(", "))
            };
            out.push((label, profile));
        }
        out
    }
}

/// Hinting instances keyed by (ppem, profile)
///
/// Setup failures are cached too, so a font whose hinting programs fail
/// is not re-run for every glyph.
pub(crate) struct HintCache {
    instances: LruCache<(u32, HintProfile), Option<HintingInstance>>,
    builds: u64,
}

impl HintCache {
    pub(crate) fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(DEFAULT_CAPACITY);
        Self {
            instances: LruCache::new(capacity),
            builds: 0,
        }
    }

    /// The instance for `ppem` and `profile`, building it on first use
    pub(crate) fn get(
        &mut self,
        outlines: &OutlineGlyphCollection<'_>,
        ppem: f32,
        profile: HintProfile,
    ) -> Option<&HintingInstance> {
        let key = (ppem.to_bits(), profile);
        if !self.instances.contains(&key) {
            let instance = HintingInstance::new(
                outlines,
                Size::new(ppem),
                LocationRef::default(),
                profile.options(),
            )
            .map_err(|e| log::debug!("Hinting setup failed at {ppem} ppem ({profile:?}): {e}"))
            .ok();
            self.builds += 1;
            self.instances.put(key, instance);
        }
        self.instances.get(&key).and_then(Option::as_ref)
    }

    pub(crate) fn clear(&mut self) {
        log::debug!(
            "Dropping {} hinting instances ({} built)",
            self.instances.len(),
            self.builds
        );
        self.instances.clear();
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.instances.len()
    }

    /// Instances built since construction, failed setups included
    #[cfg(test)]
    pub(crate) fn builds(&self) -> u64 {
        self.builds
    }
}

impl Default for HintCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY.get())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modes_map_to_profiles() {
        let profiles = HintProfile::for_modes(RenderModes::all(), ClearTypeFlags::empty());
        let kinds: Vec<HintProfile> = profiles.iter().map(|(_, p)| *p).collect();
        assert_eq!(
            kinds,
            vec![HintProfile::Mono, HintProfile::Gray, HintProfile::Lcd]
        );
        assert_eq!(profiles[2].0, "cleartype");
    }

    #[test]
    fn vertical_stripes_pick_vertical_lcd() {
        let profiles = HintProfile::for_modes(
            RenderModes::CLEARTYPE,
            ClearTypeFlags::VERTICAL | ClearTypeFlags::BGR,
        );
        assert_eq!(profiles.len(), 1);
        assert_eq!(profiles[0].1, HintProfile::LcdVertical);
        assert_eq!(profiles[0].0, "cleartype [BGR, VERTICAL]");
    }

    #[test]
    fn metrics_profile_uses_the_interpreter() {
        let options = HintProfile::Metrics.options();
        assert!(matches!(options.engine, Engine::Interpreter));
        assert!(matches!(options.target, Target::Mono));
    }

    #[test]
    fn zero_capacity_falls_back() {
        assert_eq!(HintCache::new(0).instances.cap(), DEFAULT_CAPACITY);
        assert_eq!(HintCache::default().len(), 0);
    }
}
