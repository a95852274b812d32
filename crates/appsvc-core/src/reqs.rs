//! Launch requirement reconciliation
//!
//! Merges hardware requirements declared by the app, the streaming daemon
//! and the runner into one set, and applies the display constraints the
//! container's X server can start with.

use crate::models::{HardwareRequirements, HwReqs, VideoEnc};

pub const DEFAULT_APP_REQ_MIDI: bool = false;
pub const DEFAULT_APP_REQ_COLOR_BITS: u8 = 24;
/// Xorg fails to start with a lower depth
pub const MIN_COLOR_BITS: u8 = 16;
/// Xorg fails to start with a higher depth
pub const MAX_COLOR_BITS: u8 = 24;
/// Xorg fails to start with a lower height
pub const MIN_SCREEN_HEIGHT: u32 = 400;
/// Xorg fails to start with a lower width
pub const MIN_SCREEN_WIDTH: u32 = 640;

/// Runner whose 16-bit mode draws a transparent square around the cursor
pub const WINE_RUNNER: &str = "wine";

pub const DEFAULT_HW_REQ_DGPU: bool = false;
pub const DEFAULT_HW_REQ_IGPU: bool = false;
/// 1 GiB
pub const DEFAULT_HW_REQ_MEMORY: u64 = 1024 * 1024 * 1024;
pub const DEFAULT_HW_REQ_MEMORY_SHARED: Option<u64> = None;
/// One full core
pub const DEFAULT_HW_REQ_NANOCPUS: u64 = 1_000_000_000;

/// How one hardware field combines its sources
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergePolicy {
    /// Set when any source or the default is set
    Any,
    /// Largest of sources and default
    Max,
    /// Sum of sources; the default only when the sum is zero
    SumOrDefault,
    /// Sum of sources plus the default
    SumPlusDefault,
}

impl MergePolicy {
    /// Combine source values. Flags are encoded as 0/1.
    pub fn merge(self, sources: &[u64], default: Option<u64>) -> Option<u64> {
        let floor = default.unwrap_or(0);
        let sum = || sources.iter().fold(0u64, |acc, v| acc.saturating_add(*v));
        match self {
            MergePolicy::Any => Some(u64::from(
                sources.iter().any(|v| *v != 0) || floor != 0,
            )),
            MergePolicy::Max => Some(sources.iter().copied().fold(floor, u64::max)),
            MergePolicy::SumOrDefault => match sum() {
                0 => default,
                total => Some(total),
            },
            MergePolicy::SumPlusDefault => Some(sum().saturating_add(floor)),
        }
    }
}

/// Per-field merge policy for hardware requirements
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HardwarePolicy {
    pub dgpu: MergePolicy,
    pub igpu: MergePolicy,
    pub memory: MergePolicy,
    pub memory_shared: MergePolicy,
    pub nanocpus: MergePolicy,
}

impl Default for HardwarePolicy {
    fn default() -> Self {
        Self {
            dgpu: MergePolicy::Any,
            igpu: MergePolicy::Any,
            memory: MergePolicy::Max,
            memory_shared: MergePolicy::SumOrDefault,
            nanocpus: MergePolicy::SumPlusDefault,
        }
    }
}

/// Compiled-in hardware defaults
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HardwareDefaults {
    pub dgpu: bool,
    pub igpu: bool,
    pub memory: u64,
    pub memory_shared: Option<u64>,
    pub nanocpus: u64,
}

impl Default for HardwareDefaults {
    fn default() -> Self {
        Self {
            dgpu: DEFAULT_HW_REQ_DGPU,
            igpu: DEFAULT_HW_REQ_IGPU,
            memory: DEFAULT_HW_REQ_MEMORY,
            memory_shared: DEFAULT_HW_REQ_MEMORY_SHARED,
            nanocpus: DEFAULT_HW_REQ_NANOCPUS,
        }
    }
}

/// Merges app, streaming daemon and runner hardware requirements
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequirementReconciler {
    pub policy: HardwarePolicy,
    pub defaults: HardwareDefaults,
}

impl RequirementReconciler {
    pub fn new(policy: HardwarePolicy, defaults: HardwareDefaults) -> Self {
        Self { policy, defaults }
    }

    /// Reconcile the hardware requirements of one launch.
    ///
    /// A dgpu requirement may come from the app (3D game) as well as from
    /// the streaming daemon (heavy codec, high resolution).
    pub fn reconcile(&self, app: &HwReqs, streamd: &HwReqs, runner: &HwReqs) -> HardwareRequirements {
        let sources = [app, streamd, runner];
        let field = |get: fn(&HwReqs) -> u64| -> Vec<u64> { sources.iter().map(|&s| get(s)).collect() };
        let flag = |policy: MergePolicy, get: fn(&HwReqs) -> u64, default: bool| {
            policy
                .merge(&field(get), Some(u64::from(default)))
                .is_some_and(|v| v != 0)
        };

        HardwareRequirements {
            dgpu: flag(self.policy.dgpu, |s| u64::from(s.dgpu), self.defaults.dgpu),
            igpu: flag(self.policy.igpu, |s| u64::from(s.igpu), self.defaults.igpu),
            memory: self
                .policy
                .memory
                .merge(&field(|s| s.memory), Some(self.defaults.memory))
                .unwrap_or(self.defaults.memory),
            memory_shared: self
                .policy
                .memory_shared
                .merge(&field(|s| s.memory_shared), self.defaults.memory_shared),
            nanocpus: self
                .policy
                .nanocpus
                .merge(&field(|s| s.nanocpus), Some(self.defaults.nanocpus))
                .unwrap_or(self.defaults.nanocpus),
        }
    }
}

/// Double both screen dimensions when either is below what Xorg accepts,
/// e.g. 320x200 becomes 640x400.
pub fn fit_screen(height: u32, width: u32) -> (u32, u32) {
    if height < MIN_SCREEN_HEIGHT || width < MIN_SCREEN_WIDTH {
        (height.saturating_mul(2), width.saturating_mul(2))
    } else {
        (height, width)
    }
}

/// Clamp the requested color depth to what Xorg accepts.
///
/// Wine draws a transparent square around the cursor in many games at
/// 16 bits, so it gets 24 instead.
pub fn clamp_color_bits(requested: Option<u8>, runner_name: &str) -> u8 {
    let requested = requested
        .filter(|bits| *bits != 0)
        .unwrap_or(DEFAULT_APP_REQ_COLOR_BITS);
    let color_bits = requested.clamp(MIN_COLOR_BITS, MAX_COLOR_BITS);

    if runner_name == WINE_RUNNER && color_bits == MIN_COLOR_BITS {
        MAX_COLOR_BITS
    } else {
        color_bits
    }
}

/// Pick the streaming encoder from the streaming daemon's capabilities
pub fn select_video_enc(streamd: &HwReqs) -> VideoEnc {
    if streamd.igpu {
        VideoEnc::GpuIntel
    } else if streamd.dgpu {
        VideoEnc::GpuNvidia
    } else {
        VideoEnc::Cpu
    }
}
