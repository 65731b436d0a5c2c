use std::{
    ops::RangeInclusive,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex,
    },
};

use arc_swap::{ArcSwap, Guard};
use tracing::warn;

use crate::voice::AdsrParameters;

/// One of the four user facing envelope parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum AdsrParameter {
    Attack,
    Decay,
    Sustain,
    Release,
}

impl AdsrParameter {
    pub const ALL: [AdsrParameter; 4] = [
        AdsrParameter::Attack,
        AdsrParameter::Decay,
        AdsrParameter::Sustain,
        AdsrParameter::Release,
    ];

    /// Stable identifier used by hosts and UI bindings.
    pub fn id(&self) -> &'static str {
        match self {
            AdsrParameter::Attack => "ATTACK",
            AdsrParameter::Decay => "DECAY",
            AdsrParameter::Sustain => "SUSTAIN",
            AdsrParameter::Release => "RELEASE",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.id() == id)
    }

    pub fn name(&self) -> &'static str {
        match self {
            AdsrParameter::Attack => "Attack",
            AdsrParameter::Decay => "Decay",
            AdsrParameter::Sustain => "Sustain",
            AdsrParameter::Release => "Release",
        }
    }

    /// Allowed values. Seconds for the times, a 0-1 level for sustain.
    pub fn range(&self) -> RangeInclusive<f32> {
        match self {
            AdsrParameter::Attack => 0.0..=5.0,
            AdsrParameter::Decay => 0.0..=3.0,
            AdsrParameter::Sustain => 0.0..=1.0,
            AdsrParameter::Release => 0.0..=5.0,
        }
    }

    pub fn default_value(&self) -> f32 {
        self.get(&AdsrParameters::default())
    }

    /// Non-finite values become 0, everything else is clamped into the range.
    pub fn clamp(&self, value: f32) -> f32 {
        if !value.is_finite() {
            return 0.0;
        }
        let range = self.range();
        value.clamp(*range.start(), *range.end())
    }

    pub fn get(&self, params: &AdsrParameters) -> f32 {
        match self {
            AdsrParameter::Attack => params.attack,
            AdsrParameter::Decay => params.decay,
            AdsrParameter::Sustain => params.sustain,
            AdsrParameter::Release => params.release,
        }
    }

    fn set_on(&self, params: &mut AdsrParameters, value: f32) {
        match self {
            AdsrParameter::Attack => params.attack = value,
            AdsrParameter::Decay => params.decay = value,
            AdsrParameter::Sustain => params.sustain = value,
            AdsrParameter::Release => params.release = value,
        }
    }
}

fn clamp_all(params: AdsrParameters) -> AdsrParameters {
    let mut clamped = params;
    for parameter in AdsrParameter::ALL {
        parameter.set_on(&mut clamped, parameter.clamp(parameter.get(&params)));
    }
    clamped
}

/// Shared envelope settings.
///
/// Writers (the display/UI side) replace the whole parameter set atomically,
/// the render context reads a consistent snapshot once per block. Cloning the
/// handle shares the same settings.
///
/// The replaced snapshot is held until the next write, so it is normally
/// freed by a writer and not by a render guard dropping the last reference.
/// Only a reader that keeps one guard across two writes can end up freeing it.
#[derive(Debug, Clone)]
pub struct SamplerParameters {
    adsr: Arc<ArcSwap<AdsrParameters>>,
    retired: Arc<Mutex<Option<Arc<AdsrParameters>>>>,
}

impl Default for SamplerParameters {
    fn default() -> Self {
        Self::new(AdsrParameters::default())
    }
}

impl SamplerParameters {
    pub fn new(params: AdsrParameters) -> Self {
        SamplerParameters {
            adsr: Arc::new(ArcSwap::from_pointee(clamp_all(params))),
            retired: Arc::default(),
        }
    }

    fn retire(&self, old: Arc<AdsrParameters>) {
        let mut retired = self.retired.lock().unwrap_or_else(|err| err.into_inner());
        // Drops the snapshot retired by the previous write, on this thread
        *retired = Some(old);
    }

    /// Sets a single parameter and returns the value that was actually stored.
    pub fn set(&self, parameter: AdsrParameter, value: f32) -> f32 {
        let applied = parameter.clamp(value);
        if applied != value {
            warn!(
                parameter = parameter.id(),
                value, applied, "Parameter value out of range, clamped"
            );
        }

        let old = self.adsr.rcu(|current| {
            let mut next = **current;
            parameter.set_on(&mut next, applied);
            next
        });
        self.retire(old);

        applied
    }

    /// Replaces all four parameters at once.
    pub fn configure(&self, params: AdsrParameters) {
        let clamped = clamp_all(params);
        if clamped != params {
            warn!(?params, ?clamped, "Envelope parameters out of range, clamped");
        }
        let old = self.adsr.swap(Arc::new(clamped));
        self.retire(old);
    }

    pub fn get(&self, parameter: AdsrParameter) -> f32 {
        parameter.get(&self.adsr.load())
    }

    pub fn snapshot(&self) -> AdsrParameters {
        **self.adsr.load()
    }

    /// Lock-free read for the render context.
    pub(crate) fn load(&self) -> Guard<Arc<AdsrParameters>> {
        self.adsr.load()
    }
}

#[derive(Debug, Clone)]
pub struct VoiceEngineStats {
    pub(super) voice_counter: Arc<AtomicU64>,
}

pub struct VoiceEngineStatsReader {
    stats: VoiceEngineStats,
}

impl VoiceEngineStats {
    pub fn new() -> Self {
        let voice_counter = Arc::new(AtomicU64::new(0));
        Self { voice_counter }
    }
}

impl Default for VoiceEngineStats {
    fn default() -> Self {
        Self::new()
    }
}

impl VoiceEngineStatsReader {
    pub fn new(stats: VoiceEngineStats) -> Self {
        Self { stats }
    }

    pub fn voice_count(&self) -> u64 {
        self.stats.voice_counter.load(Ordering::Relaxed)
    }
}
