use super::ReleaseType;

/// Length of the fade used when a voice is killed, in seconds.
const KILL_FADE_SECONDS: f32 = 0.001;

/// The stages in envelopes as a numbered enum
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum EnvelopeStage {
    Attack = 0,
    Decay = 1,
    Sustain = 2,
    Release = 3, // Goes to this stage as soon as the voice is released
    Idle = 4,
}

impl EnvelopeStage {
    pub fn next_stage(&self) -> EnvelopeStage {
        match self {
            EnvelopeStage::Attack => EnvelopeStage::Decay,
            EnvelopeStage::Decay => EnvelopeStage::Sustain,
            EnvelopeStage::Sustain => EnvelopeStage::Release,
            EnvelopeStage::Release => EnvelopeStage::Idle,
            EnvelopeStage::Idle => EnvelopeStage::Idle,
        }
    }
}

/// The ADSR values as set by the user. Times are in seconds, sustain is a level.
#[derive(Debug, Copy, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct EnvelopeDescriptor {
    pub attack: f32,  // Seconds
    pub decay: f32,   // Seconds
    pub sustain: f32, // Level (0-1)
    pub release: f32, // Seconds
}

/// The envelope values shared between the display and the render context.
pub type AdsrParameters = EnvelopeDescriptor;

impl Default for EnvelopeDescriptor {
    fn default() -> Self {
        EnvelopeDescriptor {
            attack: 0.0,
            decay: 2.0,
            sustain: 1.0,
            release: 0.75,
        }
    }
}

fn non_negative(value: f32) -> f32 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

impl EnvelopeDescriptor {
    pub fn new(attack: f32, decay: f32, sustain: f32, release: f32) -> Self {
        EnvelopeDescriptor {
            attack,
            decay,
            sustain,
            release,
        }
    }

    /// Negative and non-finite values become zero, sustain is capped at 1.
    pub fn sanitized(&self) -> Self {
        EnvelopeDescriptor {
            attack: non_negative(self.attack),
            decay: non_negative(self.decay),
            sustain: non_negative(self.sustain).min(1.0),
            release: non_negative(self.release),
        }
    }

    #[allow(clippy::wrong_self_convention)]
    pub fn to_envelope_params(&self, sample_rate: u32) -> EnvelopeParameters {
        let desc = self.sanitized();
        let samplerate = sample_rate as f32;
        let samples = |seconds: f32| (seconds * samplerate).round() as u32;

        EnvelopeParameters {
            attack: samples(desc.attack),
            decay: samples(desc.decay),
            sustain: desc.sustain,
            release: samples(desc.release),
            kill: samples(KILL_FADE_SECONDS),
        }
    }
}

/// The envelope converted to sample counts for a specific sample rate.
/// Use EnvelopeDescriptor to generate it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnvelopeParameters {
    attack: u32,
    decay: u32,
    sustain: f32,
    release: u32,
    kill: u32,
}

impl EnvelopeParameters {
    /// Duration of a stage in samples. Sustain and Idle have no duration.
    pub fn get_stage_duration(&self, stage: EnvelopeStage) -> u32 {
        match stage {
            EnvelopeStage::Attack => self.attack,
            EnvelopeStage::Decay => self.decay,
            EnvelopeStage::Release => self.release,
            EnvelopeStage::Sustain | EnvelopeStage::Idle => 0,
        }
    }

    fn stage_target(&self, stage: EnvelopeStage) -> f32 {
        match stage {
            EnvelopeStage::Attack => 1.0,
            EnvelopeStage::Decay | EnvelopeStage::Sustain => self.sustain,
            EnvelopeStage::Release | EnvelopeStage::Idle => 0.0,
        }
    }
}

impl Default for EnvelopeParameters {
    fn default() -> Self {
        EnvelopeDescriptor::default().to_envelope_params(44100)
    }
}

/// Per voice ADSR state machine. Produces one gain value per frame.
///
/// Ramps always continue from the current gain: a retrigger starts the attack
/// from wherever the previous note left off, a release starts from the gain at
/// the moment of the note off, and a parameter change mid-stage only reshapes
/// the part of the ramp that hasn't been played yet.
#[derive(Debug, Clone)]
pub struct EnvelopeGenerator {
    params: EnvelopeParameters,
    stage: EnvelopeStage,
    level: f32,
    stage_time: u32,
    killed: bool,
}

impl EnvelopeGenerator {
    /// Creates an envelope in the Idle stage with zero gain.
    pub fn new(params: EnvelopeParameters) -> Self {
        EnvelopeGenerator {
            params,
            stage: EnvelopeStage::Idle,
            level: 0.0,
            stage_time: 0,
            killed: false,
        }
    }

    pub fn configure(&mut self, params: EnvelopeParameters) {
        self.params = params;
    }

    pub fn current_stage(&self) -> EnvelopeStage {
        self.stage
    }

    /// The gain produced by the last processed frame.
    pub fn level(&self) -> f32 {
        self.level
    }

    pub fn is_idle(&self) -> bool {
        self.stage == EnvelopeStage::Idle
    }

    pub fn is_releasing(&self) -> bool {
        self.stage == EnvelopeStage::Release
    }

    pub fn note_on(&mut self) {
        self.stage = EnvelopeStage::Attack;
        self.stage_time = 0;
        self.killed = false;
    }

    pub fn note_off(&mut self) {
        self.release(ReleaseType::Standard);
    }

    pub fn release(&mut self, rel_type: ReleaseType) {
        if rel_type == ReleaseType::Kill && !self.killed && !self.is_idle() {
            self.killed = true;
            self.stage = EnvelopeStage::Release;
            self.stage_time = 0;
            return;
        }

        match self.stage {
            EnvelopeStage::Release | EnvelopeStage::Idle => {}
            _ => {
                self.stage = EnvelopeStage::Release;
                self.stage_time = 0;
            }
        }
    }

    fn stage_duration(&self) -> u32 {
        if self.killed && self.stage == EnvelopeStage::Release {
            self.params.kill
        } else {
            self.params.get_stage_duration(self.stage)
        }
    }

    fn switch_to_next_stage(&mut self) {
        self.stage = self.stage.next_stage();
        self.stage_time = 0;
    }

    pub fn next_gain(&mut self) -> f32 {
        match self.stage {
            EnvelopeStage::Idle => {
                self.level = 0.0;
            }
            EnvelopeStage::Sustain => {
                self.level = self.params.sustain;
            }
            stage => {
                let target = self.params.stage_target(stage);
                let duration = self.stage_duration();
                self.stage_time += 1;

                if self.stage_time >= duration {
                    self.level = target;
                    self.switch_to_next_stage();
                } else {
                    // Cover the remaining distance in equal steps over the remaining frames
                    let remaining = (duration - self.stage_time + 1) as f32;
                    self.level += (target - self.level) / remaining;
                }
            }
        }

        self.level
    }
}

#[cfg(test)]
mod tests {
    use rand::Rng;

    use super::*;

    fn lerp(from: f32, to: f32, fac: f32) -> f32 {
        from + (to - from) * fac
    }

    fn triggered(desc: EnvelopeDescriptor, sample_rate: u32) -> EnvelopeGenerator {
        let mut env = EnvelopeGenerator::new(desc.to_envelope_params(sample_rate));
        env.note_on();
        env
    }

    #[test]
    fn test_envelope() {
        let descriptor = EnvelopeDescriptor::new(15.0, 17.0, 0.4, 16.0);
        let mut env = triggered(descriptor, 1);

        let mut vec = Vec::new();
        for _ in 0..48 {
            vec.push(env.next_gain());
        }
        env.note_off();
        assert_eq!(env.current_stage(), EnvelopeStage::Release);
        for _ in 0..32 {
            vec.push(env.next_gain());
        }

        let mut expected_vec = Vec::new();
        for i in 1..=15 {
            expected_vec.push(lerp(0.0, 1.0, i as f32 / 15.0));
        }
        for i in 1..=17 {
            expected_vec.push(lerp(1.0, 0.4, i as f32 / 17.0));
        }
        for _ in 0..16 {
            expected_vec.push(0.4);
        }
        for i in 1..=16 {
            expected_vec.push(lerp(0.4, 0.0, i as f32 / 16.0));
        }
        for _ in 0..16 {
            expected_vec.push(0.0);
        }

        for v in vec.iter_mut().chain(expected_vec.iter_mut()) {
            // Rounding as accumulated steps are sometimes off by tiny fractions
            *v = (*v * 10000.0).round() / 10000.0;
        }

        assert_eq!(vec, expected_vec);
        assert!(env.is_idle());
    }

    #[test]
    fn test_zero_length_stages() {
        let mut env = triggered(EnvelopeDescriptor::new(0.0, 0.0, 0.3, 0.0), 44100);
        assert_eq!(env.next_gain(), 1.0);
        assert_eq!(env.current_stage(), EnvelopeStage::Decay);
        assert_eq!(env.next_gain(), 0.3);
        assert_eq!(env.current_stage(), EnvelopeStage::Sustain);
        assert_eq!(env.next_gain(), 0.3);
        env.note_off();
        assert_eq!(env.next_gain(), 0.0);
        assert!(env.is_idle());
        assert_eq!(env.next_gain(), 0.0);
    }

    #[test]
    fn test_malformed_parameters_are_clamped() {
        let desc = EnvelopeDescriptor::new(-1.0, f32::NAN, 3.0, f32::INFINITY);
        assert_eq!(desc.sanitized(), EnvelopeDescriptor::new(0.0, 0.0, 1.0, 0.0));

        let mut env = triggered(desc, 44100);
        for _ in 0..10 {
            let gain = env.next_gain();
            assert!(gain.is_finite());
            assert!((0.0..=1.0).contains(&gain));
        }
        assert_eq!(env.current_stage(), EnvelopeStage::Sustain);
        assert_eq!(env.level(), 1.0);
    }

    #[test]
    fn test_retrigger_keeps_gain() {
        let mut env = triggered(EnvelopeDescriptor::new(0.0, 0.0, 0.6, 10.0), 10);
        for _ in 0..4 {
            env.next_gain();
        }
        env.note_off();
        for _ in 0..50 {
            env.next_gain();
        }
        let before = env.level();
        assert!(before > 0.0 && before < 0.6);

        env.note_on();
        assert_eq!(env.current_stage(), EnvelopeStage::Attack);
        assert_eq!(env.level(), before);
        // Zero attack jumps to the peak on the next frame, never through zero
        assert_eq!(env.next_gain(), 1.0);
    }

    #[test]
    fn test_retrigger_attack_starts_from_carried_gain() {
        let mut env = triggered(EnvelopeDescriptor::new(0.0, 0.0, 0.5, 1.0), 100);
        for _ in 0..3 {
            env.next_gain();
        }
        env.note_off();
        for _ in 0..50 {
            env.next_gain();
        }
        let carried = env.level();

        env.configure(EnvelopeDescriptor::new(1.0, 0.0, 0.5, 1.0).to_envelope_params(100));
        env.note_on();
        let first = env.next_gain();
        assert!(first > carried);
        assert!(first - carried <= (1.0 - carried) / 100.0 + 1e-6);
    }

    #[test]
    fn test_note_off_is_idempotent() {
        let mut env = triggered(EnvelopeDescriptor::new(0.0, 0.0, 1.0, 1.0), 100);
        env.next_gain();
        env.note_off();
        for _ in 0..30 {
            env.next_gain();
        }
        let mid_release = env.level();

        env.note_off();
        assert_eq!(env.current_stage(), EnvelopeStage::Release);
        let next = env.next_gain();
        assert!(next < mid_release);
        assert!(next < 1.0);

        let mut last = next;
        while !env.is_idle() {
            let gain = env.next_gain();
            assert!(gain <= last);
            last = gain;
        }
        assert_eq!(last, 0.0);
    }

    #[test]
    fn test_note_off_before_sustain() {
        let mut env = triggered(EnvelopeDescriptor::new(1.0, 0.0, 1.0, 1.0), 100);
        for _ in 0..50 {
            env.next_gain();
        }
        let peak = env.level();
        assert!((peak - 0.5).abs() < 1e-4);

        env.note_off();
        let first = env.next_gain();
        assert!(first < peak);
        assert!(peak - first <= peak / 100.0 + 1e-6);
    }

    #[test]
    fn test_kill_fades_quickly() {
        let mut env = triggered(EnvelopeDescriptor::new(0.0, 0.0, 1.0, 5.0), 48000);
        env.next_gain();
        env.release(ReleaseType::Kill);

        let mut frames = 0;
        while !env.is_idle() {
            env.next_gain();
            frames += 1;
        }
        assert_eq!(frames, 48);
    }

    #[test]
    fn test_reconfigure_mid_stage_bends_remaining_ramp() {
        let mut env = triggered(EnvelopeDescriptor::new(1.0, 0.0, 1.0, 0.0), 1000);
        for _ in 0..500 {
            env.next_gain();
        }
        let before = env.level();

        // 300 frames left to cover the other half
        env.configure(EnvelopeDescriptor::new(0.8, 0.0, 1.0, 0.0).to_envelope_params(1000));
        let after = env.next_gain();
        assert!(after > before);
        assert!((after - before - 0.5 / 300.0).abs() < 1e-4);

        for _ in 0..299 {
            env.next_gain();
        }
        assert_eq!(env.current_stage(), EnvelopeStage::Decay);
        assert_eq!(env.level(), 1.0);
    }

    #[test]
    fn test_reconfigure_shorter_than_elapsed_completes_stage() {
        let mut env = triggered(EnvelopeDescriptor::new(1.0, 1.0, 0.5, 0.0), 1000);
        for _ in 0..500 {
            env.next_gain();
        }

        env.configure(EnvelopeDescriptor::new(0.1, 1.0, 0.5, 0.0).to_envelope_params(1000));
        assert_eq!(env.next_gain(), 1.0);
        assert_eq!(env.current_stage(), EnvelopeStage::Decay);
    }

    #[test]
    fn test_random_envelopes_stay_bounded() {
        let mut rng = rand::thread_rng();
        let sample_rate = 1000;

        for _ in 0..200 {
            let desc = EnvelopeDescriptor::new(
                rng.gen_range(0.0..0.5),
                rng.gen_range(0.0..0.5),
                rng.gen_range(0.0..=1.0),
                rng.gen_range(0.0..0.5),
            );
            let params = desc.to_envelope_params(sample_rate);
            let mut env = EnvelopeGenerator::new(params);
            env.note_on();

            // A linear ramp can't move further per frame than its full span over its length
            let max_step = |stage: EnvelopeStage| match params.get_stage_duration(stage) {
                0 => 1.0,
                d => 1.0 / d as f32 + 1e-5,
            };

            // Zero length stages still take one frame to complete
            let hold_frames = params.get_stage_duration(EnvelopeStage::Attack).max(1)
                + params.get_stage_duration(EnvelopeStage::Decay).max(1)
                + rng.gen_range(0..100);

            let mut last = 0.0f32;
            for _ in 0..hold_frames {
                let stage = env.current_stage();
                let gain = env.next_gain();
                assert!((0.0..=1.0).contains(&gain));
                assert!((gain - last).abs() <= max_step(stage));
                last = gain;
            }

            assert_eq!(env.current_stage(), EnvelopeStage::Sustain);
            assert!((env.level() - desc.sustain).abs() < 1e-5);

            env.note_off();
            while !env.is_idle() {
                let gain = env.next_gain();
                assert!((0.0..=1.0).contains(&gain));
                assert!(gain <= last);
                last = gain;
            }
            assert_eq!(last, 0.0);
        }
    }
}
