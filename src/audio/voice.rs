// One decaying oscillator. The instrument tag picks the waveform, pitch and envelope.

use std::f32::consts::TAU;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Waveform {
    Sine,
    Square,
    Saw,
    Noise,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Tone {
    pub waveform: Waveform,
    pub freq: f32,
    pub decay_secs: f32, // time to fall to roughly -60dB
    pub sweep: f32,      // pitch multiplier reached by the end of the decay, 1.0 = none
}

pub fn tone_for(instrument: &str) -> Tone {
    match instrument {
        "kick" => Tone { waveform: Waveform::Sine, freq: 150.0, decay_secs: 0.35, sweep: 0.3 },
        "snare" => Tone { waveform: Waveform::Noise, freq: 0.0, decay_secs: 0.18, sweep: 1.0 },
        "hihat" | "hat" => Tone { waveform: Waveform::Noise, freq: 0.0, decay_secs: 0.05, sweep: 1.0 },
        "bass" => Tone { waveform: Waveform::Square, freq: 55.0, decay_secs: 0.4, sweep: 1.0 },
        "lead" => Tone { waveform: Waveform::Saw, freq: 440.0, decay_secs: 0.3, sweep: 1.0 },
        other => {
            // anything else gets a sine somewhere in the octave above A3
            let semis = other.bytes().fold(0u32, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u32)) % 12;
            Tone {
                waveform: Waveform::Sine,
                freq: 220.0 * 2.0_f32.powf(semis as f32 / 12.0),
                decay_secs: 0.25,
                sweep: 1.0,
            }
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct Voice {
    waveform: Waveform,
    phase: f32,
    phase_inc: f32,
    sweep: f32, // per-sample multiplier on phase_inc
    amp: f32,
    decay: f32, // per-sample multiplier on amp
    noise: u32,
    pub alive: bool,
}

impl Voice {
    pub const SILENT: Voice = Voice {
        waveform: Waveform::Sine,
        phase: 0.0,
        phase_inc: 0.0,
        sweep: 1.0,
        amp: 0.0,
        decay: 1.0,
        noise: 1,
        alive: false,
    };

    pub fn new(tone: Tone, gain: f32, sample_rate: f32) -> Self {
        let decay_samples = (tone.decay_secs * sample_rate).max(1.0);
        Self {
            waveform: tone.waveform,
            phase: 0.0,
            phase_inc: TAU * tone.freq / sample_rate, // radians per sample
            sweep: tone.sweep.powf(1.0 / decay_samples),
            amp: 0.25 * gain,
            decay: 0.001_f32.powf(1.0 / decay_samples),
            noise: 0x9E37_79B9,
            alive: gain > 0.0,
        }
    }

    pub fn amp(&self) -> f32 {
        self.amp
    }

    pub fn next_sample(&mut self) -> f32 {
        if !self.alive {
            return 0.0;
        }
        let raw = match self.waveform {
            Waveform::Sine => self.phase.sin(),
            Waveform::Square => if self.phase < TAU / 2.0 { 1.0 } else { -1.0 },
            Waveform::Saw => self.phase / TAU * 2.0 - 1.0,
            Waveform::Noise => {
                // xorshift32
                self.noise ^= self.noise << 13;
                self.noise ^= self.noise >> 17;
                self.noise ^= self.noise << 5;
                self.noise as f32 / u32::MAX as f32 * 2.0 - 1.0
            }
        };
        let out = raw * self.amp;

        self.phase += self.phase_inc;
        if self.phase >= TAU {
            self.phase -= TAU;
        }
        self.phase_inc *= self.sweep;
        self.amp *= self.decay;
        if self.amp < 0.0005 {
            self.alive = false;
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_instruments_get_their_own_tone() {
        assert_eq!(tone_for("kick").waveform, Waveform::Sine);
        assert_eq!(tone_for("snare").waveform, Waveform::Noise);
        assert_eq!(tone_for("bass").waveform, Waveform::Square);
        assert_eq!(tone_for("lead").waveform, Waveform::Saw);
    }

    #[test]
    fn unknown_instruments_are_stable_and_in_range() {
        let a = tone_for("cowbell");
        assert_eq!(a, tone_for("cowbell"));
        assert!(a.freq >= 220.0 && a.freq < 440.0);
    }

    #[test]
    fn voice_decays_to_silence() {
        let mut voice = Voice::new(tone_for("hihat"), 1.0, 48_000.0);
        assert!(voice.alive);
        let peak = (0..100).map(|_| voice.next_sample().abs()).fold(0.0, f32::max);
        assert!(peak > 0.0);
        // well past the 50ms decay
        for _ in 0..48_000 {
            voice.next_sample();
        }
        assert!(!voice.alive);
        assert_eq!(voice.next_sample(), 0.0);
    }

    #[test]
    fn zero_gain_voice_is_never_alive() {
        let voice = Voice::new(tone_for("kick"), 0.0, 48_000.0);
        assert!(!voice.alive);
    }
}
