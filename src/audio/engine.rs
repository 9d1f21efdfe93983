use crate::audio::voice::{Voice, tone_for};
use crate::audio_api::{AudioCommand, TriggerParams};

const MAX_VOICES: usize = 16; // hard cap so we wont malloc in audio callback

pub struct Engine {
    sample_rate: f32,
    voices: [Voice; MAX_VOICES], // fixed pool of voices
}

impl Engine {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate: sample_rate as f32,
            voices: [Voice::SILENT; MAX_VOICES],
        }
    }

    pub fn handle_cmd(&mut self, cmd: AudioCommand) {
        match cmd {
            AudioCommand::Trigger(t) => self.trigger_voice(t),
            AudioCommand::Silence => {
                for v in &mut self.voices {
                    v.alive = false;
                }
            }
        }
    }

    fn trigger_voice(&mut self, t: TriggerParams) {
        // first free slot, otherwise steal the quietest voice
        let slot = self.voices.iter().position(|v| !v.alive).unwrap_or_else(|| {
            self.voices
                .iter()
                .enumerate()
                .min_by(|(_, a), (_, b)| a.amp().total_cmp(&b.amp()))
                .map_or(0, |(i, _)| i)
        });
        self.voices[slot] = Voice::new(tone_for(&t.instrument), t.gain, self.sample_rate);
    }

    pub fn active_voices(&self) -> usize {
        self.voices.iter().filter(|v| v.alive).count()
    }

    pub fn next_sample(&mut self) -> f32 {
        let out: f32 = self.voices.iter_mut().map(Voice::next_sample).sum();
        out.clamp(-1.0, 1.0)
    }

    // same mono signal on every channel
    pub fn render_interleaved(&mut self, data: &mut [f32], channels: usize) {
        for frame in data.chunks_mut(channels.max(1)) {
            let s = self.next_sample();
            frame.fill(s);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trigger(instrument: &str) -> AudioCommand {
        AudioCommand::Trigger(TriggerParams {
            instrument: instrument.into(),
            gain: 1.0,
        })
    }

    #[test]
    fn idle_engine_renders_silence() {
        let mut engine = Engine::new(48_000);
        let mut buf = [1.0f32; 64];
        engine.render_interleaved(&mut buf, 2);
        assert!(buf.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn trigger_sounds_on_every_channel() {
        let mut engine = Engine::new(48_000);
        engine.handle_cmd(trigger("bass"));
        assert_eq!(engine.active_voices(), 1);

        let mut buf = [0.0f32; 256];
        engine.render_interleaved(&mut buf, 2);
        assert!(buf.iter().any(|&s| s != 0.0));
        assert!(buf.chunks(2).all(|f| f[0] == f[1]));
    }

    #[test]
    fn pool_never_grows_past_the_cap() {
        let mut engine = Engine::new(48_000);
        for _ in 0..40 {
            engine.handle_cmd(trigger("lead"));
        }
        assert_eq!(engine.active_voices(), MAX_VOICES);
    }

    #[test]
    fn silence_cuts_everything() {
        let mut engine = Engine::new(48_000);
        engine.handle_cmd(trigger("kick"));
        engine.handle_cmd(trigger("snare"));
        engine.handle_cmd(AudioCommand::Silence);
        assert_eq!(engine.active_voices(), 0);
    }
}
