//! drumfill-services: voice synthesis, scheduling, audio output and offline rendering

pub mod audio_io;
pub mod clock;
pub mod engine;
pub mod mixer;
pub mod player;
pub mod render;
pub mod scheduler;
pub mod voice;

pub use audio_io::{AudioOutputError, RealtimeOutputStream};
pub use clock::{AudioClock, VirtualClock};
pub use engine::{AudioEngine, AudioEngineError, EngineClock, EngineState};
pub use mixer::VoiceMixer;
pub use player::{drive, Player, PlayerError, RING_OUT};
pub use render::{write_wav, OfflineRenderer, RenderError};
pub use scheduler::{
    Hit, HitSink, PlaybackContext, PlaybackScheduler, PlaybackState, SchedulerConfig, SynthSink,
};
pub use voice::{Voice, VoiceSink, VoiceSynthesizer};
