pub mod playback;
pub mod export;
