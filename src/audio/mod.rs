pub mod decode;
pub mod offline;
#[cfg(feature = "playback")]
pub mod output;
pub mod player;
pub mod spectrum;
