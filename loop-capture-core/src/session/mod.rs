pub mod capture;
pub mod pipeline;
pub mod playback;
