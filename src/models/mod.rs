pub mod paper;

pub use paper::Paper;
