pub mod translation_flow;

pub use translation_flow::{RetryPolicy, RetryState, TranslationFlow};
