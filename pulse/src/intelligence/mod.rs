mod classifier;
pub mod fallback;
mod primary;

pub use classifier::{
    placeholder, Classification, ClassificationPath, ClassificationState, Route,
    SentimentClassifier,
};
pub use fallback::KeywordClassifier;
pub use primary::{LlmClassifier, PrimaryClassifier};
