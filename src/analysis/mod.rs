// Analysis module - acoustic feature extraction
//
// Turns decoded clips into the fixed-width vectors the emotion forest is
// trained and queried on.

pub mod features;

pub use features::{FeatureVector, MfccExtractor, MFCC_COEFFICIENTS};
