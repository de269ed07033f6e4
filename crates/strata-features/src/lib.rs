// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Feature extraction for the Strata routing core.
//!
//! Computes the engineered feature vector (token estimate, schema
//! strictness, domain flags, novelty, failure rate, user tier,
//! complexity) that the classifier, bandit, and policy gates consume.

pub mod extractor;
pub mod signals;

pub use extractor::{FeatureExtractor, content_hash};
