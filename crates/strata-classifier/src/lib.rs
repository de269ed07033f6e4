// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Calibrated tier classification for the Strata routing core.
//!
//! `classify` runs on the request hot path; `calibrate` refits the
//! per-tenant temperature out of band so reported confidence stays
//! statistically meaningful.

pub mod calibration;
pub mod classifier;

pub use calibration::DEFAULT_TEMPERATURE;
pub use classifier::CalibratedClassifier;
