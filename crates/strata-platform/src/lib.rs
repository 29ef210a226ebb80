// SPDX-License-Identifier: CEPL-1.0
//! Windowing for the demo binary. The render crates only see
//! `raw-window-handle` traits, so winit stays behind this crate.
pub use winit;
