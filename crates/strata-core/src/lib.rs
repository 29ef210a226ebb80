// SPDX-License-Identifier: CEPL-1.0
#![deny(unsafe_op_in_unsafe_fn)]

/// Default filter when `RUST_LOG` is unset: our crates at info, the rest at warn.
pub const DEFAULT_FILTER: &str = "warn,strata_app=info,strata_render=info,strata_render_vk=info";

pub fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .try_init();
}
