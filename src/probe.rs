//! Runtime capability probing.
//!
//! The probe runs once per process ([`Capabilities::global`]) and its result
//! is handed to the backend selector as configuration. Tests and embedders
//! can construct [`Capabilities`] by hand instead.
//!
//! The native kernel is available when the crate was built with the
//! `native-kernel` feature and `FLIPFLOP_NATIVE_KERNEL` is not set to
//! `0`, `off`, `false` or `no`.

use once_cell::sync::OnceCell;
use std::env;

/// Environment variable that can switch the native kernel off at runtime.
pub const NATIVE_KERNEL_ENV: &str = "FLIPFLOP_NATIVE_KERNEL";

pub(crate) const COMPILED_OUT: &str = "built without the `native-kernel` feature";

static GLOBAL: OnceCell<Capabilities> = OnceCell::new();

/// Whether an optional execution path can run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Availability {
    Available,
    /// Unavailable, with a human-readable cause.
    Unavailable(String),
}

impl Availability {
    #[inline]
    pub fn is_available(&self) -> bool {
        matches!(self, Availability::Available)
    }
}

/// What this process can execute.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Capabilities {
    /// The fused native kernel.
    pub native_kernel: Availability,
    /// Threads available to data-parallel work.
    pub worker_threads: usize,
}

impl Capabilities {
    /// Probe the running process.
    pub fn probe() -> Self {
        let env_value = env::var(NATIVE_KERNEL_ENV).ok();
        Self {
            native_kernel: native_kernel_availability(env_value.as_deref()),
            worker_threads: worker_threads(),
        }
    }

    /// Probe result cached for the lifetime of the process.
    pub fn global() -> &'static Self {
        GLOBAL.get_or_init(|| {
            let caps = Self::probe();
            #[cfg(feature = "tracing")]
            tracing::debug!(
                native_kernel = caps.native_kernel.is_available(),
                worker_threads = caps.worker_threads,
                "probed decoder capabilities"
            );
            caps
        })
    }

    /// Capabilities with only the portable path.
    pub fn portable_only() -> Self {
        Self {
            native_kernel: Availability::Unavailable("disabled by configuration".into()),
            worker_threads: worker_threads(),
        }
    }

    /// Capabilities with the native kernel marked available.
    pub fn with_native_kernel() -> Self {
        Self {
            native_kernel: Availability::Available,
            worker_threads: worker_threads(),
        }
    }

    /// Native kernel availability as far as this build can honour it.
    ///
    /// Hand-built capabilities may claim the kernel; without the
    /// `native-kernel` feature it is unavailable regardless.
    pub fn usable_native_kernel(&self) -> Availability {
        if cfg!(feature = "native-kernel") {
            self.native_kernel.clone()
        } else {
            Availability::Unavailable(COMPILED_OUT.into())
        }
    }
}

fn native_kernel_availability(env_value: Option<&str>) -> Availability {
    if !cfg!(feature = "native-kernel") {
        return Availability::Unavailable(COMPILED_OUT.into());
    }
    match env_value.map(|v| v.trim().to_ascii_lowercase()) {
        Some(v) if matches!(v.as_str(), "0" | "off" | "false" | "no") => {
            Availability::Unavailable(format!("disabled by {NATIVE_KERNEL_ENV}={v}"))
        }
        _ => Availability::Available,
    }
}

fn worker_threads() -> usize {
    #[cfg(feature = "parallel")]
    {
        rayon::current_num_threads()
    }
    #[cfg(not(feature = "parallel"))]
    {
        1
    }
}
