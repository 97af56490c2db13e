//! Backend selection.
//!
//! The selector is a pure function of the caller's [`BackendRequest`], where
//! the scores reside, and the probed [`Capabilities`]:
//!
//! | request                      | kernel available          | kernel unavailable        |
//! |------------------------------|---------------------------|---------------------------|
//! | `Auto`, accelerator tensor   | native (`Residency`)      | portable (`Unsupported`)  |
//! | `Auto`, host tensor          | portable (`HostResident`) | portable (`HostResident`) |
//! | `Portable`                   | portable (`Override`)     | portable (`Override`)     |
//! | `Native { fallback: false }` | native (`Requested`)      | `BackendUnavailable`      |
//! | `Native { fallback: true }`  | native (`Requested`)      | portable (`Fallback`)     |
//!
//! The kernel counts as available only when the build includes it, whatever
//! the capabilities claim. Both backends produce identical paths, so `Auto`
//! may choose freely.

use crate::backends::Backend;
use crate::error::{DecodeError, Result};
use crate::probe::{Availability, Capabilities};
use crate::tensor::Device;
use std::fmt;

/// The two execution paths.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BackendKind {
    /// Dense, broadcast-vectorised implementation.
    Portable,
    /// Fused kernel over the compact score vector.
    Native,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Portable => write!(f, "portable"),
            BackendKind::Native => write!(f, "native"),
        }
    }
}

/// What the caller asks for.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BackendRequest {
    /// Native for accelerator-resident scores when the kernel is available,
    /// portable otherwise.
    #[default]
    Auto,
    /// Always portable, even when the native kernel could run.
    Portable,
    /// The native kernel. Without it, fail unless `fallback` is set, in which
    /// case run portable.
    Native { fallback: bool },
}

/// Why a backend was chosen.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Reason {
    /// The caller forced the portable path.
    Override,
    /// Accelerator-resident scores and an available kernel.
    Residency,
    /// Host-resident scores under `Auto`.
    HostResident,
    /// Accelerator-resident scores but no kernel under `Auto`.
    Unsupported,
    /// The caller asked for the native kernel and it is available.
    Requested,
    /// The caller asked for the native kernel, allowed fallback, and the
    /// kernel is unavailable.
    Fallback,
}

/// Outcome of selection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Decision {
    pub backend: BackendKind,
    pub reason: Reason,
}

/// Decide which backend runs a call.
pub fn route(request: BackendRequest, device: Device, caps: &Capabilities) -> Result<Decision> {
    let decision = |backend, reason| Decision { backend, reason };
    let native = caps.usable_native_kernel();
    match request {
        BackendRequest::Portable => Ok(decision(BackendKind::Portable, Reason::Override)),
        BackendRequest::Auto if !device.is_accelerator() => {
            Ok(decision(BackendKind::Portable, Reason::HostResident))
        }
        BackendRequest::Auto if native.is_available() => {
            Ok(decision(BackendKind::Native, Reason::Residency))
        }
        BackendRequest::Auto => Ok(decision(BackendKind::Portable, Reason::Unsupported)),
        BackendRequest::Native { fallback } => match native {
            Availability::Available => Ok(decision(BackendKind::Native, Reason::Requested)),
            Availability::Unavailable(_) if fallback => {
                Ok(decision(BackendKind::Portable, Reason::Fallback))
            }
            Availability::Unavailable(why) => Err(DecodeError::BackendUnavailable {
                backend: BackendKind::Native,
                device,
                reason: why,
            }),
        },
    }
}

/// Factory that turns a request into an owned backend.
#[derive(Clone, Debug)]
pub struct BackendSelector {
    capabilities: Capabilities,
}

impl BackendSelector {
    pub fn new(capabilities: Capabilities) -> Self {
        Self { capabilities }
    }

    /// Selector over the process-wide probe result.
    pub fn global() -> Self {
        Self::new(Capabilities::global().clone())
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    /// Choose and instantiate the backend for a call.
    pub fn select(&self, request: BackendRequest, device: Device) -> Result<(Backend, Decision)> {
        let decision = route(request, device, &self.capabilities)?;
        #[cfg(feature = "tracing")]
        match decision.reason {
            Reason::Fallback => tracing::warn!(
                %device,
                "native kernel unavailable, falling back to portable backend"
            ),
            _ => tracing::debug!(
                backend = %decision.backend,
                reason = ?decision.reason,
                %device,
                "selected decoder backend"
            ),
        }
        let backend = Backend::instantiate(decision.backend, device)?;
        Ok((backend, decision))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ACCEL: Device = Device::Accelerator(0);

    #[cfg(feature = "native-kernel")]
    #[test]
    fn auto_follows_residency() {
        let caps = Capabilities::with_native_kernel();
        let d = route(BackendRequest::Auto, ACCEL, &caps).unwrap();
        assert_eq!(
            d,
            Decision {
                backend: BackendKind::Native,
                reason: Reason::Residency
            }
        );
        let d = route(BackendRequest::Auto, Device::Host, &caps).unwrap();
        assert_eq!(d.backend, BackendKind::Portable);
        assert_eq!(d.reason, Reason::HostResident);
    }

    #[test]
    fn auto_without_kernel_is_silent_portable() {
        let caps = Capabilities::portable_only();
        let d = route(BackendRequest::Auto, ACCEL, &caps).unwrap();
        assert_eq!(d.backend, BackendKind::Portable);
        assert_eq!(d.reason, Reason::Unsupported);
    }

    #[test]
    fn override_forces_portable() {
        let caps = Capabilities::with_native_kernel();
        let d = route(BackendRequest::Portable, ACCEL, &caps).unwrap();
        assert_eq!(
            d,
            Decision {
                backend: BackendKind::Portable,
                reason: Reason::Override
            }
        );
    }

    #[cfg(feature = "native-kernel")]
    #[test]
    fn explicit_native_runs_on_host_too() {
        let caps = Capabilities::with_native_kernel();
        let request = BackendRequest::Native { fallback: false };
        let d = route(request, Device::Host, &caps).unwrap();
        assert_eq!(d.backend, BackendKind::Native);
        assert_eq!(d.reason, Reason::Requested);
    }

    #[test]
    fn explicit_native_without_kernel_fails() {
        let caps = Capabilities::portable_only();
        let err = route(BackendRequest::Native { fallback: false }, ACCEL, &caps).unwrap_err();
        assert_eq!(
            err,
            DecodeError::BackendUnavailable {
                backend: BackendKind::Native,
                device: ACCEL,
                reason: "disabled by configuration".into(),
            }
        );
    }

    #[test]
    fn explicit_native_with_fallback_degrades() {
        let caps = Capabilities::portable_only();
        let d = route(BackendRequest::Native { fallback: true }, ACCEL, &caps).unwrap();
        assert_eq!(
            d,
            Decision {
                backend: BackendKind::Portable,
                reason: Reason::Fallback
            }
        );
    }

    #[test]
    fn selector_instantiates_chosen_backend() {
        use crate::traits::Decoder;
        let selector = BackendSelector::new(Capabilities::portable_only());
        let (backend, decision) = selector.select(BackendRequest::Auto, ACCEL).unwrap();
        assert_eq!(backend.kind(), decision.backend);
        assert!(selector
            .select(BackendRequest::Native { fallback: false }, ACCEL)
            .is_err());
    }

    #[cfg(not(feature = "native-kernel"))]
    #[test]
    fn claimed_kernel_is_ignored_when_compiled_out() {
        let caps = Capabilities::with_native_kernel();
        let d = route(BackendRequest::Auto, ACCEL, &caps).unwrap();
        assert_eq!(d.reason, Reason::Unsupported);
        let d = route(BackendRequest::Native { fallback: true }, ACCEL, &caps).unwrap();
        assert_eq!(d.reason, Reason::Fallback);
    }
}
