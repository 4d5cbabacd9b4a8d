//! # Resource abstraction and the acquisition result.
//!
//! A [`Resource`] is an opaque runtime object other parts of the system
//! depend on (a rendering-library namespace, a rendering surface, an
//! application widget) that is not known to exist until some asynchronous
//! acquisition completes. The common handle type is [`ResourceRef`], an
//! `Arc<dyn Resource>` suitable for sharing across the runtime.
//!
//! [`Acquired`] wraps a resolved resource together with the name of the
//! strategy that produced it and the degraded marker, so any consumer can
//! disable optional behavior instead of crashing.
//!
//! ## Rules
//! - Consumers never receive null: when every genuine acquisition path fails,
//!   they receive a [`StubResource`] (or a descriptor-supplied substitute)
//!   with `is_degraded() == true`.
//! - Once cached by the registry, the instance reference behind an
//!   [`Acquired`] never changes for the rest of the epoch.

use std::sync::Arc;

/// Source tag carried by results synthesized from a degraded stub.
pub const DEGRADED_SOURCE: &str = "degraded-stub";

/// # An opaque runtime dependency.
///
/// Implementors wrap whatever object the host system needs (a library
/// namespace handle, a surface, a widget facade). The orchestrator treats it
/// as opaque; it only reads the `kind` for diagnostics and the degraded
/// marker.
///
/// # Example
/// ```
/// use bootvisor::Resource;
///
/// struct RenderLibrary {
///     version: &'static str,
/// }
///
/// impl Resource for RenderLibrary {
///     fn kind(&self) -> &str {
///         "render-library"
///     }
/// }
///
/// let lib = RenderLibrary { version: "5.3.0" };
/// assert!(!lib.is_degraded());
/// # let _ = lib.version;
/// ```
pub trait Resource: Send + Sync + 'static {
    /// Returns a stable, human-readable kind label.
    fn kind(&self) -> &str;

    /// True for minimal-capability substitutes lacking real functionality.
    fn is_degraded(&self) -> bool {
        false
    }
}

/// Shared handle to a resource instance.
pub type ResourceRef = Arc<dyn Resource>;

/// A resolved resource tagged with its provenance.
///
/// Cheap to clone; all callers that join the same in-flight creation receive
/// clones pointing at the identical instance.
#[derive(Clone)]
pub struct Acquired {
    resource: ResourceRef,
    source: Arc<str>,
    degraded: bool,
}

impl Acquired {
    /// Wraps a genuinely acquired instance, tagged with the strategy name
    /// that produced it.
    pub fn genuine(resource: ResourceRef, source: impl Into<Arc<str>>) -> Self {
        Self {
            resource,
            source: source.into(),
            degraded: false,
        }
    }

    /// Wraps a minimal-capability substitute.
    pub fn degraded(resource: ResourceRef) -> Self {
        Self {
            resource,
            source: Arc::from(DEGRADED_SOURCE),
            degraded: true,
        }
    }

    /// The resolved instance.
    pub fn resource(&self) -> &ResourceRef {
        &self.resource
    }

    /// Name of the strategy that produced the instance, or
    /// [`DEGRADED_SOURCE`].
    pub fn source(&self) -> &str {
        &self.source
    }

    /// True when the instance is a degraded stand-in.
    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    /// True when `other` holds the identical instance.
    pub fn same_instance(&self, other: &Acquired) -> bool {
        Arc::ptr_eq(&self.resource, &other.resource)
    }
}

impl std::fmt::Debug for Acquired {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Acquired")
            .field("kind", &self.resource.kind())
            .field("source", &self.source)
            .field("degraded", &self.degraded)
            .finish()
    }
}

/// Minimal-capability substitute satisfying only the [`Resource`] contract.
///
/// Used as the default degraded fallback when a descriptor does not supply
/// its own stub factory.
pub struct StubResource {
    kind: Arc<str>,
}

impl StubResource {
    /// Creates a stub for the given kind as a shared handle.
    pub fn arc(kind: impl Into<Arc<str>>) -> ResourceRef {
        Arc::new(Self { kind: kind.into() })
    }
}

impl Resource for StubResource {
    fn kind(&self) -> &str {
        &self.kind
    }

    fn is_degraded(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stub_carries_degraded_marker() {
        let stub = StubResource::arc("library");
        assert!(stub.is_degraded());
        assert_eq!(stub.kind(), "library");
    }

    #[test]
    fn acquired_clones_share_identity() {
        let acquired = Acquired::genuine(StubResource::arc("x"), "probe");
        let clone = acquired.clone();
        assert!(acquired.same_instance(&clone));
        assert_eq!(clone.source(), "probe");
    }

    #[test]
    fn degraded_wrapper_uses_stub_source() {
        let acquired = Acquired::degraded(StubResource::arc("widget"));
        assert!(acquired.is_degraded());
        assert_eq!(acquired.source(), DEGRADED_SOURCE);
    }
}
