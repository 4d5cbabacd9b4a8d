//! # Demo: external_delivery
//!
//! Demonstrates the passive delivery path: a resource that no strategy can
//! produce is handed to the orchestrator by the host once the host's own
//! initialization finishes. No polling loop is involved — the registered
//! chain parks on the key's delivery signal until the instance arrives.
//!
//! ## Flow
//! ```text
//! host task                         Orchestrator::run()
//!   sleep(300ms)                      └─► surface-ready: acquire("surface")
//!   offer("surface", instance) ──►          external-delivery strategy wakes
//!                                           verify → PhaseAdvanced
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example external_delivery
//! ```

use std::sync::Arc;
use std::time::Duration;

use bootvisor::{Config, Orchestrator, PhaseSpec, Resource, ResourceDescriptor, ResourceRef};

struct RenderSurface {
    width: u32,
    height: u32,
}

impl Resource for RenderSurface {
    fn kind(&self) -> &str {
        "surface"
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let mut cfg = Config::default();
    cfg.phases = vec![
        PhaseSpec::new("surface-ready")
            .gated_by("surface")
            .with_deadline(Duration::from_secs(2)),
        PhaseSpec::new("complete"),
    ];
    let orchestrator = Arc::new(Orchestrator::new(cfg));

    // An empty chain: only the appended external-delivery strategy remains,
    // verified like any other candidate.
    orchestrator.register(
        ResourceDescriptor::new("surface", Vec::new())
            .with_verify(|candidate| candidate.kind() == "surface"),
    );

    // The host finishes its own setup and hands the instance over.
    let host = {
        let orchestrator = orchestrator.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(300)).await;
            let surface = RenderSurface {
                width: 1024,
                height: 768,
            };
            println!("[host] surface up at {}x{}", surface.width, surface.height);
            let accepted = orchestrator.offer("surface", Arc::new(surface) as ResourceRef);
            println!("[host] delivered surface, accepted={accepted}");
        })
    };

    let snapshot = orchestrator.run().await;
    host.await.expect("host join");

    let surface = orchestrator
        .get_resource("surface")
        .expect("surface settled");
    println!(
        "[main] phase={} kind={} degraded={}",
        snapshot.phase,
        surface.kind(),
        surface.is_degraded()
    );
}
