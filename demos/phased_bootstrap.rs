//! # Demo: phased_bootstrap
//!
//! Drives a full bootstrap sequence over three resources with different
//! outcomes:
//! - `library` resolves on its second strategy (the first probe fails);
//! - `surface` resolves instantly;
//! - `widget` never resolves and its phase is promoted on deadline.
//!
//! ## Flow
//! ```text
//! Orchestrator::run()
//!   ├─► environment-ready          (ungated, advances immediately)
//!   ├─► library-ready              gate=library
//!   │     ├─► probe-existing      → Err
//!   │     └─► bundle-extract      → Ok  → PhaseAdvanced
//!   ├─► surface-ready              gate=surface → PhaseAdvanced
//!   ├─► widget-ready               gate=widget
//!   │     └─► deadline elapses    → PhaseForced (forced=true)
//!   └─► complete                   → RunCompleted (forced=true)
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example phased_bootstrap
//! ```

use std::sync::Arc;
use std::time::Duration;

use bootvisor::{
    Config, Orchestrator, PhaseSpec, Resource, ResourceDescriptor, ResourceRef, StrategyError,
    StrategyFn,
};

struct RenderLibrary;

impl Resource for RenderLibrary {
    fn kind(&self) -> &str {
        "library"
    }
}

struct RenderSurface;

impl Resource for RenderSurface {
    fn kind(&self) -> &str {
        "surface"
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // 1. Configure the milestone sequence (deadlines increase across phases)
    let mut cfg = Config::default();
    cfg.phases = vec![
        PhaseSpec::new("environment-ready"),
        PhaseSpec::new("library-ready")
            .gated_by("library")
            .with_deadline(Duration::from_secs(1))
            .announce_on("libraryReady"),
        PhaseSpec::new("surface-ready")
            .gated_by("surface")
            .with_deadline(Duration::from_secs(2)),
        PhaseSpec::new("widget-ready")
            .gated_by("widget")
            .with_deadline(Duration::from_millis(500)),
        PhaseSpec::new("complete"),
    ];

    let orchestrator = Orchestrator::new(cfg);

    // 2. Library: cheap probe first, extraction as the fallback
    orchestrator.register(ResourceDescriptor::new(
        "library",
        vec![
            StrategyFn::arc("probe-existing", || async {
                println!("[library] probe-existing: nothing present");
                Err(StrategyError::failed("not loaded yet"))
            }),
            StrategyFn::arc("bundle-extract", || async {
                println!("[library] bundle-extract: found it");
                Ok(Arc::new(RenderLibrary) as ResourceRef)
            }),
        ],
    ));

    // 3. Surface: present from the start
    orchestrator.register(ResourceDescriptor::new(
        "surface",
        vec![StrategyFn::arc("probe-existing", || async {
            Ok(Arc::new(RenderSurface) as ResourceRef)
        })],
    ));

    // 4. Widget: no strategy ever succeeds; the phase deadline will promote it
    orchestrator.register(
        ResourceDescriptor::new(
            "widget",
            vec![StrategyFn::arc("probe-existing", || async {
                std::future::pending::<Result<ResourceRef, StrategyError>>().await
            })],
        )
        .with_timeout(Duration::from_secs(10)),
    );

    // 5. One-shot notifications
    orchestrator.on_phase("library-ready", |payload| {
        println!("[main] library-ready via {:?}", payload.source);
    });
    orchestrator.on_complete(|payload| {
        println!("[main] complete, forced={}", payload.forced);
    });

    // 6. Drive the sequence and inspect the outcome
    let snapshot = orchestrator.run().await;

    println!("\nsnapshot: phase={}", snapshot.phase);
    println!("degraded: {:?}", snapshot.degraded_resources);
    println!("attempts: {:?}", snapshot.attempt_counts);
    for record in orchestrator.phase_records() {
        println!(
            "  {:<18} {:<7} forced={}",
            record.name,
            record.status.as_label(),
            record.forced
        );
    }
}
