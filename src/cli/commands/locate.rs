//! Locate command - throw an eye of ender in the sample world

use crate::cli::args::LocateArgs;
use crate::config::Config;
use crate::demo::{DemoEye, DemoLevel, EyeState, RingSearch};
use crate::error::{LocatorError, LocatorResult};
use crate::executor::{AsyncExecutor, HomeExecutor};
use crate::locate::AsyncLocator;
use crate::task::{TaskRegistry, TaskState};
use crate::ui::{self, UiContext};
use crate::world::BlockPos;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::runtime::Handle;
use tracing::debug;

/// Owner token for the single eye this command throws
const EYE_TOKEN: &str = "eye-0";

/// How often the command checks whether the eye's locate finished
const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Result printed by the locate command
#[derive(Debug, Serialize)]
pub struct LocateReport {
    pub origin: BlockPos,
    pub targets: String,
    pub radius: u32,
    pub timeout_secs: Option<u64>,
    pub outcome: TaskState,
    pub eye: EyeState,
    pub elapsed_ms: u128,
}

/// Execute the locate command
pub async fn execute(args: LocateArgs, config: &Config) -> LocatorResult<()> {
    let report = run_locate(&args, config).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&UiContext::detect(), &report);
    }

    Ok(())
}

/// Throw one eye and wait until its outcome has been applied
pub async fn run_locate(args: &LocateArgs, config: &Config) -> LocatorResult<LocateReport> {
    let level = Arc::new(DemoLevel::sample().with_broken_registry(args.broken_registry));
    let executor = AsyncExecutor::from_handle(
        Handle::current(),
        config.executor.resolved_worker_threads(),
    );
    let (home, home_thread) = HomeExecutor::spawn("locator-home")?;
    let search = RingSearch::new(Duration::from_millis(args.delay_ms));
    let locator = AsyncLocator::new(&executor, search, home, config);
    let registry = Arc::new(TaskRegistry::new(config.locate.overlap_policy));

    let mut request = locator
        .request(args.origin())
        .skip_existing_chunks(args.skip_existing || config.locate.skip_existing_chunks);
    if let Some(radius) = args.radius {
        request = request.radius(radius);
    }
    if let Some(secs) = args.timeout {
        request = request.timeout((secs > 0).then(|| Duration::from_secs(secs)));
    }

    let targets = args.targets();
    let described = targets.describe();
    let eye = DemoEye::new();
    if args.remove_eye {
        eye.remove();
    }

    let started = Instant::now();
    let canceller = locator.locate_for(
        &registry,
        EYE_TOKEN,
        &level,
        targets,
        &request,
        eye.clone(),
    )?;
    debug!(task = %canceller.id(), "Eye thrown");

    while registry.is_ongoing(&EYE_TOKEN) {
        tokio::time::sleep(POLL_INTERVAL).await;
    }
    let elapsed = started.elapsed();

    // The home thread exits once the last handle is gone
    drop(locator);
    tokio::task::spawn_blocking(move || home_thread.join())
        .await
        .map_err(|e| LocatorError::Internal(format!("joining home thread: {}", e)))?
        .map_err(|_| LocatorError::Internal("home thread panicked".to_string()))?;

    Ok(LocateReport {
        origin: request.origin,
        targets: described,
        radius: request.radius,
        timeout_secs: request.timeout.map(|t| t.as_secs()),
        outcome: canceller.state(),
        eye: eye.state(),
        elapsed_ms: elapsed.as_millis(),
    })
}

fn print_report(ctx: &UiContext, report: &LocateReport) {
    ui::section(ctx, "Eye of ender");
    ui::key_value(ctx, "origin", &report.origin.to_string());
    ui::key_value(ctx, "searching", &report.targets);
    ui::key_value(ctx, "radius", &format!("{} chunks", report.radius));

    let eye = &report.eye;
    match report.outcome {
        TaskState::Succeeded if eye.signalled_to.is_some() => {
            let position = eye.signalled_to.map(|p| p.to_string()).unwrap_or_default();
            let target = eye.target.as_deref().unwrap_or("structure");
            ui::step_ok_detail(ctx, &format!("Eye flies towards {}", target), &position);
        }
        TaskState::Succeeded if !eye.alive => {
            ui::step_warn(ctx, "Location found but the eye was already gone")
        }
        TaskState::Succeeded => ui::step_error(ctx, "Location found but the eye could not move"),
        TaskState::EmptyResult => ui::step_warn(ctx, "Nothing found, the eye shatters"),
        TaskState::TimedOut => ui::step_warn_hint(
            ctx,
            "Search timed out, the eye drops to the ground",
            "Raise --timeout or lower --radius",
        ),
        TaskState::Failed => ui::step_error_detail(
            ctx,
            "Search failed",
            eye.failure.as_deref().unwrap_or("unknown error"),
        ),
        TaskState::Cancelled | TaskState::Pending => ui::step_info(ctx, "Locate cancelled"),
    }

    ui::remark(ctx, &format!("took {} ms", report.elapsed_ms));
}
