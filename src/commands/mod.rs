pub mod doctor;
pub mod python;
pub mod repo;

use aptkit::backend::apt::AptBackend;
use declarative::{ExecutionPlan, Phase};
use toolchain::{HttpTransport, MakeBuild};

use crate::Context;
use crate::cli::IntentArgs;
use crate::config::LoadedConfig;
use crate::distro::DistroIdentity;
use crate::engine::Orchestrator;
use crate::error::Result;
use crate::host::SystemHost;
use crate::progress::SpinningTransport;
use crate::targets::{Environment, Target};
use crate::ui;

const USER_AGENT: &str = concat!("debrig/", env!("CARGO_PKG_VERSION"));

/// The package backend configured for this host
pub fn apt_backend(loaded: &LoadedConfig) -> AptBackend {
    match loaded.config.apt.lock_timeout {
        Some(seconds) => AptBackend::new().with_lock_timeout(seconds),
        None => AptBackend::new(),
    }
}

/// Run `target` through the plan `intent` resolves to, on the real host
pub fn provision(
    ctx: &Context,
    plan: &ExecutionPlan,
    loaded: &LoadedConfig,
    target: &dyn Target,
) -> Result<()> {
    let config = &loaded.config;
    let mut orchestrator = Orchestrator::new(&SystemHost, ctx.quiet);
    orchestrator.validate(target)?;

    let distro = DistroIdentity::detect(&config.paths.os_release)?;
    log::debug!("Host: {}", distro.display_name());

    let apt = apt_backend(loaded);
    let transport = SpinningTransport::new(HttpTransport::new(USER_AGENT), ctx.quiet);
    let build = MakeBuild;

    let env = Environment {
        apt: &apt,
        transport: &transport,
        build: &build,
        distro: &distro,
        paths: &config.paths,
    };

    if !ctx.quiet {
        ui::info(&format!("{} on {}", target.name(), distro.display_name()));
    }

    let result = orchestrator.execute(plan, target, &env);
    log::debug!("Run stopped in state {}", orchestrator.state());
    let report = result?;

    if report
        .phase(Phase::Install)
        .is_some_and(|install| !install.changed())
    {
        log::info!("{} was already provisioned", report.target);
    }

    if !ctx.quiet {
        report.print();
    }
    Ok(())
}

/// Validate the intent flags before anything else is looked at
pub fn plan(intent: IntentArgs) -> Result<ExecutionPlan> {
    Ok(ExecutionPlan::from_flags(intent.into())?)
}
