use crate::Context;
use crate::cli::IntentArgs;
use crate::config;
use crate::error::Result;
use crate::targets::RepositoryTarget;

pub fn run(ctx: &Context, name: &str, intent: IntentArgs) -> Result<()> {
    let plan = super::plan(intent)?;
    let loaded = config::load(ctx.config.as_deref())?;
    let profile = loaded.config.profile(name)?.clone();

    let target = RepositoryTarget::new(name, profile);
    super::provision(ctx, &plan, &loaded, &target)
}
