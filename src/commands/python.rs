use anyhow::Context as _;

use crate::Context;
use crate::cli::IntentArgs;
use crate::config;
use crate::error::Result;
use crate::targets::InterpreterTarget;

pub fn run(ctx: &Context, release: Option<&str>, intent: IntentArgs) -> Result<()> {
    let plan = super::plan(intent)?;
    let mut loaded = config::load(ctx.config.as_deref())?;

    if let Some(release) = release {
        loaded.config.python.version = release.to_string();
        loaded
            .config
            .python
            .validate()
            .with_context(|| format!("Invalid --release {release}"))?;
    }

    let target = InterpreterTarget::new(loaded.config.python.clone());
    super::provision(ctx, &plan, &loaded, &target)
}
