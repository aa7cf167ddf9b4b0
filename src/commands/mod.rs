pub mod apply;
pub mod kinds;
pub mod validate;

use anyhow::Result;

use crate::Context;
use crate::catalog::Catalog;
use crate::config::Config;
use crate::manifest::{Manifest, Planned};
use crate::paths;

/// Everything a manifest command works from
pub struct Loaded {
    pub config: Config,
    pub catalog: Catalog,
    pub planned: Planned,
}

/// Load config, the kind catalog and a manifest, and plan it
///
/// Planning problems are left in `planned.problems` for the caller.
pub fn load(ctx: &Context, manifest_path: &str) -> Result<Loaded> {
    let config = Config::load(ctx.config_path.as_deref())?;
    config.validate()?;
    let catalog = config.catalog();

    let path = paths::expand(manifest_path);
    let manifest = Manifest::load(&path)?;
    log::info!(
        "Loaded {} resource(s) from {}",
        manifest.resources.len(),
        path.display()
    );

    let planned = manifest.plan(&catalog, &config.defaults);
    Ok(Loaded {
        config,
        catalog,
        planned,
    })
}
