//! Runs a plugin list in category order, each stage folding over the
//! previous stage's output (spec §4.5).

use modlink_resolve::Result;

use crate::plugin::Plugin;
use crate::pool::ResourcePool;

/// Runs `plugins`, stably ordered by [`Plugin::category`] (ties keep the
/// caller's declared order), starting from `initial`.
///
/// # Errors
///
/// Returns whatever the first failing plugin's [`Plugin::apply`] returns;
/// no partial image is produced.
pub fn run(plugins: &[Box<dyn Plugin>], initial: ResourcePool) -> Result<ResourcePool> {
    let mut order: Vec<&dyn Plugin> = plugins.iter().map(AsRef::as_ref).collect();
    order.sort_by_key(|p| p.category());

    let mut pool = initial;
    for plugin in order {
        pool.freeze();
        let next = plugin.apply(&pool)?;
        pool = next;
    }
    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::{ExcludeResourcesPlugin, SortResourcesPlugin};
    use crate::pool::Resource;

    #[test]
    fn runs_filter_before_sorter_is_irrelevant_but_category_order_holds() {
        let mut pool = ResourcePool::new();
        pool.add(Resource::new("m", "keep.class", b"".as_slice())).expect("adds");
        pool.add(Resource::new("m", "drop.tmp", b"".as_slice())).expect("adds");

        let plugins: Vec<Box<dyn Plugin>> = vec![
            Box::new(ExcludeResourcesPlugin::new("*.tmp").expect("compiles")),
            Box::new(SortResourcesPlugin::new("/m/keep.class")),
        ];

        let result = run(&plugins, pool).expect("pipeline runs");
        assert!(result.get("/m/keep.class").is_some());
        assert!(result.get("/m/drop.tmp").is_none());
    }

    #[test]
    fn plugin_failure_aborts_the_pipeline() {
        struct Failing;
        impl Plugin for Failing {
            fn name(&self) -> &str {
                "failing"
            }
            fn category(&self) -> crate::plugin::PluginCategory {
                crate::plugin::PluginCategory::Verifier
            }
            fn apply(&self, _input: &ResourcePool) -> Result<ResourcePool> {
                Err(modlink_resolve::Error::PluginError {
                    plugin: "failing".to_string(),
                    cause: "boom".to_string(),
                })
            }
        }

        let plugins: Vec<Box<dyn Plugin>> = vec![Box::new(Failing)];
        let result = run(&plugins, ResourcePool::new());
        assert!(result.is_err());
    }
}
