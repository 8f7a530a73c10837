//! Serializers for finished module trees.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use arcstr::ArcStr;

use crate::error::Result;
use crate::module::Module;

pub mod gds;
pub mod lef;
pub mod spice;

/// Every module reachable from `top`, each exactly once, children before
/// their parents. Siblings keep instantiation order.
pub(crate) fn post_order<F>(top: &Arc<Module>, children: F) -> Vec<Arc<Module>>
where
    F: Fn(&Module) -> Vec<Arc<Module>>,
{
    fn visit<F>(
        module: &Arc<Module>,
        children: &F,
        seen: &mut HashSet<ArcStr>,
        out: &mut Vec<Arc<Module>>,
    ) where
        F: Fn(&Module) -> Vec<Arc<Module>>,
    {
        if !seen.insert(module.name().clone()) {
            return;
        }
        for child in children(module) {
            visit(&child, children, seen, out);
        }
        out.push(module.clone());
    }

    let mut seen = HashSet::new();
    let mut out = Vec::new();
    visit(top, &children, &mut seen, &mut out);
    out
}

pub(crate) fn create_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}
