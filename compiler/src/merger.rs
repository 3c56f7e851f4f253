use tracing::debug;

use crate::{ast::Module, error::Result};

/// Combines parsed modules into one.
///
/// Reservations are merged first, then aliases, then the remaining
/// top-level declarations. Names share one scope across every category and
/// every module, so the first collision aborts the merge, named after the
/// kind of the declaration that arrived second.
pub fn merge_modules(modules: Vec<Module>) -> Result<Module> {
    debug!(modules = modules.len(), "merging modules");
    let mut merged = Module::new();

    for module in &modules {
        merged.reserve(module.reservations.ranges().iter().copied())?;
    }

    for module in &modules {
        for alias in module.aliases.values() {
            merged.add_alias(alias.clone())?;
        }
    }

    for module in modules {
        for (_, variable) in module.variables {
            merged.add_variable(variable)?;
        }
        for (_, model) in module.models {
            merged.add_object(model)?;
        }
        for (_, message) in module.messages {
            merged.add_object(message)?;
        }
        for (_, enum_decl) in module.enums {
            merged.add_enum(enum_decl)?;
        }
        for (_, resource) in module.resources {
            merged.add_resource(resource)?;
        }
        for (_, service) in module.services {
            merged.add_service(service)?;
        }
    }

    debug!(
        models = merged.models.len(),
        messages = merged.messages.len(),
        reservations = merged.reservations.len(),
        "merged modules"
    );
    Ok(merged)
}
