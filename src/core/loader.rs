use crate::core::contracts::ISignupHandler;
use crate::core::error_signup::SignupError;
use crate::core::registry::HandlerRegistry;
use std::collections::HashSet;
use std::sync::Arc;

/// Ordered, duplicate-free module names taken from the `MODULES` setting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleList(Vec<String>);

impl ModuleList {
    pub fn parse(raw: Option<&str>) -> Result<Self, SignupError> {
        let Some(raw) = raw.filter(|value| !value.trim().is_empty()) else {
            return Err(SignupError::ModulesNotConfigured);
        };

        let mut seen = HashSet::new();
        let mut names = Vec::new();
        for name in raw.split(',').map(str::trim) {
            if name.is_empty() {
                return Err(SignupError::InvalidModuleList(raw.to_string()));
            }
            if !seen.insert(name) {
                return Err(SignupError::DuplicateModule(name.to_string()));
            }
            names.push(name.to_string());
        }

        Ok(Self(names))
    }

    pub fn names(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Clone)]
pub struct LoadedHandler {
    pub name: String,
    pub handler: Arc<dyn ISignupHandler>,
}

/// Handlers built from a [`ModuleList`], in declaration order. Never changes after load.
#[derive(Clone, Default)]
pub struct ModuleSet {
    units: Vec<LoadedHandler>,
}

impl ModuleSet {
    pub fn iter(&self) -> impl Iterator<Item = &LoadedHandler> {
        self.units.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.units.iter().map(|unit| unit.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

/// Resolves every listed name against `registry` and builds its handler.
///
/// All names are checked before any factory runs, so a missing module fails the
/// load without side effects from the others. A name that more than one handler
/// tried to claim is rejected as well.
pub async fn load(list: &ModuleList, registry: &HandlerRegistry) -> Result<ModuleSet, SignupError> {
    let mut resolved = Vec::with_capacity(list.len());
    for name in list.names() {
        if let Some(types) = registry.conflicting(name) {
            return Err(SignupError::HandlerAlreadyRegistered(
                name.clone(),
                types.join(", "),
            ));
        }
        let registered = registry
            .get(name)
            .ok_or_else(|| SignupError::ModuleNotFound(name.clone()))?;
        resolved.push((name, registered));
    }

    let mut units = Vec::with_capacity(resolved.len());
    for (name, registered) in resolved {
        let handler = (registered.factory)()
            .await
            .map_err(|err| SignupError::HandlerFactoryFailed(name.clone(), err.to_string()))?;

        #[cfg(feature = "logging")]
        log::info!(
            "SignupHook. Loaded module '{}' ({})",
            name,
            registered.type_name
        );

        units.push(LoadedHandler {
            name: name.clone(),
            handler,
        });
    }

    Ok(ModuleSet { units })
}
