//! Capability registry.
//!
//! Keeps registered providers keyed by class name together with the catalog
//! derived from their method documentation. The catalog keeps registration
//! order; re-registering a class name replaces its entry in place.

use std::collections::HashMap;
use std::sync::Arc;

use crate::docstring::parse_docstring;
use crate::provider::Capability;
use crate::types::{Catalog, ClassDescriptor, ClassSummary, ListedMethod, MethodDescriptor};

/// Registry of capability providers and their catalog.
#[derive(Default)]
pub struct CapabilityRegistry {
    providers: HashMap<String, Arc<dyn Capability>>,
    classes: Vec<ClassDescriptor>,
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider under `alias`, or under its type name.
    pub fn register<C>(&mut self, provider: C, alias: Option<&str>) -> &ClassDescriptor
    where
        C: Capability + 'static,
    {
        self.register_shared(Arc::new(provider), alias)
    }

    /// Register an already shared provider.
    ///
    /// A class name that is already registered is replaced entirely, methods
    /// included. The same provider instance registered under a new name is
    /// moved, so each instance maps to exactly one class name.
    pub fn register_shared(
        &mut self,
        provider: Arc<dyn Capability>,
        alias: Option<&str>,
    ) -> &ClassDescriptor {
        let class_name = alias
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .map(String::from)
            .unwrap_or_else(|| provider.type_name().into_owned());

        let moved: Vec<String> = self
            .providers
            .iter()
            .filter(|(name, existing)| **name != class_name && same_instance(existing, &provider))
            .map(|(name, _)| name.clone())
            .collect();
        for name in moved {
            tracing::debug!(
                from = %name,
                to = %class_name,
                "Provider re-registered under new name"
            );
            self.unregister(&name);
        }

        let descriptor = describe(provider.as_ref(), &class_name);
        tracing::debug!(
            class = %class_name,
            methods = descriptor.methods.len(),
            "Registered capability"
        );

        self.providers.insert(class_name.clone(), provider);
        let index = match self.classes.iter().position(|c| c.class_name == class_name) {
            Some(index) => {
                self.classes[index] = descriptor;
                index
            }
            None => {
                self.classes.push(descriptor);
                self.classes.len() - 1
            }
        };
        &self.classes[index]
    }

    /// Remove a class and its catalog entry.
    pub fn unregister(&mut self, class_name: &str) -> bool {
        let removed = self.providers.remove(class_name).is_some();
        self.classes.retain(|c| c.class_name != class_name);
        removed
    }

    /// Get a provider by class name.
    pub fn get(&self, class_name: &str) -> Option<Arc<dyn Capability>> {
        self.providers.get(class_name).cloned()
    }

    pub fn contains(&self, class_name: &str) -> bool {
        self.providers.contains_key(class_name)
    }

    /// Registered class names in registration order.
    pub fn class_names(&self) -> impl Iterator<Item = &str> {
        self.classes.iter().map(|c| c.class_name.as_str())
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Snapshot of the catalog.
    pub fn catalog(&self) -> Catalog {
        Catalog {
            classes: self.classes.clone(),
        }
    }

    /// Class names with their descriptions.
    pub fn list_classes(&self) -> Vec<ClassSummary> {
        self.classes
            .iter()
            .map(|c| ClassSummary {
                class_name: c.class_name.clone(),
                class_description: c.class_description.clone(),
            })
            .collect()
    }

    /// Every catalogued method, flattened, with its class name attached.
    pub fn list_methods(&self) -> Vec<ListedMethod> {
        self.classes
            .iter()
            .flat_map(|class| {
                class.methods.iter().map(move |m| ListedMethod {
                    class: class.class_name.clone(),
                    method: m.method.clone(),
                    description: m.description.clone(),
                    inputs: m.inputs.clone(),
                    output: m.output.clone(),
                })
            })
            .collect()
    }

    /// Look up a method descriptor by its `ClassName.method_name` identifier.
    ///
    /// Method names never contain a dot, so the class name is everything
    /// before the last one.
    pub fn method_doc(&self, qualified_name: &str) -> Option<&MethodDescriptor> {
        let (class_name, method) = qualified_name.rsplit_once('.')?;
        self.classes
            .iter()
            .find(|c| c.class_name == class_name)?
            .get_method(method)
    }
}

impl std::fmt::Debug for CapabilityRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapabilityRegistry")
            .field("classes", &self.class_names().collect::<Vec<_>>())
            .finish()
    }
}

/// Build the catalog entry for a provider.
///
/// Internal methods (leading underscore) and methods without documentation
/// are left out; they stay invokable through the provider itself.
pub fn describe(provider: &dyn Capability, class_name: &str) -> ClassDescriptor {
    let methods = provider
        .methods()
        .into_iter()
        .filter(|m| !m.is_internal())
        .filter_map(|m| {
            let doc = m.doc_text()?.to_string();
            let parsed = parse_docstring(&doc);
            Some(MethodDescriptor {
                method: m.name,
                description: parsed.description,
                inputs: parsed.inputs,
                output: parsed.output,
                raw_doc: doc,
            })
        })
        .collect();

    ClassDescriptor {
        class_name: class_name.to_string(),
        class_description: provider.description().trim().to_string(),
        methods,
    }
}

fn same_instance(a: &Arc<dyn Capability>, b: &Arc<dyn Capability>) -> bool {
    // Compare data pointers only; vtable pointers may differ across codegen units.
    std::ptr::eq(
        Arc::as_ptr(a) as *const (),
        Arc::as_ptr(b) as *const (),
    )
}
