use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::model::LanguageModel;
use crate::prompt::{Executor, PromptConfig, PromptDefinition, PromptKey};
use crate::template::{SimpleRenderer, TemplateRenderer};
use crate::{DittoError, Result};

/// Resolves `provider/model_id` names to model handles.
///
/// Unknown names are [`DittoError::Resolution`].
pub trait ModelRegistry: Send + Sync {
    fn resolve_model(&self, name: &str) -> Result<Arc<dyn LanguageModel>>;
}

fn not_registered(name: &str) -> DittoError {
    DittoError::Resolution(format!("model {name:?} is not registered"))
}

impl<S: std::hash::BuildHasher + Send + Sync> ModelRegistry
    for std::collections::HashMap<String, Arc<dyn LanguageModel>, S>
{
    fn resolve_model(&self, name: &str) -> Result<Arc<dyn LanguageModel>> {
        self.get(name).cloned().ok_or_else(|| not_registered(name))
    }
}

/// Process-local home of models and prompt definitions.
///
/// Defining a prompt whose (name, variant) is already registered is rejected; call
/// [`Registry::unregister_prompt`] first to replace it.
pub struct Registry {
    models: RwLock<BTreeMap<String, Arc<dyn LanguageModel>>>,
    prompts: RwLock<BTreeMap<PromptKey, Arc<PromptDefinition>>>,
    renderer: Arc<dyn TemplateRenderer>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let models: Vec<String> = self
            .models
            .read()
            .map(|models| models.keys().cloned().collect())
            .unwrap_or_default();
        let prompts: Vec<String> = self
            .prompts
            .read()
            .map(|prompts| prompts.keys().map(ToString::to_string).collect())
            .unwrap_or_default();
        f.debug_struct("Registry")
            .field("models", &models)
            .field("prompts", &prompts)
            .finish()
    }
}

fn read_or_err<'a, T>(lock: &'a RwLock<T>, context: &str) -> Result<RwLockReadGuard<'a, T>> {
    lock.read()
        .map_err(|_| DittoError::InvalidResponse(format!("{context} lock poisoned")))
}

fn write_or_err<'a, T>(lock: &'a RwLock<T>, context: &str) -> Result<RwLockWriteGuard<'a, T>> {
    lock.write()
        .map_err(|_| DittoError::InvalidResponse(format!("{context} lock poisoned")))
}

impl Registry {
    pub fn new() -> Self {
        Self::with_renderer(SimpleRenderer)
    }

    pub fn with_renderer<R>(renderer: R) -> Self
    where
        R: TemplateRenderer + 'static,
    {
        Self {
            models: RwLock::new(BTreeMap::new()),
            prompts: RwLock::new(BTreeMap::new()),
            renderer: Arc::new(renderer),
        }
    }

    pub fn executor(&self) -> Executor<'_> {
        Executor::new(self, self.renderer.as_ref())
    }

    /// Registers `model` under its `provider/model_id` name.
    pub fn define_model<M>(&self, model: M) -> Result<Arc<dyn LanguageModel>>
    where
        M: LanguageModel + 'static,
    {
        let model: Arc<dyn LanguageModel> = Arc::new(model);
        let name = model.name();
        let mut models = write_or_err(&self.models, "model registry")?;
        if models.contains_key(&name) {
            return Err(DittoError::Configuration(format!(
                "model {name:?} is already defined"
            )));
        }
        models.insert(name.clone(), model.clone());
        tracing::debug!(model = %name, "model defined");
        Ok(model)
    }

    pub fn lookup_model(&self, name: &str) -> Result<Option<Arc<dyn LanguageModel>>> {
        let models = read_or_err(&self.models, "model registry")?;
        Ok(models.get(name).cloned())
    }

    pub fn define_prompt(
        &self,
        name: impl Into<String>,
        template: impl Into<String>,
        config: PromptConfig,
    ) -> Result<Arc<PromptDefinition>> {
        let definition = Arc::new(PromptDefinition::new(name, template, config)?);
        self.insert_prompt(definition)
    }

    pub(crate) fn insert_prompt(
        &self,
        definition: Arc<PromptDefinition>,
    ) -> Result<Arc<PromptDefinition>> {
        let key = definition.key().clone();
        let mut prompts = write_or_err(&self.prompts, "prompt registry")?;
        if prompts.contains_key(&key) {
            return Err(DittoError::Configuration(format!(
                "prompt {key} is already defined"
            )));
        }
        prompts.insert(key.clone(), definition.clone());
        tracing::debug!(prompt = %key, "prompt defined");
        Ok(definition)
    }

    pub fn lookup_prompt(
        &self,
        name: &str,
        variant: &str,
    ) -> Result<Option<Arc<PromptDefinition>>> {
        let prompts = read_or_err(&self.prompts, "prompt registry")?;
        Ok(prompts.get(&PromptKey::new(name, variant)).cloned())
    }

    pub fn unregister_prompt(
        &self,
        name: &str,
        variant: &str,
    ) -> Result<Option<Arc<PromptDefinition>>> {
        let mut prompts = write_or_err(&self.prompts, "prompt registry")?;
        Ok(prompts.remove(&PromptKey::new(name, variant)))
    }

    pub fn prompts(&self) -> Result<Vec<PromptKey>> {
        let prompts = read_or_err(&self.prompts, "prompt registry")?;
        Ok(prompts.keys().cloned().collect())
    }
}

impl ModelRegistry for Registry {
    fn resolve_model(&self, name: &str) -> Result<Arc<dyn LanguageModel>> {
        self.lookup_model(name)?.ok_or_else(|| not_registered(name))
    }
}
