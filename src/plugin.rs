//! Plugins.
//!
//! A plugin bundles an optional `init` step, which may rewrite the URL, the transport
//! fields or the options of a call, with a set of hooks. Plugins are initialized one
//! after another in list order, each seeing the rewrites of the ones before it.

use crate::config::{ExtraOptions, RequestInit};
use crate::hooks::{ComposedHooks, Hooks};
use crate::Result;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// What a plugin's `init` sees.
#[derive(Debug, Clone)]
pub struct PluginInitContext {
    /// The call URL, as rewritten by earlier plugins.
    pub url: String,
    /// The transport fields, as rewritten by earlier plugins.
    pub request: RequestInit,
    /// The options, as rewritten by earlier plugins.
    pub options: ExtraOptions,
    /// The attempt number, starting at 1.
    pub attempt: usize,
}

/// A plugin's rewrites. Fields left `None` keep their previous value.
#[derive(Debug, Clone, Default)]
pub struct PluginInitResult {
    /// Replaces the call URL.
    pub url: Option<String>,
    /// Replaces the transport fields.
    pub request: Option<RequestInit>,
    /// Replaces the options.
    pub options: Option<ExtraOptions>,
}

/// An extension of the call pipeline.
///
/// # Examples
///
/// ```
/// use async_trait::async_trait;
/// use callhook::plugin::{Plugin, PluginInitContext, PluginInitResult};
/// use callhook::{HookEvent, Hooks, Result};
///
/// struct ApiVersion;
///
/// #[async_trait]
/// impl Plugin for ApiVersion {
///     fn id(&self) -> &str {
///         "api-version"
///     }
///
///     async fn init(&self, ctx: PluginInitContext) -> Result<PluginInitResult> {
///         Ok(PluginInitResult {
///             url: Some(format!("/v2{}", ctx.url)),
///             ..PluginInitResult::default()
///         })
///     }
///
///     fn hooks(&self) -> Hooks {
///         Hooks::new().on(HookEvent::Request, |ctx| async move {
///             ctx.request.set_header("x-api-version", "2")
///         })
///     }
/// }
/// ```
#[async_trait]
pub trait Plugin: Send + Sync {
    /// Unique identifier.
    fn id(&self) -> &str;

    /// Display name.
    fn name(&self) -> &str {
        self.id()
    }

    /// Version, if the plugin declares one.
    fn version(&self) -> Option<&str> {
        None
    }

    /// Rewrites the call before anything is sent. Runs again for every attempt.
    ///
    /// # Errors
    ///
    /// An error here fails the call.
    async fn init(&self, _ctx: PluginInitContext) -> Result<PluginInitResult> {
        Ok(PluginInitResult::default())
    }

    /// The hooks this plugin contributes.
    fn hooks(&self) -> Hooks {
        Hooks::new()
    }
}

/// The plugin list of a config layer.
#[derive(Clone)]
pub enum PluginSource {
    /// A literal list.
    List(Vec<Arc<dyn Plugin>>),
    /// A function of the plugins of the layer below.
    Derive(Arc<dyn Fn(&[Arc<dyn Plugin>]) -> Vec<Arc<dyn Plugin>> + Send + Sync>),
}

impl PluginSource {
    /// Resolves the list against the plugins of the layer below.
    pub fn resolve(&self, base: &[Arc<dyn Plugin>]) -> Vec<Arc<dyn Plugin>> {
        match self {
            PluginSource::List(plugins) => plugins.clone(),
            PluginSource::Derive(derive) => derive(base),
        }
    }

    pub(crate) fn merge(below: Option<Self>, above: Option<Self>) -> Option<Self> {
        match (below, above) {
            (Some(below), Some(above)) => {
                let base = below.resolve(&[]);
                Some(PluginSource::List(above.resolve(&base)))
            }
            (below, above) => above.or(below),
        }
    }
}

impl fmt::Debug for PluginSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PluginSource::List(plugins) => f
                .debug_list()
                .entries(plugins.iter().map(|plugin| plugin.id()))
                .finish(),
            PluginSource::Derive(_) => f.write_str("Derive(..)"),
        }
    }
}

/// The call after every plugin was initialized.
pub(crate) struct ResolvedInit {
    pub(crate) url: String,
    pub(crate) request: RequestInit,
    pub(crate) options: ExtraOptions,
    pub(crate) hooks: ComposedHooks,
}

/// Runs every plugin's `init` in order and composes the hooks of the call.
pub(crate) async fn initialize_plugins(
    url: String,
    request: RequestInit,
    options: ExtraOptions,
    attempt: usize,
) -> Result<ResolvedInit> {
    let plugins = options.plugin_list();
    let mut ctx = PluginInitContext {
        url,
        request,
        options,
        attempt,
    };

    for plugin in &plugins {
        debug!(plugin = plugin.id(), attempt, "Initializing plugin");
        let rewrite = plugin.init(ctx.clone()).await?;
        if let Some(url) = rewrite.url {
            ctx.url = url;
        }
        if let Some(request) = rewrite.request {
            ctx.request = request;
        }
        if let Some(options) = rewrite.options {
            ctx.options = options;
        }
    }

    let plugin_hooks: Vec<Hooks> = plugins.iter().map(|plugin| plugin.hooks()).collect();
    let main_hooks = ctx.options.hooks.clone().unwrap_or_default();
    let hooks = ComposedHooks::compose(
        &main_hooks,
        &plugin_hooks,
        ctx.options.hooks_registration_order.unwrap_or_default(),
        ctx.options.hooks_execution_mode.unwrap_or_default(),
    );

    Ok(ResolvedInit {
        url: ctx.url,
        request: ctx.request,
        options: ctx.options,
        hooks,
    })
}
