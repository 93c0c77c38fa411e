//! Navigation runtime
//!
//! Owns the navigation state of one page and drives every load:
//! resolve → cache or streaming fetch → parser → host, then commit the
//! location and history for top-level loads.

use std::collections::HashMap;
use std::error::Error;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures_util::StreamExt;
use parking_lot::RwLock;
use serde_json::Value;
use url::Url;

use tkml_dom::{IdGenerator, KindRegistry};
use tkml_fetch::{Fetch, FetchRequest};
use tkml_navigation::{
    invalid_fields, AbortFlag, CacheStore, HistoryBridge, NavigationAttempt, NavigationPhase,
    Resolution, UrlResolver,
};
use tkml_parser::{ParseOutput, ParseTarget, Parser};
use tkml_render::{Attachment, Effect, HostTarget, HtmlRenderer, Render, Surface};

use crate::config::Config;
use crate::error::CoreError;
use crate::host::Host;
use crate::loader::Loader;
use crate::state::{MenuState, NavigationState};
use crate::Result;

static RUNTIME_COUNTER: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone, Default)]
pub struct NavigateOptions {
    pub add_to_history: bool,
    /// JSON body; sent as POST and never cached
    pub body: Option<Value>,
    pub bypass_cache: bool,
    /// Comma-separated identities to replace instead of the page
    pub target: Option<String>,
    /// Placeholder whose element is replaced by the loaded children
    pub attachment: Option<Attachment>,
    /// Element shown as loading until the load settles
    pub loading_marker: Option<String>,
}

impl NavigateOptions {
    /// Page load that records a history entry.
    pub fn top_level() -> Self {
        Self {
            add_to_history: true,
            ..Self::default()
        }
    }

    fn is_top_level(&self) -> bool {
        self.target.is_none() && self.attachment.is_none()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NavigationOutcome {
    /// A failed guard cancelled the navigation
    Aborted,
    Applied {
        url: Url,
        location: String,
        from_cache: bool,
        /// Location and history were updated
        committed: bool,
        markup: String,
    },
    /// A newer navigation for the same target finished first
    Stale { url: Url },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum TargetKey {
    Root,
    Element(String),
}

impl TargetKey {
    /// One key per host element the target can replace.
    fn for_target(target: &ParseTarget) -> Vec<Self> {
        match target {
            ParseTarget::Root => vec![TargetKey::Root],
            ParseTarget::Partial(ids) => ids.iter().cloned().map(TargetKey::Element).collect(),
            ParseTarget::Attach(attachment) => vec![TargetKey::Element(attachment.identity.clone())],
        }
    }
}

/// Latest navigation generation per target.
#[derive(Debug, Default)]
struct Generations(RwLock<HashMap<TargetKey, u64>>);

impl Generations {
    fn claim(&self, keys: Vec<TargetKey>) -> Vec<(TargetKey, u64)> {
        let mut map = self.0.write();
        let claims = keys
            .into_iter()
            .map(|key| {
                let generation = map.entry(key.clone()).or_insert(0);
                *generation += 1;
                (key, *generation)
            })
            .collect();
        claims
    }

    fn is_current(&self, key: &TargetKey, generation: u64) -> bool {
        self.0.read().get(key).copied() == Some(generation)
    }
}

/// Forwards to the host only for targets this navigation still owns.
struct GatedSurface {
    host: Arc<dyn Host>,
    generations: Arc<Generations>,
    claims: Vec<(TargetKey, u64)>,
}

impl GatedSurface {
    /// Whether any claimed target is still owned.
    fn is_current(&self) -> bool {
        self.claims.is_empty()
            || self
                .claims
                .iter()
                .any(|(key, generation)| self.generations.is_current(key, *generation))
    }

    fn owns(&self, key: &TargetKey) -> bool {
        let owned = match self.claims.iter().find(|(claimed, _)| claimed == key) {
            Some((key, generation)) => self.generations.is_current(key, *generation),
            None => self.is_current(),
        };
        if !owned {
            tracing::debug!(key = ?key, "Dropping stale output");
        }
        owned
    }
}

impl Surface for GatedSurface {
    fn replace_element(&self, target: &HostTarget, markup: &str) {
        if self.owns(&TargetKey::Element(target.identity().to_string())) {
            self.host.replace_element(target, markup);
        }
    }

    fn replace_root(&self, markup: &str) {
        if self.owns(&TargetKey::Root) {
            self.host.replace_root(markup);
        }
    }

    fn failed(&self, error: &(dyn Error + 'static)) {
        if self.is_current() {
            self.host.failed(error);
        }
    }
}

#[derive(Clone)]
pub struct Runtime {
    id: u64,
    config: Arc<Config>,
    host: Arc<dyn Host>,
    fetcher: Arc<dyn Fetch>,
    registry: Arc<KindRegistry>,
    renderer: Arc<dyn Render>,
    ids: Arc<IdGenerator>,
    cache: CacheStore,
    history: HistoryBridge,
    resolver: UrlResolver,
    guard: Arc<AbortFlag>,
    state: Arc<RwLock<NavigationState>>,
    generations: Arc<Generations>,
    attempts: Arc<AtomicU64>,
}

impl Runtime {
    pub fn new(config: Config, host: Arc<dyn Host>, fetcher: Arc<dyn Fetch>) -> Result<Self> {
        config.validate()?;
        let id = RUNTIME_COUNTER.fetch_add(1, Ordering::SeqCst) + 1;
        let resolver = config.resolver()?;
        let cache = match config.cache_ttl() {
            Some(ttl) => CacheStore::with_ttl(ttl),
            None => CacheStore::new(),
        };
        let history = HistoryBridge::new(config.history_mode).with_param(&config.history_param);

        tracing::info!(runtime = id, origin = %config.origin, history = %config.history_mode, "Runtime created");

        Ok(Self {
            id,
            config: Arc::new(config),
            host,
            fetcher,
            registry: Arc::new(KindRegistry::builtin()),
            renderer: Arc::new(HtmlRenderer::new()),
            ids: Arc::new(IdGenerator::new(id)),
            cache,
            history,
            resolver,
            guard: Arc::new(AbortFlag::new()),
            state: Arc::new(RwLock::new(NavigationState::new())),
            generations: Arc::new(Generations::default()),
            attempts: Arc::new(AtomicU64::new(0)),
        })
    }

    pub fn with_registry(mut self, registry: KindRegistry) -> Self {
        self.registry = Arc::new(registry);
        self
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn Render>) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    pub fn history(&self) -> &HistoryBridge {
        &self.history
    }

    pub(crate) fn host(&self) -> &Arc<dyn Host> {
        &self.host
    }

    pub(crate) fn guard(&self) -> &AbortFlag {
        &self.guard
    }

    pub fn state(&self) -> NavigationState {
        self.state.read().clone()
    }

    pub fn location(&self) -> Option<String> {
        self.state.read().location.clone()
    }

    pub fn menu(&self) -> MenuState {
        self.state.read().menu.clone()
    }

    pub fn is_guarded(&self) -> bool {
        self.guard.is_armed()
    }

    /// Resolve `href` against the page on screen.
    pub fn resolve(&self, href: &str) -> Resolution {
        let state = self.state.read();
        self.resolver
            .resolve(href, state.location.as_deref(), state.host.as_deref())
    }

    /// Resolve and attach the origin.
    pub fn expand(&self, href: &str) -> Result<Url> {
        let resolution = self.resolve(href);
        Ok(self.resolver.fetch_url(&resolution)?)
    }

    /// Start a guarded load, marking `element` as loading.
    pub fn loader(&self, element: Option<&str>) -> Loader<'_> {
        Loader::new(self, element)
    }

    /// Mark every blank field in the comma-separated list; when any is
    /// blank the next navigation is cancelled.
    pub fn validate_fields(&self, ids: &str) -> &Self {
        let invalid = invalid_fields(ids, |id| self.host.field_value(id));
        for id in &invalid {
            self.host.mark_invalid(id);
        }
        if let Some(first) = invalid.first() {
            tracing::debug!(fields = ?invalid, "Required fields missing");
            self.host.scroll_into_view(first);
            self.guard.arm();
        }
        self
    }

    pub async fn navigate(&self, href: &str, options: NavigateOptions) -> Result<NavigationOutcome> {
        let marker = options.loading_marker.as_deref();
        if self.guard.take() {
            tracing::debug!(href = %href, "Navigation cancelled by guard");
            if let Some(marker) = marker {
                self.host.set_loading(marker, false);
            }
            return Ok(NavigationOutcome::Aborted);
        }

        let attempt_id = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        let mut attempt = NavigationAttempt::new(attempt_id, href);
        attempt.transition_to(NavigationPhase::Resolving)?;

        let resolution = {
            let mut state = self.state.write();
            state.remember_initial(href);
            self.resolver
                .resolve(href, state.location.as_deref(), state.host.as_deref())
        };
        let url = match self.resolver.fetch_url(&resolution) {
            Ok(url) => url,
            Err(err) => return self.fail(attempt, None, marker, err.into()),
        };

        let target = match (&options.target, &options.attachment) {
            (Some(ids), _) => ParseTarget::partial(ids),
            (None, Some(attachment)) => ParseTarget::Attach(attachment.clone()),
            (None, None) => ParseTarget::Root,
        };
        let surface = self.gate(&target);
        let mut parser = self.parser(Arc::clone(&surface), target);

        let cacheable = options.body.is_none();
        let cached = if cacheable && !options.bypass_cache {
            self.cache.get(url.as_str())
        } else {
            None
        };

        let from_cache = cached.is_some();
        let output = match cached {
            Some(markup) => {
                attempt.transition_to(NavigationPhase::CacheHit)?;
                tracing::debug!(url = %url, "Cache hit");
                parser.add(&markup);
                match parser.finish() {
                    Ok(output) => output,
                    Err(err) => return self.fail(attempt, Some(surface.as_ref()), marker, err.into()),
                }
            }
            None => {
                attempt.transition_to(NavigationPhase::Fetching)?;
                match self.stream(&url, options.body.clone(), parser, &mut attempt).await {
                    Ok((output, raw)) => {
                        attempt.transition_to(NavigationPhase::Completed)?;
                        if cacheable {
                            self.cache
                                .insert(url.as_str(), String::from_utf8_lossy(&raw).into_owned());
                        }
                        output
                    }
                    Err(err) => return self.fail(attempt, Some(surface.as_ref()), marker, err),
                }
            }
        };

        if let Some(marker) = marker {
            self.host.set_loading(marker, false);
        }
        attempt.transition_to(NavigationPhase::Applying)?;

        if !surface.is_current() {
            tracing::debug!(url = %url, "Discarding stale navigation");
            attempt.transition_to(NavigationPhase::Idle)?;
            return Ok(NavigationOutcome::Stale { url });
        }

        let committed = options.is_top_level();
        if committed {
            attempt.transition_to(NavigationPhase::Committing)?;
            self.commit(&resolution, &url, options.add_to_history);
            self.settle();
            self.state.write().clear_page();
        }
        self.run_effects(output.effects).await;
        attempt.transition_to(NavigationPhase::Idle)?;

        tracing::info!(url = %url, from_cache, committed, "Navigation complete");
        Ok(NavigationOutcome::Applied {
            url,
            location: resolution.location,
            from_cache,
            committed,
            markup: output.markup,
        })
    }

    /// Fetch `href` into the cache without rendering. Returns false when it
    /// was already cached.
    pub async fn preload(&self, href: &str) -> Result<bool> {
        let url = self.expand(href)?;
        if self.cache.contains(url.as_str()) {
            return Ok(false);
        }
        tracing::debug!(url = %url, "Preloading");
        let response = self.fetcher.fetch(FetchRequest::get(url.clone())).await?;
        let markup = response.text().await?;
        self.cache.insert(url.as_str(), markup);
        Ok(true)
    }

    /// Show the cached page for `href` without touching the network.
    ///
    /// `None` when nothing is cached for it.
    pub async fn load_from_cache(&self, href: &str) -> Result<Option<NavigationOutcome>> {
        let url = self.expand(href)?;
        if !self.cache.contains(url.as_str()) {
            return Ok(None);
        }
        self.navigate(href, NavigateOptions::top_level()).await.map(Some)
    }

    /// Replay the location shown by the host after back/forward.
    ///
    /// Falls back to the configured root page, then to the first page ever
    /// loaded. Never pushes history.
    pub async fn restore_from_history(&self) -> Result<Option<NavigationOutcome>> {
        let visible = self.host.visible_location();
        let href = self
            .history
            .location_from_visible(&visible)
            .or_else(|| self.config.root_url.clone())
            .or_else(|| self.state.read().initial.clone());

        let Some(href) = href else {
            tracing::debug!(visible = %visible, "Nothing to restore");
            return Ok(None);
        };
        tracing::debug!(visible = %visible, href = %href, "Restoring from history");
        self.navigate(&href, NavigateOptions::default()).await.map(Some)
    }

    /// Visibility signal for an observed loader. Loads at most once.
    pub async fn element_visible(&self, identity: &str) -> Result<Option<NavigationOutcome>> {
        let pending = self.state.write().take_observed(identity);
        let Some(pending) = pending else {
            return Ok(None);
        };

        self.host.set_loading(identity, true);
        let options = NavigateOptions {
            bypass_cache: true,
            attachment: Some(pending.attachment.clone()),
            loading_marker: Some(identity.to_string()),
            ..NavigateOptions::default()
        };
        let outcome = self.navigate(&pending.href, options).await?;
        if outcome == NavigationOutcome::Aborted {
            // Still on screen; the next signal retries
            self.state.write().observe(pending.attachment, pending.href);
        }
        Ok(Some(outcome))
    }

    /// Render markup straight into the page root.
    pub async fn from_text(&self, markup: &str) -> Result<String> {
        let surface = self.gate(&ParseTarget::Root);
        let mut parser = self.parser(surface, ParseTarget::Root);
        parser.add(markup);
        let output = parser.finish()?;
        self.state.write().clear_page();
        self.run_effects(output.effects).await;
        Ok(output.markup)
    }

    /// Flip the menu of the current page. Returns the new open state.
    pub fn toggle_menu(&self) -> bool {
        let mut state = self.state.write();
        let Some(trigger) = state.menu.trigger.clone() else {
            return false;
        };
        state.menu.open = !state.menu.open;
        let open = state.menu.open;
        drop(state);

        self.host.set_menu_open(&trigger, open);
        open
    }

    pub fn close_menu(&self) {
        let mut state = self.state.write();
        if !state.menu.open {
            return;
        }
        state.menu.open = false;
        let trigger = state.menu.trigger.clone();
        drop(state);

        if let Some(trigger) = trigger {
            self.host.set_menu_open(&trigger, false);
        }
    }

    fn gate(&self, target: &ParseTarget) -> Arc<GatedSurface> {
        let claims = self.generations.claim(TargetKey::for_target(target));
        Arc::new(GatedSurface {
            host: Arc::clone(&self.host),
            generations: Arc::clone(&self.generations),
            claims,
        })
    }

    fn parser(&self, surface: Arc<GatedSurface>, target: ParseTarget) -> Parser<GatedSurface> {
        Parser::new(
            surface,
            Arc::clone(&self.registry),
            Arc::clone(&self.renderer),
            Arc::clone(&self.ids),
            target,
        )
        .with_envelope(self.config.envelope)
    }

    /// Fetch `url` and feed the body to `parser` as it arrives.
    async fn stream(
        &self,
        url: &Url,
        body: Option<Value>,
        mut parser: Parser<GatedSurface>,
        attempt: &mut NavigationAttempt,
    ) -> Result<(ParseOutput, Vec<u8>)> {
        let request = match body {
            Some(body) => FetchRequest::post(url.clone(), body),
            None => FetchRequest::get(url.clone()),
        };
        let mut response = self.fetcher.fetch(request).await?;
        attempt.transition_to(NavigationPhase::Streaming)?;

        let mut raw = Vec::new();
        while let Some(chunk) = response.chunks.next().await {
            let chunk = chunk?;
            raw.extend_from_slice(&chunk);
            parser.add_bytes(&chunk);
            if parser.is_failed() {
                break;
            }
        }

        let output = parser.finish()?;
        Ok((output, raw))
    }

    fn fail(
        &self,
        mut attempt: NavigationAttempt,
        surface: Option<&GatedSurface>,
        marker: Option<&str>,
        err: CoreError,
    ) -> Result<NavigationOutcome> {
        if let Some(marker) = marker {
            self.host.set_loading(marker, false);
        }
        attempt.transition_to(NavigationPhase::Failed)?;
        attempt.transition_to(NavigationPhase::Reporting)?;
        tracing::warn!(url = %attempt.url, error = %err, "Navigation failed");

        // The parser reports its own errors
        if !matches!(err, CoreError::Parse(_)) {
            match surface {
                Some(surface) => surface.failed(&err),
                None => self.host.failed(&err),
            }
        }
        attempt.transition_to(NavigationPhase::Idle)?;
        Err(err)
    }

    fn commit(&self, resolution: &Resolution, url: &Url, add_to_history: bool) {
        self.state
            .write()
            .commit(&resolution.location, resolution.host.clone());

        if !add_to_history {
            return;
        }
        let visible = self.history.visible_for(&resolution.location, url);
        if self
            .history
            .should_push(&self.host.visible_location(), &visible)
        {
            self.host.push_history(&visible);
            self.history.record(&resolution.location, &visible);
        } else {
            tracing::debug!(visible = %visible, "History already shows this location");
        }
    }

    /// Page-settled hook.
    fn settle(&self) {
        if self.host.viewport_width() < self.config.narrow_layout_width {
            self.close_menu();
        }
        self.host.scroll_to_top();
        self.host.remeasure_footers();
    }

    async fn run_effects(&self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Preload(href) => self.schedule_preload(href).await,
                Effect::LazyLoad { attachment, href } => {
                    self.state.write().observe(attachment, href);
                }
                Effect::Menu {
                    trigger,
                    content_url,
                } => {
                    tracing::debug!(trigger = %trigger, "Menu registered");
                    self.state.write().menu = MenuState {
                        trigger: Some(trigger),
                        content_url: Some(content_url),
                        open: false,
                    };
                }
            }
        }
    }

    async fn schedule_preload(&self, href: String) {
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let runtime = self.clone();
                handle.spawn(async move {
                    if let Err(err) = runtime.preload(&href).await {
                        tracing::debug!(href = %href, error = %err, "Preload failed");
                    }
                });
            }
            Err(_) => {
                if let Err(err) = self.preload(&href).await {
                    tracing::debug!(href = %href, error = %err, "Preload failed");
                }
            }
        }
    }
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("id", &self.id)
            .field("origin", &self.config.origin)
            .field("cached", &self.cache.len())
            .finish_non_exhaustive()
    }
}
