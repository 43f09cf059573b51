//! Request Synchronization Context
//!
//! One `SyncContext` is created per request and threaded explicitly through
//! rendering, controller invocation, and formatting. It owns:
//!
//! - the loaded set that tells the client which definitions it may keep,
//! - the frame stack answering "what am I rendering right now",
//! - the mode policy, fixed for the life of the request,
//! - preload bookkeeping and the per-response component registry.
//!
//! Frames are entered through [`FrameScope`] handles that restore the
//! enclosing frame when dropped, including on early return and unwinding.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use tracing::{debug, trace, warn};

use crate::config::ContextConfig;
use crate::descriptor::{DefType, Descriptor};
use crate::error::SyncError;
use crate::frame::{Action, Component, FrameStack, SavedFrame};
use crate::loaded::{LoadedSet, LoadedSnapshot, Uid};
use crate::mode::{Access, Format, Mode};
use crate::registry::{DefinitionRegistry, EventType};

// ═══════════════════════════════════════════════════════════════════════════════
// CLIENT-FACING TYPES
// ═══════════════════════════════════════════════════════════════════════════════

/// An application event queued to fire on the client with the response.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientEvent {
    pub descriptor: Descriptor,
    #[serde(skip_serializing_if = "serde_json::Map::is_empty")]
    pub attributes: serde_json::Map<String, serde_json::Value>,
}

impl ClientEvent {
    pub fn new(descriptor: Descriptor) -> Self {
        Self {
            descriptor,
            attributes: serde_json::Map::new(),
        }
    }

    pub fn with_attribute(mut self, name: &str, value: serde_json::Value) -> Self {
        self.attributes.insert(name.to_string(), value);
        self
    }
}

/// Outcome of [`SyncContext::check_freshness`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// The client's UID matches the current definition.
    Fresh,
    /// The client has no UID or an outdated one.
    Stale,
    /// Already validated earlier in this request.
    AlreadyChecked,
}

/// The context a client sends with each request.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ClientContext {
    pub mode: Option<Mode>,
    /// Application name, `namespace:name`.
    pub app: Option<String>,
    /// Component served in place of an application, `namespace:name`.
    pub cmp: Option<String>,
    pub loaded: HashMap<Descriptor, Option<Uid>>,
    pub num: Option<String>,
    pub fwuid: Option<String>,
    /// Dynamic namespaces.
    pub dn: Vec<String>,
}

/// The context written back to the client with the response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextWire<'a> {
    pub mode: Mode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cmp: Option<String>,
    pub loaded: LoadedSnapshot,
    pub preloads: &'a BTreeSet<String>,
    #[serde(skip_serializing_if = "is_empty_set")]
    pub dn: &'a BTreeSet<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fwuid: Option<&'a str>,
    #[serde(skip_serializing_if = "is_empty_str")]
    pub context_path: &'a str,
    #[serde(rename = "lastmod", skip_serializing_if = "Option::is_none")]
    pub last_mod: Option<&'a str>,
    #[serde(skip_serializing_if = "is_empty_slice")]
    pub events: &'a [ClientEvent],
}

fn is_empty_set(set: &&BTreeSet<String>) -> bool {
    set.is_empty()
}

fn is_empty_str(s: &&str) -> bool {
    s.is_empty()
}

fn is_empty_slice<T>(slice: &&[T]) -> bool {
    slice.is_empty()
}

// ═══════════════════════════════════════════════════════════════════════════════
// SYNC CONTEXT
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug)]
pub struct SyncContext {
    mode: Mode,
    format: Format,
    access: Access,
    default_prefixes: HashMap<DefType, String>,
    debug_tool: bool,

    application_descriptor: Option<Descriptor>,
    loading_application_descriptor: Option<Descriptor>,

    loaded: LoadedSet,
    client_loaded: HashMap<Descriptor, Option<Uid>>,
    checked: HashSet<Descriptor>,
    frames: FrameStack,

    preloads: BTreeSet<String>,
    dynamic_namespaces: BTreeSet<String>,
    preloaded_definitions: HashSet<Descriptor>,
    preloading: bool,

    components: HashMap<String, Arc<Component>>,
    next_id: u64,
    client_events: Vec<ClientEvent>,

    num: Option<String>,
    framework_uid: Option<String>,
    last_mod: Option<String>,
    serialize_last_mod: bool,
    context_path: String,
}

impl SyncContext {
    /// Begin a request context.
    pub fn begin(mode: Mode, application: Option<Descriptor>, config: &ContextConfig) -> Self {
        debug!(%mode, app = ?application.as_ref().map(|d| d.to_string()), "request context created");
        Self {
            mode,
            format: Format::default(),
            access: Access::default(),
            default_prefixes: config.default_prefixes.clone(),
            debug_tool: config.debug_tool,
            application_descriptor: application,
            loading_application_descriptor: None,
            loaded: LoadedSet::new(),
            client_loaded: HashMap::new(),
            checked: HashSet::new(),
            frames: FrameStack::new(),
            preloads: config.default_preloads.iter().cloned().collect(),
            dynamic_namespaces: BTreeSet::new(),
            preloaded_definitions: HashSet::new(),
            preloading: false,
            components: HashMap::new(),
            next_id: u64::from(config.next_id_base),
            client_events: Vec::new(),
            num: None,
            framework_uid: None,
            last_mod: None,
            serialize_last_mod: false,
            context_path: config.context_path.clone(),
        }
    }

    /// Begin a request context from the JSON context the client sent.
    pub fn from_client(json: &str, config: &ContextConfig) -> Result<Self, SyncError> {
        let client: ClientContext = serde_json::from_str(json)?;
        let target = match (client.app.as_deref(), client.cmp.as_deref()) {
            (Some(app), _) => Some((app, DefType::Application)),
            (None, Some(cmp)) => Some((cmp, DefType::Component)),
            (None, None) => None,
        };
        let application = target
            .map(|(name, def_type)| {
                Descriptor::parse_with(name, def_type, config.default_prefix(def_type), None)
            })
            .transpose()?;

        let mut ctx = Self::begin(client.mode.unwrap_or(config.default_mode), application, config);
        ctx.num = client.num;
        ctx.framework_uid = client.fwuid;
        for namespace in client.dn {
            ctx.add_dynamic_namespace(&namespace);
        }
        ctx.set_client_loaded(client.loaded);
        Ok(ctx)
    }

    pub fn with_format(mut self, format: Format) -> Self {
        self.format = format;
        self
    }

    pub fn with_access(mut self, access: Access) -> Self {
        self.access = access;
        self
    }

    // ───────────────────────────────────────────────────────────────────────────
    // Mode
    // ───────────────────────────────────────────────────────────────────────────

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn is_test_mode(&self) -> bool {
        self.mode.is_test_mode()
    }

    pub fn is_dev_mode(&self) -> bool {
        self.mode.is_dev_mode()
    }

    pub fn format(&self) -> Format {
        self.format
    }

    pub fn access(&self) -> Access {
        self.access
    }

    /// The debug tool is never exposed in production mode.
    pub fn is_debug_tool_enabled(&self) -> bool {
        self.debug_tool && self.mode != Mode::Prod
    }

    pub fn default_prefix(&self, def_type: DefType) -> &str {
        self.default_prefixes
            .get(&def_type)
            .map(String::as_str)
            .unwrap_or_else(|| def_type.default_prefix())
    }

    /// Parse a name as written in markup. A missing prefix comes from the
    /// default-prefix table, a missing namespace from the current frame.
    pub fn descriptor(&self, qualified: &str, def_type: DefType) -> Result<Descriptor, SyncError> {
        Descriptor::parse_with(
            qualified,
            def_type,
            self.default_prefix(def_type),
            self.current_namespace(),
        )
    }

    // ───────────────────────────────────────────────────────────────────────────
    // Application
    // ───────────────────────────────────────────────────────────────────────────

    pub fn application_descriptor(&self) -> Option<&Descriptor> {
        self.application_descriptor.as_ref()
    }

    /// Set the application (or component) being served.
    ///
    /// Accepted unless an application is already set and `descriptor` is
    /// not one; a component never replaces an application. Returns whether
    /// the value was taken.
    pub fn set_application_descriptor(&mut self, descriptor: Descriptor) -> bool {
        let accepted = descriptor.def_type() == DefType::Application
            || self
                .application_descriptor
                .as_ref()
                .map_or(true, |current| current.def_type() != DefType::Application);
        if accepted {
            self.application_descriptor = Some(descriptor);
        } else {
            warn!(
                current = ?self.application_descriptor.as_ref().map(|d| d.to_string()),
                rejected = %descriptor,
                "application descriptor override ignored"
            );
        }
        accepted
    }

    /// What is actually being rendered: the quick-fix stand-in when one was
    /// set, otherwise the application descriptor.
    pub fn loading_application_descriptor(&self) -> Option<&Descriptor> {
        self.loading_application_descriptor
            .as_ref()
            .or(self.application_descriptor.as_ref())
    }

    pub fn set_loading_application_descriptor(&mut self, descriptor: Descriptor) {
        if !self.is_dev_mode() {
            debug!(mode = %self.mode, loading = %descriptor, "loading application override outside DEV");
        }
        self.loading_application_descriptor = Some(descriptor);
    }

    // ───────────────────────────────────────────────────────────────────────────
    // Loaded descriptors
    // ───────────────────────────────────────────────────────────────────────────

    /// Store what the client reports as loaded. The entries also seed the
    /// loaded set, so anything not revisited is kept as-is.
    pub fn set_client_loaded(&mut self, client_loaded: HashMap<Descriptor, Option<Uid>>) {
        for (descriptor, uid) in &client_loaded {
            self.loaded.add(descriptor.clone(), uid.clone());
        }
        self.client_loaded.extend(client_loaded);
    }

    pub fn client_loaded(&self) -> &HashMap<Descriptor, Option<Uid>> {
        &self.client_loaded
    }

    pub fn add_loaded(&mut self, descriptor: Descriptor, uid: Option<Uid>) {
        self.loaded.add(descriptor, uid);
    }

    pub fn drop_loaded(&mut self, descriptor: &Descriptor) {
        self.loaded.drop(descriptor);
    }

    pub fn uid(&self, descriptor: &Descriptor) -> Option<&str> {
        self.loaded.get_uid(descriptor)
    }

    /// Stable view of the loaded set for the response writer.
    pub fn loaded(&self) -> LoadedSnapshot {
        self.loaded.snapshot()
    }

    /// Record `descriptor` as loaded at its current UID and drop every other
    /// loaded descriptor its dependency closure already covers.
    pub fn mark_loaded(
        &mut self,
        registry: &dyn DefinitionRegistry,
        descriptor: &Descriptor,
    ) -> Result<Uid, SyncError> {
        let definition = registry.resolve(descriptor)?;
        let closure = registry.dependency_closure(descriptor)?;

        let mut dropped = 0usize;
        for covered in &closure {
            if self.loaded.drop(covered) {
                dropped += 1;
            }
        }
        if dropped > 0 {
            debug!(%descriptor, dropped, "loaded set compacted");
        }

        self.loaded.add(descriptor.clone(), Some(definition.uid.clone()));
        Ok(definition.uid)
    }

    pub fn has_checked(&self, descriptor: &Descriptor) -> bool {
        self.checked.contains(descriptor)
    }

    /// Mark `descriptor` as validated for the rest of the request. Only call
    /// after a check has actually completed.
    pub fn set_stale_check(&mut self, descriptor: &Descriptor) {
        self.checked.insert(descriptor.clone());
    }

    /// Validate the client's copy of `descriptor` at most once per request,
    /// recording the current UID in the loaded set. Resolution errors
    /// propagate and leave the descriptor unchecked.
    pub fn check_freshness(
        &mut self,
        registry: &dyn DefinitionRegistry,
        descriptor: &Descriptor,
    ) -> Result<Freshness, SyncError> {
        if self.has_checked(descriptor) {
            return Ok(Freshness::AlreadyChecked);
        }

        let definition = registry.resolve(descriptor)?;
        let client_uid = self.client_loaded.get(descriptor).and_then(|u| u.as_deref());
        let freshness = if client_uid == Some(definition.uid.as_str()) {
            Freshness::Fresh
        } else {
            Freshness::Stale
        };
        trace!(%descriptor, ?freshness, "freshness checked");

        self.loaded.add(descriptor.clone(), Some(definition.uid));
        self.set_stale_check(descriptor);
        Ok(freshness)
    }

    // ───────────────────────────────────────────────────────────────────────────
    // Frames
    // ───────────────────────────────────────────────────────────────────────────

    pub fn frames(&self) -> &FrameStack {
        &self.frames
    }

    pub fn current_component(&self) -> Option<&Arc<Component>> {
        self.frames.current_component()
    }

    pub fn current_action(&self) -> Option<&Arc<Action>> {
        self.frames.current_action()
    }

    pub fn current_namespace(&self) -> Option<&str> {
        self.frames.current_namespace()
    }

    pub fn enter_component(&mut self, component: Arc<Component>) -> FrameScope<'_> {
        let saved = self.frames.save();
        self.frames.push_component(Some(component));
        FrameScope::new(self, saved)
    }

    pub fn enter_action(&mut self, action: Arc<Action>) -> FrameScope<'_> {
        let saved = self.frames.save();
        self.frames.push_action(Some(action));
        FrameScope::new(self, saved)
    }

    pub fn enter_namespace(&mut self, namespace: &str) -> FrameScope<'_> {
        let saved = self.frames.save();
        self.frames.push_namespace(Some(namespace.to_string()));
        FrameScope::new(self, saved)
    }

    // ───────────────────────────────────────────────────────────────────────────
    // Preloads
    // ───────────────────────────────────────────────────────────────────────────

    pub fn add_preload(&mut self, namespace: &str) {
        self.preloads.insert(namespace.to_string());
    }

    pub fn preloads(&self) -> &BTreeSet<String> {
        &self.preloads
    }

    pub fn add_dynamic_namespace(&mut self, namespace: &str) {
        self.dynamic_namespaces.insert(namespace.to_string());
    }

    pub fn dynamic_namespaces(&self) -> &BTreeSet<String> {
        &self.dynamic_namespaces
    }

    pub fn set_preloaded_definitions(&mut self, preloaded: HashSet<Descriptor>) {
        self.preloaded_definitions = preloaded;
    }

    pub fn preloaded_definitions(&self) -> &HashSet<Descriptor> {
        &self.preloaded_definitions
    }

    pub fn is_preloaded(&self, descriptor: &Descriptor) -> bool {
        self.preloaded_definitions.contains(descriptor)
    }

    pub fn is_preloading(&self) -> bool {
        self.preloading
    }

    pub fn set_preloading(&mut self, preloading: bool) {
        self.preloading = preloading;
    }

    // ───────────────────────────────────────────────────────────────────────────
    // Component instances
    // ───────────────────────────────────────────────────────────────────────────

    /// Ids count up from the configured base. The counter is `u64` over a
    /// `u32` base, so it never wraps.
    pub fn next_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn register_component(&mut self, component: Arc<Component>) {
        self.components.insert(component.global_id.clone(), component);
    }

    pub fn components(&self) -> &HashMap<String, Arc<Component>> {
        &self.components
    }

    pub fn component(&self, global_id: &str) -> Option<&Arc<Component>> {
        self.components.get(global_id)
    }

    /// Create and register a new instance with a response-unique global id.
    pub fn instantiate(&mut self, descriptor: Descriptor) -> Arc<Component> {
        let id = self.next_id();
        let global_id = format!("{}:{}", id, self.num.as_deref().unwrap_or("0"));
        let component = Arc::new(Component::new(descriptor, global_id));
        self.register_component(component.clone());
        component
    }

    // ───────────────────────────────────────────────────────────────────────────
    // Client events
    // ───────────────────────────────────────────────────────────────────────────

    /// Queue an application event for the client. Fails, leaving the queue
    /// untouched, when the event definition cannot be resolved or is not an
    /// application event.
    pub fn add_client_application_event(
        &mut self,
        registry: &dyn DefinitionRegistry,
        event: ClientEvent,
    ) -> Result<(), SyncError> {
        let definition = registry.resolve(&event.descriptor)?;
        match definition.event_type {
            Some(EventType::Application) => {
                debug!(event = %event.descriptor, "client application event queued");
                self.client_events.push(event);
                Ok(())
            }
            Some(found) => Err(SyncError::InvalidEventType {
                descriptor: event.descriptor,
                found,
            }),
            None => Err(SyncError::InvalidDefinition {
                descriptor: event.descriptor,
                message: "not an event definition".to_string(),
            }),
        }
    }

    pub fn client_events(&self) -> &[ClientEvent] {
        &self.client_events
    }

    // ───────────────────────────────────────────────────────────────────────────
    // Request identity
    // ───────────────────────────────────────────────────────────────────────────

    pub fn num(&self) -> Option<&str> {
        self.num.as_deref()
    }

    pub fn set_num(&mut self, num: &str) {
        self.num = Some(num.to_string());
    }

    pub fn framework_uid(&self) -> Option<&str> {
        self.framework_uid.as_deref()
    }

    pub fn set_framework_uid(&mut self, uid: &str) {
        self.framework_uid = Some(uid.to_string());
    }

    pub fn last_mod(&self) -> Option<&str> {
        self.last_mod.as_deref()
    }

    pub fn set_last_mod(&mut self, last_mod: &str) {
        self.last_mod = Some(last_mod.to_string());
    }

    pub fn serialize_last_mod(&self) -> bool {
        self.serialize_last_mod
    }

    pub fn set_serialize_last_mod(&mut self, serialize: bool) {
        self.serialize_last_mod = serialize;
    }

    pub fn context_path(&self) -> &str {
        &self.context_path
    }

    pub fn set_context_path(&mut self, path: &str) {
        self.context_path = path.to_string();
    }

    // ───────────────────────────────────────────────────────────────────────────
    // Serialization
    // ───────────────────────────────────────────────────────────────────────────

    pub fn to_wire(&self) -> ContextWire<'_> {
        ContextWire {
            mode: self.mode,
            app: self
                .application_descriptor
                .as_ref()
                .filter(|d| d.def_type() == DefType::Application)
                .map(Descriptor::descriptor_name),
            cmp: self
                .application_descriptor
                .as_ref()
                .filter(|d| d.def_type() != DefType::Application)
                .map(Descriptor::descriptor_name),
            loaded: self.loaded(),
            preloads: &self.preloads,
            dn: &self.dynamic_namespaces,
            num: self.num(),
            fwuid: self.framework_uid(),
            context_path: &self.context_path,
            last_mod: if self.serialize_last_mod {
                self.last_mod()
            } else {
                None
            },
            events: &self.client_events,
        }
    }

    pub fn to_json(&self) -> Result<String, SyncError> {
        Ok(serde_json::to_string(&self.to_wire())?)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// FRAME SCOPE
// ═══════════════════════════════════════════════════════════════════════════════

/// A frame entered on a [`SyncContext`]. Dereferences to the context so
/// nested rendering keeps using it; dropping the scope restores the frame
/// that was current before it was entered.
pub struct FrameScope<'a> {
    ctx: &'a mut SyncContext,
    saved: Option<SavedFrame>,
}

impl<'a> FrameScope<'a> {
    fn new(ctx: &'a mut SyncContext, saved: SavedFrame) -> Self {
        trace!(depth = ctx.frames.depth(), "frame entered");
        Self {
            ctx,
            saved: Some(saved),
        }
    }
}

impl Deref for FrameScope<'_> {
    type Target = SyncContext;

    fn deref(&self) -> &SyncContext {
        self.ctx
    }
}

impl DerefMut for FrameScope<'_> {
    fn deref_mut(&mut self) -> &mut SyncContext {
        self.ctx
    }
}

impl Drop for FrameScope<'_> {
    fn drop(&mut self) {
        if let Some(saved) = self.saved.take() {
            self.ctx.frames.restore(saved);
        }
    }
}
