//! Definition Registry
//!
//! The boundary to the collaborator that compiles definitions. The context
//! only needs three things from it: a definition's UID, its dependencies, and
//! for events, the event category.
//!
//! `MemoryRegistry` is a self-contained implementation used by the demo and
//! tests. Its UIDs are SHA-256 fingerprints of a definition's source plus the
//! UIDs of everything it depends on, so editing a leaf changes the UID of
//! every definition that reaches it.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;

use crate::descriptor::Descriptor;
use crate::error::SyncError;
use crate::loaded::Uid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EventType {
    Application,
    Component,
    Value,
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EventType::Application => "APPLICATION",
            EventType::Component => "COMPONENT",
            EventType::Value => "VALUE",
        })
    }
}

/// What the registry reports about one compiled definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Definition {
    pub descriptor: Descriptor,
    pub uid: Uid,
    /// Direct dependencies.
    pub dependencies: Vec<Descriptor>,
    /// Set for event definitions only.
    pub event_type: Option<EventType>,
}

pub trait DefinitionRegistry {
    /// Resolve a descriptor to its compiled definition.
    ///
    /// Fails with [`SyncError::DefinitionNotFound`] or
    /// [`SyncError::InvalidDefinition`].
    fn resolve(&self, descriptor: &Descriptor) -> Result<Definition, SyncError>;

    /// Every descriptor reachable from `descriptor`, excluding itself.
    fn dependency_closure(&self, descriptor: &Descriptor) -> Result<BTreeSet<Descriptor>, SyncError> {
        let mut seen = BTreeSet::new();
        let mut pending = self.resolve(descriptor)?.dependencies;
        while let Some(next) = pending.pop() {
            if &next == descriptor || !seen.insert(next.clone()) {
                continue;
            }
            pending.extend(self.resolve(&next)?.dependencies);
        }
        Ok(seen)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// IN-MEMORY REGISTRY
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone)]
struct Source {
    content: String,
    dependencies: Vec<Descriptor>,
    event_type: Option<EventType>,
    error: Option<String>,
}

#[derive(Debug, Default)]
pub struct MemoryRegistry {
    sources: HashMap<Descriptor, Source>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, descriptor: Descriptor, content: &str, dependencies: Vec<Descriptor>) {
        self.sources.insert(
            descriptor,
            Source {
                content: content.to_string(),
                dependencies,
                event_type: None,
                error: None,
            },
        );
    }

    pub fn insert_event(&mut self, descriptor: Descriptor, content: &str, event_type: EventType) {
        self.sources.insert(
            descriptor,
            Source {
                content: content.to_string(),
                dependencies: Vec::new(),
                event_type: Some(event_type),
                error: None,
            },
        );
    }

    /// Register a definition that fails to compile.
    pub fn insert_broken(&mut self, descriptor: Descriptor, message: &str) {
        self.sources.insert(
            descriptor,
            Source {
                content: String::new(),
                dependencies: Vec::new(),
                event_type: None,
                error: Some(message.to_string()),
            },
        );
    }

    fn source(&self, descriptor: &Descriptor) -> Result<&Source, SyncError> {
        let source = self
            .sources
            .get(descriptor)
            .ok_or_else(|| SyncError::DefinitionNotFound(descriptor.clone()))?;
        if let Some(message) = &source.error {
            return Err(SyncError::InvalidDefinition {
                descriptor: descriptor.clone(),
                message: message.clone(),
            });
        }
        Ok(source)
    }

    /// `computed` memoizes UIDs for the duration of one resolution so shared
    /// dependencies are hashed once.
    fn compute_uid(
        &self,
        descriptor: &Descriptor,
        visiting: &mut HashSet<Descriptor>,
        computed: &mut HashMap<Descriptor, Uid>,
    ) -> Result<Uid, SyncError> {
        if let Some(uid) = computed.get(descriptor) {
            return Ok(uid.clone());
        }
        let source = self.source(descriptor)?;
        visiting.insert(descriptor.clone());

        let mut hasher = Sha256::new();
        hasher.update(descriptor.to_key().as_bytes());
        hasher.update([0u8]);
        hasher.update(source.content.as_bytes());

        let mut deps: Vec<&Descriptor> = source.dependencies.iter().collect();
        deps.sort();
        deps.dedup();
        for dep in deps {
            hasher.update([0u8]);
            if visiting.contains(dep) {
                // Cycle: fold in the name only.
                hasher.update(dep.to_key().as_bytes());
            } else {
                hasher.update(self.compute_uid(dep, visiting, computed)?.as_bytes());
            }
        }

        visiting.remove(descriptor);
        let uid = format!("{:x}", hasher.finalize());
        computed.insert(descriptor.clone(), uid.clone());
        Ok(uid)
    }
}

impl DefinitionRegistry for MemoryRegistry {
    fn resolve(&self, descriptor: &Descriptor) -> Result<Definition, SyncError> {
        let source = self.source(descriptor)?;
        let uid = self.compute_uid(descriptor, &mut HashSet::new(), &mut HashMap::new())?;
        Ok(Definition {
            descriptor: descriptor.clone(),
            uid,
            dependencies: source.dependencies.clone(),
            event_type: source.event_type,
        })
    }
}
