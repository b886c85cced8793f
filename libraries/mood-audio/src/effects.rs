//! One-shot sound effects

use crate::buffer::SampleBlock;
use crate::graph::{MixGraph, Route, VoiceId};
use std::collections::HashMap;
use std::sync::Arc;

/// Decoded effects keyed by caller-chosen name
///
/// Every trigger starts an independent voice on the effects bus; nothing is
/// pooled or limited and voices end on their own.
#[derive(Debug, Clone, Default)]
pub struct SoundEffectPool {
    buffers: HashMap<String, Arc<SampleBlock>>,
}

impl SoundEffectPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store (or replace) the buffer for `name`
    pub fn insert(&mut self, name: impl Into<String>, block: Arc<SampleBlock>) {
        self.buffers.insert(name.into(), block);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.buffers.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }

    /// Start a voice for `name`; `None` if the name is unknown
    pub fn trigger(&self, name: &str, graph: &mut MixGraph) -> Option<VoiceId> {
        let block = self.buffers.get(name)?;
        Some(graph.start_voice(Route::Effects, Arc::clone(block), false))
    }
}
