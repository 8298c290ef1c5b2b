use std::sync::atomic::{AtomicU32, Ordering};

use crate::di::bloom::BLOOM_SIZE;

static NEXT_TOKEN_ID: AtomicU32 = AtomicU32::new(0);

/// Dependency key.
///
/// Framework tokens are resolved from the requesting node itself rather
/// than looked up in any injector.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Token {
    ElementRef,
    ViewContainerRef,
    TemplateRef,
    Injector,
    ChangeDetectorRef,
    /// The environment (module) injector of the requesting view.
    EnvironmentInjector,
    User { id: u32, name: &'static str },
}

/// How a token takes part in node-injector lookup.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(crate) enum BloomHash {
    /// Bit position in the 256-bit filter.
    Bit(u8),
    /// Produced from the requesting node.
    Structural,
    /// Never provided by a node injector.
    None,
}

impl Token {
    /// A user token with a fresh identity.
    pub fn new(name: &'static str) -> Self {
        let id = NEXT_TOKEN_ID.fetch_add(1, Ordering::Relaxed);
        Self::User { id, name }
    }

    /// A user token with a chosen id; tokens whose ids agree modulo 256
    /// share a bloom bit.
    pub fn with_id(name: &'static str, id: u32) -> Self {
        Self::User { id, name }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::ElementRef => "ElementRef",
            Self::ViewContainerRef => "ViewContainerRef",
            Self::TemplateRef => "TemplateRef",
            Self::Injector => "Injector",
            Self::ChangeDetectorRef => "ChangeDetectorRef",
            Self::EnvironmentInjector => "EnvironmentInjector",
            Self::User { name, .. } => name,
        }
    }

    pub(crate) fn bloom_hash(&self) -> BloomHash {
        match self {
            Self::User { id, .. } => BloomHash::Bit((id % BLOOM_SIZE) as u8),
            Self::EnvironmentInjector => BloomHash::None,
            _ => BloomHash::Structural,
        }
    }
}
