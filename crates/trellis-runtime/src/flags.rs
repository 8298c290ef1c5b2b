//! Bit sets shared by the view model and the injector.

use bitflags::bitflags;

bitflags! {
    /// Resolution modifiers for a dependency lookup.
    #[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
    pub struct InjectFlags: u8 {
        /// Stop at the host element of the declaring component.
        const HOST = 0b0001;
        /// Only look at the requesting node's own injector.
        const SELF = 0b0010;
        /// Start at the parent injector.
        const SKIP_SELF = 0b0100;
        /// Resolve to `None` instead of failing.
        const OPTIONAL = 0b1000;
    }
}

bitflags! {
    /// Which half of a template function to run.
    #[derive(Clone, Copy, PartialEq, Eq, Debug)]
    pub struct RenderFlags: u8 {
        const CREATE = 0b01;
        const UPDATE = 0b10;
    }
}

bitflags! {
    #[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
    pub struct LViewFlags: u16 {
        /// Still running its first (create) pass.
        const CREATION_MODE = 1 << 0;
        /// Refreshed by change detection.
        const ATTACHED = 1 << 1;
        const CHECK_ALWAYS = 1 << 2;
        const DIRTY = 1 << 3;
        const DESTROYED = 1 << 4;
        /// Top of a view tree (bootstrapped or dynamically created component).
        const IS_ROOT = 1 << 5;
        /// This view or a declaration ancestor carries an embedded-view injector.
        const HAS_EMBEDDED_VIEW_INJECTOR = 1 << 6;
    }
}

bitflags! {
    /// Node kinds. Kept as bits so callers can test against unions.
    #[derive(Clone, Copy, PartialEq, Eq, Debug)]
    pub struct TNodeType: u8 {
        const TEXT = 1 << 0;
        const ELEMENT = 1 << 1;
        /// Template anchor or bare container.
        const CONTAINER = 1 << 2;
        const ELEMENT_CONTAINER = 1 << 3;
        const PROJECTION = 1 << 4;
        const ICU = 1 << 5;
        /// Slot reserved by an i18n message for an element not created yet.
        const PLACEHOLDER = 1 << 6;

        const ANY_RNODE = Self::TEXT.bits() | Self::ELEMENT.bits();
        const ANY_CONTAINER = Self::CONTAINER.bits() | Self::ELEMENT_CONTAINER.bits();
    }
}

impl TNodeType {
    pub fn name(self) -> &'static str {
        match self {
            t if t == Self::TEXT => "text",
            t if t == Self::ELEMENT => "element",
            t if t == Self::CONTAINER => "container",
            t if t == Self::ELEMENT_CONTAINER => "element-container",
            t if t == Self::PROJECTION => "projection",
            t if t == Self::ICU => "icu",
            t if t == Self::PLACEHOLDER => "placeholder",
            _ => "mixed",
        }
    }
}

bitflags! {
    #[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
    pub struct TNodeFlags: u8 {
        const IS_COMPONENT_HOST = 1 << 0;
        const IS_DETACHED = 1 << 1;
        /// Created or claimed by an i18n block.
        const I18N = 1 << 2;
        const HAS_DIRECTIVES = 1 << 3;
    }
}
