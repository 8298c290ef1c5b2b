//! Compiled i18n blocks and ICU case tables.

use crate::create::CreateTape;
use crate::mutate::MutateTape;
use crate::remove::RemoveTape;
use crate::update::UpdateTape;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum IcuType {
    Select,
    Plural,
}

impl IcuType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Select => "select",
            Self::Plural => "plural",
        }
    }
}

/// Case table of one ICU expression.
///
/// The four per-case vectors are index-aligned with `cases`.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct TIcu {
    pub kind: IcuType,
    /// Slot of the anchor comment the case content is inserted before.
    pub anchor_index: usize,
    /// Slot holding the active case: `None` when no case matched, `~case`
    /// right after a switch, `case` once populated.
    pub current_case_index: usize,
    /// Case labels with any leading `=` stripped.
    pub cases: Vec<String>,
    pub create: Vec<MutateTape>,
    pub update: Vec<UpdateTape>,
    pub remove: Vec<RemoveTape>,
}

impl TIcu {
    pub fn new(kind: IcuType, anchor_index: usize, current_case_index: usize) -> Self {
        Self {
            kind,
            anchor_index,
            current_case_index,
            cases: Vec::new(),
            create: Vec::new(),
            update: Vec::new(),
            remove: Vec::new(),
        }
    }

    pub fn push_case(&mut self, label: &str, create: MutateTape, update: UpdateTape, remove: RemoveTape) {
        self.cases.push(label.strip_prefix('=').unwrap_or(label).to_string());
        self.create.push(create);
        self.update.push(update);
        self.remove.push(remove);
    }

    pub fn case_position(&self, label: &str) -> Option<usize> {
        self.cases.iter().position(|c| c == label)
    }
}

/// Compiled i18n block: nodes created up front plus their binding updates.
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct TI18n {
    pub create: CreateTape,
    pub update: UpdateTape,
}
