use indexmap::IndexMap;
use trellis_runtime::TViewId;

/// Server-side state shared across the annotation of one document.
///
/// Embedded templates get stable ids (`t0`, `t1`, ...) the first time a
/// container of theirs is serialized, so every instance of a template
/// reports the same id.
#[derive(Clone, Debug)]
pub struct HydrationContext {
    id_prefix: String,
    template_ids: IndexMap<TViewId, String>,
    record_all_paths: bool,
}

impl Default for HydrationContext {
    fn default() -> Self {
        Self {
            id_prefix: "t".to_string(),
            template_ids: IndexMap::new(),
            record_all_paths: false,
        }
    }
}

impl HydrationContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prefix of generated template ids.
    pub fn id_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.id_prefix = prefix.into();
        self
    }

    /// Record a path for every node, even where the client can infer it.
    pub fn record_all_paths(mut self, enabled: bool) -> Self {
        self.record_all_paths = enabled;
        self
    }

    pub fn records_all_paths(&self) -> bool {
        self.record_all_paths
    }

    /// Id of an embedded template, assigned on first use.
    pub fn template_id(&mut self, tview: TViewId) -> String {
        let next = self.template_ids.len();
        self.template_ids
            .entry(tview)
            .or_insert_with(|| format!("{}{next}", self.id_prefix))
            .clone()
    }

    /// Templates seen so far, in the order they got their ids.
    pub fn template_ids(&self) -> impl Iterator<Item = (TViewId, &str)> + '_ {
        self.template_ids.iter().map(|(t, id)| (*t, id.as_str()))
    }
}
