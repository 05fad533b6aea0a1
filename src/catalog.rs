//! Product models offered by the showcase viewer

/// A selectable model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelEntry {
    pub id: String,
    pub name: String,
    pub model_path: String,
    pub description: String,
}

impl ModelEntry {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        model_path: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            model_path: model_path.into(),
            description: description.into(),
        }
    }
}

/// Ordered list of selectable models
#[derive(Debug, Clone, Default)]
pub struct ModelCatalog {
    entries: Vec<ModelEntry>,
}

impl ModelCatalog {
    pub fn new(entries: Vec<ModelEntry>) -> Self {
        Self { entries }
    }

    /// The product line shown on the showcase page
    pub fn showcase() -> Self {
        Self::new(vec![
            ModelEntry::new("1", "Kibble", "/models/kibble.glb", "A tasty kibble."),
            ModelEntry::new("2", "Bowl", "/models/bowl.glb", "A bright red bowl."),
            ModelEntry::new("3", "Bag", "/models/bag.glb", "A bag of delicious cat food."),
        ])
    }

    pub fn find(&self, id: &str) -> Option<&ModelEntry> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    pub fn entries(&self) -> &[ModelEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
