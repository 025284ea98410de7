//! Theme layer: a read-only projection of the novel configuration.

use std::sync::Arc;

use async_trait::async_trait;
use saga_core::novel::{CreativeElements, NovelConfig};
use saga_core::types::LayerType;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::layer::MemoryLayer;

/// What the theme layer contributes to a prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThemeMemory {
    /// The novel's central theme.
    pub theme: String,
    /// Distinctive creative elements.
    pub creative_elements: CreativeElements,
}

/// Static theme projection; nothing is persisted.
pub struct ThemeLayer {
    novel: Arc<NovelConfig>,
}

impl ThemeLayer {
    /// Create the layer.
    #[must_use]
    pub fn new(novel: Arc<NovelConfig>) -> Self {
        Self { novel }
    }
}

#[async_trait]
impl MemoryLayer for ThemeLayer {
    type Query = ();
    type Output = ThemeMemory;
    type Update = ();

    fn layer_type(&self) -> LayerType {
        LayerType::Theme
    }

    async fn fetch(&self, _query: ()) -> Result<ThemeMemory> {
        Ok(ThemeMemory {
            theme: self.novel.basic_settings.central_theme.clone(),
            creative_elements: self.novel.creative_elements.clone(),
        })
    }

    async fn update(&self, _update: ()) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn projects_theme_and_creative_elements() {
        let mut novel = NovelConfig::default();
        novel.basic_settings.central_theme = "成长与救赎".into();
        novel.creative_elements.signature_features = vec!["断剑重铸".into()];
        let layer = ThemeLayer::new(Arc::new(novel));

        let theme = layer.fetch(()).await.expect("fetch");
        assert_eq!(theme.theme, "成长与救赎");
        assert_eq!(theme.creative_elements.signature_features, vec!["断剑重铸"]);
        layer.update(()).await.expect("no-op");
        assert_eq!(layer.fetch(()).await.expect("fetch"), theme);
        assert!((layer.weight() - 0.8).abs() < f32::EPSILON);
    }
}
