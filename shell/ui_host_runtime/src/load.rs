use crate::descriptor::{DescriptorNode, MiniAppDefinition};
use crate::error::LoadError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

/// Response of a descriptor fetch as delivered by the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl FetchResult {
    pub fn ok(data: Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message.into()),
        }
    }

    /// Decodes the payload, refusing to look at `data` when the fetch failed.
    ///
    /// Payloads with a `pages` array are mini-apps; anything else is a single
    /// screen and becomes a one-page mini-app.
    pub fn into_definition(self) -> Result<MiniAppDefinition, LoadError> {
        if !self.success {
            return Err(LoadError::FetchFailed(
                self.message
                    .unwrap_or_else(|| "Failed to fetch screen data".to_string()),
            ));
        }

        let data = match self.data {
            Some(Value::Null) | None => return Err(LoadError::MissingData),
            Some(data) => data,
        };

        let definition = if data.get("pages").is_some_and(Value::is_array) {
            serde_json::from_value::<MiniAppDefinition>(data)?
        } else {
            let title = ["title", "name"]
                .iter()
                .find_map(|key| data.get(*key).and_then(Value::as_str))
                .map(str::to_string);
            MiniAppDefinition::single_screen(title, DescriptorNode::from_value(data)?)
        };

        check_definition(&definition)?;
        Ok(definition)
    }
}

fn check_definition(definition: &MiniAppDefinition) -> Result<(), LoadError> {
    if definition.pages.is_empty() {
        return Err(LoadError::NoPages);
    }

    let entries = [
        definition.navigation.initial_page_id.as_deref(),
        definition.navigation.guest_page_id.as_deref(),
    ];
    if let Some(missing) = entries
        .into_iter()
        .flatten()
        .find(|page_id| !definition.contains_page(page_id))
    {
        return Err(LoadError::UnknownEntryPage(missing.to_string()));
    }

    for (page_id, field_id) in definition.duplicate_field_ids() {
        warn!(page = %page_id, field = %field_id, "duplicate field id; last write wins");
    }

    Ok(())
}
