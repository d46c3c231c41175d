use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormState {
    values: BTreeMap<String, Value>,
}

impl FormState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, field_id: &str) -> Option<&Value> {
        self.values.get(field_id)
    }

    pub fn set(&mut self, field_id: impl Into<String>, value: Value) {
        self.values.insert(field_id.into(), value);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(id, value)| (id.as_str(), value))
    }
}

/// True for a missing value, JSON null, or a blank string.
pub fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(text)) => text.trim().is_empty(),
        Some(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[test]
    fn last_write_wins() {
        let mut form = FormState::new();
        form.set("email", json!("a@example.com"));
        form.set("email", json!("b@example.com"));

        assert_eq!(form.get("email"), Some(&json!("b@example.com")));
        assert_eq!(form.len(), 1);
    }

    #[test]
    fn unknown_field_reads_as_none() {
        assert_eq!(FormState::new().get("missing"), None);
    }

    #[rstest]
    #[case::absent(None, true)]
    #[case::null(Some(json!(null)), true)]
    #[case::empty(Some(json!("")), true)]
    #[case::whitespace(Some(json!("  \t")), true)]
    #[case::text(Some(json!("Juan")), false)]
    #[case::number(Some(json!(0)), false)]
    #[case::flag(Some(json!(false)), false)]
    fn blank_values(#[case] value: Option<Value>, #[case] expected: bool) {
        assert_eq!(is_blank(value.as_ref()), expected);
    }
}
