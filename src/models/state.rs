//! Hidden WebForms state captured from the schedule page.

/// Primary view-state field; later fragments append their index.
pub const VIEW_STATE: &str = "__VIEWSTATE";
/// Number of view-state fragments the page was split into.
pub const VIEW_STATE_FIELD_COUNT: &str = "__VIEWSTATEFIELDCOUNT";
pub const VIEW_STATE_GENERATOR: &str = "__VIEWSTATEGENERATOR";
pub const EVENT_VALIDATION: &str = "__EVENTVALIDATION";

/// View-state fragments plus the validation and generator tokens of one page.
///
/// Fragment order is the order the server rendered them in and must be kept
/// when the state is posted back.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HiddenStateBundle {
    view_states: Vec<String>,
    event_validation: String,
    generator: String,
}

impl HiddenStateBundle {
    pub fn new(
        view_states: Vec<String>,
        event_validation: impl Into<String>,
        generator: impl Into<String>,
    ) -> Self {
        Self {
            view_states,
            event_validation: event_validation.into(),
            generator: generator.into(),
        }
    }

    pub fn view_states(&self) -> &[String] {
        &self.view_states
    }

    pub fn event_validation(&self) -> &str {
        &self.event_validation
    }

    pub fn generator(&self) -> &str {
        &self.generator
    }

    pub fn fragment_count(&self) -> usize {
        self.view_states.len()
    }

    /// Fragments paired with their positional field names.
    pub fn fragment_fields(&self) -> impl Iterator<Item = (String, &str)> {
        self.view_states
            .iter()
            .enumerate()
            .map(|(i, value)| (view_state_field_name(i), value.as_str()))
    }
}

/// Field name for the fragment at `index`: `__VIEWSTATE`, `__VIEWSTATE1`, ...
pub fn view_state_field_name(index: usize) -> String {
    if index == 0 {
        VIEW_STATE.to_string()
    } else {
        format!("{VIEW_STATE}{index}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_names_are_positional() {
        assert_eq!(view_state_field_name(0), "__VIEWSTATE");
        assert_eq!(view_state_field_name(1), "__VIEWSTATE1");
        assert_eq!(view_state_field_name(27), "__VIEWSTATE27");
    }

    #[test]
    fn test_fragment_fields_keep_order() {
        let bundle = HiddenStateBundle::new(
            vec!["A".to_string(), "B".to_string(), "C".to_string()],
            "V1",
            "G1",
        );
        let fields: Vec<_> = bundle.fragment_fields().collect();
        assert_eq!(
            fields,
            vec![
                ("__VIEWSTATE".to_string(), "A"),
                ("__VIEWSTATE1".to_string(), "B"),
                ("__VIEWSTATE2".to_string(), "C"),
            ]
        );
        assert_eq!(bundle.fragment_count(), 3);
    }
}
