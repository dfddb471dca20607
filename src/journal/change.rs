use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChangeKind {
    /// New anonymous section; `value` is its type.
    Add,
    /// Section or option removed.
    Remove,
    /// Section type or option value set.
    Change,
    /// Section or option renamed; `value` is the new name.
    Rename,
    /// Item appended to a list option.
    ListAdd,
}

/// One journaled edit, addressed by concrete section name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Change {
    pub kind: ChangeKind,
    pub section: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub option: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl Change {
    fn new(
        kind: ChangeKind,
        section: impl Into<String>,
        option: Option<&str>,
        value: Option<&str>,
    ) -> Self {
        Self {
            kind,
            section: section.into(),
            option: option.map(str::to_string),
            value: value.map(str::to_string),
        }
    }

    pub fn add(section: impl Into<String>, section_type: &str) -> Self {
        Self::new(ChangeKind::Add, section, None, Some(section_type))
    }

    pub fn change(section: impl Into<String>, option: Option<&str>, value: &str) -> Self {
        Self::new(ChangeKind::Change, section, option, Some(value))
    }

    pub fn list_add(section: impl Into<String>, option: &str, value: &str) -> Self {
        Self::new(ChangeKind::ListAdd, section, Some(option), Some(value))
    }

    pub fn remove(section: impl Into<String>, option: Option<&str>) -> Self {
        Self::new(ChangeKind::Remove, section, option, None)
    }

    pub fn rename(section: impl Into<String>, option: Option<&str>, name: &str) -> Self {
        Self::new(ChangeKind::Rename, section, option, Some(name))
    }

    /// Whether reverting `section` (and optionally one `option` of it)
    /// covers this change. `None` for the section matches everything.
    pub fn targets(&self, section: Option<&str>, option: Option<&str>) -> bool {
        match (section, option) {
            (None, _) => true,
            (Some(section), None) => self.section == section,
            (Some(section), Some(option)) => {
                self.section == section && self.option.as_deref() == Some(option)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_targets() {
        let change = Change::change("lan", Some("proto"), "dhcp");
        assert!(change.targets(None, None));
        assert!(change.targets(Some("lan"), None));
        assert!(change.targets(Some("lan"), Some("proto")));
        assert!(!change.targets(Some("lan"), Some("ipaddr")));
        assert!(!change.targets(Some("wan"), None));

        let removal = Change::remove("lan", None);
        assert!(!removal.targets(Some("lan"), Some("proto")));
    }

    #[test]
    fn test_serializes_without_empty_fields() {
        let json = serde_json::to_string(&Change::remove("lan", None)).unwrap();
        assert_eq!(json, r#"{"kind":"remove","section":"lan"}"#);
        let json = serde_json::to_string(&Change::list_add("lan", "dns", "1.1.1.1")).unwrap();
        assert_eq!(
            json,
            r#"{"kind":"list-add","section":"lan","option":"dns","value":"1.1.1.1"}"#
        );
    }
}
