use serde::Serialize;

/// Value carried by an option: one string, or an ordered list of items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Scalar(String),
    List(Vec<String>),
}

impl Value {
    pub fn as_scalar(&self) -> Option<&str> {
        match self {
            Value::Scalar(value) => Some(value),
            Value::List(_) => None,
        }
    }

    pub fn is_list(&self) -> bool {
        matches!(self, Value::List(_))
    }

    /// Items in order; a scalar counts as a single item.
    pub fn items(&self) -> Vec<&str> {
        match self {
            Value::Scalar(value) => vec![value.as_str()],
            Value::List(items) => items.iter().map(String::as_str).collect(),
        }
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Scalar(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Scalar(value.to_string())
    }
}

impl From<Vec<String>> for Value {
    fn from(items: Vec<String>) -> Self {
        Value::List(items)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UciOption {
    name: String,
    value: Value,
}

impl UciOption {
    pub(crate) fn new(name: impl Into<String>, value: Value) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub(crate) fn set_value(&mut self, value: Value) {
        self.value = value;
    }

    pub(crate) fn rename(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Append an item, turning a scalar into a list that starts with it.
    pub(crate) fn push_item(&mut self, item: String) {
        match &mut self.value {
            Value::List(items) => items.push(item),
            Value::Scalar(previous) => {
                let first = std::mem::take(previous);
                self.value = Value::List(vec![first, item]);
            }
        }
    }
}

/// A typed block of options inside a package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    name: String,
    section_type: String,
    anonymous: bool,
    options: Vec<UciOption>,
}

impl Section {
    pub(crate) fn new(
        section_type: impl Into<String>,
        name: impl Into<String>,
        anonymous: bool,
    ) -> Self {
        Self {
            name: name.into(),
            section_type: section_type.into(),
            anonymous,
            options: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn section_type(&self) -> &str {
        &self.section_type
    }

    /// Whether the name was generated rather than declared.
    pub fn is_anonymous(&self) -> bool {
        self.anonymous
    }

    pub fn options(&self) -> &[UciOption] {
        &self.options
    }

    pub fn option(&self, name: &str) -> Option<&UciOption> {
        self.options.iter().find(|option| option.name == name)
    }

    pub(crate) fn option_mut(&mut self, name: &str) -> Option<&mut UciOption> {
        self.options.iter_mut().find(|option| option.name == name)
    }

    /// Shorthand for the scalar value of an option.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.option(name).and_then(|option| option.value.as_scalar())
    }

    pub(crate) fn set_type(&mut self, section_type: impl Into<String>) {
        self.section_type = section_type.into();
    }

    pub(crate) fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub(crate) fn set_anonymous(&mut self, anonymous: bool) {
        self.anonymous = anonymous;
    }

    /// Set an option, replacing the value of an existing one in place.
    pub(crate) fn put_option(&mut self, name: &str, value: Value) {
        match self.option_mut(name) {
            Some(option) => option.set_value(value),
            None => self.options.push(UciOption::new(name, value)),
        }
    }

    /// Append a list item, creating the option when missing.
    pub(crate) fn push_item(&mut self, name: &str, item: String) {
        match self.option_mut(name) {
            Some(option) => option.push_item(item),
            None => self
                .options
                .push(UciOption::new(name, Value::List(vec![item]))),
        }
    }

    pub(crate) fn remove_option(&mut self, name: &str) -> Option<UciOption> {
        let index = self.options.iter().position(|option| option.name == name)?;
        Some(self.options.remove(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_option_keeps_order_and_overwrites() {
        let mut section = Section::new("interface", "lan", false);
        section.put_option("proto", "static".into());
        section.put_option("ipaddr", "10.0.0.1".into());
        section.put_option("proto", "dhcp".into());

        let names: Vec<_> = section.options().iter().map(UciOption::name).collect();
        assert_eq!(names, vec!["proto", "ipaddr"]);
        assert_eq!(section.get("proto"), Some("dhcp"));
    }

    #[test]
    fn test_push_item_converts_scalar() {
        let mut section = Section::new("dnsmasq", "main", false);
        section.put_option("server", "1.1.1.1".into());
        section.push_item("server", "8.8.8.8".into());
        assert_eq!(
            section.option("server").unwrap().value(),
            &Value::List(vec!["1.1.1.1".into(), "8.8.8.8".into()])
        );
        assert_eq!(section.get("server"), None);
    }

    #[test]
    fn test_scalar_replaces_list() {
        let mut section = Section::new("dnsmasq", "main", false);
        section.push_item("server", "a".into());
        section.push_item("server", "b".into());
        section.put_option("server", "c".into());
        assert_eq!(section.get("server"), Some("c"));
    }

    #[test]
    fn test_remove_option() {
        let mut section = Section::new("t", "s", false);
        section.put_option("a", "1".into());
        assert!(section.remove_option("a").is_some());
        assert!(section.remove_option("a").is_none());
        assert!(section.options().is_empty());
    }
}
