use std::collections::BTreeMap;

/// A value bound to a parameter name.
///
/// Configuration files only ever produce `Text`; `List` comes from
/// manifest file sets and `Int` from artifact ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SymbolValue {
    Text(String),
    List(Vec<String>),
    Int(i64),
    Unset,
}

impl SymbolValue {
    /// Boolean reading of a value.
    ///
    /// False only for unset, the empty string, integer zero and the literal
    /// text `"false"`. The text `"0"` is true; only the integer is false.
    pub fn is_truthy(&self) -> bool {
        match self {
            SymbolValue::Unset => false,
            SymbolValue::Int(n) => *n != 0,
            SymbolValue::Text(s) => !(s.is_empty() || s == "false"),
            SymbolValue::List(_) => true,
        }
    }
}

impl From<&str> for SymbolValue {
    fn from(value: &str) -> Self {
        SymbolValue::Text(value.to_string())
    }
}

impl From<String> for SymbolValue {
    fn from(value: String) -> Self {
        SymbolValue::Text(value)
    }
}

impl From<Vec<String>> for SymbolValue {
    fn from(value: Vec<String>) -> Self {
        SymbolValue::List(value)
    }
}

impl From<i64> for SymbolValue {
    fn from(value: i64) -> Self {
        SymbolValue::Int(value)
    }
}

impl From<Option<String>> for SymbolValue {
    fn from(value: Option<String>) -> Self {
        value.map_or(SymbolValue::Unset, SymbolValue::Text)
    }
}

/// Parameter names bound to values.
///
/// A name that was never inserted is undefined, which is distinct from a
/// name bound to [`SymbolValue::Unset`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SymbolTable {
    entries: BTreeMap<String, SymbolValue>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<SymbolValue>) {
        self.entries.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&SymbolValue> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Text value of `name`, if it is bound to text.
    pub fn text(&self, name: &str) -> Option<&str> {
        match self.entries.get(name) {
            Some(SymbolValue::Text(s)) => Some(s),
            _ => None,
        }
    }

    /// Overlay every entry of `other`, replacing same-named entries.
    pub fn extend_from(&mut self, other: &SymbolTable) {
        for (name, value) in &other.entries {
            self.entries.insert(name.clone(), value.clone());
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &SymbolValue)> {
        self.entries.iter()
    }
}

impl From<&BTreeMap<String, String>> for SymbolTable {
    fn from(map: &BTreeMap<String, String>) -> Self {
        Self {
            entries: map
                .iter()
                .map(|(k, v)| (k.clone(), SymbolValue::Text(v.clone())))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falsy_values() {
        assert!(!SymbolValue::Unset.is_truthy());
        assert!(!SymbolValue::Text(String::new()).is_truthy());
        assert!(!SymbolValue::Int(0).is_truthy());
        assert!(!SymbolValue::from("false").is_truthy());
    }

    #[test]
    fn text_zero_is_truthy_but_integer_zero_is_not() {
        assert!(SymbolValue::from("0").is_truthy());
        assert!(!SymbolValue::Int(0).is_truthy());
    }

    #[test]
    fn other_values_are_truthy() {
        assert!(SymbolValue::from("true").is_truthy());
        assert!(SymbolValue::from("False").is_truthy());
        assert!(SymbolValue::Int(-1).is_truthy());
        assert!(SymbolValue::List(vec![]).is_truthy());
    }

    #[test]
    fn extend_replaces_existing_entries() {
        let mut base = SymbolTable::new();
        base.insert("a", "1");
        base.insert("b", "2");

        let mut overlay = SymbolTable::new();
        overlay.insert("b", "3");

        base.extend_from(&overlay);
        assert_eq!(base.text("a"), Some("1"));
        assert_eq!(base.text("b"), Some("3"));
    }

    #[test]
    fn unset_is_defined() {
        let mut table = SymbolTable::new();
        table.insert("x", SymbolValue::Unset);
        assert!(table.contains("x"));
        assert!(!table.contains("y"));
    }
}
