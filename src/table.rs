use std::collections::HashMap;

/// Answers "which table holds records of this type?". Consulted only when
///  the caller does not name a table explicitly.
///
/// Closures work directly:
///
/// ```rust
/// # use lambda_sql::table::TableNameSource;
/// let source = |record: &str| (record == "Person").then(|| "person".to_string());
/// assert_eq!(source.table_name("Person"), Some("person".to_string()));
/// assert_eq!(source.table_name("Car"), None);
/// ```
pub trait TableNameSource {
    fn table_name(&self, record: &str) -> Option<String>;
}

impl<F> TableNameSource for F
where
    F: Fn(&str) -> Option<String>,
{
    fn table_name(&self, record: &str) -> Option<String> {
        self(record)
    }
}

impl TableNameSource for HashMap<String, String> {
    fn table_name(&self, record: &str) -> Option<String> {
        self.get(record).cloned()
    }
}

impl TableNameSource for HashMap<&str, &str> {
    fn table_name(&self, record: &str) -> Option<String> {
        self.get(record).map(|t| t.to_string())
    }
}

/// A source that knows no tables.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTables;

impl TableNameSource for NoTables {
    fn table_name(&self, _: &str) -> Option<String> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_sources() {
        let owned: HashMap<String, String> =
            [("Person".to_string(), "person".to_string())].into();
        assert_eq!(owned.table_name("Person").as_deref(), Some("person"));
        assert_eq!(owned.table_name("person"), None);

        let borrowed: HashMap<&str, &str> = [("Car", "cars")].into();
        assert_eq!(borrowed.table_name("Car").as_deref(), Some("cars"));
        assert_eq!(NoTables.table_name("Car"), None);
    }
}
