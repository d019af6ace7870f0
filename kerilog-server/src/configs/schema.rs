use crate::models::{DataPointTable, NodeTable, SensorTable, Table};

pub struct SchemaManager {
    tables: Vec<Box<dyn Table>>,
}

impl SchemaManager {
    pub fn new(mut tables: Vec<Box<dyn Table>>) -> Self {
        Self::sort_tables(&mut tables);
        Self { tables }
    }

    fn sort_tables(tables: &mut Vec<Box<dyn Table>>) {
        let mut to_sort = std::mem::take(tables);
        let mut deps_list: Vec<_> = to_sort.iter().map(|t| t.dependencies()).collect();
        let mut sorted = Vec::with_capacity(to_sort.len());

        while !to_sort.is_empty() {
            let independent_indices: Vec<usize> = deps_list
                .iter()
                .enumerate()
                .filter(|(_, deps)| deps.is_empty())
                .map(|(i, _)| i)
                .collect();

            assert!(
                !independent_indices.is_empty(),
                "Circular dependency detected or unresolved dependencies exist."
            );

            for &index in independent_indices.iter().rev() {
                let table = to_sort.swap_remove(index);
                let _ = deps_list.swap_remove(index);
                sorted.push(table);
            }

            for deps in deps_list.iter_mut() {
                deps.retain(|dep_name| !sorted.iter().any(|resolved| resolved.name() == *dep_name));
            }
        }

        *tables = sorted;
    }

    pub fn create_schema(&self) -> Vec<String> {
        self.tables.iter().map(|table| table.create()).collect()
    }

    pub fn dispose_schema(&self) -> Vec<String> {
        self.tables.iter().rev().map(|table| table.dispose()).collect()
    }
}

impl Default for SchemaManager {
    fn default() -> Self {
        SchemaManager::new(vec![
            Box::new(DataPointTable),
            Box::new(SensorTable),
            Box::new(NodeTable),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct MockTable {
        name: &'static str,
        dependencies: Vec<&'static str>,
    }

    impl Table for MockTable {
        fn name(&self) -> &'static str {
            self.name
        }

        fn create(&self) -> String {
            format!("CREATE TABLE {};", self.name)
        }

        fn dispose(&self) -> String {
            format!("DROP TABLE {};", self.name)
        }

        fn dependencies(&self) -> Vec<&'static str> {
            self.dependencies.clone()
        }
    }

    #[test]
    fn test_correct_creation_order() {
        let tables: Vec<Box<dyn Table>> = vec![
            Box::new(MockTable { name: "readings", dependencies: vec!["sensors"] }),
            Box::new(MockTable { name: "sensors", dependencies: vec!["nodes"] }),
            Box::new(MockTable { name: "nodes", dependencies: vec![] }),
        ];

        let manager = SchemaManager::new(tables);

        assert_eq!(
            manager.create_schema(),
            vec!["CREATE TABLE nodes;", "CREATE TABLE sensors;", "CREATE TABLE readings;"]
        );
        assert_eq!(
            manager.dispose_schema(),
            vec!["DROP TABLE readings;", "DROP TABLE sensors;", "DROP TABLE nodes;"]
        );
    }

    #[test]
    fn test_default_schema_creates_nodes_before_sensors() {
        let statements = SchemaManager::default().create_schema();
        let position = |table: &str| {
            statements
                .iter()
                .position(|statement| statement.contains(&format!("CREATE TABLE IF NOT EXISTS {table}")))
                .unwrap()
        };

        assert!(position("nodes") < position("sensors"));
        assert_eq!(statements.len(), 3);
    }

    #[test]
    #[should_panic(expected = "Circular dependency")]
    fn test_circular_dependency_panics() {
        SchemaManager::new(vec![
            Box::new(MockTable { name: "a", dependencies: vec!["b"] }),
            Box::new(MockTable { name: "b", dependencies: vec!["a"] }),
        ]);
    }
}
